//! REST backend client
//!
//! Implements both repository traits over the backend's JSON endpoints:
//!
//! - `/classe`, `/compte` for the chart of accounts
//! - `/ecriture-comptable` for journal entries
//! - `/grand-livre` for posted ledger records

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::traits::*;
use crate::types::*;

/// Repository backed by the REST API
#[derive(Debug, Clone)]
pub struct RestRepository {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RestRepository {
    /// Create a client for the configured backend
    pub fn new(config: &ApiConfig) -> LedgerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LedgerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn execute(&self, req: RequestBuilder, what: &str) -> LedgerResult<Response> {
        let response = req
            .send()
            .await
            .map_err(|e| LedgerError::Persistence(format!("{} failed: {}", what, e)))?;
        debug!(status = %response.status(), what, "Backend responded");
        Ok(response)
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> LedgerResult<Response> {
        let response = self.execute(req, what).await?;
        check_status(response, what).await
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> LedgerResult<T> {
        decode(self.send(req, what).await?, what).await
    }
}

async fn check_status(response: Response, what: &str) -> LedgerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(LedgerError::Persistence(error_message(what, status, &body)))
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> LedgerResult<T> {
    response
        .json()
        .await
        .map_err(|e| LedgerError::Persistence(format!("{}: invalid response: {}", what, e)))
}

/// Persistence error text, using the backend's `message` field when present
fn error_message(what: &str, status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()));

    match message {
        Some(message) => format!("{} failed with status {}: {}", what, status, message),
        None => format!("{} failed with status {}", what, status),
    }
}

#[async_trait]
impl AccountRepository for RestRepository {
    async fn list_classes(&self) -> LedgerResult<Vec<AccountClass>> {
        self.fetch(self.request(Method::GET, "classe"), "List classes")
            .await
    }

    async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.fetch(self.request(Method::GET, "compte"), "List accounts")
            .await
    }

    async fn create_account(&mut self, account: &AccountInput) -> LedgerResult<Account> {
        let mut req = self.request(Method::POST, "compte").json(account);
        if let Some(parent_id) = account.parent_id {
            req = req.query(&[("parentId", parent_id)]);
        }
        self.fetch(req, "Create account").await
    }

    async fn update_account(&mut self, id: AccountId, account: &AccountInput) -> LedgerResult<Account> {
        let req = self
            .request(Method::PUT, &format!("compte/{}", id))
            .json(account);
        self.fetch(req, "Update account").await
    }

    async fn delete_account(&mut self, id: AccountId) -> LedgerResult<()> {
        let req = self.request(Method::DELETE, &format!("compte/{}", id));
        self.send(req, "Delete account").await.map(|_| ())
    }
}

#[async_trait]
impl JournalRepository for RestRepository {
    async fn list_entries(&self) -> LedgerResult<Vec<JournalEntry>> {
        self.fetch(self.request(Method::GET, "ecriture-comptable"), "List entries")
            .await
    }

    async fn get_entry(&self, id: EntryId) -> LedgerResult<Option<JournalEntry>> {
        let req = self.request(Method::GET, &format!("ecriture-comptable/{}", id));
        let response = self.execute(req, "Get entry").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "Get entry").await?;
        decode(response, "Get entry").await.map(Some)
    }

    async fn create_entry(&mut self, entry: &JournalEntry) -> LedgerResult<JournalEntry> {
        let req = self.request(Method::POST, "ecriture-comptable").json(entry);
        self.fetch(req, "Create entry").await
    }

    async fn update_entry(&mut self, id: EntryId, entry: &JournalEntry) -> LedgerResult<JournalEntry> {
        let req = self
            .request(Method::PUT, &format!("ecriture-comptable/{}", id))
            .json(entry);
        self.fetch(req, "Update entry").await
    }

    async fn delete_entry(&mut self, id: EntryId) -> LedgerResult<()> {
        let req = self.request(Method::DELETE, &format!("ecriture-comptable/{}", id));
        self.send(req, "Delete entry").await.map(|_| ())
    }

    async fn list_ledger_records(&self) -> LedgerResult<Vec<LedgerRecord>> {
        self.fetch(self.request(Method::GET, "grand-livre"), "List ledger records")
            .await
    }
}
