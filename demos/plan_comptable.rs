//! Chart of accounts and journal walkthrough over the in-memory repository

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use plan_comptable_core::{
    display_date, tiers, AccountClass, AccountInput, AccountRow, BalanceFilters, EntryStatus,
    JournalEntryDraft, Ledger, LedgerError, LedgerFilters, MemoryRepository, PartyKind,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("plan_comptable_core=info".parse()?))
        .init();

    println!("📒 Plan Comptable - Chart of accounts example\n");

    let storage = MemoryRepository::with_classes(vec![
        AccountClass::new(4, "4", "Comptes de tiers"),
        AccountClass::new(5, "5", "Comptes financiers"),
        AccountClass::new(6, "6", "Comptes de charges"),
        AccountClass::new(7, "7", "Comptes de produits"),
    ]);
    let mut ledger = Ledger::new(storage);
    ledger.load().await?;

    // 1. Import a starting chart
    println!("📊 Importing chart of accounts...");
    let report = ledger
        .import_accounts(vec![
            AccountRow::new("41", "Clients et comptes rattachés").with_class("4"),
            AccountRow::new("411", "Clients").with_parent("41"),
            AccountRow::new("5", "Comptes financiers").with_class("5"),
            AccountRow::new("51", "Banques").with_parent("5"),
            AccountRow::new("512", "Banque principale").with_parent("51"),
            AccountRow::new("70", "Ventes").with_class("7"),
            AccountRow::new("701", "Ventes de produits finis").with_parent("70"),
        ])
        .await;
    println!(
        "  ✓ Batch {}: {} created, {} failed\n",
        report.batch_id, report.succeeded, report.failed
    );

    // 2. Suggest and create a sub-account
    let banks = ledger
        .chart()
        .account_by_numero("51")
        .map(|a| a.id)
        .ok_or("account 51 missing")?;
    if let Some(numero) = ledger.chart().suggest_next_numero(Some(banks), None)? {
        let account = ledger
            .create_account(AccountInput::new(numero, "Banque secondaire").under(banks))
            .await?;
        println!("  ✓ Created suggested account {} - {}", account.numero, account.nom);
    }

    match ledger
        .create_account(AccountInput::new("6A", "Charges diverses").under(banks))
        .await
    {
        Err(LedgerError::InvalidNumberFormat { .. }) => {
            println!("  ✓ Rejected 6A under 51: number must extend the parent")
        }
        other => println!("  ✗ Unexpected result: {:?}", other),
    }
    println!();

    println!("🌳 Hierarchy:");
    for item in ledger.chart().flattened(None) {
        println!(
            "  {}{} - {}",
            "  ".repeat(item.level),
            item.account.numero,
            item.account.nom
        );
    }
    println!();

    // 3. Record a sale
    println!("💰 Recording journal entries...");
    let client = ledger.chart().account_by_numero("411").map(|a| a.id).ok_or("account 411 missing")?;
    let sales = ledger.chart().account_by_numero("701").map(|a| a.id).ok_or("account 701 missing")?;
    let bank = ledger.chart().account_by_numero("512").map(|a| a.id).ok_or("account 512 missing")?;
    let date = NaiveDate::from_ymd_opt(2024, 3, 15).ok_or("invalid date")?;

    let invoice = JournalEntryDraft::new("FAC-2024-015", EntryStatus::Published, date)
        .debit("Facture Dupont", client, BigDecimal::from(1200))
        .credit("Facture Dupont", sales, BigDecimal::from(1200));
    let entry = ledger.submit_entry(invoice).await?;
    println!("  ✓ Saved {} ({})", entry.reference, entry.num.as_deref().unwrap_or("-"));

    let payment = JournalEntryDraft::new("REG-2024-015", EntryStatus::Draft, date)
        .debit("Règlement Dupont", bank, BigDecimal::from(1000))
        .credit("Règlement Dupont", client, BigDecimal::from(900));
    if let Err(e) = ledger.submit_entry(payment).await {
        println!("  ✓ Rejected payment: {}", e);
    }
    println!();

    // 4. Reports
    println!("📈 Grand livre:");
    let listing = ledger.grand_livre(&LedgerFilters::default()).await?;
    let page = listing.page(1, ledger.config().reports.records_per_page);
    for record in page.items {
        println!(
            "  {} | {:<14} | {:<5} | {:>8} | {:>8} | {}",
            display_date(record.date_ecriture.as_deref()),
            record.reference.as_deref().unwrap_or("-"),
            record.compte_numero.as_deref().unwrap_or("-"),
            record.debit,
            record.credit,
            tiers(record)
        );
    }
    println!(
        "  Totals: debit {} / credit {} / difference {}\n",
        listing.totals.debit, listing.totals.credit, listing.totals.difference
    );

    let clients = ledger
        .party_balance(PartyKind::Client, &BalanceFilters::default())
        .await?;
    println!("👥 Client balances: {} row(s), total {}", clients.rows.len(), clients.totals.balance);

    let trial = ledger.trial_balance().await?;
    println!("⚖️  Trial balance is balanced: {}", trial.is_balanced);

    // 5. Cascade delete
    let preview = ledger.chart().deletion_preview(banks)?.len();
    let removed = ledger.delete_account(banks, true).await?;
    println!("\n🗑️  Deleted {} of {} previewed account(s)", removed.len(), preview);

    Ok(())
}
