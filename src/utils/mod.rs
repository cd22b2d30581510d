//! Utility modules

pub mod memory_storage;
pub mod rest_client;
pub mod validation;

pub use memory_storage::*;
pub use rest_client::*;
pub use validation::*;
