//! Core of the Eco insured-person registry.
//! Owns the holder/dependent schema and every identity and integrity rule.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod service;

pub use config::{LogSettings, RegistryConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::person::{
    validate_tax_id, Address, Dependent, Holder, InsuredStatus, PersonProfile,
    PersonValidationError, Sex,
};
pub use report::RegistryReport;
pub use repo::person_repo::{
    DependentSummary, HolderSummary, PersonRepository, Removal, RepoError, RepoResult,
    SqlitePersonRepository,
};
pub use service::registry::{Registry, RegistryError, RegistryResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
