//! Registry use-case service.
//!
//! # Responsibility
//! - Expose the registry operations: schema setup, holder/dependent insert,
//!   removal and listing.
//! - Scope one connection to each call and release it on every exit path.
//! - Report failures as `RegistryError`; raw storage errors never escape.
//!
//! # Invariants
//! - Tax IDs and record fields are validated before any store access.
//! - Operations other than `initialize_schema` never create or migrate
//!   schema; they fail with `RegistryError::Store` on an uninitialized store.

use crate::config::RegistryConfig;
use crate::db::{open_connection, open_db, DbError};
use crate::logging::mask_tax_id;
use crate::model::person::{check_tax_id, Dependent, Holder, PersonValidationError};
use crate::repo::person_repo::{
    DependentSummary, PersonRepository, RepoError, RepoResult, Removal, SqlitePersonRepository,
};
use crate::report::RegistryReport;
use log::{debug, error, info, warn};
use rusqlite::{Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failure taxonomy of registry operations.
#[derive(Debug)]
pub enum RegistryError {
    /// Malformed tax ID or invalid record field.
    InvalidInput(PersonValidationError),
    /// Dependent names a holder tax ID that is not registered.
    ReferenceNotFound(String),
    /// Duplicate tax ID or credential, or another store constraint.
    IntegrityViolation(String),
    /// Removal target exists in neither table.
    NotFound(String),
    /// Any other storage failure.
    Store(RepoError),
}

impl RegistryError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ReferenceNotFound(_) => "REFERENCE_NOT_FOUND",
            Self::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::ReferenceNotFound(tax_id) => {
                write!(f, "holder with tax ID {tax_id} not found")
            }
            Self::IntegrityViolation(detail) => write!(f, "integrity violation: {detail}"),
            Self::NotFound(tax_id) => write!(f, "no person found with tax ID {tax_id}"),
            Self::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidInput(err),
            RepoError::HolderNotFound(tax_id) => Self::ReferenceNotFound(tax_id),
            RepoError::Constraint(detail) => Self::IntegrityViolation(detail),
            RepoError::NotFound(tax_id) => Self::NotFound(tax_id),
            other => Self::Store(other),
        }
    }
}

impl From<DbError> for RegistryError {
    fn from(value: DbError) -> Self {
        Self::Store(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(RepoError::from(value))
    }
}

impl From<PersonValidationError> for RegistryError {
    fn from(value: PersonValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

/// Insured-person registry bound to one store file.
#[derive(Debug, Clone)]
pub struct Registry {
    config: RegistryConfig,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns `true` iff `tax_id` is exactly 11 ASCII digits.
    pub fn validate_tax_id(tax_id: &str) -> bool {
        crate::model::person::validate_tax_id(tax_id)
    }

    /// Creates both tables, their index and identity triggers if missing.
    ///
    /// Idempotent. Pending migrations run in one transaction, so a failure
    /// leaves the previous schema state untouched.
    pub fn initialize_schema(&self) -> RegistryResult<()> {
        let started_at = Instant::now();
        let result = open_db(self.config.db_path())
            .map(drop)
            .map_err(RegistryError::from);
        log_outcome("schema_init", None, started_at, &result);
        result
    }

    /// Inserts a new holder. An existing tax ID is always an integrity error.
    ///
    /// Validation runs here before the store is opened; the repository
    /// repeats it for callers that use it directly.
    pub fn insert_holder(&self, holder: &Holder) -> RegistryResult<()> {
        let started_at = Instant::now();
        let result = holder
            .validate()
            .map_err(RegistryError::from)
            .and_then(|()| self.with_repo(|repo| repo.insert_holder(holder)));
        log_outcome("holder_insert", Some(&holder.tax_id), started_at, &result);
        result
    }

    /// Inserts a dependent of an already registered holder.
    ///
    /// The holder lookup and the insert share one transaction, so a
    /// concurrent holder removal cannot leave an orphan behind.
    pub fn insert_dependent(&self, dependent: &Dependent) -> RegistryResult<()> {
        let started_at = Instant::now();
        let result = dependent
            .validate()
            .map_err(RegistryError::from)
            .and_then(|()| self.with_repo(|repo| repo.insert_dependent(dependent)));
        log_outcome(
            "dependent_insert",
            Some(&dependent.tax_id),
            started_at,
            &result,
        );
        result
    }

    /// Removes a holder (with all its dependents) or a single dependent.
    ///
    /// Holders are looked up first: a tax ID cannot be both a holder and a
    /// dependent, so the order only matters for stores written without the
    /// identity triggers.
    pub fn remove_person(&self, tax_id: &str) -> RegistryResult<Removal> {
        let started_at = Instant::now();
        let result = check_tax_id("tax_id", tax_id)
            .map_err(RegistryError::from)
            .and_then(|()| self.with_repo(|repo| repo.remove_person(tax_id)));
        log_outcome("person_remove", Some(tax_id), started_at, &result);
        result
    }

    /// Reads every holder and dependent as flat, name-ordered projections.
    pub fn list_all(&self) -> RegistryResult<RegistryReport> {
        let started_at = Instant::now();
        let result = self.read_report();
        log_outcome("registry_list", None, started_at, &result);
        result
    }

    /// Lists the dependents registered under one holder.
    pub fn dependents_of(&self, holder_tax_id: &str) -> RegistryResult<Vec<DependentSummary>> {
        check_tax_id("holder_tax_id", holder_tax_id)?;
        self.with_repo(|repo| repo.list_dependents(Some(holder_tax_id)))
    }

    /// Loads the full holder record, if registered.
    pub fn find_holder(&self, tax_id: &str) -> RegistryResult<Option<Holder>> {
        check_tax_id("tax_id", tax_id)?;
        self.with_repo(|repo| repo.get_holder(tax_id))
    }

    /// Loads the full dependent record, if registered.
    pub fn find_dependent(&self, tax_id: &str) -> RegistryResult<Option<Dependent>> {
        check_tax_id("tax_id", tax_id)?;
        self.with_repo(|repo| repo.get_dependent(tax_id))
    }

    fn read_report(&self) -> RegistryResult<RegistryReport> {
        let conn = open_connection(self.config.db_path())?;
        // One read transaction keeps both listings on the same snapshot.
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Deferred)?;
        let repo = SqlitePersonRepository::try_new(&tx)?;
        let report = RegistryReport {
            holders: repo.list_holders()?,
            dependents: repo.list_dependents(None)?,
        };
        tx.commit()?;
        Ok(report)
    }

    fn with_repo<T>(
        &self,
        op: impl FnOnce(&SqlitePersonRepository<'_>) -> RepoResult<T>,
    ) -> RegistryResult<T> {
        let conn = open_connection(self.config.db_path())?;
        let repo = SqlitePersonRepository::try_new(&conn)?;
        Ok(op(&repo)?)
    }
}

fn log_outcome<T>(
    event: &str,
    tax_id: Option<&str>,
    started_at: Instant,
    result: &RegistryResult<T>,
) {
    let tax_id = tax_id.map(mask_tax_id).unwrap_or_else(|| "-".to_string());
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={event} module=registry status=ok tax_id={tax_id} duration_ms={duration_ms}"
        ),
        Err(RegistryError::Store(err)) => error!(
            "event={event} module=registry status=error tax_id={tax_id} duration_ms={duration_ms} error_code=STORE_ERROR error={err}"
        ),
        Err(RegistryError::InvalidInput(_)) => debug!(
            "event={event} module=registry status=rejected tax_id={tax_id} duration_ms={duration_ms} error_code=INVALID_INPUT"
        ),
        Err(err) => warn!(
            "event={event} module=registry status=rejected tax_id={tax_id} duration_ms={duration_ms} error_code={}",
            err.code()
        ),
    }
}
