//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from the registry service.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Constraint failures surface as `RepoError::Constraint`, separate from
//!   transport errors.

pub mod person_repo;
