//! Registry use-case services.
//!
//! # Responsibility
//! - Orchestrate connection lifecycle and repository calls per operation.
//! - Translate persistence errors into the registry error taxonomy.

pub mod registry;
