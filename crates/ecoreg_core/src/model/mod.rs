//! Domain model for insured persons.
//!
//! # Responsibility
//! - Define the holder/dependent records accepted by the registry.
//! - Own the tax ID contract and record-level validation.
//!
//! # Invariants
//! - A person is identified by an 11-digit tax ID; it is never generated.
//! - A dependent always names exactly one holder.

pub mod person;
