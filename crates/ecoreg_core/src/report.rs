//! Console rendering of registry listings and outcomes.
//!
//! One line per record, pipe-delimited `key: value` pairs. The text is meant
//! for people, not parsers.

use crate::repo::person_repo::{DependentSummary, HolderSummary, Removal};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Result of `Registry::list_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryReport {
    /// Holders sorted by name.
    pub holders: Vec<HolderSummary>,
    /// Dependents sorted by name, each with its holder's name attached.
    pub dependents: Vec<DependentSummary>,
}

impl RegistryReport {
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty() && self.dependents.is_empty()
    }
}

impl Display for HolderSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tax ID: {} | Name: {} | Sex: {} | Age: {} | State: {} | Status: {}",
            self.tax_id,
            self.name,
            self.sex.as_str(),
            self.age,
            self.state,
            self.status.as_str()
        )
    }
}

impl Display for DependentSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tax ID: {} | Name: {} | Sex: {} | Age: {} | Relationship: {} | Holder: {} | Status: {}",
            self.tax_id,
            self.name,
            self.sex.as_str(),
            self.age,
            self.relationship,
            self.holder_name,
            self.status.as_str()
        )
    }
}

impl Display for RegistryReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Holders ===")?;
        for holder in &self.holders {
            writeln!(f, "{holder}")?;
        }
        writeln!(f)?;
        writeln!(f, "=== Dependents ===")?;
        for dependent in &self.dependents {
            writeln!(f, "{dependent}")?;
        }
        Ok(())
    }
}

impl Removal {
    /// One-line confirmation for a completed removal.
    pub fn describe(self, tax_id: &str) -> String {
        match self {
            Self::Holder => {
                format!("Holder with tax ID {tax_id} and their dependents removed")
            }
            Self::Dependent => format!("Dependent with tax ID {tax_id} removed"),
        }
    }
}
