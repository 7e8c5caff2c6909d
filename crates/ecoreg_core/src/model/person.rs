//! Holder and dependent records.
//!
//! # Responsibility
//! - Define the full attribute shape persisted for both person tables.
//! - Provide `validate_tax_id` and record validation run before any store
//!   access.
//!
//! # Invariants
//! - Tax IDs are exactly 11 ASCII digits. No check-digit validation.
//! - `coverage_end` is never earlier than `coverage_start` when set.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static TAX_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{11}$").expect("valid tax id regex"));

/// Returns `true` iff `value` is exactly 11 ASCII digits.
///
/// Leading zeros are allowed. Unicode digits from other scripts are not.
pub fn validate_tax_id(value: &str) -> bool {
    TAX_ID_RE.is_match(value)
}

/// Biological sex as recorded on the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

impl Sex {
    /// Storage/display code (`M` or `F`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Self::M),
            "F" => Some(Self::F),
            _ => None,
        }
    }
}

/// Coverage status of an insured person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuredStatus {
    /// Coverage in force. Default for new records.
    #[default]
    Active,
    /// Coverage temporarily on hold.
    Suspended,
    /// Coverage terminated.
    Cancelled,
}

impl InsuredStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Postal address fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub postal_code: String,
    pub neighborhood: String,
    pub city: String,
    /// Federative unit code, e.g. `PE`.
    pub state: String,
}

/// Attributes shared by holders and dependents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonProfile {
    /// Policy credential code, unique across both tables.
    pub credential: String,
    pub name: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub age: u32,
    /// ANS age-bracket tag used for rate tables.
    pub ans_bracket: String,
    pub marital_status: String,
    /// Supplemental plan tier.
    pub plan_tier: String,
    #[serde(flatten)]
    pub address: Address,
    #[serde(default)]
    pub status: InsuredStatus,
    pub coverage_start: NaiveDate,
    pub coverage_end: Option<NaiveDate>,
}

/// Primary insured party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub tax_id: String,
    #[serde(flatten)]
    pub profile: PersonProfile,
}

/// Person covered under a holder's policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
    pub tax_id: String,
    /// Tax ID of the owning holder.
    pub holder_tax_id: String,
    /// Relationship to the holder, e.g. spouse or child.
    pub relationship: String,
    #[serde(flatten)]
    pub profile: PersonProfile,
}

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    /// A tax ID field is not exactly 11 digits.
    InvalidTaxId { field: &'static str, value: String },
    /// A required text field is empty or whitespace.
    BlankField(&'static str),
    CoverageEndsBeforeStart { start: NaiveDate, end: NaiveDate },
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTaxId { field, value } => {
                write!(f, "invalid {field} `{value}`: expected exactly 11 digits")
            }
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::CoverageEndsBeforeStart { start, end } => write!(
                f,
                "coverage_end {end} is earlier than coverage_start {start}"
            ),
        }
    }
}

impl Error for PersonValidationError {}

/// Checks one tax ID field, naming the field in the error.
pub fn check_tax_id(field: &'static str, value: &str) -> Result<(), PersonValidationError> {
    if validate_tax_id(value) {
        Ok(())
    } else {
        Err(PersonValidationError::InvalidTaxId {
            field,
            value: value.to_string(),
        })
    }
}

impl PersonProfile {
    /// Validates shared attributes. Tax IDs are checked by the owning record.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        require_text("credential", &self.credential)?;
        require_text("name", &self.name)?;
        if let Some(end) = self.coverage_end {
            if end < self.coverage_start {
                return Err(PersonValidationError::CoverageEndsBeforeStart {
                    start: self.coverage_start,
                    end,
                });
            }
        }
        Ok(())
    }
}

impl Holder {
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        check_tax_id("tax_id", &self.tax_id)?;
        self.profile.validate()
    }
}

impl Dependent {
    /// Validates in contract order: own tax ID, holder tax ID, then fields.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        check_tax_id("tax_id", &self.tax_id)?;
        check_tax_id("holder_tax_id", &self.holder_tax_id)?;
        require_text("relationship", &self.relationship)?;
        self.profile.validate()
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), PersonValidationError> {
    if value.trim().is_empty() {
        Err(PersonValidationError::BlankField(field))
    } else {
        Ok(())
    }
}
