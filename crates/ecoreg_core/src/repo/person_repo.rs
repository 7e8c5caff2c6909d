//! Holder/dependent repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert, remove and read APIs over `holders` and `dependents`.
//! - Keep SQL and row mapping inside the persistence boundary.
//!
//! # Invariants
//! - Dependent insert checks holder existence and inserts in one transaction.
//! - Removal resolves holders before dependents; holder deletion relies on
//!   the schema `ON DELETE CASCADE` rule.
//! - Listings are ordered by `name ASC, tax_id ASC`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::person::{
    check_tax_id, Address, Dependent, Holder, InsuredStatus, PersonProfile,
    PersonValidationError, Sex,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PROFILE_COLUMNS: [&str; 15] = [
    "tax_id",
    "credential",
    "name",
    "sex",
    "birth_date",
    "age",
    "ans_bracket",
    "marital_status",
    "plan_tier",
    "postal_code",
    "neighborhood",
    "city",
    "state",
    "status",
    "coverage_start",
];

const HOLDER_SELECT_SQL: &str = "SELECT
    tax_id, credential, name, sex, birth_date, age, ans_bracket, marital_status,
    plan_tier, postal_code, neighborhood, city, state, status, coverage_start,
    coverage_end
FROM holders";

const DEPENDENT_SELECT_SQL: &str = "SELECT
    tax_id, credential, name, sex, birth_date, age, ans_bracket, marital_status,
    relationship, plan_tier, postal_code, neighborhood, city, state,
    holder_tax_id, status, coverage_start, coverage_end
FROM dependents";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from holder/dependent repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Record rejected before touching the store.
    Validation(PersonValidationError),
    /// Store rejected a write: duplicate key, unique credential, identity
    /// clash across tables or another constraint.
    Constraint(String),
    /// Dependent references a holder that does not exist.
    HolderNotFound(String),
    /// No holder or dependent has this tax ID.
    NotFound(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
            Self::HolderNotFound(tax_id) => write!(f, "holder not found: {tax_id}"),
            Self::NotFound(tax_id) => write!(f, "person not found: {tax_id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "person repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "person repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "person repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Which table a removal resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    /// Holder row deleted; its dependents went with it.
    Holder,
    Dependent,
}

/// Flat holder projection used by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderSummary {
    pub tax_id: String,
    pub name: String,
    pub sex: Sex,
    pub age: u32,
    pub state: String,
    pub status: InsuredStatus,
}

/// Flat dependent projection, joined with the owning holder's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentSummary {
    pub tax_id: String,
    pub name: String,
    pub sex: Sex,
    pub age: u32,
    pub relationship: String,
    pub holder_name: String,
    pub status: InsuredStatus,
}

/// Repository interface for holder/dependent operations.
pub trait PersonRepository {
    /// Inserts one holder. Never updates an existing row.
    ///
    /// Implementations validate the record themselves; callers may also
    /// validate earlier to avoid opening a store at all.
    fn insert_holder(&self, holder: &Holder) -> RepoResult<()>;
    /// Inserts one dependent after confirming its holder exists.
    fn insert_dependent(&self, dependent: &Dependent) -> RepoResult<()>;
    /// Deletes a holder (cascading) or, failing that, a dependent.
    fn remove_person(&self, tax_id: &str) -> RepoResult<Removal>;
    fn get_holder(&self, tax_id: &str) -> RepoResult<Option<Holder>>;
    fn get_dependent(&self, tax_id: &str) -> RepoResult<Option<Dependent>>;
    /// Lists all holders by name.
    fn list_holders(&self) -> RepoResult<Vec<HolderSummary>>;
    /// Lists dependents by name, optionally restricted to one holder.
    fn list_dependents(&self, holder_tax_id: Option<&str>) -> RepoResult<Vec<DependentSummary>>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_person_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn insert_holder(&self, holder: &Holder) -> RepoResult<()> {
        holder.validate()?;
        let profile = &holder.profile;

        self.conn
            .execute(
                "INSERT INTO holders (
                    tax_id, credential, name, sex, birth_date, age, ans_bracket,
                    marital_status, plan_tier, postal_code, neighborhood, city, state,
                    status, coverage_start, coverage_end
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
                params![
                    holder.tax_id.as_str(),
                    profile.credential.as_str(),
                    profile.name.as_str(),
                    profile.sex.as_str(),
                    profile.birth_date,
                    profile.age,
                    profile.ans_bracket.as_str(),
                    profile.marital_status.as_str(),
                    profile.plan_tier.as_str(),
                    profile.address.postal_code.as_str(),
                    profile.address.neighborhood.as_str(),
                    profile.address.city.as_str(),
                    profile.address.state.as_str(),
                    profile.status.as_str(),
                    profile.coverage_start,
                    profile.coverage_end,
                ],
            )
            .map_err(|err| classify_write_error(err, "holder", &holder.tax_id))?;

        Ok(())
    }

    fn insert_dependent(&self, dependent: &Dependent) -> RepoResult<()> {
        dependent.validate()?;
        let profile = &dependent.profile;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !holder_exists(&tx, &dependent.holder_tax_id)? {
            return Err(RepoError::HolderNotFound(dependent.holder_tax_id.clone()));
        }

        tx.execute(
            "INSERT INTO dependents (
                tax_id, credential, name, sex, birth_date, age, ans_bracket,
                marital_status, relationship, plan_tier, postal_code, neighborhood,
                city, state, holder_tax_id, status, coverage_start, coverage_end
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18);",
            params![
                dependent.tax_id.as_str(),
                profile.credential.as_str(),
                profile.name.as_str(),
                profile.sex.as_str(),
                profile.birth_date,
                profile.age,
                profile.ans_bracket.as_str(),
                profile.marital_status.as_str(),
                dependent.relationship.as_str(),
                profile.plan_tier.as_str(),
                profile.address.postal_code.as_str(),
                profile.address.neighborhood.as_str(),
                profile.address.city.as_str(),
                profile.address.state.as_str(),
                dependent.holder_tax_id.as_str(),
                profile.status.as_str(),
                profile.coverage_start,
                profile.coverage_end,
            ],
        )
        .map_err(|err| classify_write_error(err, "dependent", &dependent.tax_id))?;

        tx.commit()?;
        Ok(())
    }

    fn remove_person(&self, tax_id: &str) -> RepoResult<Removal> {
        check_tax_id("tax_id", tax_id)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let removal = if holder_exists(&tx, tax_id)? {
            tx.execute("DELETE FROM holders WHERE tax_id = ?1;", [tax_id])?;
            Removal::Holder
        } else {
            let changed = tx.execute("DELETE FROM dependents WHERE tax_id = ?1;", [tax_id])?;
            if changed == 0 {
                return Err(RepoError::NotFound(tax_id.to_string()));
            }
            Removal::Dependent
        };

        tx.commit()?;
        Ok(removal)
    }

    fn get_holder(&self, tax_id: &str) -> RepoResult<Option<Holder>> {
        let holder = self
            .conn
            .query_row(
                &format!("{HOLDER_SELECT_SQL} WHERE tax_id = ?1;"),
                [tax_id],
                |row| Ok(RawRow::read(row, false)),
            )
            .optional()?;

        match holder {
            Some(raw) => {
                let raw = raw?;
                Ok(Some(Holder {
                    tax_id: raw.tax_id.clone(),
                    profile: raw.into_profile()?,
                }))
            }
            None => Ok(None),
        }
    }

    fn get_dependent(&self, tax_id: &str) -> RepoResult<Option<Dependent>> {
        let dependent = self
            .conn
            .query_row(
                &format!("{DEPENDENT_SELECT_SQL} WHERE tax_id = ?1;"),
                [tax_id],
                |row| Ok(RawRow::read(row, true)),
            )
            .optional()?;

        match dependent {
            Some(raw) => {
                let mut raw = raw?;
                let tax_id = raw.tax_id.clone();
                let holder_tax_id = raw.holder_tax_id.take().unwrap_or_default();
                let relationship = raw.relationship.take().unwrap_or_default();
                Ok(Some(Dependent {
                    tax_id,
                    holder_tax_id,
                    relationship,
                    profile: raw.into_profile()?,
                }))
            }
            None => Ok(None),
        }
    }

    fn list_holders(&self) -> RepoResult<Vec<HolderSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT tax_id, name, sex, age, state, status
             FROM holders
             ORDER BY name ASC, tax_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut holders = Vec::new();
        while let Some(row) = rows.next()? {
            holders.push(HolderSummary {
                tax_id: row.get("tax_id")?,
                name: row.get("name")?,
                sex: parse_sex(row.get("sex")?, "holders.sex")?,
                age: row.get("age")?,
                state: row.get("state")?,
                status: parse_status(row.get("status")?, "holders.status")?,
            });
        }
        Ok(holders)
    }

    fn list_dependents(&self, holder_tax_id: Option<&str>) -> RepoResult<Vec<DependentSummary>> {
        let mut sql = String::from(
            "SELECT
                d.tax_id,
                d.name,
                d.sex,
                d.age,
                d.relationship,
                h.name AS holder_name,
                d.status
             FROM dependents d
             INNER JOIN holders h ON h.tax_id = d.holder_tax_id",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(holder_tax_id) = holder_tax_id {
            sql.push_str(" WHERE d.holder_tax_id = ?");
            bind_values.push(Value::Text(holder_tax_id.to_string()));
        }
        sql.push_str(" ORDER BY d.name ASC, d.tax_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut dependents = Vec::new();
        while let Some(row) = rows.next()? {
            dependents.push(DependentSummary {
                tax_id: row.get("tax_id")?,
                name: row.get("name")?,
                sex: parse_sex(row.get("sex")?, "dependents.sex")?,
                age: row.get("age")?,
                relationship: row.get("relationship")?,
                holder_name: row.get("holder_name")?,
                status: parse_status(row.get("status")?, "dependents.status")?,
            });
        }
        Ok(dependents)
    }
}

/// Column values shared by both tables, read before enum parsing.
struct RawRow {
    tax_id: String,
    credential: String,
    name: String,
    sex: String,
    birth_date: chrono::NaiveDate,
    age: u32,
    ans_bracket: String,
    marital_status: String,
    plan_tier: String,
    address: Address,
    status: String,
    coverage_start: chrono::NaiveDate,
    coverage_end: Option<chrono::NaiveDate>,
    relationship: Option<String>,
    holder_tax_id: Option<String>,
}

impl RawRow {
    fn read(row: &Row<'_>, dependent: bool) -> RepoResult<Self> {
        let (relationship, holder_tax_id): (Option<String>, Option<String>) = if dependent {
            (
                Some(row.get("relationship")?),
                Some(row.get("holder_tax_id")?),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            tax_id: row.get("tax_id")?,
            credential: row.get("credential")?,
            name: row.get("name")?,
            sex: row.get("sex")?,
            birth_date: row.get("birth_date")?,
            age: row.get("age")?,
            ans_bracket: row.get("ans_bracket")?,
            marital_status: row.get("marital_status")?,
            plan_tier: row.get("plan_tier")?,
            address: Address {
                postal_code: row.get("postal_code")?,
                neighborhood: row.get("neighborhood")?,
                city: row.get("city")?,
                state: row.get("state")?,
            },
            status: row.get("status")?,
            coverage_start: row.get("coverage_start")?,
            coverage_end: row.get("coverage_end")?,
            relationship,
            holder_tax_id,
        })
    }

    fn into_profile(self) -> RepoResult<PersonProfile> {
        Ok(PersonProfile {
            credential: self.credential,
            name: self.name,
            sex: parse_sex(self.sex, "sex")?,
            birth_date: self.birth_date,
            age: self.age,
            ans_bracket: self.ans_bracket,
            marital_status: self.marital_status,
            plan_tier: self.plan_tier,
            address: self.address,
            status: parse_status(self.status, "status")?,
            coverage_start: self.coverage_start,
            coverage_end: self.coverage_end,
        })
    }
}

fn classify_write_error(err: rusqlite::Error, kind: &str, tax_id: &str) -> RepoError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => {
            RepoError::Constraint(format!("{kind} {tax_id} rejected: {err}"))
        }
        _ => RepoError::from(err),
    }
}

fn holder_exists(tx: &Transaction<'_>, tax_id: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM holders WHERE tax_id = ?1);",
        [tax_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_sex(value: String, column: &str) -> RepoResult<Sex> {
    Sex::parse(&value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid sex `{value}` in {column}")))
}

fn parse_status(value: String, column: &str) -> RepoResult<InsuredStatus> {
    InsuredStatus::parse(&value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid status `{value}` in {column}")))
}

fn ensure_person_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["holders", "dependents"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for column in PROFILE_COLUMNS.iter().copied().chain(["coverage_end"]) {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    for column in ["relationship", "holder_tax_id"] {
        if !table_has_column(conn, "dependents", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "dependents",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
