use chrono::NaiveDate;
use ecoreg_core::{
    Address, Dependent, Holder, InsuredStatus, PersonProfile, PersonValidationError, Registry,
    RegistryConfig, RegistryError, Removal, RepoError, Sex,
};
use rusqlite::Connection;
use tempfile::TempDir;

const HOLDER_TAX_ID: &str = "12930888466";
const DEPENDENT_TAX_ID: &str = "21223344556";

#[test]
fn reference_scenario_inserts_lists_and_removes() {
    let (_dir, registry) = initialized_registry();

    registry.insert_holder(&julius()).unwrap();
    registry.insert_dependent(&maria()).unwrap();

    let report = registry.list_all().unwrap();
    assert_eq!(names(&report.holders), vec!["Julius Cesar"]);
    assert_eq!(report.dependents.len(), 1);
    assert_eq!(report.dependents[0].name, "Maria Silva");
    assert_eq!(report.dependents[0].holder_name, "Julius Cesar");
    assert_eq!(report.dependents[0].relationship, "Prima");

    assert_eq!(
        registry.remove_person(DEPENDENT_TAX_ID).unwrap(),
        Removal::Dependent
    );
    let report = registry.list_all().unwrap();
    assert_eq!(names(&report.holders), vec!["Julius Cesar"]);
    assert!(report.dependents.is_empty());

    assert_eq!(
        registry.remove_person(HOLDER_TAX_ID).unwrap(),
        Removal::Holder
    );
    let report = registry.list_all().unwrap();
    assert!(report.is_empty());
}

#[test]
fn inserted_holder_is_listed_exactly_once() {
    let (_dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();

    let report = registry.list_all().unwrap();
    let matches: Vec<_> = report
        .holders
        .iter()
        .filter(|holder| holder.tax_id == HOLDER_TAX_ID)
        .collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "Julius Cesar");
    assert_eq!(matches[0].status, InsuredStatus::Active);
}

#[test]
fn dependent_of_unknown_holder_is_reference_not_found() {
    let (dir, registry) = initialized_registry();

    let err = registry.insert_dependent(&maria()).unwrap_err();
    assert!(matches!(err, RegistryError::ReferenceNotFound(ref id) if id == HOLDER_TAX_ID));
    assert!(err.to_string().contains(HOLDER_TAX_ID));

    assert!(registry.list_all().unwrap().is_empty());
    assert_eq!(row_count(&dir, "holders"), 0);
    assert_eq!(row_count(&dir, "dependents"), 0);
}

#[test]
fn duplicate_holder_is_integrity_violation_and_keeps_one_row() {
    let (dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();

    let mut again = julius();
    again.profile.credential = "CRED777".to_string();
    again.profile.name = "Impostor".to_string();
    let err = registry.insert_holder(&again).unwrap_err();
    assert!(matches!(err, RegistryError::IntegrityViolation(_)));
    assert_eq!(err.code(), "INTEGRITY_VIOLATION");
    assert!(err.to_string().contains(HOLDER_TAX_ID));

    assert_eq!(row_count(&dir, "holders"), 1);
    let stored = registry.find_holder(HOLDER_TAX_ID).unwrap().unwrap();
    assert_eq!(stored.profile.name, "Julius Cesar");
}

#[test]
fn duplicate_dependent_credential_is_integrity_violation() {
    let (_dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();
    registry.insert_dependent(&maria()).unwrap();

    let mut twin = maria();
    twin.tax_id = "21223344557".to_string();
    let err = registry.insert_dependent(&twin).unwrap_err();
    assert!(matches!(err, RegistryError::IntegrityViolation(_)));
    assert_eq!(registry.dependents_of(HOLDER_TAX_ID).unwrap().len(), 1);
}

#[test]
fn duplicate_dependent_tax_id_is_integrity_violation() {
    let (dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();
    registry.insert_dependent(&maria()).unwrap();

    let mut again = maria();
    again.profile.credential = "CRED555".to_string();
    again.profile.name = "Maria Duplicada".to_string();
    let err = registry.insert_dependent(&again).unwrap_err();
    assert!(matches!(err, RegistryError::IntegrityViolation(_)));
    assert!(err.to_string().contains(DEPENDENT_TAX_ID));

    assert_eq!(row_count(&dir, "dependents"), 1);
    let stored = registry.find_dependent(DEPENDENT_TAX_ID).unwrap().unwrap();
    assert_eq!(stored.profile.name, "Maria Silva");
}

#[test]
fn holder_removal_cascades_to_every_dependent() {
    let (dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();
    for index in 0..4 {
        let mut dependent = maria();
        dependent.tax_id = format!("2122334455{index}");
        dependent.profile.credential = format!("DEP{index}");
        dependent.profile.name = format!("Child {index}");
        registry.insert_dependent(&dependent).unwrap();
    }
    assert_eq!(registry.dependents_of(HOLDER_TAX_ID).unwrap().len(), 4);

    assert_eq!(
        registry.remove_person(HOLDER_TAX_ID).unwrap(),
        Removal::Holder
    );

    assert!(registry.dependents_of(HOLDER_TAX_ID).unwrap().is_empty());
    assert!(registry.list_all().unwrap().dependents.is_empty());
    assert_eq!(row_count(&dir, "dependents"), 0);
}

#[test]
fn removing_unknown_tax_id_is_not_found_and_mutates_nothing() {
    let (dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();
    registry.insert_dependent(&maria()).unwrap();

    let err = registry.remove_person("00000000001").unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(ref id) if id == "00000000001"));
    assert_eq!(err.code(), "NOT_FOUND");

    assert_eq!(row_count(&dir, "holders"), 1);
    assert_eq!(row_count(&dir, "dependents"), 1);
}

#[test]
fn malformed_tax_ids_are_rejected_before_store_access() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never-created.db");
    let registry = Registry::new(RegistryConfig::new(&path));

    let mut holder = julius();
    holder.tax_id = "1293088846".to_string();
    let err = registry.insert_holder(&holder).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidInput(PersonValidationError::InvalidTaxId { field: "tax_id", .. })
    ));
    assert!(err.to_string().contains("1293088846"));

    let mut dependent = maria();
    dependent.holder_tax_id = "129.308.884-66".to_string();
    let err = registry.insert_dependent(&dependent).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidInput(PersonValidationError::InvalidTaxId {
            field: "holder_tax_id",
            ..
        })
    ));

    let err = registry.remove_person("abc").unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");

    assert!(!path.exists(), "invalid input must not open the store");
}

#[test]
fn invalid_coverage_range_is_invalid_input() {
    let (dir, registry) = initialized_registry();
    let mut holder = julius();
    holder.profile.coverage_end = Some(date(2024, 1, 1));

    let err = registry.insert_holder(&holder).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidInput(PersonValidationError::CoverageEndsBeforeStart { .. })
    ));
    assert_eq!(row_count(&dir, "holders"), 0);
}

#[test]
fn tax_id_shared_across_tables_is_integrity_violation() {
    let (_dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();
    registry.insert_dependent(&maria()).unwrap();

    let mut holder = julius();
    holder.tax_id = DEPENDENT_TAX_ID.to_string();
    holder.profile.credential = "CRED900".to_string();
    let err = registry.insert_holder(&holder).unwrap_err();
    assert!(matches!(err, RegistryError::IntegrityViolation(_)));

    let report = registry.list_all().unwrap();
    assert_eq!(report.holders.len(), 1);
    assert_eq!(report.dependents.len(), 1);
}

#[test]
fn schema_initialization_is_idempotent_and_keeps_data() {
    let (_dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();

    registry.initialize_schema().unwrap();
    registry.initialize_schema().unwrap();

    assert_eq!(registry.list_all().unwrap().holders.len(), 1);
}

#[test]
fn operations_on_uninitialized_store_are_store_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.db");
    drop(Connection::open(&path).unwrap());
    let registry = Registry::new(RegistryConfig::new(&path));

    let err = registry.insert_holder(&julius()).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Store(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
    assert_eq!(err.code(), "STORE_ERROR");

    assert!(matches!(
        registry.list_all(),
        Err(RegistryError::Store(_))
    ));
}

#[test]
fn operations_on_missing_store_leave_no_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typo.db");
    let registry = Registry::new(RegistryConfig::new(&path));

    assert!(matches!(
        registry.list_all(),
        Err(RegistryError::Store(RepoError::Db(_)))
    ));
    assert!(matches!(
        registry.remove_person(HOLDER_TAX_ID),
        Err(RegistryError::Store(_))
    ));
    assert!(matches!(
        registry.insert_holder(&julius()),
        Err(RegistryError::Store(_))
    ));
    assert!(matches!(
        registry.dependents_of(HOLDER_TAX_ID),
        Err(RegistryError::Store(_))
    ));
    assert!(matches!(
        registry.find_holder(HOLDER_TAX_ID),
        Err(RegistryError::Store(_))
    ));

    assert!(!path.exists(), "failed operations must not create the store");
}

#[test]
fn schema_initialization_reports_unreachable_store() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(RegistryConfig::new(
        dir.path().join("missing-dir").join("eco.db"),
    ));

    let err = registry.initialize_schema().unwrap_err();
    assert!(matches!(err, RegistryError::Store(RepoError::Db(_))));
}

#[test]
fn find_operations_return_full_records() {
    let (_dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();
    registry.insert_dependent(&maria()).unwrap();

    assert_eq!(registry.find_holder(HOLDER_TAX_ID).unwrap(), Some(julius()));
    assert_eq!(
        registry.find_dependent(DEPENDENT_TAX_ID).unwrap(),
        Some(maria())
    );
    assert_eq!(registry.find_dependent(HOLDER_TAX_ID).unwrap(), None);
    assert!(matches!(
        registry.find_holder("x"),
        Err(RegistryError::InvalidInput(_))
    ));
}

#[test]
fn report_serializes_with_snake_case_enums() {
    let (_dir, registry) = initialized_registry();
    registry.insert_holder(&julius()).unwrap();

    let json = serde_json::to_value(registry.list_all().unwrap()).unwrap();
    assert_eq!(json["holders"][0]["name"], "Julius Cesar");
    assert_eq!(json["holders"][0]["sex"], "M");
    assert_eq!(json["holders"][0]["status"], "active");
    assert_eq!(json["dependents"], serde_json::json!([]));
}

#[test]
fn holder_deserializes_with_default_status() {
    let holder: Holder = serde_json::from_value(serde_json::json!({
        "tax_id": HOLDER_TAX_ID,
        "credential": "CRED001",
        "name": "Julius Cesar",
        "sex": "M",
        "birth_date": "2001-05-10",
        "age": 24,
        "ans_bracket": "Adulto",
        "marital_status": "Solteiro",
        "plan_tier": "Ouro",
        "postal_code": "12345678",
        "neighborhood": "Timbi",
        "city": "Camaragibe",
        "state": "PE",
        "coverage_start": "2025-01-01",
        "coverage_end": null
    }))
    .unwrap();
    assert_eq!(holder, julius());
}

#[test]
fn validate_tax_id_is_exposed_on_registry() {
    assert!(Registry::validate_tax_id("00000000000"));
    assert!(!Registry::validate_tax_id("0000000000"));
}

fn initialized_registry() -> (TempDir, Registry) {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::new(RegistryConfig::new(dir.path().join("eco.db")));
    registry.initialize_schema().unwrap();
    (dir, registry)
}

fn row_count(dir: &TempDir, table: &str) -> i64 {
    let conn = Connection::open(dir.path().join("eco.db")).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn names(holders: &[ecoreg_core::HolderSummary]) -> Vec<&str> {
    holders.iter().map(|holder| holder.name.as_str()).collect()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn address() -> Address {
    Address {
        postal_code: "12345678".to_string(),
        neighborhood: "Timbi".to_string(),
        city: "Camaragibe".to_string(),
        state: "PE".to_string(),
    }
}

fn julius() -> Holder {
    Holder {
        tax_id: HOLDER_TAX_ID.to_string(),
        profile: PersonProfile {
            credential: "CRED001".to_string(),
            name: "Julius Cesar".to_string(),
            sex: Sex::M,
            birth_date: date(2001, 5, 10),
            age: 24,
            ans_bracket: "Adulto".to_string(),
            marital_status: "Solteiro".to_string(),
            plan_tier: "Ouro".to_string(),
            address: address(),
            status: InsuredStatus::Active,
            coverage_start: date(2025, 1, 1),
            coverage_end: None,
        },
    }
}

fn maria() -> Dependent {
    Dependent {
        tax_id: DEPENDENT_TAX_ID.to_string(),
        holder_tax_id: HOLDER_TAX_ID.to_string(),
        relationship: "Prima".to_string(),
        profile: PersonProfile {
            credential: "CRED002".to_string(),
            name: "Maria Silva".to_string(),
            sex: Sex::F,
            birth_date: date(2012, 3, 20),
            age: 13,
            ans_bracket: "Infantil".to_string(),
            marital_status: "Solteiro".to_string(),
            plan_tier: "Ouro".to_string(),
            address: address(),
            status: InsuredStatus::Active,
            coverage_start: date(2025, 1, 1),
            coverage_end: None,
        },
    }
}
