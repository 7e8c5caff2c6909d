//! CLI demo entry point.
//!
//! # Responsibility
//! - Wire config, logging and the registry from the environment.
//! - Run the reference scenario and print console output for each step.

use chrono::NaiveDate;
use ecoreg_core::{
    init_logging, Address, Dependent, Holder, InsuredStatus, LogSettings, PersonProfile, Registry,
    RegistryConfig, Sex,
};
use log::warn;
use std::process::ExitCode;

const HOLDER_TAX_ID: &str = "12930888466";
const DEPENDENT_TAX_ID: &str = "21223344556";

fn main() -> ExitCode {
    if let Some(settings) = LogSettings::from_env() {
        if let Err(err) = init_logging(&settings.level, &settings.log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let config = RegistryConfig::from_env();
    println!(
        "ecoreg_core version={} store={}",
        ecoreg_core::core_version(),
        config.db_path().display()
    );
    let registry = Registry::new(config);

    if let Err(err) = registry.initialize_schema() {
        eprintln!("Failed to create tables: {err}");
        return ExitCode::FAILURE;
    }
    println!("Tables ready.");

    let holder = demo_holder();
    match registry.insert_holder(&holder) {
        Ok(()) => println!("Holder '{}' inserted.", holder.profile.name),
        Err(err) => println!("Holder not inserted: {err}"),
    }

    let dependent = demo_dependent();
    match registry.insert_dependent(&dependent) {
        Ok(()) => println!("Dependent '{}' inserted.", dependent.profile.name),
        Err(err) => println!("Dependent not inserted: {err}"),
    }

    print_listing(&registry);
    remove(&registry, DEPENDENT_TAX_ID);
    print_listing(&registry);
    remove(&registry, HOLDER_TAX_ID);
    print_listing(&registry);

    ExitCode::SUCCESS
}

fn remove(registry: &Registry, tax_id: &str) {
    match registry.remove_person(tax_id) {
        Ok(removal) => println!("{}", removal.describe(tax_id)),
        Err(err) => println!("Removal failed: {err}"),
    }
}

fn print_listing(registry: &Registry) {
    match registry.list_all() {
        Ok(report) => print!("\n{report}"),
        Err(err) => {
            warn!("event=cli_list module=cli status=error error_code={}", err.code());
            println!("Listing failed: {err}");
        }
    }
}

fn demo_holder() -> Holder {
    Holder {
        tax_id: HOLDER_TAX_ID.to_string(),
        profile: PersonProfile {
            credential: "CRED001".to_string(),
            name: "Julius Cesar".to_string(),
            sex: Sex::M,
            birth_date: ymd(2001, 5, 10),
            age: 24,
            ans_bracket: "Adulto".to_string(),
            marital_status: "Solteiro".to_string(),
            plan_tier: "Ouro".to_string(),
            address: timbi_address(),
            status: InsuredStatus::Active,
            coverage_start: ymd(2025, 1, 1),
            coverage_end: None,
        },
    }
}

fn demo_dependent() -> Dependent {
    Dependent {
        tax_id: DEPENDENT_TAX_ID.to_string(),
        holder_tax_id: HOLDER_TAX_ID.to_string(),
        relationship: "Prima".to_string(),
        profile: PersonProfile {
            credential: "CRED002".to_string(),
            name: "Maria Silva".to_string(),
            sex: Sex::F,
            birth_date: ymd(2012, 3, 20),
            age: 13,
            ans_bracket: "Infantil".to_string(),
            marital_status: "Solteiro".to_string(),
            plan_tier: "Ouro".to_string(),
            address: timbi_address(),
            status: InsuredStatus::Active,
            coverage_start: ymd(2025, 1, 1),
            coverage_end: None,
        },
    }
}

fn timbi_address() -> Address {
    Address {
        postal_code: "12345678".to_string(),
        neighborhood: "Timbi".to_string(),
        city: "Camaragibe".to_string(),
        state: "PE".to_string(),
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
