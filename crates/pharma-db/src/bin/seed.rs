//! # Seed Data Generator
//!
//! Populates the database with catalog entries and inventory for development.
//!
//! ## Usage
//! ```bash
//! # Seed 200 drugs (default)
//! cargo run -p pharma-db --bin seed
//!
//! # Seed a custom amount
//! cargo run -p pharma-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p pharma-db --bin seed -- --db ./data/pharmacy.db
//! ```
//!
//! ## Generated Data
//! Every drug gets a catalog entry and an inventory record. Every third
//! drug also gets strip and blister alternate forms; a few are seeded
//! already expired or empty so the flagged panel has something to show.

use chrono::{Duration, Utc};
use std::env;

use pharma_core::{
    AlternateFormInput, DrugCategory, DrugIdentity, InventoryInput, Money, PackagingType,
    StockStatus,
};
use pharma_db::{Database, DbConfig};

/// Base drug names, combined with strengths below.
const DRUGS: &[(&str, DrugCategory, &[&str])] = &[
    ("Paracetamol", DrugCategory::Analgesic, &["pain", "fever"]),
    ("Ibuprofen", DrugCategory::Analgesic, &["pain", "inflammation"]),
    ("Amoxicillin", DrugCategory::Antibiotic, &["infection"]),
    ("Ciprofloxacin", DrugCategory::Antibiotic, &["infection"]),
    ("Fluconazole", DrugCategory::Antifungal, &["fungal infection"]),
    ("Loratadine", DrugCategory::Antihistamine, &["allergy"]),
    ("Amlodipine", DrugCategory::Antihypertensive, &["blood pressure"]),
    ("Artemether", DrugCategory::Antimalarial, &["malaria"]),
    ("Metformin", DrugCategory::Antidiabetic, &["diabetes"]),
    ("Acyclovir", DrugCategory::Antiviral, &["herpes"]),
    ("Omeprazole", DrugCategory::Gastrointestinal, &["ulcer", "reflux"]),
    ("Salbutamol", DrugCategory::Respiratory, &["asthma"]),
    ("Vitamin C", DrugCategory::Supplement, &["immunity"]),
    ("Hydrocortisone", DrugCategory::Topical, &["rash", "itch"]),
];

const STRENGTHS: &[&str] = &["100mg", "250mg", "500mg", "1g"];

const PRIMARY_PACKAGING: &[PackagingType] = &[
    PackagingType::Carton,
    PackagingType::Bottle,
    PackagingType::Tube,
    PackagingType::Inhaler,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./pharmacy_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Pharma POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of drugs to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./pharmacy_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Pharma POS Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Drugs:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.inventory().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} inventory records", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    for seed in 0..count {
        let (identity, input) = generate_drug(seed);

        if let Err(e) = db.catalog().insert(&identity).await {
            eprintln!("Failed to insert catalog entry {}: {}", identity.id, e);
            continue;
        }
        if let Err(e) = db.inventory().upsert(&input).await {
            eprintln!("Failed to insert inventory for {}: {}", identity.id, e);
            continue;
        }

        generated += 1;
        if generated % 50 == 0 {
            println!("  Generated {} drugs...", generated);
        }
    }

    println!();
    println!("✓ Generated {} drugs in {:?}", generated, start.elapsed());

    let flagged = db.inventory().list_flagged(Utc::now()).await?;
    let expired = flagged
        .iter()
        .filter(|f| f.status == StockStatus::Expired)
        .count();
    println!(
        "  Flagged: {} ({} expired, {} out of stock)",
        flagged.len(),
        expired,
        flagged.len() - expired
    );

    let hits = db.catalog().search("para", 10).await?;
    println!("  Search 'para': {} results", hits.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one catalog entry and its inventory payload.
fn generate_drug(seed: usize) -> (DrugIdentity, InventoryInput) {
    let (base, category, uses) = DRUGS[seed % DRUGS.len()];
    let strength = STRENGTHS[(seed / DRUGS.len()) % STRENGTHS.len()];
    let drug_id = format!("DRUG-{:05}", seed);

    let identity = DrugIdentity {
        id: drug_id.clone(),
        name: format!("{} {} #{}", base, strength, seed),
        image_url: None,
        uses: uses.iter().map(|u| u.to_string()).collect(),
    };

    // $1.50 - $25.49
    let price_cents = 150 + ((seed * 37) % 2400) as i64;
    let cost_cents = price_cents * (55 + (seed % 25) as i64) / 100;

    // Every 17th drug is empty, every 23rd has already expired.
    let quantity = if seed % 17 == 0 { 0 } else { (seed % 60) as i64 + 1 };
    let expires_in_days = if seed % 23 == 0 { -30 } else { 90 + (seed % 700) as i64 };
    let expiration_date = (Utc::now() + Duration::days(expires_in_days))
        .date_naive()
        .to_string();

    let alternate_forms = if seed % 3 == 0 {
        vec![
            AlternateFormInput {
                packaging_type: PackagingType::Strip,
                selling_price: Money::from_cents(price_cents / 5),
                quantity: quantity * 5,
            },
            AlternateFormInput {
                packaging_type: PackagingType::Blister,
                selling_price: Money::from_cents(price_cents / 10),
                quantity: quantity * 10,
            },
        ]
    } else {
        Vec::new()
    };

    let input = InventoryInput {
        drug_identity_id: drug_id,
        supplier_id: format!("SUP-{:02}", seed % 12),
        category,
        packaging_type: PRIMARY_PACKAGING[seed % PRIMARY_PACKAGING.len()],
        cost_price: Money::from_cents(cost_cents),
        selling_price: Money::from_cents(price_cents),
        quantity,
        expiration_date,
        can_have_alternate_forms: !alternate_forms.is_empty(),
        alternate_forms,
    };

    (identity, input)
}
