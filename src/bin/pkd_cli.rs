//! Command-line driver for the ICAO PKD local mirror: ingest a file,
//! run Passive Authentication against a SOD, or trigger reconciliation —
//! each backed by the same `Store`/`Pipeline`/`verification` machinery the
//! HTTP surface (external, not part of this crate) would call.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use icao_pkd_mirror::config::Config;
use icao_pkd_mirror::ingestion::Pipeline;
use icao_pkd_mirror::ldap::pool::build_pool as build_ldap_pool;
use icao_pkd_mirror::ldap::ReconciliationEngine;
use icao_pkd_mirror::models::reconciliation::TriggerSource;
use icao_pkd_mirror::models::upload::UploadFormat;
use icao_pkd_mirror::store::Store;
use icao_pkd_mirror::verification::{self, PaRequest};

#[derive(Parser)]
#[command(name = "pkd_cli", about = "ICAO PKD local mirror command-line driver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a file (LDIF, ML, PEM, DER, P7B, or CRL) through the pipeline.
    Ingest {
        file: PathBuf,
        /// One of LDIF, ML, PEM, DER, P7B, CRL.
        format: String,
        /// Also mirror newly persisted rows into LDAP.
        #[arg(long)]
        with_ldap: bool,
    },
    /// Run Passive Authentication against a SOD file, optionally with DG files.
    Verify {
        sod: PathBuf,
        /// `DG<n>=<path>` pairs, e.g. `DG1=dg1.bin DG2=dg2.bin`.
        #[arg(long = "dg", value_parser = parse_dg_arg)]
        data_groups: Vec<(u8, PathBuf)>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        document_number: Option<String>,
    },
    /// Run one reconciliation pass (DB → LDAP).
    Reconcile {
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_dg_arg(s: &str) -> Result<(u8, PathBuf), String> {
    let (name, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected DG<n>=<path>, got {s}"))?;
    let digits = name.trim_start_matches("DG").trim_start_matches("dg");
    let dg_number: u8 = digits.parse().map_err(|_| format!("invalid DG number in {name}"))?;
    Ok((dg_number, PathBuf::from(path)))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::from_env();

    let store = match Store::new(&config.db_path, config.db_pool_size) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to open Trust Store: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Ingest { file, format, with_ldap } => run_ingest(&store, &config, &file, &format, with_ldap),
        Command::Verify {
            sod,
            data_groups,
            country,
            document_number,
        } => run_verify(&store, &sod, &data_groups, country, document_number),
        Command::Reconcile { dry_run } => run_reconcile(&store, &config, dry_run),
    }
}

fn run_ingest(store: &Store, config: &Config, file: &PathBuf, format: &str, with_ldap: bool) {
    let format = match UploadFormat::from_str(&format.to_uppercase()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let bytes = match fs::read(file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to read {}: {e}", file.display());
            std::process::exit(1);
        }
    };

    let ldap_pool = if with_ldap {
        match build_ldap_pool(
            &config.ldap_url,
            &config.ldap_bind_dn,
            &config.ldap_bind_password,
            config.ldap_pool_size,
        ) {
            Ok(pool) => Some(pool),
            Err(e) => {
                eprintln!("failed to connect to LDAP, continuing without mirroring: {e}");
                None
            }
        }
    } else {
        None
    };

    let pipeline = Pipeline::new(store, ldap_pool.as_ref(), config.ldap_root_base.clone());
    match pipeline.ingest_auto(&bytes, format, None) {
        Ok(outcome) => {
            println!("===============================================");
            println!("      INGESTION REPORT");
            println!("===============================================");
            println!("  Upload ID: {}", outcome.upload_id);
            println!("  Status: {:?}", outcome.status);
            println!("  CSCA: {}", outcome.counts.csca_count);
            println!("  DSC: {}", outcome.counts.dsc_count);
            println!("  DSC (NC): {}", outcome.counts.dsc_nc_count);
            println!("  MLSC: {}", outcome.counts.mlsc_count);
            println!("  CRL: {}", outcome.counts.crl_count);
            println!("  Duplicates: {}", outcome.counts.duplicate_count);
            println!("  Valid: {}", outcome.counts.valid_count);
            println!("  Invalid: {}", outcome.counts.invalid_count);
        }
        Err(e) => {
            eprintln!("ingestion failed ({}): {e}", e.code());
            std::process::exit(1);
        }
    }
}

fn run_verify(
    store: &Store,
    sod_path: &PathBuf,
    data_group_args: &[(u8, PathBuf)],
    country: Option<String>,
    document_number: Option<String>,
) {
    let sod_bytes = match fs::read(sod_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to read {}: {e}", sod_path.display());
            std::process::exit(1);
        }
    };

    let mut data_groups = BTreeMap::new();
    for (dg_number, path) in data_group_args {
        match fs::read(path) {
            Ok(bytes) => {
                data_groups.insert(*dg_number, bytes);
            }
            Err(e) => {
                eprintln!("failed to read DG{dg_number} at {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }

    let request = PaRequest {
        sod_bytes: &sod_bytes,
        data_groups: &data_groups,
        document_number,
        country_hint: country,
    };

    let record = verification::verify_and_persist(&request, store);

    println!("===============================================");
    println!("      PASSIVE AUTHENTICATION REPORT");
    println!("===============================================");
    println!("  Verification ID: {}", record.id);
    println!("  Status: {}", record.status);
    println!("  Issuing Country: {}", record.issuing_country);
    println!("  SOD Signature Valid: {}", record.sod_signature_valid);
    println!(
        "  Data Groups: {}/{} valid",
        record.valid_groups, record.total_groups
    );
    for (dg, result) in &record.dg_results {
        println!(
            "    DG{dg}: {}",
            if result.valid {
                "PASS"
            } else if result.declared_hash_missing {
                "FAIL (no declared hash)"
            } else {
                "FAIL (hash mismatch)"
            }
        );
    }
    if let Some(chain) = &record.chain_result {
        println!("  Chain: {}", chain.chain_path);
        println!("  Trust Chain Valid: {}", chain.valid);
        println!("  CRL Status: {}", chain.crl_status);
    }
    if let Some(msg) = &record.error_message {
        println!("  Error: {msg}");
    }
    if let Some(msg) = &record.dg_hashes_message {
        println!("  Note: {msg}");
    }
    if let Some(msg) = &record.expiration_message {
        println!("  Note: {msg}");
    }
}

fn run_reconcile(store: &Store, config: &Config, dry_run: bool) {
    let ldap_pool = match build_ldap_pool(
        &config.ldap_url,
        &config.ldap_bind_dn,
        &config.ldap_bind_password,
        config.ldap_pool_size,
    ) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("failed to connect to LDAP: {e}");
            std::process::exit(1);
        }
    };

    let engine = ReconciliationEngine::new(ldap_pool, config.ldap_root_base.clone());
    match engine.run(store, TriggerSource::Manual, dry_run, config.max_reconcile_batch_size) {
        Ok(result) => {
            println!("===============================================");
            println!("      RECONCILIATION REPORT");
            println!("===============================================");
            println!("  Summary ID: {}", result.summary_id);
            println!("  Status: {}", result.status);
            println!("  CSCA added: {}", result.counts.csca_added);
            println!("  DSC added: {}", result.counts.dsc_added);
            println!("  CRL added: {}", result.counts.crl_added);
            println!("  Failed: {}", result.counts.failed_count);
            println!("  Duration: {} ms", result.duration_ms);
        }
        Err(e) => {
            eprintln!("reconciliation failed: {e}");
            std::process::exit(1);
        }
    }
}
