use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rentflow::application::billing::BillingEngine;
use rentflow::application::importer::PaymentImporter;
use rentflow::domain::lease::Lease;
use rentflow::domain::ports::{
    BillingStoreBox, ImportStoreBox, LeaseStoreBox, TenantStoreBox,
};
use rentflow::domain::tenant::Tenant;
use rentflow::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use rentflow::infrastructure::rocksdb::RocksDbStore;
use rentflow::interfaces::csv::feed_reader::PaymentFeedReader;
use rentflow::interfaces::csv::records::{RecordReader, RecordWriter};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB
    /// so the generate/review/finalize workflow can span invocations.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate draft invoices for the current billing month
    Generate {
        /// Lease roster CSV to load before generating
        #[arg(long)]
        leases: Option<PathBuf>,
    },
    /// Print the draft invoices of a generation run as CSV
    Review {
        log_id: u64,
    },
    /// Edit one draft invoice's line amounts
    Amend {
        pending_id: u64,
        #[arg(long)]
        rent: Decimal,
        #[arg(long, default_value = "0")]
        service_charge: Decimal,
        #[arg(long, default_value = "0")]
        utilities: Decimal,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Convert a generation run's drafts into final invoices
    Finalize {
        log_id: u64,
    },
    /// Parse a payment feed and match each row against the tenant roster
    Import {
        feed: PathBuf,
        /// Tenant roster CSV to load before matching
        #[arg(long)]
        tenants: Option<PathBuf>,
    },
}

struct Stores {
    leases: LeaseStoreBox,
    billing: BillingStoreBox,
    tenants: TenantStoreBox,
    imports: ImportStoreBox,
}

fn open_stores(db_path: Option<&Path>) -> Result<Stores> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDbStore::open(path).into_diagnostic()?;
            Ok(Stores {
                leases: Box::new(store.clone()),
                billing: Box::new(store.clone()),
                tenants: Box::new(store.clone()),
                imports: Box::new(store),
            })
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette::miette!(
            "this build has no persistent storage; rebuild with --features storage-rocksdb"
        )),
        None => {
            let store = InMemoryStore::new();
            Ok(Stores {
                leases: Box::new(store.clone()),
                billing: Box::new(store.clone()),
                tenants: Box::new(store.clone()),
                imports: Box::new(store),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let stores = open_stores(cli.db_path.as_deref())?;

    match cli.command {
        Command::Generate { leases } => {
            if let Some(path) = leases {
                let file = File::open(path).into_diagnostic()?;
                let rows: Vec<Lease> = RecordReader::new(file).collect_all().into_diagnostic()?;
                stores.leases.insert_leases(rows).await.into_diagnostic()?;
            }

            let engine = BillingEngine::new(stores.leases, stores.billing);
            let outcome = engine.generate_for_current_period().await.into_diagnostic()?;
            match outcome.log_id {
                Some(log_id) => println!(
                    "generated {} draft invoices across {} leases (log {})",
                    outcome.invoices_generated, outcome.properties_affected, log_id
                ),
                None => println!("no active leases, nothing generated"),
            }
        }
        Command::Review { log_id } => {
            let engine = BillingEngine::new(stores.leases, stores.billing);
            let drafts = engine.pending_for_log(log_id).await.into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = RecordWriter::new(stdout.lock());
            writer.write_all(drafts).into_diagnostic()?;
        }
        Command::Amend {
            pending_id,
            rent,
            service_charge,
            utilities,
            notes,
        } => {
            let engine = BillingEngine::new(stores.leases, stores.billing);
            let draft = engine
                .amend_pending(pending_id, rent, service_charge, utilities, notes)
                .await
                .into_diagnostic()?;
            println!(
                "draft {} amended, new total {}",
                draft.invoice_number, draft.total_amount
            );
        }
        Command::Finalize { log_id } => {
            let engine = BillingEngine::new(stores.leases, stores.billing);
            let outcome = engine.finalize(log_id).await.into_diagnostic()?;
            println!("finalized {} invoices from log {}", outcome.invoices_finalized, log_id);
        }
        Command::Import { feed, tenants } => {
            if let Some(path) = tenants {
                let file = File::open(path).into_diagnostic()?;
                let rows: Vec<Tenant> = RecordReader::new(file).collect_all().into_diagnostic()?;
                stores.tenants.insert_tenants(rows).await.into_diagnostic()?;
            }

            let filename = feed
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let file_type = feed
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "csv".to_string());

            let file = File::open(&feed).into_diagnostic()?;
            let payments = PaymentFeedReader::new(file).payments().into_diagnostic()?;

            let importer = PaymentImporter::new(stores.tenants, stores.imports);
            let upload_id = importer
                .register_upload(&filename, &file_type)
                .await
                .into_diagnostic()?;
            let summary = importer
                .process_upload(upload_id, payments)
                .await
                .into_diagnostic()?;

            let rows = importer
                .results_for_upload(upload_id)
                .await
                .into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = RecordWriter::new(stdout.lock());
            writer.write_all(rows).into_diagnostic()?;

            println!(
                "upload {}: {} rows, {} matched, {} unmatched",
                upload_id, summary.total, summary.matched, summary.unmatched
            );
        }
    }

    Ok(())
}
