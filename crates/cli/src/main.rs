use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use clinicledger_accounting::{BalanceLabel, ClinicSummary, PatientBalance};
use clinicledger_core::{BranchId, PatientId, RecordId, format_money};
use clinicledger_infra::{
    AuditLog, JsonFileRecordStore, JsonLinesAuditLog, LedgerConfig, LedgerGateway, LedgerViews,
};
use clinicledger_observability::LogFormat;

#[derive(Parser)]
#[command(name = "clinicledger")]
#[command(about = "Clinic billing ledger: balances, treatment history and record maintenance")]
struct Cli {
    /// Data directory holding ledger.json (overrides CLINIC_LEDGER_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log format: json or pretty (overrides CLINIC_LEDGER_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clinic-wide totals
    Summary {
        /// Restrict to one branch
        #[arg(long)]
        branch: Option<String>,
    },
    /// Outstanding balance for a patient
    Balance {
        patient_id: String,
    },
    /// Treatment history with billing status for a patient
    TreatmentLog {
        patient_id: String,
        /// Also list invoice lines no progress note accounts for
        #[arg(long)]
        unmatched: bool,
    },
    /// Raw billing records in store order
    Records {
        #[arg(long)]
        patient: Option<String>,
    },
    /// Invoiced/collected totals per provider
    Providers,
    /// Soft-invariant violations and orphaned receipts
    Integrity,
    /// Audit trail, oldest first
    Audit,
    /// Void a billing record
    Void {
        record_id: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BalanceView {
    #[serde(flatten)]
    balance: PatientBalance,
    label: BalanceLabel,
    display_amount: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryView {
    total_collected: String,
    total_invoiced: String,
    net_outstanding: String,
    net_outstanding_label: &'static str,
    total_overdue: String,
}

impl From<ClinicSummary> for SummaryView {
    fn from(summary: ClinicSummary) -> Self {
        Self {
            total_collected: format_money(summary.total_collected),
            total_invoiced: format_money(summary.total_invoiced),
            net_outstanding: format_money(summary.net_outstanding.abs()),
            net_outstanding_label: summary.net_outstanding_label(),
            total_overdue: format_money(summary.total_overdue),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_id<T>(raw: &str, what: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().with_context(|| format!("invalid {what}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = LedgerConfig::from_env().context("reading ledger configuration")?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(format) = cli.log_format {
        config = config.with_log_format(format);
    }
    clinicledger_observability::init(config.log_format(), config.log_filter());

    let store = Arc::new(
        JsonFileRecordStore::in_dir(config.data_dir())
            .with_context(|| format!("opening ledger in {}", config.data_dir().display()))?,
    );
    let audit = Arc::new(JsonLinesAuditLog::new(config.audit_log_path()));
    let views = LedgerViews::new(store.clone());

    match cli.command {
        Commands::Summary { branch } => {
            let summary = match branch {
                Some(branch) => views.clinic_summary_for_branch(&parse_id::<BranchId>(&branch, "branch id")?)?,
                None => views.clinic_summary()?,
            };
            print_json(&SummaryView::from(summary))?;
        }
        Commands::Balance { patient_id } => {
            let balance = views.patient_balance(&parse_id::<PatientId>(&patient_id, "patient id")?)?;
            print_json(&BalanceView {
                label: balance.label(),
                display_amount: format_money(balance.display_amount()),
                balance,
            })?;
        }
        Commands::TreatmentLog {
            patient_id,
            unmatched,
        } => {
            let patient_id = parse_id::<PatientId>(&patient_id, "patient id")?;
            if unmatched {
                print_json(&views.reconciliation(&patient_id)?)?;
            } else {
                print_json(&views.treatment_log(&patient_id)?)?;
            }
        }
        Commands::Records { patient } => {
            let patient = patient
                .as_deref()
                .map(|p| parse_id::<PatientId>(p, "patient id"))
                .transpose()?;
            print_json(&views.records(patient.as_ref())?)?;
        }
        Commands::Providers => print_json(&views.provider_breakdown()?)?,
        Commands::Integrity => {
            let report = views.integrity()?;
            print_json(&report)?;
            if !report.is_clean() {
                std::process::exit(2);
            }
        }
        Commands::Audit => print_json(&audit.entries()?)?,
        Commands::Void { record_id } => {
            let gateway = LedgerGateway::new(store, audit, config.actor().clone());
            let outcome = gateway
                .void_record(&parse_id::<RecordId>(&record_id, "record id")?)
                .with_context(|| format!("voiding {record_id}"))?;
            tracing::info!(
                record_id = %outcome.record.id,
                amount = %format_money(outcome.record.amount),
                "record voided from the command line"
            );
            print_json(&outcome)?;
        }
    }

    Ok(())
}
