//! Accounting module: balances and clinic-wide aggregates.
//!
//! Pure reductions over the raw billing records: no IO, no caching, no
//! running totals. Callers recompute on every read.

pub mod balance;
pub mod integrity;

pub use balance::{
    BalanceLabel, ClinicSummary, PatientBalance, ProviderTotals, clinic_summary,
    clinic_summary_for_branch, invoice_outstanding, patient_balance, provider_breakdown,
};
pub use integrity::{IntegrityIssue, IntegrityReport, check_integrity};
