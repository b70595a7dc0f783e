//! Read-only views over the record store.
//!
//! Every call reads the current store contents and recomputes from raw
//! records; nothing is cached between calls.

use clinicledger_accounting::{
    ClinicSummary, IntegrityReport, PatientBalance, ProviderTotals, check_integrity,
    clinic_summary, clinic_summary_for_branch, patient_balance, provider_breakdown,
};
use clinicledger_billing::BillingRecord;
use clinicledger_core::{BranchId, PatientId};
use clinicledger_reconciliation::{Reconciliation, TreatmentLogEntry, reconcile};

use crate::store::{RecordStore, StoreError};

#[derive(Debug)]
pub struct LedgerViews<S> {
    store: S,
}

impl<S> LedgerViews<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: RecordStore> LedgerViews<S> {
    pub fn patient_balance(&self, patient_id: &PatientId) -> Result<PatientBalance, StoreError> {
        let records = self.store.list_by_patient(patient_id)?;
        let balance = patient_balance(patient_id, &records);
        tracing::debug!(%patient_id, outstanding = %balance.outstanding, "patient balance computed");
        Ok(balance)
    }

    pub fn clinic_summary(&self) -> Result<ClinicSummary, StoreError> {
        Ok(clinic_summary(&self.store.list_all()?))
    }

    pub fn clinic_summary_for_branch(&self, branch_id: &BranchId) -> Result<ClinicSummary, StoreError> {
        Ok(clinic_summary_for_branch(&self.store.list_all()?, branch_id))
    }

    pub fn provider_breakdown(&self) -> Result<Vec<ProviderTotals>, StoreError> {
        Ok(provider_breakdown(&self.store.list_all()?))
    }

    /// Treatment history for one patient, newest first.
    pub fn treatment_log(&self, patient_id: &PatientId) -> Result<Vec<TreatmentLogEntry>, StoreError> {
        Ok(self.reconciliation(patient_id)?.entries)
    }

    /// Treatment history plus the invoice lines no note accounts for.
    pub fn reconciliation(&self, patient_id: &PatientId) -> Result<Reconciliation, StoreError> {
        let notes = self.store.list_notes_by_patient(patient_id)?;
        let records = self.store.list_by_patient(patient_id)?;
        let rec = reconcile(patient_id, &notes, &records);
        tracing::debug!(
            %patient_id,
            entries = rec.entries.len(),
            unmatched_lines = rec.unmatched_lines.len(),
            "treatment log reconciled"
        );
        Ok(rec)
    }

    /// Raw records, optionally for one patient, in store order.
    pub fn records(&self, patient_id: Option<&PatientId>) -> Result<Vec<BillingRecord>, StoreError> {
        match patient_id {
            Some(id) => self.store.list_by_patient(id),
            None => self.store.list_all(),
        }
    }

    pub fn integrity(&self) -> Result<IntegrityReport, StoreError> {
        let report = check_integrity(&self.store.list_all()?);
        if !report.is_clean() {
            tracing::warn!(issues = report.issues.len(), "ledger integrity issues found");
        }
        Ok(report)
    }
}
