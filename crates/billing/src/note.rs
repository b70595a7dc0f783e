use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use clinicledger_core::{
    BranchId, DomainError, DomainResult, Entity, Money, NoteId, PatientId, ProviderId, RecordId,
    ensure_non_negative,
};

use crate::record::{BillingRecord, LineItem, PatientRef};

/// Clinical progress note as charted by the treating dentist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressNote {
    pub id: NoteId,
    pub patient_id: PatientId,
    pub branch_id: BranchId,
    pub date: NaiveDate,
    pub dentist_name: String,
    pub treatment_performed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooth_number: Option<String>,
    #[serde(default)]
    pub clinical_notes: String,
    #[serde(default)]
    pub plan: String,
    /// Fee associated with the treatment at time of charting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
}

impl ProgressNote {
    /// Amount to bill for this note, if any (absent and zero fees are not billed).
    pub fn billable_amount(&self) -> Option<Money> {
        self.amount.filter(|a| *a > Money::ZERO)
    }

    pub fn check_well_formed(&self) -> DomainResult<()> {
        if self.id.is_blank() {
            return Err(DomainError::invalid_id("note id must not be blank"));
        }
        if self.patient_id.is_blank() {
            return Err(DomainError::invalid_id(format!(
                "note {} has a blank patient id",
                self.id
            )));
        }
        if let Some(amount) = self.amount {
            ensure_non_negative("note amount", amount)?;
        }
        Ok(())
    }

    /// Single-line invoice billing this note's treatment.
    ///
    /// Returns `None` when the note carries no billable amount. The dentist is
    /// recorded as the provider for attribution reports.
    pub fn to_invoice(
        &self,
        invoice_id: RecordId,
        patient_name: &str,
        provider_id: Option<ProviderId>,
    ) -> Option<BillingRecord> {
        let amount = self.billable_amount()?;
        let patient = PatientRef::new(self.patient_id.clone(), patient_name, self.branch_id.clone());
        let mut invoice = BillingRecord::invoice(
            invoice_id,
            &patient,
            self.date,
            vec![LineItem::new(self.treatment_performed.clone(), amount)],
        );
        invoice.provider_id = provider_id;
        invoice.provider_name = Some(self.dentist_name.clone());
        Some(invoice)
    }
}

impl Entity for ProgressNote {
    type Id = NoteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InvoiceStatus;
    use rust_decimal_macros::dec;

    fn note(amount: Option<Money>) -> ProgressNote {
        ProgressNote {
            id: NoteId::new("n-1"),
            patient_id: PatientId::new("p-1"),
            branch_id: BranchId::new("main"),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            dentist_name: "Dr. Okafor".to_string(),
            treatment_performed: "Composite Filling".to_string(),
            tooth_number: Some("36".to_string()),
            clinical_notes: "MO composite, shade A2".to_string(),
            plan: "Review in 6 months".to_string(),
            amount,
        }
    }

    #[test]
    fn billable_note_becomes_single_line_pending_invoice() {
        let inv = note(Some(dec!(150.00)))
            .to_invoice(RecordId::new("INV-1"), "Ana Lima", None)
            .unwrap();

        assert_eq!(inv.amount, dec!(150.00));
        assert_eq!(inv.items, vec![LineItem::new("Composite Filling", dec!(150.00))]);
        assert_eq!(inv.status(), Some(InvoiceStatus::Pending));
        assert_eq!(inv.date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(inv.provider_name.as_deref(), Some("Dr. Okafor"));
    }

    #[test]
    fn absent_or_zero_fee_is_not_billed() {
        assert!(note(None).to_invoice(RecordId::new("INV-1"), "Ana Lima", None).is_none());
        assert!(note(Some(dec!(0))).to_invoice(RecordId::new("INV-1"), "Ana Lima", None).is_none());
    }

    #[test]
    fn negative_fee_is_malformed() {
        assert!(note(Some(dec!(-10))).check_well_formed().is_err());
        assert!(note(Some(dec!(10))).check_well_formed().is_ok());
    }
}
