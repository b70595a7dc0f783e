use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use clinicledger_core::{
    BranchId, DomainError, DomainResult, Entity, Money, PatientId, ProviderId, RecordId,
    ensure_non_negative,
};

/// Invoice payment status.
///
/// `Overdue` is asserted by the upstream workflow; payments never set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InvoiceStatus {
    #[default]
    Pending,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::PartiallyPaid => "Partially Paid",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Overdue => "Overdue",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of a billing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Invoice,
    Receipt,
}

impl core::fmt::Display for RecordType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordType::Invoice => f.write_str("Invoice"),
            RecordType::Receipt => f.write_str("Receipt"),
        }
    }
}

/// One billed (or receipted) line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub price: Money,
}

impl LineItem {
    pub fn new(description: impl Into<String>, price: Money) -> Self {
        Self {
            description: description.into(),
            price,
        }
    }
}

/// Invoice-only state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetails {
    #[serde(default)]
    pub status: InvoiceStatus,
    /// Cumulative amount received against this invoice.
    #[serde(default)]
    pub paid_amount: Money,
}

/// Receipt-only state.
///
/// Older payment-capture clients send a single `relatedInvoiceId`; newer ones
/// send `relatedInvoiceIds`. Both are honoured, see [`ReceiptDetails::related_invoices`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_invoice_id: Option<RecordId>,
    #[serde(default)]
    pub related_invoice_ids: Vec<RecordId>,
}

impl ReceiptDetails {
    pub fn linked_to(ids: Vec<RecordId>) -> Self {
        Self {
            related_invoice_id: None,
            related_invoice_ids: ids,
        }
    }

    /// Every invoice this payment applies to, deduplicated, in the order given.
    pub fn related_invoices(&self) -> Vec<RecordId> {
        let mut out: Vec<RecordId> = Vec::new();
        for id in self.related_invoice_id.iter().chain(&self.related_invoice_ids) {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    /// True for a standalone credit / pre-payment.
    pub fn is_standalone(&self) -> bool {
        self.related_invoice_id.is_none() && self.related_invoice_ids.is_empty()
    }
}

/// Kind-specific part of a billing record, tagged by `recordType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "recordType")]
pub enum RecordKind {
    Invoice(InvoiceDetails),
    Receipt(ReceiptDetails),
}

/// Patient attribution shared by every record created for a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRef {
    pub patient_id: PatientId,
    pub patient_name: String,
    pub branch_id: BranchId,
}

impl PatientRef {
    pub fn new(patient_id: PatientId, patient_name: impl Into<String>, branch_id: BranchId) -> Self {
        Self {
            patient_id,
            patient_name: patient_name.into(),
            branch_id,
        }
    }
}

/// Unified ledger entry: an Invoice or a Receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecord {
    pub id: RecordId,
    pub patient_id: PatientId,
    pub patient_name: String,
    pub branch_id: BranchId,
    pub date: NaiveDate,
    /// Invoice: billed total. Receipt: tendered amount.
    pub amount: Money,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(flatten)]
    pub kind: RecordKind,
}

impl BillingRecord {
    /// New pending invoice whose amount is the sum of its lines.
    pub fn invoice(id: RecordId, patient: &PatientRef, date: NaiveDate, items: Vec<LineItem>) -> Self {
        let amount = items.iter().map(|i| i.price).sum();
        Self {
            id,
            patient_id: patient.patient_id.clone(),
            patient_name: patient.patient_name.clone(),
            branch_id: patient.branch_id.clone(),
            date,
            amount,
            items,
            provider_id: None,
            provider_name: None,
            kind: RecordKind::Invoice(InvoiceDetails::default()),
        }
    }

    /// New receipt for `amount`, applied to `related` invoices (none = credit).
    pub fn receipt(
        id: RecordId,
        patient: &PatientRef,
        date: NaiveDate,
        amount: Money,
        related: Vec<RecordId>,
    ) -> Self {
        Self {
            id,
            patient_id: patient.patient_id.clone(),
            patient_name: patient.patient_name.clone(),
            branch_id: patient.branch_id.clone(),
            date,
            amount,
            items: Vec::new(),
            provider_id: None,
            provider_name: None,
            kind: RecordKind::Receipt(ReceiptDetails::linked_to(related)),
        }
    }

    pub fn with_provider(mut self, provider_id: ProviderId, provider_name: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id);
        self.provider_name = Some(provider_name.into());
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        if let RecordKind::Invoice(details) = &mut self.kind {
            details.status = status;
        }
        self
    }

    pub fn with_paid_amount(mut self, paid_amount: Money) -> Self {
        if let RecordKind::Invoice(details) = &mut self.kind {
            details.paid_amount = paid_amount;
        }
        self
    }

    pub fn record_type(&self) -> RecordType {
        match self.kind {
            RecordKind::Invoice(_) => RecordType::Invoice,
            RecordKind::Receipt(_) => RecordType::Receipt,
        }
    }

    pub fn is_invoice(&self) -> bool {
        matches!(self.kind, RecordKind::Invoice(_))
    }

    pub fn is_receipt(&self) -> bool {
        matches!(self.kind, RecordKind::Receipt(_))
    }

    pub fn invoice_details(&self) -> Option<&InvoiceDetails> {
        match &self.kind {
            RecordKind::Invoice(d) => Some(d),
            RecordKind::Receipt(_) => None,
        }
    }

    pub fn invoice_details_mut(&mut self) -> Option<&mut InvoiceDetails> {
        match &mut self.kind {
            RecordKind::Invoice(d) => Some(d),
            RecordKind::Receipt(_) => None,
        }
    }

    pub fn receipt_details(&self) -> Option<&ReceiptDetails> {
        match &self.kind {
            RecordKind::Receipt(d) => Some(d),
            RecordKind::Invoice(_) => None,
        }
    }

    /// Invoice status; `None` for receipts.
    pub fn status(&self) -> Option<InvoiceStatus> {
        self.invoice_details().map(|d| d.status)
    }

    /// Invoice paid amount; `None` for receipts.
    pub fn paid_amount(&self) -> Option<Money> {
        self.invoice_details().map(|d| d.paid_amount)
    }

    /// `max(0, amount - paidAmount)` for invoices; `None` for receipts.
    pub fn outstanding(&self) -> Option<Money> {
        self.invoice_details()
            .map(|d| (self.amount - d.paid_amount).max(Money::ZERO))
    }

    /// Sum of line item prices.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(|i| i.price).sum()
    }

    pub fn patient(&self) -> PatientRef {
        PatientRef::new(
            self.patient_id.clone(),
            self.patient_name.clone(),
            self.branch_id.clone(),
        )
    }

    /// Structural checks every stored record must pass, new or loaded.
    pub fn check_well_formed(&self) -> DomainResult<()> {
        if self.id.is_blank() {
            return Err(DomainError::invalid_id("record id must not be blank"));
        }
        if self.patient_id.is_blank() {
            return Err(DomainError::invalid_id(format!(
                "record {} has a blank patient id",
                self.id
            )));
        }
        ensure_non_negative("amount", self.amount)?;
        for item in &self.items {
            ensure_non_negative("line item price", item.price)?;
        }
        match &self.kind {
            RecordKind::Invoice(d) => ensure_non_negative("paidAmount", d.paid_amount),
            RecordKind::Receipt(d) => {
                if d.related_invoices().iter().any(RecordId::is_blank) {
                    return Err(DomainError::invalid_id(format!(
                        "receipt {} references a blank invoice id",
                        self.id
                    )));
                }
                Ok(())
            }
        }
    }

    /// Gateway-side checks for a new invoice.
    ///
    /// `amount == Σ items` is deliberately not enforced here.
    pub fn validate_new_invoice(&self) -> DomainResult<()> {
        let details = self.invoice_details().ok_or_else(|| {
            DomainError::validation(format!("record {} is not an Invoice", self.id))
        })?;
        if self.items.is_empty() {
            return Err(DomainError::validation(format!(
                "invoice {} has no line items",
                self.id
            )));
        }
        self.check_well_formed()?;
        if details.paid_amount > self.amount {
            return Err(DomainError::validation(format!(
                "invoice {} paidAmount exceeds its amount",
                self.id
            )));
        }
        Ok(())
    }

    /// Gateway-side checks for a new receipt.
    pub fn validate_new_receipt(&self) -> DomainResult<()> {
        if !self.is_receipt() {
            return Err(DomainError::validation(format!(
                "record {} is not a Receipt",
                self.id
            )));
        }
        self.check_well_formed()
    }
}

impl Entity for BillingRecord {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }
}
