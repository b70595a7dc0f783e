use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::NaiveDate;
use clinicledger_billing::{BillingRecord, LineItem, PatientRef, ProgressNote};
use clinicledger_core::{BranchId, Money, NoteId, PatientId, RecordId};
use clinicledger_reconciliation::reconcile;

const TREATMENTS: [&str; 5] = [
    "Composite Filling",
    "Scaling & Polishing",
    "Root Canal Treatment",
    "Extraction",
    "Crown",
];

/// One patient chart with `notes` billed notes and one invoice per note.
fn chart(notes: usize) -> (Vec<ProgressNote>, Vec<BillingRecord>) {
    let patient = PatientRef::new(PatientId::new("p-bench"), "Bench Patient", BranchId::new("main"));
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

    let mut out_notes = Vec::with_capacity(notes);
    let mut out_records = Vec::with_capacity(notes);
    for i in 0..notes {
        // Few distinct dates so the FIFO queues get real depth.
        let date = start + chrono::Days::new((i / 10) as u64);
        let treatment = TREATMENTS[i % TREATMENTS.len()];
        let price = Money::new(((i % 7) as i64 + 1) * 2500, 2);

        out_notes.push(ProgressNote {
            id: NoteId::new(format!("n-{i}")),
            patient_id: patient.patient_id.clone(),
            branch_id: patient.branch_id.clone(),
            date,
            dentist_name: "Dr. Bench".to_string(),
            treatment_performed: treatment.to_string(),
            tooth_number: None,
            clinical_notes: String::new(),
            plan: String::new(),
            amount: Some(price),
        });
        out_records.push(BillingRecord::invoice(
            RecordId::new(format!("INV-{i}")),
            &patient,
            date,
            vec![LineItem::new(treatment, price)],
        ));
    }
    (out_notes, out_records)
}

fn bench_reconcile_chart_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_chart_size");
    let patient_id = PatientId::new("p-bench");

    for size in [10usize, 100, 1_000, 10_000].iter() {
        let (notes, records) = chart(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(reconcile(&patient_id, &notes, &records)));
        });
    }

    group.finish();
}

fn bench_reconcile_unbilled(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_unbilled");
    let patient_id = PatientId::new("p-bench");
    let (notes, _) = chart(1_000);
    let records: Vec<BillingRecord> = Vec::new();

    group.bench_function("notes_without_invoices", |b| {
        b.iter(|| black_box(reconcile(&patient_id, &notes, &records)));
    });

    group.finish();
}

criterion_group!(benches, bench_reconcile_chart_size, bench_reconcile_unbilled);
criterion_main!(benches);
