use chrono::{DateTime, Utc};

/// A ledger fact emitted by one successful mutation.
///
/// Events never change once emitted. `event_type` plus `version` identify the
/// payload shape, so audit consumers can tell old entries from new ones.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, e.g. `"billing.receipt.recorded"`.
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Wall-clock time of the mutation.
    fn occurred_at(&self) -> DateTime<Utc>;
}
