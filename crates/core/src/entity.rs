//! Chart entities: anything with an id that belongs to one patient.

/// Entity marker + minimal interface.
///
/// Stores key their collections by `Entity::id` and group them by
/// `Entity::patient_id`; everything kept in a patient's chart implements it.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Patient whose chart this entity belongs to.
    fn patient_id(&self) -> &crate::PatientId;
}
