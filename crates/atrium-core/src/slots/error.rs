//! # Atrium Core Slot Errors
//!
//! Defines [`SlotError`] for failures in the slot layer that are not render
//! faults, such as referring to an extension point the host does not know.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("Unknown slot '{name}' (known slots: {known})")]
    UnknownSlot { name: String, known: String },
}
