//! # Atrium Core Render Faults
//!
//! Defines [`RenderFault`], the error a component raises while producing its
//! view. Faults never escape an isolation boundary; they are turned into a
//! fallback view for the owning widget or module.
use std::any::Any;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderFault {
    /// The component returned an error from `render`.
    #[error("{message}")]
    Failed { message: String },

    /// The component panicked while rendering.
    #[error("panicked: {message}")]
    Panicked { message: String },
}

impl RenderFault {
    pub fn failed(message: impl Into<String>) -> Self {
        RenderFault::Failed { message: message.into() }
    }

    /// Build a fault from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        RenderFault::Panicked { message }
    }

    pub fn message(&self) -> &str {
        match self {
            RenderFault::Failed { message } | RenderFault::Panicked { message } => message,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, RenderFault::Panicked { .. })
    }
}
