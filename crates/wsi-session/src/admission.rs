//! Admission outcomes.

use serde::{Deserialize, Serialize};

/// Result of asking for a new viewing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionResult {
    /// The session was admitted and recorded.
    Granted,
    /// The tile server is at capacity.
    Denied {
        /// Reason for denial.
        reason: String,
    },
}

impl AdmissionResult {
    /// Whether the session was admitted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}
