//! Error types for the roomsim crate.
//!
//! A single error enum covers room construction, simulation and the file glue
//! around it. A room with zero total absorption is not an error: its RT60
//! resolves to 0.

use thiserror::Error;

/// Error type for roomsim operations.
#[derive(Debug, Error)]
pub enum RoomSimError {
    /// Room geometry cannot be simulated: non-positive dimension, coincident
    /// source and receiver, or a distance that is not finite.
    #[error("invalid geometry: {message}")]
    InvalidGeometry {
        /// Description of the offending value.
        message: String,
    },

    /// Room configuration is incomplete or malformed: missing or malformed
    /// absorption bands, negative reflection order, bad sample rate.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the offending value.
        message: String,
    },

    /// The progress callback asked the simulation to stop.
    #[error("simulation cancelled after {completed} of {total} image sources")]
    Cancelled {
        /// Image sources processed before the stop was observed.
        completed: usize,
        /// Image sources the run would have processed.
        total: usize,
    },

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for roomsim operations.
pub type Result<T> = std::result::Result<T, RoomSimError>;

impl RoomSimError {
    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        RoomSimError::InvalidGeometry {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        RoomSimError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if this is a geometry error.
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, RoomSimError::InvalidGeometry { .. })
    }

    /// Returns true if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RoomSimError::InvalidConfig { .. } | RoomSimError::Json(_)
        )
    }

    /// Returns true if the run was stopped through the progress callback.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RoomSimError::Cancelled { .. })
    }
}
