#![doc = include_str!("../README.md")]

/// Error types for roomsim operations.
pub mod error;
pub use error::{Result, RoomSimError};

/// Room geometry, absorption bands and scenes
pub mod room;
/// Lazy image-source enumeration
pub mod image_source;
/// Order-dependent reflection loss
pub mod reflection;
/// Impulse-response buffers and delay binning
pub mod impulse;
/// Sabine reverberation time
pub mod rt60;
/// Simulation driver
pub mod simulate;
/// Room description files
pub mod config;
/// Progress reporting for long runs
pub mod progress;
/// JSON reports
pub mod output;
/// Plotting functions
pub mod plot;

// Re-export commonly used items
pub use config::{
    RoomSpec, ValidationResult, load_room_scene, load_room_spec, parse_room_spec,
    validate_room_spec,
};
pub use image_source::{ImageSources, MirroredSource, image_sources};
pub use impulse::{ImpulseResponse, ImpulseResponseAccumulator, response_length};
pub use output::{RoomReport, save_report};
pub use progress::ProgressReporter;
pub use reflection::{ReflectionLossModel, reflection_loss};
pub use room::{
    Band, BandCoefficients, DEFAULT_SAMPLE_RATE, Point3D, RoomModel, RoomScene, SPEED_OF_SOUND,
};
pub use rt60::{compute_rt60, reverberation_report, rt60_sabine};
pub use simulate::{
    BandSelection, CallbackAction, ImpulseResponses, ProgressCallback, RoomOutcome,
    SimulationDriver, SimulationOptions, SimulationProgress, compute_impulse_responses,
};
