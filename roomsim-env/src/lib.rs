//! roomsim Environment and Constants
//!
//! This crate provides shared environment utilities and constants for the roomsim workspace.
//! It centralizes environment variable handling so that no binary carries a
//! hardcoded path to the room description files.

pub mod constants;
pub mod env_utils;

// Re-export commonly used items
pub use constants::{DATA_DIR_VAR, DEFAULT_DATA_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_ROOM_CONFIGS};
pub use env_utils::{EnvError, get_data_dir, get_output_dir, resolve_data_dir};
