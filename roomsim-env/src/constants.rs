//! Names shared by the roomsim binaries and tests.

/// Environment variable pointing to the directory holding room description files
pub const DATA_DIR_VAR: &str = "ROOMSIM_DATA_DIR";

/// Directory searched (relative to the current directory) when `ROOMSIM_DATA_DIR` is unset
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default directory for reports and plots
pub const DEFAULT_OUTPUT_DIR: &str = "roomsim_output";

/// Room files processed when no explicit configuration is given
pub const DEFAULT_ROOM_CONFIGS: [&str; 3] = ["small_room.json", "large_room.json", "complex_room.json"];
