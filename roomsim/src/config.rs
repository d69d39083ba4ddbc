//! Room description files.
//!
//! A room file is a JSON object:
//!
//! ```json
//! {
//!   "room_dims": [5.0, 4.0, 3.0],
//!   "source_positions": [[1.0, 1.0, 1.0]],
//!   "receiver_positions": [[4.0, 3.0, 2.0]],
//!   "abs_coeff": {"low": [0.1, 0.1, 0.1, 0.1, 0.1, 0.1], "mid": 0.2},
//!   "max_order": 3
//! }
//! ```
//!
//! Each band takes six per-surface coefficients or one value used for all
//! surfaces. `sample_rate` is optional and defaults to 44100 Hz.

use crate::error::{Result, RoomSimError};
use crate::room::{Band, BandCoefficients, Point3D, RoomModel, RoomScene};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Absorption coefficients of one band as written in a room file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CoefficientSpec {
    /// One coefficient for every surface
    Scalar(f64),
    /// Floor, ceiling, front, back, left, right
    Surfaces(Vec<f64>),
}

impl CoefficientSpec {
    fn to_coefficients(&self) -> Result<BandCoefficients> {
        match self {
            CoefficientSpec::Scalar(alpha) => BandCoefficients::uniform(*alpha),
            CoefficientSpec::Surfaces(values) => BandCoefficients::from_slice(values),
        }
    }
}

/// Room file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoomSpec {
    /// Length, width and height in meters
    pub room_dims: Vec<f64>,
    pub source_positions: Vec<[f64; 3]>,
    pub receiver_positions: Vec<[f64; 3]>,
    /// Absorption per band name ("low", "mid", "high")
    pub abs_coeff: BTreeMap<String, CoefficientSpec>,
    /// Highest image index per axis
    pub max_order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
}

impl RoomSpec {
    /// Room dimensions as a fixed triple
    pub fn dims(&self) -> Result<[f64; 3]> {
        match self.room_dims.as_slice() {
            [l, w, h] => Ok([*l, *w, *h]),
            other => Err(RoomSimError::config(format!(
                "room_dims must have 3 entries, got {}",
                other.len()
            ))),
        }
    }

    /// Parsed absorption table
    pub fn absorption(&self) -> Result<BTreeMap<Band, BandCoefficients>> {
        self.abs_coeff
            .iter()
            .map(|(name, spec)| {
                let band: Band = name.parse()?;
                let coeff = spec.to_coefficients().map_err(|e| {
                    RoomSimError::config(format!("band '{}': {}", name, e))
                })?;
                Ok((band, coeff))
            })
            .collect()
    }

    /// Validated room model
    pub fn to_room(&self) -> Result<RoomModel> {
        let room = RoomModel::new(self.dims()?, self.absorption()?, self.max_order)?;
        match self.sample_rate {
            Some(sr) => room.with_sample_rate(sr),
            None => Ok(room),
        }
    }

    /// Validated scene with every position of the file
    pub fn to_scene(&self) -> Result<RoomScene> {
        RoomScene::new(
            self.to_room()?,
            self.source_positions.iter().copied().map(Point3D::from).collect(),
            self.receiver_positions
                .iter()
                .copied()
                .map(Point3D::from)
                .collect(),
        )
    }
}

impl TryFrom<&RoomSpec> for RoomScene {
    type Error = RoomSimError;

    fn try_from(spec: &RoomSpec) -> Result<Self> {
        spec.to_scene()
    }
}

/// Parse a room file from a JSON string
pub fn parse_room_spec(json: &str) -> Result<RoomSpec> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a room file
pub fn load_room_spec(path: &Path) -> Result<RoomSpec> {
    debug!("Reading room file {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let spec = parse_room_spec(&content)?;
    info!(
        "Loaded {}: {} source(s), {} receiver(s), max_order {}",
        path.display(),
        spec.source_positions.len(),
        spec.receiver_positions.len(),
        spec.max_order
    );
    Ok(spec)
}

/// Read a room file straight into a validated scene
pub fn load_room_scene(path: &Path) -> Result<RoomScene> {
    load_room_spec(path)?.to_scene()
}

// ============================================================================
// Validation report
// ============================================================================

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the configuration is valid
    pub is_valid: bool,
    /// Critical errors that prevent simulation
    pub errors: Vec<String>,
    /// Non-critical warnings that may affect results
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a valid result with no errors or warnings
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error (marks result as invalid)
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
        self.is_valid = false;
    }

    /// Add a warning (does not affect validity)
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Log validation results
    pub fn log_results(&self) {
        for warning in &self.warnings {
            log::warn!("{}", warning);
        }
        for error in &self.errors {
            log::error!("{}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

/// Validate a room file without building it
pub fn validate_room_spec(spec: &RoomSpec) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let dims = match spec.dims() {
        Ok(dims) => {
            for (axis, d) in dims.iter().enumerate() {
                if !d.is_finite() || *d <= 0.0 {
                    result.add_error(format!("room dimension {} ({}) must be positive", axis, d));
                }
            }
            Some(dims)
        }
        Err(e) => {
            result.add_error(e.to_string());
            None
        }
    };

    if spec.max_order < 0 {
        result.add_error(format!("max_order ({}) must be non-negative", spec.max_order));
    } else if spec.max_order > 20 {
        result.add_warning(format!(
            "max_order {} enumerates {} image sources per pair",
            spec.max_order,
            spec.max_order.saturating_mul(2).saturating_add(1).saturating_pow(3)
        ));
    }

    if spec.sample_rate == Some(0) {
        result.add_error("sample_rate must be positive".to_string());
    }

    if spec.abs_coeff.is_empty() {
        result.add_error("abs_coeff must define at least one band".to_string());
    }
    for (name, coeff) in &spec.abs_coeff {
        if let Err(e) = name.parse::<Band>() {
            result.add_error(e.to_string());
        }
        if let Err(e) = coeff.to_coefficients() {
            result.add_error(format!("band '{}': {}", name, e));
        }
    }
    if !spec.abs_coeff.contains_key(Band::Mid.as_str()) {
        result.add_warning("no 'mid' band: single-band runs need --band".to_string());
    }

    if spec.source_positions.is_empty() {
        result.add_warning("no source positions, nothing to simulate".to_string());
    }
    if spec.receiver_positions.is_empty() {
        result.add_warning("no receiver positions, nothing to simulate".to_string());
    }

    if let Some([l, w, h]) = dims {
        let inside = |p: &[f64; 3]| {
            (0.0..=l).contains(&p[0]) && (0.0..=w).contains(&p[1]) && (0.0..=h).contains(&p[2])
        };
        for (idx, p) in spec.source_positions.iter().enumerate() {
            if !inside(p) {
                result.add_warning(format!("Source {} is outside room bounds", idx + 1));
            }
        }
        for (idx, p) in spec.receiver_positions.iter().enumerate() {
            if !inside(p) {
                result.add_warning(format!("Receiver {} is outside room bounds", idx + 1));
            }
        }
    }

    for (s_idx, s) in spec.source_positions.iter().enumerate() {
        for (r_idx, r) in spec.receiver_positions.iter().enumerate() {
            if s == r {
                result.add_error(format!(
                    "Source {} and receiver {} share the same position",
                    s_idx + 1,
                    r_idx + 1
                ));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = r#"{
        "room_dims": [5, 4, 3],
        "source_positions": [[1, 1, 1]],
        "receiver_positions": [[4, 3, 2], [2, 2, 1.5]],
        "abs_coeff": {
            "low": [0.1, 0.1, 0.1, 0.1, 0.1, 0.1],
            "mid": [0.2, 0.1, 0.1, 0.1, 0.1, 0.1],
            "high": 0.3
        },
        "max_order": 2
    }"#;

    #[test]
    fn test_parse_room() {
        let spec = parse_room_spec(ROOM).unwrap();
        assert_eq!(spec.max_order, 2);
        assert_eq!(spec.sample_rate, None);
        assert_eq!(spec.abs_coeff["high"], CoefficientSpec::Scalar(0.3));

        let scene = spec.to_scene().unwrap();
        assert_eq!(scene.room().dims(), [5.0, 4.0, 3.0]);
        assert_eq!(scene.room().sample_rate(), 44100);
        assert_eq!(scene.pair_count(), 2);
        assert_eq!(scene.room().band(Band::Mid).unwrap().representative(), 0.2);
        assert_eq!(scene.room().band(Band::High).unwrap().surfaces(), &[0.3; 6]);
        assert!(validate_room_spec(&spec).is_valid);
    }

    #[test]
    fn test_unknown_band() {
        let json = ROOM.replace("\"high\"", "\"ultra\"");
        let spec = parse_room_spec(&json).unwrap();
        assert!(spec.to_scene().unwrap_err().is_config_error());
        assert!(!validate_room_spec(&spec).is_valid);
    }

    #[test]
    fn test_wrong_coefficient_count() {
        let json = ROOM.replace("\"high\": 0.3", "\"high\": [0.3, 0.3]");
        let spec = parse_room_spec(&json).unwrap();
        assert!(spec.to_room().unwrap_err().is_config_error());
    }

    #[test]
    fn test_negative_order() {
        let json = ROOM.replace("\"max_order\": 2", "\"max_order\": -1");
        let spec = parse_room_spec(&json).unwrap();
        assert!(spec.to_room().unwrap_err().is_config_error());
        let report = validate_room_spec(&spec);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_bad_dimensions() {
        let json = ROOM.replace("[5, 4, 3]", "[5, 4]");
        let spec = parse_room_spec(&json).unwrap();
        assert!(spec.to_room().unwrap_err().is_config_error());

        let json = ROOM.replace("[5, 4, 3]", "[5, -4, 3]");
        let spec = parse_room_spec(&json).unwrap();
        assert!(spec.to_room().unwrap_err().is_geometry_error());
    }

    #[test]
    fn test_missing_field_is_json_error() {
        let err = parse_room_spec(r#"{"room_dims": [5, 4, 3]}"#).unwrap_err();
        assert!(matches!(err, RoomSimError::Json(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_sample_rate_field() {
        let json = ROOM.replace("\"max_order\": 2", "\"max_order\": 2, \"sample_rate\": 8000");
        let room = parse_room_spec(&json).unwrap().to_room().unwrap();
        assert_eq!(room.response_length(), 12000);
    }

    #[test]
    fn test_validation_warnings() {
        let json = ROOM.replace("[2, 2, 1.5]", "[9, 2, 1.5]");
        let spec = parse_room_spec(&json).unwrap();
        let report = validate_room_spec(&spec);
        assert!(report.is_valid);
        assert_eq!(report.warnings, vec!["Receiver 2 is outside room bounds".to_string()]);
    }

    #[test]
    fn test_coincident_positions() {
        let json = ROOM.replace("[2, 2, 1.5]", "[1, 1, 1]");
        let spec = parse_room_spec(&json).unwrap();
        assert!(!validate_room_spec(&spec).is_valid);
        assert!(spec.to_scene().unwrap_err().is_geometry_error());
    }
}
