//! Room geometry and absorption data.
//!
//! A [`RoomModel`] is validated once at construction and never mutated
//! afterwards. It carries everything the image-source enumeration and the
//! RT60 estimator need: the three room dimensions, absorption coefficients per
//! frequency band, the maximum reflection order and the sampling rate of the
//! impulse responses.

use crate::error::{Result, RoomSimError};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Speed of sound in air (m/s)
pub const SPEED_OF_SOUND: f64 = 343.0;

/// Default sampling rate of the impulse responses (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Length of every impulse response window (s)
pub const RESPONSE_DURATION: f64 = 1.5;

// ============================================================================
// Positions
// ============================================================================

/// 3D point in space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Point3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3D {
    fn from(p: [f64; 3]) -> Self {
        Point3D::new(p[0], p[1], p[2])
    }
}

// ============================================================================
// Frequency bands and absorption
// ============================================================================

/// Frequency band with its own set of absorption coefficients
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Low,
    Mid,
    High,
}

impl Band {
    pub fn all() -> [Band; 3] {
        [Band::Low, Band::Mid, Band::High]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Low => "low",
            Band::Mid => "mid",
            Band::High => "high",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Band {
    type Err = RoomSimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Band::Low),
            "mid" => Ok(Band::Mid),
            "high" => Ok(Band::High),
            other => Err(RoomSimError::config(format!(
                "unknown absorption band '{}' (expected low, mid or high)",
                other
            ))),
        }
    }
}

/// Absorption coefficients of the six room surfaces for one band.
///
/// Surfaces are ordered floor, ceiling, front, back, left, right, the same
/// order as the areas returned by [`crate::rt60::surface_areas`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandCoefficients([f64; 6]);

impl BandCoefficients {
    /// Per-surface coefficients, each in `[0, 1]`
    pub fn new(surfaces: [f64; 6]) -> Result<Self> {
        for (i, &alpha) in surfaces.iter().enumerate() {
            if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
                return Err(RoomSimError::config(format!(
                    "absorption coefficient {} of surface {} must be within [0, 1]",
                    alpha, i
                )));
            }
        }
        Ok(Self(surfaces))
    }

    /// Same coefficient on every surface
    pub fn uniform(alpha: f64) -> Result<Self> {
        Self::new([alpha; 6])
    }

    /// Accepts either one representative value or six per-surface values
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [alpha] => Self::uniform(*alpha),
            [a, b, c, d, e, f] => Self::new([*a, *b, *c, *d, *e, *f]),
            _ => Err(RoomSimError::config(format!(
                "expected 1 or 6 absorption coefficients, got {}",
                values.len()
            ))),
        }
    }

    pub fn surfaces(&self) -> &[f64; 6] {
        &self.0
    }

    /// Single value standing in for the whole band in the reflection-loss model.
    ///
    /// This is the first surface coefficient, not an average.
    pub fn representative(&self) -> f64 {
        self.0[0]
    }
}

// ============================================================================
// Room model
// ============================================================================

/// Immutable rectangular room description
#[derive(Debug, Clone, PartialEq)]
pub struct RoomModel {
    dims: [f64; 3],
    abs_coeff: BTreeMap<Band, BandCoefficients>,
    max_order: u32,
    speed_of_sound: f64,
    sample_rate: u32,
}

impl RoomModel {
    /// Build a room sampled at [`DEFAULT_SAMPLE_RATE`].
    ///
    /// # Errors
    /// * `InvalidGeometry` if a dimension is not a positive finite number
    /// * `InvalidConfig` if no band is given or `max_order` is negative or too large
    pub fn new(
        dims: [f64; 3],
        abs_coeff: BTreeMap<Band, BandCoefficients>,
        max_order: i64,
    ) -> Result<Self> {
        check_dimensions(&dims)?;

        if abs_coeff.is_empty() {
            return Err(RoomSimError::config(
                "at least one absorption band is required",
            ));
        }

        if max_order < 0 {
            return Err(RoomSimError::config(format!(
                "max_order ({}) must be non-negative",
                max_order
            )));
        }
        let max_order = i32::try_from(max_order)
            .map_err(|_| RoomSimError::config(format!("max_order ({}) is too large", max_order)))?
            as u32;
        if candidate_count(max_order).is_none() {
            return Err(RoomSimError::config(format!(
                "max_order ({}) gives more image sources than can be enumerated",
                max_order
            )));
        }

        Ok(Self {
            dims,
            abs_coeff,
            max_order,
            speed_of_sound: SPEED_OF_SOUND,
            sample_rate: DEFAULT_SAMPLE_RATE,
        })
    }

    /// Same room sampled at another rate
    pub fn with_sample_rate(self, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(RoomSimError::config("sample_rate must be positive"));
        }
        Ok(Self {
            sample_rate,
            ..self
        })
    }

    pub fn dims(&self) -> [f64; 3] {
        self.dims
    }

    pub fn max_order(&self) -> u32 {
        self.max_order
    }

    pub fn speed_of_sound(&self) -> f64 {
        self.speed_of_sound
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn abs_coeff(&self) -> &BTreeMap<Band, BandCoefficients> {
        &self.abs_coeff
    }

    /// Bands present in this room, low to high
    pub fn bands(&self) -> impl Iterator<Item = Band> + '_ {
        self.abs_coeff.keys().copied()
    }

    /// Coefficients of one band
    pub fn band(&self, band: Band) -> Result<&BandCoefficients> {
        self.abs_coeff.get(&band).ok_or_else(|| {
            RoomSimError::config(format!("room has no absorption data for band '{}'", band))
        })
    }

    pub fn volume(&self) -> f64 {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Number of samples in every impulse response of this room
    pub fn response_length(&self) -> usize {
        crate::impulse::response_length(self.sample_rate)
    }

    /// Image sources enumerated per source–receiver pair: `(2·max_order+1)^3`
    pub fn candidate_count(&self) -> usize {
        // checked at construction
        candidate_count(self.max_order).unwrap_or(usize::MAX)
    }

    /// Whether a point lies inside the room box (boundaries included)
    pub fn contains(&self, p: &Point3D) -> bool {
        let inside = |v: f64, dim: f64| (0.0..=dim).contains(&v);
        inside(p.x, self.dims[0]) && inside(p.y, self.dims[1]) && inside(p.z, self.dims[2])
    }
}

pub(crate) fn check_dimensions(dims: &[f64; 3]) -> Result<()> {
    for (axis, &d) in dims.iter().enumerate() {
        if !d.is_finite() || d <= 0.0 {
            return Err(RoomSimError::geometry(format!(
                "room dimension {} ({}) must be a positive finite number",
                axis, d
            )));
        }
    }
    let volume = dims[0] * dims[1] * dims[2];
    if !volume.is_finite() {
        return Err(RoomSimError::geometry(format!(
            "room volume of {:?} is not a finite number",
            dims
        )));
    }
    Ok(())
}

fn candidate_count(max_order: u32) -> Option<usize> {
    let side = usize::try_from(max_order).ok()?.checked_mul(2)?.checked_add(1)?;
    side.checked_mul(side)?.checked_mul(side)
}

// ============================================================================
// Scene
// ============================================================================

/// A room together with the positions to simulate
#[derive(Debug, Clone)]
pub struct RoomScene {
    room: RoomModel,
    sources: Vec<Point3D>,
    receivers: Vec<Point3D>,
}

impl RoomScene {
    /// # Errors
    /// * `InvalidGeometry` for non-finite positions or a source coinciding with a receiver
    pub fn new(room: RoomModel, sources: Vec<Point3D>, receivers: Vec<Point3D>) -> Result<Self> {
        for (kind, points) in [("source", &sources), ("receiver", &receivers)] {
            for (idx, p) in points.iter().enumerate() {
                if !p.is_finite() {
                    return Err(RoomSimError::geometry(format!(
                        "{} {} has a non-finite coordinate",
                        kind, idx
                    )));
                }
                if !room.contains(p) {
                    warn!("{} {} at {:?} is outside the room", kind, idx, p.to_array());
                }
            }
        }

        for (s_idx, s) in sources.iter().enumerate() {
            for (r_idx, r) in receivers.iter().enumerate() {
                if s.distance_to(r) == 0.0 {
                    return Err(RoomSimError::geometry(format!(
                        "source {} and receiver {} are at the same position",
                        s_idx, r_idx
                    )));
                }
            }
        }

        Ok(Self {
            room,
            sources,
            receivers,
        })
    }

    pub fn room(&self) -> &RoomModel {
        &self.room
    }

    pub fn sources(&self) -> &[Point3D] {
        &self.sources
    }

    pub fn receivers(&self) -> &[Point3D] {
        &self.receivers
    }

    /// Source–receiver pairs, source-major
    pub fn pair_count(&self) -> usize {
        self.sources.len() * self.receivers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bands(alpha: f64) -> BTreeMap<Band, BandCoefficients> {
        Band::all()
            .into_iter()
            .map(|b| (b, BandCoefficients::uniform(alpha).unwrap()))
            .collect()
    }

    #[test]
    fn test_room_defaults() {
        let room = RoomModel::new([5.0, 4.0, 3.0], bands(0.1), 2).unwrap();
        assert_eq!(room.sample_rate(), 44100);
        assert_eq!(room.speed_of_sound(), 343.0);
        assert_eq!(room.max_order(), 2);
        assert_eq!(room.candidate_count(), 125);
        assert_eq!(room.response_length(), 66150);
        assert!((room.volume() - 60.0).abs() < 1e-12);
        assert_eq!(room.bands().collect::<Vec<_>>(), Band::all().to_vec());
    }

    #[test]
    fn test_room_rejects_bad_dimensions() {
        for dims in [[0.0, 4.0, 3.0], [5.0, -1.0, 3.0], [5.0, 4.0, f64::NAN]] {
            let err = RoomModel::new(dims, bands(0.1), 1).unwrap_err();
            assert!(err.is_geometry_error(), "{:?} should be rejected", dims);
        }
    }

    #[test]
    fn test_room_rejects_overflowing_volume() {
        let err = RoomModel::new([1e150; 3], bands(0.1), 1).unwrap_err();
        assert!(err.is_geometry_error());
    }

    #[test]
    fn test_room_rejects_bad_config() {
        let err = RoomModel::new([5.0, 4.0, 3.0], bands(0.1), -1).unwrap_err();
        assert!(err.is_config_error());

        let err = RoomModel::new([5.0, 4.0, 3.0], BTreeMap::new(), 1).unwrap_err();
        assert!(err.is_config_error());

        let room = RoomModel::new([5.0, 4.0, 3.0], bands(0.1), 1).unwrap();
        assert!(room.with_sample_rate(0).unwrap_err().is_config_error());
    }

    #[test]
    fn test_sample_rate_override() {
        let room = RoomModel::new([5.0, 4.0, 3.0], bands(0.1), 0)
            .unwrap()
            .with_sample_rate(48000)
            .unwrap();
        assert_eq!(room.response_length(), 72000);
    }

    #[test]
    fn test_band_coefficients() {
        let c = BandCoefficients::from_slice(&[0.2]).unwrap();
        assert_eq!(c.surfaces(), &[0.2; 6]);

        let c = BandCoefficients::from_slice(&[0.3, 0.1, 0.1, 0.1, 0.1, 0.1]).unwrap();
        assert_eq!(c.representative(), 0.3);

        assert!(BandCoefficients::from_slice(&[0.1, 0.2]).is_err());
        assert!(BandCoefficients::uniform(1.5).is_err());
        assert!(BandCoefficients::uniform(-0.1).is_err());
    }

    #[test]
    fn test_missing_band() {
        let mut abs = BTreeMap::new();
        abs.insert(Band::Low, BandCoefficients::uniform(0.1).unwrap());
        let room = RoomModel::new([5.0, 4.0, 3.0], abs, 0).unwrap();
        assert!(room.band(Band::Low).is_ok());
        assert!(room.band(Band::High).unwrap_err().is_config_error());
    }

    #[test]
    fn test_band_parsing() {
        assert_eq!("mid".parse::<Band>().unwrap(), Band::Mid);
        assert!("treble".parse::<Band>().is_err());
        assert_eq!(Band::High.to_string(), "high");
    }

    #[test]
    fn test_scene_rejects_coincident_positions() {
        let room = RoomModel::new([5.0, 4.0, 3.0], bands(0.1), 0).unwrap();
        let p = Point3D::new(1.0, 1.0, 1.0);
        let err = RoomScene::new(room, vec![p], vec![p]).unwrap_err();
        assert!(err.is_geometry_error());
    }

    #[test]
    fn test_scene_pairs() {
        let room = RoomModel::new([5.0, 4.0, 3.0], bands(0.1), 0).unwrap();
        let scene = RoomScene::new(
            room,
            vec![[1.0, 1.0, 1.0].into(), [2.0, 1.0, 1.0].into()],
            vec![[4.0, 3.0, 2.0].into()],
        )
        .unwrap();
        assert_eq!(scene.pair_count(), 2);
        assert!(scene.room().contains(&scene.receivers()[0]));
    }
}
