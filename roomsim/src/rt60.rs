//! Reverberation time from Sabine's formula.
//!
//! RT60 = 0.161 * V / A
//!
//! Where:
//! - V = room volume (m³)
//! - A = total absorption (sabins, m²) = Σ(αᵢ * Sᵢ) over the six surfaces
//!
//! Unlike the reflection-loss model, which uses one representative
//! coefficient per band, the estimator weighs every surface by its own
//! coefficient.

use crate::error::{Result, RoomSimError};
use crate::room::{Band, BandCoefficients, RoomModel, check_dimensions};
use serde::Serialize;
use std::collections::BTreeMap;

/// Sabine constant (s/m)
pub const SABINE_CONSTANT: f64 = 0.161;

/// Surface areas in the fixed order floor, ceiling, front, back, left, right:
/// `[L·W, L·W, L·H, L·H, W·H, W·H]`
pub fn surface_areas(dims: [f64; 3]) -> [f64; 6] {
    let [l, w, h] = dims;
    [l * w, l * w, l * h, l * h, w * h, w * h]
}

/// Total absorption of one band in sabins (m²)
pub fn total_absorption(areas: &[f64; 6], coeff: &BandCoefficients) -> f64 {
    areas
        .iter()
        .zip(coeff.surfaces().iter())
        .map(|(s, a)| s * a)
        .sum()
}

/// Calculate RT60 using Sabine's formula; 0 when there is no absorption
pub fn rt60_sabine(volume: f64, total_absorption: f64) -> f64 {
    if total_absorption > 0.0 {
        SABINE_CONSTANT * volume / total_absorption
    } else {
        0.0
    }
}

/// RT60 per band for a room of size `dims`
///
/// # Errors
/// `InvalidGeometry` if a dimension is not a positive finite number.
pub fn compute_rt60(
    dims: [f64; 3],
    abs_coeff: &BTreeMap<Band, BandCoefficients>,
) -> Result<BTreeMap<Band, f64>> {
    Ok(reverberation_report(dims, abs_coeff)?
        .bands
        .into_iter()
        .map(|(band, r)| (band, r.rt60))
        .collect())
}

/// Reverberation figures of one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandReverberation {
    /// Total absorption in sabins (m²)
    pub total_absorption: f64,
    /// Sabine RT60 in seconds
    pub rt60: f64,
}

/// Volume, areas and per-band reverberation of a room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReverberationReport {
    /// Room volume in cubic meters
    pub volume: f64,
    /// Surface areas (floor, ceiling, front, back, left, right)
    pub surface_areas: [f64; 6],
    pub bands: BTreeMap<Band, BandReverberation>,
}

/// Full Sabine computation for every band
pub fn reverberation_report(
    dims: [f64; 3],
    abs_coeff: &BTreeMap<Band, BandCoefficients>,
) -> Result<ReverberationReport> {
    check_dimensions(&dims)?;

    let volume = dims[0] * dims[1] * dims[2];
    let areas = surface_areas(dims);

    let bands = abs_coeff
        .iter()
        .map(|(&band, coeff)| {
            let total = total_absorption(&areas, coeff);
            let rt60 = rt60_sabine(volume, total);
            if !total.is_finite() || !rt60.is_finite() {
                return Err(RoomSimError::geometry(format!(
                    "reverberation of band '{}' is not finite for room {:?}",
                    band, dims
                )));
            }
            Ok((
                band,
                BandReverberation {
                    total_absorption: total,
                    rt60,
                },
            ))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok(ReverberationReport {
        volume,
        surface_areas: areas,
        bands,
    })
}

impl RoomModel {
    /// Sabine RT60 of every band of this room
    pub fn rt60(&self) -> BTreeMap<Band, f64> {
        // dimensions were validated when the room was built
        compute_rt60(self.dims(), self.abs_coeff()).unwrap_or_default()
    }
}
