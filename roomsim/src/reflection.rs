//! Order-dependent reflection loss.
//!
//! Every reflection keeps `1 - α` of the energy, so an image of total order
//! `n` is attenuated by `(1 - α)^n`. The enhanced model raises `α` by 0.05 per
//! reflection order, capped at 0.9, to account for later reflections hitting
//! progressively more absorptive surfaces.

use crate::image_source::total_order;

/// Absorption added per reflection order in the enhanced model
pub const ENHANCED_ABSORPTION_STEP: f64 = 0.05;

/// Upper bound of the enhanced absorption coefficient
pub const ENHANCED_ABSORPTION_CAP: f64 = 0.9;

/// Attenuation of an image source with lattice indices `order`.
///
/// `band_coeff` is the representative absorption coefficient of one band.
/// The direct path (`order == [0, 0, 0]`) is never attenuated.
pub fn reflection_loss(order: [i32; 3], band_coeff: f64, enhanced: bool) -> f64 {
    let total = total_order(order);
    if total == 0 {
        return 1.0;
    }

    let base = if enhanced {
        (band_coeff + ENHANCED_ABSORPTION_STEP * total as f64).min(ENHANCED_ABSORPTION_CAP)
    } else {
        band_coeff
    };

    (1.0 - base).powi(total as i32)
}

/// Reflection-loss model selected for a simulation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReflectionLossModel {
    /// Apply the per-order absorption penalty
    pub enhanced: bool,
}

impl ReflectionLossModel {
    pub fn new(enhanced: bool) -> Self {
        Self { enhanced }
    }

    pub fn loss(&self, order: [i32; 3], band_coeff: f64) -> f64 {
        reflection_loss(order, band_coeff, self.enhanced)
    }

    pub fn name(&self) -> &'static str {
        if self.enhanced { "enhanced" } else { "simple" }
    }
}
