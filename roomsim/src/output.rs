//! Serialisable simulation reports.

use crate::error::Result;
use crate::impulse::ImpulseResponse;
use crate::reflection::ReflectionLossModel;
use crate::room::{Band, RoomScene};
use crate::rt60::{ReverberationReport, reverberation_report};
use crate::simulate::ImpulseResponses;
use log::info;
use serde::Serialize;
use std::path::Path;

/// Figures of one impulse response
#[derive(Debug, Clone, Serialize)]
pub struct ResponseSummary {
    /// Index into the source list
    pub source: usize,
    /// Index into the receiver list
    pub receiver: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<Band>,
    /// Sample index of the first arrival
    pub first_arrival: Option<usize>,
    pub peak_index: Option<usize>,
    pub peak_value: f64,
    pub energy: f64,
    /// Samples that received at least one image source
    pub nonzero_samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<f64>>,
}

impl ResponseSummary {
    fn new(
        source: usize,
        receiver: usize,
        band: Option<Band>,
        ir: &ImpulseResponse,
        include_samples: bool,
    ) -> Self {
        let peak = ir.peak();
        Self {
            source,
            receiver,
            band,
            first_arrival: ir.first_arrival(),
            peak_index: peak.map(|(i, _)| i),
            peak_value: peak.map(|(_, v)| v).unwrap_or(0.0),
            energy: ir.energy(),
            nonzero_samples: ir.nonzero_count(),
            samples: include_samples.then(|| ir.to_vec()),
        }
    }
}

/// Responses computed with one reflection-loss model
#[derive(Debug, Clone, Serialize)]
pub struct ModelResults {
    /// "simple" or "enhanced"
    pub model: String,
    pub responses: Vec<ResponseSummary>,
}

/// Everything computed for one room
#[derive(Debug, Clone, Serialize)]
pub struct RoomReport {
    pub name: String,
    pub room_dims: [f64; 3],
    pub max_order: u32,
    pub sample_rate: u32,
    pub response_length: usize,
    pub source_positions: Vec<[f64; 3]>,
    pub receiver_positions: Vec<[f64; 3]>,
    pub reverberation: ReverberationReport,
    pub models: Vec<ModelResults>,
}

impl RoomReport {
    /// Report with geometry and RT60 of `scene`, no responses yet
    pub fn new(name: impl Into<String>, scene: &RoomScene) -> Result<Self> {
        let room = scene.room();
        Ok(Self {
            name: name.into(),
            room_dims: room.dims(),
            max_order: room.max_order(),
            sample_rate: room.sample_rate(),
            response_length: room.response_length(),
            source_positions: scene.sources().iter().map(|p| p.to_array()).collect(),
            receiver_positions: scene.receivers().iter().map(|p| p.to_array()).collect(),
            reverberation: reverberation_report(room.dims(), room.abs_coeff())?,
            models: Vec::new(),
        })
    }

    /// Append the responses of one model run
    pub fn add_model(
        &mut self,
        model: ReflectionLossModel,
        responses: &ImpulseResponses,
        include_samples: bool,
    ) {
        let receivers = self.receiver_positions.len().max(1);
        let summaries = responses
            .groups()
            .into_iter()
            .flat_map(|(band, irs)| {
                irs.iter().enumerate().map(move |(idx, ir)| {
                    ResponseSummary::new(
                        idx / receivers,
                        idx % receivers,
                        band,
                        ir,
                        include_samples,
                    )
                })
            })
            .collect();

        self.models.push(ModelResults {
            model: model.name().to_string(),
            responses: summaries,
        });
    }
}

/// Write a report as pretty JSON
pub fn save_report(report: &RoomReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    info!("Saved report for '{}' to {}", report.name, path.display());
    Ok(())
}
