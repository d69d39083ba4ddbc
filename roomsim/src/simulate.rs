//! Simulation driver.
//!
//! Runs the image-source enumeration, the reflection-loss model and the
//! accumulator over every source–receiver pair of a scene. Single-band and
//! multi-band runs, simple and enhanced loss models are all flags on the same
//! [`SimulationDriver`].
//!
//! Pairs are independent: each one is computed on the rayon pool into buffers
//! owned by that worker, and results are collected in source-major order.

use crate::error::{Result, RoomSimError};
use crate::image_source::image_sources;
use crate::impulse::{ImpulseResponse, ImpulseResponseAccumulator};
use crate::reflection::ReflectionLossModel;
use crate::room::{Band, Point3D, RoomScene};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Image sources processed between two progress callbacks
pub const PROGRESS_INTERVAL: usize = 4096;

// ============================================================================
// Options and callback types
// ============================================================================

/// Which absorption bands to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandSelection {
    /// One band, flat list of responses
    Single(Band),
    /// Every band present in the room, one list per band
    All,
}

impl Default for BandSelection {
    fn default() -> Self {
        BandSelection::Single(Band::Mid)
    }
}

/// Flags of one simulation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationOptions {
    /// Use the enhanced reflection-loss model
    pub enhanced: bool,
    pub bands: BandSelection,
}

impl SimulationOptions {
    pub fn new(enhanced: bool, multiband: bool) -> Self {
        Self {
            enhanced,
            bands: if multiband {
                BandSelection::All
            } else {
                BandSelection::default()
            },
        }
    }
}

/// Action to take after a progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue the simulation
    Continue,
    /// Stop the simulation early
    Stop,
}

/// Progress update for a simulation run
#[derive(Debug, Clone)]
pub struct SimulationProgress {
    /// Image sources processed so far, all pairs together
    pub completed: usize,
    /// Image sources of the whole run
    pub total: usize,
    /// Pairs fully processed
    pub pairs_done: usize,
    /// Pairs in the scene
    pub total_pairs: usize,
}

impl SimulationProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Callback type for simulation progress.
///
/// Invoked concurrently from the worker threads.
pub type ProgressCallback = Box<dyn Fn(&SimulationProgress) -> CallbackAction + Send + Sync>;

// ============================================================================
// Results
// ============================================================================

/// Impulse responses of a scene, indexed source-major then receiver
#[derive(Debug, Clone, PartialEq)]
pub enum ImpulseResponses {
    /// Single-band run
    Single(Vec<ImpulseResponse>),
    /// Multi-band run
    MultiBand(BTreeMap<Band, Vec<ImpulseResponse>>),
}

impl ImpulseResponses {
    /// Responses of a single-band run
    pub fn as_single(&self) -> Option<&[ImpulseResponse]> {
        match self {
            ImpulseResponses::Single(v) => Some(v),
            ImpulseResponses::MultiBand(_) => None,
        }
    }

    /// Responses of one band of a multi-band run
    pub fn band(&self, band: Band) -> Option<&[ImpulseResponse]> {
        match self {
            ImpulseResponses::Single(_) => None,
            ImpulseResponses::MultiBand(map) => map.get(&band).map(|v| v.as_slice()),
        }
    }

    /// Every list of responses with its band, `None` for a single-band run
    pub fn groups(&self) -> Vec<(Option<Band>, &[ImpulseResponse])> {
        match self {
            ImpulseResponses::Single(v) => vec![(None, v.as_slice())],
            ImpulseResponses::MultiBand(map) => {
                map.iter().map(|(b, v)| (Some(*b), v.as_slice())).collect()
            }
        }
    }
}

/// Result of one room of a batch
#[derive(Debug)]
pub struct RoomOutcome<T> {
    pub name: String,
    pub result: Result<T>,
}

// ============================================================================
// Driver
// ============================================================================

/// Shared counters of one run
struct RunState {
    completed: AtomicUsize,
    pairs_done: AtomicUsize,
    stop: AtomicBool,
    total: usize,
    total_pairs: usize,
}

impl RunState {
    fn snapshot(&self) -> SimulationProgress {
        SimulationProgress {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total,
            pairs_done: self.pairs_done.load(Ordering::Relaxed),
            total_pairs: self.total_pairs,
        }
    }

    fn cancelled(&self) -> RoomSimError {
        RoomSimError::Cancelled {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total,
        }
    }
}

/// Orchestrates sources × receivers × bands for one configuration
#[derive(Default)]
pub struct SimulationDriver {
    options: SimulationOptions,
    callback: Option<ProgressCallback>,
}

impl SimulationDriver {
    pub fn new(options: SimulationOptions) -> Self {
        Self {
            options,
            callback: None,
        }
    }

    /// Install a progress hook; returning [`CallbackAction::Stop`] cancels the run
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// Compute the impulse responses of every source–receiver pair of `scene`
    ///
    /// # Errors
    /// * `InvalidConfig` if a selected band is missing from the room
    /// * `InvalidGeometry` if an image coincides with a receiver
    /// * `Cancelled` if the progress callback asked to stop
    pub fn run(&self, scene: &RoomScene) -> Result<ImpulseResponses> {
        let room = scene.room();
        let model = ReflectionLossModel::new(self.options.enhanced);

        let bands: Vec<(Band, f64)> = match self.options.bands {
            BandSelection::Single(band) => vec![(band, room.band(band)?.representative())],
            BandSelection::All => room
                .abs_coeff()
                .iter()
                .map(|(band, c)| (*band, c.representative()))
                .collect(),
        };

        let pairs: Vec<(Point3D, Point3D)> = scene
            .sources()
            .iter()
            .flat_map(|s| scene.receivers().iter().map(move |r| (*s, *r)))
            .collect();

        let state = RunState {
            completed: AtomicUsize::new(0),
            pairs_done: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            total: pairs.len().saturating_mul(room.candidate_count()),
            total_pairs: pairs.len(),
        };

        info!(
            "Simulating {} pair(s) x {} image source(s), {} model, bands: {}",
            pairs.len(),
            room.candidate_count(),
            model.name(),
            bands
                .iter()
                .map(|(b, _)| b.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        let per_pair: Vec<Vec<ImpulseResponse>> = pairs
            .par_iter()
            .map(|(source, receiver)| {
                self.simulate_pair(scene, source, receiver, &bands, model, &state)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Processed {} image sources over {} pairs",
            state.completed.load(Ordering::Relaxed),
            state.pairs_done.load(Ordering::Relaxed)
        );

        Ok(match self.options.bands {
            BandSelection::Single(_) => ImpulseResponses::Single(
                per_pair
                    .into_iter()
                    .filter_map(|mut v| v.pop())
                    .collect(),
            ),
            BandSelection::All => {
                let mut map: BTreeMap<Band, Vec<ImpulseResponse>> = bands
                    .iter()
                    .map(|(b, _)| (*b, Vec::with_capacity(pairs.len())))
                    .collect();
                for responses in per_pair {
                    for ((band, _), ir) in bands.iter().zip(responses) {
                        if let Some(list) = map.get_mut(band) {
                            list.push(ir);
                        }
                    }
                }
                ImpulseResponses::MultiBand(map)
            }
        })
    }

    /// One buffer per band for a single pair; the enumeration runs once and
    /// each arrival is deposited into every band.
    fn simulate_pair(
        &self,
        scene: &RoomScene,
        source: &Point3D,
        receiver: &Point3D,
        bands: &[(Band, f64)],
        model: ReflectionLossModel,
        state: &RunState,
    ) -> Result<Vec<ImpulseResponse>> {
        let room = scene.room();
        let accumulator = ImpulseResponseAccumulator::new(room);
        let mut responses: Vec<ImpulseResponse> = bands
            .iter()
            .map(|_| ImpulseResponse::for_room(room))
            .collect();

        let mut pending = 0;
        let mut dropped = 0usize;
        for image in image_sources(room, *source) {
            match accumulator.locate(&image.position, receiver)? {
                Some(arrival) => {
                    for (ir, (_, coeff)) in responses.iter_mut().zip(bands) {
                        ir.deposit(&arrival, model.loss(image.order, *coeff));
                    }
                }
                None => dropped += 1,
            }

            pending += 1;
            if pending == PROGRESS_INTERVAL {
                state.completed.fetch_add(pending, Ordering::Relaxed);
                pending = 0;
                self.checkpoint(state)?;
            }
        }

        state.completed.fetch_add(pending, Ordering::Relaxed);
        state.pairs_done.fetch_add(1, Ordering::Relaxed);
        if dropped > 0 {
            debug!(
                "{} image source(s) arrive after the response window and were dropped",
                dropped
            );
        }
        self.checkpoint(state)?;

        Ok(responses)
    }

    fn checkpoint(&self, state: &RunState) -> Result<()> {
        if state.stop.load(Ordering::Relaxed) {
            return Err(state.cancelled());
        }
        if let Some(callback) = &self.callback {
            if callback(&state.snapshot()) == CallbackAction::Stop {
                state.stop.store(true, Ordering::Relaxed);
                return Err(state.cancelled());
            }
        }
        Ok(())
    }

    /// Run every room independently; a failing room does not stop the others
    pub fn run_batch<I>(&self, rooms: I) -> Vec<RoomOutcome<ImpulseResponses>>
    where
        I: IntoIterator<Item = (String, Result<RoomScene>)>,
    {
        rooms
            .into_iter()
            .map(|(name, scene)| {
                let result = scene.and_then(|scene| self.run(&scene));
                if let Err(e) = &result {
                    warn!("Room '{}' failed: {}", name, e);
                }
                RoomOutcome { name, result }
            })
            .collect()
    }
}

/// Impulse responses of `scene` with the given model and band mode.
///
/// Single-band mode uses the `mid` band.
pub fn compute_impulse_responses(
    scene: &RoomScene,
    enhanced: bool,
    multiband: bool,
) -> Result<ImpulseResponses> {
    SimulationDriver::new(SimulationOptions::new(enhanced, multiband)).run(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{BandCoefficients, RoomModel};
    use std::sync::Arc;

    fn build_scene(max_order: i64, sources: Vec<[f64; 3]>, receivers: Vec<[f64; 3]>) -> RoomScene {
        let abs: BTreeMap<Band, BandCoefficients> =
            [(Band::Low, 0.05), (Band::Mid, 0.1), (Band::High, 0.3)]
                .into_iter()
                .map(|(b, a)| (b, BandCoefficients::uniform(a).unwrap()))
                .collect();
        let room = RoomModel::new([5.0, 4.0, 3.0], abs, max_order).unwrap();
        RoomScene::new(
            room,
            sources.into_iter().map(Point3D::from).collect(),
            receivers.into_iter().map(Point3D::from).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_direct_path_only() {
        let scene = build_scene(0, vec![[1.0, 1.0, 1.0]], vec![[4.0, 3.0, 2.0]]);
        let responses = compute_impulse_responses(&scene, false, false).unwrap();
        let irs = responses.as_single().unwrap();
        assert_eq!(irs.len(), 1);

        let ir = &irs[0];
        assert_eq!(ir.len(), 66150);
        assert_eq!(ir.nonzero_count(), 1);
        let (idx, value) = ir.peak().unwrap();
        assert_eq!(idx, 481);
        assert!((value - 1.0 / 14f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_output_order_is_source_major() {
        let sources = vec![[1.0, 1.0, 1.0], [2.5, 2.0, 1.5]];
        let receivers = vec![[4.0, 3.0, 2.0], [0.5, 3.5, 2.5], [3.0, 0.5, 0.5]];
        let scene = build_scene(1, sources.clone(), receivers.clone());
        let irs = compute_impulse_responses(&scene, false, false).unwrap();
        let irs = irs.as_single().unwrap();
        assert_eq!(irs.len(), 6);

        for (s_idx, s) in sources.iter().enumerate() {
            for (r_idx, r) in receivers.iter().enumerate() {
                let single = build_scene(1, vec![*s], vec![*r]);
                let expected = compute_impulse_responses(&single, false, false).unwrap();
                assert_eq!(
                    irs[s_idx * receivers.len() + r_idx],
                    expected.as_single().unwrap()[0]
                );
            }
        }
    }

    #[test]
    fn test_multiband_matches_single_band() {
        let scene = build_scene(2, vec![[1.0, 1.0, 1.0]], vec![[4.0, 3.0, 2.0]]);
        let single = compute_impulse_responses(&scene, true, false).unwrap();
        let all = SimulationDriver::new(SimulationOptions {
            enhanced: true,
            bands: BandSelection::All,
        })
        .run(&scene)
        .unwrap();

        assert_eq!(all.groups().len(), 3);
        assert_eq!(all.band(Band::Mid).unwrap(), single.as_single().unwrap());

        // more absorption, less energy
        let low = all.band(Band::Low).unwrap()[0].energy();
        let high = all.band(Band::High).unwrap()[0].energy();
        assert!(low > high);
    }

    #[test]
    fn test_enhanced_has_less_energy() {
        let scene = build_scene(3, vec![[1.0, 1.0, 1.0]], vec![[4.0, 3.0, 2.0]]);
        let simple = compute_impulse_responses(&scene, false, false).unwrap();
        let enhanced = compute_impulse_responses(&scene, true, false).unwrap();
        let simple = &simple.as_single().unwrap()[0];
        let enhanced = &enhanced.as_single().unwrap()[0];
        assert!(enhanced.energy() < simple.energy());
        // direct sound is identical
        assert_eq!(simple.peak(), enhanced.peak());
    }

    #[test]
    fn test_missing_band_is_config_error() {
        let mut abs = BTreeMap::new();
        abs.insert(Band::Low, BandCoefficients::uniform(0.1).unwrap());
        let room = RoomModel::new([5.0, 4.0, 3.0], abs, 0).unwrap();
        let scene = RoomScene::new(
            room,
            vec![Point3D::new(1.0, 1.0, 1.0)],
            vec![Point3D::new(2.0, 2.0, 2.0)],
        )
        .unwrap();
        let err = compute_impulse_responses(&scene, false, false).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_progress_and_cancellation() {
        // 21^3 = 9261 candidates per pair, more than two intervals
        let scene = build_scene(10, vec![[1.0, 1.0, 1.0]], vec![[4.0, 3.0, 2.0]]);

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let driver = SimulationDriver::new(SimulationOptions::default()).with_progress(Box::new(
            move |p: &SimulationProgress| {
                seen.fetch_add(1, Ordering::Relaxed);
                assert!(p.completed <= p.total);
                CallbackAction::Continue
            },
        ));
        driver.run(&scene).unwrap();
        // two full intervals plus the end of the pair
        assert_eq!(calls.load(Ordering::Relaxed), 3);

        let driver = SimulationDriver::new(SimulationOptions::default())
            .with_progress(Box::new(|_: &SimulationProgress| CallbackAction::Stop));
        let err = driver.run(&scene).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_reflected_image_on_receiver_is_geometry_error() {
        // outside the room, where the first x image of the source lands
        let scene = build_scene(1, vec![[1.0, 1.0, 1.0]], vec![[11.0, 1.0, 1.0]]);
        let err = compute_impulse_responses(&scene, false, false).unwrap_err();
        assert!(err.is_geometry_error());

        // the direct path alone is fine
        let scene = build_scene(0, vec![[1.0, 1.0, 1.0]], vec![[11.0, 1.0, 1.0]]);
        assert!(compute_impulse_responses(&scene, false, true).is_ok());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let good = build_scene(1, vec![[1.0, 1.0, 1.0]], vec![[4.0, 3.0, 2.0]]);
        let bad = RoomModel::new([0.0, 4.0, 3.0], BTreeMap::new(), 1)
            .and_then(|room| RoomScene::new(room, vec![], vec![]));

        let outcomes = SimulationDriver::default().run_batch(vec![
            ("bad".to_string(), bad),
            ("good".to_string(), Ok(good)),
        ]);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.as_ref().unwrap_err().is_geometry_error());
        assert_eq!(outcomes[1].name, "good");
        assert!(outcomes[1].result.is_ok());
    }
}
