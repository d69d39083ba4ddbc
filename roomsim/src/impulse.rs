//! Impulse-response buffers and delay binning.
//!
//! Each image source contributes `loss / distance` at the sample index of its
//! propagation delay. Contributions landing on the same index add up; this
//! aliasing is part of the discretisation and is kept as is.

use crate::error::{Result, RoomSimError};
use crate::room::{Point3D, RESPONSE_DURATION, RoomModel};
use ndarray::Array1;

/// Number of samples in a response window at `sample_rate`: `floor(sample_rate · 1.5)`
pub fn response_length(sample_rate: u32) -> usize {
    (sample_rate as f64 * RESPONSE_DURATION).floor() as usize
}

/// Discrete-time impulse response of one source–receiver pair
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    samples: Array1<f64>,
    sample_rate: u32,
}

impl ImpulseResponse {
    /// Silent response of the fixed window length
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Array1::zeros(response_length(sample_rate)),
            sample_rate,
        }
    }

    /// Silent response sized for `room`
    pub fn for_room(room: &RoomModel) -> Self {
        Self::new(room.sample_rate())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &Array1<f64> {
        &self.samples
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.to_vec()
    }

    /// Add `loss / distance` at the arrival's sample index.
    ///
    /// Returns `false` and leaves the response untouched when the index lies
    /// past the end of the window.
    pub fn deposit(&mut self, arrival: &Arrival, loss: f64) -> bool {
        match self.samples.get_mut(arrival.index) {
            Some(sample) => {
                *sample += loss / arrival.distance;
                true
            }
            None => false,
        }
    }

    /// Sample-wise sum with another response of the same length
    pub fn merge(&mut self, other: &ImpulseResponse) -> Result<()> {
        if other.len() != self.len() || other.sample_rate != self.sample_rate {
            return Err(RoomSimError::config(format!(
                "cannot merge responses of {} samples @ {} Hz and {} samples @ {} Hz",
                self.len(),
                self.sample_rate,
                other.len(),
                other.sample_rate
            )));
        }
        self.samples += &other.samples;
        Ok(())
    }

    /// Time of each sample in seconds
    pub fn time_axis(&self) -> Vec<f64> {
        let sr = self.sample_rate as f64;
        (0..self.len()).map(|i| i as f64 / sr).collect()
    }

    /// Largest sample and its index, `None` for a silent response
    pub fn peak(&self) -> Option<(usize, f64)> {
        self.samples
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| *v != 0.0)
            .fold(None, |best, (i, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
    }

    /// Sum of squared samples
    pub fn energy(&self) -> f64 {
        self.samples.iter().map(|v| v * v).sum()
    }

    /// Number of samples that received at least one arrival
    pub fn nonzero_count(&self) -> usize {
        self.samples.iter().filter(|v| **v != 0.0).count()
    }

    /// Index of the first non-zero sample
    pub fn first_arrival(&self) -> Option<usize> {
        self.samples.iter().position(|v| *v != 0.0)
    }
}

/// Where and how strongly an image source is heard at a receiver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    /// Sample index of the propagation delay
    pub index: usize,
    /// Distance from image to receiver (m)
    pub distance: f64,
}

/// Maps image positions to sample indices for one room
#[derive(Debug, Clone, Copy)]
pub struct ImpulseResponseAccumulator {
    speed_of_sound: f64,
    sample_rate: f64,
    len: usize,
}

impl ImpulseResponseAccumulator {
    pub fn new(room: &RoomModel) -> Self {
        Self {
            speed_of_sound: room.speed_of_sound(),
            sample_rate: room.sample_rate() as f64,
            len: room.response_length(),
        }
    }

    /// Arrival of an image at `receiver`, or `None` when its delay falls past the window.
    ///
    /// # Errors
    /// `InvalidGeometry` when the image coincides with the receiver or the
    /// distance is not finite.
    pub fn locate(&self, image: &Point3D, receiver: &Point3D) -> Result<Option<Arrival>> {
        let distance = image.distance_to(receiver);
        if !distance.is_finite() {
            return Err(RoomSimError::geometry(format!(
                "non-finite distance between image {:?} and receiver {:?}",
                image.to_array(),
                receiver.to_array()
            )));
        }
        if distance == 0.0 {
            return Err(RoomSimError::geometry(format!(
                "image source coincides with receiver at {:?}",
                receiver.to_array()
            )));
        }

        let delay = distance / self.speed_of_sound;
        let position = (delay * self.sample_rate).floor();
        if position >= self.len as f64 {
            return Ok(None);
        }

        Ok(Some(Arrival {
            index: position as usize,
            distance,
        }))
    }

    /// Locate `image` and deposit `loss / distance` into `response`.
    ///
    /// Returns whether the contribution fell inside the window.
    pub fn accumulate(
        &self,
        response: &mut ImpulseResponse,
        image: &Point3D,
        receiver: &Point3D,
        loss: f64,
    ) -> Result<bool> {
        match self.locate(image, receiver)? {
            Some(arrival) => Ok(response.deposit(&arrival, loss)),
            None => Ok(false),
        }
    }
}
