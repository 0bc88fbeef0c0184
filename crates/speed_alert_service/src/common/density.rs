/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use super::types::*;
use crate::environment::DetectionConfig;

/// Rolling window of recent speeds, from which the dynamic alert threshold is derived.
///
/// The window is emptied by [`DensityThresholdEstimator::flush`] on a fixed period and
/// additionally capped at `window_capacity` samples, dropping the oldest first.
#[derive(Debug, Clone)]
pub struct DensityThresholdEstimator {
    window: VecDeque<(VehicleId, SpeedInKmph)>,
    window_capacity: usize,
    density_basis: DensityBasis,
    low_density_max: usize,
    high_density_min: usize,
    threshold_ceiling: f64,
}

impl DensityThresholdEstimator {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            window: VecDeque::new(),
            window_capacity: config.window_capacity,
            density_basis: config.density_basis,
            low_density_max: config.low_density_max,
            high_density_min: config.high_density_min,
            threshold_ceiling: config.threshold_ceiling,
        }
    }

    pub fn record(&mut self, sample: &TelemetrySample) {
        if self.window_capacity > 0 && self.window.len() >= self.window_capacity {
            self.window.pop_front();
        }
        self.window
            .push_back((sample.vehicle_id.to_owned(), sample.speed));
    }

    pub fn average_speed(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let total: f64 = self.window.iter().map(|(_, SpeedInKmph(speed))| speed).sum();
        total / self.window.len() as f64
    }

    fn density_count(&self) -> usize {
        match self.density_basis {
            DensityBasis::SampleCount => self.window.len(),
            DensityBasis::DistinctVehicles => self
                .window
                .iter()
                .map(|(vehicle_id, _)| vehicle_id)
                .collect::<FxHashSet<_>>()
                .len(),
        }
    }

    pub fn density_class(&self) -> DensityClass {
        let count = self.density_count();
        if count < self.low_density_max {
            DensityClass::Low
        } else if count < self.high_density_min {
            DensityClass::Medium
        } else {
            DensityClass::High
        }
    }

    /// `average * multiplier` without the ceiling, or 0 for an empty window or a non-finite result.
    /// This is the value broadcast to clients on every flush.
    pub fn advisory_threshold(&self) -> f64 {
        let threshold = self.average_speed() * self.density_class().multiplier();
        if !threshold.is_finite() || threshold < 0.0 {
            return 0.0;
        }
        threshold
    }

    /// `min(average * multiplier, ceiling)`, the limit used for alerting.
    pub fn current_threshold(&self) -> f64 {
        self.advisory_threshold().min(self.threshold_ceiling)
    }

    pub fn flush(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
