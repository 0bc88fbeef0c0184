/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::types::*;
use crate::environment::DetectionConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct OverspeedingDetected {
    pub vehicle_id: VehicleId,
    pub location: Point,
    pub timestamp: TimeStamp,
    pub speed: f64,
    pub speed_limit: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector {
    mode: ThresholdMode,
    static_speed_cap: f64,
}

impl AnomalyDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            mode: config.threshold_mode,
            static_speed_cap: config.static_speed_cap,
        }
    }

    pub fn mode(&self) -> ThresholdMode {
        self.mode
    }

    pub fn threshold_for(&self, estimator_threshold: f64) -> f64 {
        match self.mode {
            ThresholdMode::Dynamic => estimator_threshold,
            ThresholdMode::Static => self.static_speed_cap,
        }
    }

    pub fn evaluate(&self, sample: &TelemetrySample, threshold: f64) -> bool {
        let SpeedInKmph(speed) = sample.speed;
        speed > threshold
    }

    pub fn check(&self, sample: &TelemetrySample, threshold: f64) -> Option<OverspeedingDetected> {
        self.evaluate(sample, threshold)
            .then(|| OverspeedingDetected {
                vehicle_id: sample.vehicle_id.to_owned(),
                location: sample.location,
                timestamp: sample.timestamp,
                speed: sample.speed.0,
                speed_limit: threshold,
            })
    }
}
