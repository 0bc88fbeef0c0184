/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::{types::*, utils::distance_between_in_meters};

/// Last known location and speed of every vehicle seen so far.
///
/// Entries are never evicted. Neighbour lookups are a linear scan over all entries.
#[derive(Debug, Clone)]
pub struct VehicleStateStore {
    states: Vec<VehicleState>,
    index: FxHashMap<VehicleId, usize>,
    movement_threshold_meters: f64,
}

impl VehicleStateStore {
    pub fn new(movement_threshold_meters: f64) -> Self {
        Self {
            states: Vec::new(),
            index: FxHashMap::default(),
            movement_threshold_meters,
        }
    }

    /// Records a telemetry sample. Returns the state it replaced and whether the
    /// vehicle moved further than the movement threshold; a new vehicle always counts as moved.
    pub fn upsert(&mut self, sample: &TelemetrySample) -> (Option<VehicleState>, bool) {
        self.write(
            &sample.vehicle_id,
            sample.location,
            Some(sample.speed),
            sample.timestamp,
        )
    }

    /// Records a position without a speed reading, keeping the last known speed.
    pub fn upsert_location(
        &mut self,
        vehicle_id: &VehicleId,
        location: Point,
        timestamp: TimeStamp,
    ) -> (Option<VehicleState>, bool) {
        self.write(vehicle_id, location, None, timestamp)
    }

    fn write(
        &mut self,
        vehicle_id: &VehicleId,
        location: Point,
        speed: Option<SpeedInKmph>,
        timestamp: TimeStamp,
    ) -> (Option<VehicleState>, bool) {
        if let Some(state) = self
            .index
            .get(vehicle_id)
            .and_then(|position| self.states.get_mut(*position))
        {
            let previous = state.clone();
            let moved = distance_between_in_meters(&previous.last_location, &location)
                > self.movement_threshold_meters;

            state.last_location = location;
            if let Some(speed) = speed {
                state.last_speed = speed;
            }
            state.last_update = timestamp;

            return (Some(previous), moved);
        }

        self.index.insert(vehicle_id.to_owned(), self.states.len());
        self.states.push(VehicleState {
            vehicle_id: vehicle_id.to_owned(),
            last_location: location,
            last_speed: speed.unwrap_or(SpeedInKmph(0.0)),
            last_update: timestamp,
        });

        (None, true)
    }

    pub fn get(&self, vehicle_id: &VehicleId) -> Option<VehicleState> {
        self.index
            .get(vehicle_id)
            .and_then(|position| self.states.get(*position))
            .cloned()
    }

    pub fn all_states(&self) -> Vec<VehicleState> {
        self.states.to_vec()
    }

    /// Every vehicle whose last location lies within `radius` (inclusive) of `origin`,
    /// except `excluding`.
    pub fn neighbors_within(
        &self,
        origin: &Point,
        radius: Radius,
        excluding: &VehicleId,
    ) -> BTreeSet<VehicleId> {
        let mut neighbors = self.vehicles_within(origin, radius);
        neighbors.remove(excluding);
        neighbors
    }

    /// Every tracked vehicle within `radius` of `origin`, boundary inclusive.
    pub fn vehicles_within(&self, origin: &Point, radius: Radius) -> BTreeSet<VehicleId> {
        let Radius(radius) = radius;
        self.states
            .iter()
            .filter(|state| distance_between_in_meters(origin, &state.last_location) <= radius)
            .map(|state| state.vehicle_id.to_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
