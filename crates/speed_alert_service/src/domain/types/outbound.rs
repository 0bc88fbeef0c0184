/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use serde::Serialize;

use crate::common::types::*;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LocationChangeEvent {
    pub vehicle_id: VehicleId,
    pub latitude: Latitude,
    pub longitude: Longitude,
    pub speed: SpeedInKmph,
    pub timestamp: TimeStamp,
}

impl From<&VehicleState> for LocationChangeEvent {
    fn from(state: &VehicleState) -> Self {
        Self {
            vehicle_id: state.vehicle_id.to_owned(),
            latitude: state.last_location.lat,
            longitude: state.last_location.lon,
            speed: state.last_speed,
            timestamp: state.last_update,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct ThresholdBroadcast {
    pub threshold: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub vehicles: Vec<VehicleState>,
}

#[derive(Debug, Serialize)]
pub struct ResponseData {
    pub result: String,
}
