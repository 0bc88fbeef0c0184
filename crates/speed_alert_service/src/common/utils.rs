/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::f64::consts::PI;

use chrono::Utc;

use super::types::*;

fn deg2rad(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

/// Great-circle distance in meters between two points, using the haversine formula.
///
/// Coordinates are taken as they are; range checks belong to the decoder.
pub fn distance_between_in_meters(latlong1: &Point, latlong2: &Point) -> f64 {
    // Radius of Earth in meters
    let r: f64 = 6371000.0;

    let Latitude(lat1) = latlong1.lat;
    let Longitude(lon1) = latlong1.lon;
    let Latitude(lat2) = latlong2.lat;
    let Longitude(lon2) = latlong2.lon;

    let dlat = deg2rad(lat2 - lat1);
    let dlon = deg2rad(lon2 - lon1);

    let rlat1 = deg2rad(lat1);
    let rlat2 = deg2rad(lat2);

    let sq = |x: f64| x * x;

    // Out-of-range inputs can push h slightly outside [0, 1]
    let h = (sq((dlat / 2.0).sin()) + rlat1.cos() * rlat2.cos() * sq((dlon / 2.0).sin()))
        .clamp(0.0, 1.0);

    2.0 * r * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn is_valid_point(point: &Point) -> bool {
    let Latitude(lat) = point.lat;
    let Longitude(lon) = point.lon;
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

pub fn is_valid_speed(speed: &SpeedInKmph) -> bool {
    speed.0.is_finite() && speed.0 >= 0.0
}

pub fn alert_topic(alert_prefix: &str, vehicle_id: &VehicleId) -> String {
    format!("{}/{}", alert_prefix.trim_end_matches('/'), vehicle_id)
}

pub fn get_current_timestamp() -> TimeStamp {
    TimeStamp(Utc::now())
}
