/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    common::{types::*, utils::*},
    tools::error::AppError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Telemetry,
    ControlInput,
    RawForwarded,
    Event,
    AmbulanceLocation,
    VehicleLocation,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryReq {
    pub vehicle_id: Option<VehicleId>,
    pub id: Option<VehicleId>,
    pub latitude: Latitude,
    pub longitude: Longitude,
    pub speed: SpeedInKmph,
}

#[derive(Debug, Deserialize)]
pub struct LocationReq {
    pub latitude: Latitude,
    pub longitude: Longitude,
}

#[derive(Debug, Deserialize)]
pub struct LocationBroadcastReq {
    pub id: Option<VehicleId>,
    pub vehicle_id: Option<VehicleId>,
    pub location: LocationReq,
}

/// Every inbound message the router knows how to handle, decoded once at the edge.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutedMessage {
    Telemetry(TelemetrySample),
    AmbulanceLocation(AmbulanceBroadcast),
    VehicleLocation(LocationBroadcast),
    GenericForward { source_topic: String, payload: Value },
    ControlInput(ControlInput),
}

fn validated_point(latitude: Latitude, longitude: Longitude) -> Result<Point, AppError> {
    let point = Point {
        lat: latitude,
        lon: longitude,
    };
    if !is_valid_point(&point) {
        return Err(AppError::ValidationError(format!(
            "Coordinate out of range : (Lat : {}, Lon : {})",
            latitude.0, longitude.0
        )));
    }
    Ok(point)
}

fn decode_telemetry(payload: &[u8], received_at: TimeStamp) -> Result<TelemetrySample, AppError> {
    let TelemetryReq {
        vehicle_id,
        id,
        latitude,
        longitude,
        speed,
    } = serde_json::from_slice(payload).map_err(|err| AppError::DecodeError(err.to_string()))?;
    let vehicle_id = vehicle_id
        .or(id)
        .ok_or_else(|| AppError::DecodeError("missing field `vehicle_id` or `id`".to_string()))?;

    let location = validated_point(latitude, longitude)?;
    if !is_valid_speed(&speed) {
        return Err(AppError::ValidationError(format!(
            "Speed out of range : {}",
            speed.0
        )));
    }

    Ok(TelemetrySample {
        vehicle_id,
        location,
        speed,
        timestamp: received_at,
    })
}

fn decode_ambulance(
    payload: &[u8],
    received_at: TimeStamp,
) -> Result<AmbulanceBroadcast, AppError> {
    let LocationBroadcastReq {
        id,
        vehicle_id,
        location,
    } = serde_json::from_slice(payload).map_err(|err| AppError::DecodeError(err.to_string()))?;

    Ok(AmbulanceBroadcast {
        vehicle_id: id.or(vehicle_id),
        location: validated_point(location.latitude, location.longitude)?,
        timestamp: received_at,
    })
}

fn decode_location(payload: &[u8], received_at: TimeStamp) -> Result<LocationBroadcast, AppError> {
    let AmbulanceBroadcast {
        vehicle_id,
        location,
        timestamp,
    } = decode_ambulance(payload, received_at)?;

    Ok(LocationBroadcast {
        vehicle_id: vehicle_id
            .ok_or_else(|| AppError::DecodeError("missing field `id`".to_string()))?,
        location,
        timestamp,
    })
}

fn decode_control_input(payload: &[u8]) -> Result<ControlInput, AppError> {
    let raw = std::str::from_utf8(payload).map_err(|err| AppError::DecodeError(err.to_string()))?;
    ControlInput::from_str(raw.trim())
        .map_err(|_| AppError::InvalidControlInput(raw.trim().to_string()))
}

pub fn decode_message(
    kind: TopicKind,
    topic: &str,
    payload: &[u8],
    received_at: TimeStamp,
) -> Result<RoutedMessage, AppError> {
    match kind {
        TopicKind::Telemetry => {
            decode_telemetry(payload, received_at).map(RoutedMessage::Telemetry)
        }
        TopicKind::AmbulanceLocation => {
            decode_ambulance(payload, received_at).map(RoutedMessage::AmbulanceLocation)
        }
        TopicKind::VehicleLocation => {
            decode_location(payload, received_at).map(RoutedMessage::VehicleLocation)
        }
        TopicKind::ControlInput => decode_control_input(payload).map(RoutedMessage::ControlInput),
        TopicKind::RawForwarded | TopicKind::Event => serde_json::from_slice::<Value>(payload)
            .map(|payload| RoutedMessage::GenericForward {
                source_topic: topic.to_string(),
                payload,
            })
            .map_err(|err| AppError::DecodeError(err.to_string())),
    }
}
