/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct VehicleId(pub String);

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
pub struct Latitude(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
pub struct Longitude(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
pub struct Radius(pub f64);

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
pub struct TimeStamp(pub DateTime<Utc>);

#[derive(Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
pub struct SpeedInKmph(pub f64);

impl<'de> Deserialize<'de> for SpeedInKmph {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error, Unexpected};

        struct SpeedVisitor;

        #[allow(clippy::needless_lifetimes)]
        impl<'de> serde::de::Visitor<'de> for SpeedVisitor {
            type Value = SpeedInKmph;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a speed in km/h as a number or a numeric string")
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Ok(SpeedInKmph(value))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
                Ok(SpeedInKmph(v as f64))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
                Ok(SpeedInKmph(v as f64))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                value
                    .trim()
                    .parse::<f64>()
                    .map(SpeedInKmph)
                    .map_err(|_| Error::invalid_value(Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_any(SpeedVisitor)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Point {
    pub lat: Latitude,
    pub lon: Longitude,
}

/// One decoded, validated telemetry reading. The timestamp is the receive time.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TelemetrySample {
    pub vehicle_id: VehicleId,
    pub location: Point,
    pub speed: SpeedInKmph,
    pub timestamp: TimeStamp,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VehicleState {
    pub vehicle_id: VehicleId,
    pub last_location: Point,
    pub last_speed: SpeedInKmph,
    pub last_update: TimeStamp,
}

/// A position-only broadcast, used for ambulance and plain vehicle location topics.
#[derive(Clone, Debug, PartialEq)]
pub struct LocationBroadcast {
    pub vehicle_id: VehicleId,
    pub location: Point,
    pub timestamp: TimeStamp,
}

/// An emergency vehicle position. Ambulance publishers may omit their id.
#[derive(Clone, Debug, PartialEq)]
pub struct AmbulanceBroadcast {
    pub vehicle_id: Option<VehicleId>,
    pub location: Point,
    pub timestamp: TimeStamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DensityClass {
    Low,
    Medium,
    High,
}

impl DensityClass {
    pub fn multiplier(&self) -> f64 {
        match self {
            DensityClass::Low => 1.75,
            DensityClass::Medium => 1.5,
            DensityClass::High => 1.25,
        }
    }
}

/// What the density classifier counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DensityBasis {
    #[default]
    SampleCount,
    DistinctVehicles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ThresholdMode {
    #[default]
    Dynamic,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AlertKind {
    Direct,
    ProximityWarning,
    EmergencyVehicleNearby,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundAlert {
    pub topic: String,
    pub recipient: VehicleId,
    pub kind: AlertKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RouterState {
    Idle,
    AwaitingConnection,
    Routing,
    Draining,
    Stopped,
}

/// Emergency-mode toggle carried on the control input topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum ControlInput {
    #[strum(serialize = "true")]
    Enable,
    #[strum(serialize = "false")]
    Disable,
}
