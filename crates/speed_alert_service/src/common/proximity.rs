/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::{types::*, utils::alert_topic, vehicle_state::VehicleStateStore};

pub const DIRECT_ALERT_REPEAT_COUNT: usize = 3;
pub const PROXIMITY_WARNING_MESSAGE: &str = "Please be aware of a speeding car nearby!";
pub const EMERGENCY_VEHICLE_MESSAGE: &str = "Emergency vehicle approaching. Please give way!";

pub fn speed_alert_message(speed: SpeedInKmph) -> String {
    let SpeedInKmph(speed) = speed;
    format!("Speed alert! Current speed: {speed} km/h. Please slow down!")
}

/// Builds the alert burst for one anomaly: repeated direct alerts to the offender,
/// then one warning for every vehicle near it.
#[derive(Debug, Clone)]
pub struct ProximityAlertDispatcher {
    alert_prefix: String,
}

impl ProximityAlertDispatcher {
    pub fn new(alert_prefix: &str) -> Self {
        Self {
            alert_prefix: alert_prefix.to_string(),
        }
    }

    fn alert(&self, recipient: &VehicleId, kind: AlertKind, message: String) -> OutboundAlert {
        OutboundAlert {
            topic: alert_topic(&self.alert_prefix, recipient),
            recipient: recipient.to_owned(),
            kind,
            message,
        }
    }

    pub fn dispatch(
        &self,
        anomalous_vehicle: &VehicleId,
        origin: &Point,
        speed: SpeedInKmph,
        radius: Radius,
        store: &VehicleStateStore,
    ) -> Vec<OutboundAlert> {
        let neighbors = store.neighbors_within(origin, radius, anomalous_vehicle);

        let mut alerts = Vec::with_capacity(DIRECT_ALERT_REPEAT_COUNT + neighbors.len());
        alerts.extend((0..DIRECT_ALERT_REPEAT_COUNT).map(|_| {
            self.alert(
                anomalous_vehicle,
                AlertKind::Direct,
                speed_alert_message(speed),
            )
        }));
        alerts.extend(neighbors.iter().map(|neighbor| {
            self.alert(
                neighbor,
                AlertKind::ProximityWarning,
                PROXIMITY_WARNING_MESSAGE.to_string(),
            )
        }));

        alerts
    }

    pub fn dispatch_emergency(
        &self,
        emergency_vehicle: Option<&VehicleId>,
        origin: &Point,
        radius: Radius,
        store: &VehicleStateStore,
    ) -> Vec<OutboundAlert> {
        let recipients = match emergency_vehicle {
            Some(emergency_vehicle) => store.neighbors_within(origin, radius, emergency_vehicle),
            None => store.vehicles_within(origin, radius),
        };
        recipients
            .iter()
            .map(|neighbor| {
                self.alert(
                    neighbor,
                    AlertKind::EmergencyVehicleNearby,
                    EMERGENCY_VEHICLE_MESSAGE.to_string(),
                )
            })
            .collect()
    }
}
