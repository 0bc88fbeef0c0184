/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

#[cfg(test)]
mod alerting;
#[cfg(test)]
mod forwarding;
#[cfg(test)]
mod router_lifecycle;

#[cfg(test)]
pub(crate) mod harness {
    use std::sync::Arc;

    use speed_alert_service::{
        bus::{memory::InMemoryBus, InboundMessage},
        environment::RouterConfig,
        router::TelemetryRouter,
    };

    pub async fn routing_router(
        config: RouterConfig,
    ) -> anyhow::Result<(TelemetryRouter, Arc<InMemoryBus>)> {
        let bus = Arc::new(InMemoryBus::new(64));
        let mut router = TelemetryRouter::new(config, bus.clone());
        router.start().await?;
        Ok((router, bus))
    }

    pub fn message(topic: &str, payload: &str) -> InboundMessage {
        InboundMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        }
    }

    pub fn telemetry(
        vehicle_id: &str,
        latitude: f64,
        longitude: f64,
        speed: f64,
    ) -> InboundMessage {
        message(
            &format!("myvehiclestatus/{vehicle_id}"),
            &serde_json::json!({
                "vehicle_id": vehicle_id,
                "latitude": latitude,
                "longitude": longitude,
                "speed": speed,
            })
            .to_string(),
        )
    }

    pub fn location(
        topic: &str,
        vehicle_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> InboundMessage {
        message(
            topic,
            &serde_json::json!({
                "id": vehicle_id,
                "location": { "latitude": latitude, "longitude": longitude },
            })
            .to_string(),
        )
    }

    /// Topics of every published alert, in publish order.
    pub fn alert_topics(bus: &InMemoryBus) -> Vec<String> {
        bus.published()
            .into_iter()
            .map(|published| published.topic)
            .filter(|topic| topic.starts_with("alert/"))
            .collect()
    }
}
