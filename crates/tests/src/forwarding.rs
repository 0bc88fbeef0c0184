/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use serde_json::{json, Value};
use speed_alert_service::{environment::RouterConfig, router::RouterStats};

use crate::harness::*;

#[tokio::test]
async fn events_are_forwarded_verbatim() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    let accident = json!({"type": "accident", "location": "MG Road", "lanes_blocked": 2});
    let server_data = json!({"status": "ok", "vehicles": ["car1", "car2"]});
    router.route(message("accident", &accident.to_string())).await;
    router
        .route(message("sendserverdata1", &server_data.to_string()))
        .await;

    let forwarded = bus
        .published_to("servermaincontentsend")
        .iter()
        .map(|payload| serde_json::from_str::<Value>(payload))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(forwarded, vec![accident, server_data]);

    Ok(())
}

#[tokio::test]
async fn malformed_event_is_not_forwarded() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router.route(message("traffic", "jam near silk board")).await;

    assert_eq!(router.stats().decode_errors, 1);
    assert!(bus.published().is_empty());

    Ok(())
}

#[tokio::test]
async fn control_input_toggles_emergency_mode() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;
    router.route(telemetry("car1", 12.9716, 77.5947, 20.0)).await;
    assert!(router.emergency_mode());

    router.route(message("input", "false")).await;
    assert!(!router.emergency_mode());
    router.route(location("ambloc", "amb1", 12.9716, 77.5946)).await;
    assert!(bus.published_to("alert/car1").is_empty());

    router.route(message("input", "  TRUE\n")).await;
    assert!(router.emergency_mode());
    router.route(location("ambloc", "amb1", 12.9716, 77.5946)).await;
    assert_eq!(bus.published_to("alert/car1").len(), 1);

    Ok(())
}

#[tokio::test]
async fn ambulance_without_id_alerts_every_nearby_car() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;
    router.route(telemetry("car1", 12.9716, 77.5947, 20.0)).await;
    router.route(telemetry("car2", 12.9716, 77.5946, 20.0)).await;

    router
        .route(message(
            "ambloc",
            r#"{"location":{"latitude":12.9716,"longitude":77.5946}}"#,
        ))
        .await;

    assert_eq!(router.stats().decode_errors, 0);
    assert_eq!(bus.published_to("alert/car1").len(), 1);
    assert_eq!(bus.published_to("alert/car2").len(), 1);

    Ok(())
}

#[tokio::test]
async fn vehicle_location_without_id_is_dropped() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router
        .route(message(
            "car/location",
            r#"{"location":{"latitude":12.9716,"longitude":77.5946}}"#,
        ))
        .await;

    assert_eq!(router.stats().decode_errors, 1);
    assert!(router.store().is_empty());
    assert!(bus.published().is_empty());

    Ok(())
}

#[tokio::test]
async fn invalid_control_input_is_ignored() -> anyhow::Result<()> {
    let (mut router, _bus) = routing_router(RouterConfig::default()).await?;

    router.route(message("input", "maybe")).await;

    assert_eq!(router.stats().invalid_control_inputs, 1);
    assert!(router.emergency_mode());

    Ok(())
}

#[tokio::test]
async fn vehicle_location_updates_store_without_speed() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router
        .route(location("car/location", "car7", 12.9716, 77.5946))
        .await;
    router
        .route(location("car/location", "car7", 12.97161, 77.5946))
        .await;

    let changes = bus.published_to("vehiclelocation");
    assert_eq!(changes.len(), 1);
    let change: Value = serde_json::from_str(&changes[0])?;
    assert_eq!(change["vehicle_id"], "car7");
    assert_eq!(change["speed"], 0.0);
    assert_eq!(router.store().len(), 1);
    assert_eq!(router.stats().telemetry_processed, 0);

    Ok(())
}

#[tokio::test]
async fn outbound_topics_are_not_routed() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router
        .route(message("alert/car1", "Speed alert! Current speed: 90 km/h. Please slow down!"))
        .await;
    router.route(message("client_process", r#"{"threshold":60}"#)).await;

    assert_eq!(router.stats(), RouterStats::default());
    assert!(bus.published().is_empty());

    Ok(())
}
