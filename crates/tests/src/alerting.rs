/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use speed_alert_service::{
    common::types::{SpeedInKmph, ThresholdMode, VehicleId},
    environment::{DetectionConfig, RouterConfig},
};

use crate::harness::*;

const SPEED_ALERT: &str = "Speed alert! Current speed: 90 km/h. Please slow down!";
const PROXIMITY_WARNING: &str = "Please be aware of a speeding car nearby!";

#[tokio::test]
async fn lone_speeding_car_gets_three_direct_alerts() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router.route(telemetry("car1", 12.9716, 77.5946, 90.0)).await;

    assert_eq!(bus.published_to("alert/car1"), vec![SPEED_ALERT; 3]);
    assert_eq!(alert_topics(&bus).len(), 3);
    // a lone 90 km/h sample is capped at the 60 km/h ceiling
    assert_eq!(router.estimator().current_threshold(), 60.0);
    assert_eq!(router.stats().alerts_emitted, 3);

    Ok(())
}

#[tokio::test]
async fn nearby_car_is_warned_once() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router.route(telemetry("car2", 12.9716, 77.5947, 20.0)).await;
    assert!(alert_topics(&bus).is_empty());

    router.route(telemetry("car1", 12.9716, 77.5946, 90.0)).await;

    assert_eq!(bus.published_to("alert/car1"), vec![SPEED_ALERT; 3]);
    assert_eq!(bus.published_to("alert/car2"), vec![PROXIMITY_WARNING]);
    assert_eq!(
        alert_topics(&bus),
        vec!["alert/car1", "alert/car1", "alert/car1", "alert/car2"]
    );

    Ok(())
}

#[tokio::test]
async fn distant_car_is_never_warned() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    // about 5 km north of car1
    router.route(telemetry("car3", 13.0166, 77.5946, 20.0)).await;
    router.route(telemetry("car1", 12.9716, 77.5946, 90.0)).await;

    assert_eq!(bus.published_to("alert/car1").len(), 3);
    assert!(bus.published_to("alert/car3").is_empty());

    Ok(())
}

#[tokio::test]
async fn telemetry_carrying_both_id_fields_still_alerts() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router
        .route(message(
            "myvehiclestatus/car1",
            r#"{"vehicle_id":"car1","id":"car1","latitude":12.9716,"longitude":77.5946,"speed":90}"#,
        ))
        .await;

    assert_eq!(router.stats().decode_errors, 0);
    assert_eq!(bus.published_to("alert/car1"), vec![SPEED_ALERT; 3]);
    assert!(router.store().get(&VehicleId("car1".to_string())).is_some());

    Ok(())
}

#[tokio::test]
async fn telemetry_without_speed_is_dropped() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router
        .route(message(
            "myvehiclestatus/car1",
            r#"{"vehicle_id":"car1","latitude":12.9716,"longitude":77.5946}"#,
        ))
        .await;

    assert_eq!(router.stats().decode_errors, 1);
    assert_eq!(router.stats().telemetry_processed, 0);
    assert!(router.store().is_empty());
    assert!(router.estimator().is_empty());
    assert!(bus.published().is_empty());

    Ok(())
}

#[tokio::test]
async fn out_of_range_coordinates_are_dropped() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router.route(telemetry("car1", 91.0, 77.5946, 30.0)).await;

    assert_eq!(router.stats().validation_errors, 1);
    assert!(router.store().is_empty());
    assert!(bus.published().is_empty());

    Ok(())
}

#[tokio::test]
async fn speed_at_threshold_does_not_alert() -> anyhow::Result<()> {
    let config = RouterConfig {
        detection: DetectionConfig {
            threshold_mode: ThresholdMode::Static,
            ..DetectionConfig::default()
        },
        ..RouterConfig::default()
    };
    let (mut router, bus) = routing_router(config).await?;

    router.route(telemetry("car1", 12.9716, 77.5946, 80.0)).await;
    assert!(alert_topics(&bus).is_empty());

    router.route(telemetry("car1", 12.9716, 77.5946, 80.5)).await;
    assert_eq!(bus.published_to("alert/car1").len(), 3);

    Ok(())
}

#[tokio::test]
async fn location_changes_follow_movement_threshold() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router.route(telemetry("car1", 12.9716, 77.5946, 20.0)).await;
    // roughly 1 m away
    router.route(telemetry("car1", 12.97161, 77.5946, 22.0)).await;
    // roughly 111 m away
    router.route(telemetry("car1", 12.9726, 77.5946, 24.0)).await;

    let changes = bus
        .published_to("vehiclelocation")
        .iter()
        .map(|payload| serde_json::from_str::<serde_json::Value>(payload))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0]["vehicle_id"], "car1");
    assert_eq!(changes[1]["latitude"], 12.9726);
    assert_eq!(changes[1]["speed"], 24.0);

    let state = router
        .store()
        .get(&VehicleId("car1".to_string()))
        .ok_or_else(|| anyhow::anyhow!("car1 should be tracked"))?;
    assert_eq!(state.last_speed, SpeedInKmph(24.0));

    Ok(())
}

#[tokio::test]
async fn ambulance_alerts_nearby_cars_in_emergency_mode() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router.route(telemetry("car1", 12.9716, 77.5947, 20.0)).await;
    router.route(telemetry("car2", 13.0166, 77.5946, 20.0)).await;
    router.route(location("ambloc", "amb1", 12.9716, 77.5946)).await;

    assert_eq!(
        bus.published_to("alert/car1"),
        vec!["Emergency vehicle approaching. Please give way!"]
    );
    assert!(bus.published_to("alert/car2").is_empty());
    assert!(router.store().get(&VehicleId("amb1".to_string())).is_none());

    Ok(())
}
