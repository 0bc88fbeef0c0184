/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::sync::Arc;

use serde_json::{json, Value};
use speed_alert_service::{
    bus::memory::InMemoryBus,
    common::types::RouterState,
    environment::RouterConfig,
    router::TelemetryRouter,
    tools::error::AppError,
};
use tokio::sync::watch;

use crate::harness::*;

#[tokio::test]
async fn connect_failure_never_reaches_routing() -> anyhow::Result<()> {
    let bus = Arc::new(InMemoryBus::new(8));
    bus.set_fail_connect(true);
    let mut router = TelemetryRouter::new(RouterConfig::default(), bus.clone());
    let state = router.state_watch();

    let started = router.start().await;

    assert!(matches!(started, Err(AppError::ConnectionError(_))));
    assert_ne!(*state.borrow(), RouterState::Routing);
    assert!(bus.subscriptions().is_empty());

    Ok(())
}

#[tokio::test]
async fn state_watch_reports_routing_after_start() -> anyhow::Result<()> {
    let (router, _bus) = routing_router(RouterConfig::default()).await?;
    let state = router.state_watch();
    assert_eq!(*state.borrow(), RouterState::Routing);
    Ok(())
}

#[tokio::test]
async fn flush_tick_broadcasts_threshold_then_clears_window() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router.route(telemetry("car1", 12.9716, 77.5946, 20.0)).await;
    router.route(telemetry("car2", 12.9816, 77.5946, 30.0)).await;
    router.on_flush_tick().await;

    let broadcasts = bus.published_to("client_process");
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(
        serde_json::from_str::<Value>(&broadcasts[0])?,
        json!({"threshold": 43.75})
    );
    assert!(router.estimator().is_empty());
    assert_eq!(router.estimator().current_threshold(), 0.0);
    // vehicle state survives the density flush
    assert_eq!(router.store().len(), 2);

    Ok(())
}

#[tokio::test]
async fn snapshot_tick_forwards_known_vehicles() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    router.on_snapshot_tick().await;
    assert!(bus.published_to("servermaincontentsend").is_empty());

    router.route(telemetry("car1", 12.9716, 77.5946, 20.0)).await;
    router.route(telemetry("car2", 12.9816, 77.5946, 30.0)).await;
    router.on_snapshot_tick().await;

    let snapshots = bus.published_to("servermaincontentsend");
    assert_eq!(snapshots.len(), 1);
    let snapshot: Value = serde_json::from_str(&snapshots[0])?;
    let vehicles = snapshot["vehicles"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("snapshot should carry a vehicle list"))?;
    assert_eq!(vehicles.len(), 2);

    Ok(())
}

#[tokio::test]
async fn shutdown_force_flushes_and_stops() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;
    router.route(telemetry("car1", 12.9716, 77.5946, 40.0)).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send_replace(true);
    router.run(shutdown_rx).await?;

    assert_eq!(router.state(), RouterState::Stopped);
    // 40 km/h * 1.75, the broadcast is not capped at 60 km/h
    assert_eq!(
        bus.published_to("client_process"),
        vec![json!({"threshold": 70.0}).to_string()]
    );
    assert!(router.estimator().is_empty());

    Ok(())
}

#[tokio::test]
async fn bus_disconnect_drains_queued_messages() -> anyhow::Result<()> {
    let (mut router, bus) = routing_router(RouterConfig::default()).await?;

    for (topic, payload) in [
        (
            "myvehiclestatus/car1",
            r#"{"vehicle_id":"car1","latitude":12.9716,"longitude":77.5946,"speed":20}"#,
        ),
        (
            "myvehiclestatus/car2",
            r#"{"vehicle_id":"car2","latitude":12.9716,"longitude":77.5947,"speed":90}"#,
        ),
    ] {
        assert!(bus.inject(topic, payload.as_bytes()).await?);
    }
    assert!(!bus.inject("alert/car1", b"ignored").await?);
    bus.disconnect();

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    router.run(shutdown_rx).await?;

    assert_eq!(router.state(), RouterState::Stopped);
    assert_eq!(router.stats().telemetry_processed, 2);
    assert_eq!(bus.published_to("alert/car2").len(), 3);
    assert_eq!(bus.published_to("alert/car1").len(), 1);
    assert_eq!(bus.published_to("client_process").len(), 1);

    Ok(())
}

#[tokio::test]
async fn router_cannot_start_twice() -> anyhow::Result<()> {
    let (mut router, _bus) = routing_router(RouterConfig::default()).await?;
    assert!(matches!(
        router.start().await,
        Err(AppError::InternalError(_))
    ));
    assert_eq!(router.state(), RouterState::Routing);
    Ok(())
}
