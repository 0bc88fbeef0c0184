/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use prometheus::{
    register_gauge, register_int_counter, register_int_counter_vec, register_int_gauge, Gauge,
    IntCounter, IntCounterVec, IntGauge,
};

pub static TOTAL_TELEMETRY_UPDATES: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!("total_telemetry_updates", "Total Telemetry Updates")
            .expect("Failed to register total telemetry updates metrics")
    });

pub static DROPPED_MESSAGES: once_cell::sync::Lazy<IntCounterVec> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter_vec!(
            "dropped_messages",
            "Inbound messages dropped before reaching a handler",
            &["reason"]
        )
        .expect("Failed to register dropped messages metrics")
    });

pub static PUBLISH_FAILURES: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!("publish_failures", "Outbound Publish Failures")
            .expect("Failed to register publish failures metrics")
    });

pub static ALERTS_EMITTED: once_cell::sync::Lazy<IntCounterVec> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter_vec!("alerts_emitted", "Alerts Published", &["kind"])
            .expect("Failed to register alerts emitted metrics")
    });

pub static SUPPRESSED_EPISODES: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!(
            "suppressed_alert_episodes",
            "Alert episodes rejected by the rate limiter"
        )
        .expect("Failed to register suppressed episodes metrics")
    });

pub static CURRENT_THRESHOLD: once_cell::sync::Lazy<Gauge> = once_cell::sync::Lazy::new(|| {
    register_gauge!("current_speed_threshold", "Current Speed Alert Threshold (km/h)")
        .expect("Failed to register current threshold metrics")
});

pub static TRACKED_VEHICLES: once_cell::sync::Lazy<IntGauge> = once_cell::sync::Lazy::new(|| {
    register_int_gauge!("tracked_vehicles", "Vehicles With Known State")
        .expect("Failed to register tracked vehicles metrics")
});

/// Builds the actix middleware serving `/metrics`, with every service metric registered on it.
pub fn prometheus_metrics() -> PrometheusMetrics {
    let prometheus = PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus Metrics");

    prometheus
        .registry
        .register(Box::new(TOTAL_TELEMETRY_UPDATES.to_owned()))
        .expect("Failed to register total telemetry updates metrics");

    prometheus
        .registry
        .register(Box::new(DROPPED_MESSAGES.to_owned()))
        .expect("Failed to register dropped messages metrics");

    prometheus
        .registry
        .register(Box::new(PUBLISH_FAILURES.to_owned()))
        .expect("Failed to register publish failures metrics");

    prometheus
        .registry
        .register(Box::new(ALERTS_EMITTED.to_owned()))
        .expect("Failed to register alerts emitted metrics");

    prometheus
        .registry
        .register(Box::new(SUPPRESSED_EPISODES.to_owned()))
        .expect("Failed to register suppressed episodes metrics");

    prometheus
        .registry
        .register(Box::new(CURRENT_THRESHOLD.to_owned()))
        .expect("Failed to register current threshold metrics");

    prometheus
        .registry
        .register(Box::new(TRACKED_VEHICLES.to_owned()))
        .expect("Failed to register tracked vehicles metrics");

    prometheus
}
