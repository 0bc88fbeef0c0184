/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use serde::Deserialize;
use tokio::sync::watch;

use crate::{
    bus::TopicPattern,
    common::types::*,
    domain::types::inbound::TopicKind,
    tools::{error::AppError, logger::LoggerConfig},
};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub workers: usize,
    pub logger_cfg: LoggerConfig,
    pub kafka_cfg: KafkaConfig,
    pub inbound_channel_capacity: usize,
    pub router_cfg: RouterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub kafka_key: String,
    pub kafka_host: String,
    pub consumer_group_id: String,
    pub metadata_timeout_seconds: u64,
    pub publish_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouterConfig {
    pub topics: TopicConfig,
    pub detection: DetectionConfig,
    pub movement_threshold_meters: f64,
    pub proximity_radius_meters: f64,
    pub ambulance_radius_meters: f64,
    pub density_flush_interval_seconds: u64,
    pub snapshot_interval_seconds: u64,
    pub emergency_mode_on_start: bool,
    pub alert_rate_limit: AlertRateLimitConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            topics: TopicConfig::default(),
            detection: DetectionConfig::default(),
            movement_threshold_meters: 5.0,
            proximity_radius_meters: 50.0,
            ambulance_radius_meters: 50.0,
            density_flush_interval_seconds: 10,
            snapshot_interval_seconds: 1800,
            emergency_mode_on_start: true,
            alert_rate_limit: AlertRateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    pub threshold_mode: ThresholdMode,
    pub static_speed_cap: f64,
    pub threshold_ceiling: f64,
    pub density_basis: DensityBasis,
    pub low_density_max: usize,
    pub high_density_min: usize,
    pub window_capacity: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold_mode: ThresholdMode::Dynamic,
            static_speed_cap: 80.0,
            threshold_ceiling: 60.0,
            density_basis: DensityBasis::SampleCount,
            low_density_max: 10,
            high_density_min: 30,
            window_capacity: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct AlertRateLimitConfig {
    pub enabled: bool,
    pub frame_hits_lim: usize,
    pub frame_len: u32,
}

impl Default for AlertRateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frame_hits_lim: 1,
            frame_len: 30,
        }
    }
}

/// Bus topic names. Inbound topics are subscribed once on connect.
#[derive(Debug, Deserialize, Clone)]
pub struct TopicConfig {
    pub telemetry_prefix: String,
    pub control_input: String,
    pub raw_forwarded: Vec<String>,
    pub event_topics: Vec<String>,
    pub ambulance_location: String,
    pub vehicle_location: String,
    pub alert_prefix: String,
    pub location_change: String,
    pub threshold_broadcast: String,
    pub main_content: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            telemetry_prefix: "myvehiclestatus/".to_string(),
            control_input: "input".to_string(),
            raw_forwarded: vec!["sendserverdata".to_string(), "sendserverdata1".to_string()],
            event_topics: ["accident", "overspeeding", "authorities", "roadcondition", "traffic"]
                .iter()
                .map(|topic| topic.to_string())
                .collect(),
            ambulance_location: "ambloc".to_string(),
            vehicle_location: "car/location".to_string(),
            alert_prefix: "alert".to_string(),
            location_change: "vehiclelocation".to_string(),
            threshold_broadcast: "client_process".to_string(),
            main_content: "servermaincontentsend".to_string(),
        }
    }
}

impl TopicConfig {
    /// Every configured topic name, inbound and outbound.
    pub fn configured_topics(&self) -> Vec<&str> {
        let mut topics = vec![
            self.telemetry_prefix.as_str(),
            self.control_input.as_str(),
            self.ambulance_location.as_str(),
            self.vehicle_location.as_str(),
            self.alert_prefix.as_str(),
            self.location_change.as_str(),
            self.threshold_broadcast.as_str(),
            self.main_content.as_str(),
        ];
        topics.extend(self.raw_forwarded.iter().map(String::as_str));
        topics.extend(self.event_topics.iter().map(String::as_str));
        topics
    }

    /// Bus topics are carried on Kafka with `/` mapped to `.`, so a configured `.` would not
    /// survive the round trip.
    pub fn validate(&self) -> Result<(), AppError> {
        match self.configured_topics().into_iter().find(|topic| topic.contains('.')) {
            Some(topic) => Err(AppError::InvalidConfiguration(format!(
                "Topic '{}' must not contain '.'",
                topic
            ))),
            None => Ok(()),
        }
    }

    pub fn subscriptions(&self) -> Vec<TopicPattern> {
        let mut patterns = vec![
            TopicPattern::Prefix(self.telemetry_prefix.to_owned()),
            TopicPattern::Exact(self.control_input.to_owned()),
            TopicPattern::Exact(self.ambulance_location.to_owned()),
            TopicPattern::Exact(self.vehicle_location.to_owned()),
        ];
        patterns.extend(
            self.raw_forwarded
                .iter()
                .chain(self.event_topics.iter())
                .map(|topic| TopicPattern::Exact(topic.to_owned())),
        );
        patterns
    }

    pub fn classify(&self, topic: &str) -> Option<TopicKind> {
        if topic.starts_with(&self.telemetry_prefix) {
            Some(TopicKind::Telemetry)
        } else if topic == self.control_input {
            Some(TopicKind::ControlInput)
        } else if topic == self.ambulance_location {
            Some(TopicKind::AmbulanceLocation)
        } else if topic == self.vehicle_location {
            Some(TopicKind::VehicleLocation)
        } else if self.raw_forwarded.iter().any(|raw| raw == topic) {
            Some(TopicKind::RawForwarded)
        } else if self.event_topics.iter().any(|event| event == topic) {
            Some(TopicKind::Event)
        } else {
            None
        }
    }
}

/// Shared with the HTTP workers.
#[derive(Clone)]
pub struct AppState {
    pub router_state: watch::Receiver<RouterState>,
}

impl AppState {
    pub fn new(router_state: watch::Receiver<RouterState>) -> Self {
        Self { router_state }
    }

    pub fn current_state(&self) -> RouterState {
        *self.router_state.borrow()
    }
}

pub fn read_dhall_config(config_path: &str) -> Result<AppConfig, AppError> {
    let config = serde_dhall::from_file(config_path)
        .parse::<AppConfig>()
        .map_err(|err| AppError::InvalidConfiguration(format!("Error reading config: {}", err)))?;

    if config.router_cfg.detection.low_density_max > config.router_cfg.detection.high_density_min
    {
        return Err(AppError::InvalidConfiguration(
            "low_density_max must not exceed high_density_min".to_string(),
        ));
    }

    config.router_cfg.topics.validate()?;

    Ok(config)
}
