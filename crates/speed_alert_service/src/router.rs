/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::{sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::Value;
use tokio::{
    sync::{mpsc, watch},
    time::{interval_at, Instant},
};

use crate::{
    bus::{InboundMessage, MessageBus},
    common::{
        density::DensityThresholdEstimator, detection::AnomalyDetector,
        proximity::ProximityAlertDispatcher, sliding_window_rate_limiter::SlidingWindowRateLimiter,
        types::*, utils::get_current_timestamp, vehicle_state::VehicleStateStore,
    },
    domain::types::{
        inbound::{decode_message, RoutedMessage},
        outbound::{LocationChangeEvent, StoreSnapshot, ThresholdBroadcast},
    },
    environment::RouterConfig,
    tools::{error::AppError, logger::*, prometheus::*},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    pub telemetry_processed: u64,
    pub decode_errors: u64,
    pub validation_errors: u64,
    pub invalid_control_inputs: u64,
    pub publish_failures: u64,
    pub alerts_emitted: u64,
    pub suppressed_episodes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryOutcome {
    pub threshold: f64,
    pub anomalous: bool,
    pub moved: bool,
    pub alerts: Vec<OutboundAlert>,
    pub publish_failures: usize,
}

/// Owns all vehicle and density state and drives it from a single consumer loop.
///
/// Lifecycle: `Idle -> AwaitingConnection -> Routing -> Draining -> Stopped`.
/// [`TelemetryRouter::start`] connects and subscribes, [`TelemetryRouter::run`] consumes
/// until shutdown is requested or the bus closes the inbound channel.
pub struct TelemetryRouter {
    config: RouterConfig,
    bus: Arc<dyn MessageBus>,
    store: VehicleStateStore,
    estimator: DensityThresholdEstimator,
    detector: AnomalyDetector,
    dispatcher: ProximityAlertDispatcher,
    rate_limiter: Option<SlidingWindowRateLimiter>,
    emergency_mode: bool,
    stats: RouterStats,
    state: watch::Sender<RouterState>,
    inbound: Option<mpsc::Receiver<InboundMessage>>,
}

impl TelemetryRouter {
    pub fn new(config: RouterConfig, bus: Arc<dyn MessageBus>) -> Self {
        let (state, _) = watch::channel(RouterState::Idle);
        let rate_limiter = config.alert_rate_limit.enabled.then(|| {
            SlidingWindowRateLimiter::new(
                config.alert_rate_limit.frame_hits_lim,
                config.alert_rate_limit.frame_len,
            )
        });

        Self {
            store: VehicleStateStore::new(config.movement_threshold_meters),
            estimator: DensityThresholdEstimator::new(&config.detection),
            detector: AnomalyDetector::new(&config.detection),
            dispatcher: ProximityAlertDispatcher::new(&config.topics.alert_prefix),
            rate_limiter,
            emergency_mode: config.emergency_mode_on_start,
            stats: RouterStats::default(),
            state,
            inbound: None,
            bus,
            config,
        }
    }

    pub fn state(&self) -> RouterState {
        *self.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<RouterState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    pub fn store(&self) -> &VehicleStateStore {
        &self.store
    }

    pub fn estimator(&self) -> &DensityThresholdEstimator {
        &self.estimator
    }

    pub fn emergency_mode(&self) -> bool {
        self.emergency_mode
    }

    fn transition(&self, next: RouterState) {
        let previous = self.state.send_replace(next);
        info!(tag = "[Router State]", from = %previous, to = %next);
    }

    /// Connects to the bus and registers every inbound subscription.
    ///
    /// On failure the router ends up `Stopped` and never reaches `Routing`.
    pub async fn start(&mut self) -> Result<(), AppError> {
        if self.state() != RouterState::Idle {
            return Err(AppError::InternalError(format!(
                "Router cannot start from state {}",
                self.state()
            )));
        }

        self.transition(RouterState::AwaitingConnection);

        let inbound = match self.bus.connect().await {
            Ok(inbound) => inbound,
            Err(err) => {
                error!(tag = "[Bus Connection Failed]", error = %err);
                self.transition(RouterState::Stopped);
                return Err(err);
            }
        };

        if let Err(err) = self.bus.subscribe(&self.config.topics.subscriptions()).await {
            error!(tag = "[Bus Subscription Failed]", error = %err);
            self.transition(RouterState::Stopped);
            return Err(err);
        }

        self.inbound = Some(inbound);
        self.transition(RouterState::Routing);

        Ok(())
    }

    /// Consumes inbound messages and timer ticks until `shutdown` turns true or the bus
    /// closes the inbound channel, then force flushes the density window and stops.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), AppError> {
        if self.state() != RouterState::Routing {
            return Err(AppError::InternalError(format!(
                "Router cannot run from state {}",
                self.state()
            )));
        }

        let mut inbound = self.inbound.take().ok_or_else(|| {
            AppError::InternalError("Inbound channel already consumed".to_string())
        })?;

        let flush_period = Duration::from_secs(self.config.density_flush_interval_seconds.max(1));
        let snapshot_period = Duration::from_secs(self.config.snapshot_interval_seconds.max(1));
        let mut flush_timer = interval_at(Instant::now() + flush_period, flush_period);
        let mut snapshot_timer = interval_at(Instant::now() + snapshot_period, snapshot_period);

        loop {
            if *shutdown.borrow() {
                info!(tag = "[Graceful Shutting Down]", pending = %self.estimator.len());
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!(tag = "[Shutdown Channel Closed]");
                        break;
                    }
                },
                item = inbound.recv() => {
                    match item {
                        Some(message) => self.route(message).await,
                        None => {
                            warn!(tag = "[Bus Disconnected]", "Inbound channel closed");
                            break;
                        }
                    }
                },
                _ = flush_timer.tick() => self.on_flush_tick().await,
                _ = snapshot_timer.tick() => self.on_snapshot_tick().await,
            }
        }

        self.transition(RouterState::Draining);
        inbound.close();
        if !self.estimator.is_empty() {
            info!(tag = "[Force Draining Density Window]", length = %self.estimator.len());
            self.on_flush_tick().await;
        }
        self.transition(RouterState::Stopped);

        Ok(())
    }

    /// Decodes one inbound message and hands it to its handler. Failures are logged,
    /// counted and dropped.
    pub async fn route(&mut self, message: InboundMessage) {
        let Some(kind) = self.config.topics.classify(&message.topic) else {
            debug!(tag = "[Unrouted Topic]", topic = %message.topic);
            return;
        };

        match decode_message(kind, &message.topic, &message.payload, get_current_timestamp()) {
            Ok(RoutedMessage::Telemetry(sample)) => {
                self.handle_telemetry(sample).await;
            }
            Ok(RoutedMessage::AmbulanceLocation(broadcast)) => {
                self.handle_ambulance_location(broadcast).await;
            }
            Ok(RoutedMessage::VehicleLocation(broadcast)) => {
                self.handle_vehicle_location(broadcast).await;
            }
            Ok(RoutedMessage::GenericForward {
                source_topic,
                payload,
            }) => {
                let _ = self.handle_generic_forward(&source_topic, &payload).await;
            }
            Ok(RoutedMessage::ControlInput(input)) => self.handle_control_input(input),
            Err(err) => self.record_dropped(&message.topic, err),
        }
    }

    fn record_dropped(&mut self, topic: &str, err: AppError) {
        let reason = match err {
            AppError::DecodeError(_) => {
                self.stats.decode_errors += 1;
                "decode"
            }
            AppError::ValidationError(_) => {
                self.stats.validation_errors += 1;
                "validation"
            }
            AppError::InvalidControlInput(_) => {
                self.stats.invalid_control_inputs += 1;
                "control_input"
            }
            _ => "other",
        };
        DROPPED_MESSAGES.with_label_values(&[reason]).inc();
        warn!(tag = "[Dropped Message]", topic = %topic, reason = %reason, error = %err);
    }

    pub async fn handle_telemetry(&mut self, sample: TelemetrySample) -> TelemetryOutcome {
        self.stats.telemetry_processed += 1;
        TOTAL_TELEMETRY_UPDATES.inc();

        let (_, moved) = self.store.upsert(&sample);
        TRACKED_VEHICLES.set(self.store.len() as i64);

        self.estimator.record(&sample);
        let threshold = self
            .detector
            .threshold_for(self.estimator.current_threshold());
        CURRENT_THRESHOLD.set(threshold);

        let mut outcome = TelemetryOutcome {
            threshold,
            anomalous: false,
            moved,
            alerts: Vec::new(),
            publish_failures: 0,
        };

        if let Some(detected) = self.detector.check(&sample, threshold) {
            outcome.anomalous = true;
            if self.admit_episode(&sample) {
                info!(
                    tag = "[Speed Anomaly]",
                    vehicle_id = %detected.vehicle_id,
                    speed = %detected.speed,
                    speed_limit = %detected.speed_limit
                );
                let alerts = self.dispatcher.dispatch(
                    &sample.vehicle_id,
                    &sample.location,
                    sample.speed,
                    Radius(self.config.proximity_radius_meters),
                    &self.store,
                );
                outcome.publish_failures += self.publish_alerts(&alerts).await;
                outcome.alerts = alerts;
            }
        }

        if moved {
            if let Some(state) = self.store.get(&sample.vehicle_id) {
                let topic = self.config.topics.location_change.to_owned();
                if self
                    .publish_json(&topic, &LocationChangeEvent::from(&state))
                    .await
                    .is_err()
                {
                    outcome.publish_failures += 1;
                }
            }
        }

        outcome
    }

    fn admit_episode(&mut self, sample: &TelemetrySample) -> bool {
        let Some(rate_limiter) = self.rate_limiter.as_mut() else {
            return true;
        };
        match rate_limiter.check_and_record(&sample.vehicle_id, sample.timestamp.0.timestamp()) {
            Ok(()) => true,
            Err(err) => {
                self.stats.suppressed_episodes += 1;
                SUPPRESSED_EPISODES.inc();
                debug!(tag = "[Alert Episode Suppressed]", error = %err);
                false
            }
        }
    }

    /// Emergency alerts to every vehicle near an ambulance, only while emergency mode is on.
    pub async fn handle_ambulance_location(
        &mut self,
        broadcast: AmbulanceBroadcast,
    ) -> Vec<OutboundAlert> {
        if !self.emergency_mode {
            debug!(tag = "[Ambulance Location Ignored]", vehicle_id = ?broadcast.vehicle_id);
            return Vec::new();
        }

        let alerts = self.dispatcher.dispatch_emergency(
            broadcast.vehicle_id.as_ref(),
            &broadcast.location,
            Radius(self.config.ambulance_radius_meters),
            &self.store,
        );
        info!(
            tag = "[Ambulance Nearby]",
            vehicle_id = ?broadcast.vehicle_id,
            notified = %alerts.len()
        );
        self.publish_alerts(&alerts).await;
        alerts
    }

    /// Returns whether the vehicle moved far enough to publish a location change.
    pub async fn handle_vehicle_location(&mut self, broadcast: LocationBroadcast) -> bool {
        let (_, moved) = self.store.upsert_location(
            &broadcast.vehicle_id,
            broadcast.location,
            broadcast.timestamp,
        );
        TRACKED_VEHICLES.set(self.store.len() as i64);

        if moved {
            if let Some(state) = self.store.get(&broadcast.vehicle_id) {
                let topic = self.config.topics.location_change.to_owned();
                let _ = self
                    .publish_json(&topic, &LocationChangeEvent::from(&state))
                    .await;
            }
        }
        moved
    }

    pub async fn handle_generic_forward(
        &mut self,
        source_topic: &str,
        payload: &Value,
    ) -> Result<(), AppError> {
        debug!(tag = "[Forwarding Event]", source_topic = %source_topic);
        let topic = self.config.topics.main_content.to_owned();
        self.publish_json(&topic, payload).await
    }

    pub fn handle_control_input(&mut self, input: ControlInput) {
        self.emergency_mode = matches!(input, ControlInput::Enable);
        info!(tag = "[Emergency Mode]", enabled = %self.emergency_mode);
    }

    /// Broadcasts the advisory threshold (no ceiling), then clears the density window.
    pub async fn on_flush_tick(&mut self) {
        let threshold = self
            .detector
            .threshold_for(self.estimator.advisory_threshold());
        info!(
            tag = "[Density Flush]",
            threshold = %threshold,
            samples = %self.estimator.len(),
            density = %self.estimator.density_class()
        );

        let topic = self.config.topics.threshold_broadcast.to_owned();
        let _ = self
            .publish_json(&topic, &ThresholdBroadcast { threshold })
            .await;

        self.estimator.flush();
    }

    pub async fn on_snapshot_tick(&mut self) {
        if self.store.is_empty() {
            return;
        }
        let snapshot = StoreSnapshot {
            vehicles: self.store.all_states(),
        };
        info!(tag = "[Store Snapshot]", vehicles = %snapshot.vehicles.len());

        let topic = self.config.topics.main_content.to_owned();
        let _ = self.publish_json(&topic, &snapshot).await;
    }

    async fn publish_alerts(&mut self, alerts: &[OutboundAlert]) -> usize {
        let mut failures = 0;
        for alert in alerts {
            match self
                .publish(&alert.topic, alert.message.as_bytes().to_vec())
                .await
            {
                Ok(()) => {
                    self.stats.alerts_emitted += 1;
                    ALERTS_EMITTED
                        .with_label_values(&[alert.kind.to_string().as_str()])
                        .inc();
                }
                Err(_) => failures += 1,
            }
        }
        failures
    }

    async fn publish_json<T: Serialize>(
        &mut self,
        topic: &str,
        message: &T,
    ) -> Result<(), AppError> {
        let payload =
            serde_json::to_vec(message).map_err(|err| AppError::InternalError(err.to_string()))?;
        self.publish(topic, payload).await
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), AppError> {
        let result = self.bus.publish(topic, payload).await;
        if let Err(err) = &result {
            self.stats.publish_failures += 1;
            PUBLISH_FAILURES.inc();
            error!(tag = "[Publish Failed]", topic = %topic, error = %err);
        }
        result
    }
}
