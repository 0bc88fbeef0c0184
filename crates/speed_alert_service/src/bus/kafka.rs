/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
    ClientConfig, Message,
};
use tokio::sync::mpsc;

use super::{InboundMessage, MessageBus, TopicPattern};
use crate::{
    environment::KafkaConfig,
    tools::{error::AppError, logger::*},
};

/// Kafka topic names cannot carry `/`, so bus topics are mapped onto `.`.
///
/// The mapping is only reversible for topics without a `.` of their own. Configured topics are
/// checked by [`crate::environment::TopicConfig::validate`]; a publisher-chosen suffix such as
/// `myvehiclestatus.car.1` still comes back as `myvehiclestatus/car/1`.
pub fn kafka_topic_name(bus_topic: &str) -> String {
    bus_topic.replace('/', ".")
}

pub fn bus_topic_name(kafka_topic: &str) -> String {
    kafka_topic.replace('.', "/")
}

/// Exact topics subscribe by name, prefixes become anchored regex subscriptions.
pub fn kafka_subscription(pattern: &TopicPattern) -> String {
    match pattern {
        TopicPattern::Exact(topic) => kafka_topic_name(topic),
        TopicPattern::Prefix(prefix) => {
            format!("^{}.*", regex::escape(&kafka_topic_name(prefix)))
        }
    }
}

pub struct KafkaBus {
    config: KafkaConfig,
    channel_capacity: usize,
    producer: OnceCell<FutureProducer>,
    consumer: OnceCell<Arc<StreamConsumer>>,
    inbound: Mutex<Option<mpsc::Sender<InboundMessage>>>,
}

impl KafkaBus {
    pub fn new(config: KafkaConfig, channel_capacity: usize) -> Self {
        Self {
            config,
            channel_capacity: channel_capacity.max(1),
            producer: OnceCell::new(),
            consumer: OnceCell::new(),
            inbound: Mutex::new(None),
        }
    }
}

async fn forward_inbound(consumer: Arc<StreamConsumer>, sender: mpsc::Sender<InboundMessage>) {
    loop {
        let inbound = match consumer.recv().await {
            Ok(message) => InboundMessage {
                topic: bus_topic_name(message.topic()),
                payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            },
            Err(err) => {
                error!(tag = "[Kafka Consume Failed]", error = %err);
                continue;
            }
        };

        if sender.send(inbound).await.is_err() {
            info!(tag = "[Kafka Consumer Stopped]", "Inbound channel closed");
            break;
        }
    }
}

#[async_trait]
impl MessageBus for KafkaBus {
    async fn connect(&self) -> Result<mpsc::Receiver<InboundMessage>, AppError> {
        let producer: FutureProducer = ClientConfig::new()
            .set(&self.config.kafka_key, &self.config.kafka_host)
            .set("compression.type", "lz4")
            .create()
            .map_err(|err| AppError::ConnectionError(err.to_string()))?;

        let consumer: StreamConsumer = ClientConfig::new()
            .set(&self.config.kafka_key, &self.config.kafka_host)
            .set("group.id", &self.config.consumer_group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "latest")
            .set("topic.metadata.refresh.interval.ms", "5000")
            .create()
            .map_err(|err| AppError::ConnectionError(err.to_string()))?;
        let consumer = Arc::new(consumer);

        let metadata_consumer = consumer.clone();
        let metadata_timeout = Duration::from_secs(self.config.metadata_timeout_seconds);
        let metadata = tokio::task::spawn_blocking(move || {
            metadata_consumer
                .fetch_metadata(None, metadata_timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|err| AppError::InternalError(err.to_string()))?;

        match metadata {
            Ok(brokers) => {
                info!(tag = "[Kafka Connected]", brokers = brokers, host = %self.config.kafka_host)
            }
            Err(err) => {
                error!(
                    tag = "[Kafka Connection Failed]",
                    error = %err,
                    host = %self.config.kafka_host
                );
                return Err(AppError::ConnectionError(err.to_string()));
            }
        }

        self.producer
            .set(producer)
            .map_err(|_| AppError::ConnectionError("bus is already connected".to_string()))?;
        self.consumer
            .set(consumer)
            .map_err(|_| AppError::ConnectionError("bus is already connected".to_string()))?;

        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        *self
            .inbound
            .lock()
            .map_err(|err| AppError::InternalError(err.to_string()))? = Some(sender);

        Ok(receiver)
    }

    async fn subscribe(&self, patterns: &[TopicPattern]) -> Result<(), AppError> {
        let consumer = self
            .consumer
            .get()
            .ok_or_else(|| AppError::SubscribeError("bus is not connected".to_string()))?
            .clone();

        let topics = patterns.iter().map(kafka_subscription).collect::<Vec<_>>();
        let topics = topics.iter().map(String::as_str).collect::<Vec<_>>();
        consumer
            .subscribe(&topics)
            .map_err(|err| AppError::SubscribeError(err.to_string()))?;
        info!(tag = "[Kafka Subscribed]", topics = ?topics);

        let sender = self
            .inbound
            .lock()
            .map_err(|err| AppError::InternalError(err.to_string()))?
            .take()
            .ok_or_else(|| AppError::SubscribeError("already subscribed".to_string()))?;

        tokio::spawn(forward_inbound(consumer, sender));

        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), AppError> {
        let producer = self
            .producer
            .get()
            .ok_or_else(|| AppError::PublishError("bus is not connected".to_string()))?;

        let kafka_topic = kafka_topic_name(topic);
        producer
            .send(
                FutureRecord::to(&kafka_topic).key(topic).payload(&payload),
                Timeout::After(Duration::from_secs(self.config.publish_timeout_seconds)),
            )
            .await
            .map(|_| ())
            .map_err(|(err, _)| AppError::PublishError(err.to_string()))
    }
}
