/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{InboundMessage, MessageBus, TopicPattern};
use crate::tools::error::AppError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local bus. Injected messages reach the router only when they match a
/// subscribed pattern; every publish is recorded for inspection.
#[derive(Debug)]
pub struct InMemoryBus {
    channel_capacity: usize,
    inbound: Mutex<Option<mpsc::Sender<InboundMessage>>>,
    subscriptions: Mutex<Vec<TopicPattern>>,
    published: Mutex<Vec<InboundMessage>>,
    fail_connect: AtomicBool,
    fail_publish: AtomicBool,
}

impl InMemoryBus {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
            inbound: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            fail_connect: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
        }
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::Relaxed);
    }

    /// Delivers a message as if a remote client had published it. Returns `false`
    /// when no subscription matches the topic.
    pub async fn inject(&self, topic: &str, payload: &[u8]) -> Result<bool, AppError> {
        let subscribed = lock(&self.subscriptions)
            .iter()
            .any(|pattern| pattern.matches(topic));
        if !subscribed {
            return Ok(false);
        }

        let sender = lock(&self.inbound)
            .clone()
            .ok_or_else(|| AppError::ConnectionError("bus is not connected".to_string()))?;

        sender
            .send(InboundMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            })
            .await
            .map_err(|err| AppError::ConnectionError(err.to_string()))?;

        Ok(true)
    }

    /// Closes the inbound channel, as a broker disconnect would.
    pub fn disconnect(&self) {
        lock(&self.inbound).take();
    }

    pub fn subscriptions(&self) -> Vec<TopicPattern> {
        lock(&self.subscriptions).to_vec()
    }

    pub fn published(&self) -> Vec<InboundMessage> {
        lock(&self.published).to_vec()
    }

    /// Payloads published to `topic`, in publish order, as UTF-8 text.
    pub fn published_to(&self, topic: &str) -> Vec<String> {
        lock(&self.published)
            .iter()
            .filter(|message| message.topic == topic)
            .map(|message| String::from_utf8_lossy(&message.payload).into_owned())
            .collect()
    }

    pub fn clear_published(&self) {
        lock(&self.published).clear();
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn connect(&self) -> Result<mpsc::Receiver<InboundMessage>, AppError> {
        if self.fail_connect.load(Ordering::Relaxed) {
            return Err(AppError::ConnectionError(
                "in-memory bus refused the connection".to_string(),
            ));
        }
        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        *lock(&self.inbound) = Some(sender);
        Ok(receiver)
    }

    async fn subscribe(&self, patterns: &[TopicPattern]) -> Result<(), AppError> {
        if lock(&self.inbound).is_none() {
            return Err(AppError::SubscribeError("bus is not connected".to_string()));
        }
        lock(&self.subscriptions).extend(patterns.iter().cloned());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), AppError> {
        if self.fail_publish.load(Ordering::Relaxed) {
            return Err(AppError::PublishError(format!(
                "in-memory bus rejected publish to {topic}"
            )));
        }
        lock(&self.published).push(InboundMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_subscribed_topics_are_delivered() {
        let bus = InMemoryBus::new(8);
        let mut inbound = bus.connect().await.expect("connect should succeed");
        bus.subscribe(&[TopicPattern::Prefix("myvehiclestatus/".to_string())])
            .await
            .expect("subscribe should succeed");

        assert_eq!(bus.inject("traffic", b"{}").await, Ok(false));
        assert_eq!(bus.inject("myvehiclestatus/car1", b"{}").await, Ok(true));

        let message = inbound.recv().await.expect("message should be delivered");
        assert_eq!(message.topic, "myvehiclestatus/car1");
    }

    #[tokio::test]
    async fn publish_failures_are_reported() {
        let bus = InMemoryBus::new(8);
        bus.set_fail_publish(true);
        assert!(matches!(
            bus.publish("alert/car1", b"slow down".to_vec()).await,
            Err(AppError::PublishError(_))
        ));
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn subscribe_requires_connection() {
        let bus = InMemoryBus::new(8);
        assert!(matches!(
            bus.subscribe(&[TopicPattern::Exact("input".to_string())]).await,
            Err(AppError::SubscribeError(_))
        ));
    }
}
