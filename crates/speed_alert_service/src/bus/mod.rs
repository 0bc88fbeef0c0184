/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
pub mod kafka;
pub mod memory;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::tools::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicPattern {
    Exact(String),
    Prefix(String),
}

impl TopicPattern {
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicPattern::Exact(name) => name == topic,
            TopicPattern::Prefix(prefix) => topic.starts_with(prefix.as_str()),
        }
    }
}

/// Publish/subscribe transport the router runs on.
///
/// `connect` hands back the receiving end of the inbound channel; messages only start
/// flowing on it once `subscribe` has registered the topics of interest.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn connect(&self) -> Result<mpsc::Receiver<InboundMessage>, AppError>;

    async fn subscribe(&self, patterns: &[TopicPattern]) -> Result<(), AppError>;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), AppError>;
}
