// ticket-broker/src/publisher.rs
// ============================================================================
// Module: AMQP Task Publisher
// Description: TaskPublisher implementation backed by lapin.
// Purpose: Bridge the synchronous TaskPublisher contract onto lapin's async
//          AMQP client via a privately-held tokio runtime.
// Dependencies: lapin, tokio, tokio-executor-trait, tokio-reactor-trait,
//               ticket-core
// ============================================================================

//! ## Overview
//! [`AmqpTaskPublisher`] opens one channel per configured broker URL at
//! construction time and declares both the middleware queue and the GDBS
//! queue on each. A publish fans out to every channel and succeeds if at
//! least one accepts the message, mirroring the "quorum" broker-pair
//! topology described in §4.3: either URL in the pair is expected to carry
//! the full queue set, so one connection dropping never loses a task.
//!
//! `TaskPublisher` is synchronous; lapin is not. This adapter holds its own
//! multi-threaded [`tokio::runtime::Runtime`] and drives every AMQP call
//! through [`tokio::runtime::Runtime::block_on`], the same way a blocking
//! HTTP client wraps an async one underneath.

// ============================================================================
// SECTION: Imports
// ============================================================================

use lapin::BasicProperties;
use lapin::Channel;
use lapin::Connection;
use lapin::ConnectionProperties;
use lapin::options::BasicPublishOptions;
use lapin::options::QueueDeclareOptions;
use lapin::types::AMQPValue;
use lapin::types::FieldTable;
use ticket_core::IncidentProjection;
use ticket_core::PublishError;
use ticket_core::TaskPublisher;
use ticket_core::TicketId;
use tokio::runtime::Builder;
use tokio::runtime::Runtime;
use tracing::warn;

use crate::envelope::TaskMessage;
use crate::envelope::build_body;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`AmqpTaskPublisher`].
#[derive(Debug, Clone)]
pub struct AmqpPublisherConfig {
    /// One or two independent AMQP connection URLs.
    pub urls: Vec<String>,
    /// When true, queues are declared with `x-queue-type: quorum`.
    pub quorum_queue: bool,
    /// Name of the middleware queue (`run.process` target).
    pub middleware_queue: String,
    /// Name of the GDBS queue (`run.hubstream_sync` target).
    pub gdbs_queue: String,
}

// ============================================================================
// SECTION: Publisher
// ============================================================================

/// Publishes tasks to one or more AMQP brokers.
pub struct AmqpTaskPublisher {
    runtime: Runtime,
    channels: Vec<Channel>,
    middleware_queue: String,
    gdbs_queue: String,
}

/// Errors raised while establishing the broker connections.
#[derive(Debug, thiserror::Error)]
pub enum AmqpSetupError {
    /// No broker URL was configured.
    #[error("no broker urls configured")]
    NoUrls,
    /// Every configured broker connection failed.
    #[error("failed to connect to any configured broker: {0}")]
    AllConnectionsFailed(String),
    /// The background tokio runtime could not be created.
    #[error("failed to start broker runtime: {0}")]
    Runtime(String),
}

impl AmqpTaskPublisher {
    /// Connects to every configured broker URL and declares both queues on
    /// each connection.
    ///
    /// # Errors
    ///
    /// Returns [`AmqpSetupError`] when no URL is configured, the runtime
    /// cannot be started, or every connection attempt fails.
    pub fn connect(config: &AmqpPublisherConfig) -> Result<Self, AmqpSetupError> {
        if config.urls.is_empty() {
            return Err(AmqpSetupError::NoUrls);
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|error| AmqpSetupError::Runtime(error.to_string()))?;

        let channels = runtime.block_on(connect_all(config))?;

        Ok(Self {
            runtime,
            channels,
            middleware_queue: config.middleware_queue.clone(),
            gdbs_queue: config.gdbs_queue.clone(),
        })
    }

    /// Publishes `message` to `queue` on every held channel, returning
    /// success if at least one publish is acknowledged.
    fn fan_out(&self, queue: &str, message: &TaskMessage) -> Result<(), PublishError> {
        let body = build_body(message);
        let mut last_error = None;
        let mut any_ok = false;

        for channel in &self.channels {
            let result = self.runtime.block_on(publish_one(channel, queue, &body));
            match result {
                Ok(()) => any_ok = true,
                Err(error) => {
                    warn!(queue, error = %error, "task publish failed on one broker connection");
                    last_error = Some(error);
                }
            }
        }

        if any_ok {
            Ok(())
        } else {
            Err(PublishError::Broker(
                last_error.unwrap_or_else(|| "no broker connections available".to_string()),
            ))
        }
    }
}

impl TaskPublisher for AmqpTaskPublisher {
    fn publish_process(&self, projection: &IncidentProjection) -> Result<(), PublishError> {
        let body = serde_json::to_value(projection)
            .map_err(|error| PublishError::Broker(error.to_string()))?;
        let message = TaskMessage::process(body, projection.ticket_id.as_str());
        self.fan_out(&self.middleware_queue, &message)
    }

    fn publish_hubstream_sync(&self, ticket_id: &TicketId) -> Result<(), PublishError> {
        let message = TaskMessage::hubstream_sync(ticket_id.as_str());
        self.fan_out(&self.gdbs_queue, &message)
    }
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

async fn connect_all(config: &AmqpPublisherConfig) -> Result<Vec<Channel>, AmqpSetupError> {
    let mut channels = Vec::with_capacity(config.urls.len());
    let mut last_error = None;

    for url in &config.urls {
        match connect_one(url, config).await {
            Ok(channel) => channels.push(channel),
            Err(error) => {
                warn!(url, error = %error, "failed to connect to broker");
                last_error = Some(error);
            }
        }
    }

    if channels.is_empty() {
        return Err(AmqpSetupError::AllConnectionsFailed(
            last_error.unwrap_or_else(|| "unknown connection failure".to_string()),
        ));
    }

    Ok(channels)
}

async fn connect_one(url: &str, config: &AmqpPublisherConfig) -> Result<Channel, String> {
    let properties = ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);

    let connection = Connection::connect(url, properties)
        .await
        .map_err(|error| error.to_string())?;
    let channel = connection.create_channel().await.map_err(|error| error.to_string())?;

    declare_queue(&channel, &config.middleware_queue, config.quorum_queue)
        .await
        .map_err(|error| error.to_string())?;
    declare_queue(&channel, &config.gdbs_queue, config.quorum_queue)
        .await
        .map_err(|error| error.to_string())?;

    Ok(channel)
}

async fn declare_queue(channel: &Channel, name: &str, quorum: bool) -> Result<(), lapin::Error> {
    let mut arguments = FieldTable::default();
    if quorum {
        arguments.insert("x-queue-type".into(), AMQPValue::LongString("quorum".into()));
    }

    channel
        .queue_declare(name, QueueDeclareOptions { durable: true, ..QueueDeclareOptions::default() }, arguments)
        .await?;
    Ok(())
}

async fn publish_one(channel: &Channel, queue: &str, body: &[u8]) -> Result<(), String> {
    let confirm = channel
        .basic_publish(
            "",
            queue,
            BasicPublishOptions::default(),
            body,
            BasicProperties::default().with_content_type("application/json".into()),
        )
        .await
        .map_err(|error| error.to_string())?;

    confirm.await.map_err(|error| error.to_string())?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_empty_url_list() {
        let config = AmqpPublisherConfig {
            urls: Vec::new(),
            quorum_queue: false,
            middleware_queue: "middleware".to_string(),
            gdbs_queue: "gdbs".to_string(),
        };

        let error = AmqpTaskPublisher::connect(&config).expect_err("must reject empty url list");
        assert!(matches!(error, AmqpSetupError::NoUrls));
    }
}
