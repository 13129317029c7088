// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Broker Producer / Consumer (C4) over AMQP — `spec.md` §4.4. Durable
//! queue `workflow-executions`, prefetch=1 per worker channel, manual ack
//! only after terminal state is durably written.

use async_trait::async_trait;
use deadpool_lapin::{Manager, Pool};
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, ConnectionProperties};

use crate::application::admission::BrokerProducer;
use crate::application::errors::OrchestrationError;
use crate::domain::dispatch::DispatchMessage;

pub const DISPATCH_QUEUE: &str = "workflow-executions";

pub fn build_pool(amqp_url: &str) -> anyhow::Result<Pool> {
    let manager = Manager::new(amqp_url, ConnectionProperties::default());
    Ok(Pool::builder(manager).max_size(10).build()?)
}

#[derive(Clone)]
pub struct AmqpBroker {
    pool: Pool,
}

impl AmqpBroker {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn channel(&self) -> Result<Channel, OrchestrationError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        channel
            .queue_declare(DISPATCH_QUEUE, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        Ok(channel)
    }
}

#[async_trait]
impl BrokerProducer for AmqpBroker {
    async fn publish_dispatch(&self, message: &DispatchMessage) -> Result<(), OrchestrationError> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        let channel = self.channel().await?;
        channel
            .basic_publish(
                "",
                DISPATCH_QUEUE,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        Ok(())
    }
}

/// Opens a worker-side channel with `prefetch=1` and starts consuming
/// `workflow-executions`. Ack/nack are left to the caller (`bifrost-worker`'s
/// main loop), since ack must happen only after the terminal state write.
pub async fn consume(pool: &Pool, consumer_tag: &str) -> Result<lapin::Consumer, OrchestrationError> {
    let conn = pool.get().await.map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
    let channel = conn
        .create_channel()
        .await
        .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
    channel
        .basic_qos(1, BasicQosOptions::default())
        .await
        .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
    channel
        .queue_declare(DISPATCH_QUEUE, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
        .await
        .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
    channel
        .basic_consume(DISPATCH_QUEUE, consumer_tag, BasicConsumeOptions::default(), FieldTable::default())
        .await
        .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
}

pub async fn ack(delivery: &lapin::message::Delivery) -> Result<(), OrchestrationError> {
    delivery
        .ack(BasicAckOptions::default())
        .await
        .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
}

pub async fn nack_requeue(delivery: &lapin::message::Delivery) -> Result<(), OrchestrationError> {
    delivery
        .nack(BasicNackOptions { requeue: true, ..Default::default() })
        .await
        .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
}
