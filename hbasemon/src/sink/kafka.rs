//! Kafka producer sink: every event, including multi sub-rows, is produced
//! as one JSON message to a single named topic. Delivery is asynchronous
//! through the producer's own queue; `close` flushes it.

use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use serde_json::json;
use tracing::{debug, warn};

use crate::event::{Event, SubEvent};

use super::{Sink, SinkError, SubKind};

pub struct KafkaSink {
    producer: BaseProducer,
    topic: String,
}

impl KafkaSink {
    pub fn new(servers: &str, topic: &str) -> Result<Self, SinkError> {
        debug!("connecting kafka producer to {servers}, topic {topic}");
        let producer: BaseProducer = ClientConfig::new()
            .set("bootstrap.servers", servers)
            .set("message.timeout.ms", "5000")
            .create()?;
        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    fn produce(&mut self, payload: Vec<u8>) -> Result<(), SinkError> {
        let record = BaseRecord::<(), [u8]>::to(&self.topic).payload(&payload);
        if let Err((error, _)) = self.producer.send(record) {
            return Err(error.into());
        }
        // Serve delivery callbacks without blocking the capture loop.
        self.producer.poll(Duration::ZERO);
        Ok(())
    }
}

impl Sink for KafkaSink {
    fn emit(&mut self, event: &Event) -> Result<(), SinkError> {
        self.produce(serde_json::to_vec(event)?)
    }

    fn emit_sub(&mut self, kind: SubKind, sub: &SubEvent) -> Result<(), SinkError> {
        self.produce(serde_json::to_vec(&json!({
            "table": kind.table(),
            "row": sub,
        }))?)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Err(error) = self.producer.flush(Duration::from_secs(5)) {
            warn!("kafka flush incomplete: {error}");
        }
        Ok(())
    }
}
