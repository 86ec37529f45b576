//! Queue-to-queue relay: native publication events in, image-set publication
//! events out.
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::Stage;
use crate::mapper::assemble::OUTPUT_DATE_FORMAT;
use crate::mapper::{native, ImageSetMapper, COMPOUND_STORY};
use crate::model::ImageSet;
use crate::queue::{Message, MessageProducer, MessageSource};

/// The only origin whose events are mapped; also stamped on outbound events.
pub const ORIGIN_SYSTEM: &str = "http://cmdb.ft.com/systems/methode-web-pub";
pub const CONTENT_URI_BASE: &str =
    "http://methode-article-image-set-mapper.svc.ft.com/image-set/model/";
pub const MESSAGE_TYPE: &str = "cms-content-published";

pub const REQUEST_ID: &str = "X-Request-Id";
pub const ORIGIN_SYSTEM_ID: &str = "Origin-System-Id";
pub const MESSAGE_TIMESTAMP: &str = "Message-Timestamp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTransactionId,
    ForeignOrigin(String),
    UnsupportedType(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTransactionId => f.write_str("message has no transaction id"),
            SkipReason::ForeignOrigin(origin) => write!(f, "origin system {origin:?} is not mapped"),
            SkipReason::UnsupportedType(kind) => write!(f, "native type {kind:?} is not mapped"),
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Failed(Stage),
    Published { sent: usize, failed: usize },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicationBody<'a> {
    content_uri: String,
    payload: &'a ImageSet,
    last_modified: &'a str,
}

/// Wrap one image-set in an outbound publication event.
pub fn build_message(
    image_set: &ImageSet,
    last_modified: &str,
    transaction_id: &str,
) -> Result<Message, serde_json::Error> {
    let body = serde_json::to_string(&PublicationBody {
        content_uri: format!("{}{}", CONTENT_URI_BASE, image_set.uuid),
        payload: image_set,
        last_modified,
    })?;

    let mut headers = BTreeMap::new();
    headers.insert(REQUEST_ID.to_string(), transaction_id.to_string());
    headers.insert(MESSAGE_TIMESTAMP.to_string(), last_modified.to_string());
    headers.insert("Message-Id".to_string(), Uuid::new_v4().to_string());
    headers.insert("Message-Type".to_string(), MESSAGE_TYPE.to_string());
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert(ORIGIN_SYSTEM_ID.to_string(), ORIGIN_SYSTEM.to_string());
    Ok(Message::new(headers, body))
}

/// Current UTC time in the outbound date layout.
pub fn now_timestamp() -> String {
    Utc::now().format(OUTPUT_DATE_FORMAT).to_string()
}

#[derive(Clone)]
pub struct Relay {
    mapper: ImageSetMapper,
    producer: Arc<dyn MessageProducer>,
}

impl Relay {
    pub fn new(mapper: ImageSetMapper, producer: Arc<dyn MessageProducer>) -> Self {
        Self { mapper, producer }
    }

    #[instrument(skip_all)]
    pub async fn process_message(&self, message: &Message) -> Outcome {
        let Some(tid) = message.header(REQUEST_ID) else {
            let reason = SkipReason::MissingTransactionId;
            warn!(%reason, "skipping message");
            return Outcome::Skipped(reason);
        };

        let origin = message.header(ORIGIN_SYSTEM_ID).unwrap_or_default();
        if origin != ORIGIN_SYSTEM {
            let reason = SkipReason::ForeignOrigin(origin.to_string());
            info!(transaction_id = tid, %reason, "skipping message");
            return Outcome::Skipped(reason);
        }

        let last_modified = message
            .header(MESSAGE_TIMESTAMP)
            .map(str::to_string)
            .unwrap_or_else(now_timestamp);

        let native = match native::decode(message.body.as_bytes()) {
            Ok(native) => native,
            Err(err) => {
                error!(transaction_id = tid, stage = %Stage::Decode, %err, "couldn't decode native content");
                return Outcome::Failed(Stage::Decode);
            }
        };

        if native.kind != COMPOUND_STORY {
            let reason = SkipReason::UnsupportedType(native.kind);
            info!(transaction_id = tid, uuid = %native.source_id, %reason, "skipping message");
            return Outcome::Skipped(reason);
        }

        let image_sets = match self.mapper.map_native(&native, &last_modified, tid) {
            Ok(image_sets) => image_sets,
            Err(err) => {
                error!(
                    transaction_id = tid,
                    uuid = %native.source_id,
                    stage = %err.stage,
                    err = %err.cause,
                    "couldn't map native content"
                );
                return Outcome::Failed(err.stage);
            }
        };

        let mut sent = 0;
        let mut failed = 0;
        for image_set in &image_sets {
            let sent_ok = match build_message(image_set, &last_modified, tid) {
                Ok(outbound) => match self.producer.send(&outbound).await {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(?err, transaction_id = tid, uuid = %image_set.uuid, "failed to publish image-set");
                        false
                    }
                },
                Err(err) => {
                    warn!(%err, transaction_id = tid, uuid = %image_set.uuid, "failed to serialise image-set");
                    false
                }
            };
            if sent_ok {
                sent += 1;
            } else {
                failed += 1;
            }
        }
        info!(transaction_id = tid, uuid = %native.source_id, sent, failed, "published image-sets");
        Outcome::Published { sent, failed }
    }
}

/// Returns true when shutdown was signalled during the pause.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => true,
    }
}

/// Consumer loop. Runs until `shutdown` flips to true (or its sender is
/// dropped), then releases the source.
pub async fn run(
    source: &dyn MessageSource,
    relay: &Relay,
    poll_interval: Duration,
    backoff: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    info!("relay consumer loop started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let polled = tokio::select! {
            polled = source.consume() => polled,
            _ = shutdown.changed() => break,
        };
        let stop = match polled {
            Ok(messages) if messages.is_empty() => pause(poll_interval, &mut shutdown).await,
            Ok(messages) => {
                for message in &messages {
                    relay.process_message(message).await;
                }
                false
            }
            Err(err) => {
                error!(?err, "queue consumer error; backing off");
                pause(backoff, &mut shutdown).await
            }
        };
        if stop {
            break;
        }
    }
    info!("relay consumer loop stopping");
    source.shutdown().await
}
