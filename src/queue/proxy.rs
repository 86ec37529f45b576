use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Message, MessageProducer, MessageSource};
use crate::config::QueueConfig;

const KAFKA_JSON: &str = "application/vnd.kafka.v1+json";
const KAFKA_BINARY: &str = "application/vnd.kafka.binary.v1+json";

/// Shared HTTP plumbing for talking to the proxy.
#[derive(Clone)]
struct Endpoint {
    http: Client,
    authorization: String,
    queue: String,
}

impl Endpoint {
    fn new(authorization: &str, queue: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("article-image-set-mapper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            authorization: authorization.to_string(),
            queue: queue.to_string(),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if !self.authorization.is_empty() {
            builder = builder.header(AUTHORIZATION, &self.authorization);
        }
        if !self.queue.is_empty() {
            builder = builder.header(HOST, &self.queue);
        }
        builder
    }
}

/// Parse a proxy address so that relative joins keep its path.
pub fn base_url(address: &str) -> Result<Url> {
    let mut address = address.trim().to_string();
    if !address.ends_with('/') {
        address.push('/');
    }
    Url::parse(&address).with_context(|| format!("invalid queue address {address:?}"))
}

struct Instance {
    address: Url,
    current: Mutex<Option<Url>>,
}

pub struct ProxyConsumer {
    endpoint: Endpoint,
    group: String,
    topic: String,
    offset: String,
    instances: Vec<Instance>,
}

impl fmt::Debug for ProxyConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConsumer")
            .field("group", &self.group)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct CreateInstanceResponse {
    instance_id: String,
}

#[derive(Deserialize)]
struct Record {
    value: String,
}

impl ProxyConsumer {
    pub fn from_config(cfg: &QueueConfig) -> Result<Self> {
        let instances = cfg
            .addresses
            .iter()
            .map(|addr| -> Result<Instance> {
                Ok(Instance {
                    address: base_url(addr)?,
                    current: Mutex::new(None),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            endpoint: Endpoint::new(&cfg.authorization, &cfg.read_queue)?,
            group: cfg.group.clone(),
            topic: cfg.read_topic.clone(),
            offset: cfg.offset.clone(),
            instances,
        })
    }

    async fn create_instance(&self, address: &Url) -> Result<Url> {
        let url = address.join(&format!("consumers/{}", self.group))?;
        let res = self
            .endpoint
            .request(Method::POST, url)
            .header(CONTENT_TYPE, KAFKA_JSON)
            .json(&json!({
                "auto.offset.reset": self.offset,
                "auto.commit.enable": "true",
            }))
            .send()
            .await
            .context("failed to reach queue proxy")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            bail!("creating consumer instance failed {}: {}", status, body);
        }
        let created: CreateInstanceResponse = res
            .json()
            .await
            .context("invalid consumer instance response")?;
        let instance = address.join(&format!(
            "consumers/{}/instances/{}/",
            self.group, created.instance_id
        ))?;
        info!(instance = %instance, "created consumer instance");
        Ok(instance)
    }

    async fn poll(&self, instance: &Url) -> Result<Vec<Message>> {
        let url = instance.join(&format!("topics/{}", self.topic))?;
        let res = self
            .endpoint
            .request(Method::GET, url)
            .header(ACCEPT, KAFKA_BINARY)
            .send()
            .await
            .context("failed to reach queue proxy")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            bail!("consuming from {} failed {}: {}", self.topic, status, body);
        }
        let records: Vec<Record> = res.json().await.context("invalid records response")?;
        Ok(records
            .iter()
            .filter_map(|record| match decode_record(&record.value) {
                Ok(msg) => Some(msg),
                Err(err) => {
                    warn!(?err, "skipping undecodable queue record");
                    None
                }
            })
            .collect())
    }

    async fn destroy(&self, instance: &Url) -> Result<()> {
        let res = self
            .endpoint
            .request(Method::DELETE, instance.clone())
            .send()
            .await
            .context("failed to reach queue proxy")?;
        if !res.status().is_success() {
            bail!("deleting consumer instance failed {}", res.status());
        }
        Ok(())
    }

    async fn consume_from(&self, instance: &Instance) -> Result<Vec<Message>> {
        let mut current = instance.current.lock().await;
        let url = match current.as_ref() {
            Some(url) => url.clone(),
            None => {
                let url = self.create_instance(&instance.address).await?;
                *current = Some(url.clone());
                url
            }
        };
        match self.poll(&url).await {
            Ok(messages) => Ok(messages),
            Err(err) => {
                // Next poll starts over with a fresh instance.
                *current = None;
                if let Err(destroy_err) = self.destroy(&url).await {
                    debug!(?destroy_err, "failed to delete consumer instance");
                }
                Err(err)
            }
        }
    }
}

fn decode_record(value: &str) -> Result<Message> {
    let bytes = STANDARD.decode(value).context("record is not base64")?;
    let raw = String::from_utf8(bytes).context("record is not UTF-8")?;
    Ok(Message::parse(&raw)?)
}

#[async_trait]
impl MessageSource for ProxyConsumer {
    async fn consume(&self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        let mut errors = Vec::new();
        for instance in &self.instances {
            match self.consume_from(instance).await {
                Ok(batch) => messages.extend(batch),
                Err(err) => {
                    warn!(?err, address = %instance.address, "queue poll failed");
                    errors.push(format!("{}: {:#}", instance.address, err));
                }
            }
        }
        if messages.is_empty() && !errors.is_empty() && errors.len() == self.instances.len() {
            return Err(anyhow!("all queue polls failed: {}", errors.join("; ")));
        }
        Ok(messages)
    }

    async fn shutdown(&self) -> Result<()> {
        for instance in &self.instances {
            let taken = instance.current.lock().await.take();
            if let Some(url) = taken {
                self.destroy(&url).await?;
                info!(instance = %url, "deleted consumer instance");
            }
        }
        Ok(())
    }
}

pub struct ProxyProducer {
    endpoint: Endpoint,
    address: Url,
    topic: String,
}

impl fmt::Debug for ProxyProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyProducer")
            .field("address", &self.address)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl ProxyProducer {
    pub fn from_config(cfg: &QueueConfig) -> Result<Self> {
        let address = cfg
            .addresses
            .first()
            .ok_or_else(|| anyhow!("no queue address configured"))?;
        Ok(Self {
            endpoint: Endpoint::new(&cfg.authorization, &cfg.write_queue)?,
            address: base_url(address)?,
            topic: cfg.write_topic.clone(),
        })
    }

    pub fn build_request(&self, message: &Message) -> Result<reqwest::Request> {
        let url = self
            .address
            .join(&format!("topics/{}", self.topic))
            .context("invalid queue address")?;
        let body = json!({ "records": [ { "value": STANDARD.encode(message.encode()) } ] });
        self.endpoint
            .request(Method::POST, url)
            .header(CONTENT_TYPE, KAFKA_BINARY)
            .body(body.to_string())
            .build()
            .context("failed to build produce request")
    }
}

#[async_trait]
impl MessageProducer for ProxyProducer {
    async fn send(&self, message: &Message) -> Result<()> {
        let request = self.build_request(message)?;
        let res = self
            .endpoint
            .http
            .execute(request)
            .await
            .context("failed to reach queue proxy")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            bail!("producing to {} failed {}: {}", self.topic, status, body);
        }
        Ok(())
    }
}

/// Checks that at least one proxy is reachable and serves the read topic.
pub struct ProxyHealth {
    endpoint: Endpoint,
    addresses: Vec<Url>,
    topic: String,
}

impl ProxyHealth {
    pub fn from_config(cfg: &QueueConfig) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::new(&cfg.authorization, &cfg.read_queue)?,
            addresses: cfg
                .addresses
                .iter()
                .map(|a| base_url(a))
                .collect::<Result<Vec<_>>>()?,
            topic: cfg.read_topic.clone(),
        })
    }

    pub async fn check(&self) -> Result<()> {
        let mut errors = Vec::new();
        for address in &self.addresses {
            match self.check_address(address).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(?err, address = %address, "queue proxy not healthy");
                    errors.push(format!("for {} there is an error {:#}", address, err));
                }
            }
        }
        Err(anyhow!(errors.join("; ")))
    }

    async fn check_address(&self, address: &Url) -> Result<()> {
        let res = self
            .endpoint
            .request(Method::GET, address.join("topics")?)
            .send()
            .await
            .context("could not connect to proxy")?;
        if !res.status().is_success() {
            bail!("proxy returned status: {}", res.status().as_u16());
        }
        let topics: Vec<String> = res.json().await.context("topic list is not a JSON array")?;
        topic_present(&topics, &self.topic)
    }
}

fn topic_present(topics: &[String], topic: &str) -> Result<()> {
    if topics.iter().any(|t| t == topic) {
        Ok(())
    } else {
        Err(anyhow!("topic {} was not found", topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn queue_config() -> QueueConfig {
        QueueConfig {
            addresses: vec!["http://localhost:8082/__kafka-rest-proxy".into()],
            group: "imageSetMapper".into(),
            read_topic: "NativeCmsPublicationEvents".into(),
            read_queue: "kafka".into(),
            write_topic: "CmsPublicationEvents".into(),
            write_queue: "kafka-write".into(),
            authorization: "Basic abc".into(),
            offset: "largest".into(),
            poll_interval_ms: 500,
            backoff_seconds: 8,
        }
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let url = base_url("http://localhost:8082/__kafka-rest-proxy").unwrap();
        assert_eq!(
            url.join("topics").unwrap().as_str(),
            "http://localhost:8082/__kafka-rest-proxy/topics"
        );
        assert!(base_url("not a url").is_err());
    }

    #[test]
    fn produce_request_wraps_encoded_message() {
        let producer = ProxyProducer::from_config(&queue_config()).unwrap();
        let mut headers = BTreeMap::new();
        headers.insert("X-Request-Id".to_string(), "tid_1".to_string());
        let message = Message::new(headers, "{}");

        let request = producer.build_request(&message).unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.url().path(),
            "/__kafka-rest-proxy/topics/CmsPublicationEvents"
        );
        let headers = request.headers();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), KAFKA_BINARY);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic abc");
        assert_eq!(headers.get(HOST).unwrap(), "kafka-write");

        let body: serde_json::Value =
            serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        let value = body["records"][0]["value"].as_str().unwrap();
        assert_eq!(decode_record(value).unwrap(), message);
    }

    #[test]
    fn producer_requires_an_address() {
        let mut cfg = queue_config();
        cfg.addresses.clear();
        assert!(ProxyProducer::from_config(&cfg).is_err());
    }

    #[test]
    fn undecodable_records_are_errors() {
        assert!(decode_record("***").is_err());
        assert!(decode_record(&STANDARD.encode("no separator")).is_err());
    }

    #[test]
    fn topic_presence() {
        let topics = vec!["A".to_string(), "NativeCmsPublicationEvents".to_string()];
        assert!(topic_present(&topics, "NativeCmsPublicationEvents").is_ok());
        let err = topic_present(&topics, "Missing").unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }
}
