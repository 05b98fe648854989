//! Jolokia HTTP client
//!
//! Reads one attribute of one metric across every table with a single
//! wildcard `read` request.

use crate::error::{StatError, StatResult};
use crate::metrics::MetricSpec;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Metric values keyed by the full MBean object name
pub type MetricReading = BTreeMap<String, f64>;

/// Source of JMX metric readings
#[async_trait]
pub trait JmxReader: Send + Sync {
    /// Where readings come from, for logging
    fn describe(&self) -> String;

    async fn read(&self, metric: &MetricSpec) -> StatResult<MetricReading>;
}

#[derive(Debug, Deserialize)]
struct JolokiaResponse {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Jolokia agent client
pub struct JolokiaClient {
    client: Client,
    host: String,
}

impl JolokiaClient {
    pub fn new(host: &str, timeout: Duration) -> StatResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("cassandra-toolbox/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    fn read_url(&self, metric: &MetricSpec) -> String {
        format!(
            "{}/jolokia/read/{}/{}",
            self.host,
            metric.mbean_pattern(),
            metric.metric_key
        )
    }
}

#[async_trait]
impl JmxReader for JolokiaClient {
    fn describe(&self) -> String {
        self.host.clone()
    }

    async fn read(&self, metric: &MetricSpec) -> StatResult<MetricReading> {
        let url = self.read_url(metric);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_connect() {
                StatError::Connection {
                    host: self.host.clone(),
                    source: e,
                }
            } else {
                StatError::Http(e)
            }
        })?;

        let body: JolokiaResponse = response.json().await?;
        if let Some(message) = body.error {
            return Err(StatError::Jolokia {
                mbean: format!("{}/{}", metric.mbean_pattern(), metric.metric_key),
                message,
            });
        }

        let Some(Value::Object(beans)) = body.value else {
            return Err(StatError::Decode(format!(
                "expected an object of MBeans for {}",
                metric.metric_name
            )));
        };

        let mut reading = MetricReading::new();
        for (mbean, attributes) in beans {
            match attributes.get(metric.metric_key).and_then(Value::as_f64) {
                Some(value) => {
                    reading.insert(mbean, value);
                }
                None => debug!("No numeric {} on {}", metric.metric_key, mbean),
            }
        }
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::METRICS;
    use serde_json::json;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USERS: &str =
        "org.apache.cassandra.metrics:keyspace=app,name=ReadLatency,scope=users,type=ColumnFamily";
    const EVENTS: &str =
        "org.apache.cassandra.metrics:keyspace=app,name=ReadLatency,scope=events,type=ColumnFamily";

    fn client(server: &MockServer) -> JolokiaClient {
        JolokiaClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_read_metric_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"/jolokia/read/.*name=ReadLatency/Count$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 200,
                "value": {
                    USERS: {"Count": 1200},
                    EVENTS: {"Count": 35},
                }
            })))
            .mount(&server)
            .await;

        let reading = client(&server).read(&METRICS[0]).await.unwrap();

        assert_eq!(reading.len(), 2);
        assert_eq!(reading[USERS], 1200.0);
        assert_eq!(reading[EVENTS], 35.0);
    }

    #[tokio::test]
    async fn test_skips_non_numeric_attributes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": {
                    USERS: {"Count": "n/a"},
                    EVENTS: {"Count": 4},
                }
            })))
            .mount(&server)
            .await;

        let reading = client(&server).read(&METRICS[0]).await.unwrap();
        assert_eq!(reading.len(), 1);
    }

    #[tokio::test]
    async fn test_jolokia_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 404,
                "error_type": "javax.management.InstanceNotFoundException",
                "error": "No MBean found",
            })))
            .mount(&server)
            .await;

        let err = client(&server).read(&METRICS[8]).await.unwrap_err();
        match err {
            StatError::Jolokia { mbean, message } => {
                assert!(mbean.ends_with("name=RowCacheMiss/Count"));
                assert_eq!(message, "No MBean found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_fatal() {
        let client = JolokiaClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = client.read(&METRICS[0]).await.unwrap_err();

        assert!(matches!(err, StatError::Connection { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("javaagent"));
    }

    #[test]
    fn test_read_url() {
        let client = JolokiaClient::new("http://cass1:8778/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.read_url(&METRICS[6]),
            "http://cass1:8778/jolokia/read/org.apache.cassandra.metrics:type=ColumnFamily,*,name=PendingCompactions/Value"
        );
    }
}
