//! JMX object name parsing

use crate::error::{StatError, StatResult};
use std::collections::BTreeMap;

/// A parsed `domain:key=value,...` object name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JmxKey {
    pub domain: String,
    properties: BTreeMap<String, String>,
}

impl JmxKey {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.get("keyspace")
    }

    pub fn scope(&self) -> Option<&str> {
        self.get("scope")
    }
}

pub fn parse_jmx_key(key: &str) -> StatResult<JmxKey> {
    let (domain, properties) = key
        .split_once(':')
        .ok_or_else(|| StatError::MalformedKey(key.to_string()))?;

    let mut parsed = BTreeMap::new();
    for pair in properties.split(',') {
        match pair.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                parsed.insert(name.to_string(), value.to_string());
            }
            _ => return Err(StatError::MalformedKey(key.to_string())),
        }
    }

    Ok(JmxKey {
        domain: domain.to_string(),
        properties: parsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_metric() {
        let key = parse_jmx_key(
            "org.apache.cassandra.metrics:keyspace=app,name=ReadLatency,scope=users,type=ColumnFamily",
        )
        .unwrap();

        assert_eq!(key.domain, "org.apache.cassandra.metrics");
        assert_eq!(key.keyspace(), Some("app"));
        assert_eq!(key.scope(), Some("users"));
        assert_eq!(key.get("type"), Some("ColumnFamily"));
    }

    #[test]
    fn test_parse_without_keyspace() {
        let key =
            parse_jmx_key("org.apache.cassandra.metrics:name=ReadLatency,type=ColumnFamily")
                .unwrap();
        assert_eq!(key.keyspace(), None);
    }

    #[test]
    fn test_malformed_keys() {
        assert!(matches!(
            parse_jmx_key("no-domain-separator"),
            Err(StatError::MalformedKey(_))
        ));
        assert!(parse_jmx_key("domain:keyspace").is_err());
        assert!(parse_jmx_key("domain:=value").is_err());
    }
}
