//! Error types for the stat poller

use thiserror::Error;

/// Errors that can occur while polling Jolokia
#[derive(Debug, Error)]
pub enum StatError {
    /// The agent could not be reached at all
    #[error(
        "Could not connect to {host}. The port may not be open to this host, or the Jolokia \
         agent is not installed and active. Download the Jolokia JVM agent jar, add \
         JVM_OPTS=\"$JVM_OPTS -javaagent:PATH_TO_JOLOKIA_JAR.jar\" to cassandra-env.sh \
         and restart Cassandra."
    )]
    Connection {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request failed after connecting
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The agent answered with an error for one read
    #[error("Jolokia error reading {mbean}: {message}")]
    Jolokia { mbean: String, message: String },

    #[error("Malformed JMX key: {0}")]
    MalformedKey(String),

    #[error("Unexpected Jolokia response: {0}")]
    Decode(String),

    /// Writing output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StatError {
    /// Errors that end the poller rather than skip one metric
    pub fn is_fatal(&self) -> bool {
        matches!(self, StatError::Connection { .. } | StatError::Io(_))
    }
}

/// Result type for stat operations
pub type StatResult<T> = Result<T, StatError>;
