use super::ChannelManager;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tracing::warn;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RotationError {
    #[error("No endpoints configured")]
    Empty,
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Ordered list of collector endpoints; a server failure moves to the next one.
#[derive(Debug)]
pub struct EndpointRotation {
    endpoints: Vec<Url>,
    current: AtomicUsize,
    failovers: AtomicU64,
}

impl EndpointRotation {
    pub fn new(endpoints: Vec<Url>) -> Result<Self, RotationError> {
        if endpoints.is_empty() {
            return Err(RotationError::Empty);
        }

        Ok(Self {
            endpoints,
            current: AtomicUsize::new(0),
            failovers: AtomicU64::new(0),
        })
    }

    pub fn parse<I, S>(endpoints: I) -> Result<Self, RotationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = endpoints
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                Url::parse(raw).map_err(|e| RotationError::InvalidUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(endpoints)
    }

    pub fn current(&self) -> &Url {
        let index = self.current.load(Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[index]
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Number of times the rotation advanced.
    pub fn failovers(&self) -> u64 {
        self.failovers.load(Ordering::Relaxed)
    }
}

impl ChannelManager for EndpointRotation {
    fn on_server_failed(&self) {
        let failed = self.current().clone();
        self.current.fetch_add(1, Ordering::Relaxed);
        self.failovers.fetch_add(1, Ordering::Relaxed);

        warn!(
            failed = %failed,
            next = %self.current(),
            "Collector endpoint failed, switching to next endpoint"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps_around() {
        let rotation =
            EndpointRotation::parse(["http://a.example:9700/logs", "http://b.example:9700/logs"])
                .unwrap();

        assert_eq!(rotation.current().host_str(), Some("a.example"));
        rotation.on_server_failed();
        assert_eq!(rotation.current().host_str(), Some("b.example"));
        rotation.on_server_failed();
        assert_eq!(rotation.current().host_str(), Some("a.example"));
        assert_eq!(rotation.failovers(), 2);
    }

    #[test]
    fn test_rotation_rejects_empty_and_invalid() {
        assert_eq!(
            EndpointRotation::parse(Vec::<String>::new()).unwrap_err(),
            RotationError::Empty
        );
        assert!(matches!(
            EndpointRotation::parse(["not a url"]),
            Err(RotationError::InvalidUrl { .. })
        ));
    }
}
