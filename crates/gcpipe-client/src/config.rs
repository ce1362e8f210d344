use std::time::Duration;

use gcpipe_transport::EndpointPair;
use gcpipe_wire::RecoveryMode;

/// Default bound on waiting for the instrument's endpoints to appear.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default bound on waiting for a correlated response.
///
/// Generous because LOAD_CONTROL_FILE makes the control application touch
/// disk before it acknowledges.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Depth of the reader-to-requester handoff queue.
///
/// A full queue blocks the background reader instead of growing without
/// bound; 32 frames is far more than one request/response cycle ever needs.
pub const RESPONSE_QUEUE_DEPTH: usize = 32;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The command and respond endpoints of the control link.
    pub endpoints: EndpointPair,
    /// How long `connect` waits for both endpoints.
    pub connect_timeout: Duration,
    /// How long each request waits for its correlated response.
    pub response_timeout: Duration,
    /// What the response reader does with malformed frames.
    pub recovery: RecoveryMode,
    /// Bounded depth of the response handoff queue.
    pub response_queue_depth: usize,
}

impl SessionConfig {
    /// Configuration with defaults for the given endpoint pair.
    pub fn for_endpoints(endpoints: EndpointPair) -> Self {
        Self {
            endpoints,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            recovery: RecoveryMode::default(),
            response_queue_depth: RESPONSE_QUEUE_DEPTH,
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set malformed-frame handling on the response stream.
    pub fn with_recovery(mut self, recovery: RecoveryMode) -> Self {
        self.recovery = recovery;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_endpoints(EndpointPair::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.response_timeout, DEFAULT_RESPONSE_TIMEOUT);
        assert_eq!(config.response_queue_depth, RESPONSE_QUEUE_DEPTH);
        assert_eq!(config.recovery, RecoveryMode::Strict);
    }

    #[test]
    fn builders_override_defaults() {
        let config = SessionConfig::default()
            .with_connect_timeout(Duration::from_millis(250))
            .with_response_timeout(Duration::from_secs(1))
            .with_recovery(RecoveryMode::Skip);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.response_timeout, Duration::from_secs(1));
        assert_eq!(config.recovery, RecoveryMode::Skip);
    }
}
