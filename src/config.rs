//! Connection parameters.
use std::{fmt, time::Duration};

/// Default rcon port of a Palworld dedicated server.
pub const DEFAULT_PORT: u16 = 25575;

/// Pause between two attempts of an incomplete reply.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Limit for each connect, send and receive call. `None` waits forever.
    pub timeout: Option<Duration>,
    pub retry_delay: Duration,
}

impl Config {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Config {
            host: host.into(),
            port,
            password: password.into(),
            timeout: None,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// keep the password out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"**Password**")
            .field("timeout", &self.timeout)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_debug() {
        let config = Config::new("localhost", DEFAULT_PORT, "hunter2")
            .with_timeout(Duration::from_secs(3))
            .with_retry_delay(Duration::ZERO);
        assert_eq!(config.address(), "localhost:25575");
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));

        let printed = format!("{config:?}");
        assert!(!printed.contains("hunter2"));
    }
}
