//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::chat::ChatConfig;
use crate::engine::RetryPolicy;
use crate::rtc::{Environment, IceConfig, TurnCredentials};
use crate::session::SessionConfig;
use crate::transport::Keepalive;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent signaling sessions (0 = unlimited)
    pub max_connections: usize,

    /// Deployment mode, selects the ICE configuration
    pub environment: Environment,

    /// Relay service used in production
    pub turn: TurnCredentials,

    /// Read deadline, refreshed on every pong
    pub idle_timeout: Duration,

    /// Deadline for writing one frame
    pub write_timeout: Duration,

    /// Capacity of each session's outbound signaling queue
    pub queue_capacity: usize,

    /// Renegotiation retry policy for every room
    pub retry_policy: RetryPolicy,

    /// Interval between viewer-count updates
    pub viewer_poll_interval: Duration,

    /// Largest accepted chat message in bytes
    pub chat_max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 0, // Unlimited
            environment: Environment::Development,
            turn: TurnCredentials::default(),
            idle_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            queue_capacity: 256,
            retry_policy: RetryPolicy::default(),
            viewer_poll_interval: Duration::from_secs(1),
            chat_max_message_size: 512,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Default config with the deployment mode taken from `ENVIRONMENT`
    pub fn from_env() -> Self {
        let environment = std::env::var("ENVIRONMENT")
            .map(|value| Environment::from_env_value(&value))
            .unwrap_or_default();

        Self::default().environment(environment)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum concurrent signaling sessions
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the relay service endpoints and credentials
    pub fn turn(mut self, turn: TurnCredentials) -> Self {
        self.turn = turn;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the outbound queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn keepalive(&self) -> Keepalive {
        Keepalive {
            idle_timeout: self.idle_timeout,
            write_timeout: self.write_timeout,
        }
    }

    pub fn ice_config(&self) -> IceConfig {
        IceConfig::for_environment(self.environment, &self.turn)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            keepalive: self.keepalive(),
            queue_capacity: self.queue_capacity,
        }
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            keepalive: self.keepalive(),
            max_message_size: self.chat_max_message_size,
        }
    }
}
