//! ICE configuration handed to new connection handles
//!
//! The deployment mode decides whether media must be routed through the relay
//! (TURN) service or may use direct connectivity. Nothing else depends on it.

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Direct connectivity, no ICE servers
    #[default]
    Development,
    /// Relay-only connectivity through the configured TURN server
    Production,
}

impl Environment {
    /// Parse the value of the `ENVIRONMENT` variable
    ///
    /// Only `PRODUCTION` selects production; every other value is development.
    pub fn from_env_value(value: &str) -> Self {
        if value == "PRODUCTION" {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    /// WebSocket scheme used when advertising signaling addresses
    pub fn ws_scheme(self) -> &'static str {
        match self {
            Environment::Production => "wss",
            Environment::Development => "ws",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Environment::from_env_value(&s.to_ascii_uppercase()))
    }
}

/// One STUN or TURN server entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

impl IceServer {
    /// Server entry without credentials (STUN)
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: String::new(),
            credential: String::new(),
        }
    }
}

/// Relay service endpoints and static credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCredentials {
    pub stun_url: String,
    pub turn_url: String,
    pub username: String,
    pub credential: String,
}

impl Default for TurnCredentials {
    fn default() -> Self {
        Self {
            stun_url: "stun:turn.localhost:3478".into(),
            turn_url: "turn:turn.localhost:3478".into(),
            username: "amit".into(),
            credential: "amrutiya".into(),
        }
    }
}

/// ICE configuration for new peer connections
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IceConfig {
    pub servers: Vec<IceServer>,
    /// Only gather relay candidates
    pub relay_only: bool,
}

impl IceConfig {
    /// Direct connectivity without any ICE servers
    pub fn direct() -> Self {
        Self::default()
    }

    /// Relay-only connectivity through the given TURN service
    pub fn relay(turn: &TurnCredentials) -> Self {
        Self {
            servers: vec![
                IceServer::stun(turn.stun_url.clone()),
                IceServer {
                    urls: vec![turn.turn_url.clone()],
                    username: turn.username.clone(),
                    credential: turn.credential.clone(),
                },
            ],
            relay_only: true,
        }
    }

    /// Pick the configuration for a deployment mode
    pub fn for_environment(environment: Environment, turn: &TurnCredentials) -> Self {
        match environment {
            Environment::Production => Self::relay(turn),
            Environment::Development => Self::direct(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_env_value() {
        assert_eq!(Environment::from_env_value("PRODUCTION"), Environment::Production);
        assert_eq!(Environment::from_env_value("production"), Environment::Development);
        assert_eq!(Environment::from_env_value(""), Environment::Development);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
    }

    #[test]
    fn test_development_is_direct() {
        let config = IceConfig::for_environment(Environment::Development, &TurnCredentials::default());
        assert!(config.servers.is_empty());
        assert!(!config.relay_only);
    }

    #[test]
    fn test_production_is_relay_only() {
        let turn = TurnCredentials::default();
        let config = IceConfig::for_environment(Environment::Production, &turn);

        assert!(config.relay_only);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].urls, vec!["stun:turn.localhost:3478".to_string()]);
        assert!(config.servers[0].username.is_empty());
        assert_eq!(config.servers[1].username, "amit");
        assert_eq!(config.servers[1].credential, "amrutiya");
    }

    #[test]
    fn test_ws_scheme() {
        assert_eq!(Environment::Production.ws_scheme(), "wss");
        assert_eq!(Environment::Development.ws_scheme(), "ws");
    }
}
