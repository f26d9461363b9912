use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route the websocket upgrade is served on.
    #[serde(default = "default_path")]
    pub path: String,
}

impl ServerConfig {
    /// `path` with a leading slash, as the router requires.
    pub fn route_path(&self) -> String {
        let trimmed = self.path.trim();
        if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3375
}

fn default_path() -> String {
    "/".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_path_gets_leading_slash() {
        let mut config = ServerConfig::default();
        assert_eq!(config.route_path(), "/");
        config.path = "ws".into();
        assert_eq!(config.route_path(), "/ws");
        assert_eq!(config.address(), "0.0.0.0:3375");
    }
}
