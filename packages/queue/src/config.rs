use serde::{Deserialize, Serialize};

/// Connection settings for the shared Redis broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Broker address as `host:port`. Default: "localhost:6379".
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Broker password. Empty means no auth.
    #[serde(default)]
    pub password: String,
    /// Logical database index. Default: 0.
    #[serde(default)]
    pub db: i64,
}

fn default_addr() -> String {
    "localhost:6379".into()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            password: String::new(),
            db: 0,
        }
    }
}

impl QueueConfig {
    /// Render the connection URL understood by the redis client.
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}/{}", self.addr, self.db)
        } else {
            format!("redis://:{}@{}/{}", self.password, self.addr, self.db)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_without_password() {
        let config = QueueConfig::default();
        assert_eq!(config.url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_url_with_password() {
        let config = QueueConfig {
            addr: "redis.internal:6380".into(),
            password: "s3cret".into(),
            db: 2,
        };
        assert_eq!(config.url(), "redis://:s3cret@redis.internal:6380/2");
    }
}
