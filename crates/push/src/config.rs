//! Push transport configuration.
//!
//! # Environment variables
//!
//! | Variable             | Required | Default     | Description                          |
//! |----------------------|----------|-------------|--------------------------------------|
//! | `PUSH_APP_KEY`       | no       | `app-key`   | Application key of the push service  |
//! | `PUSH_HOST`          | no       | `localhost` | Push service hostname                |
//! | `PUSH_PORT`          | no       | `8080`      | Push service port                    |
//! | `PUSH_SCHEME`        | no       | `http`      | `https` enables TLS (`wss`)          |
//! | `PUSH_AUTH_ENDPOINT` | yes      | --          | Private-channel authorization URL    |

/// Pusher protocol version sent in the connection URL.
const PROTOCOL_VERSION: u8 = 7;

/// Connection settings for the push transport.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Application key of the push service.
    pub app_key: String,
    /// Hostname of the push service.
    pub host: String,
    /// Port of the push service.
    pub port: u16,
    /// Use `wss` instead of `ws`.
    pub tls: bool,
    /// HTTP endpoint that signs private-channel subscriptions.
    pub auth_endpoint: String,
}

impl PushConfig {
    /// Build a config from `PUSH_*` environment variables.
    ///
    /// Returns `None` when `PUSH_AUTH_ENDPOINT` is unset; private
    /// channels cannot be joined without an authorization endpoint.
    pub fn from_env() -> Option<Self> {
        let auth_endpoint = std::env::var("PUSH_AUTH_ENDPOINT").ok()?;
        Some(Self {
            app_key: std::env::var("PUSH_APP_KEY").unwrap_or_else(|_| "app-key".into()),
            host: std::env::var("PUSH_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("PUSH_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            tls: std::env::var("PUSH_SCHEME").is_ok_and(|s| s == "https"),
            auth_endpoint,
        })
    }

    /// WebSocket URL for the Pusher-compatible endpoint.
    pub fn ws_url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}/app/{}?protocol={PROTOCOL_VERSION}&client=propgen&version={}",
            self.host,
            self.port,
            self.app_key,
            env!("CARGO_PKG_VERSION"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PushConfig {
        PushConfig {
            app_key: "app-key".into(),
            host: "push.example.com".into(),
            port: 443,
            tls: true,
            auth_endpoint: "https://api.example.com/api/broadcasting/auth".into(),
        }
    }

    #[test]
    fn ws_url_uses_wss_when_tls() {
        let url = config().ws_url();
        assert!(url.starts_with("wss://push.example.com:443/app/app-key?protocol=7"));
    }

    #[test]
    fn ws_url_uses_ws_without_tls() {
        let mut c = config();
        c.tls = false;
        c.port = 8080;
        assert!(c.ws_url().starts_with("ws://push.example.com:8080/app/app-key"));
    }
}
