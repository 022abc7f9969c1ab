use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `POPREACH__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("POPREACH")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

/// Per-page-view configuration of the in-browser engine. The host reads
/// `site_id` from the embed script tag's `data-site-id` attribute; the
/// endpoints derive from the script's own origin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkConfig {
    pub site_id: String,
    pub config_endpoint: String,
    pub lead_endpoint: String,
    pub event_endpoint: String,
}

impl SdkConfig {
    pub fn new(site_id: impl Into<String>, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            site_id: site_id.into(),
            config_endpoint: format!("{origin}/v1/embed"),
            lead_endpoint: format!("{origin}/v1/leads"),
            event_endpoint: format!("{origin}/v1/events"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_config_endpoints() {
        let cfg = SdkConfig::new("site-1", "https://cdn.popreach.io/");
        assert_eq!(cfg.config_endpoint, "https://cdn.popreach.io/v1/embed");
        assert_eq!(cfg.lead_endpoint, "https://cdn.popreach.io/v1/leads");
        assert_eq!(cfg.event_endpoint, "https://cdn.popreach.io/v1/events");
    }

    #[test]
    fn test_app_config_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.http_port, 8080);
        assert_eq!(cfg.api.host, "0.0.0.0");
    }
}
