//! Configuration resolution for furni-ai
//!
//! Multi-tier resolution with Database → ENV → TOML priority.

use furni_common::config::TomlConfig;
use furni_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

pub const FLOWISE_URL_ENV: &str = "FURNICRAFT_FLOWISE_URL";
pub const FLOWISE_API_KEY_ENV: &str = "FURNICRAFT_FLOWISE_API_KEY";

/// Resolve the Flowise prediction endpoint
///
/// **Priority:** Database → ENV → TOML. `None` when no tier has a value; the
/// service then analyzes with the local fallback.
pub async fn resolve_flowise_url(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_url = crate::db::settings::get_flowise_url(db)
        .await?
        .filter(|url| is_valid_value(url));
    let env_url = std::env::var(FLOWISE_URL_ENV)
        .ok()
        .filter(|url| is_valid_value(url));
    let toml_url = toml_config
        .flowise
        .api_url
        .clone()
        .filter(|url| is_valid_value(url));

    let candidates = [
        ("database", db_url),
        ("environment", env_url),
        ("TOML", toml_url),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(source, _)| *source)
        .collect();

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Flowise URL found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match candidates
        .into_iter()
        .find_map(|(source, value)| value.map(|v| (source, v)))
    {
        Some((source, url)) => {
            info!("Flowise URL loaded from {}", source);
            Ok(Some(url.trim().to_string()))
        }
        None => {
            warn!(
                "Flowise URL not configured; analyses use the local fallback. Configure using one of:\n\
                 1. Environment: {}=http://host/api/v1/prediction/<flow-id>\n\
                 2. TOML config: [flowise] api_url = \"...\"",
                FLOWISE_URL_ENV
            );
            Ok(None)
        }
    }
}

/// Resolve the optional Flowise API key (ENV → TOML)
pub fn resolve_flowise_api_key(toml_config: &TomlConfig) -> Option<String> {
    std::env::var(FLOWISE_API_KEY_ENV)
        .ok()
        .filter(|key| is_valid_value(key))
        .or_else(|| {
            toml_config
                .flowise
                .api_key
                .clone()
                .filter(|key| is_valid_value(key))
        })
}

/// URL prefix stored images are served at
pub fn resolve_public_base_url(toml_config: &TomlConfig) -> String {
    toml_config
        .storage
        .public_base_url
        .clone()
        .filter(|url| is_valid_value(url))
        .unwrap_or_else(|| format!("http://{}/storage", toml_config.server.bind_address()))
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_no_source_means_fallback() {
        std::env::remove_var(FLOWISE_URL_ENV);
        let (pool, _dir) = test_pool().await;

        let url = resolve_flowise_url(&pool, &TomlConfig::default()).await.unwrap();
        assert_eq!(url, None);
    }

    #[tokio::test]
    #[serial]
    async fn test_database_beats_env_and_toml() {
        let (pool, _dir) = test_pool().await;
        crate::db::settings::set_flowise_url(&pool, "http://db/flow".into())
            .await
            .unwrap();
        std::env::set_var(FLOWISE_URL_ENV, "http://env/flow");
        let mut toml = TomlConfig::default();
        toml.flowise.api_url = Some("http://toml/flow".into());

        let url = resolve_flowise_url(&pool, &toml).await.unwrap();
        std::env::remove_var(FLOWISE_URL_ENV);
        assert_eq!(url.as_deref(), Some("http://db/flow"));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_beats_toml_and_blank_is_ignored() {
        let (pool, _dir) = test_pool().await;
        let mut toml = TomlConfig::default();
        toml.flowise.api_url = Some("http://toml/flow".into());

        std::env::set_var(FLOWISE_URL_ENV, "http://env/flow");
        let url = resolve_flowise_url(&pool, &toml).await.unwrap();
        assert_eq!(url.as_deref(), Some("http://env/flow"));

        std::env::set_var(FLOWISE_URL_ENV, "   ");
        let url = resolve_flowise_url(&pool, &toml).await.unwrap();
        std::env::remove_var(FLOWISE_URL_ENV);
        assert_eq!(url.as_deref(), Some("http://toml/flow"));
    }

    #[test]
    #[serial]
    fn test_api_key_resolution() {
        std::env::remove_var(FLOWISE_API_KEY_ENV);
        let mut toml = TomlConfig::default();
        assert_eq!(resolve_flowise_api_key(&toml), None);

        toml.flowise.api_key = Some("toml-key".into());
        assert_eq!(resolve_flowise_api_key(&toml).as_deref(), Some("toml-key"));

        std::env::set_var(FLOWISE_API_KEY_ENV, "env-key");
        assert_eq!(resolve_flowise_api_key(&toml).as_deref(), Some("env-key"));
        std::env::remove_var(FLOWISE_API_KEY_ENV);
    }

    #[test]
    fn test_public_base_url_defaults_to_bind_address() {
        let mut toml = TomlConfig::default();
        assert_eq!(resolve_public_base_url(&toml), "http://127.0.0.1:5740/storage");

        toml.storage.public_base_url = Some("https://cdn.example.com/images".into());
        assert_eq!(resolve_public_base_url(&toml), "https://cdn.example.com/images");
    }
}
