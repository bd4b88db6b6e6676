use std::{fs, fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use config::{Config, Environment};
use log::info;

use super::GatewayConfig;

pub fn get_default_config() -> &'static str {
    include_str!("../../config/config.toml")
}

/// Loads configuration from `path`, creating it from the embedded default
/// on first run. Environment variables with the `GATEWAY_` prefix override
/// file values (`GATEWAY_API_KEY` maps to `api_key`, nested keys use `__`).
pub fn load_configuration(path: &Path) -> Result<GatewayConfig> {
    if !path.exists() {
        write_config_to(path, get_default_config()).context("Could not create default config")?;
        info!(path:% = path.display(); "Created new configuration file");
    }

    let filename = path.to_str().context("Invalid config file path")?;

    let cfg = Config::builder()
        .add_source(config::File::with_name(filename))
        .add_source(Environment::with_prefix("GATEWAY").prefix_separator("_").separator("__"))
        .build()
        .context("Could not build config")?;

    cfg.try_deserialize::<GatewayConfig>()
        .context("Invalid configuration values")
}

pub fn write_config_to(path: &Path, source: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create parent directories")?;
    };

    let mut file = File::create(path).context("Failed to create config file")?;
    file.write_all(source.as_bytes())
        .context("Failed to write config content")?;
    file.write_all(b"\n").context("Failed to write newline")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_from_the_embedded_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = load_configuration(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.timeout_ms, 30_000);
        assert!(!cfg.debug);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_config_to(
            &path,
            "api_key = \"test-key\"\nnetwork = \"devnet\"\nretry_attempts = 5\ntimeout_ms = 1000\n",
        )
        .unwrap();

        let cfg = load_configuration(&path).unwrap();
        assert_eq!(cfg.api_key, "test-key");
        assert_eq!(cfg.retry_attempts, 5);
        assert_eq!(cfg.timeout_ms, 1_000);
        assert_eq!(cfg.network, crate::registry::Network::Devnet);
    }

    #[test]
    fn extra_endpoints_parse_from_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_config_to(
            &path,
            r#"
[[endpoints]]
id = "local"
name = "Local gateway"
url = "http://localhost:8080"
network = "devnet"
default = true
"#,
        )
        .unwrap();

        let cfg = load_configuration(&path).unwrap();
        assert_eq!(cfg.endpoints.len(), 1);
        assert_eq!(cfg.endpoints[0].id, "local");
        assert!(cfg.endpoints[0].default);
    }
}
