//! CLI configuration utilities

use anyhow::{Context, Result};
use cuic_client::ClientConfig;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "cuic.toml";

/// Data directory: `--data-dir`, then `CUIC_STATE_DIR`, then the system data dir
pub fn resolve_data_dir(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir.unwrap_or_else(|| {
        std::env::var_os("CUIC_STATE_DIR").map_or_else(
            || {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("cuic")
            },
            PathBuf::from,
        )
    })
}

/// The explicit path if given, else `cuic.toml` in the data directory when present
fn config_path(explicit: Option<&Path>, data_dir: &Path) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        let candidate = data_dir.join(DEFAULT_CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    })
}

/// Load the client configuration from file and `CUIC__*` environment variables
pub fn load_client_config(explicit: Option<&Path>, data_dir: &Path) -> Result<ClientConfig> {
    let path = config_path(explicit, data_dir);
    ClientConfig::load(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from environment".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "host = \"a\"").unwrap();

        let explicit = Path::new("/etc/cuic/other.toml");
        assert_eq!(
            config_path(Some(explicit), dir.path()),
            Some(explicit.to_path_buf())
        );
    }

    #[test]
    fn test_default_file_is_used_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(config_path(None, dir.path()), None);

        let file = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&file, "host = \"cuic1.example.com\"").unwrap();
        assert_eq!(config_path(None, dir.path()), Some(file));
    }

    #[test]
    fn test_load_from_default_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "host = \"cuic1.example.com\"\nusername = \"admin\"\npassword = \"secret\"\nthrottle_ms = 250\n",
        )
        .unwrap();

        let config = load_client_config(None, dir.path()).unwrap();
        assert_eq!(config.host, "cuic1.example.com");
        assert_eq!(config.throttle_ms, 250);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_client_config(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
