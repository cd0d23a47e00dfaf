//! Config file discovery, loading, and environment variable overlay.
//!
//! Load order, later wins:
//!
//! 1. Built-in defaults
//! 2. `$XDG_CONFIG_HOME/stock-tag/config.toml` (or the platform equivalent)
//! 3. `--config <path>` if given, otherwise `./stock-tag.toml`
//! 4. `STOCK_TAG_*` environment variables
//!
//! Files are merged table by table, so a local file can override a single
//! key without repeating the whole section.

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::error::{TagError, TagResult};

const LOCAL_FILE: &str = "stock-tag.toml";

/// Where the effective configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded, in order.
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode file values.
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// A CLI path replaces the local file and must exist.
pub fn discover_config_files(cli_path: Option<&Path>) -> TagResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    if let Some(dirs) = directories::ProjectDirs::from("", "", "stock-tag") {
        let user = dirs.config_dir().join("config.toml");
        if user.is_file() {
            files.push(user);
        }
    }

    match cli_path {
        Some(path) if path.is_file() => files.push(path.to_path_buf()),
        Some(path) => {
            return Err(TagError::config(
                "--config",
                path.display().to_string(),
                "file does not exist",
            ));
        }
        None => {
            let local = PathBuf::from(LOCAL_FILE);
            if local.is_file() {
                files.push(local);
            }
        }
    }

    Ok(files)
}

fn read_table(path: &Path) -> TagResult<toml::Table> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| TagError::io_at("read config file", path, e))?;
    contents.parse::<toml::Table>().map_err(|e| {
        TagError::config(path.display().to_string(), "", e.to_string())
            .with_operation("parse config file")
    })
}

/// Recursively merge `overlay` into `base`. Tables merge, everything else replaces.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// Build a config from already merged TOML.
pub fn from_table(table: toml::Table) -> TagResult<AppConfig> {
    toml::Value::Table(table)
        .try_into::<AppConfig>()
        .map_err(|e| TagError::config("config", "", e.to_string()).with_operation("decode config"))
}

/// Apply `STOCK_TAG_*` overrides using `lookup` to read variables.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = Vec::new();

    if let Some(v) = lookup("STOCK_TAG_BIND") {
        config.server.bind = v;
        applied.push("STOCK_TAG_BIND".to_string());
    }
    if let Some(v) = lookup("STOCK_TAG_STATIC_DIR") {
        config.server.static_dir = PathBuf::from(v);
        applied.push("STOCK_TAG_STATIC_DIR".to_string());
    }
    if let Some(v) = lookup("STOCK_TAG_CAMERA") {
        config.scan.camera = v;
        applied.push("STOCK_TAG_CAMERA".to_string());
    }
    if let Some(v) = lookup("STOCK_TAG_LOG_LEVEL") {
        config.log_level = v;
        applied.push("STOCK_TAG_LOG_LEVEL".to_string());
    }

    applied
}

/// Load files and overlay variables read through `lookup`, then validate.
pub fn load_with_env<F>(cli_path: Option<&Path>, lookup: F) -> TagResult<(AppConfig, ConfigSources)>
where
    F: Fn(&str) -> Option<String>,
{
    let files = discover_config_files(cli_path)?;

    let mut merged = toml::Table::new();
    for path in &files {
        merge_tables(&mut merged, read_table(path)?);
    }

    let mut config = from_table(merged)?;
    let env_overrides = apply_env(&mut config, lookup);
    config.validate()?;

    Ok((config, ConfigSources { files, env_overrides }))
}

/// Load using the process environment.
pub fn load(cli_path: Option<&Path>) -> TagResult<(AppConfig, ConfigSources)> {
    load_with_env(cli_path, |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn merge_overrides_single_keys() {
        let mut base: toml::Table = r#"
            log_level = "info"
            [scan]
            camera = "camera:0"
            jpeg_quality = 80
        "#
        .parse()
        .unwrap();
        let overlay: toml::Table = r#"
            [scan]
            jpeg_quality = 60
        "#
        .parse()
        .unwrap();

        merge_tables(&mut base, overlay);
        let config = from_table(base).unwrap();
        assert_eq!(config.scan.camera, "camera:0");
        assert_eq!(config.scan.jpeg_quality, 60);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = from_table(toml::Table::new()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn env_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\nbind = \"0.0.0.0:9000\"\n").unwrap();

        let env: HashMap<&str, &str> = [("STOCK_TAG_CAMERA", "frames:/tmp/frames")].into();
        let (config, sources) =
            load_with_env(Some(&path), |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.scan.camera, "frames:/tmp/frames");
        assert!(sources.files.contains(&path));
        assert_eq!(sources.env_overrides, ["STOCK_TAG_CAMERA"]);
    }

    #[test]
    fn missing_cli_file_is_an_error() {
        let result = load_with_env(Some(Path::new("/nonexistent/stock-tag.toml")), |_| None);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[scan]\njpeg_quality = 0\n").unwrap();
        assert!(load_with_env(Some(&path), |_| None).is_err());
    }
}
