//! Configuration file management for quill.
//!
//! Provides a TOML-based config file at `~/.config/quill/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default. The API
//! key is never stored in the file; it comes from `QUILL_API_KEY` only.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use quill_core::llm::RetryPolicy;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub vault: VaultSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LlmSection {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Override the provider base URL (proxies, test doubles).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Answer token cap per call.
    pub max_tokens: u32,
    /// Retry attempts after the initial call.
    pub max_retries: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            base_url: None,
            max_tokens: 4096,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VaultSection {
    /// Vault root directory; relative paths below resolve against it.
    pub root: String,
    pub notes_dir: String,
    pub templates_dir: String,
    pub activity_log: String,
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            notes_dir: "notes".to_string(),
            templates_dir: "templates".to_string(),
            activity_log: "activity.md".to_string(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            llm: LlmSection::default(),
            vault: VaultSection::default(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the quill config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/quill` or `~/.config/quill`.
/// We intentionally ignore the platform-specific `dirs::config_dir()`
/// (which returns `~/Library/Application Support` on macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("quill");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("quill")
}

/// Return the path to the quill config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // Set permissions to 0600 (owner read/write only) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct QuillConfig {
    pub vault_root: PathBuf,
    pub notes_dir: String,
    pub templates_dir: String,
    pub activity_log: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub retry: RetryPolicy,
}

impl QuillConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Vault root: `cli_vault` > `QUILL_VAULT` env > `config_file.vault.root` > `.`
    /// - Everything else comes from the config file, falling back to its defaults.
    pub fn resolve(cli_vault: Option<&str>) -> Result<Self> {
        let file_config = load_config().unwrap_or_default();

        let vault_root = if let Some(root) = cli_vault {
            PathBuf::from(root)
        } else if let Ok(root) = std::env::var("QUILL_VAULT") {
            PathBuf::from(root)
        } else {
            PathBuf::from(&file_config.vault.root)
        };

        Ok(Self {
            vault_root,
            notes_dir: file_config.vault.notes_dir,
            templates_dir: file_config.vault.templates_dir,
            activity_log: file_config.vault.activity_log,
            model: file_config.llm.model,
            base_url: file_config.llm.base_url,
            max_tokens: file_config.llm.max_tokens,
            retry: RetryPolicy {
                max_retries: file_config.llm.max_retries,
                ..RetryPolicy::default()
            },
        })
    }
}

/// The provider API key, from the environment only.
///
/// Deliberately never read from (or written to) the config file.
pub fn api_key() -> Result<String> {
    match std::env::var("QUILL_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("QUILL_API_KEY is not set; export your provider API key first"),
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    #[test]
    fn config_file_defaults() {
        let cfg = ConfigFile::default();
        assert_eq!(cfg.vault.notes_dir, "notes");
        assert_eq!(cfg.vault.templates_dir, "templates");
        assert_eq!(cfg.llm.max_retries, 3);
    }

    #[test]
    fn config_file_roundtrip() {
        let original = ConfigFile {
            llm: LlmSection {
                model: "claude-test".to_string(),
                base_url: Some("http://localhost:9999".to_string()),
                max_tokens: 1024,
                max_retries: 5,
            },
            vault: VaultSection {
                root: "/srv/vault".to_string(),
                ..VaultSection::default()
            },
        };

        let contents = toml::to_string_pretty(&original).unwrap();
        let loaded: ConfigFile = toml::from_str(&contents).unwrap();

        assert_eq!(loaded.llm.model, "claude-test");
        assert_eq!(loaded.llm.base_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(loaded.llm.max_tokens, 1024);
        assert_eq!(loaded.vault.root, "/srv/vault");
        assert_eq!(loaded.vault.notes_dir, "notes");
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let loaded: ConfigFile = toml::from_str("[llm]\nmodel = \"m\"\nmax_tokens = 2048\nmax_retries = 1\n").unwrap();
        assert_eq!(loaded.llm.model, "m");
        assert_eq!(loaded.vault.root, ".");
    }

    #[test]
    fn resolve_with_cli_flag_overrides_env() {
        let _lock = lock_env();

        unsafe { std::env::set_var("QUILL_VAULT", "/from/env") };
        let config = QuillConfig::resolve(Some("/from/cli")).unwrap();
        assert_eq!(config.vault_root, PathBuf::from("/from/cli"));
        unsafe { std::env::remove_var("QUILL_VAULT") };
    }

    #[test]
    fn resolve_with_env_var() {
        let _lock = lock_env();

        unsafe { std::env::set_var("QUILL_VAULT", "/from/env") };
        let config = QuillConfig::resolve(None).unwrap();
        assert_eq!(config.vault_root, PathBuf::from("/from/env"));
        unsafe { std::env::remove_var("QUILL_VAULT") };
    }

    #[test]
    fn api_key_errors_when_unset() {
        let _lock = lock_env();

        unsafe { std::env::remove_var("QUILL_API_KEY") };
        let result = api_key();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("QUILL_API_KEY"));
    }

    #[test]
    fn api_key_reads_env() {
        let _lock = lock_env();

        unsafe { std::env::set_var("QUILL_API_KEY", "sk-test") };
        assert_eq!(api_key().unwrap(), "sk-test");
        unsafe { std::env::remove_var("QUILL_API_KEY") };
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("quill/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
