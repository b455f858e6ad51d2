//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/cortex.sqlite"
//!
//! [llm]
//! provider = "openai"          # or "disabled"
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//! temperature = 0.1
//! timeout_secs = 30
//!
//! [server]
//! bind = "127.0.0.1:7340"
//!
//! [grounding]
//! max_records = 50
//! ```

use anyhow::{Context, Result};
use cortex_core::money::MAX_EXACT_TERMS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub grounding: GroundingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of an OpenAI-compatible chat completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    800
}
fn default_timeout_secs() -> u64 {
    30
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GroundingConfig {
    /// Upper bound on records returned by each connector.
    #[serde(default = "default_max_records")]
    pub max_records: i64,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

fn default_max_records() -> i64 {
    50
}

impl Config {
    /// Config with every default and the given database path.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            grounding: GroundingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.grounding.max_records < 1 {
            anyhow::bail!("grounding.max_records must be >= 1");
        }
        // Finance totals stay exact only up to this many records.
        if self.grounding.max_records > MAX_EXACT_TERMS {
            anyhow::bail!("grounding.max_records must be <= {}", MAX_EXACT_TERMS);
        }

        if !(0.0..=1.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be in [0.0, 1.0]");
        }
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be > 0");
        }
        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be > 0");
        }

        match self.llm.provider.as_str() {
            "disabled" | "openai" => {}
            other => anyhow::bail!(
                "Unknown llm provider: '{}'. Must be disabled or openai.",
                other
            ),
        }

        if self.llm.is_enabled() && self.llm.api_key_env.trim().is_empty() {
            anyhow::bail!("llm.api_key_env must name an environment variable");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_text)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"/tmp/cortex.sqlite\"\n").unwrap();
        assert_eq!(config.llm.provider, "disabled");
        assert!(!config.llm.is_enabled());
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.server.bind, "127.0.0.1:7340");
        assert_eq!(config.grounding.max_records, 50);
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse("[db]\npath = \"x\"\n[llm]\nprovider = \"oracle\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown llm provider"));
    }

    #[test]
    fn test_rejects_high_temperature() {
        assert!(parse("[db]\npath = \"x\"\n[llm]\ntemperature = 1.5\n").is_err());
    }

    #[test]
    fn test_rejects_zero_max_records() {
        assert!(parse("[db]\npath = \"x\"\n[grounding]\nmax_records = 0\n").is_err());
    }

    #[test]
    fn test_rejects_max_records_beyond_exact_totals() {
        let err = parse("[db]\npath = \"x\"\n[grounding]\nmax_records = 100000\n").unwrap_err();
        assert!(err.to_string().contains("max_records"));
        assert!(parse("[db]\npath = \"x\"\n[grounding]\nmax_records = 5000\n").is_ok());
    }

    #[test]
    fn test_missing_db_section_fails() {
        assert!(parse("[llm]\nprovider = \"openai\"\n").is_err());
    }
}
