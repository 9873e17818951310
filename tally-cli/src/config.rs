use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tally_extract::backend::DEFAULT_MAX_TOKENS;
use tally_extract::{BackendConfig, FormatPolicy, Provider};

use crate::auth::{AuthState, resolve_api_key};
use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    /// Defaults to the provider's model when unset
    pub model: Option<String>,
    /// Defaults to the provider's public API when unset
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisSection {
    /// Report undecodable backend output as an unverified result instead of
    /// failing.
    #[serde(default)]
    pub lenient: bool,
}

fn default_provider() -> Provider {
    Provider::Anthropic
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Config {
    pub fn format_policy(&self) -> FormatPolicy {
        if self.analysis.lenient {
            FormatPolicy::Lenient
        } else {
            FormatPolicy::Strict
        }
    }

    /// Build the backend configuration. The credential may still be empty
    /// here; `BackendConfig::validate` reports that at startup.
    pub fn backend_config(
        &self,
        auth: &AuthState,
        env: impl Fn(&str) -> Option<String>,
    ) -> BackendConfig {
        let provider = self.llm.provider;
        let key = resolve_api_key(provider, auth, env).unwrap_or_default();

        let mut cfg = BackendConfig::new(provider, key).with_max_tokens(self.llm.max_tokens);
        if let Some(model) = self.llm.model.as_deref().filter(|m| !m.trim().is_empty()) {
            cfg = cfg.with_model(model);
        }
        if let Some(url) = self.llm.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            cfg = cfg.with_base_url(url);
        }
        cfg
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
