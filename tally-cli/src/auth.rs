use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tally_extract::Provider;

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl AuthState {
    pub fn key_for(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        }
    }
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    load_auth_from(&auth_path()?)
}

pub fn load_auth_from(p: &Path) -> Result<AuthState> {
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Environment variable first, then the stored key. Blank values count as
/// missing.
pub fn resolve_api_key(
    provider: Provider,
    auth: &AuthState,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env(provider.api_key_env())
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            auth.key_for(provider)
                .filter(|k| !k.trim().is_empty())
                .map(str::to_string)
        })
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn anthropic_paste_key() -> Result<()> {
    let mut auth = load_auth()?;
    let key = prompt_secret("Paste Anthropic API key (starts with sk-ant-)")?;
    if !key.starts_with("sk-ant-") {
        bail!("key didn't look like an Anthropic key (expected prefix sk-ant-)");
    }
    auth.anthropic_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved Anthropic API key to {}", auth_path()?.display());
    Ok(())
}

pub fn openai_paste_key() -> Result<()> {
    let mut auth = load_auth()?;
    let key = prompt_secret("Paste OpenAI API key (starts with sk-)")?;
    if !key.starts_with("sk-") {
        bail!("key didn't look like an OpenAI API key (expected prefix sk-)");
    }
    auth.openai_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved OpenAI API key to {}", auth_path()?.display());
    Ok(())
}
