use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::agent::AgentOptions;
use crate::session::DEFAULT_SESSION_CAPACITY;

pub const DEFAULT_VOLTAGENT_URL: &str = "http://localhost:3141";
pub const DEFAULT_AGENT_NAME: &str = "buono-kun";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub agent: AgentConfig,
    /// Most conversations kept in the in-memory session store.
    pub session_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub agent_name: String,
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub user_id: String,
    pub context_limit: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Unset means generation calls wait as long as the runtime takes.
    pub timeout: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VOLTAGENT_URL.to_string(),
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            public_key: None,
            secret_key: None,
            user_id: "recipe-runner".to_string(),
            context_limit: 10,
            temperature: 0.7,
            max_tokens: 2000,
            timeout: None,
        }
    }
}

impl AgentConfig {
    /// Per-call options with an empty conversation id.
    pub fn options(&self) -> AgentOptions {
        AgentOptions {
            user_id: self.user_id.clone(),
            conversation_id: String::new(),
            context_limit: self.context_limit,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn has_platform_credentials(&self) -> bool {
        self.public_key.is_some() && self.secret_key.is_some()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = AgentConfig::default();

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:3000")?;

        let agent = AgentConfig {
            base_url: get("VOLTAGENT_URL").unwrap_or(defaults.base_url),
            agent_name: get("VOLTAGENT_AGENT").unwrap_or(defaults.agent_name),
            public_key: get("VOLTAGENT_PUBLIC_KEY"),
            secret_key: get("VOLTAGENT_SECRET_KEY"),
            user_id: get("AGENT_USER_ID").unwrap_or(defaults.user_id),
            context_limit: parse_or(&get, "AGENT_CONTEXT_LIMIT", defaults.context_limit)?,
            temperature: parse_or(&get, "AGENT_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_or(&get, "AGENT_MAX_TOKENS", defaults.max_tokens)?,
            timeout: get("AGENT_TIMEOUT_SECS")
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|e| anyhow!("AGENT_TIMEOUT_SECS={v:?}: {e}"))
                })
                .transpose()?,
        };

        let session_capacity = parse_or(&get, "SESSION_CAPACITY", DEFAULT_SESSION_CAPACITY)?;
        if session_capacity == 0 {
            return Err(anyhow!("SESSION_CAPACITY must be at least 1"));
        }

        Ok(Self {
            bind_addr,
            agent,
            session_capacity,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key}={raw:?}: {e}")),
        None => Ok(default),
    }
}
