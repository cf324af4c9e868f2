use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_3210")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Name of the env var holding the service bearer token.
    /// Empty value or unset var means dev mode (no service auth).
    #[serde(default = "d_api_token_env")]
    pub api_token_env: String,
    /// Allowed CORS origins. `"*"` means fully permissive.
    #[serde(default = "d_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "d_256")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3210,
            host: "0.0.0.0".into(),
            api_token_env: d_api_token_env(),
            allowed_origins: d_origins(),
            max_concurrent_requests: 256,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Completion provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Name of the env var holding the provider API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Fixed sampling temperature for every exercise turn.
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    /// Output-length budget per completion call.
    #[serde(default = "d_200")]
    pub max_output_tokens: u32,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            model: d_model(),
            api_key_env: d_api_key_env(),
            temperature: 0.7,
            max_output_tokens: 200,
            timeout_ms: 30_000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Serde default helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_3210() -> u16 {
    3210
}
fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_api_token_env() -> String {
    "QM_API_TOKEN".into()
}
fn d_origins() -> Vec<String> {
    vec!["http://localhost:*".into()]
}
fn d_256() -> usize {
    256
}
fn d_state_path() -> PathBuf {
    PathBuf::from("./data/state")
}
fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_model() -> String {
    "gpt-4".into()
}
fn d_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn d_temperature() -> f32 {
    0.7
}
fn d_200() -> u32 {
    200
}
fn d_30000() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_full_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 3210);
        assert_eq!(cfg.server.api_token_env, "QM_API_TOKEN");
        assert_eq!(cfg.storage.state_path, PathBuf::from("./data/state"));
        assert_eq!(cfg.llm.model, "gpt-4");
        assert_eq!(cfg.llm.max_output_tokens, 200);
        assert!((cfg.llm.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.server.port, 3210);
    }
}
