//! Veilkit Configuration
//!
//! Shared configuration crate for all veilkit components.
//!
//! Handles loading configuration from:
//! 1. VEIL_CONFIG env var (explicit path)
//! 2. ./veilkit.toml (current directory)
//! 3. ~/.veilkit/veilkit.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<VeilConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "veilkit.toml";
const CONFIG_DIR_NAME: &str = ".veilkit";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_SHADOWWIRE_URL: &str = "https://api.shadowwire.example";
const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";
const DEFAULT_INDEXER_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_CSPL_PROGRAM: &str = "9HXapBN9otLGnQNGv1HRk91DGqMNvMAvQqohL7gPW1sd";
const DEFAULT_POOL_PROGRAM: &str = "7rsVijhQ1ipfc6uxzcs4R2gBtD9L5ZLubSc6vPKXgawo";
const DEFAULT_VERIFIER_PROGRAM: &str = "EZzyLrTrC4uyU488jVAs4GKeCR1s9GmoFggeiDqwDeNK";

const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PROVE_TIMEOUT_SECS: u64 = 120;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_MS: u64 = 1_000;
const DEFAULT_RETRY_MAX_MS: u64 = 10_000;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeilConfig {
    #[serde(default)]
    pub shadowwire: ShadowWireConfig,
    #[serde(default)]
    pub solana: SolanaConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Remote-API provider endpoint and authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowWireConfig {
    #[serde(default = "default_shadowwire_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for ShadowWireConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SHADOWWIRE_URL.into(),
            api_key: None,
            access_token: None,
        }
    }
}

fn default_shadowwire_url() -> String {
    DEFAULT_SHADOWWIRE_URL.into()
}

/// Solana connection and program configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_cspl_program")]
    pub cspl_program_id: String,
    #[serde(default = "default_pool_program")]
    pub pool_program_id: String,
    #[serde(default = "default_verifier_program")]
    pub verifier_program_id: String,
    /// MXE cluster public key, hex (32 bytes)
    #[serde(default)]
    pub mxe_public_key: Option<String>,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            cspl_program_id: DEFAULT_CSPL_PROGRAM.into(),
            pool_program_id: DEFAULT_POOL_PROGRAM.into(),
            verifier_program_id: DEFAULT_VERIFIER_PROGRAM.into(),
            mxe_public_key: None,
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.into()
}
fn default_cspl_program() -> String {
    DEFAULT_CSPL_PROGRAM.into()
}
fn default_pool_program() -> String {
    DEFAULT_POOL_PROGRAM.into()
}
fn default_verifier_program() -> String {
    DEFAULT_VERIFIER_PROGRAM.into()
}

/// Merkle-proof indexer endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    #[serde(default = "default_indexer_url")]
    pub base_url: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INDEXER_URL.into(),
        }
    }
}

fn default_indexer_url() -> String {
    DEFAULT_INDEXER_URL.into()
}

/// Per-operation timeout table (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_api_timeout")]
    pub api_secs: u64,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_secs: u64,
    #[serde(default = "default_confirm_timeout")]
    pub confirm_secs: u64,
    #[serde(default = "default_prove_timeout")]
    pub prove_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            api_secs: DEFAULT_API_TIMEOUT_SECS,
            rpc_secs: DEFAULT_RPC_TIMEOUT_SECS,
            confirm_secs: DEFAULT_CONFIRM_TIMEOUT_SECS,
            prove_secs: DEFAULT_PROVE_TIMEOUT_SECS,
        }
    }
}

fn default_api_timeout() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}
fn default_rpc_timeout() -> u64 {
    DEFAULT_RPC_TIMEOUT_SECS
}
fn default_confirm_timeout() -> u64 {
    DEFAULT_CONFIRM_TIMEOUT_SECS
}
fn default_prove_timeout() -> u64 {
    DEFAULT_PROVE_TIMEOUT_SECS
}

/// Retry policy for transport errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_retry_max_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_RETRY_BASE_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_MS,
        }
    }
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_retry_base_ms() -> u64 {
    DEFAULT_RETRY_BASE_MS
}
fn default_retry_max_ms() -> u64 {
    DEFAULT_RETRY_MAX_MS
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl VeilConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                tracing::info!("loading config from {}", path.display());
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file: {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("failed to parse config file: {}", path.display()))?
            }
            None => {
                tracing::info!("no config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("VEIL_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        dirs::home_dir()
            .map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        env_string("VEIL_SHADOWWIRE_URL", &mut self.shadowwire.base_url);
        env_option_string("VEIL_SHADOWWIRE_API_KEY", &mut self.shadowwire.api_key);
        env_option_string(
            "VEIL_SHADOWWIRE_ACCESS_TOKEN",
            &mut self.shadowwire.access_token,
        );

        env_string("SOLANA_RPC_URL", &mut self.solana.rpc_url);
        env_string("VEIL_CSPL_PROGRAM", &mut self.solana.cspl_program_id);
        env_string("VEIL_POOL_PROGRAM", &mut self.solana.pool_program_id);
        env_string("VEIL_VERIFIER_PROGRAM", &mut self.solana.verifier_program_id);
        env_option_string("VEIL_MXE_PUBKEY", &mut self.solana.mxe_public_key);

        env_string("VEIL_INDEXER_URL", &mut self.indexer.base_url);

        env_parse("VEIL_API_TIMEOUT_SECS", &mut self.timeouts.api_secs);
        env_parse("VEIL_RPC_TIMEOUT_SECS", &mut self.timeouts.rpc_secs);
        env_parse("VEIL_CONFIRM_TIMEOUT_SECS", &mut self.timeouts.confirm_secs);
        env_parse("VEIL_PROVE_TIMEOUT_SECS", &mut self.timeouts.prove_secs);

        env_parse("VEIL_MAX_RETRIES", &mut self.retry.max_retries);
        env_parse("VEIL_RETRY_BASE_MS", &mut self.retry.base_delay_ms);
        env_parse("VEIL_RETRY_MAX_MS", &mut self.retry.max_delay_ms);
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static VeilConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                tracing::warn!("failed to load config: {e}, using defaults");
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static VeilConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: VeilConfig) -> std::result::Result<(), VeilConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `VeilConfig::global()`.
#[inline]
pub fn global_config() -> &'static VeilConfig {
    VeilConfig::global()
}

// ============================================================================
// Parsed Config (lazy-initialized constants)
// ============================================================================

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::LazyLock;

/// Pre-parsed program configuration - access fields directly like a constant.
///
/// # Example
/// ```ignore
/// use veilkit_config::PROGRAMS;
///
/// let pool = PROGRAMS.pool_program;  // Pubkey - no function call!
/// ```
pub static PROGRAMS: LazyLock<ProgramRuntime> = LazyLock::new(|| {
    let cfg = VeilConfig::global();
    ProgramRuntime {
        cspl_program: Pubkey::from_str(&cfg.solana.cspl_program_id)
            .expect("invalid cspl_program_id in config"),
        pool_program: Pubkey::from_str(&cfg.solana.pool_program_id)
            .expect("invalid pool_program_id in config"),
        verifier_program: Pubkey::from_str(&cfg.solana.verifier_program_id)
            .expect("invalid verifier_program_id in config"),
        rpc_url: &cfg.solana.rpc_url,
    }
});

/// Pre-parsed program configuration with `Pubkey` fields.
pub struct ProgramRuntime {
    /// C-SPL confidential token program ID (pre-parsed)
    pub cspl_program: Pubkey,
    /// Privacy pool program ID (pre-parsed)
    pub pool_program: Pubkey,
    /// ZK verifier program ID (pre-parsed)
    pub verifier_program: Pubkey,
    /// Solana RPC URL
    pub rpc_url: &'static str,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VeilConfig::default();
        assert_eq!(config.shadowwire.base_url, DEFAULT_SHADOWWIRE_URL);
        assert_eq!(config.solana.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.retry.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.timeouts.prove_secs, DEFAULT_PROVE_TIMEOUT_SECS);
    }

    #[test]
    fn test_generate_sample() {
        let sample = VeilConfig::generate_sample();
        assert!(sample.contains("[shadowwire]"));
        assert!(sample.contains("[solana]"));
        assert!(sample.contains("[timeouts]"));
        assert!(sample.contains("[retry]"));
    }

    #[test]
    fn test_parse_sample() {
        let sample = VeilConfig::generate_sample();
        let parsed: VeilConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.indexer.base_url, DEFAULT_INDEXER_URL);
        assert_eq!(parsed.retry.base_delay_ms, DEFAULT_RETRY_BASE_MS);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: VeilConfig = toml::from_str("[shadowwire]\nbase_url = \"http://x\"\n").unwrap();
        assert_eq!(parsed.shadowwire.base_url, "http://x");
        assert_eq!(parsed.timeouts.api_secs, DEFAULT_API_TIMEOUT_SECS);
    }
}
