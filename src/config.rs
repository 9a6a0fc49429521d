//! Runtime configuration.
//!
//! Three values are required and fatal when missing: the Telegram bot token,
//! the destination chat id, and the WebSocket RPC endpoint. The remaining
//! knobs have defaults. Values come from the environment (with `.env`
//! support) or from a TOML file passed on the command line.

use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

fn default_max_concurrent_classifications() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telegram bot credential.
    pub telegram_token: String,

    /// Destination chat for token alerts.
    pub telegram_chat_id: i64,

    /// WebSocket RPC endpoint (`ws://` or `wss://`); head subscription needs
    /// a pubsub transport.
    pub rpc_address: String,

    /// Ceiling on concurrently running per-transaction classification tasks.
    #[serde(default = "default_max_concurrent_classifications")]
    pub max_concurrent_classifications: usize,

    /// When set, a failed total-supply read yields a zero supply instead of
    /// discarding the candidate.
    #[serde(default)]
    pub zero_total_supply_fallback: bool,
}

impl Config {
    /// Load configuration from environment variables and a `.env` file.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let telegram_token =
            env::var("TELEGRAM_TOKEN").map_err(|_| eyre!("TELEGRAM_TOKEN is not set"))?;
        let telegram_chat_id = env::var("TELEGRAM_CHAT_ID")
            .map_err(|_| eyre!("TELEGRAM_CHAT_ID is not set"))?
            .parse()
            .wrap_err("could not parse TELEGRAM_CHAT_ID")?;
        let rpc_address =
            env::var("RPC_ADDRESS").map_err(|_| eyre!("RPC_ADDRESS is not set"))?;

        let max_concurrent_classifications = match env::var("MAX_CONCURRENT_CLASSIFICATIONS") {
            Ok(raw) => raw
                .parse()
                .wrap_err("could not parse MAX_CONCURRENT_CLASSIFICATIONS")?,
            Err(_) => default_max_concurrent_classifications(),
        };
        let zero_total_supply_fallback = env::var("ZERO_TOTAL_SUPPLY_FALLBACK")
            .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            telegram_token,
            telegram_chat_id,
            rpc_address,
            max_concurrent_classifications,
            zero_total_supply_fallback,
        })
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .wrap_err_with(|| format!("could not read {}", path.as_ref().display()))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram_token.is_empty() {
            return Err(eyre!("TELEGRAM_TOKEN must not be empty"));
        }
        if self.telegram_chat_id == 0 {
            return Err(eyre!("TELEGRAM_CHAT_ID must be a real chat id"));
        }
        if !self.rpc_address.starts_with("ws://") && !self.rpc_address.starts_with("wss://") {
            return Err(eyre!(
                "RPC_ADDRESS must be a WebSocket endpoint (ws:// or wss://), got {:?}",
                self.rpc_address
            ));
        }
        if self.max_concurrent_classifications == 0 {
            return Err(eyre!("MAX_CONCURRENT_CLASSIFICATIONS must be at least 1"));
        }
        Ok(())
    }
}
