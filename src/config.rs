// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;

use ed25519_dalek::VerifyingKey;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://proxy.royaleapi.dev/v1";
pub const DEFAULT_DATA_FILE: &str = "player_data.json";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("DISCORD_PUBLIC_KEY is not a valid Ed25519 public key: {0}")]
    InvalidPublicKey(String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key used to verify Discord interaction signatures.
    pub public_key: VerifyingKey,
    /// Bearer token for the Clash Royale proxy API.
    pub api_token: String,
    /// Base URL of the player API, without a trailing slash.
    pub api_base: String,
    /// JSON file holding user registrations.
    pub data_file: PathBuf,
    /// Port to bind the HTTP server to.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DISCORD_PUBLIC_KEY` - hex-encoded application public key (required)
    /// - `CLASH_API_TOKEN` - upstream API bearer token (required)
    /// - `CLASH_API_BASE` - upstream base URL (default: `https://proxy.royaleapi.dev/v1`)
    /// - `DATA_FILE` - registration store path (default: `player_data.json`)
    /// - `PORT` - HTTP server port (default: 3000)
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--data-file <PATH>` - Override the store path
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI args and an environment lookup.
    pub fn from_sources<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let public_key = env("DISCORD_PUBLIC_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_PUBLIC_KEY"))?;
        let public_key = parse_public_key(public_key.trim())?;

        let api_token = env("CLASH_API_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("CLASH_API_TOKEN"))?;

        let api_base = env("CLASH_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        // CLI flag takes precedence, then env var, then default
        let data_file = Self::parse_cli_value(args, "--data-file")
            .or_else(|| env("DATA_FILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        Ok(Config {
            public_key,
            api_token,
            api_base,
            data_file,
            port,
        })
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

/// Decode a hex-encoded Ed25519 public key.
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey, ConfigError> {
    let bytes = hex::decode(hex_key).map_err(|e| ConfigError::InvalidPublicKey(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| ConfigError::InvalidPublicKey("expected 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| ConfigError::InvalidPublicKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use std::collections::HashMap;

    fn public_key_hex() -> String {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        hex::encode(signing.verifying_key().to_bytes())
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_required_secrets() {
        let key = public_key_hex();
        let env = env_from(&[("DISCORD_PUBLIC_KEY", key.as_str()), ("CLASH_API_TOKEN", "token")]);
        let config = Config::from_sources(&[], env).unwrap();
        assert_eq!(config.api_token, "token");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.data_file, PathBuf::from(DEFAULT_DATA_FILE));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_missing_public_key_is_fatal() {
        let env = env_from(&[("CLASH_API_TOKEN", "token")]);
        let err = Config::from_sources(&[], env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DISCORD_PUBLIC_KEY")));
    }

    #[test]
    fn test_missing_api_token_is_fatal() {
        let key = public_key_hex();
        let env = env_from(&[("DISCORD_PUBLIC_KEY", key.as_str())]);
        let err = Config::from_sources(&[], env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CLASH_API_TOKEN")));
    }

    #[test]
    fn test_invalid_public_key() {
        let env = env_from(&[("DISCORD_PUBLIC_KEY", "zz"), ("CLASH_API_TOKEN", "t")]);
        let err = Config::from_sources(&[], env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPublicKey(_)));

        assert!(parse_public_key("abcd").is_err());
    }

    #[test]
    fn test_cli_overrides_env() {
        let key = public_key_hex();
        let env = env_from(&[
            ("DISCORD_PUBLIC_KEY", key.as_str()),
            ("CLASH_API_TOKEN", "token"),
            ("PORT", "4000"),
            ("DATA_FILE", "env.json"),
            ("CLASH_API_BASE", "http://localhost:9000/v1/"),
        ]);
        let args: Vec<String> = ["royale-bot", "--port", "8080", "--data-file", "cli.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = Config::from_sources(&args, env).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_file, PathBuf::from("cli.json"));
        assert_eq!(config.api_base, "http://localhost:9000/v1");
    }
}
