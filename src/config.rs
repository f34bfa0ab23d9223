use anyhow::Context;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub central_bank_url: String,
    pub central_bank_api_key: String,
    pub signing_key_path: String,
    pub process_interval_ms: u64,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            central_bank_url: env::var("CENTRAL_BANK_URL")
                .context("CENTRAL_BANK_URL is required")?,
            central_bank_api_key: env::var("CENTRAL_BANK_APIKEY")
                .context("CENTRAL_BANK_APIKEY is required")?,
            signing_key_path: env::var("SIGNING_KEY_PATH")
                .unwrap_or_else(|_| "private.key".to_string()),
            process_interval_ms: env::var("PROCESS_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        })
    }
}
