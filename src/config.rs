use std::{path::PathBuf, str::FromStr};

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_BCRYPT_COST: u32 = 10;

/// How a submitted login password is compared with the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordCheck {
    /// Direct string equality against whatever is stored. Signup stores a
    /// bcrypt hash, so signup-created accounts cannot log in under this mode.
    Literal,
    /// bcrypt verification of the submitted plaintext against the stored hash.
    Hashed,
}

impl FromStr for PasswordCheck {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "literal" => Ok(Self::Literal),
            "hashed" => Ok(Self::Hashed),
            other => anyhow::bail!("unknown login password check mode: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocsConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub users_csv_path: PathBuf,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub password_check: PasswordCheck,
    pub docs: DocsConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("BCRYPT_COST is not a number: {v}"))?,
            None => DEFAULT_BCRYPT_COST,
        };
        if !(4..=31).contains(&bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between 4 and 31, got {bcrypt_cost}");
        }

        let password_check = match var("LOGIN_PASSWORD_CHECK") {
            Some(v) => v.parse()?,
            None => PasswordCheck::Literal,
        };

        Ok(Self {
            users_csv_path: var("USERS_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("database/users.csv")),
            jwt: JwtConfig { secret },
            bcrypt_cost,
            password_check,
            docs: DocsConfig {
                username: var("DOCS_USERNAME").unwrap_or_else(|| "admin".into()),
                password: var("DOCS_PASSWORD").unwrap_or_else(|| "admin".into()),
            },
        })
    }
}
