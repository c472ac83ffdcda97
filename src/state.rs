use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::storage::UserStore;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: UserStore,
    pub keys: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let state = Self::from_config(config);

        state
            .store
            .init()
            .await
            .with_context(|| format!("initialize user store at {}", state.store.path().display()))?;
        info!(path = %state.store.path().display(), "user store ready");

        Ok(state)
    }

    /// Signing keys are derived once here and shared by every request.
    pub fn from_config(config: AppConfig) -> Self {
        let store = UserStore::new(config.users_csv_path.clone());
        let keys = JwtKeys::new(&config.jwt);
        Self {
            config: Arc::new(config),
            store,
            keys,
        }
    }

    #[cfg(test)]
    pub fn fake(dir: &tempfile::TempDir, password_check: crate::config::PasswordCheck) -> Self {
        use crate::config::{DocsConfig, JwtConfig};

        Self::from_config(AppConfig {
            users_csv_path: dir.path().join("database").join("users.csv"),
            jwt: JwtConfig {
                secret: "test-secret".into(),
            },
            bcrypt_cost: 4,
            password_check,
            docs: DocsConfig {
                username: "admin".into(),
                password: "admin".into(),
            },
        })
    }
}
