use std::env;

/// Runtime configuration, read once at startup.
///
/// Missing secrets are a hard error: the credential cipher key is derived from
/// `SECRET_KEY`, so starting without it would leave previously stored
/// credentials undecryptable.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Secret the credential cipher key is derived from.
    pub secret_key: String,
    /// Secret used to sign agent bearer tokens.
    pub jwt_secret: String,
    /// Base URL deployed agents post their metric callbacks to.
    pub agent_callback_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let secret_key = env::var("SECRET_KEY").map_err(|_| "SECRET_KEY must be set".to_string())?;
        if secret_key.trim().is_empty() {
            return Err("SECRET_KEY must not be empty".to_string());
        }

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let agent_callback_url = env::var("AGENT_CALLBACK_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        Ok(AppConfig {
            database_url,
            secret_key,
            jwt_secret,
            agent_callback_url,
        })
    }
}
