use ::config::{Config, ConfigError, Environment, Source};
use dotenv::dotenv;
use serde::Deserialize;
use std::fmt;

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub jwt_secret: String,
    /// Unset means the in-memory store.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_pool_size")]
    pub db_pool_size: u32,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Listings carry inline base64 images, so this is well above axum's 2 MB default.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
    #[serde(default = "default_authority_name")]
    pub authority_name: String,
    #[serde(default = "default_authority_email")]
    pub authority_email: String,
    #[serde(default = "default_authority_password")]
    pub authority_password: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_pool_size() -> u32 {
    10
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_body_limit_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_authority_name() -> String {
    "Nagar Nigam".to_string()
}

fn default_authority_email() -> String {
    "nagarnigam@dharani.com".to_string()
}

fn default_authority_password() -> String {
    "nagarnigam123".to_string()
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_source(Environment::default())
    }

    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

// Secrets stay out of the startup log.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<redacted>"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_pool_size", &self.db_pool_size)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .field("authority_name", &self.authority_name)
            .field("authority_email", &self.authority_email)
            .field("authority_password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        Environment::default().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        let config = AppConfig::from_source(env(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert!(config.database_url.is_none());
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.body_limit_bytes, 10 * 1024 * 1024);
        assert_eq!(config.authority_email, "nagarnigam@dharani.com");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_source(env(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/dharani"),
            ("BCRYPT_COST", "12"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bcrypt_cost, 12);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/dharani")
        );
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(AppConfig::from_source(env(&[("PORT", "8080")])).is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig::from_source(env(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://user:pw@localhost/db"),
        ]))
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("pw@localhost"));
        assert!(!rendered.contains("nagarnigam123"));
    }
}
