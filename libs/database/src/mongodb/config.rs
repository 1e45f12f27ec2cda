#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or, require_non_empty};

pub const DEFAULT_DATABASE: &str = "sms_store";
pub const DEFAULT_MAX_POOL_SIZE: u32 = 50;
pub const DEFAULT_MIN_POOL_SIZE: u32 = 10;

/// MongoDB connection settings
///
/// Constructed manually or loaded from environment variables (with the
/// `config` feature).
///
/// ```ignore
/// let config = MongoConfig::with_database("mongodb://localhost:27017", "sms_store");
/// let config = MongoConfig::from_env()?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Connection string, `mongodb://[user:pass@]host[:port][/db][?options]`
    pub url: String,

    /// Database name to use
    pub database: String,

    /// Application name reported to the server
    pub app_name: Option<String>,

    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connect_timeout_secs: u64,
    pub server_selection_timeout_secs: u64,
}

impl MongoConfig {
    pub fn with_database(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_pool_size(mut self, max_pool_size: u32, min_pool_size: u32) -> Self {
        self.max_pool_size = max_pool_size;
        self.min_pool_size = min_pool_size;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Connection string with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: DEFAULT_DATABASE.to_string(),
            app_name: None,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            min_pool_size: DEFAULT_MIN_POOL_SIZE,
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 30,
        }
    }
}

/// Build an authenticated connection string that authenticates against the
/// target database itself.
pub fn build_url(user: &str, password: &str, host: &str, port: u16, database: &str) -> String {
    format!("mongodb://{user}:{password}@{host}:{port}/{database}?authSource={database}")
}

/// Replace the password component of a connection string with `***`.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}

/// Load MongoConfig from environment variables
///
/// - `MONGODB_URL` or `MONGO_URL` - full connection string. When neither is
///   set, one is built from the pieces below.
/// - `MONGO_HOST` (default `mongodb`), `MONGO_PORT` (default `27017`)
/// - `MONGO_APP_USER` (default `smsapp`), `MONGO_APP_PASSWORD` (default `smsapp123`)
/// - `MONGODB_DATABASE` or `MONGO_DATABASE` (default `sms_store`)
/// - `MONGODB_APP_NAME` (optional)
/// - `MONGODB_MAX_POOL_SIZE` (default 50), `MONGODB_MIN_POOL_SIZE` (default 10)
/// - `MONGODB_CONNECT_TIMEOUT_SECS` (default 10)
/// - `MONGODB_SERVER_SELECTION_TIMEOUT_SECS` (default 30)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let database = match std::env::var("MONGODB_DATABASE") {
            Ok(db) if !db.is_empty() => db,
            _ => env_or_default("MONGO_DATABASE", DEFAULT_DATABASE),
        };
        require_non_empty("MONGO_DATABASE", &database)?;

        let explicit_url = ["MONGODB_URL", "MONGO_URL"]
            .iter()
            .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));

        let url = match explicit_url {
            Some(url) => url,
            None => {
                let host = env_or_default("MONGO_HOST", "mongodb");
                let port: u16 = env_parse_or("MONGO_PORT", 27017)?;
                let user = env_or_default("MONGO_APP_USER", "smsapp");
                let password = env_or_default("MONGO_APP_PASSWORD", "smsapp123");
                require_non_empty("MONGO_HOST", &host)?;
                require_non_empty("MONGO_APP_USER", &user)?;
                require_non_empty("MONGO_APP_PASSWORD", &password)?;
                build_url(&user, &password, &host, port, &database)
            }
        };

        let max_pool_size = env_parse_or("MONGODB_MAX_POOL_SIZE", DEFAULT_MAX_POOL_SIZE)?;
        let min_pool_size = env_parse_or("MONGODB_MIN_POOL_SIZE", DEFAULT_MIN_POOL_SIZE)?;
        if min_pool_size > max_pool_size {
            return Err(ConfigError::ParseError {
                key: "MONGODB_MIN_POOL_SIZE".to_string(),
                details: format!("{min_pool_size} exceeds max pool size {max_pool_size}"),
            });
        }

        Ok(Self {
            url,
            database,
            app_name: std::env::var("MONGODB_APP_NAME").ok(),
            max_pool_size,
            min_pool_size,
            connect_timeout_secs: env_parse_or("MONGODB_CONNECT_TIMEOUT_SECS", 10)?,
            server_selection_timeout_secs: env_parse_or(
                "MONGODB_SERVER_SELECTION_TIMEOUT_SECS",
                30,
            )?,
        })
    }
}
