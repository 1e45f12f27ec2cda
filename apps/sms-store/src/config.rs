use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::mongodb::MongoConfig;
use kafka_worker::{ConsumerConfig, KafkaConfig};

pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config`, `database` and
/// `kafka-worker` libraries
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub kafka: KafkaConfig,
    pub consumer: ConsumerConfig,
}

impl Config {
    /// Load and validate everything before any connection is attempted.
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;
        let mongodb = MongoConfig::from_env()?;
        let kafka = KafkaConfig::from_env()?;
        kafka.validate()?;

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            mongodb,
            kafka,
            consumer: ConsumerConfig::default(),
        })
    }
}
