use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

pub const DEFAULT_LOG_LEVEL: &str = "info,tower_http=debug,sqlx=warn";

/// Logging settings, read by `AppConfig` together with the rest of the
/// service configuration. `loki_url` is only set when shipping is enabled.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_url: Option<Url>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    /// Labels attached to every log line shipped to Loki.
    pub fn labels(&self) -> [(&'static str, &str); 2] {
        [
            ("service", self.service_name.as_str()),
            ("environment", self.environment.as_str()),
        ]
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    }
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(feature = "loki")]
    {
        if let Some(loki_url) = &config.loki_url {
            return init_with_loki(config, loki_url.clone());
        }
    }

    init_console_only(config)
}

fn init_console_only(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(config.filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        "Console logging initialized"
    );
    Ok(())
}

// Must run inside the tokio runtime: the Loki shipper is a spawned task.
#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, loki_url: Url) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut builder = tracing_loki::builder();
    for (key, value) in config.labels() {
        builder = builder.label(key, value)?;
    }
    let (loki_layer, task) = builder.build_url(loki_url.clone())?;

    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(config.filter())
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        "Loki logging initialized at {}",
        loki_url
    );
    Ok(())
}
