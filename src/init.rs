use crate::env::{
    env_opt, env_or, EXTRAS_LOG_FORMAT_ENV, EXTRAS_LOG_LEVEL_ENV, EXTRAS_LOG_SHORT_PATHS_ENV,
    EXTRAS_LOG_TEMPLATE_ENV,
};
use crate::filter::ContextFilter;
use crate::format::{ExtrasFormat, LineFormatter};
use crate::handler::{NullHandler, StreamHandler};
use crate::layer::ExtrasLayer;
use crate::record::Extras;
use crate::style::{PathStyle, Style, Template, TemplateError, TemplateStyle};
use serde::{Deserialize, Deserializer};
use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{reload, Registry};

/// Default line template.
pub const DEFAULT_TEMPLATE: &str = "{level} {shortpath}:{function}:{line} {message}";

/// Process-wide description of how records are filtered and rendered.
///
/// **Fields**
/// - `level`: most verbose level that is still emitted. Defaults to
///   `TRACE`, so nothing is dropped.
/// - `template`: line template, see [`Template`].
/// - `short_paths`: if `true`, `{shortpath}` is abbreviated to the last two
///   path segments; otherwise it renders the full path.
/// - `extras_format`: rendering of the extras suffix.
/// - `context`: keys the context filter injects into every record.
///
/// Every field is optional when deserializing; missing ones keep their
/// default.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    #[serde(deserialize_with = "deserialize_level")]
    pub level: LevelFilter,
    pub template: String,
    pub short_paths: bool,
    pub extras_format: ExtrasFormat,
    pub context: Extras,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::TRACE,
            template: DEFAULT_TEMPLATE.to_string(),
            short_paths: true,
            extras_format: ExtrasFormat::Json,
            context: ContextFilter::default().context().clone(),
        }
    }
}

impl FormatConfig {
    /// Parse a JSON document such as `{"level": "info", "extras_format": "pairs"}`.
    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(src)?)
    }

    /// Defaults overridden by the `EXTRAS_LOG_*` environment variables
    /// (see [`crate::env`]).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = FormatConfig::default();

        if let Some(level) = env_opt(EXTRAS_LOG_LEVEL_ENV) {
            config.level = parse_level(&level)?;
        }

        config.template = env_or(EXTRAS_LOG_TEMPLATE_ENV, &config.template);

        if let Some(format) = env_opt(EXTRAS_LOG_FORMAT_ENV) {
            config.extras_format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => ExtrasFormat::Json,
                "pairs" => ExtrasFormat::Pairs,
                _ => return Err(ConfigError::InvalidValue { key: EXTRAS_LOG_FORMAT_ENV, value: format }),
            };
        }

        if let Some(short) = env_opt(EXTRAS_LOG_SHORT_PATHS_ENV) {
            config.short_paths = match short.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(ConfigError::InvalidValue { key: EXTRAS_LOG_SHORT_PATHS_ENV, value: short }),
            };
        }

        Ok(config)
    }

    /// Formatter described by `template`, `short_paths` and `extras_format`.
    pub fn formatter(&self) -> Result<LineFormatter, ConfigError> {
        let template = Template::parse(&self.template)?;
        let style: Arc<dyn Style> = if self.short_paths {
            Arc::new(PathStyle::new(template))
        } else {
            Arc::new(TemplateStyle::new(template))
        };
        Ok(LineFormatter::new(style).with_extras_format(self.extras_format))
    }

    pub fn context_filter(&self) -> ContextFilter {
        ContextFilter::new(self.context.clone())
    }
}

/// Parse a level name; `warning` is accepted as an alias of `warn`.
pub fn parse_level(raw: &str) -> Result<LevelFilter, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("warning") {
        return Ok(LevelFilter::WARN);
    }
    LevelFilter::from_str(trimmed).map_err(|_| ConfigError::InvalidLevel(raw.to_string()))
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_level(&raw).map_err(serde::de::Error::custom)
}

/// Error returned when a [`FormatConfig`] is invalid.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid log level `{0}`")]
    InvalidLevel(String),

    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid line template: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error returned when the global subscriber cannot be installed.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to install global subscriber: {0}")]
    Install(#[from] TryInitError),

    #[error("failed to re-apply logging configuration: {0}")]
    Reload(#[from] reload::Error),
}

/// Build an [`ExtrasLayer`] writing to `writer`.
///
/// The layer gets one [`StreamHandler`] (context filter + line formatter)
/// and one [`NullHandler`]. Useful on its own for scoped subscribers:
///
/// ```rust,ignore
/// let layer = build_layer(&FormatConfig::default(), std::io::stdout)?;
/// let subscriber = tracing_subscriber::registry().with(layer);
/// tracing::subscriber::with_default(subscriber, || tracing::info!(d = "abc", "hello"));
/// ```
pub fn build_layer<W>(config: &FormatConfig, writer: W) -> Result<ExtrasLayer, ConfigError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let handler = StreamHandler::new(writer, config.formatter()?).with_filter(config.context_filter());

    Ok(ExtrasLayer::new(config.level)
        .with_handler(Arc::new(handler))
        .with_handler(Arc::new(NullHandler)))
}

static INSTALLED: Mutex<Option<reload::Handle<ExtrasLayer, Registry>>> = Mutex::new(None);

/// Install the global subscriber writing to `writer`, or re-apply the
/// configuration if this crate already installed one.
///
/// **Effects**
///
/// On the first call a [`Registry`] with a reloadable [`ExtrasLayer`] is
/// set as the global default and events from the `log` facade are bridged
/// into it. Later calls swap the layer in place.
///
/// **Returns**
/// - `Err(InitError::Config(..))` if `config` is invalid; nothing changes.
/// - `Err(InitError::Install(..))` if another global subscriber was set
///   by someone else.
pub fn try_init_with_writer<W>(config: FormatConfig, writer: W) -> Result<(), InitError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let layer = build_layer(&config, writer)?;

    let mut installed = INSTALLED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(handle) = installed.as_ref() {
        handle.reload(layer)?;
        return Ok(());
    }

    let (layer, handle) = reload::Layer::new(layer);
    Registry::default().with(layer).try_init()?;
    *installed = Some(handle);
    Ok(())
}

/// [`try_init_with_writer`] with standard error as the output stream.
pub fn try_init_with_config(config: FormatConfig) -> Result<(), InitError> {
    try_init_with_writer(config, io::stderr as fn() -> io::Stderr)
}

/// Initialize logging with defaults and `EXTRAS_LOG_*` overrides.
///
/// Safe to call more than once; failures are reported on stderr and
/// never abort the caller.
pub fn init() {
    let config = FormatConfig::from_env().unwrap_or_else(|e| {
        eprintln!("ignoring invalid logging environment: {}", e);
        FormatConfig::default()
    });

    if let Err(e) = try_init_with_config(config) {
        eprintln!("failed to initialize logging: {}", e);
    }
}
