//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    collections::BTreeMap,
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{
    CliArgs, Command, DatabaseOverride, HashTokenArgs, MigrateArgs, ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "fortview";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_BODY_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_SWEEP_SECS: u64 = 300;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CAROUSEL_TTL_SECS: u64 = 600;
const DEFAULT_MEDIA_DIR: &str = "uploads";
const DEFAULT_MEDIA_BASE_URL: &str = "/media";
const DEFAULT_MEDIA_FOLDER_PREFIX: &str = "fortview";
const DEFAULT_MEDIA_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 100;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub media: MediaSettings,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub body_limit_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub sweep_interval_seconds: NonZeroU32,
    pub default_ttl_seconds: NonZeroU32,
    /// TTL overrides keyed by cache namespace.
    pub ttl_seconds: BTreeMap<String, NonZeroU32>,
}

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub provider: MediaProvider,
    /// Leading folder for every stored object, e.g. `fortview/events`.
    pub folder_prefix: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum MediaProvider {
    Local {
        directory: PathBuf,
        public_base_url: String,
    },
    Cloudinary(CloudinarySettings),
}

#[derive(Clone)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinarySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinarySettings")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    /// SHA-256 digests of accepted admin bearer tokens.
    pub admin_token_hashes: Vec<[u8; 32]>,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FORTVIEW").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        Some(Command::HashToken(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    media: RawMediaSettings,
    auth: RawAuthSettings,
    rate_limit: RawRateLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(bytes) = overrides.server_body_limit_bytes {
            self.server.body_limit_bytes = Some(bytes);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        self.apply_database_override(&overrides.database);
        if let Some(count) = overrides.database_max_connections {
            self.database.max_connections = Some(count);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(seconds) = overrides.cache_sweep_interval_seconds {
            self.cache.sweep_interval_seconds = Some(seconds);
        }
        if let Some(provider) = overrides.media_provider.as_ref() {
            self.media.provider = Some(provider.clone());
        }
        if let Some(dir) = overrides.media_directory.as_ref() {
            self.media.directory = Some(dir.clone());
        }
        if let Some(seconds) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(seconds);
        }
        if let Some(max) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(max);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            media,
            auth,
            rate_limit,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            media: build_media_settings(media)?,
            auth: build_auth_settings(auth)?,
            rate_limit: build_rate_limit_settings(rate_limit)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    let body_limit_bytes = NonZeroU64::new(
        server
            .body_limit_bytes
            .unwrap_or(DEFAULT_BODY_LIMIT_BYTES),
    )
    .ok_or_else(|| LoadError::invalid("server.body_limit_bytes", "must be greater than zero"))?;

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        body_limit_bytes,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        u64::from(
            database
                .max_connections
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        ),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let sweep_interval_seconds = non_zero_u32(
        cache
            .sweep_interval_seconds
            .unwrap_or(DEFAULT_CACHE_SWEEP_SECS),
        "cache.sweep_interval_seconds",
    )?;
    let default_ttl_seconds = non_zero_u32(
        cache.default_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        "cache.default_ttl_seconds",
    )?;

    let mut ttl_seconds = BTreeMap::new();
    let overrides = cache.ttl_seconds.unwrap_or_else(|| {
        BTreeMap::from([("carousel".to_string(), DEFAULT_CAROUSEL_TTL_SECS)])
    });
    for (namespace, ttl) in overrides {
        ttl_seconds.insert(namespace, non_zero_u32(ttl, "cache.ttl_seconds")?);
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        sweep_interval_seconds,
        default_ttl_seconds,
        ttl_seconds,
    })
}

fn build_media_settings(media: RawMediaSettings) -> Result<MediaSettings, LoadError> {
    let provider_name = media
        .provider
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "local".to_string());

    let provider = match provider_name.as_str() {
        "local" => {
            let directory = media
                .directory
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_DIR));
            if directory.as_os_str().is_empty() {
                return Err(LoadError::invalid(
                    "media.directory",
                    "path must not be empty",
                ));
            }
            let public_base_url = media
                .public_base_url
                .unwrap_or_else(|| DEFAULT_MEDIA_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string();
            MediaProvider::Local {
                directory,
                public_base_url,
            }
        }
        "cloudinary" => {
            let raw = media.cloudinary.unwrap_or_default();
            MediaProvider::Cloudinary(CloudinarySettings {
                cloud_name: required_text(raw.cloud_name, "media.cloudinary.cloud_name")?,
                api_key: required_text(raw.api_key, "media.cloudinary.api_key")?,
                api_secret: required_text(raw.api_secret, "media.cloudinary.api_secret")?,
            })
        }
        other => {
            return Err(LoadError::invalid(
                "media.provider",
                format!("unknown provider `{other}`; expected `local` or `cloudinary`"),
            ));
        }
    };

    let folder_prefix = media
        .folder_prefix
        .unwrap_or_else(|| DEFAULT_MEDIA_FOLDER_PREFIX.to_string())
        .trim_matches('/')
        .to_string();

    let timeout_secs = media
        .request_timeout_seconds
        .unwrap_or(DEFAULT_MEDIA_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "media.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(MediaSettings {
        provider,
        folder_prefix,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let admin_token_hashes = auth
        .admin_token_hashes
        .iter()
        .map(String::as_str)
        .map(parse_token_hash)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AuthSettings { admin_token_hashes })
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window_seconds = non_zero_u32(
        rate_limit
            .window_seconds
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        "rate_limit.window_seconds",
    )?;
    let max_requests = non_zero_u32(
        rate_limit
            .max_requests
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS),
        "rate_limit.max_requests",
    )?;

    Ok(RateLimitSettings {
        window_seconds,
        max_requests,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    body_limit_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    sweep_interval_seconds: Option<u64>,
    default_ttl_seconds: Option<u64>,
    ttl_seconds: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMediaSettings {
    provider: Option<String>,
    directory: Option<PathBuf>,
    public_base_url: Option<String>,
    folder_prefix: Option<String>,
    request_timeout_seconds: Option<u64>,
    cloudinary: Option<RawCloudinarySettings>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCloudinarySettings {
    cloud_name: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    admin_token_hashes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn required_text(value: Option<String>, key: &'static str) -> Result<String, LoadError> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| LoadError::invalid(key, "is required"))
}

fn parse_token_hash(digest: &str) -> Result<[u8; 32], LoadError> {
    let bytes = hex::decode(digest.trim()).map_err(|err| {
        LoadError::invalid("auth.admin_token_hashes", format!("not valid hex: {err}"))
    })?;
    bytes.try_into().map_err(|_| {
        LoadError::invalid(
            "auth.admin_token_hashes",
            "each entry must be a 64-character SHA-256 hex digest",
        )
    })
}
