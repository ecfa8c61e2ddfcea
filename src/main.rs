use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use clap::Parser;
use fortview::{
    application::{
        contact::ContactService,
        error::AppError,
        repos::{ContactsRepo, ContactsWriteRepo, ResourcesRepo, ResourcesWriteRepo},
        resources::ResourceService,
    },
    cache::{CacheConfig, CacheSweeper, ResponseCache, SystemClock},
    config::{self, MediaProvider},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminTokens, ApiRateLimiter, HttpState, RouterOptions},
        media, telemetry,
    },
};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let cli_args = config::CliArgs::parse();

    // Hashing a token needs no configuration.
    if let Some(config::Command::HashToken(args)) = &cli_args.command {
        println!("{}", http::hash_token(&args.token));
        return Ok(());
    }

    let settings = config::load(&cli_args)
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        None | Some(config::Command::Serve(_)) => run_serve(settings).await,
        Some(config::Command::Migrate(_)) => run_migrations(&settings).await,
        Some(config::Command::HashToken(_)) => Ok(()),
    }
}

async fn run_migrations(settings: &config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "fortview::migrate", "Migrations applied");
    Ok(())
}

async fn connect_pool(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let media_host = media::from_settings(&settings.media).map_err(AppError::from)?;

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = cache_config
        .enabled
        .then(|| Arc::new(ResponseCache::new(Arc::new(SystemClock))));
    let sweeper = cache
        .clone()
        .map(|cache| CacheSweeper::start(cache, cache_config.sweep_interval));

    let resources_reader: Arc<dyn ResourcesRepo> = repositories.clone();
    let resources_writer: Arc<dyn ResourcesWriteRepo> = repositories.clone();
    let contacts_reader: Arc<dyn ContactsRepo> = repositories.clone();
    let contacts_writer: Arc<dyn ContactsWriteRepo> = repositories.clone();

    let resources = ResourceService::new(resources_reader, resources_writer, media_host)
        .with_cache_opt(cache, cache_config)
        .with_folder_prefix(settings.media.folder_prefix.clone());
    let contacts = ContactService::new(contacts_reader, contacts_writer);

    let admin_tokens = AdminTokens::new(settings.auth.admin_token_hashes.clone());
    if admin_tokens.is_empty() {
        warn!(
            target = "fortview::auth",
            "No admin token hashes configured; every admin request will be rejected"
        );
    }

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        Duration::from_secs(u64::from(settings.rate_limit.window_seconds.get())),
        settings.rate_limit.max_requests.get(),
    ));
    let prune_handle =
        spawn_rate_limit_pruner(rate_limiter.clone(), settings.rate_limit.window_seconds.get());

    let state = HttpState {
        resources: Arc::new(resources),
        contacts: Arc::new(contacts),
        health: repositories,
        admin_tokens: Arc::new(admin_tokens),
        rate_limiter,
    };

    let result = serve_http(&settings, state).await;

    prune_handle.abort();
    let _ = prune_handle.await;
    if let Some(sweeper) = sweeper {
        sweeper.stop().await;
    }

    result
}

fn spawn_rate_limit_pruner(limiter: Arc<ApiRateLimiter>, window_seconds: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(u64::from(window_seconds)));
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            limiter.prune();
        }
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let media_dir = match &settings.media.provider {
        MediaProvider::Local { directory, .. } => Some(directory.clone()),
        MediaProvider::Cloudinary(_) => None,
    };
    let body_limit_bytes = usize::try_from(settings.server.body_limit_bytes.get())
        .map_err(|_| AppError::from(InfraError::configuration("body limit exceeds usize")))?;

    let router = http::build_router(
        state,
        RouterOptions {
            body_limit_bytes,
            media_dir,
        },
    );

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "fortview::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(grace))
    .await
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        target = "fortview::http",
        grace_secs = grace.as_secs(),
        "Shutdown signal received, draining connections"
    );

    // Force exit if draining outlives the grace period.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = "fortview::http", "Graceful shutdown timed out");
        process::exit(1);
    });
}
