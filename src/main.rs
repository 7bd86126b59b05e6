use std::{process, sync::Arc, time::Duration};

use scribe::{
    application::{
        auth::{AuthService, TokenIssuer},
        error::AppError,
    },
    cache::{self, CacheConfig, PageCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AppState},
        memory::InMemoryRepositories,
        telemetry,
    },
};
use tokio::sync::Notify;
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateUser(args) => run_create_user(settings, args).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let page_cache = init_page_cache(&settings).await?;
    let tokens = TokenIssuer::new(&settings.auth.jwt_secret, settings.auth.token_ttl);
    if settings.auth.uses_development_secret() {
        warn!(
            target = "scribe::serve",
            "auth.jwt_secret uses the development default; set SCRIBE__AUTH__JWT_SECRET"
        );
    }

    let max_page_size = settings.cache.max_page_size.get();
    let state = match settings.database.url.as_deref() {
        Some(url) => {
            let db = connect_database(url, &settings, settings.database.run_migrations).await?;
            AppState::from_repositories(db.clone(), page_cache, tokens, max_page_size)
                .with_database(db)
        }
        None => {
            warn!(
                target = "scribe::serve",
                "database.url is not configured; posts are kept in process memory"
            );
            AppState::from_repositories(
                Arc::new(InMemoryRepositories::new()),
                page_cache,
                tokens,
                max_page_size,
            )
        }
    };

    serve_http(&settings, state).await
}

async fn init_page_cache(settings: &config::Settings) -> Result<Option<Arc<PageCache>>, AppError> {
    let cache_config = CacheConfig::from(settings);
    let page_cache = cache::build_page_cache(&cache_config).map_err(InfraError::from)?;

    match page_cache.as_ref() {
        Some(cache) => {
            if let Err(err) = cache.ping().await {
                warn!(
                    target = "scribe::serve",
                    backend = cache.backend_kind(),
                    error = %err,
                    "Cache backend unreachable; listings fall back to the store until it recovers"
                );
            }
            info!(
                target = "scribe::serve",
                backend = cache.backend_kind(),
                ttl_secs = cache.ttl().as_secs(),
                namespace = %cache_config.namespace,
                "Page cache enabled"
            );
        }
        None => info!(target = "scribe::serve", "Page cache disabled"),
    }

    Ok(page_cache)
}

async fn run_create_user(
    settings: config::Settings,
    args: config::CreateUserArgs,
) -> Result<(), AppError> {
    let url = require_database_url(&settings, "create-user")?;
    let db = connect_database(url, &settings, settings.database.run_migrations).await?;
    let tokens = TokenIssuer::new(&settings.auth.jwt_secret, settings.auth.token_ttl);
    let auth = AuthService::new(db, tokens);

    let user = auth.create_user(&args.username, &args.password).await?;

    info!(
        target = "scribe::create_user",
        user_id = user.id,
        username = %user.username,
        "User created"
    );
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let url = require_database_url(&settings, "migrate")?;
    connect_database(url, &settings, true).await?;
    info!(target = "scribe::migrate", "Migrations applied");
    Ok(())
}

fn require_database_url<'a>(
    settings: &'a config::Settings,
    command: &'static str,
) -> Result<&'a str, AppError> {
    settings.database.url.as_deref().ok_or_else(|| {
        AppError::from(InfraError::configuration(format!(
            "`{command}` requires database.url (or --database-url)"
        )))
    })
}

async fn connect_database(
    url: &str,
    settings: &config::Settings,
    run_migrations: bool,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;

    if run_migrations {
        PostgresRepositories::run_migrations(&pool)
            .await
            .map_err(InfraError::from)?;
    }

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: AppState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::Bind)?;

    info!(
        target = "scribe::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            signal.notify_one();
        },
    );

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(AppError::Server)
        }
        _ = shutdown_deadline(shutdown, grace) => {
            warn!(
                target = "scribe::serve",
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_deadline(shutdown: Arc<Notify>, grace: Duration) {
    shutdown.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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

    info!(target = "scribe::serve", "Shutdown signal received");
}
