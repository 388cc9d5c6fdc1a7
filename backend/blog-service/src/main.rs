use actix_web::{middleware::Logger, web, App, HttpServer};
use blog_service::middleware::{RequestTimingMiddleware, SessionMiddleware};
use blog_service::{cli, db, routes, AppState, Config};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Blog Service
///
/// Serves the blog pages, or runs an operator command when one is given.
#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.app.json_logs);

    match cli::handle_cli_commands(&config).await {
        Ok(true) => return Ok(()),
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Command failed: {:#}", e);
            eprintln!("ERROR: {:#}", e);
            std::process::exit(1);
        }
    }

    tracing::info!(
        env = %config.app.env,
        backend = ?config.database.backend,
        "Starting blog-service"
    );

    let repo = db::connect(&config.database)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:#}", e)))?;

    let bind_address = config.bind_address();
    let workers = config.app.workers;
    let state = AppState::new(config, repo);
    let sessions = state.sessions.clone();
    let cookie_name = state.config.auth.session_cookie.clone();

    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(SessionMiddleware::new(sessions.clone(), &cookie_name))
            .wrap(RequestTimingMiddleware)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(routes::configure_routes)
    })
    .bind(&bind_address)?
    .workers(workers)
    .shutdown_timeout(30)
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => tracing::info!("HTTP server stopped"),
                Ok(Err(e)) => {
                    tracing::error!("HTTP server error: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("HTTP server task join error: {}", e);
                    return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
                }
            }
        }
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
        }
    }

    tracing::info!("blog-service shutting down");
    Ok(())
}
