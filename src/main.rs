//! Gateway server entry point.
//!
//! High-performance HTTP API gateway built with Rust and Actix Web.

use gateway_rs::config::settings::load_settings;
use gateway_rs::config::validation::ConfigValidator;
use gateway_rs::dispatcher::Dispatcher;
use gateway_rs::logs::logger::configure_logger;
use gateway_rs::routes::{health, http};

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use tokio::signal;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    let config = load_settings().expect("Failed to load configuration");

    info!("Starting gateway v{}", config.version);

    if let Err(e) = config.validate() {
        error!("Configuration is structurally invalid: {e}");
        std::process::exit(1);
    }

    let validation_result = ConfigValidator::validate_comprehensive(&config);
    if !validation_result.is_valid {
        error!("Configuration validation failed:");
        for error in &validation_result.errors {
            error!("  - {error}");
        }
        std::process::exit(1);
    }
    info!(
        "Configuration validated successfully with {} warnings",
        validation_result.warnings.len()
    );

    let dispatcher = Dispatcher::new(&config).expect("Failed to build dispatcher");
    dispatcher.spawn_health_trackers(&config);
    dispatcher.spawn_cache_sweep(&config);

    let host = std::env::var("GATEWAY_HOST").unwrap_or_else(|_| config.listener.host.clone());
    let port = std::env::var("GATEWAY_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(config.listener.port);

    info!("Starting server on {host}:{port}");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(dispatcher.clone()))
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
            ))
            .wrap(actix_web::middleware::Compress::default())
            .configure(health::configure_health)
            .configure(http::configure_route)
    })
    .bind((host.as_str(), port))?
    .run();

    info!("Server started successfully");

    tokio::select! {
        result = server => {
            match result {
                Ok(_) => info!("Server stopped gracefully"),
                Err(e) => error!("Server error: {e}"),
            }
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
        }
    }

    Ok(())
}
