mod config;
mod constants;
mod error;
mod geometry;
mod map;
mod positioning;
mod routing;
mod services;
mod session;
mod tasks;

use std::{str::FromStr, sync::Arc};

use actix_web::{App, HttpServer, dev::ServerHandle, middleware::Logger, web};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::{
    config::CONFIG,
    constants::Mode,
    map::MapRegistry,
    routing::RouteGraph,
    session::SessionCoordinator,
    tasks::history::history_writer_task,
};

/// Command line interface parser.
#[derive(Debug, Parser)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

/// Subcommands of the cli parser
#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the positioning and navigation endpoint
    Serve,
    /// Validate the beacon table and route graph, then exit
    Check,
    /// Export the waypoint graph as JSON for the map frontend
    Map,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&CONFIG.server.log_level));

    let registry = Arc::new(
        MapRegistry::load_csv(&CONFIG.positioning.beacons_file)
            .context("beacon reference table rejected")?,
    );
    anyhow::ensure!(
        !registry.is_empty(),
        "beacon reference table {} is empty",
        CONFIG.positioning.beacons_file.display()
    );
    let graph = Arc::new(RouteGraph::building());
    let default_mode = Mode::from_str(&CONFIG.positioning.default_mode).map_err(|_| {
        anyhow::anyhow!(
            "unknown default positioning mode '{}'",
            CONFIG.positioning.default_mode
        )
    })?;

    match cli.command {
        Command::Check => {
            println!("beacons: {}", registry.len());
            println!(
                "route graph: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            );
            println!("default mode: {default_mode}");
        }
        Command::Map => {
            let nodes: Vec<serde_json::Value> = graph
                .waypoints()
                .iter()
                .map(|node| {
                    serde_json::json!({
                        "id": node.id,
                        "x": node.x,
                        "y": node.y,
                        "displayName": node.display_name,
                    })
                })
                .collect();
            let edges: Vec<serde_json::Value> = graph
                .edges()
                .iter()
                .map(|(a, b)| serde_json::json!([a, b]))
                .collect();
            let map = serde_json::json!({ "nodes": nodes, "edges": edges });
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        Command::Serve => {
            let history = if CONFIG.history.enabled {
                let (logger, _writer_handle) = history_writer_task(
                    CONFIG.history.path.clone(),
                    CONFIG.history.queue_size,
                );
                Some(logger)
            } else {
                None
            };

            let coordinator = web::Data::new(SessionCoordinator::new(
                registry,
                graph,
                default_mode,
                history,
            ));

            let workers = if CONFIG.server.num_http_workers > 0 {
                CONFIG.server.num_http_workers
            } else {
                num_cpus::get()
            };

            info!(
                "rotanav server started at 0.0.0.0:{}",
                CONFIG.server.http_port
            );

            let server = HttpServer::new(move || {
                let logger = Logger::new("%a %{User-Agent}i").exclude("/health");

                App::new()
                    .app_data(coordinator.clone())
                    .service(session::ws::service)
                    .service(services::health::service)
                    .wrap(logger)
            })
            .bind(("0.0.0.0", CONFIG.server.http_port))?
            .workers(workers)
            .disable_signals()
            .shutdown_timeout(30)
            .run();

            let handle = server.handle();
            tokio::spawn(graceful_shutdown(handle));
            server.await?;
        }
    };

    Ok(())
}

async fn graceful_shutdown(handle: ServerHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigquit = signal(SignalKind::quit()).unwrap();
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigquit.recv() => info!("SIGQUIT received"),
            _ = sigterm.recv() => info!("SIGTERM received"),
            _ = sigint.recv() => info!("SIGINT received"),
        }
    }

    #[cfg(not(unix))]
    {
        use tokio::signal::windows::*;

        let mut sigbreak = ctrl_break().unwrap();
        let mut sigint = ctrl_c().unwrap();
        let mut sigquit = ctrl_close().unwrap();
        let mut sigterm = ctrl_shutdown().unwrap();

        tokio::select! {
            _ = sigbreak.recv() => info!("ctrl-break received"),
            _ = sigquit.recv() => info!("ctrl-c received"),
            _ = sigterm.recv() => info!("ctrl-close received"),
            _ = sigint.recv() => info!("ctrl-shutdown received"),
        }
    }

    info!("rotanav server stopped");
    handle.stop(true).await;
}
