/*
 *  main.rs
 *
 *  vestamon - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use anyhow::{Context, bail};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::fs;

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{SignalKind, signal};

use vestamon::config::{self, BoardConfig, Cli, Config};
use vestamon::coordinator::Coordinator;
use vestamon::device::LocalClient;
use vestamon::publish::{board_dir, spawn_publisher};
use vestamon::render::Renderer;
use vestamon::service::{BoardRegistry, MessageRequest};
use vestamon::vbml::{Vbml, VbmlClient};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

type Registry = BoardRegistry<LocalClient>;

/// Waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

async fn connect(board: &BoardConfig, cfg: &Config) -> anyhow::Result<LocalClient> {
    let timeout = cfg.request_timeout();
    if board.enablement_token {
        let client = LocalClient::enable(&board.host, &board.api_key, timeout)
            .await
            .with_context(|| format!("enabling local API on board '{}'", board.id))?;
        // the token is single use, the key must replace it in the config
        warn!(
            "board '{}' enabled; set api_key: {} and enablement_token: false",
            board.id,
            client.api_key()
        );
        Ok(client)
    } else {
        Ok(LocalClient::new(&board.host, &board.api_key, timeout)?)
    }
}

async fn build_registry(cfg: &Config) -> anyhow::Result<Registry> {
    let vbml = VbmlClient::new(cfg.vbml_url(), cfg.request_timeout())?;
    let mut registry = BoardRegistry::new(Some(vbml));

    for board in &cfg.boards {
        let model = board.device_model()?;
        let device = connect(board, cfg).await?;
        let renderer = Renderer::new(model, cfg.image_format(), cfg.image_height());
        let coordinator = Coordinator::builder(&board.id, device, renderer)
            .quiet_hours(board.quiet_hours()?)
            .request_timeout(cfg.request_timeout())
            .build();
        info!(
            "board '{}' at {} ({} model, {}x{})",
            board.id, board.host, model.name, model.rows, model.columns
        );
        registry.insert(coordinator);
    }
    Ok(registry)
}

/// Send one message, staying up until a temporary message has reverted.
async fn run_one_shot(cli: &Cli, registry: &Registry) -> anyhow::Result<()> {
    let device_ids = if cli.boards.is_empty() { registry.ids() } else { cli.boards.clone() };

    let vbml = match cli.vbml.as_ref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading VBML document {}", path.display()))?;
            // YAML is a superset of JSON
            Some(serde_yaml::from_str::<Vbml>(&text).context("parsing VBML document")?)
        }
        None => None,
    };

    let request = MessageRequest {
        device_ids: device_ids.clone(),
        message: cli.send.clone(),
        justify: cli.justify,
        align: cli.align,
        vbml,
        duration: cli.duration,
        options: None,
    };
    request.validate()?;

    // seed baselines so a temporary message has something to revert to
    for id in &device_ids {
        if let Err(e) = registry.get(id)?.refresh().await {
            warn!("[{}] initial read failed: {}", id, e);
        }
    }

    for (id, outcome) in registry.send_message(&request).await? {
        info!("[{}] {:?}", id, outcome);
    }

    if request.duration.is_some() {
        let mut watchers = Vec::new();
        for id in &device_ids {
            watchers.push(registry.get(id)?.subscribe());
        }
        info!("waiting for temporary message to expire (Ctrl-C reverts now)");
        let expired = async {
            for rx in watchers.iter_mut() {
                // a closed channel means the coordinator is gone, nothing to wait for
                let _ = rx.wait_for(|s| !s.temporary_active).await;
            }
        };
        tokio::select! {
            _ = expired => {}
            _ = signal_handler() => {
                registry.clear_temporary(&device_ids).await?;
            }
        }
    }
    Ok(())
}

async fn monitor(cfg: &Config, registry: &Registry) -> anyhow::Result<()> {
    let mut publishers = Vec::new();
    let mut pollers = Vec::new();

    for coordinator in registry.coordinators() {
        if let Err(e) = coordinator.refresh().await {
            warn!("[{}] initial read failed: {}", coordinator.id(), e);
        }
        if let Some(root) = cfg.output_dir.as_ref() {
            let dir = board_dir(root, coordinator.id());
            info!("[{}] publishing to {}", coordinator.id(), dir.display());
            publishers.push(spawn_publisher(coordinator.subscribe(), dir));
        }
        pollers.push(coordinator.start_polling(cfg.poll_interval()));
    }

    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    let shutdown = signal_handler();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = sigusr1.recv() => {
                info!("SIGUSR1 received. Clearing temporary messages.");
                for (id, cleared) in registry.clear_temporary(&[]).await? {
                    if cleared {
                        info!("[{}] temporary message cleared", id);
                    }
                }
            }
        }
    }

    for poller in pollers.iter_mut() {
        if let Err(e) = poller.stop().await {
            error!("{}", e);
        }
    }
    for publisher in publishers {
        publisher.abort();
    }
    info!("Shutdown complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli)?;

    if cli.dump_config {
        println!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("vestamon v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let registry = build_registry(&cfg).await?;
    if registry.is_empty() {
        bail!("no boards configured");
    }

    if cli.is_one_shot() {
        run_one_shot(&cli, &registry).await
    } else {
        monitor(&cfg, &registry).await
    }
}
