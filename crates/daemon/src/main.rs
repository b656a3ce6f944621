// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ignited`, the Ignite edge agent daemon.

use ignite_core::StaticProduct;
use ignite_daemon::{Agent, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "/etc/ignite/config.json";
const DEFAULT_STATE_DIR: &str = "/var/lib/ignite";

fn main() -> std::process::ExitCode {
    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string()));
    let state_dir = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_STATE_DIR.to_string()));

    let config = match Config::load(&config_path, &state_dir) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("ignited: {error}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let _log_guard = init_tracing(&config);

    let snapshot = config.snapshot();
    let product = Arc::new(StaticProduct {
        serial_number: snapshot.get_string("Device.serialNumber"),
        imei: snapshot.get_string("Device.imei"),
        vin: None,
        hw_version: snapshot.get_string("Device.hwVersion"),
        sw_version: snapshot.get_string("Device.swVersion"),
        device_type: {
            let device_type = snapshot.get_string("Device.deviceType");
            (!device_type.is_empty()).then_some(device_type)
        },
    });

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("ignited: cannot start runtime: {error}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(async {
        let agent = match Agent::bootstrap(&config, product) {
            Ok(agent) => agent,
            Err(error) => {
                tracing::error!(%error, "bootstrap failed");
                return 1;
            }
        };
        info!(config = %config_path.display(), "ignite agent starting");
        match agent.run().await {
            Ok(code) => code,
            Err(error) => {
                tracing::error!(%error, "agent failed");
                1
            }
        }
    });

    std::process::ExitCode::from(code.clamp(0, 255) as u8)
}

fn init_tracing(config: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().unwrap_or(&config.state_dir),
        config.log_path.file_name().unwrap_or_default(),
    );
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    guard
}
