// SPDX-License-Identifier: GPL-3.0-only

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod ops;
mod preflight;

use cli::{Cli, Command};
use ops::{CleanRequest, CreateRequest, MountRequest, ServiceDirs, SetupRequest};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::New {
            file,
            size,
            target,
            label,
            fs,
            owner,
            data,
            logs,
            and_clean,
        } => ops::create(&CreateRequest {
            file,
            size,
            target,
            label,
            fs,
            owner,
            service_dirs: service_dirs(data, logs),
            and_clean,
        }),
        Command::Mount {
            file,
            target,
            data,
            logs,
        } => ops::mount_image(&MountRequest {
            file,
            target,
            service_dirs: service_dirs(data, logs),
        }),
        Command::Setup {
            file,
            data,
            logs,
            target,
        } => ops::setup(&SetupRequest {
            file,
            target,
            dirs: ServiceDirs { data, logs },
        }),
        Command::Clean { file, destroy } => ops::clean(&CleanRequest { file, destroy }),
        Command::Preflight => preflight::check(),
    }
}

fn service_dirs(
    data: Option<std::path::PathBuf>,
    logs: Option<std::path::PathBuf>,
) -> Option<ServiceDirs> {
    // clap enforces that data and logs are given together.
    match (data, logs) {
        (Some(data), Some(logs)) => Some(ServiceDirs { data, logs }),
        _ => None,
    }
}
