//! rv - drive the rendezvous coordinator from the command line

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::info;

use rendezvous::CoordinatorHandle;
use rendezvous::cli::{Cli, Command, parse_value};
use rendezvous::config::Config;

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(double_wait = ?config.coordinator.double_wait, "rv starting");

    let coord: CoordinatorHandle = CoordinatorHandle::new(config.coordinator.clone());

    match cli.command {
        Command::Group { name, members, value } => cmd_group(&coord, &name, members, parse_value(&value)).await?,
        Command::Tag { tag, value, early } => cmd_tag(&coord, &tag, parse_value(&value), early).await?,
    }

    if cli.inspect {
        let snapshot = coord.inspect();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}

async fn cmd_group(coord: &CoordinatorHandle, name: &str, members: usize, value: serde_json::Value) -> Result<()> {
    let mut tasks = Vec::with_capacity(members);
    for id in 1..=members {
        let waiter = coord.wait_for_group(name);
        tasks.push(tokio::spawn(async move { (id, waiter.await) }));
    }

    coord.dispatch_group(name, value);

    for task in futures::future::join_all(tasks).await {
        let (id, resolved) = task.context("Group member task failed")?;
        println!("{} {} member {} resolved with: {}", "✓".green(), name.cyan(), id, resolved);
    }

    Ok(())
}

async fn cmd_tag(coord: &CoordinatorHandle, tag: &str, value: serde_json::Value, early: bool) -> Result<()> {
    if early {
        coord.dispatch(tag, value);
        let mut waiter = coord.wait_for_any(tag);
        let resolved = waiter
            .try_take()
            .ok_or_else(|| eyre!("Expected a cached value for tag {}", tag))?;
        println!("{} {} served from cache: {}", "✓".green(), tag.cyan(), resolved);
    } else {
        let waiter = coord.wait_for_any(tag);
        let task = tokio::spawn(waiter);
        coord.dispatch(tag, value);
        let resolved = task.await.context("Tag waiter task failed")?;
        println!("{} {} resolved with: {}", "✓".green(), tag.cyan(), resolved);
    }

    Ok(())
}
