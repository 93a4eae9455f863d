//! Dry-run planner for machine creation.
//!
//! Loads the driver configuration the same way the driver does (optional
//! file, then `ONE_*` environment overrides), validates it and prints the
//! image and VM templates a create would submit. Nothing is sent to the
//! orchestrator.
//!
//! ```text
//! nebula-plan <machine-name> [--config <file>] [--image-id <id>] [--public-key <file>]
//! ```

use anyhow::Context;
use clap::Parser;
use nebula_driver::{image_name, DriverConfig, ImageId, ImageSpec, VmSpec};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "nebula-plan")]
#[command(about = "Render the templates a machine create would submit")]
#[command(version)]
struct Args {
    /// Machine to plan for.
    machine_name: String,

    /// Configuration file; `ONE_*` environment variables override it.
    #[arg(long)]
    config: Option<String>,

    /// Registered boot image to attach. Without it only the image template is printed.
    #[arg(long)]
    image_id: Option<u32>,

    /// Public key injected into the guest.
    #[arg(long)]
    public_key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, templates to stdout
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("nebula_plan=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DriverConfig::from_file(path)
            .with_context(|| format!("failed to load {path}"))?,
        None => DriverConfig::from_env()?,
    };
    config.validate()?;
    tracing::info!(machine = %args.machine_name, ?config, "Configuration loaded");

    let image = ImageSpec::new(image_name(&args.machine_name), &config.boot2docker_url);
    println!(
        "# image (datastore {})\n{}",
        config.datastore()?,
        image.to_template()
    );

    let Some(image_id) = args.image_id else {
        tracing::warn!("No --image-id given, skipping VM template");
        return Ok(());
    };

    let public_key = match &args.public_key {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => Vec::new(),
    };

    let spec = VmSpec::from_config(
        &args.machine_name,
        &config,
        ImageId::new(image_id),
        &public_key,
    )?;
    println!("# vm\n{}", spec.to_template());
    Ok(())
}
