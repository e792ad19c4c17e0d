//! camerad-ctl binary entry point.
//!
//! Wires configuration → camera session → one operation per invocation.
//! Connections are opened for the duration of a single subcommand; the
//! controllers keep their configuration between invocations, so `open` is
//! only needed once per observing session and `close` shuts the cameras
//! down.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use camerad_ctl::application::{magic, CameraSession, OpenOptions};
use camerad_ctl::infrastructure::storage::config;

/// Parses a `kind:channel` pair, e.g. `driver:3` or `adc:15`.
fn parse_channel(value: &str) -> Result<(String, u32), String> {
    let (kind, channel) = value
        .split_once(':')
        .ok_or_else(|| format!("expected kind:channel, got '{value}'"))?;
    let channel: u32 = channel
        .parse()
        .map_err(|_| format!("channel must be an integer, got '{channel}'"))?;
    Ok((kind.to_string(), channel))
}

#[derive(Parser)]
#[command(
    name = "camerad-ctl",
    about = "Control-plane client for a set of CCD camera controllers",
    version
)]
struct Cli {
    /// Path to the TOML configuration file listing controller hosts.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Limit the operation to the named hosts (default: all configured).
    #[arg(long = "host", value_name = "NAME")]
    hosts: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open and initialize the controllers (load ACF, power on, setup).
    Open {
        /// Skip loading the ACF file (also skips power-on and setup).
        #[arg(long)]
        no_load: bool,
        /// Skip powering the controllers on.
        #[arg(long)]
        no_power: bool,
        /// Skip the observation setup sequence.
        #[arg(long)]
        no_setup: bool,
    },
    /// Shut the controllers down and release all connections.
    Close,
    /// Show the session settings this client applies.
    Status,
    /// Load an ACF firmware file (controller default when omitted).
    Load {
        #[arg(value_name = "ACF")]
        acf: Option<PathBuf>,
    },
    /// Set the readout mode.
    Mode { mode: String },
    /// Set the image basename for the next exposure.
    Basename { basename: String },
    /// Set the image type (OBJECT, BIAS, DARK, ... TEST).
    Imtype { imtype: String },
    /// Turn controller power on or off.
    Power {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    /// Take one or more exposures.
    Expose {
        /// Exposure time in seconds.
        #[arg(short = 't', long, default_value_t = 0.0)]
        exptime: f64,
        /// Number of exposures.
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: u32,
    },
    /// Read a controller parameter.
    Getp { name: String },
    /// Set a controller parameter.
    Setp { name: String, value: String },
    /// One-shot exposure macro: load, type TEST, basename, expose.
    Run {
        /// ACF file to load first; omit to keep the current firmware.
        #[arg(long)]
        acf: Option<PathBuf>,
        #[arg(long, default_value = "zztf")]
        basename: String,
        #[arg(short = 't', long, default_value_t = 0.0)]
        exptime: f64,
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: u32,
        /// Read corrected (CDS) data instead of raw.
        #[arg(long)]
        read_cds: bool,
    },
    /// Program the magic board I/O and run test exposures.
    MagicBoard {
        /// ACF file to load first; omit to keep the current firmware.
        #[arg(long)]
        acf: Option<PathBuf>,
        /// Positive input channel, as kind:channel (e.g. driver:3).
        #[arg(long, value_parser = parse_channel)]
        p_in: (String, u32),
        /// Negative input channel.
        #[arg(long, value_parser = parse_channel)]
        n_in: (String, u32),
        /// Positive output channel.
        #[arg(long, value_parser = parse_channel)]
        p_out: (String, u32),
        /// Negative output channel.
        #[arg(long, value_parser = parse_channel)]
        n_out: (String, u32),
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: u32,
        /// Read corrected (CDS) data instead of raw.
        #[arg(long)]
        read_cds: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_or_default(cli.config.as_deref()).context("loading configuration")?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.camera.log_level.clone())),
        )
        .init();

    let mut session = CameraSession::from_config(&config);
    let names = (!cli.hosts.is_empty()).then_some(cli.hosts.as_slice());

    match cli.command {
        Commands::Status => {
            print!("{}", session.state());
            return Ok(());
        }
        Commands::Open {
            no_load,
            no_power,
            no_setup,
        } => {
            session
                .open(
                    names,
                    OpenOptions {
                        load: !no_load,
                        power_on: !no_power,
                        setup: !no_setup,
                    },
                )
                .await?;
            info!("camera initialized");
        }
        Commands::Close => {
            session.connect(names).await?;
            session.close().await?;
        }
        Commands::Load { acf } => {
            session.connect(names).await?;
            session.load(acf.as_deref()).await?;
        }
        Commands::Mode { mode } => {
            session.connect(names).await?;
            session.set_mode(&mode).await?;
        }
        Commands::Basename { basename } => {
            session.connect(names).await?;
            session.set_basename(&basename).await?;
        }
        Commands::Imtype { imtype } => {
            session.connect(names).await?;
            session.set_type(&imtype).await?;
        }
        Commands::Power { state } => {
            session.connect(names).await?;
            session.set_power(state == "on").await?;
        }
        Commands::Expose {
            exptime,
            iterations,
        } => {
            session.connect(names).await?;
            session.expose(exptime, iterations).await?;
        }
        Commands::Getp { name } => {
            session.connect(names).await?;
            let value = session.read_param(&name).await?;
            println!("{name} = {value}");
        }
        Commands::Setp { name, value } => {
            session.connect(names).await?;
            session.set_param(&name, &value).await?;
        }
        Commands::Run {
            acf,
            basename,
            exptime,
            iterations,
            read_cds,
        } => {
            session.connect(names).await?;
            session
                .run(acf.as_deref(), &basename, exptime, iterations, read_cds)
                .await?;
        }
        Commands::MagicBoard {
            acf,
            p_in,
            n_in,
            p_out,
            n_out,
            iterations,
            read_cds,
        } => {
            session.connect(names).await?;
            let channels = [p_in, n_in, p_out, n_out];
            magic::magic_board(&mut session, acf.as_deref(), &channels, iterations, read_cds)
                .await?;
        }
    }

    session.disconnect();
    Ok(())
}
