//! CameraSession: the operation layer sequencing state updates with
//! broadcasts.
//!
//! Every observable operation follows the same discipline: validate
//! arguments first (before any network activity), broadcast the command
//! line, and commit the corresponding [`SessionState`] change only once the
//! broadcast outcome is known.  `expose` is the one exception — it records
//! the requested exposure parameters before dispatch, mirroring the
//! controllers' behavior of latching them on receipt.
//!
//! # Session lifecycle
//!
//! ```text
//! CLOSED ──open──► OPEN ──load──► LOADED ──setup──► CONFIGURED ⇄ EXPOSING
//! ```
//!
//! The stages of `open` (load ACF, power on, setup) are individually
//! skippable; any stage failure aborts the later stages and surfaces the
//! first failing stage's error.

use std::fmt;
use std::path::{Path, PathBuf};

use camerad_core::{Command, ImageType, SessionState};
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::infrastructure::network::{
    BroadcastError, Broadcaster, ConnectionError, HostEntry, HostSet,
};
use crate::infrastructure::storage::config::ClientConfig;

/// Errors surfaced by camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// An argument failed validation; nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Opening controller connections failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// A broadcast failed; the current operation was aborted without
    /// committing state.
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

/// Stage flags for [`CameraSession::open`].  All stages run by default.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    /// Load the default ACF file after opening.
    pub load: bool,
    /// Power the controllers on after loading.
    pub power_on: bool,
    /// Reset session state and run the setup sequence.
    pub setup: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            load: true,
            power_on: true,
            setup: true,
        }
    }
}

/// One logical camera session: the host set plus the state it mirrors.
pub struct CameraSession {
    hosts: HostSet,
    state: SessionState,
    broadcaster: Broadcaster,
    default_acf: Option<PathBuf>,
}

impl CameraSession {
    pub fn new(entries: Vec<HostEntry>) -> Self {
        Self {
            hosts: HostSet::new(entries),
            state: SessionState::new(),
            broadcaster: Broadcaster::new(),
            default_acf: None,
        }
    }

    /// Builds a session from the loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut session = Self::new(config.host_entries());
        session.default_acf = config.camera.default_acf.clone();
        session
    }

    /// Replaces the broadcaster, used by tests to shorten the read timeout.
    pub fn with_broadcaster(mut self, broadcaster: Broadcaster) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn hosts(&self) -> &HostSet {
        &self.hosts
    }

    async fn send(&mut self, command: Command) -> Result<String, CameraError> {
        Ok(self.broadcaster.send(&mut self.hosts, &command).await?)
    }

    /// Establishes the TCP connections without sending anything.
    pub async fn connect(&mut self, names: Option<&[String]>) -> Result<(), CameraError> {
        self.hosts.open(names).await?;
        Ok(())
    }

    /// Releases the TCP connections without telling the controllers; they
    /// stay configured for the next client process.
    pub fn disconnect(&mut self) {
        self.hosts.drop_links();
    }

    /// Opens connections and initializes the controllers: broadcast `open`,
    /// then per [`OpenOptions`] load the default ACF, power on, reset the
    /// session state to defaults and run the setup sequence.
    ///
    /// Skipping the load stage also skips power-on and setup, since neither
    /// is meaningful on an unloaded controller.
    pub async fn open(
        &mut self,
        names: Option<&[String]>,
        options: OpenOptions,
    ) -> Result<(), CameraError> {
        self.connect(names).await?;
        self.send(Command::new("open")).await?;

        if !options.load {
            info!("skipping load acf, power on and setup");
            return Ok(());
        }

        info!("loading default acf file");
        let acf = self.default_acf.clone();
        self.load(acf.as_deref()).await?;

        if options.power_on {
            info!("turning power on");
            self.send(Command::new("POWERON")).await?;
        } else {
            info!("skipping POWERON");
        }

        if options.setup {
            self.state.reset();
            self.setup_observation().await?;
        } else {
            info!("skipping setup");
        }
        Ok(())
    }

    /// Broadcasts `close`, then releases every connection handle regardless
    /// of the command's outcome.
    pub async fn close(&mut self) -> Result<(), CameraError> {
        let result = self.send(Command::new("close")).await;
        self.hosts.drop_links();
        result?;
        info!("camera closed");
        Ok(())
    }

    /// Loads an ACF firmware file, or the controllers' default when `path`
    /// is `None`.  Records the explicit path on success.
    pub async fn load(&mut self, path: Option<&Path>) -> Result<(), CameraError> {
        let command = match path {
            Some(path) => Command::new("load").arg(path.display()),
            None => Command::new("load"),
        };
        self.send(command).await?;
        if let Some(path) = path {
            self.state.acf_file = Some(path.to_path_buf());
        }
        Ok(())
    }

    /// Sets the readout mode.  An unchanged mode is a silent no-op; a
    /// changed mode is committed only after every host acknowledged it.
    pub async fn set_mode(&mut self, mode: &str) -> Result<(), CameraError> {
        if self.state.mode == mode {
            info!("using mode {mode}");
            return Ok(());
        }
        self.send(Command::new("mode").arg(mode)).await?;
        info!("mode changed: {} -> {}", self.state.mode, mode);
        self.state.mode = mode.to_string();
        Ok(())
    }

    /// Sets the image basename for the next exposure.  An empty name is
    /// rejected before any network activity; an unchanged name is a no-op.
    pub async fn set_basename(&mut self, basename: &str) -> Result<(), CameraError> {
        if basename.split_whitespace().next().is_none() {
            return Err(CameraError::InvalidArgument(
                "basename cannot be empty".to_string(),
            ));
        }
        if self.state.basename == basename {
            return Ok(());
        }
        self.send(Command::new("basename").arg(basename)).await?;
        info!("basename changed: {} -> {}", self.state.basename, basename);
        self.state.basename = basename.to_string();
        Ok(())
    }

    /// Sets the image type.  Unknown labels are rejected before any network
    /// activity; an unchanged type is a no-op.
    pub async fn set_type(&mut self, label: &str) -> Result<(), CameraError> {
        let image_type: ImageType = label
            .parse()
            .map_err(|e: camerad_core::ParseImageTypeError| {
                CameraError::InvalidArgument(e.to_string())
            })?;
        if self.state.image_type == image_type {
            return Ok(());
        }
        self.send(Command::new("key").arg(format!("IMTYPE={image_type}")))
            .await?;
        self.state.image_type = image_type;
        Ok(())
    }

    /// Turns controller power on or off.
    ///
    /// Unlike the other setters, requesting the state already recorded is
    /// rejected rather than ignored — a redundant power command is treated
    /// as an operator mistake.  This asymmetry is intentional and matches
    /// the controllers' established behavior.
    pub async fn set_power(&mut self, on: bool) -> Result<(), CameraError> {
        let label = if on { "ON" } else { "OFF" };
        if on == self.state.power_on {
            return Err(CameraError::InvalidArgument(format!(
                "power is already {label}"
            )));
        }
        info!("turning power {label}");
        self.send(Command::new(if on { "POWERON" } else { "POWEROFF" }))
            .await?;
        self.state.power_on = on;
        Ok(())
    }

    /// Takes `iterations` exposures of `exposure_time` seconds each.
    ///
    /// The exposure parameters are recorded unconditionally before
    /// dispatch.
    pub async fn expose(&mut self, exposure_time: f64, iterations: u32) -> Result<(), CameraError> {
        if !exposure_time.is_finite() || exposure_time < 0.0 {
            return Err(CameraError::InvalidArgument(
                "exposure time must be >= 0".to_string(),
            ));
        }
        if iterations == 0 {
            return Err(CameraError::InvalidArgument(
                "iterations must be > 0".to_string(),
            ));
        }
        self.state.exposure_time = exposure_time;
        self.state.iterations = iterations;
        info!("starting exposure");
        self.send(Command::new("expose").arg(iterations)).await?;
        Ok(())
    }

    /// Pushes the current observation settings to the controllers: image
    /// root name (basename plus UTC timestamp), exposure time, then mode.
    /// The chain aborts on the first failing broadcast.
    ///
    /// The image root can never be empty: with no basename it is the bare
    /// `YYYYMMDD_HHMMSS` timestamp.
    pub async fn setup_observation(&mut self) -> Result<(), CameraError> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let image_root = if self.state.basename.is_empty() {
            timestamp
        } else {
            format!("{}_{}", self.state.basename, timestamp)
        };

        self.send(Command::new("basename").arg(&image_root)).await?;
        let exposure_time = self.state.exposure_time;
        self.send(Command::new("exptime").arg(exposure_time)).await?;
        let mode = self.state.mode.clone();
        self.send(Command::new("mode").arg(mode)).await?;
        Ok(())
    }

    /// Reads a parameter directly from controller configuration memory.
    pub async fn read_param(&mut self, name: &str) -> Result<String, CameraError> {
        self.send(Command::new("getp").arg(name)).await
    }

    /// Sets an arbitrary controller parameter.  No session state changes.
    pub async fn set_param(
        &mut self,
        name: &str,
        value: impl fmt::Display,
    ) -> Result<(), CameraError> {
        self.send(Command::new("setp").arg(name).arg(value)).await?;
        Ok(())
    }

    /// Loads an explicit ACF file and re-initializes the controllers under
    /// `mode`: load, power on, then the setup sequence.  Used by the
    /// one-shot macros.
    pub async fn load_and_init(&mut self, path: &Path, mode: &str) -> Result<(), CameraError> {
        self.state.mode = mode.to_string();
        info!("loading acf file {}", path.display());
        self.load(Some(path)).await?;
        info!("turning power on");
        self.send(Command::new("POWERON")).await?;
        self.state.power_on = true;
        self.setup_observation().await?;
        info!("camera initialized");
        Ok(())
    }

    /// One-shot exposure macro: optionally load an ACF (mode `RAW`, or
    /// `DEFAULT` when `read_cds` requests corrected readout), set type
    /// TEST, set the basename, and expose.  All iterations land in the
    /// same output file.
    pub async fn run(
        &mut self,
        acf: Option<&Path>,
        basename: &str,
        exposure_time: f64,
        iterations: u32,
        read_cds: bool,
    ) -> Result<(), CameraError> {
        if iterations == 0 {
            return Err(CameraError::InvalidArgument(
                "iterations must be > 0".to_string(),
            ));
        }
        let mode = if read_cds { "DEFAULT" } else { "RAW" };
        if let Some(path) = acf {
            self.load_and_init(path, mode).await?;
        }
        self.set_type("TEST").await?;
        self.set_basename(basename).await?;
        self.expose(exposure_time, iterations).await
    }
}
