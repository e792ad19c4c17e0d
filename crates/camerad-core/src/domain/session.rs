//! Session state for one logical camera session.
//!
//! One [`SessionState`] instance is created per session and lives until the
//! client exits.  It is **not** shared or locked: only the operation layer
//! mutates it, on the calling task, and only once the outcome of the
//! corresponding broadcast is known (or, for `expose`, just before
//! dispatch).  The controllers remain the source of truth; this struct is
//! the client's mirror of what it last successfully configured.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Image type recorded in the FITS headers of the next exposure.
///
/// The variant order matches [`ImageType::LABELS`], which follows the
/// controllers' own type table.  Only the label travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageType {
    Object,
    Bias,
    Dark,
    DomeFlat,
    TwilightFlat,
    Focus,
    Pointing,
    #[default]
    Test,
    Illumination,
    Fringe,
    Seeing,
    Other,
}

/// Error returned when an image-type label is not one of the known names.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown image type: {0}")]
pub struct ParseImageTypeError(pub String);

impl ImageType {
    /// All known labels, in controller code order.
    pub const LABELS: [&'static str; 12] = [
        "OBJECT",
        "BIAS",
        "DARK",
        "DOME_FLAT",
        "TWILIGHT_FLAT",
        "FOCUS",
        "POINTING",
        "TEST",
        "ILLUMINATION",
        "FRINGE",
        "SEEING",
        "OTHER",
    ];

    /// The wire label for this type (e.g. `"DOME_FLAT"`).
    pub fn label(self) -> &'static str {
        Self::LABELS[self as usize]
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ImageType {
    type Err = ParseImageTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OBJECT" => Ok(ImageType::Object),
            "BIAS" => Ok(ImageType::Bias),
            "DARK" => Ok(ImageType::Dark),
            "DOME_FLAT" => Ok(ImageType::DomeFlat),
            "TWILIGHT_FLAT" => Ok(ImageType::TwilightFlat),
            "FOCUS" => Ok(ImageType::Focus),
            "POINTING" => Ok(ImageType::Pointing),
            "TEST" => Ok(ImageType::Test),
            "ILLUMINATION" => Ok(ImageType::Illumination),
            "FRINGE" => Ok(ImageType::Fringe),
            "SEEING" => Ok(ImageType::Seeing),
            "OTHER" => Ok(ImageType::Other),
            _ => Err(ParseImageTypeError(s.to_string())),
        }
    }
}

/// Camera and exposure configuration for the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Readout mode; free-form, validated by the controllers.
    pub mode: String,
    /// Base name for the next image; must be non-empty once set.
    pub basename: String,
    /// Image type for the next exposure.
    pub image_type: ImageType,
    /// Exposure time in seconds; never negative.
    pub exposure_time: f64,
    /// Number of exposures taken per `expose`; always positive.
    pub iterations: u32,
    /// Whether controller power was last commanded on.
    pub power_on: bool,
    /// The ACF firmware file last loaded, if an explicit path was given.
    pub acf_file: Option<PathBuf>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: "DEFAULT".to_string(),
            basename: String::new(),
            image_type: ImageType::default(),
            exposure_time: 0.0,
            iterations: 1,
            power_on: false,
            acf_file: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every field to its session-start default, as done after a
    /// successful `open` sequence.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for SessionState {
    /// Human-readable settings report shown by the `status` subcommand.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  mode          = '{}'", self.mode)?;
        writeln!(f, "  basename      = '{}'", self.basename)?;
        writeln!(f, "  type          = '{}'", self.image_type)?;
        writeln!(f, "  exptime       = {}", self.exposure_time)?;
        writeln!(f, "  iterations    = {}", self.iterations)?;
        writeln!(f, "  power         = {}", if self.power_on { "ON" } else { "OFF" })?;
        match &self.acf_file {
            Some(path) => writeln!(f, "  acf           = '{}'", path.display()),
            None => writeln!(f, "  acf           = <default>"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_session_start() {
        let state = SessionState::new();
        assert_eq!(state.mode, "DEFAULT");
        assert_eq!(state.basename, "");
        assert_eq!(state.image_type, ImageType::Test);
        assert_eq!(state.exposure_time, 0.0);
        assert_eq!(state.iterations, 1);
        assert!(!state.power_on);
        assert!(state.acf_file.is_none());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut state = SessionState::new();
        state.mode = "RAW".to_string();
        state.basename = "ngc253".to_string();
        state.exposure_time = 12.5;
        state.power_on = true;
        state.reset();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_image_type_parses_every_label() {
        for label in ImageType::LABELS {
            let parsed: ImageType = label.parse().expect("known label");
            assert_eq!(parsed.label(), label);
        }
    }

    #[test]
    fn test_image_type_parse_is_case_insensitive() {
        assert_eq!("dome_flat".parse::<ImageType>(), Ok(ImageType::DomeFlat));
    }

    #[test]
    fn test_image_type_rejects_unknown_label() {
        let err = "SNAPSHOT".parse::<ImageType>().unwrap_err();
        assert_eq!(err, ParseImageTypeError("SNAPSHOT".to_string()));
    }
}
