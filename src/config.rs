//! Widget configuration parsed from environment variables.

use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;

use crate::consts::{FIT_TRANSITION_MS, MAX_SCALE, MIN_SCALE, ZOOM_STEP};
use crate::error::ErrorCode;
use crate::viewport::{ZoomLimits, ZoomLimitsError};

pub const DEFAULT_DOT_PROGRAM: &str = "dot";
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Errors produced while reading configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A value could not be parsed.
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    /// The zoom limits are inconsistent.
    #[error(transparent)]
    ZoomLimits(#[from] ZoomLimitsError),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "E_CONFIG_INVALID",
            Self::ZoomLimits(_) => "E_CONFIG_ZOOM_LIMITS",
        }
    }
}

/// What to do with the viewport after each successful render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterRender {
    /// Fit the drawing to the container.
    #[default]
    Fit,
    /// Return to the identity transform.
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub dot_program: PathBuf,
    pub after_render: AfterRender,
    pub limits: ZoomLimits,
    pub transition: Duration,
    pub render_timeout: Duration,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            dot_program: PathBuf::from(DEFAULT_DOT_PROGRAM),
            after_render: AfterRender::Fit,
            limits: ZoomLimits::default(),
            transition: Duration::from_millis(FIT_TRANSITION_MS),
            render_timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
        }
    }
}

impl WidgetConfig {
    /// Build typed widget config from environment variables.
    ///
    /// Optional:
    /// - `VIZPORT_DOT`: path to the Graphviz `dot` executable (default `dot`)
    /// - `VIZPORT_AFTER_RENDER`: `fit` (default) or `reset`
    /// - `VIZPORT_ZOOM_STEP`: default 0.1
    /// - `VIZPORT_MIN_SCALE`: default 0.1
    /// - `VIZPORT_MAX_SCALE`: default 10.0
    /// - `VIZPORT_TRANSITION_MS`: default 300
    /// - `VIZPORT_RENDER_TIMEOUT_SECS`: default 30
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unparseable values or inconsistent zoom limits.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(VarError::NotPresent) => None,
            // Surfaces as `ConfigError::Invalid` for every key but the program path.
            Err(VarError::NotUnicode(raw)) => Some(raw.to_string_lossy().into_owned()),
        })?;
        // Program paths need not be UTF-8.
        if let Some(program) = std::env::var_os("VIZPORT_DOT") {
            config.dot_program = PathBuf::from(program);
        }
        Ok(config)
    }

    /// Same as [`WidgetConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unparseable values or inconsistent zoom limits.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let dot_program = lookup("VIZPORT_DOT").map_or_else(|| PathBuf::from(DEFAULT_DOT_PROGRAM), PathBuf::from);
        let after_render = parse_after_render(lookup("VIZPORT_AFTER_RENDER").as_deref())?;

        let limits = ZoomLimits::new(
            parse_or(&lookup, "VIZPORT_MIN_SCALE", MIN_SCALE)?,
            parse_or(&lookup, "VIZPORT_MAX_SCALE", MAX_SCALE)?,
            parse_or(&lookup, "VIZPORT_ZOOM_STEP", ZOOM_STEP)?,
        )?;

        let transition = Duration::from_millis(parse_or(&lookup, "VIZPORT_TRANSITION_MS", FIT_TRANSITION_MS)?);
        let render_timeout =
            Duration::from_secs(parse_or(&lookup, "VIZPORT_RENDER_TIMEOUT_SECS", DEFAULT_RENDER_TIMEOUT_SECS)?);

        Ok(Self { dot_program, after_render, limits, transition, render_timeout })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_after_render(raw: Option<&str>) -> Result<AfterRender, ConfigError> {
    match raw.unwrap_or("fit") {
        "fit" => Ok(AfterRender::Fit),
        "reset" => Ok(AfterRender::Reset),
        other => Err(ConfigError::Invalid { key: "VIZPORT_AFTER_RENDER", value: other.to_owned() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
