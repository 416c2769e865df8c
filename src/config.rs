use crate::capture::{BusyPolicy, CaptureConfig, ErrorFallback};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

/// Capture policy values as they appear in the config file (durations in
/// milliseconds).
#[derive(Debug, Deserialize)]
pub struct CaptureSettings {
    pub silence_timeout_ms: u64,
    pub stop_grace_ms: u64,
    pub locale: String,
    pub enable_partials: bool,
    #[serde(default = "default_busy_policy")]
    pub busy_policy: BusyPolicy,
    #[serde(default = "default_error_fallback")]
    pub error_fallback: ErrorFallback,
}

fn default_busy_policy() -> BusyPolicy {
    BusyPolicy::Supersede
}

fn default_error_fallback() -> ErrorFallback {
    ErrorFallback::SurfaceError
}

impl CaptureSettings {
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            silence_timeout: Duration::from_millis(self.silence_timeout_ms),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
            locale: self.locale.clone(),
            enable_partials: self.enable_partials,
            busy_policy: self.busy_policy,
            error_fallback: self.error_fallback,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
