use std::{fs, path::Path, time::Duration};

use dashboard_core::{ReconcilerOptions, SeedTemperatures};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub server_url: String,
    pub liveness_poll_seconds: u64,
    pub seed_temp_c: f64,
    pub seed_temp_f: f64,
    pub element_watts: f64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        let seeds = SeedTemperatures::default();
        Self {
            server_url: "http://127.0.0.1:8081".into(),
            liveness_poll_seconds: 5,
            seed_temp_c: seeds.celsius,
            seed_temp_f: seeds.fahrenheit,
            element_watts: ReconcilerOptions::default().element_watts,
        }
    }
}

impl DashboardSettings {
    pub fn reconciler_options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            seeds: SeedTemperatures {
                celsius: self.seed_temp_c,
                fahrenheit: self.seed_temp_f,
            },
            element_watts: self.element_watts,
        }
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_poll_seconds.max(1))
    }
}

/// Keys accepted in `dashboard.toml`. Everything is optional.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    liveness_poll_seconds: Option<u64>,
    seed_temp_c: Option<f64>,
    seed_temp_f: Option<f64>,
    element_watts: Option<f64>,
}

pub fn load_settings(path: &Path) -> DashboardSettings {
    let mut settings = DashboardSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable config file"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut DashboardSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.liveness_poll_seconds {
        settings.liveness_poll_seconds = v;
    }
    if let Some(v) = file_cfg.seed_temp_c {
        settings.seed_temp_c = v;
    }
    if let Some(v) = file_cfg.seed_temp_f {
        settings.seed_temp_f = v;
    }
    if let Some(v) = file_cfg.element_watts {
        settings.element_watts = v;
    }
}

fn apply_env(settings: &mut DashboardSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("KILN_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("APP__LIVENESS_POLL_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.liveness_poll_seconds = parsed;
        }
    }
    if let Some(v) = var("APP__SEED_TEMP_C") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.seed_temp_c = parsed;
        }
    }
    if let Some(v) = var("APP__SEED_TEMP_F") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.seed_temp_f = parsed;
        }
    }
    if let Some(v) = var("APP__ELEMENT_WATTS") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.element_watts = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
