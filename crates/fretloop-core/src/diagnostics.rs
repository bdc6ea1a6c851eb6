use crate::ipc::ChartSource;
use fretloop_domain_eval::{ScoringConfig, ScoringEvent, ScoringStatsSnapshot};
use fretloop_ports::storage::{SettingsDto, StorageError};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct AppVersion {
    name: String,
    version: String,
}

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
pub struct SessionSnapshot<'a> {
    pub chart_source: &'a ChartSource,
    pub loop_duration_ms: f64,
    pub note_count: usize,
    pub scoring_config: ScoringConfig,
    pub stats: ScoringStatsSnapshot,
}

#[derive(Serialize)]
struct RecentEvents<'a> {
    events: &'a [ScoringEvent],
}

pub fn export_diagnostics(
    dir: &Path,
    settings: &SettingsDto,
    snapshot: &SessionSnapshot<'_>,
    recent_events: &[ScoringEvent],
) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::Io(e.to_string()))?;

    let app_version = AppVersion {
        name: "Fretloop".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let platform = PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };

    write_json(&dir.join("app_version.json"), &app_version)?;
    write_json(&dir.join("platform.json"), &platform)?;
    write_json(&dir.join("settings.json"), settings)?;
    write_json(&dir.join("session_snapshot.json"), snapshot)?;
    write_json(
        &dir.join("recent_events.json"),
        &RecentEvents {
            events: recent_events,
        },
    )?;

    log::debug!("diagnostics written to {}", dir.display());
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
}
