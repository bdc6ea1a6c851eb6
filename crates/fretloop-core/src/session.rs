use crate::diagnostics::{export_diagnostics, SessionSnapshot};
use crate::ipc::{ChartSource, Command, Event, SessionState, TrackSummary};
use crate::transport::LoopTransport;
use fretloop_domain_chart::{
    convert_smf_track_to_lane_chart, dummy_chart, parse_smf_bytes,
    resolve_open_string_midi_by_lane, ChartData, ChartImportError, LaneMapOptions,
    OpenStringTuning, ParsedSmf, TuningOverrides,
};
use fretloop_domain_eval::{
    chart_data_to_scoring_chart, lane_chart_to_scoring_chart, LoopScoringChartInput,
    LoopScoringEngine, ScoringConfig, ScoringConfigOverrides, ScoringError, ScoringEvent,
    ScoringInput, ScoringStatsSnapshot,
};
use fretloop_ports::pitch::PitchSample;
use fretloop_ports::storage::{clamp_latency_offset_ms, SettingsDto, StorageError, StoragePort};
use fretloop_ports::types::{Lane, TimeMs};
use std::collections::VecDeque;
use std::path::Path;

const RECENT_EVENTS_CAPACITY: usize = 256;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("chart import failed: {0}")]
    Import(#[from] ChartImportError),
    #[error("scoring error: {0}")]
    Scoring(#[from] ScoringError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One practice run: chart selection, transport, scoring and persisted settings.
pub struct PracticeSession {
    storage: Option<Box<dyn StoragePort>>,
    settings: SettingsDto,
    state: SessionState,
    transport: LoopTransport,
    engine: LoopScoringEngine,
    tuning: OpenStringTuning,
    chart_source: ChartSource,
    parsed_smf: Option<ParsedSmf>,
    events: VecDeque<Event>,
    recent_events: VecDeque<ScoringEvent>,
}

impl PracticeSession {
    pub fn new(storage: Option<Box<dyn StoragePort>>) -> Result<Self, SessionError> {
        let mut settings = match storage.as_ref().map(|storage| storage.load_settings()) {
            Some(Ok(settings)) => settings,
            Some(Err(err)) => {
                log::warn!("failed to load settings, using defaults: {err}");
                SettingsDto::default()
            }
            None => SettingsDto::default(),
        };
        settings.latency_offset_ms = clamp_latency_offset_ms(settings.latency_offset_ms);

        let tuning = resolve_open_string_midi_by_lane(&TuningOverrides::from(settings.tuning))
            .unwrap_or_else(|err| {
                log::warn!("stored tuning rejected, using defaults: {err}");
                OpenStringTuning::default()
            });

        let cfg = ScoringConfig::new(&ScoringConfigOverrides {
            latency_offset_ms: Some(settings.latency_offset_ms as f64),
            ..ScoringConfigOverrides::default()
        })?;
        let chart = chart_data_to_scoring_chart(&dummy_chart(), &tuning)?;
        let engine = LoopScoringEngine::new(&chart, cfg)?;
        let transport = LoopTransport::new(chart.loop_duration_ms);

        Ok(Self {
            storage,
            settings,
            state: SessionState::Ready,
            transport,
            engine,
            tuning,
            chart_source: ChartSource::Dummy,
            parsed_smf: None,
            events: VecDeque::new(),
            recent_events: VecDeque::with_capacity(RECENT_EVENTS_CAPACITY),
        })
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), SessionError> {
        match cmd {
            Command::LoadDummyChart => {
                self.load_chart_data(&dummy_chart())?;
            }
            Command::ImportSmf { bytes } => {
                self.import_smf(&bytes)?;
            }
            Command::SelectTrack { index } => {
                self.select_track(index)?;
            }
            Command::SetMaxFret { max_fret } => {
                self.settings.max_fret = max_fret;
                self.save_settings();
                self.emit_session_state();
            }
            Command::SetLatencyOffsetMs { ms } => {
                let ms = clamp_latency_offset_ms(ms);
                self.engine.set_latency_offset_ms(ms as f64)?;
                self.settings.latency_offset_ms = ms;
                self.save_settings();
                self.emit_session_state();
            }
            Command::SetMinConfidence { value } => {
                self.settings.min_confidence = if value.is_finite() {
                    value.clamp(0.0, 1.0)
                } else {
                    self.settings.min_confidence
                };
                self.save_settings();
                self.emit_session_state();
            }
            Command::StartPractice => {
                self.state = SessionState::Running;
                self.transport.play();
                self.emit_session_state();
            }
            Command::PausePractice => {
                if self.state != SessionState::Running {
                    return Ok(());
                }
                self.state = SessionState::Paused;
                self.transport.pause();
                self.emit_session_state();
            }
            Command::StopPractice => {
                self.state = SessionState::Ready;
                self.transport.stop();
                self.engine.reset();
                self.emit_session_state();
                self.emit_stats();
            }
            Command::Seek { display_ms } => {
                self.transport.seek(display_ms);
                self.engine.reset();
                // Notes behind the new playhead are skipped, not missed.
                let skipped = self.engine.advance(self.transport.absolute_ms())?;
                self.engine.reset_stats();
                log::debug!(
                    "seek to {} ms skipped {} note(s)",
                    self.transport.absolute_ms(),
                    skipped.len()
                );
                self.emit_stats();
            }
            Command::ResetStats => {
                self.engine.reset_stats();
                self.emit_stats();
            }
            Command::ExportDiagnostics { path } => {
                let chart = self.engine.chart();
                let snapshot = SessionSnapshot {
                    chart_source: &self.chart_source,
                    loop_duration_ms: chart.loop_duration_ms,
                    note_count: chart.notes.len(),
                    scoring_config: self.engine.config(),
                    stats: self.engine.stats(),
                };
                let recent: Vec<ScoringEvent> = self.recent_events.iter().cloned().collect();
                export_diagnostics(Path::new(&path), &self.settings, &snapshot, &recent)?;
            }
        }
        Ok(())
    }

    /// Pitch detector callback. Low-confidence or incomplete samples only let time pass.
    pub fn on_pitch_sample(
        &mut self,
        display_ms: TimeMs,
        sample: PitchSample,
        lane: Option<Lane>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Running {
            return Ok(());
        }
        let evaluated_at_ms = self.transport.observe(display_ms);

        let pitch_cents = if sample.confidence >= self.settings.min_confidence {
            sample.combined_cents()
        } else {
            log::trace!(
                "dropping pitch sample with confidence {:.2} (< {:.2})",
                sample.confidence,
                self.settings.min_confidence
            );
            None
        };

        let events = match pitch_cents {
            Some(pitch_cents) => self.engine.evaluate(ScoringInput {
                evaluated_at_ms,
                pitch_cents: Some(pitch_cents),
                lane,
            })?,
            None => self.engine.advance(evaluated_at_ms)?,
        };
        self.publish(events);
        Ok(())
    }

    /// Per-frame clock tick.
    pub fn tick(&mut self, display_ms: TimeMs) -> Result<(), SessionError> {
        if self.state != SessionState::Running {
            return Ok(());
        }
        let evaluated_at_ms = self.transport.observe(display_ms);
        let events = self.engine.advance(evaluated_at_ms)?;
        self.publish(events);
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &SettingsDto {
        &self.settings
    }

    pub fn stats(&self) -> ScoringStatsSnapshot {
        self.engine.stats()
    }

    pub fn scoring_config(&self) -> ScoringConfig {
        self.engine.config()
    }

    pub fn chart_source(&self) -> &ChartSource {
        &self.chart_source
    }

    pub fn engine(&self) -> &LoopScoringEngine {
        &self.engine
    }

    pub fn transport(&self) -> &LoopTransport {
        &self.transport
    }

    fn load_chart_data(&mut self, chart: &ChartData) -> Result<(), SessionError> {
        let input = chart_data_to_scoring_chart(chart, &self.tuning)?;
        self.install_chart(input, ChartSource::Dummy)
    }

    fn import_smf(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let parsed = parse_smf_bytes(bytes)?;
        let tracks = parsed
            .tracks
            .iter()
            .map(|track| TrackSummary {
                index: track.index,
                name: track.name.clone(),
                note_count: track.notes.len(),
            })
            .collect();
        self.events.push_back(Event::SmfTracksUpdated {
            bpm: parsed.bpm,
            tracks,
        });
        self.parsed_smf = Some(parsed);
        Ok(())
    }

    fn select_track(&mut self, index: i64) -> Result<(), SessionError> {
        let parsed = self.parsed_smf.as_ref().ok_or_else(|| {
            ChartImportError::TrackNotFound("no SMF has been imported".to_string())
        })?;
        let options = LaneMapOptions {
            open_string_midi_by_lane: TuningOverrides::from(self.settings.tuning),
            max_fret: self.settings.max_fret.map(f64::from),
        };
        let lane_chart = convert_smf_track_to_lane_chart(parsed, index, &options)?;
        let input = lane_chart_to_scoring_chart(&lane_chart, &self.tuning)?;
        self.install_chart(
            input,
            ChartSource::SmfTrack {
                index: lane_chart.track_index,
                name: lane_chart.track_name,
            },
        )
    }

    fn install_chart(
        &mut self,
        input: LoopScoringChartInput,
        source: ChartSource,
    ) -> Result<(), SessionError> {
        self.engine.set_chart(&input)?;
        self.transport.set_loop_duration_ms(input.loop_duration_ms);
        self.chart_source = source.clone();
        self.events.push_back(Event::ChartLoaded {
            source,
            loop_duration_ms: input.loop_duration_ms,
            note_count: input.notes.len(),
        });
        self.emit_stats();
        Ok(())
    }

    fn publish(&mut self, events: Vec<ScoringEvent>) {
        if events.is_empty() {
            return;
        }
        for event in events {
            if self.recent_events.len() == RECENT_EVENTS_CAPACITY {
                self.recent_events.pop_front();
            }
            self.recent_events.push_back(event.clone());
            self.events.push_back(Event::Scoring { event });
        }
        self.emit_stats();
    }

    fn emit_stats(&mut self) {
        self.events.push_back(Event::StatsUpdated {
            stats: self.engine.stats(),
        });
    }

    fn emit_session_state(&mut self) {
        self.events.push_back(Event::SessionStateUpdated {
            state: self.state,
            transport: self.transport.state(),
            settings: self.settings.clone(),
        });
    }

    fn save_settings(&self) {
        if let Some(storage) = self.storage.as_ref() {
            if let Err(err) = storage.save_settings(&self.settings) {
                log::warn!("failed to save settings: {err}");
            }
        }
    }
}
