// src/recorder.rs - Per-frame decision log and session report export
use crate::motion::GestureRegime;
use crate::pipeline::FrameDiagnostics;
use crate::stabilizer::TranscriptEvent;
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct FrameRecord {
    frame: usize,
    timestamp_ms: u64,
    hands_present: usize,
    malformed: bool,
    regime: String,
    smoothed_movement: f32,
    change_average: Option<f32>,
    significant_changes: Option<usize>,
    major_change: bool,
    buffered_frames: usize,
    stability_count: usize,
    dispatched: bool,
    boundary: bool,
}

#[derive(Debug, Serialize)]
struct TranscriptRecord {
    index: usize,
    kind: &'static str,
    symbol: Option<String>,
}

pub struct SessionRecorder {
    output_dir: PathBuf,
    session_name: String,
    session_id: Uuid,
    frames: Vec<FrameDiagnostics>,
    events: Vec<TranscriptEvent>,
    final_transcript: Option<String>,
}

impl SessionRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            session_id: Uuid::new_v4(),
            frames: Vec::new(),
            events: Vec::new(),
            final_transcript: None,
        }
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn add_frame(&mut self, diagnostics: FrameDiagnostics) {
        self.frames.push(diagnostics);
    }

    pub fn add_event(&mut self, event: TranscriptEvent) {
        self.events.push(event);
    }

    pub fn set_final_transcript(&mut self, transcript: impl Into<String>) {
        self.final_transcript = Some(transcript.into());
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Write `frames.csv` and `transcript.csv`; returns the session directory.
    pub fn export_csv(&self) -> Result<PathBuf> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let file = File::create(dir.join("frames.csv"))?;
        let mut writer = Writer::from_writer(file);
        for (i, frame) in self.frames.iter().enumerate() {
            writer.serialize(Self::frame_record(i, frame))?;
        }
        writer.flush()?;

        let file = File::create(dir.join("transcript.csv"))?;
        let mut writer = Writer::from_writer(file);
        for (index, event) in self.events.iter().enumerate() {
            let (kind, symbol) = match event {
                TranscriptEvent::Symbol(symbol) => ("symbol", Some(symbol.clone())),
                TranscriptEvent::Boundary => ("boundary", None),
                TranscriptEvent::SessionReset => ("reset", None),
            };
            writer.serialize(TranscriptRecord { index, kind, symbol })?;
        }
        writer.flush()?;

        Ok(dir)
    }

    fn frame_record(frame: usize, d: &FrameDiagnostics) -> FrameRecord {
        FrameRecord {
            frame,
            timestamp_ms: d.timestamp_ms,
            hands_present: d.hands_present,
            malformed: d.malformed,
            regime: format!("{:?}", d.regime),
            smoothed_movement: d.smoothed_movement,
            change_average: d.change_average,
            significant_changes: d.significant_changes,
            major_change: d.major_change,
            buffered_frames: d.buffered_frames,
            stability_count: d.stability_count,
            dispatched: d.dispatched,
            boundary: d.boundary,
        }
    }

    pub fn generate_report(&self) -> Result<PathBuf> {
        let report_path = self.session_dir().join("report.html");

        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&report_path, self.create_html_report())?;
        Ok(report_path)
    }

    fn create_html_report(&self) -> String {
        let total_frames = self.frames.len();
        let present = self.frames.iter().filter(|f| f.hands_present > 0).count();
        let dynamic = self
            .frames
            .iter()
            .filter(|f| f.hands_present > 0 && f.regime == GestureRegime::Dynamic)
            .count();
        let dispatches = self.frames.iter().filter(|f| f.dispatched).count();
        let major_changes = self.frames.iter().filter(|f| f.major_change).count();
        let boundaries = self
            .events
            .iter()
            .filter(|e| matches!(e, TranscriptEvent::Boundary))
            .count();
        let commits = self
            .events
            .iter()
            .filter(|e| matches!(e, TranscriptEvent::Symbol(_)))
            .count();

        let percent = |n: usize| {
            if total_frames == 0 {
                0.0
            } else {
                n as f64 / total_frames as f64 * 100.0
            }
        };
        let transcript = self.final_transcript.as_deref().unwrap_or("");

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Recognition Report - {name}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 40px; background: #f5f5f5; }}
        .stats {{ background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        .stat-item {{ margin: 10px 0; }}
        .stat-label {{ font-weight: bold; color: #666; }}
        .stat-value {{ color: #4682EA; font-size: 1.2em; }}
        pre {{ background: #eee; padding: 12px; }}
    </style>
</head>
<body>
    <h1>Sign Recognition Session Report</h1>
    <div class="stats">
        <h2>Session: {name}</h2>
        <div class="stat-item"><span class="stat-label">Session ID:</span> <span class="stat-value">{id}</span></div>
        <div class="stat-item"><span class="stat-label">Total Frames:</span> <span class="stat-value">{total_frames}</span></div>
        <div class="stat-item"><span class="stat-label">Hands Visible:</span> <span class="stat-value">{present:.1}%</span></div>
        <div class="stat-item"><span class="stat-label">Dynamic Regime:</span> <span class="stat-value">{dynamic:.1}%</span></div>
        <div class="stat-item"><span class="stat-label">Classifier Dispatches:</span> <span class="stat-value">{dispatches}</span></div>
        <div class="stat-item"><span class="stat-label">Major Gesture Changes:</span> <span class="stat-value">{major_changes}</span></div>
        <div class="stat-item"><span class="stat-label">Committed Symbols:</span> <span class="stat-value">{commits}</span></div>
        <div class="stat-item"><span class="stat-label">Word Boundaries:</span> <span class="stat-value">{boundaries}</span></div>
        <h3>Transcript</h3>
        <pre>{transcript}</pre>
    </div>
</body>
</html>
"#,
            name = self.session_name,
            id = self.session_id,
            total_frames = total_frames,
            present = percent(present),
            dynamic = percent(dynamic),
            dispatches = dispatches,
            major_changes = major_changes,
            commits = commits,
            boundaries = boundaries,
            transcript = escape_html(transcript),
        )
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
