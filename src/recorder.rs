//! Session recording and export
//!
//! Accumulates one metrics row per processed frame while a session is
//! active and serializes the sequence to CSV with a stable column order.
//! The recorder is stateless with respect to the other pipeline components
//! beyond receiving their outputs.

use crate::error::ComputeError;
use crate::types::MetricsSnapshot;
use crate::{PRODUCER_NAME, VORSIGHT_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Column order of the exported CSV
pub const EXPORT_COLUMNS: [&str; 12] = [
    "timestamp",
    "level",
    "gazeX",
    "gazeY",
    "headAngle",
    "headVel",
    "eyeVel",
    "vorGain",
    "latencyMs",
    "fixationRMS",
    "saccadeCount",
    "onTarget",
];

/// A finished export: filename plus CSV bytes
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    /// Suggested filename with an ISO-like UTC stamp, filesystem-safe
    pub filename: String,
    pub data: Vec<u8>,
}

/// In-memory ordered sequence of per-frame records
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    session_id: String,
    rows: Vec<MetricsSnapshot>,
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            rows: Vec::new(),
        }
    }

    /// Unique id of this recording instance
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one frame record
    pub fn record(&mut self, snapshot: MetricsSnapshot) {
        self.rows.push(snapshot);
    }

    /// Recorded rows in insertion order
    pub fn rows(&self) -> &[MetricsSnapshot] {
        &self.rows
    }

    /// Drop all rows, keeping the recorder usable for a new session
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Serialize all recorded rows to CSV
    ///
    /// Numeric fields are rounded to 2 decimal places; undefined values
    /// serialize as empty strings. Fails with [`ComputeError::ExportEmpty`]
    /// when nothing was recorded; no file should be produced.
    pub fn export(&self) -> Result<CsvExport, ComputeError> {
        if self.rows.is_empty() {
            return Err(ComputeError::ExportEmpty);
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format!(
            "# producer={} version={} session={}",
            PRODUCER_NAME, VORSIGHT_VERSION, self.session_id
        ));
        lines.push(EXPORT_COLUMNS.join(","));

        for row in &self.rows {
            lines.push(
                [
                    fmt_num(row.t),
                    fmt_opt_int(row.level.map(|l| l as f64)),
                    fmt_num(row.gaze_x),
                    fmt_num(row.gaze_y),
                    fmt_opt(row.head_angle),
                    fmt_num(row.head_vel),
                    fmt_num(row.eye_vel),
                    fmt_opt(row.vor_gain),
                    fmt_opt(row.latency_ms),
                    fmt_num(row.fixation_rms),
                    row.saccade_count.to_string(),
                    row.on_target.to_string(),
                ]
                .join(","),
            );
        }

        let level_tag = self
            .rows
            .iter()
            .find_map(|r| r.level)
            .map(|l| l.to_string())
            .unwrap_or_else(|| "0".to_string());

        Ok(CsvExport {
            filename: export_filename(&level_tag),
            data: (lines.join("\n") + "\n").into_bytes(),
        })
    }
}

/// Filename with an ISO-like UTC stamp, `:` replaced for filesystem safety
fn export_filename(level_tag: &str) -> String {
    let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
    format!("vor_session_level{level_tag}_{stamp}.csv")
}

fn fmt_num(value: f64) -> String {
    format!("{:.2}", value)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(fmt_num).unwrap_or_default()
}

fn fmt_opt_int(value: Option<f64>) -> String {
    value.map(|v| format!("{}", v as i64)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_snapshot(t: f64, level: Option<u8>) -> MetricsSnapshot {
        MetricsSnapshot {
            t,
            gaze_x: 512.345,
            gaze_y: 384.5,
            head_angle: Some(-3.567),
            head_vel: 12.0,
            eye_vel: 250.75,
            vor_gain: None,
            latency_ms: Some(48.2),
            fixation_rms: 4.249,
            saccade_count: 2,
            level,
            on_target: true,
        }
    }

    #[test]
    fn test_export_empty_is_rejected() {
        let recorder = SessionRecorder::new();
        assert!(matches!(
            recorder.export().unwrap_err(),
            ComputeError::ExportEmpty
        ));
    }

    #[test]
    fn test_export_column_order_and_rounding() {
        let mut recorder = SessionRecorder::new();
        recorder.record(make_snapshot(1234.567, Some(2)));

        let export = recorder.export().unwrap();
        let text = String::from_utf8(export.data).unwrap();
        let mut lines = text.lines();

        assert!(lines.next().unwrap().starts_with("# producer=vorsight"));
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,level,gazeX,gazeY,headAngle,headVel,eyeVel,vorGain,latencyMs,fixationRMS,saccadeCount,onTarget"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1234.57,2,512.35,384.50,-3.57,12.00,250.75,,48.20,4.25,2,true"
        );
    }

    #[test]
    fn test_undefined_fields_serialize_empty() {
        let mut recorder = SessionRecorder::new();
        let mut snapshot = make_snapshot(10.0, None);
        snapshot.head_angle = None;
        snapshot.latency_ms = None;
        recorder.record(snapshot);

        let export = recorder.export().unwrap();
        let text = String::from_utf8(export.data).unwrap();
        let row = text.lines().nth(2).unwrap();
        assert_eq!(row, "10.00,,512.35,384.50,,12.00,250.75,,,4.25,2,true");
    }

    #[test]
    fn test_filename_embeds_level_and_is_filesystem_safe() {
        let mut recorder = SessionRecorder::new();
        recorder.record(make_snapshot(1.0, Some(4)));

        let export = recorder.export().unwrap();
        assert!(export.filename.starts_with("vor_session_level4_"));
        assert!(export.filename.ends_with(".csv"));
        assert!(!export.filename.contains(':'));
    }

    #[test]
    fn test_round_trip_row_fidelity() {
        let mut recorder = SessionRecorder::new();
        for i in 0..25 {
            recorder.record(make_snapshot(i as f64 * 33.3, Some(1)));
        }

        let export = recorder.export().unwrap();
        let text = String::from_utf8(export.data).unwrap();

        // Skip the comment and header lines; every data row must parse back
        // with the full column count and the recorded values (mod rounding)
        let rows: Vec<&str> = text.lines().skip(2).collect();
        assert_eq!(rows.len(), recorder.len());

        for (row, original) in rows.iter().zip(recorder.rows()) {
            let fields: Vec<&str> = row.split(',').collect();
            assert_eq!(fields.len(), EXPORT_COLUMNS.len());
            let t: f64 = fields[0].parse().unwrap();
            assert!((t - original.t).abs() < 0.005);
            let gaze_x: f64 = fields[2].parse().unwrap();
            assert!((gaze_x - original.gaze_x).abs() < 0.005);
            assert_eq!(fields[11], "true");
        }
    }

    #[test]
    fn test_clear_keeps_recorder_usable() {
        let mut recorder = SessionRecorder::new();
        recorder.record(make_snapshot(1.0, Some(1)));
        recorder.clear();
        assert!(recorder.is_empty());
        assert!(recorder.export().is_err());

        recorder.record(make_snapshot(2.0, Some(1)));
        assert_eq!(recorder.len(), 1);
    }
}
