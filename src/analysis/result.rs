//! Analysis result types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::features::beat_tracking::{
    MeterScores, TimeSignature, TimeSignatureEstimate, TimeSignatureReason,
};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Key mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Major mode
    Major,
    /// Minor mode
    Minor,
}

impl Mode {
    /// Lowercase mode name ("major" / "minor")
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Pitch class of the tonic (0 = C, ..., 11 = B)
    pub fn tonic(&self) -> u32 {
        match self {
            Key::Major(t) | Key::Minor(t) => t % 12,
        }
    }

    /// Mode of the key
    pub fn mode(&self) -> Mode {
        match self {
            Key::Major(_) => Mode::Major,
            Key::Minor(_) => Mode::Minor,
        }
    }

    /// Tonic note name without mode (e.g., "A", "F#")
    pub fn tonic_name(&self) -> &'static str {
        NOTE_NAMES[self.tonic() as usize]
    }

    /// Get key name in musical notation (e.g., "C", "Am", "F#", "D#m")
    ///
    /// # Example
    ///
    /// ```
    /// use trackprobe::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).name(), "C");
    /// assert_eq!(Key::Major(6).name(), "F#");
    /// assert_eq!(Key::Minor(9).name(), "Am");
    /// assert_eq!(Key::Minor(1).name(), "C#m");
    /// ```
    pub fn name(&self) -> String {
        match self {
            Key::Major(_) => self.tonic_name().to_string(),
            Key::Minor(_) => format!("{}m", self.tonic_name()),
        }
    }

    /// Tonic and mode spelled out (e.g., "C major", "A minor")
    pub fn long_name(&self) -> String {
        format!("{} {}", self.tonic_name(), self.mode())
    }

    /// Get key in Camelot wheel notation (e.g., "8B", "8A", "12A")
    ///
    /// Numbers follow the circle of fifths with C major at 8B. Minor keys share
    /// the number of their relative major and use the "A" ring.
    ///
    /// # Example
    ///
    /// ```
    /// use trackprobe::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).camelot(), "8B");  // C
    /// assert_eq!(Key::Major(7).camelot(), "9B");  // G
    /// assert_eq!(Key::Minor(9).camelot(), "8A");  // Am
    /// assert_eq!(Key::Minor(4).camelot(), "9A");  // Em
    /// ```
    pub fn camelot(&self) -> String {
        let wheel = |tonic: u32| (7 * tonic % 12 + 7) % 12 + 1;
        match self {
            Key::Major(_) => format!("{}B", wheel(self.tonic())),
            Key::Minor(_) => format!("{}A", wheel((self.tonic() + 3) % 12)),
        }
    }

    /// Parse Camelot notation back into a key
    ///
    /// # Returns
    ///
    /// `Some(Key)` if valid, `None` if invalid format
    ///
    /// # Example
    ///
    /// ```
    /// use trackprobe::analysis::result::Key;
    ///
    /// assert_eq!(Key::from_camelot("8B"), Some(Key::Major(0)));
    /// assert_eq!(Key::from_camelot("8A"), Some(Key::Minor(9)));
    /// assert_eq!(Key::from_camelot("13A"), None);
    /// ```
    pub fn from_camelot(notation: &str) -> Option<Self> {
        let notation = notation.trim();
        let suffix = notation.chars().last()?;
        let num_str = &notation[..notation.len() - suffix.len_utf8()];
        let num: u32 = num_str.parse().ok()?;
        if !(1..=12).contains(&num) {
            return None;
        }

        // Inverse of the wheel: 7 is its own inverse modulo 12
        let major_tonic = (7 * ((num + 12 - 8) % 12)) % 12;
        match suffix {
            'B' | 'b' => Some(Key::Major(major_tonic)),
            'A' | 'a' => Some(Key::Minor((major_tonic + 9) % 12)),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Analysis metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Number of onset envelope frames
    pub onset_frames: usize,

    /// Multiplier chosen by octave correction
    pub octave_multiplier: f32,
}

/// Complete analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Octave-corrected tempo, rounded to whole BPM
    pub bpm: u32,

    /// Tempo before octave correction
    pub raw_bpm: f32,

    /// BPM confidence (0.0-1.0)
    pub bpm_confidence: f32,

    /// Detected key
    pub key: Key,

    /// Key confidence (0.0-1.0)
    pub key_confidence: f32,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

/// Confidence pair nested in track reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportConfidence {
    /// BPM confidence
    pub bpm: f32,
    /// Key confidence
    pub key: f32,
}

/// Successful track analysis as printed by `analyze_audio`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    /// Whole BPM
    pub bpm: u32,
    /// BPM confidence
    pub bpm_confidence: f32,
    /// Tonic note name
    pub key: String,
    /// "major" or "minor"
    pub mode: Mode,
    /// Camelot notation
    pub camelot: String,
    /// Tempo before octave correction
    pub raw_bpm: f32,
    /// Nested confidences
    pub confidence: ReportConfidence,
}

/// Failed track analysis; every result field is null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFailure {
    /// Error message
    pub error: String,
    /// Always null
    pub bpm: Option<u32>,
    /// Always null
    pub key: Option<String>,
    /// Always null
    pub mode: Option<Mode>,
}

/// JSON report for one analysed track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackReport {
    /// Analysis succeeded
    Success(TrackSummary),
    /// Analysis failed
    Failure(TrackFailure),
}

impl TrackReport {
    /// Failure report with the given message
    pub fn failure(error: impl Into<String>) -> Self {
        TrackReport::Failure(TrackFailure {
            error: error.into(),
            bpm: None,
            key: None,
            mode: None,
        })
    }

    /// Whether the report carries an error
    pub fn is_error(&self) -> bool {
        matches!(self, TrackReport::Failure(_))
    }
}

impl From<&AnalysisResult> for TrackReport {
    fn from(result: &AnalysisResult) -> Self {
        TrackReport::Success(TrackSummary {
            bpm: result.bpm,
            bpm_confidence: result.bpm_confidence,
            key: result.key.tonic_name().to_string(),
            mode: result.key.mode(),
            camelot: result.key.camelot(),
            raw_bpm: result.raw_bpm,
            confidence: ReportConfidence {
                bpm: result.bpm_confidence,
                key: result.key_confidence,
            },
        })
    }
}

/// A report tagged with the file it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport<T> {
    /// File name or path
    pub file: String,
    /// The report fields, flattened alongside `file`
    #[serde(flatten)]
    pub report: T,
}

/// Successful time signature analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignatureSummary {
    /// File name
    pub file: String,
    /// Detected time signature ("4/4", "3/4", "6/8")
    pub time_signature: TimeSignature,
    /// Confidence (0.0-1.0)
    pub confidence: f32,
    /// Global tempo
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bpm: Option<f32>,
    /// Accent scores per meter
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scores: Option<MeterScores>,
    /// Why the meter was defaulted
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<TimeSignatureReason>,
}

/// Failed time signature analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSignatureFailure {
    /// File name
    pub file: String,
    /// Error message (e.g., "timeout_60s")
    pub error: String,
}

/// JSON report for one file of the time signature batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSignatureReport {
    /// Analysis succeeded
    Success(TimeSignatureSummary),
    /// Analysis failed
    Failure(TimeSignatureFailure),
}

impl TimeSignatureReport {
    /// Report built from an estimate
    pub fn from_estimate(file: impl Into<String>, estimate: &TimeSignatureEstimate) -> Self {
        TimeSignatureReport::Success(TimeSignatureSummary {
            file: file.into(),
            time_signature: estimate.time_signature,
            confidence: estimate.confidence,
            bpm: estimate.bpm,
            scores: estimate.scores,
            reason: estimate.reason,
        })
    }

    /// Failure report with the given message
    pub fn failure(file: impl Into<String>, error: impl Into<String>) -> Self {
        TimeSignatureReport::Failure(TimeSignatureFailure {
            file: file.into(),
            error: error.into(),
        })
    }

    /// Whether the report carries an error
    pub fn is_error(&self) -> bool {
        matches!(self, TimeSignatureReport::Failure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name() {
        assert_eq!(Key::Major(0).name(), "C");
        assert_eq!(Key::Major(6).name(), "F#");
        assert_eq!(Key::Minor(9).name(), "Am");
        assert_eq!(Key::Minor(11).name(), "Bm");
        assert_eq!(Key::Minor(9).tonic_name(), "A");
        assert_eq!(Key::Minor(9).long_name(), "A minor");
        assert_eq!(Key::Major(1).to_string(), "C#");
    }

    #[test]
    fn test_camelot_wheel() {
        // Majors around the wheel: C=8B, G=9B, D=10B, A=11B, E=12B, B=1B, F#=2B,
        // C#=3B, G#=4B, D#=5B, A#=6B, F=7B
        let majors = [
            (0, "8B"),
            (7, "9B"),
            (2, "10B"),
            (9, "11B"),
            (4, "12B"),
            (11, "1B"),
            (6, "2B"),
            (1, "3B"),
            (8, "4B"),
            (3, "5B"),
            (10, "6B"),
            (5, "7B"),
        ];
        for (tonic, code) in majors {
            assert_eq!(Key::Major(tonic).camelot(), code, "major {}", tonic);
        }

        let minors = [
            (9, "8A"),
            (4, "9A"),
            (11, "10A"),
            (6, "11A"),
            (1, "12A"),
            (8, "1A"),
            (3, "2A"),
            (10, "3A"),
            (5, "4A"),
            (0, "5A"),
            (7, "6A"),
            (2, "7A"),
        ];
        for (tonic, code) in minors {
            assert_eq!(Key::Minor(tonic).camelot(), code, "minor {}", tonic);
        }
    }

    #[test]
    fn test_from_camelot() {
        assert_eq!(Key::from_camelot("8B"), Some(Key::Major(0)));
        assert_eq!(Key::from_camelot("1B"), Some(Key::Major(11)));
        assert_eq!(Key::from_camelot("5A"), Some(Key::Minor(0)));
        assert_eq!(Key::from_camelot("12A"), Some(Key::Minor(1)));
        assert_eq!(Key::from_camelot("0A"), None);
        assert_eq!(Key::from_camelot("13B"), None);
        assert_eq!(Key::from_camelot("8C"), None);
        assert_eq!(Key::from_camelot(""), None);
    }

    #[test]
    fn test_camelot_roundtrip() {
        for i in 0..12 {
            for key in [Key::Major(i), Key::Minor(i)] {
                assert_eq!(Key::from_camelot(&key.camelot()), Some(key));
            }
        }
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            bpm: 128,
            raw_bpm: 126.0,
            bpm_confidence: 0.71,
            key: Key::Minor(9),
            key_confidence: 0.83,
            metadata: AnalysisMetadata {
                duration_seconds: 30.0,
                sample_rate: 22050,
                processing_time_ms: 12.0,
                onset_frames: 1292,
                octave_multiplier: 1.0,
            },
        }
    }

    #[test]
    fn test_track_report_json() {
        let report = TrackReport::from(&sample_result());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["bpm"], 128);
        assert_eq!(json["key"], "A");
        assert_eq!(json["mode"], "minor");
        assert_eq!(json["camelot"], "8A");
        assert_eq!(json["rawBpm"], 126.0);
        assert!((json["bpmConfidence"].as_f64().unwrap() - 0.71).abs() < 1e-6);
        assert!((json["confidence"]["key"].as_f64().unwrap() - 0.83).abs() < 1e-6);
    }

    #[test]
    fn test_track_failure_json() {
        let json = serde_json::to_string(&TrackReport::failure("boom")).unwrap();
        assert_eq!(json, r#"{"error":"boom","bpm":null,"key":null,"mode":null}"#);
    }

    #[test]
    fn test_file_report_flattens() {
        let tagged = FileReport {
            file: "a.mp3".to_string(),
            report: TrackReport::failure("timeout_60s"),
        };
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json["file"], "a.mp3");
        assert_eq!(json["error"], "timeout_60s");
    }

    #[test]
    fn test_time_signature_report_json() {
        let estimate = TimeSignatureEstimate {
            time_signature: TimeSignature::FourFour,
            confidence: 0.5,
            bpm: Some(123.0),
            scores: Some(MeterScores {
                four_four: 1.0,
                three_four: 0.5,
                six_eight: 0.0,
            }),
            reason: Some(TimeSignatureReason::Ambiguous),
        };
        let report = TimeSignatureReport::from_estimate("x.mp3", &estimate);
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["file"], "x.mp3");
        assert_eq!(json["timeSignature"], "4/4");
        assert_eq!(json["scores"]["3/4"], 0.5);
        assert_eq!(json["reason"], "ambiguous");

        let bare = TimeSignatureEstimate {
            bpm: None,
            scores: None,
            reason: Some(TimeSignatureReason::InsufficientBeats),
            ..estimate
        };
        let json = serde_json::to_value(TimeSignatureReport::from_estimate("y.wav", &bare))
            .unwrap();
        assert!(json.get("bpm").is_none());
        assert!(json.get("scores").is_none());
        assert_eq!(json["reason"], "insufficient_beats");

        let failure =
            serde_json::to_string(&TimeSignatureReport::failure("z.flac", "timeout_60s")).unwrap();
        assert_eq!(failure, r#"{"file":"z.flac","error":"timeout_60s"}"#);
    }
}
