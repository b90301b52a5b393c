//! Integration tests for the analysis pipeline, batch tools and library
//!
//! Fixtures are synthesised into temporary WAV files so the decoder runs on
//! every test.

use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use trackprobe::batch::{find_audio_files, BatchRunner, Checkpoint, ScanOptions};
use trackprobe::features::beat_tracking::TimeSignatureReason;
use trackprobe::library::Library;
use trackprobe::{
    analyze_file, analyze_time_signature_file, AnalysisConfig, Key, TimeSignature,
    TimeSignatureReport, TrackReport,
};

const SR: u32 = 22050;

/// 123.05 BPM at 22050 Hz (exactly 21 onset frames)
const BEAT_PERIOD: usize = 10752;

const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

fn write_wav(path: &Path, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SR,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

/// Decaying white-noise bursts, one per beat, with per-beat gains
fn burst_train(gains: &[f32], n_beats: usize, lead_in: usize) -> Vec<f32> {
    let mut samples = vec![0.0f32; lead_in + BEAT_PERIOD * n_beats];
    let mut state = 12345u32;
    for beat in 0..n_beats {
        let start = lead_in + beat * BEAT_PERIOD;
        let gain = gains[beat % gains.len()];
        for i in 0..(SR as usize / 10) {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
            samples[start + i] = noise * (-(i as f32) / 400.0).exp() * gain;
        }
    }
    samples
}

/// Twelve sustained sines (C5..B5) weighted by a key profile rotated to `tonic`
fn key_profile_chord(profile: &[f32; 12], tonic: usize, seconds: f32) -> Vec<f32> {
    let total: f32 = profile.iter().sum();
    let gains: Vec<f32> = (0..12)
        .map(|pc| profile[(pc + 12 - tonic) % 12] / total * 0.9)
        .collect();

    (0..(SR as f32 * seconds) as usize)
        .map(|i| {
            let t = i as f32 / SR as f32;
            (0..12)
                .map(|pc| {
                    let freq = 440.0 * 2f32.powf((72 + pc as i32 - 69) as f32 / 12.0);
                    gains[pc] * (2.0 * PI * freq * t + pc as f32 * 0.7).sin()
                })
                .sum::<f32>()
        })
        .collect()
}

fn fixture(dir: &TempDir, name: &str, samples: &[f32]) -> PathBuf {
    let path = dir.path().join(name);
    write_wav(&path, samples);
    path
}

#[test]
fn test_bpm_of_burst_train() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "beats.wav", &burst_train(&[0.8], 28, 0));

    let result = analyze_file(&path, &AnalysisConfig::default()).expect("Analysis should succeed");

    assert!(
        (120..=126).contains(&result.bpm),
        "BPM should be close to 123, got {}",
        result.bpm
    );
    assert!((result.raw_bpm - 122.0).abs() < 4.0, "raw {}", result.raw_bpm);
    assert_eq!(result.metadata.octave_multiplier, 1.0);
    assert!(result.bpm_confidence > 0.0 && result.bpm_confidence <= 1.0);
    assert_eq!(result.metadata.sample_rate, SR);
    assert!((result.metadata.duration_seconds - 13.65).abs() < 0.05);
}

#[test]
fn test_key_c_major() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "c_major.wav", &key_profile_chord(&MAJOR_PROFILE, 0, 3.0));

    let result = analyze_file(&path, &AnalysisConfig::default()).unwrap();
    assert_eq!(result.key, Key::Major(0), "got {}", result.key.name());
    assert_eq!(result.key.camelot(), "8B");
    assert!(result.key_confidence > 0.8, "confidence {}", result.key_confidence);
}

#[test]
fn test_key_a_minor_report() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "a_minor.wav", &key_profile_chord(&MINOR_PROFILE, 9, 3.0));

    let result = analyze_file(&path, &AnalysisConfig::default()).unwrap();
    assert_eq!(result.key, Key::Minor(9), "got {}", result.key.name());

    let json = serde_json::to_value(TrackReport::from(&result)).unwrap();
    assert_eq!(json["key"], "A");
    assert_eq!(json["mode"], "minor");
    assert_eq!(json["camelot"], "8A");
    assert_eq!(json["bpmConfidence"], json["confidence"]["bpm"]);
}

#[test]
fn test_time_signature_four_four() {
    let dir = TempDir::new().unwrap();
    let samples = burst_train(&[0.8, 0.32, 0.32, 0.32], 40, SR as usize);
    let path = fixture(&dir, "four.wav", &samples);

    let estimate = analyze_time_signature_file(&path, &AnalysisConfig::default()).unwrap();
    assert_eq!(estimate.time_signature, TimeSignature::FourFour);
    assert!(estimate.reason.is_none());
    assert!(estimate.confidence > 0.9, "confidence {}", estimate.confidence);

    let scores = estimate.scores.unwrap();
    assert!(scores.four_four > scores.three_four * 1.3);
    let bpm = estimate.bpm.unwrap();
    assert!((bpm - 123.05).abs() < 1.0, "tempo {}", bpm);
}

#[test]
fn test_time_signature_short_clip() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "short.wav", &burst_train(&[0.8], 3, SR as usize / 2));

    let estimate = analyze_time_signature_file(&path, &AnalysisConfig::default()).unwrap();
    assert_eq!(estimate.time_signature, TimeSignature::FourFour);
    assert_eq!(estimate.confidence, 0.3);
    assert_eq!(estimate.reason, Some(TimeSignatureReason::InsufficientBeats));
}

#[test]
fn test_silent_file_reports_error() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "silence.wav", &vec![0.0; SR as usize * 2]);

    let report = match analyze_file(&path, &AnalysisConfig::default()) {
        Ok(result) => TrackReport::from(&result),
        Err(e) => TrackReport::failure(e.to_string()),
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["error"], "Invalid input: Audio is entirely silent");
    assert!(json["bpm"].is_null());
    assert!(json["key"].is_null());
    assert!(json["mode"].is_null());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = analyze_file(&dir.path().join("gone.wav"), &AnalysisConfig::default());
    assert!(matches!(result, Err(trackprobe::AnalysisError::Io(_))));
}

#[test]
fn test_folder_batch_with_checkpoint() {
    let dir = TempDir::new().unwrap();
    let music = dir.path().join("music");
    fs::create_dir_all(music.join("album")).unwrap();
    write_wav(
        &music.join("album/01 four.wav"),
        &burst_train(&[0.8, 0.32, 0.32, 0.32], 40, SR as usize),
    );
    write_wav(&music.join("02 short.wav"), &burst_train(&[0.8], 3, 0));
    fs::write(music.join("broken.mp3"), b"definitely not audio").unwrap();
    fs::write(music.join("cover.jpg"), b"jpeg").unwrap();

    let files = find_audio_files(&music, &ScanOptions::default()).unwrap();
    assert_eq!(files.len(), 3);

    let checkpoint = dir.path().join("time_sig_progress.json");
    let config = AnalysisConfig::default();
    let reports = BatchRunner::new()
        .jobs(2)
        .checkpoint(Checkpoint::new(&checkpoint).every(2))
        .run(
            &files,
            move |path: &Path| {
                let file = path.file_name().unwrap().to_string_lossy().into_owned();
                match analyze_time_signature_file(path, &config) {
                    Ok(estimate) => TimeSignatureReport::from_estimate(file, &estimate),
                    Err(e) => TimeSignatureReport::failure(file, e.to_string()),
                }
            },
            |_| {},
        )
        .unwrap();

    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json[0]["file"], "02 short.wav");
    assert_eq!(json[0]["reason"], "insufficient_beats");
    assert_eq!(json[1]["file"], "01 four.wav");
    assert_eq!(json[1]["timeSignature"], "4/4");
    assert_eq!(json[2]["file"], "broken.mp3");
    assert!(json[2]["error"].as_str().unwrap().starts_with("Decoding error"));

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&checkpoint).unwrap()).unwrap();
    assert_eq!(saved["analyzed"], 2);
}

#[test]
fn test_library_round_trip() {
    let dir = TempDir::new().unwrap();
    let track = fixture(&dir, "c_major.wav", &key_profile_chord(&MAJOR_PROFILE, 0, 3.0));
    let track_path = track.to_string_lossy().into_owned();
    let db = dir.path().join("library.db");

    {
        let mut library = Library::open(&db).unwrap();
        let migration = library.ensure_schema().unwrap();
        assert!(migration.created_tables.contains(&"tracks".to_string()));
        library
            .connection()
            .execute(
                "INSERT INTO tracks (title, artist, filePath) VALUES ('Chord', 'Beatles', ?1)",
                [&track_path],
            )
            .unwrap();

        let pending = library.pending_tracks(None).unwrap();
        assert_eq!(pending.len(), 1);
        let result = analyze_file(Path::new(&pending[0].file_path), &AnalysisConfig::default())
            .unwrap();
        library.record_analysis(&pending[0].file_path, &result).unwrap();
    }

    let mut library = Library::open(&db).unwrap();
    assert!(library.ensure_schema().unwrap().added_columns.is_empty());
    assert!(library.pending_tracks(None).unwrap().is_empty());

    let (key, camelot, analyzed): (String, String, i64) = library
        .connection()
        .query_row(
            "SELECT key, camelotKey, analyzed FROM tracks WHERE filePath = ?1",
            [&track_path],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(key, "C major");
    assert_eq!(camelot, "8B");
    assert_eq!(analyzed, 1);

    assert_eq!(library.apply_band_exceptions().unwrap(), 1);
    let report = library.inspect().unwrap();
    assert_eq!(report.analyzed, 1);
    assert_eq!(report.missing_files, 0);
}
