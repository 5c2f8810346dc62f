//! End-to-end checks across analyzer, playback and scenes using the offline backend.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use spectrascape::audio::{AudioSource, FrequencySnapshot, OfflineBackend, SessionId, SpectralAnalyzer};
use spectrascape::params::{AnalyzerConfig, MorphLayerParams, PlaybackParams, VisualizerConfig};
use spectrascape::playback::{HttpClient, PlaybackController, Track};
use spectrascape::scenes::{MorphScene, Scene, SceneFrame};

const RATE: u32 = 8000;
const TICK: Duration = Duration::from_millis(16);

fn write_wav(path: &Path, seconds: f32, amplitude: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..(seconds * RATE as f32) as usize {
        let phase = i as f32 * 2.0 * std::f32::consts::PI * 440.0 / RATE as f32;
        writer
            .write_sample((phase.sin() * amplitude * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

fn analyzer() -> SpectralAnalyzer {
    SpectralAnalyzer::new(AnalyzerConfig::default(), Box::new(OfflineBackend::new(RATE))).unwrap()
}

#[test]
fn hundred_attach_cycles_keep_one_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, 0.5, 0.5);
    let source = AudioSource::file(&path);

    let mut a = analyzer();
    let mut last = SessionId(0);
    for _ in 0..100 {
        let info = a.attach(&source).unwrap();
        assert!(info.id.0 > last.0, "session ids must increase");
        last = info.id;
        assert!(a.live_contexts() <= 1);
        a.advance(TICK);
        assert_eq!(a.current_snapshot().map(|s| s.session()), Some(info.id));
        a.detach();
        assert_eq!(a.live_contexts(), 0);
    }
}

#[test]
fn silent_clip_drives_morph_to_base_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("silence.wav");
    write_wav(&path, 2.0, 0.0);

    let mut a = analyzer();
    a.attach(&AudioSource::file(&path)).unwrap();
    for _ in 0..30 {
        a.advance(TICK);
    }
    let snapshot = a.current_snapshot().unwrap().clone();
    assert_eq!(snapshot.len(), 64);
    assert!(snapshot.bins().iter().all(|&b| b == 0));

    // an analyzed silent frame looks exactly like a frame fed all-zero bins
    let params = MorphLayerParams {
        particle_count: 300,
        ..MorphLayerParams::default()
    };
    let mut from_audio = MorphScene::new(params.clone());
    let mut from_zeros = MorphScene::new(params);
    let mut frame_a = SceneFrame::default();
    let mut frame_b = SceneFrame::default();
    from_audio.update(&snapshot, 0.5, &mut frame_a);
    from_zeros.update(&FrequencySnapshot::new(SessionId(99), 64), 0.5, &mut frame_b);
    assert_eq!(frame_a.points[0].points, frame_b.points[0].points);
}

#[test]
fn track_switch_never_reports_old_session() {
    let dir = tempfile::tempdir().unwrap();
    let loud = dir.path().join("loud.wav");
    let quiet = dir.path().join("quiet.wav");
    write_wav(&loud, 1.0, 0.8);
    write_wav(&quiet, 1.0, 0.0);

    let mut a = analyzer();
    let first = a.attach(&AudioSource::file(&loud)).unwrap().id;
    for _ in 0..10 {
        a.advance(TICK);
    }
    assert!(a.current_snapshot().unwrap().bins().iter().any(|&b| b > 0));

    let second = a.attach(&AudioSource::file(&quiet)).unwrap().id;
    assert_ne!(first, second);
    // the first snapshot after the switch already belongs to the new session
    let snapshot = a.current_snapshot().unwrap();
    assert_eq!(snapshot.session(), second);
    assert!(snapshot.bins().iter().all(|&b| b == 0));

    a.detach();
    assert!(a.current_snapshot().is_none());
}

#[test]
fn controller_plays_local_file_then_external_video() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.wav");
    write_wav(&path, 1.0, 0.6);

    let config = VisualizerConfig::default();
    let fetcher = Arc::new(HttpClient::new(&PlaybackParams::default()).unwrap());
    let mut c = PlaybackController::new(&config, Box::new(OfflineBackend::new(RATE)), fetcher).unwrap();

    c.enqueue(Track::local(&path));
    let start = Instant::now();
    while c.is_loading() {
        c.poll();
        assert!(start.elapsed() < Duration::from_secs(10), "load timed out");
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(c.is_playing());
    assert_eq!(c.current_source().map(|t| t.name()), Some("song".to_string()));

    let mut time_s = 0.0;
    let mut heard = false;
    for _ in 0..20 {
        time_s += TICK.as_secs_f64();
        let snapshot = c.frame_snapshot(time_s, TICK).unwrap();
        assert_eq!(snapshot.len(), 64);
        heard |= snapshot.bins().iter().any(|&b| b > 0);
    }
    assert!(heard);

    c.enqueue(Track::ExternalVideo {
        name: "Clip".to_string(),
        external_id: "abc123".to_string(),
        thumbnail: None,
    });
    c.select(1);
    // switching to an external video is immediate and uses the synthetic spectrum
    assert!(!c.analyzer().has_session());
    let snapshot = c.frame_snapshot(time_s + 0.016, TICK).unwrap();
    assert_eq!(snapshot.session(), SessionId::SYNTHETIC);
    assert_eq!(snapshot.len(), 128);
}
