//! Integration tests for microphone capture through a real device
//!
//! Validates that CpalSource delivers fixed-size mono frames and that a
//! CaptureSession driven by it produces a playable artifact. Skips quietly
//! when no audio hardware is present (CI).
#![cfg(feature = "cpal-input")]

use pushscribe::audio::{AudioFormat, AudioSource, CpalSource};
use pushscribe::session::{CaptureSession, ManualTimer, RecordingPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_audio_capture_integration() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let format = AudioFormat::default();
    let mut source = CpalSource::new(None);

    let result = source.open(
        format,
        Arc::new(move |frame| {
            let _ = tx.send(frame);
        }),
    );

    if let Err(e) = result {
        eprintln!("Warning: Could not open audio source: {}", e);
        eprintln!("This may be expected in CI environments without audio hardware");
        return;
    }

    println!("\n=== Audio Capture Integration Test ===");
    let mut batches = 0;
    let start_time = std::time::Instant::now();

    while start_time.elapsed() < Duration::from_secs(3) && batches < 10 {
        match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
            Ok(Some(frame)) => {
                batches += 1;
                assert_eq!(
                    frame.sample_count(),
                    format.frame_samples,
                    "Every frame should hold exactly one frame of samples"
                );
            }
            Ok(None) => break,
            Err(_) => println!("Timeout waiting for data"),
        }
    }

    source.close();
    assert!(!source.is_open(), "Should not be open after close");
    println!("Frames received: {}", batches);
    assert!(batches > 0, "Should have received at least some audio data");
}

#[test]
fn test_session_with_real_device() {
    let policy = RecordingPolicy {
        min_duration: Duration::from_millis(100),
        ..RecordingPolicy::default()
    };
    let session = CaptureSession::new(
        Box::new(CpalSource::new(None)),
        Arc::new(ManualTimer::new()),
        policy,
    );

    if let Err(e) = session.begin() {
        eprintln!("Warning: Could not start session: {}", e);
        return;
    }

    std::thread::sleep(Duration::from_millis(600));
    match session.end() {
        Some(artifact) => {
            println!("Captured {:?}", artifact.duration());
            let wav = artifact.to_wav_bytes().unwrap();
            assert_eq!(&wav[0..4], b"RIFF");
        }
        None => eprintln!("Warning: device delivered less than the minimum duration"),
    }
    assert!(!session.is_recording());
}
