//! FFmpeg-backed extraction tests.
//!
//! Tests that need real media use `tests/fixtures/myclip.mp4` from
//! `tests/fixtures/generate_fixtures.sh` and return early when it is absent.
//! The clip is 10 seconds of blue with the final half second in red, so the
//! last frame is red.

use std::{path::Path, time::Duration};

use lastframe::{
    ErrorKind, ExtractOptions, ExtractionError, ExtractionStatus, FfmpegLogLevel, FfmpegOpener,
    SourceOpener, VideoInput, ViewController,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/myclip.mp4";

fn quiet() {
    lastframe::set_ffmpeg_log_level(FfmpegLogLevel::Quiet);
}

#[test]
fn open_nonexistent_file() {
    quiet();
    let result = FfmpegOpener.open(Path::new("this_file_does_not_exist.mp4"));
    match result {
        Err(ExtractionError::LoadFailed(message)) => {
            assert!(message.contains("could not open"), "unexpected: {message}");
        }
        Err(other) => panic!("expected LoadFailed, got: {other}"),
        Ok(_) => panic!("a missing file must not open"),
    }
}

#[test]
fn garbage_bytes_are_a_load_failure() {
    quiet();
    let input = VideoInput::from_bytes("broken.mp4", b"this is not a media file".to_vec());
    let error = lastframe::extract_last_frame(&FfmpegOpener, &input, &ExtractOptions::new())
        .unwrap_err();
    assert_eq!(error.kind(), Some(ErrorKind::LoadFailed));
}

#[tokio::test]
async fn corrupt_blob_reaches_error_then_idle() {
    quiet();
    let mut controller = ViewController::new();
    let input = VideoInput::from_bytes("broken.mp4", b"\x00\x00\x00\x18ftypmp42garbage".to_vec());

    let ticket = controller.select_file(input).unwrap();
    assert!(controller.settle(ticket.await));
    assert_eq!(controller.status(), ExtractionStatus::Error);
    assert_eq!(controller.error().unwrap().kind(), ErrorKind::LoadFailed);

    controller.reset().unwrap();
    assert_eq!(controller.status(), ExtractionStatus::Idle);
}

#[test]
fn probe_reports_duration_and_dimensions() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }
    quiet();

    let input = VideoInput::from_path(SAMPLE_VIDEO);
    let metadata = lastframe::probe(&FfmpegOpener, &input, &ExtractOptions::new()).unwrap();

    assert_eq!((metadata.width, metadata.height), (320, 240));
    assert!((metadata.duration.as_secs_f64() - 10.0).abs() < 0.1);
    assert!(metadata.frames_per_second > 29.0 && metadata.frames_per_second < 31.0);
}

#[test]
fn extracts_the_final_frame() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }
    quiet();

    let input = VideoInput::from_path(SAMPLE_VIDEO);
    let frame = lastframe::extract_last_frame(&FfmpegOpener, &input, &ExtractOptions::new())
        .expect("fixture should decode");

    assert_eq!(frame.file_name(), "myclip_last_frame.jpg");
    assert_eq!(frame.dimensions(), (320, 240));
    assert!(frame.position() <= frame.duration());
    assert!(frame.position() + Duration::from_millis(500) > frame.duration());

    let image = image::load_from_memory(frame.bytes()).unwrap().to_rgb8();
    let [red, green, blue] = image.get_pixel(160, 120).0;
    assert!(red > 180, "last frame should be red, got ({red}, {green}, {blue})");
    assert!(blue < 80, "last frame should be red, got ({red}, {green}, {blue})");
}

#[test]
fn in_memory_copy_matches_file_extraction() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }
    quiet();

    let bytes = std::fs::read(SAMPLE_VIDEO).unwrap();
    let input = VideoInput::from_bytes("myclip.mp4", bytes);
    let frame = lastframe::extract_last_frame(&FfmpegOpener, &input, &ExtractOptions::new())
        .expect("staged copy should decode");

    assert_eq!(frame.dimensions(), (320, 240));
}

#[tokio::test]
async fn controller_downloads_the_fixture_frame() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }
    quiet();

    let mut controller = ViewController::new();
    let ticket = controller
        .select_file(VideoInput::from_path(SAMPLE_VIDEO))
        .unwrap();
    controller.settle(ticket.await);
    assert_eq!(controller.status(), ExtractionStatus::Success);

    let directory = tempfile::tempdir().unwrap();
    controller
        .download(&mut lastframe::DirectorySink::new(directory.path()))
        .unwrap();
    assert!(directory.path().join("myclip_last_frame.jpg").exists());
}
