//! Timestamp and pixel-buffer helpers for the FFmpeg source.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy an RGB24 frame into a tightly-packed buffer.
///
/// FFmpeg rows are often padded (stride > width × 3); the padding is
/// dropped so the result matches an [`image::RgbImage`] byte for byte.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Seconds to a [`Duration`], treating negative and non-finite values as zero.
pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

/// Convert a [`Duration`] to a container-level seek timestamp.
///
/// `input.seek()` with no stream selected works in AV_TIME_BASE
/// (microseconds).
pub(crate) fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_rescales_through_time_base() {
        let seconds = pts_to_seconds(90_000 * 10, Rational::new(1, 90_000));
        assert!((seconds - 10.0).abs() < f64::EPSILON);
        assert_eq!(pts_to_seconds(42, Rational::new(1, 0)), 0.0);
    }

    #[test]
    fn negative_seconds_clamp_to_zero() {
        assert_eq!(seconds_to_duration(-0.5), Duration::ZERO);
        assert_eq!(seconds_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(seconds_to_duration(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn seek_timestamp_is_microseconds() {
        assert_eq!(duration_to_seek_timestamp(Duration::from_secs(10)), 10_000_000);
    }
}
