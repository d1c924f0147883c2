//! RIFF/WAVE PCM16 encoding of a trimmed sample range.

use std::io::Cursor;

use crate::audio::types::AudioData;
use crate::error::{AudioError, Result};

/// Serializes a sub-range of an [`AudioData`] buffer as a 16-bit PCM WAV file
pub struct SegmentEncoder;

impl SegmentEncoder {
    /// Encode sample frames `[round(in·sr), round(out·sr))`, clamped to the buffer
    pub fn encode(audio: &AudioData, in_time: f64, out_time: f64) -> Result<Vec<u8>> {
        if !(in_time.is_finite() && out_time.is_finite()) || in_time < 0.0 || out_time < in_time {
            return Err(AudioError::InvalidClipRange {
                details: format!("cannot encode {:.3}s..{:.3}s", in_time, out_time),
            }
            .into());
        }

        let channels = audio.channels as usize;
        let frame_count = audio.frame_count();
        let sample_rate = audio.sample_rate as f64;
        let first = ((in_time * sample_rate).round() as usize).min(frame_count);
        let last = ((out_time * sample_rate).round() as usize).min(frame_count);

        let spec = hound::WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let encode_failed = |e: hound::Error| AudioError::EncodeFailed {
            reason: e.to_string(),
        };

        let mut buffer = Vec::with_capacity(44 + (last - first) * channels * 2);
        {
            let mut writer =
                hound::WavWriter::new(Cursor::new(&mut buffer), spec).map_err(encode_failed)?;

            for &sample in &audio.samples[first * channels..last * channels] {
                writer
                    .write_sample(quantize(sample))
                    .map_err(encode_failed)?;
            }

            writer.finalize().map_err(encode_failed)?;
        }

        tracing::debug!(
            "Encoded {} sample frames ({} bytes) as PCM16 WAV",
            last - first,
            buffer.len()
        );

        Ok(buffer)
    }

    /// Decode a WAV byte buffer back into interleaved `f32` samples
    pub fn decode(bytes: &[u8]) -> Result<AudioData> {
        let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| {
            AudioError::UnsupportedFormat {
                format: format!("wav: {}", e),
            }
        })?;

        let spec = reader.spec();
        let samples = crate::audio::loader::wav_samples_to_f32(reader, "<memory>")?;
        AudioData::new(samples, spec.sample_rate, spec.channels)
    }
}

/// Clamp to [-1, 1] and scale to a signed 16-bit sample
fn quantize(sample: f32) -> i16 {
    let clamped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (clamped * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize, channels: u16) -> AudioData {
        let samples = (0..frames * channels as usize)
            .map(|i| (i as f32 * 0.013).sin() * 0.9)
            .collect();
        AudioData::new(samples, 8000, channels).unwrap()
    }

    fn le_u16(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    fn le_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn test_header_layout_is_canonical() {
        let audio = ramp(8000, 2);
        let bytes = SegmentEncoder::encode(&audio, 0.25, 0.75).unwrap();

        let data_len = 4000 * 2 * 2;
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(le_u32(&bytes, 4) as usize, 36 + data_len);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(le_u32(&bytes, 16), 16);
        assert_eq!(le_u16(&bytes, 20), 1); // PCM
        assert_eq!(le_u16(&bytes, 22), 2); // NumChannels
        assert_eq!(le_u32(&bytes, 24), 8000); // SampleRate
        assert_eq!(le_u32(&bytes, 28), 8000 * 2 * 2); // ByteRate
        assert_eq!(le_u16(&bytes, 32), 4); // BlockAlign
        assert_eq!(le_u16(&bytes, 34), 16); // BitsPerSample
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(le_u32(&bytes, 40) as usize, data_len);
        assert_eq!(bytes.len(), 44 + data_len);
    }

    #[test]
    fn test_round_trip_within_quantization_error() {
        let audio = ramp(4000, 2);
        let bytes = SegmentEncoder::encode(&audio, 0.1, 0.4).unwrap();
        let decoded = SegmentEncoder::decode(&bytes).unwrap();

        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.frame_count(), 2400);

        let original = &audio.samples[800 * 2..3200 * 2];
        for (a, b) in original.iter().zip(&decoded.samples) {
            assert!((a - b).abs() <= 2.0 / 32768.0, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_clipped_input_does_not_overflow() {
        let audio = AudioData::new(vec![1.5, -3.0, 0.0, f32::NAN], 8000, 1).unwrap();
        let bytes = SegmentEncoder::encode(&audio, 0.0, 4.0 / 8000.0).unwrap();
        let decoded = SegmentEncoder::decode(&bytes).unwrap();

        assert_eq!(i16::from_le_bytes([bytes[44], bytes[45]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[46], bytes[47]]), -i16::MAX);
        assert_eq!(decoded.samples[2], 0.0);
        assert_eq!(decoded.samples[3], 0.0);
    }

    #[test]
    fn test_range_is_clamped_to_buffer() {
        let audio = ramp(800, 1);
        let bytes = SegmentEncoder::encode(&audio, 0.05, 5.0).unwrap();
        assert_eq!(bytes.len(), 44 + (800 - 400) * 2);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let audio = ramp(800, 1);
        assert!(SegmentEncoder::encode(&audio, 0.5, 0.1).is_err());
    }
}
