use std::fs::File;
use std::io::Read;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::types::AudioData;
use crate::error::{AudioError, Result};

/// Audio file loader supporting multiple formats
pub struct AudioLoader;

impl AudioLoader {
    /// Load an audio file and return raw audio data
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<AudioData> {
        let path = path.as_ref().to_path_buf();
        let extension = Self::detect_format(&path).unwrap_or_default();

        if !Self::is_format_supported(&extension) {
            return Err(AudioError::UnsupportedFormat { format: extension }.into());
        }

        // Decoding is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || match extension.as_str() {
            "wav" => Self::load_wav(&path),
            _ => Self::load_with_symphonia(&path),
        })
        .await
        .map_err(|e| crate::error::ReelError::generic(format!("decoder task failed: {}", e)))?
    }

    /// Load WAV files using the hound crate (most reliable for WAV)
    fn load_wav(path: &Path) -> Result<AudioData> {
        let path_str = path.display().to_string();
        let reader = hound::WavReader::open(path)
            .map_err(|_| AudioError::LoadFailed { path: path_str.clone() })?;

        let spec = reader.spec();
        let samples = wav_samples_to_f32(reader, &path_str)?;

        tracing::debug!(
            "Loaded WAV {}: {} Hz, {} channels, {} bits",
            path_str,
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample
        );

        AudioData::new(samples, spec.sample_rate, spec.channels)
    }

    /// Load compressed formats using Symphonia
    fn load_with_symphonia(path: &Path) -> Result<AudioData> {
        let load_failed = || AudioError::LoadFailed {
            path: path.display().to_string(),
        };

        let file = File::open(path).map_err(|_| load_failed())?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|_| load_failed())?;

        let mut format = probed.format;

        // Find the first audio track with a known (decodable) codec
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(load_failed)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate.ok_or_else(|| AudioError::InvalidParameters {
            details: "No sample rate found".to_string(),
        })?;

        let channels = codec_params
            .channels
            .ok_or_else(|| AudioError::InvalidParameters {
                details: "No channel information found".to_string(),
            })?
            .count() as u16;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|_| load_failed())?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream
                Err(_) => break,
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => Self::convert_audio_buffer_to_f32(&decoded, &mut samples)?,
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(_) => break,
            }
        }

        // A truncated final packet can leave a partial frame behind
        let whole = samples.len() - samples.len() % channels.max(1) as usize;
        samples.truncate(whole);

        AudioData::new(samples, sample_rate, channels)
    }

    /// Interleave a Symphonia buffer into `output` as f32
    fn convert_audio_buffer_to_f32(buffer: &AudioBufferRef, output: &mut Vec<f32>) -> Result<()> {
        fn interleave<S: symphonia::core::sample::Sample>(
            buf: &symphonia::core::audio::AudioBuffer<S>,
            output: &mut Vec<f32>,
            convert: impl Fn(S) -> f32,
        ) {
            let channels = buf.spec().channels.count();
            for frame_idx in 0..buf.frames() {
                for ch in 0..channels {
                    output.push(convert(buf.chan(ch)[frame_idx]));
                }
            }
        }

        match buffer {
            AudioBufferRef::F32(buf) => interleave(&**buf, output, |s| s),
            AudioBufferRef::F64(buf) => interleave(&**buf, output, |s| s as f32),
            AudioBufferRef::S32(buf) => interleave(&**buf, output, |s| s as f32 / 2147483648.0),
            AudioBufferRef::S16(buf) => interleave(&**buf, output, |s| s as f32 / 32768.0),
            AudioBufferRef::U8(buf) => interleave(&**buf, output, |s| (s as f32 - 128.0) / 128.0),
            _ => {
                return Err(AudioError::UnsupportedFormat {
                    format: "unsupported decoded sample format".to_string(),
                }
                .into())
            }
        }

        Ok(())
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file format is supported
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}

/// Read every sample of a WAV stream as f32 in [-1, 1]
pub(crate) fn wav_samples_to_f32<R: Read>(reader: hound::WavReader<R>, path: &str) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let load_failed = |_| AudioError::LoadFailed {
        path: path.to_string(),
    };

    match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(load_failed)
            .map_err(Into::into),
        hound::SampleFormat::Int => {
            let bit_depth = spec.bits_per_sample;
            let samples = reader
                .into_samples::<i32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(load_failed)?;

            Ok(samples
                .into_iter()
                .map(|sample| int_to_float(sample, bit_depth))
                .collect())
        }
    }
}

/// Convert integer sample to float (-1.0 to 1.0)
fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
    match bit_depth {
        8 => sample as f32 / 128.0,
        16 => sample as f32 / 32768.0,
        24 => sample as f32 / 8388608.0,
        32 => sample as f32 / 2147483648.0,
        _ => sample as f32 / 32768.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SegmentEncoder;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioLoader::detect_format("test.wav"), Some("wav".to_string()));
        assert_eq!(AudioLoader::detect_format("test.MP3"), Some("mp3".to_string()));
        assert_eq!(AudioLoader::detect_format("test"), None);
    }

    #[test]
    fn test_format_support() {
        assert!(AudioLoader::is_format_supported("wav"));
        assert!(AudioLoader::is_format_supported("FLAC"));
        assert!(!AudioLoader::is_format_supported("xyz"));
    }

    #[test]
    fn test_int_to_float_conversion() {
        assert_eq!(int_to_float(0, 16), 0.0);
        assert_eq!(int_to_float(-32768, 16), -1.0);
        assert_eq!(int_to_float(-128, 8), -1.0);
    }

    #[tokio::test]
    async fn test_load_wav_written_by_encoder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");

        let audio = AudioData::new(vec![0.0, 0.25, -0.5, 0.75], 22050, 2).unwrap();
        let bytes = SegmentEncoder::encode(&audio, 0.0, 1.0).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let loaded = AudioLoader::load(&path).await.unwrap();
        assert_eq!(loaded.channels, 2);
        assert_eq!(loaded.sample_rate, 22050);
        assert_eq!(loaded.frame_count(), 2);
        assert!((loaded.samples[3] - 0.75).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.xyz");
        File::create(&file_path)
            .unwrap()
            .write_all(b"dummy content")
            .unwrap();

        let result = AudioLoader::load(&file_path).await;
        match result {
            Err(crate::error::ReelError::Audio(AudioError::UnsupportedFormat { format })) => {
                assert_eq!(format, "xyz");
            }
            other => panic!("Expected UnsupportedFormat error, got {:?}", other.map(|a| a.samples.len())),
        }
    }
}
