use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;

/// Shape of a finished capture, read back from the WAV header.
#[derive(Debug, Clone, Copy)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u32,
}

impl WavInfo {
    pub fn probe(path: &Path) -> Result<Self> {
        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {:?}", path))?;
        let spec = reader.spec();

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frames: reader.duration(),
        })
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f32 / self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::tempdir;

    #[test]
    fn probe_reads_back_spec_and_duration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recording.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        // One second of interleaved stereo silence
        for _ in 0..44100 * 2 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let info = WavInfo::probe(&path).unwrap();

        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(info.frames, 44100);
        assert!((info.duration_secs() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn probe_fails_on_non_wav_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recording.wav");
        std::fs::write(&path, b"not a wav").unwrap();

        assert!(WavInfo::probe(&path).is_err());
    }
}
