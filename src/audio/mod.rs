//! Audio sample utilities: level metering and PCM conversion.

/// Silence floor for the level meter, in dBFS.
const DB_FLOOR: f32 = -60.0;

/// Maps raw sample frames to a normalized UI level.
///
/// RMS energy is converted to dBFS and mapped linearly from
/// [-60 dB, 0 dB] onto [0, 1]. Stateless apart from construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioLevelMeter;

impl AudioLevelMeter {
    pub fn new() -> Self {
        Self
    }

    /// Normalized level in [0, 1] for one frame of samples.
    ///
    /// Empty or fully silent frames map to 0.0.
    pub fn level(&self, samples: &[f32]) -> f32 {
        let rms = rms_energy(samples);
        if rms <= 0.0 {
            return 0.0;
        }
        let db = 20.0 * rms.log10();
        ((db - DB_FLOOR) / -DB_FLOOR).clamp(0.0, 1.0)
    }
}

/// Compute RMS energy of audio samples.
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Convert f32 samples in [-1, 1] to little-endian signed 16-bit PCM bytes.
///
/// Out-of-range samples are clamped before scaling.
pub fn samples_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * f32::from(i16::MAX)) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert little-endian signed 16-bit PCM bytes back to f32 samples.
///
/// A trailing odd byte is ignored.
pub fn pcm16_to_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| {
            let value = i16::from_le_bytes([pair[0], pair[1]]);
            f32::from(value) / f32::from(i16::MAX)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_zero_for_silence() {
        let meter = AudioLevelMeter::new();
        assert_eq!(meter.level(&[]), 0.0);
        assert_eq!(meter.level(&[0.0; 160]), 0.0);
    }

    #[test]
    fn level_is_one_for_full_scale() {
        let meter = AudioLevelMeter::new();
        let full = vec![1.0_f32; 160];
        assert!((meter.level(&full) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn level_is_monotonic_in_amplitude() {
        let meter = AudioLevelMeter::new();
        let quiet = vec![0.01_f32; 160];
        let loud = vec![0.5_f32; 160];
        assert!(meter.level(&quiet) < meter.level(&loud));
    }

    #[test]
    fn level_clamps_below_floor() {
        let meter = AudioLevelMeter::new();
        // -80 dBFS, well under the -60 dB floor.
        let faint = vec![0.0001_f32; 160];
        assert_eq!(meter.level(&faint), 0.0);
    }

    #[test]
    fn pcm16_clamps_out_of_range() {
        let bytes = samples_to_pcm16(&[2.0, -2.0]);
        assert_eq!(bytes.len(), 4);
        let back = pcm16_to_samples(&bytes);
        assert!((back[0] - 1.0).abs() < 1e-4);
        assert!((back[1] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn pcm16_round_trip_is_close() {
        let samples = [0.0, 0.25, -0.25, 0.9, -0.9];
        let back = pcm16_to_samples(&samples_to_pcm16(&samples));
        for (a, b) in samples.iter().zip(&back) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn pcm16_round_trip_half_scale_within_one_step() {
        let back = pcm16_to_samples(&samples_to_pcm16(&[0.5]));
        assert!((back[0] - 0.5).abs() <= 1.0 / 32767.0);
    }

    #[test]
    fn pcm16_is_little_endian() {
        let bytes = samples_to_pcm16(&[1.0]);
        assert_eq!(bytes, i16::MAX.to_le_bytes().to_vec());
    }
}
