pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    pub fn mean(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f32>() / samples.len() as f32
    }

    /// Removes the mean and scales to a unit peak so traces share one panel scale.
    pub fn normalize(samples: &[f32]) -> Vec<f32> {
        let mean = Self::mean(samples);
        let peak = samples
            .iter()
            .map(|&v| (v - mean).abs())
            .fold(0.0_f32, f32::max);
        if peak <= f32::EPSILON {
            return vec![0.0; samples.len()];
        }
        samples.iter().map(|&v| (v - mean) / peak).collect()
    }
}
