use std::f32::consts::PI;

/// Damped sinusoid whose first swing follows `sign`; models the P onset.
pub fn onset_pulse(sample_rate: f32, length: usize, frequency: f32, sign: f32) -> Vec<f32> {
    let decay = frequency * 1.5;
    (0..length)
        .map(|i| {
            let t = i as f32 / sample_rate;
            sign * (-decay * t).exp() * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_swing_follows_sign() {
        let up = onset_pulse(100.0, 20, 5.0, 1.0);
        let down = onset_pulse(100.0, 20, 5.0, -1.0);
        assert_eq!(up[0], 0.0);
        assert!(up[1] > 0.0);
        assert!(down[1] < 0.0);
    }
}
