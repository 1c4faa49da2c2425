//! Mel filterbank and MFCC computation.
//!
//! 26 overlapping triangular filters spaced linearly on the mel scale between
//! 0 Hz and Nyquist, log energy per band, then a 13-point DCT-II.

use cliprank_models::MFCC_COUNT;

use crate::spectrum::Spectrum;

/// Number of triangular filters in the mel bank.
pub const MEL_BANDS: usize = 26;

/// Floor added before taking log energies.
const LOG_FLOOR: f64 = 1e-10;

/// Convert frequency in Hz to mel scale.
pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mel value back to Hz.
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Center frequencies of the mel filters, in Hz.
pub fn mel_center_frequencies(sample_rate: u32) -> [f64; MEL_BANDS] {
    let points = mel_points(sample_rate);
    let mut centers = [0.0; MEL_BANDS];
    for (band, center) in centers.iter_mut().enumerate() {
        *center = points[band + 1];
    }
    centers
}

/// Mel band edge frequencies: `MEL_BANDS + 2` points from 0 Hz to Nyquist.
fn mel_points(sample_rate: u32) -> [f64; MEL_BANDS + 2] {
    let max_mel = hz_to_mel(sample_rate as f64 / 2.0);
    let mut points = [0.0; MEL_BANDS + 2];
    for (i, point) in points.iter_mut().enumerate() {
        *point = mel_to_hz(max_mel * i as f64 / (MEL_BANDS + 1) as f64);
    }
    points
}

/// Apply the triangular filterbank to a magnitude spectrum, returning the
/// raw (pre-log) energy per band.
pub fn filterbank_energies(spectrum: &Spectrum, sample_rate: u32) -> [f64; MEL_BANDS] {
    let points = mel_points(sample_rate);
    let mut energies = [0.0; MEL_BANDS];

    for band in 0..MEL_BANDS {
        let lower = points[band];
        let center = points[band + 1];
        let upper = points[band + 2];

        let mut energy = 0.0;
        for (i, &mag) in spectrum.magnitudes.iter().enumerate() {
            let freq = spectrum.bin_frequency(i);
            if freq <= lower || freq >= upper {
                continue;
            }
            let weight = if freq <= center {
                (freq - lower) / (center - lower)
            } else {
                (upper - freq) / (upper - center)
            };
            energy += weight * mag;
        }
        energies[band] = energy;
    }

    energies
}

/// DCT-II of `input`, returning the first `COUNT` coefficients.
fn dct_ii<const COUNT: usize>(input: &[f64]) -> [f64; COUNT] {
    let n = input.len() as f64;
    let mut output = [0.0; COUNT];
    for (k, coeff) in output.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (i, &value) in input.iter().enumerate() {
            sum += value * (std::f64::consts::PI * k as f64 * (i as f64 + 0.5) / n).cos();
        }
        *coeff = sum;
    }
    output
}

/// Compute 13 MFCCs from a magnitude spectrum: mel filterbank, log energies,
/// DCT-II.
pub fn mfccs(spectrum: &Spectrum, sample_rate: u32) -> [f64; MFCC_COUNT] {
    let energies = filterbank_energies(spectrum, sample_rate);
    let mut log_energies = [0.0; MEL_BANDS];
    for (log_energy, &energy) in log_energies.iter_mut().zip(energies.iter()) {
        *log_energy = (energy + LOG_FLOOR).ln();
    }
    dct_ii::<MFCC_COUNT>(&log_energies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::magnitude_spectrum;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: u32, seconds: f64) -> Vec<f64> {
        let count = (sample_rate as f64 * seconds) as usize;
        (0..count)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin())
            .collect()
    }

    #[test]
    fn test_mel_scale_round_trip() {
        for hz in [0.0, 440.0, 1000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((back - hz).abs() < 1e-6, "round trip failed for {hz}");
        }
    }

    #[test]
    fn test_mel_formula_reference_point() {
        // 1000 Hz is ~1000 mel on the 2595*log10(1+f/700) scale.
        assert!((hz_to_mel(1000.0) - 999.99).abs() < 0.5);
    }

    #[test]
    fn test_filterbank_centers_are_increasing() {
        let centers = mel_center_frequencies(44_100);
        for pair in centers.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!(centers[MEL_BANDS - 1] < 22_050.0);
    }

    #[test]
    fn test_tone_energy_concentrates_in_nearest_band() {
        let spectrum = magnitude_spectrum(&sine(440.0, 44_100, 0.5), 44_100);
        let energies = filterbank_energies(&spectrum, 44_100);
        let centers = mel_center_frequencies(44_100);

        let peak_band = energies
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let nearest_band = centers
            .iter()
            .enumerate()
            .min_by(|a, b| {
                (a.1 - 440.0)
                    .abs()
                    .partial_cmp(&(b.1 - 440.0).abs())
                    .unwrap()
            })
            .map(|(i, _)| i)
            .unwrap();

        // Triangular filters overlap, so allow the immediate neighbor.
        assert!(
            peak_band.abs_diff(nearest_band) <= 1,
            "energy peaked in band {peak_band}, expected near {nearest_band}"
        );
    }

    #[test]
    fn test_mfcc_count_and_finiteness() {
        let spectrum = magnitude_spectrum(&sine(440.0, 44_100, 0.25), 44_100);
        let coeffs = mfccs(&spectrum, 44_100);
        assert_eq!(coeffs.len(), MFCC_COUNT);
        assert!(coeffs.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_silence_mfccs_are_flat() {
        let spectrum = magnitude_spectrum(&vec![0.0; 4096], 44_100);
        let coeffs = mfccs(&spectrum, 44_100);
        // All-floor log energies give a DC-only cepstrum.
        for &c in &coeffs[1..] {
            assert!(c.abs() < 1e-6);
        }
    }
}
