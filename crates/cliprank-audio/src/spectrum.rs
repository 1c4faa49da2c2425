//! Magnitude spectrum and spectral descriptors.
//!
//! The transform is an in-place iterative radix-2 FFT over the Hann-windowed
//! signal, zero-padded to the next power of two. A Hann window keeps spectral
//! leakage from skewing the energy-weighted descriptors on non-bin-centered
//! tones.

use std::f64::consts::PI;

/// One-sided magnitude spectrum of an audio window.
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Magnitudes for bins `0..fft_size/2`.
    pub magnitudes: Vec<f64>,
    /// Width of one frequency bin in Hz.
    pub bin_hz: f64,
}

impl Spectrum {
    /// Frequency of bin `i` in Hz.
    pub fn bin_frequency(&self, i: usize) -> f64 {
        i as f64 * self.bin_hz
    }

    /// Nyquist frequency in Hz.
    pub fn nyquist(&self) -> f64 {
        self.magnitudes.len() as f64 * self.bin_hz
    }
}

/// Compute the one-sided magnitude spectrum of `samples`.
pub fn magnitude_spectrum(samples: &[f64], sample_rate: u32) -> Spectrum {
    let n = samples.len().max(1);
    let fft_size = n.next_power_of_two();

    let mut re = vec![0.0; fft_size];
    let mut im = vec![0.0; fft_size];
    for (i, &sample) in samples.iter().enumerate() {
        // Hann window over the original (pre-padding) length.
        let hann = 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos();
        re[i] = sample * hann;
    }

    fft_in_place(&mut re, &mut im);

    let half = fft_size / 2;
    let magnitudes = (0..half)
        .map(|k| (re[k] * re[k] + im[k] * im[k]).sqrt())
        .collect();

    Spectrum {
        magnitudes,
        bin_hz: sample_rate as f64 / fft_size as f64,
    }
}

/// In-place iterative radix-2 Cooley-Tukey FFT. `re.len()` must be a power of
/// two and equal to `im.len()`.
fn fft_in_place(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();
    debug_assert!(n.is_power_of_two());
    debug_assert_eq!(n, im.len());

    // Bit-reversal permutation.
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let angle = -2.0 * PI / len as f64;
        let (w_re, w_im) = (angle.cos(), angle.sin());
        for start in (0..n).step_by(len) {
            let mut cur_re = 1.0;
            let mut cur_im = 0.0;
            let half = len / 2;
            for k in 0..half {
                let even_re = re[start + k];
                let even_im = im[start + k];
                let odd_re = re[start + k + half] * cur_re - im[start + k + half] * cur_im;
                let odd_im = re[start + k + half] * cur_im + im[start + k + half] * cur_re;
                re[start + k] = even_re + odd_re;
                im[start + k] = even_im + odd_im;
                re[start + k + half] = even_re - odd_re;
                im[start + k + half] = even_im - odd_im;
                let next_re = cur_re * w_re - cur_im * w_im;
                cur_im = cur_re * w_im + cur_im * w_re;
                cur_re = next_re;
            }
        }
        len <<= 1;
    }
}

/// Spectral centroid: energy-weighted mean frequency in Hz.
pub fn spectral_centroid(spectrum: &Spectrum) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (i, &mag) in spectrum.magnitudes.iter().enumerate() {
        weighted += spectrum.bin_frequency(i) * mag;
        total += mag;
    }
    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

/// Spectral bandwidth: energy-weighted spread around `centroid`, in Hz.
pub fn spectral_bandwidth(spectrum: &Spectrum, centroid: f64) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (i, &mag) in spectrum.magnitudes.iter().enumerate() {
        let diff = spectrum.bin_frequency(i) - centroid;
        weighted += diff * diff * mag;
        total += mag;
    }
    if total > 0.0 {
        (weighted / total).sqrt()
    } else {
        0.0
    }
}

/// Spectral rolloff: frequency below which `percentile` of energy lies.
pub fn spectral_rolloff(spectrum: &Spectrum, percentile: f64) -> f64 {
    let total: f64 = spectrum.magnitudes.iter().sum();
    if total <= 0.0 {
        return spectrum.nyquist();
    }
    let threshold = total * percentile;
    let mut cumulative = 0.0;
    for (i, &mag) in spectrum.magnitudes.iter().enumerate() {
        cumulative += mag;
        if cumulative >= threshold {
            return spectrum.bin_frequency(i);
        }
    }
    spectrum.nyquist()
}

/// Spectral flux: summed positive magnitude change versus the previous
/// window's spectrum. Returns 0 for the first window.
pub fn spectral_flux(previous: Option<&Spectrum>, current: &Spectrum) -> f64 {
    let Some(prev) = previous else {
        return 0.0;
    };
    current
        .magnitudes
        .iter()
        .zip(prev.magnitudes.iter())
        .map(|(&cur, &pre)| (cur - pre).max(0.0))
        .sum()
}

/// Zero-crossing rate: fraction of sign changes per sample.
pub fn zero_crossing_rate(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f64 / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: u32, seconds: f64) -> Vec<f64> {
        let count = (sample_rate as f64 * seconds) as usize;
        (0..count)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin())
            .collect()
    }

    #[test]
    fn test_centroid_of_pure_tone() {
        let samples = sine(440.0, 44_100, 0.5);
        let spectrum = magnitude_spectrum(&samples, 44_100);
        let centroid = spectral_centroid(&spectrum);
        assert!(
            (centroid - 440.0).abs() < 440.0 * 0.05,
            "centroid {centroid} not within 5% of 440"
        );
    }

    #[test]
    fn test_spectrum_peak_at_tone_frequency() {
        let samples = sine(1000.0, 44_100, 0.25);
        let spectrum = magnitude_spectrum(&samples, 44_100);
        let peak_bin = spectrum
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let peak_freq = spectrum.bin_frequency(peak_bin);
        assert!((peak_freq - 1000.0).abs() < 2.0 * spectrum.bin_hz);
    }

    #[test]
    fn test_bandwidth_narrow_for_pure_tone() {
        let samples = sine(440.0, 44_100, 0.5);
        let spectrum = magnitude_spectrum(&samples, 44_100);
        let centroid = spectral_centroid(&spectrum);
        let bandwidth = spectral_bandwidth(&spectrum, centroid);
        // A windowed pure tone concentrates energy in a few bins.
        assert!(bandwidth < 200.0, "bandwidth {bandwidth} too wide");
    }

    #[test]
    fn test_rolloff_below_nyquist() {
        let samples = sine(440.0, 44_100, 0.25);
        let spectrum = magnitude_spectrum(&samples, 44_100);
        let rolloff = spectral_rolloff(&spectrum, 0.85);
        assert!(rolloff > 0.0 && rolloff < spectrum.nyquist());
    }

    #[test]
    fn test_zcr_scales_with_frequency() {
        let low = zero_crossing_rate(&sine(100.0, 44_100, 0.25));
        let high = zero_crossing_rate(&sine(2000.0, 44_100, 0.25));
        assert!(high > low);
        // A 2kHz tone at 44.1kHz crosses zero ~4000 times/s.
        assert!((high - 2.0 * 2000.0 / 44_100.0).abs() < 0.01);
    }

    #[test]
    fn test_flux_zero_without_previous() {
        let spectrum = magnitude_spectrum(&sine(440.0, 44_100, 0.25), 44_100);
        assert!(spectral_flux(None, &spectrum).abs() < 1e-12);
    }

    #[test]
    fn test_flux_positive_on_spectral_change() {
        let quiet = magnitude_spectrum(&vec![0.0; 11_025], 44_100);
        let loud = magnitude_spectrum(&sine(440.0, 44_100, 0.25), 44_100);
        assert!(spectral_flux(Some(&quiet), &loud) > 0.0);
    }

    #[test]
    fn test_silence_has_zero_centroid() {
        let spectrum = magnitude_spectrum(&vec![0.0; 1024], 44_100);
        assert!(spectral_centroid(&spectrum).abs() < 1e-12);
    }
}
