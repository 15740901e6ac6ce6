//! Simulated spectral data generation.
//!
//! Each reference source has a fixed algorithmic shape. The wavelength
//! axis is computed once at construction and shared read-only across
//! every invocation; a fresh intensity array is produced per call.
//! Noise comes from a caller-supplied RNG so tests can seed it.

use rand::Rng;
use std::sync::Arc;

/// Mercury lamp emission lines in nm.
const MERCURY_PEAKS: [f64; 4] = [404.7, 435.8, 546.1, 578.0];

/// Neon lamp emission lines in nm.
const NEON_PEAKS: [f64; 5] = [540.1, 585.2, 614.3, 640.2, 703.2];

/// Aiming beam laser line in nm.
const AIMING_BEAM_WAVELENGTH: f64 = 650.0;

/// A simulated reference source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    DarkReference,
    WhiteReference,
    AttenuatedWhiteReference,
    MercuryReference,
    NeonReference,
    AimingBeam,
}

/// One captured dataset: intensity samples over the shared wavelength axis.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub wavelengths: Arc<[f64]>,
    pub intensities: Vec<f64>,
}

/// Generates simulated spectral data.
pub struct SpectrumGenerator {
    wavelengths: Arc<[f64]>,
}

impl SpectrumGenerator {
    /// Create a generator for `num_points` samples spanning
    /// `wavelength_range` (inclusive endpoints). Requires at least two
    /// points; config validation enforces this before construction.
    pub fn new(wavelength_range: (f64, f64), num_points: usize) -> Self {
        let (min, max) = wavelength_range;
        let step = (max - min) / (num_points - 1) as f64;
        let wavelengths: Arc<[f64]> = (0..num_points)
            .map(|i| min + i as f64 * step)
            .collect::<Vec<_>>()
            .into();

        SpectrumGenerator { wavelengths }
    }

    /// Generate a dataset for the given source.
    ///
    /// Total over its input domain: always returns equal-length arrays.
    pub fn generate<R: Rng>(&self, source: Source, rng: &mut R) -> Spectrum {
        let intensities = match source {
            Source::DarkReference => self.dark_reference(rng),
            Source::WhiteReference => self.white_reference(rng),
            Source::AttenuatedWhiteReference => self.attenuated_white_reference(rng),
            Source::MercuryReference => self.line_reference(&MERCURY_PEAKS, rng),
            Source::NeonReference => self.line_reference(&NEON_PEAKS, rng),
            Source::AimingBeam => self.aiming_beam(rng),
        };

        Spectrum {
            wavelengths: Arc::clone(&self.wavelengths),
            intensities,
        }
    }

    /// Baseline noise floor only.
    fn dark_reference<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        self.wavelengths
            .iter()
            .map(|_| rng.gen_range(0.0..10.0))
            .collect()
    }

    /// Smooth broadband curve plus noise.
    fn white_reference<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        self.wavelengths
            .iter()
            .map(|w| 900.0 + 100.0 * (w / 100.0).sin() + rng.gen_range(-20.0..20.0))
            .collect()
    }

    /// White reference through a 50% attenuator. Runs the same generation
    /// path as the white reference, so the noise realization is independent
    /// but the functional shape is identical up to the 0.5 factor.
    fn attenuated_white_reference<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let mut intensities = self.white_reference(rng);
        for intensity in &mut intensities {
            *intensity *= 0.5;
        }
        intensities
    }

    /// Discrete emission lines: a Gaussian bump (amplitude 1000, sigma 2
    /// samples, ±5-sample window) at the sample nearest each line.
    /// Overlapping peaks accumulate additively; noise is added afterward.
    fn line_reference<R: Rng>(&self, peaks: &[f64], rng: &mut R) -> Vec<f64> {
        let mut intensities = vec![0.0; self.wavelengths.len()];

        for &peak in peaks {
            let peak_idx = self.nearest_index(peak);
            add_gaussian_peak(&mut intensities, peak_idx, 1000.0, 2.0, 5);
        }

        for intensity in &mut intensities {
            *intensity += rng.gen_range(0.0..10.0);
        }
        intensities
    }

    /// Single sharp laser line at 650 nm (amplitude 2000, sigma 1 sample,
    /// ±3-sample window) over a reduced noise floor.
    fn aiming_beam<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let mut intensities = vec![0.0; self.wavelengths.len()];

        let peak_idx = self.nearest_index(AIMING_BEAM_WAVELENGTH);
        add_gaussian_peak(&mut intensities, peak_idx, 2000.0, 1.0, 3);

        for intensity in &mut intensities {
            *intensity += rng.gen_range(0.0..5.0);
        }
        intensities
    }

    /// Index of the sample nearest the target wavelength.
    pub fn nearest_index(&self, target: f64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, &w) in self.wavelengths.iter().enumerate() {
            let dist = (w - target).abs();
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best
    }
}

/// Add a Gaussian-shaped bump centered at `peak_idx`, clipped to the array
/// bounds. `window` is the half-width in samples.
fn add_gaussian_peak(
    intensities: &mut [f64],
    peak_idx: usize,
    amplitude: f64,
    sigma: f64,
    window: usize,
) {
    let start = peak_idx.saturating_sub(window);
    let end = (peak_idx + window + 1).min(intensities.len());
    for i in start..end {
        let distance = i.abs_diff(peak_idx) as f64;
        intensities[i] += amplitude * (-0.5 * (distance / sigma).powi(2)).exp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ALL_SOURCES: [Source; 6] = [
        Source::DarkReference,
        Source::WhiteReference,
        Source::AttenuatedWhiteReference,
        Source::MercuryReference,
        Source::NeonReference,
        Source::AimingBeam,
    ];

    fn generator() -> SpectrumGenerator {
        SpectrumGenerator::new((400.0, 800.0), 1000)
    }

    #[test]
    fn test_arrays_have_configured_length() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(1);

        for source in ALL_SOURCES {
            let spectrum = gen.generate(source, &mut rng);
            assert_eq!(spectrum.wavelengths.len(), 1000);
            assert_eq!(spectrum.intensities.len(), 1000);
        }
    }

    #[test]
    fn test_wavelength_axis_is_shared_and_monotone() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(2);

        let a = gen.generate(Source::DarkReference, &mut rng);
        let b = gen.generate(Source::NeonReference, &mut rng);
        assert!(Arc::ptr_eq(&a.wavelengths, &b.wavelengths));

        assert_eq!(a.wavelengths[0], 400.0);
        assert_eq!(a.wavelengths[999], 800.0);
        assert!(a.wavelengths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_dark_reference_stays_within_noise_floor() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(3);

        let spectrum = gen.generate(Source::DarkReference, &mut rng);
        assert!(spectrum.intensities.iter().all(|&i| (0.0..10.0).contains(&i)));
    }

    #[test]
    fn test_attenuated_white_is_half_of_white_on_average() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(4);

        let white = gen.generate(Source::WhiteReference, &mut rng);
        let attenuated = gen.generate(Source::AttenuatedWhiteReference, &mut rng);

        let mean = |s: &Spectrum| s.intensities.iter().sum::<f64>() / s.intensities.len() as f64;
        let ratio = mean(&attenuated) / mean(&white);

        // Noise realizations are independent; uniform(-20,20) averages out
        // over 1000 points, so the mean ratio lands close to 0.5.
        assert!((ratio - 0.5).abs() < 0.01, "mean ratio {ratio} not near 0.5");
    }

    #[test]
    fn test_emission_lines_rise_above_noise_ceiling() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(5);

        let mercury = gen.generate(Source::MercuryReference, &mut rng);
        for peak in [404.7, 435.8, 546.1, 578.0] {
            let idx = gen.nearest_index(peak);
            assert!(
                mercury.intensities[idx] > 10.0,
                "no mercury peak at {peak} nm (intensity {})",
                mercury.intensities[idx]
            );
        }

        let neon = gen.generate(Source::NeonReference, &mut rng);
        for peak in [540.1, 585.2, 614.3, 640.2, 703.2] {
            let idx = gen.nearest_index(peak);
            assert!(
                neon.intensities[idx] > 10.0,
                "no neon peak at {peak} nm (intensity {})",
                neon.intensities[idx]
            );
        }
    }

    #[test]
    fn test_aiming_beam_peaks_at_650nm() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(6);

        let spectrum = gen.generate(Source::AimingBeam, &mut rng);
        let peak_idx = gen.nearest_index(650.0);

        let (max_idx, max) = spectrum
            .intensities
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
                if v > bv {
                    (i, v)
                } else {
                    (bi, bv)
                }
            });

        assert_eq!(max_idx, peak_idx);
        assert!(max > 1000.0);

        // Away from the ±3-sample peak window only the noise floor remains.
        for (i, &intensity) in spectrum.intensities.iter().enumerate() {
            if i.abs_diff(peak_idx) > 3 {
                assert!(intensity < 5.0, "intensity {intensity} at index {i}");
            }
        }
    }

    #[test]
    fn test_overlapping_peaks_accumulate() {
        // Two lines one sample apart on a coarse axis: the bumps overlap
        // and the shared samples carry contributions from both.
        let gen = SpectrumGenerator::new((400.0, 800.0), 5);

        let mut intensities = vec![0.0; 5];
        for line in [500.0, 600.0] {
            add_gaussian_peak(&mut intensities, gen.nearest_index(line), 1000.0, 2.0, 5);
        }

        // Each peak center sees its own full amplitude plus the tail of
        // the neighboring line.
        assert!(intensities[1] > 1000.0);
        assert!(intensities[2] > 1000.0);
    }

    #[test]
    fn test_nearest_index_clamps_to_range() {
        let gen = generator();
        assert_eq!(gen.nearest_index(0.0), 0);
        assert_eq!(gen.nearest_index(10_000.0), 999);
        assert_eq!(gen.nearest_index(400.0), 0);
        assert_eq!(gen.nearest_index(800.0), 999);
    }
}
