//! Sub-pixel sample patterns for antialiasing.
//!
//! A pattern is generated once per render and reused for every pixel.
//! Offsets are relative to the pixel position and lie in `[-0.5, 0.5)`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};

/// How sub-pixel sample positions are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplerKind {
    /// Regular grid of cell centers.
    #[default]
    Uniform,
    /// One random point in each grid cell.
    Jittered,
    /// Independent random points.
    Random,
    /// One point per row and per column of an `n x n` fine grid (`n = oversampling²`).
    NRooks,
    /// Jittered and n-rooks at the same time.
    MultiJittered,
    /// Halton low-discrepancy sequence.
    Halton {
        /// Base of the horizontal sequence.
        base_x: u32,
        /// Base of the vertical sequence.
        base_y: u32,
    },
}

/// `oversampling²` sub-pixel offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePattern {
    offsets: Vec<(f64, f64)>,
}

impl SamplePattern {
    /// Generate the pattern for `kind`. Random samplers draw from a
    /// [`StdRng`] seeded with `seed`.
    pub fn new(kind: SamplerKind, oversampling: u32, seed: u64) -> Result<Self> {
        if oversampling == 0 {
            return Err(SceneError::InvalidSettings("oversampling must be at least 1".into()));
        }
        let o = oversampling as usize;
        let mut rng = StdRng::seed_from_u64(seed);

        let offsets = match kind {
            SamplerKind::Uniform => uniform(o),
            SamplerKind::Jittered => jittered(o, &mut rng),
            SamplerKind::Random => (0..o * o)
                .map(|_| (rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)))
                .collect(),
            SamplerKind::NRooks => n_rooks(o, &mut rng),
            SamplerKind::MultiJittered => multi_jittered(o, &mut rng),
            SamplerKind::Halton { base_x, base_y } => {
                if base_x < 2 || base_y < 2 {
                    return Err(SceneError::InvalidSettings(format!(
                        "halton bases must be at least 2, got {base_x} and {base_y}"
                    )));
                }
                (1..=(o * o) as u64)
                    .map(|i| (halton_term(i, base_x as u64) - 0.5, halton_term(i, base_y as u64) - 0.5))
                    .collect()
            }
        };

        Ok(Self { offsets })
    }

    /// Offsets `(dx, dy)` in pixel units.
    pub fn offsets(&self) -> &[(f64, f64)] {
        &self.offsets
    }

    /// Number of samples per pixel.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Always false for a constructed pattern.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

fn uniform(o: usize) -> Vec<(f64, f64)> {
    let step = 1.0 / o as f64;
    let center = |i: usize| -0.5 + (i as f64 + 0.5) * step;
    (0..o)
        .flat_map(|row| (0..o).map(move |col| (center(col), center(row))))
        .collect()
}

fn jittered(o: usize, rng: &mut StdRng) -> Vec<(f64, f64)> {
    let step = 1.0 / o as f64;
    let half = o as f64 / 2.0;
    let mut offsets = Vec::with_capacity(o * o);
    for i in 0..o {
        for j in 0..o {
            let x = (i as f64 - half + rng.gen::<f64>()) * step;
            let y = (j as f64 - half + rng.gen::<f64>()) * step;
            offsets.push((x, y));
        }
    }
    offsets
}

fn n_rooks(o: usize, rng: &mut StdRng) -> Vec<(f64, f64)> {
    let n = o * o;
    let half = n as f64 / 2.0;
    let step = 1.0 / n as f64;
    let mut columns: Vec<f64> = (0..n).map(|i| i as f64 - half).collect();
    columns.shuffle(rng);

    columns
        .into_iter()
        .enumerate()
        .map(|(row, column)| {
            let x = (column + rng.gen::<f64>()) * step;
            let y = (row as f64 - half + rng.gen::<f64>()) * step;
            (x, y)
        })
        .collect()
}

fn multi_jittered(o: usize, rng: &mut StdRng) -> Vec<(f64, f64)> {
    let of = o as f64;
    let step = 1.0 / (of * of);
    let mut xs: Vec<f64> = (0..o).map(|i| of * (i as f64 - of / 2.0)).collect();
    let mut ys = xs.clone();
    xs.shuffle(rng);
    ys.shuffle(rng);

    let mut offsets = Vec::with_capacity(o * o);
    for (i, &x0) in xs.iter().enumerate() {
        for (j, &y0) in ys.iter().enumerate() {
            let x = (x0 + (o - j - 1) as f64 + rng.gen::<f64>()) * step;
            let y = (y0 + (o - i - 1) as f64 + rng.gen::<f64>()) * step;
            offsets.push((x, y));
        }
    }
    offsets
}

/// Radical inverse of `index` in `base`.
fn halton_term(mut index: u64, base: u64) -> f64 {
    let inv = 1.0 / base as f64;
    let mut fac = inv;
    let mut h = 0.0;
    while index != 0 {
        let digit = index % base;
        h += digit as f64 * fac;
        index /= base;
        fac *= inv;
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [SamplerKind; 6] = [
        SamplerKind::Uniform,
        SamplerKind::Jittered,
        SamplerKind::Random,
        SamplerKind::NRooks,
        SamplerKind::MultiJittered,
        SamplerKind::Halton { base_x: 2, base_y: 3 },
    ];

    fn in_pixel(v: f64) -> bool {
        (-0.5..0.5).contains(&v)
    }

    /// Index of the fine-grid stratum holding `v` for `n` strata.
    fn stratum(v: f64, n: usize) -> usize {
        ((v + 0.5) * n as f64).floor() as usize
    }

    #[test]
    fn test_every_kind_fills_the_pixel() {
        for kind in ALL_KINDS {
            for oversampling in [1, 2, 3, 4] {
                let pattern = SamplePattern::new(kind, oversampling, 7).unwrap();
                assert_eq!(pattern.len(), (oversampling * oversampling) as usize, "{kind:?}");
                for &(x, y) in pattern.offsets() {
                    assert!(in_pixel(x) && in_pixel(y), "{kind:?}: ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn test_uniform_grid_centers() {
        let pattern = SamplePattern::new(SamplerKind::Uniform, 2, 0).unwrap();
        assert_eq!(
            pattern.offsets(),
            &[(-0.25, -0.25), (0.25, -0.25), (-0.25, 0.25), (0.25, 0.25)]
        );
        let single = SamplePattern::new(SamplerKind::Uniform, 1, 0).unwrap();
        assert_eq!(single.offsets(), &[(0.0, 0.0)]);
    }

    #[test]
    fn test_jittered_one_sample_per_cell() {
        let o = 4;
        let pattern = SamplePattern::new(SamplerKind::Jittered, o as u32, 11).unwrap();
        let mut cells: Vec<(usize, usize)> = pattern
            .offsets()
            .iter()
            .map(|&(x, y)| (stratum(x, o), stratum(y, o)))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), o * o);
    }

    #[test]
    fn test_rook_patterns_cover_every_row_and_column() {
        for kind in [SamplerKind::NRooks, SamplerKind::MultiJittered] {
            let o = 3;
            let n = o * o;
            let pattern = SamplePattern::new(kind, o as u32, 5).unwrap();
            let mut columns: Vec<usize> = pattern.offsets().iter().map(|&(x, _)| stratum(x, n)).collect();
            let mut rows: Vec<usize> = pattern.offsets().iter().map(|&(_, y)| stratum(y, n)).collect();
            columns.sort_unstable();
            rows.sort_unstable();
            assert_eq!(columns, (0..n).collect::<Vec<_>>(), "{kind:?}");
            assert_eq!(rows, (0..n).collect::<Vec<_>>(), "{kind:?}");
        }
    }

    #[test]
    fn test_seed_determines_pattern() {
        for kind in [SamplerKind::Jittered, SamplerKind::Random, SamplerKind::NRooks] {
            let a = SamplePattern::new(kind, 3, 42).unwrap();
            let b = SamplePattern::new(kind, 3, 42).unwrap();
            let c = SamplePattern::new(kind, 3, 43).unwrap();
            assert_eq!(a, b);
            assert_ne!(a, c);
        }
    }

    #[test]
    fn test_halton_terms() {
        assert_eq!(halton_term(1, 2), 0.5);
        assert_eq!(halton_term(2, 2), 0.25);
        assert_eq!(halton_term(3, 2), 0.75);
        assert!((halton_term(1, 3) - 1.0 / 3.0).abs() < 1e-15);
        assert!((halton_term(2, 3) - 2.0 / 3.0).abs() < 1e-15);
        assert!((halton_term(3, 3) - 1.0 / 9.0).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            SamplePattern::new(SamplerKind::Uniform, 0, 0),
            Err(SceneError::InvalidSettings(_))
        ));
        assert!(matches!(
            SamplePattern::new(SamplerKind::Halton { base_x: 1, base_y: 3 }, 2, 0),
            Err(SceneError::InvalidSettings(_))
        ));
    }
}
