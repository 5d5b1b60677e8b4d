//! Seeded 2D simplex-style gradient noise.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The eight gradient directions shared by every noise field.
pub const GRADIENTS: [[f64; 2]; 8] = [
    [1.0, 0.0],
    [0.7071, 0.7071],
    [0.0, 1.0],
    [-0.7071, 0.7071],
    [-1.0, 0.0],
    [-0.7071, -0.7071],
    [0.0, -1.0],
    [0.7071, -0.7071],
];

/// Skew factor, (sqrt(3) - 1) / 2.
const F2: f64 = 0.366_025_403_784_438_6;
/// Unskew factor, (3 - sqrt(3)) / 6.
const G2: f64 = 0.211_324_865_405_187_13;
/// Scales the summed corner contributions into roughly [-1, 1].
const NORMALIZATION: f64 = 70.0;

/// A 512-entry permutation: a seeded shuffle of `0..=255`, stored twice so
/// that `perm[a + perm[b]]` never needs wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationTable {
    perm: [u8; 512],
}

impl PermutationTable {
    /// Builds the table from a Fisher–Yates shuffle driven by a ChaCha stream
    /// seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::from_rng(&mut rng)
    }

    /// Builds the table from an arbitrary random source.
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut base = [0u8; 256];
        for (i, slot) in base.iter_mut().enumerate() {
            *slot = i as u8;
        }

        for i in (1..base.len()).rev() {
            let j = rng.random_range(0..=i);
            base.swap(i, j);
        }

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = base[i & 255];
        }
        Self { perm }
    }

    /// Returns the entry at `index` (must be below 512).
    #[inline]
    pub fn get(&self, index: usize) -> usize {
        self.perm[index] as usize
    }

    /// Read-only view of all 512 entries.
    pub fn as_slice(&self) -> &[u8] {
        &self.perm
    }

    /// Gradient slot for the lattice point `(ii, jj)`, both already masked to `0..=255`.
    #[inline]
    fn gradient_index(&self, ii: usize, jj: usize) -> usize {
        self.get(ii + self.get(jj)) % GRADIENTS.len()
    }
}

/// Deterministic 2D gradient noise evaluated on a skewed triangular grid.
///
/// Output is a pure function of `(seed, x, y)` and stays within about [-1, 1].
#[derive(Debug, Clone)]
pub struct NoiseField {
    seed: u64,
    perm: PermutationTable,
}

impl NoiseField {
    /// Creates a noise field whose permutation table is derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            perm: PermutationTable::new(seed),
        }
    }

    /// Seed this field was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The permutation table owned by this field.
    pub fn permutation(&self) -> &PermutationTable {
        &self.perm
    }

    /// Evaluates the noise at `(x, y)`.
    ///
    /// Returns NaN if either coordinate is NaN.
    pub fn eval2(&self, x: f64, y: f64) -> f64 {
        if x.is_nan() || y.is_nan() {
            return f64::NAN;
        }

        // Skew into simplex space to find the containing cell.
        let s = (x + y) * F2;
        let i = (x + s).floor() as i64;
        let j = (y + s).floor() as i64;

        // Unskew the cell origin back to input space.
        let t = (i as f64 + j as f64) * G2;
        let x0 = x - (i as f64 - t);
        let y0 = y - (j as f64 - t);

        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;

        let g0 = self.perm.gradient_index(ii, jj);
        let g1 = self.perm.gradient_index(ii + i1, jj + j1);
        let g2 = self.perm.gradient_index(ii + 1, jj + 1);

        let n0 = corner(g0, x0, y0);
        let n1 = corner(g1, x1, y1);
        let n2 = corner(g2, x2, y2);

        NORMALIZATION * (n0 + n1 + n2)
    }
}

/// Radially attenuated contribution of one simplex corner.
#[inline]
fn corner(gradient: usize, dx: f64, dy: f64) -> f64 {
    let t = 0.5 - dx * dx - dy * dy;
    if t < 0.0 {
        return 0.0;
    }
    let t2 = t * t;
    let g = GRADIENTS[gradient];
    t2 * t2 * (g[0] * dx + g[1] * dy)
}
