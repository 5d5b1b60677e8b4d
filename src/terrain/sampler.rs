//! Continuous sampling over a [`Heightfield`]: bilinear height, central-difference
//! gradient, and the four-cell footprint used to spread or remove material.

use glam::DVec2;

use super::heightfield::Heightfield;

/// Bilinearly interpolated height at continuous coordinate `(x, y)`.
///
/// Neighbour indices are clamped to the grid (clamp-to-edge), so any finite
/// coordinate yields a value.
pub fn interpolate_height(grid: &Heightfield, x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let last = grid.size() as i64 - 1;
    let clamp = |v: i64| v.clamp(0, last) as usize;
    let ix0 = clamp(x0 as i64);
    let ix1 = clamp(x0 as i64 + 1);
    let iy0 = clamp(y0 as i64);
    let iy1 = clamp(y0 as i64 + 1);

    let h00 = grid.get(ix0, iy0);
    let h10 = grid.get(ix1, iy0);
    let h01 = grid.get(ix0, iy1);
    let h11 = grid.get(ix1, iy1);

    let top = h00 * (1.0 - fx) + h10 * fx;
    let bottom = h01 * (1.0 - fx) + h11 * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Central-difference gradient `(∂h/∂x, ∂h/∂y)` at `(x, y)` with step `epsilon`.
pub fn gradient(grid: &Heightfield, x: f64, y: f64, epsilon: f64) -> DVec2 {
    let inv = 1.0 / (2.0 * epsilon);
    let gx = (interpolate_height(grid, x + epsilon, y) - interpolate_height(grid, x - epsilon, y)) * inv;
    let gy = (interpolate_height(grid, x, y + epsilon) - interpolate_height(grid, x, y - epsilon)) * inv;
    DVec2::new(gx, gy)
}

/// One grid cell touched by a bilinear footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellWeight {
    /// Linear index into [`Heightfield::heights`].
    pub index: usize,
    /// Bilinear weight of this cell.
    pub weight: f64,
}

/// The in-bounds cells among the four surrounding a continuous position.
///
/// Weights of all four corners sum to 1; when some corners fall outside the
/// grid only the remaining ones are kept and [`weight_sum`](Self::weight_sum)
/// drops below 1.
#[derive(Debug, Clone, Copy)]
pub struct Footprint {
    cells: [CellWeight; 4],
    len: usize,
}

impl Footprint {
    pub fn iter(&self) -> impl Iterator<Item = &CellWeight> {
        self.cells[..self.len].iter()
    }

    /// Number of in-bounds corners.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sum of the in-bounds weights.
    pub fn weight_sum(&self) -> f64 {
        self.iter().map(|c| c.weight).sum()
    }
}

/// Bilinear footprint of `(x, y)`: cells `(⌊x⌋ + di, ⌊y⌋ + dj)` for `di, dj ∈ {0, 1}`.
pub fn bilinear_footprint(grid: &Heightfield, x: f64, y: f64) -> Footprint {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (ix, iy) = (x0 as i64, y0 as i64);
    let size = grid.size() as i64;

    let mut footprint = Footprint {
        cells: [CellWeight { index: 0, weight: 0.0 }; 4],
        len: 0,
    };

    for dj in 0..=1 {
        for di in 0..=1 {
            let (cx, cy) = (ix + di, iy + dj);
            if cx < 0 || cx >= size || cy < 0 || cy >= size {
                continue;
            }
            let wx = if di == 0 { 1.0 - fx } else { fx };
            let wy = if dj == 0 { 1.0 - fy } else { fy };
            footprint.cells[footprint.len] = CellWeight {
                index: grid.index(cx as usize, cy as usize),
                weight: wx * wy,
            };
            footprint.len += 1;
        }
    }

    footprint
}
