use crate::core::models::fragment::Fragment;
use crate::core::utils::geometry::pairwise_distances;
use nalgebra::{DMatrix, Point3};

/// Directed terminus reachability: `get(i, j)` holds iff the C-terminus of fragment `i`
/// lies within the distance threshold of the N-terminus of fragment `j`.
///
/// The diagonal is always `false`. The matrix is not symmetric in general.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityMatrix {
    sat: DMatrix<bool>,
}

impl CompatibilityMatrix {
    /// Computes the matrix for an ordered fragment set.
    ///
    /// Fragments without a resolvable terminus never connect.
    pub fn build(fragments: &[Fragment], max_distance: f64) -> Self {
        let n = fragments.len();
        let c_termini: Vec<Option<Point3<f64>>> = fragments.iter().map(Fragment::c_terminus).collect();
        let n_termini: Vec<Option<Point3<f64>>> = fragments.iter().map(Fragment::n_terminus).collect();

        let c_points: Vec<Point3<f64>> = c_termini.iter().map(|p| p.unwrap_or_else(Point3::origin)).collect();
        let n_points: Vec<Point3<f64>> = n_termini.iter().map(|p| p.unwrap_or_else(Point3::origin)).collect();
        let distances = pairwise_distances(&c_points, &n_points);

        let sat = DMatrix::from_fn(n, n, |i, j| {
            i != j
                && c_termini[i].is_some()
                && n_termini[j].is_some()
                && distances[(i, j)] <= max_distance
        });
        Self { sat }
    }

    /// Builds a matrix from explicit rows; missing cells are `false` and the diagonal
    /// is cleared.
    pub fn from_rows(rows: &[Vec<bool>]) -> Self {
        let n = rows.len();
        let sat = DMatrix::from_fn(n, n, |i, j| {
            i != j && rows[i].get(j).copied().unwrap_or(false)
        });
        Self { sat }
    }

    pub fn size(&self) -> usize {
        self.sat.nrows()
    }

    pub fn get(&self, from: usize, to: usize) -> bool {
        from < self.size() && to < self.size() && self.sat[(from, to)]
    }

    /// Number of `true` cells.
    pub fn satisfied_count(&self) -> usize {
        self.sat.iter().filter(|&&cell| cell).count()
    }

    /// All satisfied `(from, to)` pairs in row-major order.
    pub fn satisfied_pairs(&self) -> Vec<(usize, usize)> {
        let n = self.size();
        (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .filter(|&(i, j)| self.sat[(i, j)])
            .collect()
    }
}
