use nalgebra::{DMatrix, Point3};

/// Root-mean-square deviation between two equally long coordinate lists.
///
/// No superposition is performed; returns `None` for empty or mismatched inputs.
pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

/// Matrix of Euclidean distances, `from` along rows and `to` along columns.
pub fn pairwise_distances(from: &[Point3<f64>], to: &[Point3<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(from.len(), to.len(), |i, j| nalgebra::distance(&from[i], &to[j]))
}

/// Smallest distance between any point of `a` and any point of `b`.
pub fn min_distance(a: &[Point3<f64>], b: &[Point3<f64>]) -> Option<f64> {
    a.iter()
        .flat_map(|p| b.iter().map(move |q| nalgebra::distance_squared(p, q)))
        .min_by(|d1, d2| d1.total_cmp(d2))
        .map(f64::sqrt)
}

/// Whether any pair of points from `a` and `b` lies closer than `cutoff`.
pub fn any_within(a: &[Point3<f64>], b: &[Point3<f64>], cutoff: f64) -> bool {
    let cutoff_sq = cutoff * cutoff;
    a.iter()
        .any(|p| b.iter().any(|q| nalgebra::distance_squared(p, q) < cutoff_sq))
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}
