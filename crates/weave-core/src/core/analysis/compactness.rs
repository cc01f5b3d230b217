use crate::core::models::structure::Structure;
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Radius of the probe spheres rolled around each CA when shaping the hull.
pub const DEFAULT_ALPHA_RADIUS: f64 = 4.0;
/// Edge length of the voxels used to measure the hull volume.
pub const DEFAULT_VOXEL_RESOLUTION: f64 = 0.5;

/// Alpha-hull compactness of the CA trace, in `[0, 1]`.
///
/// The hull volume is measured as the voxelized union of `alpha_radius` spheres
/// around every CA, then divided by the volume of the sphere centred on the CA
/// centroid that encloses the whole hull. Globular folds score well above 0.1;
/// extended or isolated elements score close to zero.
///
/// Traces with fewer than four CA atoms have a degenerate hull and score 0.
pub fn alpha_hull_compactness(structure: &Structure, alpha_radius: f64, resolution: f64) -> f64 {
    let cas = structure.ca_positions();
    if cas.len() < 4 {
        return 0.0;
    }
    let hull = alpha_shape_volume(&cas, alpha_radius, resolution);
    let centroid = cas.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / cas.len() as f64;
    let reach = cas
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .fold(0.0_f64, f64::max)
        + alpha_radius;
    let enclosing = 4.0 / 3.0 * PI * reach.powi(3);
    (hull / enclosing).min(1.0)
}

/// Volume of the union of `radius` spheres around `points`, estimated on a voxel grid.
pub fn alpha_shape_volume(points: &[Point3<f64>], radius: f64, resolution: f64) -> f64 {
    if points.is_empty() || radius <= 0.0 {
        return 0.0;
    }
    let res = resolution.max(0.1);
    let mut min_corner = [f64::INFINITY; 3];
    let mut max_corner = [f64::NEG_INFINITY; 3];
    for p in points {
        for axis in 0..3 {
            min_corner[axis] = min_corner[axis].min(p[axis] - radius);
            max_corner[axis] = max_corner[axis].max(p[axis] + radius);
        }
    }
    let dims: [usize; 3] =
        std::array::from_fn(|axis| ((max_corner[axis] - min_corner[axis]) / res).ceil() as usize + 1);
    let mut occupied = vec![false; dims[0] * dims[1] * dims[2]];

    let radius_sq = radius * radius;
    for p in points {
        let lo: [usize; 3] = std::array::from_fn(|axis| {
            ((p[axis] - radius - min_corner[axis]) / res).floor().max(0.0) as usize
        });
        let hi: [usize; 3] = std::array::from_fn(|axis| {
            (((p[axis] + radius - min_corner[axis]) / res).ceil() as usize).min(dims[axis] - 1)
        });
        for ix in lo[0]..=hi[0] {
            let dx = min_corner[0] + ix as f64 * res - p[0];
            for iy in lo[1]..=hi[1] {
                let dy = min_corner[1] + iy as f64 * res - p[1];
                for iz in lo[2]..=hi[2] {
                    let dz = min_corner[2] + iz as f64 * res - p[2];
                    if dx * dx + dy * dy + dz * dz <= radius_sq {
                        occupied[(ix * dims[1] + iy) * dims[2] + iz] = true;
                    }
                }
            }
        }
    }
    let count = occupied.iter().filter(|&&v| v).count();
    count as f64 * res * res * res
}
