use log::warn;
use nalgebra::Point3;

use crate::errors::GeometryError;
use crate::tracking::curve::Curve;

/// One spatial correspondence between the two trackers: `from` lies on
/// catheter A, `to` on catheter B, at the same physical distance from the
/// tip. Both points are raw tracker-frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    pub from: Point3<f64>,
    pub to: Point3<f64>,
}

/// Maps each coil of the sparser tracker onto the arc-length parameter
/// space of the other tracker's curve.
///
/// Inputs are tip-first point lists with their coil distances from the tip,
/// both ascending. The curve whose first active coil sits closest to the
/// tip becomes the reference; each coil of the other catheter is bracketed
/// between consecutive reference coils by a monotone two-pointer walk and
/// placed by arc-length interpolation. Coils beyond the reference range are
/// dropped, never extrapolated.
pub fn find_correspondences(
    points_a: &[Point3<f64>],
    dist_a: &[f64],
    points_b: &[Point3<f64>],
    dist_b: &[f64],
) -> Result<Vec<PointPair>, GeometryError> {
    validate_side(points_a, dist_a)?;
    validate_side(points_b, dist_b)?;

    if dist_a.is_empty() || dist_b.is_empty() {
        return Ok(Vec::new());
    }

    // Reference curve "s": the tracker whose first coil is closest to the
    // tip, so interpolation always runs along the denser parameter range.
    let a_is_reference = dist_a[0] <= dist_b[0];
    let (s_points, s_dist, t_points, t_dist) = if a_is_reference {
        (points_a, dist_a, points_b, dist_b)
    } else {
        (points_b, dist_b, points_a, dist_a)
    };

    if s_dist.len() < 2 {
        return Err(GeometryError::ShortCurve(s_dist.len()));
    }

    let s_curve = Curve::from_points(s_points.to_vec());
    let mut pairs = Vec::new();
    let mut k = 0;

    'coils: for (j, tj) in t_dist.iter().enumerate() {
        // Advance the bracket while the next reference coil is still short
        // of this coil's distance.
        while s_dist[k + 1] < *tj {
            if k + 2 >= s_dist.len() {
                // Reference range exhausted; remaining coils are dropped.
                break 'coils;
            }
            k += 1;
        }

        let a = tj - s_dist[k];
        let b = s_dist[k + 1] - s_dist[k];
        if b == 0.0 {
            warn!(
                "duplicate coil distance {} on reference curve, skipping coil {}",
                s_dist[k], j
            );
            continue;
        }

        let clen = s_curve.length_between(k, k + 1);
        let on_reference = match s_curve.point_at_arc_length(k, clen * a / b) {
            Some(p) => p,
            None => continue,
        };

        pairs.push(if a_is_reference {
            PointPair {
                from: on_reference,
                to: t_points[j],
            }
        } else {
            PointPair {
                from: t_points[j],
                to: on_reference,
            }
        });
    }

    Ok(pairs)
}

fn validate_side(points: &[Point3<f64>], dist: &[f64]) -> Result<(), GeometryError> {
    if points.len() != dist.len() {
        return Err(GeometryError::CountMismatch {
            distances: dist.len(),
            points: points.len(),
        });
    }
    // Mis-sorted coil distances would silently mis-register; refuse them.
    if dist.windows(2).any(|w| w[1] < w[0]) {
        return Err(GeometryError::UnsortedCoilDistances);
    }
    Ok(())
}
