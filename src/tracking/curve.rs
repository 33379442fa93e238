use nalgebra::{Point3, Unit, Vector3};

/// Ordered polyline through the active coil positions of one catheter.
///
/// Index 0 is the most tip-ward control point when the owning catheter is
/// configured tip-first, otherwise the most base-ward one. Arc length is
/// measured along the polyline segments and is monotone in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    points: Vec<Point3<f64>>,
}

impl Curve {
    pub fn new() -> Self {
        Curve { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point3<f64>>) -> Self {
        Curve { points }
    }

    /// Full reset to `n` control points at the origin. Used whenever the
    /// active coil count changes; partial diffing is deliberately avoided.
    pub fn reset(&mut self, n: usize) {
        self.points.clear();
        self.points.resize(n, Point3::origin());
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, i: usize) -> Option<&Point3<f64>> {
        self.points.get(i)
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn set_point(&mut self, i: usize, p: Point3<f64>) {
        self.points[i] = p;
    }

    /// Arc length along the polyline between control points `i` and `j`.
    pub fn length_between(&self, i: usize, j: usize) -> f64 {
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        let hi = hi.min(self.points.len().saturating_sub(1));
        let mut len = 0.0;
        for k in lo..hi {
            len += (self.points[k + 1] - self.points[k]).norm();
        }
        len
    }

    /// Point at arc length `ds` beyond control point `i`, walking segments
    /// toward increasing index. Returns the last control point if `ds`
    /// runs past the end of the curve.
    pub fn point_at_arc_length(&self, i: usize, ds: f64) -> Option<Point3<f64>> {
        if i >= self.points.len() {
            return None;
        }
        let mut remaining = ds.max(0.0);
        let mut k = i;
        while k + 1 < self.points.len() {
            let seg = self.points[k + 1] - self.points[k];
            let seg_len = seg.norm();
            if remaining <= seg_len {
                if seg_len == 0.0 {
                    return Some(self.points[k]);
                }
                return Some(self.points[k] + seg * (remaining / seg_len));
            }
            remaining -= seg_len;
            k += 1;
        }
        Some(self.points[k])
    }

    /// Local tangent at control point `i`, pointing toward increasing index.
    /// Central difference in the interior, one-sided at the ends. `None` for
    /// curves shorter than two points or coincident neighbours.
    pub fn tangent_at(&self, i: usize) -> Option<Unit<Vector3<f64>>> {
        let n = self.points.len();
        if n < 2 || i >= n {
            return None;
        }
        let v = if i == 0 {
            self.points[1] - self.points[0]
        } else if i == n - 1 {
            self.points[n - 1] - self.points[n - 2]
        } else {
            self.points[i + 1] - self.points[i - 1]
        };
        Unit::try_new(v, 1e-12)
    }
}

impl Default for Curve {
    fn default() -> Self {
        Curve::new()
    }
}

/// Extrapolated catheter tip: a point beyond control point 0 plus an
/// orthonormal frame anchored on the local tangent.
#[derive(Debug, Clone, PartialEq)]
pub struct TipFrame {
    pub origin: Point3<f64>,
    pub tangent: Unit<Vector3<f64>>,
    pub normal: Unit<Vector3<f64>>,
    pub binormal: Unit<Vector3<f64>>,
}

impl TipFrame {
    /// Extrapolates the tip `tip_length` beyond control point 0 against the
    /// tangent (the tangent points toward increasing index, away from the
    /// tip). Curves with fewer than two points yield no tip.
    pub fn from_curve(curve: &Curve, tip_length: f64) -> Option<TipFrame> {
        if curve.point_count() < 2 {
            return None;
        }
        let tangent = curve.tangent_at(0)?;
        let origin = curve.point(0)? - tangent.into_inner() * tip_length;

        // Reference axis least aligned with the tangent keeps the frame stable.
        let reference = if tangent.z.abs() < 0.9 {
            Vector3::z()
        } else {
            Vector3::x()
        };
        let normal = Unit::try_new(
            reference - tangent.into_inner() * reference.dot(&tangent),
            1e-12,
        )?;
        let binormal = Unit::new_normalize(tangent.cross(&normal));

        Some(TipFrame {
            origin,
            tangent,
            normal,
            binormal,
        })
    }
}
