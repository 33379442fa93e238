use nalgebra::{DMatrix, Matrix3, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::RegistrationError;

/// Which fitting strategy the registrar runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    Rigid,
    Affine,
    ThinPlateSpline,
}

/// Rigid-body transform (rotation + translation).
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation * p + self.translation
    }

    pub fn inverse_transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation.inverse() * (p - self.translation)
    }
}

/// Affine transform with its inverse precomputed at fit time.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    pub linear: Matrix3<f64>,
    pub translation: Vector3<f64>,
    inverse_linear: Matrix3<f64>,
}

impl AffineTransform {
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.linear * p.coords + self.translation)
    }

    pub fn inverse_transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.inverse_linear * (p.coords - self.translation))
    }
}

/// One direction of a thin-plate-spline warp: kernel weights plus the
/// affine tail, evaluated against the source landmark centers.
#[derive(Debug, Clone, PartialEq)]
struct TpsFit {
    centers: Vec<Point3<f64>>,
    // (n + 4) x 3: kernel weights, then constant, then linear terms
    weights: DMatrix<f64>,
}

impl TpsFit {
    fn evaluate(&self, p: &Point3<f64>) -> Point3<f64> {
        let n = self.centers.len();
        let mut out = Vector3::zeros();
        for d in 0..3 {
            let mut v = self.weights[(n, d)]
                + self.weights[(n + 1, d)] * p.x
                + self.weights[(n + 2, d)] * p.y
                + self.weights[(n + 3, d)] * p.z;
            for (i, c) in self.centers.iter().enumerate() {
                v += self.weights[(i, d)] * (p - c).norm();
            }
            out[d] = v;
        }
        Point3::from(out)
    }
}

/// Exact-interpolation spline warp. The inverse has no closed form, so the
/// fit solves both directions; the reverse map is exact at the landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct ThinPlateSpline {
    forward: TpsFit,
    reverse: TpsFit,
}

impl ThinPlateSpline {
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.forward.evaluate(p)
    }

    pub fn inverse_transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.reverse.evaluate(p)
    }
}

/// A fitted inter-tracker transform, mapping the "from" tracker frame into
/// the "to" tracker frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FittedTransform {
    Rigid(RigidTransform),
    Affine(AffineTransform),
    Spline(ThinPlateSpline),
}

impl FittedTransform {
    pub fn kind(&self) -> TransformKind {
        match self {
            FittedTransform::Rigid(_) => TransformKind::Rigid,
            FittedTransform::Affine(_) => TransformKind::Affine,
            FittedTransform::Spline(_) => TransformKind::ThinPlateSpline,
        }
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        match self {
            FittedTransform::Rigid(t) => t.transform_point(p),
            FittedTransform::Affine(t) => t.transform_point(p),
            FittedTransform::Spline(t) => t.transform_point(p),
        }
    }

    pub fn inverse_transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        match self {
            FittedTransform::Rigid(t) => t.inverse_transform_point(p),
            FittedTransform::Affine(t) => t.inverse_transform_point(p),
            FittedTransform::Spline(t) => t.inverse_transform_point(p),
        }
    }
}

/// Result of one registration run. Superseded results are discarded
/// wholesale; there is no incremental update and no history.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationResult {
    pub kind: TransformKind,
    pub transform: FittedTransform,
    /// Fiducial registration error: RMS residual distance in mm.
    pub fre: f64,
}

/// Snapshot of the registration state taken at the start of a tracking
/// tick and passed explicitly into the curve builder. `target` names the
/// catheter (tracked by the "to" system) whose display points get the
/// inverse map applied; everything else passes through untouched.
#[derive(Debug, Clone, Default)]
pub struct RegistrationContext {
    pub target: Option<u32>,
    pub transform: Option<FittedTransform>,
}

impl RegistrationContext {
    pub fn applies_to(&self, catheter_id: u32) -> bool {
        self.target == Some(catheter_id) && self.transform.is_some()
    }

    /// Maps a raw tracker-frame point into the display frame for the given
    /// catheter. Identity unless this context targets that catheter.
    pub fn map_for(&self, catheter_id: u32, p: &Point3<f64>) -> Point3<f64> {
        match (&self.transform, self.target) {
            (Some(t), Some(target)) if target == catheter_id => t.inverse_transform_point(p),
            _ => *p,
        }
    }
}

/// Fits the requested transform kind to paired landmarks and reports the
/// fiducial registration error. The pairing is positional; counts must
/// match exactly, otherwise the fit fails without producing a transform.
pub fn fit_landmarks(
    kind: TransformKind,
    from: &[Point3<f64>],
    to: &[Point3<f64>],
) -> Result<RegistrationResult, RegistrationError> {
    if from.len() != to.len() {
        return Err(RegistrationError::MismatchedLandmarkCount {
            from: from.len(),
            to: to.len(),
        });
    }
    let transform = match kind {
        TransformKind::Rigid => FittedTransform::Rigid(fit_rigid(from, to)?),
        TransformKind::Affine => FittedTransform::Affine(fit_affine(from, to)?),
        TransformKind::ThinPlateSpline => FittedTransform::Spline(ThinPlateSpline {
            forward: fit_tps(from, to)?,
            reverse: fit_tps(to, from)?,
        }),
    };
    let fre = fiducial_registration_error(&transform, from, to);
    Ok(RegistrationResult {
        kind,
        transform,
        fre,
    })
}

/// RMS Euclidean distance between the transformed "from" landmarks and
/// their paired "to" landmarks.
pub fn fiducial_registration_error(
    transform: &FittedTransform,
    from: &[Point3<f64>],
    to: &[Point3<f64>],
) -> f64 {
    if from.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = from
        .iter()
        .zip(to)
        .map(|(f, t)| (transform.transform_point(f) - t).norm_squared())
        .sum();
    (sum_sq / from.len() as f64).sqrt()
}

fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

/// Least-squares rigid fit (Kabsch): SVD of the cross-covariance with a
/// determinant guard against reflections.
fn fit_rigid(
    from: &[Point3<f64>],
    to: &[Point3<f64>],
) -> Result<RigidTransform, RegistrationError> {
    if from.len() < 3 {
        return Err(RegistrationError::DegenerateLandmarks(
            "rigid fit needs at least 3 landmark pairs",
        ));
    }
    let cf = centroid(from);
    let ct = centroid(to);

    let mut h = Matrix3::zeros();
    for (f, t) in from.iter().zip(to) {
        h += (f - cf) * (t - ct).transpose();
    }

    let svd = h.svd(true, true);
    // Collinear or duplicate landmark sets leave the rotation underdetermined.
    if svd.singular_values[1] < 1e-9 {
        return Err(RegistrationError::DegenerateLandmarks(
            "landmarks are collinear or coincident",
        ));
    }
    let u = svd
        .u
        .ok_or(RegistrationError::DegenerateLandmarks("SVD did not converge"))?;
    let v_t = svd
        .v_t
        .ok_or(RegistrationError::DegenerateLandmarks("SVD did not converge"))?;

    let v = v_t.transpose();
    let u_t = u.transpose();
    let mut d = Matrix3::identity();
    if (v * u_t).determinant() < 0.0 {
        d[(2, 2)] = -1.0;
    }
    let r = v * d * u_t;
    let rotation = Rotation3::from_matrix_unchecked(r);
    let translation = ct.coords - r * cf.coords;

    Ok(RigidTransform {
        rotation,
        translation,
    })
}

/// Affine least squares: solves the overdetermined [p | 1] * W = q system
/// through SVD and inverts the linear part up front.
fn fit_affine(
    from: &[Point3<f64>],
    to: &[Point3<f64>],
) -> Result<AffineTransform, RegistrationError> {
    if from.len() < 4 {
        return Err(RegistrationError::DegenerateLandmarks(
            "affine fit needs at least 4 landmark pairs",
        ));
    }
    let n = from.len();
    let mut x = DMatrix::zeros(n, 4);
    let mut y = DMatrix::zeros(n, 3);
    for (i, (f, t)) in from.iter().zip(to).enumerate() {
        x[(i, 0)] = f.x;
        x[(i, 1)] = f.y;
        x[(i, 2)] = f.z;
        x[(i, 3)] = 1.0;
        y[(i, 0)] = t.x;
        y[(i, 1)] = t.y;
        y[(i, 2)] = t.z;
    }

    let svd = x.svd(true, true);
    let w = svd.solve(&y, 1e-12).map_err(|_| {
        RegistrationError::DegenerateLandmarks("affine system is rank deficient")
    })?;

    let mut linear = Matrix3::zeros();
    let mut translation = Vector3::zeros();
    for d in 0..3 {
        for c in 0..3 {
            linear[(d, c)] = w[(c, d)];
        }
        translation[d] = w[(3, d)];
    }
    let inverse_linear = linear
        .try_inverse()
        .ok_or(RegistrationError::SingularTransform)?;

    Ok(AffineTransform {
        linear,
        translation,
        inverse_linear,
    })
}

/// One direction of the thin-plate-spline fit: the classic bordered kernel
/// system with the r kernel (3D biharmonic), solved by LU. Exact at the
/// landmarks, so the residual is near-zero by construction.
fn fit_tps(from: &[Point3<f64>], to: &[Point3<f64>]) -> Result<TpsFit, RegistrationError> {
    let n = from.len();
    if n < 4 {
        return Err(RegistrationError::DegenerateLandmarks(
            "thin-plate-spline fit needs at least 4 landmark pairs",
        ));
    }

    let mut l = DMatrix::zeros(n + 4, n + 4);
    for i in 0..n {
        for j in 0..n {
            l[(i, j)] = (from[i] - from[j]).norm();
        }
        l[(i, n)] = 1.0;
        l[(i, n + 1)] = from[i].x;
        l[(i, n + 2)] = from[i].y;
        l[(i, n + 3)] = from[i].z;
        l[(n, i)] = 1.0;
        l[(n + 1, i)] = from[i].x;
        l[(n + 2, i)] = from[i].y;
        l[(n + 3, i)] = from[i].z;
    }

    let mut b = DMatrix::zeros(n + 4, 3);
    for (i, t) in to.iter().enumerate() {
        b[(i, 0)] = t.x;
        b[(i, 1)] = t.y;
        b[(i, 2)] = t.z;
    }

    let weights = l.lu().solve(&b).ok_or(
        RegistrationError::DegenerateLandmarks("thin-plate-spline system is singular"),
    )?;

    Ok(TpsFit {
        centers: from.to_vec(),
        weights,
    })
}
