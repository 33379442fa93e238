use log::{info, warn};

use super::correspondence::PointPair;
use super::point_buffer::RegistrationPointBuffer;
use super::transform::{fit_landmarks, RegistrationContext, RegistrationResult, TransformKind};
use crate::config::RegistrationConfig;
use crate::errors::RegistrationError;

/// Owns the fiducial buffer and the current inter-tracker transform.
///
/// Collects correspondence pairs through the buffer's admission gates and
/// runs landmark fits on demand or, with auto-update enabled, whenever the
/// buffer turns ready. A failed fit never degrades the state: the previous
/// transform stays active until a fit succeeds.
pub struct Registrar {
    kind: TransformKind,
    auto_update: bool,
    buffer: RegistrationPointBuffer,
    /// Catheter whose display geometry receives the inverse map.
    apply_target: Option<u32>,
    result: Option<RegistrationResult>,
}

impl Registrar {
    pub fn new(config: &RegistrationConfig) -> Self {
        Registrar {
            kind: config.kind,
            auto_update: config.auto_update,
            buffer: RegistrationPointBuffer::new(config),
            apply_target: None,
            result: None,
        }
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    /// Switches the fit strategy. Takes effect on the next fit; the current
    /// transform stays active until then.
    pub fn set_kind(&mut self, kind: TransformKind) {
        self.kind = kind;
    }

    pub fn set_auto_update(&mut self, enabled: bool) {
        self.auto_update = enabled;
    }

    pub fn apply_target(&self) -> Option<u32> {
        self.apply_target
    }

    /// Names the catheter whose display points are pulled through the
    /// inverse transform. `None` leaves all catheters in their raw frame.
    pub fn set_apply_target(&mut self, catheter_id: Option<u32>) {
        self.apply_target = catheter_id;
    }

    pub fn result(&self) -> Option<&RegistrationResult> {
        self.result.as_ref()
    }

    pub fn buffer(&self) -> &RegistrationPointBuffer {
        &self.buffer
    }

    /// Offers one collection of correspondence pairs to the fiducial buffer.
    /// Returns true if the buffer admitted them.
    pub fn collect(
        &mut self,
        pairs: &[PointPair],
        ts_from: f64,
        ts_to: f64,
        coil_counts: (usize, usize),
    ) -> bool {
        self.buffer.offer(pairs, ts_from, ts_to, coil_counts)
    }

    pub fn is_ready(&self) -> bool {
        self.buffer.is_ready()
    }

    /// Fits the configured transform to the buffered fiducials. On success
    /// the previous result is replaced wholesale; on failure it is kept and
    /// the error returned to the caller.
    pub fn fit(&mut self) -> Result<&RegistrationResult, RegistrationError> {
        let result = fit_landmarks(self.kind, self.buffer.from_points(), self.buffer.to_points())?;
        info!(
            "registration fit ({:?}) over {} fiducials, FRE {:.3} mm",
            result.kind,
            self.buffer.len(),
            result.fre
        );
        Ok(&*self.result.insert(result))
    }

    /// Auto-update hook, run after each accepted collection. Fit failures
    /// are logged, not propagated; the loop must keep running.
    pub fn refit_if_ready(&mut self) {
        if !self.auto_update || !self.buffer.is_ready() {
            return;
        }
        if let Err(e) = self.fit() {
            warn!("auto registration fit failed, keeping previous transform: {}", e);
        }
    }

    /// Snapshot of the current transform for one tracking tick.
    pub fn context(&self) -> RegistrationContext {
        RegistrationContext {
            target: self.apply_target,
            transform: self.result.as_ref().map(|r| r.transform.clone()),
        }
    }

    /// Drops the buffered fiducials and their gating state. The fitted
    /// transform survives; only a new successful fit replaces it.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    pub fn clear_transform(&mut self) {
        self.result = None;
    }
}

#[cfg(test)]
mod registrar_tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Rotation3, Unit, Vector3};

    fn rigid_truth() -> (Rotation3<f64>, Vector3<f64>) {
        let axis = Unit::new_normalize(Vector3::new(0.3, -1.0, 0.6));
        (
            Rotation3::from_axis_angle(&axis, 0.4),
            Vector3::new(-8.0, 4.0, 11.0),
        )
    }

    fn scattered(i: usize) -> Point3<f64> {
        // Deterministic non-degenerate spread
        let f = i as f64;
        Point3::new(
            3.0 * f - 7.0,
            (f * 2.7).sin() * 20.0,
            (f * 1.3).cos() * 15.0 + f,
        )
    }

    fn fill_ready(registrar: &mut Registrar) {
        let (rotation, translation) = rigid_truth();
        for i in 0..12 {
            let from = scattered(i);
            let to = rotation * from + translation;
            let t = i as f64 * 2.0;
            assert!(registrar.collect(&[PointPair { from, to }], t, t, (4, 4)));
        }
    }

    #[test]
    fn test_fit_recovers_buffered_rigid_motion() {
        let mut registrar = Registrar::new(&RegistrationConfig::default());
        fill_ready(&mut registrar);
        assert!(registrar.is_ready());

        let result = registrar.fit().unwrap();
        assert_relative_eq!(result.fre, 0.0, epsilon = 1e-9);

        let (rotation, translation) = rigid_truth();
        let p = Point3::new(1.0, -2.0, 5.0);
        assert_relative_eq!(
            result.transform.transform_point(&p),
            rotation * p + translation,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_failed_fit_keeps_previous_transform() {
        let mut registrar = Registrar::new(&RegistrationConfig::default());
        fill_ready(&mut registrar);
        let before = registrar.fit().unwrap().clone();

        // Refill with collinear points so the next fit must fail.
        registrar.clear_buffer();
        for i in 0..12 {
            let f = i as f64;
            let pair = PointPair {
                from: Point3::new(f, 0.0, 0.0),
                to: Point3::new(0.0, f, 0.0),
            };
            let t = 100.0 + f * 2.0;
            registrar.collect(&[pair], t, t, (4, 4));
        }
        assert!(registrar.fit().is_err());
        assert_eq!(registrar.result(), Some(&before));
    }

    #[test]
    fn test_auto_update_refits_when_ready() {
        let mut registrar = Registrar::new(&RegistrationConfig {
            auto_update: true,
            ..Default::default()
        });
        registrar.refit_if_ready();
        assert!(registrar.result().is_none(), "empty buffer must not fit");

        fill_ready(&mut registrar);
        registrar.refit_if_ready();
        assert!(registrar.result().is_some());
    }

    #[test]
    fn test_context_snapshot_carries_target() {
        let mut registrar = Registrar::new(&RegistrationConfig::default());
        fill_ready(&mut registrar);
        registrar.fit().unwrap();

        let ctx = registrar.context();
        assert!(ctx.target.is_none());

        registrar.set_apply_target(Some(7));
        let ctx = registrar.context();
        assert!(ctx.applies_to(7));
        assert!(!ctx.applies_to(3));
    }

    #[test]
    fn test_clear_buffer_preserves_transform() {
        let mut registrar = Registrar::new(&RegistrationConfig::default());
        fill_ready(&mut registrar);
        registrar.fit().unwrap();
        registrar.clear_buffer();
        assert!(registrar.buffer().is_empty());
        assert!(registrar.result().is_some());
    }
}
