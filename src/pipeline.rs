use log::{debug, warn};

use crate::config::{CatheterConfig, SessionConfig};
use crate::registration::correspondence::find_correspondences;
use crate::registration::registrar::Registrar;
use crate::scene::SceneRepository;
use crate::tracking::catheter::Catheter;
use crate::tracking::coil_stream::TrackingFrame;
use crate::tracking::collection::CatheterCollection;
use crate::tracking::curve::TipFrame;
use crate::tracking::curve_builder::update_catheter_curve;

/// Drives the per-frame update loop: stream ingest, curve rebuild,
/// correspondence collection, registration refits and scene pushes.
///
/// Everything runs synchronously on the caller's thread. Ticks arriving
/// while one is in flight (observer re-entry from a scene write) are
/// dropped, not queued.
pub struct TrackingSession<R: SceneRepository> {
    pub scene: R,
    pub catheters: CatheterCollection,
    pub registrar: Registrar,
    /// Co-registered catheter pair, ("from" id, "to" id). Correspondences
    /// map the from-catheter's tracker frame onto the to-catheter's.
    link: Option<(u32, u32)>,
    in_tick: bool,
}

impl<R: SceneRepository> TrackingSession<R> {
    pub fn new(scene: R, config: &SessionConfig) -> Self {
        let mut catheters = CatheterCollection::new();
        for catheter_config in &config.catheters {
            catheters.add(catheter_config);
        }
        TrackingSession {
            scene,
            catheters,
            registrar: Registrar::new(&config.registration),
            link: None,
            in_tick: false,
        }
    }

    pub fn add_catheter(&mut self, config: &CatheterConfig) -> u32 {
        self.catheters.add(config)
    }

    /// Removes a catheter and its scene nodes. A removed catheter also
    /// dissolves any link it participated in.
    pub fn remove_catheter(&mut self, id: u32) {
        if let Some(catheter) = self.catheters.remove_by_id(id) {
            if let Some(node) = catheter.curve_node {
                self.scene.remove_node(node);
            }
            if let Some(node) = catheter.tip_node {
                self.scene.remove_node(node);
            }
        }
        if matches!(self.link, Some((a, b)) if a == id || b == id) {
            self.link = None;
        }
    }

    /// Declares the co-registered pair. Fiducials flow from `from_id`'s
    /// tracker frame to `to_id`'s; which catheter's display is corrected is
    /// chosen separately through the registrar's apply target.
    pub fn set_link(&mut self, from_id: u32, to_id: u32) {
        if from_id == to_id {
            warn!("ignoring registration link of catheter {} to itself", from_id);
            return;
        }
        self.link = Some((from_id, to_id));
    }

    pub fn link(&self) -> Option<(u32, u32)> {
        self.link
    }

    pub fn clear_link(&mut self) {
        self.link = None;
    }

    /// One tracking tick for one catheter. Safe to call at stream rate; all
    /// internal failures are logged and swallowed so the loop keeps running.
    pub fn on_tracking_update(&mut self, catheter_id: u32, frame: &TrackingFrame) {
        if self.in_tick {
            debug!("dropping re-entrant tracking tick for catheter {}", catheter_id);
            return;
        }
        self.in_tick = true;
        self.tick(catheter_id, frame);
        self.in_tick = false;
    }

    fn tick(&mut self, catheter_id: u32, frame: &TrackingFrame) {
        // The transform snapshot is taken once per tick; a refit later in
        // this same tick becomes visible on the next one.
        let ctx = self.registrar.context();

        let catheter = match self.catheters.by_id_mut(catheter_id) {
            Some(c) => c,
            None => {
                warn!("tracking update for unknown catheter {}", catheter_id);
                return;
            }
        };

        let result = update_catheter_curve(catheter, frame, &ctx);
        if !result.geometry_changed {
            return;
        }
        self.collect_fiducials(catheter_id);
        self.push_to_scene(catheter_id, result.tip);
    }

    /// Runs coil correspondence over the linked pair and offers the result
    /// to the registration buffer, refitting when auto-update allows.
    fn collect_fiducials(&mut self, updated_id: u32) {
        let (from_id, to_id) = match self.link {
            Some(link) if link.0 == updated_id || link.1 == updated_id => link,
            _ => return,
        };
        let (from, to) = match (self.catheters.by_id(from_id), self.catheters.by_id(to_id)) {
            (Some(f), Some(t)) => (f, t),
            _ => {
                warn!("registration link references a removed catheter, clearing it");
                self.link = None;
                return;
            }
        };
        if from.raw_points.is_empty() || to.raw_points.is_empty() {
            return;
        }

        let pairs = match find_correspondences(
            &from.raw_points_tip_first(),
            &from.active_coil_distances(),
            &to.raw_points_tip_first(),
            &to.active_coil_distances(),
        ) {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!("coil correspondence failed: {}", e);
                return;
            }
        };

        let accepted = self.registrar.collect(
            &pairs,
            from.last_ts,
            to.last_ts,
            (from.active_coil_count(), to.active_coil_count()),
        );
        if accepted {
            self.registrar.refit_if_ready();
        }
    }

    /// Pushes the display curve and tip frame into the host scene, creating
    /// the nodes lazily on first use.
    fn push_to_scene(&mut self, catheter_id: u32, tip: Option<TipFrame>) {
        let catheter = match self.catheters.by_id_mut(catheter_id) {
            Some(c) => c,
            None => return,
        };
        if catheter.curve.is_empty() {
            return;
        }

        let curve_node = match catheter.curve_node {
            Some(node) => node,
            None => {
                let node = self.scene.create_node(&format!("{} curve", catheter.name));
                catheter.curve_node = Some(node);
                node
            }
        };
        self.scene.set_curve_points(curve_node, catheter.curve.points());

        if let Some(tip) = tip {
            let tip_node = match catheter.tip_node {
                Some(node) => node,
                None => {
                    let node = self.scene.create_node(&format!("{} tip", catheter.name));
                    catheter.tip_node = Some(node);
                    node
                }
            };
            self.scene.set_tip_frame(tip_node, &tip);
        }
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use crate::config::RegistrationConfig;
    use crate::scene::InMemoryScene;
    use crate::tracking::coil_stream::MAX_COILS;
    use crate::utils::test_utils::bent_catheter_points;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn four_coil_config(name: &str) -> CatheterConfig {
        let mut active_coils = vec![false; MAX_COILS];
        for slot in active_coils.iter_mut().take(4) {
            *slot = true;
        }
        CatheterConfig {
            name: name.to_string(),
            active_coils,
            ..Default::default()
        }
    }

    fn session() -> TrackingSession<InMemoryScene> {
        let config = SessionConfig {
            catheters: vec![four_coil_config("ablation"), four_coil_config("lasso")],
            registration: RegistrationConfig {
                auto_update: true,
                ..Default::default()
            },
        };
        TrackingSession::new(InMemoryScene::new(), &config)
    }

    fn frame_at(t: f64, counter: u64, offset: Vector3<f64>) -> TrackingFrame {
        let distances: Vec<f64> = (0..4).map(|coil| 5.0 + 10.0 * coil as f64).collect();
        let mut frame = TrackingFrame::new(t);
        for (coil, p) in bent_catheter_points(&distances).into_iter().enumerate() {
            frame = frame.with_sample(coil, p + offset, counter);
        }
        frame
    }

    #[test]
    fn test_tick_pushes_curve_and_tip_to_scene() {
        let mut session = session();
        session.on_tracking_update(0, &frame_at(1.0, 1, Vector3::zeros()));

        let catheter = session.catheters.by_id(0).unwrap();
        let curve_node = catheter.curve_node.expect("curve node created lazily");
        assert_eq!(session.scene.curves[&curve_node].len(), 4);
        assert!(catheter.tip_node.is_some());
    }

    #[test]
    fn test_unknown_catheter_is_ignored() {
        let mut session = session();
        session.on_tracking_update(99, &frame_at(1.0, 1, Vector3::zeros()));
        assert!(session.scene.curves.is_empty());
    }

    #[test]
    fn test_re_entrant_tick_is_dropped() {
        let mut session = session();
        session.in_tick = true;
        session.on_tracking_update(0, &frame_at(1.0, 1, Vector3::zeros()));
        assert!(session.catheters.by_id(0).unwrap().curve.is_empty());
        session.in_tick = false;
        session.on_tracking_update(0, &frame_at(1.0, 1, Vector3::zeros()));
        assert_eq!(session.catheters.by_id(0).unwrap().curve.point_count(), 4);
    }

    #[test]
    fn test_linked_pair_registers_and_corrects_display() {
        let mut session = session();
        session.set_link(0, 1);
        session.registrar.set_apply_target(Some(1));

        // Tracker B reports the same physical catheter shifted by a constant
        // offset, a pure translation between the two tracker frames. The
        // catheter drifts between ticks so every tick changes geometry and
        // feeds the fiducial buffer.
        let offset = Vector3::new(30.0, -10.0, 5.0);
        let drift_at = |counter: u64| {
            Vector3::new(
                0.4 * counter as f64,
                -0.2 * counter as f64,
                0.3 * counter as f64,
            )
        };
        let mut t = 0.0;
        for counter in 1..20u64 {
            let drift = drift_at(counter);
            session.on_tracking_update(0, &frame_at(t, counter, drift));
            session.on_tracking_update(1, &frame_at(t, counter, drift + offset));
            t += 2.0;
        }

        let result = session
            .registrar
            .result()
            .expect("auto-update fit after enough accepted collections");
        assert_relative_eq!(result.fre, 0.0, epsilon = 1e-6);

        // The corrected display of catheter 1 coincides with catheter 0.
        let a = session.catheters.by_id(0).unwrap();
        let b = session.catheters.by_id(1).unwrap();
        for (pa, pb) in a.curve.points().iter().zip(b.curve.points()) {
            assert_relative_eq!(*pa, *pb, epsilon = 1e-6);
        }
        // Raw cache still holds tracker-frame coordinates.
        assert_relative_eq!(
            b.raw_points[0],
            bent_catheter_points(&[5.0])[0] + drift_at(19) + offset,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_removing_linked_catheter_clears_link_and_nodes() {
        let mut session = session();
        session.set_link(0, 1);
        session.on_tracking_update(0, &frame_at(1.0, 1, Vector3::zeros()));
        assert!(!session.scene.curves.is_empty());

        session.remove_catheter(0);
        assert!(session.link().is_none());
        assert!(session.scene.curves.is_empty());
    }

    #[test]
    fn test_self_link_rejected() {
        let mut session = session();
        session.set_link(1, 1);
        assert!(session.link().is_none());
    }
}
