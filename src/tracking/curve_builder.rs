use log::debug;

use super::catheter::Catheter;
use super::coil_stream::TrackingFrame;
use super::curve::{Curve, TipFrame};
use crate::registration::transform::RegistrationContext;

/// Outcome of one curve update tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveUpdateResult {
    /// The point-set geometry actually moved. Consumers (e.g. the
    /// distance-gated point recorder) use this to decide whether to log.
    pub geometry_changed: bool,
    /// The control-point set was dropped and recreated because the active
    /// coil count changed.
    pub rebuilt: bool,
    pub tip: Option<TipFrame>,
}

impl CurveUpdateResult {
    fn unchanged() -> Self {
        CurveUpdateResult {
            geometry_changed: false,
            rebuilt: false,
            tip: None,
        }
    }
}

/// Rebuilds or updates a catheter's curve from its coil stream.
///
/// Placement order follows the coil numbering: with tip-first numbering the
/// i-th active coil lands at curve index i, otherwise at index N-1-i. Axis
/// sign flips are applied before writing. When `ctx` targets this catheter
/// the display points additionally go through the inverse registration
/// transform; the raw tracker-frame cache is always written unmapped.
pub fn update_catheter_curve(
    catheter: &mut Catheter,
    frame: &TrackingFrame,
    ctx: &RegistrationContext,
) -> CurveUpdateResult {
    // Monotonic dedup: a frame that advanced nothing is a re-delivery
    // (GUI refresh) and must not touch last_ts or the geometry.
    if !catheter.stream.ingest(frame) {
        return CurveUpdateResult::unchanged();
    }
    catheter.last_ts = frame.timestamp;

    let active = catheter.active_coil_indices();
    let n = active.len();

    // Partial stream: wait until every active coil has reported at least
    // once before building any geometry.
    if let Some(missing) = active.iter().find(|i| !catheter.stream.has_sample(**i)) {
        debug!(
            "catheter '{}': no sample yet for active coil {}, skipping tick",
            catheter.name, missing
        );
        return CurveUpdateResult::unchanged();
    }

    // Active-count change: full reset, never partial diffing.
    let rebuilt = catheter.curve.point_count() != n;
    if rebuilt {
        catheter.curve.reset(n);
        catheter.raw_points.clear();
        catheter.raw_points.resize(n, nalgebra::Point3::origin());
    }

    let mut geometry_changed = rebuilt;
    for (slot, coil) in active.iter().enumerate() {
        let stabilized = match catheter.stream.position(*coil) {
            Some(p) => p,
            None => continue, // checked above
        };
        let raw = catheter.apply_axis_signs(&stabilized);
        let display = ctx.map_for(catheter.id, &raw);

        let index = if catheter.tip_first { slot } else { n - 1 - slot };
        if catheter.curve.point(index) != Some(&display) {
            geometry_changed = true;
        }
        catheter.raw_points[index] = raw;
        catheter.curve.set_point(index, display);
    }

    let tip = if catheter.tip_first {
        TipFrame::from_curve(&catheter.curve, catheter.tip_length)
    } else {
        // Base-first curves carry the tip at the highest index; reuse the
        // tip-first math on a reversed view.
        let mut reversed = Curve::new();
        reversed.reset(n);
        for (i, p) in catheter.curve.points().iter().rev().enumerate() {
            reversed.set_point(i, *p);
        }
        TipFrame::from_curve(&reversed, catheter.tip_length)
    };

    CurveUpdateResult {
        geometry_changed,
        rebuilt,
        tip,
    }
}
