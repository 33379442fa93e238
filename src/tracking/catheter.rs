use log::warn;
use nalgebra::{Point3, Vector3};

use super::coil_stream::{CoilStream, MAX_COILS};
use super::curve::Curve;
use crate::config::CatheterConfig;
use crate::scene::NodeHandle;

/// One electromagnetically tracked catheter.
///
/// Owns the coil layout, the incoming stream adapter and the current curve.
/// `curve` holds display-frame points (registration correction applied when
/// active); `raw_points` caches the same geometry in the raw tracker frame,
/// indexed identically, so correspondence collection stays
/// transform-invariant.
#[derive(Debug, Clone)]
pub struct Catheter {
    pub id: u32,
    pub name: String,
    /// Distance of each coil slot from the tip, mm, ascending.
    pub coil_positions: [f64; MAX_COILS],
    pub active_coils: [bool; MAX_COILS],
    /// Coil numbering runs tip-to-base when true.
    pub tip_first: bool,
    /// Per-axis sign flips (±1) for the tracker frame convention.
    pub axis_directions: Vector3<f64>,
    pub color: [f64; 3],
    pub opacity: f64,
    pub radius: f64,
    pub tip_length: f64,
    pub cutoff_frequency: f64,
    /// Timestamp of the last frame that actually advanced a transform.
    pub last_ts: f64,
    pub stream: CoilStream,
    pub curve: Curve,
    pub(crate) raw_points: Vec<Point3<f64>>,
    pub curve_node: Option<NodeHandle>,
    pub tip_node: Option<NodeHandle>,
}

impl Catheter {
    pub fn from_config(id: u32, config: &CatheterConfig) -> Self {
        let config = config.clone().sanitized();
        let mut coil_positions = [0.0; MAX_COILS];
        coil_positions.copy_from_slice(&config.coil_positions);
        let mut active_coils = [false; MAX_COILS];
        active_coils.copy_from_slice(&config.active_coils);

        Catheter {
            id,
            name: config.name,
            coil_positions,
            active_coils,
            tip_first: config.tip_first,
            axis_directions: Vector3::new(
                config.axis_directions[0],
                config.axis_directions[1],
                config.axis_directions[2],
            ),
            color: config.color,
            opacity: config.opacity,
            radius: config.radius,
            tip_length: config.tip_length,
            cutoff_frequency: config.cutoff_frequency,
            last_ts: 0.0,
            stream: CoilStream::new(),
            curve: Curve::new(),
            raw_points: Vec::new(),
            curve_node: None,
            tip_node: None,
        }
    }

    pub fn active_coil_count(&self) -> usize {
        self.active_coils.iter().filter(|a| **a).count()
    }

    pub fn active_coil_indices(&self) -> Vec<usize> {
        (0..MAX_COILS).filter(|i| self.active_coils[*i]).collect()
    }

    /// Distances from the tip of the active coils, ascending. Coil slots
    /// are numbered by physical distance from the tip, so slot order is
    /// distance order.
    pub fn active_coil_distances(&self) -> Vec<f64> {
        self.active_coil_indices()
            .into_iter()
            .map(|i| self.coil_positions[i])
            .collect()
    }

    /// Raw tracker-frame points reordered tip-first, aligned index-for-index
    /// with `active_coil_distances()`.
    pub fn raw_points_tip_first(&self) -> Vec<Point3<f64>> {
        if self.tip_first {
            self.raw_points.clone()
        } else {
            self.raw_points.iter().rev().copied().collect()
        }
    }

    /// Reconfigures the active-coil mask. An all-false mask is accepted
    /// (catheter disappears until re-enabled); the next update performs a
    /// full curve rebuild.
    pub fn set_active_coils(&mut self, mask: [bool; MAX_COILS]) {
        self.active_coils = mask;
    }

    /// Replaces the coil layout; a non-ascending layout is rejected and the
    /// previous one kept, per the configuration-error policy.
    pub fn set_coil_positions(&mut self, positions: [f64; MAX_COILS]) {
        if positions.windows(2).any(|w| w[1] < w[0]) {
            warn!(
                "catheter '{}': rejected non-ascending coil positions",
                self.name
            );
            return;
        }
        self.coil_positions = positions;
    }

    pub(crate) fn apply_axis_signs(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::new(
            p.x * self.axis_directions.x,
            p.y * self.axis_directions.y,
            p.z * self.axis_directions.z,
        )
    }
}
