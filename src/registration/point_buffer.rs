use nalgebra::Point3;

use super::correspondence::PointPair;
use crate::config::RegistrationConfig;

/// Bounded ring of accepted fiducial pairs.
///
/// The "from" and "to" sequences stay index-aligned and share one circular
/// write cursor. Once full, new pairs overwrite oldest-first; the buffer is
/// a ring, not a growing log, which bounds fit cost and biases the fit
/// toward recent geometry.
#[derive(Debug, Clone)]
pub struct RegistrationPointBuffer {
    capacity: usize,
    max_time_difference: f64,
    min_interval: f64,
    min_num_fiducials: usize,
    from_points: Vec<Point3<f64>>,
    to_points: Vec<Point3<f64>>,
    cursor: usize,
    last_accept_from: Option<f64>,
    last_accept_to: Option<f64>,
    last_coil_counts: Option<(usize, usize)>,
}

impl RegistrationPointBuffer {
    pub fn new(config: &RegistrationConfig) -> Self {
        RegistrationPointBuffer {
            capacity: config.buffer_capacity.max(1),
            max_time_difference: config.max_time_difference,
            min_interval: config.min_interval,
            min_num_fiducials: config.min_num_fiducials,
            from_points: Vec::new(),
            to_points: Vec::new(),
            cursor: 0,
            last_accept_from: None,
            last_accept_to: None,
            last_coil_counts: None,
        }
    }

    /// Offers one collection of pairs sampled at curve timestamps
    /// `ts_from` / `ts_to` with the given active-coil counts.
    ///
    /// Admission requires the time-skew gate and the rate gate to pass; a
    /// change in either coil count since the previous offer forces
    /// acceptance regardless (topology changes must be captured at once).
    pub fn offer(
        &mut self,
        pairs: &[PointPair],
        ts_from: f64,
        ts_to: f64,
        coil_counts: (usize, usize),
    ) -> bool {
        let counts_changed = self
            .last_coil_counts
            .map_or(false, |previous| previous != coil_counts);
        self.last_coil_counts = Some(coil_counts);

        if pairs.is_empty() {
            return false;
        }

        if !counts_changed {
            // Gate 1: the two curves must describe (nearly) the same instant.
            if (ts_from - ts_to).abs() > self.max_time_difference {
                return false;
            }
            // Gate 2: at least one curve advanced since the last accepted
            // collection; throttles near-duplicate samples during
            // high-frequency streaming.
            if let (Some(lf), Some(lt)) = (self.last_accept_from, self.last_accept_to) {
                if ts_from - lf < self.min_interval && ts_to - lt < self.min_interval {
                    return false;
                }
            }
        }

        for pair in pairs {
            self.push(pair);
        }
        self.last_accept_from = Some(ts_from);
        self.last_accept_to = Some(ts_to);
        true
    }

    fn push(&mut self, pair: &PointPair) {
        if self.from_points.len() < self.capacity {
            self.from_points.push(pair.from);
            self.to_points.push(pair.to);
        } else {
            self.from_points[self.cursor] = pair.from;
            self.to_points[self.cursor] = pair.to;
            self.cursor = (self.cursor + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.from_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_points.is_empty()
    }

    /// Enough samples accumulated for a (re-)registration run.
    pub fn is_ready(&self) -> bool {
        self.from_points.len() > self.min_num_fiducials
    }

    pub fn from_points(&self) -> &[Point3<f64>] {
        &self.from_points
    }

    pub fn to_points(&self) -> &[Point3<f64>] {
        &self.to_points
    }

    pub fn clear(&mut self) {
        self.from_points.clear();
        self.to_points.clear();
        self.cursor = 0;
        self.last_accept_from = None;
        self.last_accept_to = None;
        self.last_coil_counts = None;
    }
}
