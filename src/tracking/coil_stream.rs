use log::warn;
use nalgebra::Point3;

/// Physical coil slots per catheter.
pub const MAX_COILS: usize = 8;

/// One stabilized coil position as delivered by the tracking source.
/// `modified_time` is the source's monotonic per-transform counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoilSample {
    pub coil: usize,
    pub position: Point3<f64>,
    pub modified_time: u64,
}

/// One tracking event for one catheter. Not every coil is present in every
/// frame; the stream keeps the last known sample per coil.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingFrame {
    pub timestamp: f64,
    pub samples: Vec<CoilSample>,
}

impl TrackingFrame {
    pub fn new(timestamp: f64) -> Self {
        TrackingFrame {
            timestamp,
            samples: Vec::new(),
        }
    }

    pub fn with_sample(mut self, coil: usize, position: Point3<f64>, modified_time: u64) -> Self {
        self.samples.push(CoilSample {
            coil,
            position,
            modified_time,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CoilChannel {
    position: Point3<f64>,
    modified_time: u64,
}

/// Per-catheter adapter over the incoming coil transform stream.
///
/// Holds the latest stabilized position per coil slot and detects whether a
/// frame actually advanced any transform. GUI refreshes re-deliver unchanged
/// frames; those must not count as updates.
#[derive(Debug, Clone, Default)]
pub struct CoilStream {
    channels: [Option<CoilChannel>; MAX_COILS],
}

impl CoilStream {
    pub fn new() -> Self {
        CoilStream::default()
    }

    /// Ingests one frame. Returns true if at least one coil's
    /// `modified_time` strictly increased (or a coil was seen for the
    /// first time); stale and duplicate samples are ignored.
    pub fn ingest(&mut self, frame: &TrackingFrame) -> bool {
        let mut advanced = false;
        for sample in &frame.samples {
            if sample.coil >= MAX_COILS {
                warn!(
                    "dropping sample for coil {} (only {} slots)",
                    sample.coil, MAX_COILS
                );
                continue;
            }
            match &mut self.channels[sample.coil] {
                Some(channel) => {
                    if sample.modified_time > channel.modified_time {
                        channel.position = sample.position;
                        channel.modified_time = sample.modified_time;
                        advanced = true;
                    }
                }
                slot @ None => {
                    *slot = Some(CoilChannel {
                        position: sample.position,
                        modified_time: sample.modified_time,
                    });
                    advanced = true;
                }
            }
        }
        advanced
    }

    /// Last known stabilized position for a coil slot, if any sample was
    /// ever received for it.
    pub fn position(&self, coil: usize) -> Option<Point3<f64>> {
        self.channels.get(coil).copied().flatten().map(|c| c.position)
    }

    pub fn has_sample(&self, coil: usize) -> bool {
        self.channels.get(coil).map_or(false, |c| c.is_some())
    }

    pub fn clear(&mut self) {
        self.channels = [None; MAX_COILS];
    }
}
