pub mod catheter;
pub mod coil_stream;
pub mod collection;
pub mod curve;
pub mod curve_builder;

pub use catheter::Catheter;
pub use coil_stream::{CoilSample, CoilStream, TrackingFrame, MAX_COILS};
pub use collection::{CatheterCollection, CollectionObserver};
pub use curve::{Curve, TipFrame};
pub use curve_builder::{update_catheter_curve, CurveUpdateResult};
