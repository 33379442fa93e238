//! Core of an electromagnetically tracked catheter visualization plugin.
//!
//! Builds per-catheter curves from streamed coil transforms, extrapolates
//! the tip, pairs coils across two tracking systems by arc length and fits
//! the inter-tracker registration (rigid, affine or thin-plate-spline).
//! The host application supplies the scene through [`scene::SceneRepository`]
//! and drives [`pipeline::TrackingSession`] from its tracking callbacks.

pub mod config;
pub mod errors;
pub mod io;
pub mod pipeline;
pub mod registration;
pub mod scene;
pub mod tracking;
pub mod utils;

pub use config::{CatheterConfig, RegistrationConfig, SessionConfig};
pub use pipeline::TrackingSession;
pub use registration::{Registrar, RegistrationResult, TransformKind};
pub use scene::{InMemoryScene, SceneRepository};
pub use tracking::{Catheter, CatheterCollection, TrackingFrame};
