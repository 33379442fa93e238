pub mod correspondence;
pub mod point_buffer;
pub mod registrar;
pub mod transform;

pub use correspondence::{find_correspondences, PointPair};
pub use point_buffer::RegistrationPointBuffer;
pub use registrar::Registrar;
pub use transform::{
    fit_landmarks, FittedTransform, RegistrationContext, RegistrationResult, TransformKind,
};
