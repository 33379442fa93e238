pub mod output;

pub use output::{export_curve_csv, export_fiducials_csv};
