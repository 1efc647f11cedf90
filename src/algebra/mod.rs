//! Curve algebra: operations combining and transforming curves.
//!
//! Every operation that creates a curve stamps its provenance with the
//! operation and the identities of all inputs. Grid mismatches are errors
//! unless the caller passes `forced = true`.

pub mod average;
pub mod difference;
pub mod grid;
pub mod interpolate;
pub mod merge;
pub mod smooth;
pub mod subtract;
pub mod superimpose;

pub use average::{average, weighted_average, WeightConfig};
pub use difference::{absolute_difference, relative_difference, relative_series};
pub use interpolate::interpolate_to_fit;
pub use merge::merge;
pub use smooth::{savgol_filter, smooth, SmoothConfig};
pub use subtract::subtract;
pub use superimpose::{align, superimpose, ScaleFit};
