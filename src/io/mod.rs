//! Curve file reading and writing.

pub mod dat;

pub use dat::{load_dat, parse_dat, save_dat, write_dat, CurveHeader};
