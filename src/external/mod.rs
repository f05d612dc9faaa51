pub mod dspice;
pub mod records;

pub use dspice::*;
