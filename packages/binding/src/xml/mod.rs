//! XML utilities for reading parsed trees and writing escaped output.

mod utils;

pub use utils::*;
