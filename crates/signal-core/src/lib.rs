//! Shared building blocks for the signal engine: the indicator/system data
//! model, the error type, time-series alignment and the statistics every
//! analyzer leans on.

pub mod error;
pub mod series;
pub mod stats;
pub mod traits;
pub mod types;

pub use error::*;
pub use series::*;
pub use traits::*;
pub use types::*;
