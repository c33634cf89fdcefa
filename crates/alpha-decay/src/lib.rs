//! Alpha Decay Detector
//!
//! Flags indicators whose correlation with forward returns is trending down,
//! i.e. indicators losing predictive power as markets evolve.

pub mod detector;
pub mod regression;

pub use detector::{
    forward_returns, AlphaDecayDetector, DecayConfig, DecayRecommendation, DecayReport,
};
pub use regression::{linregress, LinearFit};
