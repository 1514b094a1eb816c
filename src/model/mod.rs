//! Live NBA win-probability model.
//!
//! Four factors (time-adjusted lead, pre-game spread, live shooting
//! efficiency, possession edge) are squashed to [-1, 1], blended with
//! dynamic weights and passed through a logistic curve. A garbage-time
//! override, confidence tiers and trailing-edge / underdog alerts sit on top.

pub mod clock;
pub mod combiner;
pub mod confidence;
pub mod factors;
pub mod predictor;
pub mod settings;
pub mod trailing;
pub mod types;
pub mod underdog;
pub mod weights;

pub use predictor::{evaluate, Evaluation, EvaluationInput};
pub use settings::ModelConfig;
