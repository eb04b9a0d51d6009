//! Forecasting model families.

mod config;
mod dense;
mod stacking;

pub use config::ModelConfig;
pub use dense::Seq2SeqDense;
pub use stacking::Stacking;
