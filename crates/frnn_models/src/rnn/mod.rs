//! Recurrent cells and the stacked encoder.

mod encoder;
mod gru;
mod lstm;
mod simple;

pub use encoder::{Encoder, EncoderConfig, RecurrentLayer};
pub use gru::GruCell;
pub use lstm::{LstmCell, Peepholes, FORGET_BIAS};
pub use simple::SimpleRnnCell;
