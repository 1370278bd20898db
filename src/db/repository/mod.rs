//! Repository layer: one sub-module per persisted table.
//!
//! All public functions are re-exported here.

mod chat_message;
mod disease_prediction;
mod symptom_check;
mod treatment_info;

pub use chat_message::*;
pub use disease_prediction::*;
pub use symptom_check::*;
pub use treatment_info::*;
