//! Session layer: activations, the agenda with its focus stack, and the
//! firing driver that runs host actions against working memory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod activation;
pub mod agenda;
pub mod effect;
pub mod session;

pub use activation::{Activation, ActivationId, ActivationState};
pub use agenda::Agenda;
pub use effect::EffectRecord;
pub use session::{Firing, Session, SessionConfig};
