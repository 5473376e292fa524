mod controller;
mod progress;

pub use controller::{ControllerState, NextStep, SessionController, SubmitOutcome};
pub use progress::SessionProgress;
