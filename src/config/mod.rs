mod engine;
mod settings;
mod state;

pub use engine::ConfigEngine;
pub use settings::Settings;
pub use state::State;
