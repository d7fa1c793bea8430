pub mod state;

pub use state::{SamplerSettings, SamplerSource, Settings, SettingsError, SettingsStore};
