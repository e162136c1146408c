pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use paths::AppPaths;
pub use service::{redact_sensitive_values, settings_from_value, ConfigError, ConfigService};
pub use settings::Settings;
