/// Application name
pub const APP_NAME: &str = "Atrium";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the host API addons compile against
pub const HOST_API_VERSION: &str = "0.1.0";

/// Re-check interval of the registration wait, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 150;

/// Upper bound of the registration wait, in milliseconds
pub const DEFAULT_REGISTRATION_TIMEOUT_MS: u64 = 2000;

/// Props whose values reset faulted isolation boundaries
pub const DEFAULT_RESET_PROPS: &[&str] = &["entityId", "entityData"];

/// Shown for modules that registered without a main view
pub const NO_MAIN_VIEW_MESSAGE: &str = "module active, no main view";
