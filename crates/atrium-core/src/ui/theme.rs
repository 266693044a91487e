use serde::{Deserialize, Serialize};

/// Name under which hosts publish their [`Theme`] to delivered modules.
pub const THEME_DEPENDENCY: &str = "atrium-theme";

/// The dashboard's design tokens.
///
/// Published once by the host through the shared-dependency broker so
/// delivered modules style themselves like bundled ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub accent: String,
    pub dark: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "atrium-light".to_string(),
            accent: "#2f7d5b".to_string(),
            dark: false,
        }
    }
}
