//! Configuration management for npmdesc-lsp

use serde::Deserialize;

use crate::auth;
use crate::registries::npm::DEFAULT_REGISTRY_URL;

/// Section name used by clients that namespace their settings
pub const SETTINGS_SECTION: &str = crate::parsers::EXTENSION_ID;

/// Default hover debounce in milliseconds
const DEFAULT_SHOW_DELAY_MS: u64 = 600;

/// LSP configuration, read from initialization options and
/// `workspace/didChangeConfiguration`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Show the popover on hover (text markers) instead of click (badges)
    pub show_tooltip_with_mouse_event: bool,
    /// Hover debounce in milliseconds, at least 1. Validated and logged
    /// here; the client applies it to its popovers.
    pub show_delay: u64,
    /// Passed through for the client, which owns popover dismissal
    pub hide_tooltip_on_outside_click: bool,
    /// Bearer token for private registries, may reference an environment
    /// variable as `${VAR}` or `$VAR`
    pub npm_token: Option<String>,
    /// Registry base URL
    pub registry_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_tooltip_with_mouse_event: false,
            show_delay: DEFAULT_SHOW_DELAY_MS,
            hide_tooltip_on_outside_click: true,
            npm_token: None,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from initialization options
    pub fn from_init_options(options: Option<serde_json::Value>) -> Self {
        let config: Self = match options {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid configuration: {}", e);
                Self::default()
            }),
            None => Self::default(),
        };
        config.normalized()
    }

    /// Parse a `didChangeConfiguration` payload, which clients send either
    /// bare or nested under the server's section name
    pub fn from_settings(settings: serde_json::Value) -> Self {
        match settings {
            serde_json::Value::Object(mut map) if map.contains_key(SETTINGS_SECTION) => {
                Self::from_init_options(map.remove(SETTINGS_SECTION))
            }
            other => Self::from_init_options(Some(other)),
        }
    }

    fn normalized(mut self) -> Self {
        if self.show_delay < 1 {
            tracing::warn!("showDelay must be at least 1, using 1");
            self.show_delay = 1;
        }
        self
    }

    /// Token to attach to registry requests, with environment references
    /// expanded
    pub fn auth_token(&self) -> Option<String> {
        self.npm_token.as_deref().and_then(auth::resolve_token)
    }
}
