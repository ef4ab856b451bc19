//! Registry token handling
//!
//! The configured `npmToken` may name an environment variable (`${VAR}` or
//! `$VAR`) instead of holding the secret itself. Tokens are never logged in
//! full.

/// Resolve a configured token, expanding an environment variable reference.
///
/// Returns `None` for empty values and for references to unset variables.
pub fn resolve_token(value: &str) -> Option<String> {
    let value = value.trim();

    if let Some(inner) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        return std::env::var(inner).ok().filter(|v| !v.is_empty());
    }

    if let Some(var_name) = value.strip_prefix('$')
        && !var_name.contains('{')
    {
        return std::env::var(var_name).ok().filter(|v| !v.is_empty());
    }

    (!value.is_empty()).then(|| value.to_string())
}

/// Redact a token for safe logging.
///
/// Shows only the first few characters to help identify which token is in use
/// without exposing the full secret.
pub fn redact_token(token: &str) -> String {
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        let prefix: String = token.chars().take(4).collect();
        format!("{}...", prefix)
    }
}
