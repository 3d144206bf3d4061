//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Returns the original string unchanged if no `${}` patterns are present.
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces), so PEM
/// paths and URLs containing a literal `$` survive untouched.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        std::env::var(var).map(Some).map_err(|_| LookupError {
            var_name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Expand an optional value in place, leaving `None` untouched.
pub(crate) fn expand_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(raw) = value.as_deref() {
        *value = Some(expand_env(raw, field)?);
    }
    Ok(())
}

/// Error returned when environment variable lookup fails.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_chef_url() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("INVDOC_TEST_CHEF_URL", "https://chef.example.com");
        }
        let result = expand_env("${INVDOC_TEST_CHEF_URL}", "inventory.url").unwrap();
        assert_eq!(result, "https://chef.example.com");
        unsafe {
            std::env::remove_var("INVDOC_TEST_CHEF_URL");
        }
    }

    #[test]
    fn test_expand_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("INVDOC_TEST_UNSET_LOGIN");
        }
        let result = expand_env("${INVDOC_TEST_UNSET_LOGIN:-docs-bot}", "inventory.login").unwrap();
        assert_eq!(result, "docs-bot");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("INVDOC_TEST_MISSING");
        }
        let err = expand_env("${INVDOC_TEST_MISSING}", "directives[0].inventory.key_file")
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let msg = err.to_string();
        assert!(msg.contains("INVDOC_TEST_MISSING"));
        assert!(msg.contains("directives[0].inventory.key_file"));
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("INVDOC_TEST_ORG", "acme");
        }
        let result = expand_env(
            "https://chef.example.com/organizations/${INVDOC_TEST_ORG}",
            "inventory.url",
        )
        .unwrap();
        assert_eq!(result, "https://chef.example.com/organizations/acme");
        unsafe {
            std::env::remove_var("INVDOC_TEST_ORG");
        }
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        let result = expand_env("/keys/$HOME.pem", "inventory.key_file").unwrap();
        assert_eq!(result, "/keys/$HOME.pem");
    }

    #[test]
    fn test_expand_opt_none_untouched() {
        let mut value = None;
        expand_opt(&mut value, "inventory.key_file").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_expand_opt_literal() {
        let mut value = Some("chef.pem".to_owned());
        expand_opt(&mut value, "inventory.key_file").unwrap();
        assert_eq!(value.as_deref(), Some("chef.pem"));
    }
}
