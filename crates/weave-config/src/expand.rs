//! `${VAR}` expansion in configuration strings.

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// - `${VAR}` expands to the value of VAR and fails if it is unset
/// - `${VAR:-default}` falls back to `default` when VAR is unset
///
/// Strings without `${` are returned as-is, so a bare `$` in a URL or path
/// survives untouched.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var)
            .map(Some)
            .map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Name of a variable that was referenced but not set.
struct UnsetVar(String);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_expand_set_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("WEAVE_TEST_EXPAND_HOST", "docs.example.com");
        }
        let result = expand_env("https://${WEAVE_TEST_EXPAND_HOST}/site", "site.base_url").unwrap();
        assert_eq!(result, "https://docs.example.com/site");
        unsafe {
            std::env::remove_var("WEAVE_TEST_EXPAND_HOST");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("WEAVE_TEST_EXPAND_UNSET");
        }
        let result = expand_env("${WEAVE_TEST_EXPAND_UNSET:-public}", "publish.output_dir").unwrap();
        assert_eq!(result, "public");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("WEAVE_TEST_EXPAND_MISSING");
        }
        let err = expand_env("${WEAVE_TEST_EXPAND_MISSING}", "site.base_url").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("WEAVE_TEST_EXPAND_MISSING"));
        assert!(err.to_string().contains("site.base_url"));
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        assert_eq!(expand_env("https://example.com/$path", "site.base_url").unwrap(), "https://example.com/$path");
    }
}
