use anyhow::Result;
use regex::{Captures, Regex};
use std::env;
use tracing::{debug, warn};

const PLACEHOLDER: &str = r"\$\{(\w+)(?::-([^}]*))?\}";

/// Substitute environment variables written as `${VAR}` or `${VAR:-fallback}`.
///
/// A variable that is unset and has no fallback keeps its placeholder so the
/// validator can report it.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    substitute_with(content, |name| env::var(name).ok())
}

/// Same as [`substitute_env_vars`] with an injectable lookup.
pub fn substitute_with<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(PLACEHOLDER)?;
    let mut missing = Vec::new();

    let result = re.replace_all(content, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (lookup(name), caps.get(2)) {
            (Some(value), _) => {
                debug!(var = name, "Substituting environment variable");
                value
            }
            (None, Some(fallback)) => {
                debug!(var = name, "Environment variable not set, using fallback");
                fallback.as_str().to_string()
            }
            (None, None) => {
                missing.push(name.to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        warn!(?missing, "Environment variables not set");
    }

    Ok(result.into_owned())
}

/// Names of placeholders still present in `content`.
pub fn unresolved_env_vars(content: &str) -> Vec<String> {
    match Regex::new(PLACEHOLDER) {
        Ok(re) => re
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}
