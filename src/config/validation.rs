//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce the credentialed-wildcard CORS prohibition at definition time
//! - Validate value ranges (limits > 0, windows > 0, TTLs > 0)
//! - Check that path prefixes and origins are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{CorsPolicyConfig, GuardConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rate limit rule '{0}': limit must be greater than zero")]
    ZeroLimit(String),

    #[error("rate limit rule '{0}': window must be greater than zero seconds")]
    ZeroWindow(String),

    #[error("rate limit rule '{0}': unknown method '{1}'")]
    BadMethod(String, String),

    #[error("{context}: path prefix '{prefix}' must start with '/'")]
    BadPathPrefix { context: String, prefix: String },

    #[error("csrf: token TTL must be greater than zero minutes")]
    ZeroTokenTtl,

    #[error("cors policy '{0}': allow_credentials is incompatible with a wildcard origin")]
    CredentialedWildcard(String),

    #[error("cors policy '{policy}': origin '{origin}' is not a valid origin")]
    BadOrigin { policy: String, origin: String },
}

const KNOWN_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for rule in &config.rate_limit.rules {
        if rule.limit == 0 {
            errors.push(ValidationError::ZeroLimit(rule.name.clone()));
        }
        if rule.window_secs == 0 {
            errors.push(ValidationError::ZeroWindow(rule.name.clone()));
        }
        for method in &rule.methods {
            if !KNOWN_METHODS.contains(&method.as_str()) {
                errors.push(ValidationError::BadMethod(rule.name.clone(), method.clone()));
            }
        }
        check_prefix(&mut errors, &format!("rate limit rule '{}'", rule.name), &rule.path_prefix);
    }

    if config.csrf.token_ttl_minutes == 0 {
        errors.push(ValidationError::ZeroTokenTtl);
    }
    for prefix in config
        .csrf
        .protected_prefixes
        .iter()
        .chain(&config.csrf.exempt_prefixes)
    {
        check_prefix(&mut errors, "csrf", prefix);
    }

    check_cors_policy(&mut errors, "default", &config.cors.default_policy);
    for route in &config.cors.routes {
        check_prefix(&mut errors, "cors", &route.path_prefix);
        check_cors_policy(&mut errors, &route.path_prefix, &route.policy);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_prefix(errors: &mut Vec<ValidationError>, context: &str, prefix: &str) {
    if !prefix.starts_with('/') {
        errors.push(ValidationError::BadPathPrefix {
            context: context.to_string(),
            prefix: prefix.to_string(),
        });
    }
}

fn check_cors_policy(errors: &mut Vec<ValidationError>, name: &str, policy: &CorsPolicyConfig) {
    let wildcard = policy.allowed_origins.iter().any(|o| o == "*");

    if wildcard && policy.allow_credentials {
        errors.push(ValidationError::CredentialedWildcard(name.to_string()));
    }

    for origin in &policy.allowed_origins {
        if origin == "*" {
            continue;
        }
        // An origin is scheme://host[:port] with no path component.
        let well_formed = url::Url::parse(origin)
            .map(|u| u.path() == "/" && !origin.ends_with('/') && u.host_str().is_some())
            .unwrap_or(false);
        if !well_formed {
            errors.push(ValidationError::BadOrigin {
                policy: name.to_string(),
                origin: origin.clone(),
            });
        }
    }
}
