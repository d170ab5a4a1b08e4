//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntax and unknown keys)
//! - Reject values the provider would never accept (whitespace in names, non-ARN roles)
//! - Validate observability settings (log level, metrics address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not contain whitespace (got {value:?})")]
    Whitespace { field: &'static str, value: String },

    #[error("role_arn must be an ARN starting with \"arn:\" (got {0:?})")]
    RoleArn(String),

    #[error("pass_timeout must be greater than zero")]
    ZeroPassTimeout,

    #[error("log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("metrics_address {0:?} is not a valid socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let source = &config.source;

    let text_fields = [
        ("region", &source.region),
        ("prefix_list_id", &source.prefix_list_id),
        ("prefix_list_name", &source.prefix_list_name),
        ("prefix_list_name_ipv6", &source.prefix_list_name_ipv6),
        ("aws_profile", &source.aws_profile),
        ("role_arn", &source.role_arn),
    ];
    for (field, value) in text_fields {
        if let Some(value) = value {
            if value.chars().any(char::is_whitespace) {
                errors.push(ValidationError::Whitespace {
                    field,
                    value: value.clone(),
                });
            }
        }
    }

    if let Some(role_arn) = source.role_arn.as_deref().filter(|s| !s.is_empty()) {
        if !role_arn.starts_with("arn:") {
            errors.push(ValidationError::RoleArn(role_arn.to_string()));
        }
    }

    if source.pass_timeout.is_some_and(|timeout| timeout.is_zero()) {
        errors.push(ValidationError::ZeroPassTimeout);
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
