//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Detect conflicting storage files and duplicate users
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::ServerConfig;
use crate::session::credentials::is_phc_hash;
use crate::session::SameSite;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending setting.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "must not be empty"));
    }

    if config.sessions.ttl_secs == 0 {
        errors.push(ValidationError::new("sessions.ttl_secs", "must be greater than zero"));
    }
    if config.sessions.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("sessions.sweep_interval_secs", "must be greater than zero"));
    }
    if config.sessions.cookie_name.trim().is_empty() {
        errors.push(ValidationError::new("sessions.cookie_name", "must not be empty"));
    }
    if let Err(reason) = config.sessions.same_site.parse::<SameSite>() {
        errors.push(ValidationError::new("sessions.same_site", reason));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than zero"));
    }

    let mut files = HashSet::new();
    for name in config.storage.file_names() {
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            errors.push(ValidationError::new(
                "storage",
                format!("'{}' is not a plain file name", name),
            ));
        } else if !files.insert(name) {
            errors.push(ValidationError::new(
                "storage",
                format!("file '{}' is used by more than one store", name),
            ));
        }
    }

    let mut usernames = HashSet::new();
    for (i, user) in config.users.iter().enumerate() {
        let field = format!("users[{}]", i);
        if user.username.trim().is_empty() {
            errors.push(ValidationError::new(&field, "username must not be empty"));
        } else if !usernames.insert(user.username.as_str()) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate username '{}'", user.username),
            ));
        }
        if !is_phc_hash(&user.password_hash) {
            errors.push(ValidationError::new(
                &field,
                "password_hash is not a PHC string",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
