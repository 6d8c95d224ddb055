//! Configured users and password verification.

use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::config::UserConfig;
use crate::session::identity::Identity;

struct UserRecord {
    identity: Identity,
    password_hash: String,
}

/// Users allowed to log in, keyed by username.
pub struct UserDirectory {
    users: HashMap<String, UserRecord>,
}

impl UserDirectory {
    /// Hashes are checked for PHC syntax by config validation.
    pub fn from_config(users: &[UserConfig]) -> Self {
        let users = users
            .iter()
            .map(|user| {
                let id = user.id.clone().unwrap_or_else(|| user.username.clone());
                let identity = Identity::new(id, user.username.clone())
                    .with_roles(user.roles.iter().cloned())
                    .admin(user.admin || user.roles.iter().any(|r| r == "admin"));
                (
                    user.username.clone(),
                    UserRecord {
                        identity,
                        password_hash: user.password_hash.clone(),
                    },
                )
            })
            .collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Identity for a correct username/password pair.
    pub fn verify(&self, username: &str, password: &str) -> Option<Identity> {
        let record = self.users.get(username)?;
        let parsed = match PasswordHash::new(&record.password_hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::error!(user = %username, error = %err, "Stored password hash is unreadable");
                return None;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .ok()
            .map(|_| record.identity.clone())
    }
}

/// Argon2id PHC string for `password`, for writing into the users table.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Whether `hash` parses as a PHC string.
pub fn is_phc_hash(hash: &str) -> bool {
    PasswordHash::new(hash).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, password: &str, roles: &[&str]) -> UserConfig {
        UserConfig {
            id: None,
            username: username.to_string(),
            password_hash: hash_password(password).unwrap(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            admin: false,
        }
    }

    #[test]
    fn test_verify() {
        let directory = UserDirectory::from_config(&[user("coach", "s3cret", &["coach"])]);

        let identity = directory.verify("coach", "s3cret").unwrap();
        assert_eq!(identity.id, "coach");
        assert!(!identity.is_admin);

        assert!(directory.verify("coach", "wrong").is_none());
        assert!(directory.verify("nobody", "s3cret").is_none());
    }

    #[test]
    fn test_admin_role_grants_admin() {
        let directory = UserDirectory::from_config(&[user("root", "pw", &["admin"])]);
        assert!(directory.verify("root", "pw").unwrap().is_admin);
    }

    #[test]
    fn test_hash_is_phc() {
        let hash = hash_password("pw").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(is_phc_hash(&hash));
        assert!(!is_phc_hash("plaintext"));
    }
}
