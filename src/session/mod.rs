//! Session lifecycle and request identity.
//!
//! # Data Flow
//! ```text
//! POST /api/auth/login
//!     → credentials.rs (Argon2 verify against configured users)
//!     → manager.rs issue (token_store.rs create, expiry = now + ttl)
//!     → cookie.rs Set-Cookie directive
//!
//! Every request:
//!     → identity.rs (session cookie / bearer token → manager lookup,
//!                    optional trusted identity headers)
//!     → Identity or none
//!
//! POST /api/auth/logout
//!     → manager.rs revoke → expiring cookie
//! ```
//!
//! # Design Decisions
//! - Expiry is checked on lookup; sweeper.rs collects tokens never presented again
//! - Session identity is fixed at issue time; role changes need a new login
//! - The token store is a trait so the storage medium stays opaque

pub mod cookie;
pub mod credentials;
pub mod handle;
pub mod identity;
pub mod manager;
pub mod sweeper;
pub mod token_store;

pub use cookie::{Cookie, CookieSettings, SameSite, SecureCookies};
pub use credentials::UserDirectory;
pub use handle::SessionHandle;
pub use identity::{Identity, IdentitySource, ResolvedIdentity};
pub use manager::SessionManager;
pub use sweeper::spawn_sweeper;
pub use token_store::{InMemoryTokenStore, Session, SessionError, SessionTokenStore};
