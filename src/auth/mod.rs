//! Authentication layer: password hashing, session tokens, CSRF and the
//! request boundary that turns a cookie into a verified identity.

pub mod cookies;
pub mod csrf;
pub mod middleware;
pub mod password;
pub mod service;
pub mod session;

pub use middleware::{csrf_protect, require_session, AppState, AuthSession};
pub use password::CredentialHasher;
pub use service::AuthService;
pub use session::SessionIssuer;
