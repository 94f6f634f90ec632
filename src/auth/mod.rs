//! Authentication: password hashing, identity tokens, the request gate and
//! the account endpoints.

pub mod gate;
pub mod handlers;
pub mod password;
pub mod service;
pub mod token;

pub use gate::{require_identity, Identity};
pub use password::{CredentialStore, HashError};
pub use service::AuthService;
pub use token::{Claims, TokenError, TokenService};
