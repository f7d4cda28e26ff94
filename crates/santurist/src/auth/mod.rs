//! User accounts, profiles, and the admin guard for operational endpoints.

pub mod domain;
pub mod extract;
pub mod router;
pub mod service;

pub use domain::{UserAccount, UserProfile, UserRole};
pub use extract::{AdminUser, USER_HEADER};
pub use router::auth_router;
pub use service::{AuthError, AuthService};
