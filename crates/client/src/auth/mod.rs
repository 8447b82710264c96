//! Authentication: credentials, bearer tokens and the token manager.
//!
//! One scheme is active per connection. A bearer token overrides a legacy
//! API key; with neither, requests are sent unauthenticated.

mod credentials;
mod manager;
mod token;

pub use credentials::Credentials;
pub use manager::TokenManager;
pub use token::{ApiKey, TokenInfo, TokenVerification, ValidityWindow};
