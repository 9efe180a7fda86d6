// Authentication module
// Validates bearer JWTs and exposes the caller's id and role to handlers

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

pub use error::AuthError;
pub use middleware::{AdminUser, AuthenticatedUser};
pub use models::{Claims, Role};
pub use token::TokenService;
