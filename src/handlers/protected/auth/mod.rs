// handlers/protected/auth/mod.rs - Session handlers behind jwt_auth_middleware

pub mod session;

pub use session::{refresh, verify};
