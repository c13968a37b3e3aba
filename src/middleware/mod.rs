pub mod auth;
pub mod edge;

pub use auth::{extract_bearer_token, jwt_auth_middleware, AuthUser};
pub use edge::{edge_route_filter, EdgeClass};
