pub mod session;
pub mod token;
pub mod visit;
