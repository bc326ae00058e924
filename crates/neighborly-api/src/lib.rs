pub mod auth;
pub mod error;
pub mod middleware;
pub mod schema;
pub mod state;
