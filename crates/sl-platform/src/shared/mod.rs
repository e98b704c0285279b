//! Cross-cutting pieces: state, errors, routes, middleware and views

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod views;

pub use error::AppError;
pub use routes::{Route, RouteAccess};
pub use state::AppState;
