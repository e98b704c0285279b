pub mod api;

pub use api::home_router;
