pub mod rest;

pub use rest::{routes, ApiError, AppState, RestApi};
