pub mod rest;

pub use rest::{build_router, AppState, RestApi};
