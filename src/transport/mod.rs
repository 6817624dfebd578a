mod error;
mod routes;
mod server;

pub use error::ApiError;
pub use routes::{AppState, router};
pub use server::serve;
