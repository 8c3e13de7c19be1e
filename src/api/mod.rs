pub mod client;
pub mod models;
pub mod response;

pub use client::{build_http_client, make_api_request};
pub use models::RequestBody;
