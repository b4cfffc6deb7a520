mod auth;
mod client;
mod wire;

pub use auth::{exchange_token, AuthError, ServiceAccountKey, DEFAULT_TOKEN_URL};
pub use client::{DataformClient, DEFAULT_BASE_URL};
