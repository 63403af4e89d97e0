pub mod client;
pub mod models;

pub use client::OpenRouterClient;
pub use models::Usage;
