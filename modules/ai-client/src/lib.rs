mod client;
pub mod types;

pub use client::ChatClient;
pub use types::{ChatMessage, ChatRequest, ChatResponse};
