pub mod compatible;
pub mod factory;
pub mod traits;
pub mod types;

pub use compatible::CompatibleProvider;
pub use factory::{build_provider, resolve_api_key};
pub use traits::Provider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, ChatRole};
