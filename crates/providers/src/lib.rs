mod http;
pub mod ollama;
pub mod openai_compatible;
pub mod traits;

pub use ollama::{OllamaProvider, DEFAULT_OLLAMA_HOST};
pub use openai_compatible::OpenAICompatibleProvider;
pub use traits::{ChatFormat, ChatModel, Message, ProviderError};
