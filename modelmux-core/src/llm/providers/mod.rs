pub mod anthropic;
pub mod common;
pub mod gemini;
pub mod openai;

mod reasoning;

pub(crate) use reasoning::extract_reasoning_trace;

pub use anthropic::AnthropicAdapter;
pub use common::{AdapterCore, RequestOptions};
pub use gemini::GeminiAdapter;
pub use openai::OpenAIAdapter;
