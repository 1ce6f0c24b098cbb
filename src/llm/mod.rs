// LLM abstraction layer

pub mod provider;
pub mod openai;
pub mod fallback;

pub use provider::*;
pub use fallback::{FallbackPolicy, FallbackReport, ModelFallbackClient};
