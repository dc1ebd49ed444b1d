//! OpenAI-compatible chat-completion adapter.

mod generator;

pub use generator::OpenAiJobGenerator;
