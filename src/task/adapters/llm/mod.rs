//! Language model adapters for classification and tool selection.

mod classifier;
mod openai;
mod prompts;
mod structured;
mod tool_selector;

pub use classifier::LlmTaskClassifier;
pub use openai::OpenAiCompatibleModel;
pub use tool_selector::LlmToolSelector;
