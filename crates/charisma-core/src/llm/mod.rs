//! Chat model integration: the provider trait.

mod provider;

pub use provider::LlmProvider;
