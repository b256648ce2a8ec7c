//! Model provider implementations.

pub mod openai;
mod types;
