//! LLM provider implementations for Workroom.
//!
//! All providers implement the `workroom_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
