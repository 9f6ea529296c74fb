//! Built-in embedding providers.

pub mod trigram;

pub use trigram::TrigramProvider;
