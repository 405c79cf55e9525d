pub mod documents;
pub mod handlers;
pub mod normalizer;
pub mod prompts;
pub mod service;
