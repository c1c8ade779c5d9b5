// Job-prep generation: five schema-constrained operations against the model.
// All model calls go through llm_client; no direct Gemini HTTP calls here.

pub mod client;
pub mod handlers;
pub mod interview;
pub mod models;
pub mod prompts;
pub mod schema;
