// Shared prompt fragments.
// Each operation's own prompt text lives in generation/prompts.rs.

/// Appended to single-shot prompts so the model answers with the declared JSON only.
pub const JSON_ONLY_INSTRUCTION: &str = "Output strictly in JSON.";
