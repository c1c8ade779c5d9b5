// Prompt text for the five generation operations.
// Builders take already-truncated input; truncation happens in the client.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

pub const RESUME_ANALYSIS_INSTRUCTION: &str =
    "Analyze this resume. Extract key details and provide critical feedback for improvement.";

/// System instruction for the mock interviewer persona.
pub const INTERVIEWER_SYSTEM: &str = "You are a professional HR Interviewer. \
    You are strict but fair. \
    Evaluate the candidate's answer for clarity, STAR method usage, and relevance. \
    Keep feedback concise. \
    Then ask a follow-up or new question.";

/// Synthetic first model turn of every mock interview. Not generated by the model.
pub const INTERVIEW_GREETING: &str = "Hello! I am your AI HR Interviewer. \
    I'm here to conduct a mock interview with you. \
    To begin, please tell me the role you are applying for and briefly introduce yourself.";

pub const TRENDING_GD_TOPIC_PROMPT: &str = "Generate a trending or abstract Group Discussion topic \
    for a corporate interview process. \
    Include pros, cons, opening lines, key points, and strategies to conclude.";

pub fn resume_analysis_prompt() -> String {
    format!("{RESUME_ANALYSIS_INSTRUCTION} {JSON_ONLY_INSTRUCTION}")
}

pub fn jd_match_prompt(resume_text: &str, jd_text: &str) -> String {
    format!(
        r#"Resume Text: "{resume_text}"

Job Description: "{jd_text}"

Compare the resume against the job description. Calculate a match percentage and ATS score. Identify missing keywords. {JSON_ONLY_INSTRUCTION}"#
    )
}

pub fn questions_prompt(role: &str, jd_snippet: Option<&str>) -> String {
    let mut prompt = format!(
        "Generate 8 technical questions (mix of easy/medium/hard) and 4 behavioral questions for a {role} role. \
        Give each question a unique integer id."
    );
    if let Some(snippet) = jd_snippet {
        prompt.push_str(&format!("\nBase it on this JD snippet: {snippet}"));
    }
    prompt.push('\n');
    prompt.push_str(JSON_ONLY_INSTRUCTION);
    prompt
}

pub fn gd_topic_prompt(topic: Option<&str>) -> String {
    match topic {
        Some(topic) => format!(
            "Generate a detailed Group Discussion guide for the topic: \"{topic}\". \
            Include pros, cons, opening lines, key points, and strategies to conclude the discussion. \
            {JSON_ONLY_INSTRUCTION}"
        ),
        None => format!("{TRENDING_GD_TOPIC_PROMPT} {JSON_ONLY_INSTRUCTION}"),
    }
}
