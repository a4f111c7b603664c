//! The fixed instruction prompt sent to the completion provider.

/// Build the analyzer prompt for one message.
///
/// The provider must decide `valid` before any field extraction is trusted,
/// and must answer with nothing but a JSON object.
pub(crate) fn build_prompt(text: &str, timestamp: &str) -> String {
    format!(
        r#"You are a job posting analyzer. Analyze the following text and determine if it is a valid job posting.

RULES:
1. Text MUST contain a job title/role
2. Text MUST contain a company name
3. Text MUST contain at least one of: location, job type (remote/hybrid/on-site), experience level, salary
4. Ignore single-word messages, vague terms, or non-job content
5. Return ONLY valid JSON, no markdown or comments
6. If this is NOT a valid job posting, return exactly: {{"valid": false}}

If valid, return this JSON structure:
{{
    "valid": true,
    "role": "Job title",
    "company_name": "Company name",
    "location": "Location or 'Not specified'",
    "experience_required": "Years/Level or null",
    "job_type": "Remote/On-site/Hybrid or null",
    "application_link": "URL or contact email or null",
    "description": "Brief summary (2-3 sentences)"
}}

Text: {text}
Timestamp: {timestamp}

Respond ONLY with the JSON object, nothing else."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_message_and_timestamp() {
        let prompt = build_prompt("Hiring Rust devs at Acme", "2024-06-12T14:32:00");
        assert!(prompt.contains("Text: Hiring Rust devs at Acme"));
        assert!(prompt.contains("Timestamp: 2024-06-12T14:32:00"));
    }

    #[test]
    fn prompt_demands_json_only_output() {
        let prompt = build_prompt("msg", "ts");
        assert!(prompt.contains(r#"{"valid": false}"#));
        assert!(prompt.contains("Respond ONLY with the JSON object"));
    }
}
