/// User prompt for résumé-to-posting scoring. The target JSON shape is
/// spelled out so the model is steered toward it; the output still goes
/// through the normalizer.
pub fn match_prompt(job_title: &str, job_description: &str, resume: &str) -> String {
    format!(
        r#"You are an expert HR analyst. Analyze how well this resume matches the job posting.

JOB TITLE: {job_title}

JOB DESCRIPTION:
{job_description}

RESUME:
{resume}

Respond with ONLY a valid JSON object (no markdown, no explanation, no text before or after):
{{
    "match_percentage": <number 0-100>,
    "matching_skills": ["skill1", "skill2", ...],
    "missing_skills": ["skill1", "skill2", ...],
    "recommendations": ["actionable tip 1", "actionable tip 2", "actionable tip 3"]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_inputs_and_schema() {
        let prompt = match_prompt("SRE", "Run prod", "Ran prod");
        assert!(prompt.contains("JOB TITLE: SRE"));
        assert!(prompt.contains("JOB DESCRIPTION:\nRun prod"));
        assert!(prompt.contains("RESUME:\nRan prod"));
        assert!(prompt.contains("\"match_percentage\": <number 0-100>"));
    }
}
