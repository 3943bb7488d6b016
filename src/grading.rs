use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::errors::{Error, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Synchronous text-completion capability, treated as a pure
/// `prompt -> text` function.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Google generative-language API client.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: String, model: &str) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Completion(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "model returned {status}: {text}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| Error::Completion(err.to_string()))?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| Error::Completion("completion contained no candidates".to_string()))
    }
}

/// A parsed grading result.
#[derive(Debug, Clone)]
pub struct GradeReport {
    /// Scale of 0-10.
    pub score: f32,
    /// The model's full answer, which interleaves the justification.
    pub justification: String,
}

/// Thin wrapper over the LLM: fixed prompt templates, no internal logic
/// beyond string formatting and grade parsing.
pub struct GradingService {
    llm: Arc<dyn LlmClient>,
}

impl GradingService {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn grade(
        &self,
        question: &str,
        rubric: &str,
        answer: &str,
        materials: &[String],
    ) -> Result<GradeReport> {
        let prompt = format!(
            "Given the following quiz/exam question:\n\n{question}\n\n\
             The rubric for grading:\n\n{rubric}\n\n\
             The student's answer:\n\n{answer}\n\n\
             The relevant course materials:\n\n{}\n\n\
             Please provide a grade (scale of 0-10) and a justification.",
            materials.join("\n\n")
        );
        let completion = self.llm.complete(&prompt).await?;
        parse_grade(&completion)
    }

    pub async fn feedback(
        &self,
        question: &str,
        answer: &str,
        materials: &[String],
    ) -> Result<String> {
        let prompt = format!(
            "Given the question:\n\n{question}\n\n\
             The student's answer:\n\n{answer}\n\n\
             The relevant course materials:\n\n{}\n\n\
             Provide constructive feedback to help the student improve.",
            materials.join("\n\n")
        );
        self.llm.complete(&prompt).await
    }
}

/// Splits a question paper into body and rubric at the `Rubric:` marker.
pub fn split_rubric(question_text: &str) -> (&str, &str) {
    match question_text.split_once("Rubric:") {
        Some((body, rubric)) => (body.trim(), rubric.trim()),
        None => (question_text.trim(), "No rubric provided."),
    }
}

/// Best-effort parse of a free-text completion into a score.
///
/// An explicit `Grade: <n>` / `Score: <n>` label wins; a labeled value
/// outside `[0, 10]` is malformed. Only unlabeled completions fall back to
/// the first number in range. A completion with no usable number is an
/// explicit `MalformedGrade` error, never a silently truncated result.
fn parse_grade(completion: &str) -> Result<GradeReport> {
    let labeled = Regex::new(r"(?i)(?:grade|score)\s*(?:is|of)?\s*[:\-]?\s*\**\s*(\d+(?:\.\d+)?)")
        .unwrap();
    if let Some(captures) = labeled.captures(completion) {
        // A labeled grade is authoritative: out of range means the
        // completion is malformed, not an invitation to scan for other
        // numbers (which would pick up the /10 denominator).
        return match captures[1].parse::<f32>() {
            Ok(score) if (0.0..=10.0).contains(&score) => Ok(report(score, completion)),
            _ => Err(Error::MalformedGrade(completion.trim().to_string())),
        };
    }

    let any_number = Regex::new(r"\d+(?:\.\d+)?").unwrap();
    for found in any_number.find_iter(completion) {
        if let Ok(score) = found.as_str().parse::<f32>() {
            if (0.0..=10.0).contains(&score) {
                return Ok(report(score, completion));
            }
        }
    }

    Err(Error::MalformedGrade(completion.trim().to_string()))
}

fn report(score: f32, completion: &str) -> GradeReport {
    GradeReport {
        score,
        justification: completion.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labeled_grade() {
        let report = parse_grade("Grade: 8/10\n\nSolid coverage of caching.").unwrap();
        assert_eq!(report.score, 8.0);
        assert!(report.justification.contains("Solid coverage"));
    }

    #[test]
    fn parses_bold_markdown_grade() {
        let report = parse_grade("**Grade:** 7.5\n\nJustification: decent.").unwrap();
        assert_eq!(report.score, 7.5);
    }

    #[test]
    fn falls_back_to_first_in_range_number() {
        let report = parse_grade("I would give this a 6 out of 10 because...").unwrap();
        assert_eq!(report.score, 6.0);
    }

    #[test]
    fn out_of_range_labeled_grade_is_malformed() {
        // Must not fall through and pick the denominator as the score.
        let err = parse_grade("Grade: 15/10\n\nToo generous.").unwrap_err();
        assert!(matches!(err, Error::MalformedGrade(_)));
    }

    #[test]
    fn out_of_range_numbers_are_not_grades() {
        let err = parse_grade("See question 42 in the appendix.").unwrap_err();
        assert!(matches!(err, Error::MalformedGrade(_)));
    }

    #[test]
    fn completion_without_numbers_is_malformed() {
        let err = parse_grade("The answer shows good understanding.").unwrap_err();
        assert!(matches!(err, Error::MalformedGrade(_)));
    }

    #[test]
    fn rubric_splits_at_marker() {
        let (body, rubric) = split_rubric("What is fsck?\n\nRubric: 5 points for recovery.");
        assert_eq!(body, "What is fsck?");
        assert_eq!(rubric, "5 points for recovery.");
    }

    #[test]
    fn missing_rubric_gets_placeholder() {
        let (body, rubric) = split_rubric("What is fsck?");
        assert_eq!(body, "What is fsck?");
        assert_eq!(rubric, "No rubric provided.");
    }
}
