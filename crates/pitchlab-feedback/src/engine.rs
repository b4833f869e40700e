//! The evaluation engine: prompt construction, response sanitization, and
//! deterministic score completion.

use crate::error::FeedbackError;
use crate::rubric::Rubric;
use pitchlab_llm::{ChatMessage, ChatRequest, GenerationBackend};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;

/// Minimum transcript length (after trimming) that can be meaningfully
/// scored against a seven-category rubric.
const MIN_TRANSCRIPT_CHARS: usize = 50;

/// Sampling temperature for evaluation calls. Low on purpose: grading
/// should be stable, not creative.
const EVALUATION_TEMPERATURE: f32 = 0.3;

/// Per-category feedback as returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFeedback {
    #[serde(default)]
    pub name: String,
    pub score: f64,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

/// Overall assessment block. Everything is optional on the wire; the engine
/// completes the score and grade when the model leaves them out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverallFeedback {
    #[serde(default)]
    pub weighted_score: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub top_3_strengths: Vec<String>,
    #[serde(default)]
    pub top_3_priorities: Vec<String>,
}

/// Speaking-time analysis block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TalkRatio {
    #[serde(default)]
    pub rep_percentage: Option<f64>,
    #[serde(default)]
    pub prospect_percentage: Option<f64>,
    #[serde(default)]
    pub analysis: Option<String>,
}

/// A notable moment in the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyMoment {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub moment: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
}

/// Summary of the rubric the report was graded against. Always appended by
/// the engine regardless of what the model returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricReference {
    pub total_categories: usize,
    pub category_names: Vec<String>,
}

/// A complete, validated evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub categories: Vec<CategoryFeedback>,
    #[serde(default)]
    pub overall: Option<OverallFeedback>,
    #[serde(default)]
    pub talk_ratio: Option<TalkRatio>,
    #[serde(default)]
    pub key_moments: Vec<KeyMoment>,
    #[serde(default)]
    pub rubric_reference: Option<RubricReference>,
}

/// Grades transcripts against the rubric via the generation backend.
pub struct FeedbackEngine {
    backend: Arc<dyn GenerationBackend>,
    rubric: Arc<Rubric>,
}

impl FeedbackEngine {
    pub fn new(backend: Arc<dyn GenerationBackend>, rubric: Arc<Rubric>) -> Self {
        Self { backend, rubric }
    }

    /// The rubric this engine grades against.
    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// The model identifier used for evaluation calls.
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Evaluates a call transcript.
    ///
    /// All-or-nothing: returns a complete report or an error. A backend
    /// failure is fatal here, unlike in the conversational pipeline, since
    /// a fabricated score would be misleading.
    pub async fn evaluate(&self, transcript: &str) -> Result<EvaluationReport, FeedbackError> {
        if transcript.trim().chars().count() < MIN_TRANSCRIPT_CHARS {
            return Err(FeedbackError::TranscriptTooShort(MIN_TRANSCRIPT_CHARS));
        }

        tracing::debug!(
            chars = transcript.chars().count(),
            model = self.backend.model(),
            "evaluating transcript"
        );
        let prompt = build_evaluation_prompt(&self.rubric, transcript);
        let request =
            ChatRequest::new(vec![ChatMessage::user(prompt)]).with_temperature(EVALUATION_TEMPERATURE);

        let response_text = self.backend.generate(request).await?;
        let cleaned = strip_code_fences(&response_text);

        let value: serde_json::Value = serde_json::from_str(cleaned)
            .map_err(|e| FeedbackError::MalformedResponse(format!("invalid JSON: {}", e)))?;
        if value.get("categories").is_none() {
            return Err(FeedbackError::MalformedResponse(
                "missing categories".to_string(),
            ));
        }
        let mut report: EvaluationReport = serde_json::from_value(value)
            .map_err(|e| FeedbackError::MalformedResponse(e.to_string()))?;

        self.complete_overall(&mut report)?;

        report.rubric_reference = Some(RubricReference {
            total_categories: self.rubric.categories.len(),
            category_names: self
                .rubric
                .categories
                .iter()
                .map(|c| c.name.clone())
                .collect(),
        });

        Ok(report)
    }

    /// Fills in the weighted score and grade when the model left them out.
    ///
    /// Category scores are read positionally against the rubric's declared
    /// order; a response that reorders categories will misattribute weights.
    /// Kept for compatibility with existing response payloads, but a count
    /// mismatch is rejected rather than scored short.
    fn complete_overall(&self, report: &mut EvaluationReport) -> Result<(), FeedbackError> {
        let needs_score = report
            .overall
            .as_ref()
            .is_none_or(|overall| overall.weighted_score.is_none());
        if !needs_score {
            return Ok(());
        }

        if report.categories.len() != self.rubric.categories.len() {
            return Err(FeedbackError::MalformedResponse(format!(
                "expected {} categories, got {}",
                self.rubric.categories.len(),
                report.categories.len()
            )));
        }

        let weighted_score: f64 = self
            .rubric
            .categories
            .iter()
            .zip(&report.categories)
            .map(|(category, feedback)| feedback.score * category.weight)
            .sum();
        let weighted_score = round_to_tenth(weighted_score);
        let band = self.rubric.grade_for(weighted_score);

        let overall = report.overall.get_or_insert_with(OverallFeedback::default);
        overall.weighted_score = Some(weighted_score);
        overall.grade = Some(band.grade.clone());
        if overall.summary.is_none() {
            overall.summary = Some(band.description.clone());
        }
        Ok(())
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Removes a Markdown code-fence wrapper if the model added one.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let inner = trimmed.split("```").nth(1).unwrap_or(trimmed);
    inner.strip_prefix("json").unwrap_or(inner).trim()
}

/// Renders the rubric and transcript into the evaluation prompt.
///
/// Deterministic: the rubric is rendered in declared category order, which
/// is also the order the response's `categories` array must follow.
fn build_evaluation_prompt(rubric: &Rubric, transcript: &str) -> String {
    let mut rubric_text = String::from("# EVALUATION RUBRIC\n\n");
    for category in &rubric.categories {
        let _ = write!(
            rubric_text,
            "\n## {} (Weight: {:.0}%)\n{}\n\n**Criteria:**\n",
            category.name,
            category.weight * 100.0,
            category.description
        );
        for criterion in &category.criteria {
            let _ = writeln!(rubric_text, "- {}", criterion);
        }
        rubric_text.push_str("\n**Scoring Guide:**\n");
        for (level, description) in category.evaluation_points.levels() {
            let _ = writeln!(rubric_text, "- **{}**: {}", level, description);
        }
    }

    format!(
        r#"You are an expert sports partnership sales coach evaluating a sales call transcript.

{rubric_text}

# CALL TRANSCRIPT TO EVALUATE

{transcript}

# YOUR TASK

Analyze this sports partnership sales call transcript against the rubric above. For each category:

1. Provide a score from 0-100
2. Give specific evidence from the transcript that supports your score
3. Provide 2-3 actionable recommendations for improvement
4. Highlight what was done well

Respond in the following JSON format ONLY (no additional text):

{{
    "categories": [
        {{
            "name": "Rapport & Relationship Building",
            "score": 85,
            "evidence": "Specific quotes or observations from the transcript",
            "strengths": ["What they did well with examples"],
            "improvements": ["Specific, actionable recommendations"]
        }}
    ],
    "overall": {{
        "weighted_score": 82,
        "grade": "B - Strong",
        "summary": "2-3 sentence overall assessment",
        "top_3_strengths": ["Strength 1", "Strength 2", "Strength 3"],
        "top_3_priorities": ["Priority improvement 1", "Priority 2", "Priority 3"]
    }},
    "talk_ratio": {{
        "rep_percentage": 45,
        "prospect_percentage": 55,
        "analysis": "Brief analysis of whether this ratio is optimal"
    }},
    "key_moments": [
        {{
            "timestamp": "approximate location in call",
            "moment": "Description of what happened",
            "impact": "Why this was significant (positive or negative)"
        }}
    ]
}}

Include one entry in "categories" for every rubric category, in the rubric's order. Be specific, constructive, and provide actionable feedback. Reference actual quotes from the transcript when possible."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_fence_stripping_handles_all_wrappings() {
        let bare = r#"{"categories": []}"#;
        assert_eq!(strip_code_fences(bare), bare);
        assert_eq!(strip_code_fences("```\n{\"categories\": []}\n```"), bare);
        assert_eq!(strip_code_fences("```json\n{\"categories\": []}\n```"), bare);
        assert_eq!(strip_code_fences("  ```json\n{\"categories\": []}\n```  "), bare);
    }

    #[test]
    fn rounding_is_to_one_decimal() {
        assert_eq!(round_to_tenth(79.54), 79.5);
        assert_eq!(round_to_tenth(79.55), 79.6);
        assert_eq!(round_to_tenth(80.0), 80.0);
    }

    #[test]
    fn prompt_renders_categories_in_declared_order() {
        let rubric = Rubric::sports_partnership();
        let prompt = build_evaluation_prompt(&rubric, "the transcript body");

        let mut last_index = 0;
        for category in &rubric.categories {
            let heading = format!("## {}", category.name);
            let index = prompt.find(&heading).expect("category heading present");
            assert!(index > last_index, "categories must render in order");
            last_index = index;
        }
        assert!(prompt.contains("(Weight: 25%)"));
        assert!(prompt.contains("- **EXCELLENT**:"));
        assert!(prompt.contains("the transcript body"));
        assert!(prompt.contains("JSON format ONLY"));
    }
}
