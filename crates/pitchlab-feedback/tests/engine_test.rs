use async_trait::async_trait;
use pitchlab_feedback::{FeedbackEngine, FeedbackError, Rubric};
use pitchlab_llm::{ChatRequest, GenerationBackend, LlmError};
use serde_json::json;
use std::sync::Arc;

/// Backend returning a canned response (or a canned failure).
struct CannedBackend {
    response: Result<String, ()>,
}

impl CannedBackend {
    fn returning(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(text.into()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { response: Err(()) })
    }
}

#[async_trait]
impl GenerationBackend for CannedBackend {
    async fn generate(&self, _request: ChatRequest) -> Result<String, LlmError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(LlmError::Api {
                status: 500,
                message: "provider exploded".to_string(),
            }),
        }
    }

    fn model(&self) -> &str {
        "command-a-03-2025"
    }
}

fn engine_with(backend: Arc<CannedBackend>) -> FeedbackEngine {
    FeedbackEngine::new(backend, Arc::new(Rubric::sports_partnership()))
}

/// A transcript comfortably above the length floor.
const TRANSCRIPT: &str = "Rep: Thanks for taking the time today, I know Q4 planning is busy. \
    Prospect: Happy to chat, we are reviewing sponsorships right now.";

/// Model response with seven category scores and no overall block.
fn response_without_overall() -> String {
    let scores = [80, 90, 70, 85, 60, 75, 95];
    let names = [
        "Rapport & Relationship Building",
        "Discovery & Needs Assessment",
        "Value Proposition & Differentiation",
        "Business Acumen & Strategic Thinking",
        "Handling Objections & Challenges",
        "Call Structure & Flow",
        "Closing & Next Steps",
    ];
    let categories: Vec<_> = names
        .iter()
        .zip(scores)
        .map(|(name, score)| {
            json!({
                "name": name,
                "score": score,
                "evidence": "quoted from the call",
                "strengths": ["did a thing well"],
                "improvements": ["do another thing"]
            })
        })
        .collect();
    json!({ "categories": categories }).to_string()
}

#[tokio::test]
async fn weighted_score_is_the_rounded_dot_product_over_declared_order() {
    let engine = engine_with(CannedBackend::returning(response_without_overall()));

    let report = engine.evaluate(TRANSCRIPT).await.expect("evaluation succeeds");
    let overall = report.overall.expect("overall completed by the engine");

    // 80*.15 + 90*.25 + 70*.20 + 85*.15 + 60*.10 + 75*.10 + 95*.05 = 79.5
    assert_eq!(overall.weighted_score, Some(79.5));
    assert_eq!(overall.grade.as_deref(), Some("C - Competent"));
    assert!(overall.summary.is_some(), "summary defaults to the band description");
}

#[tokio::test]
async fn uniform_scores_land_in_the_matching_band() {
    let categories: Vec<_> = (0..7).map(|_| json!({"name": "x", "score": 85})).collect();
    let engine = engine_with(CannedBackend::returning(
        json!({ "categories": categories }).to_string(),
    ));

    let report = engine.evaluate(TRANSCRIPT).await.expect("evaluation succeeds");
    let overall = report.overall.expect("overall completed");
    assert_eq!(overall.weighted_score, Some(85.0));
    assert_eq!(overall.grade.as_deref(), Some("B - Strong"));
}

#[tokio::test]
async fn transcript_length_floor_is_exactly_fifty_characters() {
    let engine = engine_with(CannedBackend::returning(response_without_overall()));

    let short = "a".repeat(49);
    let err = engine.evaluate(&short).await.expect_err("49 chars must fail");
    assert!(matches!(err, FeedbackError::TranscriptTooShort(50)));

    // Whitespace does not count toward the floor.
    let padded = format!("   {}   ", "a".repeat(49));
    assert!(engine.evaluate(&padded).await.is_err());

    let exactly_fifty = "a".repeat(50);
    engine
        .evaluate(&exactly_fifty)
        .await
        .expect("50 chars must pass the floor");
}

#[tokio::test]
async fn fenced_and_bare_responses_produce_identical_reports() {
    let bare = response_without_overall();
    let fenced = format!("```\n{}\n```", bare);
    let fenced_json = format!("```json\n{}\n```", bare);

    let mut scores = Vec::new();
    for response in [bare, fenced, fenced_json] {
        let engine = engine_with(CannedBackend::returning(response));
        let report = engine.evaluate(TRANSCRIPT).await.expect("evaluation succeeds");
        scores.push(report.overall.expect("overall").weighted_score);
    }
    assert_eq!(scores[0], scores[1]);
    assert_eq!(scores[1], scores[2]);
}

#[tokio::test]
async fn backend_failure_is_fatal() {
    let engine = engine_with(CannedBackend::failing());
    let err = engine.evaluate(TRANSCRIPT).await.expect_err("must fail");
    assert!(matches!(err, FeedbackError::Backend(_)));
}

#[tokio::test]
async fn unparseable_response_is_malformed() {
    let engine = engine_with(CannedBackend::returning("I couldn't grade this call."));
    let err = engine.evaluate(TRANSCRIPT).await.expect_err("must fail");
    assert!(matches!(err, FeedbackError::MalformedResponse(_)));
}

#[tokio::test]
async fn missing_categories_field_is_malformed() {
    let engine = engine_with(CannedBackend::returning(
        json!({"overall": {"weighted_score": 82}}).to_string(),
    ));
    let err = engine.evaluate(TRANSCRIPT).await.expect_err("must fail");
    assert!(matches!(err, FeedbackError::MalformedResponse(_)));
}

#[tokio::test]
async fn category_count_mismatch_is_rejected_not_scored_short() {
    let engine = engine_with(CannedBackend::returning(
        json!({"categories": [{"name": "only one", "score": 90}]}).to_string(),
    ));
    let err = engine.evaluate(TRANSCRIPT).await.expect_err("must fail");
    assert!(matches!(err, FeedbackError::MalformedResponse(_)));
}

#[tokio::test]
async fn model_supplied_overall_is_preserved() {
    let mut value: serde_json::Value =
        serde_json::from_str(&response_without_overall()).expect("valid json");
    value["overall"] = json!({
        "weighted_score": 91.2,
        "grade": "A - Excellent",
        "summary": "Marvelous call."
    });
    let engine = engine_with(CannedBackend::returning(value.to_string()));

    let report = engine.evaluate(TRANSCRIPT).await.expect("evaluation succeeds");
    let overall = report.overall.expect("overall present");
    assert_eq!(overall.weighted_score, Some(91.2));
    assert_eq!(overall.grade.as_deref(), Some("A - Excellent"));
    assert_eq!(overall.summary.as_deref(), Some("Marvelous call."));
}

#[tokio::test]
async fn rubric_reference_is_always_appended() {
    let engine = engine_with(CannedBackend::returning(response_without_overall()));

    let report = engine.evaluate(TRANSCRIPT).await.expect("evaluation succeeds");
    let reference = report.rubric_reference.expect("reference appended");
    assert_eq!(reference.total_categories, 7);
    assert_eq!(
        reference.category_names.first().map(String::as_str),
        Some("Rapport & Relationship Building")
    );
    assert_eq!(
        reference.category_names.last().map(String::as_str),
        Some("Closing & Next Steps")
    );
}
