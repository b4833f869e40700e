//! Rubric-based evaluation of sales-call transcripts.
//!
//! The rubric is a static weighted scoring schema; the engine renders it
//! into an evaluation prompt, invokes the generation backend once, and
//! turns the free-form model output into a validated, reproducible report:
//! the weighted score is a deterministic dot product over the rubric's
//! declared category order and the grade is a band lookup. Each evaluation
//! is all-or-nothing; there are no retries and no partial results.

pub mod engine;
pub mod error;
pub mod rubric;

pub use engine::{
    CategoryFeedback, EvaluationReport, FeedbackEngine, KeyMoment, OverallFeedback,
    RubricReference, TalkRatio,
};
pub use error::FeedbackError;
pub use rubric::{Category, EvaluationPoints, InsightDescriptor, Rubric, ScoringBand};
