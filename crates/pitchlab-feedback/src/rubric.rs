//! The sports-partnership sales-call evaluation rubric.
//!
//! Static data, no logic beyond validation and grade lookup. Category order
//! is significant: it is both the order the rubric is rendered into the
//! evaluation prompt and the order category scores are read back from the
//! model response.

use crate::error::FeedbackError;
use serde::{Deserialize, Serialize};

/// Tolerance for the weight-sum invariant check.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// One weighted scoring category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// Fraction of the overall score this category contributes (0–1).
    pub weight: f64,
    pub description: String,
    pub criteria: Vec<String>,
    pub evaluation_points: EvaluationPoints,
}

/// Qualitative level descriptions for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationPoints {
    pub excellent: String,
    pub good: String,
    pub fair: String,
    pub poor: String,
}

impl EvaluationPoints {
    /// Levels in rendering order, paired with their uppercase labels.
    pub fn levels(&self) -> [(&'static str, &str); 4] {
        [
            ("EXCELLENT", &self.excellent),
            ("GOOD", &self.good),
            ("FAIR", &self.fair),
            ("POOR", &self.poor),
        ]
    }
}

/// One inclusive grade band of the overall scoring table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringBand {
    pub min: u32,
    pub max: u32,
    pub grade: String,
    pub description: String,
}

impl ScoringBand {
    /// Whether `score` falls in this band. Bounds are inclusive and a
    /// fractional score belongs to the band of its integer part, so the
    /// bands tile 0–100 without gaps.
    pub fn contains(&self, score: f64) -> bool {
        let floored = score.floor();
        floored >= self.min as f64 && floored <= self.max as f64
    }
}

/// Auxiliary insight descriptor surfaced alongside the rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightDescriptor {
    pub insight_type: String,
    pub description: String,
    pub optimal: String,
    pub red_flag: String,
}

/// The complete weighted scoring schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
    pub categories: Vec<Category>,
    pub overall_scoring: Vec<ScoringBand>,
    pub additional_insights: Vec<InsightDescriptor>,
}

impl Rubric {
    /// Checks the rubric's structural invariants. Callers treat a failure
    /// here as fatal at startup, not as a runtime condition.
    pub fn validate(&self) -> Result<(), FeedbackError> {
        if self.categories.is_empty() {
            return Err(FeedbackError::InvalidRubric(
                "rubric has no categories".to_string(),
            ));
        }
        let weight_sum: f64 = self.categories.iter().map(|c| c.weight).sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(FeedbackError::InvalidRubric(format!(
                "category weights must sum to 1.0, got {}",
                weight_sum
            )));
        }
        if self.overall_scoring.is_empty() {
            return Err(FeedbackError::InvalidRubric(
                "rubric has no overall scoring bands".to_string(),
            ));
        }
        Ok(())
    }

    /// Looks up the grade band containing `score`. When no band matches, the
    /// lowest band is the safe default.
    pub fn grade_for(&self, score: f64) -> &ScoringBand {
        self.overall_scoring
            .iter()
            .find(|band| band.contains(score))
            .unwrap_or_else(|| self.lowest_band())
    }

    fn lowest_band(&self) -> &ScoringBand {
        self.overall_scoring
            .iter()
            .min_by_key(|band| band.min)
            .expect("validated rubric has at least one band")
    }

    /// The seven-category sports-partnership sales rubric.
    pub fn sports_partnership() -> Self {
        Self {
            categories: vec![
                Category {
                    name: "Rapport & Relationship Building".into(),
                    weight: 0.15,
                    description:
                        "Ability to establish trust and personal connection with the prospect"
                            .into(),
                    criteria: vec![
                        "Opens with genuine personal connection or relevant business insight".into(),
                        "Demonstrates knowledge of prospect's company, industry, or recent achievements".into(),
                        "Uses active listening and builds on prospect's responses".into(),
                        "Shows enthusiasm without being overly pushy".into(),
                        "Maintains professional yet personable tone throughout".into(),
                    ],
                    evaluation_points: EvaluationPoints {
                        excellent: "Natural rapport, personalized approach, prospect is engaged and reciprocating".into(),
                        good: "Professional connection, some personalization, respectful dialogue".into(),
                        fair: "Generic opening, limited personalization, one-sided conversation".into(),
                        poor: "No rapport building, jumps straight to pitch, doesn't acknowledge prospect's context".into(),
                    },
                },
                Category {
                    name: "Discovery & Needs Assessment".into(),
                    weight: 0.25,
                    description:
                        "Quality of questions asked to understand sponsor's objectives and challenges"
                            .into(),
                    criteria: vec![
                        "Asks open-ended questions about business objectives".into(),
                        "Probes for specific KPIs and success metrics (awareness, leads, hospitality, etc.)".into(),
                        "Identifies decision-making process and timeline".into(),
                        "Uncovers budget parameters and approval requirements".into(),
                        "Understands target audience alignment with fanbase demographics".into(),
                        "Explores past sponsorship experiences and what worked/didn't work".into(),
                    ],
                    evaluation_points: EvaluationPoints {
                        excellent: "5+ strategic discovery questions, uncovers deep business needs, prospect shares genuine challenges".into(),
                        good: "3-4 discovery questions, identifies key objectives, understands decision process".into(),
                        fair: "1-2 basic questions, surface-level understanding, mostly makes assumptions".into(),
                        poor: "No discovery questions, launches into pitch without understanding needs".into(),
                    },
                },
                Category {
                    name: "Value Proposition & Differentiation".into(),
                    weight: 0.20,
                    description: "Clarity and relevance of the partnership value being offered"
                        .into(),
                    criteria: vec![
                        "Articulates unique inventory assets (venue signage, digital rights, player access, etc.)".into(),
                        "Connects offerings directly to prospect's stated objectives".into(),
                        "Differentiates from other sponsorship opportunities".into(),
                        "Quantifies reach, engagement, or audience demographics".into(),
                        "Positions as partnership (mutual benefit) vs. transactional sponsorship".into(),
                        "Provides specific activation examples relevant to prospect's industry".into(),
                    ],
                    evaluation_points: EvaluationPoints {
                        excellent: "Customized value prop tied to discovery, specific ROI examples, creative activation ideas".into(),
                        good: "Clear value statements, some customization, mentions key assets".into(),
                        fair: "Generic pitch about team/property, limited connection to prospect needs".into(),
                        poor: "Vague benefits, no differentiation, reads like a script for any sponsor".into(),
                    },
                },
                Category {
                    name: "Business Acumen & Strategic Thinking".into(),
                    weight: 0.15,
                    description:
                        "Understanding of sponsor's business, market, and strategic context".into(),
                    criteria: vec![
                        "References prospect's industry trends or competitive landscape".into(),
                        "Understands how sponsorship fits into their broader marketing mix".into(),
                        "Speaks to business outcomes (sales lift, brand positioning, employee engagement) not just impressions".into(),
                        "Addresses potential concerns about ROI measurement proactively".into(),
                        "Demonstrates knowledge of typical sponsor objectives for their category".into(),
                    ],
                    evaluation_points: EvaluationPoints {
                        excellent: "Acts as strategic advisor, deep industry knowledge, frames partnership in business terms".into(),
                        good: "Shows business understanding, discusses outcomes, professional framing".into(),
                        fair: "Basic business awareness, focuses more on property features than outcomes".into(),
                        poor: "No business context, focuses solely on sponsorship features/benefits".into(),
                    },
                },
                Category {
                    name: "Handling Objections & Challenges".into(),
                    weight: 0.10,
                    description:
                        "Response to prospect concerns, budget hesitations, or competitive alternatives"
                            .into(),
                    criteria: vec![
                        "Acknowledges objection without becoming defensive".into(),
                        "Asks clarifying questions to understand root concern".into(),
                        "Provides specific evidence or examples to address concern".into(),
                        "Offers flexible solutions or alternative approaches".into(),
                        "Maintains confidence while showing empathy".into(),
                    ],
                    evaluation_points: EvaluationPoints {
                        excellent: "Handles objections smoothly, reframes concerns, provides creative solutions".into(),
                        good: "Addresses concerns directly, provides reasonable responses, stays composed".into(),
                        fair: "Defensive or dismissive of concerns, weak responses".into(),
                        poor: "Ignores objections, argues with prospect, or panics when challenged".into(),
                    },
                },
                Category {
                    name: "Call Structure & Flow".into(),
                    weight: 0.10,
                    description: "Organization and pacing of the conversation".into(),
                    criteria: vec![
                        "Sets clear agenda at beginning of call".into(),
                        "Balances talking vs. listening (prospect speaks 40-60% of time)".into(),
                        "Logical progression from discovery to value prop to next steps".into(),
                        "Manages time effectively, stays on track".into(),
                        "Recaps key points and agreements throughout call".into(),
                    ],
                    evaluation_points: EvaluationPoints {
                        excellent: "Masterful flow, prospect-led discovery, smooth transitions, perfect pacing".into(),
                        good: "Clear structure, good balance, stays mostly on track".into(),
                        fair: "Somewhat disjointed, talks too much or too little, loses thread".into(),
                        poor: "No structure, rambling, one-sided monologue".into(),
                    },
                },
                Category {
                    name: "Closing & Next Steps".into(),
                    weight: 0.05,
                    description:
                        "Effectiveness in advancing the deal and securing commitment".into(),
                    criteria: vec![
                        "Secures specific next action (meeting, proposal, introduction)".into(),
                        "Sets concrete dates/timelines for follow-up".into(),
                        "Confirms decision-makers who need to be involved".into(),
                        "Summarizes mutual interest and key takeaways".into(),
                        "Leaves prospect clear on what happens next".into(),
                    ],
                    evaluation_points: EvaluationPoints {
                        excellent: "Clear commitment secured, specific next steps with dates, prospect is excited".into(),
                        good: "Next action defined, reasonable timeline, both parties aligned".into(),
                        fair: "Vague next steps, no specific commitment, unclear timeline".into(),
                        poor: "No close attempted, left hanging, prospect non-committal".into(),
                    },
                },
            ],
            overall_scoring: vec![
                ScoringBand {
                    min: 90,
                    max: 100,
                    grade: "A - Excellent".into(),
                    description: "Partnership Pro: This was a masterful sales call. Clear discovery, customized value prop, and strong business acumen. Prospect is highly engaged and likely to advance.".into(),
                },
                ScoringBand {
                    min: 80,
                    max: 89,
                    grade: "B - Strong".into(),
                    description: "Solid Performer: A well-executed call with good rapport and discovery. Room for improvement in customization or strategic framing, but moving in the right direction.".into(),
                },
                ScoringBand {
                    min: 70,
                    max: 79,
                    grade: "C - Competent".into(),
                    description: "Getting There: Fundamentals are present but execution is inconsistent. More discovery needed, value prop could be sharper, or structure needs work.".into(),
                },
                ScoringBand {
                    min: 60,
                    max: 69,
                    grade: "D - Needs Improvement".into(),
                    description: "Work Required: Significant gaps in discovery, rapport, or value articulation. May have pitched too early or failed to connect to prospect's needs.".into(),
                },
                ScoringBand {
                    min: 0,
                    max: 59,
                    grade: "F - Poor".into(),
                    description: "Start Over: This call missed the fundamentals. Little to no discovery, generic pitch, or poor rapport. Unlikely to advance without major improvement.".into(),
                },
            ],
            additional_insights: vec![
                InsightDescriptor {
                    insight_type: "talk_ratio".into(),
                    description: "Sales Rep vs. Prospect Speaking Time".into(),
                    optimal: "40/60 to 50/50 - Partnership sales should be consultative, not pitch-heavy".into(),
                    red_flag: "70/30 or worse - Rep is talking too much, not discovering enough".into(),
                },
                InsightDescriptor {
                    insight_type: "question_quality".into(),
                    description: "Discovery Question Analysis".into(),
                    optimal: "5+ strategic open-ended questions about objectives, KPIs, decision process".into(),
                    red_flag: "Only yes/no questions or less than 3 questions total".into(),
                },
                InsightDescriptor {
                    insight_type: "activation_specificity".into(),
                    description: "Partnership Activation Ideas".into(),
                    optimal: "Specific, creative activation examples tailored to prospect's business".into(),
                    red_flag: "Generic 'logo on jersey' talk with no customization".into(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sports_partnership_rubric_is_valid() {
        let rubric = Rubric::sports_partnership();
        rubric.validate().expect("shipped rubric must validate");
        assert_eq!(rubric.categories.len(), 7);
        assert_eq!(rubric.overall_scoring.len(), 5);
        assert_eq!(rubric.additional_insights.len(), 3);
    }

    #[test]
    fn weights_that_do_not_sum_to_one_fail_validation() {
        let mut rubric = Rubric::sports_partnership();
        rubric.categories[0].weight = 0.14;
        assert!(matches!(
            rubric.validate(),
            Err(FeedbackError::InvalidRubric(_))
        ));

        rubric.categories[0].weight = 0.16;
        assert!(matches!(
            rubric.validate(),
            Err(FeedbackError::InvalidRubric(_))
        ));
    }

    #[test]
    fn empty_rubric_fails_validation() {
        let rubric = Rubric {
            categories: Vec::new(),
            overall_scoring: Vec::new(),
            additional_insights: Vec::new(),
        };
        assert!(rubric.validate().is_err());
    }

    #[test]
    fn grade_lookup_uses_inclusive_band_edges() {
        let rubric = Rubric::sports_partnership();
        assert_eq!(rubric.grade_for(80.0).grade, "B - Strong");
        assert_eq!(rubric.grade_for(89.9).grade, "B - Strong");
        assert_eq!(rubric.grade_for(90.0).grade, "A - Excellent");
        assert_eq!(rubric.grade_for(100.0).grade, "A - Excellent");
        assert_eq!(rubric.grade_for(59.9).grade, "F - Poor");
        assert_eq!(rubric.grade_for(60.0).grade, "D - Needs Improvement");
    }

    #[test]
    fn out_of_table_scores_fall_back_to_the_lowest_band() {
        let rubric = Rubric::sports_partnership();
        assert_eq!(rubric.grade_for(150.0).grade, "F - Poor");
        assert_eq!(rubric.grade_for(-5.0).grade, "F - Poor");
    }
}
