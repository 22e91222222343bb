use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::services::grade_bands::{ConfigurationError, GradingScale};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub(crate) enum QuestionKind {
    MultipleChoice,
    #[default]
    FreeText,
}

impl From<String> for QuestionKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "mcq" | "multiple_choice" | "multiplechoice" => QuestionKind::MultipleChoice,
            _ => QuestionKind::FreeText,
        }
    }
}

/// How an exam came to exist. Replaces matching on a sentinel description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ExamOrigin {
    #[default]
    Manual,
    #[serde(alias = "ai-corrected", alias = "aiCorrected")]
    AiCorrected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub(crate) struct Question {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question id must not be empty"))]
    pub(crate) id: String,
    #[serde(alias = "questionText")]
    pub(crate) text: String,
    #[serde(default, alias = "type")]
    pub(crate) kind: QuestionKind,
    #[validate(range(min = 1, message = "marks must be positive"))]
    pub(crate) marks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub(crate) struct ExamDefinition {
    #[serde(alias = "examId")]
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(alias = "duration")]
    #[validate(range(min = 1, message = "duration must be at least one minute"))]
    pub(crate) duration_minutes: u32,
    #[validate(length(min = 1, message = "exam must contain at least one question"), nested)]
    pub(crate) questions: Vec<Question>,
    #[serde(default)]
    pub(crate) origin: ExamOrigin,
    #[serde(default, alias = "gradingScale", skip_serializing_if = "Option::is_none")]
    pub(crate) grading_scale: Option<Value>,
}

impl ExamDefinition {
    /// Field-level validation plus uniqueness of question ids.
    pub(crate) fn check(&self) -> Result<(), String> {
        self.validate().map_err(|err| err.to_string())?;

        let mut seen = HashSet::with_capacity(self.questions.len());
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(format!("duplicate question id '{}'", question.id));
            }
        }

        Ok(())
    }

    pub(crate) fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub(crate) fn total_marks(&self) -> u64 {
        self.questions.iter().map(|question| u64::from(question.marks)).sum()
    }

    /// Scale persisted with the exam, if any. Stored either as an object or as
    /// a JSON-encoded string.
    pub(crate) fn embedded_grading_scale(&self) -> Option<Result<GradingScale, ConfigurationError>> {
        match self.grading_scale.as_ref()? {
            Value::Null => None,
            value => Some(GradingScale::from_value(value)),
        }
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ExamSummary {
    #[serde(alias = "examId")]
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "duration")]
    pub(crate) duration_minutes: Option<u32>,
    #[serde(default)]
    pub(crate) origin: ExamOrigin,
    #[serde(default = "default_active", alias = "isActive")]
    pub(crate) active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_payload() -> Value {
        json!({
            "examId": "exam1",
            "title": "Mathematics Final",
            "duration": 45,
            "questions": [
                {"questionId": "q1", "questionText": "What is 2 + 2?", "type": "MCQ", "marks": 5},
                {"questionId": "q2", "questionText": "Prove it.", "type": "TEXT", "marks": 10}
            ],
            "gradingScale": "{\"A\":90,\"B\":80,\"C\":70,\"D\":60,\"F\":0}"
        })
    }

    #[test]
    fn decodes_legacy_field_names() {
        let exam: ExamDefinition = serde_json::from_value(legacy_payload()).expect("exam");
        assert_eq!(exam.id, "exam1");
        assert_eq!(exam.duration_minutes, 45);
        assert_eq!(exam.questions[0].kind, QuestionKind::MultipleChoice);
        assert_eq!(exam.questions[1].kind, QuestionKind::FreeText);
        assert_eq!(exam.origin, ExamOrigin::Manual);
        assert_eq!(exam.total_marks(), 15);
        assert!(exam.check().is_ok());

        let scale = exam.embedded_grading_scale().expect("scale present").expect("valid scale");
        assert_eq!(scale.bands()[0].label, "A");
    }

    #[test]
    fn check_rejects_empty_and_duplicate_questions() {
        let mut exam: ExamDefinition = serde_json::from_value(legacy_payload()).expect("exam");
        exam.questions[1].id = "q1".to_string();
        assert!(exam.check().expect_err("duplicate").contains("duplicate question id"));

        exam.questions.clear();
        assert!(exam.check().is_err());
    }

    #[test]
    fn total_marks_does_not_wrap() {
        let mut exam: ExamDefinition = serde_json::from_value(legacy_payload()).expect("exam");
        exam.questions[0].marks = u32::MAX;
        exam.questions[1].marks = u32::MAX;
        assert_eq!(exam.total_marks(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn check_rejects_zero_duration_and_marks() {
        let mut exam: ExamDefinition = serde_json::from_value(legacy_payload()).expect("exam");
        exam.duration_minutes = 0;
        assert!(exam.check().is_err());

        let mut exam: ExamDefinition = serde_json::from_value(legacy_payload()).expect("exam");
        exam.questions[0].marks = 0;
        assert!(exam.check().is_err());
    }

    #[test]
    fn origin_is_an_explicit_field() {
        let summary: ExamSummary = serde_json::from_value(json!({
            "examId": "e9",
            "title": "Scanned",
            "description": "AI Corrected Exam",
            "origin": "ai_corrected"
        }))
        .expect("summary");
        assert_eq!(summary.origin, ExamOrigin::AiCorrected);
        assert!(summary.active);

        let summary: ExamSummary = serde_json::from_value(json!({
            "examId": "e10",
            "title": "Lookalike",
            "description": "AI Corrected Exam"
        }))
        .expect("summary");
        assert_eq!(summary.origin, ExamOrigin::Manual);
    }
}
