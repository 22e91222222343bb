//! Views over the exam list returned by the backend. Recomputed per request.

use crate::schemas::exam::{ExamOrigin, ExamSummary};

/// Active, manually authored exams the student has not been excluded from.
/// Input order is preserved.
pub(crate) fn available_for_student(all: &[ExamSummary], excluded_ids: &[String]) -> Vec<ExamSummary> {
    all.iter()
        .filter(|exam| exam.active && exam.origin == ExamOrigin::Manual)
        .filter(|exam| !excluded_ids.iter().any(|excluded| excluded == &exam.id))
        .cloned()
        .collect()
}

pub(crate) fn ai_correction_history(all: &[ExamSummary]) -> Vec<ExamSummary> {
    all.iter().filter(|exam| exam.origin == ExamOrigin::AiCorrected).cloned().collect()
}
