use crate::schemas::exam::{ExamDefinition, ExamOrigin, Question, QuestionKind};

const PLACEHOLDER_TITLE: &str = "Sample Exam";
const PLACEHOLDER_DURATION_MINUTES: u32 = 60;
const PLACEHOLDER_MARKS: u32 = 5;

const PLACEHOLDER_QUESTIONS: &[(&str, &str)] = &[
    ("q1", "What is 2 + 2?"),
    ("q2", "What is the capital of France?"),
    ("q3", "What is 10 * 5?"),
];

/// Stand-in exam used when the real definition cannot be loaded. Keeps the
/// requested id so a later submission is still attributed to it.
pub(crate) fn placeholder_exam(exam_id: &str) -> ExamDefinition {
    let questions = PLACEHOLDER_QUESTIONS
        .iter()
        .map(|(id, text)| Question {
            id: (*id).to_string(),
            text: (*text).to_string(),
            kind: QuestionKind::MultipleChoice,
            marks: PLACEHOLDER_MARKS,
        })
        .collect();

    ExamDefinition {
        id: exam_id.to_string(),
        title: PLACEHOLDER_TITLE.to_string(),
        duration_minutes: PLACEHOLDER_DURATION_MINUTES,
        questions,
        origin: ExamOrigin::Manual,
        grading_scale: None,
    }
}
