use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schemas::exam::Question;

/// Current answer text per question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct AnswerMap(HashMap<String, String>);

impl AnswerMap {
    /// Overwrites any earlier answer and returns it. Ids are not checked
    /// against the exam.
    pub(crate) fn record(&mut self, question_id: &str, text: String) -> Option<String> {
        self.0.insert(question_id.to_string(), text)
    }

    pub(crate) fn get(&self, question_id: &str) -> Option<&str> {
        self.0.get(question_id).map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn is_answered(&self, question_id: &str) -> bool {
        self.get(question_id).is_some_and(|text| !text.is_empty())
    }

    /// Questions of the exam with a present, non-empty answer. Entries for
    /// unknown ids do not count.
    pub(crate) fn answered_count(&self, questions: &[Question]) -> usize {
        questions.iter().filter(|question| self.is_answered(&question.id)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::exam::QuestionKind;

    fn question(id: &str) -> Question {
        Question { id: id.to_string(), text: String::new(), kind: QuestionKind::FreeText, marks: 1 }
    }

    #[test]
    fn recording_twice_keeps_latest_value() {
        let mut answers = AnswerMap::default();
        assert_eq!(answers.record("q3", "first".to_string()), None);
        assert_eq!(answers.record("q3", "second".to_string()), Some("first".to_string()));

        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get("q3"), Some("second"));
    }

    #[test]
    fn answered_count_ignores_empty_and_unknown_entries() {
        let questions = vec![question("q1"), question("q2"), question("q3")];
        let mut answers = AnswerMap::default();
        answers.record("q1", "yes".to_string());
        answers.record("q2", String::new());
        answers.record("ghost", "boo".to_string());

        assert_eq!(answers.len(), 3);
        assert_eq!(answers.answered_count(&questions), 1);
    }
}
