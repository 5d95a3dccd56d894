use crate::types::Question;

/// One question per line; blank lines are dropped.
pub fn split_questions(input: &str) -> Vec<Question> {
    input.lines().filter_map(Question::new).collect()
}
