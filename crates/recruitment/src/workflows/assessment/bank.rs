use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

const BUILTIN_BANK: &str = include_str!("../../../data/questions.json");

/// Stable identifier of a bank question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: String,
}

impl Question {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }

    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_option == option
    }

    pub fn public_view(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            prompt: self.prompt.clone(),
            options: self.options.clone(),
        }
    }
}

/// Question as shown to applicants; the answer key never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BankDocument {
    version: String,
    questions: Vec<Question>,
}

/// Immutable, validated question set loaded once per process.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBank {
    version: String,
    questions: Vec<Question>,
    positions: HashMap<QuestionId, usize>,
}

impl QuestionBank {
    pub fn new(
        version: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, QuestionBankError> {
        if questions.is_empty() {
            return Err(QuestionBankError::Empty);
        }

        let mut positions = HashMap::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            if positions.insert(question.id, position).is_some() {
                return Err(QuestionBankError::DuplicateId(question.id));
            }
            validate_question(question)?;
        }

        Ok(Self {
            version: version.into(),
            questions,
            positions,
        })
    }

    /// The bank shipped with the service.
    pub fn builtin() -> Result<Self, QuestionBankError> {
        Self::from_json(BUILTIN_BANK)
    }

    pub fn from_json(raw: &str) -> Result<Self, QuestionBankError> {
        let document: BankDocument = serde_json::from_str(raw)?;
        Self::new(document.version, document.questions)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, QuestionBankError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.positions
            .get(&id)
            .and_then(|position| self.questions.get(*position))
    }

    pub fn page_count(&self, per_page: usize) -> usize {
        let per_page = per_page.max(1);
        self.questions.len().div_ceil(per_page)
    }

    /// Zero-based page slice; out-of-range pages are empty.
    pub fn page(&self, index: usize, per_page: usize) -> &[Question] {
        let per_page = per_page.max(1);
        let start = index.saturating_mul(per_page).min(self.questions.len());
        let end = start.saturating_add(per_page).min(self.questions.len());
        &self.questions[start..end]
    }

    pub fn public_questions(&self) -> Vec<PublicQuestion> {
        self.questions.iter().map(Question::public_view).collect()
    }
}

fn validate_question(question: &Question) -> Result<(), QuestionBankError> {
    if question.prompt.trim().is_empty() {
        return Err(QuestionBankError::BlankPrompt(question.id));
    }
    if question.options.len() < 2 {
        return Err(QuestionBankError::TooFewOptions(question.id));
    }

    let mut seen = HashSet::with_capacity(question.options.len());
    if !question.options.iter().all(|option| seen.insert(option.as_str())) {
        return Err(QuestionBankError::DuplicateOption(question.id));
    }
    if !question.has_option(&question.correct_option) {
        return Err(QuestionBankError::AnswerNotAnOption(question.id));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum QuestionBankError {
    #[error("question bank contains no questions")]
    Empty,
    #[error("question id {0} appears more than once")]
    DuplicateId(QuestionId),
    #[error("question {0} has an empty prompt")]
    BlankPrompt(QuestionId),
    #[error("question {0} needs at least two options")]
    TooFewOptions(QuestionId),
    #[error("question {0} lists the same option twice")]
    DuplicateOption(QuestionId),
    #[error("the correct answer of question {0} is not one of its options")]
    AnswerNotAnOption(QuestionId),
    #[error("unable to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("question bank is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn question(id: u32, options: &[&str], correct: &str) -> Question {
        Question {
            id: QuestionId(id),
            prompt: format!("Question {id}"),
            options: options.iter().map(|option| option.to_string()).collect(),
            correct_option: correct.to_string(),
        }
    }

    #[test]
    fn builtin_bank_is_valid() {
        let bank = QuestionBank::builtin().expect("embedded bank parses");
        assert_eq!(bank.len(), 20);
        assert_eq!(bank.version(), "2025-09");
        assert_eq!(bank.page_count(2), 10);
        assert!(bank
            .questions()
            .iter()
            .all(|question| question.has_option(&question.correct_option)));
    }

    #[test]
    fn rejects_empty_bank() {
        assert!(matches!(
            QuestionBank::new("v1", Vec::new()),
            Err(QuestionBankError::Empty)
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = QuestionBank::new(
            "v1",
            vec![question(1, &["a", "b"], "a"), question(1, &["c", "d"], "d")],
        );
        assert!(matches!(result, Err(QuestionBankError::DuplicateId(QuestionId(1)))));
    }

    #[test]
    fn rejects_answer_outside_options() {
        let result = QuestionBank::new("v1", vec![question(3, &["a", "b"], "c")]);
        assert!(matches!(
            result,
            Err(QuestionBankError::AnswerNotAnOption(QuestionId(3)))
        ));
    }

    #[test]
    fn rejects_repeated_options() {
        let result = QuestionBank::new("v1", vec![question(4, &["a", "a", "b"], "b")]);
        assert!(matches!(
            result,
            Err(QuestionBankError::DuplicateOption(QuestionId(4)))
        ));
    }

    #[test]
    fn options_have_no_fixed_count() {
        let bank = QuestionBank::new(
            "v1",
            vec![
                question(1, &["yes", "no"], "yes"),
                question(2, &["a", "b", "c", "d", "e", "f"], "f"),
            ],
        )
        .expect("valid bank");
        assert_eq!(bank.get(QuestionId(2)).map(|q| q.options.len()), Some(6));
    }

    #[test]
    fn paging_covers_every_question_once() {
        let questions = (1..=5).map(|id| question(id, &["a", "b"], "a")).collect();
        let bank = QuestionBank::new("v1", questions).expect("valid bank");

        assert_eq!(bank.page_count(2), 3);
        assert_eq!(bank.page(0, 2).len(), 2);
        assert_eq!(bank.page(2, 2).len(), 1);
        assert_eq!(bank.page(2, 2)[0].id, QuestionId(5));
        assert!(bank.page(3, 2).is_empty());
    }

    #[test]
    fn public_view_hides_answer_key() {
        let bank = QuestionBank::builtin().expect("embedded bank parses");
        let rendered = serde_json::to_string(&bank.public_questions()).expect("serializes");
        assert!(!rendered.contains("correct_option"));
    }

    #[test]
    fn loads_override_bank_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"version":"custom-1","questions":[{{"id":9,"prompt":"Pick b","options":["a","b"],"correct_option":"b"}}]}}"#
        )
        .expect("write bank");

        let bank = QuestionBank::from_path(file.path()).expect("bank loads");
        assert_eq!(bank.version(), "custom-1");
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn reports_malformed_json() {
        assert!(matches!(
            QuestionBank::from_json("{\"version\": 1}"),
            Err(QuestionBankError::Parse(_))
        ));
    }
}
