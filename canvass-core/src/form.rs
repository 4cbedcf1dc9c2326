//! Questionnaire data model: profile item codes, decoded forms, screening
//! questionnaire lookup, and the answer sheet a respondent submits.

/// Single-character profile question code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionCode {
    Name,
    Age,
    Gender,
    SchoolId,
}

impl QuestionCode {
    /// Wire character for this code.
    pub fn code(&self) -> char {
        match self {
            QuestionCode::Name => '?',
            QuestionCode::Age => '*',
            QuestionCode::Gender => '+',
            QuestionCode::SchoolId => '-',
        }
    }

    /// Map a wire character back to a code.
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            '?' => Some(QuestionCode::Name),
            '*' => Some(QuestionCode::Age),
            '+' => Some(QuestionCode::Gender),
            '-' => Some(QuestionCode::SchoolId),
            _ => None,
        }
    }

    /// Question text shown to the respondent.
    pub fn prompt(&self) -> &'static str {
        match self {
            QuestionCode::Name => "What is your name?",
            QuestionCode::Age => "How old are you?",
            QuestionCode::Gender => "What is your gender?",
            QuestionCode::SchoolId => "What is your school ID?",
        }
    }
}

/// Decoded form payload: ordered profile items plus an optional screening
/// questionnaire id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub items: Vec<QuestionCode>,
    pub form_id: Option<u32>,
}

impl Form {
    /// Screening questionnaire selected by the trailing form id, if any.
    /// Unknown ids resolve to None; the renderer then shows only the
    /// profile items.
    pub fn kind(&self) -> Option<FormKind> {
        self.form_id.and_then(FormKind::from_id)
    }
}

/// Screening questionnaires addressable by a numeric form id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// Nine-question depression screen, answered on the frequency scale.
    DepressionScreen,
}

/// Four-point frequency scale shared by all screening questions. A
/// respondent's selection is the 0-based index into this list.
pub const FREQUENCY_CHOICES: [&str; 4] = [
    "Not at all",
    "Several days",
    "More than half the days",
    "Nearly every day",
];

const DEPRESSION_QUESTIONS: [&str; 9] = [
    "Little interest or pleasure in doing things?",
    "Feeling down, depressed, or hopeless?",
    "Trouble falling or staying asleep, or sleeping too much?",
    "Feeling tired or having little energy?",
    "Poor appetite or overeating?",
    "Feeling bad about yourself - or that you are a failure or have let \
     yourself or your family down?",
    "Trouble concentrating on things, such as reading the newspaper or \
     watching television?",
    "Moving or speaking so slowly that other people could have noticed?\n\
     Or the opposite - being so fidgety or restless that you have been \
     moving around a lot more than usual?",
    "Thoughts that you would be better off dead, or of hurting yourself \
     in some way?",
];

impl FormKind {
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(FormKind::DepressionScreen),
            _ => None,
        }
    }

    /// Lead-in shown before the scale questions.
    pub fn preamble(&self) -> &'static str {
        match self {
            FormKind::DepressionScreen => {
                "Over the last two weeks, how often have you been bothered \
                 by any of the following problems?"
            }
        }
    }

    pub fn questions(&self) -> &'static [&'static str] {
        match self {
            FormKind::DepressionScreen => &DEPRESSION_QUESTIONS,
        }
    }
}

/// Ordered free-text answers plus the aggregate score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSheet {
    pub answers: Vec<String>,
    pub score: u32,
}

impl AnswerSheet {
    /// Build a sheet from free-text answers and the 0-based scale
    /// selections. The score is the sum of the selections.
    pub fn new(answers: Vec<String>, selections: &[usize]) -> Self {
        let score = selections.iter().map(|&s| s as u32).sum();
        Self { answers, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for code in [
            QuestionCode::Name,
            QuestionCode::Age,
            QuestionCode::Gender,
            QuestionCode::SchoolId,
        ] {
            assert_eq!(QuestionCode::from_code(code.code()), Some(code));
        }
    }

    #[test]
    fn unknown_code_char() {
        assert_eq!(QuestionCode::from_code('x'), None);
        assert_eq!(QuestionCode::from_code(','), None);
    }

    #[test]
    fn form_kind_lookup() {
        assert_eq!(FormKind::from_id(1), Some(FormKind::DepressionScreen));
        assert_eq!(FormKind::from_id(0), None);
        assert_eq!(FormKind::from_id(42), None);
    }

    #[test]
    fn depression_screen_has_nine_questions() {
        assert_eq!(FormKind::DepressionScreen.questions().len(), 9);
    }

    #[test]
    fn score_is_sum_of_selections() {
        let sheet = AnswerSheet::new(vec!["Alice".into()], &[0, 1, 2, 3, 1]);
        assert_eq!(sheet.score, 7);
        assert_eq!(sheet.answers, vec!["Alice".to_string()]);
    }

    #[test]
    fn score_with_no_selections_is_zero() {
        let sheet = AnswerSheet::new(vec![], &[]);
        assert_eq!(sheet.score, 0);
    }
}
