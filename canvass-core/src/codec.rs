//! Text wire codec for form and answer payloads.
//!
//! A form payload is a run of profile item codes optionally terminated by
//! `,` and a numeric form id (`?*+-,1`). An answer payload is `", "`-joined
//! free text followed by a literal `0` field and the aggregate score
//! (`Alice, 30, F, 123, 0, 7`). The two formats are not inverses of each
//! other.

use crate::form::{AnswerSheet, Form, QuestionCode};

/// Field separator in answer payloads. Free text containing the separator
/// splits; the format has no escaping.
const ANSWER_SEP: &str = ", ";

/// Error decoding a form payload. Always surfaced; malformed input never
/// yields a truncated or empty form.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MalformedFormError {
    #[error("empty form payload")]
    Empty,
    #[error("form payload is not valid UTF-8")]
    Utf8,
    #[error("unknown item code {0:?}")]
    UnknownCode(char),
    #[error("invalid form id {0:?}")]
    InvalidFormId(String),
}

/// Error decoding an answer payload.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MalformedAnswerError {
    #[error("empty answer payload")]
    Empty,
    #[error("answer payload is not valid UTF-8")]
    Utf8,
    #[error("missing zero field before the score")]
    MissingZeroField,
    #[error("invalid score {0:?}")]
    InvalidScore(String),
}

/// Decode a form payload: item codes until the first `,`, then a numeric
/// form id covering the rest of the input.
pub fn decode_form(bytes: &[u8]) -> Result<Form, MalformedFormError> {
    let text = std::str::from_utf8(bytes).map_err(|_| MalformedFormError::Utf8)?;
    if text.is_empty() {
        return Err(MalformedFormError::Empty);
    }
    let mut items = Vec::new();
    let mut form_id = None;
    for (i, c) in text.char_indices() {
        if c == ',' {
            let rest = &text[i + 1..];
            if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return Err(MalformedFormError::InvalidFormId(rest.to_string()));
            }
            let id = rest
                .parse::<u32>()
                .map_err(|_| MalformedFormError::InvalidFormId(rest.to_string()))?;
            form_id = Some(id);
            break;
        }
        match QuestionCode::from_code(c) {
            Some(code) => items.push(code),
            None => return Err(MalformedFormError::UnknownCode(c)),
        }
    }
    Ok(Form { items, form_id })
}

/// Encode an answer payload: the answers, the constant `0` field, and the
/// score, joined with `", "`. Deterministic for deterministic input.
pub fn encode_answers(answers: &[String], score: u32) -> Vec<u8> {
    let mut out = String::new();
    for answer in answers {
        out.push_str(answer);
        out.push_str(ANSWER_SEP);
    }
    out.push('0');
    out.push_str(ANSWER_SEP);
    out.push_str(&score.to_string());
    out.into_bytes()
}

/// Decode an answer payload. The final field is the score, the field
/// before it must be the literal `0`, everything earlier is an answer.
pub fn decode_answers(bytes: &[u8]) -> Result<AnswerSheet, MalformedAnswerError> {
    let text = std::str::from_utf8(bytes).map_err(|_| MalformedAnswerError::Utf8)?;
    if text.is_empty() {
        return Err(MalformedAnswerError::Empty);
    }
    let fields: Vec<&str> = text.split(ANSWER_SEP).collect();
    let (score_field, rest) = match fields.split_last() {
        Some(split) => split,
        None => return Err(MalformedAnswerError::Empty),
    };
    let (zero_field, answers) = match rest.split_last() {
        Some(split) => split,
        None => return Err(MalformedAnswerError::MissingZeroField),
    };
    if *zero_field != "0" {
        return Err(MalformedAnswerError::MissingZeroField);
    }
    let score = score_field
        .parse::<u32>()
        .map_err(|_| MalformedAnswerError::InvalidScore(score_field.to_string()))?;
    Ok(AnswerSheet {
        answers: answers.iter().map(|s| s.to_string()).collect(),
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_profile_items() {
        let form = decode_form(b"?*+-").unwrap();
        assert_eq!(
            form.items,
            vec![
                QuestionCode::Name,
                QuestionCode::Age,
                QuestionCode::Gender,
                QuestionCode::SchoolId,
            ]
        );
        assert_eq!(form.form_id, None);
    }

    #[test]
    fn decode_with_trailing_form_id() {
        let form = decode_form(b"?*+-,1").unwrap();
        assert_eq!(form.items.len(), 4);
        assert_eq!(form.form_id, Some(1));
    }

    #[test]
    fn decode_form_id_without_items() {
        let form = decode_form(b",7").unwrap();
        assert!(form.items.is_empty());
        assert_eq!(form.form_id, Some(7));
    }

    #[test]
    fn decode_empty_input_fails() {
        assert_eq!(decode_form(b""), Err(MalformedFormError::Empty));
    }

    #[test]
    fn decode_unknown_code_fails() {
        assert_eq!(decode_form(b"?x"), Err(MalformedFormError::UnknownCode('x')));
    }

    #[test]
    fn decode_bad_form_id_fails() {
        assert_eq!(
            decode_form(b"?,"),
            Err(MalformedFormError::InvalidFormId(String::new()))
        );
        assert_eq!(
            decode_form(b"?*,abc"),
            Err(MalformedFormError::InvalidFormId("abc".to_string()))
        );
        assert_eq!(
            decode_form(b"?,1,2"),
            Err(MalformedFormError::InvalidFormId("1,2".to_string()))
        );
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert_eq!(decode_form(&[0xff, 0xfe]), Err(MalformedFormError::Utf8));
    }

    #[test]
    fn encode_answers_wire_shape() {
        let answers = vec![
            "Alice".to_string(),
            "30".to_string(),
            "F".to_string(),
            "123".to_string(),
        ];
        assert_eq!(encode_answers(&answers, 7), b"Alice, 30, F, 123, 0, 7");
    }

    #[test]
    fn encode_answers_is_deterministic() {
        let answers = vec!["Bob".to_string()];
        assert_eq!(encode_answers(&answers, 3), encode_answers(&answers, 3));
    }

    #[test]
    fn encode_with_no_answers() {
        assert_eq!(encode_answers(&[], 5), b"0, 5");
    }

    #[test]
    fn decode_answers_wire_shape() {
        let sheet = decode_answers(b"Alice, 30, F, 123, 0, 7").unwrap();
        assert_eq!(sheet.answers, vec!["Alice", "30", "F", "123"]);
        assert_eq!(sheet.score, 7);
    }

    #[test]
    fn decode_answers_requires_zero_field() {
        assert_eq!(
            decode_answers(b"Alice, 1, 7"),
            Err(MalformedAnswerError::MissingZeroField)
        );
        assert_eq!(
            decode_answers(b"Alice"),
            Err(MalformedAnswerError::MissingZeroField)
        );
    }

    #[test]
    fn decode_answers_rejects_bad_score() {
        assert_eq!(
            decode_answers(b"Alice, 0, x"),
            Err(MalformedAnswerError::InvalidScore("x".to_string()))
        );
    }

    #[test]
    fn decode_answers_empty_sheet() {
        let sheet = decode_answers(b"0, 7").unwrap();
        assert!(sheet.answers.is_empty());
        assert_eq!(sheet.score, 7);
    }

    #[test]
    fn form_and_answer_formats_are_not_inverses() {
        let payload = encode_answers(&["Alice".to_string()], 2);
        assert!(decode_form(&payload).is_err());
    }
}
