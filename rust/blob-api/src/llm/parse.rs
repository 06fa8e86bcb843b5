//! Turning a model's text reply into flashcards.

use serde_json::Value;

use super::{GeneratedFlashcard, GenerationError};
use crate::domain::Difficulty;

/// Remove a leading ```` ```json ```` or ```` ``` ```` fence and a trailing
/// ```` ``` ```` fence, then trim.
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = strip_prefix_ignore_case(text, "```json") {
        text = rest.trim_start();
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text.trim()
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

/// Parse and validate the reply text.
///
/// The reply must be a JSON array whose items carry non-empty string `front`
/// and `back` and, optionally, a known `difficulty`. Any bad item fails the
/// whole reply.
pub fn parse_flashcards(text: &str) -> Result<Vec<GeneratedFlashcard>, GenerationError> {
    let value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| GenerationError::Malformed(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(GenerationError::NotAnArray);
    };

    items.iter().map(parse_card).collect()
}

fn parse_card(item: &Value) -> Result<GeneratedFlashcard, GenerationError> {
    let front = item.get("front").filter(|v| is_present(v));
    let back = item.get("back").filter(|v| is_present(v));
    let (Some(front), Some(back)) = (front, back) else {
        return Err(GenerationError::MissingSide);
    };
    let (Some(front), Some(back)) = (front.as_str(), back.as_str()) else {
        return Err(GenerationError::NonStringSide);
    };

    let difficulty = match item.get("difficulty") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(
            s.parse::<Difficulty>()
                .map_err(|_| GenerationError::InvalidDifficulty(s.clone()))?,
        ),
        Some(other) => return Err(GenerationError::InvalidDifficulty(other.to_string())),
    };

    Ok(GeneratedFlashcard {
        front: front.to_string(),
        back: back.to_string(),
        difficulty,
    })
}

/// Present in the sense of "not absent, null, false, 0 or an empty string".
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```JSON [1] ```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn test_fenced_reply_parses() {
        let reply = "```json\n[{\"front\":\"Q\",\"back\":\"A\",\"difficulty\":\"easy\"}]\n```";
        let cards = parse_flashcards(reply).expect("parse");

        assert_eq!(
            cards,
            vec![GeneratedFlashcard {
                front: "Q".to_string(),
                back: "A".to_string(),
                difficulty: Some(Difficulty::Easy),
            }]
        );
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(
            parse_flashcards("{\"front\":\"Q\"}"),
            Err(GenerationError::NotAnArray)
        );
        assert_eq!(
            parse_flashcards("[{\"front\":\"Q\"}]"),
            Err(GenerationError::MissingSide)
        );
        assert_eq!(
            parse_flashcards("[{\"front\":\"Q\",\"back\":\"\"}]"),
            Err(GenerationError::MissingSide)
        );
        assert_eq!(
            parse_flashcards("[{\"front\":\"Q\",\"back\":42}]"),
            Err(GenerationError::NonStringSide)
        );
        assert_eq!(
            parse_flashcards("[{\"front\":\"Q\",\"back\":\"A\",\"difficulty\":\"brutal\"}]"),
            Err(GenerationError::InvalidDifficulty("brutal".to_string()))
        );
        assert!(matches!(
            parse_flashcards("here are your cards"),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_one_bad_item_fails_all() {
        let reply = r#"[{"front":"Q1","back":"A1"},{"front":"Q2"}]"#;
        assert_eq!(parse_flashcards(reply), Err(GenerationError::MissingSide));
    }
}
