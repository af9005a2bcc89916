//! Selection prompt and reply parsing.
//!
//! The model is asked for exactly one JSON object of the form
//! `{"answerText": "...", "answerIndex": N}`. Replies are scanned for the
//! first balanced `{...}` so surrounding prose or code fences are tolerated.

use serde_json::Value;

use quizpilot_core::text::{normalize, same_text};
use quizpilot_core::traits::Selection;
use quizpilot_core::QuizError;

/// Build the single combined instruction + question + candidates prompt.
pub fn build_prompt(question: &str, candidates: &[String], subject: Option<&str>) -> String {
    let topic = subject
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!(" about {}", s.trim()))
        .unwrap_or_default();

    let mut prompt = format!(
        "You answer multiple-choice quiz questions{topic}. \
         Choose exactly ONE option FROM THE GIVEN LIST. \
         Return ONLY one JSON object: {{\"answerText\":\"...\",\"answerIndex\":N}}. Add no other text. \
         If you are not fully certain, still choose the option that best matches the question.\n\n"
    );
    prompt.push_str(&format!("Question: {question}\nOptions:\n"));
    for (i, c) in candidates.iter().enumerate() {
        prompt.push_str(&format!("- [{i}] {c}\n"));
    }
    prompt.push_str("Reply with JSON only, like: {\"answerText\":\"...\",\"answerIndex\":0}");
    prompt
}

/// Return the first balanced brace-delimited substring of `text`.
///
/// Braces inside JSON string literals are ignored.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Fields the model was asked to return. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelAnswer {
    pub answer_text: Option<String>,
    pub answer_index: Option<i64>,
}

/// Parse the model's reply text.
pub fn parse_reply(text: &str) -> Result<ModelAnswer, QuizError> {
    let raw = first_json_object(text)
        .ok_or_else(|| QuizError::ResponseFormat(format!("no JSON object in reply: {text:?}")))?;
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| QuizError::ResponseFormat(format!("reply is not valid JSON: {e}")))?;

    let answer_index = match value.get("answerIndex") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    let answer_text = value
        .get("answerText")
        .and_then(Value::as_str)
        .map(str::to_string);

    if answer_index.is_none() && answer_text.is_none() {
        return Err(QuizError::ResponseFormat(format!(
            "reply has neither answerIndex nor answerText: {raw}"
        )));
    }
    Ok(ModelAnswer {
        answer_text,
        answer_index,
    })
}

/// Resolve a parsed answer against the candidates that were offered.
///
/// The index wins when it is in range; otherwise the text is matched by
/// equivalence.
pub fn resolve_answer(answer: &ModelAnswer, candidates: &[String]) -> Result<Selection, QuizError> {
    let in_range = answer
        .answer_index
        .and_then(|idx| usize::try_from(idx).ok())
        .filter(|&i| i < candidates.len());
    if let Some(index) = in_range {
        return Ok(Selection {
            index,
            text: candidates[index].clone(),
        });
    }
    if let Some(text) = answer.answer_text.as_deref() {
        let wanted = normalize(text);
        if let Some(i) = candidates
            .iter()
            .position(|c| same_text(&normalize(c), &wanted))
        {
            return Ok(Selection {
                index: i,
                text: candidates[i].clone(),
            });
        }
    }
    Err(QuizError::ResponseFormat(format!(
        "answer {answer:?} does not match any of {} candidates",
        candidates.len()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cands(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prompt_enumerates_candidates() {
        let p = build_prompt("2+2?", &cands(&["3", "4"]), Some("arithmetic"));
        assert!(p.contains("quiz questions about arithmetic."));
        assert!(p.contains("Question: 2+2?"));
        assert!(p.contains("- [0] 3\n- [1] 4\n"));
        assert!(p.contains("answerIndex"));
    }

    #[test]
    fn prompt_without_subject() {
        let p = build_prompt("Q", &cands(&["a"]), None);
        assert!(p.starts_with("You answer multiple-choice quiz questions. "));
    }

    #[test]
    fn extracts_object_from_prose() {
        let reply = "Sure! ```json\n{\"answerText\":\"4\",\"answerIndex\":1}\n``` done";
        assert_eq!(
            first_json_object(reply),
            Some("{\"answerText\":\"4\",\"answerIndex\":1}")
        );
    }

    #[test]
    fn nested_and_quoted_braces_are_balanced() {
        let reply = r#"x {"answerText":"set {a}","meta":{"k":1},"answerIndex":0} y {"other":2}"#;
        let obj = first_json_object(reply).unwrap();
        assert!(obj.ends_with("\"answerIndex\":0}"));
        let a = parse_reply(reply).unwrap();
        assert_eq!(a.answer_text.as_deref(), Some("set {a}"));
    }

    #[test]
    fn unbalanced_reply_has_no_object() {
        assert_eq!(first_json_object("{\"answerIndex\": 1"), None);
        assert!(matches!(parse_reply("no json here"), Err(QuizError::ResponseFormat(_))));
    }

    #[test]
    fn missing_fields_are_invalid() {
        assert!(matches!(parse_reply("{\"foo\": 1}"), Err(QuizError::ResponseFormat(_))));
    }

    #[test]
    fn string_index_is_accepted() {
        let a = parse_reply("{\"answerIndex\": \"2\"}").unwrap();
        assert_eq!(a.answer_index, Some(2));
    }

    #[test]
    fn index_in_range_wins() {
        let a = ModelAnswer {
            answer_text: Some("B".into()),
            answer_index: Some(0),
        };
        let s = resolve_answer(&a, &cands(&["A", "B"])).unwrap();
        assert_eq!(s.index, 0);
        assert_eq!(s.text, "A");
    }

    #[test]
    fn out_of_range_index_falls_back_to_text() {
        let a = ModelAnswer {
            answer_text: Some("b.".into()),
            answer_index: Some(5),
        };
        assert_eq!(resolve_answer(&a, &cands(&["A", "B"])).unwrap().index, 1);

        let negative = ModelAnswer {
            answer_text: Some("A".into()),
            answer_index: Some(-1),
        };
        assert_eq!(resolve_answer(&negative, &cands(&["A", "B"])).unwrap().index, 0);
    }

    #[test]
    fn unmatched_answer_is_response_format_error() {
        let a = ModelAnswer {
            answer_text: Some("C".into()),
            answer_index: Some(9),
        };
        assert!(matches!(
            resolve_answer(&a, &cands(&["A", "B"])),
            Err(QuizError::ResponseFormat(_))
        ));
    }
}
