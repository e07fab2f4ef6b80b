use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ErrorInfo;

/// Placeholder carried on every successful result. A fixed value from the
/// original behavior, not a computed metric.
pub const RESULT_CONFIDENCE: f64 = 0.9;

pub const DEFAULT_EXAMPLE_COUNT: u8 = 3;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TranslateRequest {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub text: String,
    #[serde(rename = "targetLanguage", default)]
    #[validate(min_length = 1)]
    pub target_language: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct KanjiRequest {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub kanji: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GrammarRequest {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub message: String,
    /// Prior conversation turns, oldest first.
    #[serde(default)]
    pub context: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExamplesRequest {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub word: String,
    #[serde(default)]
    #[validate(minimum = 1)]
    #[validate(maximum = 10)]
    pub count: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProbeRequest {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub prompt: String,
}

/// Required string fields default to empty on deserialization so that an
/// absent field fails validation instead of body parsing.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum OperationRequest {
    Translate(TranslateRequest),
    ExplainKanji(KanjiRequest),
    ExplainGrammar(GrammarRequest),
    Chat(ChatRequest),
    GenerateExamples(ExamplesRequest),
    #[serde(rename = "test")]
    Probe(ProbeRequest),
}

impl OperationRequest {
    pub fn name(&self) -> &'static str {
        match self {
            OperationRequest::Translate(_) => "translate",
            OperationRequest::ExplainKanji(_) => "explain-kanji",
            OperationRequest::ExplainGrammar(_) => "explain-grammar",
            OperationRequest::Chat(_) => "chat",
            OperationRequest::GenerateExamples(_) => "generate-examples",
            OperationRequest::Probe(_) => "test",
        }
    }

    pub(crate) fn validate_fields(&self) -> Result<(), ErrorInfo> {
        let result = match self {
            OperationRequest::Translate(request) => request.validate(),
            OperationRequest::ExplainKanji(request) => request.validate(),
            OperationRequest::ExplainGrammar(request) => request.validate(),
            OperationRequest::Chat(request) => request.validate(),
            OperationRequest::GenerateExamples(request) => request.validate(),
            OperationRequest::Probe(request) => request.validate(),
        };
        result.map_err(|errors| {
            ErrorInfo::validation(format!("invalid {} request: {errors}", self.name()))
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OperationOutput {
    Translation {
        translation: String,
        #[serde(rename = "targetLanguage")]
        target_language: String,
    },
    Kanji {
        kanji: String,
        explanation: String,
    },
    Grammar {
        explanation: String,
    },
    Chat {
        reply: String,
    },
    Examples {
        word: String,
        examples: Vec<String>,
    },
    Probe {
        output: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    #[serde(flatten)]
    pub output: OperationOutput,
    pub confidence: f64,
    pub timestamp: String,
}

impl OperationResult {
    pub(crate) fn from_text(request: &OperationRequest, text: String) -> Self {
        let output = match request {
            OperationRequest::Translate(r) => OperationOutput::Translation {
                translation: text,
                target_language: r.target_language.clone(),
            },
            OperationRequest::ExplainKanji(r) => OperationOutput::Kanji {
                kanji: r.kanji.clone(),
                explanation: text,
            },
            OperationRequest::ExplainGrammar(_) => OperationOutput::Grammar { explanation: text },
            OperationRequest::Chat(_) => OperationOutput::Chat { reply: text },
            OperationRequest::GenerateExamples(r) => OperationOutput::Examples {
                word: r.word.clone(),
                examples: split_lines(&text),
            },
            OperationRequest::Probe(_) => OperationOutput::Probe { output: text },
        };
        Self {
            output,
            confidence: RESULT_CONFIDENCE,
            timestamp: timestamp_now(),
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_deserialize_from_the_tagged_wire_shape() {
        let raw = r#"{
            "operation": "translate",
            "text": "Hello world",
            "targetLanguage": "Indonesian"
        }"#;
        let request: OperationRequest = serde_json::from_str(raw).unwrap();
        match &request {
            OperationRequest::Translate(r) => {
                assert_eq!(r.text, "Hello world");
                assert_eq!(r.target_language, "Indonesian");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert_eq!(request.name(), "translate");

        let raw = r#"{ "operation": "explain-kanji", "kanji": "言葉" }"#;
        let request: OperationRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.name(), "explain-kanji");

        let raw = r#"{ "operation": "test", "prompt": "ping" }"#;
        let request: OperationRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.name(), "test");
    }

    #[test]
    fn empty_required_fields_fail_validation() {
        let request = OperationRequest::ExplainKanji(KanjiRequest {
            kanji: String::new(),
        });
        let err = request.validate_fields().unwrap_err();
        assert!(err.message.contains("kanji"));
    }

    #[test]
    fn example_count_is_bounded() {
        let request = OperationRequest::GenerateExamples(ExamplesRequest {
            word: "勉強".to_string(),
            count: Some(50),
        });
        assert!(request.validate_fields().is_err());

        let request = OperationRequest::GenerateExamples(ExamplesRequest {
            word: "勉強".to_string(),
            count: Some(5),
        });
        assert!(request.validate_fields().is_ok());
    }

    #[test]
    fn results_flatten_operation_fields_with_the_constant_confidence() {
        let request = OperationRequest::Translate(TranslateRequest {
            text: "Hello world".to_string(),
            target_language: "Indonesian".to_string(),
        });
        let result = OperationResult::from_text(&request, "Halo dunia".to_string());
        let rendered = serde_json::to_value(&result).unwrap();
        assert_eq!(rendered["translation"], "Halo dunia");
        assert_eq!(rendered["targetLanguage"], "Indonesian");
        assert_eq!(rendered["confidence"], RESULT_CONFIDENCE);
        assert!(rendered["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[test]
    fn example_output_splits_one_sentence_per_line() {
        let request = OperationRequest::GenerateExamples(ExamplesRequest {
            word: "勉強".to_string(),
            count: None,
        });
        let text = "毎日勉強します。 (I study every day.)\n\n  図書館で勉強しました。 (I studied at the library.)  \n";
        let result = OperationResult::from_text(&request, text.to_string());
        match result.output {
            OperationOutput::Examples { examples, .. } => {
                assert_eq!(examples.len(), 2);
                assert!(examples[1].starts_with("図書館"));
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }
}
