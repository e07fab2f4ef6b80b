use crate::operation::{OperationRequest, DEFAULT_EXAMPLE_COUNT};

/// Deterministic prompt for an operation: same request, same prompt.
pub(crate) fn render(request: &OperationRequest) -> String {
    match request {
        OperationRequest::Translate(r) => format!(
            "You are a professional Japanese translator. Translate the following text \
             into {target}. Preserve the tone and politeness level, and leave proper \
             names unchanged. Respond with the translation only.\n\nText:\n{text}",
            target = r.target_language,
            text = r.text,
        ),
        OperationRequest::ExplainKanji(r) => format!(
            "You are a Japanese teacher. Explain the kanji {kanji}. Cover the on'yomi \
             and kun'yomi readings, the radical, the core meanings, and two common \
             words using it, each with a translation.",
            kanji = r.kanji,
        ),
        OperationRequest::ExplainGrammar(r) => format!(
            "You are a Japanese teacher. Explain the grammar used in the following \
             sentence. Break it down point by point, name each grammar pattern, and \
             give one further example of each.\n\nSentence:\n{text}",
            text = r.text,
        ),
        OperationRequest::Chat(r) => {
            let mut prompt = String::from(
                "You are a friendly Japanese tutor chatting with a student. Answer in \
                 simple Japanese followed by an English translation in parentheses.\n",
            );
            if let Some(context) = r.context.as_deref().filter(|turns| !turns.is_empty()) {
                prompt.push_str("\nPrevious conversation:\n");
                for turn in context {
                    prompt.push_str(turn);
                    prompt.push('\n');
                }
            }
            prompt.push_str("\nStudent:\n");
            prompt.push_str(&r.message);
            prompt
        }
        OperationRequest::GenerateExamples(r) => format!(
            "You are a Japanese teacher. Write {count} example sentences using the \
             word {word}. One sentence per line, each followed by its English \
             translation in parentheses. Vary the politeness level across the \
             sentences.",
            count = r.count.unwrap_or(DEFAULT_EXAMPLE_COUNT),
            word = r.word,
        ),
        OperationRequest::Probe(r) => r.prompt.clone(),
    }
}
