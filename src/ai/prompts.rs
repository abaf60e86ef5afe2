// src/ai/prompts.rs

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::{
    ai::{DocumentParams, GenerateRequest},
    config::MAX_CONTEXT_CHARS,
    models::question::{Question, QuestionType},
};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is invalid"));

const SHAPE_RULES: &str = "\
Each question object has a \"type\" of \"multiple-choice\", \"true-false\", \"short-answer\" or \"fill-in-the-blank\" and a \"question\" string.
- multiple-choice: \"options\" holds 2 to 6 answer texts, \"correctAnswers\" holds the zero-based indexes of the correct options.
- true-false: \"correctAnswer\" is a boolean.
- short-answer and fill-in-the-blank: \"acceptedAnswers\" lists the accepted answer texts. Fill-in-the-blank questions mark the gap with ___.
Every question may carry \"points\" (1 to 10) and a one-sentence \"explanation\".";

/// Collapses whitespace and caps the excerpt at `MAX_CONTEXT_CHARS` characters.
pub fn excerpt(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ");
    collapsed.chars().take(MAX_CONTEXT_CHARS).collect()
}

fn type_list(types: &[QuestionType]) -> String {
    types
        .iter()
        .map(QuestionType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn generate_prompt(request: &GenerateRequest) -> String {
    let mut prompt = format!(
        "You are an experienced teacher writing a quiz.\n\
         Write exactly {count} {difficulty} questions about: {topic}\n\
         Only use these question types: {types}.\n\n{rules}\n\n\
         Respond with a JSON object {{\"questions\": [...]}}.",
        count = request.count,
        difficulty = request.difficulty.as_str(),
        topic = request.topic.trim(),
        types = type_list(&request.question_types),
        rules = SHAPE_RULES,
    );

    if let Some(context) = request.context.as_deref().filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nBase the questions only on this source material:\n\"\"\"\n");
        prompt.push_str(&excerpt(context));
        prompt.push_str("\n\"\"\"");
    }

    prompt
}

pub fn enhance_prompt(question: &Question, instructions: Option<&str>) -> String {
    let options = question
        .options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("  {}. {}", i, o.text))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "Improve this {kind} quiz question. Make the wording clear and unambiguous, \
         make wrong options plausible, keep the same correct answer and the same type, \
         and add a short explanation.\n\n\
         Question: {text}\nOptions:\n{options}\nCorrect answer: {answer}\n\n{rules}\n\n\
         Respond with a single question object.",
        kind = question.question_type.as_str(),
        text = question.text,
        options = if options.is_empty() { "  (none)".to_string() } else { options },
        answer = question.correct_answer_texts().join(" | "),
        rules = SHAPE_RULES,
    );

    if let Some(extra) = instructions.filter(|i| !i.trim().is_empty()) {
        prompt.push_str("\n\nAdditional instructions from the teacher: ");
        prompt.push_str(extra.trim());
    }

    prompt
}

pub fn document_prompt(params: &DocumentParams) -> String {
    format!(
        "Read the attached document. Produce a short quiz title, a summary of at most \
         three sentences, and exactly {count} {difficulty} questions that test its key ideas.\n\n\
         {rules}\n\n\
         Respond with a JSON object {{\"title\": ..., \"summary\": ..., \"questions\": [...]}}.",
        count = params.count,
        difficulty = params.difficulty.as_str(),
        rules = SHAPE_RULES,
    )
}

/// Declared shape of one question, flattened across all variants.
pub fn question_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "type": {
                "type": "STRING",
                "enum": ["multiple-choice", "true-false", "short-answer", "fill-in-the-blank"]
            },
            "question": { "type": "STRING" },
            "options": { "type": "ARRAY", "items": { "type": "STRING" } },
            "correctAnswers": { "type": "ARRAY", "items": { "type": "INTEGER" } },
            "correctAnswer": { "type": "BOOLEAN" },
            "acceptedAnswers": { "type": "ARRAY", "items": { "type": "STRING" } },
            "points": { "type": "INTEGER" },
            "explanation": { "type": "STRING" }
        },
        "required": ["type", "question"]
    })
}

pub fn questions_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "questions": { "type": "ARRAY", "items": question_schema() }
        },
        "required": ["questions"]
    })
}

pub fn document_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "summary": { "type": "STRING" },
            "questions": { "type": "ARRAY", "items": question_schema() }
        },
        "required": ["title", "summary", "questions"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Difficulty;

    #[test]
    fn test_excerpt_collapses_and_truncates() {
        assert_eq!(excerpt("  a \n\n b\tc  "), "a b c");

        let long = "x".repeat(MAX_CONTEXT_CHARS + 50);
        assert_eq!(excerpt(&long).chars().count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn test_generate_prompt_mentions_request() {
        let request = GenerateRequest {
            topic: "Photosynthesis".to_string(),
            count: 7,
            difficulty: Difficulty::Hard,
            question_types: vec![QuestionType::TrueFalse],
            context: Some("Plants   use light.".to_string()),
            points_per_question: None,
        };
        let prompt = generate_prompt(&request);
        assert!(prompt.contains("exactly 7 hard questions about: Photosynthesis"));
        assert!(prompt.contains("Only use these question types: true-false."));
        assert!(prompt.contains("Plants use light."));
    }
}
