//! Text statistics tool.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use gk_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

const PUNCTUATION: &str = ".,!?;:";

/// Counts and readability figures for a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStats {
    pub chars: usize,
    pub chars_no_spaces: usize,
    pub words: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub uppercase: usize,
    pub lowercase: usize,
    pub digits: usize,
    pub punctuation: usize,
    pub avg_word_length: f64,
    pub avg_sentence_length: f64,
    /// Flesch reading ease, clamped to 0..=100.
    pub flesch: f64,
    /// Most frequent words longer than two letters, ties in order of
    /// first appearance.
    pub top_words: Vec<(String, usize)>,
}

/// Readability band for a Flesch score.
pub fn readability(flesch: f64, sentences: usize) -> &'static str {
    if sentences == 0 {
        return "Unknown";
    }
    match flesch {
        s if s >= 90.0 => "Very Easy",
        s if s >= 80.0 => "Easy",
        s if s >= 70.0 => "Fairly Easy",
        s if s >= 60.0 => "Standard",
        s if s >= 50.0 => "Fairly Difficult",
        s if s >= 30.0 => "Difficult",
        _ => "Very Difficult",
    }
}

/// Analyze `text`. Returns `None` for blank input.
pub fn analyze(text: &str) -> Option<TextStats> {
    if text.trim().is_empty() {
        return None;
    }

    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let paragraphs = text
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count();

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();
    for word in &words {
        let clean: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if clean.chars().count() > 2 {
            let count = counts.entry(clean.clone()).or_insert(0);
            if *count == 0 {
                order.push(clean);
            }
            *count += 1;
        }
    }
    let mut top_words: Vec<(String, usize)> = order
        .into_iter()
        .map(|w| {
            let n = counts[&w];
            (w, n)
        })
        .collect();
    // Stable sort keeps first-appearance order among ties.
    top_words.sort_by(|a, b| b.1.cmp(&a.1));
    top_words.truncate(5);

    let letters: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg_word_length = letters as f64 / words.len() as f64;
    let avg_sentence_length = if sentences > 0 {
        words.len() as f64 / sentences as f64
    } else {
        0.0
    };
    let flesch = if sentences > 0 {
        let syllables = avg_word_length * 0.5;
        (206.835 - 1.015 * avg_sentence_length - 84.6 * syllables).clamp(0.0, 100.0)
    } else {
        0.0
    };

    Some(TextStats {
        chars: text.chars().count(),
        chars_no_spaces: text.chars().filter(|c| *c != ' ').count(),
        words: words.len(),
        sentences,
        paragraphs,
        uppercase: text.chars().filter(|c| c.is_uppercase()).count(),
        lowercase: text.chars().filter(|c| c.is_lowercase()).count(),
        digits: text.chars().filter(|c| c.is_ascii_digit()).count(),
        punctuation: text.chars().filter(|c| PUNCTUATION.contains(*c)).count(),
        avg_word_length,
        avg_sentence_length,
        flesch,
        top_words,
    })
}

pub fn format_stats(stats: &TextStats) -> String {
    let mut out = format!(
        "Text analysis:\n\
         • Characters: {} (excluding spaces: {})\n\
         • Words: {}\n\
         • Sentences: {}\n\
         • Paragraphs: {}\n\
         • Uppercase letters: {}\n\
         • Lowercase letters: {}\n\
         • Digits: {}\n\
         • Punctuation marks: {}\n\
         • Average word length: {:.1} characters\n\
         • Average sentence length: {:.1} words\n\
         • Flesch reading ease: {:.1} ({})",
        stats.chars,
        stats.chars_no_spaces,
        stats.words,
        stats.sentences,
        stats.paragraphs,
        stats.uppercase,
        stats.lowercase,
        stats.digits,
        stats.punctuation,
        stats.avg_word_length,
        stats.avg_sentence_length,
        stats.flesch,
        readability(stats.flesch, stats.sentences)
    );

    if !stats.top_words.is_empty() {
        out.push_str("\nMost frequent words:");
        for (i, (word, count)) in stats.top_words.iter().enumerate() {
            out.push_str(&format!("\n{}. '{}' ({} times)", i + 1, word, count));
        }
    }
    out
}

pub struct TextAnalyzerTool;

#[derive(Deserialize)]
struct TextAnalyzerArgs {
    text: String,
}

#[async_trait]
impl Tool for TextAnalyzerTool {
    fn name(&self) -> &str {
        "text_analyzer"
    }

    fn description(&self) -> &str {
        "Analyze text statistics including word count, character count and readability."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "text",
                PropertySchema::string("Text to analyze"),
                true,
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: TextAnalyzerArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("text_analyzer", format!("Invalid arguments: {}", e)))?;

        Ok(match analyze(&args.text) {
            Some(stats) => ToolOutput::success(format_stats(&stats)),
            None => ToolOutput::error("Please provide text to analyze"),
        })
    }
}
