// Sentiment scoring with the VADER lexicon and rules
//
// Scoring is delegated to `vader_sentiment`, which carries the full VADER
// lexicon, booster and negation lists, and the compound normalisation.
// This module adapts its output to typed scores and binary labels.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Binary polarity of a compound score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => f.write_str("positive"),
            SentimentLabel::Negative => f.write_str("negative"),
        }
    }
}

/// Proportions of negative, neutral and positive valence, plus the compound score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub neg: f32,
    pub neu: f32,
    pub pos: f32,
    pub compound: f32,
}

impl SentimentScores {
    fn neutral() -> Self {
        SentimentScores {
            neg: 0.0,
            neu: 0.0,
            pos: 0.0,
            compound: 0.0,
        }
    }
}

/// Reusable VADER scorer
pub struct SentimentAnalyzer {
    inner: SentimentIntensityAnalyzer<'static>,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        SentimentAnalyzer {
            inner: SentimentIntensityAnalyzer::new(),
        }
    }

    pub fn polarity_scores(&self, text: &str) -> SentimentScores {
        if text.trim().is_empty() {
            return SentimentScores::neutral();
        }
        let raw = self.inner.polarity_scores(text);
        SentimentScores {
            neg: score(&raw, "neg"),
            neu: score(&raw, "neu"),
            pos: score(&raw, "pos"),
            compound: score(&raw, "compound"),
        }
    }
}

fn score(raw: &HashMap<&str, f64>, key: &str) -> f32 {
    raw.get(key).copied().unwrap_or(0.0) as f32
}

/// Compound score of every text, in input order
pub fn analyze_sentiment<S: AsRef<str>>(texts: &[S]) -> Vec<f32> {
    let analyzer = SentimentAnalyzer::new();
    texts
        .iter()
        .map(|t| analyzer.polarity_scores(t.as_ref()).compound)
        .collect()
}

/// `Positive` when the score reaches `threshold`, `Negative` otherwise
pub fn label_sentiment(scores: &[f32], threshold: f32) -> Vec<SentimentLabel> {
    scores
        .iter()
        .map(|&s| {
            if s >= threshold {
                SentimentLabel::Positive
            } else {
                SentimentLabel::Negative
            }
        })
        .collect()
}
