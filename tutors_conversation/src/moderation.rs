//! Domain-relevance gate for assistant replies.
//!
//! A blunt case-insensitive keyword screen, not semantic classification:
//! a reply mentioning at least one allowed keyword passes unchanged,
//! anything else is replaced with a fixed refusal steering the user back
//! to in-domain questions. The keyword set is configuration, so the gate
//! can be re-targeted or widened without code changes.

use tracing::debug;

/// Default domain: data science tutoring.
const DEFAULT_KEYWORDS: &[&str] = &[
    "data science",
    "machine learning",
    "statistics",
    "statistical",
    "regression",
    "classification",
    "clustering",
    "neural network",
    "deep learning",
    "dataset",
    "dataframe",
    "probability",
    "hypothesis",
    "feature",
    "model",
    "algorithm",
    "python",
    "pandas",
    "numpy",
    "sql",
    "visualization",
];

const DEFAULT_REFUSAL: &str = "I can only help with data science topics. \
    Try asking about statistics, machine learning, or data analysis.";

/// Keyword gate applied to candidate replies before they reach the user.
#[derive(Debug, Clone)]
pub struct TopicModerator {
    keywords: Vec<String>,
    refusal: String,
}

impl TopicModerator {
    /// Build a gate from a keyword set and refusal text.
    ///
    /// Keywords are matched case-insensitively as substrings. An empty
    /// keyword set passes everything through.
    #[must_use]
    pub fn new(keywords: Vec<String>, refusal: String) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            refusal,
        }
    }

    /// Replace the keyword set. Keywords are lowercased for matching.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Replace the refusal text.
    #[must_use]
    pub fn with_refusal(mut self, refusal: String) -> Self {
        self.refusal = refusal;
        self
    }

    #[must_use]
    pub fn refusal(&self) -> &str {
        &self.refusal
    }

    /// Whether the candidate reply mentions any allowed keyword.
    #[must_use]
    pub fn is_on_topic(&self, candidate: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let lowered = candidate.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Pass the reply through unchanged, or substitute the refusal.
    #[must_use]
    pub fn moderate(&self, candidate: &str) -> String {
        if self.is_on_topic(candidate) {
            candidate.to_string()
        } else {
            debug!("Reply failed the topic gate, substituting refusal");
            self.refusal.clone()
        }
    }
}

impl Default for TopicModerator {
    fn default() -> Self {
        Self::new(
            DEFAULT_KEYWORDS.iter().map(ToString::to_string).collect(),
            DEFAULT_REFUSAL.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_topic_reply_passes_unchanged() {
        let gate = TopicModerator::default();
        let reply = "Gradient descent minimizes loss when training a machine learning model.";

        assert_eq!(gate.moderate(reply), reply);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let gate = TopicModerator::default();
        assert!(gate.is_on_topic("MACHINE LEARNING is a subfield of AI."));
    }

    #[test]
    fn off_topic_reply_gets_refusal() {
        let gate = TopicModerator::default();
        let out = gate.moderate("It will be sunny with a high of 25 degrees.");

        assert_eq!(out, gate.refusal());
    }

    #[test]
    fn empty_keyword_set_passes_everything() {
        let gate = TopicModerator::new(Vec::new(), "no".to_string());
        assert!(gate.is_on_topic("completely unrelated text"));
    }

    #[test]
    fn custom_keywords_override_the_default_domain() {
        let gate = TopicModerator::new(
            vec!["chess".to_string()],
            "Ask me about chess.".to_string(),
        );

        assert_eq!(gate.moderate("The Sicilian is a chess opening."),
            "The Sicilian is a chess opening.");
        assert_eq!(gate.moderate("What is a p-value?"), "Ask me about chess.");
    }
}
