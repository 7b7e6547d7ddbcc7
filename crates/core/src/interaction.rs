//! Social interactions and their sentiment classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An ingested social interaction awaiting classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub interaction_id: String,
    pub text: String,
    pub platform: Option<String>,
}

/// Three-valued sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(format!("unknown sentiment '{}'", other)),
        }
    }
}

/// Output of the classification capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub emotion: Option<String>,
    pub confidence: f64,
}

impl Classification {
    pub fn new(sentiment: Sentiment, emotion: Option<String>, confidence: f64) -> Self {
        Self {
            sentiment,
            emotion,
            confidence: clamp_confidence(confidence),
        }
    }

    /// Substituted when the classification capability fails.
    pub fn fallback() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            emotion: None,
            confidence: 0.0,
        }
    }
}

/// Clamps to `[0, 1]`; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A persisted classification. At most one exists per interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub interaction_id: String,
    pub sentiment: Sentiment,
    pub emotion: Option<String>,
    pub confidence: f64,
    pub model_version: String,
}

impl SentimentResult {
    pub fn from_classification(
        interaction_id: impl Into<String>,
        classification: Classification,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            interaction_id: interaction_id.into(),
            sentiment: classification.sentiment,
            emotion: classification.emotion,
            confidence: clamp_confidence(classification.confidence),
            model_version: model_version.into(),
        }
    }
}
