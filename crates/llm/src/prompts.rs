//! Prompt text and response parsing.

use insight_core::{Classification, Sentiment};

use crate::error::CapabilityError;

pub const SENTIMENT_SYSTEM_PROMPT: &str = "You are an expert social media sentiment analyst.
Analyze the following text and extract:
1. Sentiment: strictly 'positive', 'neutral', or 'negative'.
2. Emotion: one word describing the emotion (e.g., trust, excitement, frustration, anger, joy).
3. Confidence: a float between 0.0 and 1.0.

Return the result as a valid JSON object with keys: \"sentiment\", \"emotion\", \"confidence\".";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// First digest of an analysed document: the executive overview.
pub const PAYLOAD_OVERVIEW_INSTRUCTION: &str = "Create a detailed summary info of all the social media handle \
details provided for the company. The summary should have every detail especially in terms of nos and overall \
context, it should capture every possible information which will be important for executives of that company.";

/// Second digest: structure, KPIs and recommendations.
pub const PAYLOAD_KPI_INSTRUCTION: &str = "Summarize the provided JSON output data structure and content \
highlights. Capture the numbers,scores, issues, recommendations, etc whichever is important and relevant for \
the company to know and grow. IT should have every detailed information about each KPIs. The summary should \
be very detailed and should capture every possible information which will be important for executives of \
that company.";

pub fn sentiment_user_prompt(text: &str) -> String {
    format!("Text: {}", text)
}

/// Asks for a short digest of one table's changed rows.
pub fn table_summary_prompt(table: &str, changes: &str) -> String {
    format!(
        "Summarize the recent changes in the '{}' table. Describe notable trends, \
         volumes and anomalies in a few concise sentences.\n\nInput Data:\n{}",
        table, changes
    )
}

pub fn payload_summary_prompt(instruction: &str, payload: &str) -> String {
    format!("{}\n\nInput Data:\n{}", instruction, payload)
}

/// Parses a `{sentiment, emotion, confidence}` object.
///
/// Sentiment must be one of the three labels (any case). Confidence may be
/// a number or a numeric string and is clamped to `[0, 1]`; a missing
/// confidence counts as zero.
pub fn parse_classification(content: &str) -> Result<Classification, CapabilityError> {
    let value: serde_json::Value =
        serde_json::from_str(content.trim()).map_err(|e| CapabilityError::Decode(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| CapabilityError::Decode("classification is not a JSON object".into()))?;

    let sentiment: Sentiment = object
        .get("sentiment")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CapabilityError::Decode("missing sentiment".into()))?
        .parse()
        .map_err(CapabilityError::Decode)?;

    let emotion = object
        .get("emotion")
        .and_then(|v| v.as_str())
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let confidence = match object.get("confidence") {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| CapabilityError::Decode(format!("confidence '{}' is not a number", s)))?,
        _ => 0.0,
    };

    Ok(Classification::new(sentiment, emotion, confidence))
}
