use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `GET /api/meetings/{meeting_id}`.
///
/// `data` stays untyped until classification: only an object carries a
/// report, any other shape is a report that has not been produced yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
}

impl MeetingEnvelope {
    pub fn report(&self) -> Option<MeetingReport> {
        match &self.data {
            Some(data @ Value::Object(_)) => MeetingReport::deserialize(data).ok(),
            _ => None,
        }
    }

    pub fn classify(&self) -> ReportStatus {
        match self.report() {
            Some(report) => report.classify(),
            None => ReportStatus::Processing,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Value>,
    /// `None` when the field is absent, `Some(Value::Null)` for an explicit null.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub streak: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Typed outcome of one report fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportStatus {
    Processing,
    Ready { score: f64 },
    Failed { message: String },
}

impl MeetingReport {
    /// Maps the loosely shaped backend payload onto [`ReportStatus`].
    ///
    /// A numeric `feedback.averagePercentage` is a final score unless
    /// `streak` is explicitly `null`; an absent `streak` does not hold the
    /// report back. A truthy `error` field is a server-side failure. Anything
    /// else is still processing.
    pub fn classify(&self) -> ReportStatus {
        let score = self
            .feedback
            .as_ref()
            .and_then(|feedback| feedback.get("averagePercentage"))
            .filter(|value| value.is_number())
            .and_then(Value::as_f64);
        let streak_blocks = matches!(self.streak, Some(Value::Null));

        if let Some(score) = score {
            if !streak_blocks {
                return ReportStatus::Ready { score };
            }
        }

        if let Some(error) = self.error.as_ref().filter(|value| is_truthy(value)) {
            let message = match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return ReportStatus::Failed { message };
        }

        ReportStatus::Processing
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
