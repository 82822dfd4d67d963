//! Score guesses offered while the report is being generated.

use serde::Serialize;

pub const GUESS_OPTIONS: [&str; 4] = ["0%-25%", "25%-50%", "50%-75%", "75%-100%"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuessRange {
    pub low: u32,
    pub high: u32,
}

impl GuessRange {
    /// Reads the first two numbers of a range label such as `25%-50%`.
    ///
    /// `low` is the last (at most three) digits of the first digit run and
    /// `high` the first (at most three) digits of the next run. The runs must
    /// be separated by at least one non-digit character.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let first_start = bytes.iter().position(u8::is_ascii_digit)?;
        let first_len = bytes[first_start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let first_end = first_start + first_len;

        let second_start = first_end
            + bytes[first_end..]
                .iter()
                .position(u8::is_ascii_digit)?;
        let second_len = bytes[second_start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();

        let low = &text[first_end - first_len.min(3)..first_end];
        let high = &text[second_start..second_start + second_len.min(3)];
        Some(Self {
            low: low.parse().ok()?,
            high: high.parse().ok()?,
        })
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= f64::from(self.low) && score <= f64::from(self.high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessVerdict {
    Pending,
    Correct,
    Incorrect,
}

/// Compares a guess label with the final score, if there is one yet.
pub fn judge_guess(guessed_range: &str, score: Option<f64>) -> GuessVerdict {
    let Some(score) = score else {
        return GuessVerdict::Pending;
    };
    match GuessRange::parse(guessed_range) {
        Some(range) if range.contains(score) => GuessVerdict::Correct,
        _ => GuessVerdict::Incorrect,
    }
}
