//! Slot extractors for spoken/typed answers
//!
//! Pure parsing functions returning `Option`; a failed parse is a
//! normal re-prompt, never an error. Rupee parsing understands Indian
//! numbering idioms ("ten lakhs", "five crore") alongside bare numerals.

use lazy_static::lazy_static;
use regex::Regex;

use crate::dialogue::IncomeSource;
use crate::tax::TaxRegime;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"\d+(?:,\d+)*(?:\.\d+)?").unwrap();
}

const WORD_UNITS: &[(&str, f64)] = &[
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
    ("six", 6.0),
    ("seven", 7.0),
    ("eight", 8.0),
    ("nine", 9.0),
    ("ten", 10.0),
    ("eleven", 11.0),
    ("twelve", 12.0),
    ("thirteen", 13.0),
    ("fourteen", 14.0),
    ("fifteen", 15.0),
    ("sixteen", 16.0),
    ("seventeen", 17.0),
    ("eighteen", 18.0),
    ("nineteen", 19.0),
];

const WORD_TENS: &[(&str, f64)] = &[
    ("twenty", 20.0),
    ("thirty", 30.0),
    ("forty", 40.0),
    ("fifty", 50.0),
    ("sixty", 60.0),
    ("seventy", 70.0),
    ("eighty", 80.0),
    ("ninety", 90.0),
];

/// Multiplier implied by an Indian-idiom scale word, if any.
fn scale_multiplier(speech: &str) -> Option<f64> {
    if speech.contains("crore") {
        Some(10_000_000.0)
    } else if speech.contains("lakh") || speech.contains("lac") {
        Some(100_000.0)
    } else if speech.contains("thousand") {
        Some(1_000.0)
    } else {
        None
    }
}

fn word_value(token: &str) -> Option<f64> {
    WORD_UNITS
        .iter()
        .chain(WORD_TENS.iter())
        .find(|entry| entry.0 == token)
        .map(|entry| entry.1)
}

/// First number in the utterance, spoken or numeric. "twenty five"
/// composes; "25" and "2.5" parse directly.
pub fn extract_number(speech: &str) -> Option<f64> {
    let lowered = speech.to_lowercase();

    if let Some(m) = NUMBER_RE.find(&lowered) {
        let cleaned = m.as_str().replace(',', "");
        if let Ok(value) = cleaned.parse::<f64>() {
            return Some(value);
        }
    }

    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        if let Some(tens) = WORD_TENS.iter().find(|entry| entry.0 == *token).map(|entry| entry.1) {
            // "twenty five" composes into 25
            if let Some(unit) = tokens
                .get(i + 1)
                .and_then(|next| WORD_UNITS.iter().find(|entry| entry.0 == *next))
                .map(|entry| entry.1)
            {
                if unit < 10.0 {
                    return Some(tens + unit);
                }
            }
            return Some(tens);
        }
        if let Some(value) = word_value(token) {
            return Some(value);
        }
    }

    None
}

/// Rupee amount with scale words applied: "ten lakhs" → 1,000,000,
/// "five crore" → 50,000,000, "2.5 lakh" → 250,000.
pub fn extract_rupee_amount(speech: &str) -> Option<f64> {
    let lowered = speech.to_lowercase();
    let value = extract_number(&lowered)?;
    if value <= 0.0 {
        return None;
    }
    match scale_multiplier(&lowered) {
        Some(multiplier) => Some(value * multiplier),
        None => Some(value),
    }
}

/// Annual income in rupees. Small bare numbers without a scale word are
/// spoken shorthand and assumed to be lakhs ("twelve" → ₹12,00,000);
/// full figures pass through unchanged.
pub fn extract_income(speech: &str) -> Option<f64> {
    let lowered = speech.to_lowercase();
    let value = extract_number(&lowered)?;
    if value <= 0.0 {
        return None;
    }
    match scale_multiplier(&lowered) {
        Some(multiplier) => Some(value * multiplier),
        None if value < 1_000.0 => Some(value * 100_000.0),
        None => Some(value),
    }
}

/// Investment horizon in whole years.
pub fn extract_years(speech: &str) -> Option<u32> {
    let value = extract_number(speech)?;
    if value > 0.0 && value < 100.0 {
        Some(value as u32)
    } else {
        None
    }
}

/// Income source (salary vs business). Business synonyms are checked
/// first since "self-employed" contains "employed".
pub fn extract_income_source(speech: &str) -> Option<IncomeSource> {
    let lowered = speech.to_lowercase();
    if lowered.contains("business")
        || lowered.contains("self-employed")
        || lowered.contains("freelance")
    {
        Some(IncomeSource::Business)
    } else if lowered.contains("salary") || lowered.contains("job") || lowered.contains("employed")
    {
        Some(IncomeSource::Salary)
    } else {
        None
    }
}

/// Tax regime choice (old vs new).
pub fn extract_tax_regime(speech: &str) -> Option<TaxRegime> {
    let lowered = speech.to_lowercase();
    if lowered.contains("old") {
        Some(TaxRegime::Old)
    } else if lowered.contains("new") {
        Some(TaxRegime::New)
    } else {
        None
    }
}

/// Plain yes/no answer.
pub fn extract_yes_no(speech: &str) -> Option<bool> {
    let lowered = speech.to_lowercase();
    if ["yes", "yeah", "yep", "sure", "correct", "haan"]
        .iter()
        .any(|w| lowered.contains(w))
    {
        Some(true)
    } else if ["no", "nope", "nah"].iter().any(|w| lowered.contains(w)) {
        Some(false)
    } else {
        None
    }
}
