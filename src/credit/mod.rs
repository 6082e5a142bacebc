//! Credit-report extraction and score analysis
//!
//! Works on raw text already extracted by the external OCR/PDF layer.
//! Extraction is pure regex over that text; analysis bands the score and
//! utilization and produces deterministic improvement suggestions.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref SCORE_RES: Vec<Regex> = vec![
        Regex::new(r"(?i)cibil\s*score[:\s]*(\d{3})").unwrap(),
        Regex::new(r"(?i)credit\s*score[:\s]*(\d{3})").unwrap(),
        Regex::new(r"(?i)score[:\s]*(\d{3})").unwrap(),
    ];
    static ref UTILIZATION_RES: Vec<Regex> = vec![
        Regex::new(r"(?i)credit\s*utilization[:\s]*(\d+(?:\.\d+)?)\s*%").unwrap(),
        Regex::new(r"(?i)utilization(?:\s*ratio)?[:\s]*(\d+(?:\.\d+)?)\s*%").unwrap(),
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*%\s*utilization").unwrap(),
    ];
    static ref PAYMENT_HISTORY_RE: Regex =
        Regex::new(r"(?i)payment\s*history[:\s]*(\d+(?:\.\d+)?)\s*%?").unwrap();
    static ref INQUIRY_RES: Vec<Regex> = vec![
        Regex::new(r"(?i)(\d+)\s*hard\s*inquir").unwrap(),
        Regex::new(r"(?i)hard\s*inquir(?:y|ies)[:\s]*(\d+)").unwrap(),
        Regex::new(r"(?i)enquiries?[:\s]*(\d+)").unwrap(),
    ];
}

/// Structured fields pulled from an OCR'd credit report. Missing fields
/// stay `None`; extraction never fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditReportData {
    pub credit_score: Option<u32>,
    /// Percentage, 0-100.
    pub credit_utilization: Option<f64>,
    /// Percentage of on-time payments, 0-100.
    pub payment_history: Option<f64>,
    pub hard_inquiries: Option<u32>,
}

/// Run the pattern tables over the report text.
pub fn parse_credit_report(text: &str) -> CreditReportData {
    let mut data = CreditReportData::default();

    for re in SCORE_RES.iter() {
        if let Some(caps) = re.captures(text) {
            if let Ok(score) = caps[1].parse::<u32>() {
                if (300..=900).contains(&score) {
                    data.credit_score = Some(score);
                    break;
                }
            }
        }
    }

    for re in UTILIZATION_RES.iter() {
        if let Some(caps) = re.captures(text) {
            if let Ok(pct) = caps[1].parse::<f64>() {
                if (0.0..=100.0).contains(&pct) {
                    data.credit_utilization = Some(pct);
                    break;
                }
            }
        }
    }

    if let Some(caps) = PAYMENT_HISTORY_RE.captures(text) {
        if let Ok(pct) = caps[1].parse::<f64>() {
            if (0.0..=100.0).contains(&pct) {
                data.payment_history = Some(pct);
            }
        }
    }

    for re in INQUIRY_RES.iter() {
        if let Some(caps) = re.captures(text) {
            if let Ok(count) = caps[1].parse::<u32>() {
                data.hard_inquiries = Some(count);
                break;
            }
        }
    }

    data
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
    Bad,
    Unknown,
}

/// CIBIL score bands.
pub fn score_band(score: Option<u32>) -> ScoreBand {
    match score {
        Some(s) if (750..=900).contains(&s) => ScoreBand::Excellent,
        Some(s) if (700..750).contains(&s) => ScoreBand::Good,
        Some(s) if (650..700).contains(&s) => ScoreBand::Fair,
        Some(s) if (550..650).contains(&s) => ScoreBand::Poor,
        Some(s) if (300..550).contains(&s) => ScoreBand::Bad,
        _ => ScoreBand::Unknown,
    }
}

/// Utilization bands: lower is better, 30% is the key threshold.
pub fn utilization_band(utilization: Option<f64>) -> ScoreBand {
    match utilization {
        Some(u) if u <= 10.0 => ScoreBand::Excellent,
        Some(u) if u <= 30.0 => ScoreBand::Good,
        Some(u) if u <= 50.0 => ScoreBand::Fair,
        Some(u) if u <= 70.0 => ScoreBand::Poor,
        Some(u) if u <= 100.0 => ScoreBand::Bad,
        _ => ScoreBand::Unknown,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditReportAnalysis {
    pub data: CreditReportData,
    pub score_band: ScoreBand,
    pub utilization_band: ScoreBand,
    pub recommendations: Vec<String>,
}

/// Band the extracted fields and build an ordered suggestion list.
pub fn analyze_credit_report(text: &str) -> CreditReportAnalysis {
    let data = parse_credit_report(text);
    let recommendations = build_recommendations(&data);

    CreditReportAnalysis {
        score_band: score_band(data.credit_score),
        utilization_band: utilization_band(data.credit_utilization),
        recommendations,
        data,
    }
}

fn build_recommendations(data: &CreditReportData) -> Vec<String> {
    let mut recommendations = Vec::new();

    if let Some(utilization) = data.credit_utilization {
        if utilization > 30.0 {
            recommendations.push(format!(
                "Reduce your credit utilization from {:.0}% to below 30% by paying down card balances; this can lift your score by 50-100 points.",
                utilization
            ));
        } else if utilization > 10.0 {
            recommendations.push(format!(
                "Utilization at {:.0}% is healthy; keeping it below 10% is even better for your score.",
                utilization
            ));
        }
    }

    if data.credit_score.map_or(false, |s| s < 700) {
        recommendations.push(
            "Pay all EMIs and credit card bills on time; set up auto-pay so a single missed payment never dents the score."
                .to_string(),
        );
    }

    if data.hard_inquiries.map_or(false, |n| n > 3) {
        recommendations.push(format!(
            "You have {} hard inquiries; avoid new credit applications for 6-12 months since each one can shave 5-10 points.",
            data.hard_inquiries.unwrap_or(0)
        ));
    }

    match score_band(data.credit_score) {
        ScoreBand::Bad | ScoreBand::Poor => {
            recommendations.push(
                "Consider a secured credit card to rebuild payment history, and keep old accounts open."
                    .to_string(),
            );
        }
        ScoreBand::Fair => {
            recommendations.push(
                "Focus on paying down existing debt and keep a mix of cards and loans.".to_string(),
            );
        }
        ScoreBand::Good => {
            recommendations.push(
                "You're in the good range; a credit limit increase can lower utilization further."
                    .to_string(),
            );
        }
        ScoreBand::Excellent => {
            recommendations.push(
                "Excellent score; maintain current habits to keep qualifying for the best rates."
                    .to_string(),
            );
        }
        ScoreBand::Unknown => {}
    }

    recommendations
}
