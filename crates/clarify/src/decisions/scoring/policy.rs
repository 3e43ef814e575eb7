use super::super::domain::{OptionScore, RiskLevel};
use super::rules::OptionSignals;

const HIGH_RISK_CONFIDENCE: u8 = 40;
const MEDIUM_RISK_CONFIDENCE: u8 = 70;
const HIGH_RISK_DISPERSION: f64 = 0.30;
const MEDIUM_RISK_DISPERSION: f64 = 0.20;

/// Buckets an option by how much its evaluation can be trusted: thin coverage
/// or criteria pulling in opposite directions both raise the risk.
pub(crate) fn classify_risk(confidence: u8, signals: &OptionSignals) -> RiskLevel {
    if confidence < HIGH_RISK_CONFIDENCE || signals.dispersion >= HIGH_RISK_DISPERSION {
        RiskLevel::High
    } else if confidence < MEDIUM_RISK_CONFIDENCE || signals.dispersion >= MEDIUM_RISK_DISPERSION
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Index of the highest reported score. `results` is in option creation order,
/// so keeping the first maximum breaks ties toward the earliest option.
pub(crate) fn recommended_index(results: &[OptionScore]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, result) in results.iter().enumerate() {
        match best {
            Some((_, score)) if result.score <= score => {}
            _ => best = Some((index, result.score)),
        }
    }
    best.map(|(index, _)| index)
}
