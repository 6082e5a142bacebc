//! Progressive slab walk and cess
//!
//! The engine is regime-agnostic: a regime is nothing more than a slab
//! table. Deduction rules differ upstream in the planner.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat health-and-education cess applied on top of the slab tax.
pub const CESS_RATE: f64 = 0.04;

/// Standard deduction available to salaried income under both regimes.
pub const STANDARD_DEDUCTION: f64 = 50_000.0;

/// Old regime slabs: (upper bound, marginal rate). The final bound is
/// unbounded; its rate still applies.
pub const OLD_REGIME_SLABS: &[(f64, f64)] = &[
    (250_000.0, 0.0),
    (500_000.0, 0.05),
    (1_000_000.0, 0.20),
    (f64::INFINITY, 0.30),
];

/// New regime slabs (no itemized deductions upstream).
pub const NEW_REGIME_SLABS: &[(f64, f64)] = &[
    (300_000.0, 0.0),
    (600_000.0, 0.05),
    (900_000.0, 0.10),
    (1_200_000.0, 0.15),
    (1_500_000.0, 0.20),
    (f64::INFINITY, 0.30),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    Old,
    New,
}

impl TaxRegime {
    pub fn slabs(&self) -> &'static [(f64, f64)] {
        match self {
            TaxRegime::Old => OLD_REGIME_SLABS,
            TaxRegime::New => NEW_REGIME_SLABS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRegime::Old => "old",
            TaxRegime::New => "new",
        }
    }
}

impl fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Walk the slabs in ascending order and accumulate marginal tax.
/// Negative income is clamped to zero; callers validate income at the
/// boundary before it gets here.
pub fn compute_bracket_tax(income: f64, slabs: &[(f64, f64)]) -> f64 {
    let income = income.max(0.0);
    let mut tax = 0.0;
    let mut prev_limit = 0.0;

    for &(limit, rate) in slabs {
        if income <= prev_limit {
            break;
        }

        let taxable_in_slab = income.min(limit) - prev_limit;
        tax += taxable_in_slab * rate;
        prev_limit = limit;

        if income <= limit {
            break;
        }
    }

    tax
}

/// Cess is a separate surcharge step, not a slab.
pub fn apply_cess(gross_tax: f64) -> f64 {
    gross_tax * (1.0 + CESS_RATE)
}

/// Slab tax plus cess for one regime.
pub fn total_tax_for_regime(income: f64, regime: TaxRegime) -> f64 {
    apply_cess(compute_bracket_tax(income, regime.slabs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "expected {}, got {}", b, a);
    }

    #[test]
    fn test_zero_income() {
        approx_eq(compute_bracket_tax(0.0, OLD_REGIME_SLABS), 0.0);
        approx_eq(total_tax_for_regime(0.0, TaxRegime::New), 0.0);
    }

    #[test]
    fn test_negative_income_clamped() {
        approx_eq(compute_bracket_tax(-50_000.0, NEW_REGIME_SLABS), 0.0);
    }

    #[test]
    fn test_new_regime_twelve_lakh() {
        // 3L @ 0 + 3L @ 5% + 3L @ 10% + 3L @ 15% = 90,000
        approx_eq(compute_bracket_tax(1_200_000.0, NEW_REGIME_SLABS), 90_000.0);
        approx_eq(total_tax_for_regime(1_200_000.0, TaxRegime::New), 93_600.0);
    }

    #[test]
    fn test_old_regime_nine_and_half_lakh() {
        // 2.5L @ 0 + 2.5L @ 5% + 4.5L @ 20% = 1,02,500
        approx_eq(compute_bracket_tax(950_000.0, OLD_REGIME_SLABS), 102_500.0);
        approx_eq(total_tax_for_regime(950_000.0, TaxRegime::Old), 106_600.0);
    }

    #[test]
    fn test_old_regime_twelve_lakh() {
        // 2.5L @ 0 + 2.5L @ 5% + 5L @ 20% + 2L @ 30% = 1,72,500
        approx_eq(compute_bracket_tax(1_200_000.0, OLD_REGIME_SLABS), 172_500.0);
        approx_eq(total_tax_for_regime(1_200_000.0, TaxRegime::Old), 179_400.0);
    }

    #[test]
    fn test_income_on_slab_boundary() {
        approx_eq(compute_bracket_tax(500_000.0, OLD_REGIME_SLABS), 12_500.0);
        approx_eq(compute_bracket_tax(300_000.0, NEW_REGIME_SLABS), 0.0);
    }

    #[test]
    fn test_monotonic_in_income() {
        for regime in [TaxRegime::Old, TaxRegime::New] {
            let mut previous = 0.0;
            for step in 0..=60 {
                let income = step as f64 * 50_000.0;
                let tax = total_tax_for_regime(income, regime);
                assert!(
                    tax >= previous,
                    "tax decreased at income {} under {} regime",
                    income,
                    regime
                );
                previous = tax;
            }
        }
    }
}
