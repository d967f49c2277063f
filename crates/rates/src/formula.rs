//! Pure tax formulas over one year's rates.
//!
//! Amounts are in dollars and rounded to cents. Offsets are returned as
//! positive amounts; callers subtract them.

use crate::table::{Bracket, MedicareRates, OffsetSchedule, YearRates};

/// Household details that shift the medicare levy thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Household {
	/// Entitled to the seniors and pensioners tax offset.
	pub sapto: bool,
	/// Combined family income, when the family thresholds apply.
	pub family_income: Option<f64>,
	/// Dependent children.
	pub dependents: u32,
}

/// Income tax on `taxable` income.
pub fn income_tax(rates: &YearRates, taxable: f64) -> f64 {
	cents(bracket_tax(&rates.income_tax, taxable))
}

/// Medicare levy on `taxable` income.
pub fn medicare_levy(rates: &YearRates, taxable: f64, household: Household) -> f64 {
	let m = &rates.medicare;
	let lower = if household.sapto { m.sapto } else { m.single };
	let individual = shade_in(m, taxable, lower);

	let levy = match household.family_income {
		Some(family) if family > 0.0 => {
			let base = if household.sapto { m.family_sapto } else { m.family };
			let family_lower = base + m.per_dependent * f64::from(household.dependents);
			let family_share = if family <= family_lower {
				0.0
			} else {
				m.shade_in_rate * (family - family_lower) * (taxable.max(0.0) / family)
			};
			individual.min(family_share)
		}
		_ => individual,
	};
	cents(levy)
}

/// Low income tax offset.
pub fn lito(rates: &YearRates, taxable: f64) -> f64 {
	cents(rates.lito.as_ref().map_or(0.0, |s| offset(s, taxable)))
}

/// Low and middle income tax offset. Zero for years without one.
pub fn lamito(rates: &YearRates, taxable: f64) -> f64 {
	cents(rates.lamito.as_ref().map_or(0.0, |s| offset(s, taxable)))
}

/// Income tax plus medicare levy less both offsets, floored at zero.
pub fn total_tax(rates: &YearRates, taxable: f64, household: Household) -> f64 {
	let total = income_tax(rates, taxable) + medicare_levy(rates, taxable, household) - lito(rates, taxable) - lamito(rates, taxable);
	cents(total.max(0.0))
}

fn bracket_tax(brackets: &[Bracket], income: f64) -> f64 {
	let mut tax = 0.0;
	for (i, bracket) in brackets.iter().enumerate() {
		if income <= bracket.from {
			break;
		}
		let upper = brackets.get(i + 1).map_or(f64::INFINITY, |next| next.from);
		tax += (income.min(upper) - bracket.from) * bracket.rate;
	}
	tax
}

fn shade_in(m: &MedicareRates, income: f64, lower: f64) -> f64 {
	if income <= lower {
		return 0.0;
	}
	(m.shade_in_rate * (income - lower)).min(m.rate * income)
}

fn offset(schedule: &OffsetSchedule, income: f64) -> f64 {
	if income > schedule.cutoff {
		return 0.0;
	}
	let segment = schedule
		.segments
		.iter()
		.rev()
		.find(|s| s.from <= income)
		.or_else(|| schedule.segments.first());
	segment.map_or(0.0, |s| (s.base + s.rate * (income - s.from)).max(0.0))
}

fn cents(amount: f64) -> f64 {
	(amount * 100.0).round() / 100.0
}
