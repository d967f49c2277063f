//! Rate table model and loading.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

const BUILTIN: &str = include_str!("../data/rates.toml");

/// All known years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateTables {
	years: BTreeMap<String, YearRates>,
}

/// Rates for one financial year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YearRates {
	/// Marginal brackets in ascending order of `from`.
	pub income_tax: Vec<Bracket>,
	/// Medicare levy parameters.
	pub medicare: MedicareRates,
	/// Low income tax offset.
	#[serde(default)]
	pub lito: Option<OffsetSchedule>,
	/// Low and middle income tax offset.
	#[serde(default)]
	pub lamito: Option<OffsetSchedule>,
}

/// One marginal bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
	/// Income at which the rate starts to apply.
	pub from: f64,
	/// Marginal rate.
	pub rate: f64,
}

/// Medicare levy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedicareRates {
	/// Full levy rate.
	pub rate: f64,
	/// Rate applied to income above the lower threshold while shading in.
	pub shade_in_rate: f64,
	/// Lower threshold for singles.
	pub single: f64,
	/// Lower threshold for singles entitled to SAPTO.
	pub sapto: f64,
	/// Lower threshold for families.
	pub family: f64,
	/// Lower threshold for families entitled to SAPTO.
	pub family_sapto: f64,
	/// Family threshold increase per dependent child.
	pub per_dependent: f64,
}

/// Piecewise-linear offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetSchedule {
	/// Income above which no offset is paid.
	pub cutoff: f64,
	/// Segments in ascending order of `from`.
	pub segments: Vec<Segment>,
}

/// `base + rate * (income - from)` for incomes from `from` up to the next segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
	/// Segment start.
	pub from: f64,
	/// Offset at `from`.
	pub base: f64,
	/// Change in offset per dollar above `from`.
	pub rate: f64,
}

impl RateTables {
	/// Tables shipped with the crate.
	pub fn builtin() -> Result<Self> {
		Self::from_toml_str(BUILTIN)
	}

	/// Parses and validates tables from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		let tables: Self = toml::from_str(text)?;
		tables.validate()?;
		Ok(tables)
	}

	/// Reads tables from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&text)
	}

	/// Rates for `year` (`"2024-25"`).
	pub fn year(&self, year: &str) -> Result<&YearRates> {
		self.years.get(year).ok_or_else(|| Error::UnknownYear(year.to_string()))
	}

	/// Known year keys in ascending order.
	pub fn years(&self) -> impl Iterator<Item = &str> {
		self.years.keys().map(String::as_str)
	}

	fn validate(&self) -> Result<()> {
		for (year, rates) in &self.years {
			let invalid = |reason: &str| Error::InvalidTable {
				year: year.clone(),
				reason: reason.to_string(),
			};
			if rates.income_tax.is_empty() {
				return Err(invalid("income_tax has no brackets"));
			}
			if !ascending(rates.income_tax.iter().map(|b| b.from)) {
				return Err(invalid("income_tax brackets are not in ascending order"));
			}
			for (name, schedule) in [("lito", &rates.lito), ("lamito", &rates.lamito)] {
				let Some(schedule) = schedule else { continue };
				if schedule.segments.is_empty() || !ascending(schedule.segments.iter().map(|s| s.from)) {
					return Err(invalid(&format!("{name} segments are empty or out of order")));
				}
			}
		}
		Ok(())
	}
}

fn ascending(mut values: impl Iterator<Item = f64>) -> bool {
	let Some(mut prev) = values.next() else {
		return true;
	};
	values.all(|next| {
		let ok = next > prev;
		prev = next;
		ok
	})
}

/// Ending years a financial year argument may name.
const ENDING_YEARS: RangeInclusive<u64> = 1901..=9999;

/// Normalizes a year argument to a table key.
///
/// Accepts `"2024-25"`, `"2024-2025"`, the ending year as a number (`2025`)
/// or as a string (`"2025"`).
pub fn year_key(value: &Value) -> Result<String> {
	match value {
		Value::Number(n) => match n.as_u64() {
			Some(end) if ENDING_YEARS.contains(&end) => Ok(span(end)),
			_ => Err(Error::InvalidYear(n.to_string())),
		},
		Value::String(s) => parse_year(s.trim()).ok_or_else(|| Error::InvalidYear(s.clone())),
		other => Err(Error::InvalidYear(other.to_string())),
	}
}

fn parse_year(s: &str) -> Option<String> {
	match s.split_once('-') {
		None => s.parse::<u64>().ok().filter(|y| ENDING_YEARS.contains(y)).map(span),
		Some((start, end)) => {
			let start: u64 = start.parse().ok()?;
			let end: u64 = end.parse().ok()?;
			let expected = start.checked_add(1).filter(|y| ENDING_YEARS.contains(y))?;
			let matches = match end {
				0..=99 => end == expected % 100,
				_ => end == expected,
			};
			matches.then(|| span(expected))
		}
	}
}

fn span(end: u64) -> String {
	format!("{}-{:02}", end - 1, end % 100)
}
