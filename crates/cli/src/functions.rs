//! Typed wrappers over the coordinator, one per backend operation.

use serde_json::{Value, json};
use tally_batch::{BatchCoordinator, Error, InvocationFuture};

/// Household details for the medicare levy and the total tax composite.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Household {
	/// Eligible for the seniors and pensioners offset.
	pub sapto: bool,
	/// Combined family taxable income, when assessed as a family.
	pub family_income: Option<f64>,
	/// Dependent children.
	pub dependents: u32,
}

impl Household {
	fn args(self) -> [Value; 3] {
		[json!(self.sapto), json!(self.family_income.unwrap_or(-1.0)), json!(self.dependents)]
	}
}

/// Tax functions submitted through one coordinator.
///
/// Every call returns immediately; calls made within one debounce window
/// reach the backend as a single batch.
#[derive(Debug, Clone)]
pub struct TaxFunctions {
	coordinator: BatchCoordinator,
}

impl TaxFunctions {
	pub fn new(coordinator: BatchCoordinator) -> Self {
		Self { coordinator }
	}

	pub fn coordinator(&self) -> &BatchCoordinator {
		&self.coordinator
	}

	pub fn income_tax(&self, year: &str, income: f64) -> InvocationFuture {
		self.coordinator.submit("income_tax", vec![json!(year), json!(income)])
	}

	pub fn medicare_levy(&self, year: &str, income: f64, household: Household) -> InvocationFuture {
		let mut args = vec![json!(year), json!(income)];
		args.extend(household.args());
		self.coordinator.submit("medicare_levy", args)
	}

	pub fn lito(&self, year: &str, income: f64) -> InvocationFuture {
		self.coordinator.submit("lito", vec![json!(year), json!(income)])
	}

	pub fn lamito(&self, year: &str, income: f64) -> InvocationFuture {
		self.coordinator.submit("lamito", vec![json!(year), json!(income)])
	}

	/// Income tax plus medicare levy less LITO and LAMITO, floored at zero.
	///
	/// The four components are submitted together so they share a batch.
	/// When any component fails, every component error is reported, joined
	/// with `"; "` after an `Errors: ` prefix.
	pub async fn total_tax(&self, year: &str, income: f64, household: Household) -> Result<f64, String> {
		let (tax, levy, lito, lamito) = tokio::join!(
			self.income_tax(year, income),
			self.medicare_levy(year, income, household),
			self.lito(year, income),
			self.lamito(year, income),
		);

		let parts = [tax, levy, lito, lamito].map(|part| part.and_then(|value| number(&value)));
		let errors: Vec<String> = parts.iter().filter_map(|part| part.as_ref().err().map(Error::to_string)).collect();
		if !errors.is_empty() {
			return Err(format!("Errors: {}", errors.join("; ")));
		}

		let [tax, levy, lito, lamito] = parts.map(|part| part.unwrap_or_default());
		Ok(cents((tax + levy - lito - lamito).max(0.0)))
	}
}

fn number(value: &Value) -> Result<f64, Error> {
	value
		.as_f64()
		.ok_or_else(|| Error::Remote(format!("expected a number, got {value}")))
}

fn cents(amount: f64) -> f64 {
	(amount * 100.0).round() / 100.0
}
