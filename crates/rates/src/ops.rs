//! Wire-level operation dispatch.

use serde_json::{Number, Value};
use tally_batch::{Request, Response};

use crate::formula::{self, Household};
use crate::table::{RateTables, YearRates, year_key};
use crate::{Error, Result};

/// Operations understood by [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	/// `add(a, b)`
	Add,
	/// `mul(a, b)`, also `mul2`.
	Mul,
	/// `div(a, b)`, also `div2`.
	Div,
	/// `income_tax(year, taxable)`
	IncomeTax,
	/// `medicare_levy(year, taxable, sapto = 0, family_income = -1, dependents = 0)`
	MedicareLevy,
	/// `lito(year, taxable)`
	Lito,
	/// `lamito(year, taxable)`
	Lamito,
	/// `total_tax(year, taxable, sapto = 0, family_income = -1, dependents = 0)`
	TotalTax,
}

impl Operation {
	/// Looks up an operation by name, ignoring ASCII case.
	pub fn parse(name: &str) -> Option<Self> {
		let op = match name.to_ascii_lowercase().as_str() {
			"add" => Self::Add,
			"mul" | "mul2" => Self::Mul,
			"div" | "div2" => Self::Div,
			"income_tax" | "incometax" => Self::IncomeTax,
			"medicare_levy" | "medicarelevy" => Self::MedicareLevy,
			"lito" => Self::Lito,
			"lamito" => Self::Lamito,
			"total_tax" | "totaltax" => Self::TotalTax,
			_ => return None,
		};
		Some(op)
	}

	/// Canonical name.
	pub const fn name(self) -> &'static str {
		match self {
			Self::Add => "add",
			Self::Mul => "mul",
			Self::Div => "div",
			Self::IncomeTax => "income_tax",
			Self::MedicareLevy => "medicare_levy",
			Self::Lito => "lito",
			Self::Lamito => "lamito",
			Self::TotalTax => "total_tax",
		}
	}

	const fn arity(self) -> (usize, usize) {
		match self {
			Self::Add | Self::Mul | Self::Div | Self::IncomeTax | Self::Lito | Self::Lamito => (2, 2),
			Self::MedicareLevy | Self::TotalTax => (2, 5),
		}
	}
}

/// Evaluates one request. Failures become `{"error": ..}` responses.
pub fn evaluate(tables: &RateTables, request: &Request) -> Response {
	match run(tables, request) {
		Ok(value) => Response::ok(value),
		Err(err) => Response::err(err.to_string()),
	}
}

fn run(tables: &RateTables, request: &Request) -> Result<Value> {
	let op = Operation::parse(&request.operation).ok_or_else(|| Error::UnsupportedOperation(request.operation.clone()))?;
	let args = Args::new(op, &request.args)?;

	match op {
		Operation::Add => args.combine(i64::checked_add, |x, y| x + y),
		Operation::Mul => args.combine(i64::checked_mul, |x, y| x * y),
		Operation::Div => {
			if args.number(1)? == 0.0 {
				return Err(Error::DivisionByZero);
			}
			args.combine(|x, y| x.checked_rem(y).filter(|r| *r == 0).and_then(|_| x.checked_div(y)), |x, y| x / y)
		}
		Operation::IncomeTax => args.finite(formula::income_tax(args.rates(tables)?, args.number(1)?)),
		Operation::Lito => args.finite(formula::lito(args.rates(tables)?, args.number(1)?)),
		Operation::Lamito => args.finite(formula::lamito(args.rates(tables)?, args.number(1)?)),
		Operation::MedicareLevy => args.finite(formula::medicare_levy(args.rates(tables)?, args.number(1)?, args.household()?)),
		Operation::TotalTax => args.finite(formula::total_tax(args.rates(tables)?, args.number(1)?, args.household()?)),
	}
}

struct Args<'a> {
	op: Operation,
	values: &'a [Value],
}

impl<'a> Args<'a> {
	fn new(op: Operation, values: &'a [Value]) -> Result<Self> {
		let (min, max) = op.arity();
		if !(min..=max).contains(&values.len()) {
			return Err(Error::Arity {
				operation: op.name(),
				min,
				max,
				got: values.len(),
			});
		}
		Ok(Self { op, values })
	}

	fn invalid(&self, index: usize, expected: &'static str) -> Error {
		Error::InvalidArgument {
			operation: self.op.name(),
			index,
			expected,
		}
	}

	fn number(&self, index: usize) -> Result<f64> {
		match self.values.get(index) {
			Some(Value::Number(n)) => n.as_f64().ok_or_else(|| self.invalid(index, "a number")),
			Some(Value::String(s)) => s.trim().parse().map_err(|_| self.invalid(index, "a number")),
			_ => Err(self.invalid(index, "a number")),
		}
	}

	fn optional_number(&self, index: usize, default: f64) -> Result<f64> {
		match self.values.get(index) {
			None | Some(Value::Null) => Ok(default),
			Some(_) => self.number(index),
		}
	}

	fn flag(&self, index: usize) -> Result<bool> {
		match self.values.get(index) {
			None | Some(Value::Null) => Ok(false),
			Some(Value::Bool(b)) => Ok(*b),
			Some(Value::Number(_) | Value::String(_)) => Ok(self.number(index)? != 0.0),
			Some(_) => Err(self.invalid(index, "a boolean or number")),
		}
	}

	fn household(&self) -> Result<Household> {
		let family = self.optional_number(3, -1.0)?;
		let dependents = self.optional_number(4, 0.0)?;
		if dependents < 0.0 || dependents > f64::from(u32::MAX) {
			return Err(self.invalid(4, "a non-negative count"));
		}
		Ok(Household {
			sapto: self.flag(2)?,
			family_income: (family >= 0.0).then_some(family),
			dependents: dependents as u32,
		})
	}

	fn rates<'t>(&self, tables: &'t RateTables) -> Result<&'t YearRates> {
		let year = self.values.first().ok_or_else(|| self.invalid(0, "a financial year"))?;
		tables.year(&year_key(year)?)
	}

	/// Exact integer arithmetic when both operands are integers and `int` succeeds.
	fn combine(&self, int: impl Fn(i64, i64) -> Option<i64>, float: impl Fn(f64, f64) -> f64) -> Result<Value> {
		if let (Some(x), Some(y)) = (self.values[0].as_i64(), self.values[1].as_i64())
			&& let Some(exact) = int(x, y)
		{
			return Ok(Value::from(exact));
		}
		self.finite(float(self.number(0)?, self.number(1)?))
	}

	fn finite(&self, amount: f64) -> Result<Value> {
		Number::from_f64(amount).map(Value::Number).ok_or(Error::NotFinite(self.op.name()))
	}
}
