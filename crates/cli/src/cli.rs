use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Batched tax-function evaluation")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Configuration file (defaults to ./tally.toml when present)
	#[arg(short, long, global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Evaluate expressions like `"add 2 3"`, coalesced into as few batches as possible
	Eval {
		/// Expressions: an operation name followed by its arguments
		#[arg(required = true, value_name = "EXPR")]
		exprs: Vec<String>,

		/// Run this command and talk to it over stdio instead of evaluating in-process
		#[arg(long, value_name = "CMD")]
		remote: Option<String>,

		/// Send each expression on its own, one round trip per expression
		#[arg(long)]
		no_batch: bool,
	},
	/// Income tax plus medicare levy less offsets for one taxpayer
	TotalTax {
		/// Financial year, e.g. 2024-25 or 2025
		#[arg(long)]
		year: String,

		/// Taxable income
		#[arg(long)]
		income: f64,

		/// Eligible for the seniors and pensioners offset
		#[arg(long)]
		sapto: bool,

		/// Combined family taxable income
		#[arg(long, value_name = "AMOUNT")]
		family_income: Option<f64>,

		/// Number of dependent children
		#[arg(long, default_value_t = 0)]
		dependents: u32,
	},
	/// Host the formula backend over stdin/stdout
	Serve,
}
