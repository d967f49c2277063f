//! `tally`: batched tax-function evaluation from the command line.

mod cli;
mod config;
mod eval;
mod functions;

use std::process::{ExitCode, Stdio};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Command};
use config::Config;
use functions::{Household, TaxFunctions};
use tally_batch::{BatchCoordinator, Executor};
use tally_rates::LocalExecutor;
use tally_rpc::RpcClient;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config = Config::load(cli.config.as_deref())?;

	match cli.command {
		Command::Eval { exprs, remote, no_batch } => {
			let (executor, child) = match remote {
				Some(cmd) => {
					let (client, child) = spawn_remote(&cmd)?;
					(Arc::new(client) as Arc<dyn Executor>, Some(child))
				}
				None => (local_backend(&config)?, None),
			};
			let results = if no_batch {
				let results = eval::eval_unbatched(executor.as_ref(), &exprs).await;
				info!(calls = exprs.len(), "tally.eval.done");
				drop(executor);
				results
			} else {
				let coordinator = BatchCoordinator::with_shared(executor, config.batch);
				let results = eval::eval_all(&coordinator, &exprs).await;
				info!(stats = ?coordinator.stats(), "tally.eval.done");
				results
			};
			for (expr, result) in exprs.iter().zip(&results) {
				println!("{}", eval::render(expr, result));
			}

			if let Some(mut child) = child {
				let status = child.wait().await.context("waiting for remote backend")?;
				tracing::debug!(%status, "tally.remote.exited");
			}

			Ok(if results.iter().all(Result::is_ok) { ExitCode::SUCCESS } else { ExitCode::FAILURE })
		}
		Command::TotalTax { year, income, sapto, family_income, dependents } => {
			let coordinator = BatchCoordinator::with_shared(local_backend(&config)?, config.batch);
			let household = Household { sapto, family_income, dependents };
			match TaxFunctions::new(coordinator).total_tax(&year, income, household).await {
				Ok(total) => {
					println!("{total:.2}");
					Ok(ExitCode::SUCCESS)
				}
				Err(err) => {
					eprintln!("error: {err}");
					Ok(ExitCode::FAILURE)
				}
			}
		}
		Command::Serve => {
			let backend = local_backend(&config)?;
			tally_rpc::serve(tokio::io::stdin(), tokio::io::stdout(), backend).await?;
			Ok(ExitCode::SUCCESS)
		}
	}
}

fn local_backend(config: &Config) -> anyhow::Result<Arc<dyn Executor>> {
	let executor = LocalExecutor::from_config(&config.backend).context("loading rate tables")?;
	info!(years = ?executor.tables().years().collect::<Vec<_>>(), "tally.backend.ready");
	Ok(Arc::new(executor))
}

/// Starts `cmd` with piped stdio and connects an RPC client to it.
fn spawn_remote(cmd: &str) -> anyhow::Result<(RpcClient, tokio::process::Child)> {
	let mut words = cmd.split_whitespace();
	let Some(program) = words.next() else {
		bail!("--remote needs a command");
	};
	let mut child = tokio::process::Command::new(program)
		.args(words)
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::inherit())
		.kill_on_drop(true)
		.spawn()
		.with_context(|| format!("spawning {cmd}"))?;

	let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
		bail!("remote backend stdio unavailable");
	};
	info!(cmd, pid = child.id(), "tally.remote.spawned");
	Ok((RpcClient::spawn(stdout, stdin), child))
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();
}
