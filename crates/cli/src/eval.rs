use serde_json::Value;
use tally_batch::{BatchCoordinator, Error, Executor, Request};

/// Splits `"op arg arg"` into an operation and JSON arguments.
///
/// Arguments that are not valid JSON are passed as strings, so `2024-25`
/// and `"2024-25"` mean the same thing.
pub fn parse_expr(expr: &str) -> Option<(String, Vec<Value>)> {
	let mut words = expr.split_whitespace();
	let op = words.next()?;
	let args = words
		.map(|word| serde_json::from_str(word).unwrap_or_else(|_| Value::String(word.to_owned())))
		.collect();
	Some((op.to_owned(), args))
}

/// Submits every expression at once and waits for all of them.
///
/// Results come back in expression order.
pub async fn eval_all(coordinator: &BatchCoordinator, exprs: &[String]) -> Vec<Result<Value, String>> {
	let pending: Vec<_> = exprs
		.iter()
		.map(|expr| parse_expr(expr).map(|(op, args)| coordinator.submit(op, args)))
		.collect();

	let mut results = Vec::with_capacity(pending.len());
	for call in pending {
		results.push(match call {
			Some(call) => call.await.map_err(|err: Error| err.to_string()),
			None => Err("empty expression".to_owned()),
		});
	}
	results
}

/// Sends each expression straight to `executor` as a one-item batch,
/// waiting for each before sending the next.
pub async fn eval_unbatched(executor: &dyn Executor, exprs: &[String]) -> Vec<Result<Value, String>> {
	let mut results = Vec::with_capacity(exprs.len());
	for expr in exprs {
		let Some((op, args)) = parse_expr(expr) else {
			results.push(Err("empty expression".to_owned()));
			continue;
		};
		let result = match executor.execute(vec![Request::new(op, args)]).await {
			Ok(responses) => match responses.into_iter().next() {
				Some(response) => response.into_result(),
				None => Err(Error::MissingResult { index: 0 }.to_string()),
			},
			Err(err) => Err(err.to_string()),
		};
		results.push(result);
	}
	results
}

/// One output line per expression.
pub fn render(expr: &str, result: &Result<Value, String>) -> String {
	match result {
		Ok(value) => format!("{expr} = {value}"),
		Err(error) => format!("{expr} ! {error}"),
	}
}
