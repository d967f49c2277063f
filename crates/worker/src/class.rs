/// Execution classes used for task spawning and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Debounce timers and the batch flush that follows them.
	Debounce,
	/// Connection read/write loops.
	Transport,
	/// Backend evaluation of received batches.
	Backend,
}

impl TaskClass {
	/// Stable label used in trace fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Debounce => "debounce",
			Self::Transport => "transport",
			Self::Backend => "backend",
		}
	}
}
