use crate::Opcode;

/// Exit reason of a frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExitReason {
	/// Machine terminated successfully.
	Succeed(ExitSucceed),
	/// Machine reverted: return data is published, remaining drops are
	/// kept, buffered state is discarded. Not an error.
	Revert(ExitRevert),
	/// Machine failed; all remaining drops are consumed.
	Error(ExitError),
	/// Host-level invariant broken. Never absorbed by a parent frame.
	Fatal(ExitFatal),
}

impl ExitReason {
	/// Whether the reason is a success.
	pub fn is_succeed(&self) -> bool {
		matches!(self, Self::Succeed(_))
	}

	/// Whether the reason is a revert.
	pub fn is_revert(&self) -> bool {
		matches!(self, Self::Revert(_))
	}

	/// Whether the reason is an error.
	pub fn is_error(&self) -> bool {
		matches!(self, Self::Error(_))
	}

	/// Whether the reason is a fatal host error.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Fatal(_))
	}
}

/// Successful terminations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitSucceed {
	/// STOP, or the program counter ran off the end of code.
	Stopped,
	/// RETURN published data.
	Returned,
	/// SUICIDE scheduled the account for deletion.
	Suicided,
}

impl From<ExitSucceed> for ExitReason {
	fn from(s: ExitSucceed) -> Self {
		Self::Succeed(s)
	}
}

/// Revert terminations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitRevert {
	/// REVERT opcode.
	Reverted,
}

impl From<ExitRevert> for ExitReason {
	fn from(s: ExitRevert) -> Self {
		Self::Revert(s)
	}
}

/// Frame failures. Each consumes the frame's remaining drops and clears
/// its future refund.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitError {
	/// Undefined opcode byte, or the designated INVALID opcode.
	InvalidCode(Opcode),
	/// Not enough stack items for the opcode's inputs.
	StackUnderflow,
	/// The opcode's outputs would push the stack past its limit.
	StackOverflow,
	/// Priced cost exceeds the remaining drops.
	OutOfDrop,
	/// Required memory size exceeds the addressable bound.
	MemoryOverflow,
	/// JUMP/JUMPI target is not a valid jump destination.
	InvalidJump,
	/// State-mutating opcode inside a static call.
	StaticModeViolation,
	/// RETURNDATACOPY range past the end of the return buffer.
	OutOfReturndata,
	/// Sub-call above the depth bound. Soft at the call site: the parent
	/// pushes zero instead of failing.
	CallTooDeep,
	/// Escape hatch for embedders.
	Other(&'static str),
}

impl From<ExitError> for ExitReason {
	fn from(s: ExitError) -> Self {
		Self::Error(s)
	}
}

/// Unrecoverable host errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitFatal {
	/// The interpreter's own call stack is exhausted.
	CallStackExhausted,
	/// Substate pushes and pops went out of balance.
	UnevenSubstate,
	/// Escape hatch for embedders.
	Other(&'static str),
}

impl From<ExitFatal> for ExitReason {
	fn from(s: ExitFatal) -> Self {
		Self::Fatal(s)
	}
}
