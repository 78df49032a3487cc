use alloc::rc::Rc;
use alloc::vec::Vec;

use primitive_types::{H160, U256};

use crate::dropometer::Dropometer;
use crate::error::ExitReason;
use crate::memory::Memory;
use crate::schedule::Config;
use crate::stack::Stack;
use crate::valids::Valids;
use crate::Opcode;

/// Identity of a frame: whose storage it runs against, who called it and
/// what value the callee observes.
#[derive(Clone, Debug)]
pub struct Context {
	/// Owner address: the storage context and the ADDRESS answer.
	pub address: H160,
	/// Immediate caller.
	pub caller: H160,
	/// Value the callee observes. A delegated frame inherits the outer
	/// frame's value without any transfer happening.
	pub apparent_value: U256,
}

/// Per-transaction context shared by every frame of one execution.
#[derive(Clone, Debug)]
pub struct TransactionContext {
	/// Externally-owned account that signed the transaction.
	pub origin: H160,
	/// Price of one drop.
	pub drop_price: U256,
}

/// Flavor of a CALL-family opcode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallScheme {
	/// `CALL`: target's code against the target's storage.
	Call,
	/// `CALLCODE`: target's code against the caller's storage.
	CallCode,
	/// `DELEGATECALL`: target's code against the caller's storage, with
	/// caller and value inherited from the outer frame.
	DelegateCall,
	/// `STATICCALL`: like CALL, valueless and with mutation forbidden.
	StaticCall,
}

/// Core execution state of one contract run: code, input, counter,
/// stack, memory and the derived jump-destination set.
pub struct Machine {
	/// Program code.
	pub(crate) code: Rc<Vec<u8>>,
	/// Input data.
	pub(crate) data: Rc<Vec<u8>>,
	/// Program counter.
	position: usize,
	/// Jump-destination set, derived once from code.
	valids: Valids,
	/// Volatile memory.
	pub memory: Memory,
	/// Word stack.
	pub stack: Stack,
}

impl Machine {
	/// Create a machine with cleared stack and memory.
	pub fn new(code: Rc<Vec<u8>>, data: Rc<Vec<u8>>, config: &Config) -> Self {
		let valids = Valids::new(&code[..]);

		Self {
			code,
			data,
			position: 0,
			valids,
			memory: Memory::new(config.memory_limit),
			stack: Stack::new(config.stack_limit),
		}
	}

	/// Program code.
	#[inline]
	pub fn code(&self) -> &[u8] {
		&self.code
	}

	/// Input data.
	#[inline]
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// Program counter.
	#[inline]
	pub const fn position(&self) -> usize {
		self.position
	}

	/// Move the program counter. Jump validity is checked by the JUMP
	/// semantics, not here.
	#[inline]
	pub fn set_position(&mut self, position: usize) {
		self.position = position;
	}

	/// Jump-destination set.
	#[inline]
	pub const fn valids(&self) -> &Valids {
		&self.valids
	}

	/// Opcode at the program counter. `None` once the counter runs off
	/// the end of code, which decodes as STOP.
	#[inline]
	pub fn opcode(&self) -> Option<Opcode> {
		self.code.get(self.position).map(|v| Opcode(*v))
	}
}

/// One contract execution: the machine plus identity, accounting and
/// lifecycle state. Frames nest through the CALL/CREATE family; each
/// sub-frame runs to completion before its parent resumes.
pub struct Frame {
	/// Core machine state.
	pub machine: Machine,
	/// Frame identity.
	pub context: Context,
	/// Value published by RETURN/REVERT.
	pub retval: Vec<u8>,
	/// Buffer of the last sub-call's return data, read by the
	/// RETURNDATA opcodes.
	pub return_data_buffer: Vec<u8>,
	/// Drop meter.
	pub dropometer: Dropometer,
	/// Call depth, zero for the top-level frame.
	pub depth: usize,
	/// Static flag: state mutation is forbidden when set.
	pub is_static: bool,
	status: Option<ExitReason>,
	last_op: Option<Opcode>,
	previous_op: Option<Opcode>,
	steps: u64,
}

impl Frame {
	/// Create a frame with a fresh machine and a full drop meter.
	pub fn new(
		code: Rc<Vec<u8>>,
		data: Rc<Vec<u8>>,
		context: Context,
		drop_limit: u64,
		depth: usize,
		is_static: bool,
		config: &Config,
	) -> Self {
		Self {
			machine: Machine::new(code, data, config),
			context,
			retval: Vec::new(),
			return_data_buffer: Vec::new(),
			dropometer: Dropometer::new(drop_limit),
			depth,
			is_static,
			status: None,
			last_op: None,
			previous_op: None,
			steps: 0,
		}
	}

	/// Whether the frame has terminated.
	#[inline]
	pub fn is_halted(&self) -> bool {
		self.status.is_some()
	}

	/// Whether the frame terminated by REVERT.
	#[inline]
	pub fn is_reverted(&self) -> bool {
		matches!(self.status, Some(ExitReason::Revert(_)))
	}

	/// Exit status, once halted.
	#[inline]
	pub fn status(&self) -> Option<&ExitReason> {
		self.status.as_ref()
	}

	/// Halt the frame. Further steps return the same reason.
	pub fn exit(&mut self, reason: ExitReason) {
		if self.status.is_none() {
			self.status = Some(reason);
		}
	}

	/// Opcode currently being executed.
	#[inline]
	pub const fn last_op(&self) -> Option<Opcode> {
		self.last_op
	}

	/// Opcode executed by the previous step.
	#[inline]
	pub const fn previous_op(&self) -> Option<Opcode> {
		self.previous_op
	}

	/// Number of completed steps.
	#[inline]
	pub const fn steps(&self) -> u64 {
		self.steps
	}

	pub(crate) fn begin_step(&mut self, opcode: Opcode) {
		self.last_op = Some(opcode);
	}

	pub(crate) fn finish_step(&mut self, opcode: Opcode) {
		self.previous_op = Some(opcode);
		self.steps += 1;
	}
}
