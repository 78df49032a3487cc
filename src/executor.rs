//! The execution driver: prices and charges every step, dispatches
//! opcode semantics, and orchestrates CALL/CREATE sub-frames
//! synchronously against the buffered state overlay.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;

use primitive_types::{H160, U256, U512};
use sha3::{Digest, Keccak256};

use crate::backend::{
	ApplyBackend, Backend, ChangeSet, Environment, MergeStrategy, PrecompileSet,
};
use crate::dropometer::{mem_needed, memory_drop};
use crate::error::{ExitError, ExitReason, ExitSucceed};
use crate::eval::{self, Control};
use crate::opcode::OpcodeInfo;
use crate::runtime::{CallScheme, Context, Frame, TransactionContext};
use crate::schedule::Config;
use crate::tracing::{Event, EventListener};
use crate::utils::{address_to_u256, bytes_occupied, u256_to_h256};
use crate::Opcode;

/// Result surface of a top-level execution. State effects are published
/// separately through [`Executor::deconstruct`] or [`Executor::apply`].
#[derive(Clone, Debug)]
pub struct ExecutionOutcome {
	/// Why the top-level frame stopped. Errors here are the recorded
	/// runtime failure.
	pub reason: ExitReason,
	/// Bytes published by RETURN or REVERT.
	pub return_value: Vec<u8>,
	/// Drops consumed, failure included.
	pub drops_used: u64,
	/// Committed refund credit; zero unless the frame succeeded.
	pub refund: u64,
	/// Address derived for a create-style execution.
	pub created: Option<H160>,
}

/// Synchronous interpreter driver over a read-only backend, a block
/// environment and a precompile registry.
pub struct Executor<'a, B: Backend, E: Environment> {
	pub(crate) overlay: crate::backend::OverlayedState<'a, B>,
	pub(crate) environment: &'a E,
	precompiles: &'a dyn PrecompileSet,
	config: &'a Config,
	pub(crate) tx: TransactionContext,
	listener: Option<&'a mut dyn EventListener>,
	create_counters: BTreeMap<H160, u64>,
}

impl<'a, B: Backend, E: Environment> Executor<'a, B, E> {
	/// Create an executor for one transaction.
	pub fn new(
		backend: &'a B,
		environment: &'a E,
		precompiles: &'a dyn PrecompileSet,
		config: &'a Config,
		tx: TransactionContext,
	) -> Self {
		Self {
			overlay: crate::backend::OverlayedState::new(backend),
			environment,
			precompiles,
			config,
			tx,
			listener: None,
			create_counters: BTreeMap::new(),
		}
	}

	/// Attach a step listener.
	pub fn with_listener(mut self, listener: &'a mut dyn EventListener) -> Self {
		self.listener = Some(listener);
		self
	}

	/// Active configuration.
	pub fn config(&self) -> &Config {
		self.config
	}

	/// Run a message call against the code stored at `address` and
	/// surface the outcome. State effects stay buffered in the executor.
	pub fn transact_call(
		&mut self,
		caller: H160,
		address: H160,
		value: U256,
		data: Vec<u8>,
		drop_limit: u64,
	) -> ExecutionOutcome {
		let code = self.overlay.code(address);
		let context = Context {
			address,
			caller,
			apparent_value: value,
		};
		let mut frame = Frame::new(
			Rc::new(code),
			Rc::new(data),
			context,
			drop_limit,
			0,
			false,
			self.config,
		);

		self.overlay.push_substate();
		self.overlay.touch(address);
		let mut reason = self.execute(&mut frame);
		self.seal(&mut reason);

		self.outcome(reason, frame, None)
	}

	/// Run a contract deployment: execute `init_code` and store what it
	/// returns as the new account's code.
	pub fn transact_create(
		&mut self,
		caller: H160,
		value: U256,
		init_code: Vec<u8>,
		drop_limit: u64,
	) -> ExecutionOutcome {
		let address = self.derive_create_address(caller);
		let context = Context {
			address,
			caller,
			apparent_value: value,
		};
		let mut frame = Frame::new(
			Rc::new(init_code),
			Rc::new(Vec::new()),
			context,
			drop_limit,
			0,
			false,
			self.config,
		);

		self.overlay.push_substate();
		self.overlay.touch(address);
		let mut reason = self.execute(&mut frame);
		if reason.is_succeed() {
			self.overlay.set_code(address, frame.retval.clone());
		}
		self.seal(&mut reason);

		self.outcome(reason, frame, Some(address))
	}

	/// Buffered state effects of everything committed so far.
	pub fn deconstruct(self) -> ChangeSet {
		self.overlay.deconstruct()
	}

	/// Write the committed effects through to the host and hand back the
	/// change set for log and touched-account processing.
	pub fn apply<A: ApplyBackend>(self, backend: &mut A) -> ChangeSet {
		let changes = self.overlay.deconstruct();
		backend.apply(&changes);
		changes
	}

	/// Drive a frame until it halts.
	pub fn execute(&mut self, frame: &mut Frame) -> ExitReason {
		loop {
			match self.step(frame) {
				Ok(()) => (),
				Err(reason) => {
					if reason.is_error() {
						log::warn!(target: "dropvm", "frame halted: {:?}", reason);
					}
					if let Some(listener) = self.listener.as_mut() {
						listener.event(Event::Exit {
							depth: frame.depth,
							reason: &reason,
						});
					}
					return reason;
				}
			}
		}
	}

	/// Decode, validate, price, charge and execute one opcode.
	pub fn step(&mut self, frame: &mut Frame) -> Result<(), ExitReason> {
		if let Some(reason) = frame.status() {
			return Err(reason.clone());
		}

		let position = frame.machine.position();
		let opcode = match frame.machine.opcode() {
			Some(opcode) => opcode,
			// Running off the end of code decodes as STOP.
			None => {
				frame.retval = Vec::new();
				let reason: ExitReason = ExitSucceed::Stopped.into();
				frame.exit(reason.clone());
				return Err(reason);
			}
		};
		let info = match opcode.info() {
			Some(info) => info,
			None => return Err(self.fail(frame, ExitError::InvalidCode(opcode))),
		};

		frame.begin_step(opcode);
		if let Err(e) = frame.machine.stack.check(info.inputs, info.outputs) {
			return Err(self.fail(frame, e));
		}

		let (cost, call_drop) = match self.price(frame, opcode, info) {
			Ok(priced) => priced,
			Err(e) => return Err(self.fail(frame, e)),
		};
		if let Err(e) = frame.dropometer.spend(cost) {
			return Err(self.fail(frame, e));
		}

		if let Some(listener) = self.listener.as_mut() {
			listener.event(Event::Charge {
				opcode,
				cost,
				drops_remaining: frame.dropometer.remaining(),
			});
			listener.event(Event::Step {
				depth: frame.depth,
				position,
				opcode,
				drops_remaining: frame.dropometer.remaining(),
				stack: &frame.machine.stack,
				memory_size: frame.machine.memory.len(),
				hint: opcode.name(),
			});
		}

		match eval::eval(self, frame, opcode, position, call_drop) {
			Control::Continue(by) => {
				frame.machine.set_position(position + by);
				frame.finish_step(opcode);
				Ok(())
			}
			Control::Jump(to) => {
				frame.machine.set_position(to);
				frame.finish_step(opcode);
				Ok(())
			}
			Control::Exit(reason) => match reason {
				ExitReason::Error(e) => Err(self.fail(frame, e)),
				reason => {
					frame.exit(reason.clone());
					Err(reason)
				}
			},
		}
	}

	/// Terminate a frame on a runtime failure: all remaining drops are
	/// consumed and the future refund is lost.
	fn fail(&mut self, frame: &mut Frame, error: ExitError) -> ExitReason {
		frame.dropometer.spend_all();
		frame.dropometer.reset_refund();
		let reason: ExitReason = error.into();
		frame.exit(reason.clone());
		reason
	}

	/// Step cost: base tier plus the opcode-specific surcharge, memory
	/// expansion included. For the CALL family the second value is the
	/// adjusted call drop handed to the sub-frame, which is part of the
	/// charge.
	fn price(
		&mut self,
		frame: &mut Frame,
		opcode: Opcode,
		info: &OpcodeInfo,
	) -> Result<(u64, u64), ExitError> {
		let schedule = &self.config.schedule;
		let stack = &frame.machine.stack;
		let old_mem = frame.machine.memory.len();

		let mut cost = info.tier.drops();
		let mut call_drop = 0;

		match opcode {
			Opcode::STOP => cost = schedule.stop,
			Opcode::SUICIDE => cost = schedule.suicide,
			Opcode::SLOAD => cost = schedule.sload,
			Opcode::BALANCE => cost = schedule.balance,
			Opcode::EXTCODESIZE => cost = schedule.ext_code_size,

			Opcode::SSTORE => {
				let key = u256_to_h256(stack.peek(0)?);
				let new_value = stack.peek(1)?;
				let old_value = self.overlay.storage(frame.context.address, key);

				if old_value.is_zero() && !new_value.is_zero() {
					cost = schedule.sstore_set;
				} else if !old_value.is_zero() && new_value.is_zero() {
					cost = schedule.sstore_clear;
					frame.dropometer.credit_refund(schedule.sstore_refund);
					if let Some(listener) = self.listener.as_mut() {
						listener.event(Event::Refund {
							amount: schedule.sstore_refund,
							total: frame.dropometer.refund(),
						});
					}
				} else {
					cost = schedule.sstore_reset;
				}
			}

			Opcode::MLOAD | Opcode::MSTORE => {
				let need = mem_needed(stack.peek(0)?, U256::from(32))?;
				cost += memory_drop(schedule, old_mem, need, 0)?;
			}
			Opcode::MSTORE8 => {
				let need = mem_needed(stack.peek(0)?, U256::one())?;
				cost += memory_drop(schedule, old_mem, need, 0)?;
			}
			Opcode::RETURN | Opcode::REVERT => {
				let need = mem_needed(stack.peek(0)?, stack.peek(1)?)?;
				cost = schedule.stop + memory_drop(schedule, old_mem, need, 0)?;
			}
			Opcode::SHA3 => {
				let len = stack.peek(1)?;
				let need = mem_needed(stack.peek(0)?, len)?;
				cost = schedule.sha3 + memory_drop(schedule, old_mem, need, 0)?;
				// Bounded by the memory guard above.
				let words = (len.low_u64() + 31) / 32;
				cost += words * schedule.sha3_word;
			}
			Opcode::CALLDATACOPY | Opcode::CODECOPY | Opcode::RETURNDATACOPY => {
				let len = stack.peek(2)?;
				let need = mem_needed(stack.peek(0)?, len)?;
				cost += memory_drop(schedule, old_mem, need, len.low_u64())?;
			}
			Opcode::EXTCODECOPY => {
				let len = stack.peek(3)?;
				let need = mem_needed(stack.peek(1)?, len)?;
				cost = schedule.ext_code_copy + memory_drop(schedule, old_mem, need, len.low_u64())?;
			}

			Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL | Opcode::STATICCALL => {
				cost = if opcode == Opcode::CALL {
					schedule.new_acct_call
				} else {
					schedule.call
				};

				let requested = stack.peek(0)?;
				let value = if info.has_value {
					stack.peek(2)?
				} else {
					U256::zero()
				};
				if !value.is_zero() {
					cost += schedule.vt_call;
				}

				let arg = if info.has_value { 3 } else { 2 };
				let in_need = mem_needed(stack.peek(arg)?, stack.peek(arg + 1)?)?;
				let out_need = mem_needed(stack.peek(arg + 2)?, stack.peek(arg + 3)?)?;
				cost += memory_drop(schedule, old_mem, in_need.max(out_need), 0)?;

				if cost > frame.dropometer.remaining() {
					return Err(ExitError::OutOfDrop);
				}

				// 63/64 reserve: the caller always keeps a sliver of its
				// own budget.
				let available = frame.dropometer.remaining() - cost;
				let capped = available - available / 64;
				call_drop = if requested > U256::from(capped) {
					capped
				} else {
					requested.as_u64()
				};
				cost += call_drop;
			}

			Opcode::CREATE => {
				let need = mem_needed(stack.peek(1)?, stack.peek(2)?)?;
				cost = schedule.create + memory_drop(schedule, old_mem, need, 0)?;
			}

			Opcode::EXP => {
				cost = schedule.exp + schedule.exp_byte * bytes_occupied(stack.peek(1)?);
			}

			_ => {
				if let Some(n) = opcode.is_log() {
					let len = stack.peek(1)?;

					// The data charge alone can dwarf the budget; check it
					// in full width before any narrowing.
					let data_cost = len.full_mul(U256::from(schedule.log_data));
					if data_cost > U512::from(frame.dropometer.remaining()) {
						return Err(ExitError::OutOfDrop);
					}

					let need = mem_needed(stack.peek(0)?, len)?;
					cost = schedule.log
						+ schedule.log_topic * n as u64
						+ memory_drop(schedule, old_mem, need, 0)?
						+ schedule.log_data * len.low_u64();
				}
			}
		}

		Ok((cost, call_drop))
	}

	/// CALL-family sub-execution. The adjusted call drop has already
	/// been charged to the caller.
	pub(crate) fn call(
		&mut self,
		frame: &mut Frame,
		scheme: CallScheme,
		call_drop: u64,
	) -> Control {
		pop_u256!(frame, _requested);
		pop_address!(frame, code_address);
		let value = match scheme {
			CallScheme::Call | CallScheme::CallCode => {
				pop_u256!(frame, value);
				value
			}
			CallScheme::DelegateCall | CallScheme::StaticCall => U256::zero(),
		};

		if frame.is_static && scheme == CallScheme::Call && !value.is_zero() {
			return Control::Exit(ExitError::StaticModeViolation.into());
		}

		// The stipend rides on top of the charged amount.
		let mut budget = call_drop;
		if !value.is_zero() {
			budget += self.config.schedule.stipend_call;
		}

		pop_u256!(frame, in_offset, in_len, out_offset, out_len);

		let in_len = as_usize_or_fail!(in_len);
		let input = if in_len == 0 {
			Vec::new()
		} else {
			let in_offset = as_usize_or_fail!(in_offset);
			try_or_fail!(frame.machine.memory.resize_offset(in_offset, in_len));
			frame.machine.memory.get(in_offset, in_len)
		};

		let out_len = as_usize_or_fail!(out_len);
		let out_offset = if out_len == 0 {
			0
		} else {
			let out_offset = as_usize_or_fail!(out_offset);
			try_or_fail!(frame.machine.memory.resize_offset(out_offset, out_len));
			out_offset
		};

		if !scheme_is_stateless(scheme) {
			self.overlay.touch(code_address);
		}

		if let Some(precompile) = self.precompiles.lookup(code_address) {
			let result = precompile.execute(&input, budget);
			if result.succeeded && result.drops_used <= budget {
				frame.dropometer.give_back(budget - result.drops_used);
				if out_len > 0 {
					let copy = result.output.len().min(out_len);
					try_or_fail!(frame
						.machine
						.memory
						.set(out_offset, &result.output[..copy], Some(copy)));
				}
				frame.return_data_buffer = result.output;
				push_u256!(frame, U256::one());
			} else {
				frame.return_data_buffer = Vec::new();
				push_u256!(frame, U256::zero());
			}
			return Control::Continue(1);
		}

		if frame.depth + 1 > self.config.max_call_depth {
			frame.dropometer.give_back(budget);
			frame.return_data_buffer = Vec::new();
			push_u256!(frame, U256::zero());
			return Control::Continue(1);
		}

		// CALL and STATICCALL run the target's code against the target's
		// storage; CALLCODE and DELEGATECALL run it against the caller's.
		let context = match scheme {
			CallScheme::Call => Context {
				address: code_address,
				caller: frame.context.address,
				apparent_value: value,
			},
			CallScheme::CallCode => Context {
				address: frame.context.address,
				caller: frame.context.address,
				apparent_value: value,
			},
			CallScheme::DelegateCall => Context {
				address: frame.context.address,
				caller: frame.context.caller,
				apparent_value: frame.context.apparent_value,
			},
			CallScheme::StaticCall => Context {
				address: code_address,
				caller: frame.context.address,
				apparent_value: U256::zero(),
			},
		};
		let code = self.overlay.code(code_address);
		let is_static = frame.is_static || scheme == CallScheme::StaticCall;

		let mut child = Frame::new(
			Rc::new(code),
			Rc::new(input),
			context,
			budget,
			frame.depth + 1,
			is_static,
			self.config,
		);

		self.overlay.push_substate();
		let reason = self.execute(&mut child);
		match &reason {
			ExitReason::Succeed(_) => {
				try_or_fail!(self.overlay.pop_substate(MergeStrategy::Commit));
				frame.dropometer.credit_refund(child.dropometer.refund());
			}
			_ => try_or_fail!(self.overlay.pop_substate(MergeStrategy::Discard)),
		}
		frame.dropometer.give_back(child.dropometer.remaining());

		if reason.is_fatal() {
			return Control::Exit(reason);
		}

		let ret = child.retval;
		if out_len > 0 && !ret.is_empty() {
			let copy = ret.len().min(out_len);
			try_or_fail!(frame.machine.memory.set(out_offset, &ret[..copy], Some(copy)));
		}
		frame.return_data_buffer = ret;

		if reason.is_succeed() {
			push_u256!(frame, U256::one());
		} else {
			push_u256!(frame, U256::zero());
		}
		Control::Continue(1)
	}

	/// CREATE sub-execution. The initcode frame receives all remaining
	/// drops; leftovers come back when it finishes.
	pub(crate) fn create(&mut self, frame: &mut Frame) -> Control {
		if frame.is_static {
			return Control::Exit(ExitError::StaticModeViolation.into());
		}

		pop_u256!(frame, value, in_offset, in_len);

		let in_len = as_usize_or_fail!(in_len);
		let init_code = if in_len == 0 {
			Vec::new()
		} else {
			let in_offset = as_usize_or_fail!(in_offset);
			try_or_fail!(frame.machine.memory.resize_offset(in_offset, in_len));
			frame.machine.memory.get(in_offset, in_len)
		};

		frame.return_data_buffer = Vec::new();

		if frame.depth + 1 > self.config.max_call_depth {
			push_u256!(frame, U256::zero());
			return Control::Continue(1);
		}

		let creator = frame.context.address;
		let address = self.derive_create_address(creator);

		// The initcode frame takes the whole remainder; whatever it does
		// not burn comes back below.
		let budget = frame.dropometer.remaining();
		frame.dropometer.spend_all();

		let context = Context {
			address,
			caller: creator,
			apparent_value: value,
		};
		let mut child = Frame::new(
			Rc::new(init_code),
			Rc::new(Vec::new()),
			context,
			budget,
			frame.depth + 1,
			false,
			self.config,
		);

		self.overlay.push_substate();
		let reason = self.execute(&mut child);
		match &reason {
			ExitReason::Succeed(_) => {
				self.overlay.set_code(address, child.retval.clone());
				self.overlay.touch(address);
				try_or_fail!(self.overlay.pop_substate(MergeStrategy::Commit));
				frame.dropometer.credit_refund(child.dropometer.refund());
			}
			_ => try_or_fail!(self.overlay.pop_substate(MergeStrategy::Discard)),
		}
		frame.dropometer.give_back(child.dropometer.remaining());

		if reason.is_fatal() {
			return Control::Exit(reason);
		}

		if reason.is_succeed() {
			push_u256!(frame, address_to_u256(address));
		} else {
			push_u256!(frame, U256::zero());
		}
		Control::Continue(1)
	}

	/// New contract address: keccak of the creator and its creation
	/// counter, low 20 bytes.
	fn derive_create_address(&mut self, creator: H160) -> H160 {
		let counter = self.create_counters.entry(creator).or_insert(0);
		*counter += 1;

		let mut hasher = Keccak256::new();
		hasher.update(creator.as_bytes());
		hasher.update(counter.to_be_bytes());
		let digest = hasher.finalize();
		H160::from_slice(&digest[12..])
	}

	/// Commit or discard the top-level substate.
	fn seal(&mut self, reason: &mut ExitReason) {
		let strategy = if reason.is_succeed() {
			MergeStrategy::Commit
		} else {
			MergeStrategy::Discard
		};
		if let Err(fatal) = self.overlay.pop_substate(strategy) {
			*reason = fatal.into();
		}
	}

	fn outcome(
		&self,
		reason: ExitReason,
		frame: Frame,
		created: Option<H160>,
	) -> ExecutionOutcome {
		let refund = if reason.is_succeed() {
			frame.dropometer.refund()
		} else {
			0
		};
		ExecutionOutcome {
			created: if reason.is_succeed() { created } else { None },
			reason,
			return_value: frame.retval,
			drops_used: frame.dropometer.used(),
			refund,
		}
	}
}

fn scheme_is_stateless(scheme: CallScheme) -> bool {
	matches!(scheme, CallScheme::DelegateCall | CallScheme::StaticCall)
}
