//! Opcode semantics. Pricing has already happened by the time anything
//! here runs; these functions only mutate machine state and report how
//! the program counter moves.

#[macro_use]
mod macros;
pub(crate) mod arithmetic;
pub(crate) mod bitwise;
mod misc;
mod system;

use core::ops::{BitAnd, BitOr, BitXor};
use primitive_types::U256;

use crate::backend::{Backend, Environment};
use crate::error::{ExitError, ExitReason, ExitSucceed};
use crate::executor::Executor;
use crate::runtime::{CallScheme, Frame};
use crate::Opcode;

/// Outcome of one opcode: where the program counter goes next, or why
/// the frame stops.
#[derive(Clone, Debug)]
pub enum Control {
	/// Advance the counter by the given amount.
	Continue(usize),
	/// Move the counter to a validated jump destination.
	Jump(usize),
	/// Halt the frame.
	Exit(ExitReason),
}

pub(crate) fn eval<B: Backend, E: Environment>(
	exec: &mut Executor<'_, B, E>,
	frame: &mut Frame,
	opcode: Opcode,
	position: usize,
	call_drop: u64,
) -> Control {
	match opcode {
		Opcode::STOP => {
			frame.retval = alloc::vec::Vec::new();
			Control::Exit(ExitSucceed::Stopped.into())
		}
		Opcode::ADD => op2_u256_tuple!(frame, overflowing_add),
		Opcode::MUL => op2_u256_tuple!(frame, overflowing_mul),
		Opcode::SUB => op2_u256_tuple!(frame, overflowing_sub),
		Opcode::DIV => op2_u256_fn!(frame, self::arithmetic::div),
		Opcode::SDIV => op2_u256_fn!(frame, self::arithmetic::sdiv),
		Opcode::MOD => op2_u256_fn!(frame, self::arithmetic::rem),
		Opcode::SMOD => op2_u256_fn!(frame, self::arithmetic::srem),
		Opcode::ADDMOD => op3_u256_fn!(frame, self::arithmetic::addmod),
		Opcode::MULMOD => op3_u256_fn!(frame, self::arithmetic::mulmod),
		Opcode::EXP => op2_u256_fn!(frame, self::arithmetic::exp),
		Opcode::SIGNEXTEND => op2_u256_fn!(frame, self::arithmetic::signextend),

		Opcode::LT => op2_u256_bool!(frame, lt),
		Opcode::GT => op2_u256_bool!(frame, gt),
		Opcode::SLT => op2_u256_fn!(frame, self::bitwise::slt),
		Opcode::SGT => op2_u256_fn!(frame, self::bitwise::sgt),
		Opcode::EQ => op2_u256_bool!(frame, eq),
		Opcode::ISZERO => op1_u256_fn!(frame, self::bitwise::iszero),
		Opcode::AND => op2_u256!(frame, bitand),
		Opcode::OR => op2_u256!(frame, bitor),
		Opcode::XOR => op2_u256!(frame, bitxor),
		Opcode::NOT => op1_u256_fn!(frame, self::bitwise::not),
		Opcode::BYTE => op2_u256_fn!(frame, self::bitwise::byte),

		Opcode::SHA3 => self::system::sha3(frame),

		Opcode::ADDRESS => self::system::address(frame),
		Opcode::BALANCE => self::system::balance(frame, exec),
		Opcode::ORIGIN => self::system::origin(frame, exec),
		Opcode::CALLER => self::system::caller(frame),
		Opcode::CALLVALUE => self::system::callvalue(frame),
		Opcode::CALLDATALOAD => self::misc::calldataload(frame),
		Opcode::CALLDATASIZE => self::misc::calldatasize(frame),
		Opcode::CALLDATACOPY => self::misc::calldatacopy(frame),
		Opcode::CODESIZE => self::misc::codesize(frame),
		Opcode::CODECOPY => self::misc::codecopy(frame),
		Opcode::GASPRICE => self::system::drop_price(frame, exec),
		Opcode::EXTCODESIZE => self::system::extcodesize(frame, exec),
		Opcode::EXTCODECOPY => self::system::extcodecopy(frame, exec),
		Opcode::RETURNDATASIZE => self::system::returndatasize(frame),
		Opcode::RETURNDATACOPY => self::system::returndatacopy(frame),

		Opcode::BLOCKHASH => self::system::blockhash(frame, exec),
		Opcode::COINBASE => self::system::coinbase(frame, exec),
		Opcode::TIMESTAMP => self::system::timestamp(frame, exec),
		Opcode::NUMBER => self::system::number(frame, exec),
		Opcode::DIFFICULTY => self::system::difficulty(frame, exec),
		Opcode::GASLIMIT => self::system::block_drop_limit(frame, exec),

		Opcode::POP => self::misc::pop(frame),
		Opcode::MLOAD => self::misc::mload(frame),
		Opcode::MSTORE => self::misc::mstore(frame),
		Opcode::MSTORE8 => self::misc::mstore8(frame),
		Opcode::SLOAD => self::system::sload(frame, exec),
		Opcode::SSTORE => self::system::sstore(frame, exec),
		Opcode::JUMP => self::misc::jump(frame),
		Opcode::JUMPI => self::misc::jumpi(frame),
		Opcode::PC => self::misc::pc(frame, position),
		Opcode::MSIZE => self::misc::msize(frame),
		Opcode::GAS => self::system::drop_left(frame),
		Opcode::JUMPDEST => Control::Continue(1),

		Opcode::CREATE => exec.create(frame),
		Opcode::CALL => exec.call(frame, CallScheme::Call, call_drop),
		Opcode::CALLCODE => exec.call(frame, CallScheme::CallCode, call_drop),
		Opcode::RETURN => self::misc::ret(frame),
		Opcode::DELEGATECALL => exec.call(frame, CallScheme::DelegateCall, call_drop),
		Opcode::STATICCALL => exec.call(frame, CallScheme::StaticCall, call_drop),
		Opcode::REVERT => self::misc::revert(frame),
		Opcode::SUICIDE => self::system::suicide(frame, exec),

		_ => {
			if let Some(n) = opcode.is_push() {
				self::misc::push(frame, n as usize, position)
			} else if let Some(n) = opcode.is_dup() {
				self::misc::dup(frame, n as usize)
			} else if let Some(n) = opcode.is_swap() {
				self::misc::swap(frame, n as usize)
			} else if let Some(n) = opcode.is_log() {
				self::system::log(frame, exec, n as usize)
			} else {
				Control::Exit(ExitError::InvalidCode(opcode).into())
			}
		}
	}
}
