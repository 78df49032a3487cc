use primitive_types::U256;

use super::Control;
use crate::error::{ExitError, ExitRevert, ExitSucceed};
use crate::runtime::Frame;
use crate::utils::u256_to_usize;

pub fn codesize(frame: &mut Frame) -> Control {
	let size = U256::from(frame.machine.code().len());
	push_u256!(frame, size);
	Control::Continue(1)
}

pub fn codecopy(frame: &mut Frame) -> Control {
	pop_u256!(frame, memory_offset, code_offset, len);

	let len = as_usize_or_fail!(len);
	if len == 0 {
		return Control::Continue(1);
	}
	let memory_offset = as_usize_or_fail!(memory_offset);

	try_or_fail!(frame.machine.memory.resize_offset(memory_offset, len));
	let code = frame.machine.code.clone();
	match frame
		.machine
		.memory
		.copy_data(memory_offset, code_offset, len, &code)
	{
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn calldataload(frame: &mut Frame) -> Control {
	pop_u256!(frame, index);

	let mut load = [0u8; 32];
	for (i, byte) in load.iter_mut().enumerate() {
		if let Some(p) = index.checked_add(U256::from(i)) {
			if p <= U256::from(usize::MAX) {
				let p = p.as_usize();
				if p < frame.machine.data().len() {
					*byte = frame.machine.data()[p];
				}
			}
		}
	}

	push_u256!(frame, U256::from_big_endian(&load));
	Control::Continue(1)
}

pub fn calldatasize(frame: &mut Frame) -> Control {
	let size = U256::from(frame.machine.data().len());
	push_u256!(frame, size);
	Control::Continue(1)
}

pub fn calldatacopy(frame: &mut Frame) -> Control {
	pop_u256!(frame, memory_offset, data_offset, len);

	let len = as_usize_or_fail!(len);
	if len == 0 {
		return Control::Continue(1);
	}
	let memory_offset = as_usize_or_fail!(memory_offset);

	try_or_fail!(frame.machine.memory.resize_offset(memory_offset, len));
	let data = frame.machine.data.clone();
	match frame
		.machine
		.memory
		.copy_data(memory_offset, data_offset, len, &data)
	{
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn pop(frame: &mut Frame) -> Control {
	pop_u256!(frame, _any);
	Control::Continue(1)
}

pub fn mload(frame: &mut Frame) -> Control {
	pop_u256!(frame, index);
	let index = as_usize_or_fail!(index);

	try_or_fail!(frame.machine.memory.resize_offset(index, 32));
	let value = U256::from_big_endian(&frame.machine.memory.get(index, 32)[..]);
	push_u256!(frame, value);
	Control::Continue(1)
}

pub fn mstore(frame: &mut Frame) -> Control {
	pop_u256!(frame, index, value);
	let index = as_usize_or_fail!(index);

	let mut bytes = [0u8; 32];
	value.to_big_endian(&mut bytes);
	match frame.machine.memory.set(index, &bytes, Some(32)) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn mstore8(frame: &mut Frame) -> Control {
	pop_u256!(frame, index, value);
	let index = as_usize_or_fail!(index);

	let byte = (value.low_u32() & 0xff) as u8;
	match frame.machine.memory.set(index, &[byte], Some(1)) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn jump(frame: &mut Frame) -> Control {
	pop_u256!(frame, dest);
	let dest = as_usize_or_fail!(dest, ExitError::InvalidJump);

	if frame.machine.valids().is_valid(dest) {
		Control::Jump(dest)
	} else {
		Control::Exit(ExitError::InvalidJump.into())
	}
}

pub fn jumpi(frame: &mut Frame) -> Control {
	pop_u256!(frame, dest, value);

	if value == U256::zero() {
		return Control::Continue(1);
	}

	let dest = as_usize_or_fail!(dest, ExitError::InvalidJump);
	if frame.machine.valids().is_valid(dest) {
		Control::Jump(dest)
	} else {
		Control::Exit(ExitError::InvalidJump.into())
	}
}

pub fn pc(frame: &mut Frame, position: usize) -> Control {
	push_u256!(frame, U256::from(position));
	Control::Continue(1)
}

pub fn msize(frame: &mut Frame) -> Control {
	let len = U256::from(frame.machine.memory.len());
	push_u256!(frame, len);
	Control::Continue(1)
}

/// PUSHn reads past the opcode byte; an immediate running off the end of
/// code is zero-padded on the right.
pub fn push(frame: &mut Frame, n: usize, position: usize) -> Control {
	let mut slice = [0u8; 32];
	{
		let code = frame.machine.code();
		for i in 0..n {
			if let Some(b) = code.get(position + 1 + i) {
				slice[32 - n + i] = *b;
			}
		}
	}

	push_u256!(frame, U256::from_big_endian(&slice));
	Control::Continue(1 + n)
}

pub fn dup(frame: &mut Frame, n: usize) -> Control {
	let value = match frame.machine.stack.peek(n - 1) {
		Ok(value) => value,
		Err(e) => return Control::Exit(e.into()),
	};
	push_u256!(frame, value);
	Control::Continue(1)
}

pub fn swap(frame: &mut Frame, n: usize) -> Control {
	let val1 = match frame.machine.stack.peek(0) {
		Ok(value) => value,
		Err(e) => return Control::Exit(e.into()),
	};
	let val2 = match frame.machine.stack.peek(n) {
		Ok(value) => value,
		Err(e) => return Control::Exit(e.into()),
	};
	try_or_fail!(frame.machine.stack.set(0, val2));
	try_or_fail!(frame.machine.stack.set(n, val1));
	Control::Continue(1)
}

pub fn ret(frame: &mut Frame) -> Control {
	pop_u256!(frame, start, len);
	try_or_fail!(publish_return(frame, start, len));
	Control::Exit(ExitSucceed::Returned.into())
}

pub fn revert(frame: &mut Frame) -> Control {
	pop_u256!(frame, start, len);
	try_or_fail!(publish_return(frame, start, len));
	Control::Exit(ExitRevert::Reverted.into())
}

fn publish_return(frame: &mut Frame, start: U256, len: U256) -> Result<(), ExitError> {
	if len == U256::zero() {
		frame.retval = alloc::vec::Vec::new();
		return Ok(());
	}

	let start = u256_to_usize(start, ExitError::MemoryOverflow)?;
	let len = u256_to_usize(len, ExitError::MemoryOverflow)?;

	frame.machine.memory.resize_offset(start, len)?;
	frame.retval = frame.machine.memory.get(start, len);
	Ok(())
}
