use alloc::vec::Vec;
use primitive_types::U256;
use sha3::{Digest, Keccak256};

use super::Control;
use crate::backend::{Backend, Environment, Log};
use crate::error::{ExitError, ExitSucceed};
use crate::executor::Executor;
use crate::runtime::Frame;
use crate::utils::{address_to_u256, h256_to_u256, u256_to_h256};

pub fn sha3(frame: &mut Frame) -> Control {
	pop_u256!(frame, from, len);

	let len = as_usize_or_fail!(len);
	let data = if len == 0 {
		Vec::new()
	} else {
		let from = as_usize_or_fail!(from);
		try_or_fail!(frame.machine.memory.resize_offset(from, len));
		frame.machine.memory.get(from, len)
	};

	let digest = Keccak256::digest(data.as_slice());
	push_u256!(frame, U256::from_big_endian(digest.as_slice()));
	Control::Continue(1)
}

pub fn address(frame: &mut Frame) -> Control {
	let ret = address_to_u256(frame.context.address);
	push_u256!(frame, ret);
	Control::Continue(1)
}

pub fn balance<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	pop_address!(frame, address);
	push_u256!(frame, exec.overlay.balance(address));
	Control::Continue(1)
}

pub fn origin<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	let ret = address_to_u256(exec.tx.origin);
	push_u256!(frame, ret);
	Control::Continue(1)
}

pub fn caller(frame: &mut Frame) -> Control {
	let ret = address_to_u256(frame.context.caller);
	push_u256!(frame, ret);
	Control::Continue(1)
}

pub fn callvalue(frame: &mut Frame) -> Control {
	let ret = frame.context.apparent_value;
	push_u256!(frame, ret);
	Control::Continue(1)
}

pub fn drop_price<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	push_u256!(frame, exec.tx.drop_price);
	Control::Continue(1)
}

pub fn extcodesize<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	pop_address!(frame, address);
	let size = U256::from(exec.overlay.code_size(address));
	push_u256!(frame, size);
	Control::Continue(1)
}

pub fn extcodecopy<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	pop_address!(frame, address);
	pop_u256!(frame, memory_offset, code_offset, len);

	let len = as_usize_or_fail!(len);
	if len == 0 {
		return Control::Continue(1);
	}
	let memory_offset = as_usize_or_fail!(memory_offset);

	try_or_fail!(frame.machine.memory.resize_offset(memory_offset, len));
	let code = exec.overlay.code(address);
	match frame
		.machine
		.memory
		.copy_data(memory_offset, code_offset, len, &code)
	{
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn returndatasize(frame: &mut Frame) -> Control {
	let size = U256::from(frame.return_data_buffer.len());
	push_u256!(frame, size);
	Control::Continue(1)
}

pub fn returndatacopy(frame: &mut Frame) -> Control {
	pop_u256!(frame, memory_offset, data_offset, len);

	// The whole requested range must exist in the buffer, even when
	// nothing is copied.
	if data_offset
		.checked_add(len)
		.map(|end| end > U256::from(frame.return_data_buffer.len()))
		.unwrap_or(true)
	{
		return Control::Exit(ExitError::OutOfReturndata.into());
	}

	let len = as_usize_or_fail!(len);
	if len == 0 {
		return Control::Continue(1);
	}
	let memory_offset = as_usize_or_fail!(memory_offset);

	try_or_fail!(frame.machine.memory.resize_offset(memory_offset, len));
	let buffer = core::mem::take(&mut frame.return_data_buffer);
	let result = frame
		.machine
		.memory
		.copy_data(memory_offset, data_offset, len, &buffer);
	frame.return_data_buffer = buffer;
	match result {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn blockhash<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	pop_u256!(frame, number);
	push_u256!(frame, h256_to_u256(exec.environment.block_hash(number)));
	Control::Continue(1)
}

pub fn coinbase<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	push_u256!(frame, address_to_u256(exec.environment.block_coinbase()));
	Control::Continue(1)
}

pub fn timestamp<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	push_u256!(frame, exec.environment.block_timestamp());
	Control::Continue(1)
}

pub fn number<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	push_u256!(frame, exec.environment.block_number());
	Control::Continue(1)
}

pub fn difficulty<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	push_u256!(frame, exec.environment.block_difficulty());
	Control::Continue(1)
}

pub fn block_drop_limit<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	push_u256!(frame, exec.environment.block_drop_limit());
	Control::Continue(1)
}

pub fn sload<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &Executor<'_, B, E>,
) -> Control {
	pop_u256!(frame, key);
	let value = exec.overlay.storage(frame.context.address, u256_to_h256(key));
	push_u256!(frame, h256_to_u256(value));
	Control::Continue(1)
}

pub fn sstore<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &mut Executor<'_, B, E>,
) -> Control {
	if frame.is_static {
		return Control::Exit(ExitError::StaticModeViolation.into());
	}

	pop_u256!(frame, key, value);
	exec.overlay
		.set_storage(frame.context.address, u256_to_h256(key), u256_to_h256(value));
	Control::Continue(1)
}

pub fn log<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &mut Executor<'_, B, E>,
	n: usize,
) -> Control {
	if frame.is_static {
		return Control::Exit(ExitError::StaticModeViolation.into());
	}

	pop_u256!(frame, start, len);
	let len = as_usize_or_fail!(len);

	let mut topics = Vec::with_capacity(n);
	for _ in 0..n {
		pop_u256!(frame, topic);
		topics.push(u256_to_h256(topic));
	}

	let data = if len == 0 {
		Vec::new()
	} else {
		let start = as_usize_or_fail!(start);
		try_or_fail!(frame.machine.memory.resize_offset(start, len));
		frame.machine.memory.get(start, len)
	};

	exec.overlay.log(Log {
		address: frame.context.address,
		topics,
		data,
	});
	Control::Continue(1)
}

pub fn suicide<B: Backend, E: Environment>(
	frame: &mut Frame,
	exec: &mut Executor<'_, B, E>,
) -> Control {
	if frame.is_static {
		return Control::Exit(ExitError::StaticModeViolation.into());
	}

	pop_address!(frame, beneficiary);
	exec.overlay.mark_delete(frame.context.address, beneficiary);
	exec.overlay.touch(beneficiary);
	frame.retval = Vec::new();
	Control::Exit(ExitSucceed::Suicided.into())
}

/// Remaining drops after this opcode's own charge.
pub fn drop_left(frame: &mut Frame) -> Control {
	let ret = U256::from(frame.dropometer.remaining());
	push_u256!(frame, ret);
	Control::Continue(1)
}
