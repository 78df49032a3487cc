use alloc::vec::Vec;
use primitive_types::U256;

use crate::error::ExitError;

/// Byte-addressable volatile memory. Zero-initialized, grown lazily in
/// 32-byte words, monotonic within a frame. Expansion cost is charged by
/// the dropometer before any resize happens here.
#[derive(Clone, Debug)]
pub struct Memory {
	data: Vec<u8>,
	limit: usize,
}

impl Memory {
	/// Create an empty memory with the given byte limit.
	pub const fn new(limit: usize) -> Self {
		Self {
			data: Vec::new(),
			limit,
		}
	}

	/// Current effective length in bytes, always a multiple of 32.
	#[inline]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	/// Whether no memory has been touched yet.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Grow to cover `size` bytes, aligned up to the next 32-byte word.
	/// Shrinking never happens.
	pub fn resize(&mut self, size: usize) -> Result<(), ExitError> {
		if self.data.len() >= size {
			return Ok(());
		}

		let aligned = size
			.checked_add(31)
			.map(|s| s / 32 * 32)
			.ok_or(ExitError::MemoryOverflow)?;
		if aligned > self.limit {
			return Err(ExitError::MemoryOverflow);
		}

		self.data.resize(aligned, 0);
		Ok(())
	}

	/// Grow to cover the range `offset..offset + len`. A zero `len`
	/// touches nothing regardless of `offset`.
	pub fn resize_offset(&mut self, offset: usize, len: usize) -> Result<(), ExitError> {
		if len == 0 {
			return Ok(());
		}
		let end = offset.checked_add(len).ok_or(ExitError::MemoryOverflow)?;
		self.resize(end)
	}

	/// Copy `size` bytes starting at `offset`. Reads past the effective
	/// length yield zeroes and do not expand memory.
	pub fn get(&self, offset: usize, size: usize) -> Vec<u8> {
		let mut ret = Vec::new();
		ret.resize(size, 0);

		for (index, byte) in ret.iter_mut().enumerate() {
			let position = match offset.checked_add(index) {
				Some(position) => position,
				None => break,
			};
			if position >= self.data.len() {
				break;
			}
			*byte = self.data[position];
		}

		ret
	}

	/// Write `value` at `offset`, expanding to cover `target_size` bytes
	/// (defaults to the value length). Bytes of the target range past the
	/// value are zeroed.
	pub fn set(
		&mut self,
		offset: usize,
		value: &[u8],
		target_size: Option<usize>,
	) -> Result<(), ExitError> {
		let target_size = target_size.unwrap_or(value.len());
		if target_size == 0 {
			return Ok(());
		}

		self.resize_offset(offset, target_size)?;

		for index in 0..target_size {
			let byte = if index < value.len() { value[index] } else { 0 };
			self.data[offset + index] = byte;
		}

		Ok(())
	}

	/// Copy from a data buffer with a word-sized offset, zero-padding
	/// whatever the source does not cover. Used by the copy family where
	/// the source offset comes straight off the stack.
	pub fn copy_data(
		&mut self,
		memory_offset: usize,
		data_offset: U256,
		len: usize,
		data: &[u8],
	) -> Result<(), ExitError> {
		if len == 0 {
			return Ok(());
		}

		let data = if let Some(end) = data_offset.checked_add(U256::from(len)) {
			if data_offset > U256::from(usize::MAX) || end > U256::from(data.len()) {
				let start = if data_offset > U256::from(data.len()) {
					data.len()
				} else {
					data_offset.as_usize()
				};
				&data[start..]
			} else {
				&data[data_offset.as_usize()..end.as_usize()]
			}
		} else {
			&[]
		};

		self.set(memory_offset, data, Some(len))
	}
}
