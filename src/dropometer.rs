//! Drop accounting: the per-frame meter and the memory pricing helpers.

use primitive_types::U256;

use crate::error::ExitError;
use crate::schedule::Schedule;

/// Largest memory requirement that can ever be paid for. Bounding it
/// keeps the pricing arithmetic in word-sized integers.
pub const MAX_MEM_NEED: u64 = 0x7fff_ffff;

/// Per-frame drop meter: remaining budget plus the future-refund
/// counter. The refund stays frame-local until the frame commits; a
/// failing frame loses both.
#[derive(Clone, Debug)]
pub struct Dropometer {
	limit: u64,
	remaining: u64,
	refund: u64,
}

impl Dropometer {
	/// Create a meter with the given drop limit.
	pub const fn new(limit: u64) -> Self {
		Self {
			limit,
			remaining: limit,
			refund: 0,
		}
	}

	/// Initial drop limit.
	#[inline]
	pub const fn limit(&self) -> u64 {
		self.limit
	}

	/// Drops still available.
	#[inline]
	pub const fn remaining(&self) -> u64 {
		self.remaining
	}

	/// Drops consumed so far.
	#[inline]
	pub const fn used(&self) -> u64 {
		self.limit - self.remaining
	}

	/// Accumulated future refund.
	#[inline]
	pub const fn refund(&self) -> u64 {
		self.refund
	}

	/// Charge `cost` drops. The charge happens before the opcode's side
	/// effects; on failure the frame is terminated without them.
	pub fn spend(&mut self, cost: u64) -> Result<(), ExitError> {
		if cost > self.remaining {
			return Err(ExitError::OutOfDrop);
		}
		self.remaining -= cost;
		Ok(())
	}

	/// Consume everything. Runtime failures land here.
	pub fn spend_all(&mut self) {
		self.remaining = 0;
	}

	/// Return unspent drops from a finished sub-frame or precompile.
	pub fn give_back(&mut self, drops: u64) {
		self.remaining = self.remaining.saturating_add(drops);
	}

	/// Credit a future refund (storage clearance).
	pub fn credit_refund(&mut self, drops: u64) {
		self.refund = self.refund.saturating_add(drops);
	}

	/// Discard the future refund. Runtime failures land here.
	pub fn reset_refund(&mut self) {
		self.refund = 0;
	}
}

/// Total memory needed by an access at `offset` of `size` bytes: simply
/// `offset + size`, except that a zero `size` needs nothing.
pub fn mem_needed(offset: U256, size: U256) -> Result<U256, ExitError> {
	if size == U256::zero() {
		return Ok(U256::zero());
	}
	offset.checked_add(size).ok_or(ExitError::MemoryOverflow)
}

/// Drops for growing memory from `old_size` bytes to cover `new_need`
/// bytes, plus the per-word copy charge for `copy_size` copied bytes.
///
/// The growth term is the difference of the closed form
/// `memory * w + w^2 / quad_coeff_div` between the new and old word
/// counts, so interleaved expansions always price the same as one big
/// expansion.
pub fn memory_drop(
	schedule: &Schedule,
	old_size: usize,
	new_need: U256,
	copy_size: u64,
) -> Result<u64, ExitError> {
	if new_need > U256::from(MAX_MEM_NEED) {
		return Err(ExitError::MemoryOverflow);
	}

	let mut drops = 0;

	let usage = (new_need.as_u64() + 31) / 32 * 32;
	let old_size = old_size as u64;
	if usage > old_size {
		let words = usage / 32;
		let words_old = old_size / 32;
		let cost = |w: u64| schedule.memory * w + w * w / schedule.quad_coeff_div;
		drops += cost(words) - cost(words_old);
	}

	if copy_size > 0 {
		drops += schedule.copy * ((copy_size + 31) / 32);
	}

	Ok(drops)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn spend_and_exhaust() {
		let mut meter = Dropometer::new(100);
		meter.spend(40).unwrap();
		assert_eq!(meter.remaining(), 60);
		assert_eq!(meter.used(), 40);
		assert_eq!(meter.spend(61), Err(ExitError::OutOfDrop));
		assert_eq!(meter.remaining(), 60);
		meter.spend_all();
		assert_eq!(meter.remaining(), 0);
		assert_eq!(meter.used(), 100);
	}

	#[test]
	fn refund_lifecycle() {
		let mut meter = Dropometer::new(10);
		meter.credit_refund(15000);
		meter.credit_refund(15000);
		assert_eq!(meter.refund(), 30000);
		meter.reset_refund();
		assert_eq!(meter.refund(), 0);
	}

	#[test]
	fn needed_is_zero_for_empty_access() {
		assert_eq!(
			mem_needed(U256::MAX, U256::zero()),
			Ok(U256::zero())
		);
		assert_eq!(
			mem_needed(U256::from(96), U256::from(32)),
			Ok(U256::from(128))
		);
		assert_eq!(
			mem_needed(U256::MAX, U256::one()),
			Err(ExitError::MemoryOverflow)
		);
	}

	#[test]
	fn expansion_matches_closed_form() {
		let schedule = Schedule::default();
		// First word: 3 * 1 + 1 / 512 = 3.
		assert_eq!(
			memory_drop(&schedule, 0, U256::from(32), 0),
			Ok(3)
		);
		// Already covered: free.
		assert_eq!(
			memory_drop(&schedule, 64, U256::from(33), 0),
			Ok(0)
		);
		// 1024 words from scratch: 3 * 1024 + 1024^2 / 512 = 5120.
		assert_eq!(
			memory_drop(&schedule, 0, U256::from(32 * 1024), 0),
			Ok(5120)
		);
		// Growing 512 -> 1024 words prices exactly the difference.
		let full = memory_drop(&schedule, 0, U256::from(32 * 1024), 0).unwrap();
		let half = memory_drop(&schedule, 0, U256::from(32 * 512), 0).unwrap();
		assert_eq!(
			memory_drop(&schedule, 32 * 512, U256::from(32 * 1024), 0),
			Ok(full - half)
		);
	}

	#[test]
	fn copy_is_priced_per_word() {
		let schedule = Schedule::default();
		assert_eq!(memory_drop(&schedule, 64, U256::from(64), 1), Ok(3));
		assert_eq!(memory_drop(&schedule, 64, U256::from(64), 33), Ok(6));
	}

	#[test]
	fn unpayable_expansion_is_rejected() {
		let schedule = Schedule::default();
		assert_eq!(
			memory_drop(&schedule, 0, U256::from(MAX_MEM_NEED) + U256::one(), 0),
			Err(ExitError::MemoryOverflow)
		);
	}
}
