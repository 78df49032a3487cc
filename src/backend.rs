//! External collaborators and the buffered state overlay.
//!
//! A backend exposes the persistent world state the interpreter reads;
//! the environment exposes block information. Neither is mutated while a
//! program runs: every write is buffered in an overlay substate so that
//! a reverting frame discards its effects atomically, and the host
//! applies the surviving change set after the top-level frame finishes.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use primitive_types::{H160, H256, U256};

use crate::error::ExitFatal;

/// A log record emitted by LOGn.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Log {
	/// Address of the emitting contract, in normalized 20-byte form.
	pub address: H160,
	/// Topic words, at most four.
	pub topics: Vec<H256>,
	/// Raw data copied out of memory.
	pub data: Vec<u8>,
}

/// Read-only world-state oracle. Provides a snapshot-isolation view for
/// the duration of a top-level frame.
#[auto_impl::auto_impl(&, Box)]
pub trait Backend {
	/// Balance of the account.
	fn balance(&self, address: H160) -> U256;
	/// Contract code of the account; empty when absent.
	fn code(&self, address: H160) -> Vec<u8>;
	/// Size of the contract code.
	fn code_size(&self, address: H160) -> usize {
		self.code(address).len()
	}
	/// Storage value; zero when absent.
	fn storage(&self, address: H160, key: H256) -> H256;
	/// Whether the account exists at all.
	fn exists(&self, address: H160) -> bool;
}

/// Block oracle.
#[auto_impl::auto_impl(&, Box)]
pub trait Environment {
	/// Hash of the block at the given number; zero outside the supported
	/// window.
	fn block_hash(&self, number: U256) -> H256;
	/// Producer of the current block.
	fn block_coinbase(&self) -> H160;
	/// Timestamp of the current block.
	fn block_timestamp(&self) -> U256;
	/// Number of the current block.
	fn block_number(&self) -> U256;
	/// Difficulty of the current block.
	fn block_difficulty(&self) -> U256;
	/// Drop limit of the current block.
	fn block_drop_limit(&self) -> U256;
}

/// Everything a finished top-level frame wants to write back, surfaced
/// to the host together with the logs and touched accounts.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
	/// Storage writes, keyed by owner and slot.
	pub storages: BTreeMap<(H160, H256), H256>,
	/// Code created by CREATE.
	pub codes: BTreeMap<H160, Vec<u8>>,
	/// Accounts scheduled for deletion, with their beneficiaries.
	pub deletes: Vec<(H160, H160)>,
	/// Emitted logs, in order.
	pub logs: Vec<Log>,
	/// Accounts observed or affected by the execution.
	pub touched: BTreeSet<H160>,
}

/// Host-side commit surface.
#[auto_impl::auto_impl(&mut, Box)]
pub trait ApplyBackend {
	/// Overwrite a storage slot.
	fn storage_save(&mut self, address: H160, key: H256, value: H256);
	/// Create an account with the given code.
	fn create_account(&mut self, address: H160, code: Vec<u8>);
	/// Delete an account, crediting its balance to the beneficiary.
	fn suicide(&mut self, address: H160, beneficiary: H160);

	/// Apply a full change set in order.
	fn apply(&mut self, changes: &ChangeSet) {
		for ((address, key), value) in &changes.storages {
			self.storage_save(*address, *key, *value);
		}
		for (address, code) in &changes.codes {
			self.create_account(*address, code.clone());
		}
		for (address, beneficiary) in &changes.deletes {
			self.suicide(*address, *beneficiary);
		}
	}
}

/// Outcome of a precompiled contract run.
#[derive(Clone, Debug)]
pub struct PrecompileOutput {
	/// Result bytes.
	pub output: Vec<u8>,
	/// Drops consumed out of the forwarded budget.
	pub drops_used: u64,
	/// Whether the precompile succeeded.
	pub succeeded: bool,
}

/// A host-provided function reachable at a reserved address.
pub trait Precompile {
	/// Run the precompile deterministically against the input, bounded
	/// by the forwarded budget.
	fn execute(&self, input: &[u8], budget: u64) -> PrecompileOutput;
}

/// Registry of precompiled contracts.
pub trait PrecompileSet {
	/// Find the precompile registered at the address, if any.
	fn lookup(&self, address: H160) -> Option<&dyn Precompile>;
}

/// The empty registry.
impl PrecompileSet for () {
	fn lookup(&self, _address: H160) -> Option<&dyn Precompile> {
		None
	}
}

/// How a finished substate folds into its parent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MergeStrategy {
	/// The sub-frame succeeded: keep its writes.
	Commit,
	/// The sub-frame reverted or failed: drop its writes.
	Discard,
}

#[derive(Clone, Debug, Default)]
struct Substate {
	parent: Option<alloc::boxed::Box<Substate>>,
	storages: BTreeMap<(H160, H256), H256>,
	codes: BTreeMap<H160, Vec<u8>>,
	deletes: Vec<(H160, H160)>,
	logs: Vec<Log>,
	touched: BTreeSet<H160>,
}

impl Substate {
	fn known_storage(&self, address: H160, key: H256) -> Option<H256> {
		if let Some(value) = self.storages.get(&(address, key)) {
			Some(*value)
		} else if let Some(parent) = self.parent.as_ref() {
			parent.known_storage(address, key)
		} else {
			None
		}
	}

	fn known_code(&self, address: H160) -> Option<Vec<u8>> {
		if let Some(code) = self.codes.get(&address) {
			Some(code.clone())
		} else if let Some(parent) = self.parent.as_ref() {
			parent.known_code(address)
		} else {
			None
		}
	}
}

/// Buffered view over a read-only backend. Each frame runs against its
/// own substate; entering a sub-frame pushes one, leaving pops it with a
/// merge strategy.
pub struct OverlayedState<'a, B> {
	backend: &'a B,
	substate: alloc::boxed::Box<Substate>,
}

impl<'a, B: Backend> OverlayedState<'a, B> {
	/// Wrap a backend with an empty root substate.
	pub fn new(backend: &'a B) -> Self {
		Self {
			backend,
			substate: Default::default(),
		}
	}

	/// Storage value as the running program sees it: buffered writes
	/// first, then the backend snapshot.
	pub fn storage(&self, address: H160, key: H256) -> H256 {
		self.substate
			.known_storage(address, key)
			.unwrap_or_else(|| self.backend.storage(address, key))
	}

	/// Code as the running program sees it.
	pub fn code(&self, address: H160) -> Vec<u8> {
		self.substate
			.known_code(address)
			.unwrap_or_else(|| self.backend.code(address))
	}

	/// Code size as the running program sees it.
	pub fn code_size(&self, address: H160) -> usize {
		match self.substate.known_code(address) {
			Some(code) => code.len(),
			None => self.backend.code_size(address),
		}
	}

	/// Balance, straight from the backend snapshot.
	pub fn balance(&self, address: H160) -> U256 {
		self.backend.balance(address)
	}

	/// Buffer a storage write.
	pub fn set_storage(&mut self, address: H160, key: H256, value: H256) {
		self.substate.storages.insert((address, key), value);
	}

	/// Buffer created contract code.
	pub fn set_code(&mut self, address: H160, code: Vec<u8>) {
		self.substate.codes.insert(address, code);
	}

	/// Schedule an account for deletion.
	pub fn mark_delete(&mut self, address: H160, beneficiary: H160) {
		self.substate.deletes.push((address, beneficiary));
	}

	/// Append a log record.
	pub fn log(&mut self, log: Log) {
		self.substate.logs.push(log);
	}

	/// Record a touched account.
	pub fn touch(&mut self, address: H160) {
		self.substate.touched.insert(address);
	}

	/// Enter a sub-frame: subsequent writes land in a fresh substate.
	pub fn push_substate(&mut self) {
		let mut parent = alloc::boxed::Box::<Substate>::default();
		core::mem::swap(&mut parent, &mut self.substate);
		self.substate.parent = Some(parent);
	}

	/// Leave a sub-frame, folding or discarding its writes. Push and pop
	/// are balanced by the executor; an unbalanced pop is fatal.
	pub fn pop_substate(&mut self, strategy: MergeStrategy) -> Result<(), ExitFatal> {
		let parent = self
			.substate
			.parent
			.take()
			.ok_or(ExitFatal::UnevenSubstate)?;
		let child = core::mem::replace(&mut self.substate, parent);

		if strategy == MergeStrategy::Commit {
			let child = *child;
			self.substate.storages.extend(child.storages);
			self.substate.codes.extend(child.codes);
			self.substate.deletes.extend(child.deletes);
			self.substate.logs.extend(child.logs);
			self.substate.touched.extend(child.touched);
		}

		Ok(())
	}

	/// Tear down into the change set the host applies. Call only after
	/// the top-level frame has finished and its substate was popped.
	pub fn deconstruct(self) -> ChangeSet {
		let substate = *self.substate;
		ChangeSet {
			storages: substate.storages,
			codes: substate.codes,
			deletes: substate.deletes,
			logs: substate.logs,
			touched: substate.touched,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloc::vec;

	#[derive(Default)]
	struct StaticBackend {
		storages: BTreeMap<(H160, H256), H256>,
	}

	impl Backend for StaticBackend {
		fn balance(&self, _address: H160) -> U256 {
			U256::zero()
		}
		fn code(&self, _address: H160) -> Vec<u8> {
			Vec::new()
		}
		fn storage(&self, address: H160, key: H256) -> H256 {
			self.storages
				.get(&(address, key))
				.copied()
				.unwrap_or_default()
		}
		fn exists(&self, _address: H160) -> bool {
			false
		}
	}

	fn addr(n: u8) -> H160 {
		H160::repeat_byte(n)
	}

	#[test]
	fn reads_fall_through_to_the_backend() {
		let mut backend = StaticBackend::default();
		backend
			.storages
			.insert((addr(1), H256::zero()), H256::repeat_byte(9));
		let overlay = OverlayedState::new(&backend);
		assert_eq!(overlay.storage(addr(1), H256::zero()), H256::repeat_byte(9));
		assert_eq!(overlay.storage(addr(2), H256::zero()), H256::zero());
	}

	#[test]
	fn discarded_substate_leaves_no_trace() {
		let backend = StaticBackend::default();
		let mut overlay = OverlayedState::new(&backend);

		overlay.push_substate();
		overlay.set_storage(addr(1), H256::zero(), H256::repeat_byte(1));
		overlay.log(Log {
			address: addr(1),
			topics: vec![],
			data: vec![1],
		});
		assert_eq!(overlay.storage(addr(1), H256::zero()), H256::repeat_byte(1));
		overlay.pop_substate(MergeStrategy::Discard).unwrap();

		assert_eq!(overlay.storage(addr(1), H256::zero()), H256::zero());
		let changes = overlay.deconstruct();
		assert!(changes.storages.is_empty());
		assert!(changes.logs.is_empty());
	}

	#[test]
	fn committed_substate_folds_into_the_parent() {
		let backend = StaticBackend::default();
		let mut overlay = OverlayedState::new(&backend);

		overlay.push_substate();
		overlay.set_storage(addr(1), H256::zero(), H256::repeat_byte(1));
		overlay.touch(addr(7));

		overlay.push_substate();
		overlay.set_storage(addr(1), H256::zero(), H256::repeat_byte(2));
		// The child sees its own write shadowing the parent's.
		assert_eq!(overlay.storage(addr(1), H256::zero()), H256::repeat_byte(2));
		overlay.pop_substate(MergeStrategy::Commit).unwrap();

		overlay.pop_substate(MergeStrategy::Commit).unwrap();

		let changes = overlay.deconstruct();
		assert_eq!(
			changes.storages.get(&(addr(1), H256::zero())),
			Some(&H256::repeat_byte(2))
		);
		assert!(changes.touched.contains(&addr(7)));
	}
}
