//! Cost tiers and the drop schedule.

/// Base cost tier of an opcode. Most opcodes are fully priced by their
/// tier; the rest start from it and add an opcode-specific surcharge.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tier {
	/// No base charge.
	Zero,
	/// Cheap context reads.
	Base,
	/// Stack shuffling and fast arithmetic.
	VeryLow,
	/// Multiplication-class arithmetic.
	Low,
	/// Modular arithmetic.
	Mid,
	/// Conditional flow.
	High,
	/// External account access.
	Ext,
	/// Priced by surcharge rules.
	Special,
}

impl Tier {
	/// Drops charged for the tier.
	pub const fn drops(self) -> u64 {
		match self {
			Tier::Zero => 0,
			Tier::Base => 2,
			Tier::VeryLow => 3,
			Tier::Low => 5,
			Tier::Mid => 8,
			Tier::High => 10,
			Tier::Ext => 20,
			Tier::Special => 1,
		}
	}
}

/// Named constants for every priced operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Schedule {
	/// Drops for STOP.
	pub stop: u64,
	/// Drops for SUICIDE.
	pub suicide: u64,
	/// Drops for SLOAD.
	pub sload: u64,
	/// Drops for SSTORE writing a non-zero value over zero.
	pub sstore_set: u64,
	/// Drops for SSTORE overwriting a non-zero value with non-zero.
	pub sstore_reset: u64,
	/// Drops for SSTORE clearing a non-zero value.
	pub sstore_clear: u64,
	/// Refund credited when a non-zero slot is cleared.
	pub sstore_refund: u64,
	/// Drops for BALANCE.
	pub balance: u64,
	/// Drops for SHA3.
	pub sha3: u64,
	/// Drops per 32-byte word hashed by SHA3.
	pub sha3_word: u64,
	/// Drops for EXP.
	pub exp: u64,
	/// Drops per significant byte of the EXP exponent.
	pub exp_byte: u64,
	/// Drops per 32-byte word copied by the copy family.
	pub copy: u64,
	/// Drops for EXTCODESIZE.
	pub ext_code_size: u64,
	/// Drops for EXTCODECOPY.
	pub ext_code_copy: u64,
	/// Base drops for the CALL family.
	pub call: u64,
	/// Drops for a plain CALL (new-account rate).
	pub new_acct_call: u64,
	/// Surcharge for a CALL carrying non-zero value.
	pub vt_call: u64,
	/// Free budget handed to the callee of a value transfer.
	pub stipend_call: u64,
	/// Drops for CREATE.
	pub create: u64,
	/// Drops for LOGn.
	pub log: u64,
	/// Drops per LOG topic.
	pub log_topic: u64,
	/// Drops per LOG data byte.
	pub log_data: u64,
	/// Drops per 32-byte word of active memory.
	pub memory: u64,
	/// Divisor of the quadratic memory term.
	pub quad_coeff_div: u64,
}

impl Default for Schedule {
	fn default() -> Self {
		Self {
			stop: 0,
			suicide: 0,
			sload: 50,
			sstore_set: 20000,
			sstore_reset: 5000,
			sstore_clear: 5000,
			sstore_refund: 15000,
			balance: 20,
			sha3: 30,
			sha3_word: 6,
			exp: 10,
			exp_byte: 10,
			copy: 3,
			ext_code_size: 20,
			ext_code_copy: 20,
			call: 40,
			new_acct_call: 25000,
			vt_call: 9000,
			stipend_call: 2300,
			create: 32000,
			log: 375,
			log_topic: 375,
			log_data: 8,
			memory: 3,
			quad_coeff_div: 512,
		}
	}
}

/// Interpreter limits and the active schedule.
#[derive(Clone, Debug)]
pub struct Config {
	/// Maximum stack depth.
	pub stack_limit: usize,
	/// Maximum addressable memory in bytes. Expansion past this point can
	/// never be paid for, so pricing rejects it before any allocation.
	pub memory_limit: usize,
	/// Maximum call depth; a sub-call past it is skipped with a zero push.
	pub max_call_depth: usize,
	/// Drop schedule.
	pub schedule: Schedule,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			stack_limit: 1024,
			memory_limit: 0x7fff_ffff,
			max_call_depth: 1024,
			schedule: Schedule::default(),
		}
	}
}
