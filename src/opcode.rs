use crate::schedule::Tier;

/// Opcode newtype. One-to-one corresponding to an `u8` value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Opcode(pub u8);

impl Opcode {
	/// `STOP`
	pub const STOP: Opcode = Opcode(0x00);
	/// `ADD`
	pub const ADD: Opcode = Opcode(0x01);
	/// `MUL`
	pub const MUL: Opcode = Opcode(0x02);
	/// `SUB`
	pub const SUB: Opcode = Opcode(0x03);
	/// `DIV`
	pub const DIV: Opcode = Opcode(0x04);
	/// `SDIV`
	pub const SDIV: Opcode = Opcode(0x05);
	/// `MOD`
	pub const MOD: Opcode = Opcode(0x06);
	/// `SMOD`
	pub const SMOD: Opcode = Opcode(0x07);
	/// `ADDMOD`
	pub const ADDMOD: Opcode = Opcode(0x08);
	/// `MULMOD`
	pub const MULMOD: Opcode = Opcode(0x09);
	/// `EXP`
	pub const EXP: Opcode = Opcode(0x0a);
	/// `SIGNEXTEND`
	pub const SIGNEXTEND: Opcode = Opcode(0x0b);

	/// `LT`
	pub const LT: Opcode = Opcode(0x10);
	/// `GT`
	pub const GT: Opcode = Opcode(0x11);
	/// `SLT`
	pub const SLT: Opcode = Opcode(0x12);
	/// `SGT`
	pub const SGT: Opcode = Opcode(0x13);
	/// `EQ`
	pub const EQ: Opcode = Opcode(0x14);
	/// `ISZERO`
	pub const ISZERO: Opcode = Opcode(0x15);
	/// `AND`
	pub const AND: Opcode = Opcode(0x16);
	/// `OR`
	pub const OR: Opcode = Opcode(0x17);
	/// `XOR`
	pub const XOR: Opcode = Opcode(0x18);
	/// `NOT`
	pub const NOT: Opcode = Opcode(0x19);
	/// `BYTE`
	pub const BYTE: Opcode = Opcode(0x1a);

	/// `SHA3`
	pub const SHA3: Opcode = Opcode(0x20);

	/// `ADDRESS`
	pub const ADDRESS: Opcode = Opcode(0x30);
	/// `BALANCE`
	pub const BALANCE: Opcode = Opcode(0x31);
	/// `ORIGIN`
	pub const ORIGIN: Opcode = Opcode(0x32);
	/// `CALLER`
	pub const CALLER: Opcode = Opcode(0x33);
	/// `CALLVALUE`
	pub const CALLVALUE: Opcode = Opcode(0x34);
	/// `CALLDATALOAD`
	pub const CALLDATALOAD: Opcode = Opcode(0x35);
	/// `CALLDATASIZE`
	pub const CALLDATASIZE: Opcode = Opcode(0x36);
	/// `CALLDATACOPY`
	pub const CALLDATACOPY: Opcode = Opcode(0x37);
	/// `CODESIZE`
	pub const CODESIZE: Opcode = Opcode(0x38);
	/// `CODECOPY`
	pub const CODECOPY: Opcode = Opcode(0x39);
	/// `GASPRICE`
	pub const GASPRICE: Opcode = Opcode(0x3a);
	/// `EXTCODESIZE`
	pub const EXTCODESIZE: Opcode = Opcode(0x3b);
	/// `EXTCODECOPY`
	pub const EXTCODECOPY: Opcode = Opcode(0x3c);
	/// `RETURNDATASIZE`
	pub const RETURNDATASIZE: Opcode = Opcode(0x3d);
	/// `RETURNDATACOPY`
	pub const RETURNDATACOPY: Opcode = Opcode(0x3e);

	/// `BLOCKHASH`
	pub const BLOCKHASH: Opcode = Opcode(0x40);
	/// `COINBASE`
	pub const COINBASE: Opcode = Opcode(0x41);
	/// `TIMESTAMP`
	pub const TIMESTAMP: Opcode = Opcode(0x42);
	/// `NUMBER`
	pub const NUMBER: Opcode = Opcode(0x43);
	/// `DIFFICULTY`
	pub const DIFFICULTY: Opcode = Opcode(0x44);
	/// `GASLIMIT`
	pub const GASLIMIT: Opcode = Opcode(0x45);

	/// `POP`
	pub const POP: Opcode = Opcode(0x50);
	/// `MLOAD`
	pub const MLOAD: Opcode = Opcode(0x51);
	/// `MSTORE`
	pub const MSTORE: Opcode = Opcode(0x52);
	/// `MSTORE8`
	pub const MSTORE8: Opcode = Opcode(0x53);
	/// `SLOAD`
	pub const SLOAD: Opcode = Opcode(0x54);
	/// `SSTORE`
	pub const SSTORE: Opcode = Opcode(0x55);
	/// `JUMP`
	pub const JUMP: Opcode = Opcode(0x56);
	/// `JUMPI`
	pub const JUMPI: Opcode = Opcode(0x57);
	/// `PC`
	pub const PC: Opcode = Opcode(0x58);
	/// `MSIZE`
	pub const MSIZE: Opcode = Opcode(0x59);
	/// `GAS`
	pub const GAS: Opcode = Opcode(0x5a);
	/// `JUMPDEST`
	pub const JUMPDEST: Opcode = Opcode(0x5b);

	/// `PUSH1`
	pub const PUSH1: Opcode = Opcode(0x60);
	/// `PUSH32`
	pub const PUSH32: Opcode = Opcode(0x7f);
	/// `DUP1`
	pub const DUP1: Opcode = Opcode(0x80);
	/// `DUP16`
	pub const DUP16: Opcode = Opcode(0x8f);
	/// `SWAP1`
	pub const SWAP1: Opcode = Opcode(0x90);
	/// `SWAP16`
	pub const SWAP16: Opcode = Opcode(0x9f);
	/// `LOG0`
	pub const LOG0: Opcode = Opcode(0xa0);
	/// `LOG4`
	pub const LOG4: Opcode = Opcode(0xa4);

	/// `CREATE`
	pub const CREATE: Opcode = Opcode(0xf0);
	/// `CALL`
	pub const CALL: Opcode = Opcode(0xf1);
	/// `CALLCODE`
	pub const CALLCODE: Opcode = Opcode(0xf2);
	/// `RETURN`
	pub const RETURN: Opcode = Opcode(0xf3);
	/// `DELEGATECALL`
	pub const DELEGATECALL: Opcode = Opcode(0xf4);
	/// `STATICCALL`
	pub const STATICCALL: Opcode = Opcode(0xfa);
	/// `REVERT`
	pub const REVERT: Opcode = Opcode(0xfd);
	/// `INVALID`
	pub const INVALID: Opcode = Opcode(0xfe);
	/// `SUICIDE`
	pub const SUICIDE: Opcode = Opcode(0xff);
}

impl Opcode {
	/// The byte value as a table index.
	#[inline]
	pub const fn as_usize(&self) -> usize {
		self.0 as usize
	}

	/// If the opcode is `PUSHn`, the immediate length `n`.
	#[inline]
	pub const fn is_push(&self) -> Option<u8> {
		if self.0 >= 0x60 && self.0 <= 0x7f {
			Some(self.0 - 0x5f)
		} else {
			None
		}
	}

	/// If the opcode is `DUPn`, the duplicated position `n` (1-indexed).
	#[inline]
	pub const fn is_dup(&self) -> Option<u8> {
		if self.0 >= 0x80 && self.0 <= 0x8f {
			Some(self.0 - 0x7f)
		} else {
			None
		}
	}

	/// If the opcode is `SWAPn`, the exchanged position `n` (1-indexed).
	#[inline]
	pub const fn is_swap(&self) -> Option<u8> {
		if self.0 >= 0x90 && self.0 <= 0x9f {
			Some(self.0 - 0x8f)
		} else {
			None
		}
	}

	/// If the opcode is `LOGn`, the topic count `n`.
	#[inline]
	pub const fn is_log(&self) -> Option<u8> {
		if self.0 >= 0xa0 && self.0 <= 0xa4 {
			Some(self.0 - 0xa0)
		} else {
			None
		}
	}

	/// Attributes of the opcode, or `None` for undefined bytes.
	#[inline]
	pub fn info(&self) -> Option<&'static OpcodeInfo> {
		TABLE[self.as_usize()].as_ref()
	}

	/// Mnemonic, used in traces and diagnostics.
	pub fn name(&self) -> &'static str {
		match *self {
			Opcode::STOP => "STOP",
			Opcode::ADD => "ADD",
			Opcode::MUL => "MUL",
			Opcode::SUB => "SUB",
			Opcode::DIV => "DIV",
			Opcode::SDIV => "SDIV",
			Opcode::MOD => "MOD",
			Opcode::SMOD => "SMOD",
			Opcode::ADDMOD => "ADDMOD",
			Opcode::MULMOD => "MULMOD",
			Opcode::EXP => "EXP",
			Opcode::SIGNEXTEND => "SIGNEXTEND",
			Opcode::LT => "LT",
			Opcode::GT => "GT",
			Opcode::SLT => "SLT",
			Opcode::SGT => "SGT",
			Opcode::EQ => "EQ",
			Opcode::ISZERO => "ISZERO",
			Opcode::AND => "AND",
			Opcode::OR => "OR",
			Opcode::XOR => "XOR",
			Opcode::NOT => "NOT",
			Opcode::BYTE => "BYTE",
			Opcode::SHA3 => "SHA3",
			Opcode::ADDRESS => "ADDRESS",
			Opcode::BALANCE => "BALANCE",
			Opcode::ORIGIN => "ORIGIN",
			Opcode::CALLER => "CALLER",
			Opcode::CALLVALUE => "CALLVALUE",
			Opcode::CALLDATALOAD => "CALLDATALOAD",
			Opcode::CALLDATASIZE => "CALLDATASIZE",
			Opcode::CALLDATACOPY => "CALLDATACOPY",
			Opcode::CODESIZE => "CODESIZE",
			Opcode::CODECOPY => "CODECOPY",
			Opcode::GASPRICE => "GASPRICE",
			Opcode::EXTCODESIZE => "EXTCODESIZE",
			Opcode::EXTCODECOPY => "EXTCODECOPY",
			Opcode::RETURNDATASIZE => "RETURNDATASIZE",
			Opcode::RETURNDATACOPY => "RETURNDATACOPY",
			Opcode::BLOCKHASH => "BLOCKHASH",
			Opcode::COINBASE => "COINBASE",
			Opcode::TIMESTAMP => "TIMESTAMP",
			Opcode::NUMBER => "NUMBER",
			Opcode::DIFFICULTY => "DIFFICULTY",
			Opcode::GASLIMIT => "GASLIMIT",
			Opcode::POP => "POP",
			Opcode::MLOAD => "MLOAD",
			Opcode::MSTORE => "MSTORE",
			Opcode::MSTORE8 => "MSTORE8",
			Opcode::SLOAD => "SLOAD",
			Opcode::SSTORE => "SSTORE",
			Opcode::JUMP => "JUMP",
			Opcode::JUMPI => "JUMPI",
			Opcode::PC => "PC",
			Opcode::MSIZE => "MSIZE",
			Opcode::GAS => "GAS",
			Opcode::JUMPDEST => "JUMPDEST",
			Opcode::CREATE => "CREATE",
			Opcode::CALL => "CALL",
			Opcode::CALLCODE => "CALLCODE",
			Opcode::RETURN => "RETURN",
			Opcode::DELEGATECALL => "DELEGATECALL",
			Opcode::STATICCALL => "STATICCALL",
			Opcode::REVERT => "REVERT",
			Opcode::SUICIDE => "SUICIDE",
			_ => match (self.is_push(), self.is_dup(), self.is_swap(), self.is_log()) {
				(Some(_), _, _, _) => "PUSH",
				(_, Some(_), _, _) => "DUP",
				(_, _, Some(_), _) => "SWAP",
				(_, _, _, Some(_)) => "LOG",
				_ => "INVALID",
			},
		}
	}
}

/// Static attributes of an opcode: stack arity, base cost tier and the
/// call/state flags consulted by pricing and the static-mode check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OpcodeInfo {
	/// Number of stack items consumed.
	pub inputs: usize,
	/// Number of stack items produced.
	pub outputs: usize,
	/// Base cost tier.
	pub tier: Tier,
	/// The opcode carries a transfer value (CALL, CALLCODE).
	pub has_value: bool,
	/// The opcode runs in the caller's value context (DELEGATECALL, STATICCALL).
	pub is_stateless: bool,
	/// The opcode writes persistent state, emits logs or deletes accounts.
	pub mutates_state: bool,
}

const fn def(inputs: usize, outputs: usize, tier: Tier) -> Option<OpcodeInfo> {
	Some(OpcodeInfo {
		inputs,
		outputs,
		tier,
		has_value: false,
		is_stateless: false,
		mutates_state: false,
	})
}

const fn def_mutating(inputs: usize, outputs: usize, tier: Tier) -> Option<OpcodeInfo> {
	Some(OpcodeInfo {
		inputs,
		outputs,
		tier,
		has_value: false,
		is_stateless: false,
		mutates_state: true,
	})
}

const fn def_call(inputs: usize, has_value: bool, is_stateless: bool) -> Option<OpcodeInfo> {
	Some(OpcodeInfo {
		inputs,
		outputs: 1,
		tier: Tier::Special,
		has_value,
		is_stateless,
		mutates_state: false,
	})
}

static TABLE: [Option<OpcodeInfo>; 256] = {
	let mut table: [Option<OpcodeInfo>; 256] = [None; 256];

	table[Opcode::STOP.as_usize()] = def(0, 0, Tier::Zero);
	table[Opcode::ADD.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::MUL.as_usize()] = def(2, 1, Tier::Low);
	table[Opcode::SUB.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::DIV.as_usize()] = def(2, 1, Tier::Low);
	table[Opcode::SDIV.as_usize()] = def(2, 1, Tier::Low);
	table[Opcode::MOD.as_usize()] = def(2, 1, Tier::Low);
	table[Opcode::SMOD.as_usize()] = def(2, 1, Tier::Low);
	table[Opcode::ADDMOD.as_usize()] = def(3, 1, Tier::Mid);
	table[Opcode::MULMOD.as_usize()] = def(3, 1, Tier::Mid);
	table[Opcode::EXP.as_usize()] = def(2, 1, Tier::Special);
	table[Opcode::SIGNEXTEND.as_usize()] = def(2, 1, Tier::Low);

	table[Opcode::LT.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::GT.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::SLT.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::SGT.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::EQ.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::ISZERO.as_usize()] = def(1, 1, Tier::VeryLow);
	table[Opcode::AND.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::OR.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::XOR.as_usize()] = def(2, 1, Tier::VeryLow);
	table[Opcode::NOT.as_usize()] = def(1, 1, Tier::VeryLow);
	table[Opcode::BYTE.as_usize()] = def(2, 1, Tier::VeryLow);

	table[Opcode::SHA3.as_usize()] = def(2, 1, Tier::Special);

	table[Opcode::ADDRESS.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::BALANCE.as_usize()] = def(1, 1, Tier::Ext);
	table[Opcode::ORIGIN.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::CALLER.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::CALLVALUE.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::CALLDATALOAD.as_usize()] = def(1, 1, Tier::VeryLow);
	table[Opcode::CALLDATASIZE.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::CALLDATACOPY.as_usize()] = def(3, 0, Tier::VeryLow);
	table[Opcode::CODESIZE.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::CODECOPY.as_usize()] = def(3, 0, Tier::VeryLow);
	table[Opcode::GASPRICE.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::EXTCODESIZE.as_usize()] = def(1, 1, Tier::Ext);
	table[Opcode::EXTCODECOPY.as_usize()] = def(4, 0, Tier::Ext);
	table[Opcode::RETURNDATASIZE.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::RETURNDATACOPY.as_usize()] = def(3, 0, Tier::VeryLow);

	table[Opcode::BLOCKHASH.as_usize()] = def(1, 1, Tier::Ext);
	table[Opcode::COINBASE.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::TIMESTAMP.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::NUMBER.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::DIFFICULTY.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::GASLIMIT.as_usize()] = def(0, 1, Tier::Base);

	table[Opcode::POP.as_usize()] = def(1, 0, Tier::Base);
	table[Opcode::MLOAD.as_usize()] = def(1, 1, Tier::VeryLow);
	table[Opcode::MSTORE.as_usize()] = def(2, 0, Tier::VeryLow);
	table[Opcode::MSTORE8.as_usize()] = def(2, 0, Tier::VeryLow);
	table[Opcode::SLOAD.as_usize()] = def(1, 1, Tier::Special);
	table[Opcode::SSTORE.as_usize()] = def_mutating(2, 0, Tier::Special);
	table[Opcode::JUMP.as_usize()] = def(1, 0, Tier::Mid);
	table[Opcode::JUMPI.as_usize()] = def(2, 0, Tier::High);
	table[Opcode::PC.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::MSIZE.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::GAS.as_usize()] = def(0, 1, Tier::Base);
	table[Opcode::JUMPDEST.as_usize()] = def(0, 0, Tier::Special);

	let mut n = 0;
	while n < 32 {
		// PUSH1..PUSH32
		table[0x60 + n] = def(0, 1, Tier::VeryLow);
		n += 1;
	}
	let mut n = 0;
	while n < 16 {
		// DUP1..DUP16 and SWAP1..SWAP16
		table[0x80 + n] = def(n + 1, n + 2, Tier::VeryLow);
		table[0x90 + n] = def(n + 2, n + 2, Tier::VeryLow);
		n += 1;
	}
	let mut n = 0;
	while n < 5 {
		// LOG0..LOG4
		table[0xa0 + n] = def_mutating(n + 2, 0, Tier::Special);
		n += 1;
	}

	table[Opcode::CREATE.as_usize()] = def_mutating(3, 1, Tier::Special);
	table[Opcode::CALL.as_usize()] = def_call(7, true, false);
	table[Opcode::CALLCODE.as_usize()] = def_call(7, true, false);
	table[Opcode::RETURN.as_usize()] = def(2, 0, Tier::Zero);
	table[Opcode::DELEGATECALL.as_usize()] = def_call(6, false, true);
	table[Opcode::STATICCALL.as_usize()] = def_call(6, false, true);
	table[Opcode::REVERT.as_usize()] = def(2, 0, Tier::Zero);
	table[Opcode::INVALID.as_usize()] = def(0, 0, Tier::Zero);
	table[Opcode::SUICIDE.as_usize()] = def_mutating(1, 0, Tier::Zero);

	table
};

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn table_covers_the_instruction_set() {
		assert_eq!(Opcode::ADD.info().unwrap().inputs, 2);
		assert_eq!(Opcode::ADDMOD.info().unwrap().inputs, 3);
		assert_eq!(Opcode::CALL.info().unwrap().inputs, 7);
		assert_eq!(Opcode::DELEGATECALL.info().unwrap().inputs, 6);
		assert_eq!(Opcode::EXTCODECOPY.info().unwrap().inputs, 4);
		assert!(Opcode(0x21).info().is_none());
		assert!(Opcode(0x5c).info().is_none());
	}

	#[test]
	fn push_dup_swap_log_ranges() {
		assert_eq!(Opcode::PUSH1.is_push(), Some(1));
		assert_eq!(Opcode::PUSH32.is_push(), Some(32));
		assert_eq!(Opcode(0x5f).is_push(), None);
		assert_eq!(Opcode::DUP1.is_dup(), Some(1));
		assert_eq!(Opcode::DUP16.is_dup(), Some(16));
		assert_eq!(Opcode::SWAP1.is_swap(), Some(1));
		assert_eq!(Opcode::LOG0.is_log(), Some(0));
		assert_eq!(Opcode::LOG4.is_log(), Some(4));

		// DUPn consumes n and leaves n + 1; SWAPn touches n + 1 values.
		assert_eq!(Opcode::DUP16.info().unwrap().inputs, 16);
		assert_eq!(Opcode::DUP16.info().unwrap().outputs, 17);
		assert_eq!(Opcode::SWAP16.info().unwrap().inputs, 17);
	}

	#[test]
	fn call_flags() {
		assert!(Opcode::CALL.info().unwrap().has_value);
		assert!(Opcode::CALLCODE.info().unwrap().has_value);
		assert!(!Opcode::DELEGATECALL.info().unwrap().has_value);
		assert!(Opcode::DELEGATECALL.info().unwrap().is_stateless);
		assert!(Opcode::STATICCALL.info().unwrap().is_stateless);
		assert!(Opcode::SSTORE.info().unwrap().mutates_state);
		assert!(Opcode::SUICIDE.info().unwrap().mutates_state);
	}
}
