use primitive_types::{U256, U512};

use crate::utils::{u512_low, I256};

#[inline]
pub fn div(op1: U256, op2: U256) -> U256 {
	op1.checked_div(op2).unwrap_or_default()
}

#[inline]
pub fn sdiv(op1: U256, op2: U256) -> U256 {
	let op1: I256 = op1.into();
	let op2: I256 = op2.into();
	(op1 / op2).into()
}

#[inline]
pub fn rem(op1: U256, op2: U256) -> U256 {
	op1.checked_rem(op2).unwrap_or_default()
}

#[inline]
pub fn srem(op1: U256, op2: U256) -> U256 {
	let op1: I256 = op1.into();
	let op2: I256 = op2.into();
	(op1 % op2).into()
}

#[inline]
pub fn addmod(op1: U256, op2: U256, op3: U256) -> U256 {
	if op3 == U256::zero() {
		return U256::zero();
	}

	let sum = U512::from(op1) + U512::from(op2);
	u512_low(sum % U512::from(op3))
}

#[inline]
pub fn mulmod(op1: U256, op2: U256, op3: U256) -> U256 {
	if op3 == U256::zero() {
		return U256::zero();
	}

	u512_low(op1.full_mul(op2) % U512::from(op3))
}

#[inline]
pub fn exp(op1: U256, op2: U256) -> U256 {
	op1.overflowing_pow(op2).0
}

/// Sign-extend `op2` from bit `8 * op1 + 7`. Words indexed at 32 or
/// above come back unchanged.
#[inline]
pub fn signextend(op1: U256, op2: U256) -> U256 {
	if op1 >= U256::from(32) {
		return op2;
	}

	let bit = op1.as_usize() * 8 + 7;
	let mask = if bit == 255 {
		U256::MAX
	} else {
		(U256::one() << (bit + 1)) - U256::one()
	};

	if op2.bit(bit) {
		op2 | !mask
	} else {
		op2 & mask
	}
}
