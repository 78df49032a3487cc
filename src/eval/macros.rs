macro_rules! try_or_fail {
	( $e:expr ) => {
		match $e {
			Ok(v) => v,
			Err(e) => return Control::Exit(e.into()),
		}
	};
}

macro_rules! pop_u256 {
	( $frame:expr, $( $x:ident ),* ) => (
		$(
			let $x = match $frame.machine.stack.pop() {
				Ok(value) => value,
				Err(e) => return Control::Exit(e.into()),
			};
		)*
	);
}

macro_rules! push_u256 {
	( $frame:expr, $( $x:expr ),* ) => (
		$(
			match $frame.machine.stack.push($x) {
				Ok(()) => (),
				Err(e) => return Control::Exit(e.into()),
			}
		)*
	)
}

macro_rules! pop_address {
	( $frame:expr, $( $x:ident ),* ) => (
		$(
			let $x = match $frame.machine.stack.pop() {
				Ok(value) => $crate::utils::u256_to_address(value),
				Err(e) => return Control::Exit(e.into()),
			};
		)*
	);
}

macro_rules! as_usize_or_fail {
	( $v:expr ) => {
		as_usize_or_fail!($v, $crate::ExitError::MemoryOverflow)
	};

	( $v:expr, $reason:expr ) => {{
		if $v > U256::from(usize::MAX) {
			return Control::Exit($reason.into());
		}
		$v.as_usize()
	}};
}

macro_rules! op1_u256_fn {
	( $frame:expr, $op:path ) => {{
		pop_u256!($frame, op1);
		let ret = $op(op1);
		push_u256!($frame, ret);

		Control::Continue(1)
	}};
}

macro_rules! op2_u256_fn {
	( $frame:expr, $op:path ) => {{
		pop_u256!($frame, op1, op2);
		let ret = $op(op1, op2);
		push_u256!($frame, ret);

		Control::Continue(1)
	}};
}

macro_rules! op2_u256_tuple {
	( $frame:expr, $op:ident ) => {{
		pop_u256!($frame, op1, op2);
		let (ret, _) = op1.$op(op2);
		push_u256!($frame, ret);

		Control::Continue(1)
	}};
}

macro_rules! op2_u256_bool {
	( $frame:expr, $op:ident ) => {{
		pop_u256!($frame, op1, op2);
		let ret = if op1.$op(&op2) {
			U256::one()
		} else {
			U256::zero()
		};
		push_u256!($frame, ret);

		Control::Continue(1)
	}};
}

macro_rules! op2_u256 {
	( $frame:expr, $op:ident ) => {{
		pop_u256!($frame, op1, op2);
		let ret = op1.$op(op2);
		push_u256!($frame, ret);

		Control::Continue(1)
	}};
}

macro_rules! op3_u256_fn {
	( $frame:expr, $op:path ) => {{
		pop_u256!($frame, op1, op2, op3);
		let ret = $op(op1, op2, op3);
		push_u256!($frame, ret);

		Control::Continue(1)
	}};
}
