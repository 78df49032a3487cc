use std::collections::BTreeMap;
use std::rc::Rc;

use primitive_types::{H160, H256, U256};

use dropvm::tracing::{Event, EventListener};
use dropvm::{
	ApplyBackend, Backend, Config, Context, Environment, Executor, ExitError, ExitReason,
	ExitSucceed, Frame, TransactionContext,
};

#[derive(Clone, Debug, Default)]
struct MockBackend {
	balances: BTreeMap<H160, U256>,
	codes: BTreeMap<H160, Vec<u8>>,
	storages: BTreeMap<(H160, H256), H256>,
	deleted: Vec<(H160, H160)>,
}

impl Backend for MockBackend {
	fn balance(&self, address: H160) -> U256 {
		self.balances.get(&address).copied().unwrap_or_default()
	}

	fn code(&self, address: H160) -> Vec<u8> {
		self.codes.get(&address).cloned().unwrap_or_default()
	}

	fn storage(&self, address: H160, key: H256) -> H256 {
		self.storages
			.get(&(address, key))
			.copied()
			.unwrap_or_default()
	}

	fn exists(&self, address: H160) -> bool {
		self.balances.contains_key(&address) || self.codes.contains_key(&address)
	}
}

impl ApplyBackend for MockBackend {
	fn storage_save(&mut self, address: H160, key: H256, value: H256) {
		self.storages.insert((address, key), value);
	}

	fn create_account(&mut self, address: H160, code: Vec<u8>) {
		self.codes.insert(address, code);
	}

	fn suicide(&mut self, address: H160, beneficiary: H160) {
		self.deleted.push((address, beneficiary));
	}
}

struct MockEnvironment;

impl Environment for MockEnvironment {
	fn block_hash(&self, _number: U256) -> H256 {
		H256::zero()
	}

	fn block_coinbase(&self) -> H160 {
		H160::repeat_byte(0xc0)
	}

	fn block_timestamp(&self) -> U256 {
		U256::from(1_700_000_000u64)
	}

	fn block_number(&self) -> U256 {
		U256::from(12345)
	}

	fn block_difficulty(&self) -> U256 {
		U256::from(2500)
	}

	fn block_drop_limit(&self) -> U256 {
		U256::from(10_000_000)
	}
}

fn addr(n: u8) -> H160 {
	H160::repeat_byte(n)
}

fn tx() -> TransactionContext {
	TransactionContext {
		origin: addr(0xee),
		drop_price: U256::one(),
	}
}

const CALLER: u8 = 0x11;
const CALLEE: u8 = 0x22;

/// PUSH the seven CALL-family arguments for a zero-value call with the
/// given in/out windows, the target at `CALLEE`, and 0xffff drops.
fn call_setup(op: u8, out_len: u8, in_len: u8) -> Vec<u8> {
	let mut code = Vec::new();
	code.extend([0x60, out_len, 0x60, 0x00, 0x60, in_len, 0x60, 0x00]);
	if op == 0xf1 || op == 0xf2 {
		code.extend([0x60, 0x00]);
	}
	code.push(0x73);
	code.extend(addr(CALLEE).as_bytes());
	code.extend([0x61, 0xff, 0xff, op]);
	code
}

fn backends(caller_code: Vec<u8>, callee_code: &str) -> MockBackend {
	let mut backend = MockBackend::default();
	backend.codes.insert(addr(CALLER), caller_code);
	backend
		.codes
		.insert(addr(CALLEE), hex::decode(callee_code).unwrap());
	backend
}

#[test]
fn call_returns_data_to_caller() {
	// Callee returns the word 42; caller exposes its out window.
	let mut caller = call_setup(0xf1, 0x20, 0x00);
	caller.extend(hex::decode("60206000f3").unwrap());
	let backend = backends(caller, "602a60005260206000f3");

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert_eq!(outcome.reason, ExitReason::Succeed(ExitSucceed::Returned));
	assert_eq!(outcome.return_value[31], 42);

	let changes = executor.deconstruct();
	assert!(changes.touched.contains(&addr(CALLEE)));
	assert!(changes.touched.contains(&addr(CALLER)));
}

#[test]
fn reverting_child_discards_writes_and_reports_failure() {
	// Callee stores 7 at slot 1, then reverts.
	let mut caller = call_setup(0xf1, 0x00, 0x00);
	// Store the success flag and return it.
	caller.extend(hex::decode("60005260206000f3").unwrap());
	let backend = backends(caller, "6007600155600560005260206000fd");

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert!(outcome.reason.is_succeed());
	// The child reverted, so the caller saw a zero flag.
	assert!(outcome.return_value.iter().all(|b| *b == 0));

	let changes = executor.deconstruct();
	assert!(changes.storages.is_empty());
}

#[test]
fn returndata_buffer_tracks_the_last_call() {
	// Call with an empty out window, then pull the data over with
	// RETURNDATACOPY and return it.
	let mut caller = call_setup(0xf1, 0x00, 0x00);
	// POP flag; RETURNDATACOPY(0, 0, 32); RETURN(0, 32)
	caller.extend(hex::decode("506020600060003e60206000f3").unwrap());
	let backend = backends(caller, "602a60005260206000f3");

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert!(outcome.reason.is_succeed());
	assert_eq!(outcome.return_value[31], 42);
}

#[test]
fn returndatacopy_past_the_buffer_fails() {
	// The callee returns 32 bytes; asking for 64 is out of bounds.
	let mut caller = call_setup(0xf1, 0x00, 0x00);
	caller.extend(hex::decode("506040600060003e").unwrap());
	let backend = backends(caller, "602a60005260206000f3");

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert_eq!(outcome.reason, ExitReason::Error(ExitError::OutOfReturndata));
}

#[test]
fn delegatecall_keeps_storage_and_caller_context() {
	// Callee stores its observed CALLER at slot 1.
	let mut caller = call_setup(0xf4, 0x00, 0x00);
	caller.push(0x00);
	let backend = backends(caller, "3360015500");

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);
	assert!(outcome.reason.is_succeed());

	let changes = executor.deconstruct();
	// The write landed in the caller's storage, not the callee's, and
	// the callee observed the outer caller.
	assert_eq!(
		changes.storages.get(&(addr(CALLER), H256::from_low_u64_be(1))),
		Some(&H256::from(addr(0xee)))
	);
	assert!(changes
		.storages
		.keys()
		.all(|(owner, _)| *owner == addr(CALLER)));
	// Stateless call: the target is not a touched account.
	assert!(!changes.touched.contains(&addr(CALLEE)));
}

#[test]
fn staticcall_blocks_child_mutation() {
	let mut caller = call_setup(0xfa, 0x00, 0x00);
	caller.extend(hex::decode("60005260206000f3").unwrap());
	let backend = backends(caller, "602a600155");

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert!(outcome.reason.is_succeed());
	assert!(outcome.return_value.iter().all(|b| *b == 0));
	assert!(executor.deconstruct().storages.is_empty());
}

#[test]
fn static_call_with_value_is_a_violation() {
	// CALL with value 1 inside a static frame.
	let mut code = Vec::new();
	code.extend([0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x01]);
	code.push(0x73);
	code.extend(addr(CALLEE).as_bytes());
	code.extend([0x61, 0xff, 0xff, 0xf1]);

	let backend = MockBackend::default();
	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());

	let mut frame = Frame::new(
		Rc::new(code),
		Rc::new(Vec::new()),
		Context {
			address: addr(CALLER),
			caller: addr(0xee),
			apparent_value: U256::zero(),
		},
		1_000_000,
		0,
		true,
		&config,
	);

	let reason = executor.execute(&mut frame);
	assert_eq!(reason, ExitReason::Error(ExitError::StaticModeViolation));
	assert_eq!(frame.dropometer.remaining(), 0);
}

#[test]
fn value_call_to_empty_code_succeeds_with_stipend() {
	// CALL with value 1 to an account with no code.
	let mut caller = Vec::new();
	caller.extend([0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x01]);
	caller.push(0x73);
	caller.extend(addr(CALLEE).as_bytes());
	caller.extend([0x61, 0xff, 0xff, 0xf1]);
	// Store the flag and return it.
	caller.extend(hex::decode("60005260206000f3").unwrap());

	let mut backend = MockBackend::default();
	backend.codes.insert(addr(CALLER), caller);

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert!(outcome.reason.is_succeed());
	assert_eq!(outcome.return_value[31], 1);

	// Everything forwarded came back, unused stipend included, so the
	// transfer nets out below the value surcharge.
	// 7 pushes (21) + call base 25000 + value surcharge 9000 − stipend
	// 2300 + flag store and return (15).
	assert_eq!(outcome.drops_used, 21 + 25_000 + 9_000 - 2_300 + 15);
}

#[test]
fn depth_limit_skips_the_sub_call() {
	let mut caller = call_setup(0xf1, 0x00, 0x00);
	caller.extend(hex::decode("60005260206000f3").unwrap());
	let backend = backends(caller, "602a60005260206000f3");

	let environment = MockEnvironment;
	let config = Config {
		max_call_depth: 0,
		..Config::default()
	};
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert!(outcome.reason.is_succeed());
	assert!(outcome.return_value.iter().all(|b| *b == 0));
}

#[test]
fn call_forwards_the_input_window() {
	// Callee echoes CALLDATASIZE; caller sends a 5-byte window.
	let mut caller = call_setup(0xf1, 0x20, 0x05);
	caller.extend(hex::decode("60206000f3").unwrap());
	let backend = backends(caller, "3660005260206000f3");

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert!(outcome.reason.is_succeed());
	assert_eq!(outcome.return_value[31], 5);
}

#[test]
fn suicide_schedules_deletion_and_touches_the_heir() {
	let mut code = vec![0x73];
	code.extend(addr(0x44).as_bytes());
	code.push(0xff);

	let mut backend = MockBackend::default();
	backend.codes.insert(addr(CALLER), code);
	backend.balances.insert(addr(CALLER), U256::from(1000));

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);

	assert_eq!(outcome.reason, ExitReason::Succeed(ExitSucceed::Suicided));
	assert!(outcome.return_value.is_empty());

	let mut committed = backend.clone();
	let changes = executor.apply(&mut committed);
	assert_eq!(changes.deletes, vec![(addr(CALLER), addr(0x44))]);
	assert!(changes.touched.contains(&addr(0x44)));
	assert_eq!(committed.deleted, vec![(addr(CALLER), addr(0x44))]);
}

#[test]
fn log_records_address_topics_and_data() {
	// MSTORE8(31, 0xaa); LOG1 over memory[0..32] with topic 7.
	let backend = {
		let mut backend = MockBackend::default();
		backend.codes.insert(
			addr(CALLER),
			hex::decode("60aa601f53600760206000a1").unwrap(),
		);
		backend
	};

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);
	assert!(outcome.reason.is_succeed());

	let changes = executor.deconstruct();
	assert_eq!(changes.logs.len(), 1);
	let log = &changes.logs[0];
	assert_eq!(log.address, addr(CALLER));
	assert_eq!(log.topics, vec![H256::from_low_u64_be(7)]);
	assert_eq!(log.data.len(), 32);
	assert_eq!(log.data[31], 0xaa);

	// Base + one topic + 32 data bytes, memory already paid by MSTORE8.
	assert_eq!(outcome.drops_used, 12 + 9 + 375 + 375 + 8 * 32);
}

#[test]
fn log_in_static_frame_is_a_violation() {
	let backend = MockBackend::default();
	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());

	// PUSH1 0, PUSH1 0, LOG0
	let code = hex::decode("60006000a0").unwrap();
	let mut frame = Frame::new(
		Rc::new(code),
		Rc::new(Vec::new()),
		Context {
			address: addr(CALLER),
			caller: addr(0xee),
			apparent_value: U256::zero(),
		},
		100_000,
		0,
		true,
		&config,
	);

	let reason = executor.execute(&mut frame);
	assert_eq!(reason, ExitReason::Error(ExitError::StaticModeViolation));
}

#[test]
fn create_deploys_returned_code() {
	// Initcode returning the single byte 0xfe:
	// PUSH1 fe, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN
	let init = hex::decode("60fe60005360016000f3").unwrap();
	assert_eq!(init.len(), 10);

	// Write the initcode into memory word 0 (right-aligned at 22), then
	// CREATE(0, 22, 10) and store the new address at slot 2.
	let mut caller = vec![0x69];
	caller.extend(&init);
	caller.extend(hex::decode("600052600a60166000f0600255").unwrap());

	let mut backend = MockBackend::default();
	backend.codes.insert(addr(CALLER), caller);

	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());
	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 1_000_000);
	assert!(outcome.reason.is_succeed());

	let changes = executor.deconstruct();
	assert_eq!(changes.codes.len(), 1);
	let (created, code) = changes.codes.iter().next().unwrap();
	assert_eq!(code, &vec![0xfe]);

	// The address pushed after CREATE matches the deployed account.
	let stored = changes
		.storages
		.get(&(addr(CALLER), H256::from_low_u64_be(2)))
		.unwrap();
	assert_eq!(*stored, H256::from(*created));
	assert!(changes.touched.contains(created));
}

#[test]
fn transact_create_deploys_and_reports_the_address() {
	// Initcode returning the single byte 0xfe.
	let init = hex::decode("60fe60005360016000f3").unwrap();

	let backend = MockBackend::default();
	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());

	let outcome = executor.transact_create(addr(0xee), U256::zero(), init, 1_000_000);
	assert!(outcome.reason.is_succeed());
	let created = outcome.created.unwrap();

	let mut committed = backend.clone();
	let changes = executor.apply(&mut committed);
	assert_eq!(changes.codes.get(&created), Some(&vec![0xfe]));
	assert_eq!(committed.codes.get(&created), Some(&vec![0xfe]));
}

#[test]
fn create_in_static_frame_is_a_violation() {
	let backend = MockBackend::default();
	let environment = MockEnvironment;
	let config = Config::default();
	let mut executor = Executor::new(&backend, &environment, &(), &config, tx());

	// PUSH1 0, PUSH1 0, PUSH1 0, CREATE
	let code = hex::decode("600060006000f0").unwrap();
	let mut frame = Frame::new(
		Rc::new(code),
		Rc::new(Vec::new()),
		Context {
			address: addr(CALLER),
			caller: addr(0xee),
			apparent_value: U256::zero(),
		},
		100_000,
		0,
		true,
		&config,
	);

	let reason = executor.execute(&mut frame);
	assert_eq!(reason, ExitReason::Error(ExitError::StaticModeViolation));
}

#[derive(Default)]
struct CountingListener {
	steps: usize,
	charges: u64,
	exits: usize,
}

impl EventListener for CountingListener {
	fn event(&mut self, event: Event<'_>) {
		match event {
			Event::Step { .. } => self.steps += 1,
			Event::Charge { cost, .. } => self.charges += cost,
			Event::Exit { .. } => self.exits += 1,
			Event::Refund { .. } => (),
		}
	}
}

#[test]
fn listener_observes_steps_and_charges() {
	let mut backend = MockBackend::default();
	backend.codes.insert(
		addr(CALLER),
		hex::decode("600260030160005260206000f3").unwrap(),
	);

	let environment = MockEnvironment;
	let config = Config::default();
	let mut listener = CountingListener::default();
	let mut executor =
		Executor::new(&backend, &environment, &(), &config, tx()).with_listener(&mut listener);

	let outcome =
		executor.transact_call(addr(0xee), addr(CALLER), U256::zero(), Vec::new(), 100_000);
	assert!(outcome.reason.is_succeed());
	drop(executor);

	assert_eq!(listener.steps, 8);
	assert_eq!(listener.charges, outcome.drops_used);
	assert_eq!(listener.exits, 1);
}
