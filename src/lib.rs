//! Drop-metered virtual machine for contract bytecode.
//!
//! The machine interprets a linear byte stream of opcodes against a
//! 256-bit word stack, byte-addressable volatile memory and persistent
//! word-keyed storage, charging every step in drops before any side
//! effect happens. CALL/CREATE opcodes run nested frames synchronously
//! to completion; a reverting or failing frame discards its buffered
//! state writes atomically.
//!
//! World state, block information and precompiled contracts are
//! consumed through injected traits; the crate keeps no process-global
//! state.

// #![deny(warnings)]
#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod backend;
mod dropometer;
mod error;
#[macro_use]
mod eval;
mod executor;
mod memory;
mod opcode;
mod runtime;
mod schedule;
mod stack;
pub mod tracing;
pub mod utils;
mod valids;

pub use crate::backend::{
	ApplyBackend, Backend, ChangeSet, Environment, Log, MergeStrategy, OverlayedState,
	Precompile, PrecompileOutput, PrecompileSet,
};
pub use crate::dropometer::{mem_needed, memory_drop, Dropometer, MAX_MEM_NEED};
pub use crate::error::{ExitError, ExitFatal, ExitReason, ExitRevert, ExitSucceed};
pub use crate::eval::Control;
pub use crate::executor::{ExecutionOutcome, Executor};
pub use crate::memory::Memory;
pub use crate::opcode::{Opcode, OpcodeInfo};
pub use crate::runtime::{CallScheme, Context, Frame, Machine, TransactionContext};
pub use crate::schedule::{Config, Schedule, Tier};
pub use crate::stack::Stack;
pub use crate::valids::Valids;
