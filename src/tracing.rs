//! Injected step tracing.
//!
//! The listener is handed to the executor by the host; the core keeps no
//! process-global tracing state. Every event borrows from the live frame,
//! so listeners copy out whatever they want to keep.

use crate::{ExitReason, Opcode, Stack};

/// Events surfaced to a listener while a program runs.
#[derive(Debug)]
pub enum Event<'a> {
	/// An opcode is about to execute; its cost is already charged.
	Step {
		/// Call depth of the frame.
		depth: usize,
		/// Program counter.
		position: usize,
		/// Decoded opcode.
		opcode: Opcode,
		/// Drops left after this step's charge.
		drops_remaining: u64,
		/// Stack snapshot.
		stack: &'a Stack,
		/// Effective memory size in bytes.
		memory_size: usize,
		/// Mnemonic hint.
		hint: &'a str,
	},
	/// A step charge was taken.
	Charge {
		/// Decoded opcode.
		opcode: Opcode,
		/// Drops charged, including surcharges and forwarded call drops.
		cost: u64,
		/// Drops left after the charge.
		drops_remaining: u64,
	},
	/// The future-refund counter grew.
	Refund {
		/// Credited amount.
		amount: u64,
		/// New counter value.
		total: u64,
	},
	/// A frame finished.
	Exit {
		/// Call depth of the frame.
		depth: usize,
		/// Why it finished.
		reason: &'a ExitReason,
	},
}

/// Receiver for [`Event`]s, injected into the executor.
pub trait EventListener {
	/// Handle one event.
	fn event(&mut self, event: Event<'_>);
}
