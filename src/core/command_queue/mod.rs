//=========================================================================
// Command Queue
//=========================================================================
//
// Deferred call buffer for render work.
//
// Architecture:
//   record.rs  byte layout of one command + monomorphized dispatchers
//   queue.rs   the arena: submit / execute / discard, phase tracking
//
// Pattern: submit (any call site) → execute (frame boundary) → reuse
//
//=========================================================================

//=== Module Declarations =================================================

mod queue;
mod record;

//=== Public API ==========================================================

pub use queue::{CommandQueue, QueuePhase, QueueStats};
pub use record::{record_size, RECORD_HEADER_SIZE};
