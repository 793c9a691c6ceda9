//=========================================================================
// Command Records
//=========================================================================
//
// Byte layout of one queued command inside the arena:
//
// ```text
//   ┌──────────────────┬──────────────────┬─────────────────────────┐
//   │ dispatcher (fn)  │ payload len      │ payload (closure bytes) │
//   │ size_of::<fn>()  │ size_of::<usize> │ size_of::<F>()          │
//   └──────────────────┴──────────────────┴─────────────────────────┘
// ```
//
// Records are packed back to back with no padding, so every field is
// written and read unaligned. The dispatcher is monomorphized per closure
// type and is the only code that knows how to reinterpret the payload.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::mem::size_of;
use std::ptr;

//=== Dispatcher ==========================================================

/// What a dispatcher does with the payload it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Invoke the closure, consuming it.
    Run,

    /// Drop the closure without invoking it.
    Discard,
}

/// Type-erased entry point stored in each record header.
///
/// # Safety
///
/// `payload` must point at a closure written by [`write_record`] with the
/// same monomorphized dispatcher, and the record must not have been
/// dispatched before. The payload is moved out; its bytes are dead after
/// the call.
pub(crate) type Dispatcher = unsafe fn(payload: *mut u8, action: Dispatch);

/// Bytes taken by a record header: dispatcher pointer plus payload length.
pub const RECORD_HEADER_SIZE: usize = size_of::<Dispatcher>() + size_of::<usize>();

/// Total arena bytes taken by a command of type `F`.
pub const fn record_size<F>() -> usize {
    RECORD_HEADER_SIZE + size_of::<F>()
}

unsafe fn dispatch<F: FnOnce()>(payload: *mut u8, action: Dispatch) {
    let command = ptr::read_unaligned(payload.cast::<F>());
    match action {
        Dispatch::Run => command(),
        Dispatch::Discard => drop(command),
    }
}

//=== Encoding ============================================================

/// Writes a complete record for `command` at `at`.
///
/// # Safety
///
/// `at` must be valid for writes of [`record_size::<F>()`] bytes.
pub(crate) unsafe fn write_record<F>(at: *mut u8, command: F)
where
    F: FnOnce() + Send + 'static,
{
    let dispatcher: Dispatcher = dispatch::<F>;
    ptr::write_unaligned(at.cast::<Dispatcher>(), dispatcher);
    ptr::write_unaligned(at.add(size_of::<Dispatcher>()).cast::<usize>(), size_of::<F>());
    ptr::write_unaligned(at.add(RECORD_HEADER_SIZE).cast::<F>(), command);
}

/// Reads the header at `at`, returning the dispatcher and payload length.
///
/// # Safety
///
/// `at` must point at the start of a record written by [`write_record`].
pub(crate) unsafe fn read_header(at: *const u8) -> (Dispatcher, usize) {
    let dispatcher = ptr::read_unaligned(at.cast::<Dispatcher>());
    let payload_size = ptr::read_unaligned(at.add(size_of::<Dispatcher>()).cast::<usize>());
    (dispatcher, payload_size)
}

//=========================================================================
// Tests
//=========================================================================
