//=========================================================================
// Memory
//=========================================================================
//
// Ownership model shared by every object a queued command may capture.
//
//=========================================================================

//=== Module Declarations =================================================

mod handle;

//=== Public API ==========================================================

pub use handle::{Ref, RefCounted, WeakRef};
