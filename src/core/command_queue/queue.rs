//=========================================================================
// Command Queue
//=========================================================================
//
// Byte arena of type-erased, zero-argument commands.
//
// Architecture:
//   submit(F) ──> [dispatcher | len | F] [dispatcher | len | F] ...
//                                  ↓
//   execute() ──> dispatch each record front to back (FIFO)
//                                  ↓
//                 cursor = 0, count = 0   (memory reused, not zeroed)
//
// Pattern: Accepting (submit 0..N) → Draining (execute once) → Accepting
//
// The queue is not synchronized. Both phases take `&mut self`, so one
// owner drives both; sharing across threads goes through RenderCommand.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::mem::MaybeUninit;

use log::{debug, trace, warn};

//=== Internal Dependencies ===============================================

use super::record::{self, Dispatch, Dispatcher, RECORD_HEADER_SIZE};
use crate::core::config::{OverflowPolicy, RendererConfig};
use crate::core::error::{QueueError, RenderResult};

//=== QueuePhase ==========================================================

/// Which half of the frame cycle the arena is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePhase {
    /// Commands may be submitted.
    Accepting,

    /// Commands are being dispatched; submission is forbidden.
    Draining,
}

//=== QueueStats ==========================================================

/// Snapshot of arena usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Records currently queued.
    pub commands: usize,

    /// Bytes currently written, headers included.
    pub bytes_used: usize,

    /// Current arena capacity in bytes.
    pub capacity: usize,

    /// Largest `bytes_used` seen since construction, including peaks
    /// carried over from arenas this one replaced.
    pub high_water_mark: usize,
}

//=== CommandQueue ========================================================

/// Arena-backed FIFO of deferred commands.
///
/// Each command is any `FnOnce() + Send + 'static` closure. Its captured
/// state is moved into the arena verbatim and moved back out exactly once,
/// either to run it ([`execute`]) or to drop it ([`discard`], or dropping
/// the queue). Captured [`Ref`]s therefore release at a predictable point:
/// right after the command body returns.
///
/// [`execute`]: CommandQueue::execute
/// [`discard`]: CommandQueue::discard
/// [`Ref`]: crate::core::memory::Ref
pub struct CommandQueue {
    // len() is the write cursor.
    arena: Vec<MaybeUninit<u8>>,
    capacity: usize,
    policy: OverflowPolicy,
    command_count: usize,
    phase: QueuePhase,
    high_water_mark: usize,
}

impl CommandQueue {
    //--- Construction -----------------------------------------------------

    /// Creates a queue with a fixed `capacity` in bytes that rejects
    /// records which do not fit.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, OverflowPolicy::Reject)
    }

    /// Creates a queue with the given capacity and overflow policy.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Self {
        assert!(capacity > 0, "Arena capacity must be positive");
        Self {
            arena: Vec::with_capacity(capacity),
            capacity,
            policy,
            command_count: 0,
            phase: QueuePhase::Accepting,
            high_water_mark: 0,
        }
    }

    /// Creates a queue sized and configured from a [`RendererConfig`].
    pub fn from_config(config: &RendererConfig) -> Self {
        Self::with_policy(config.arena_capacity, config.overflow_policy)
    }

    //--- Submission -------------------------------------------------------

    /// Queues `command`, or hands back why it could not be queued.
    ///
    /// On error the command is dropped without running.
    pub fn try_submit<F>(&mut self, command: F) -> RenderResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_submit_or_return(command).map_err(|(e, _)| e)
    }

    /// Queues `command`, or hands it back untouched alongside the error.
    ///
    /// Lets a caller holding a lock around the queue release it before the
    /// rejected command's captures drop.
    pub(crate) fn try_submit_or_return<F>(&mut self, command: F) -> Result<(), (QueueError, F)>
    where
        F: FnOnce() + Send + 'static,
    {
        let at = match self.allocate(record::record_size::<F>()) {
            Ok(at) => at,
            Err(e) => return Err((e, command)),
        };
        // SAFETY: allocate reserved exactly record_size::<F>() bytes at `at`.
        unsafe { record::write_record(at, command) };
        Ok(())
    }

    /// Queues `command`.
    ///
    /// # Panics
    ///
    /// Panics with [`QueueError::ArenaExhausted`] if the record does not fit
    /// and the policy is [`OverflowPolicy::Reject`].
    pub fn submit<F>(&mut self, command: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.try_submit(command) {
            panic!("{}", e);
        }
    }

    /// Reserves `record_size` bytes at the cursor and counts the record.
    fn allocate(&mut self, record_size: usize) -> RenderResult<*mut u8> {
        debug_assert_eq!(
            self.phase,
            QueuePhase::Accepting,
            "command submitted to an arena that is being drained"
        );

        let used = self.arena.len();
        let needed = used.checked_add(record_size).ok_or(QueueError::ArenaExhausted {
            requested: record_size,
            used,
            capacity: self.capacity,
        })?;

        if needed > self.capacity {
            match self.policy {
                OverflowPolicy::Reject => {
                    return Err(QueueError::ArenaExhausted {
                        requested: record_size,
                        used,
                        capacity: self.capacity,
                    });
                }
                OverflowPolicy::Grow => self.grow(needed),
            }
        }

        // SAFETY: capacity covers `needed`; the bytes are MaybeUninit, so a
        // longer len exposes nothing invalid. The caller fills them before
        // anything reads the record.
        let at = unsafe {
            let at = self.arena.as_mut_ptr().add(used).cast::<u8>();
            self.arena.set_len(needed);
            at
        };

        self.command_count += 1;
        self.high_water_mark = self.high_water_mark.max(needed);
        Ok(at)
    }

    fn grow(&mut self, needed: usize) {
        let new_capacity = needed.max(self.capacity.saturating_mul(2));
        warn!(
            target: "render_queue",
            "Command arena grown from {} to {} bytes",
            self.capacity,
            new_capacity
        );
        // Records are plain bytes; moving them with the buffer is sound.
        self.arena.reserve_exact(new_capacity - self.arena.len());
        self.capacity = new_capacity;
    }

    //--- Execution --------------------------------------------------------

    /// Runs every queued command in submission order, then resets the
    /// arena for the next frame. Returns the number of commands run.
    ///
    /// If a command panics, the records after it are dropped without
    /// running, the arena is reset, and the panic continues.
    pub fn execute(&mut self) -> usize {
        let executed = self.drain(Dispatch::Run);
        trace!(target: "render_queue", "Executed {} commands", executed);
        executed
    }

    /// Drops every queued command without running it and resets the arena.
    /// Returns the number of commands dropped.
    pub fn discard(&mut self) -> usize {
        let discarded = self.drain(Dispatch::Discard);
        if discarded > 0 {
            debug!(target: "render_queue", "Discarded {} pending commands", discarded);
        }
        discarded
    }

    fn drain(&mut self, action: Dispatch) -> usize {
        assert_eq!(
            self.phase,
            QueuePhase::Accepting,
            "CommandQueue drained while a drain is already in progress"
        );

        let count = self.command_count;
        self.phase = QueuePhase::Draining;

        let mut drain = Drain {
            remaining: count,
            offset: 0,
            queue: self,
        };
        while let Some((dispatcher, payload)) = drain.next_record() {
            // SAFETY: each record is visited once, in write order.
            unsafe { dispatcher(payload, action) };
        }

        count
    }

    //--- Query API --------------------------------------------------------

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.command_count
    }

    /// Returns true if no commands are queued.
    pub fn is_empty(&self) -> bool {
        self.command_count == 0
    }

    /// Bytes written so far this frame, headers included.
    pub fn bytes_used(&self) -> usize {
        self.arena.len()
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes left before the overflow policy kicks in.
    pub fn remaining(&self) -> usize {
        self.capacity - self.arena.len()
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn phase(&self) -> QueuePhase {
        self.phase
    }

    /// Raises the recorded peak to at least `peak`, so usage history
    /// survives swapping this arena in for another one.
    pub(crate) fn carry_high_water_mark(&mut self, peak: usize) {
        self.high_water_mark = self.high_water_mark.max(peak);
    }

    /// Snapshot of the arena's current usage.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            commands: self.command_count,
            bytes_used: self.arena.len(),
            capacity: self.capacity,
            high_water_mark: self.high_water_mark,
        }
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        if !self.is_empty() && self.phase == QueuePhase::Accepting {
            self.discard();
        }
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("commands", &self.command_count)
            .field("bytes_used", &self.arena.len())
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("phase", &self.phase)
            .finish()
    }
}

//=== Drain ===============================================================

/// Cursor over the records of a queue being drained.
///
/// Dropping it, normally or during unwinding, discards whatever was not
/// visited and puts the queue back into the accepting phase.
struct Drain<'a> {
    queue: &'a mut CommandQueue,
    offset: usize,
    remaining: usize,
}

impl Drain<'_> {
    fn next_record(&mut self) -> Option<(Dispatcher, *mut u8)> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        // SAFETY: `offset` is the start of a record written by allocate.
        unsafe {
            let at = self.queue.arena.as_mut_ptr().add(self.offset).cast::<u8>();
            let (dispatcher, payload_size) = record::read_header(at);
            self.offset += RECORD_HEADER_SIZE + payload_size;
            debug_assert!(
                self.offset <= self.queue.arena.len(),
                "command record overruns the arena"
            );
            Some((dispatcher, at.add(RECORD_HEADER_SIZE)))
        }
    }
}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        let leftover = self.remaining;
        while let Some((dispatcher, payload)) = self.next_record() {
            // SAFETY: as in CommandQueue::drain.
            unsafe { dispatcher(payload, Dispatch::Discard) };
        }
        if leftover > 0 {
            warn!(
                target: "render_queue",
                "Drain interrupted, dropped {} commands without running them",
                leftover
            );
        }

        self.queue.arena.clear();
        self.queue.command_count = 0;
        self.queue.phase = QueuePhase::Accepting;
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command_queue::record::record_size;
    use crate::core::memory::Ref;
    use parking_lot::Mutex;
    use std::cell::RefCell;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<usize>>>;

    fn push_marker(queue: &mut CommandQueue, log: &Log, marker: usize) {
        let log = Arc::clone(log);
        queue.submit(move || log.lock().push(marker));
    }

    thread_local! {
        static BLOB_LOG: RefCell<Vec<u8>> = RefCell::new(Vec::new());
    }

    /// A command whose captured state is exactly 100 bytes.
    fn blob_command(marker: u8) -> impl FnOnce() + Send + 'static {
        let bytes = [marker; 100];
        move || {
            let bytes = bytes;
            BLOB_LOG.with(|log| log.borrow_mut().push(bytes[99]));
        }
    }

    fn blob_record_size() -> usize {
        fn size<F>(_: &F) -> usize {
            record_size::<F>()
        }
        size(&blob_command(0))
    }

    //=====================================================================
    // Ordering and execution
    //=====================================================================

    #[test]
    fn new_queue_is_empty() {
        let queue = CommandQueue::new(1024);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.bytes_used(), 0);
        assert_eq!(queue.capacity(), 1024);
        assert_eq!(queue.phase(), QueuePhase::Accepting);
    }

    #[test]
    #[should_panic(expected = "Arena capacity must be positive")]
    fn zero_capacity_panics() {
        CommandQueue::new(0);
    }

    #[test]
    fn commands_run_in_submission_order() {
        for n in [0usize, 1, 2, 17, 250] {
            let mut queue = CommandQueue::new(64 * 1024);
            let log: Log = Arc::default();

            for marker in 0..n {
                push_marker(&mut queue, &log, marker);
            }
            assert_eq!(queue.len(), n);

            let executed = queue.execute();
            assert_eq!(executed, n);
            assert_eq!(*log.lock(), (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn commands_run_once_and_only_on_execute() {
        let mut queue = CommandQueue::new(1024);
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            queue.submit(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        queue.execute();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        queue.execute();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn execute_resets_cursor_and_count() {
        let mut queue = CommandQueue::new(1024);
        let log: Log = Arc::default();

        push_marker(&mut queue, &log, 1);
        let first_frame_bytes = queue.bytes_used();
        assert!(first_frame_bytes > RECORD_HEADER_SIZE);

        queue.execute();
        assert_eq!(queue.bytes_used(), 0);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.phase(), QueuePhase::Accepting);

        // Second frame behaves exactly like the first.
        push_marker(&mut queue, &log, 2);
        assert_eq!(queue.bytes_used(), first_frame_bytes);
        queue.execute();
        assert_eq!(*log.lock(), vec![1, 2]);
        assert_eq!(queue.bytes_used(), 0);
    }

    #[test]
    fn zero_sized_commands_are_supported() {
        static HITS: AtomicUsize = AtomicUsize::new(0);
        let mut queue = CommandQueue::new(256);

        queue.submit(|| {
            HITS.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(queue.bytes_used(), RECORD_HEADER_SIZE);

        queue.execute();
        assert_eq!(HITS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn over_aligned_captures_survive_packing() {
        let mut queue = CommandQueue::new(1024);
        let seen = Arc::new(Mutex::new(Vec::new()));

        // A one-byte capture first so the next payload starts misaligned.
        let flag = 7u8;
        let seen_flag = Arc::clone(&seen);
        queue.submit(move || seen_flag.lock().push(flag as u128));

        let wide: u128 = u128::MAX - 3;
        let seen_wide = Arc::clone(&seen);
        queue.submit(move || seen_wide.lock().push(wide));

        queue.execute();
        assert_eq!(*seen.lock(), vec![7, u128::MAX - 3]);
    }

    //=====================================================================
    // Captured handles
    //=====================================================================

    struct Texture {
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Texture {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn shared_captures_stay_valid_until_last_command_finishes() {
        let drops = Arc::new(AtomicUsize::new(0));
        let texture = Ref::new(Texture {
            drops: Arc::clone(&drops),
        });
        let observed = Arc::new(Mutex::new(Vec::new()));

        let mut queue = CommandQueue::new(1024);
        for _ in 0..2 {
            let handle = texture.clone();
            let observed = Arc::clone(&observed);
            queue.submit(move || {
                observed
                    .lock()
                    .push((Ref::ref_count(&handle), handle.drops.load(Ordering::SeqCst)));
            });
        }

        drop(texture);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        queue.execute();

        // First command ran with both queued handles alive, second with
        // only its own; the object was never observed destroyed.
        assert_eq!(*observed.lock(), vec![(2, 0), (1, 0)]);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn captured_handle_releases_right_after_its_command() {
        let drops = Arc::new(AtomicUsize::new(0));
        let texture = Ref::new(Texture {
            drops: Arc::clone(&drops),
        });

        let mut queue = CommandQueue::new(1024);
        queue.submit(move || {
            let _texture = texture;
        });

        let drops_seen = Arc::clone(&drops);
        let observed = Arc::new(AtomicUsize::new(usize::MAX));
        let observed_in_command = Arc::clone(&observed);
        queue.submit(move || {
            observed_in_command.store(drops_seen.load(Ordering::SeqCst), Ordering::SeqCst);
        });

        queue.execute();
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_queue_releases_pending_captures_without_running() {
        let drops = Arc::new(AtomicUsize::new(0));
        let hits = Arc::new(AtomicUsize::new(0));
        let texture = Ref::new(Texture {
            drops: Arc::clone(&drops),
        });

        {
            let mut queue = CommandQueue::new(1024);
            let hits = Arc::clone(&hits);
            queue.submit(move || {
                let _texture = texture;
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn discard_drops_everything_and_resets() {
        let mut queue = CommandQueue::new(1024);
        let log: Log = Arc::default();
        for marker in 0..4 {
            push_marker(&mut queue, &log, marker);
        }

        assert_eq!(queue.discard(), 4);
        assert!(queue.is_empty());
        assert_eq!(queue.bytes_used(), 0);
        assert_eq!(Arc::strong_count(&log), 1);

        queue.execute();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn panicking_command_does_not_leak_the_rest() {
        let mut queue = CommandQueue::new(1024);
        let log: Log = Arc::default();

        push_marker(&mut queue, &log, 1);
        queue.submit(|| panic!("backend exploded"));
        push_marker(&mut queue, &log, 3);

        let result = panic::catch_unwind(AssertUnwindSafe(|| queue.execute()));
        assert!(result.is_err());

        assert_eq!(*log.lock(), vec![1]);
        assert_eq!(Arc::strong_count(&log), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.phase(), QueuePhase::Accepting);

        // Still usable next frame.
        push_marker(&mut queue, &log, 4);
        queue.execute();
        assert_eq!(*log.lock(), vec![1, 4]);
    }

    //=====================================================================
    // Capacity
    //=====================================================================

    #[test]
    fn blob_payload_is_one_hundred_bytes() {
        assert_eq!(blob_record_size(), RECORD_HEADER_SIZE + 100);
    }

    #[test]
    fn record_crossing_capacity_is_rejected() {
        BLOB_LOG.with(|log| log.borrow_mut().clear());
        let mut queue = CommandQueue::new(1024);
        let record = blob_record_size();
        let fitting = 1024 / record;

        for marker in 0..fitting {
            queue.try_submit(blob_command(marker as u8)).unwrap();
        }

        let err = queue.try_submit(blob_command(0xFF)).unwrap_err();
        assert_eq!(
            err,
            QueueError::ArenaExhausted {
                requested: record,
                used: fitting * record,
                capacity: 1024,
            }
        );
        assert_eq!(queue.len(), fitting);

        assert_eq!(queue.execute(), fitting);
        let expected: Vec<u8> = (0..fitting as u8).collect();
        BLOB_LOG.with(|log| assert_eq!(*log.borrow(), expected));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn kilobyte_arena_holds_eight_blob_records() {
        let mut queue = CommandQueue::new(1024);
        for marker in 0..8 {
            queue.try_submit(blob_command(marker)).unwrap();
        }
        assert_eq!(queue.bytes_used(), 928);
        assert!(queue.try_submit(blob_command(8)).is_err());
        queue.discard();
    }

    #[test]
    fn exact_fit_succeeds_and_drains() {
        BLOB_LOG.with(|log| log.borrow_mut().clear());
        let record = blob_record_size();
        let mut queue = CommandQueue::new(10 * record);

        for marker in 0..10 {
            queue.try_submit(blob_command(marker)).unwrap();
        }
        assert_eq!(queue.remaining(), 0);
        assert!(queue.try_submit(|| {}).is_err());

        assert_eq!(queue.execute(), 10);
        BLOB_LOG.with(|log| assert_eq!(*log.borrow(), (0..10).collect::<Vec<u8>>()));
    }

    #[test]
    #[should_panic(expected = "command arena exhausted")]
    fn submit_panics_when_arena_is_full() {
        let mut queue = CommandQueue::new(RECORD_HEADER_SIZE);
        queue.submit(|| {});
        queue.submit(|| {});
    }

    #[test]
    fn grow_policy_reallocates_and_keeps_order() {
        let mut queue = CommandQueue::with_policy(64, OverflowPolicy::Grow);
        let log: Log = Arc::default();

        for marker in 0..100 {
            push_marker(&mut queue, &log, marker);
        }
        assert!(queue.capacity() >= queue.bytes_used());
        assert!(queue.capacity() > 64);

        queue.execute();
        assert_eq!(*log.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn stats_track_high_water_mark() {
        let mut queue = CommandQueue::new(1024);
        let log: Log = Arc::default();

        for marker in 0..3 {
            push_marker(&mut queue, &log, marker);
        }
        let peak = queue.bytes_used();
        queue.execute();
        push_marker(&mut queue, &log, 9);

        let stats = queue.stats();
        assert_eq!(stats.commands, 1);
        assert_eq!(stats.capacity, 1024);
        assert_eq!(stats.high_water_mark, peak);
        assert!(stats.bytes_used < peak);
    }

    #[test]
    fn from_config_uses_capacity_and_policy() {
        let config = RendererConfig {
            arena_capacity: 2048,
            overflow_policy: OverflowPolicy::Grow,
            ..RendererConfig::default()
        };
        let queue = CommandQueue::from_config(&config);
        assert_eq!(queue.capacity(), 2048);
        assert_eq!(queue.policy(), OverflowPolicy::Grow);
    }
}
