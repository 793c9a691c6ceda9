//=========================================================================
// Render Thread
//=========================================================================
//
// Dedicated thread that executes drained frames.
//
// Architecture:
// ```text
//  Main Thread:                         Render Thread:
//  ┌───────────────────────────┐       ┌───────────────────────────┐
//  │ wait_and_render()         │       │ for frame in frames {     │
//  │   swap accepting arena    │ frame │   frame.execute()         │
//  │   kick(frame) ────────────┼──────>│   send back (recycle)     │
//  │                           │       │ }                         │
//  │   wait() <────────────────┼───────┤                           │
//  └───────────────────────────┘ done  └───────────────────────────┘
// ```
//
// Frames are executed strictly in the order they are kicked. The render
// thread is the only thread that calls into the backend while it runs.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info, trace};

//=== Internal Dependencies ===============================================

use crate::core::command_queue::CommandQueue;
use crate::core::error::{QueueError, RenderResult};

//=== CompletedFrame ======================================================

/// A frame the render thread finished, with its arena handed back empty.
#[derive(Debug)]
pub struct CompletedFrame {
    pub queue: CommandQueue,
    pub executed: usize,
}

//=== RenderThread ========================================================

/// Owner of the render thread and both ends of its hand-off channels.
pub struct RenderThread {
    frames: Option<Sender<CommandQueue>>,
    completed: Receiver<CompletedFrame>,
    handle: Option<JoinHandle<()>>,
    in_flight: usize,
}

impl RenderThread {
    //--- Construction -----------------------------------------------------

    /// Spawns the render thread.
    ///
    /// `channel_capacity` bounds how many kicked frames may wait for the
    /// thread before `kick` blocks.
    ///
    /// # Panics
    ///
    /// Panics if `channel_capacity == 0`.
    pub fn spawn(channel_capacity: usize) -> io::Result<Self> {
        assert!(channel_capacity > 0, "Channel capacity must be positive");

        let (frame_tx, frame_rx) = bounded::<CommandQueue>(channel_capacity);
        let (done_tx, done_rx) = bounded::<CompletedFrame>(channel_capacity + 1);

        let handle = thread::Builder::new()
            .name("render".into())
            .spawn(move || Self::run(frame_rx, done_tx))?;

        info!(target: "render_thread", "Render thread spawned (channel: {})", channel_capacity);

        Ok(Self {
            frames: Some(frame_tx),
            completed: done_rx,
            handle: Some(handle),
            in_flight: 0,
        })
    }

    fn run(frames: Receiver<CommandQueue>, completed: Sender<CompletedFrame>) {
        for mut queue in frames.iter() {
            let executed = queue.execute();
            trace!(target: "render_thread", "Frame executed ({} commands)", executed);

            if completed.send(CompletedFrame { queue, executed }).is_err() {
                break;
            }
        }
        info!(target: "render_thread", "Render thread exiting");
    }

    //--- Hand-off ---------------------------------------------------------

    /// Sends a drained frame to the render thread.
    pub fn kick(&mut self, frame: CommandQueue) -> RenderResult<()> {
        let sender = self
            .frames
            .as_ref()
            .ok_or(QueueError::RenderThreadDisconnected)?;
        sender
            .send(frame)
            .map_err(|_| QueueError::RenderThreadDisconnected)?;
        self.in_flight += 1;
        Ok(())
    }

    /// Blocks until the oldest in-flight frame completes.
    ///
    /// Returns `Ok(None)` if nothing is in flight.
    pub fn wait(&mut self) -> RenderResult<Option<CompletedFrame>> {
        if self.in_flight == 0 {
            return Ok(None);
        }
        let frame = self
            .completed
            .recv()
            .map_err(|_| QueueError::RenderThreadDisconnected)?;
        self.in_flight -= 1;
        Ok(Some(frame))
    }

    /// Frames kicked but not yet waited for.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        // Closing the frame channel ends the thread's loop.
        self.frames.take();

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => info!(target: "render_thread", "Render thread terminated cleanly"),
                Err(e) => error!(target: "render_thread", "Render thread panicked: {:?}", e),
            }
        }
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn frame_with(markers: &[usize], log: &Arc<Mutex<Vec<(usize, String)>>>) -> CommandQueue {
        let mut queue = CommandQueue::new(4096);
        for &marker in markers {
            let log = Arc::clone(log);
            queue.submit(move || {
                let name = thread::current().name().unwrap_or_default().to_string();
                log.lock().push((marker, name));
            });
        }
        queue
    }

    #[test]
    #[should_panic(expected = "Channel capacity must be positive")]
    fn zero_capacity_panics() {
        let _ = RenderThread::spawn(0);
    }

    #[test]
    fn wait_with_nothing_in_flight_returns_none() {
        let mut thread = RenderThread::spawn(1).unwrap();
        assert!(thread.wait().unwrap().is_none());
    }

    #[test]
    fn frames_execute_on_render_thread_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut thread = RenderThread::spawn(2).unwrap();

        thread.kick(frame_with(&[1, 2], &log)).unwrap();
        thread.kick(frame_with(&[3], &log)).unwrap();
        assert_eq!(thread.in_flight(), 2);

        let first = thread.wait().unwrap().unwrap();
        let second = thread.wait().unwrap().unwrap();
        assert_eq!(first.executed, 2);
        assert_eq!(second.executed, 1);
        assert_eq!(thread.in_flight(), 0);

        let entries = log.lock().clone();
        let markers: Vec<usize> = entries.iter().map(|(m, _)| *m).collect();
        assert_eq!(markers, vec![1, 2, 3]);
        assert!(entries.iter().all(|(_, name)| name == "render"));
    }

    #[test]
    fn completed_frames_come_back_empty_for_reuse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut thread = RenderThread::spawn(1).unwrap();

        thread.kick(frame_with(&[1, 2, 3], &log)).unwrap();
        let done = thread.wait().unwrap().unwrap();

        assert!(done.queue.is_empty());
        assert_eq!(done.queue.bytes_used(), 0);
        assert_eq!(done.queue.capacity(), 4096);
    }

    #[test]
    fn panicking_frame_disconnects_the_thread() {
        let mut thread = RenderThread::spawn(1).unwrap();

        let mut queue = CommandQueue::new(256);
        queue.submit(|| panic!("device lost"));
        thread.kick(queue).unwrap();

        assert_eq!(thread.wait().unwrap_err(), QueueError::RenderThreadDisconnected);
    }
}
