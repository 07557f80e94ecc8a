/// Frame scheduling abstraction
use std::cell::RefCell;
use std::collections::VecDeque;

/// A unit of work to run on the next frame
pub type FrameStep = Box<dyn FnOnce()>;

/// Runs a step on the next display refresh, like `requestAnimationFrame`
pub trait FrameScheduler {
    fn schedule(&self, step: FrameStep);
}

/// In-process frame queue.
///
/// Each [`FrameQueue::run_pending`] call is one refresh: it runs the steps
/// queued before the call, while steps they schedule wait for the next one.
#[derive(Default)]
pub struct FrameQueue {
    pending: RefCell<VecDeque<FrameStep>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Run one refresh worth of steps. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let due: Vec<FrameStep> = self.pending.borrow_mut().drain(..).collect();
        let count = due.len();
        for step in due {
            step();
        }
        count
    }
}

impl FrameScheduler for FrameQueue {
    fn schedule(&self, step: FrameStep) {
        self.pending.borrow_mut().push_back(step);
    }
}
