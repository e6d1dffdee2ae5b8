//! The one frame loop.
//!
//! Components never request animation frames themselves. They ask the
//! scheduler, which keeps at most one frame outstanding with the host, and
//! timed work (fade completions) is queued here instead of on host timers so
//! teardown can drop all of it at once.

/// Deferred work, run with the owning context and the frame timestamp.
pub type Task<C> = Box<dyn FnOnce(&mut C, f64)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

struct Timer<C> {
    id: TaskId,
    deadline_ms: f64,
    task: Task<C>,
}

pub struct FrameScheduler<C> {
    next_id: u64,
    timers: Vec<Timer<C>>,
    frame_requested: bool,
    stopped: bool,
}

impl<C> Default for FrameScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for FrameScheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("timers", &self.timers.len())
            .field("frame_requested", &self.frame_requested)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl<C> FrameScheduler<C> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            timers: Vec::new(),
            frame_requested: false,
            stopped: false,
        }
    }

    /// Ask for a frame. Returns true only when the caller must actually
    /// request one from the host; repeated calls before the frame runs, or
    /// any call after [`stop`](Self::stop), return false.
    pub fn request_frame(&mut self) -> bool {
        if self.stopped || self.frame_requested {
            return false;
        }
        self.frame_requested = true;
        true
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Withdraw a request the host failed to deliver.
    pub fn cancel_frame_request(&mut self) {
        self.frame_requested = false;
    }

    /// Start a frame: clears the outstanding request and hands back every
    /// timer due at `now_ms`, in registration order.
    pub fn begin_frame(&mut self, now_ms: f64) -> Vec<Task<C>> {
        self.frame_requested = false;
        if self.stopped {
            return Vec::new();
        }
        let mut due = Vec::new();
        let mut pending = Vec::with_capacity(self.timers.len());
        for timer in self.timers.drain(..) {
            if timer.deadline_ms <= now_ms {
                due.push(timer.task);
            } else {
                pending.push(timer);
            }
        }
        self.timers = pending;
        due
    }

    /// Run `task` on the first frame at or after `deadline_ms`.
    pub fn at(&mut self, deadline_ms: f64, task: Task<C>) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        if !self.stopped {
            self.timers.push(Timer {
                id,
                deadline_ms,
                task,
            });
        }
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Cancel everything and refuse further frames and timers.
    pub fn stop(&mut self) {
        self.cancel_all();
        self.frame_requested = false;
        self.stopped = true;
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn run(s: &mut FrameScheduler<Log>, log: &mut Log, now: f64) {
        for task in s.begin_frame(now) {
            task(log, now);
        }
    }

    #[test]
    fn one_outstanding_frame() {
        let mut s: FrameScheduler<Log> = FrameScheduler::new();
        assert!(s.request_frame());
        assert!(!s.request_frame());
        s.begin_frame(0.0);
        assert!(s.request_frame());
    }

    #[test]
    fn withdrawn_request_can_be_made_again() {
        let mut s: FrameScheduler<Log> = FrameScheduler::new();
        assert!(s.request_frame());
        s.cancel_frame_request();
        assert!(!s.frame_requested());
        assert!(s.request_frame());
    }

    #[test]
    fn timers_fire_in_registration_order_once_due() {
        let mut s: FrameScheduler<Log> = FrameScheduler::new();
        let mut log = Log::new();
        s.at(50.0, Box::new(|l: &mut Log, _: f64| l.push("late")));
        s.at(10.0, Box::new(|l: &mut Log, _: f64| l.push("first")));
        s.at(10.0, Box::new(|l: &mut Log, _: f64| l.push("second")));

        run(&mut s, &mut log, 5.0);
        assert!(log.is_empty());
        run(&mut s, &mut log, 60.0);
        assert_eq!(log, ["late", "first", "second"]);
        assert_eq!(s.pending_timers(), 0);
    }

    #[test]
    fn cancelled_timers_never_run() {
        let mut s: FrameScheduler<Log> = FrameScheduler::new();
        let mut log = Log::new();
        let id = s.at(10.0, Box::new(|l: &mut Log, _: f64| l.push("cancelled")));
        s.at(10.0, Box::new(|l: &mut Log, _: f64| l.push("kept")));
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        run(&mut s, &mut log, 10.0);
        assert_eq!(log, ["kept"]);
    }

    #[test]
    fn stop_drops_everything() {
        let mut s: FrameScheduler<Log> = FrameScheduler::new();
        let mut log = Log::new();
        s.at(0.0, Box::new(|l: &mut Log, _: f64| l.push("dropped")));
        s.request_frame();
        s.stop();
        assert!(!s.request_frame());
        s.at(0.0, Box::new(|l: &mut Log, _: f64| l.push("refused")));
        run(&mut s, &mut log, 100.0);
        assert!(log.is_empty());
        assert_eq!(s.pending_timers(), 0);
    }
}
