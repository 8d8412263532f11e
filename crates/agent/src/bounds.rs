use std::time::Duration;

use frontdesk_core::config::AgentConfig;
use tokio::time::Instant;

/// Headroom kept between an external call's timeout and the run deadline.
pub const CALL_MARGIN: Duration = Duration::from_millis(10);

/// Per-executor safety limits, read-only for the duration of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub max_iterations: u32,
    pub max_wall_time: Duration,
}

impl Default for Bounds {
    fn default() -> Self {
        Self { max_iterations: 5, max_wall_time: Duration::from_secs(60) }
    }
}

impl Bounds {
    /// `max_iterations` is clamped to at least one.
    pub fn new(max_iterations: u32, max_wall_time: Duration) -> Self {
        Self { max_iterations: max_iterations.max(1), max_wall_time }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.max_iterations, config.max_execution_time())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundViolation {
    IterationLimitExceeded,
    TimeBudgetExceeded,
}

impl BoundViolation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IterationLimitExceeded => "iteration_limit_exceeded",
            Self::TimeBudgetExceeded => "time_budget_exceeded",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundsCheck {
    Continue,
    Abort(BoundViolation),
}

/// Transient state of one `chat` call. Created when the call starts and dropped when it ends.
#[derive(Clone, Copy, Debug)]
pub struct RunState {
    iteration: u32,
    started_at: Instant,
    caller_deadline: Option<Instant>,
    terminal: bool,
}

impl RunState {
    pub fn start(now: Instant) -> Self {
        Self { iteration: 0, started_at: now, caller_deadline: None, terminal: false }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.caller_deadline = deadline;
        self
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn record_iteration(&mut self) {
        self.iteration = self.iteration.saturating_add(1);
    }

    pub fn mark_terminal(&mut self) {
        self.terminal = true;
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

/// Decides whether a run may take another step. Holds no mutable state; every decision is a
/// function of the configured bounds, the run state and the supplied `now`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundsController {
    bounds: Bounds,
}

impl BoundsController {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Consulted before every model call.
    pub fn check(&self, state: &RunState, now: Instant) -> BoundsCheck {
        if state.iteration >= self.bounds.max_iterations {
            return BoundsCheck::Abort(BoundViolation::IterationLimitExceeded);
        }
        self.check_time(state, now)
    }

    pub fn check_time(&self, state: &RunState, now: Instant) -> BoundsCheck {
        if now >= self.deadline(state) {
            BoundsCheck::Abort(BoundViolation::TimeBudgetExceeded)
        } else {
            BoundsCheck::Continue
        }
    }

    /// The earlier of the wall-time budget and the caller's deadline.
    pub fn deadline(&self, state: &RunState) -> Instant {
        let budget_deadline = state.started_at + self.bounds.max_wall_time;
        match state.caller_deadline {
            Some(caller_deadline) => budget_deadline.min(caller_deadline),
            None => budget_deadline,
        }
    }

    pub fn remaining(&self, state: &RunState, now: Instant) -> Duration {
        self.deadline(state).saturating_duration_since(now)
    }

    /// Timeout ceiling for one model or tool call, strictly below `remaining` while any
    /// budget is left.
    pub fn call_budget(&self, state: &RunState, now: Instant) -> Duration {
        self.remaining(state, now).saturating_sub(CALL_MARGIN)
    }
}
