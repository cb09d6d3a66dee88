//! Bounded ready-wait
//!
//! After an erase or program command the device keeps WIP set until the
//! cycle finishes, which takes anywhere from under a millisecond (page
//! program) to minutes (bulk erase). The controller busy-polls the status
//! register against a tick budget fixed when the wait starts.

use super::read_status;
use crate::error::{Error, Result};
use crate::programmer::{SpiPort, TickSource};

/// Elapsed-time budget for one wait
///
/// Tick arithmetic wraps on subtraction, so a counter that rolls over
/// inside a single wait still measures the right interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget {
    start: u64,
    budget_ticks: u64,
}

impl TimeoutBudget {
    /// Start a budget of `timeout_ms` at the clock's current tick
    pub fn start<C: TickSource + ?Sized>(clock: &C, timeout_ms: u32) -> Self {
        Self {
            start: clock.now_ticks(),
            budget_ticks: (timeout_ms as u64).saturating_mul(clock.ticks_per_ms()),
        }
    }

    /// Ticks elapsed since the budget started
    pub fn elapsed(&self, now: u64) -> u64 {
        now.wrapping_sub(self.start)
    }

    /// True once strictly more than the budget has elapsed
    pub fn expired(&self, now: u64) -> bool {
        self.elapsed(now) > self.budget_ticks
    }

    /// The budget in ticks
    pub fn budget_ticks(&self) -> u64 {
        self.budget_ticks
    }
}

/// How a wait resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// WIP cleared
    Ready,
    /// The budget ran out with WIP still set
    TimedOut,
}

/// State of a [`ReadyWait`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// WIP was still set and the budget has time left
    Polling,
    /// The wait is over
    Resolved(ReadyOutcome),
}

/// Ready-wait state machine
///
/// Each [`poll`](Self::poll) performs one status read. Once resolved, the
/// state never changes.
#[derive(Debug, Clone, Copy)]
pub struct ReadyWait {
    budget: TimeoutBudget,
    state: WaitState,
    polls: u32,
}

impl ReadyWait {
    /// Start waiting with a budget of `timeout_ms`
    pub fn new<C: TickSource + ?Sized>(clock: &C, timeout_ms: u32) -> Self {
        Self {
            budget: TimeoutBudget::start(clock, timeout_ms),
            state: WaitState::Polling,
            polls: 0,
        }
    }

    /// Run one polling iteration
    pub fn poll<P, C>(&mut self, port: &mut P, clock: &C) -> Result<WaitState>
    where
        P: SpiPort + ?Sized,
        C: TickSource + ?Sized,
    {
        if let WaitState::Resolved(_) = self.state {
            return Ok(self.state);
        }

        self.polls += 1;
        let status = read_status(port)?;
        if !status.is_write_in_progress() {
            self.state = WaitState::Resolved(ReadyOutcome::Ready);
        } else if self.budget.expired(clock.now_ticks()) {
            self.state = WaitState::Resolved(ReadyOutcome::TimedOut);
        } else {
            log::trace!("spi: WIP set (status 0x{:02X})", status.bits());
        }
        Ok(self.state)
    }

    /// Current state
    pub fn state(&self) -> WaitState {
        self.state
    }

    /// Number of status reads performed so far
    pub fn polls(&self) -> u32 {
        self.polls
    }
}

/// Wait for the WIP (Write In Progress) bit to clear
///
/// Busy-polls the status register. Returns [`Error::Timeout`] as soon as
/// more than `timeout_ms` has elapsed with WIP still set; the timeout is
/// final and the caller decides whether to retry the whole operation.
///
/// # Typical budgets
/// * Page program: 1s
/// * 256KB sector erase: 5s
/// * Bulk erase: 460s
pub fn wait_ready<P, C>(port: &mut P, clock: &C, timeout_ms: u32) -> Result<()>
where
    P: SpiPort + ?Sized,
    C: TickSource + ?Sized,
{
    let mut wait = ReadyWait::new(clock, timeout_ms);
    loop {
        match wait.poll(port, clock)? {
            WaitState::Polling => core::hint::spin_loop(),
            WaitState::Resolved(ReadyOutcome::Ready) => {
                log::trace!("spi: ready after {} polls", wait.polls());
                return Ok(());
            }
            WaitState::Resolved(ReadyOutcome::TimedOut) => {
                log::warn!(
                    "spi: still busy after {}ms ({} polls)",
                    timeout_ms,
                    wait.polls()
                );
                return Err(Error::Timeout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::{MockPort, StepClock};
    use super::*;
    use crate::spi::opcodes;

    fn start_busy_cycle(port: &mut MockPort) {
        port.exchange(&[opcodes::SE_4B, 0, 0, 0, 0], None).unwrap();
    }

    #[test]
    fn test_ready_immediately() {
        let mut port = MockPort::new();
        let clock = StepClock::new(1, 10);
        wait_ready(&mut port, &clock, 5).unwrap();
        assert_eq!(port.status_reads(), 1);
    }

    #[test]
    fn test_ready_after_busy_polls() {
        let mut port = MockPort::new();
        port.busy_polls = 7;
        start_busy_cycle(&mut port);
        let clock = StepClock::new(1, 10);
        wait_ready(&mut port, &clock, 5).unwrap();
        assert_eq!(port.status_reads(), 8);
    }

    #[test]
    fn test_stuck_wip_times_out_within_one_poll() {
        let mut port = MockPort::new();
        port.busy_polls = u32::MAX;
        start_busy_cycle(&mut port);

        // 10 ticks per ms, the clock advances one tick per read
        let clock = StepClock::new(1, 10);
        let timeout_ms = 5;
        let result = wait_ready(&mut port, &clock, timeout_ms);
        assert_eq!(result, Err(Error::Timeout));

        // Start tick was 0. The last poll observed a tick just past the
        // budget and returned at once.
        let budget = timeout_ms as u64 * 10;
        let last_seen = clock.peek() - 1;
        assert_eq!(last_seen, budget + 1);
        assert_eq!(port.status_reads() as u64, budget + 1);
    }

    #[test]
    fn test_resolved_state_is_terminal() {
        let mut port = MockPort::new();
        port.busy_polls = u32::MAX;
        start_busy_cycle(&mut port);
        let clock = StepClock::new(100, 1);
        let mut wait = ReadyWait::new(&clock, 0);

        let state = wait.poll(&mut port, &clock).unwrap();
        assert_eq!(state, WaitState::Resolved(ReadyOutcome::TimedOut));
        let reads = port.status_reads();
        assert_eq!(wait.poll(&mut port, &clock).unwrap(), state);
        assert_eq!(port.status_reads(), reads);
    }

    #[test]
    fn test_budget_wraps() {
        let budget = TimeoutBudget {
            start: u64::MAX - 5,
            budget_ticks: 10,
        };
        assert_eq!(budget.elapsed(4), 10);
        assert!(!budget.expired(4));
        assert!(budget.expired(5));
    }

    #[test]
    fn test_budget_saturates() {
        let clock = StepClock::new(0, u64::MAX);
        let budget = TimeoutBudget::start(&clock, u32::MAX);
        assert_eq!(budget.budget_ticks(), u64::MAX);
    }

    #[test]
    fn test_transport_error_aborts_wait() {
        let mut port = MockPort::new();
        port.fail_exchange = Some(0);
        let clock = StepClock::new(1, 1);
        assert_eq!(
            wait_ready(&mut port, &clock, 10),
            Err(Error::TransportFailure)
        );
    }
}
