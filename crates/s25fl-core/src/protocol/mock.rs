//! Scripted transport and clock for protocol tests

use core::cell::Cell;
use std::vec::Vec;

use crate::error::{Error, Result};
use crate::programmer::{SpiPort, TickSource};
use crate::spi::{opcodes, MAX_FRAME_LEN};

/// A mock port that records every frame and simulates the status register
///
/// Each program or erase command leaves WIP set for `busy_polls` status
/// reads. The program command numbered `stall_program` (1-based) never
/// completes.
pub(crate) struct MockPort {
    /// Every transmitted frame, in order
    pub frames: Vec<Vec<u8>>,
    /// Raw receive buffers handed out to non-status reads, in order
    pub replies: Vec<Vec<u8>>,
    /// Status reads that report WIP after each mutating command
    pub busy_polls: u32,
    /// Program command that leaves WIP stuck
    pub stall_program: Option<usize>,
    /// Exchange index that fails with a transport error
    pub fail_exchange: Option<usize>,
    /// Remaining `is_busy()` calls that report true
    pub transport_busy: Cell<u32>,
    /// Value returned by `max_transfer_len()`
    pub max_len: usize,
    /// Extra status bits reported on every read
    pub status_bits: u8,
    wip_remaining: u32,
    stalled: bool,
    wel: bool,
    programs: usize,
    status_reads: usize,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            replies: Vec::new(),
            busy_polls: 1,
            stall_program: None,
            fail_exchange: None,
            transport_busy: Cell::new(0),
            max_len: MAX_FRAME_LEN,
            status_bits: 0,
            wip_remaining: 0,
            stalled: false,
            wel: false,
            programs: 0,
            status_reads: 0,
        }
    }

    /// Frames whose opcode is one of `ops`
    pub fn frames_with(&self, ops: &[u8]) -> Vec<&Vec<u8>> {
        self.frames.iter().filter(|f| ops.contains(&f[0])).collect()
    }

    /// Number of status register reads performed
    pub fn status_reads(&self) -> usize {
        self.status_reads
    }

    fn status(&mut self) -> u8 {
        let mut status = self.status_bits;
        if self.wel {
            status |= opcodes::SR1_WEL;
        }
        if self.stalled {
            status |= opcodes::SR1_WIP;
        } else if self.wip_remaining > 0 {
            self.wip_remaining -= 1;
            status |= opcodes::SR1_WIP;
        }
        status
    }
}

impl SpiPort for MockPort {
    fn exchange(&mut self, tx: &[u8], rx: Option<&mut [u8]>) -> Result<()> {
        if self.fail_exchange == Some(self.frames.len()) {
            self.frames.push(tx.to_vec());
            return Err(Error::TransportFailure);
        }
        self.frames.push(tx.to_vec());

        match tx[0] {
            opcodes::WREN => self.wel = true,
            opcodes::WRDI => self.wel = false,
            opcodes::PP
            | opcodes::PP_4B
            | opcodes::SE
            | opcodes::SE_4B
            | opcodes::BE
            | opcodes::WRR => {
                if tx[0] == opcodes::PP || tx[0] == opcodes::PP_4B {
                    self.programs += 1;
                    if self.stall_program == Some(self.programs) {
                        self.stalled = true;
                    }
                }
                self.wel = false;
                self.wip_remaining = self.busy_polls;
            }
            _ => {}
        }

        if let Some(rx) = rx {
            assert_eq!(rx.len(), tx.len());
            if tx[0] == opcodes::RDSR1 {
                self.status_reads += 1;
                rx[0] = 0xFF;
                rx[1] = self.status();
            } else if !self.replies.is_empty() {
                let reply = self.replies.remove(0);
                let n = reply.len().min(rx.len());
                rx[..n].copy_from_slice(&reply[..n]);
            } else {
                rx.fill(0xFF);
            }
        }
        Ok(())
    }

    fn is_busy(&self) -> bool {
        let left = self.transport_busy.get();
        if left > 0 {
            self.transport_busy.set(left - 1);
            true
        } else {
            false
        }
    }

    fn max_transfer_len(&self) -> usize {
        self.max_len
    }
}

/// A clock that advances `step` ticks every time it is read
pub(crate) struct StepClock {
    now: Cell<u64>,
    step: u64,
    ticks_per_ms: u64,
}

impl StepClock {
    pub fn new(step: u64, ticks_per_ms: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
            ticks_per_ms,
        }
    }

    /// Tick value the next read will return
    pub fn peek(&self) -> u64 {
        self.now.get()
    }
}

impl TickSource for StepClock {
    fn now_ticks(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }

    fn ticks_per_ms(&self) -> u64 {
        self.ticks_per_ms
    }
}
