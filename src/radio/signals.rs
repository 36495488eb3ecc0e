//! Flags shared between interrupt handlers and the main loop
//!
//! Each field has one writer context and one reader context. Countdowns
//! are decremented by the system tick interrupt and latch a flag when
//! they reach zero; the main loop consumes the latch with a `take_*`
//! call, which clears it.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Interrupt to main-loop signalling for the transmission engine
#[derive(Debug)]
pub struct TxSignals {
    /// Monotonic tick counter (wraps)
    ticks: AtomicU32,
    /// Ticks left before the current entry may start
    post_tx_delay: AtomicU32,
    post_tx_elapsed: AtomicBool,
    /// Ticks left before the main loop steps the encoder
    next_symbol: AtomicU32,
    symbol_due: AtomicBool,
    /// Raised by a real-time strategy once the last symbol is out
    tx_finished: AtomicBool,
}

impl TxSignals {
    /// Create cleared signals, usable in a `static`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
            post_tx_delay: AtomicU32::new(0),
            post_tx_elapsed: AtomicBool::new(false),
            next_symbol: AtomicU32::new(0),
            symbol_due: AtomicBool::new(false),
            tx_finished: AtomicBool::new(false),
        }
    }

    /// System tick interrupt body
    pub fn on_system_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        count_down(&self.post_tx_delay, &self.post_tx_elapsed);
        count_down(&self.next_symbol, &self.symbol_due);
    }

    /// Ticks since start (wrapping)
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Start the post-transmission delay; zero latches immediately
    pub fn arm_post_tx_delay(&self, ticks: u32) {
        arm(&self.post_tx_delay, &self.post_tx_elapsed, ticks);
    }

    /// Consume the delay-elapsed latch
    #[must_use]
    pub fn take_post_tx_delay_elapsed(&self) -> bool {
        self.post_tx_elapsed.swap(false, Ordering::AcqRel)
    }

    /// Schedule the next main-loop symbol step; zero latches immediately
    pub fn arm_next_symbol(&self, ticks: u32) {
        arm(&self.next_symbol, &self.symbol_due, ticks);
    }

    /// Cancel a pending symbol step
    pub fn disarm_next_symbol(&self) {
        self.next_symbol.store(0, Ordering::Release);
        self.symbol_due.store(false, Ordering::Release);
    }

    /// Consume the symbol-due latch
    #[must_use]
    pub fn take_symbol_due(&self) -> bool {
        self.symbol_due.swap(false, Ordering::AcqRel)
    }

    /// Report the end of a real-time transmission
    pub fn signal_tx_finished(&self) {
        self.tx_finished.store(true, Ordering::Release);
    }

    /// Consume the transmission-finished latch
    #[must_use]
    pub fn take_tx_finished(&self) -> bool {
        self.tx_finished.swap(false, Ordering::AcqRel)
    }
}

impl Default for TxSignals {
    fn default() -> Self {
        Self::new()
    }
}

fn arm(counter: &AtomicU32, latch: &AtomicBool, ticks: u32) {
    latch.store(false, Ordering::Release);
    counter.store(ticks, Ordering::Release);
    if ticks == 0 {
        latch.store(true, Ordering::Release);
    }
}

fn count_down(counter: &AtomicU32, latch: &AtomicBool) {
    if let Ok(previous) =
        counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1))
    {
        if previous == 1 {
            latch.store(true, Ordering::Release);
        }
    }
}
