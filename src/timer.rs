use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::GameError;

pub type TickFn = Box<dyn FnMut(u32) + Send + 'static>;
pub type ExpireFn = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TimerState {
    Idle,
    Armed,
    Expired,
    Cancelled,
}

/// A countdown that ticks once per interval and expires exactly once per arm cycle.
///
/// After `cancel` returns no callback from the current cycle fires. Callbacks
/// must not call back into the timer.
pub trait Countdown {
    fn arm(&mut self, duration_secs: u32, on_tick: TickFn, on_expire: ExpireFn)
        -> Result<(), GameError>;
    fn cancel(&mut self);
    fn state(&self) -> TimerState;
    fn remaining(&self) -> Option<u32>;
}

fn already_armed() -> GameError {
    GameError::InvalidTransition {
        action: "arm timer",
        state: TimerState::Armed.to_string(),
    }
}

#[derive(Debug)]
struct Shared {
    state: TimerState,
    remaining: u32,
    generation: u64,
}

/// Wall-clock countdown backed by one worker thread per arm cycle
pub struct ThreadCountdown {
    shared: Arc<Mutex<Shared>>,
    tick_interval: Duration,
}

impl ThreadCountdown {
    pub fn new() -> Self {
        Self::with_tick_interval(Duration::from_secs(1))
    }

    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                state: TimerState::Idle,
                remaining: 0,
                generation: 0,
            })),
            tick_interval,
        }
    }
}

impl Default for ThreadCountdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown for ThreadCountdown {
    fn arm(
        &mut self,
        duration_secs: u32,
        mut on_tick: TickFn,
        on_expire: ExpireFn,
    ) -> Result<(), GameError> {
        let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        if shared.state == TimerState::Armed {
            return Err(already_armed());
        }

        shared.generation += 1;
        shared.remaining = duration_secs;
        if duration_secs == 0 {
            shared.state = TimerState::Expired;
            on_expire();
            return Ok(());
        }
        shared.state = TimerState::Armed;

        let generation = shared.generation;
        let worker_shared = Arc::clone(&self.shared);
        let interval = self.tick_interval;
        drop(shared);

        thread::spawn(move || {
            let mut on_expire = Some(on_expire);
            loop {
                thread::sleep(interval);

                let Ok(mut shared) = worker_shared.lock() else {
                    return;
                };
                if shared.generation != generation || shared.state != TimerState::Armed {
                    return;
                }

                shared.remaining -= 1;
                on_tick(shared.remaining);

                if shared.remaining == 0 {
                    shared.state = TimerState::Expired;
                    if let Some(expire) = on_expire.take() {
                        expire();
                    }
                    return;
                }
            }
        });

        Ok(())
    }

    fn cancel(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        if shared.state == TimerState::Armed {
            shared.state = TimerState::Cancelled;
            // Orphan the worker of this cycle
            shared.generation += 1;
        }
    }

    fn state(&self) -> TimerState {
        self.shared.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    fn remaining(&self) -> Option<u32> {
        let shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        match shared.state {
            TimerState::Idle => None,
            _ => Some(shared.remaining),
        }
    }
}

impl Drop for ThreadCountdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Countdown advanced by hand, for headless runs and tests
#[derive(Default)]
pub struct ManualCountdown {
    state: Option<TimerState>,
    remaining: u32,
    on_tick: Option<TickFn>,
    on_expire: Option<ExpireFn>,
}

impl ManualCountdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `secs` ticks synchronously, stopping early once the timer leaves `Armed`
    pub fn advance(&mut self, secs: u32) {
        for _ in 0..secs {
            if self.state() != TimerState::Armed {
                return;
            }
            self.remaining -= 1;
            if let Some(tick) = self.on_tick.as_mut() {
                tick(self.remaining);
            }
            if self.remaining == 0 {
                self.state = Some(TimerState::Expired);
                self.on_tick = None;
                if let Some(expire) = self.on_expire.take() {
                    expire();
                }
            }
        }
    }
}

impl Countdown for ManualCountdown {
    fn arm(
        &mut self,
        duration_secs: u32,
        on_tick: TickFn,
        on_expire: ExpireFn,
    ) -> Result<(), GameError> {
        if self.state() == TimerState::Armed {
            return Err(already_armed());
        }
        self.remaining = duration_secs;
        if duration_secs == 0 {
            self.state = Some(TimerState::Expired);
            self.on_tick = None;
            self.on_expire = None;
            on_expire();
            return Ok(());
        }
        self.state = Some(TimerState::Armed);
        self.on_tick = Some(on_tick);
        self.on_expire = Some(on_expire);
        Ok(())
    }

    fn cancel(&mut self) {
        if self.state() == TimerState::Armed {
            self.state = Some(TimerState::Cancelled);
            self.on_tick = None;
            self.on_expire = None;
        }
    }

    fn state(&self) -> TimerState {
        self.state.unwrap_or(TimerState::Idle)
    }

    fn remaining(&self) -> Option<u32> {
        self.state.map(|_| self.remaining)
    }
}
