/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The platform seam: thread yielding, sleeping, and an
//! auto-reset event, abstracted behind [`Platform`] so the scheduling and
//! allocator layers never call `std::thread`/`std::sync` directly. A single
//! [`StdPlatform`] implementation backs production use; tests may supply a
//! fake to make timing deterministic.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub trait Platform: Send + Sync {
    fn yield_now(&self);
    fn sleep(&self, dur: Duration);
    fn new_event(&self) -> Box<dyn Event>;
}

/// A manual-reset-free (auto-reset) wait/signal primitive: exactly one
/// waiter wakes per `signal()` call, matching the OS auto-reset event
/// semantics used by the schedule policies to idle a worker until new work
/// is pushed.
pub trait Event: Send + Sync {
    fn wait(&self);
    fn wait_timeout(&self, dur: Duration) -> bool;
    fn signal(&self);
}

#[derive(Default)]
pub struct StdPlatform;

impl Platform for StdPlatform {
    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur);
    }

    fn new_event(&self) -> Box<dyn Event> {
        Box::new(StdEvent { state: Mutex::new(false), cv: Condvar::new() })
    }
}

struct StdEvent {
    state: Mutex<bool>,
    cv: Condvar,
}

impl Event for StdEvent {
    fn wait(&self) {
        let mut signaled = self.state.lock().unwrap();
        while !*signaled {
            signaled = self.cv.wait(signaled).unwrap();
        }
        *signaled = false;
    }

    fn wait_timeout(&self, dur: Duration) -> bool {
        let signaled = self.state.lock().unwrap();
        let (mut signaled, result) = self.cv.wait_timeout(signaled, dur).unwrap();
        if *signaled {
            *signaled = false;
            true
        } else {
            !result.timed_out()
        }
    }

    fn signal(&self) {
        let mut signaled = self.state.lock().unwrap();
        *signaled = true;
        self.cv.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn event_wakes_waiter() {
        let platform = StdPlatform;
        let event: Arc<dyn Event> = Arc::from(platform.new_event());
        let waiter = {
            let event = event.clone();
            thread::spawn(move || event.wait())
        };
        thread::sleep(Duration::from_millis(10));
        event.signal();
        waiter.join().unwrap();
    }

    #[test]
    fn wait_timeout_returns_false_without_signal() {
        let platform = StdPlatform;
        let event = platform.new_event();
        assert!(!event.wait_timeout(Duration::from_millis(5)));
    }
}
