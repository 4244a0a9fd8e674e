//! Bounded polling helpers and virtual-key codes.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

/// Tracks a polling budget. A zero timeout means "one attempt, no waiting".
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    timeout: Duration,
}

impl Deadline {
    pub fn new(timeout: Duration) -> Self {
        Self {
            start: Instant::now(),
            timeout,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed())
    }

    pub fn expired(&self) -> bool {
        self.elapsed() >= self.timeout
    }

    /// Sleep for `interval`, clamped so the deadline is never overshot.
    pub fn sleep(&self, interval: Duration) {
        let nap = interval.min(self.remaining());
        if !nap.is_zero() {
            thread::sleep(nap);
        }
    }
}

/// Poll `probe` until it returns `Some` or the deadline expires.
///
/// The probe always runs at least once, so a zero timeout is a single check.
pub fn poll_until<T, E>(
    timeout: Duration,
    interval: Duration,
    mut probe: impl FnMut() -> Result<Option<T>, E>,
) -> Result<Option<T>, E> {
    let deadline = Deadline::new(timeout);
    loop {
        if let Some(found) = probe()? {
            return Ok(Some(found));
        }
        if deadline.expired() {
            return Ok(None);
        }
        deadline.sleep(interval);
    }
}

/// A randomised pause in `[min, max]`, used between input actions.
pub fn jitter(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(rand::thread_rng().gen_range(0..=span))
}

/// Windows virtual-key codes accepted by the key functions.
pub mod vk {
    pub const MOUSE_LEFT: i32 = 0x01;
    pub const MOUSE_RIGHT: i32 = 0x02;
    pub const MOUSE_MIDDLE: i32 = 0x04;
    pub const BACKSPACE: i32 = 0x08;
    pub const TAB: i32 = 0x09;
    pub const ENTER: i32 = 0x0D;
    pub const SHIFT: i32 = 0x10;
    pub const CTRL: i32 = 0x11;
    pub const ALT: i32 = 0x12;
    pub const ESC: i32 = 0x1B;
    pub const SPACE: i32 = 0x20;
    pub const DELETE: i32 = 0x2E;

    /// `0`..`9` on the main keyboard.
    pub const fn digit(n: u8) -> i32 {
        0x30 + (n % 10) as i32
    }

    /// `A`..`Z`; lowercase input is folded.
    pub const fn letter(c: char) -> i32 {
        (c.to_ascii_uppercase() as u8) as i32
    }

    /// `F1`..`F12`.
    pub const fn function(n: u8) -> i32 {
        0x70 + (n as i32) - 1
    }
}
