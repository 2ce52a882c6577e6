//! Rotating one-liners shown under the auth page heading.

use std::time::{Duration, Instant};

use rand::Rng;
use rand::seq::IndexedRandom;

/// How long a line stays before the next one is drawn.
pub const HUMOR_LINE_SWITCH_INTERVAL: Duration = Duration::from_secs(5);

/// Duration of each half of the cross-fade (old out, then new in).
pub const HUMOR_FADE: Duration = Duration::from_millis(300);

pub const SIGNIN_HUMOR_LINES: &[&str] = &[
    "Your password missed you. Probably.",
    "Back already? The server barely had time to nap.",
    "Type carefully, the caps lock key is watching.",
    "We kept your seat warm. Metaphorically.",
    "Remember the password, not the sticky note.",
    "Logging in: the cardio of the internet.",
    "Good to see you. Well, your email address.",
    "Authenticating vibes...",
];

pub const SIGNUP_HUMOR_LINES: &[&str] = &[
    "Pick a username your future self won't regret.",
    "Eight characters minimum. We believe in you.",
    "One uppercase, one lowercase, one number, zero pressure.",
    "Upload a photo. Or stay mysterious.",
    "New account smell: unbeatable.",
    "No robots allowed. Unless you're a friendly one.",
    "Your cover photo says a lot. Choose wisely.",
    "Joining takes less time than reading this line.",
];

/// What to draw for the humor line at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumorFrame<'a> {
    pub line: &'a str,
    /// 0.0 (hidden) ..= 1.0 (fully visible).
    pub opacity: f32,
}

/// Picks and cross-fades humor lines for one tab's list.
#[derive(Debug, Clone)]
pub struct HumorTicker {
    lines: &'static [&'static str],
    current: &'static str,
    previous: Option<&'static str>,
    switched_at: Instant,
}

impl HumorTicker {
    pub fn new<R: Rng + ?Sized>(lines: &'static [&'static str], rng: &mut R, now: Instant) -> Self {
        Self {
            lines,
            current: pick(lines, rng),
            previous: None,
            switched_at: now,
        }
    }

    /// Switches to another list and draws a fresh line immediately.
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        lines: &'static [&'static str],
        rng: &mut R,
        now: Instant,
    ) {
        self.lines = lines;
        self.previous = None;
        self.current = pick(lines, rng);
        self.switched_at = now;
    }

    /// Draws a new line once the interval has elapsed. Returns true on switch.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Instant) -> bool {
        if now.saturating_duration_since(self.switched_at) < HUMOR_LINE_SWITCH_INTERVAL {
            return false;
        }
        self.previous = Some(self.current);
        self.current = pick(self.lines, rng);
        self.switched_at = now;
        true
    }

    pub fn current(&self) -> &'static str {
        self.current
    }

    pub fn frame(&self, now: Instant) -> HumorFrame<'static> {
        let elapsed = now.saturating_duration_since(self.switched_at);

        if let Some(previous) = self.previous
            && elapsed < HUMOR_FADE
        {
            return HumorFrame {
                line: previous,
                opacity: 1.0 - ratio(elapsed, HUMOR_FADE),
            };
        }

        let fade_in = if self.previous.is_some() {
            elapsed.saturating_sub(HUMOR_FADE)
        } else {
            elapsed
        };
        HumorFrame {
            line: self.current,
            opacity: ratio(fade_in, HUMOR_FADE),
        }
    }
}

fn pick<R: Rng + ?Sized>(lines: &'static [&'static str], rng: &mut R) -> &'static str {
    lines.choose(rng).copied().unwrap_or_default()
}

fn ratio(elapsed: Duration, total: Duration) -> f32 {
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}
