use crate::input::{BUTTON_COUNT, ButtonFrame};
use std::time::{Duration, Instant};

/// Emulates the pad from single key presses.
///
/// A keyboard only reports "pressed", so each key is held for `hold` and the
/// state is sampled no faster than `poll_interval`, the way the controller
/// polls its matrix. A frame is emitted only when the sampled state changes.
pub struct Keypad
{
    held_until: [Option<Instant>; BUTTON_COUNT],
    reset_requested: bool,
    hold: Duration,
    poll_interval: Duration,
    last_sent: Option<Instant>,
    last_frame: ButtonFrame,
}

impl Keypad
{
    pub fn new(hold: Duration, poll_interval: Duration) -> Self
    {
        Self {
            held_until: [None; BUTTON_COUNT],
            reset_requested: false,
            hold,
            poll_interval,
            last_sent: None,
            last_frame: ButtonFrame::released(),
        }
    }

    pub fn press(&mut self, index: usize, now: Instant)
    {
        if let Some(slot) = self.held_until.get_mut(index) {
            *slot = Some(now + self.hold);
        }
    }

    pub fn request_reset(&mut self)
    {
        self.reset_requested = true;
    }

    pub fn poll(&mut self, now: Instant) -> Option<ButtonFrame>
    {
        if self
            .last_sent
            .is_some_and(|last| now.saturating_duration_since(last) < self.poll_interval)
        {
            return None;
        }

        let mut frame = ButtonFrame::released();
        for (button, until) in frame.buttons.iter_mut().zip(self.held_until.iter_mut()) {
            if until.is_some_and(|deadline| deadline <= now) {
                *until = None;
            }
            *button = until.is_some();
        }
        frame.reset = std::mem::take(&mut self.reset_requested);

        if frame == self.last_frame && !frame.reset {
            return None;
        }
        self.last_sent = Some(now);
        self.last_frame = ButtonFrame {
            reset: false,
            ..frame
        };
        Some(frame)
    }
}
