use crate::games::{self, Game};
use crate::input::{BUTTON_COUNT, ButtonFrame};
use crate::surface::Surface;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Frames arriving sooner than this after the last processed frame are dropped.
const INPUT_INTERVAL: Duration = Duration::from_millis(50);
const DISPATCH_DELAY: Duration = Duration::from_millis(50);

struct PendingDispatch
{
    due: Instant,
    buttons: Vec<usize>,
}

/// Routes pad frames to the active game.
///
/// Presses are edge-detected against the last processed frame and forwarded
/// after a short delay. A newer batch of presses replaces a batch that has not
/// been forwarded yet.
pub struct GameEngine
{
    games: Vec<Box<dyn Game>>,
    game_id: usize,
    current: Option<usize>,
    last_buttons: [bool; BUTTON_COUNT],
    last_input: Option<Instant>,
    pending: Option<PendingDispatch>,
    surface: Surface,
}

impl GameEngine
{
    pub fn new(surface: Surface) -> Self
    {
        Self::with_games(surface, games::create_all(None))
    }

    pub fn with_games(surface: Surface, games: Vec<Box<dyn Game>>) -> Self
    {
        Self {
            games,
            game_id: 0,
            current: None,
            last_buttons: [false; BUTTON_COUNT],
            last_input: None,
            pending: None,
            surface,
        }
    }

    pub fn game_id(&self) -> usize
    {
        self.game_id
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool
    {
        self.current.is_some()
    }

    #[cfg(test)]
    pub fn last_buttons(&self) -> &[bool; BUTTON_COUNT]
    {
        &self.last_buttons
    }

    #[cfg(test)]
    pub fn has_pending_dispatch(&self) -> bool
    {
        self.pending.is_some()
    }

    pub fn surface(&self) -> &Surface
    {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface
    {
        &mut self.surface
    }

    pub fn switch_game(&mut self, id: usize)
    {
        log::info!("switching to game {id}");
        if self.games.is_empty() {
            return;
        }
        self.game_id = id % self.games.len();
        self.current = Some(self.game_id);
        self.games[self.game_id].render(&mut self.surface);
    }

    pub fn start_game(&mut self, id: Option<usize>, now: Instant)
    {
        self.switch_game(id.unwrap_or(self.game_id));
        if let Some(index) = self.current {
            log::info!("starting game {index}");
            self.games[index].start(now, &mut self.surface);
        }
    }

    pub fn reset_game(&mut self)
    {
        log::info!("resetting game {}", self.game_id);
        if let Some(index) = self.current {
            self.games[index].reset(&mut self.surface);
        }
    }

    /// Accepts a raw controller payload; anything that is not a valid frame is logged and dropped.
    pub fn handle_input(&mut self, payload: &Value, now: Instant)
    {
        if self.current.is_none() {
            return;
        }
        match ButtonFrame::try_from(payload) {
            Ok(frame) => self.handle_frame(frame, now),
            Err(err) => log::warn!("dropping controller frame {payload}: {err}"),
        }
    }

    pub fn handle_frame(&mut self, frame: ButtonFrame, now: Instant)
    {
        if self.current.is_none() {
            return;
        }
        if self
            .last_input
            .is_some_and(|last| now.saturating_duration_since(last) < INPUT_INTERVAL)
        {
            return;
        }
        self.last_input = Some(now);

        let pressed = frame.rising_edges(&self.last_buttons);
        for &button in &pressed {
            log::debug!("button {} pressed", button + 1);
        }
        self.last_buttons = frame.buttons;

        if !pressed.is_empty() {
            if self.pending.is_some() {
                log::debug!("replacing pending dispatch");
            }
            self.pending = Some(PendingDispatch {
                due: now + DISPATCH_DELAY,
                buttons: pressed,
            });
        }

        if frame.reset {
            self.reset_game();
        }
    }

    pub fn process_game_input(&mut self, index: usize, now: Instant)
    {
        let game_id = self.game_id;
        let Some(current) = self.current else {
            return;
        };
        log::debug!("game {game_id} handling button {}", index + 1);
        if let Err(err) = self.games[current].on_button_press(index, now, &mut self.surface) {
            log::error!("game {game_id} failed to handle input: {err}");
        }
    }

    /// Fires everything due at or before `now` in deadline order: the pending
    /// dispatch and the timers of every game, active or not.
    pub fn tick(&mut self, now: Instant)
    {
        loop {
            let game_due = self
                .games
                .iter()
                .enumerate()
                .filter_map(|(index, game)| game.next_due().map(|due| (due, index)))
                .filter(|(due, _)| *due <= now)
                .min();
            let dispatch_due = self
                .pending
                .as_ref()
                .map(|pending| pending.due)
                .filter(|due| *due <= now);

            match (game_due, dispatch_due) {
                (Some((due, index)), dispatch) if dispatch.is_none_or(|dispatch| due <= dispatch) => {
                    self.games[index].fire_due(due, &mut self.surface);
                }
                (_, Some(due)) => {
                    if let Some(pending) = self.pending.take() {
                        for button in pending.buttons {
                            self.process_game_input(button, due);
                        }
                    }
                }
                _ => break,
            }
        }
    }
}
