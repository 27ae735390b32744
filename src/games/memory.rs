use super::{Game, GameError, cell_id, check_position, pad_cells};
use crate::input::BUTTON_COUNT;
use crate::surface::{Element, Role, Surface};
use crate::timer::Timers;
use rand::Rng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

const STEP_GAP: Duration = Duration::from_millis(600);
const STEP_HOLD: Duration = Duration::from_millis(400);
const INPUT_LOCK: Duration = Duration::from_millis(300);
const PRESS_FLASH: Duration = Duration::from_millis(200);
const ROUND_DELAY: Duration = Duration::from_millis(1500);
const GAME_OVER_DELAY: Duration = Duration::from_millis(1000);
const POINTS_PER_LEVEL: u32 = 10;

const CELL_PREFIX: &str = "memory";
const LEVEL_ID: &str = "memory-level";
const SCORE_ID: &str = "memory-score";
const STATUS_ID: &str = "memory-status";
const IDLE_STATUS: &str = "Press confirm to start";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase
{
    Idle,
    ShowingSequence,
    AcceptingInput,
    Advancing,
    Over,
}

#[derive(Debug)]
enum Timer
{
    Highlight(usize),
    Unhighlight(usize),
    Unlock,
    ClearFlash(usize),
    NextRound,
    Finish,
}

pub struct Memory
{
    sequence: Vec<usize>,
    player: Vec<usize>,
    level: u32,
    score: u32,
    phase: Phase,
    status: String,
    input_locked: bool,
    rng: StdRng,
    timers: Timers<Timer>,
}

impl Memory
{
    pub fn new(rng: StdRng) -> Self
    {
        Self {
            sequence: Vec::new(),
            player: Vec::new(),
            level: 1,
            score: 0,
            phase: Phase::Idle,
            status: IDLE_STATUS.to_string(),
            input_locked: false,
            rng,
            timers: Timers::new(),
        }
    }

    #[cfg(test)]
    pub fn sequence(&self) -> &[usize]
    {
        &self.sequence
    }

    #[cfg(test)]
    pub fn level(&self) -> u32
    {
        self.level
    }

    #[cfg(test)]
    pub fn score(&self) -> u32
    {
        self.score
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase
    {
        self.phase
    }

    fn new_round(&mut self, now: Instant, surface: &mut Surface)
    {
        self.player.clear();
        self.sequence.push(self.rng.gen_range(0..BUTTON_COUNT));
        log::debug!("memory round {}, sequence {:?}", self.level, self.sequence);
        self.phase = Phase::ShowingSequence;
        self.set_status(surface, "Memorize this sequence...");
        self.timers.schedule(now, STEP_GAP, Timer::Highlight(0));
        self.update_display(surface);
    }

    fn highlight_step(&mut self, step: usize, now: Instant, surface: &mut Surface)
    {
        if let Some(&position) = self.sequence.get(step) {
            highlight(surface, position, "sequence");
            self.timers.schedule(now, STEP_HOLD, Timer::Unhighlight(step));
        }
    }

    fn unhighlight_step(&mut self, step: usize, now: Instant, surface: &mut Surface)
    {
        if let Some(&position) = self.sequence.get(step) {
            clear_highlight(surface, position);
        }
        if step + 1 < self.sequence.len() {
            self.timers.schedule(now, STEP_GAP, Timer::Highlight(step + 1));
        } else {
            self.phase = Phase::AcceptingInput;
            self.set_status(surface, "Repeat the sequence");
        }
    }

    fn game_over(&mut self, now: Instant, surface: &mut Surface)
    {
        log::info!("memory game over at level {} with {} points", self.level, self.score);
        self.phase = Phase::Over;
        self.set_status(surface, format!("Game over! Final score: {}", self.score));
        self.update_display(surface);
        self.timers.schedule(now, GAME_OVER_DELAY, Timer::Finish);
    }

    fn set_status(&mut self, surface: &mut Surface, status: impl Into<String>)
    {
        self.status = status.into();
        surface.set_text(STATUS_ID, self.status.clone());
    }

    fn update_display(&self, surface: &mut Surface)
    {
        if !surface.set_text(LEVEL_ID, self.level.to_string()) {
            log::debug!("{LEVEL_ID} is not on the surface");
        }
        if !surface.set_text(SCORE_ID, self.score.to_string()) {
            log::debug!("{SCORE_ID} is not on the surface");
        }
    }
}

fn highlight(surface: &mut Surface, position: usize, class: &str)
{
    let id = cell_id(CELL_PREFIX, position);
    if !surface.add_class(&id, class) {
        log::debug!("{id} is not on the surface");
    }
}

fn clear_highlight(surface: &mut Surface, position: usize)
{
    surface.set_class(&cell_id(CELL_PREFIX, position), "btn");
}

impl Game for Memory
{
    fn render(&mut self, surface: &mut Surface)
    {
        let mut elements = vec![
            Element::new("memory-title", Role::Title).text("Memory"),
            Element::new(LEVEL_ID, Role::Stat { label: "Level".into() }),
            Element::new(SCORE_ID, Role::Stat { label: "Score".into() }),
            Element::new(STATUS_ID, Role::Status).text(self.status.clone()),
        ];
        elements.extend(pad_cells(CELL_PREFIX, |index| (index + 1).to_string()));
        surface.replace(elements);
        self.update_display(surface);
    }

    fn start(&mut self, now: Instant, surface: &mut Surface)
    {
        log::info!("memory game started");
        self.reset(surface);
        self.new_round(now, surface);
    }

    fn reset(&mut self, surface: &mut Surface)
    {
        self.sequence.clear();
        self.player.clear();
        self.level = 1;
        self.score = 0;
        self.phase = Phase::Idle;
        self.input_locked = false;
        self.timers.clear();
        for position in 0..BUTTON_COUNT {
            clear_highlight(surface, position);
        }
        self.update_display(surface);
        self.set_status(surface, IDLE_STATUS);
    }

    fn on_button_press(
        &mut self,
        position: usize,
        now: Instant,
        surface: &mut Surface,
    ) -> Result<(), GameError>
    {
        check_position(position)?;
        if self.phase != Phase::AcceptingInput || self.input_locked {
            log::debug!(
                "memory ignored button {}: phase={:?} locked={}",
                position + 1,
                self.phase,
                self.input_locked
            );
            return Ok(());
        }

        self.input_locked = true;
        self.timers.schedule(now, INPUT_LOCK, Timer::Unlock);
        self.player.push(position);
        highlight(surface, position, "correct");
        self.timers.schedule(now, PRESS_FLASH, Timer::ClearFlash(position));

        let step = self.player.len() - 1;
        if self.player[step] != self.sequence[step] {
            self.game_over(now, surface);
            return Ok(());
        }

        if self.player.len() == self.sequence.len() {
            self.score += self.level * POINTS_PER_LEVEL;
            self.level += 1;
            log::debug!("memory round cleared, score {} level {}", self.score, self.level);
            self.phase = Phase::Advancing;
            self.set_status(surface, "Correct! Get ready for the next level...");
            self.update_display(surface);
            self.timers.schedule(now, ROUND_DELAY, Timer::NextRound);
        }
        Ok(())
    }

    fn next_due(&self) -> Option<Instant>
    {
        self.timers.next_due()
    }

    fn fire_due(&mut self, now: Instant, surface: &mut Surface)
    {
        let Some((due, timer)) = self.timers.pop_due(now) else {
            return;
        };
        match timer {
            Timer::Highlight(step) => self.highlight_step(step, due, surface),
            Timer::Unhighlight(step) => self.unhighlight_step(step, due, surface),
            Timer::Unlock => self.input_locked = false,
            Timer::ClearFlash(position) => clear_highlight(surface, position),
            Timer::NextRound => self.new_round(due, surface),
            Timer::Finish => {
                surface.notify(format!(
                    "Game over! You reached level {} with {} points",
                    self.level, self.score
                ));
                self.reset(surface);
            }
        }
    }
}
