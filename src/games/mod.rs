pub mod memory;
pub mod reaction;
pub mod tictactoe;

use crate::input::BUTTON_COUNT;
use crate::surface::{Element, Role, Surface};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError
{
    #[error("button {0} is outside the 9-button pad")]
    InvalidPosition(usize),
}

/// A mini-game driven by the pad.
///
/// The dispatcher forwards presses to the active game and ticks every game's
/// timers; all drawing goes through the shared [`Surface`].
pub trait Game
{
    fn render(&mut self, surface: &mut Surface);
    fn start(&mut self, now: Instant, surface: &mut Surface);
    fn reset(&mut self, surface: &mut Surface);
    fn on_button_press(
        &mut self,
        position: usize,
        now: Instant,
        surface: &mut Surface,
    ) -> Result<(), GameError>;

    /// Deadline of the earliest pending timer, if any.
    fn next_due(&self) -> Option<Instant>;

    /// Fires the earliest timer due at or before `now`.
    fn fire_due(&mut self, now: Instant, surface: &mut Surface);
}

pub struct GameDescriptor
{
    pub id: usize,
    pub name: &'static str,
    pub description: &'static str,
}

pub fn registry() -> Vec<GameDescriptor>
{
    vec![
        GameDescriptor {
            id: 0,
            name: "tictactoe",
            description: "Tic-tac-toe against a random O player",
        },
        GameDescriptor {
            id: 1,
            name: "memory",
            description: "Repeat a growing sequence of pad buttons",
        },
        GameDescriptor {
            id: 2,
            name: "reaction",
            description: "Press any button as soon as the signal turns green",
        },
    ]
}

/// One instance per registry entry, in id order.
pub fn create_all(seed: Option<u64>) -> Vec<Box<dyn Game>>
{
    let rng = |offset: u64| match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(offset)),
        None => StdRng::from_entropy(),
    };
    let games: Vec<Box<dyn Game>> = vec![
        Box::new(tictactoe::TicTacToe::new(rng(0))),
        Box::new(memory::Memory::new(rng(1))),
        Box::new(reaction::Reaction::new(rng(2))),
    ];
    games
}

pub(crate) fn check_position(position: usize) -> Result<(), GameError>
{
    if position < BUTTON_COUNT {
        Ok(())
    } else {
        Err(GameError::InvalidPosition(position))
    }
}

/// The 3x3 pad as surface cells with ids `{prefix}-0` .. `{prefix}-8`.
pub(crate) fn pad_cells(prefix: &str, label: impl Fn(usize) -> String) -> Vec<Element>
{
    (0..BUTTON_COUNT)
        .map(|index| {
            Element::new(cell_id(prefix, index), Role::Cell(index))
                .text(label(index))
                .class("btn")
        })
        .collect()
}

pub(crate) fn cell_id(prefix: &str, index: usize) -> String
{
    format!("{prefix}-{index}")
}
