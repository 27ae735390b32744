use super::{Game, GameError, cell_id, check_position, pad_cells};
use crate::input::BUTTON_COUNT;
use crate::surface::{Element, Role, Surface};
use crate::timer::Timers;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};

const RESULT_DELAY: Duration = Duration::from_millis(500);
const AI_DELAY: Duration = Duration::from_millis(1000);
const CELL_PREFIX: &str = "tic";
const STATUS_ID: &str = "tic-status";

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark
{
    X,
    O,
}

impl Mark
{
    fn other(self) -> Self
    {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    fn symbol(self) -> &'static str
    {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }

    fn score_id(self) -> &'static str
    {
        match self {
            Mark::X => "score-x",
            Mark::O => "score-o",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome
{
    Won(Mark),
    Tied,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Scores
{
    pub x: u32,
    pub o: u32,
    pub tie: u32,
}

#[derive(Debug)]
enum Timer
{
    AiMove,
    Restart,
}

pub struct TicTacToe
{
    board: [Option<Mark>; BUTTON_COUNT],
    current: Mark,
    outcome: Option<Outcome>,
    player_turn: bool,
    scores: Scores,
    rng: StdRng,
    timers: Timers<Timer>,
}

impl TicTacToe
{
    pub fn new(rng: StdRng) -> Self
    {
        Self {
            board: [None; BUTTON_COUNT],
            current: Mark::X,
            outcome: None,
            player_turn: true,
            scores: Scores::default(),
            rng,
            timers: Timers::new(),
        }
    }

    #[cfg(test)]
    pub fn board(&self) -> &[Option<Mark>; BUTTON_COUNT]
    {
        &self.board
    }

    #[cfg(test)]
    pub fn outcome(&self) -> Option<Outcome>
    {
        self.outcome
    }

    #[cfg(test)]
    pub fn scores(&self) -> Scores
    {
        self.scores
    }

    fn make_move(&mut self, position: usize, now: Instant, surface: &mut Surface)
    {
        self.board[position] = Some(self.current);
        self.update_display(surface);

        if self.has_line() {
            self.finish(Outcome::Won(self.current), now, surface);
        } else if self.board.iter().all(Option::is_some) {
            self.finish(Outcome::Tied, now, surface);
        } else {
            self.current = self.current.other();
            if self.current == Mark::O {
                self.player_turn = false;
                self.timers.schedule(now, AI_DELAY, Timer::AiMove);
            }
            self.update_display(surface);
        }
    }

    fn finish(&mut self, outcome: Outcome, now: Instant, surface: &mut Surface)
    {
        self.outcome = Some(outcome);
        log::info!("tic-tac-toe finished: {outcome:?}");
        let (id, score) = match outcome {
            Outcome::Won(Mark::X) => (Mark::X.score_id(), &mut self.scores.x),
            Outcome::Won(Mark::O) => (Mark::O.score_id(), &mut self.scores.o),
            Outcome::Tied => ("score-tie", &mut self.scores.tie),
        };
        *score += 1;
        surface.set_text(id, score.to_string());
        self.update_display(surface);
        self.timers.schedule(now, RESULT_DELAY, Timer::Restart);
    }

    fn ai_move(&mut self, now: Instant, surface: &mut Surface)
    {
        if self.outcome.is_some() {
            return;
        }
        let empty: Vec<usize> = (0..BUTTON_COUNT)
            .filter(|&index| self.board[index].is_none())
            .collect();
        if let Some(&position) = empty.choose(&mut self.rng) {
            log::debug!("O plays {position}");
            self.make_move(position, now, surface);
        }
        self.player_turn = true;
    }

    fn has_line(&self) -> bool
    {
        LINES.iter().any(|&[a, b, c]| {
            self.board[a].is_some() && self.board[a] == self.board[b] && self.board[a] == self.board[c]
        })
    }

    fn outcome_message(&self) -> String
    {
        match self.outcome {
            Some(Outcome::Won(mark)) => format!("Player {} wins!", mark.symbol()),
            Some(Outcome::Tied) => "Draw!".to_string(),
            None => format!("Current player: {}", self.current.symbol()),
        }
    }

    fn update_display(&self, surface: &mut Surface)
    {
        surface.set_text(STATUS_ID, self.outcome_message());
        for (index, cell) in self.board.iter().enumerate() {
            let id = cell_id(CELL_PREFIX, index);
            let (text, class) = match cell {
                Some(Mark::X) => ("X", "btn x"),
                Some(Mark::O) => ("O", "btn o"),
                None => ("", "btn"),
            };
            surface.set_text(&id, text);
            surface.set_class(&id, class);
        }
    }
}

impl Game for TicTacToe
{
    fn render(&mut self, surface: &mut Surface)
    {
        let mut elements = vec![
            Element::new("tic-title", Role::Title).text("Tic-Tac-Toe"),
            Element::new(STATUS_ID, Role::Status),
            Element::new("score-x", Role::Stat { label: "Player X".into() })
                .text(self.scores.x.to_string()),
            Element::new("score-o", Role::Stat { label: "Player O".into() })
                .text(self.scores.o.to_string()),
            Element::new("score-tie", Role::Stat { label: "Draws".into() })
                .text(self.scores.tie.to_string()),
        ];
        elements.extend(pad_cells(CELL_PREFIX, |_| String::new()));
        surface.replace(elements);
        self.update_display(surface);
    }

    fn start(&mut self, _now: Instant, surface: &mut Surface)
    {
        self.reset(surface);
    }

    fn reset(&mut self, surface: &mut Surface)
    {
        self.board = [None; BUTTON_COUNT];
        self.current = Mark::X;
        self.outcome = None;
        self.player_turn = true;
        self.timers.clear();
        self.update_display(surface);
    }

    fn on_button_press(
        &mut self,
        position: usize,
        now: Instant,
        surface: &mut Surface,
    ) -> Result<(), GameError>
    {
        check_position(position)?;
        if self.outcome.is_some() || self.board[position].is_some() || !self.player_turn {
            return Ok(());
        }
        self.make_move(position, now, surface);
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
            Timer::AiMove => self.ai_move(due, surface),
            Timer::Restart => {
                surface.notify(self.outcome_message());
                self.reset(surface);
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use rand::SeedableRng;

    fn ms(value: u64) -> Duration
    {
        Duration::from_millis(value)
    }

    fn rendered() -> (TicTacToe, Surface)
    {
        let mut game = TicTacToe::new(StdRng::seed_from_u64(7));
        let mut surface = Surface::new();
        game.render(&mut surface);
        (game, surface)
    }

    fn drain(game: &mut TicTacToe, until: Instant, surface: &mut Surface)
    {
        while game.next_due().is_some_and(|due| due <= until) {
            game.fire_due(until, surface);
        }
    }

    #[test]
    fn every_line_wins_for_its_mark()
    {
        for line in LINES {
            for mark in [Mark::X, Mark::O] {
                let (mut game, mut surface) = rendered();
                let t0 = Instant::now();
                for (step, &position) in line.iter().enumerate() {
                    game.current = mark;
                    assert!(game.outcome.is_none(), "line {line:?} ended at step {step}");
                    game.make_move(position, t0, &mut surface);
                }
                assert_eq!(game.outcome(), Some(Outcome::Won(mark)));
            }
        }
    }

    #[test]
    fn win_bumps_score_once_and_restarts()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        for position in [0, 1, 2] {
            game.current = Mark::X;
            game.make_move(position, t0, &mut surface);
        }
        assert_eq!(surface.text("tic-status"), Some("Player X wins!"));
        assert_eq!(surface.text("score-x"), Some("1"));

        game.on_button_press(5, t0, &mut surface).unwrap();
        assert!(game.board()[5].is_none());

        drain(&mut game, t0 + ms(500), &mut surface);
        assert_eq!(surface.take_notice().as_deref(), Some("Player X wins!"));
        assert!(game.outcome().is_none());
        assert!(game.board().iter().all(Option::is_none));
        assert_eq!(game.scores(), Scores { x: 1, o: 0, tie: 0 });
        assert_eq!(surface.text("score-x"), Some("1"));
    }

    #[test]
    fn full_board_without_line_is_a_tie()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        // X O X / X O O / O X X
        let moves = [
            (0, Mark::X),
            (1, Mark::O),
            (2, Mark::X),
            (4, Mark::O),
            (3, Mark::X),
            (5, Mark::O),
            (7, Mark::X),
            (6, Mark::O),
            (8, Mark::X),
        ];
        for (position, mark) in moves {
            game.current = mark;
            game.make_move(position, t0, &mut surface);
        }
        assert_eq!(game.outcome(), Some(Outcome::Tied));
        assert_eq!(game.scores(), Scores { x: 0, o: 0, tie: 1 });
        assert_eq!(surface.text("score-tie"), Some("1"));
        assert_eq!(surface.text("tic-status"), Some("Draw!"));
    }

    #[test]
    fn computer_answers_after_delay()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        game.on_button_press(4, t0, &mut surface).unwrap();
        assert_eq!(game.board()[4], Some(Mark::X));
        assert!(!game.player_turn);

        game.on_button_press(0, t0 + ms(100), &mut surface).unwrap();
        assert!(game.board()[0].is_none());

        drain(&mut game, t0 + ms(999), &mut surface);
        assert_eq!(game.board().iter().filter(|cell| cell.is_some()).count(), 1);

        drain(&mut game, t0 + ms(1000), &mut surface);
        let o_count = game.board().iter().filter(|cell| **cell == Some(Mark::O)).count();
        assert_eq!(o_count, 1);
        assert!(game.player_turn);
        assert_eq!(surface.text("tic-status"), Some("Current player: X"));
    }

    #[test]
    fn occupied_cells_are_ignored()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        game.on_button_press(0, t0, &mut surface).unwrap();
        drain(&mut game, t0 + ms(1000), &mut surface);
        let before = *game.board();
        let taken = before.iter().position(|cell| *cell == Some(Mark::O)).unwrap();
        game.on_button_press(taken, t0 + ms(1100), &mut surface).unwrap();
        assert_eq!(*game.board(), before);
    }

    #[test]
    fn reset_cancels_pending_computer_move()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        game.on_button_press(0, t0, &mut surface).unwrap();
        game.reset(&mut surface);
        assert_eq!(game.next_due(), None);
        assert!(game.player_turn);
        assert!(game.board().iter().all(Option::is_none));
    }

    #[test]
    fn out_of_range_press_is_an_error()
    {
        let (mut game, mut surface) = rendered();
        assert_eq!(
            game.on_button_press(9, Instant::now(), &mut surface),
            Err(GameError::InvalidPosition(9))
        );
    }
}
