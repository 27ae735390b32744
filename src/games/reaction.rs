use super::{Game, GameError, check_position};
use crate::surface::{Element, Role, Surface};
use crate::timer::{TimerId, Timers};
use rand::Rng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

const INPUT_LOCK: Duration = Duration::from_millis(200);
const MIN_GO_DELAY_MS: u64 = 2000;
const MAX_GO_DELAY_MS: u64 = 5000;
const RESULT_HOLD: Duration = Duration::from_millis(3000);
/// Reactions at or below this are treated as a mis-trigger and never become the best time.
const NOISE_FLOOR: Duration = Duration::from_millis(50);

const AREA_ID: &str = "reaction-area";
const TEXT_ID: &str = "reaction-text";
const SUBTITLE_ID: &str = "reaction-subtitle";
const BEST_ID: &str = "best-time";
const AVERAGE_ID: &str = "avg-time";
const ATTEMPTS_ID: &str = "attempts";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase
{
    Idle,
    Ready,
    Waiting,
    TooEarly,
    Finished,
}

/// Verdict shown after a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback
{
    TooEarly,
    Invalid,
    Blazing,
    Great,
    Decent,
    NeedsPractice,
    Slow,
}

impl Feedback
{
    pub fn classify(elapsed: Duration) -> Self
    {
        match elapsed.as_millis() {
            0..50 => Feedback::Invalid,
            50..200 => Feedback::Blazing,
            200..300 => Feedback::Great,
            300..400 => Feedback::Decent,
            400..600 => Feedback::NeedsPractice,
            _ => Feedback::Slow,
        }
    }

    fn subtitle(self) -> &'static str
    {
        match self {
            Feedback::TooEarly => "Wait for the green signal before pressing!",
            Feedback::Invalid => "Probably a mis-trigger?",
            Feedback::Blazing => "Lightning reflexes!",
            Feedback::Great => "Great reaction!",
            Feedback::Decent => "Not bad!",
            Feedback::NeedsPractice => "Needs more practice!",
            Feedback::Slow => "A little slow...",
        }
    }
}

#[derive(Debug)]
enum Timer
{
    Unlock,
    Go,
    BackToIdle,
}

pub struct Reaction
{
    phase: Phase,
    started_at: Option<Instant>,
    best: Option<Duration>,
    attempts: u32,
    total: Duration,
    input_locked: bool,
    go_timer: Option<TimerId>,
    rng: StdRng,
    timers: Timers<Timer>,
}

impl Reaction
{
    pub fn new(rng: StdRng) -> Self
    {
        Self {
            phase: Phase::Idle,
            started_at: None,
            best: None,
            attempts: 0,
            total: Duration::ZERO,
            input_locked: false,
            go_timer: None,
            rng,
            timers: Timers::new(),
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase
    {
        self.phase
    }

    #[cfg(test)]
    pub fn best(&self) -> Option<Duration>
    {
        self.best
    }

    #[cfg(test)]
    pub fn attempts(&self) -> u32
    {
        self.attempts
    }

    pub fn average(&self) -> Option<Duration>
    {
        (self.attempts > 0).then(|| self.total / self.attempts)
    }

    fn start_reaction(&mut self, now: Instant, surface: &mut Surface)
    {
        self.phase = Phase::Ready;
        show(surface, "reaction-area ready", "Ready...", "Wait for the green signal!");
        let delay = Duration::from_millis(self.rng.gen_range(MIN_GO_DELAY_MS..=MAX_GO_DELAY_MS));
        log::debug!("go signal in {delay:?}");
        self.go_timer = Some(self.timers.schedule(now, delay, Timer::Go));
    }

    fn go(&mut self, now: Instant, surface: &mut Surface)
    {
        self.go_timer = None;
        if self.phase != Phase::Ready {
            return;
        }
        self.phase = Phase::Waiting;
        self.started_at = Some(now);
        show(surface, "reaction-area go", "Now!", "Press any button!");
    }

    fn record_reaction(&mut self, now: Instant, surface: &mut Surface)
    {
        if self.phase != Phase::Waiting {
            return;
        }
        self.cancel_go();
        let elapsed = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        self.phase = Phase::Finished;
        self.attempts += 1;
        self.total += elapsed;
        if elapsed > NOISE_FLOOR && self.best.is_none_or(|best| elapsed < best) {
            self.best = Some(elapsed);
        }
        log::info!("reaction recorded: {} ms", elapsed.as_millis());
        self.show_result(Some(elapsed), now, surface);
        self.update_display(surface);
    }

    fn too_early(&mut self, now: Instant, surface: &mut Surface)
    {
        log::debug!("reaction pressed before the go signal");
        self.cancel_go();
        self.phase = Phase::TooEarly;
        self.show_result(None, now, surface);
    }

    fn show_result(&mut self, elapsed: Option<Duration>, now: Instant, surface: &mut Surface)
    {
        let feedback = elapsed.map_or(Feedback::TooEarly, Feedback::classify);
        let headline = match (feedback, elapsed) {
            (Feedback::TooEarly, _) => "Too early!".to_string(),
            (Feedback::Invalid, _) => "Invalid!".to_string(),
            (_, Some(elapsed)) => format!("{}ms", elapsed.as_millis()),
            (_, None) => String::new(),
        };
        show(surface, "reaction-area", &headline, feedback.subtitle());
        self.timers.schedule(now, RESULT_HOLD, Timer::BackToIdle);
    }

    fn cancel_go(&mut self)
    {
        if let Some(id) = self.go_timer.take() {
            self.timers.cancel(id);
        }
    }

    fn wait_for_start(&self, surface: &mut Surface)
    {
        show(
            surface,
            "reaction-area",
            "Press any button to start",
            "Get ready to test your reflexes!",
        );
    }

    fn best_text(&self) -> String
    {
        self.best
            .map_or_else(|| "--".to_string(), |best| format!("{}ms", best.as_millis()))
    }

    fn average_text(&self) -> String
    {
        self.average()
            .map_or_else(|| "--".to_string(), |average| format!("{}ms", average.as_millis()))
    }

    fn update_display(&self, surface: &mut Surface)
    {
        surface.set_text(BEST_ID, self.best_text());
        surface.set_text(AVERAGE_ID, self.average_text());
        surface.set_text(ATTEMPTS_ID, self.attempts.to_string());
    }
}

fn show(surface: &mut Surface, class: &str, text: &str, subtitle: &str)
{
    surface.set_class(AREA_ID, class);
    surface.set_text(TEXT_ID, text);
    surface.set_text(SUBTITLE_ID, subtitle);
}

impl Game for Reaction
{
    fn render(&mut self, surface: &mut Surface)
    {
        surface.replace(vec![
            Element::new("reaction-title", Role::Title).text("Reaction"),
            Element::new(BEST_ID, Role::Stat { label: "Best".into() }).text(self.best_text()),
            Element::new(AVERAGE_ID, Role::Stat { label: "Average".into() })
                .text(self.average_text()),
            Element::new(ATTEMPTS_ID, Role::Stat { label: "Attempts".into() })
                .text(self.attempts.to_string()),
            Element::new(AREA_ID, Role::Banner).class("reaction-area"),
            Element::new(TEXT_ID, Role::Status),
            Element::new(SUBTITLE_ID, Role::Caption),
        ]);
        match self.phase {
            Phase::Ready => {
                show(surface, "reaction-area ready", "Ready...", "Wait for the green signal!")
            }
            Phase::Waiting => show(surface, "reaction-area go", "Now!", "Press any button!"),
            _ => self.wait_for_start(surface),
        }
    }

    fn start(&mut self, _now: Instant, surface: &mut Surface)
    {
        self.reset(surface);
        self.wait_for_start(surface);
    }

    fn reset(&mut self, surface: &mut Surface)
    {
        self.timers.clear();
        self.go_timer = None;
        self.phase = Phase::Idle;
        self.started_at = None;
        self.input_locked = false;
        self.update_display(surface);
        self.wait_for_start(surface);
    }

    fn on_button_press(
        &mut self,
        position: usize,
        now: Instant,
        surface: &mut Surface,
    ) -> Result<(), GameError>
    {
        check_position(position)?;
        if self.input_locked {
            return Ok(());
        }
        self.input_locked = true;
        self.timers.schedule(now, INPUT_LOCK, Timer::Unlock);

        match self.phase {
            Phase::Idle => self.start_reaction(now, surface),
            Phase::Ready => self.too_early(now, surface),
            Phase::Waiting => self.record_reaction(now, surface),
            Phase::TooEarly | Phase::Finished => {}
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
            Timer::Unlock => self.input_locked = false,
            Timer::Go => self.go(due, surface),
            Timer::BackToIdle => {
                self.phase = Phase::Idle;
                self.wait_for_start(surface);
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

    fn drain(game: &mut Reaction, until: Instant, surface: &mut Surface)
    {
        while game.next_due().is_some_and(|due| due <= until) {
            game.fire_due(until, surface);
        }
    }

    fn rendered() -> (Reaction, Surface)
    {
        let mut game = Reaction::new(StdRng::seed_from_u64(3));
        let mut surface = Surface::new();
        game.render(&mut surface);
        (game, surface)
    }

    /// Presses once to arm, then runs the clock until the go signal; returns its instant.
    fn arm(game: &mut Reaction, surface: &mut Surface, now: Instant) -> Instant
    {
        game.on_button_press(0, now, surface).unwrap();
        assert_eq!(game.phase(), Phase::Ready);
        drain(game, now + ms(MAX_GO_DELAY_MS), surface);
        assert_eq!(game.phase(), Phase::Waiting);
        game.started_at.unwrap()
    }

    #[test]
    fn idle_press_only_arms()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        game.on_button_press(4, t0, &mut surface).unwrap();
        assert_eq!(game.phase(), Phase::Ready);
        assert_eq!(game.attempts(), 0);
        assert_eq!(game.best(), None);
        assert_eq!(surface.text(TEXT_ID), Some("Ready..."));
    }

    #[test]
    fn go_signal_lands_inside_window()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        game.on_button_press(0, t0, &mut surface).unwrap();
        drain(&mut game, t0 + ms(MIN_GO_DELAY_MS - 1), &mut surface);
        assert_eq!(game.phase(), Phase::Ready);
        drain(&mut game, t0 + ms(MAX_GO_DELAY_MS), &mut surface);
        assert_eq!(game.phase(), Phase::Waiting);
        let started = game.started_at.unwrap();
        assert!(started >= t0 + ms(MIN_GO_DELAY_MS));
        assert!(started <= t0 + ms(MAX_GO_DELAY_MS));
        assert!(surface.element(AREA_ID).unwrap().has_class("go"));
    }

    #[test]
    fn valid_reaction_sets_best_and_stats()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        let go = arm(&mut game, &mut surface, t0);

        game.on_button_press(0, go + ms(250), &mut surface).unwrap();
        assert_eq!(game.phase(), Phase::Finished);
        assert_eq!(game.attempts(), 1);
        assert_eq!(game.best(), Some(ms(250)));
        assert_eq!(surface.text(TEXT_ID), Some("250ms"));
        assert_eq!(surface.text(SUBTITLE_ID), Some("Great reaction!"));
        assert_eq!(surface.text(BEST_ID), Some("250ms"));
        assert_eq!(surface.text(ATTEMPTS_ID), Some("1"));

        drain(&mut game, go + ms(250) + RESULT_HOLD, &mut surface);
        assert_eq!(game.phase(), Phase::Idle);
    }

    #[test]
    fn best_time_only_improves_and_ignores_noise()
    {
        let (mut game, mut surface) = rendered();
        let mut now = Instant::now();
        for (reaction, expected_best) in [(300, 300), (40, 300), (50, 300), (180, 180), (220, 180)] {
            let go = arm(&mut game, &mut surface, now);
            game.on_button_press(0, go + ms(reaction), &mut surface).unwrap();
            assert_eq!(game.best(), Some(ms(expected_best)), "after {reaction}ms");
            now = go + ms(reaction) + RESULT_HOLD;
            drain(&mut game, now, &mut surface);
        }
        assert_eq!(game.attempts(), 5);
        assert_eq!(game.average(), Some(ms((300 + 40 + 50 + 180 + 220) / 5)));
    }

    #[test]
    fn press_before_go_is_too_early()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        game.on_button_press(0, t0, &mut surface).unwrap();
        drain(&mut game, t0 + ms(500), &mut surface);
        game.on_button_press(0, t0 + ms(500), &mut surface).unwrap();
        assert_eq!(game.phase(), Phase::TooEarly);
        assert_eq!(surface.text(TEXT_ID), Some("Too early!"));

        drain(&mut game, t0 + ms(MAX_GO_DELAY_MS), &mut surface);
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.attempts(), 0);
        assert_eq!(game.started_at, None);
    }

    #[test]
    fn presses_inside_lock_window_are_dropped()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        game.on_button_press(0, t0, &mut surface).unwrap();
        game.on_button_press(0, t0 + ms(150), &mut surface).unwrap();
        assert_eq!(game.phase(), Phase::Ready);
    }

    #[test]
    fn feedback_buckets()
    {
        assert_eq!(Feedback::classify(ms(10)), Feedback::Invalid);
        assert_eq!(Feedback::classify(ms(199)), Feedback::Blazing);
        assert_eq!(Feedback::classify(ms(299)), Feedback::Great);
        assert_eq!(Feedback::classify(ms(399)), Feedback::Decent);
        assert_eq!(Feedback::classify(ms(599)), Feedback::NeedsPractice);
        assert_eq!(Feedback::classify(ms(600)), Feedback::Slow);
    }

    #[test]
    fn reset_keeps_statistics()
    {
        let (mut game, mut surface) = rendered();
        let t0 = Instant::now();
        let go = arm(&mut game, &mut surface, t0);
        game.on_button_press(0, go + ms(320), &mut surface).unwrap();
        game.reset(&mut surface);
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.next_due(), None);
        assert_eq!(game.best(), Some(ms(320)));
        assert_eq!(game.attempts(), 1);
    }
}
