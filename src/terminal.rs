use crate::config::Config;
use crate::controller::{Controller, LinkEvent};
use crate::engine::GameEngine;
use crate::games;
use crate::keypad::Keypad;
use crate::surface::{Element, Role, Surface};
use anyhow::{Context, Result};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

const TICK_MS: u64 = 33;
const BANNER_WIDTH: usize = 36;

struct TerminalGuard
{
    stdout: Stdout,
}

impl TerminalGuard
{
    fn enter() -> io::Result<Self>
    {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, Hide)?;
        Ok(Self { stdout })
    }

    fn stdout(&mut self) -> &mut Stdout
    {
        &mut self.stdout
    }
}

impl Drop for TerminalGuard
{
    fn drop(&mut self)
    {
        let _ = execute!(self.stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Rgb
{
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb
{
    fn from_hex(value: &str) -> Option<Self>
    {
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

enum KeyAction
{
    Continue,
    Quit,
}

/// Runs one play session until the player quits.
pub fn run_session(config: &Config, controller: Option<&Controller>, game_id: usize) -> Result<()>
{
    let mut term = TerminalGuard::enter().context("failed to prepare the terminal")?;
    let mut engine = GameEngine::new(Surface::new());
    let mut keypad = Keypad::new(
        Duration::from_millis(config.ui.animation_duration_ms),
        Duration::from_millis(config.arduino.debounce_delay_ms),
    );
    let toast_duration = Duration::from_millis(config.ui.toast_duration_ms);
    let mut link_status = match controller {
        Some(controller) => format!("ESP32 at {}", controller.address()),
        None => "keyboard only".to_string(),
    };
    let mut toast: Option<(String, Instant)> = None;
    let mut last_tick: Option<Instant> = None;

    engine.start_game(Some(game_id), Instant::now());

    loop {
        let now = Instant::now();
        if let KeyAction::Quit = handle_keys(&mut engine, &mut keypad, now)? {
            break;
        }

        let events = controller.map(Controller::poll).unwrap_or_default();
        pump_input(&mut engine, &mut keypad, events, &mut link_status, now);
        engine.tick(now);

        if let Some(message) = engine.surface_mut().take_notice() {
            toast = Some((message, now + toast_duration));
        }
        if toast.as_ref().is_some_and(|(_, until)| *until <= now) {
            toast = None;
        }

        if last_tick.is_none_or(|last| now.saturating_duration_since(last) >= Duration::from_millis(TICK_MS)) {
            let lines = compose(
                config,
                engine.game_id(),
                engine.surface(),
                &link_status,
                toast.as_ref().map(|(message, _)| message.as_str()),
            );
            draw(term.stdout(), &lines)?;
            last_tick = Some(now);
        }

        std::thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

/// Feeds this iteration's controller events, then the keypad, into the engine.
///
/// The keypad is only sampled when no controller frame arrived, since both
/// share the engine's frame rate limit and a dropped keypad frame is not resent.
fn pump_input(
    engine: &mut GameEngine,
    keypad: &mut Keypad,
    events: Vec<LinkEvent>,
    link_status: &mut String,
    now: Instant,
)
{
    let mut had_frame = false;
    for event in events {
        match event {
            LinkEvent::Frame(payload) => {
                engine.handle_input(&payload, now);
                had_frame = true;
            }
            LinkEvent::Disconnected(reason) => *link_status = format!("controller lost ({reason})"),
            LinkEvent::Reconnected(addr) => *link_status = format!("ESP32 at {addr}"),
        }
    }
    if had_frame {
        return;
    }
    if let Some(frame) = keypad.poll(now) {
        engine.handle_frame(frame, now);
    }
}

fn handle_keys(engine: &mut GameEngine, keypad: &mut Keypad, now: Instant) -> Result<KeyAction>
{
    while event::poll(Duration::from_millis(0))? {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        match code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(KeyAction::Quit),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(KeyAction::Quit);
            }
            KeyCode::Char(ch @ '1'..='9') => {
                if let Some(digit) = ch.to_digit(10) {
                    keypad.press(digit as usize - 1, now);
                }
            }
            KeyCode::Char('r') => keypad.request_reset(),
            KeyCode::Enter => engine.start_game(None, now),
            KeyCode::Tab => engine.switch_game(engine.game_id() + 1),
            _ => {}
        }
    }
    Ok(KeyAction::Continue)
}

fn compose(
    config: &Config,
    game_id: usize,
    surface: &Surface,
    link_status: &str,
    toast: Option<&str>,
) -> Vec<String>
{
    let entry = config.game(game_id);
    let accent = entry.and_then(|entry| Rgb::from_hex(&entry.color));
    let name = entry
        .map(|entry| entry.name.clone())
        .or_else(|| {
            games::registry()
                .into_iter()
                .find(|descriptor| descriptor.id == game_id)
                .map(|descriptor| descriptor.name.to_string())
        })
        .unwrap_or_default();

    let mut lines = Vec::new();
    lines.push(paint(&format!("Pad Games - {name}"), accent));
    lines.push(format!("Controller: {link_status}"));
    lines.push(String::new());

    let elements = surface.elements();
    for element in elements.iter().filter(|element| element.role == Role::Title) {
        lines.push(paint(&element.text, accent));
    }

    let stats: Vec<String> = elements
        .iter()
        .filter_map(|element| match &element.role {
            Role::Stat { label } => Some(format!("{label}: {}", element.text)),
            _ => None,
        })
        .collect();
    if !stats.is_empty() {
        lines.push(stats.join("   "));
    }
    lines.push(String::new());

    let status = find_role(elements, |role| *role == Role::Status);
    let caption = find_role(elements, |role| *role == Role::Caption);
    match find_role(elements, |role| *role == Role::Banner) {
        Some(banner) => {
            let color = class_color(banner);
            lines.push(banner_line("", color));
            lines.push(banner_line(status.map_or("", |e| e.text.as_str()), color));
            lines.push(banner_line(caption.map_or("", |e| e.text.as_str()), color));
            lines.push(banner_line("", color));
        }
        None => {
            if let Some(status) = status {
                lines.push(status.text.clone());
            }
        }
    }

    let cells: Vec<&Element> = elements
        .iter()
        .filter(|element| matches!(element.role, Role::Cell(_)))
        .collect();
    if !cells.is_empty() {
        lines.push(String::new());
        for row in cells.chunks(3) {
            let row: Vec<String> = row
                .iter()
                .map(|cell| {
                    let text = if cell.text.is_empty() { " " } else { cell.text.as_str() };
                    paint(&format!("[{text:^3}]"), class_color(cell))
                })
                .collect();
            lines.push(format!("  {}", row.join(" ")));
        }
    }

    lines.push(String::new());
    if let Some(toast) = toast {
        lines.push(paint(&format!(">> {toast}"), Some(Rgb { r: 255, g: 215, b: 0 })));
    } else {
        lines.push(String::new());
    }
    lines.push("Keys: 1-9 buttons, Enter start, r reset, Tab next game, Esc quit".to_string());
    lines
}

fn find_role<'a>(elements: &'a [Element], wanted: impl Fn(&Role) -> bool) -> Option<&'a Element>
{
    elements.iter().find(|element| wanted(&element.role))
}

fn class_color(element: &Element) -> Option<Rgb>
{
    let palette = [
        ("x", Rgb { r: 255, g: 193, b: 7 }),
        ("o", Rgb { r: 23, g: 162, b: 184 }),
        ("sequence", Rgb { r: 255, g: 215, b: 0 }),
        ("correct", Rgb { r: 40, g: 167, b: 69 }),
        ("ready", Rgb { r: 220, g: 53, b: 69 }),
        ("go", Rgb { r: 40, g: 167, b: 69 }),
    ];
    palette
        .iter()
        .rev()
        .find(|(class, _)| element.has_class(class))
        .map(|(_, color)| *color)
}

fn draw(stdout: &mut Stdout, lines: &[String]) -> Result<()>
{
    let output = format!("{}\r\n", lines.join("\r\n"));
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn banner_line(text: &str, color: Option<Rgb>) -> String
{
    let line = format!("{text:^BANNER_WIDTH$}");
    match color {
        Some(color) => format!("{}{line}\x1b[0m", ansi_background(color)),
        None => format!("|{line}|"),
    }
}

fn paint(text: &str, color: Option<Rgb>) -> String
{
    match color {
        Some(color) => format!("{}{text}\x1b[0m", ansi_color(color)),
        None => text.to_string(),
    }
}

fn ansi_color(color: Rgb) -> String
{
    format!("\x1b[38;2;{};{};{}m", color.r, color.g, color.b)
}

fn ansi_background(color: Rgb) -> String
{
    format!("\x1b[48;2;{};{};{}m", color.r, color.g, color.b)
}
