mod config;
mod controller;
mod engine;
mod games;
mod input;
mod keypad;
mod surface;
mod terminal;
mod timer;

use anyhow::{Context, Result, anyhow, bail};
use config::{Config, ConnectionConfig};
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn main()
{
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()>
{
    let mut args = env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut rest: Vec<String> = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args.next().context("Expected a path after --config")?;
            config_path = Some(PathBuf::from(path));
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config_path = Some(PathBuf::from(path));
        } else {
            rest.push(arg);
        }
    }
    let config = Config::load(config_path.as_deref())?;

    let command = rest.first().map(String::as_str);
    match command {
        None => interactive_menu(&config),
        Some("list") => {
            list_games(&config);
            Ok(())
        }
        Some("info") => {
            print_info(&config);
            Ok(())
        }
        Some("config") => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Some("play") => {
            let name = rest
                .get(1)
                .context("Expected a game after 'play'. Run 'list' to see them.")?;
            play(&config, name)
        }
        Some("-h") | Some("--help") => {
            print_help();
            Ok(())
        }
        Some(other) => bail!("Unknown command '{other}'. Run with --help."),
    }
}

fn play(config: &Config, name: &str) -> Result<()>
{
    let game_id = find_game(name).ok_or_else(|| anyhow!("Unknown game '{name}'. Run with --help."))?;
    init_logging(config)?;
    log::info!("session starting with game {game_id}");

    println!("{}", connecting_message(&config.connection));
    match controller::Controller::connect(&config.connection) {
        Ok(controller) => terminal::run_session(config, Some(&controller), game_id),
        Err(err) => {
            log::warn!("controller unavailable: {err}");
            eprintln!("Warning: couldn't reach the game pad ({err}). Starting keyboard mode.");
            terminal::run_session(config, None, game_id)
        }
    }
}

/// Dialing every candidate can take a while, so say what is being tried.
fn connecting_message(connection: &ConnectionConfig) -> String
{
    let attempts = connection.max_retry_attempts.max(1);
    format!(
        "Connecting to the game pad on {} (port {}, up to {} attempt(s) of {} ms each)...",
        connection.common_ips.join(", "),
        connection.port,
        attempts,
        connection.timeout_ms
    )
}

fn find_game(choice: &str) -> Option<usize>
{
    games::registry()
        .into_iter()
        .find(|game| game.name.eq_ignore_ascii_case(choice))
        .map(|game| game.id)
}

/// Logs go to a file because the terminal is in raw mode while playing.
fn init_logging(config: &Config) -> Result<()>
{
    let logging = &config.logging;
    std::fs::create_dir_all(&logging.directory)
        .with_context(|| format!("Failed to create {}", logging.directory.display()))?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    let path = logging
        .directory
        .join(format!("{stamp}.{}", logging.export_format));
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let log_config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    simplelog::WriteLogger::init(logging.level_filter(), log_config, file)
        .context("Failed to initialize logging")?;
    Ok(())
}

fn interactive_menu(config: &Config) -> Result<()>
{
    let registry = games::registry();
    println!("Pad Games");
    println!();
    println!("Select a game:");
    for game in &registry {
        println!("  {}. {} - {}", game.id + 1, display_name(config, game.id, game.name), game.description);
    }
    println!();
    print!("Enter number or name (default 1, q to quit): ");
    std::io::Write::flush(&mut std::io::stdout()).context("Failed to flush stdout")?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("Failed to read input")?;
    let choice = input.trim();

    if choice.is_empty() {
        return play(config, registry[0].name);
    }
    if choice.eq_ignore_ascii_case("q") {
        return Ok(());
    }
    if let Ok(index) = choice.parse::<usize>() {
        if index >= 1 && index <= registry.len() {
            return play(config, registry[index - 1].name);
        }
    }
    if find_game(choice).is_some() {
        return play(config, choice);
    }

    bail!("Invalid selection.")
}

fn display_name(config: &Config, id: usize, fallback: &str) -> String
{
    config
        .game(id)
        .map(|entry| entry.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}

fn list_games(config: &Config)
{
    println!("Available games:");
    for game in games::registry() {
        println!(
            "  {:<10} - {} ({})",
            game.name,
            game.description,
            display_name(config, game.id, game.name)
        );
    }
}

fn print_info(config: &Config)
{
    let connection = &config.connection;
    let arduino = &config.arduino;
    println!("Controller");
    println!("  candidates:  {}", connection.common_ips.join(", "));
    println!("  port:        {}", connection.port);
    println!(
        "  timeout:     {} ms, {} attempt(s), {} ms apart, reconnect {}",
        connection.timeout_ms,
        connection.max_retry_attempts,
        connection.retry_delay_ms,
        if connection.auto_reconnect { "on" } else { "off" }
    );
    println!("\nPad wiring");
    let pins: Vec<String> = arduino.button_pins.iter().map(u8::to_string).collect();
    println!("  matrix pins: {}", pins.join(", "));
    println!(
        "  reset {}, game select {}, confirm {}, status LED {}",
        arduino.special_pins.reset,
        arduino.special_pins.game_select,
        arduino.special_pins.confirm,
        arduino.led_pin
    );
    println!("  debounce:    {} ms", arduino.debounce_delay_ms);
    println!("\nNetwork");
    println!("  WiFi SSID:   {}", config.network.wifi_ssid);
    println!("  AP SSID:     {}", config.network.ap_ssid);
    println!("  AP password: {}", config.network.ap_password);
}

fn print_help()
{
    println!("pad-games");
    println!("\nUsage:");
    println!("  pad-games [--config <file>] list");
    println!("  pad-games [--config <file>] info");
    println!("  pad-games [--config <file>] config");
    println!("  pad-games [--config <file>] play <tictactoe|memory|reaction>");
    println!("\nNotes:");
    println!("  The pad bridge sends one JSON frame per line: {{\"buttons\":[9 booleans],\"reset\":false}}.");
    println!("  Set CONTROLLER_HOST/CONTROLLER_PORT to override the bridge location.");
    println!("  Without a pad, keys 1-9 act as the buttons.");
}
