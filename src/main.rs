use std::fs::{self, File};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use picochat_core::{Config, RequestParameters};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "picochat")]
#[command(about = "Terminal client for a llama-server completions endpoint")]
#[command(version)]
struct Cli {
    /// Base URL of the completions API (e.g. http://raspberrypi.local:8080/v1)
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum tokens per reply (invalid or 0 uses the default)
    #[arg(long)]
    max_tokens: Option<String>,

    /// Sampling temperature, 0.0 - 1.0 (invalid or 0 uses the default)
    #[arg(long)]
    temperature: Option<String>,

    /// Request timeout in seconds (0 for none)
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the resulting settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

/// Log to a file; the terminal belongs to the TUI.
fn init_logging() {
    let Some(log_dir) = dirs::data_local_dir().map(|p| p.join("picochat")) else {
        return;
    };
    if fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = File::create(log_dir.join("picochat.log")) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

/// Generation flags are raw text; bad values fall back to the defaults
/// instead of aborting startup.
fn apply_parameter_flags(config: &mut Config, max_tokens: Option<&str>, temperature: Option<&str>) {
    let params = RequestParameters::from_inputs(max_tokens.unwrap_or(""), temperature.unwrap_or(""));
    if max_tokens.is_some() {
        config.max_tokens = params.max_tokens;
    }
    if temperature.is_some() {
        config.temperature = params.temperature;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("could not load config, using defaults: {}", e);
        Config::new()
    });
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    apply_parameter_flags(&mut config, cli.max_tokens.as_deref(), cli.temperature.as_deref());
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }

    if cli.save_config {
        config.save()?;
        println!("Saved settings to {}", Config::get_config_path()?.display());
        return Ok(());
    }

    let mut app = App::new(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(300));
    app.start_connection_check();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    if let Some(task) = app.query_task.take() {
        task.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_flags_fall_back_to_defaults() {
        let mut config = Config::new();
        config.max_tokens = 300;
        config.temperature = 0.2;

        apply_parameter_flags(&mut config, Some("lots"), None);
        assert_eq!(config.max_tokens, 150);
        assert_eq!(config.temperature, 0.2);

        apply_parameter_flags(&mut config, Some(" 512 "), Some("0.9"));
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.temperature, 0.9);

        apply_parameter_flags(&mut config, None, Some("0"));
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.temperature, 0.7);
    }
}
