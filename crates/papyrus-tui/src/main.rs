use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use papyrus_config::ConfigManager;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

mod app;
mod client;
mod ui;

use app::{App, InputMode};

#[derive(Parser, Debug)]
#[command(name = "papyrus-tui")]
#[command(about = "Papyrus terminal chat client")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides config)
    #[arg(long)]
    backend_url: Option<String>,

    /// Config file path
    #[arg(long, env = "PAPYRUS_CONFIG", default_value = "~/.papyrus/config.json")]
    config: String,
}

/// 按键处理结果
enum KeyAction {
    None,
    Submit,
    ClearFiles,
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = papyrus_config::expand_tilde(&cli.config)
        .unwrap_or_else(|| std::path::PathBuf::from(&cli.config));
    let config = ConfigManager::load(&config_path).await?.snapshot().await;
    let backend_url = cli.backend_url.unwrap_or_else(|| config.client.backend_url.clone());

    let mut app = App::from_config(&backend_url, &config.client);
    log::info!(
        "Backend {} (chat timeout {:?})",
        app.client.base_url(),
        app.client.chat_timeout()
    );
    app.check_connection().await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let tick_rate = std::time::Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if !crossterm::event::poll(tick_rate)? {
            continue;
        }
        let Event::Key(key) = crossterm::event::read()? else {
            continue;
        };

        match handle_key_event(app, key) {
            KeyAction::None => {}
            KeyAction::Quit => return Ok(()),
            KeyAction::Submit => {
                // 先渲染等待状态再发请求
                app.busy = true;
                terminal.draw(|f| ui::draw(f, app))?;
                app.submit().await;
            }
            KeyAction::ClearFiles => app.clear_files().await,
        }
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return KeyAction::Quit,
        KeyCode::Char('a') if ctrl => app.toggle_attach_mode(),
        KeyCode::Char('l') if ctrl => app.clear_messages(),
        KeyCode::Char('d') if ctrl => return KeyAction::ClearFiles,
        KeyCode::Esc if app.input_mode() == InputMode::Attach => app.toggle_attach_mode(),
        KeyCode::Enter => return KeyAction::Submit,
        KeyCode::Char(c) => app.push_input(c),
        KeyCode::Backspace => app.pop_input(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::PageUp => app.scroll_page_up(),
        KeyCode::PageDown => app.scroll_page_down(),
        _ => {}
    }
    KeyAction::None
}
