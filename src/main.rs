mod app;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use app::App;
use threadview::config::Config;
use threadview::mail::client;
use threadview::mail::crypto::Unverified;
use threadview::ui::{render_help, render_thread};

/// Longest wait for input when no read timer is pending.
const IDLE_POLL: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    init_logging();

    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if args.is_empty() {
        eprintln!("usage: threadview <message file or maildir>...");
        std::process::exit(2);
    }

    let config = Config::load();
    config.validate().context("invalid configuration")?;

    let paths = client::collect_paths(&args);
    let messages = client::load_thread(&paths, &Unverified);
    if messages.is_empty() {
        anyhow::bail!("no readable messages in {} file(s)", paths.len());
    }
    let title = messages
        .first()
        .map(|m| m.subject.clone())
        .unwrap_or_default();

    let mut app = App::new(config);
    app.open(title, messages)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Some(text) = app.yank_buffer.take() {
        println!("{}", text);
    }
    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        let size = terminal.size()?;
        // Borders take two columns and rows; the help bar one more row.
        app.resize(size.width.saturating_sub(2), size.height.saturating_sub(3));

        terminal.draw(|f| render(app, f))?;

        let timeout = app
            .view()
            .and_then(|v| v.controller.next_tick_in())
            .map_or(IDLE_POLL, |t| t.min(IDLE_POLL));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.clear_status();
                    app.handle_key(key);
                }
                _ => {}
            }
        }
        app.tick();
    }
    Ok(())
}

fn render(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let theme = &app.config.theme;
    if let Some(view) = app.view() {
        render_thread(f, chunks[0], view.controller.surface(), &view.title, theme);
    }

    let input = matches!(app.mode, threadview::ui::Mode::Search | threadview::ui::Mode::Tags)
        .then_some(app.input.as_str());
    render_help(
        f,
        chunks[1],
        app.mode,
        app.status_message.as_deref(),
        input,
        theme,
    );
}

/// Log to a file under the cache dir; the terminal belongs to the UI.
fn init_logging() {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("threadview")) else {
        return;
    };
    let file = std::fs::create_dir_all(&dir)
        .and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("threadview.log"))
        });
    match file {
        Ok(file) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        Err(e) => eprintln!("threadview: cannot open log file: {}", e),
    }
}
