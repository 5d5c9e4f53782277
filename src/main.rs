use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use geochat::app::{App, Focus};
use geochat::chat::{HttpTransport, Transport, WsTransport};
use geochat::config::{Args, Config};
use geochat::logging::init_logging;
use geochat::ui;
use ratatui::DefaultTerminal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

fn main() -> Result<()> {
    let config = Config::from_args(Args::parse())?;
    let _log_guard = init_logging(&config.log_dir)
        .with_context(|| format!("cannot open log directory {}", config.log_dir.display()))?;
    info!(server = %config.server, source = ?config.source, "starting");

    let http = HttpTransport::new(&config.server, config.timeout)?;
    let transport: Arc<dyn Transport> = match &config.ws {
        Some(url) => Arc::new(
            WsTransport::connect(url, http, config.timeout)
                .with_context(|| format!("cannot connect to {}", url))?,
        ),
        None => Arc::new(http),
    };

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config, transport);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(e) = &result {
        error!(error = %e, "exited with error");
    }
    result
}

/// Handle mouse events for hover, selection, panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved => app.pointer_at(mouse.column, mouse.row),
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.widget.pan(-15, 0),
        MouseEventKind::ScrollRight => app.widget.pan(15, 0),
        // Click selects, drag pans
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
            app.click_at(mouse.column, mouse.row);
        }
        MouseEventKind::Drag(MouseButton::Left) => app.drag_to(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_chat(),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Esc => app.focus = Focus::Map,
        KeyCode::Char(c) => app.input.push(c),
        _ => {}
    }
}

fn handle_map_key(app: &mut App, key: KeyEvent) {
    if let KeyCode::Char(c) = key.code {
        if app.widget.handle_control_key(c) {
            return;
        }
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.widget.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.widget.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.widget.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.widget.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.widget.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.widget.zoom_out(),

        KeyCode::Char('g') => app.request_map_data(),
        KeyCode::Char('n') => app.new_conversation(),
        KeyCode::Char('i') | KeyCode::Enter => app.focus = Focus::Chat,
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &Config, transport: Arc<dyn Transport>) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, transport, size.width, size.height)?;
    app.request_map_data();

    // Main loop
    loop {
        app.process_jobs();

        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        app.quit();
                    } else if key.code == KeyCode::Tab {
                        app.focus = match app.focus {
                            Focus::Map => Focus::Chat,
                            Focus::Chat => Focus::Map,
                        };
                    } else {
                        match app.focus {
                            Focus::Map => handle_map_key(&mut app, key),
                            Focus::Chat => handle_chat_key(&mut app, key),
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    info!("quit");
    Ok(())
}
