use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::task::LocalSet;

use lockstep_core::AppConfig;
use lockstep_tui::{
    app::App,
    event::{AppEvent, EventHandler},
    input::{handle_key_event, Action},
    widgets::{PaneWidget, StatusBarWidget},
};

type Document = (String, Vec<String>);

pub async fn run(config: Arc<AppConfig>, files: Vec<PathBuf>) -> Result<()> {
    let documents = if files.is_empty() {
        demo_documents()
    } else {
        load_documents(&files).await?
    };
    tracing::info!(panes = documents.len(), "Starting TUI");

    // Group state is single-threaded; animations run as local tasks
    let local = LocalSet::new();
    local.run_until(run_tui(config, documents)).await
}

async fn run_tui(config: Arc<AppConfig>, documents: Vec<Document>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, SetTitle("lockstep"))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = main_loop(&mut terminal, config, documents).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn main_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    config: Arc<AppConfig>,
    documents: Vec<Document>,
) -> Result<()> {
    let mut events = EventHandler::new(
        Duration::from_millis(config.ui.tick_rate_ms),
        config.ui.scroll.animation_tick_duration(),
    );
    let mut app = App::new(config, documents);

    // Use the animation tick rate while any pane is moving
    let mut needs_fast_update = false;

    loop {
        terminal.draw(|frame| render(frame, &mut app))?;

        let event = if needs_fast_update {
            events.next_animation().await?
        } else {
            events.next().await?
        };
        if let Some(event) = event {
            match event {
                AppEvent::Key(key) => {
                    let action = handle_key_event(key, &app);
                    if action != Action::None {
                        app.status_message = None;
                    }
                    if let Some(animation) = app.handle_action(action) {
                        tokio::task::spawn_local(animation);
                    }
                }
                // Pane heights are refreshed by the next draw
                AppEvent::Resize(_, _) => {}
                AppEvent::Tick => {}
            }
        }

        needs_fast_update = app.is_animating();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render(frame: &mut Frame, app: &mut App) {
    // Main layout: panes + status bar
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    // Equal-width columns, one per pane
    let count = app.panes.len().max(1) as u32;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints((0..count).map(|_| Constraint::Ratio(1, count)))
        .split(main_layout[0]);

    let show_offsets = app.config.ui.show_offsets;
    for (index, pane) in app.panes.iter_mut().enumerate() {
        PaneWidget::render(
            frame,
            columns[index],
            pane,
            index == app.focus,
            show_offsets,
            &app.theme,
        );
    }
    StatusBarWidget::render(frame, main_layout[1], app);
}

async fn load_documents(files: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let lines = content.lines().map(|line| line.replace('\t', "    ")).collect();
        documents.push((title, lines));
    }
    Ok(documents)
}

/// Three generated documents of different lengths
fn demo_documents() -> Vec<Document> {
    let numbers = (1..=200).map(|n| format!("{:>4}  {}", n, "=".repeat(n % 40))).collect();
    let squares = (1..=160)
        .map(|n: u64| format!("{:>4}² = {}", n, n * n))
        .collect();
    let hex = (0..=240u32)
        .map(|n| format!("{:#06x}  {:#010b}", n, n))
        .collect();

    vec![
        ("numbers".to_string(), numbers),
        ("squares".to_string(), squares),
        ("hex".to_string(), hex),
    ]
}
