mod app;

use std::io;
use std::time::Duration;

use app::{format_date, format_tenths, format_thousands, truncate, truncate_address, AppState, ConnectionStatus, Page, SERIES_OPTIONS};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, Tabs},
    Frame, Terminal,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(30);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.editing() {
                    match key.code {
                        KeyCode::Enter => {
                            if app.commit_search() {
                                app.refresh(client).await;
                                last_tick = std::time::Instant::now();
                            }
                        }
                        KeyCode::Esc => app.cancel_search(),
                        KeyCode::Backspace => app.pop_search_char(),
                        KeyCode::Char(c) => app.push_search_char(c),
                        _ => {}
                    }
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        app.refresh(client).await;
                        last_tick = std::time::Instant::now();
                    }
                    KeyCode::Tab => app.page = app.page.next(),
                    KeyCode::Left | KeyCode::Char('h') if app.page == Page::PoolStats => {
                        app.prev_series();
                        app.refresh(client).await;
                        last_tick = std::time::Instant::now();
                    }
                    KeyCode::Right | KeyCode::Char('l') if app.page == Page::PoolStats => {
                        app.next_series();
                        app.refresh(client).await;
                        last_tick = std::time::Instant::now();
                    }
                    KeyCode::Char('/') if app.page == Page::Roster => app.begin_search(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tabs + status
            Constraint::Min(0),    // page
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    match app.page {
        Page::PoolStats => render_pool_page(f, app, chunks[1]),
        Page::Roster => render_roster_page(f, app, chunks[1]),
    }
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let tabs = Tabs::new(Page::TITLES.iter().map(|t| Line::from(*t)).collect::<Vec<_>>())
        .select(app.page.index())
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(status_text, Style::default().fg(status_color))),
        );

    f.render_widget(tabs, area);
}

fn render_pool_page(f: &mut Frame, app: &AppState, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .split(area);

    let picker: Vec<Span> = SERIES_OPTIONS
        .iter()
        .flat_map(|s| {
            let style = if *s == app.series() {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            [Span::styled(format!(" {s} "), style), Span::raw(" ")]
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(picker)), rows[0]);

    let labels: Vec<String> = app.pool.dates.iter().map(|d| format_date(d)).collect();

    let stakers: Vec<Bar> = labels
        .iter()
        .zip(&app.pool.staker_numbers)
        .map(|(d, v)| {
            Bar::default()
                .value(*v)
                .label(Line::from(d.clone()))
                .text_value(format_thousands(u128::from(*v)))
        })
        .collect();
    render_bars(f, " STAKER NUMBER ", stakers, Color::Cyan, rows[1]);

    let totals: Vec<Bar> = labels
        .iter()
        .zip(&app.pool.pos_amounts)
        .map(|(d, v)| {
            Bar::default()
                .value(v.max(0.0).round() as u64)
                .label(Line::from(d.clone()))
                .text_value(format_tenths(*v))
        })
        .collect();
    render_bars(f, " POS AMOUNT ", totals, Color::Green, rows[2]);
}

fn render_bars(f: &mut Frame, title: &str, bars: Vec<Bar>, color: Color, area: Rect) {
    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    title.to_string(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(10)
        .bar_gap(1)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color));

    f.render_widget(chart, area);
}

fn render_roster_page(f: &mut Frame, app: &AppState, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let (text, border) = match &app.search_input {
        Some(input) => (format!("{input}_"), Color::Yellow),
        None if app.search.is_empty() => ("press / to search by address".to_string(), Color::DarkGray),
        None => (app.search.clone(), Color::DarkGray),
    };
    let search = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" SEARCH "),
    );
    f.render_widget(search, rows[0]);

    let header_cells = ["Address", "Date", "POS", "ABC", "Votes"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let body: Vec<Row> = app
        .roster
        .iter()
        .map(|r| {
            let vote_color = if r.vote > 0 { Color::Green } else { Color::DarkGray };
            Row::new(vec![
                Cell::from(truncate_address(&r.espace_addr)),
                Cell::from(format_date(&r.snapshot_date)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(format_thousands(r.pos_amount)),
                Cell::from(format_thousands(r.abc_amount)),
                Cell::from(format_thousands(r.vote)).style(Style::default().fg(vote_color)),
            ])
        })
        .collect();

    let table = Table::new(
        body,
        [
            Constraint::Length(15),
            Constraint::Length(12),
            Constraint::Min(10),
            Constraint::Min(10),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" TESLA VOTING ({}) ", app.roster.len()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(table, rows[1]);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let mut spans = vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[Tab] ", Style::default().fg(Color::Yellow)),
        Span::raw("switch page  "),
    ];
    match app.page {
        Page::PoolStats => {
            spans.push(Span::styled("[← →] ", Style::default().fg(Color::Yellow)));
            spans.push(Span::raw("series  "));
        }
        Page::Roster => {
            spans.push(Span::styled("[/] ", Style::default().fg(Color::Yellow)));
            spans.push(Span::raw("search  "));
        }
    }
    spans.push(Span::styled("auto-refresh: 30s", Style::default().fg(Color::DarkGray)));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
