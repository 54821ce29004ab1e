use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};
use ratatui::Terminal;

use crate::engine::{Engine, EngineSnapshot};
use crate::latency::LatencyTracker;
use crate::types::{PriceSuggestion, Sale};

struct App {
    engine: Engine,
    suggestions: VecDeque<PriceSuggestion>,
    sales: VecDeque<Sale>,
    latency: LatencyTracker,
    total_suggestions: u64,
    uptime: Instant,
    should_quit: bool,
    scroll_offset: usize,
}

impl App {
    fn new(engine: Engine) -> Self {
        Self {
            engine,
            suggestions: VecDeque::with_capacity(200),
            sales: VecDeque::with_capacity(200),
            latency: LatencyTracker::new(),
            total_suggestions: 0,
            uptime: Instant::now(),
            should_quit: false,
            scroll_offset: 0,
        }
    }

    fn add_suggestion(&mut self, suggestion: PriceSuggestion) {
        self.total_suggestions += 1;
        if self.suggestions.len() >= 200 {
            self.suggestions.pop_front();
        }
        self.suggestions.push_back(suggestion);
    }

    fn add_sale(&mut self, sale: Sale) {
        if self.sales.len() >= 200 {
            self.sales.pop_front();
        }
        self.sales.push_back(sale);
    }
}

pub async fn run(
    speed: u32,
    sample_size: usize,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, speed, sample_size, duration).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    speed: u32,
    sample_size: usize,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new();
    engine.seed_demo();
    engine.set_speed(speed);
    engine.with_state(|st| st.simulator.sample_size = sample_size);
    engine.start_simulation()?;

    let mut app = App::new(engine);

    let run_duration = if duration == 0 {
        Duration::from_secs(3600)
    } else {
        Duration::from_secs(duration)
    };

    let mut last_tick = Instant::now();

    while !app.should_quit && app.uptime.elapsed() < run_duration {
        let snapshot = app.engine.snapshot();
        terminal.draw(|f| draw(f, &app, &snapshot))?;

        // poll at the tick period, capped so key handling stays responsive
        let tick_period = app.engine.tick_period();
        let poll_timeout = tick_period.min(Duration::from_millis(150));
        if event::poll(poll_timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(key.code, &mut app, &snapshot)?;
                }
            }
        }

        if last_tick.elapsed() >= tick_period {
            last_tick = Instant::now();
            let report = app.engine.run_cycle();
            app.latency
                .record_cycle(report.generation_us, report.evaluation_us);
            for sale in report.sales {
                app.add_sale(sale);
            }
            for suggestion in report.suggestions {
                app.add_suggestion(suggestion);
            }
        }
    }

    app.engine.stop_simulation();
    Ok(())
}

fn handle_key(
    code: KeyCode,
    app: &mut App,
    snapshot: &EngineSnapshot,
) -> Result<(), Box<dyn std::error::Error>> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char(' ') => {
            if snapshot.running {
                app.engine.stop_simulation();
            } else {
                app.engine.start_simulation()?;
            }
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.engine.set_speed(next_speed_up(snapshot.speed_multiplier));
        }
        KeyCode::Char('-') => {
            app.engine
                .set_speed(next_speed_down(snapshot.speed_multiplier));
        }
        KeyCode::Char('r') => {
            app.engine.reset_simulation();
            app.latency.reset();
            app.sales.clear();
        }
        KeyCode::Char('b') => {
            if snapshot.boost_active {
                app.engine.deactivate_boost();
            } else if let Some(trigger) = app.engine.list_triggers(true).first() {
                app.engine.activate_boost(trigger.id, Vec::new())?;
            }
        }
        KeyCode::Char('a') => {
            if let Some(s) = snapshot.pending_suggestions.last() {
                // price may have moved since the snapshot; stale accepts fail
                let _ = app.engine.accept_suggestion(s.id);
            }
        }
        KeyCode::Char('x') => {
            if let Some(s) = snapshot.pending_suggestions.last() {
                let _ = app.engine.reject_suggestion(s.id);
            }
        }
        KeyCode::Up => {
            if app.scroll_offset > 0 {
                app.scroll_offset -= 1;
            }
        }
        KeyCode::Down => {
            app.scroll_offset = app.scroll_offset.saturating_add(1);
        }
        _ => {}
    }
    Ok(())
}

const SPEED_STEPS: &[u32] = &[1, 5, 15, 60, 240, 720, 1440];

fn next_speed_up(current: u32) -> u32 {
    SPEED_STEPS
        .iter()
        .copied()
        .find(|&s| s > current)
        .unwrap_or(1440)
}

fn next_speed_down(current: u32) -> u32 {
    SPEED_STEPS
        .iter()
        .rev()
        .copied()
        .find(|&s| s < current)
        .unwrap_or(1)
}

fn draw(f: &mut ratatui::Frame, app: &App, snapshot: &EngineSnapshot) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // header
            Constraint::Min(10),    // suggestion feed
            Constraint::Length(9),  // latency + sales ticker
            Constraint::Length(9),  // counts + prices
        ])
        .split(size);

    draw_header(f, app, snapshot, chunks[0]);
    draw_suggestion_feed(f, app, chunks[1]);
    draw_latency_and_sales(f, app, chunks[2]);
    draw_counts_and_prices(f, snapshot, chunks[3]);
}

fn draw_header(f: &mut ratatui::Frame, app: &App, snapshot: &EngineSnapshot, area: Rect) {
    let status = if snapshot.running {
        Span::styled("RUNNING", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("PAUSED", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    };
    let boost = if snapshot.boost_active {
        Span::styled(
            format!(" BOOST[{}] ", snapshot.boost_trigger.as_deref().unwrap_or("?")),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::raw("")
    };
    let header = vec![
        Span::styled(" pricepulse ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        status,
        boost,
        Span::raw(" | "),
        Span::styled(format!("x{}", snapshot.speed_multiplier), Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
        Span::raw(snapshot.virtual_clock.format("%a %Y-%m-%d %H:%M").to_string()),
        Span::raw(" | "),
        Span::styled(format!("Sales: {}", snapshot.total_sales), Style::default().fg(Color::Green)),
        Span::raw(" | "),
        Span::styled(format!("Suggestions: {}", app.total_suggestions), Style::default().fg(Color::Blue)),
        Span::raw(" | "),
        Span::styled(
            "q=quit space=run +/-=speed b=boost a=accept x=reject r=reset",
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let p = Paragraph::new(Line::from(header))
        .block(Block::default().borders(Borders::ALL).title(" PricePulse "));
    f.render_widget(p, area);
}

fn draw_suggestion_feed(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let max_visible = (area.height as usize).saturating_sub(2);
    let total = app.suggestions.len();

    let rows: Vec<Row> = app
        .suggestions
        .iter()
        .rev()
        .skip(app.scroll_offset)
        .take(max_visible)
        .map(|s| {
            let dir_color = if s.percentage_change >= 0.0 { Color::Green } else { Color::Red };
            Row::new(vec![
                ratatui::widgets::Cell::from(Span::styled(
                    format!("{:+.1}%", s.percentage_change),
                    Style::default().fg(dir_color).add_modifier(Modifier::BOLD),
                )),
                ratatui::widgets::Cell::from(format!("{:<14}", s.ean)),
                ratatui::widgets::Cell::from(format!("{:.2} -> {:.2}", s.current_price, s.suggested_price)),
                ratatui::widgets::Cell::from(s.reason.clone()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(15),
            Constraint::Length(16),
            Constraint::Min(30),
        ],
    )
    .header(
        Row::new(vec!["CHANGE", "EAN", "PRICE", "REASON"])
            .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::White)),
    )
    .block(Block::default().borders(Borders::ALL).title(format!(" Suggestion Feed ({}) ", total)));

    f.render_widget(table, area);
}

fn draw_latency_and_sales(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let gen = app.latency.generation_stats();
    let eval = app.latency.evaluation_stats();
    let cycle = app.latency.cycle_stats();

    let latency_text = vec![
        Line::from(vec![
            Span::styled("  Gen:   ", Style::default().fg(Color::Green)),
            Span::raw(format!("p50={:<6} p95={:<6} p99={:<6}", gen.p50_us, gen.p95_us, gen.p99_us)),
        ]),
        Line::from(vec![
            Span::styled("  Eval:  ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("p50={:<6} p95={:<6} p99={:<6}", eval.p50_us, eval.p95_us, eval.p99_us)),
        ]),
        Line::from(vec![
            Span::styled("  Cycle: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("p50={:<6} p95={:<6} p99={:<6}", cycle.p50_us, cycle.p95_us, cycle.p99_us)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Min: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}us", gen.min_us)),
            Span::raw("  "),
            Span::styled("Max: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}us", cycle.max_us)),
        ]),
    ];
    let latency_widget = Paragraph::new(latency_text)
        .block(Block::default().borders(Borders::ALL).title(" Latency (us) "));
    f.render_widget(latency_widget, chunks[0]);

    let max_visible = (chunks[1].height as usize).saturating_sub(2);
    let sale_rows: Vec<Row> = app
        .sales
        .iter()
        .rev()
        .take(max_visible)
        .map(|s| {
            Row::new(vec![
                ratatui::widgets::Cell::from(s.timestamp.format("%H:%M").to_string()),
                ratatui::widgets::Cell::from(format!("{:<14}", s.ean)),
                ratatui::widgets::Cell::from(format!("x{}", s.quantity)),
                ratatui::widgets::Cell::from(format!("{:.2}", s.unit_price)),
            ])
        })
        .collect();

    let sale_table = Table::new(
        sale_rows,
        [
            Constraint::Length(6),
            Constraint::Length(15),
            Constraint::Length(4),
            Constraint::Min(8),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(" Sales Ticker "));
    f.render_widget(sale_table, chunks[1]);
}

fn draw_counts_and_prices(f: &mut ratatui::Frame, snapshot: &EngineSnapshot, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let (pending, accepted, rejected) = snapshot.suggestion_counts;
    let count_rows = vec![
        Row::new(vec![
            ratatui::widgets::Cell::from(Span::styled("Pending ", Style::default().fg(Color::Yellow))),
            ratatui::widgets::Cell::from(format!("{}", pending)),
        ]),
        Row::new(vec![
            ratatui::widgets::Cell::from(Span::styled("Accepted", Style::default().fg(Color::Green))),
            ratatui::widgets::Cell::from(format!("{}", accepted)),
        ]),
        Row::new(vec![
            ratatui::widgets::Cell::from(Span::styled("Rejected", Style::default().fg(Color::Red))),
            ratatui::widgets::Cell::from(format!("{}", rejected)),
        ]),
        Row::new(vec![
            ratatui::widgets::Cell::from(Span::styled("Triggers", Style::default().fg(Color::Cyan))),
            ratatui::widgets::Cell::from(format!("{}", snapshot.trigger_count)),
        ]),
        Row::new(vec![
            ratatui::widgets::Cell::from(Span::styled("Baselines", Style::default().fg(Color::DarkGray))),
            ratatui::widgets::Cell::from(format!("{}", snapshot.baseline_count)),
        ]),
    ];

    let count_table = Table::new(
        count_rows,
        [Constraint::Length(10), Constraint::Min(6)],
    )
    .block(Block::default().borders(Borders::ALL).title(" Suggestion Counts "));
    f.render_widget(count_table, chunks[0]);

    let price_rows: Vec<Row> = snapshot
        .prices
        .iter()
        .map(|(ean, name, price)| {
            Row::new(vec![
                ratatui::widgets::Cell::from(Span::styled(
                    format!("{:<22}", truncate(name, 22)),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                )),
                ratatui::widgets::Cell::from(format!("{:<14}", ean)),
                ratatui::widgets::Cell::from(format!("R$ {:.2}", price)),
            ])
        })
        .collect();

    let price_table = Table::new(
        price_rows,
        [Constraint::Length(23), Constraint::Length(15), Constraint::Min(10)],
    )
    .block(Block::default().borders(Borders::ALL).title(" Product Prices "));
    f.render_widget(price_table, chunks[1]);
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
