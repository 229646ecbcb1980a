//! Dashboard TUI using ratatui + crossterm.
//!
//! Shows a scrolling ticker strip and the instrument table; Enter opens a
//! detail overlay with the selected instrument's 24h chart. The overlay mounts
//! its own [`DetailView`] and Esc unmounts it again.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use gecko::Instrument;
use ratatui::prelude::*;
use ratatui::symbols;
use ratatui::widgets::{
    Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table,
    TableState,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::chart::ChartView;
use crate::config::DashboardConfig;
use crate::detail::{DetailState, DetailView};
use crate::error::AppError;
use crate::format::{
    format_magnitude, format_optional, format_percent, format_price, NOT_AVAILABLE,
};
use crate::output::ticker_line;
use crate::source::MarketDataSource;
use crate::ticker::TickerView;

/// Target render interval (10 FPS).
const RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// Render frames per one-column advance of the ticker strip.
const MARQUEE_FRAMES_PER_STEP: u64 = 2;

const TICKER_SEPARATOR: &str = "   |   ";

/// Run the dashboard until `q` is pressed or `cancel` fires.
///
/// # Errors
///
/// Returns [`AppError::Terminal`] when the terminal cannot be switched into
/// raw / alternate-screen mode.
pub async fn run_monitor<S: MarketDataSource>(
    source: Arc<S>,
    config: DashboardConfig,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let ticker = TickerView::mount(Arc::clone(&source), &config, &cancel);
    let mut ticker_rx = ticker.subscribe();

    let mut instruments: Arc<Vec<Instrument>> = ticker.instruments();
    let mut last_tick: u64 = 0;
    let mut table_state = TableState::default();
    let mut detail: Option<DetailView> = None;
    let mut frame_count: u64 = 0;

    // Set up terminal.
    enable_raw_mode().map_err(|e| AppError::Terminal(format!("enable raw mode: {e}")))?;
    io::stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| AppError::Terminal(format!("enter alternate screen: {e}")))?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .map_err(|e| AppError::Terminal(format!("create terminal: {e}")))?;

    info!(
        interval_ms = config.refresh_interval_ms,
        chart_interval_ms = config.chart_interval_ms,
        "monitor started"
    );

    let mut render_interval = tokio::time::interval(RENDER_INTERVAL);
    let mut quit = false;

    while !quit {
        tokio::select! {
            Ok(()) = ticker_rx.changed() => {
                let snap = ticker_rx.borrow_and_update().clone();
                last_tick = snap.tick;
                instruments = snap.value;
                clamp_selection(&mut table_state, instruments.len());
            }

            _ = render_interval.tick() => {
                // Poll crossterm events (non-blocking).
                while event::poll(Duration::ZERO).unwrap_or(false) {
                    let Ok(Event::Key(key)) = event::read() else {
                        continue;
                    };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') => quit = true,
                        KeyCode::Esc => match detail.take() {
                            Some(view) => view.unmount().await,
                            None => quit = true,
                        },
                        KeyCode::Up | KeyCode::Char('k') if detail.is_none() => {
                            move_selection(&mut table_state, instruments.len(), -1);
                        }
                        KeyCode::Down | KeyCode::Char('j') if detail.is_none() => {
                            move_selection(&mut table_state, instruments.len(), 1);
                        }
                        KeyCode::Enter if detail.is_none() => {
                            let selected = table_state
                                .selected()
                                .and_then(|i| instruments.get(i))
                                .cloned();
                            if let Some(inst) = selected {
                                detail = Some(DetailView::mount(
                                    Arc::clone(&source),
                                    inst,
                                    config.chart_interval(),
                                    Local,
                                    &cancel,
                                ));
                            }
                        }
                        _ => {}
                    }
                }

                if !quit {
                    frame_count += 1;
                    let offset = (frame_count / MARQUEE_FRAMES_PER_STEP) as usize;
                    let detail_state = detail
                        .as_ref()
                        .map(|d| (d.instrument().clone(), d.state(), d.last_price()));
                    let _ = terminal.draw(|frame| {
                        render_ui(
                            frame,
                            &instruments,
                            last_tick,
                            &mut table_state,
                            detail_state
                                .as_ref()
                                .map(|(inst, state, last)| (inst, state.as_ref(), *last)),
                            offset,
                        );
                    });
                }
            }

            _ = cancel.cancelled() => {
                quit = true;
            }
        }
    }

    // Restore terminal.
    restore_terminal(&mut terminal);

    if let Some(view) = detail.take() {
        view.unmount().await;
    }
    ticker.unmount().await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Selection helpers
// ---------------------------------------------------------------------------

fn clamp_selection(state: &mut TableState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), n) if i >= n => state.select(Some(n - 1)),
        _ => {}
    }
}

fn move_selection(state: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, len as isize - 1);
    state.select(Some(next as usize));
}

/// A `width`-column window onto `text`, rotated left by `offset` columns.
///
/// Text that already fits is returned unchanged.
fn marquee(text: &str, offset: usize, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return text.to_string();
    }
    chars
        .iter()
        .cycle()
        .skip(offset % chars.len())
        .take(width)
        .collect()
}

// ---------------------------------------------------------------------------
// Terminal helpers
// ---------------------------------------------------------------------------

/// Restore terminal to normal mode.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) {
    let _ = terminal.show_cursor();
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(LeaveAlternateScreen);
}

// ---------------------------------------------------------------------------
// UI rendering
// ---------------------------------------------------------------------------

fn render_ui(
    frame: &mut Frame,
    instruments: &[Instrument],
    tick: u64,
    table_state: &mut TableState,
    detail: Option<(&Instrument, &DetailState, f64)>,
    marquee_offset: usize,
) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(3), // ticker strip
            Constraint::Min(5),    // table
        ])
        .split(area);

    let header_text = format!(
        " COINWATCH | {} instruments | update #{tick} | Enter: details  Esc: close  q: quit",
        instruments.len(),
    );
    let header = Paragraph::new(header_text)
        .style(Style::default().fg(Color::White).bg(Color::Blue).bold())
        .alignment(Alignment::Center);
    frame.render_widget(header, layout[0]);

    render_ticker_strip(frame, layout[1], instruments, marquee_offset);
    render_table(frame, layout[2], instruments, table_state);

    if let Some((inst, state, last_price)) = detail {
        render_detail(frame, centered_rect(80, 80, area), inst, state, last_price);
    }
}

fn render_ticker_strip(frame: &mut Frame, area: Rect, instruments: &[Instrument], offset: usize) {
    let text = if instruments.is_empty() {
        "Loading...".to_string()
    } else {
        let mut strip = instruments
            .iter()
            .map(ticker_line)
            .collect::<Vec<_>>()
            .join(TICKER_SEPARATOR);
        strip.push_str(TICKER_SEPARATOR);
        let width = area.width.saturating_sub(2) as usize;
        marquee(&strip, offset, width)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Ticker ");
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_table(
    frame: &mut Frame,
    area: Rect,
    instruments: &[Instrument],
    state: &mut TableState,
) {
    let header = Row::new(["#", "Symbol", "Name", "Price", "24h", "Market Cap", "Volume"])
        .style(Style::default().fg(Color::Yellow).bold());

    let rows = instruments.iter().map(|inst| {
        let change_color = match inst.price_change_percentage_24h {
            Some(p) if p > 0.0 => Color::Green,
            Some(p) if p < 0.0 => Color::Red,
            _ => Color::DarkGray,
        };
        Row::new(vec![
            Cell::from(
                inst.market_cap_rank
                    .map_or_else(|| "-".to_string(), |r| r.to_string()),
            ),
            Cell::from(inst.symbol.to_uppercase()),
            Cell::from(inst.name.clone()),
            Cell::from(format_price(inst.current_price)),
            Cell::from(format_percent(inst.price_change_percentage_24h))
                .style(Style::default().fg(change_color)),
            Cell::from(format_optional(inst.market_cap)),
            Cell::from(format_optional(inst.total_volume)),
        ])
    });

    let widths = [
        Constraint::Length(5),
        Constraint::Length(8),
        Constraint::Min(12),
        Constraint::Length(16),
        Constraint::Length(9),
        Constraint::Length(14),
        Constraint::Length(14),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Markets ");
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray).bold())
        .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, state);
}

fn render_detail(
    frame: &mut Frame,
    area: Rect,
    inst: &Instrument,
    state: &DetailState,
    last_price: f64,
) {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ({}) ", inst.name, inst.symbol.to_uppercase()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(5)])
        .split(inner);

    let chart = state.chart();
    let live = chart.map_or(last_price, |c| c.live_price);
    let change_pct = chart
        .and_then(|c| c.change)
        .map_or(inst.price_change_percentage_24h, |c| c.percent);

    let stats = vec![
        Line::from(vec![
            Span::raw(" Live price  "),
            Span::styled(format_price(live), Style::default().bold()),
            Span::raw(format!("  ({})", format_percent(change_pct))),
        ]),
        Line::from(format!(
            " 24h high    {}    24h low  {}",
            inst.high_24h.map_or_else(|| NOT_AVAILABLE.to_string(), format_price),
            inst.low_24h.map_or_else(|| NOT_AVAILABLE.to_string(), format_price),
        )),
        Line::from(format!(
            " Market cap  {}    Volume   {}",
            format_optional(inst.market_cap),
            format_optional(inst.total_volume),
        )),
        Line::from(format!(
            " Circulating {}",
            format_optional(inst.circulating_supply)
        )),
        Line::from(format!(" Total       {}", format_optional(inst.total_supply))),
        Line::from(format!(" Max         {}", format_optional(inst.max_supply))),
    ];
    frame.render_widget(Paragraph::new(stats), layout[0]);

    match state {
        DetailState::Loading => {
            let msg = Paragraph::new("Loading chart...")
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            frame.render_widget(msg, layout[1]);
        }
        DetailState::Empty => {
            let msg = Paragraph::new("Chart data unavailable")
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center);
            frame.render_widget(msg, layout[1]);
        }
        DetailState::Ready(view) if view.points.is_empty() => {
            let msg = Paragraph::new("No chart data for the last 24h")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            frame.render_widget(msg, layout[1]);
        }
        DetailState::Ready(view) => render_price_chart(frame, layout[1], view),
    }
}

fn render_price_chart(frame: &mut Frame, area: Rect, view: &ChartView) {
    let data: Vec<(f64, f64)> = view
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.price))
        .collect();

    let (mut lo, mut hi) = data
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if hi - lo < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let x_max = (data.len().saturating_sub(1)).max(1) as f64;

    let first = view.points.first().map_or("", |p| p.time.as_str());
    let mid = view.points[view.points.len() / 2].time.as_str();
    let last = view.points.last().map_or("", |p| p.time.as_str());

    let dataset = Dataset::default()
        .name("price")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" 24h "),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels([first.to_string(), mid.to_string(), last.to_string()]),
        )
        .y_axis(
            Axis::default()
                .bounds([lo, hi])
                .labels([format_magnitude(lo), format_magnitude(hi)]),
        );
    frame.render_widget(chart, area);
}

/// A rectangle of `percent_x` by `percent_y` centred in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
