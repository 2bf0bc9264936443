use chart_core::{candle_at_x, format_price, Candle, DataOrigin, Layout as ChartLayout};
use chrono::{DateTime, Utc};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::state::AppState;

/// Columns reserved on the right of the chart for price labels.
const PRICE_GUTTER: u16 = 11;
const TOOLTIP_WIDTH: u16 = 26;
const TOOLTIP_HEIGHT: u16 = 7;

pub fn draw(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], state);
    draw_chart(frame, chunks[1], state);
    draw_footer(frame, chunks[2], state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let change = state.change_percent();
    let change_style = if change >= 0.0 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };
    let origin_style = match state.origin {
        DataOrigin::Live => Style::default().fg(Color::Cyan),
        DataOrigin::Synthetic => Style::default().fg(Color::Yellow),
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", state.symbol),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("${} ", format_price(state.last_price, 2))),
        Span::styled(format!("{change:+.1}% ", change = change), change_style),
        Span::styled(format!("[{}] ", state.origin.label()), origin_style),
    ];
    if !state.clock.is_empty() {
        spans.push(Span::styled(
            state.clock.clone(),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let updated = state
        .last_updated_ms
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| format!("updated {}", dt.format("%H:%M:%S")))
        .unwrap_or_default();

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            " [Tab] granularity  [1/4/D] 1H/4H/1D  [R] resync  [Q] quit  ",
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{} {}", state.status, updated),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

fn draw_chart(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(format!(
            " {} - {} candles ",
            state.symbol,
            state.granularity().label()
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.series.is_empty() {
        let text = if state.loading {
            "Loading chart data…"
        } else {
            "No data"
        };
        let placeholder = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(placeholder, inner);
        return;
    }

    // One row at the bottom for time labels, a gutter on the right for
    // prices; the rest is drawing surface, one cell per unit.
    let chart_w = inner.width.saturating_sub(PRICE_GUTTER);
    let chart_h = inner.height.saturating_sub(1);
    if chart_w == 0 || chart_h == 0 {
        return;
    }

    // At most one candle per column.
    let visible = state.series.tail(chart_w as usize);
    let layout = ChartLayout::compute(
        visible,
        state.granularity(),
        chart_w as f64,
        chart_h as f64,
    );

    let buf = frame.buffer_mut();
    paint_grid(buf, inner, chart_w, chart_h, &layout);
    paint_candles(buf, inner, chart_w, chart_h, visible.len(), &layout);
    paint_time_marks(buf, inner, chart_w, chart_h, &layout);
    paint_price_marker(buf, inner, chart_w, chart_h, &layout);

    draw_tooltip(frame, inner, chart_w, chart_h, visible, state);
}

fn cell_row(y: f64, chart_h: u16) -> u16 {
    (y.round() as i64).clamp(0, chart_h.saturating_sub(1) as i64) as u16
}

fn paint_grid(buf: &mut Buffer, inner: Rect, chart_w: u16, chart_h: u16, layout: &ChartLayout) {
    for line in &layout.grid {
        let row = inner.y + cell_row(line.y, chart_h);
        for x in inner.x..inner.x + chart_w {
            if let Some(cell) = buf.cell_mut((x, row)) {
                if cell.symbol() == " " {
                    cell.set_symbol("─").set_fg(Color::DarkGray);
                }
            }
        }
        // Right-aligned price label in the gutter.
        let label = format!("{:>width$}", line.label, width = PRICE_GUTTER as usize - 1);
        buf.set_string(inner.x + chart_w, row, &label, Style::default().fg(Color::Gray));
    }
}

fn paint_candles(
    buf: &mut Buffer,
    inner: Rect,
    chart_w: u16,
    chart_h: u16,
    visible_len: usize,
    layout: &ChartLayout,
) {
    let slot_cells = ((chart_w as usize) / visible_len.max(1)).max(1) as u16;

    for shape in &layout.candles {
        let color = if shape.bullish {
            Color::Green
        } else {
            Color::Red
        };
        let latest = shape.index + 1 == visible_len;
        let mut style = Style::default().fg(color);
        if latest {
            style = style.add_modifier(Modifier::BOLD);
        }

        // Clamp the body to its slot so dense charts keep one candle per
        // column instead of smearing the 4px minimum across neighbours.
        let body_start = (shape.body_x.floor() as i64).clamp(0, chart_w as i64 - 1) as u16;
        let body_cells = (shape.body_w.round() as u16).clamp(1, slot_cells);
        let body_end = (body_start + body_cells - 1).min(chart_w - 1);

        let wick_col =
            ((shape.wick_x.floor() as i64).clamp(body_start as i64, body_end as i64)) as u16;
        let wick_start = cell_row(shape.wick_top, chart_h);
        let wick_end = cell_row(shape.wick_top + shape.wick_h, chart_h);
        for row in wick_start..=wick_end {
            if let Some(cell) = buf.cell_mut((inner.x + wick_col, inner.y + row)) {
                cell.set_symbol("│").set_style(style);
            }
        }

        let top = cell_row(shape.body_top, chart_h);
        let bottom = cell_row(shape.body_top + shape.body_h, chart_h);
        for row in top..=bottom {
            for col in body_start..=body_end {
                if let Some(cell) = buf.cell_mut((inner.x + col, inner.y + row)) {
                    cell.set_symbol("█").set_style(style);
                }
            }
        }
    }
}

fn paint_time_marks(
    buf: &mut Buffer,
    inner: Rect,
    chart_w: u16,
    chart_h: u16,
    layout: &ChartLayout,
) {
    let row = inner.y + chart_h;
    for mark in &layout.time_marks {
        let col = (mark.x.floor() as i64).clamp(0, chart_w as i64 - 1) as u16;
        // Skip labels that would spill past the axis.
        if col as usize + mark.label.len() > chart_w as usize {
            continue;
        }
        buf.set_string(inner.x + col, row, &mark.label, Style::default().fg(Color::Gray));
    }
}

fn paint_price_marker(
    buf: &mut Buffer,
    inner: Rect,
    chart_w: u16,
    chart_h: u16,
    layout: &ChartLayout,
) {
    let Some(marker) = &layout.current else {
        return;
    };
    let color = if marker.bullish {
        Color::Green
    } else {
        Color::Red
    };
    let row = inner.y + cell_row(marker.y, chart_h);
    for x in inner.x..inner.x + chart_w {
        if let Some(cell) = buf.cell_mut((x, row)) {
            if cell.symbol() == " " || cell.symbol() == "─" {
                cell.set_symbol("┄").set_fg(color);
            }
        }
    }
    let label = format!("{:>width$}", marker.label, width = PRICE_GUTTER as usize - 1);
    buf.set_string(
        inner.x + chart_w,
        row,
        &label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    );
}

fn draw_tooltip(
    frame: &mut Frame,
    inner: Rect,
    chart_w: u16,
    chart_h: u16,
    visible: &[Candle],
    state: &AppState,
) {
    let Some((cursor_x, cursor_y)) = state.cursor else {
        return;
    };
    // Only react inside the drawing surface.
    if cursor_x < inner.x
        || cursor_x >= inner.x + chart_w
        || cursor_y < inner.y
        || cursor_y >= inner.y + chart_h
    {
        return;
    }
    let rel_x = (cursor_x - inner.x) as f64;
    let Some(index) = candle_at_x(visible.len(), rel_x, chart_w as f64) else {
        return;
    };
    let candle = &visible[index];

    let time = DateTime::<Utc>::from_timestamp_millis(candle.ts_ms)
        .map(|dt| dt.format("%b %d %H:%M").to_string())
        .unwrap_or_default();
    let lines = vec![
        Line::from(format!("Open  ${}", format_price(candle.open, 2))),
        Line::from(format!("High  ${}", format_price(candle.high, 2))),
        Line::from(format!("Low   ${}", format_price(candle.low, 2))),
        Line::from(format!("Close ${}", format_price(candle.close, 2))),
        Line::from(Span::styled(time, Style::default().fg(Color::DarkGray))),
    ];

    // Flip to the left of the cursor when there is no room on the right.
    let x = if cursor_x + 1 + TOOLTIP_WIDTH <= inner.x + inner.width {
        cursor_x + 1
    } else {
        cursor_x.saturating_sub(TOOLTIP_WIDTH + 1).max(inner.x)
    };
    let y = cursor_y.min((inner.y + inner.height).saturating_sub(TOOLTIP_HEIGHT));
    let popup = Rect {
        x,
        y,
        width: TOOLTIP_WIDTH.min(inner.width),
        height: TOOLTIP_HEIGHT.min(inner.height),
    };

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
        popup,
    );
}
