use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use textwrap::wrap;

use crate::{
    domain::RecordId,
    form::{InlineField, Mode},
};

pub(crate) struct ViewContext<'a> {
    pub title: &'a str,
    pub record: &'a RecordId,
    pub fields: &'a [InlineField],
    pub selected: usize,
    pub status: &'a str,
    pub help: Option<&'a str>,
    pub stale: bool,
}

/// Draw the whole screen. Returns the on-screen area of every field
/// (`Rect::default()` for fields scrolled out of view) for mouse hit-testing.
pub(crate) fn draw(frame: &mut Frame<'_>, ctx: ViewContext<'_>) -> Vec<Rect> {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], &ctx);
    let areas = render_fields(frame, chunks[1], &ctx);
    render_footer(frame, chunks[2], &ctx);
    areas
}

fn render_header(frame: &mut Frame<'_>, area: Rect, ctx: &ViewContext<'_>) {
    let mut spans = vec![
        Span::styled(
            ctx.title.to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  #{}", ctx.record), Style::default().fg(Color::Gray)),
    ];
    if ctx.stale {
        spans.push(Span::styled(
            "  ↻ syncing",
            Style::default().fg(Color::DarkGray),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, ctx: &ViewContext<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let saving = ctx
        .fields
        .iter()
        .filter(|field| field.mode() == Mode::Saving)
        .count();
    let mut status = ctx.status.to_string();
    if saving > 0 {
        status.push_str(&format!(" • {saving} saving"));
    }
    let status_widget = Paragraph::new(status)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status_widget, chunks[0]);

    let help_widget = Paragraph::new(ctx.help.unwrap_or(" ").to_string())
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    frame.render_widget(help_widget, chunks[1]);
}

fn render_fields(frame: &mut Frame<'_>, area: Rect, ctx: &ViewContext<'_>) -> Vec<Rect> {
    let mut areas = vec![Rect::default(); ctx.fields.len()];
    if ctx.fields.is_empty() {
        let placeholder =
            Paragraph::new("No fields configured").block(Block::default().borders(Borders::ALL));
        frame.render_widget(placeholder, area);
        return areas;
    }

    let inner_width = area.width.saturating_sub(2).max(1);
    let rendered: Vec<(Vec<Line<'static>>, u16)> = ctx
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let lines = field_lines(field, idx == ctx.selected, inner_width);
            let height = wrapped_height(&lines, inner_width).saturating_add(2);
            (lines, height)
        })
        .collect();

    let selected = ctx.selected.min(ctx.fields.len() - 1);
    let mut start = 0;
    while start < selected
        && rendered[start..=selected]
            .iter()
            .map(|(_, height)| *height)
            .sum::<u16>()
            > area.height
    {
        start += 1;
    }

    let mut y = area.y;
    let bottom = area.y.saturating_add(area.height);
    for (idx, (lines, height)) in rendered.into_iter().enumerate().skip(start) {
        if y >= bottom {
            break;
        }
        let field_area = Rect::new(area.x, y, area.width, height.min(bottom - y));
        let field = &ctx.fields[idx];
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(field_block(field, idx == selected));
        frame.render_widget(paragraph, field_area);
        areas[idx] = field_area;
        y = y.saturating_add(height);
    }
    areas
}

fn field_block(field: &InlineField, selected: bool) -> Block<'static> {
    let definition = field.controller().definition();
    let mode = field.mode();
    let mut title = format!(" {} ", definition.label);
    if mode != Mode::Viewing {
        title.push_str(&format!("· {mode} "));
    }
    let border = if field.controller().error().is_some() {
        Color::Red
    } else if mode != Mode::Viewing {
        Color::Yellow
    } else if selected {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let mut title_style = Style::default().fg(border);
    if selected {
        title_style = title_style.add_modifier(Modifier::BOLD);
    }
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(title, title_style))
}

fn field_lines(field: &InlineField, selected: bool, width: u16) -> Vec<Line<'static>> {
    let slots = field.slots();
    let mut lines = Vec::new();
    if field.mode() == Mode::Viewing {
        lines.extend(slots.display);
        if selected && let Some(trigger) = slots.trigger {
            lines.push(trigger);
        }
    } else {
        lines.extend(slots.input);
        lines.extend(slots.actions);
    }
    if let Some(error) = slots.error {
        let style = Style::default().fg(Color::Red);
        let text = error.to_string();
        for segment in wrap(&text, width.max(4) as usize) {
            lines.push(Line::from(Span::styled(segment.into_owned(), style)));
        }
    }
    lines
}

fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    u16::try_from(rows.max(1)).unwrap_or(u16::MAX)
}
