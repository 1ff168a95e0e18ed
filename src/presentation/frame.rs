use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

pub struct FrameContext<'a> {
    pub title: &'a str,
    pub body: Vec<Line<'static>>,
    pub scroll: u16,
    pub status: &'a str,
    pub help: Option<&'a str>,
    pub global_errors: &'a [String],
}

/// Rows of the terminal available to the scrolling body once the chrome
/// (borders, status, help, global errors) is laid out.
pub fn body_viewport(area: Rect, global_error_count: usize, show_help: bool) -> u16 {
    let mut chrome = 2 + 1; // body borders + status
    if show_help {
        chrome += 1;
    }
    chrome += global_error_count.min(3) as u16;
    area.height.saturating_sub(chrome)
}

pub fn render_frame(frame: &mut Frame<'_>, ctx: FrameContext<'_>) {
    let error_rows = ctx.global_errors.len().min(3) as u16;
    let mut constraints = vec![Constraint::Min(3)];
    if error_rows > 0 {
        constraints.push(Constraint::Length(error_rows));
    }
    constraints.push(Constraint::Length(1));
    if ctx.help.is_some() {
        constraints.push(Constraint::Length(1));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());
    let mut chunk = chunks.iter();

    let body_area = *chunk.next().expect("body chunk");
    let body = Paragraph::new(ctx.body)
        .scroll((ctx.scroll, 0))
        .block(Block::default().title(ctx.title.to_string()).borders(Borders::ALL));
    frame.render_widget(body, body_area);

    if error_rows > 0 {
        let area = *chunk.next().expect("error chunk");
        let lines: Vec<Line<'static>> = ctx
            .global_errors
            .iter()
            .take(error_rows as usize)
            .map(|message| {
                Line::from(Span::styled(
                    format!("✗ {message}"),
                    Style::default().fg(Color::Red),
                ))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }

    let status_area = *chunk.next().expect("status chunk");
    let status = Paragraph::new(Line::from(Span::styled(
        ctx.status.to_string(),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(status, status_area);

    if let Some(help) = ctx.help {
        let help_area = *chunk.next().expect("help chunk");
        let help = Paragraph::new(Line::from(Span::styled(
            help.to_string(),
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(help, help_area);
    }
}
