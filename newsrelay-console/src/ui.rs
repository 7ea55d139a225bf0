use newsrelay_core::{LoopState, channel_mention};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Wrap},
};

use crate::app::{ActivityKind, App};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, command line, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, input_area, status_area] = chunks else {
        return;
    };

    let state = app.state();
    let header = Paragraph::new(format!(
        "Loop: {state} · {} registered channel(s)",
        app.destinations.len()
    ))
    .style(Style::default().fg(state_color(state)))
    .block(Block::default().borders(Borders::ALL).title("newsrelay"));
    frame.render_widget(header, *header_area);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(*content_area);

    let [channels_area, activity_area] = content_chunks.as_ref() else {
        return;
    };

    draw_destinations(frame, app, *channels_area);
    draw_activity(frame, app, *activity_area);

    let input = Paragraph::new(format!("> {}", app.input))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Command (/setnewschannel <server> <channel> · /fetchnews)"),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(input, *input_area);

    // Status bar
    let nav_hint = "Enter run · Esc clear · Ctrl-C/Ctrl-Q quit";

    let status_text = if app.is_busy {
        format!("Working… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_busy {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_destinations(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let title = "News channels";

    if app.destinations.is_empty() {
        let paragraph = Paragraph::new("No channels yet. Use /setnewschannel <server> <channel>.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = app.destinations.iter().map(|(tenant, destination)| {
        Row::new(vec![
            Cell::from(tenant.to_string()),
            Cell::from(channel_mention(destination)),
        ])
    });

    let column_widths = [Constraint::Percentage(50), Constraint::Percentage(50)];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Server", "Channel"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn draw_activity(frame: &mut Frame<'_>, app: &App, area: Rect) {
    // Newest lines at the bottom; only what fits inside the borders.
    let visible = usize::from(area.height.saturating_sub(2));
    let skip = app.activity.len().saturating_sub(visible);

    let items = if app.activity.is_empty() {
        vec![ListItem::new("Waiting for the first news check…")]
    } else {
        app.activity
            .iter()
            .skip(skip)
            .map(|line| {
                let stamp = line.at.format("%H:%M:%S").to_string();
                ListItem::new(Line::from(vec![
                    Span::styled(stamp, Style::default().fg(Color::DarkGray)),
                    Span::raw(" "),
                    Span::styled(line.text.clone(), Style::default().fg(activity_color(line.kind))),
                ]))
            })
            .collect()
    };

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Activity"));
    frame.render_widget(list, area);
}

fn state_color(state: LoopState) -> Color {
    match state {
        LoopState::Idle => Color::Green,
        LoopState::Polling => Color::Yellow,
        LoopState::Dispatching => Color::Cyan,
        LoopState::Stopped => Color::Red,
    }
}

fn activity_color(kind: ActivityKind) -> Color {
    match kind {
        ActivityKind::Cycle => Color::Gray,
        ActivityKind::Article => Color::White,
        ActivityKind::Reply => Color::Cyan,
        ActivityKind::Failure => Color::Red,
    }
}
