use crate::app::App;
use lander_application::session::Connectivity;
use lander_domain::services::formatting::{fmt_optional, fmt_trend, MISSING};
use lander_domain::services::history::TREND_WINDOW;
use lander_domain::value_objects::command::CommandKind;
use lander_domain::value_objects::notification::Severity;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, Paragraph, Wrap,
};
use ratatui::Frame;

pub fn draw(frame: &mut Frame, app: &App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(8),
                Constraint::Length(7),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(outer[3]);

    draw_header(frame, outer[0], app);
    draw_actions(frame, outer[1], app);
    draw_status(frame, outer[2], app);
    draw_rewards(frame, body[0], app);
    draw_assets(frame, body[1], app);
    draw_logs(frame, outer[4], app);
    draw_notification(frame, outer[5], app);
}

fn chip(text: impl Into<String>, color: Color) -> Span<'static> {
    Span::styled(
        format!(" {} ", text.into()),
        Style::default()
            .fg(Color::Black)
            .bg(color)
            .add_modifier(Modifier::BOLD),
    )
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let version = env!("CARGO_PKG_VERSION");
    let git_sha = option_env!("LANDER_GIT_SHA").unwrap_or("unknown");
    let target = option_env!("LANDER_TARGET").unwrap_or("unknown");
    let connectivity = app.session.connectivity();
    let color = match connectivity {
        Connectivity::Online => Color::Green,
        Connectivity::Offline => Color::Red,
        Connectivity::Unknown => Color::Yellow,
    };
    let line = Line::from(vec![
        Span::styled(
            format!("Lunar Lander Console v{version} ({git_sha}, {target})"),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  api={}  ", app.api_base)),
        chip(connectivity.label(), color),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_actions(frame: &mut Frame, area: Rect, app: &App) {
    let availability = app.session.availability();
    let mut spans = Vec::new();
    for (key, kind) in [
        ('s', CommandKind::Start),
        ('x', CommandKind::Stop),
        ('e', CommandKind::Evaluate),
        ('v', CommandKind::RecordVideo),
    ] {
        let style = if availability.allows(kind) {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("[{key}] {}", kind.label()), style));
        spans.push(Span::raw("   "));
    }
    if app.session.in_flight() {
        spans.push(Span::styled(
            format!("{} working...", app.spinner_char()),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(
            Block::default()
                .title("Actions (←/→ weights, ↑/↓ videos, r refresh, q quit)")
                .borders(Borders::ALL),
        ),
        area,
    );
}

fn draw_status(frame: &mut Frame, area: Rect, app: &App) {
    let lines = match app.session.snapshot() {
        None => vec![
            Line::from("Loading status..."),
            Line::from(Span::styled(
                if app.session.is_unreachable() {
                    "status endpoint unreachable, retrying"
                } else {
                    "waiting for the first poll"
                },
                Style::default().fg(Color::DarkGray),
            )),
        ],
        Some(snapshot) => {
            let trend = app.session.derived().reward_trend;
            let trend_color = if trend >= 0.0 { Color::Green } else { Color::Red };
            vec![
                Line::from(vec![
                    if snapshot.running {
                        chip("Training", Color::Green)
                    } else {
                        chip("Idle", Color::Gray)
                    },
                    Span::raw(" "),
                    if snapshot.has_agent {
                        chip("Agent Ready", Color::Cyan)
                    } else {
                        chip("No Agent", Color::Gray)
                    },
                    Span::raw(" "),
                    chip(
                        format!("Trend ({TREND_WINDOW} eps): {}", fmt_trend(trend)),
                        trend_color,
                    ),
                ]),
                Line::from(format!(
                    "Episodes: {}   Last reward: {}   Epsilon: {}   Memory: {}",
                    snapshot.episode_count,
                    fmt_optional(snapshot.last_reward, 1),
                    fmt_optional(snapshot.epsilon, 3),
                    snapshot.memory_size
                )),
            ]
        }
    };
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title("Training").borders(Borders::ALL)),
        area,
    );
}

fn draw_rewards(frame: &mut Frame, area: Rect, app: &App) {
    let derived = app.session.derived();
    if derived.episodes.is_empty() {
        let text = if app.session.is_loading_initial() {
            "Waiting for status..."
        } else {
            "No episodes yet."
        };
        frame.render_widget(
            Paragraph::new(text)
                .block(Block::default().title("Rewards").borders(Borders::ALL))
                .alignment(Alignment::Center),
            area,
        );
        return;
    }

    let points: Vec<(f64, f64)> = derived
        .episodes
        .iter()
        .zip(derived.rewards.iter())
        .map(|(episode, reward)| (*episode as f64, *reward))
        .collect();
    let (x_min, x_max) = x_bounds(&points);
    let (y_min, y_max) = y_bounds(&points);

    let chart = Chart::new(vec![Dataset::default()
        .name("reward")
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points)])
    .block(Block::default().title("Rewards").borders(Borders::ALL))
    .x_axis(
        Axis::default()
            .title("episode")
            .bounds([x_min, x_max])
            .labels(axis_labels(x_min, x_max, 0)),
    )
    .y_axis(
        Axis::default()
            .bounds([y_min, y_max])
            .labels(axis_labels(y_min, y_max, 1)),
    );
    frame.render_widget(chart, area);
}

fn x_bounds(points: &[(f64, f64)]) -> (f64, f64) {
    let x_min = points.first().map(|p| p.0).unwrap_or(0.0);
    let mut x_max = points.last().map(|p| p.0).unwrap_or(x_min + 1.0);
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    (x_min, x_max)
}

fn y_bounds(points: &[(f64, f64)]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (_, y) in points {
        min = min.min(*y);
        max = max.max(*y);
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if max <= min {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

fn axis_labels(min: f64, max: f64, digits: usize) -> Vec<Line<'static>> {
    let mid = (min + max) / 2.0;
    vec![
        Line::from(format!("{min:.digits$}")),
        Line::from(format!("{mid:.digits$}")),
        Line::from(format!("{max:.digits$}")),
    ]
}

fn draw_assets(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(4)].as_ref())
        .split(area);

    let catalog = app.session.catalog();
    let weights_line = if catalog.weights().is_empty() {
        Line::from(Span::styled(
            "No weights available",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let position = catalog
            .weights()
            .iter()
            .position(|w| w == catalog.selected_weights())
            .map(|idx| idx + 1)
            .unwrap_or(0);
        Line::from(format!(
            "Weights: {} ({position}/{})",
            catalog.selected_weights(),
            catalog.weights().len()
        ))
    };
    let last_video = app.session.last_recorded_video().unwrap_or(MISSING);
    frame.render_widget(
        Paragraph::new(vec![weights_line, Line::from(format!("Last video: {last_video}"))])
            .block(Block::default().title("Assets").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        chunks[0],
    );

    let previewed = catalog.previewed_index();
    let mut items: Vec<ListItem> = catalog
        .videos()
        .iter()
        .enumerate()
        .map(|(idx, video)| {
            let style = if Some(idx) == previewed {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(app.video_row(video), style)))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No videos recorded yet"));
    }
    let title = match catalog.previewed_video() {
        Some(video) => format!("Videos  open: {}", app.media_url(&video.url)),
        None => "Videos".to_string(),
    };
    frame.render_widget(
        List::new(items).block(Block::default().title(title).borders(Borders::ALL)),
        chunks[1],
    );
}

fn draw_logs(frame: &mut Frame, area: Rect, app: &App) {
    let max_lines = area.height.saturating_sub(2) as usize;
    let visible = app.logs.lock().window(app.log_scroll, max_lines);
    let text: Vec<Line> = visible.into_iter().map(Line::from).collect();
    frame.render_widget(
        Paragraph::new(text)
            .block(Block::default().title("Logs").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_notification(frame: &mut Frame, area: Rect, app: &App) {
    let Some(notification) = app.notification.as_ref() else {
        return;
    };
    let color = match notification.severity {
        Severity::Success => Color::Green,
        Severity::Info => Color::Blue,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            chip(notification.severity.as_str(), color),
            Span::raw(" "),
            Span::raw(notification.message.clone()),
        ])),
        area,
    );
}
