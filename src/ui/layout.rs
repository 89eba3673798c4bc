use {
    crate::{
        channel::ChannelStats,
        projector::DashboardSnapshot,
        ui::renderer::{clip_label, format_share, format_timestamp},
    },
    ratatui::{
        layout::{Constraint, Direction, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{BarChart, Block, Borders, Paragraph, Row, Sparkline, Table},
        Frame,
    },
};

/// Width of each bar in the cumulative chart
const BAR_WIDTH: u16 = 7;

/// Everything the footer reports besides the snapshot itself
#[derive(Debug, Clone, Copy)]
pub struct StatusLine {
    pub stats: ChannelStats,
    pub source: &'static str,
    pub stream_ended: bool,
}

/// Render the dashboard
pub fn render_layout(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot, status: StatusLine) {
    let chunks = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),      // Header
            Constraint::Percentage(45), // Charts
            Constraint::Min(6),         // Tables
            Constraint::Length(3),      // Footer
        ])
        .split(area);

    render_header(f, chunks[0], snapshot);

    let charts = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    render_time_series(f, charts[0], snapshot);
    render_cumulative_chart(f, charts[1], snapshot);

    let tables = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    render_top_table(f, tables[0], snapshot);
    render_latest_table(f, tables[1], snapshot);

    render_footer(f, chunks[3], snapshot, status);
}

fn render_header(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("detflow - Live Vehicle Detections");

    let last_seen = snapshot
        .time_series
        .last()
        .map(|point| format_timestamp(&point.timestamp))
        .unwrap_or_else(|| "-".to_string());

    let text = vec![
        Line::from(vec![
            Span::styled("detflow", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(format!(" - last update {}", last_seen)),
        ]),
        Line::from(Span::raw("q/Esc quit · r reset session")),
    ];

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn render_time_series(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    // Only the most recent points that fit inside the borders
    let visible = usize::from(area.width.saturating_sub(2));
    let totals: Vec<u64> = snapshot.time_series.iter().map(|point| point.total_count).collect();
    let start = totals.len().saturating_sub(visible);

    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title("Vehicles per update"))
        .data(&totals[start..])
        .style(Style::default().fg(Color::Green));

    f.render_widget(sparkline, area);
}

fn render_cumulative_chart(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let labels: Vec<(String, u64)> = snapshot
        .cumulative
        .iter()
        .map(|(category, count)| (clip_label(category, usize::from(BAR_WIDTH)), count))
        .collect();
    let data: Vec<(&str, u64)> = labels.iter().map(|(label, count)| (label.as_str(), *count)).collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Cumulative by class"))
        .data(data.as_slice())
        .bar_width(BAR_WIDTH)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));

    f.render_widget(chart, area);
}

fn render_top_table(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let header = Row::new(vec!["#", "Class", "Count", "Share"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = snapshot
        .top
        .iter()
        .enumerate()
        .map(|(rank, entry)| {
            let share = snapshot
                .shares
                .iter()
                .find(|share| share.category == entry.category)
                .map(|share| format_share(share.share))
                .unwrap_or_default();
            Row::new(vec![
                format!("{}", rank + 1),
                entry.category.clone(),
                entry.count.to_string(),
                share,
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Min(12),
        Constraint::Length(8),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(format!("Top {}", snapshot.top.len())));

    f.render_widget(table, area);
}

fn render_latest_table(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let header = Row::new(vec!["Class", "Count"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = snapshot
        .latest
        .iter()
        .map(|(category, count)| {
            Row::new(vec![category.to_string(), count.to_string()])
                .style(Style::default().fg(Color::Cyan))
        })
        .collect();

    let widths = [Constraint::Min(12), Constraint::Length(8)];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Latest update"));

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot, status: StatusLine) {
    let (state_label, state_color) = if status.stream_ended {
        ("ENDED", Color::Red)
    } else {
        ("LIVE", Color::Green)
    };

    let text = Line::from(vec![
        Span::styled(state_label, Style::default().fg(state_color).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            " | Source: {} | Events: {} | Classes: {} | Rejected: {} | Rev: {}",
            status.source,
            snapshot.event_count,
            snapshot.cumulative.len(),
            status.stats.rejected,
            snapshot.revision,
        )),
    ]);

    f.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        area,
    );
}
