use crate::filter::FilterSpec;
use crate::metrics::GroupMetrics;
use crate::model::Level;
use crate::paginate::{Page, PaginationState};
use crate::pipeline::{AccountDetail, LeaderboardQuery, Pipeline};
use crate::region::Region;
use crate::row::Row;
use crate::sort::{SortDirection, SortKey};
use crate::cutoff;
use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table, TableState},
    Frame, Terminal,
};
use std::fmt::Display;
use std::io;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Leaderboard,
    Levels,
    Regions,
}

impl View {
    pub fn next(&self) -> Self {
        match self {
            View::Leaderboard => View::Levels,
            View::Levels => View::Regions,
            View::Regions => View::Leaderboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            View::Leaderboard => View::Regions,
            View::Levels => View::Leaderboard,
            View::Regions => View::Levels,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            View::Leaderboard => "Leaderboard",
            View::Levels => "By Level",
            View::Regions => "By Region",
        }
    }
}

/// None → first → ... → last → None
fn cycle<T: Copy + PartialEq>(current: Option<T>, all: &[T]) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(value) => {
            let i = all.iter().position(|v| *v == value)?;
            all.get(i + 1).copied()
        }
    }
}

pub struct App {
    pipeline: Arc<Pipeline>,
    reference: NaiveDate,
    pub years: Vec<i32>,
    pub query: LeaderboardQuery,
    pub pagination: PaginationState,
    pub state: TableState,
    pub current_view: View,
    pub show_detail: bool,
}

impl App {
    pub fn new(pipeline: Arc<Pipeline>, reference: NaiveDate, page_size: usize) -> Self {
        let years = pipeline.store().years();
        let year = pipeline.default_year(reference);

        let mut app = Self {
            pipeline,
            reference,
            years,
            query: LeaderboardQuery::as_of(year, reference),
            pagination: PaginationState::new(page_size),
            state: TableState::default(),
            current_view: View::Leaderboard,
            show_detail: false,
        };
        app.reset_selection();
        app
    }

    pub fn total_items(&self) -> usize {
        self.pipeline.rows(&self.query).len()
    }

    pub fn current_page(&self) -> Page<Row> {
        self.pagination.apply(self.pipeline.rows(&self.query).as_slice())
    }

    pub fn selected_row(&self) -> Option<Row> {
        let index = self.state.selected()?;
        self.current_page().items.get(index).cloned()
    }

    pub fn selected_detail(&self) -> Option<AccountDetail> {
        let row = self.selected_row()?;
        self.pipeline.account(&row.id, self.query.year, self.query.cutoff_month_index)
    }

    fn reset_selection(&mut self) {
        if self.current_page().items.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    /// Filter or sort changed: back to the first page
    fn requery(&mut self) {
        self.pagination.reset();
        self.reset_selection();
    }

    pub fn cycle_region(&mut self) {
        self.query.filter.region = cycle(self.query.filter.region, &Region::ALL);
        self.requery();
    }

    pub fn cycle_level(&mut self) {
        self.query.filter.level = cycle(self.query.filter.level, &Level::ALL);
        self.requery();
    }

    pub fn cycle_year(&mut self) {
        if self.years.is_empty() {
            return;
        }
        let i = self.years.iter().position(|&y| y == self.query.year).map(|i| i + 1).unwrap_or(0);
        let year = self.years[i % self.years.len()];
        self.query.year = year;
        self.query.cutoff_month_index = cutoff::cutoff_month_index(year, self.reference);
        self.requery();
    }

    pub fn cycle_sort_key(&mut self) {
        let key = self.query.sort_key.next();
        self.query.sort_key = key;
        self.query.direction = key.default_direction();
        self.requery();
    }

    pub fn toggle_direction(&mut self) {
        self.query.direction = self.query.direction.reversed();
        self.requery();
    }

    pub fn clear_filters(&mut self) {
        self.query.filter = FilterSpec::all();
        self.requery();
    }

    pub fn cycle_page_size(&mut self) {
        self.pagination.cycle_page_size();
        self.reset_selection();
    }

    pub fn next_page(&mut self) {
        let total = self.total_items();
        self.pagination.next(total);
        self.reset_selection();
    }

    pub fn previous_page(&mut self) {
        let total = self.total_items();
        self.pagination.previous(total);
        self.reset_selection();
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    pub fn previous_view(&mut self) {
        self.current_view = self.current_view.previous();
    }

    pub fn next(&mut self) {
        let len = self.current_page().items.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.current_page().items.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn level_breakdown(&self) -> Vec<GroupMetrics<Level>> {
        self.pipeline.level_breakdown(&self.query)
    }

    fn region_breakdown(&self) -> Vec<GroupMetrics<Region>> {
        self.pipeline.region_breakdown(&self.query)
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => app.next_view(),
                KeyCode::BackTab => app.previous_view(),
                KeyCode::Char('r') => app.cycle_region(),
                KeyCode::Char('l') => app.cycle_level(),
                KeyCode::Char('y') => app.cycle_year(),
                KeyCode::Char('s') => app.cycle_sort_key(),
                KeyCode::Char('d') => app.toggle_direction(),
                KeyCode::Char('z') => app.cycle_page_size(),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Char('c') => app.clear_filters(),
                KeyCode::Right | KeyCode::PageDown | KeyCode::Char('n') => app.next_page(),
                KeyCode::Left | KeyCode::PageUp | KeyCode::Char('p') => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs + period
            Constraint::Length(3), // Summary cards
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_summary(f, chunks[1], app);

    match app.current_view {
        View::Leaderboard if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[2]);

            render_leaderboard(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        View::Leaderboard => render_leaderboard(f, chunks[2], app),
        View::Levels => render_breakdown(f, chunks[2], " Performance by Level ", &app.level_breakdown()),
        View::Regions => render_breakdown(f, chunks[2], " Performance by Region ", &app.region_breakdown()),
    }

    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let views = [View::Leaderboard, View::Levels, View::Regions];

    let mut tab_spans = vec![];
    for (i, view) in views.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *view == app.current_view {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(view.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Year {}", app.query.year),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(period_label(app.query.cutoff_month_index), Style::default().fg(Color::Cyan)));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn period_label(cutoff_month_index: usize) -> String {
    match cutoff_month_index {
        0 => "no active months".to_string(),
        12 => "Jan-Dec".to_string(),
        n => match crate::model::Month::from_index(n - 1) {
            Some(last) => format!("Jan-{}", last.short_name()),
            None => String::new(),
        },
    }
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let summary = app.pipeline.summary(&app.query);
    let m = summary.metrics;

    let spans = vec![
        Span::styled(format!(" BELs {} ", summary.bel_count), Style::default().fg(Color::White)),
        Span::raw("│"),
        Span::styled(format!(" Clicks {} ", m.clicks), Style::default().fg(Color::Cyan)),
        Span::raw("│"),
        Span::styled(format!(" Orders {} ", m.orders), Style::default().fg(Color::Cyan)),
        Span::raw("│"),
        Span::styled(format!(" Revenue {:.2} ", m.revenue), Style::default().fg(Color::Green)),
        Span::raw("│"),
        Span::styled(format!(" CVR {:.2}% ", m.cvr), Style::default().fg(Color::Yellow)),
        Span::raw("│"),
        Span::styled(format!(" AOV {:.2} ", m.aov), Style::default().fg(Color::Yellow)),
    ];

    let cards = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::White)));
    f.render_widget(cards, area);
}

fn header_row<'a>(titles: &[&'a str]) -> TableRow<'a> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    TableRow::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Builder => Color::White,
        Level::Enabler => Color::Cyan,
        Level::Exploder => Color::Magenta,
        Level::Leader => Color::Yellow,
    }
}

fn render_leaderboard(f: &mut Frame, area: Rect, app: &mut App) {
    let page = app.current_page();
    let sort_marker = |key: SortKey, title: &'static str| -> String {
        if app.query.sort_key == key {
            let arrow = if app.query.direction == SortDirection::Asc { "▲" } else { "▼" };
            format!("{} {}", title, arrow)
        } else {
            title.to_string()
        }
    };
    let titles: Vec<String> = [
        (SortKey::Id, "Referral ID"),
        (SortKey::Name, "Name"),
        (SortKey::Level, "Level"),
        (SortKey::Clicks, "Clicks"),
        (SortKey::Orders, "Orders"),
        (SortKey::Revenue, "Revenue"),
        (SortKey::Cvr, "CVR %"),
        (SortKey::Aov, "AOV"),
        (SortKey::Region, "Region"),
    ]
    .into_iter()
    .map(|(key, title)| sort_marker(key, title))
    .collect();
    let title_refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let header = header_row(&title_refs);

    let rows = page.items.iter().map(|row| {
        let m = &row.metrics;
        let cells = vec![
            Cell::from(row.id.clone()),
            Cell::from(row.short_name(24)),
            Cell::from(row.level.to_string()).style(Style::default().fg(level_color(row.level))),
            Cell::from(m.clicks.to_string()),
            Cell::from(m.orders.to_string()),
            Cell::from(format!("{:.2}", m.revenue)).style(Style::default().fg(Color::Green)),
            Cell::from(format!("{:.2}", m.cvr)),
            Cell::from(format!("{:.2}", m.aov)),
            Cell::from(row.region.to_string()),
        ];
        TableRow::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(26),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(24),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" BEL Performance "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_breakdown<K: Display>(f: &mut Frame, area: Rect, title: &str, groups: &[GroupMetrics<K>]) {
    let header = header_row(&["Group", "BELs", "Clicks", "Orders", "Revenue", "CVR %", "AOV"]);

    let rows = groups.iter().map(|group| {
        let m = &group.metrics;
        TableRow::new(vec![
            Cell::from(group.key.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
            Cell::from(group.bel_count.to_string()),
            Cell::from(m.clicks.to_string()),
            Cell::from(m.orders.to_string()),
            Cell::from(format!("{:.2}", m.revenue)).style(Style::default().fg(Color::Green)),
            Cell::from(format!("{:.2}", m.cvr)),
            Cell::from(format!("{:.2}", m.aov)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title.to_string()),
    );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let page = app.current_page();
    let filter = &app.query.filter;

    let mut status_spans = vec![Span::styled(
        format!(
            " Page {}/{} · {}-{} of {} · {} per page ",
            if page.total_pages == 0 { 0 } else { page.page_index + 1 },
            page.total_pages,
            page.from,
            page.to,
            page.total_items,
            page.page_size
        ),
        Style::default().fg(Color::Cyan),
    )];

    let active: Vec<String> = [
        filter.region.map(|r| r.to_string()),
        filter.level.map(|l| l.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !active.is_empty() {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(format!("Filter: {}", active.join(", ")), Style::default().fg(Color::Green)));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    for (key, label) in [
        ("r/l/y", " Region/Level/Year | "),
        ("s/d", " Sort | "),
        ("←/→", " Page | "),
        ("z", " Size | "),
        ("Enter", " Months | "),
        ("Tab", " View | "),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::White)));

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Monthly Breakdown ");

    let Some(detail) = app.selected_detail() else {
        f.render_widget(Paragraph::new("No BEL selected").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let row = &detail.row;
    let mut content = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  Name: ", label), Span::raw(row.name.clone())]),
        Line::from(vec![Span::styled("  Referral ID: ", label), Span::raw(row.id.clone())]),
        Line::from(vec![
            Span::styled("  Level: ", label),
            Span::styled(row.level.to_string(), Style::default().fg(level_color(row.level))),
        ]),
        Line::from(vec![
            Span::styled("  Country: ", label),
            Span::raw(format!("{} ({})", row.country, row.region)),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(vec![Span::styled(
            "  Month   Clicks  Orders    Revenue   CVR %",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
    ];

    for point in &detail.monthly {
        let m = point.metrics;
        content.push(Line::from(format!(
            "  {:<6}{:>8}{:>8}{:>11.2}{:>8.2}",
            point.month.short_name(),
            m.clicks,
            m.orders,
            m.revenue,
            m.cvr
        )));
    }

    let ytd = row.metrics;
    content.push(Line::from("  ─────────────────────────────────────"));
    content.push(Line::from(vec![Span::styled(
        format!(
            "  {:<6}{:>8}{:>8}{:>11.2}{:>8.2}",
            "YTD", ytd.clicks, ytd.orders, ytd.revenue, ytd.cvr
        ),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )]));

    if !detail.issues.is_empty() {
        content.push(Line::from(""));
        for issue in &detail.issues {
            content.push(Line::from(Span::styled(
                format!("  ⚠ {}: {}", issue.kind, issue.detail),
                Style::default().fg(Color::Red),
            )));
        }
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(content).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::bel_with_year;
    use crate::store::DataStore;

    fn app(n: usize) -> App {
        let entities = (0..n)
            .map(|i| {
                let code = if i % 2 == 0 { "TW" } else { "DE" };
                bel_with_year(&format!("K{}{:06}", code, i), Level::ALL[i % 4], 2025, &[(100, i as u64 % 7, 10.0)])
            })
            .collect();
        let pipeline = Arc::new(Pipeline::new(Arc::new(DataStore::from_entities(entities))));
        let reference = NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date");
        App::new(pipeline, reference, 10)
    }

    #[test]
    fn test_starts_on_latest_year_first_page() {
        let app = app(23);
        assert_eq!(app.query.year, 2025);
        assert_eq!(app.query.cutoff_month_index, 8);
        assert_eq!(app.current_page().items.len(), 10);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_starts_on_reference_year_when_later_data_exists() {
        let current = bel_with_year("KTWAAAAAA", Level::Leader, 2025, &[(100, 5, 50.0)]);
        let mut next = bel_with_year("KDEBBBBBB", Level::Builder, 2026, &[(40, 2, 20.0)]);
        next.monthly.extend(bel_with_year("KDEBBBBBB", Level::Builder, 2025, &[(60, 3, 30.0)]).monthly);
        let pipeline = Arc::new(Pipeline::new(Arc::new(DataStore::from_entities(vec![current, next]))));
        let reference = NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date");

        let app = App::new(Arc::clone(&pipeline), reference, 10);
        assert_eq!(app.years, vec![2026, 2025]);
        assert_eq!(app.query.year, pipeline.default_year(reference));
        assert_eq!(app.query.year, 2025);
        assert_eq!(app.query.cutoff_month_index, 8);

        let summary = pipeline.summary(&app.query);
        assert_eq!(summary.metrics.clicks, 160);
    }

    #[test]
    fn test_page_size_change_returns_to_first_page() {
        let mut app = app(23);
        app.next_page();
        app.next_page();
        assert_eq!(app.pagination.page_index(), 2);
        app.cycle_page_size();
        assert_eq!(app.pagination.page_index(), 0);
        assert_eq!(app.pagination.page_size(), 25);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut app = app(23);
        app.next_page();
        app.cycle_region();
        assert_eq!(app.query.filter.region, Some(Region::NorthAmerica));
        assert_eq!(app.pagination.page_index(), 0);
        assert_eq!(app.state.selected(), None);
        app.cycle_region();
        assert_eq!(app.query.filter.region, Some(Region::Europe));
        assert_eq!(app.total_items(), 11);
    }

    #[test]
    fn test_cycle_wraps_back_to_all() {
        assert_eq!(cycle(Some(Level::Leader), &Level::ALL), None);
        assert_eq!(cycle(None, &Level::ALL), Some(Level::Builder));
    }

    #[test]
    fn test_period_label() {
        assert_eq!(period_label(8), "Jan-Aug");
        assert_eq!(period_label(12), "Jan-Dec");
        assert_eq!(period_label(0), "no active months");
    }
}
