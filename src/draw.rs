use log::error;
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Tabs};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::components::week_grid::WeekGrid;
use crate::state::app_state::LoadPhase;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use mnps_api::{
    FIRST_WEEK, LAST_WEEK, PLAYOFF_START, REGULAR_SEASON_END, SortDirection, SortKey, SortSpec,
    Standing, TeamId, WeekWindow, aggregate, sort_standings,
};

static TABS: &[&str; 3] = &["Standings", "Weekly", "Playoffs"];

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let result = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
            draw_status(f, layout.status, app);
        }

        match app.state.active_tab {
            MenuItem::Standings => draw_standings(f, layout.main, app),
            MenuItem::Weekly => draw_weekly(f, layout.main, app),
            MenuItem::Playoffs => draw_playoffs(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main, app),
        }

        if app.state.show_logs {
            draw_logs(f, layout.logs);
        }

        draw_loading_spinner(f, f.area(), app, loading);
    });

    if let Err(e) = result {
        error!("failed to draw frame: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Standings => 0,
        MenuItem::Weekly => 1,
        MenuItem::Playoffs => 2,
        MenuItem::Help => match app.state.previous_tab {
            MenuItem::Weekly => 1,
            MenuItem::Playoffs => 2,
            _ => 0,
        },
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

/// One line under the tabs: which season is on screen, or the last error.
fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    if let Some(err) = app.state.last_error.as_deref() {
        let line = Line::from(vec![
            Span::styled(format!(" {err} "), Style::default().fg(Color::Red)),
            Span::styled("(r to retry)", Style::default().fg(Color::DarkGray)),
        ]);
        f.render_widget(Paragraph::new(line), area);
        return;
    }

    let season = &app.state.season;
    let Some(ticket) = season.ticket.as_ref() else {
        let msg = format!(" Loading league {}…", app.active_league().league_id);
        f.render_widget(
            Paragraph::new(msg).style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    };

    let mut parts = vec![format!(
        " {} · {} {}",
        season.league_name,
        ticket.key.season,
        ticket.key.variant.label()
    )];
    match season.current_week() {
        Some(week) => parts.push(format!("week {week}")),
        None => parts.push("final".to_string()),
    }
    if season.rejected > 0 {
        parts.push(format!("{} bad record(s) skipped", season.rejected));
    }
    if let Some(updated) = season.last_updated {
        parts.push(format!("updated {}", updated.format("%b %d %H:%M")));
    }

    let mut spans = vec![Span::styled(
        parts.join(" · "),
        Style::default().fg(Color::Gray),
    )];
    let history = &app.state.history;
    if history.seasons.len() > 1 {
        spans.push(Span::styled(
            format!("  [{}/{}] [ ] season", history.selected + 1, history.seasons.len()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if app.settings.leagues.len() > 1 {
        spans.push(Span::styled("  L league", Style::default().fg(Color::DarkGray)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Placeholder text while nothing is loaded. Returns true when drawn.
fn draw_empty_state(f: &mut Frame, area: Rect, app: &App) -> bool {
    let season = &app.state.season;
    if !season.weeks.is_empty() {
        return false;
    }
    let msg = match (season.phase, app.state.last_error.as_deref()) {
        (_, Some(err)) => format!("Could not load this season:\n{err}\n\nPress r to retry."),
        (LoadPhase::Ready, None) => "No matchups have been played yet.".to_string(),
        _ => "Loading season…".to_string(),
    };
    draw_placeholder(f, area, &msg);
    true
}

fn header_cell(key: SortKey, label: String, sort: SortSpec) -> Cell<'static> {
    if sort.key == key {
        Cell::from(Span::styled(
            format!("{label} {}", sort.direction.arrow()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))
    } else {
        Cell::from(Span::styled(
            label,
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        ))
    }
}

fn draw_standings(f: &mut Frame, area: Rect, app: &App) {
    let season = &app.state.season;
    let sort = app.state.view.sort;
    let title = match season.current_week() {
        Some(week) => format!(" Regular Season · through week {} ", week.min(REGULAR_SEASON_END)),
        None => " Regular Season ".to_string(),
    };
    let block = default_border(Color::White).title(title);

    if draw_empty_state(f, area, app) {
        return;
    }

    let regular = season.regular();
    let qualifiers = season.qualifiers();
    let rows = sort_standings(&regular.standings(&season.directory), sort);

    let header = Row::new(vec![
        Cell::from(""),
        header_cell(SortKey::Name, "Team".into(), sort),
        header_cell(SortKey::TotalPoints, "Points".into(), sort),
        header_cell(SortKey::TotalScore, "MNPS".into(), sort),
        header_cell(SortKey::TopCount, season.variant().top_label(), sort),
        header_cell(SortKey::GamesPlayed, "GP".into(), sort),
        header_cell(SortKey::AverageScore, "Avg".into(), sort),
    ])
    .bottom_margin(1);

    let body: Vec<Row> = rows
        .iter()
        .skip(app.state.view.scroll_offset as usize)
        .map(|standing| {
            let record = &standing.record;
            let marker = if qualifiers.contains(&standing.team_id) {
                Span::styled("●", Style::default().fg(Color::Green))
            } else {
                Span::raw(" ")
            };
            Row::new(vec![
                Cell::from(marker),
                Cell::from(standing.name.clone()),
                Cell::from(format!("{:>8.2}", record.total_points)),
                Cell::from(format!("{:>7.2}", record.total_score)),
                Cell::from(format!("{:>6}", record.top_count)),
                Cell::from(format!("{:>3}", record.games_played)),
                Cell::from(format!("{:>6.2}", record.average_score())),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(10),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(5),
        Constraint::Length(8),
    ];
    let table = Table::new(body, widths)
        .header(header)
        .column_spacing(2)
        .block(block);
    f.render_widget(table, area);
}

fn draw_weekly(f: &mut Frame, area: Rect, app: &App) {
    let season = &app.state.season;
    let view = &app.state.view;
    let block = default_border(Color::White).title(format!(
        " Weekly Points · week {} · * {} ",
        view.selected_week,
        season.variant().top_label()
    ));

    if draw_empty_state(f, area, app) {
        return;
    }

    // Every week shown, playoffs included, under the current sort.
    let all_weeks = aggregate(
        season.weeks.iter(),
        WeekWindow::through(season.played_through().unwrap_or(LAST_WEEK)),
    );
    let rows = sort_standings(&all_weeks.standings(&season.directory), view.sort);

    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        WeekGrid {
            rows: &rows,
            weeks: FIRST_WEEK..=season.last_visible_week(),
            selected_week: view.selected_week,
            scroll_offset: view.scroll_offset,
        },
        inner,
    );
}

fn draw_playoffs(f: &mut Frame, area: Rect, app: &App) {
    let season = &app.state.season;
    let block = default_border(Color::White).title(" Playoffs · top 5 by MNPS ");

    if draw_empty_state(f, area, app) {
        return;
    }

    let playoffs = season.playoffs();
    if playoffs.is_empty() {
        let qualifiers = season.qualifiers();
        let names: Vec<String> = qualifiers
            .iter()
            .map(|id| season.directory.name(*id).into_owned())
            .collect();
        draw_placeholder(
            f,
            area,
            &format!(
                "Playoffs begin in week {PLAYOFF_START}.\n\nCurrent top 5:\n{}",
                names.join("\n")
            ),
        );
        return;
    }

    let leaders = season.playoff_leaders();
    let is_leader =
        |week: u8, team: TeamId| leaders.iter().any(|&(w, t)| w == week && t == team);
    let sort = app.state.view.sort;
    let rows: Vec<Standing> = sort_standings(&playoffs.standings(&season.directory), sort);

    let mut header_cells = vec![header_cell(SortKey::Name, "Team".into(), sort)];
    for week in PLAYOFF_START..=LAST_WEEK {
        header_cells.push(header_cell(SortKey::WeekPoints(week), format!("W{week}"), sort));
    }
    header_cells.push(header_cell(SortKey::TotalPoints, "Points".into(), sort));
    header_cells.push(header_cell(SortKey::TotalScore, "MNPS".into(), sort));

    let body: Vec<Row> = rows
        .iter()
        .map(|standing| {
            let mut cells = vec![Cell::from(standing.name.clone())];
            for week in PLAYOFF_START..=LAST_WEEK {
                let cell = match standing.record.week(week) {
                    Some(c) if is_leader(week, standing.team_id) => Cell::from(Span::styled(
                        format!("{:>7.2}", c.points),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )),
                    Some(c) => Cell::from(format!("{:>7.2}", c.points)),
                    None => Cell::from(Span::styled(
                        format!("{:>7}", "-"),
                        Style::default().fg(Color::DarkGray),
                    )),
                };
                cells.push(cell);
            }
            cells.push(Cell::from(format!("{:>8.2}", standing.record.total_points)));
            cells.push(Cell::from(format!("{:>7.2}", standing.record.total_score)));
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Fill(1)];
    widths.extend((PLAYOFF_START..=LAST_WEEK).map(|_| Constraint::Length(8)));
    widths.extend([Constraint::Length(10), Constraint::Length(9)]);

    let table = Table::new(body, widths)
        .header(Row::new(header_cells).bottom_margin(1))
        .column_spacing(2)
        .block(block);
    f.render_widget(table, area);
}

fn draw_help(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let key = |k: &'static str| Span::styled(format!("{k:>8}  "), Style::default().fg(Color::Yellow));
    let sort = app.state.view.sort;
    let direction = match sort.direction {
        SortDirection::Ascending => "ascending",
        SortDirection::Descending => "descending",
    };
    let lines = vec![
        Line::from(vec![key("1 2 3"), Span::raw("Standings, Weekly, Playoffs")]),
        Line::from(vec![key("n p m"), Span::raw("sort by team, points, MNPS")]),
        Line::from(vec![key("t g a"), Span::raw("sort by top finishes, games, average")]),
        Line::from(vec![key("w"), Span::raw("sort by the selected week's points")]),
        Line::from(vec![key("h l"), Span::raw("select previous / next week")]),
        Line::from(vec![key("j k"), Span::raw("scroll")]),
        Line::from(vec![key("[ ]"), Span::raw("older / newer season")]),
        Line::from(vec![key("L"), Span::raw("next league")]),
        Line::from(vec![key("r"), Span::raw("refresh")]),
        Line::from(vec![key("f"), Span::raw("full screen")]),
        Line::from(vec![key("\""), Span::raw("logs")]),
        Line::from(vec![key("Esc"), Span::raw("close help")]),
        Line::from(vec![key("q"), Span::raw("quit")]),
        Line::from(""),
        Line::from(Span::styled(
            format!("Sorted by {} ({direction})", sort.key.label()),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray));
    f.render_widget(logs, area);
}

fn draw_placeholder(f: &mut Frame, area: Rect, msg: &str) {
    let block = default_border(Color::DarkGray);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(msg.to_string())
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        inner,
    );
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
