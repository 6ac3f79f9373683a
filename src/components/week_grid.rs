use mnps_api::{Standing, WeekNumber};
use std::ops::RangeInclusive;
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::widgets::Widget;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Team name column, including one space of padding.
const NAME_WIDTH: u16 = 20;

/// Week columns: right-aligned `123.45*`.
pub const CELL_WIDTH: u16 = 8;

/// Header rows above the team rows.
const HEADER_HEIGHT: u16 = 2;

/// Team-by-week table of raw points. Top performers carry a `*` and the
/// selected week is highlighted.
///
/// ```text
/// Team                    W1      W2      W3
/// ──────────────────────────────────────────
/// Gridiron Gurus     142.30*  98.10   121.84*
/// ```
pub struct WeekGrid<'a> {
    /// Rows in display order.
    pub rows: &'a [Standing],
    pub weeks: RangeInclusive<WeekNumber>,
    pub selected_week: WeekNumber,
    pub scroll_offset: u16,
}

impl WeekGrid<'_> {
    /// Weeks that fit in `width`, shifted right far enough to keep the
    /// selected week on screen.
    fn visible_weeks(&self, width: u16) -> RangeInclusive<WeekNumber> {
        let (first, last) = (*self.weeks.start(), *self.weeks.end());
        let fit = (width.saturating_sub(NAME_WIDTH) / CELL_WIDTH).max(1);
        let fit = u8::try_from(fit).unwrap_or(u8::MAX);

        let mut start = first;
        if self.selected_week >= start.saturating_add(fit) {
            start = self.selected_week.saturating_sub(fit - 1);
        }
        let end = start.saturating_add(fit - 1).min(last);
        start..=end
    }
}

impl Widget for WeekGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < NAME_WIDTH + CELL_WIDTH || area.height <= HEADER_HEIGHT {
            return;
        }

        let header = Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD);
        let selected_header = header.fg(Color::Yellow).add_modifier(Modifier::UNDERLINED);
        let dim = Style::default().fg(Color::DarkGray);

        let visible = self.visible_weeks(area.width);

        buf.set_string(area.x, area.y, "Team", header);
        for (i, week) in visible.clone().enumerate() {
            let x = area.x + NAME_WIDTH + i as u16 * CELL_WIDTH;
            let label = format!("{:>width$}", format!("W{week}"), width = CELL_WIDTH as usize - 1);
            let style = if week == self.selected_week {
                selected_header
            } else {
                header
            };
            buf.set_string(x, area.y, label, style);
        }
        buf.set_string(
            area.x,
            area.y + 1,
            "─".repeat(area.width as usize),
            dim,
        );

        let body_height = area.height - HEADER_HEIGHT;
        for (row_idx, standing) in self
            .rows
            .iter()
            .skip(self.scroll_offset as usize)
            .take(body_height as usize)
            .enumerate()
        {
            let y = area.y + HEADER_HEIGHT + row_idx as u16;
            buf.set_string(
                area.x,
                y,
                truncate(&standing.name, NAME_WIDTH as usize - 1),
                Style::default().fg(Color::White),
            );

            for (i, week) in visible.clone().enumerate() {
                let x = area.x + NAME_WIDTH + i as u16 * CELL_WIDTH;
                let (text, mut style) = match standing.record.week(week) {
                    Some(cell) if cell.is_top => (
                        format!("{:>7}", format!("{:.2}*", cell.points)),
                        Style::default().fg(Color::Green),
                    ),
                    Some(cell) => (format!("{:>6.2} ", cell.points), Style::default()),
                    None => (format!("{:>6} ", "-"), dim),
                };
                if week == self.selected_week {
                    style = style.add_modifier(Modifier::BOLD);
                }
                buf.set_string(x, y, text, style);
            }
        }
    }
}

fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        name.to_string()
    } else {
        let mut out: String = name.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
