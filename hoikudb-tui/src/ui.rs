use hoikudb_core::{
    model::{AgeClass, Facility},
    overlay::OverlayKind,
};
use ratatui::{
    prelude::*,
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
        TableState, Wrap,
        canvas::{Canvas, Points},
    },
};

use crate::app::App;

const SOURCE_URL: &str =
    "https://www.city.yokohama.lg.jp/kosodate-kyoiku/hoiku-yoji/shisetsu/riyou/info/nyusho-jokyo.html";

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: control island, map, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [island_area, content_area, status_area] = chunks else {
        return;
    };

    draw_island(frame, app, *island_area);
    draw_map(frame, app, *content_area);

    match app.session.overlay().kind() {
        OverlayKind::Closed if app.show_source => draw_source(frame, *content_area),
        OverlayKind::Closed => {}
        OverlayKind::Ward => draw_ward_panel(frame, app, popup(*content_area, 40, 80)),
        OverlayKind::Filter => draw_filter_panel(frame, app, popup(*content_area, 50, 70)),
        OverlayKind::Detail => draw_detail(frame, app, popup(*content_area, 70, 70)),
    }

    draw_status(frame, app, *status_area);
}

fn draw_island(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let ward = app
        .session
        .selected_area()
        .map_or("区を選択してください", |area| area.as_str());

    let mut spans = vec![
        Span::styled("保育DB", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {ward}  ")),
    ];
    // hints stay hidden while a panel has focus
    if !app.island.any_open {
        spans.push(Span::styled(
            "[w] 区別  [f] 表示条件  [i] 出典",
            Style::default().fg(Color::Cyan),
        ));
    }

    let island = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("hoikudb"));
    frame.render_widget(island, area);
}

fn draw_source(frame: &mut Frame<'_>, area: Rect) {
    let width = area.width.min(60);
    let popover = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y,
        width,
        height: area.height.min(8),
    };

    let text = vec![
        Line::from("データ出典: 横浜市 (CC BY 4.0)"),
        Line::from(Span::styled(SOURCE_URL, Style::default().fg(Color::Blue))),
        Line::from("本サービス「保育DB」は上記公開データを基に一部加工して利用しています。"),
        Line::from(Span::styled(
            "※本サービスは横浜市の公式サイトではなく、横浜市による保証・後援を受けていません。",
            Style::default().fg(Color::Gray),
        )),
    ];
    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("データ出典 (i/Esc)"),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, popover);
    frame.render_widget(paragraph, popover);
}

fn draw_map(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [canvas_area, list_area] = chunks else {
        return;
    };

    let map = app.session.bridge();
    let view = map.viewport();
    let marker_color = if map.is_covered() {
        Color::DarkGray
    } else {
        Color::LightBlue
    };

    let coords: Vec<(f64, f64)> = map
        .facilities()
        .iter()
        .map(|facility| (facility.location.longitude, facility.location.latitude))
        .collect();
    let cursor = map
        .cursor_facility()
        .map(|facility| (facility.location.longitude, facility.location.latitude));

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Map ({} facilities)", coords.len())),
        )
        .x_bounds([view.min_lon, view.max_lon])
        .y_bounds([view.min_lat, view.max_lat])
        .paint(move |ctx| {
            ctx.draw(&Points {
                coords: &coords,
                color: marker_color,
            });
            if let Some((lon, lat)) = cursor {
                ctx.print(lon, lat, Span::styled("◎", Style::default().fg(Color::Yellow)));
            }
        });
    frame.render_widget(canvas, *canvas_area);

    let items = if map.facilities().is_empty() {
        vec![ListItem::new("No facilities match the current conditions.")]
    } else {
        map.facilities()
            .iter()
            .map(|facility| ListItem::new(facility.name.clone()))
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Facilities (j/k, Enter)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !map.facilities().is_empty() {
        state.select(Some(map.cursor()));
    }
    frame.render_stateful_widget(list, *list_area, &mut state);
}

fn draw_ward_panel(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let items = app
        .areas
        .iter()
        .enumerate()
        .map(|(idx, ward)| {
            let prefix = if idx == app.ward_list_index {
                "> "
            } else {
                "  "
            };
            ListItem::new(format!("{prefix}{ward}"))
        })
        .collect::<Vec<ListItem<'_>>>();

    let title = if app.session.overlay().is_ward_chosen() {
        "区別 (↑/↓, Enter, Esc)"
    } else {
        "区を選択してください (↑/↓, Enter)"
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.areas.is_empty() {
        state.select(Some(app.ward_list_index));
    }
    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_filter_panel(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // name
            Constraint::Min(0),    // age constraints
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [name_area, ages_area] = chunks else {
        return;
    };

    let criteria = app.session.criteria();
    let name = Paragraph::new(criteria.name.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("施設名で検索 (type to edit)"),
        )
        .wrap(Wrap { trim: true });

    let rows = AgeClass::ALL.iter().map(|age| {
        let threshold = criteria
            .constraint_for(*age)
            .map_or_else(|| "-".to_owned(), |constraint| format!("≥ {}", constraint.min_available()));
        Row::new(vec![Cell::from(age.label()), Cell::from(threshold)])
    });

    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(8)])
        .header(
            Row::new(vec!["年齢", "空き枠"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("表示条件 (↑/↓, Enter toggle, ←/→ adjust, Del 検索条件をリセット, Esc)"),
        )
        .row_highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default();
    state.select(Some(app.age_list_index));

    frame.render_widget(Clear, area);
    frame.render_widget(name, *name_area);
    frame.render_stateful_widget(table, *ages_area, &mut state);
}

fn draw_detail(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(facility) = app.session.overlay().selected_facility() else {
        return;
    };

    let reported = facility
        .stats
        .reported_on()
        .map_or_else(|| "no statistics".to_owned(), |date| date.format("%Y/%m/%d").to_string());
    let title = format!("{} ({reported}) (Esc to close)", facility.name);

    frame.render_widget(Clear, area);

    if facility.stats.is_empty() {
        let paragraph = Paragraph::new("この施設の統計データはありません。")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = AgeClass::ALL.iter().map(|age| stat_row(facility, *age));

    let column_widths = [
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Min(8),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["年齢", "受入可能", "待機", "入所", "空き"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn stat_row(facility: &Facility, age: AgeClass) -> Row<'static> {
    let stats = &facility.stats;
    let available = stats.available(age);
    let style = if available > 0 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    };

    Row::new(vec![
        Cell::from(age.label()),
        Cell::from(stats.accepted(age).to_string()),
        Cell::from(stats.waiting(age).to_string()),
        Cell::from(stats.enrolled(age).to_string()),
        Cell::from(available.to_string()),
    ])
    .style(style)
}

fn draw_status(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let nav_hint = match app.session.overlay().kind() {
        OverlayKind::Closed => {
            "←/→/↑/↓ pan · +/- zoom · j/k move · Enter detail · z zoom in · r reload · i source · q quit"
        }
        OverlayKind::Ward => "↑/↓ move · Enter select ward · Esc close · Ctrl-C quit",
        OverlayKind::Filter => {
            "Type name · ↑/↓ age · Enter toggle · ←/→ threshold · Del reset · Esc close"
        }
        OverlayKind::Detail => "Esc/Enter close · Ctrl-C quit",
    };

    let loaded = app
        .loaded_at
        .map(|at| format!("updated {} · ", at.format("%H:%M")))
        .unwrap_or_default();

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} (Esc to dismiss) · {nav_hint}")
    } else {
        format!("{loaded}{nav_hint}")
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, area);
}

// Centered rectangle taking the given percentages of `area`.
fn popup(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let Some(middle) = vertical.get(1) else {
        return area;
    };

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(*middle);
    horizontal.get(1).copied().unwrap_or(area)
}
