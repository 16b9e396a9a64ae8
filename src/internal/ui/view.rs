use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Tabs, Wrap},
};

use super::app::{Action, App, Mode, PanelOption, PanelState};
use super::keybindings::KeyBindingContext;
use super::sort::SortBy;
use crate::internal::models::Story;
use crate::internal::notification::NotificationType;
use crate::internal::tab::Tab;
use crate::utils::datetime::{format_date, format_relative};
use crate::utils::html::summary_preview;
use crate::utils::url::extract_domain;

const TITLE_MAX_CHARS: usize = 70;
const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Shortens `title` to `max` characters, appending "..." when cut.
pub fn truncate_title(title: &str, max: usize) -> String {
    match title.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &title[..cut]),
        None => title.to_string(),
    }
}

/// Footer summary, e.g. "Showing 15 of 42 stories • Selected: 3".
pub fn footer_summary(tab: &Tab, page_size: usize) -> String {
    let shown = tab.visible_stories(page_size).len();
    let total = tab.filtered_stories.len();
    let selected = match total {
        0 => 0,
        _ => tab.selected_index + 1,
    };
    let mut text = format!("Showing {shown} of {total} stories • Selected: {selected}");
    if !tab.search_query.is_empty() {
        text.push_str(&format!(" • Filtered from {} total", tab.stories.len()));
    }
    text
}

fn sort_label(tab: &Tab) -> String {
    match tab.sort_by {
        SortBy::Comments => "Sort: comments".to_string(),
        SortBy::Date => format!("Sort: date ({})", tab.date_order),
    }
}

fn spinner(app: &App) -> &'static str {
    SPINNER_FRAMES[(app.spinner_state / 6) % SPINNER_FRAMES.len()]
}

#[tracing::instrument(skip(app, f))]
pub fn draw(app: &App, f: &mut Frame) {
    let searching = app
        .active()
        .is_some_and(|t| t.search_mode || !t.search_query.is_empty());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(if searching { 3 } else { 0 }),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(f.area());

    render_tab_bar(app, f, chunks[0]);
    if searching {
        render_search_box(app, f, chunks[1]);
    }
    render_list(app, f, chunks[2]);
    render_status_bar(app, f, chunks[3]);

    match (app.mode, app.panel.as_ref()) {
        (Mode::Drawer, Some(panel)) => render_drawer(app, panel, f, chunks[2]),
        (Mode::Modal, Some(panel)) => render_modal(app, panel, f),
        (Mode::Help, _) => render_help_overlay(app, f),
        _ => {}
    }
}

fn render_tab_bar(app: &App, f: &mut Frame, area: Rect) {
    let titles: Vec<Line> = app
        .tabs
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let marker = match tab.loading() {
                true => format!(" {}", spinner(app)),
                false => String::new(),
            };
            Line::from(format!("{} {}{}", i + 1, tab.title, marker))
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.active_tab)
        .style(Style::default().fg(app.theme.muted).bg(app.theme.background))
        .highlight_style(
            Style::default()
                .fg(app.theme.selection_fg)
                .bg(app.theme.selection_bg)
                .add_modifier(Modifier::BOLD),
        )
        .divider("│");
    f.render_widget(tabs, area);
}

fn render_search_box(app: &App, f: &mut Frame, area: Rect) {
    let Some(tab) = app.active() else {
        return;
    };
    let (text, title) = match tab.search_mode {
        true => (
            format!("{}█", tab.search_query.query),
            " Search (Enter keep, Esc clear) ",
        ),
        false => (tab.search_query.query.clone(), " Filter (/ to edit) "),
    };
    let border = match tab.search_mode {
        true => app.theme.selection_bg,
        false => app.theme.border,
    };

    let search_box = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(app.theme.foreground),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    f.render_widget(search_box, area);
}

fn story_item<'a>(app: &App, tab: &Tab, number: usize, story: &'a Story) -> ListItem<'a> {
    let domain = story
        .url
        .as_deref()
        .and_then(extract_domain)
        .map(|d| format!(" ({d})"))
        .unwrap_or_default();

    let title_line = Line::from(vec![
        Span::styled(
            format!("{number:>3}. "),
            Style::default().fg(app.theme.muted),
        ),
        Span::styled(
            truncate_title(&story.title, TITLE_MAX_CHARS),
            Style::default()
                .fg(app.theme.foreground)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(domain, Style::default().fg(app.theme.muted)),
    ]);

    let mut meta = vec![Span::raw("     ")];
    if tab.info.supports_scores {
        meta.push(Span::styled(
            format!("{} points ", story.score),
            Style::default().fg(app.theme.score),
        ));
    }
    meta.push(Span::styled(
        format!("by {} | {}", story.author, format_relative(story.date, app.unix_now())),
        Style::default().fg(app.theme.muted),
    ));
    if tab.info.supports_comments {
        meta.push(Span::styled(
            format!(" | {} comments", story.comments_count),
            Style::default().fg(app.theme.comments),
        ));
    }

    ListItem::new(vec![title_line, Line::from(meta)])
}

fn render_list(app: &App, f: &mut Frame, area: Rect) {
    let Some(tab) = app.active() else {
        let empty = Paragraph::new("No sources configured")
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.muted));
        f.render_widget(empty, area);
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .title(format!(" {} ", tab.title))
        .title_bottom(Line::from(format!(" {} ", sort_label(tab))).right_aligned())
        .style(Style::default().bg(app.theme.background));

    if let Some(error) = &tab.error {
        let lines = vec![
            Line::from(Span::styled(
                "Failed to load stories",
                Style::default()
                    .fg(app.theme.error)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                error.as_str(),
                Style::default().fg(app.theme.error),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press r to retry",
                Style::default().fg(app.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    }

    if tab.filtered_stories.is_empty() {
        let message = match (tab.loading(), tab.search_query.is_empty()) {
            (true, _) => format!("{} Loading {}...", spinner(app), tab.title),
            (false, false) => "No stories match the search".to_string(),
            (false, true) => "No stories".to_string(),
        };
        let paragraph = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.muted))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let page = app.page_size();
    let items: Vec<ListItem> = tab
        .visible_stories(page)
        .iter()
        .enumerate()
        .map(|(i, story)| story_item(app, tab, tab.scroll_offset + i + 1, story))
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(app.theme.selection_bg)
            .fg(app.theme.selection_fg),
    );

    // The window is computed by the scroll engine; the widget only highlights.
    let mut state = ListState::default();
    state.select(Some(tab.selected_index.saturating_sub(tab.scroll_offset)));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_status_bar(app: &App, f: &mut Frame, area: Rect) {
    let summary = match app.active() {
        Some(tab) => footer_summary(tab, app.page_size()),
        None => String::new(),
    };

    let second = match &app.notification {
        Some(n) => {
            let color = match n.notification_type {
                NotificationType::Info => app.theme.accent,
                NotificationType::Error => app.theme.error,
            };
            Line::from(Span::styled(
                n.message.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
        }
        None => Line::from(Span::styled(
            mode_hint(app.mode),
            Style::default().fg(app.theme.muted),
        )),
    };

    let status = Paragraph::new(vec![
        Line::from(Span::styled(summary, Style::default().fg(app.theme.foreground))),
        second,
    ])
    .style(Style::default().bg(app.theme.background));
    f.render_widget(status, area);
}

fn mode_hint(mode: Mode) -> &'static str {
    match mode {
        Mode::Navigation => "j/k move • Enter actions • / search • s sort • r refresh • ? help • q quit",
        Mode::SearchEntry => "Type to filter • Enter keep • Esc clear",
        Mode::Modal | Mode::Drawer => "j/k choose • Enter confirm • Esc close",
        Mode::Help => "Esc close",
    }
}

fn option_lines<'a>(app: &App, panel: &'a PanelState) -> Vec<Line<'a>> {
    PanelOption::ALL
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let selected = i == panel.cursor;
            let style = match selected {
                true => Style::default()
                    .fg(app.theme.selection_fg)
                    .bg(app.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
                false => Style::default().fg(app.theme.foreground),
            };
            let pointer = if selected { "▶ " } else { "  " };
            Line::from(Span::styled(
                format!("{pointer}{}", option.label(&panel.story)),
                style,
            ))
        })
        .collect()
}

fn render_drawer(app: &App, panel: &PanelState, f: &mut Frame, list_area: Rect) {
    let width = (list_area.width * 2 / 5).max(30).min(list_area.width);
    let area = Rect::new(
        list_area.x + list_area.width - width,
        list_area.y,
        width,
        list_area.height,
    );
    let story = &panel.story;
    let text_width = width.saturating_sub(4).max(10) as usize;

    let mut lines: Vec<Line> = textwrap::wrap(&story.title, text_width)
        .into_iter()
        .map(|l| {
            Line::from(Span::styled(
                l.into_owned(),
                Style::default()
                    .fg(app.theme.foreground)
                    .add_modifier(Modifier::BOLD),
            ))
        })
        .collect();
    lines.push(Line::from(""));

    let muted = Style::default().fg(app.theme.muted);
    let mut byline = format!("by {}", story.author);
    if let Some(date) = format_date(story.date) {
        byline.push_str(&format!(" • {date}"));
    }
    lines.push(Line::from(Span::styled(byline, muted)));
    if story.score > 0 || story.comments_count > 0 {
        lines.push(Line::from(Span::styled(
            format!("{} points • {} comments", story.score, story.comments_count),
            muted,
        )));
    }
    if let Some(url) = &story.url {
        lines.push(Line::from(Span::styled(
            url.as_str(),
            Style::default().fg(app.theme.accent),
        )));
    }

    let summary = story
        .metadata
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if !summary.trim().is_empty() {
        lines.push(Line::from(""));
        for line in summary_preview(summary, text_width, 6) {
            lines.push(Line::from(Span::styled(line, muted)));
        }
    }

    lines.push(Line::from(""));
    lines.extend(option_lines(app, panel));

    let drawer = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.selection_bg))
                .title(" Story ")
                .padding(Padding::horizontal(1))
                .style(Style::default().bg(app.theme.background)),
        );

    f.render_widget(Clear, area);
    f.render_widget(drawer, area);
}

fn render_modal(app: &App, panel: &PanelState, f: &mut Frame) {
    let area = f.area();
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 9.min(area.height.saturating_sub(2));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    let title = truncate_title(
        &panel.story.title,
        popup_width.saturating_sub(8) as usize,
    );
    let mut lines = vec![
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(app.theme.foreground)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(option_lines(app, panel));

    let modal = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.selection_bg))
            .title(" Actions ")
            .padding(Padding::horizontal(1))
            .style(Style::default().bg(app.theme.background)),
    );

    f.render_widget(Clear, popup_area);
    f.render_widget(modal, popup_area);
}

const HELP_SECTIONS: &[(&str, &[(Action, &str)])] = &[
    (
        "Navigation",
        &[
            (Action::MoveDown, "Move down"),
            (Action::MoveUp, "Move up"),
            (Action::JumpToTop, "Jump to top (press twice)"),
            (Action::JumpToBottom, "Jump to bottom"),
            (Action::NextTab, "Next tab"),
            (Action::PrevTab, "Previous tab"),
        ],
    ),
    (
        "Actions",
        &[
            (Action::OpenPanel, "Story actions"),
            (Action::OpenComments, "Open discussion"),
            (Action::OpenArticle, "Open article"),
            (Action::RemoveStory, "Remove story"),
        ],
    ),
    (
        "Search & Sort",
        &[
            (Action::StartSearch, "Search"),
            (Action::ToggleSort, "Toggle sort"),
            (Action::ToggleDateOrder, "Reverse date order"),
        ],
    ),
    (
        "System",
        &[
            (Action::Refresh, "Refresh tab"),
            (Action::ToggleHelp, "Help"),
            (Action::Quit, "Quit"),
        ],
    ),
];

fn render_help_overlay(app: &App, f: &mut Frame) {
    let area = f.area();
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = 30.min(area.height.saturating_sub(2));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    let heading = Style::default()
        .fg(app.theme.accent)
        .add_modifier(Modifier::BOLD);
    let key_style = Style::default().fg(app.theme.score);

    let mut lines = Vec::new();
    for (section, entries) in HELP_SECTIONS {
        lines.push(Line::from(Span::styled(*section, heading)));
        for (action, description) in *entries {
            let mut keys = app.keybindings.keys_for(*action, KeyBindingContext::Navigation);
            if *action == Action::Quit {
                keys.extend(app.keybindings.keys_for(*action, KeyBindingContext::Global));
            }
            if keys.is_empty() {
                continue;
            }
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<16}", keys.join(" / ")), key_style),
                Span::styled(*description, Style::default().fg(app.theme.foreground)),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "  1-9 jump to tab • Esc closes panels",
        Style::default().fg(app.theme.muted),
    )));

    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.selection_bg))
            .title(" Keyboard Shortcuts (Esc to close) ")
            .title_style(
                Style::default()
                    .fg(app.theme.selection_fg)
                    .bg(app.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .padding(Padding::new(1, 1, 1, 0))
            .style(Style::default().bg(app.theme.background)),
    );

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}
