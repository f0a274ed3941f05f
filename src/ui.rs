use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use arboard::Clipboard;
use ratatui::{
    Frame,
    prelude::*,
    style::Style,
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use rpassword::prompt_password;
use zeroize::Zeroizing;

use crate::filter::ActiveView;
use crate::gate::GateStatus;
use crate::import::{FINAL_STAGE, ImportEvent};
use crate::models::{Category, EntryType, PORTALS, VaultEntry};
use crate::pattern::GRID_SIZE;
use crate::store::EntryStats;

const COLOR_SAND: Color = Color::Rgb(0xEB, 0xDB, 0xB2);
const COLOR_OLIVE: Color = Color::Rgb(0x98, 0x97, 0x1A);
const COLOR_MOSS: Color = Color::Rgb(0x67, 0x67, 0x1C);
const HIDDEN_VALUE: &str = "••••••••";

#[derive(Clone, Copy)]
struct OverlayTheme {
    border: Color,
    title: Color,
    text: Color,
    bg: Color,
}

fn themed_overlay(title: &str) -> OverlayTheme {
    match title {
        "New entry" | "Edit entry" => OverlayTheme {
            border: COLOR_OLIVE,
            title: COLOR_SAND,
            text: COLOR_SAND,
            bg: Color::Rgb(0x1D, 0x21, 0x10),
        },
        "New folder" => OverlayTheme {
            border: Color::Rgb(0x86, 0x86, 0x35),
            title: COLOR_SAND,
            text: Color::Rgb(0xE3, 0xD5, 0xAE),
            bg: Color::Rgb(0x1A, 0x1D, 0x12),
        },
        "Delete entry" | "Delete folder" => OverlayTheme {
            border: Color::Rgb(0xB3, 0x88, 0x45),
            title: Color::Rgb(0xF0, 0xD8, 0xA8),
            text: COLOR_SAND,
            bg: Color::Rgb(0x2A, 0x1C, 0x11),
        },
        "Confirm quit" => OverlayTheme {
            border: Color::Rgb(0xA7, 0xA2, 0x36),
            title: Color::Rgb(0xE6, 0xD8, 0xB2),
            text: COLOR_SAND,
            bg: Color::Rgb(0x25, 0x24, 0x13),
        },
        _ => OverlayTheme {
            border: COLOR_MOSS,
            title: COLOR_SAND,
            text: COLOR_SAND,
            bg: Color::Rgb(0x1E, 0x20, 0x12),
        },
    }
}

fn centered_overlay_area(frame_size: Rect, lines: &[String]) -> Rect {
    let maxw = lines.iter().map(|s| s.chars().count()).max().unwrap_or(0) as u16 + 4;
    let maxh = lines.len() as u16 + 2;
    Rect::new(
        (frame_size.width.saturating_sub(maxw)) / 2,
        (frame_size.height.saturating_sub(maxh)) / 2,
        maxw.min(frame_size.width),
        maxh.min(frame_size.height),
    )
}

fn overlay_block(title: &str, theme: OverlayTheme) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(
            Style::default()
                .fg(theme.border)
                .add_modifier(Modifier::BOLD),
        )
        .style(Style::default().bg(theme.bg))
}

fn render_overlay(f: &mut Frame<'_>, lines: &[String], title: &str) {
    let area = centered_overlay_area(f.size(), lines);
    let theme = themed_overlay(title);
    let paragraph = Paragraph::new(
        lines
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect::<Vec<Line>>(),
    )
    .style(Style::default().fg(theme.text).bg(theme.bg))
    .block(overlay_block(title, theme));
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

/// Tailwind 500 shades for the folder palette tokens.
pub fn palette_color(token: &str) -> Color {
    let name = token
        .strip_prefix("bg-")
        .and_then(|t| t.strip_suffix("-500"))
        .unwrap_or(token);
    match name {
        "blue" => Color::Rgb(0x3B, 0x82, 0xF6),
        "purple" => Color::Rgb(0xA8, 0x55, 0xF7),
        "pink" => Color::Rgb(0xEC, 0x48, 0x99),
        "red" => Color::Rgb(0xEF, 0x44, 0x44),
        "orange" => Color::Rgb(0xF9, 0x73, 0x16),
        "amber" => Color::Rgb(0xF5, 0x9E, 0x0B),
        "yellow" => Color::Rgb(0xEA, 0xB3, 0x08),
        "lime" => Color::Rgb(0x84, 0xCC, 0x16),
        "green" => Color::Rgb(0x22, 0xC5, 0x5E),
        "emerald" => Color::Rgb(0x10, 0xB9, 0x81),
        "teal" => Color::Rgb(0x14, 0xB8, 0xA6),
        "cyan" => Color::Rgb(0x06, 0xB6, 0xD4),
        "indigo" => Color::Rgb(0x63, 0x66, 0xF1),
        "violet" => Color::Rgb(0x8B, 0x5C, 0xF6),
        "fuchsia" => Color::Rgb(0xD9, 0x46, 0xEF),
        "rose" => Color::Rgb(0xF4, 0x3F, 0x5E),
        _ => Color::Rgb(0x64, 0x74, 0x8B),
    }
}

fn type_color(kind: EntryType) -> Color {
    match kind {
        EntryType::Password => palette_color("blue"),
        EntryType::Pin => palette_color("purple"),
        EntryType::Pattern => palette_color("pink"),
        EntryType::SeedPhrase => palette_color("amber"),
        EntryType::SecretKey => palette_color("emerald"),
    }
}

fn glyph(ch: char) -> [&'static str; 3] {
    match ch {
        'S' => ["█▀▀", "▀▀█", "▀▀▀"],
        'E' => ["█▀▀", "█▀▀", "▀▀▀"],
        'C' => ["█▀▀", "█  ", "▀▀▀"],
        'U' => ["█ █", "█ █", "▀▀▀"],
        'R' => ["█▀█", "█▀▄", "▀ ▀"],
        'V' => ["█ █", "█ █", " ▀ "],
        'A' => ["█▀█", "█▀█", "▀ ▀"],
        'L' => ["█  ", "█  ", "▀▀▀"],
        'T' => ["▀█▀", " █ ", " ▀ "],
        _ => ["   ", "   ", "   "],
    }
}

fn banner_lines(text: &str) -> Vec<String> {
    (0..3)
        .map(|row| {
            text.chars()
                .map(|ch| glyph(ch)[row])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

const LOCK_FRAMES: [&[&str]; 4] = [
    &["   ╭───╮   ", "   │   │   ", " ┌─┴───┴─┐ ", " │   ●   │ ", " │   ┃   │ ", " └───────┘ "],
    &["   ╭───╮   ", "   │   │   ", " ┌─┴───┴─┐ ", " │   ●   │ ", " │   ╹   │ ", " └───────┘ "],
    &["   ╭───╮   ", "   │   ╵   ", " ┌─┴─────┐ ", " │   ●   │ ", " │   ╹   │ ", " └───────┘ "],
    &["   ╭───╮   ", "   │       ", " ┌─┴─────┐ ", " │   ○   │ ", " │       │ ", " └───────┘ "],
];

pub const GUIDE_STEPS: [(&str, &str); 6] = [
    (
        "Welcome",
        "Six quick steps to keep your secrets safe. Finish the guide to start using the vault.",
    ),
    (
        "Navigation",
        "←/→ moves between folders and entries. Press w to switch between the vault and the portals list.",
    ),
    (
        "Manage folders",
        "Press f to create a folder for work, personal or social accounts. x deletes one and moves its entries.",
    ),
    (
        "Save secrets",
        "Press n to store a password, PIN, pattern, seed phrase or secret key. Everything is sealed on disk.",
    ),
    (
        "Search",
        "Press / and type part of a title to narrow the list instantly.",
    ),
    (
        "Backup & restore",
        "Press o regularly to export a JSON backup. Press i to merge a backup back in.",
    ),
];

pub fn guide_lines(step: usize) -> Vec<String> {
    let idx = step.min(GUIDE_STEPS.len() - 1);
    let (title, body) = GUIDE_STEPS[idx];
    let mut lines = vec![format!("{}/{}  {title}", idx + 1, GUIDE_STEPS.len()), String::new()];
    lines.extend(wrap_words(body, 56));
    lines.push(String::new());
    lines.push(if idx + 1 == GUIDE_STEPS.len() {
        "← back | Enter finish".to_string()
    } else {
        "← back | → next | Esc close".to_string()
    });
    lines
}

fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Text rendering of a 3×3 pattern. Cells on the shown path carry their
/// 1-based order; the cursor cell is bracketed.
pub fn pattern_grid(points: &[u8], shown: usize, cursor: Option<usize>) -> Vec<String> {
    let path = &points[..shown.min(points.len())];
    (0..GRID_SIZE)
        .map(|row| {
            (0..GRID_SIZE)
                .map(|col| {
                    let cell = row * GRID_SIZE + col;
                    match path.iter().position(|p| *p == cell) {
                        Some(i) if cursor == Some(i) => format!("[{}]", i + 1),
                        Some(i) => format!("({})", i + 1),
                        None => " · ".to_string(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Seed words numbered three to a line.
pub fn numbered_words(phrase: &str) -> Vec<String> {
    let words: Vec<String> = phrase
        .split_whitespace()
        .enumerate()
        .map(|(i, w)| format!("{:>2}. {w:<12}", i + 1))
        .collect();
    words
        .chunks(3)
        .map(|chunk| chunk.concat().trim_end().to_string())
        .collect()
}

pub struct FolderRow<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub count: usize,
}

/// Pattern shown in the detail pane, possibly mid-playback.
pub struct PatternView {
    pub points: Vec<u8>,
    pub shown: usize,
    pub cursor: Option<usize>,
}

pub struct ImportView<'a> {
    pub events: &'a [ImportEvent],
    pub finished: bool,
}

pub struct ViewState<'a> {
    pub folders: Vec<FolderRow<'a>>,
    pub folder_idx: usize,
    pub categories: &'a [Category],
    pub entries: Vec<&'a VaultEntry>,
    pub entry_idx: usize,
    pub focus_folders: bool,
    pub view: ActiveView,
    pub portal_idx: usize,
    pub search: &'a str,
    pub searching: bool,
    pub reveal: bool,
    pub detail_pattern: Option<PatternView>,
    pub stats: EntryStats,
    pub clock: String,
    pub overlay: Option<Vec<String>>,
    pub overlay_title: Option<String>,
    pub import: Option<ImportView<'a>>,
    pub status: &'a str,
}

pub struct UnlockState<'a> {
    pub mode: GateStatus,
    pub confirming: bool,
    pub status: &'a str,
    pub input_display: &'a str,
    pub input_visible: bool,
    pub anim_frame: usize,
}

pub fn draw(f: &mut Frame<'_>, state: &ViewState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(f.size());

    draw_header(f, layout[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25), // folders
            Constraint::Percentage(35), // entries
            Constraint::Percentage(40), // detail
        ])
        .split(layout[1]);

    draw_folders(f, body[0], state);
    match state.view {
        ActiveView::Vault => {
            draw_entries(f, body[1], state);
            draw_detail(f, body[2], state);
        }
        ActiveView::Portals => {
            let area = Rect::new(body[1].x, body[1].y, body[1].width + body[2].width, body[1].height);
            draw_portals(f, area, state.portal_idx);
        }
    }

    let footer_line = if state.searching {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(COLOR_OLIVE).add_modifier(Modifier::BOLD)),
            Span::raw(format!("{}▏", state.search)),
        ])
    } else {
        Line::from(state.status.to_string())
    };
    let footer = Paragraph::new(footer_line).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, layout[2]);

    if let Some(import) = &state.import {
        draw_import(f, import);
    }

    if let Some(lines) = &state.overlay {
        let title = state.overlay_title.as_deref().unwrap_or("SecureVault");
        render_overlay(f, lines, title);
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, state: &ViewState) {
    let mut spans = vec![
        Span::styled(
            "SecureVault ",
            Style::default().fg(COLOR_SAND).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("| {} items ", state.stats.total)),
    ];
    for (kind, count) in &state.stats.by_type {
        spans.push(Span::raw("| "));
        spans.push(Span::styled(
            format!("{kind} {count} "),
            Style::default().fg(type_color(*kind)),
        ));
    }
    spans.push(Span::styled(
        format!("| {}", state.clock),
        Style::default().fg(Color::DarkGray),
    ));
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_folders(f: &mut Frame<'_>, area: Rect, state: &ViewState) {
    let items: Vec<ListItem> = state
        .folders
        .iter()
        .map(|row| {
            ListItem::new(Line::from(vec![
                Span::styled("■ ", Style::default().fg(palette_color(row.color))),
                Span::raw(format!("{} ", row.name)),
                Span::styled(format!("({})", row.count), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    let mut list_state = ListState::default();
    if !state.folders.is_empty() && state.view == ActiveView::Vault {
        list_state.select(Some(state.folder_idx.min(state.folders.len() - 1)));
    }
    let list = List::new(items)
        .block(Block::default().title("Folders").borders(Borders::ALL))
        .highlight_symbol("▶ ")
        .highlight_style(if state.focus_folders {
            Style::default()
                .fg(Color::Cyan)
                .bg(Color::Rgb(40, 40, 40))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        });
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_entries(f: &mut Frame<'_>, area: Rect, state: &ViewState) {
    let items: Vec<ListItem> = if state.entries.is_empty() {
        vec![ListItem::new(if state.search.is_empty() {
            "No entries"
        } else {
            "Nothing matches"
        })]
    } else {
        state
            .entries
            .iter()
            .map(|e| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{} ", e.title)),
                    Span::styled(
                        format!("[{}]", e.kind),
                        Style::default().fg(type_color(e.kind)).add_modifier(Modifier::BOLD),
                    ),
                ]))
            })
            .collect()
    };
    let mut list_state = ListState::default();
    if !state.entries.is_empty() {
        list_state.select(Some(state.entry_idx.min(state.entries.len() - 1)));
    }
    let title = if state.search.is_empty() {
        "Entries".to_string()
    } else {
        format!("Entries matching '{}'", state.search)
    };
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_symbol("▶ ")
        .highlight_style(if !state.focus_folders {
            Style::default()
                .fg(Color::Yellow)
                .bg(Color::Rgb(40, 40, 40))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        });
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_detail(f: &mut Frame<'_>, area: Rect, state: &ViewState) {
    let selected = state
        .entries
        .get(state.entry_idx.min(state.entries.len().saturating_sub(1)));
    let Some(entry) = selected else {
        let empty = Paragraph::new("No entry selected.")
            .block(Block::default().title("Details").borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    };

    let folder = state
        .categories
        .iter()
        .find(|c| c.id == entry.category_id)
        .map(|c| c.name.as_str())
        .unwrap_or("-");
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Type: "),
            Span::styled(
                entry.kind.label(),
                Style::default().fg(type_color(entry.kind)).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!("Folder: {folder}")),
    ];
    if let Some(user) = &entry.username {
        lines.push(Line::from(format!(
            "Username: {}",
            if state.reveal { user.as_str() } else { HIDDEN_VALUE }
        )));
    }
    if let Some(issuer) = &entry.issuer {
        lines.push(Line::from(format!(
            "Issuer: {}",
            if state.reveal { issuer.as_str() } else { HIDDEN_VALUE }
        )));
    }
    lines.push(Line::from(""));

    match (&state.detail_pattern, entry.kind) {
        (Some(pattern), _) => {
            let label = if pattern.cursor.is_some() || pattern.shown < pattern.points.len() {
                "Pattern (playing)"
            } else {
                "Pattern"
            };
            lines.push(Line::from(label));
            for row in pattern_grid(&pattern.points, pattern.shown, pattern.cursor) {
                lines.push(Line::from(Span::styled(
                    format!("  {row}"),
                    Style::default().fg(type_color(EntryType::Pattern)),
                )));
            }
        }
        (None, EntryType::SeedPhrase) if state.reveal => {
            lines.push(Line::from("Seed phrase:"));
            lines.extend(numbered_words(&entry.value).into_iter().map(Line::from));
        }
        (None, _) => {
            let value = if state.reveal {
                entry.value.clone()
            } else if entry.value.is_empty() {
                "(empty)".to_string()
            } else {
                HIDDEN_VALUE.to_string()
            };
            lines.push(Line::from(format!("Value: {value}")));
        }
    }

    if let Some(notes) = &entry.notes {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("Notes: {notes}")));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "Created {} | Modified {}",
            format_millis(entry.created_at),
            format_millis(entry.last_modified)
        ),
        Style::default().fg(Color::DarkGray),
    )));

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(format!("Details: {}", entry.title)).borders(Borders::ALL));
    f.render_widget(detail, area);
}

fn format_millis(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn draw_portals(f: &mut Frame<'_>, area: Rect, selected: usize) {
    let items: Vec<ListItem> = PORTALS
        .iter()
        .map(|p| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    p.title,
                    Style::default().fg(COLOR_SAND).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(p.url, Style::default().fg(Color::Cyan))),
                Line::from(p.description),
                Line::from(""),
            ])
        })
        .collect();
    let mut list_state = ListState::default();
    list_state.select(Some(selected.min(PORTALS.len() - 1)));
    let list = List::new(items)
        .block(
            Block::default()
                .title("Portals (Enter copies link, w back)")
                .borders(Borders::ALL),
        )
        .highlight_symbol("▶ ")
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 40)));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_import(f: &mut Frame<'_>, import: &ImportView) {
    let size = f.size();
    let width = 64.min(size.width);
    let height = (import.events.len() as u16 + 7).min(size.height);
    let area = Rect::new(
        size.width.saturating_sub(width) / 2,
        size.height.saturating_sub(height) / 2,
        width,
        height,
    );
    let theme = themed_overlay("Import");
    let block = overlay_block("Import", theme);
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let last = import.events.last();
    let failed = last.is_some_and(|e| e.is_error);
    let stage = last.map(|e| e.stage).unwrap_or(0);
    let percent = (u16::from(stage) * 100 / u16::from(FINAL_STAGE)).min(100);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(if failed { Color::Red } else { COLOR_OLIVE }))
        .percent(percent)
        .label(format!("stage {stage}/{FINAL_STAGE}"));
    f.render_widget(gauge, parts[0]);

    let log: Vec<Line> = import
        .events
        .iter()
        .map(|e| {
            let style = if e.is_error {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            };
            Line::from(Span::styled(format!("[{}] {}", e.stage, e.message), style))
        })
        .collect();
    f.render_widget(
        Paragraph::new(log).wrap(Wrap { trim: true }).style(Style::default().bg(theme.bg)),
        parts[1],
    );

    let hint = if import.finished {
        "Enter/Esc close"
    } else {
        "working..."
    };
    f.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray).bg(theme.bg)),
        parts[2],
    );
}

pub fn draw_unlock(f: &mut Frame<'_>, state: &UnlockState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),  // top padding
            Constraint::Length(4),  // banner
            Constraint::Length(6),  // input
            Constraint::Length(7),  // lock animation
            Constraint::Min(0),
            Constraint::Length(3),  // footer
        ])
        .split(f.size());

    let banner: Vec<Line> = banner_lines("SECURE VAULT")
        .into_iter()
        .map(|l| {
            Line::from(Span::styled(
                l,
                Style::default().fg(COLOR_SAND).add_modifier(Modifier::BOLD),
            ))
        })
        .collect();
    f.render_widget(
        Paragraph::new(banner).alignment(Alignment::Center),
        layout[1],
    );

    let box_width: u16 = 44;
    let input_area = layout[2];
    let w = box_width.min(input_area.width);
    let x = input_area.x + input_area.width.saturating_sub(w) / 2;
    let label_area = Rect::new(x, input_area.y, w, 1);
    let box_area = Rect::new(x, input_area.y + 1, w, 3);

    let label = match (state.mode, state.confirming) {
        (GateStatus::Setup, false) => "Create a master password",
        (GateStatus::Setup, true) => "Type it again to confirm",
        (GateStatus::Locked, _) => "Enter the master password",
    };
    f.render_widget(
        Paragraph::new(label)
            .alignment(Alignment::Center)
            .style(Style::default().fg(COLOR_SAND).add_modifier(Modifier::BOLD)),
        label_area,
    );

    let prompt = Paragraph::new(Span::styled(
        format!("> {}", state.input_display),
        Style::default().fg(COLOR_SAND),
    ))
    .block(
        Block::default().borders(Borders::ALL).title(if state.input_visible {
            "Password (visible)"
        } else {
            "Password (hidden)"
        }),
    );
    f.render_widget(prompt, box_area);

    let frame = LOCK_FRAMES[state.anim_frame % LOCK_FRAMES.len()];
    let anim: Vec<Line> = frame
        .iter()
        .map(|l| Line::from(Span::styled(*l, Style::default().fg(COLOR_MOSS))))
        .collect();
    f.render_widget(Paragraph::new(anim).alignment(Alignment::Center), layout[3]);

    let footer = Paragraph::new(state.status.to_string()).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, layout[5]);
}

/// Puts `text` on the clipboard and wipes it after `lifetime`.
pub fn copy_to_clipboard(text: &str, lifetime: Duration) -> Result<()> {
    let mut clipboard = Clipboard::new().map_err(|e| anyhow!("Clipboard unavailable: {e}"))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|e| anyhow!("Failed to set clipboard: {e}"))?;
    thread::spawn(move || {
        thread::sleep(lifetime);
        let _ = clipboard.set_text(String::new());
    });
    Ok(())
}

pub fn prompt_secret(label: &str) -> Result<Zeroizing<String>> {
    Ok(Zeroizing::new(prompt_password(label)?))
}
