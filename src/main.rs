use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pure_lists::list::Direction as DeleteDirection;
use pure_lists::list::commands::ExecuteOptions;
use pure_lists::render::{CursorVisualPosition, RenderResult, render_document, render_markup};
use pure_lists::theme::Theme;
use pure_lists::{Editor, ListConfig, ListType, Position as CaretPosition, Selection};

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const LOG_FILTER_ENV: &str = "PURE_LISTS_LOG";

const USAGE: &str = "Usage: pure-lists [--config <lists.toml>] [<file.html>]";

const SAMPLE: &str = "<h2>Groceries</h2>\
<ul><li>Fruit<ul><li>Apples</li><li>Pears</li></ul></li>\
<li><p>Bread</p><p>Whole grain, sliced</p></li></ul>\
<p>Steps</p>\
<ol><li>Write the list</li><li>Go shopping</li></ol>\
<ul class=\"todo-list\"><li class=\"todo-list__checked\">Check the fridge</li><li>Pay</li></ul>";

fn main() -> Result<()> {
    run()
}

fn column_distance(a: u16, b: u16) -> u16 {
    if a >= b { a - b } else { b - a }
}

struct Options {
    config: Option<PathBuf>,
    file: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Options>> {
    let mut options = Options {
        config: None,
        file: None,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                options.config = Some(PathBuf::from(path));
            }
            _ => options.file = Some(PathBuf::from(arg)),
        }
    }
    Ok(Some(options))
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging() -> Result<PathBuf> {
    let path = env::temp_dir().join("pure-lists.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_FILTER_ENV)
                .unwrap_or_else(|_| EnvFilter::new("pure_lists=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(path)
}

fn run() -> Result<()> {
    let Some(options) = parse_args()? else {
        eprintln!("{USAGE}");
        return Ok(());
    };
    let log_path = init_logging()?;

    let config = match &options.config {
        Some(path) => ListConfig::load(path).context("failed to load list configuration")?,
        None => ListConfig::default(),
    };
    let mut editor = Editor::builder()
        .with_config(config)
        .build()
        .context("failed to set up the list editor")?;
    let initial_status = load_document(&mut editor, options.file.as_deref())?;
    info!(log = %log_path.display(), "playground started");

    let mut app = App::new(editor, options.file, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn load_document(editor: &mut Editor, path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path.filter(|path| path.exists()) else {
        editor
            .set_data(SAMPLE)
            .context("failed to load the sample document")?;
        let status = match path {
            Some(_) => "New document",
            None => "Sample document",
        };
        return Ok(Some(status.to_string()));
    };

    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    match editor.set_data(&content) {
        Ok(()) => {
            info!(path = %path.display(), blocks = editor.document().len(), "loaded document");
            Ok(None)
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "could not parse document");
            editor
                .set_data(SAMPLE)
                .context("failed to load the sample document")?;
            Ok(Some(format!(
                "Parse error: {err}. Starting with the sample document."
            )))
        }
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    while !app.should_quit {
        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// Commands shown in the status bar, with their shortcut.
const STATUS_COMMANDS: [(&str, &str); 7] = [
    ("bulletedList", "^B"),
    ("numberedList", "^N"),
    ("todoList", "^T"),
    ("indentList", "Tab"),
    ("outdentList", "S-Tab"),
    ("mergeListItemBackward", "Bksp"),
    ("splitListItemBefore", "Enter"),
];

struct App {
    editor: Editor,
    theme: Theme,
    file_path: Option<PathBuf>,
    dirty: bool,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
    scroll_top: usize,
    last_view_height: usize,
    preferred_column: Option<u16>,
    cursor_map: Vec<(CaretPosition, CursorVisualPosition)>,
    last_cursor_visual: Option<CursorVisualPosition>,
}

impl App {
    fn new(editor: Editor, file_path: Option<PathBuf>, initial_status: Option<String>) -> Self {
        Self {
            editor,
            theme: Theme::default(),
            file_path,
            dirty: false,
            should_quit: false,
            status_message: initial_status.map(|message| (message, Instant::now())),
            scroll_top: 0,
            last_view_height: 1,
            preferred_column: None,
            cursor_map: Vec::new(),
            last_cursor_visual: None,
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let status_height = if area.height > 2 { 3 } else { 1 };
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(status_height)])
            .split(area);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(50),
                Constraint::Length(1),
                Constraint::Percentage(50),
            ])
            .split(vertical[0]);
        let model_area = panes[0];
        let scrollbar_area = panes[1];
        let view_area = panes[2];

        let model_block = Block::default().borders(Borders::TOP).title(" Model ");
        let text_area = model_block.inner(model_area);
        let render = render_document(
            self.editor.document(),
            self.editor.selection(),
            text_area.width.max(1) as usize,
            self.editor.last_reconverted(),
            &self.theme,
        );
        self.cursor_map = render.cursor_map.clone();
        self.last_cursor_visual = render.cursor;
        if self.preferred_column.is_none() {
            self.preferred_column = render.cursor.map(|position| position.column);
        }

        let viewport_height = text_area.height as usize;
        self.last_view_height = viewport_height.max(1);
        self.adjust_scroll(&render, viewport_height);

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .block(model_block)
            .style(ratatui::style::Style::default().bg(self.theme.background))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, model_area);

        let mut scrollbar_state = ScrollbarState::new(render.total_lines).position(self.scroll_top);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_style(self.theme.scrollbar_knob_style())
            .track_style(self.theme.scrollbar_track_style());
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);

        if let Some(cursor) = render.cursor {
            if cursor.line >= self.scroll_top
                && cursor.line < self.scroll_top + viewport_height
                && text_area.width > 0
            {
                let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
                let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
                frame.set_cursor_position(Position::new(cursor_x, cursor_y));
            }
        }

        self.draw_view(frame, view_area);
        self.draw_status(frame, vertical[1]);
    }

    fn draw_view(&self, frame: &mut Frame, area: Rect) {
        let fragment = self.editor.view().fragment(self.editor.document());
        let lines = render_markup(&fragment, &self.theme);
        let total = lines.len();
        let scroll = self.scroll_top.min(total.saturating_sub(1));
        let widget = Paragraph::new(Text::from(lines))
            .block(Block::default().borders(Borders::TOP).title(" View "))
            .scroll((scroll as u16, 0));
        frame.render_widget(widget, area);
    }

    fn draw_status(&mut self, frame: &mut Frame, area: Rect) {
        let mut commands = Vec::new();
        for (name, shortcut) in STATUS_COMMANDS {
            if self.editor.command(name).is_none() {
                continue;
            }
            let style = self
                .theme
                .command_style(self.editor.is_enabled(name), self.editor.command_value(name));
            commands.push(Span::styled(format!("{shortcut} {name}"), style));
            commands.push(Span::raw("  "));
        }

        let status_text = self.status_line();
        let mut lines = vec![Line::from(Span::styled(
            status_text,
            self.theme.status_bar_style(),
        ))];
        if area.height > 2 {
            lines.insert(0, Line::from(commands));
        }
        let widget = Paragraph::new(lines).block(Block::default().borders(Borders::TOP));
        frame.render_widget(widget, area);
    }

    fn status_line(&mut self) -> String {
        self.prune_status_message();
        let cursor_details = self.cursor_status_text();
        if let Some((message, _)) = &self.status_message {
            return format!("{cursor_details} | {message}");
        }

        let marker = if self.dirty { "*" } else { "" };
        let file = self
            .file_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "[sample]".to_string());
        format!(
            "{} | {}{} | Blocks: {} | ^X check | Ctrl-S save | Ctrl-Q quit",
            cursor_details,
            file,
            marker,
            self.editor.document().len()
        )
    }

    fn cursor_status_text(&self) -> String {
        let document = self.editor.document();
        let focus = self.editor.selection().focus;
        let Some(index) = document.index_of(focus.block) else {
            return "[?,?]".to_string();
        };
        let mut parts = vec![format!("[{},{}]", index + 1, focus.offset + 1)];
        if let Some(list) = document.get(focus.block).and_then(|block| block.as_list_block()) {
            let list_type = list
                .list_type()
                .map(|list_type| list_type.to_string())
                .unwrap_or_else(|| "?".to_string());
            parts.push(format!(
                "{} item {} indent {}",
                list_type,
                list.item_id(),
                list.indent()
            ));
        }
        parts.join(" ")
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message {
            if instant.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if let Some(cursor) = &render.cursor {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport_height {
                let target = cursor.line.saturating_add(1);
                self.scroll_top = target.saturating_sub(viewport);
            }
        }
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
    }

    // ------------------------------------------------------------------------
    // Caret movement
    // ------------------------------------------------------------------------

    fn caret(&self) -> CaretPosition {
        self.editor.selection().focus
    }

    fn move_caret_to(&mut self, position: CaretPosition) -> bool {
        self.editor
            .set_selection(Selection::collapsed(position))
    }

    fn move_left(&mut self) -> bool {
        let caret = self.caret();
        if caret.offset > 0 {
            return self.move_caret_to(CaretPosition::new(caret.block, caret.offset - 1));
        }
        let previous = self
            .editor
            .document()
            .previous_sibling(caret.block)
            .map(|block| CaretPosition::new(block.id(), block.len()));
        previous.is_some_and(|position| self.move_caret_to(position))
    }

    fn move_right(&mut self) -> bool {
        let caret = self.caret();
        let document = self.editor.document();
        let len = document.get(caret.block).map(|block| block.len()).unwrap_or(0);
        if caret.offset < len {
            return self.move_caret_to(CaretPosition::new(caret.block, caret.offset + 1));
        }
        let next = document
            .next_sibling(caret.block)
            .map(|block| CaretPosition::new(block.id(), 0));
        next.is_some_and(|position| self.move_caret_to(position))
    }

    fn move_to_block_edge(&mut self, end: bool) {
        let caret = self.caret();
        let offset = if end {
            self.editor
                .document()
                .get(caret.block)
                .map(|block| block.len())
                .unwrap_or(0)
        } else {
            0
        };
        self.move_caret_to(CaretPosition::new(caret.block, offset));
        self.preferred_column = None;
    }

    fn move_cursor_vertical(&mut self, delta: i32) {
        let Some(current) = self.last_cursor_visual else {
            return;
        };
        let max_line = self
            .cursor_map
            .iter()
            .map(|(_, visual)| visual.line)
            .max()
            .unwrap_or(0);
        let target_line =
            (current.line as i64 + i64::from(delta)).clamp(0, max_line as i64) as usize;
        let desired_column = self.preferred_column.unwrap_or(current.column);

        let destination = self
            .cursor_map
            .iter()
            .filter(|(_, visual)| visual.line == target_line)
            .min_by_key(|(_, visual)| column_distance(visual.column, desired_column))
            .map(|(position, visual)| (*position, *visual));

        if let Some((position, visual)) = destination {
            if self.move_caret_to(position) {
                self.preferred_column = Some(desired_column);
                self.last_cursor_visual = Some(visual);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return Ok(());
        };

        let control = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Char('q') | KeyCode::Char('c') if control => {
                self.should_quit = true;
            }
            KeyCode::Char('s') if control => {
                self.save()?;
            }
            KeyCode::Char('b') if control => self.toggle_list(ListType::Bulleted)?,
            KeyCode::Char('n') if control => self.toggle_list(ListType::Numbered)?,
            KeyCode::Char('t') if control => self.toggle_list(ListType::Todo)?,
            KeyCode::Char('x') if control => {
                if self.editor.toggle_checked() {
                    self.mark_dirty();
                }
            }
            KeyCode::Char('a') if control => self.move_to_block_edge(false),
            KeyCode::Char('e') if control => self.move_to_block_edge(true),
            KeyCode::Left => {
                if self.move_left() {
                    self.preferred_column = None;
                }
            }
            KeyCode::Right => {
                if self.move_right() {
                    self.preferred_column = None;
                }
            }
            KeyCode::Home => self.move_to_block_edge(false),
            KeyCode::End => self.move_to_block_edge(true),
            KeyCode::Up => self.move_cursor_vertical(-1),
            KeyCode::Down => self.move_cursor_vertical(1),
            KeyCode::PageUp => {
                self.scroll_top = self.scroll_top.saturating_sub(self.last_view_height);
            }
            KeyCode::PageDown => {
                self.scroll_top += self.last_view_height;
            }
            KeyCode::Backspace => {
                self.editor.delete(DeleteDirection::Backward)?;
                self.after_edit();
            }
            KeyCode::Delete => {
                self.editor.delete(DeleteDirection::Forward)?;
                self.after_edit();
            }
            KeyCode::Enter => {
                let soft = modifiers.contains(KeyModifiers::SHIFT) || control;
                self.editor.enter(soft)?;
                self.after_edit();
            }
            KeyCode::Tab => {
                if self.editor.tab(false)? {
                    self.after_edit();
                }
            }
            KeyCode::BackTab => {
                if self.editor.tab(true)? {
                    self.after_edit();
                }
            }
            KeyCode::Char('j') if control => {
                self.editor.enter(true)?;
                self.after_edit();
            }
            KeyCode::Char(ch) if !control && !modifiers.contains(KeyModifiers::ALT) => {
                let mut buffer = [0u8; 4];
                self.editor.insert_text(ch.encode_utf8(&mut buffer));
                self.after_edit();
            }
            _ => {}
        }
        Ok(())
    }

    fn toggle_list(&mut self, list_type: ListType) -> Result<()> {
        let name = list_type.command_name();
        if self.editor.command(name).is_none() {
            self.status_message = Some((format!("{name} is not enabled"), Instant::now()));
            return Ok(());
        }
        let changed = self.editor.execute(name, &ExecuteOptions::default())?;
        if !changed.is_empty() {
            self.after_edit();
        }
        Ok(())
    }

    fn after_edit(&mut self) {
        self.mark_dirty();
        self.preferred_column = None;
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    fn save(&mut self) -> Result<()> {
        let Some(path) = &self.file_path else {
            self.status_message = Some((
                "No file name given, start with a path to save".to_string(),
                Instant::now(),
            ));
            return Ok(());
        };
        let contents = self.editor.get_data();
        fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "saved document");

        self.dirty = false;
        self.status_message = Some(("Saved".to_string(), Instant::now()));
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
