// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use elemtab_app::{
    AppCommand, AppEvent, AppMode, AppState, COLUMNS, Column, EditModal, EditOutcome,
    ElementTable, ModalConfig, ModalHandle, ModalResolver, Position, Record, modal_channel,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const ACTION_LABEL: &str = "edit";
const SETTLING_MARK: &str = "…";
const DIALOG_HEIGHT: u16 = 9;
const MIN_DIALOG_WIDTH: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogField {
    Name,
    Weight,
    Symbol,
}

impl DialogField {
    const ALL: [Self; 3] = [Self::Name, Self::Weight, Self::Symbol];

    const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Weight => "weight",
            Self::Symbol => "symbol",
        }
    }

    fn rotate(self, delta: isize) -> Self {
        let current = Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0) as isize;
        let len = Self::ALL.len() as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug)]
struct DialogForm {
    position: Position,
    name: String,
    weight: String,
    symbol: String,
    focus: DialogField,
    width: u16,
    resolver: ModalResolver,
}

impl DialogForm {
    fn new(config: ModalConfig, resolver: ModalResolver) -> Self {
        let record = config.payload;
        Self {
            position: record.position,
            name: record.name,
            weight: record.weight.to_string(),
            symbol: record.symbol,
            focus: DialogField::Name,
            width: config.width,
            resolver,
        }
    }

    fn field_mut(&mut self, field: DialogField) -> &mut String {
        match field {
            DialogField::Name => &mut self.name,
            DialogField::Weight => &mut self.weight,
            DialogField::Symbol => &mut self.symbol,
        }
    }

    fn field(&self, field: DialogField) -> &str {
        match field {
            DialogField::Name => &self.name,
            DialogField::Weight => &self.weight,
            DialogField::Symbol => &self.symbol,
        }
    }

    fn to_record(&self) -> Result<Record> {
        let name = self.name.trim();
        if name.is_empty() {
            bail!("name is required -- enter a name and retry");
        }
        let symbol = self.symbol.trim();
        if symbol.is_empty() {
            bail!("symbol is required -- enter a symbol and retry");
        }
        let weight = self.weight.trim();
        let parsed: f64 = weight
            .parse()
            .with_context(|| format!("weight {weight:?} is not a decimal number"))?;
        if !parsed.is_finite() || parsed < 0.0 {
            bail!("weight must be a finite, non-negative number");
        }
        Ok(Record {
            position: self.position,
            name: name.to_owned(),
            weight: parsed,
            symbol: symbol.to_owned(),
        })
    }
}

/// Edit dialog drawn over the table. Answers through the resolver handed
/// out when it was opened.
#[derive(Debug, Default)]
pub struct DialogModal {
    form: Option<DialogForm>,
}

impl DialogModal {
    pub fn is_open(&self) -> bool {
        self.form.is_some()
    }
}

impl EditModal for DialogModal {
    fn open(&mut self, config: ModalConfig) -> ModalHandle {
        let (resolver, handle) = modal_channel();
        // Only one dialog is drawn; a replaced form drops its resolver and
        // the coordinator sees it as abandoned.
        self.form = Some(DialogForm::new(config, resolver));
        handle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Default)]
struct ViewData {
    dialog: DialogModal,
    status_token: u64,
}

pub fn run_app(state: &mut AppState, table: &mut ElementTable) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    info!(rows = table.rows().len(), "terminal session started");

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        let now = Instant::now();
        let report = table.tick(now);
        if report.filter_writes > 0 {
            state.dispatch(AppCommand::ClampSelection {
                rows: table.rows().len(),
            });
        }
        for outcome in &report.edits {
            emit_status(state, &mut view_data, &internal_tx, edit_status(outcome));
        }

        if let Err(error) = terminal.draw(|frame| render(frame, state, table, &view_data, now)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, table, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    info!("terminal session ended");
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn edit_status(outcome: &EditOutcome) -> String {
    match outcome {
        EditOutcome::Applied {
            position,
            replaced: true,
        } => format!("saved #{position}"),
        EditOutcome::Applied {
            position,
            replaced: false,
        } => format!("#{position} no longer visible; nothing changed"),
        EditOutcome::Cancelled { position } => format!("edit of #{position} cancelled"),
        EditOutcome::Abandoned { position } => format!("edit of #{position} dropped"),
    }
}

/// Routes the events a command produced. Filter text changes go straight to
/// the table's filter stream, one per change.
fn dispatch(state: &mut AppState, table: &mut ElementTable, command: AppCommand) {
    for event in state.dispatch(command) {
        if let AppEvent::FilterChanged(text) = event {
            table.on_filter_change(text);
        }
    }
}

fn handle_key_event(
    state: &mut AppState,
    table: &mut ElementTable,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.dialog.is_open() {
        handle_dialog_key(state, view_data, internal_tx, key);
        return false;
    }

    match state.mode {
        AppMode::Filter => handle_filter_key(state, table, key),
        AppMode::Nav | AppMode::Edit => handle_nav_key(state, table, view_data, internal_tx, key),
    }
    false
}

fn handle_filter_key(state: &mut AppState, table: &mut ElementTable, key: KeyEvent) {
    match (key.code, key.modifiers) {
        (KeyCode::Esc | KeyCode::Enter, _) => dispatch(state, table, AppCommand::BlurFilter),
        (KeyCode::Backspace, _) => dispatch(state, table, AppCommand::PopFilterChar),
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
            dispatch(state, table, AppCommand::ClearFilter);
        }
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            dispatch(state, table, AppCommand::PushFilterChar(ch));
        }
        _ => {}
    }
}

fn handle_nav_key(
    state: &mut AppState,
    table: &mut ElementTable,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let rows = table.rows().len();
    match key.code {
        KeyCode::Char('/') => dispatch(state, table, AppCommand::FocusFilter),
        KeyCode::Char('j') | KeyCode::Down => {
            dispatch(state, table, AppCommand::MoveSelection { delta: 1, rows });
        }
        KeyCode::Char('k') | KeyCode::Up => {
            dispatch(state, table, AppCommand::MoveSelection { delta: -1, rows });
        }
        KeyCode::Char('g') | KeyCode::Home => {
            dispatch(
                state,
                table,
                AppCommand::MoveSelection {
                    delta: isize::MIN,
                    rows,
                },
            );
        }
        KeyCode::Char('G') | KeyCode::End => {
            dispatch(
                state,
                table,
                AppCommand::MoveSelection {
                    delta: isize::MAX,
                    rows,
                },
            );
        }
        KeyCode::Enter | KeyCode::Char('e') => {
            open_selected_for_edit(state, table, view_data, internal_tx);
        }
        KeyCode::Esc => dispatch(state, table, AppCommand::ClearStatus),
        _ => {}
    }
}

fn open_selected_for_edit(
    state: &mut AppState,
    table: &mut ElementTable,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(position) = table
        .rows()
        .get(state.selected_row)
        .map(|row| row.position)
    else {
        emit_status(state, view_data, internal_tx, "no row to edit");
        return;
    };

    match table.open_edit(&mut view_data.dialog, position) {
        Ok(()) => {
            state.dispatch(AppCommand::OpenDialog);
        }
        Err(error) => emit_status(state, view_data, internal_tx, error.to_string()),
    }
}

fn handle_dialog_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.dialog.form.as_mut() else {
        return;
    };

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            if let Some(form) = view_data.dialog.form.take() {
                form.resolver.cancel();
            }
            state.dispatch(AppCommand::CloseDialog);
        }
        (KeyCode::Enter, _) => match form.to_record() {
            Ok(record) => {
                debug!(position = %record.position, "dialog submitted");
                if let Some(form) = view_data.dialog.form.take() {
                    form.resolver.submit(record);
                }
                state.dispatch(AppCommand::CloseDialog);
            }
            Err(error) => emit_status(state, view_data, internal_tx, format!("{error:#}")),
        },
        (KeyCode::Tab | KeyCode::Down, _) => form.focus = form.focus.rotate(1),
        (KeyCode::BackTab | KeyCode::Up, _) => form.focus = form.focus.rotate(-1),
        (KeyCode::Backspace, _) => {
            form.field_mut(form.focus).pop();
        }
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => form.field_mut(form.focus).clear(),
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            form.field_mut(form.focus).push(ch);
        }
        _ => {}
    }
}

fn render(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    table: &ElementTable,
    view_data: &ViewData,
    now: Instant,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let filter_style = if state.mode == AppMode::Filter {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    };
    let filter = Paragraph::new(render_filter_text(state, table.filter_settling(now)))
        .style(filter_style)
        .block(Block::default().title("elemtab").borders(Borders::ALL));
    frame.render_widget(filter, layout[0]);

    render_table(frame, layout[1], state, table);

    let status_widget = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(form) = &view_data.dialog.form {
        let area = dialog_rect(form.width, frame.area());
        frame.render_widget(Clear, area);
        let dialog = Paragraph::new(render_dialog_text(form)).block(
            Block::default()
                .title(format!("edit #{}", form.position))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(dialog, area);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    table: &ElementTable,
) {
    let header = Row::new(COLUMNS.iter().map(|column| {
        Cell::from(column.label()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = table.rows().iter().enumerate().map(|(row_index, record)| {
        let style = if row_index == state.selected_row {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        Row::new(row_cells(record).map(Cell::from)).style(style)
    });

    let widths = [
        Constraint::Length(10),
        Constraint::Min(12),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
    ];
    let widget = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(table))
                .borders(Borders::ALL),
        );
    frame.render_widget(widget, area);
}

fn row_cells(record: &Record) -> [String; 5] {
    COLUMNS.map(|column| match column {
        Column::Position => record.position.to_string(),
        Column::Name => record.name.clone(),
        Column::Weight => record.weight.to_string(),
        Column::Symbol => record.symbol.clone(),
        Column::Actions => ACTION_LABEL.to_owned(),
    })
}

fn table_title(table: &ElementTable) -> String {
    format!("elements {}/{}", table.rows().len(), table.store().len())
}

fn render_filter_text(state: &AppState, settling: bool) -> String {
    let mut text = format!("filter: {}", state.filter_text);
    if state.mode == AppMode::Filter {
        text.push('▏');
    }
    if settling {
        text.push(' ');
        text.push_str(SETTLING_MARK);
    }
    text
}

fn render_dialog_text(form: &DialogForm) -> String {
    let mut lines = vec![format!("  position: {}", form.position)];
    for field in DialogField::ALL {
        let marker = if field == form.focus { '>' } else { ' ' };
        lines.push(format!("{marker} {}: {}", field.label(), form.field(field)));
    }
    lines.push(String::new());
    lines.push("enter save · esc cancel · tab next".to_owned());
    lines.join("\n")
}

fn status_text(state: &AppState) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    match state.mode {
        AppMode::Nav => "/ filter · j/k move · enter edit · ctrl+q quit".to_owned(),
        AppMode::Filter => "type to filter · enter/esc done · ctrl+u clear".to_owned(),
        AppMode::Edit => "editing".to_owned(),
    }
}

fn dialog_rect(width: u16, area: Rect) -> Rect {
    let width = width.max(MIN_DIALOG_WIDTH).min(area.width);
    let height = DIALOG_HEIGHT.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
