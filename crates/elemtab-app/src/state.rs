// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Filter,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub filter_text: String,
    pub selected_row: usize,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            filter_text: String::new(),
            selected_row: 0,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    FocusFilter,
    BlurFilter,
    PushFilterChar(char),
    PopFilterChar,
    ClearFilter,
    MoveSelection { delta: isize, rows: usize },
    ClampSelection { rows: usize },
    OpenDialog,
    CloseDialog,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    FilterChanged(String),
    SelectionChanged(usize),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::FocusFilter => self.set_mode(AppMode::Filter),
            AppCommand::BlurFilter | AppCommand::CloseDialog => self.set_mode(AppMode::Nav),
            AppCommand::OpenDialog => self.set_mode(AppMode::Edit),
            AppCommand::PushFilterChar(ch) => {
                self.filter_text.push(ch);
                vec![AppEvent::FilterChanged(self.filter_text.clone())]
            }
            AppCommand::PopFilterChar => match self.filter_text.pop() {
                Some(_) => vec![AppEvent::FilterChanged(self.filter_text.clone())],
                None => Vec::new(),
            },
            AppCommand::ClearFilter => {
                if self.filter_text.is_empty() {
                    return Vec::new();
                }
                self.filter_text.clear();
                vec![AppEvent::FilterChanged(String::new())]
            }
            AppCommand::MoveSelection { delta, rows } => {
                let next = self.selected_row.saturating_add_signed(delta);
                self.select(next, rows)
            }
            AppCommand::ClampSelection { rows } => self.select(self.selected_row, rows),
            AppCommand::SetStatus(message) => vec![self.set_status(message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn set_mode(&mut self, mode: AppMode) -> Vec<AppEvent> {
        if self.mode == mode {
            return Vec::new();
        }
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn select(&mut self, row: usize, rows: usize) -> Vec<AppEvent> {
        let clamped = row.min(rows.saturating_sub(1));
        if clamped == self.selected_row {
            return Vec::new();
        }
        self.selected_row = clamped;
        vec![AppEvent::SelectionChanged(clamped)]
    }

    fn set_status(&mut self, message: String) -> AppEvent {
        self.status_line = Some(message.clone());
        AppEvent::StatusUpdated(message)
    }
}
