// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use elemtab_app::{
    EditModal, ElementTable, ModalConfig, ModalHandle, ModalResolver, Position, Record,
    RecordStore, TableSettings, modal_channel,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub fn builtin_table() -> ElementTable {
    ElementTable::new(RecordStore::builtin(), TableSettings::default())
}

pub fn builtin_record(position: i64) -> Record {
    RecordStore::builtin()
        .records()
        .iter()
        .find(|record| record.position == Position::new(position))
        .cloned()
        .unwrap_or_else(|| panic!("no builtin record at position {position}"))
}

pub fn names(rows: &[Record]) -> Vec<&str> {
    rows.iter().map(|row| row.name.as_str()).collect()
}

/// Writes `records` as a JSON array into a fresh temp dir.
pub fn write_records_json(records: &[Record]) -> Result<(tempfile::TempDir, PathBuf)> {
    let temp = tempfile::tempdir()?;
    let path = temp.path().join("records.json");
    let raw = serde_json::to_string_pretty(records).context("encode records")?;
    std::fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    Ok((temp, path))
}

/// Feeds `text` one character at a time, each keystroke carrying the whole
/// prefix typed so far, spaced `gap` apart from `start`. Returns the instant
/// of the last keystroke.
pub fn type_text(table: &mut ElementTable, start: Instant, text: &str, gap: Duration) -> Instant {
    let mut at = start;
    let mut typed = String::new();
    for (index, ch) in text.chars().enumerate() {
        if index > 0 {
            at += gap;
        }
        typed.push(ch);
        table.on_filter_change_at(typed.clone(), at);
    }
    at
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Submit(Record),
    Rename(String),
    Cancel,
    /// Keep the dialog open until [`ScriptedModal::release`].
    Hold,
}

/// Modal stand-in that answers each opened dialog from a script.
#[derive(Debug, Default)]
pub struct ScriptedModal {
    answers: VecDeque<Answer>,
    held: Vec<ModalResolver>,
    pub opened: Vec<ModalConfig>,
}

impl ScriptedModal {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            held: Vec::new(),
            opened: Vec::new(),
        }
    }

    /// Resolves the oldest held dialog.
    pub fn release(&mut self, result: Option<Record>) -> bool {
        if self.held.is_empty() {
            return false;
        }
        self.held.remove(0).resolve(result);
        true
    }
}

impl EditModal for ScriptedModal {
    fn open(&mut self, config: ModalConfig) -> ModalHandle {
        let (resolver, handle) = modal_channel();
        let payload = config.payload.clone();
        self.opened.push(config);
        match self.answers.pop_front().unwrap_or(Answer::Cancel) {
            Answer::Submit(record) => resolver.submit(record),
            Answer::Rename(name) => resolver.submit(Record { name, ..payload }),
            Answer::Cancel => resolver.cancel(),
            Answer::Hold => self.held.push(resolver),
        }
        handle
    }
}
