// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::cell::StateCell;
use crate::edit::{DEFAULT_DIALOG_WIDTH, EditCoordinator, EditModal, EditOutcome, EditPhase};
use crate::filter::{DEFAULT_DEBOUNCE, FilterInput, filter_pipeline};
use crate::ids::Position;
use crate::model::{Column, Record, RecordStore};

pub const COLUMNS: [Column; 5] = Column::ALL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Slot {
    DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSettings {
    pub debounce: Duration,
    pub dialog_width: u16,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            dialog_width: DEFAULT_DIALOG_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickReport {
    pub filter_writes: usize,
    pub edits: Vec<EditOutcome>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.filter_writes == 0 && self.edits.is_empty()
    }
}

/// The filterable, editable table. Holds the visible dataset slot and both
/// of its writers.
pub struct ElementTable {
    store: Rc<RecordStore>,
    cell: StateCell<Slot, Vec<Record>>,
    input: FilterInput,
    editor: EditCoordinator,
}

impl ElementTable {
    pub fn new(store: RecordStore, settings: TableSettings) -> Self {
        let store = Rc::new(store);
        let mut cell = StateCell::new();
        cell.write(Slot::DataSource, store.records().to_vec());

        let (input, pipeline) = filter_pipeline(Rc::clone(&store), settings.debounce);
        cell.connect(Slot::DataSource, pipeline);
        info!(
            records = store.len(),
            debounce_ms = settings.debounce.as_millis() as u64,
            "table initialized"
        );

        Self {
            store,
            cell,
            input,
            editor: EditCoordinator::new(settings.dialog_width),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn rows(&self) -> &[Record] {
        self.cell.read(Slot::DataSource)
    }

    pub fn version(&self) -> u64 {
        self.cell.version()
    }

    pub fn on_filter_change(&mut self, text: impl Into<String>) {
        self.input.next(text);
    }

    pub fn on_filter_change_at(&mut self, text: impl Into<String>, at: Instant) {
        self.input.next_at(text, at);
    }

    pub fn filter_settling(&self, now: Instant) -> bool {
        self.input.is_settling(now)
    }

    pub fn edit_phase(&self) -> EditPhase {
        self.editor.phase()
    }

    /// Opens `modal` on the visible record at `position`.
    pub fn open_edit<M>(&mut self, modal: &mut M, position: Position) -> Result<()>
    where
        M: EditModal + ?Sized,
    {
        let target = self
            .rows()
            .iter()
            .find(|row| row.position == position)
            .cloned()
            .ok_or_else(|| anyhow!("no visible record at position {position}"))?;
        self.editor.open(modal, &target);
        Ok(())
    }

    /// Applies settled filter values, then settled edits, in that order.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let filter_writes = self.cell.pump(now);
        let edits = self.editor.poll(&mut self.cell, Slot::DataSource);
        TickReport {
            filter_writes,
            edits,
        }
    }
}
