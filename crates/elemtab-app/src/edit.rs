// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt::Debug;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::cell::StateCell;
use crate::ids::Position;
use crate::model::Record;

pub const DEFAULT_DIALOG_WIDTH: u16 = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct ModalConfig {
    /// Requested dialog width in terminal columns.
    pub width: u16,
    /// Copy of the record being edited. The dialog owns it outright.
    pub payload: Record,
}

/// Producing half of a dialog result. Consumed on use, so a dialog can
/// resolve at most once.
#[derive(Debug)]
pub struct ModalResolver {
    tx: Sender<Option<Record>>,
}

impl ModalResolver {
    pub fn resolve(self, result: Option<Record>) {
        // The coordinator may already be gone on shutdown.
        let _ = self.tx.send(result);
    }

    pub fn submit(self, record: Record) {
        self.resolve(Some(record));
    }

    pub fn cancel(self) {
        self.resolve(None);
    }
}

#[derive(Debug)]
pub struct ModalHandle {
    rx: Receiver<Option<Record>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModalPoll {
    Pending,
    Resolved(Option<Record>),
    /// The resolver was dropped without answering.
    Abandoned,
}

impl ModalHandle {
    pub fn try_resolve(&self) -> ModalPoll {
        match self.rx.try_recv() {
            Ok(result) => ModalPoll::Resolved(result),
            Err(TryRecvError::Empty) => ModalPoll::Pending,
            Err(TryRecvError::Disconnected) => ModalPoll::Abandoned,
        }
    }
}

pub fn modal_channel() -> (ModalResolver, ModalHandle) {
    let (tx, rx) = mpsc::channel();
    (ModalResolver { tx }, ModalHandle { rx })
}

/// A surface that can show one record for editing and later answer with the
/// edited record or nothing.
pub trait EditModal {
    fn open(&mut self, config: ModalConfig) -> ModalHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Idle,
    ModalOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied { position: Position, replaced: bool },
    Cancelled { position: Position },
    Abandoned { position: Position },
}

#[derive(Debug)]
struct PendingEdit {
    target: Position,
    handle: ModalHandle,
}

#[derive(Debug)]
pub struct EditCoordinator {
    width: u16,
    pending: Vec<PendingEdit>,
}

impl Default for EditCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DIALOG_WIDTH)
    }
}

impl EditCoordinator {
    pub fn new(width: u16) -> Self {
        Self {
            width,
            pending: Vec::new(),
        }
    }

    pub fn phase(&self) -> EditPhase {
        if self.pending.is_empty() {
            EditPhase::Idle
        } else {
            EditPhase::ModalOpen
        }
    }

    pub fn open<M>(&mut self, modal: &mut M, target: &Record)
    where
        M: EditModal + ?Sized,
    {
        let handle = modal.open(ModalConfig {
            width: self.width,
            payload: target.clone(),
        });
        info!(position = %target.position, "edit dialog opened");
        self.pending.push(PendingEdit {
            target: target.position,
            handle,
        });
    }

    /// Settles every dialog that has answered, writing edited records into
    /// `key`. Dialogs still open stay pending with no deadline.
    pub fn poll<K>(&mut self, cell: &mut StateCell<K, Vec<Record>>, key: K) -> Vec<EditOutcome>
    where
        K: Ord + Copy + Debug,
    {
        let mut outcomes = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            let target = self.pending[index].target;
            let outcome = match self.pending[index].handle.try_resolve() {
                ModalPoll::Pending => {
                    index += 1;
                    continue;
                }
                ModalPoll::Resolved(Some(updated)) => apply_edit(cell, key, updated),
                ModalPoll::Resolved(None) => {
                    debug!(position = %target, "edit cancelled");
                    EditOutcome::Cancelled { position: target }
                }
                ModalPoll::Abandoned => {
                    warn!(position = %target, "edit dialog closed without a result");
                    EditOutcome::Abandoned { position: target }
                }
            };
            self.pending.remove(index);
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn apply_edit<K>(cell: &mut StateCell<K, Vec<Record>>, key: K, updated: Record) -> EditOutcome
where
    K: Ord + Copy + Debug,
{
    let (rows, replaced) = replace_by_position(cell.read(key), &updated);
    if !replaced {
        debug!(
            position = %updated.position,
            "edited record not visible; dataset unchanged"
        );
    }
    cell.write(key, rows);
    info!(position = %updated.position, replaced, "edit applied");
    EditOutcome::Applied {
        position: updated.position,
        replaced,
    }
}

/// Copies `current`, swapping in `updated` where the position matches.
/// Never inserts: with no match the copy equals `current`.
pub fn replace_by_position(current: &[Record], updated: &Record) -> (Vec<Record>, bool) {
    let mut replaced = false;
    let rows = current
        .iter()
        .map(|row| {
            if row.position == updated.position {
                replaced = true;
                updated.clone()
            } else {
                row.clone()
            }
        })
        .collect();
    (rows, replaced)
}
