// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::cell::Source;
use crate::model::{Record, RecordStore};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2_000);

/// One-shot resettable timer holding the latest value. A value is released
/// only after `window` passes with no newer push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Buffers `value` and re-arms the timer from `at`. Returns true when a
    /// pending value was discarded.
    pub fn push(&mut self, value: T, at: Instant) -> bool {
        self.pending.replace((value, at + self.window)).is_some()
    }

    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }
}

/// Case-insensitive substring match of `text` against every field of every
/// record, keeping store order. Empty text keeps everything.
pub fn apply_filter(records: &[Record], text: &str) -> Vec<Record> {
    let needle = text.to_lowercase();
    records
        .iter()
        .filter(|record| {
            record
                .field_texts()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Keystroke {
    text: String,
    at: Instant,
}

/// Sending half of the filter stream, held by the input field.
#[derive(Debug, Clone)]
pub struct FilterInput {
    tx: Sender<Keystroke>,
    window: Duration,
    last_at: Option<Instant>,
}

impl FilterInput {
    pub fn next(&mut self, text: impl Into<String>) {
        self.next_at(text, Instant::now());
    }

    pub fn next_at(&mut self, text: impl Into<String>, at: Instant) {
        let text = text.into();
        trace!(filter = %text, "filter keystroke");
        self.last_at = Some(at);
        // The pipeline only goes away with the table; a closed channel means
        // there is nothing left to filter.
        let _ = self.tx.send(Keystroke { text, at });
    }

    /// True while the most recent keystroke is still inside its quiet window.
    pub fn is_settling(&self, now: Instant) -> bool {
        self
            .last_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.window)
    }
}

/// Debounced filter stream over the full store. Connected to the visible
/// dataset slot as its producer.
pub struct FilterPipeline {
    store: Rc<RecordStore>,
    keystrokes: Receiver<Keystroke>,
    debouncer: Debouncer<String>,
    ready: VecDeque<Vec<Record>>,
}

pub fn filter_pipeline(store: Rc<RecordStore>, window: Duration) -> (FilterInput, FilterPipeline) {
    let (tx, rx) = mpsc::channel();
    (
        FilterInput {
            tx,
            window,
            last_at: None,
        },
        FilterPipeline {
            store,
            keystrokes: rx,
            debouncer: Debouncer::new(window),
            ready: VecDeque::new(),
        },
    )
}

impl FilterPipeline {
    fn settle(&mut self, text: String) {
        let rows = apply_filter(self.store.records(), &text);
        debug!(filter = %text, rows = rows.len(), "filter settled");
        self.ready.push_back(rows);
    }
}

impl Source<Vec<Record>> for FilterPipeline {
    fn poll_next(&mut self, now: Instant) -> Option<Vec<Record>> {
        while let Ok(keystroke) = self.keystrokes.try_recv() {
            // A value whose window elapsed before this keystroke arrived has
            // already settled, even if nobody polled in between.
            if let Some(text) = self.debouncer.take_due(keystroke.at) {
                self.settle(text);
            }
            self.debouncer.push(keystroke.text, keystroke.at);
        }
        if let Some(text) = self.debouncer.take_due(now) {
            self.settle(text);
        }
        self.ready.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_DEBOUNCE, Debouncer, apply_filter, filter_pipeline};
    use crate::cell::Source;
    use crate::model::{Record, RecordStore};
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    fn names(rows: &[Record]) -> Vec<&str> {
        rows.iter().map(|row| row.name.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_full_store_in_order() {
        let store = RecordStore::builtin();
        assert_eq!(apply_filter(store.records(), ""), store.records());
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let store = RecordStore::builtin();
        assert_eq!(
            names(&apply_filter(store.records(), "LI")),
            vec!["Helium", "Lithium", "Beryllium"]
        );
        assert_eq!(
            names(&apply_filter(store.records(), "gen")),
            vec!["Hydrogen", "Nitrogen", "Oxygen"]
        );
    }

    #[test]
    fn filter_matches_numeric_fields_as_text() {
        let store = RecordStore::builtin();
        assert_eq!(
            names(&apply_filter(store.records(), "10")),
            vec!["Boron", "Carbon", "Neon"]
        );
        assert_eq!(names(&apply_filter(store.records(), "15.99")), vec!["Oxygen"]);
    }

    #[test]
    fn filter_with_no_match_is_empty() {
        let store = RecordStore::builtin();
        assert!(apply_filter(store.records(), "xenon").is_empty());
    }

    #[test]
    fn debouncer_releases_only_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        assert!(!debouncer.push("a", start));
        assert!(debouncer.push("ab", start + Duration::from_millis(50)));
        assert_eq!(debouncer.take_due(start + Duration::from_millis(100)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(150))
        );
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(150)),
            Some("ab")
        );
        assert_eq!(debouncer.take_due(start + Duration::from_secs(10)), None);
    }

    #[test]
    fn late_poll_still_yields_each_settled_value() {
        let start = Instant::now();
        let (mut input, mut pipeline) =
            filter_pipeline(Rc::new(RecordStore::builtin()), DEFAULT_DEBOUNCE);

        input.next_at("he", start);
        input.next_at("ne", start + Duration::from_secs(3));

        let late = start + Duration::from_secs(10);
        let first = pipeline.poll_next(late).expect("first settled value");
        let second = pipeline.poll_next(late).expect("second settled value");
        assert_eq!(names(&first), vec!["Helium"]);
        assert_eq!(names(&second), vec!["Fluorine", "Neon"]);
        assert!(pipeline.poll_next(late).is_none());
    }

    #[test]
    fn input_reports_settling_window() {
        let start = Instant::now();
        let (mut input, _pipeline) =
            filter_pipeline(Rc::new(RecordStore::builtin()), DEFAULT_DEBOUNCE);
        assert!(!input.is_settling(start));

        input.next_at("h", start);
        assert!(input.is_settling(start + Duration::from_millis(1_999)));
        assert!(!input.is_settling(start + DEFAULT_DEBOUNCE));
    }
}
