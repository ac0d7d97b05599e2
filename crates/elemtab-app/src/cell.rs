// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Keyed state slots written by direct calls and by connected producers.
//!
//! The cell is single-threaded: every write replaces the slot value whole,
//! and the last write applied wins. There is no merging between writers.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Instant;
use tracing::{debug, warn};

/// A producer of slot values. Polled by [`StateCell::pump`] until it has
/// nothing more to yield for the given instant.
pub trait Source<V> {
    fn poll_next(&mut self, now: Instant) -> Option<V>;
}

pub struct StateCell<K, V> {
    slots: BTreeMap<K, V>,
    sources: BTreeMap<K, Box<dyn Source<V>>>,
    version: u64,
}

impl<K, V> Default for StateCell<K, V> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            sources: BTreeMap::new(),
            version: 0,
        }
    }
}

impl<K, V> StateCell<K, V>
where
    K: Ord + Copy + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest committed value for `key`.
    ///
    /// # Panics
    ///
    /// Panics when `key` was never written. Slots are initialized before
    /// anything reads them, so an unset read is a wiring bug.
    pub fn read(&self, key: K) -> &V {
        match self.slots.get(&key) {
            Some(value) => value,
            None => panic!("state slot {key:?} read before initialization"),
        }
    }

    pub fn write(&mut self, key: K, value: V) {
        self.slots.insert(key, value);
        self.version += 1;
        debug!(slot = ?key, version = self.version, "slot written");
    }

    /// Attaches `source` as the producer for `key`. A key has at most one
    /// producer; connecting again drops the previous one.
    pub fn connect<S>(&mut self, key: K, source: S)
    where
        S: Source<V> + 'static,
    {
        if self.sources.insert(key, Box::new(source)).is_some() {
            warn!(slot = ?key, "replacing connected source");
        }
    }

    /// Drains every connected producer for `now`, applying each value as a
    /// write in the order produced. Returns the number of writes applied.
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut applied = 0;
        for (key, source) in &mut self.sources {
            while let Some(value) = source.poll_next(now) {
                self.slots.insert(*key, value);
                self.version += 1;
                applied += 1;
                debug!(slot = ?key, version = self.version, "connected source wrote slot");
            }
        }
        applied
    }

    /// Count of writes applied so far. Readers compare it between frames to
    /// notice changes.
    pub fn version(&self) -> u64 {
        self.version
    }
}
