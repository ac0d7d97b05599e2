// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::ids::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub position: Position,
    pub name: String,
    pub weight: f64,
    pub symbol: String,
}

impl Record {
    pub fn new(position: i64, name: &str, weight: f64, symbol: &str) -> Self {
        Self {
            position: Position::new(position),
            name: name.to_owned(),
            weight,
            symbol: symbol.to_owned(),
        }
    }

    /// Text of every field in column order. Weight uses the shortest
    /// round-trip float form, so `2.0` renders as `2`.
    pub fn field_texts(&self) -> [String; 4] {
        [
            self.position.to_string(),
            self.name.clone(),
            self.weight.to_string(),
            self.symbol.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    Position,
    Name,
    Weight,
    Symbol,
    Actions,
}

impl Column {
    pub const ALL: [Self; 5] = [
        Self::Position,
        Self::Name,
        Self::Weight,
        Self::Symbol,
        Self::Actions,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Name => "name",
            Self::Weight => "weight",
            Self::Symbol => "symbol",
            Self::Actions => "actions",
        }
    }
}

const BUILTIN_ELEMENTS: [(i64, &str, f64, &str); 10] = [
    (1, "Hydrogen", 1.0079, "H"),
    (2, "Helium", 4.0026, "He"),
    (3, "Lithium", 6.941, "Li"),
    (4, "Beryllium", 9.0122, "Be"),
    (5, "Boron", 10.811, "B"),
    (6, "Carbon", 12.0107, "C"),
    (7, "Nitrogen", 14.0067, "N"),
    (8, "Oxygen", 15.9994, "O"),
    (9, "Fluorine", 18.9984, "F"),
    (10, "Neon", 20.1797, "Ne"),
];

/// The unfiltered dataset. Fixed once built; filtering always starts here.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn builtin() -> Self {
        Self {
            records: BUILTIN_ELEMENTS
                .iter()
                .map(|(position, name, weight, symbol)| {
                    Record::new(*position, name, *weight, symbol)
                })
                .collect(),
        }
    }

    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        if records.is_empty() {
            bail!("record store is empty -- provide at least one record");
        }

        let mut seen = BTreeSet::new();
        for record in &records {
            if !seen.insert(record.position) {
                bail!(
                    "duplicate record position {} -- positions must be unique",
                    record.position
                );
            }
            if !record.weight.is_finite() {
                bail!("record {} has a non-finite weight", record.position);
            }
        }

        Ok(Self { records })
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read record file {}", path.display()))?;
        let records: Vec<Record> = serde_json::from_str(&raw)
            .with_context(|| format!("parse JSON records {}", path.display()))?;
        Self::from_records(records).with_context(|| format!("load records {}", path.display()))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Column, Record, RecordStore};
    use crate::Position;

    #[test]
    fn builtin_store_is_ordered_by_position() {
        let store = RecordStore::builtin();
        let positions = store
            .records()
            .iter()
            .map(|record| record.position.get())
            .collect::<Vec<_>>();
        assert_eq!(positions, (1..=10).collect::<Vec<_>>());
        assert_eq!(store.records()[2].name, "Lithium");
    }

    #[test]
    fn field_texts_use_shortest_float_form() {
        let record = Record::new(5, "Boron", 10.811, "B");
        assert_eq!(record.field_texts(), ["5", "Boron", "10.811", "B"]);

        let whole = Record::new(99, "Test", 2.0, "Ts");
        assert_eq!(whole.field_texts()[2], "2");
    }

    #[test]
    fn from_records_rejects_duplicate_positions() {
        let error = RecordStore::from_records(vec![
            Record::new(1, "Hydrogen", 1.0079, "H"),
            Record::new(1, "Deuterium", 2.014, "D"),
        ])
        .expect_err("duplicate positions should fail");
        assert!(error.to_string().contains("duplicate record position 1"));
    }

    #[test]
    fn from_records_rejects_empty_and_non_finite() {
        assert!(RecordStore::from_records(Vec::new()).is_err());

        let error = RecordStore::from_records(vec![Record::new(1, "X", f64::NAN, "X")])
            .expect_err("NaN weight should fail");
        assert!(error.to_string().contains("non-finite"));
    }

    #[test]
    fn columns_keep_render_order() {
        let labels = Column::ALL.map(Column::label);
        assert_eq!(labels, ["position", "name", "weight", "symbol", "actions"]);
    }

    #[test]
    fn position_serializes_as_plain_integer() -> anyhow::Result<()> {
        let json = serde_json::to_string(&Record::new(3, "Lithium", 6.941, "Li"))?;
        assert!(json.contains("\"position\":3"), "got {json}");
        let parsed: Record = serde_json::from_str(&json)?;
        assert_eq!(parsed.position, Position::new(3));
        Ok(())
    }
}
