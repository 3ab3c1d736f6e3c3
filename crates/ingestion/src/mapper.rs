//! Header alias resolution.
//!
//! Maps the heterogeneous column names of exported files onto the canonical
//! `time/open/high/low/close/volume` field set.

use ohlc_core::{AliasTable, CanonicalField, RawRow, RawValue};

/// A row with each canonical field resolved to its source cell, if any.
#[derive(Debug, Clone)]
pub struct MappedRow<'r> {
    /// Source row number, carried through for diagnostics.
    pub source_row: usize,
    fields: [Option<&'r RawValue>; 6],
}

fn slot(field: CanonicalField) -> usize {
    match field {
        CanonicalField::Time => 0,
        CanonicalField::Open => 1,
        CanonicalField::High => 2,
        CanonicalField::Low => 3,
        CanonicalField::Close => 4,
        CanonicalField::Volume => 5,
    }
}

impl<'r> MappedRow<'r> {
    /// The resolved cell for a field.
    pub fn get(&self, field: CanonicalField) -> Option<&'r RawValue> {
        self.fields[slot(field)]
    }

    /// First required field with no resolved cell, in canonical order.
    pub fn first_missing_required(&self) -> Option<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| f.is_required())
            .find(|f| self.get(*f).is_none())
    }
}

/// Resolves canonical fields through an immutable alias table.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper<'a> {
    aliases: &'a AliasTable,
}

impl<'a> FieldMapper<'a> {
    /// Create a mapper over an alias table.
    pub fn new(aliases: &'a AliasTable) -> Self {
        Self { aliases }
    }

    /// The first alias, in priority order, present in `row` with a non-absent value.
    pub fn resolve<'r>(&self, row: &'r RawRow, field: CanonicalField) -> Option<&'r RawValue> {
        self.aliases
            .aliases(field)
            .iter()
            .filter_map(|alias| row.get(alias))
            .find(|value| !value.is_absent())
    }

    /// Resolve every canonical field of a row.
    pub fn map<'r>(&self, row: &'r RawRow) -> MappedRow<'r> {
        let mut fields = [None; 6];
        for field in CanonicalField::ALL {
            fields[slot(field)] = self.resolve(row, field);
        }
        MappedRow {
            source_row: row.source_row,
            fields,
        }
    }

    /// Highest-priority alias for `field` that appears among `headers`.
    ///
    /// Used for logging the column layout of a file; row resolution may still
    /// fall through to a later alias when this column is blank.
    pub fn column_for<'h>(&self, field: CanonicalField, headers: &'h [String]) -> Option<&'h str> {
        self.aliases
            .aliases(field)
            .iter()
            .find_map(|alias| headers.iter().find(|h| *h == alias))
            .map(String::as_str)
    }
}
