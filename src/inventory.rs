//! # In-memory Inventory
//!
//! Ordered, append-only list of registered garments. Lives for the process
//! lifetime only; nothing is persisted.
//!
//! ## Concurrency Contract
//!
//! The list sits behind a single mutex and is shared by `Arc`. Only one writer
//! holds it at a time. [`Inventory::commit_with`] keeps the lock across the
//! caller's side effect, which is how tag generation makes "image written" and
//! "record appended" a single step.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::error::{TagError, TagResult};
use crate::validation::GarmentSize;

/// One inventory entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeRecord {
    pub product: String,
    pub size: GarmentSize,
    pub color: String,
    pub fabric: String,
    pub price: f64,
    /// Name of the tag image inside the static directory.
    pub image_file_name: String,
}

/// Process-wide garment list.
#[derive(Debug, Default)]
pub struct Inventory {
    records: Mutex<Vec<AttributeRecord>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, operation: &str) -> TagResult<MutexGuard<'_, Vec<AttributeRecord>>> {
        self.records
            .lock()
            .map_err(|_| TagError::state("poisoned", operation, "inventory lock poisoned"))
    }

    /// Append a record. No deduplication, no capacity bound.
    pub fn append(&self, record: AttributeRecord) -> TagResult<()> {
        self.lock("append")?.push(record);
        Ok(())
    }

    /// Run `effect` while holding the write lock and append its record only if it succeeds.
    pub fn commit_with<F>(&self, effect: F) -> TagResult<AttributeRecord>
    where
        F: FnOnce() -> TagResult<AttributeRecord>,
    {
        let mut records = self.lock("commit")?;
        let record = effect()?;
        records.push(record.clone());
        Ok(record)
    }

    /// Copy of every record in insertion order.
    pub fn snapshot(&self) -> TagResult<Vec<AttributeRecord>> {
        Ok(self.lock("snapshot")?.clone())
    }

    pub fn len(&self) -> TagResult<usize> {
        Ok(self.lock("count")?.len())
    }

    pub fn is_empty(&self) -> TagResult<bool> {
        Ok(self.len()? == 0)
    }
}
