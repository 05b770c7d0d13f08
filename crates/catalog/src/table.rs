//! Soft-deletable row storage shared by the banner, slot and segment tables.

use crate::models::{Banner, Segment, Slot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rotator_core::{RotatorError, RotatorResult};
use std::sync::atomic::{AtomicI64, Ordering};

pub(crate) trait Row: Clone {
    fn key(&self) -> i64;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn set_deleted_at(&mut self, at: DateTime<Utc>);
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }
}

pub(crate) struct Table<T> {
    entity: &'static str,
    rows: DashMap<i64, T>,
    next_id: AtomicI64,
}

impl<T: Row> Table<T> {
    pub(crate) fn new(entity: &'static str) -> Self {
        Self {
            entity,
            rows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub(crate) fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert(&self, row: T) {
        self.rows.insert(row.key(), row);
    }

    /// Live row only; soft-deleted rows read as absent.
    pub(crate) fn get(&self, id: i64) -> Option<T> {
        self.rows
            .get(&id)
            .filter(|r| r.value().is_live())
            .map(|r| r.value().clone())
    }

    pub(crate) fn contains_live(&self, id: i64) -> bool {
        self.rows.get(&id).map(|r| r.value().is_live()).unwrap_or(false)
    }

    pub(crate) fn list(&self) -> Vec<T> {
        let mut rows: Vec<T> = self
            .rows
            .iter()
            .filter(|r| r.value().is_live())
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| r.key());
        rows
    }

    pub(crate) fn update(&self, id: i64, apply: impl FnOnce(&mut T)) -> RotatorResult<T> {
        match self.rows.get_mut(&id) {
            Some(mut entry) if entry.value().is_live() => {
                let row = entry.value_mut();
                apply(row);
                row.set_updated_at(Utc::now());
                Ok(row.clone())
            }
            _ => Err(RotatorError::not_found(self.entity, id)),
        }
    }

    pub(crate) fn soft_delete(&self, id: i64) -> RotatorResult<()> {
        match self.rows.get_mut(&id) {
            Some(mut entry) if entry.value().is_live() => {
                entry.value_mut().set_deleted_at(Utc::now());
                Ok(())
            }
            _ => Err(RotatorError::not_found(self.entity, id)),
        }
    }

    pub(crate) fn delete(&self, id: i64) -> RotatorResult<()> {
        self.rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RotatorError::not_found(self.entity, id))
    }
}

impl Row for Banner {
    fn key(&self) -> i64 {
        self.id.0
    }
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
    fn set_deleted_at(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl Row for Slot {
    fn key(&self) -> i64 {
        self.id.0
    }
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
    fn set_deleted_at(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl Row for Segment {
    fn key(&self) -> i64 {
        self.id.0
    }
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
    fn set_deleted_at(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }
    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}
