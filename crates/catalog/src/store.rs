//! In-memory catalog store backed by DashMap.
//!
//! Ids are allocated sequentially per entity kind starting at 1. Reads and
//! updates skip soft-deleted rows; physical deletes also drop the row's
//! banner↔slot links.

use crate::models::*;
use crate::table::Table;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rotator_bandit::SlotIndex;
use rotator_core::{BannerId, RotatorError, RotatorResult, SegmentId, SlotId};
use tracing::{debug, info};

/// Thread-safe in-memory store for banners, slots, segments and their links.
pub struct CatalogStore {
    banners: Table<Banner>,
    slots: Table<Slot>,
    segments: Table<Segment>,
    /// Per slot, links in creation order.
    links: DashMap<SlotId, Vec<BannerSlotLink>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        info!("Catalog store initialized (in-memory)");
        Self {
            banners: Table::new("banner"),
            slots: Table::new("slot"),
            segments: Table::new("segment"),
            links: DashMap::new(),
        }
    }

    // ─── Banners ───────────────────────────────────────────────────────────

    pub fn create_banner(&self, req: CreateBannerRequest) -> Banner {
        let now = Utc::now();
        let banner = Banner {
            id: BannerId(self.banners.allocate_id()),
            title: req.title,
            content: req.content,
            description: req.description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.banners.insert(banner.clone());
        debug!(banner = %banner.id, "Banner created");
        banner
    }

    pub fn get_banner(&self, id: BannerId) -> Option<Banner> {
        self.banners.get(id.0)
    }

    pub fn list_banners(&self) -> Vec<Banner> {
        self.banners.list()
    }

    pub fn update_banner(&self, id: BannerId, req: UpdateBannerRequest) -> RotatorResult<Banner> {
        self.banners.update(id.0, |b| {
            if let Some(title) = req.title {
                b.title = title;
            }
            if let Some(content) = req.content {
                b.content = content;
            }
            if let Some(description) = req.description {
                b.description = description;
            }
        })
    }

    pub fn soft_delete_banner(&self, id: BannerId) -> RotatorResult<()> {
        self.banners.soft_delete(id.0)
    }

    pub fn delete_banner(&self, id: BannerId) -> RotatorResult<()> {
        self.banners.delete(id.0)?;
        for mut entry in self.links.iter_mut() {
            entry.value_mut().retain(|link| link.banner_id != id);
        }
        Ok(())
    }

    // ─── Slots ─────────────────────────────────────────────────────────────

    pub fn create_slot(&self, req: CreateSlotRequest) -> Slot {
        let now = Utc::now();
        let slot = Slot {
            id: SlotId(self.slots.allocate_id()),
            description: req.description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.slots.insert(slot.clone());
        debug!(slot = %slot.id, "Slot created");
        slot
    }

    pub fn get_slot(&self, id: SlotId) -> Option<Slot> {
        self.slots.get(id.0)
    }

    pub fn list_slots(&self) -> Vec<Slot> {
        self.slots.list()
    }

    pub fn update_slot(&self, id: SlotId, req: UpdateSlotRequest) -> RotatorResult<Slot> {
        self.slots.update(id.0, |s| {
            if let Some(description) = req.description {
                s.description = description;
            }
        })
    }

    pub fn soft_delete_slot(&self, id: SlotId) -> RotatorResult<()> {
        self.slots.soft_delete(id.0)
    }

    pub fn delete_slot(&self, id: SlotId) -> RotatorResult<()> {
        self.slots.delete(id.0)?;
        self.links.remove(&id);
        Ok(())
    }

    // ─── Segments ──────────────────────────────────────────────────────────

    pub fn create_segment(&self, req: CreateSegmentRequest) -> Segment {
        let now = Utc::now();
        let segment = Segment {
            id: SegmentId(self.segments.allocate_id()),
            description: req.description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.segments.insert(segment.clone());
        debug!(segment = %segment.id, "Segment created");
        segment
    }

    pub fn get_segment(&self, id: SegmentId) -> Option<Segment> {
        self.segments.get(id.0)
    }

    pub fn list_segments(&self) -> Vec<Segment> {
        self.segments.list()
    }

    pub fn update_segment(
        &self,
        id: SegmentId,
        req: UpdateSegmentRequest,
    ) -> RotatorResult<Segment> {
        self.segments.update(id.0, |g| {
            if let Some(description) = req.description {
                g.description = description;
            }
        })
    }

    pub fn soft_delete_segment(&self, id: SegmentId) -> RotatorResult<()> {
        self.segments.soft_delete(id.0)
    }

    pub fn delete_segment(&self, id: SegmentId) -> RotatorResult<()> {
        self.segments.delete(id.0)
    }

    // ─── Banner ↔ Slot ─────────────────────────────────────────────────────

    pub fn add_banner_to_slot(&self, banner: BannerId, slot: SlotId) -> RotatorResult<()> {
        if !self.banners.contains_live(banner.0) {
            return Err(RotatorError::not_found("banner", banner.0));
        }
        if !self.slots.contains_live(slot.0) {
            return Err(RotatorError::not_found("slot", slot.0));
        }

        let mut links = self.links.entry(slot).or_default();
        if links.iter().any(|link| link.banner_id == banner) {
            return Err(RotatorError::Conflict(format!(
                "banner {banner} is already in slot {slot}"
            )));
        }
        links.push(BannerSlotLink {
            banner_id: banner,
            slot_id: slot,
            created_at: Utc::now(),
        });
        info!(banner = %banner, slot = %slot, "Banner added to slot");
        Ok(())
    }

    pub fn remove_banner_from_slot(&self, banner: BannerId, slot: SlotId) -> RotatorResult<()> {
        let removed = self
            .links
            .get_mut(&slot)
            .map(|mut links| {
                let before = links.len();
                links.retain(|link| link.banner_id != banner);
                before != links.len()
            })
            .unwrap_or(false);

        if !removed {
            return Err(RotatorError::NotFound {
                entity: "banner-slot relation",
                id: banner.0,
            });
        }
        info!(banner = %banner, slot = %slot, "Banner removed from slot");
        Ok(())
    }

    pub fn is_banner_in_slot(&self, banner: BannerId, slot: SlotId) -> bool {
        self.links
            .get(&slot)
            .map(|links| links.iter().any(|link| link.banner_id == banner))
            .unwrap_or(false)
    }

    /// Every linked banner, in link order, including soft-deleted ones.
    pub fn banners_in_slot(&self, slot: SlotId) -> Vec<BannerId> {
        self.links
            .get(&slot)
            .map(|links| links.iter().map(|link| link.banner_id).collect())
            .unwrap_or_default()
    }

    /// Banners eligible for display: the slot must be live, and soft-deleted
    /// banners are skipped. Link order is preserved.
    pub fn eligible_banners(&self, slot: SlotId) -> Vec<BannerId> {
        if !self.slots.contains_live(slot.0) {
            return Vec::new();
        }
        self.banners_in_slot(slot)
            .into_iter()
            .filter(|id| self.banners.contains_live(id.0))
            .collect()
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlotIndex for CatalogStore {
    async fn candidates_for(&self, slot: SlotId) -> RotatorResult<Vec<BannerId>> {
        Ok(self.eligible_banners(slot))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn banner(store: &CatalogStore, title: &str) -> BannerId {
        store
            .create_banner(CreateBannerRequest {
                title: title.to_string(),
                content: format!("<img src='{title}.png'>"),
                description: String::new(),
            })
            .id
    }

    fn slot(store: &CatalogStore) -> SlotId {
        store
            .create_slot(CreateSlotRequest {
                description: "header".to_string(),
            })
            .id
    }

    #[test]
    fn test_ids_are_sequential_per_entity() {
        let store = CatalogStore::new();
        assert_eq!(banner(&store, "a"), BannerId(1));
        assert_eq!(banner(&store, "b"), BannerId(2));
        assert_eq!(slot(&store), SlotId(1));
        let segment = store.create_segment(CreateSegmentRequest {
            description: "teens".to_string(),
        });
        assert_eq!(segment.id, SegmentId(1));
    }

    #[test]
    fn test_soft_delete_hides_row() {
        let store = CatalogStore::new();
        let a = banner(&store, "a");
        let b = banner(&store, "b");

        store.soft_delete_banner(a).unwrap();
        assert!(store.get_banner(a).is_none());
        assert_eq!(
            store.list_banners().iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![b]
        );

        // Second soft delete and updates on the deleted row are NotFound.
        assert!(store.soft_delete_banner(a).unwrap_err().is_not_found());
        assert!(store
            .update_banner(a, UpdateBannerRequest::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_update_patches_given_fields() {
        let store = CatalogStore::new();
        let a = banner(&store, "a");
        let before = store.get_banner(a).unwrap();

        let updated = store
            .update_banner(
                a,
                UpdateBannerRequest {
                    title: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.content, before.content);
        assert!(updated.updated_at >= before.updated_at);
    }

    #[test]
    fn test_physical_delete() {
        let store = CatalogStore::new();
        let s = slot(&store);
        store.delete_slot(s).unwrap();
        assert!(store.get_slot(s).is_none());
        assert!(store.delete_slot(s).unwrap_err().is_not_found());
    }

    #[test]
    fn test_links_keep_creation_order() {
        let store = CatalogStore::new();
        let s = slot(&store);
        let ids: Vec<BannerId> = ["c", "a", "b"].iter().map(|t| banner(&store, t)).collect();
        for id in ids.iter().rev() {
            store.add_banner_to_slot(*id, s).unwrap();
        }

        let expected: Vec<BannerId> = ids.iter().rev().copied().collect();
        assert_eq!(store.banners_in_slot(s), expected);
        assert!(store.is_banner_in_slot(ids[0], s));
    }

    #[test]
    fn test_add_link_rejects_duplicates_and_unknowns() {
        let store = CatalogStore::new();
        let s = slot(&store);
        let a = banner(&store, "a");

        store.add_banner_to_slot(a, s).unwrap();
        assert!(matches!(
            store.add_banner_to_slot(a, s).unwrap_err(),
            RotatorError::Conflict(_)
        ));
        assert!(store.add_banner_to_slot(BannerId(99), s).unwrap_err().is_not_found());
        assert!(store.add_banner_to_slot(a, SlotId(99)).unwrap_err().is_not_found());

        store.soft_delete_slot(s).unwrap();
        let b = banner(&store, "b");
        assert!(store.add_banner_to_slot(b, s).unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_link() {
        let store = CatalogStore::new();
        let s = slot(&store);
        let a = banner(&store, "a");
        store.add_banner_to_slot(a, s).unwrap();

        store.remove_banner_from_slot(a, s).unwrap();
        assert!(!store.is_banner_in_slot(a, s));
        assert!(store.remove_banner_from_slot(a, s).unwrap_err().is_not_found());
    }

    #[test]
    fn test_deleting_banner_drops_its_links() {
        let store = CatalogStore::new();
        let s = slot(&store);
        let a = banner(&store, "a");
        let b = banner(&store, "b");
        store.add_banner_to_slot(a, s).unwrap();
        store.add_banner_to_slot(b, s).unwrap();

        store.delete_banner(a).unwrap();
        assert_eq!(store.banners_in_slot(s), vec![b]);
    }

    #[tokio::test]
    async fn test_candidates_skip_soft_deleted_banners() {
        let store = CatalogStore::new();
        let s = slot(&store);
        let a = banner(&store, "a");
        let b = banner(&store, "b");
        let c = banner(&store, "c");
        for id in [a, b, c] {
            store.add_banner_to_slot(id, s).unwrap();
        }
        store.soft_delete_banner(b).unwrap();

        assert_eq!(store.candidates_for(s).await.unwrap(), vec![a, c]);
        assert_eq!(store.banners_in_slot(s), vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_candidates_empty_for_unknown_or_deleted_slot() {
        let store = CatalogStore::new();
        assert!(store.candidates_for(SlotId(1)).await.unwrap().is_empty());

        let s = slot(&store);
        let a = banner(&store, "a");
        store.add_banner_to_slot(a, s).unwrap();
        store.soft_delete_slot(s).unwrap();
        assert!(store.candidates_for(s).await.unwrap().is_empty());
    }

    #[test]
    fn test_models_serialize_without_deleted_at_when_live() {
        let store = CatalogStore::new();
        let s = store.create_slot(CreateSlotRequest {
            description: "sidebar".to_string(),
        });
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["id"], 1);
        assert!(json.get("deleted_at").is_none());
    }
}
