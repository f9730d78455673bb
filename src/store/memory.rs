//! In-memory store with optional JSON snapshot persistence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::contact::types::{ContactSubmission, NewContactSubmission};
use crate::menu::types::{MenuItem, MenuItemPatch, MilkUpcharge, NewMenuItem, MENU_SCHEMA_VERSION};
use crate::social::types::SocialLink;
use crate::store::{epoch_ms, MenuFilter, Store, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    menu_items: Vec<MenuItem>,
    milk_upcharges: Vec<MilkUpcharge>,
    contacts: Vec<ContactSubmission>,
    social_links: Vec<SocialLink>,
}

/// A thread-safe store backed by concurrent maps.
#[derive(Default)]
pub struct MemoryStore {
    menu: DashMap<u64, MenuItem>,
    milk: DashMap<String, MilkUpcharge>,
    contacts: DashMap<u64, ContactSubmission>,
    social: DashMap<String, SocialLink>,
    next_menu_id: AtomicU64,
    next_contact_id: AtomicU64,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            next_menu_id: AtomicU64::new(1),
            next_contact_id: AtomicU64::new(1),
            persistence_path,
            ..Default::default()
        }
    }

    /// Load from a snapshot file if it exists.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let store = Self::new(Some(path.to_path_buf()));
        if !path.exists() {
            return Ok(store);
        }

        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;

        let max_menu = snapshot.menu_items.iter().map(|i| i.id).max().unwrap_or(0);
        let max_contact = snapshot.contacts.iter().map(|c| c.id).max().unwrap_or(0);
        store.next_menu_id.store(max_menu + 1, Ordering::SeqCst);
        store.next_contact_id.store(max_contact + 1, Ordering::SeqCst);

        for item in snapshot.menu_items {
            store.menu.insert(item.id, item);
        }
        for upcharge in snapshot.milk_upcharges {
            store.milk.insert(upcharge.milk_type.clone(), upcharge);
        }
        for contact in snapshot.contacts {
            store.contacts.insert(contact.id, contact);
        }
        for link in snapshot.social_links {
            store.social.insert(link.platform.clone(), link);
        }

        tracing::info!(
            path = %path.display(),
            menu_items = store.menu.len(),
            contacts = store.contacts.len(),
            "Loaded store snapshot"
        );
        Ok(store)
    }

    /// Write a snapshot to the persistence path, if one is set.
    pub fn save_to_file(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let mut snapshot = Snapshot {
            menu_items: self.menu.iter().map(|r| r.value().clone()).collect(),
            milk_upcharges: self.milk.iter().map(|r| r.value().clone()).collect(),
            contacts: self.contacts.iter().map(|r| r.value().clone()).collect(),
            social_links: self.social.iter().map(|r| r.value().clone()).collect(),
        };
        snapshot.menu_items.sort_by_key(|i| i.id);
        snapshot.contacts.sort_by_key(|c| c.id);

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &snapshot)?;
        tracing::info!(path = %path.display(), "Saved store snapshot");
        Ok(())
    }

    pub fn menu_len(&self) -> usize {
        self.menu.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_menu(&self, featured_only: bool) -> Result<Vec<MenuItem>, StoreError> {
        let mut items: Vec<MenuItem> = self
            .menu
            .iter()
            .filter(|r| !featured_only || r.value().is_featured)
            .map(|r| r.value().clone())
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    async fn get_menu_item(&self, id: u64) -> Result<Option<MenuItem>, StoreError> {
        Ok(self.menu.get(&id).map(|r| r.value().clone()))
    }

    async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, StoreError> {
        let id = self.next_menu_id.fetch_add(1, Ordering::SeqCst);
        let now = epoch_ms();
        let item = MenuItem {
            id,
            schema_version: MENU_SCHEMA_VERSION,
            name: item.name,
            description: item.description,
            category: item.category,
            is_featured: item.is_featured,
            ingredients: item.ingredients,
            pricing: item.pricing,
            image_url: item.image_url,
            created_at: now,
            updated_at: now,
        };
        self.menu.insert(id, item.clone());
        Ok(item)
    }

    async fn update_menu_item(&self, id: u64, patch: MenuItemPatch) -> Result<MenuItem, StoreError> {
        let mut entry = self.menu.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply(&mut entry);
        entry.updated_at = epoch_ms();
        Ok(entry.clone())
    }

    async fn delete_menu_item(&self, id: u64) -> Result<(), StoreError> {
        self.menu
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete_menu_where(&self, filter: MenuFilter) -> Result<usize, StoreError> {
        let before = self.menu.len();
        self.menu.retain(|_, item| !filter.matches(item));
        Ok(before.saturating_sub(self.menu.len()))
    }

    async fn list_milk_upcharges(&self) -> Result<Vec<MilkUpcharge>, StoreError> {
        let mut upcharges: Vec<MilkUpcharge> = self.milk.iter().map(|r| r.value().clone()).collect();
        upcharges.sort_by(|a, b| a.milk_type.cmp(&b.milk_type));
        Ok(upcharges)
    }

    async fn upsert_milk_upcharge(&self, upcharge: MilkUpcharge) -> Result<MilkUpcharge, StoreError> {
        self.milk.insert(upcharge.milk_type.clone(), upcharge.clone());
        Ok(upcharge)
    }

    async fn create_contact(&self, submission: NewContactSubmission) -> Result<ContactSubmission, StoreError> {
        let id = self.next_contact_id.fetch_add(1, Ordering::SeqCst);
        let saved = ContactSubmission {
            id,
            name: submission.name,
            email: submission.email,
            phone: submission.phone,
            subject: submission.subject,
            message: submission.message,
            inquiry_type: submission.inquiry_type,
            created_at: epoch_ms(),
        };
        self.contacts.insert(id, saved.clone());
        Ok(saved)
    }

    async fn list_contacts(&self) -> Result<Vec<ContactSubmission>, StoreError> {
        let mut contacts: Vec<ContactSubmission> =
            self.contacts.iter().map(|r| r.value().clone()).collect();
        contacts.sort_by_key(|c| c.id);
        Ok(contacts)
    }

    async fn list_social_links(&self, enabled_only: bool) -> Result<Vec<SocialLink>, StoreError> {
        let mut links: Vec<SocialLink> = self
            .social
            .iter()
            .filter(|r| !enabled_only || r.value().enabled)
            .map(|r| r.value().clone())
            .collect();
        links.sort_by(|a, b| a.platform.cmp(&b.platform));
        Ok(links)
    }

    async fn upsert_social_link(
        &self,
        platform: &str,
        url: &str,
        enabled: bool,
    ) -> Result<SocialLink, StoreError> {
        let link = SocialLink {
            platform: platform.to_string(),
            url: url.to_string(),
            enabled,
            updated_at: epoch_ms(),
        };
        self.social.insert(link.platform.clone(), link.clone());
        Ok(link)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.save_to_file()
    }
}

/// Collect a per-category count, used for startup logging.
pub fn category_counts(items: &[MenuItem]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(item.category.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::types::Pricing;

    fn new_item(name: &str, category: &str, featured: bool) -> NewMenuItem {
        NewMenuItem {
            name: name.into(),
            description: None,
            category: category.into(),
            is_featured: featured,
            ingredients: None,
            pricing: Pricing::PerItem { price: 4.0 },
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_menu_crud() {
        let store = MemoryStore::new(None);
        let created = store.create_menu_item(new_item("Flat White", "coffee", true)).await.unwrap();
        assert_eq!(created.id, 1);

        let patch = MenuItemPatch {
            is_featured: Some(false),
            ..Default::default()
        };
        let updated = store.update_menu_item(created.id, patch).await.unwrap();
        assert!(!updated.is_featured);
        assert_eq!(updated.name, "Flat White");

        store.delete_menu_item(created.id).await.unwrap();
        assert!(store.get_menu_item(created.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_menu_item(created.id).await,
            Err(StoreError::NotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_featured_filter_and_conditional_delete() {
        let store = MemoryStore::new(None);
        store.create_menu_item(new_item("Flat White", "coffee", true)).await.unwrap();
        store.create_menu_item(new_item("Americano", "coffee", false)).await.unwrap();
        store.create_menu_item(new_item("Muffin", "pastries", false)).await.unwrap();

        assert_eq!(store.list_menu(true).await.unwrap().len(), 1);

        let removed = store
            .delete_menu_where(MenuFilter {
                category: Some("Coffee".into()),
                featured: None,
            })
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.menu_len(), 1);
    }

    #[tokio::test]
    async fn test_social_upsert_replaces() {
        let store = MemoryStore::new(None);
        store.upsert_social_link("instagram", "https://instagram.com/a", true).await.unwrap();
        store.upsert_social_link("instagram", "https://instagram.com/b", false).await.unwrap();

        let all = store.list_social_links(false).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].url, "https://instagram.com/b");
        assert!(store.list_social_links(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new(Some(path.clone()));
        store.create_menu_item(new_item("Flat White", "coffee", true)).await.unwrap();
        store.flush().await.unwrap();

        let loaded = MemoryStore::load_from_file(&path).unwrap();
        assert_eq!(loaded.menu_len(), 1);
        let next = loaded.create_menu_item(new_item("Latte", "coffee", false)).await.unwrap();
        assert_eq!(next.id, 2);
    }
}
