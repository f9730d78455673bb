//! Persistence for menu items, contact submissions and social links.
//!
//! Handlers talk to the [`Store`] trait only. [`MemoryStore`] keeps data in
//! concurrent maps and can snapshot itself to a JSON file.

pub mod memory;
pub mod seed;

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;

use crate::contact::types::{ContactSubmission, NewContactSubmission};
use crate::menu::types::{MenuItem, MenuItemPatch, MilkUpcharge, NewMenuItem};
use crate::social::types::SocialLink;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Conditions for bulk menu deletion. Empty conditions match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuFilter {
    pub category: Option<String>,
    pub featured: Option<bool>,
}

impl MenuFilter {
    pub fn matches(&self, item: &MenuItem) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| c.eq_ignore_ascii_case(&item.category))
            && self.featured.map_or(true, |f| f == item.is_featured)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_menu(&self, featured_only: bool) -> Result<Vec<MenuItem>, StoreError>;

    async fn get_menu_item(&self, id: u64) -> Result<Option<MenuItem>, StoreError>;

    async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, StoreError>;

    /// Fails with [`StoreError::NotFound`] for unknown ids.
    async fn update_menu_item(&self, id: u64, patch: MenuItemPatch) -> Result<MenuItem, StoreError>;

    /// Fails with [`StoreError::NotFound`] for unknown ids.
    async fn delete_menu_item(&self, id: u64) -> Result<(), StoreError>;

    /// Remove every item matching `filter`. Returns how many were removed.
    async fn delete_menu_where(&self, filter: MenuFilter) -> Result<usize, StoreError>;

    async fn list_milk_upcharges(&self) -> Result<Vec<MilkUpcharge>, StoreError>;

    async fn upsert_milk_upcharge(&self, upcharge: MilkUpcharge) -> Result<MilkUpcharge, StoreError>;

    async fn create_contact(&self, submission: NewContactSubmission) -> Result<ContactSubmission, StoreError>;

    async fn list_contacts(&self) -> Result<Vec<ContactSubmission>, StoreError>;

    async fn list_social_links(&self, enabled_only: bool) -> Result<Vec<SocialLink>, StoreError>;

    /// Insert or replace the link for `platform`.
    async fn upsert_social_link(
        &self,
        platform: &str,
        url: &str,
        enabled: bool,
    ) -> Result<SocialLink, StoreError>;

    /// Persist pending state, if the store has anywhere to put it.
    async fn flush(&self) -> Result<(), StoreError>;
}

/// Milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
