//! Example data for a fresh deployment.

use crate::menu::types::{MilkUpcharge, NewMenuItem, Pricing, Size, SizePrice};
use crate::store::memory::category_counts;
use crate::store::{MenuFilter, Store, StoreError};

fn sized(small: f64, large: f64) -> Pricing {
    Pricing::PerSize {
        sizes: vec![
            SizePrice { size: Size::Small, price: small },
            SizePrice { size: Size::Large, price: large },
        ],
    }
}

fn example_items() -> Vec<NewMenuItem> {
    vec![
        NewMenuItem {
            name: "Flat White".into(),
            description: Some("Velvety milk over a rich ristretto shot.".into()),
            category: "coffee".into(),
            is_featured: true,
            ingredients: None,
            pricing: sized(4.2, 5.0),
            image_url: None,
        },
        NewMenuItem {
            name: "Americano".into(),
            description: Some("Smooth, long espresso with hot water.".into()),
            category: "espresso".into(),
            is_featured: false,
            ingredients: None,
            pricing: sized(3.8, 4.5),
            image_url: None,
        },
        NewMenuItem {
            name: "Blueberry Muffin".into(),
            description: Some("Baked fresh daily.".into()),
            category: "pastries".into(),
            is_featured: false,
            ingredients: None,
            pricing: Pricing::PerItem { price: 4.0 },
            image_url: None,
        },
    ]
}

fn example_upcharges() -> Vec<MilkUpcharge> {
    [("almond", 0.8), ("oat", 0.8), ("soy", 0.6)]
        .into_iter()
        .map(|(milk_type, price)| MilkUpcharge {
            milk_type: milk_type.into(),
            price,
        })
        .collect()
}

/// Replace the menu with the example items.
pub async fn reseed(store: &dyn Store) -> Result<usize, StoreError> {
    store.delete_menu_where(MenuFilter::default()).await?;

    for item in example_items() {
        store.create_menu_item(item).await?;
    }
    for upcharge in example_upcharges() {
        store.upsert_milk_upcharge(upcharge).await?;
    }

    let items = store.list_menu(false).await?;
    tracing::info!(
        items = items.len(),
        categories = ?category_counts(&items),
        "Seeded example menu"
    );
    Ok(items.len())
}

/// Seed only when the menu is empty.
pub async fn seed_if_empty(store: &dyn Store) -> Result<bool, StoreError> {
    if !store.list_menu(false).await?.is_empty() {
        return Ok(false);
    }
    reseed(store).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_seed_once() {
        let store = MemoryStore::new(None);
        assert!(seed_if_empty(&store).await.unwrap());
        assert!(!seed_if_empty(&store).await.unwrap());
        assert_eq!(store.list_menu(false).await.unwrap().len(), 3);
        assert_eq!(store.list_milk_upcharges().await.unwrap().len(), 3);
    }
}
