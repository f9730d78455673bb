//! Menu item model.

use serde::{Deserialize, Serialize};

/// Current version of the stored menu item shape.
pub const MENU_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Regular,
    Large,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizePrice {
    pub size: Size,
    pub price: f64,
}

/// How an item is priced. The mode is explicit, never inferred from
/// which optional fields happen to be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Pricing {
    PerItem { price: f64 },
    PerSize { sizes: Vec<SizePrice> },
}

impl Pricing {
    /// Lowest price a customer can pay for the item.
    pub fn from_price(&self) -> Option<f64> {
        match self {
            Pricing::PerItem { price } => Some(*price),
            Pricing::PerSize { sizes } => sizes.iter().map(|s| s.price).reduce(f64::min),
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        let valid = |p: f64| p.is_finite() && p >= 0.0;
        match self {
            Pricing::PerItem { price } if !valid(*price) => {
                Err("Price must be a non-negative number.")
            }
            Pricing::PerSize { sizes } if sizes.is_empty() => {
                Err("At least one size (small/large) is required.")
            }
            Pricing::PerSize { sizes } if sizes.iter().any(|s| !valid(s.price)) => {
                Err("Price must be a non-negative number.")
            }
            Pricing::PerSize { sizes } => {
                let mut seen = Vec::with_capacity(sizes.len());
                for s in sizes {
                    if seen.contains(&s.size) {
                        return Err("Each size may only be listed once.");
                    }
                    seen.push(s.size);
                }
                Ok(())
            }
            Pricing::PerItem { .. } => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: u64,
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub is_featured: bool,
    pub ingredients: Option<Vec<String>>,
    pub pricing: Pricing,
    pub image_url: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub updated_at: u64,
}

fn schema_version() -> u32 {
    MENU_SCHEMA_VERSION
}

/// Fields for a new item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    pub pricing: Pricing,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial update. Absent fields are left alone; `Some(None)` clears
/// an optional field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub ingredients: Option<Option<Vec<String>>>,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl MenuItemPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, item: &mut MenuItem) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(category) = self.category {
            item.category = category;
        }
        if let Some(is_featured) = self.is_featured {
            item.is_featured = is_featured;
        }
        if let Some(ingredients) = self.ingredients {
            item.ingredients = ingredients;
        }
        if let Some(pricing) = self.pricing {
            item.pricing = pricing;
        }
        if let Some(image_url) = self.image_url {
            item.image_url = image_url;
        }
    }
}

/// Optional upcharge for an alternative milk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilkUpcharge {
    pub milk_type: String,
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pricing_is_tagged() {
        let per_size: Pricing = serde_json::from_value(json!({
            "mode": "per_size",
            "sizes": [{"size": "small", "price": 4.2}, {"size": "large", "price": 5.0}]
        }))
        .unwrap();
        assert_eq!(per_size.from_price(), Some(4.2));

        let untagged = serde_json::from_value::<Pricing>(json!({"price": 4.0}));
        assert!(untagged.is_err());
    }

    #[test]
    fn test_pricing_validation() {
        assert!(Pricing::PerSize { sizes: vec![] }.validate().is_err());
        assert!(Pricing::PerItem { price: -1.0 }.validate().is_err());
        assert!(Pricing::PerItem { price: f64::NAN }.validate().is_err());
        assert!(Pricing::PerSize {
            sizes: vec![
                SizePrice { size: Size::Small, price: 1.0 },
                SizePrice { size: Size::Small, price: 2.0 },
            ]
        }
        .validate()
        .is_err());
        assert!(Pricing::PerItem { price: 4.0 }.validate().is_ok());
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: MenuItemPatch =
            serde_json::from_value(json!({"isFeatured": true, "description": null})).unwrap();
        assert_eq!(patch.is_featured, Some(true));
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.name, None);

        let empty: MenuItemPatch = serde_json::from_value(json!({})).unwrap();
        assert!(empty.is_empty());
    }
}
