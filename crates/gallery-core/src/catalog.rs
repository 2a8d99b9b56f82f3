use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::category::Category;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub locator: String,
    pub label: String,
    pub category: Category,
    #[serde(default)]
    pub is_local: bool,
}

impl ImageDescriptor {
    pub fn remote(locator: impl Into<String>, label: impl Into<String>, category: Category) -> Self {
        Self {
            locator: locator.into(),
            label: label.into(),
            category,
            is_local: false,
        }
    }

    pub fn local(locator: impl Into<String>, label: impl Into<String>, category: Category) -> Self {
        Self {
            locator: locator.into(),
            label: label.into(),
            category,
            is_local: true,
        }
    }
}

/// Append-only list of every image the gallery knows about. Positions are
/// stable and are the addressing scheme used by views and the viewer.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    items: Vec<ImageDescriptor>,
}

impl Catalog {
    pub fn new(items: Vec<ImageDescriptor>) -> Self {
        Self { items }
    }

    pub fn seeded() -> Self {
        Self::new(default_seed())
    }

    pub fn push(&mut self, item: ImageDescriptor) -> usize {
        let idx = self.items.len();
        self.items.push(item);
        idx
    }

    pub fn get(&self, idx: usize) -> Option<&ImageDescriptor> {
        self.items.get(idx)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageDescriptor> {
        self.items.iter()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackTable {
    entries: HashMap<Category, String>,
}

impl FallbackTable {
    pub fn new(entries: HashMap<Category, String>) -> Self {
        let mut entries = entries;
        entries
            .entry(Category::Misc)
            .or_insert_with(|| DEFAULT_MISC_FALLBACK.to_string());
        Self { entries }
    }

    pub fn locator_for(&self, category: Category) -> &str {
        self.entries
            .get(&category)
            .or_else(|| self.entries.get(&Category::Misc))
            .map(String::as_str)
            .unwrap_or(DEFAULT_MISC_FALLBACK)
    }
}

impl Default for FallbackTable {
    fn default() -> Self {
        let entries = [
            (
                Category::Nature,
                "https://images.unsplash.com/photo-1441974231531-c6227db76b6e",
            ),
            (
                Category::Architecture,
                "https://images.unsplash.com/photo-1487958449943-2429e8be8625",
            ),
            (
                Category::Animals,
                "https://images.unsplash.com/photo-1474511320723-9a56873867b5",
            ),
            (Category::Misc, DEFAULT_MISC_FALLBACK),
        ]
        .into_iter()
        .map(|(category, locator)| (category, locator.to_string()))
        .collect();
        Self { entries }
    }
}

const DEFAULT_MISC_FALLBACK: &str = "https://images.unsplash.com/photo-1493246507139-91e8fad9978e";

pub fn default_seed() -> Vec<ImageDescriptor> {
    let seed = [
        (
            "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?ixlib=rb-4.0.3",
            "Mountain range at dawn",
            Category::Nature,
        ),
        (
            "https://images.unsplash.com/photo-1470071459604-3b5ec3a7fe05",
            "Misty valley",
            Category::Nature,
        ),
        (
            "https://images.unsplash.com/photo-1447752875215-b2761acb3c5d",
            "Forest path",
            Category::Nature,
        ),
        (
            "https://images.unsplash.com/photo-1486406146926-c627a92ad1ab",
            "Glass tower",
            Category::Architecture,
        ),
        (
            "https://images.unsplash.com/photo-1511818966892-d7d671e672a2",
            "Concrete curves",
            Category::Architecture,
        ),
        (
            "https://images.unsplash.com/photo-1449157291145-7efd050a4d0e",
            "City bridge at night",
            Category::Architecture,
        ),
        (
            "https://images.unsplash.com/photo-1425082661705-1834bfd09dca",
            "Hamster portrait",
            Category::Animals,
        ),
        (
            "https://images.unsplash.com/photo-1437622368342-7a3d73a34c8f",
            "Sea turtle",
            Category::Animals,
        ),
        (
            "https://images.unsplash.com/photo-1546182990-dffeafbe841d",
            "Lion resting",
            Category::Animals,
        ),
        (
            "https://images.unsplash.com/photo-1495567720989-cebdbdd97913",
            "Coffee and notes",
            Category::Misc,
        ),
        (
            "https://images.unsplash.com/photo-1513151233558-d860c5398176",
            "Festival lights",
            Category::Misc,
        ),
        (
            "https://images.unsplash.com/photo-1503023345310-bd7c1de61c7d",
            "Street portrait",
            Category::Misc,
        ),
    ];

    seed.into_iter()
        .map(|(locator, label, category)| ImageDescriptor::remote(locator, label, category))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{Catalog, FallbackTable, ImageDescriptor};
    use crate::category::Category;

    #[test]
    fn seeded_catalog_covers_every_category() {
        let catalog = Catalog::seeded();
        assert_eq!(catalog.len(), 12);
        for category in Category::ALL {
            assert!(catalog.iter().any(|item| item.category == category));
        }
        assert!(catalog.iter().all(|item| !item.is_local));
    }

    #[test]
    fn push_returns_insertion_position() {
        let mut catalog = Catalog::default();
        let a = catalog.push(ImageDescriptor::remote("a", "A", Category::Nature));
        let b = catalog.push(ImageDescriptor::local("data:,", "B", Category::Misc));
        assert_eq!((a, b), (0, 1));
        assert_eq!(catalog.get(1).map(|item| item.is_local), Some(true));
    }

    #[test]
    fn fallback_lookup_uses_misc_for_missing_category() {
        let mut entries = HashMap::new();
        entries.insert(Category::Nature, "https://example.com/n.jpg".to_string());
        entries.insert(Category::Misc, "https://example.com/m.jpg".to_string());
        let table = FallbackTable::new(entries);
        assert_eq!(table.locator_for(Category::Nature), "https://example.com/n.jpg");
        assert_eq!(table.locator_for(Category::Animals), "https://example.com/m.jpg");
    }

    #[test]
    fn fallback_table_always_has_misc() {
        let table = FallbackTable::new(HashMap::new());
        assert!(!table.locator_for(Category::Architecture).is_empty());
    }
}
