use crate::catalog::{Catalog, ImageDescriptor};
use crate::category::CategoryFilter;

/// The displayed subsequence of a catalog, stored as catalog positions in
/// catalog order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilteredView {
    filter: CategoryFilter,
    indices: Vec<usize>,
}

impl FilteredView {
    pub fn derive(catalog: &Catalog, filter: CategoryFilter) -> Self {
        let indices = catalog
            .iter()
            .enumerate()
            .filter(|(_, item)| filter.matches(item.category))
            .map(|(idx, _)| idx)
            .collect();
        Self { filter, indices }
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn catalog_index(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }

    pub fn get<'a>(&self, catalog: &'a Catalog, position: usize) -> Option<&'a ImageDescriptor> {
        self.catalog_index(position).and_then(|idx| catalog.get(idx))
    }

    pub fn items<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = &'a ImageDescriptor> + 'a {
        self.indices.iter().filter_map(|idx| catalog.get(*idx))
    }

    /// Records a freshly appended catalog entry. Only valid for the entry at
    /// the end of the catalog, which keeps the view equal to a full derive.
    pub fn append_if_matches(&mut self, catalog_index: usize, item: &ImageDescriptor) -> bool {
        if !self.filter.matches(item.category) {
            return false;
        }
        debug_assert!(self.indices.last().map_or(true, |last| *last < catalog_index));
        self.indices.push(catalog_index);
        true
    }
}
