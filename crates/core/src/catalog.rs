//! In-memory indices over the product catalog.

use std::collections::{BTreeSet, HashMap};

use crate::domain::product::{Product, ProductId};
use crate::errors::{EngineError, EngineResult, SnapshotIntegrityError};

/// Product lookup by identifier plus attribute postings for category, brand
/// and department. Built once per snapshot and never modified afterwards.
#[derive(Clone, Debug, Default)]
pub struct CatalogIndex {
    products: HashMap<ProductId, Product>,
    ordered_ids: Vec<ProductId>,
    by_category: HashMap<String, BTreeSet<ProductId>>,
    by_brand: HashMap<String, BTreeSet<ProductId>>,
    by_department: HashMap<String, BTreeSet<ProductId>>,
}

impl CatalogIndex {
    pub fn build(products: Vec<Product>) -> Result<Self, SnapshotIntegrityError> {
        let mut index = Self {
            products: HashMap::with_capacity(products.len()),
            ordered_ids: Vec::with_capacity(products.len()),
            ..Self::default()
        };

        for product in products {
            let id = product.id;
            if index.products.contains_key(&id) {
                return Err(SnapshotIntegrityError::DuplicateId { entity: "product", id: id.0 });
            }

            index.by_category.entry(product.category.clone()).or_default().insert(id);
            if let Some(brand) = &product.brand {
                index.by_brand.entry(brand.clone()).or_default().insert(id);
            }
            if let Some(department) = &product.department {
                index.by_department.entry(department.clone()).or_default().insert(id);
            }

            index.ordered_ids.push(id);
            index.products.insert(id, product);
        }

        index.ordered_ids.sort_unstable();
        Ok(index)
    }

    /// Looks up a product that must exist. A miss means the caller holds an
    /// identifier the snapshot does not know about.
    pub fn get(&self, product_id: ProductId) -> EngineResult<&Product> {
        self.products
            .get(&product_id)
            .ok_or_else(|| EngineError::not_found("product", product_id.0))
    }

    pub fn find(&self, product_id: ProductId) -> Option<&Product> {
        self.products.get(&product_id)
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains_key(&product_id)
    }

    /// All product identifiers, ascending.
    pub fn product_ids(&self) -> &[ProductId] {
        &self.ordered_ids
    }

    /// All products in ascending identifier order.
    pub fn products(&self) -> impl Iterator<Item = &Product> + '_ {
        self.ordered_ids.iter().filter_map(|id| self.products.get(id))
    }

    pub fn len(&self) -> usize {
        self.ordered_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_ids.is_empty()
    }

    pub fn in_category(&self, category: &str) -> Option<&BTreeSet<ProductId>> {
        self.by_category.get(category)
    }

    pub fn of_brand(&self, brand: &str) -> Option<&BTreeSet<ProductId>> {
        self.by_brand.get(brand)
    }

    pub fn in_department(&self, department: &str) -> Option<&BTreeSet<ProductId>> {
        self.by_department.get(department)
    }
}
