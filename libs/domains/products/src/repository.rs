use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::lookup::NaturalKey;
use crate::models::{Pagination, Product, ProductImage};

/// Opens and settles units of work.
///
/// A handle obtained from [`begin`](Self::begin) must be passed to exactly one
/// of [`commit`](Self::commit) or [`rollback`](Self::rollback). Dropping it
/// instead releases it without committing.
#[cfg_attr(test, mockall::automock(type Tx = ();))]
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    type Tx: Send + Sync;

    async fn begin(&self) -> StoreResult<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> StoreResult<()>;

    async fn rollback(&self, tx: Self::Tx) -> StoreResult<()>;
}

/// Persistence for the product aggregate
#[cfg_attr(test, mockall::automock(type Tx = ();))]
#[async_trait]
pub trait ProductStore: Send + Sync {
    type Tx: Send + Sync;

    /// Insert or replace the product row together with its images
    async fn persist(&self, product: &Product) -> StoreResult<()>;

    /// Same as [`persist`](Self::persist), inside `tx`
    async fn persist_in(&self, tx: &Self::Tx, product: &Product) -> StoreResult<()>;

    /// Load by id, images included
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Product>>;

    /// First product whose uppercased title or slug matches, images included
    async fn find_by_natural_key(&self, key: &NaturalKey) -> StoreResult<Option<Product>>;

    /// Page of products in id order
    async fn find_many(&self, page: Pagination, with_images: bool) -> StoreResult<Vec<Product>>;

    /// Delete the product; its images go with it
    async fn remove(&self, product: &Product) -> StoreResult<()>;

    /// Delete every product and image, returning the number of products removed
    async fn delete_all(&self) -> StoreResult<u64>;
}

/// Image rows addressed through their owner
#[cfg_attr(test, mockall::automock(type Tx = ();))]
#[async_trait]
pub trait ProductImageStore: Send + Sync {
    type Tx: Send + Sync;

    async fn delete_all_for_owner(&self, tx: &Self::Tx, owner_id: Uuid) -> StoreResult<u64>;

    /// Committed images of `owner_id` in position order
    async fn find_all_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<ProductImage>>;
}

#[derive(Debug, Default, Clone)]
struct CatalogState {
    /// Product rows; `images` is always empty here
    products: BTreeMap<Uuid, Product>,
    images: Vec<ProductImage>,
}

impl CatalogState {
    fn check_unique(&self, product: &Product) -> StoreResult<()> {
        let title = product.title.to_uppercase();

        for other in self.products.values().filter(|p| p.id != product.id) {
            if other.title.to_uppercase() == title {
                return Err(StoreError::UniqueViolation(format!(
                    "Key (upper(title))=({}) already exists.",
                    title
                )));
            }
            if other.slug == product.slug {
                return Err(StoreError::UniqueViolation(format!(
                    "Key (slug)=({}) already exists.",
                    product.slug
                )));
            }
        }
        Ok(())
    }

    fn save(&mut self, product: &Product) -> StoreResult<()> {
        self.check_unique(product)?;

        let row = Product {
            images: Vec::new(),
            ..product.clone()
        };
        self.products.insert(product.id, row);

        for image in &product.images {
            let image = ProductImage {
                product_id: product.id,
                ..image.clone()
            };
            match self.images.iter_mut().find(|i| i.id == image.id) {
                Some(existing) => *existing = image,
                None => self.images.push(image),
            }
        }
        Ok(())
    }

    fn images_of(&self, owner_id: Uuid) -> Vec<ProductImage> {
        let mut images: Vec<ProductImage> = self
            .images
            .iter()
            .filter(|image| image.product_id == owner_id)
            .cloned()
            .collect();
        images.sort_by_key(|image| image.position);
        images
    }

    fn with_images(&self, product: &Product) -> Product {
        Product {
            images: self.images_of(product.id),
            ..product.clone()
        }
    }

    fn delete_images_of(&mut self, owner_id: Uuid) -> u64 {
        let before = self.images.len();
        self.images.retain(|image| image.product_id != owner_id);
        (before - self.images.len()) as u64
    }

    fn apply(&mut self, write: &StagedWrite) -> StoreResult<()> {
        match write {
            StagedWrite::Save(product) => self.save(product),
            StagedWrite::DeleteImages(owner_id) => {
                self.delete_images_of(*owner_id);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
enum StagedWrite {
    Save(Product),
    DeleteImages(Uuid),
}

/// Unit of work for [`InMemoryCatalog`].
///
/// Writes are checked against a private working copy and replayed onto the
/// shared state at commit, so nothing is visible to readers before then.
#[derive(Debug)]
pub struct InMemoryTx {
    inner: Mutex<TxState>,
}

#[derive(Debug)]
struct TxState {
    working: CatalogState,
    writes: Vec<StagedWrite>,
}

impl InMemoryTx {
    async fn stage(&self, write: StagedWrite) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let affected = match &write {
            StagedWrite::Save(product) => {
                inner.working.save(product)?;
                1
            }
            StagedWrite::DeleteImages(owner_id) => inner.working.delete_images_of(*owner_id),
        };
        inner.writes.push(write);
        Ok(affected)
    }
}

/// In-memory catalog backing all three store traits (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionCoordinator for InMemoryCatalog {
    type Tx = InMemoryTx;

    async fn begin(&self) -> StoreResult<InMemoryTx> {
        let working = self.state.read().await.clone();
        Ok(InMemoryTx {
            inner: Mutex::new(TxState {
                working,
                writes: Vec::new(),
            }),
        })
    }

    async fn commit(&self, tx: InMemoryTx) -> StoreResult<()> {
        let TxState { writes, .. } = tx.inner.into_inner();
        let mut state = self.state.write().await;

        // Replay on a copy so a late conflict leaves the shared state untouched
        let mut next = state.clone();
        for write in &writes {
            next.apply(write)?;
        }
        *state = next;
        Ok(())
    }

    async fn rollback(&self, tx: InMemoryTx) -> StoreResult<()> {
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl ProductStore for InMemoryCatalog {
    type Tx = InMemoryTx;

    async fn persist(&self, product: &Product) -> StoreResult<()> {
        self.state.write().await.save(product)
    }

    async fn persist_in(&self, tx: &InMemoryTx, product: &Product) -> StoreResult<()> {
        tx.stage(StagedWrite::Save(product.clone())).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).map(|p| state.with_images(p)))
    }

    async fn find_by_natural_key(&self, key: &NaturalKey) -> StoreResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .find(|p| key.matches(&p.title, &p.slug))
            .map(|p| state.with_images(p)))
    }

    async fn find_many(&self, page: Pagination, with_images: bool) -> StoreResult<Vec<Product>> {
        let (limit, offset) = page.normalize();
        let state = self.state.read().await;

        let rows = state.products.values().skip(offset as usize);
        let rows: Vec<&Product> = match limit {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        };

        Ok(rows
            .into_iter()
            .map(|p| {
                if with_images {
                    state.with_images(p)
                } else {
                    p.clone()
                }
            })
            .collect())
    }

    async fn remove(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.products.remove(&product.id).is_some() {
            state.delete_images_of(product.id);
        }
        Ok(())
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let removed = state.products.len() as u64;
        state.products.clear();
        state.images.clear();
        Ok(removed)
    }
}

#[async_trait]
impl ProductImageStore for InMemoryCatalog {
    type Tx = InMemoryTx;

    async fn delete_all_for_owner(&self, tx: &InMemoryTx, owner_id: Uuid) -> StoreResult<u64> {
        tx.stage(StagedWrite::DeleteImages(owner_id)).await
    }

    async fn find_all_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<ProductImage>> {
        Ok(self.state.read().await.images_of(owner_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateProduct, Gender};

    fn product(title: &str, slug: &str, urls: &[&str]) -> Product {
        let mut product = Product::create(CreateProduct {
            title: title.to_string(),
            price: Some(10.0),
            description: None,
            slug: slug.to_string(),
            stock: Some(1),
            sizes: vec!["M".to_string()],
            gender: Gender::Unisex,
            tags: None,
            images: Vec::new(),
        });
        let urls: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        product.images = ProductImage::create_many(product.id, &urls);
        product
    }

    #[tokio::test]
    async fn test_persist_and_find_by_id() {
        let catalog = InMemoryCatalog::new();
        let p = product("Classic Hoodie", "classic_hoodie", &["1.jpg", "2.jpg"]);

        catalog.persist(&p).await.unwrap();

        let found = catalog.find_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(found, p);
    }

    #[tokio::test]
    async fn test_unique_title_ignores_case() {
        let catalog = InMemoryCatalog::new();
        catalog
            .persist(&product("Classic Hoodie", "classic_hoodie", &[]))
            .await
            .unwrap();

        let err = catalog
            .persist(&product("CLASSIC hoodie", "other_slug", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(ref msg) if msg.contains("title")));
    }

    #[tokio::test]
    async fn test_unique_slug() {
        let catalog = InMemoryCatalog::new();
        catalog
            .persist(&product("Classic Hoodie", "classic_hoodie", &[]))
            .await
            .unwrap();

        let err = catalog
            .persist(&product("Another Hoodie", "classic_hoodie", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(ref msg) if msg.contains("classic_hoodie")));
    }

    #[tokio::test]
    async fn test_staged_writes_are_invisible_until_commit() {
        let catalog = InMemoryCatalog::new();
        let p = product("Classic Hoodie", "classic_hoodie", &["1.jpg"]);
        catalog.persist(&p).await.unwrap();

        let tx = catalog.begin().await.unwrap();
        let removed = catalog.delete_all_for_owner(&tx, p.id).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(catalog.find_all_for_owner(p.id).await.unwrap().len(), 1);

        catalog.commit(tx).await.unwrap();
        assert!(catalog.find_all_for_owner(p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_writes() {
        let catalog = InMemoryCatalog::new();
        let p = product("Classic Hoodie", "classic_hoodie", &["1.jpg"]);
        catalog.persist(&p).await.unwrap();

        let tx = catalog.begin().await.unwrap();
        catalog.delete_all_for_owner(&tx, p.id).await.unwrap();
        let mut renamed = p.clone();
        renamed.title = "Renamed Hoodie".to_string();
        catalog.persist_in(&tx, &renamed).await.unwrap();
        catalog.rollback(tx).await.unwrap();

        let found = catalog.find_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(found, p);
    }

    #[tokio::test]
    async fn test_persist_in_rejects_duplicates_against_working_copy() {
        let catalog = InMemoryCatalog::new();
        let first = product("Classic Hoodie", "classic_hoodie", &[]);
        let mut second = product("Zip Hoodie", "zip_hoodie", &[]);
        catalog.persist(&first).await.unwrap();
        catalog.persist(&second).await.unwrap();

        let tx = catalog.begin().await.unwrap();
        second.slug = first.slug.clone();
        let err = catalog.persist_in(&tx, &second).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_commit_fails_atomically_on_late_conflict() {
        let catalog = InMemoryCatalog::new();
        let p = product("Classic Hoodie", "classic_hoodie", &["1.jpg"]);
        catalog.persist(&p).await.unwrap();

        let tx = catalog.begin().await.unwrap();
        catalog.delete_all_for_owner(&tx, p.id).await.unwrap();
        let mut renamed = p.clone();
        renamed.slug = "taken_later".to_string();
        renamed.images.clear();
        catalog.persist_in(&tx, &renamed).await.unwrap();

        // Someone else commits the same slug first
        catalog
            .persist(&product("Other Hoodie", "taken_later", &[]))
            .await
            .unwrap();

        assert!(catalog.commit(tx).await.is_err());
        let found = catalog.find_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(found, p);
    }

    #[tokio::test]
    async fn test_find_by_natural_key() {
        let catalog = InMemoryCatalog::new();
        let p = product("Classic Hoodie", "classic_hoodie", &[]);
        catalog.persist(&p).await.unwrap();

        let by_title = catalog
            .find_by_natural_key(&NaturalKey::from_term("classic HOODIE"))
            .await
            .unwrap();
        let by_slug = catalog
            .find_by_natural_key(&NaturalKey::from_term("Classic_Hoodie"))
            .await
            .unwrap();
        let missing = catalog
            .find_by_natural_key(&NaturalKey::from_term("nothing"))
            .await
            .unwrap();

        assert_eq!(by_title.map(|p| p.id), Some(p.id));
        assert_eq!(by_slug.map(|p| p.id), Some(p.id));
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_many_pages_in_id_order() {
        let catalog = InMemoryCatalog::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let p = product(&format!("Hoodie number {i}"), &format!("hoodie_{i}"), &["x.jpg"]);
            ids.push(p.id);
            catalog.persist(&p).await.unwrap();
        }
        ids.sort();

        let page = catalog.find_many(Pagination::new(2, 1), true).await.unwrap();
        assert_eq!(page.iter().map(|p| p.id).collect::<Vec<_>>(), ids[1..3]);
        assert!(page.iter().all(|p| p.images.len() == 1));

        let bare = catalog.find_many(Pagination::default(), false).await.unwrap();
        assert_eq!(bare.len(), 5);
        assert!(bare.iter().all(|p| p.images.is_empty()));
    }

    #[tokio::test]
    async fn test_remove_cascades_images() {
        let catalog = InMemoryCatalog::new();
        let p = product("Classic Hoodie", "classic_hoodie", &["1.jpg", "2.jpg"]);
        catalog.persist(&p).await.unwrap();

        catalog.remove(&p).await.unwrap();

        assert!(catalog.find_by_id(p.id).await.unwrap().is_none());
        assert!(catalog.find_all_for_owner(p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_counts_products() {
        let catalog = InMemoryCatalog::new();
        assert_eq!(catalog.delete_all().await.unwrap(), 0);

        catalog
            .persist(&product("Classic Hoodie", "classic_hoodie", &["1.jpg"]))
            .await
            .unwrap();
        catalog
            .persist(&product("Zip Hoodie", "zip_hoodie", &[]))
            .await
            .unwrap();

        assert_eq!(catalog.delete_all().await.unwrap(), 2);
        assert!(catalog.find_many(Pagination::default(), true).await.unwrap().is_empty());
    }
}
