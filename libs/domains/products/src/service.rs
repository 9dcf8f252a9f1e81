//! Product Service - persistence orchestration for the catalog

use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ProductError, ProductResult, StoreResult};
use crate::lookup::Lookup;
use crate::models::{CreateProduct, Pagination, Product, ProductImage, ProductView, UpdateProduct};
use crate::repository::{ProductImageStore, ProductStore, TransactionCoordinator};
use crate::transaction::TransactionScope;

/// Entry point for every catalog operation.
///
/// Store failures are classified once, here, into [`ProductError`].
pub struct ProductService<P, I, T> {
    products: Arc<P>,
    images: Arc<I>,
    transactions: Arc<T>,
}

impl<P, I, T> Clone for ProductService<P, I, T> {
    fn clone(&self) -> Self {
        Self {
            products: Arc::clone(&self.products),
            images: Arc::clone(&self.images),
            transactions: Arc::clone(&self.transactions),
        }
    }
}

impl<S> ProductService<S, S, S>
where
    S: TransactionCoordinator + ProductStore<Tx = <S as TransactionCoordinator>::Tx>,
    S: ProductImageStore<Tx = <S as TransactionCoordinator>::Tx>,
{
    /// Build a service over a single backend that implements every store
    pub fn with_backend(backend: S) -> Self {
        let backend = Arc::new(backend);
        Self {
            products: Arc::clone(&backend),
            images: Arc::clone(&backend),
            transactions: backend,
        }
    }
}

impl<P, I, T> ProductService<P, I, T>
where
    T: TransactionCoordinator,
    P: ProductStore<Tx = T::Tx>,
    I: ProductImageStore<Tx = T::Tx>,
{
    pub fn new(products: P, images: I, transactions: T) -> Self {
        Self {
            products: Arc::new(products),
            images: Arc::new(images),
            transactions: Arc::new(transactions),
        }
    }

    /// Create a product together with its images in one write
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(&self, mut input: CreateProduct) -> ProductResult<ProductView> {
        let urls = std::mem::take(&mut input.images);
        let mut product = Product::create(input);
        product.images = ProductImage::create_many(product.id, &urls);

        self.products
            .persist(&product)
            .await
            .map_err(ProductError::from_store)?;

        info!(product_id = %product.id, images = urls.len(), "Created product");
        Ok(product.into())
    }

    /// One page of products in id order, images included
    #[instrument(skip(self))]
    pub async fn list_products(&self, page: Pagination) -> ProductResult<Vec<ProductView>> {
        let products = self
            .products
            .find_many(page, true)
            .await
            .map_err(ProductError::from_store)?;

        Ok(products.into_iter().map(ProductView::from).collect())
    }

    /// Resolve `term` as an id or as a title/slug and return the aggregate
    #[instrument(skip(self))]
    pub async fn find_one(&self, term: &str) -> ProductResult<Product> {
        let found = match Lookup::from_term(term) {
            Lookup::Surrogate(id) => self.products.find_by_id(id).await,
            Lookup::NaturalKey(key) => self.products.find_by_natural_key(&key).await,
        }
        .map_err(ProductError::from_store)?;

        found.ok_or_else(|| ProductError::NotFound(term.to_string()))
    }

    /// [`find_one`](Self::find_one), flattened for callers
    pub async fn find_one_plain(&self, term: &str) -> ProductResult<ProductView> {
        self.find_one(term).await.map(ProductView::from)
    }

    /// Apply a partial update. When `update.images` is present the image set
    /// is replaced; the row update and the image swap commit together.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: Uuid,
        mut update: UpdateProduct,
    ) -> ProductResult<ProductView> {
        let mut product = self
            .products
            .find_by_id(id)
            .await
            .map_err(ProductError::from_store)?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))?;

        let new_urls = update.images.take();
        product.apply_update(update);

        self.save_replacing_images(&mut product, new_urls)
            .await
            .map_err(ProductError::from_store)?;

        info!(product_id = %id, "Updated product");
        self.find_one_plain(&id.to_string()).await
    }

    async fn save_replacing_images(
        &self,
        product: &mut Product,
        new_urls: Option<Vec<String>>,
    ) -> StoreResult<()> {
        let scope = TransactionScope::begin(self.transactions.as_ref()).await?;

        let outcome: StoreResult<()> = async {
            product.images = match &new_urls {
                Some(urls) => {
                    let removed = self.images.delete_all_for_owner(scope.tx(), product.id).await?;
                    tracing::debug!(product_id = %product.id, removed, "Replacing images");
                    ProductImage::create_many(product.id, urls)
                }
                None => self.images.find_all_for_owner(product.id).await?,
            };
            self.products.persist_in(scope.tx(), product).await
        }
        .await;

        scope.finish(outcome).await
    }

    /// Delete the product addressed by `term`; its images go with it
    #[instrument(skip(self))]
    pub async fn remove_product(&self, term: &str) -> ProductResult<()> {
        let product = self.find_one(term).await?;

        self.products
            .remove(&product)
            .await
            .map_err(ProductError::from_store)?;

        info!(product_id = %product.id, "Removed product");
        Ok(())
    }

    /// Delete every product and image. Meant for seeding and tests.
    #[instrument(skip(self))]
    pub async fn delete_all_products(&self) -> ProductResult<u64> {
        let removed = self
            .products
            .delete_all()
            .await
            .map_err(ProductError::from_store)?;

        info!(removed, "Deleted all products");
        Ok(removed)
    }
}
