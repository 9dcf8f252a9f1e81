use domain_products::{
    CreateProduct, ProductImageStore, ProductResult, ProductService, ProductStore,
    TransactionCoordinator,
};
use tracing::info;

/// Outcome of a reseed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub removed: u64,
    pub inserted: usize,
    pub images: usize,
}

/// Wipe the catalog, then insert `products` one by one.
///
/// Stops at the first failed insert; rows inserted before it stay.
pub async fn reseed<P, I, T>(
    service: &ProductService<P, I, T>,
    products: Vec<CreateProduct>,
) -> ProductResult<SeedReport>
where
    T: TransactionCoordinator,
    P: ProductStore<Tx = T::Tx>,
    I: ProductImageStore<Tx = T::Tx>,
{
    let removed = service.delete_all_products().await?;

    let mut report = SeedReport {
        removed,
        inserted: 0,
        images: 0,
    };

    for product in products {
        let view = service.create_product(product).await?;
        report.inserted += 1;
        report.images += view.images.len();
        info!(product_id = %view.id, slug = %view.slug, "Seeded product");
    }

    Ok(report)
}
