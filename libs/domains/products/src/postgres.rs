use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, OnConflict, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    entity::{self, product, product_image},
    error::StoreResult,
    lookup::NaturalKey,
    models::{Pagination, Product, ProductImage},
    repository::{ProductImageStore, ProductStore, TransactionCoordinator},
};

/// PostgreSQL catalog store. One instance serves all three store traits.
#[derive(Clone)]
pub struct PgCatalogStore {
    db: DatabaseConnection,
}

impl PgCatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Upsert the product row, then upsert its images
    async fn save<C: ConnectionTrait + Sync>(conn: &C, product: &Product) -> Result<(), DbErr> {
        product::Entity::insert(product::ActiveModel::from(product))
            .on_conflict(
                OnConflict::column(product::Column::Id)
                    .update_columns([
                        product::Column::Title,
                        product::Column::Price,
                        product::Column::Description,
                        product::Column::Slug,
                        product::Column::Stock,
                        product::Column::Sizes,
                        product::Column::Gender,
                        product::Column::Tags,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        if product.images.is_empty() {
            return Ok(());
        }

        let images = product.images.iter().map(|image| {
            product_image::ActiveModel::from(&ProductImage {
                product_id: product.id,
                ..image.clone()
            })
        });

        product_image::Entity::insert_many(images)
            .on_conflict(
                OnConflict::column(product_image::Column::Id)
                    .update_columns([
                        product_image::Column::Url,
                        product_image::Column::Position,
                        product_image::Column::ProductId,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }
}

/// `UPPER(products.title) = $title`
fn upper_title_eq(title: &str) -> SimpleExpr {
    use sea_orm::sea_query::ExprTrait;

    Expr::expr(Func::upper(Expr::col((product::Entity, product::Column::Title)))).eq(title)
}

#[async_trait]
impl TransactionCoordinator for PgCatalogStore {
    type Tx = DatabaseTransaction;

    async fn begin(&self) -> StoreResult<DatabaseTransaction> {
        Ok(self.db.begin().await?)
    }

    async fn commit(&self, tx: DatabaseTransaction) -> StoreResult<()> {
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: DatabaseTransaction) -> StoreResult<()> {
        Ok(tx.rollback().await?)
    }
}

#[async_trait]
impl ProductStore for PgCatalogStore {
    type Tx = DatabaseTransaction;

    async fn persist(&self, product: &Product) -> StoreResult<()> {
        // Product and image inserts land together or not at all
        let txn = self.db.begin().await?;
        Self::save(&txn, product).await?;
        txn.commit().await?;

        tracing::debug!(product_id = %product.id, images = product.images.len(), "Persisted product");
        Ok(())
    }

    async fn persist_in(&self, tx: &DatabaseTransaction, product: &Product) -> StoreResult<()> {
        Ok(Self::save(tx, product).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let Some(model) = product::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let images = model
            .find_related(product_image::Entity)
            .order_by_asc(product_image::Column::Position)
            .all(&self.db)
            .await?;

        Ok(Some(entity::into_product(model, images)?))
    }

    async fn find_by_natural_key(&self, key: &NaturalKey) -> StoreResult<Option<Product>> {
        let rows = product::Entity::find()
            .filter(
                Condition::any()
                    .add(upper_title_eq(&key.title))
                    .add(product::Column::Slug.eq(key.slug.as_str())),
            )
            .find_with_related(product_image::Entity)
            .order_by_asc(product::Column::Id)
            .order_by_asc(product_image::Column::Position)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .next()
            .map(|(model, images)| entity::into_product(model, images))
            .transpose()?)
    }

    async fn find_many(&self, page: Pagination, with_images: bool) -> StoreResult<Vec<Product>> {
        let (limit, offset) = page.normalize();

        let models = product::Entity::find()
            .order_by_asc(product::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        if !with_images || models.is_empty() {
            return Ok(models
                .into_iter()
                .map(Product::try_from)
                .collect::<Result<_, _>>()?);
        }

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut images_by_owner: HashMap<Uuid, Vec<product_image::Model>> = HashMap::new();
        for image in product_image::Entity::find()
            .filter(product_image::Column::ProductId.is_in(ids))
            .order_by_asc(product_image::Column::Position)
            .all(&self.db)
            .await?
        {
            images_by_owner.entry(image.product_id).or_default().push(image);
        }

        Ok(models
            .into_iter()
            .map(|model| {
                let images = images_by_owner.remove(&model.id).unwrap_or_default();
                entity::into_product(model, images)
            })
            .collect::<Result<_, _>>()?)
    }

    async fn remove(&self, product: &Product) -> StoreResult<()> {
        product::Entity::delete_by_id(product.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let result = product::Entity::delete_many().exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl ProductImageStore for PgCatalogStore {
    type Tx = DatabaseTransaction;

    async fn delete_all_for_owner(
        &self,
        tx: &DatabaseTransaction,
        owner_id: Uuid,
    ) -> StoreResult<u64> {
        let result = product_image::Entity::delete_many()
            .filter(product_image::Column::ProductId.eq(owner_id))
            .exec(tx)
            .await?;
        Ok(result.rows_affected)
    }

    async fn find_all_for_owner(&self, owner_id: Uuid) -> StoreResult<Vec<ProductImage>> {
        let images = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(owner_id))
            .order_by_asc(product_image::Column::Position)
            .all(&self.db)
            .await?;

        Ok(images.into_iter().map(ProductImage::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::Gender;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn product_row() -> product::Model {
        product::Model {
            id: Uuid::now_v7(),
            title: "Classic Hoodie".to_string(),
            price: 45.0,
            description: Some("Warm".to_string()),
            slug: "classic_hoodie".to_string(),
            stock: 3,
            sizes: serde_json::json!(["M", "L"]),
            gender: Gender::Unisex,
            tags: serde_json::json!([]),
        }
    }

    fn image_row(owner: Uuid, url: &str, position: i32) -> product_image::Model {
        product_image::Model {
            id: Uuid::now_v7(),
            url: url.to_string(),
            position,
            product_id: owner,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_loads_images() {
        let row = product_row();
        let id = row.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row]])
            .append_query_results([vec![image_row(id, "a.jpg", 0), image_row(id, "b.jpg", 1)]])
            .into_connection();
        let store = PgCatalogStore::new(db);

        let product = store.find_by_id(id).await.unwrap().unwrap();

        assert_eq!(product.title, "Classic Hoodie");
        assert_eq!(product.sizes, vec!["M", "L"]);
        assert_eq!(product.image_urls(), vec!["a.jpg", "b.jpg"]);
    }

    #[tokio::test]
    async fn test_find_by_id_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<product::Model>::new()])
            .into_connection();
        let store = PgCatalogStore::new(db);

        assert!(store.find_by_id(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_many_groups_images_by_owner() {
        let first = product_row();
        let mut second = product_row();
        second.title = "Zip Hoodie".to_string();
        second.slug = "zip_hoodie".to_string();
        let (first_id, second_id) = (first.id, second.id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![first, second]])
            .append_query_results([vec![
                image_row(first_id, "1.jpg", 0),
                image_row(second_id, "2.jpg", 0),
                image_row(first_id, "3.jpg", 1),
            ]])
            .into_connection();
        let store = PgCatalogStore::new(db);

        let products = store.find_many(Pagination::new(2, 0), true).await.unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].image_urls(), vec!["1.jpg", "3.jpg"]);
        assert_eq!(products[1].image_urls(), vec!["2.jpg"]);
    }

    #[tokio::test]
    async fn test_corrupt_json_row_surfaces_as_database_error() {
        let mut row = product_row();
        row.tags = serde_json::json!("not-a-list");
        let id = row.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row]])
            .append_query_results([Vec::<product_image::Model>::new()])
            .into_connection();
        let store = PgCatalogStore::new(db);

        let err = store.find_by_id(id).await.unwrap_err();

        assert!(matches!(err, StoreError::Database(DbErr::Json(_))));
    }

    #[tokio::test]
    async fn test_delete_all_reports_rows_affected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 4,
            }])
            .into_connection();
        let store = PgCatalogStore::new(db);

        assert_eq!(store.delete_all().await.unwrap(), 4);
    }
}
