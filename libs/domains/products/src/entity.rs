use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

use crate::models::{Gender, Product, ProductImage};

// ===== Products Entity =====

pub mod product {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "products")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(column_type = "Text")]
        pub title: String,
        #[sea_orm(column_type = "Double")]
        pub price: f64,
        #[sea_orm(column_type = "Text", nullable)]
        pub description: Option<String>,
        #[sea_orm(column_type = "Text", unique)]
        pub slug: String,
        pub stock: i32,
        #[sea_orm(column_type = "JsonBinary")]
        pub sizes: Json,
        pub gender: Gender,
        #[sea_orm(column_type = "JsonBinary")]
        pub tags: Json,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::product_image::Entity")]
        Images,
    }

    impl Related<super::product_image::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Images.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    /// Fails with [`DbErr::Json`] when a jsonb column is not a list of strings,
    /// so a later save cannot overwrite the stored value with an empty list.
    impl TryFrom<Model> for Product {
        type Error = DbErr;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                id: model.id,
                title: model.title,
                price: model.price,
                description: model.description,
                slug: model.slug,
                stock: model.stock,
                sizes: string_list("sizes", model.sizes)?,
                gender: model.gender,
                tags: string_list("tags", model.tags)?,
                images: Vec::new(),
            })
        }
    }

    fn string_list(column: &str, value: Json) -> Result<Vec<String>, DbErr> {
        serde_json::from_value(value)
            .map_err(|err| DbErr::Json(format!("products.{column} is not a string list: {err}")))
    }

    impl From<&Product> for ActiveModel {
        fn from(product: &Product) -> Self {
            ActiveModel {
                id: Set(product.id),
                title: Set(product.title.clone()),
                price: Set(product.price),
                description: Set(product.description.clone()),
                slug: Set(product.slug.clone()),
                stock: Set(product.stock),
                sizes: Set(Json::from(product.sizes.clone())),
                gender: Set(product.gender),
                tags: Set(Json::from(product.tags.clone())),
            }
        }
    }
}

// ===== Product Images Entity =====

pub mod product_image {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "product_images")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(column_type = "Text")]
        pub url: String,
        pub position: i32,
        pub product_id: Uuid,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::product::Entity",
            from = "Column::ProductId",
            to = "super::product::Column::Id",
            on_delete = "Cascade"
        )]
        Product,
    }

    impl Related<super::product::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Product.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for ProductImage {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                url: model.url,
                position: model.position,
                product_id: model.product_id,
            }
        }
    }

    impl From<&ProductImage> for ActiveModel {
        fn from(image: &ProductImage) -> Self {
            ActiveModel {
                id: Set(image.id),
                url: Set(image.url.clone()),
                position: Set(image.position),
                product_id: Set(image.product_id),
            }
        }
    }
}

/// Assemble an aggregate from a product row and its image rows.
pub(crate) fn into_product(
    model: product::Model,
    images: Vec<product_image::Model>,
) -> Result<Product, DbErr> {
    let mut images: Vec<ProductImage> = images.into_iter().map(Into::into).collect();
    images.sort_by_key(|image| image.position);

    Ok(Product {
        images,
        ..Product::try_from(model)?
    })
}
