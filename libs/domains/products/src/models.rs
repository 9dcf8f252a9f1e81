use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Target audience of a garment
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "product_gender")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
    #[sea_orm(string_value = "men")]
    Men,
    #[sea_orm(string_value = "women")]
    Women,
    #[sea_orm(string_value = "kid")]
    Kid,
    #[sea_orm(string_value = "unisex")]
    Unisex,
}

/// Image owned by a product. Never addressed on its own by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: Uuid,
    /// Opaque reference produced by the file storage collaborator
    pub url: String,
    /// Zero-based index in the owner's image list
    pub position: i32,
    pub product_id: Uuid,
}

impl ProductImage {
    /// Build unpersisted images for `owner_id`, preserving the order of `urls`.
    pub fn create_many(owner_id: Uuid, urls: &[String]) -> Vec<Self> {
        urls.iter()
            .enumerate()
            .map(|(position, url)| Self {
                id: Uuid::now_v7(),
                url: url.clone(),
                position: stored_position(position),
                product_id: owner_id,
            })
            .collect()
    }
}

/// Positions are stored as `integer`. Indexes past `i32::MAX` share the last
/// position and keep their relative order only through the stable sort on read.
fn stored_position(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

/// Product aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Unique across products, compared case-insensitively
    pub title: String,
    pub price: f64,
    pub description: Option<String>,
    /// Unique across products
    pub slug: String,
    pub stock: i32,
    /// Caller-ordered garment sizes, duplicates allowed
    pub sizes: Vec<String>,
    pub gender: Gender,
    pub tags: Vec<String>,
    pub images: Vec<ProductImage>,
}

impl Product {
    /// Build an unpersisted product from `input`, assigning the id and defaults.
    ///
    /// `input.images` is not read here; images are attached by the caller
    /// with [`ProductImage::create_many`].
    pub fn create(input: CreateProduct) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: input.title,
            price: input.price.unwrap_or(0.0),
            description: input.description,
            slug: input.slug,
            stock: input.stock.unwrap_or(0),
            sizes: input.sizes,
            gender: input.gender,
            tags: input.tags.unwrap_or_default(),
            images: Vec::new(),
        }
    }

    /// Merge the scalar fields present in `update`. Images are left alone.
    pub fn apply_update(&mut self, update: UpdateProduct) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(slug) = update.slug {
            self.slug = slug;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        if let Some(sizes) = update.sizes {
            self.sizes = sizes;
        }
        if let Some(gender) = update.gender {
            self.gender = gender;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
    }

    /// Image URLs in position order
    pub fn image_urls(&self) -> Vec<String> {
        let mut images: Vec<&ProductImage> = self.images.iter().collect();
        images.sort_by_key(|image| image.position);
        images.into_iter().map(|image| image.url.clone()).collect()
    }
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProduct {
    #[validate(length(min = 6))]
    pub title: String,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub description: Option<String>,
    /// Supplied by the caller; see [`slugify`]
    #[validate(length(min = 1))]
    pub slug: String,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    #[serde(default)]
    pub sizes: Vec<String>,
    pub gender: Gender,
    pub tags: Option<Vec<String>>,
    /// Image URLs, in display order
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update. Absent fields are left untouched.
///
/// `images: Some(..)` replaces the whole image set; `None` keeps it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(length(min = 6))]
    pub title: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    /// `Some(None)` clears the description; an explicit JSON `null` maps to it
    #[serde(default, deserialize_with = "explicit_null")]
    pub description: Option<Option<String>>,
    #[validate(length(min = 1))]
    pub slug: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub sizes: Option<Vec<String>>,
    pub gender: Option<Gender>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

/// Keep a present `null` distinct from an absent field.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// What every read path returns: scalar fields plus image URLs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub description: Option<String>,
    pub slug: String,
    pub stock: i32,
    pub sizes: Vec<String>,
    pub gender: Gender,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let images = product.image_urls();
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            description: product.description,
            slug: product.slug,
            stock: product.stock,
            sizes: product.sizes,
            gender: product.gender,
            tags: product.tags,
            images,
        }
    }
}

/// Page request for listing. `limit` absent or zero means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// `(limit, offset)` with the unbounded / zero-offset defaults applied
    pub fn normalize(self) -> (Option<u64>, u64) {
        (self.limit.filter(|limit| *limit > 0), self.offset.unwrap_or(0))
    }
}

/// Derive a slug from a title: lowercase, whitespace runs become `_`,
/// apostrophes are dropped.
pub fn slugify(title: &str) -> String {
    title
        .split_whitespace()
        .map(|word| word.replace(['\'', '\u{2019}'], "").to_lowercase())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input() -> CreateProduct {
        CreateProduct {
            title: "Men's Chill Crew Neck Sweatshirt".to_string(),
            price: None,
            description: None,
            slug: "mens_chill_crew_neck_sweatshirt".to_string(),
            stock: None,
            sizes: vec!["XS".to_string(), "S".to_string(), "S".to_string()],
            gender: Gender::Men,
            tags: None,
            images: vec!["a.jpg".to_string()],
        }
    }

    #[test]
    fn test_create_applies_defaults_and_ignores_images() {
        let product = Product::create(create_input());

        assert_eq!(product.price, 0.0);
        assert_eq!(product.stock, 0);
        assert!(product.tags.is_empty());
        assert!(product.images.is_empty());
        assert_eq!(product.sizes, vec!["XS", "S", "S"]);
    }

    #[test]
    fn test_create_many_keeps_order_and_owner() {
        let owner = Uuid::now_v7();
        let urls = vec!["b.jpg".to_string(), "a.jpg".to_string(), "b.jpg".to_string()];

        let images = ProductImage::create_many(owner, &urls);

        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|image| image.product_id == owner));
        assert_eq!(
            images.iter().map(|i| i.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_ne!(images[0].id, images[2].id);
    }

    #[test]
    fn test_stored_position_saturates_instead_of_wrapping() {
        assert_eq!(stored_position(0), 0);
        assert_eq!(stored_position(41), 41);
        assert_eq!(stored_position(i32::MAX as usize), i32::MAX);
        assert_eq!(stored_position(i32::MAX as usize + 1), i32::MAX);
        assert_eq!(stored_position(usize::MAX), i32::MAX);
    }

    #[test]
    fn test_apply_update_touches_only_present_fields() {
        let mut product = Product::create(create_input());
        let before = product.clone();

        product.apply_update(UpdateProduct {
            price: Some(35.5),
            tags: Some(vec!["sweatshirt".to_string()]),
            images: Some(vec!["ignored.jpg".to_string()]),
            ..Default::default()
        });

        assert_eq!(product.price, 35.5);
        assert_eq!(product.tags, vec!["sweatshirt"]);
        assert_eq!(product.title, before.title);
        assert_eq!(product.slug, before.slug);
        assert_eq!(product.images, before.images);
    }

    #[test]
    fn test_apply_update_can_clear_description() {
        let mut product = Product::create(CreateProduct {
            description: Some("Brushed fleece".to_string()),
            ..create_input()
        });

        product.apply_update(UpdateProduct::default());
        assert_eq!(product.description.as_deref(), Some("Brushed fleece"));

        product.apply_update(UpdateProduct {
            description: Some(None),
            ..Default::default()
        });
        assert_eq!(product.description, None);
    }

    #[test]
    fn test_update_distinguishes_null_from_absent_description() {
        let absent: UpdateProduct = serde_json::from_str(r#"{"stock": 3}"#).unwrap();
        let cleared: UpdateProduct = serde_json::from_str(r#"{"description": null}"#).unwrap();
        let set: UpdateProduct = serde_json::from_str(r#"{"description": "Warm"}"#).unwrap();

        assert_eq!(absent.description, None);
        assert_eq!(cleared.description, Some(None));
        assert_eq!(set.description, Some(Some("Warm".to_string())));
    }

    #[test]
    fn test_view_orders_images_by_position() {
        let mut product = Product::create(create_input());
        let mut images = ProductImage::create_many(
            product.id,
            &["first.jpg".to_string(), "second.jpg".to_string()],
        );
        images.reverse();
        product.images = images;

        let view = ProductView::from(product);
        assert_eq!(view.images, vec!["first.jpg", "second.jpg"]);
    }

    #[test]
    fn test_pagination_normalize() {
        assert_eq!(Pagination::default().normalize(), (None, 0));
        assert_eq!(Pagination::new(0, 5).normalize(), (None, 5));
        assert_eq!(Pagination::new(2, 4).normalize(), (Some(2), 4));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("Men's Chill  Crew Neck Sweatshirt"),
            "mens_chill_crew_neck_sweatshirt"
        );
        assert_eq!(slugify("  Kids Cybertruck Tee "), "kids_cybertruck_tee");
    }

    #[test]
    fn test_gender_round_trips_as_lowercase() {
        assert_eq!(Gender::Unisex.to_string(), "unisex");
        assert_eq!("kid".parse::<Gender>().unwrap(), Gender::Kid);
    }

    #[test]
    fn test_create_input_validation() {
        let mut input = create_input();
        assert!(input.validate().is_ok());

        input.title = "Tee".to_string();
        assert!(input.validate().is_err());
    }
}
