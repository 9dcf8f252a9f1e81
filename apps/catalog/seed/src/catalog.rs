//! Fixed sample catalog

use domain_products::{CreateProduct, Gender, slugify};

struct Sample {
    title: &'static str,
    price: f64,
    description: &'static str,
    stock: i32,
    sizes: &'static [&'static str],
    gender: Gender,
    tags: &'static [&'static str],
    images: &'static [&'static str],
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Men's Chill Crew Neck Sweatshirt",
        price: 75.0,
        description: "Relaxed fit crew neck in brushed fleece with a ribbed hem.",
        stock: 7,
        sizes: &["XS", "S", "M", "L", "XL", "XXL"],
        gender: Gender::Men,
        tags: &["sweatshirt"],
        images: &["1740176-00-A_0_2000.jpg", "1740176-00-A_1.jpg"],
    },
    Sample {
        title: "Men's Quilted Shirt Jacket",
        price: 200.0,
        description: "Water-resistant quilted shell with snap front closure.",
        stock: 5,
        sizes: &["XS", "S", "M", "XL", "XXL"],
        gender: Gender::Men,
        tags: &["jacket"],
        images: &["1740507-00-A_0_2000.jpg", "1740507-00-A_1.jpg"],
    },
    Sample {
        title: "Women's Raven Slouchy Crew Sweatshirt",
        price: 110.0,
        description: "Oversized slouchy crew with dropped shoulders.",
        stock: 9,
        sizes: &["XS", "S", "M", "L", "XL"],
        gender: Gender::Women,
        tags: &["sweatshirt"],
        images: &["1740280-00-A_0_2000.jpg"],
    },
    Sample {
        title: "Women's Cropped Puffer Jacket",
        price: 225.0,
        description: "Cropped puffer with a stand collar and hidden zip.",
        stock: 85,
        sizes: &["XS", "S", "M"],
        gender: Gender::Women,
        tags: &["hoodie"],
        images: &["1740535-00-A_0_2000.jpg", "1740535-00-A_1.jpg"],
    },
    Sample {
        title: "Kids Cybertruck Long Sleeve Tee",
        price: 30.0,
        description: "Soft cotton long sleeve tee with a screen printed graphic.",
        stock: 10,
        sizes: &["XS", "S", "M"],
        gender: Gender::Kid,
        tags: &["shirt"],
        images: &["1742694-00-A_1_2000.jpg", "1742694-00-A_3.jpg"],
    },
    Sample {
        title: "Unisex Team Cap",
        price: 35.0,
        description: "Six panel cap with an embroidered logo and adjustable strap.",
        stock: 0,
        sizes: &[],
        gender: Gender::Unisex,
        tags: &["hat"],
        images: &[],
    },
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Create inputs for the sample catalog, slugs derived from titles
pub fn sample_products() -> Vec<CreateProduct> {
    SAMPLES
        .iter()
        .map(|sample| CreateProduct {
            title: sample.title.to_string(),
            price: Some(sample.price),
            description: Some(sample.description.to_string()),
            slug: slugify(sample.title),
            stock: Some(sample.stock),
            sizes: strings(sample.sizes),
            gender: sample.gender,
            tags: Some(strings(sample.tags)),
            images: strings(sample.images),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use validator::Validate;

    #[test]
    fn test_samples_are_valid() {
        for product in sample_products() {
            assert!(product.validate().is_ok(), "invalid sample: {}", product.title);
        }
    }

    #[test]
    fn test_titles_and_slugs_are_unique() {
        let products = sample_products();
        let titles: HashSet<_> = products.iter().map(|p| p.title.to_uppercase()).collect();
        let slugs: HashSet<_> = products.iter().map(|p| p.slug.clone()).collect();

        assert_eq!(titles.len(), products.len());
        assert_eq!(slugs.len(), products.len());
    }

    #[test]
    fn test_slug_comes_from_title() {
        let first = &sample_products()[0];
        assert_eq!(first.slug, "mens_chill_crew_neck_sweatshirt");
    }
}
