use uuid::Uuid;

/// How a lookup term addresses a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Surrogate(Uuid),
    NaturalKey(NaturalKey),
}

/// Title-or-slug match, pre-normalized for comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey {
    /// Compared against the uppercased stored title
    pub title: String,
    /// Compared against the stored slug as-is
    pub slug: String,
}

impl NaturalKey {
    pub fn from_term(term: &str) -> Self {
        Self {
            title: term.to_uppercase(),
            slug: term.to_lowercase(),
        }
    }

    pub fn matches(&self, title: &str, slug: &str) -> bool {
        title.to_uppercase() == self.title || slug == self.slug
    }
}

impl Lookup {
    /// Classify `term`. Only the hyphenated 8-4-4-4-12 form counts as an id;
    /// an id-shaped term never falls back to the natural key.
    pub fn from_term(term: &str) -> Self {
        match parse_surrogate(term) {
            Some(id) => Lookup::Surrogate(id),
            None => Lookup::NaturalKey(NaturalKey::from_term(term)),
        }
    }
}

fn parse_surrogate(term: &str) -> Option<Uuid> {
    if term.len() != 36 {
        return None;
    }
    Uuid::try_parse(term).ok()
}
