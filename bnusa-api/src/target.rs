use std::{fmt, str::FromStr};

use anyhow::anyhow;

/// The entity a comment thread hangs off
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Target {
    Article(String),
    Review(String),
    /// Kteb Nus book serials are addressed by slug
    Book(String),
}

impl Target {
    pub fn entity_id(&self) -> &str {
        match self {
            Target::Article(id) | Target::Review(id) | Target::Book(id) => id,
        }
    }

    pub fn base_path(&self) -> &'static str {
        match self {
            Target::Article(_) => "/api/comments",
            Target::Review(_) => "/api/reviews/comments",
            Target::Book(_) => "/api/kteb-nus/comments",
        }
    }

    /// Key naming the target in a creation body
    pub fn body_key(&self) -> &'static str {
        match self {
            Target::Article(_) => "articleId",
            Target::Review(_) => "reviewId",
            Target::Book(_) => "bookSlug",
        }
    }

    pub fn default_page_size(&self) -> u32 {
        match self {
            Target::Article(_) | Target::Review(_) => 10,
            Target::Book(_) => 5,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Article(id) => write!(f, "article:{id}"),
            Target::Review(id) => write!(f, "review:{id}"),
            Target::Book(slug) => write!(f, "book:{slug}"),
        }
    }
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Target> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("target {s:?} is not of the form kind:id"))?;
        if id.is_empty() {
            return Err(anyhow!("target {s:?} has an empty id"));
        }
        let id = String::from(id);
        match kind {
            "article" => Ok(Target::Article(id)),
            "review" => Ok(Target::Review(id)),
            "book" => Ok(Target::Book(id)),
            _ => Err(anyhow!("unknown target kind {kind:?}")),
        }
    }
}
