use std::fmt;

use crate::{Error, Target, Time, UserId};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author data as denormalized onto the comment when it was created
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl Author {
    /// Name shown in "replying to @X"
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: CommentId,
    pub content: String,
    pub author: Author,
    pub created_at: Time,
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    #[serde(default)]
    pub replying_to: Option<String>,
}

/// Body of a comment creation request
///
/// Serializes to `{ articleId|reviewId|bookSlug, parentId?, content }`
/// depending on the kind of target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewComment {
    pub target: Target,
    pub parent_id: Option<CommentId>,
    pub content: String,
}

impl NewComment {
    pub fn new(target: Target, parent_id: Option<CommentId>, content: String) -> NewComment {
        NewComment {
            target,
            parent_id,
            content,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_content(&self.content)?;
        crate::validate_string(self.target.entity_id())?;
        if let Some(p) = &self.parent_id {
            crate::validate_string(&p.0)?;
        }
        Ok(())
    }
}

impl serde::Serialize for NewComment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(self.target.body_key(), self.target.entity_id())?;
        if let Some(parent_id) = &self.parent_id {
            map.serialize_entry("parentId", parent_id)?;
        }
        map.serialize_entry("content", &self.content)?;
        map.end()
    }
}
