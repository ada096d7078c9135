use crate::api::{UserId, Viewer};

/// Whether `viewer` may delete a comment written by `author` on an entity
/// owned by `owner`
pub fn can_delete(viewer: &Viewer, author: &UserId, owner: Option<&UserId>) -> bool {
    viewer.is(author) || owner.map_or(false, |o| viewer.is(o))
}
