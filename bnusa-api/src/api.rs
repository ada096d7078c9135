use std::sync::Arc;

use async_trait::async_trait;

use crate::{Comment, CommentId, DeleteContext, Error, NewComment, Page, PageRequest, Target};

/// The remote comment backend, as seen from a thread view
#[async_trait]
pub trait CommentApi {
    /// Top-level comments of `target`, newest first
    async fn fetch_comments(&self, target: &Target, page: PageRequest)
        -> Result<Page<Comment>, Error>;

    /// Direct replies of `parent`, newest first
    async fn fetch_replies(
        &self,
        target: &Target,
        parent: &CommentId,
        page: PageRequest,
    ) -> Result<Page<Comment>, Error>;

    async fn create_comment(&self, new: &NewComment) -> Result<Comment, Error>;

    /// The backend cascades the deletion to all replies of `id`
    async fn delete_comment(
        &self,
        target: &Target,
        id: &CommentId,
        ctx: &DeleteContext,
    ) -> Result<(), Error>;
}

#[async_trait]
impl<T> CommentApi for Arc<T>
where
    T: CommentApi + Send + Sync + ?Sized,
{
    async fn fetch_comments(
        &self,
        target: &Target,
        page: PageRequest,
    ) -> Result<Page<Comment>, Error> {
        (**self).fetch_comments(target, page).await
    }

    async fn fetch_replies(
        &self,
        target: &Target,
        parent: &CommentId,
        page: PageRequest,
    ) -> Result<Page<Comment>, Error> {
        (**self).fetch_replies(target, parent, page).await
    }

    async fn create_comment(&self, new: &NewComment) -> Result<Comment, Error> {
        (**self).create_comment(new).await
    }

    async fn delete_comment(
        &self,
        target: &Target,
        id: &CommentId,
        ctx: &DeleteContext,
    ) -> Result<(), Error> {
        (**self).delete_comment(target, id, ctx).await
    }
}
