use crate::{
    api::{Comment, CommentApi, CommentId, DeleteContext, Error, NewComment},
    CommentStore,
};

/// Where a deletion stands
///
/// Only `Idle` accepts a new request, so a double click cannot delete twice.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeleteState {
    Idle,
    ConfirmPending(CommentId),
    Deleting(CommentId),
}

/// Something for the view to toast
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// A comment section: the store plus the state of the forms and buttons
/// acting on it
pub struct CommentSection<A> {
    store: CommentStore<A>,
    submitting: bool,
    submitting_reply: bool,
    delete: DeleteState,
    error: Option<String>,
    notices: Vec<Notice>,
}

impl<A: CommentApi> CommentSection<A> {
    pub fn new(store: CommentStore<A>) -> CommentSection<A> {
        CommentSection {
            store,
            submitting: false,
            submitting_reply: false,
            delete: DeleteState::Idle,
            error: None,
            notices: Vec::new(),
        }
    }

    pub fn store(&self) -> &CommentStore<A> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CommentStore<A> {
        &mut self.store
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_submitting_reply(&self) -> bool {
        self.submitting_reply
    }

    pub fn delete_state(&self) -> &DeleteState {
        &self.delete
    }

    /// Last error of a mutation, to be shown inline
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn settle<T>(&mut self, res: Result<T, Error>, success: &str) -> Option<T> {
        match res {
            Ok(v) => {
                self.error = None;
                self.notices.push(Notice::Success(String::from(success)));
                Some(v)
            }
            Err(err) => {
                let msg = err.to_string();
                // validation problems are only shown inline
                if !err.is_validation() {
                    self.notices.push(Notice::Error(msg.clone()));
                }
                self.error = Some(msg);
                None
            }
        }
    }

    /// Starts posting `content`, as a reply to `parent` if given
    ///
    /// Returns the request to send, or `None` if the form has an error. The
    /// matching submitting flag stays up until [`CommentSection::finish_submit`].
    pub fn begin_submit(
        &mut self,
        content: &str,
        parent: Option<&CommentId>,
    ) -> Option<NewComment> {
        match self.store.begin_insert(content, parent) {
            Ok(new) => {
                self.set_submitting(parent.is_some(), true);
                Some(new)
            }
            Err(err) => self.settle(Err(err), ""),
        }
    }

    pub fn finish_submit(
        &mut self,
        new: &NewComment,
        res: Result<Comment, Error>,
    ) -> Option<CommentId> {
        let is_reply = new.parent_id.is_some();
        self.set_submitting(is_reply, false);
        let res = self.store.finish_insert(res);
        self.settle(res, if is_reply { "Reply posted" } else { "Comment posted" })
    }

    fn set_submitting(&mut self, reply: bool, on: bool) {
        match reply {
            true => self.submitting_reply = on,
            false => self.submitting = on,
        }
    }

    async fn submit(&mut self, content: &str, parent: Option<&CommentId>) -> Option<CommentId> {
        let new = self.begin_submit(content, parent)?;
        let res = self.store.api().create_comment(&new).await;
        self.finish_submit(&new, res)
    }

    pub async fn submit_comment(&mut self, content: &str) -> Option<CommentId> {
        self.submit(content, None).await
    }

    pub async fn submit_reply(&mut self, parent: &CommentId, content: &str) -> Option<CommentId> {
        self.submit(content, Some(parent)).await
    }

    /// Asks for confirmation before deleting `id`
    pub fn request_delete(&mut self, id: &CommentId) -> bool {
        if self.delete != DeleteState::Idle {
            return false;
        }
        self.delete = DeleteState::ConfirmPending(id.clone());
        true
    }

    pub fn cancel_delete(&mut self) -> bool {
        match self.delete {
            DeleteState::ConfirmPending(_) => {
                self.delete = DeleteState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Confirms the pending deletion, returning what to send to the backend
    ///
    /// The section stays in `Deleting` until [`CommentSection::finish_delete`].
    pub fn begin_delete(&mut self) -> Option<(CommentId, DeleteContext)> {
        let id = match &self.delete {
            DeleteState::ConfirmPending(id) => id.clone(),
            _ => return None,
        };
        match self.store.begin_delete(&id) {
            Ok(ctx) => {
                self.delete = DeleteState::Deleting(id.clone());
                Some((id, ctx))
            }
            Err(err) => {
                self.delete = DeleteState::Idle;
                self.settle(Err(err), "")
            }
        }
    }

    /// Returns whether the comment is gone
    pub fn finish_delete(&mut self, id: &CommentId, res: Result<(), Error>) -> bool {
        if self.delete != DeleteState::Deleting(id.clone()) {
            tracing::debug!(%id, "not deleting this comment");
            return false;
        }
        self.delete = DeleteState::Idle;
        let res = self.store.finish_delete(id, res);
        self.settle(res, "Comment deleted").is_some()
    }

    /// Deletes the comment pending confirmation, returning whether it is gone
    pub async fn confirm_delete(&mut self) -> bool {
        let (id, ctx) = match self.begin_delete() {
            Some(started) => started,
            None => return false,
        };
        let store = &self.store;
        let res = store.api().delete_comment(store.target(), &id, &ctx).await;
        self.finish_delete(&id, res)
    }
}
