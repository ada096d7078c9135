use futures::future::join_all;

use crate::{
    api::{
        Comment, CommentApi, CommentId, DeleteContext, Error, NewComment, Pagination, PageRequest,
        Target, UserId, Viewer,
    },
    Forest, Node,
};

/// Page size used when actually loading replies
pub const REPLY_PAGE_SIZE: u32 = 50;

/// Page size of a probe, which only wants the pagination metadata
pub const PROBE_PAGE_SIZE: u32 = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StoreConfig {
    pub top_level_limit: u32,
    pub reply_limit: u32,
    pub probe_limit: u32,
}

impl StoreConfig {
    pub fn for_target(target: &Target) -> StoreConfig {
        StoreConfig {
            top_level_limit: target.default_page_size(),
            reply_limit: REPLY_PAGE_SIZE,
            probe_limit: PROBE_PAGE_SIZE,
        }
    }
}

/// The comment thread of one target, kept in sync with the backend
///
/// Read operations never fail outwards: errors are logged and kept in
/// [`CommentStore::error`] while whatever was already loaded stays in place.
/// All the requests one operation fans out are awaited together before their
/// results get merged, and merging is always by comment id.
pub struct CommentStore<A> {
    api: A,
    target: Target,
    config: StoreConfig,
    viewer: Viewer,
    owner: Option<UserId>,
    forest: Forest,
    error: Option<Error>,
}

impl<A: CommentApi> CommentStore<A> {
    pub fn new(api: A, target: Target) -> CommentStore<A> {
        let config = StoreConfig::for_target(&target);
        CommentStore::with_config(api, target, config)
    }

    pub fn with_config(api: A, target: Target, config: StoreConfig) -> CommentStore<A> {
        CommentStore {
            api,
            target,
            config,
            viewer: Viewer::anonymous(),
            owner: None,
            forest: Forest::new(),
            error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn set_viewer(&mut self, viewer: Viewer) {
        self.viewer = viewer;
    }

    /// Sets the owner of the article, review or book being commented on
    pub fn set_owner(&mut self, owner: Option<UserId>) {
        self.owner = owner;
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn reconciled_total(&self) -> u64 {
        self.forest.reconciled_total()
    }

    pub fn reply_count(&self, id: &CommentId) -> u64 {
        self.forest.reply_count(id)
    }

    pub fn can_delete(&self, node: &Node) -> bool {
        crate::can_delete(&self.viewer, &node.comment.author.id, self.owner.as_ref())
    }

    fn fail(&mut self, what: &str, err: Error) {
        tracing::error!(thread = %self.target, ?err, "failed {what}");
        self.error = Some(err);
    }

    /// Loads a page of top-level comments and probes each new one for replies
    pub async fn load_top_level(&mut self, page: u32) {
        let page = page.max(1);
        let req = PageRequest::new(page, self.config.top_level_limit);
        let resp = match self.api.fetch_comments(&self.target, req).await {
            Ok(resp) => resp,
            Err(err) => return self.fail("loading comments", err),
        };
        let added = self.forest.apply_top_level(page, resp);
        tracing::debug!(thread = %self.target, page, added = added.len(), "loaded comments");
        self.probe(&added).await;
    }

    /// Loads the next page of top-level comments, if any
    pub async fn load_more_top_level(&mut self) {
        if self.forest.top_page() > 0 && !self.forest.top_has_more() {
            return;
        }
        self.load_top_level(self.forest.top_page() + 1).await
    }

    /// Toggles the replies of `id`
    ///
    /// Opening loads the replies if they never were, and in any case loads
    /// the first page of replies of each of them.
    pub async fn expand_replies(&mut self, id: &CommentId) {
        if !self.forest.contains(id) {
            tracing::debug!(%id, "not expanding a comment that is gone");
            return;
        }
        if self.forest.is_expanded(id) {
            self.forest.collapse(id);
            return;
        }
        if self.forest.is_cached(id) {
            self.forest.expand(id);
            let children = self.forest.children(id).to_vec();
            self.load_first_pages(&children).await;
            return;
        }
        let req = PageRequest::first(self.config.reply_limit);
        let resp = match self.api.fetch_replies(&self.target, id, req).await {
            Ok(resp) => resp,
            Err(err) => return self.fail("loading replies", err),
        };
        let added = match self.forest.apply_replies(id, 1, resp) {
            Some(added) => added,
            None => return,
        };
        self.forest.expand(id);
        self.load_first_pages(&added).await;
    }

    /// Loads the next page of replies of `id`, if the backend has more
    pub async fn load_more_replies(&mut self, id: &CommentId) {
        let entry = match self.forest.ledger().get(id) {
            Some(e) if e.has_more => *e,
            _ => return,
        };
        let page = entry.page + 1;
        let req = PageRequest::new(page, self.config.reply_limit);
        let resp = match self.api.fetch_replies(&self.target, id, req).await {
            Ok(resp) => resp,
            Err(err) => return self.fail("loading more replies", err),
        };
        let added = match self.forest.apply_replies(id, page, resp) {
            Some(added) => added,
            None => return,
        };
        tracing::debug!(%id, page, added = added.len(), "loaded more replies");
        self.load_first_pages(&added).await;
    }

    /// Learns the reply totals of `ids` without loading the replies
    async fn probe(&mut self, ids: &[CommentId]) {
        let req = PageRequest::first(self.config.probe_limit);
        let results = self.fetch_replies_of(ids, req).await;
        for (id, res) in results {
            match res {
                Ok(p) => {
                    if !self.forest.apply_probe(id, p) {
                        tracing::debug!(%id, "dropping probe for a comment that is gone");
                    }
                }
                Err(err) => self.fail("probing replies", err),
            }
        }
    }

    async fn fetch_replies_of<'i>(
        &self,
        ids: &'i [CommentId],
        req: PageRequest,
    ) -> Vec<(&'i CommentId, Result<Pagination, Error>)> {
        let api = &self.api;
        let target = &self.target;
        join_all(ids.iter().map(|id| async move {
            let res = api.fetch_replies(target, id, req).await;
            (id, res.map(|p| p.pagination))
        }))
        .await
    }

    /// Loads the first page of replies of each of `ids`
    async fn load_first_pages(&mut self, ids: &[CommentId]) {
        let req = PageRequest::first(self.config.reply_limit);
        let api = &self.api;
        let target = &self.target;
        let results = join_all(ids.iter().map(|id| async move {
            (id, api.fetch_replies(target, id, req).await)
        }))
        .await;
        for (id, res) in results {
            match res {
                Ok(resp) => {
                    if self.forest.apply_replies(id, 1, resp).is_none() {
                        tracing::debug!(%id, "dropping replies for a comment that is gone");
                    }
                }
                Err(err) => self.fail("loading nested replies", err),
            }
        }
    }

    /// Validates a comment, or a reply to `parent`, before it is posted
    ///
    /// Nothing is sent and nothing changes, so an error here is a validation
    /// problem for the form.
    pub fn begin_insert(
        &self,
        content: &str,
        parent: Option<&CommentId>,
    ) -> Result<NewComment, Error> {
        self.viewer.id()?;
        let content = crate::api::validate_content(content)?;
        if let Some(p) = parent {
            if !self.forest.contains(p) {
                return Err(Error::NotFound(p.clone()));
            }
        }
        let new = NewComment::new(self.target.clone(), parent.cloned(), String::from(content));
        new.validate()?;
        Ok(new)
    }

    /// Inserts a comment once the backend accepted it
    pub fn finish_insert(&mut self, res: Result<Comment, Error>) -> Result<CommentId, Error> {
        let comment = res.map_err(|err| {
            tracing::warn!(thread = %self.target, ?err, "failed posting comment");
            err
        })?;
        let id = comment.id.clone();
        self.forest.insert(comment);
        Ok(id)
    }

    /// Posts a comment, or a reply to `parent`, and inserts it once the
    /// backend accepted it
    pub async fn insert_comment(
        &mut self,
        content: &str,
        parent: Option<&CommentId>,
    ) -> Result<CommentId, Error> {
        let new = self.begin_insert(content, parent)?;
        let res = self.api.create_comment(&new).await;
        self.finish_insert(res)
    }

    /// Checks that `id` may be deleted and flags it as deleting until
    /// [`CommentStore::finish_delete`]
    pub fn begin_delete(&mut self, id: &CommentId) -> Result<DeleteContext, Error> {
        let user = self.viewer.id()?.clone();
        let node = self
            .forest
            .node(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        if !self.can_delete(node) {
            return Err(Error::PermissionDenied);
        }
        self.forest.set_deleting(id, true);
        Ok(DeleteContext {
            user_id: user,
            owner_id: self.owner.clone(),
        })
    }

    /// Applies the backend's answer to the deletion of `id`, returning how
    /// many comments went away
    pub fn finish_delete(
        &mut self,
        id: &CommentId,
        res: Result<(), Error>,
    ) -> Result<usize, Error> {
        match res {
            Ok(()) => {
                let removed = self.forest.remove_subtree(id).unwrap_or(0);
                tracing::debug!(%id, removed, "deleted comment");
                Ok(removed)
            }
            Err(err) => {
                tracing::warn!(%id, ?err, "failed deleting comment");
                self.forest.set_deleting(id, false);
                Err(err)
            }
        }
    }

    /// Deletes `id` and its replies, returning how many comments went away
    ///
    /// The comment stays in place, flagged as deleting, until the backend
    /// confirms.
    pub async fn delete_comment(&mut self, id: &CommentId) -> Result<usize, Error> {
        let ctx = self.begin_delete(id)?;
        let res = self.api.delete_comment(&self.target, id, &ctx).await;
        self.finish_delete(id, res)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bnusa_mock_server::{MockRequest, MockServer};

    use super::*;

    fn user(s: &str) -> UserId {
        UserId(String::from(s))
    }

    fn article() -> Target {
        Target::Article(String::from("art-1"))
    }

    fn store(mock: &Arc<MockServer>, top_level_limit: u32) -> CommentStore<Arc<MockServer>> {
        let mut store = CommentStore::with_config(
            mock.clone(),
            article(),
            StoreConfig {
                top_level_limit,
                reply_limit: REPLY_PAGE_SIZE,
                probe_limit: PROBE_PAGE_SIZE,
            },
        );
        store.set_viewer(Viewer::signed_in(user("alice")));
        mock.act_as(Some(user("alice")));
        store
    }

    fn seed_top(mock: &MockServer, n: usize) -> Vec<CommentId> {
        (0..n)
            .map(|i| mock.seed(&article(), None, &user("bob"), &format!("comment {i}")))
            .collect()
    }

    #[tokio::test]
    async fn empty_thread() {
        let mock = Arc::new(MockServer::new());
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;
        assert_eq!(s.error(), None);
        assert_eq!(s.forest().top_total(), 0);
        assert!(!s.forest().top_has_more());
        assert_eq!(s.reconciled_total(), 0);
    }

    #[tokio::test]
    async fn pagination_exhaustion() {
        let mock = Arc::new(MockServer::new());
        seed_top(&mock, 12);
        let mut s = store(&mock, 5);
        for (page, loaded, has_more) in [(1, 5, true), (2, 10, true), (3, 12, false)] {
            s.load_top_level(page).await;
            assert_eq!(s.forest().top_level().len(), loaded);
            assert_eq!(s.forest().top_has_more(), has_more);
            assert_eq!(s.forest().top_total(), 12);
        }
        assert_eq!(s.reconciled_total(), 12);

        // nothing left to load
        let requests = mock.requests().len();
        s.load_more_top_level().await;
        assert_eq!(mock.requests().len(), requests);
        s.forest().assert_consistent();
    }

    #[tokio::test]
    async fn top_level_load_probes_each_comment() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 2);
        for i in 0..3 {
            mock.seed(&article(), Some(&top[0]), &user("bob"), &format!("reply {i}"));
        }
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;

        let probes = mock
            .requests()
            .into_iter()
            .filter(|r| matches!(r, MockRequest::FetchReplies { limit: 1, page: 1, .. }))
            .count();
        assert_eq!(probes, 2);
        // replies are known but not loaded
        assert!(s.forest().children(&top[0]).is_empty());
        assert_eq!(s.reply_count(&top[0]), 3);
        assert_eq!(s.reconciled_total(), 5);
    }

    #[tokio::test]
    async fn expand_loads_replies_and_grandchildren() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 1);
        let b = mock.seed(&article(), Some(&top[0]), &user("bob"), "b");
        let c = mock.seed(&article(), Some(&b), &user("bob"), "c");
        let d = mock.seed(&article(), Some(&c), &user("bob"), "d");
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;
        assert_eq!(s.reconciled_total(), 2);

        s.expand_replies(&top[0]).await;
        assert!(s.forest().is_expanded(&top[0]));
        assert_eq!(s.forest().children(&top[0]), &[b.clone()]);
        // one level of grandchildren is loaded
        assert_eq!(s.forest().children(&b), &[c.clone()]);
        assert!(!s.forest().contains(&d));
        assert_eq!(s.reconciled_total(), 3);

        // expanding the nested reply loads its own replies
        s.expand_replies(&c).await;
        assert_eq!(s.forest().children(&c), &[d.clone()]);
        assert_eq!(s.reconciled_total(), 4);
        s.forest().assert_consistent();
    }

    #[tokio::test]
    async fn collapse_then_expand_does_not_duplicate() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 1);
        for i in 0..3 {
            mock.seed(&article(), Some(&top[0]), &user("bob"), &format!("r{i}"));
        }
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;
        s.expand_replies(&top[0]).await;
        let children = s.forest().children(&top[0]).to_vec();
        assert_eq!(children.len(), 3);

        s.expand_replies(&top[0]).await;
        assert!(!s.forest().is_expanded(&top[0]));
        assert_eq!(s.forest().children(&top[0]), &children[..]);

        s.expand_replies(&top[0]).await;
        assert!(s.forest().is_expanded(&top[0]));
        assert_eq!(s.forest().children(&top[0]), &children[..]);
        assert_eq!(s.reconciled_total(), 4);
        s.forest().assert_consistent();
    }

    #[tokio::test]
    async fn load_more_replies_appends() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 1);
        for i in 0..(REPLY_PAGE_SIZE + 3) {
            mock.seed(&article(), Some(&top[0]), &user("bob"), &format!("r{i}"));
        }
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;
        assert_eq!(s.reconciled_total(), 1 + REPLY_PAGE_SIZE as u64 + 3);

        s.expand_replies(&top[0]).await;
        let first = s.forest().children(&top[0]).to_vec();
        assert_eq!(first.len(), REPLY_PAGE_SIZE as usize);
        assert!(s.forest().ledger().get(&top[0]).unwrap().has_more);

        s.load_more_replies(&top[0]).await;
        let all = s.forest().children(&top[0]);
        assert_eq!(all.len(), REPLY_PAGE_SIZE as usize + 3);
        assert_eq!(&all[..first.len()], &first[..]);
        let entry = s.forest().ledger().get(&top[0]).unwrap();
        assert_eq!((entry.page, entry.has_more), (2, false));
        assert_eq!(s.reconciled_total(), 1 + REPLY_PAGE_SIZE as u64 + 3);

        // exhausted: no more requests
        let requests = mock.requests().len();
        s.load_more_replies(&top[0]).await;
        assert_eq!(mock.requests().len(), requests);
    }

    #[tokio::test]
    async fn deep_reply_scenario() {
        let mock = Arc::new(MockServer::new());
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;

        let a = s.insert_comment("A", None).await.unwrap();
        let b = s.insert_comment("B", Some(&a)).await.unwrap();
        let c = s.insert_comment("C", Some(&b)).await.unwrap();
        assert_eq!(s.reconciled_total(), 3);
        assert!(s.forest().is_expanded(&a));
        assert_eq!(
            s.forest().node(&c).unwrap().comment.replying_to.as_deref(),
            Some("alice")
        );

        s.expand_replies(&a).await;
        assert!(!s.forest().is_expanded(&a));
        s.expand_replies(&a).await;
        let shown: Vec<_> = s
            .forest()
            .visible_rows()
            .iter()
            .map(|r| r.node.id().clone())
            .collect();
        assert_eq!(shown, vec![a, b, c]);
        assert_eq!(s.reconciled_total(), 3);
        s.forest().assert_consistent();
    }

    #[tokio::test]
    async fn insert_three_levels_deep() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 1);
        let b = mock.seed(&article(), Some(&top[0]), &user("bob"), "b");
        let c = mock.seed(&article(), Some(&b), &user("bob"), "c");
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;
        s.expand_replies(&top[0]).await;
        s.expand_replies(&c).await;
        let before: Vec<_> = [&top[0], &b]
            .iter()
            .map(|id| s.forest().ledger().get(id).copied())
            .collect();
        let before_c = s.forest().ledger().get(&c).unwrap().total;

        let x = s.insert_comment("x", Some(&c)).await.unwrap();
        assert_eq!(s.forest().node(&x).unwrap().parent.as_ref(), Some(&c));
        assert_eq!(s.forest().children(&c), &[x]);
        assert_eq!(s.forest().ledger().get(&c).unwrap().total, before_c + 1);
        let after: Vec<_> = [&top[0], &b]
            .iter()
            .map(|id| s.forest().ledger().get(id).copied())
            .collect();
        assert_eq!(before, after);
        assert_eq!(s.reconciled_total(), 4);
    }

    #[tokio::test]
    async fn delete_cascade_count() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 2);
        let b1 = mock.seed(&article(), Some(&top[0]), &user("alice"), "b1");
        mock.seed(&article(), Some(&top[0]), &user("alice"), "b2");
        mock.seed(&article(), Some(&b1), &user("alice"), "c");
        mock.set_owner(&article(), user("alice"));
        let mut s = store(&mock, 10);
        s.set_owner(Some(user("alice")));
        s.load_top_level(1).await;
        assert_eq!(s.reconciled_total(), 4);
        s.expand_replies(&top[0]).await;
        assert_eq!(s.reconciled_total(), 5);

        assert_eq!(s.delete_comment(&top[0]).await, Ok(4));
        assert_eq!(s.reconciled_total(), 1);
        assert_eq!(s.forest().top_total(), 1);
        assert_eq!(mock.test_num_comments(), 1);
        s.forest().assert_consistent();
    }

    #[tokio::test]
    async fn delete_requires_author_or_owner() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 1);
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;
        let node = s.forest().node(&top[0]).unwrap();
        assert!(!s.can_delete(node));
        assert_eq!(
            s.delete_comment(&top[0]).await,
            Err(Error::PermissionDenied)
        );
        assert!(s.forest().contains(&top[0]));

        mock.set_owner(&article(), user("alice"));
        s.set_owner(Some(user("alice")));
        assert_eq!(s.delete_comment(&top[0]).await, Ok(1));
    }

    #[tokio::test]
    async fn failed_delete_restores_the_comment() {
        let mock = Arc::new(MockServer::new());
        let mut s = store(&mock, 10);
        let a = s.insert_comment("A", None).await.unwrap();
        mock.fail_next(1);
        assert!(matches!(s.delete_comment(&a).await, Err(Error::Network(_))));
        let node = s.forest().node(&a).unwrap();
        assert!(!node.deleting);
        assert_eq!(s.reconciled_total(), 1);
    }

    #[tokio::test]
    async fn read_failures_keep_loaded_state() {
        let mock = Arc::new(MockServer::new());
        seed_top(&mock, 12);
        let mut s = store(&mock, 5);
        s.load_top_level(1).await;
        assert_eq!(s.forest().len(), 5);

        mock.fail_next(1);
        s.load_more_top_level().await;
        assert!(matches!(s.error(), Some(Error::Network(_))));
        assert_eq!(s.forest().len(), 5);
        assert_eq!(s.forest().top_page(), 1);

        // retrying is up to the user
        s.clear_error();
        s.load_more_top_level().await;
        assert_eq!(s.error(), None);
        assert_eq!(s.forest().len(), 10);
    }

    #[tokio::test]
    async fn one_failed_probe_does_not_stop_the_others() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 3);
        for t in &top {
            mock.seed(&article(), Some(t), &user("bob"), "r");
        }
        mock.fail_replies_of(&top[1]);
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;

        assert!(matches!(s.error(), Some(Error::Network(_))));
        assert_eq!(s.forest().len(), 3);
        assert!(s.forest().ledger().get(&top[0]).is_some());
        assert!(s.forest().ledger().get(&top[1]).is_none());
        assert!(s.forest().ledger().get(&top[2]).is_some());
        assert_eq!(s.reconciled_total(), 5);
    }

    #[tokio::test]
    async fn validation_happens_before_the_network() {
        let mock = Arc::new(MockServer::new());
        let mut s = store(&mock, 10);
        assert_eq!(s.insert_comment("   ", None).await, Err(Error::EmptyContent));
        let ghost = CommentId(String::from("ghost"));
        assert_eq!(
            s.insert_comment("hi", Some(&ghost)).await,
            Err(Error::NotFound(ghost))
        );
        s.set_viewer(Viewer::anonymous());
        assert_eq!(
            s.insert_comment("hi", None).await,
            Err(Error::NotAuthenticated)
        );
        assert!(mock.requests().is_empty());
        assert_eq!(s.reconciled_total(), 0);
    }

    #[tokio::test]
    async fn failed_insert_leaves_the_forest_alone() {
        let mock = Arc::new(MockServer::new());
        let mut s = store(&mock, 10);
        mock.fail_next(1);
        assert!(matches!(
            s.insert_comment("hi", None).await,
            Err(Error::Network(_))
        ));
        assert!(s.forest().is_empty());
        assert_eq!(s.forest().top_total(), 0);
    }

    fn seed_replies(mock: &MockServer, parent: &CommentId, n: usize) -> Vec<CommentId> {
        (0..n)
            .map(|i| mock.seed(&article(), Some(parent), &user("bob"), &format!("r{i}")))
            .collect()
    }

    #[tokio::test]
    async fn reexpand_after_local_reply_fetches_older_ones() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 1);
        let r = seed_replies(&mock, &top[0], 3);
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;

        let x = s.insert_comment("x", Some(&top[0])).await.unwrap();
        assert!(s.forest().is_expanded(&top[0]));
        assert_eq!(s.reply_count(&top[0]), 4);

        s.expand_replies(&top[0]).await;
        s.expand_replies(&top[0]).await;
        assert!(s.forest().is_expanded(&top[0]));
        assert_eq!(
            s.forest().children(&top[0]),
            &[x, r[2].clone(), r[1].clone(), r[0].clone()]
        );
        assert_eq!(s.reconciled_total(), 5);

        let requests = mock.requests().len();
        s.load_more_replies(&top[0]).await;
        assert_eq!(mock.requests().len(), requests);
        s.forest().assert_consistent();
    }

    #[tokio::test]
    async fn load_more_after_local_reply_keeps_it_first() {
        let mock = Arc::new(MockServer::new());
        let top = seed_top(&mock, 1);
        let r = seed_replies(&mock, &top[0], 3);
        let mut s = store(&mock, 10);
        s.load_top_level(1).await;

        let x = s.insert_comment("x", Some(&top[0])).await.unwrap();
        s.load_more_replies(&top[0]).await;
        assert_eq!(
            s.forest().children(&top[0]),
            &[x, r[2].clone(), r[1].clone(), r[0].clone()]
        );
        let entry = s.forest().ledger().get(&top[0]).copied().unwrap();
        assert_eq!((entry.page, entry.has_more, entry.total), (1, false, 4));
        assert_eq!(s.reconciled_total(), 5);
        s.forest().assert_consistent();
    }

    #[tokio::test]
    async fn deleting_flag_is_visible_while_in_flight() {
        let mock = Arc::new(MockServer::new());
        let mut s = store(&mock, 10);
        let a = s.insert_comment("A", None).await.unwrap();

        let ctx = s.begin_delete(&a).unwrap();
        assert_eq!(ctx.user_id, user("alice"));
        assert!(s.forest().node(&a).unwrap().deleting);

        let res = mock.delete_comment(&article(), &a, &ctx).await;
        assert_eq!(s.finish_delete(&a, res), Ok(1));
        assert!(!s.forest().contains(&a));
    }

    #[tokio::test]
    async fn posting_in_two_steps() {
        let mock = Arc::new(MockServer::new());
        let mut s = store(&mock, 10);
        assert_eq!(s.begin_insert("  ", None), Err(Error::EmptyContent));

        let new = s.begin_insert(" slaw ", None).unwrap();
        assert_eq!(new.content, "slaw");
        assert!(s.forest().is_empty());

        let res = mock.create_comment(&new).await;
        let id = s.finish_insert(res).unwrap();
        assert_eq!(s.forest().top_level(), &[id]);
    }
}
