use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bnusa_api::{
    Author, Comment, CommentApi, CommentId, DeleteContext, Error, NewComment, Page, PageRequest,
    Target, Time, UserId,
};
use parking_lot::Mutex;
use uuid::Uuid;

/// In-memory stand-in for the comment backend
///
/// Listings are newest first, deletions cascade, and failures can be
/// injected to exercise error paths.
pub struct MockServer(Mutex<State>);

/// A call received by the mock, in arrival order
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MockRequest {
    FetchComments {
        target: Target,
        page: u32,
        limit: u32,
    },
    FetchReplies {
        parent: CommentId,
        page: u32,
        limit: u32,
    },
    Create {
        parent: Option<CommentId>,
    },
    Delete {
        id: CommentId,
    },
}

#[derive(Debug)]
struct Stored {
    seq: u64,
    target: Target,
    comment: Comment,
}

#[derive(Debug)]
struct State {
    comments: HashMap<CommentId, Stored>,
    names: HashMap<UserId, String>,
    owners: HashMap<Target, UserId>,
    acting: Option<UserId>,
    seq: u64,
    epoch: Time,
    failures: u32,
    failing_parents: HashSet<CommentId>,
    requests: Vec<MockRequest>,
}

impl State {
    fn author(&self, id: &UserId) -> Author {
        Author {
            id: id.clone(),
            name: self
                .names
                .get(id)
                .cloned()
                .unwrap_or_else(|| id.0.clone()),
            username: Some(id.0.clone()),
            profile_image: None,
        }
    }

    fn add(
        &mut self,
        target: &Target,
        parent: Option<&CommentId>,
        author: &UserId,
        content: &str,
    ) -> Comment {
        self.seq += 1;
        let comment = Comment {
            id: CommentId(Uuid::new_v4().simple().to_string()),
            content: String::from(content),
            author: self.author(author),
            created_at: self.epoch + chrono::Duration::seconds(self.seq as i64),
            parent_id: parent.cloned(),
            replying_to: None,
        };
        self.comments.insert(
            comment.id.clone(),
            Stored {
                seq: self.seq,
                target: target.clone(),
                comment: comment.clone(),
            },
        );
        comment
    }

    fn injected_failure(&mut self) -> Result<(), Error> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(Error::Network(String::from("injected failure")));
        }
        Ok(())
    }

    fn list<F>(&self, req: PageRequest, filter: F) -> Result<Page<Comment>, Error>
    where
        F: Fn(&Stored) -> bool,
    {
        if req.page == 0 || req.limit == 0 {
            return Err(Error::Unknown(String::from("page and limit start at 1")));
        }
        let mut matching = self
            .comments
            .values()
            .filter(|s| filter(s))
            .collect::<Vec<_>>();
        matching.sort_unstable_by_key(|s| std::cmp::Reverse(s.seq));
        let total = matching.len();
        let data = matching
            .into_iter()
            .skip(req.offset())
            .take(req.limit as usize)
            .map(|s| s.comment.clone())
            .collect::<Vec<_>>();
        let has_more = req.offset() + data.len() < total;
        Ok(Page::new(data, has_more, total as u64))
    }

    fn acting(&self) -> Result<UserId, Error> {
        self.acting.clone().ok_or(Error::NotAuthenticated)
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(Mutex::new(State {
            comments: HashMap::new(),
            names: HashMap::new(),
            owners: HashMap::new(),
            acting: None,
            seq: 0,
            epoch: "2024-01-01T00:00:00Z"
                .parse()
                .expect("parsing mock epoch"),
            failures: 0,
            failing_parents: HashSet::new(),
            requests: Vec::new(),
        }))
    }

    pub fn register_user(&self, id: UserId, name: String) {
        self.0.lock().names.insert(id, name);
    }

    pub fn set_owner(&self, target: &Target, owner: UserId) {
        self.0.lock().owners.insert(target.clone(), owner);
    }

    /// Sets the user the next requests are authenticated as
    pub fn act_as(&self, user: Option<UserId>) {
        self.0.lock().acting = user;
    }

    /// Makes the next `n` requests fail
    pub fn fail_next(&self, n: u32) {
        self.0.lock().failures = n;
    }

    /// Makes every listing of the replies of `parent` fail
    pub fn fail_replies_of(&self, parent: &CommentId) {
        self.0.lock().failing_parents.insert(parent.clone());
    }

    pub fn heal(&self) {
        let mut state = self.0.lock();
        state.failures = 0;
        state.failing_parents.clear();
    }

    /// Adds a comment directly, as if another user had posted it
    ///
    /// Panics if `parent` is not a comment of `target`
    pub fn seed(
        &self,
        target: &Target,
        parent: Option<&CommentId>,
        author: &UserId,
        content: &str,
    ) -> CommentId {
        let mut state = self.0.lock();
        if let Some(p) = parent {
            match state.comments.get(p) {
                Some(s) if s.target == *target => (),
                _ => panic!("seeding a reply to {p}, which is not a comment of {target}"),
            }
        }
        state.add(target, parent, author, content).id
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.0.lock().requests.clone()
    }

    pub fn test_num_comments(&self) -> usize {
        self.0.lock().comments.len()
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait]
impl CommentApi for MockServer {
    async fn fetch_comments(
        &self,
        target: &Target,
        page: PageRequest,
    ) -> Result<Page<Comment>, Error> {
        let mut state = self.0.lock();
        state.requests.push(MockRequest::FetchComments {
            target: target.clone(),
            page: page.page,
            limit: page.limit,
        });
        state.injected_failure()?;
        state.list(page, |s| s.target == *target && s.comment.parent_id.is_none())
    }

    async fn fetch_replies(
        &self,
        target: &Target,
        parent: &CommentId,
        page: PageRequest,
    ) -> Result<Page<Comment>, Error> {
        let mut state = self.0.lock();
        state.requests.push(MockRequest::FetchReplies {
            parent: parent.clone(),
            page: page.page,
            limit: page.limit,
        });
        state.injected_failure()?;
        if state.failing_parents.contains(parent) {
            return Err(Error::Network(format!("injected failure for {parent}")));
        }
        state.list(page, |s| {
            s.target == *target && s.comment.parent_id.as_ref() == Some(parent)
        })
    }

    async fn create_comment(&self, new: &NewComment) -> Result<Comment, Error> {
        let mut state = self.0.lock();
        state.requests.push(MockRequest::Create {
            parent: new.parent_id.clone(),
        });
        state.injected_failure()?;
        let author = state.acting()?;
        new.validate()?;
        if let Some(p) = &new.parent_id {
            match state.comments.get(p) {
                Some(s) if s.target == new.target => (),
                _ => return Err(Error::NotFound(p.clone())),
            }
        }
        Ok(state.add(
            &new.target,
            new.parent_id.as_ref(),
            &author,
            new.content.trim(),
        ))
    }

    async fn delete_comment(
        &self,
        target: &Target,
        id: &CommentId,
        ctx: &DeleteContext,
    ) -> Result<(), Error> {
        let mut state = self.0.lock();
        state.requests.push(MockRequest::Delete { id: id.clone() });
        state.injected_failure()?;
        let user = state.acting()?;
        if ctx.user_id != user {
            return Err(Error::PermissionDenied);
        }
        let author = match state.comments.get(id) {
            Some(s) if s.target == *target => s.comment.author.id.clone(),
            _ => return Err(Error::NotFound(id.clone())),
        };
        if author != user && state.owners.get(target) != Some(&user) {
            return Err(Error::PermissionDenied);
        }
        let mut doomed = vec![id.clone()];
        while let Some(cur) = doomed.pop() {
            state.comments.remove(&cur);
            doomed.extend(
                state
                    .comments
                    .values()
                    .filter(|s| s.comment.parent_id.as_ref() == Some(&cur))
                    .map(|s| s.comment.id.clone()),
            );
        }
        Ok(())
    }
}
