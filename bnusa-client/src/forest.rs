use std::{
    cmp::Reverse,
    collections::{HashMap, HashSet},
};

use crate::{
    api::{Comment, CommentId, Page, Pagination},
    Ledger,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    pub comment: Comment,
    pub parent: Option<CommentId>,

    /// Direct replies, newest first
    pub children: Vec<CommentId>,

    /// Set while the deletion request is in flight, so the view can fade it out
    pub deleting: bool,
}

impl Node {
    fn new(comment: Comment, parent: Option<CommentId>) -> Node {
        Node {
            comment,
            parent,
            children: Vec::new(),
            deleting: false,
        }
    }

    pub fn id(&self) -> &CommentId {
        &self.comment.id
    }
}

/// A comment as laid out by the view
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    pub node: &'a Node,
    pub depth: usize,
}

/// All the comments loaded for one target
///
/// Nodes live in an arena keyed by id and only refer to each other by id. A
/// node is only ever attached under a parent that is already in the arena and
/// never twice, so the structure stays a forest.
#[derive(Clone, Debug, Default)]
pub struct Forest {
    nodes: HashMap<CommentId, Node>,

    /// Newest first
    top_level: Vec<CommentId>,
    top_page: u32,
    top_has_more: bool,
    top_total: u64,

    ledger: Ledger,
    expanded: HashSet<CommentId>,
}

impl Forest {
    pub fn new() -> Forest {
        Forest::default()
    }

    pub fn node(&self, id: &CommentId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn top_level(&self) -> &[CommentId] {
        &self.top_level
    }

    pub fn top_page(&self) -> u32 {
        self.top_page
    }

    pub fn top_has_more(&self) -> bool {
        self.top_has_more
    }

    pub fn top_total(&self) -> u64 {
        self.top_total
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_expanded(&self, id: &CommentId) -> bool {
        self.expanded.contains(id)
    }

    /// Number of comments currently loaded
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CommentId> {
        self.nodes.keys()
    }

    pub fn children(&self, id: &CommentId) -> &[CommentId] {
        self.nodes
            .get(id)
            .map(|n| &n.children as &[CommentId])
            .unwrap_or(&[])
    }

    /// Top-level comment under which `id` lives
    pub fn root_of(&self, id: &CommentId) -> Option<&CommentId> {
        let mut cur = self.nodes.get(id)?;
        for _ in 0..self.nodes.len() {
            match &cur.parent {
                None => return Some(&cur.comment.id),
                Some(p) => cur = self.nodes.get(p)?,
            }
        }
        None
    }

    /// Whether a page of the replies of `id` was fetched at least once
    ///
    /// Replies posted locally do not count: the backend may hold older ones.
    pub fn is_cached(&self, id: &CommentId) -> bool {
        self.ledger.get(id).map_or(false, |e| e.page > 0)
    }

    /// Sorts `ids` newest first, keeping the order of equal timestamps
    fn sort_newest_first(nodes: &HashMap<CommentId, Node>, ids: &mut [CommentId]) {
        ids.sort_by_key(|id| Reverse(nodes.get(id).map(|n| n.comment.created_at)));
    }

    /// Merges a page of top-level comments, returning the newly added ids
    ///
    /// Page 1 replaces everything that was loaded before.
    pub fn apply_top_level(&mut self, page: u32, resp: Page<Comment>) -> Vec<CommentId> {
        let Page {
            data, pagination, ..
        } = resp;
        if page <= 1 {
            self.nodes.clear();
            self.top_level.clear();
            self.ledger.clear();
            self.expanded.clear();
        }
        let mut added = Vec::with_capacity(data.len());
        for c in data {
            if self.nodes.contains_key(&c.id) {
                tracing::debug!(id = %c.id, "skipping already loaded comment");
                continue;
            }
            let id = c.id.clone();
            self.nodes.insert(id.clone(), Node::new(c, None));
            self.top_level.push(id.clone());
            added.push(id);
        }
        // pages can arrive out of order, and local posts sit in front
        Forest::sort_newest_first(&self.nodes, &mut self.top_level);
        self.top_page = page;
        self.top_has_more = pagination.has_more;
        self.top_total = pagination.total;
        added
    }

    /// Merges a page of direct replies of `parent`, returning the newly added
    /// ids, or `None` if `parent` is no longer loaded
    pub fn apply_replies(
        &mut self,
        parent: &CommentId,
        page: u32,
        resp: Page<Comment>,
    ) -> Option<Vec<CommentId>> {
        if !self.nodes.contains_key(parent) {
            tracing::debug!(%parent, "dropping replies for a comment that is gone");
            return None;
        }
        let Page {
            data, pagination, ..
        } = resp;
        let mut added = Vec::with_capacity(data.len());
        for c in data {
            if self.nodes.contains_key(&c.id) {
                continue;
            }
            let id = c.id.clone();
            self.nodes
                .insert(id.clone(), Node::new(c, Some(parent.clone())));
            added.push(id);
        }
        let mut siblings = std::mem::take(&mut self.nodes.get_mut(parent)?.children);
        match page {
            0 | 1 => {
                siblings.splice(0..0, added.iter().cloned());
            }
            _ => siblings.extend(added.iter().cloned()),
        }
        // replies posted from here can be newer than the fetched page
        Forest::sort_newest_first(&self.nodes, &mut siblings);
        self.nodes.get_mut(parent)?.children = siblings;
        self.ledger.record_page(parent.clone(), page, pagination);
        Some(added)
    }

    /// Records a probe of the replies of `id`, returning false if it is gone
    pub fn apply_probe(&mut self, id: &CommentId, p: Pagination) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        self.ledger.record_probe(id.clone(), p);
        true
    }

    /// Inserts a freshly created comment
    ///
    /// Replies go first under their parent, wherever it is in the forest, and
    /// the top-level comment above them gets expanded.
    pub fn insert(&mut self, mut comment: Comment) -> bool {
        if self.nodes.contains_key(&comment.id) {
            tracing::debug!(id = %comment.id, "comment already inserted");
            return false;
        }
        let id = comment.id.clone();
        match comment.parent_id.clone() {
            None => {
                self.top_level.insert(0, id.clone());
                self.top_total += 1;
                self.nodes.insert(id, Node::new(comment, None));
            }
            Some(parent) => {
                let p = match self.nodes.get_mut(&parent) {
                    Some(p) => p,
                    None => {
                        tracing::warn!(%id, %parent, "parent of new reply is gone");
                        return false;
                    }
                };
                if comment.replying_to.is_none() {
                    comment.replying_to = Some(String::from(p.comment.author.display_name()));
                }
                p.children.insert(0, id.clone());
                self.ledger.increment(&parent, 1);
                self.nodes
                    .insert(id, Node::new(comment, Some(parent.clone())));
                if let Some(root) = self.root_of(&parent).cloned() {
                    self.expanded.insert(root);
                }
            }
        }
        true
    }

    pub fn expand(&mut self, id: &CommentId) -> bool {
        self.nodes.contains_key(id) && self.expanded.insert(id.clone())
    }

    pub fn collapse(&mut self, id: &CommentId) -> bool {
        self.expanded.remove(id)
    }

    /// Returns whether `id` is now expanded
    pub fn toggle_expanded(&mut self, id: &CommentId) -> bool {
        if self.collapse(id) {
            return false;
        }
        self.expand(id)
    }

    pub fn set_deleting(&mut self, id: &CommentId, deleting: bool) -> bool {
        match self.nodes.get_mut(id) {
            Some(n) => {
                n.deleting = deleting;
                true
            }
            None => false,
        }
    }

    /// Removes `id` and all its replies, returning how many comments were removed
    pub fn remove_subtree(&mut self, id: &CommentId) -> Option<usize> {
        let parent = self.nodes.get(id)?.parent.clone();
        let mut removed = 0;
        let mut stack = vec![id.clone()];
        while let Some(cur) = stack.pop() {
            if let Some(n) = self.nodes.remove(&cur) {
                stack.extend(n.children);
                removed += 1;
            }
            self.ledger.remove(&cur);
            self.expanded.remove(&cur);
        }
        match parent {
            None => {
                self.top_level.retain(|c| c != id);
                self.top_total = self.top_total.saturating_sub(1);
            }
            Some(p) => {
                if let Some(p) = self.nodes.get_mut(&p) {
                    p.children.retain(|c| c != id);
                }
                self.ledger.increment(&p, -1);
            }
        }
        Some(removed)
    }

    /// Replies the backend knows about below `node` but that are not loaded
    fn unloaded(&self, id: &CommentId, node: &Node) -> u64 {
        self.ledger
            .get(id)
            .map_or(0, |e| e.total.saturating_sub(node.children.len() as u64))
    }

    /// Best-known number of comments on the target, loaded or not
    pub fn reconciled_total(&self) -> u64 {
        let unloaded: u64 = self
            .nodes
            .iter()
            .map(|(id, n)| self.unloaded(id, n))
            .sum();
        self.nodes.len() as u64 + unloaded
    }

    /// Best-known number of replies below `id`, at any depth
    pub fn reply_count(&self, id: &CommentId) -> u64 {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let n = match self.nodes.get(cur) {
                Some(n) => n,
                None => continue,
            };
            count += self.unloaded(cur, n);
            for c in n.children.iter().filter(|c| self.nodes.contains_key(*c)) {
                count += 1;
                stack.push(c);
            }
        }
        count
    }

    /// Comments to show, in display order
    ///
    /// An expanded top-level comment shows its whole loaded subtree.
    pub fn visible_rows(&self) -> Vec<Row<'_>> {
        let mut rows = Vec::new();
        for id in &self.top_level {
            if let Some(node) = self.nodes.get(id) {
                rows.push(Row { node, depth: 0 });
                if self.expanded.contains(id) {
                    self.push_subtree(node, 1, &mut rows);
                }
            }
        }
        rows
    }

    fn push_subtree<'a>(&'a self, node: &'a Node, depth: usize, rows: &mut Vec<Row<'a>>) {
        for c in &node.children {
            if let Some(child) = self.nodes.get(c) {
                rows.push(Row { node: child, depth });
                self.push_subtree(child, depth + 1, rows);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut seen = HashSet::new();
        let mut stack = Vec::new();
        for id in &self.top_level {
            let n = self.nodes.get(id).expect("top-level id not in arena");
            assert_eq!(n.parent, None, "top-level comment {id} has a parent");
            stack.push(id);
        }
        while let Some(id) = stack.pop() {
            assert!(seen.insert(id.clone()), "comment {id} reachable twice");
            for c in self.children(id) {
                let child = self.nodes.get(c).expect("child id not in arena");
                assert_eq!(child.parent.as_ref(), Some(id), "child {c} has the wrong parent");
                stack.push(c);
            }
        }
        assert_eq!(seen.len(), self.nodes.len(), "unreachable comments in arena");
        for id in self.nodes.keys() {
            assert!(self.root_of(id).is_some(), "comment {id} is its own ancestor");
        }
        for (id, _) in self.ledger.iter() {
            assert!(self.nodes.contains_key(id), "ledger entry for missing {id}");
        }
        for id in &self.expanded {
            assert!(self.nodes.contains_key(id), "missing {id} is expanded");
        }
    }
}
