use std::collections::HashMap;

use crate::api::{CommentId, Pagination};

/// Pagination state of one comment's direct replies
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReplyPage {
    /// Last page loaded, 0 if the replies were only probed
    pub page: u32,

    pub has_more: bool,

    /// Direct reply count reported by the backend
    pub total: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ledger(HashMap<CommentId, ReplyPage>);

impl Ledger {
    pub fn new() -> Ledger {
        Ledger(HashMap::new())
    }

    pub fn get(&self, id: &CommentId) -> Option<&ReplyPage> {
        self.0.get(id)
    }

    pub fn set(&mut self, id: CommentId, entry: ReplyPage) {
        self.0.insert(id, entry);
    }

    /// Bumps the total of an existing entry, returning false if there is none
    pub fn increment(&mut self, id: &CommentId, delta: i64) -> bool {
        match self.0.get_mut(id) {
            Some(e) => {
                e.total = e.total.saturating_add_signed(delta);
                true
            }
            None => false,
        }
    }

    /// Records a loaded page of replies
    ///
    /// Re-fetching an earlier page refreshes the total but leaves the cursor
    /// where it was.
    pub fn record_page(&mut self, id: CommentId, page: u32, p: Pagination) {
        let e = self.0.entry(id).or_default();
        if page >= e.page {
            e.page = page;
            e.has_more = p.has_more;
        }
        e.total = p.total;
    }

    /// Records a probe, which learns the total without loading any reply
    pub fn record_probe(&mut self, id: CommentId, p: Pagination) {
        let e = self.0.entry(id).or_default();
        if e.page == 0 {
            e.has_more = p.has_more || p.total > 0;
        }
        e.total = p.total;
    }

    pub fn remove(&mut self, id: &CommentId) -> Option<ReplyPage> {
        self.0.remove(id)
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CommentId, &ReplyPage)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CommentId {
        CommentId(String::from(s))
    }

    fn pagination(has_more: bool, total: u64) -> Pagination {
        Pagination { has_more, total }
    }

    #[test]
    fn probe_then_pages() {
        let mut l = Ledger::new();
        l.record_probe(id("a"), pagination(true, 120));
        assert_eq!(
            l.get(&id("a")),
            Some(&ReplyPage {
                page: 0,
                has_more: true,
                total: 120
            })
        );

        l.record_page(id("a"), 1, pagination(true, 120));
        l.record_page(id("a"), 2, pagination(true, 121));
        assert_eq!(l.get(&id("a")).map(|e| e.page), Some(2));

        // a late re-fetch of page 1 must not rewind the cursor
        l.record_page(id("a"), 1, pagination(true, 122));
        assert_eq!(
            l.get(&id("a")),
            Some(&ReplyPage {
                page: 2,
                has_more: true,
                total: 122
            })
        );

        // nor may a probe
        l.record_probe(id("a"), pagination(false, 1));
        assert_eq!(l.get(&id("a")).map(|e| (e.page, e.has_more)), Some((2, true)));
    }

    #[test]
    fn increment_only_touches_known_entries() {
        let mut l = Ledger::new();
        assert!(!l.increment(&id("a"), 1));
        assert!(l.is_empty());

        l.set(id("a"), ReplyPage::default());
        assert!(l.increment(&id("a"), 2));
        assert!(l.increment(&id("a"), -5));
        assert_eq!(l.get(&id("a")).map(|e| e.total), Some(0));
    }
}
