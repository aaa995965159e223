use crate::{ImportOptionFlags, ImporterId};
use freshen_base::hashing::HashMap;
use freshen_base::{AssetId, ContentDigest};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One queued reimport. Stage/substage are copied from the owning importer at
/// enqueue time, never recomputed, so queue order stays stable even if
/// importer state mutates mid-batch.
#[derive(Debug, Clone)]
pub struct RefreshQueueEntry {
    pub asset: AssetId,
    pub stage: i32,
    pub substage: u64,
    pub digest: ContentDigest,
    /// Digest override from a content-addressed remote cache. When set, this
    /// is what gets recorded on successful import instead of the local digest.
    pub forced_digest: Option<ContentDigest>,
    pub options: ImportOptionFlags,
    pub importer_id: ImporterId,
    pub path: PathBuf,
}

// Total order: (stage, substage, asset). The digest leg is unreachable while
// asset ids are unique but keeps the order total by construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct QueueOrderKey {
    stage: i32,
    substage: u64,
    asset: AssetId,
    digest: ContentDigest,
}

impl QueueOrderKey {
    fn for_entry(entry: &RefreshQueueEntry) -> Self {
        QueueOrderKey {
            stage: entry.stage,
            substage: entry.substage,
            asset: entry.asset,
            digest: entry.forced_digest.unwrap_or(entry.digest),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueueState {
    Empty,
    Populating,
    Draining,
}

/// The ordered work queue plus its reverse index. Entries are owned by value
/// in the ordered structure; the reverse index stores the ordering key (a
/// stable logical value, not a pointer into the tree), re-looked-up on
/// removal.
///
/// For every asset present, the reverse index and the ordered structure agree
/// on exactly one position. enqueue() on an already-queued asset removes the
/// stale entry before inserting - the ordering key may have changed because
/// the substage depends on path, which changes on rename.
pub struct RefreshQueue {
    state: QueueState,
    ordered: BTreeMap<QueueOrderKey, RefreshQueueEntry>,
    positions: HashMap<AssetId, QueueOrderKey>,
}

impl Default for RefreshQueue {
    fn default() -> Self {
        RefreshQueue {
            state: QueueState::Empty,
            ordered: Default::default(),
            positions: Default::default(),
        }
    }
}

impl RefreshQueue {
    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Never fails; allocation failure aborts like everywhere else in the
    /// process. Valid while populating only.
    pub fn enqueue(
        &mut self,
        entry: RefreshQueueEntry,
    ) {
        assert_ne!(self.state, QueueState::Draining);
        self.state = QueueState::Populating;

        if let Some(old_key) = self.positions.remove(&entry.asset) {
            let removed = self.ordered.remove(&old_key);
            assert!(removed.is_some());
        }

        let key = QueueOrderKey::for_entry(&entry);
        self.positions.insert(entry.asset, key);
        let old = self.ordered.insert(key, entry);
        assert!(old.is_none());
    }

    /// Idempotent - callers race deletion against staleness checks, so
    /// removing an absent asset is a no-op, not an error.
    pub fn remove(
        &mut self,
        asset: AssetId,
    ) -> bool {
        assert_ne!(self.state, QueueState::Draining);
        match self.positions.remove(&asset) {
            Some(key) => {
                let removed = self.ordered.remove(&key);
                assert!(removed.is_some());
                if self.ordered.is_empty() {
                    self.state = QueueState::Empty;
                }
                true
            }
            None => false,
        }
    }

    pub fn begin_draining(&mut self) {
        assert_ne!(self.state, QueueState::Draining);
        if !self.ordered.is_empty() {
            self.state = QueueState::Draining;
        }
    }

    /// Remove and return the lowest-ordered entry. Valid while draining only.
    pub fn pop_next(&mut self) -> Option<RefreshQueueEntry> {
        if self.state != QueueState::Draining {
            return None;
        }

        match self.ordered.pop_first() {
            Some((_, entry)) => {
                let position = self.positions.remove(&entry.asset);
                assert!(position.is_some());
                if self.ordered.is_empty() {
                    self.state = QueueState::Empty;
                }
                Some(entry)
            }
            None => None,
        }
    }

    /// Stop draining with entries still queued. They stay staged for the
    /// next batch - used when a cancelled batch keeps its remainder.
    pub fn suspend_draining(&mut self) {
        if self.state == QueueState::Draining {
            self.state = if self.ordered.is_empty() {
                QueueState::Empty
            } else {
                QueueState::Populating
            };
        }
    }

    /// Read-only view in drain order, used for progress-bar sizing.
    pub fn snapshot(&self) -> Vec<AssetId> {
        self.ordered.values().map(|x| x.asset).collect()
    }

    pub fn contains(
        &self,
        asset: AssetId,
    ) -> bool {
        self.positions.contains_key(&asset)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Discard everything queued. Used by the rollback path - recorded digests
    /// of the discarded assets are untouched so they stay dirty.
    pub fn clear(&mut self) {
        self.ordered.clear();
        self.positions.clear();
        self.state = QueueState::Empty;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(
        asset: AssetId,
        stage: i32,
        substage: u64,
    ) -> RefreshQueueEntry {
        RefreshQueueEntry {
            asset,
            stage,
            substage,
            digest: ContentDigest::compute(b"content"),
            forced_digest: None,
            options: ImportOptionFlags::NONE,
            importer_id: ImporterId(uuid::Uuid::nil()),
            path: PathBuf::from("assets/file.png"),
        }
    }

    fn drain(queue: &mut RefreshQueue) -> Vec<AssetId> {
        queue.begin_draining();
        let mut order = Vec::default();
        while let Some(popped) = queue.pop_next() {
            order.push(popped.asset);
        }
        order
    }

    #[test]
    fn enqueue_is_idempotent() {
        let mut queue = RefreshQueue::default();
        queue.enqueue(entry(AssetId(1), 0, 10));
        queue.enqueue(entry(AssetId(1), 0, 10));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.snapshot(), vec![AssetId(1)]);
    }

    #[test]
    fn reenqueue_moves_entry_to_new_position() {
        let mut queue = RefreshQueue::default();
        queue.enqueue(entry(AssetId(1), 0, 10));
        queue.enqueue(entry(AssetId(2), 0, 20));
        // Rename changed the path-derived substage, the entry must move,
        // not duplicate
        queue.enqueue(entry(AssetId(1), 0, 30));
        assert_eq!(queue.len(), 2);
        assert_eq!(drain(&mut queue), vec![AssetId(2), AssetId(1)]);
    }

    #[test]
    fn drain_order_is_permutation_independent() {
        let entries = [
            entry(AssetId(4), 1, 5),
            entry(AssetId(2), 0, 50),
            entry(AssetId(9), 0, 5),
            entry(AssetId(7), 2, 1),
            entry(AssetId(1), 0, 50),
        ];

        // All insertion orders must produce the same drain order
        let mut expected = None;
        for rotation in 0..entries.len() {
            let mut queue = RefreshQueue::default();
            for i in 0..entries.len() {
                queue.enqueue(entries[(i + rotation) % entries.len()].clone());
            }
            let order = drain(&mut queue);
            match &expected {
                None => expected = Some(order),
                Some(expected) => assert_eq!(&order, expected),
            }
        }

        assert_eq!(
            expected.unwrap(),
            vec![AssetId(9), AssetId(1), AssetId(2), AssetId(4), AssetId(7)]
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let mut queue = RefreshQueue::default();
        queue.enqueue(entry(AssetId(1), 0, 10));
        assert!(queue.remove(AssetId(1)));
        assert!(!queue.remove(AssetId(1)));
        assert!(queue.is_empty());
        assert_eq!(queue.state(), QueueState::Empty);
    }

    #[test]
    fn state_machine_walk() {
        let mut queue = RefreshQueue::default();
        assert_eq!(queue.state(), QueueState::Empty);
        assert!(queue.pop_next().is_none());

        queue.enqueue(entry(AssetId(1), 0, 10));
        assert_eq!(queue.state(), QueueState::Populating);
        // Not draining yet
        assert!(queue.pop_next().is_none());

        queue.begin_draining();
        assert_eq!(queue.state(), QueueState::Draining);
        assert!(queue.pop_next().is_some());
        assert_eq!(queue.state(), QueueState::Empty);
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut queue = RefreshQueue::default();
        queue.enqueue(entry(AssetId(1), 0, 10));
        queue.enqueue(entry(AssetId(2), 1, 10));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.state(), QueueState::Empty);
        assert!(!queue.contains(AssetId(1)));
    }
}
