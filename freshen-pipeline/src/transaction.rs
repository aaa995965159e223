use crate::{
    AssetStorage, CancelPolicy, CancelToken, ImportOptionFlags, ImportSession, OperationStatus,
    PipelineResult, TargetConfig,
};
use freshen_base::{AssetId, ContentDigest};
use std::path::Path;

/// The caller-facing begin/end bracket over an ImportSession. Groups many
/// individual mark-dirty calls (file watcher events, explicit reimports,
/// target switches) into one batch so importers see a consistent, debounced
/// view of changes.
///
/// begin_editing() nests: inner brackets are counted no-ops and only the
/// outermost end_editing() processes the batch. The session underneath still
/// rejects a true double-begin; the re-entrancy bookkeeping lives here.
pub struct AssetEditingTransaction {
    session: ImportSession,
    edit_depth: u32,
}

impl AssetEditingTransaction {
    pub fn new(session: ImportSession) -> Self {
        AssetEditingTransaction {
            session,
            edit_depth: 0,
        }
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    pub fn is_editing(&self) -> bool {
        self.edit_depth > 0
    }

    pub fn queue_len(&self) -> usize {
        self.session.queue_len()
    }

    pub fn processed_count(&self) -> usize {
        self.session.processed_count()
    }

    pub fn begin_editing(&mut self) -> PipelineResult<()> {
        if self.edit_depth == 0 {
            self.session.begin_editing()?;
        }

        self.edit_depth += 1;
        Ok(())
    }

    pub fn mark_dirty(
        &mut self,
        storage: &dyn AssetStorage,
        path: &Path,
        asset_id: AssetId,
        options: ImportOptionFlags,
    ) -> PipelineResult<()> {
        self.session.mark_dirty(storage, path, asset_id, options)
    }

    pub fn mark_dirty_with_forced_digest(
        &mut self,
        storage: &dyn AssetStorage,
        path: &Path,
        asset_id: AssetId,
        options: ImportOptionFlags,
        forced_digest: ContentDigest,
    ) -> PipelineResult<()> {
        self.session
            .mark_dirty_with_forced_digest(storage, path, asset_id, options, forced_digest)
    }

    pub fn mark_deleted(
        &mut self,
        asset_id: AssetId,
    ) -> bool {
        self.session.mark_deleted(asset_id)
    }

    pub fn refresh_for_target<'a, I: IntoIterator<Item = (AssetId, &'a Path)>>(
        &mut self,
        storage: &dyn AssetStorage,
        assets: I,
        config: TargetConfig,
    ) -> PipelineResult<bool> {
        self.session.refresh_for_target(storage, assets, config)
    }

    /// Closes one bracket level. Returns None for inner (nested) brackets;
    /// the outermost close drains the queue and returns the batch status.
    pub fn end_editing(
        &mut self,
        storage: &mut dyn AssetStorage,
        cancel_policy: CancelPolicy,
        cancel: &CancelToken,
    ) -> PipelineResult<Option<OperationStatus>> {
        if self.edit_depth == 0 {
            Err("end_editing called without a matching begin_editing")?;
        }

        self.edit_depth -= 1;
        if self.edit_depth > 0 {
            return Ok(None);
        }

        let status = self.session.end_editing(storage, cancel_policy, cancel)?;
        Ok(Some(status))
    }
}
