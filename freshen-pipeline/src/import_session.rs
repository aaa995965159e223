use crate::{
    AssetStorage, CancelPolicy, CancelToken, ImportContext, ImportError, ImportFailure,
    ImportLogData, ImportLogEvent, ImportOptionFlags, ImportTargetState, ImporterRegistry,
    LogEventLevel, OperationStatus, PipelineError, PipelineResult, RefreshQueue,
    RefreshQueueEntry, TargetConfig,
};
use freshen_base::hashing::HashSet;
use freshen_base::{AssetId, ContentDigest};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Editing,
    Processing,
    Committed,
    RolledBack,
}

/// One batch of refresh work: begin, stage dirty assets, drain with progress
/// and cancellation, commit or roll back. Owned as a plain value by whatever
/// drives the asset pipeline - there is no ambient global session.
///
/// The queue and its reverse index belong exclusively to this session; nothing
/// else mutates them.
pub struct ImportSession {
    registry: ImporterRegistry,
    target_state: ImportTargetState,
    state: SessionState,
    queue: RefreshQueue,
    // Ids of assets deleted this process lifetime. Never reused, never
    // re-queued.
    tombstones: HashSet<AssetId>,
    // Set when the batch was staged by a whole-repository target sweep.
    // Explicit per-path batches never update the persisted target record.
    pending_target: Option<TargetConfig>,
    processed_count: usize,
    last_import_log: Option<Arc<ImportLogData>>,
}

impl ImportSession {
    pub fn new(
        registry: ImporterRegistry,
        target_state: ImportTargetState,
    ) -> Self {
        ImportSession {
            registry,
            target_state,
            state: SessionState::Idle,
            queue: Default::default(),
            tombstones: Default::default(),
            pending_target: None,
            processed_count: 0,
            last_import_log: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target_state(&self) -> &ImportTargetState {
        &self.target_state
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Entries drained so far in the current (or most recent) batch. Progress
    /// rendering from queue_len()/processed_count() is the caller's concern.
    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    pub fn queued_assets(&self) -> Vec<AssetId> {
        self.queue.snapshot()
    }

    pub fn last_import_log(&self) -> Option<&Arc<ImportLogData>> {
        self.last_import_log.as_ref()
    }

    pub fn begin_editing(&mut self) -> PipelineResult<()> {
        if self.state != SessionState::Idle {
            return Err(PipelineError::AlreadyEditing);
        }

        self.state = SessionState::Editing;
        self.processed_count = 0;
        Ok(())
    }

    /// Stage an asset if it is stale with respect to its last recorded
    /// import. Paths no importer claims are silently ignored - not every
    /// changed file is an asset.
    pub fn mark_dirty(
        &mut self,
        storage: &dyn AssetStorage,
        path: &Path,
        asset_id: AssetId,
        options: ImportOptionFlags,
    ) -> PipelineResult<()> {
        self.mark_dirty_inner(storage, path, asset_id, options, None)
    }

    /// Same as mark_dirty, but a content-addressed remote cache dictates the
    /// digest to record instead of hashing local content.
    pub fn mark_dirty_with_forced_digest(
        &mut self,
        storage: &dyn AssetStorage,
        path: &Path,
        asset_id: AssetId,
        options: ImportOptionFlags,
        forced_digest: ContentDigest,
    ) -> PipelineResult<()> {
        self.mark_dirty_inner(storage, path, asset_id, options, Some(forced_digest))
    }

    fn mark_dirty_inner(
        &mut self,
        storage: &dyn AssetStorage,
        path: &Path,
        asset_id: AssetId,
        options: ImportOptionFlags,
        forced_digest: Option<ContentDigest>,
    ) -> PipelineResult<()> {
        if self.state != SessionState::Editing {
            Err("mark_dirty is only valid between begin_editing and end_editing")?;
        }

        if self.tombstones.contains(&asset_id) {
            return Ok(());
        }

        let importer = match self.registry.resolve(path) {
            Some(importer) => importer.clone(),
            None => return Ok(()),
        };

        let digest = match forced_digest {
            Some(digest) => digest,
            None => storage.content_digest(asset_id),
        };

        if !options.force_reimport {
            if let Some((last_digest, last_version)) =
                storage.last_known_digest_and_version(asset_id)
            {
                let version_matches =
                    options.skip_version_check || last_version == importer.version();
                if last_digest == digest && version_matches {
                    // Import-equivalent, nothing to do
                    return Ok(());
                }
            }
        }

        self.queue.enqueue(RefreshQueueEntry {
            asset: asset_id,
            stage: importer.stage(),
            substage: importer.substage_key(path),
            digest,
            forced_digest,
            options,
            importer_id: importer.importer_id(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Drop an asset from the batch and tombstone its id for the rest of the
    /// process lifetime. Returns whether a queued entry was removed.
    pub fn mark_deleted(
        &mut self,
        asset_id: AssetId,
    ) -> bool {
        self.tombstones.insert(asset_id);
        if self.queue.contains(asset_id) {
            self.queue.remove(asset_id)
        } else {
            false
        }
    }

    /// The full-repository sweep driven by a target change. Re-evaluates
    /// every asset against the new configuration and marks this batch as
    /// whole-repository scope, so the persisted target record is updated on
    /// commit. Returns false (and stages nothing) when the last recorded
    /// target already covers the requested configuration.
    #[profiling::function]
    pub fn refresh_for_target<'a, I: IntoIterator<Item = (AssetId, &'a Path)>>(
        &mut self,
        storage: &dyn AssetStorage,
        assets: I,
        config: TargetConfig,
    ) -> PipelineResult<bool> {
        if self.state != SessionState::Editing {
            Err("refresh_for_target is only valid between begin_editing and end_editing")?;
        }

        if !self
            .target_state
            .needs_full_rescan(config.selection, config.prefer_compressed)
        {
            return Ok(false);
        }

        for (asset_id, path) in assets {
            if self.tombstones.contains(&asset_id) {
                continue;
            }

            let importer = match self.registry.resolve(path) {
                Some(importer) => importer.clone(),
                None => continue,
            };

            let digest = storage.content_digest(asset_id);
            let stale = match storage.last_known_digest_and_version(asset_id) {
                Some((last_digest, last_version)) => {
                    last_digest != digest
                        || last_version != importer.version()
                        || importer.needs_reimport(asset_id, &config)
                }
                None => true,
            };

            if stale {
                self.queue.enqueue(RefreshQueueEntry {
                    asset: asset_id,
                    stage: importer.stage(),
                    substage: importer.substage_key(path),
                    digest,
                    forced_digest: None,
                    options: ImportOptionFlags::NONE,
                    importer_id: importer.importer_id(),
                    path: path.to_path_buf(),
                });
            }
        }

        self.pending_target = Some(config);
        Ok(true)
    }

    /// Drain the queue in order, importing each entry. Importer errors are
    /// collected and the batch continues - one bad asset never blocks the
    /// rest. Cancellation is polled between entries; an in-flight import is
    /// never interrupted.
    #[profiling::function]
    pub fn end_editing(
        &mut self,
        storage: &mut dyn AssetStorage,
        cancel_policy: CancelPolicy,
        cancel: &CancelToken,
    ) -> PipelineResult<OperationStatus> {
        if self.state != SessionState::Editing {
            Err("end_editing called without a matching begin_editing")?;
        }

        self.state = SessionState::Processing;
        self.processed_count = 0;

        let mut log_data = ImportLogData::default();
        let mut failures = Vec::default();
        let total_jobs = self.queue.len();
        let mut cancelled = false;

        self.queue.begin_draining();
        loop {
            if cancel_policy.allow_cancel && cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let entry = match self.queue.pop_next() {
                Some(entry) => entry,
                None => break,
            };

            let importer = match self.registry.importer(entry.importer_id) {
                Some(importer) => importer.clone(),
                None => {
                    // An importer disappearing mid-batch is a per-asset
                    // failure, not a batch abort
                    let error =
                        ImportError(format!("importer {:?} is not registered", entry.importer_id));
                    log_data.log_events.push(ImportLogEvent {
                        path: entry.path.clone(),
                        asset_id: Some(entry.asset),
                        level: LogEventLevel::Error,
                        message: error.0.clone(),
                    });
                    failures.push(ImportFailure {
                        asset_id: entry.asset,
                        path: entry.path,
                        error,
                    });
                    self.processed_count += 1;
                    continue;
                }
            };

            let effective_digest = entry.forced_digest.unwrap_or(entry.digest);
            let import_result = {
                profiling::scope!("Importer::import");
                let context = ImportContext::new(
                    entry.asset,
                    &entry.path,
                    effective_digest,
                    entry.options,
                    self.pending_target.as_ref(),
                    &mut log_data.log_events,
                );
                importer.import(context)
            };

            match import_result {
                Ok(_) => {
                    storage.record_digest_and_version(
                        entry.asset,
                        effective_digest,
                        importer.version(),
                    );
                }
                Err(error) => {
                    log::error!("Import of {:?} failed: {}", entry.path, error);
                    log_data.log_events.push(ImportLogEvent {
                        path: entry.path.clone(),
                        asset_id: Some(entry.asset),
                        level: LogEventLevel::Error,
                        message: error.0.clone(),
                    });
                    failures.push(ImportFailure {
                        asset_id: entry.asset,
                        path: entry.path,
                        error,
                    });
                }
            }

            self.processed_count += 1;
            log::debug!("Import jobs: {}/{}", self.processed_count, total_jobs);
        }

        if cancelled {
            if cancel_policy.clear_queue_on_cancel {
                // Unprocessed assets keep their stale recorded digests and
                // show up dirty in the next session
                self.queue.clear();
                self.state = SessionState::RolledBack;
            } else {
                // Already-applied results stay committed, the remainder
                // stays staged for the next batch
                self.queue.suspend_draining();
                self.state = SessionState::Committed;
            }
            self.pending_target = None;
            self.finish_log(log_data);
            self.state = SessionState::Idle;
            return Ok(OperationStatus::UserCancelled);
        }

        if let Some(config) = self.pending_target.take() {
            if let Err(e) = self.target_state.record(
                config.selection,
                config.color_remap,
                config.prefer_compressed,
            ) {
                log::error!("Failed to persist imported-target state: {}", e);
                self.finish_log(log_data);
                self.state = SessionState::Idle;
                return Err(e);
            }
        }

        self.state = SessionState::Committed;
        log::info!(
            "Import batch complete: {} processed, {} failed",
            self.processed_count,
            failures.len()
        );
        self.finish_log(log_data);
        self.state = SessionState::Idle;
        Ok(OperationStatus::Performed { failures })
    }

    fn finish_log(
        &mut self,
        mut log_data: ImportLogData,
    ) {
        log_data.end_instant = Some(std::time::Instant::now());
        log_data.end_time = Some(std::time::SystemTime::now());
        self.last_import_log = Some(Arc::new(log_data));
    }
}
