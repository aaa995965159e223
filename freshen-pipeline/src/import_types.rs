use crate::{ImportLogEvent, LogEventLevel, TargetConfig};
use freshen_base::{AssetId, ContentDigest};
use std::cell::RefCell;
use std::hash::Hasher;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use type_uuid::{TypeUuid, TypeUuidDynamic};
use uuid::Uuid;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImporterId(pub Uuid);

pub trait ImporterStatic: TypeUuid {
    fn importer_id() -> ImporterId {
        ImporterId(Uuid::from_bytes(Self::UUID))
    }
}

/// Per-importer options captured with each queued entry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportOptionFlags {
    /// Queue the asset even if its digest/version pair is unchanged
    pub force_reimport: bool,
    /// Compare digests only, ignoring the recorded importer version
    pub skip_version_check: bool,
}

impl ImportOptionFlags {
    pub const NONE: ImportOptionFlags = ImportOptionFlags {
        force_reimport: false,
        skip_version_check: false,
    };
    pub const FORCE: ImportOptionFlags = ImportOptionFlags {
        force_reimport: true,
        skip_version_check: false,
    };
}

/// Raised by an importer for a single asset. Recorded against the batch and
/// surfaced in the final status, never aborts the remaining entries.
#[derive(Debug, Clone)]
pub struct ImportError(pub String);

impl std::error::Error for ImportError {}

impl core::fmt::Display for ImportError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        self.0.fmt(fmt)
    }
}

impl From<&str> for ImportError {
    fn from(str: &str) -> Self {
        ImportError(str.to_string())
    }
}

impl From<String> for ImportError {
    fn from(string: String) -> Self {
        ImportError(string)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported,
    /// The importer inspected the source and found its output still valid.
    /// The digest/version pair is recorded as imported either way.
    UpToDate,
}

#[derive(Debug, Clone)]
pub struct ImportFailure {
    pub asset_id: AssetId,
    pub path: std::path::PathBuf,
    pub error: ImportError,
}

/// What end_editing() reports back to the caller. A batch with per-asset
/// failures is still Performed - callers distinguish "ran with N failures"
/// from "the user stopped it" to decide whether a retry makes sense.
#[derive(Debug, Clone)]
pub enum OperationStatus {
    Performed { failures: Vec<ImportFailure> },
    UserCancelled,
}

impl OperationStatus {
    pub fn is_cancelled(&self) -> bool {
        match self {
            OperationStatus::UserCancelled => true,
            _ => false,
        }
    }

    pub fn failures(&self) -> &[ImportFailure] {
        match self {
            OperationStatus::Performed { failures } => failures,
            OperationStatus::UserCancelled => &[],
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CancelPolicy {
    pub allow_cancel: bool,
    /// Discard remaining queued entries when cancelled. Unprocessed assets
    /// keep their stale recorded digests and show up dirty next session.
    pub clear_queue_on_cancel: bool,
}

impl CancelPolicy {
    pub const DISALLOW: CancelPolicy = CancelPolicy {
        allow_cancel: false,
        clear_queue_on_cancel: false,
    };
    pub const ALLOW: CancelPolicy = CancelPolicy {
        allow_cancel: true,
        clear_queue_on_cancel: false,
    };
    pub const ALLOW_AND_CLEAR: CancelPolicy = CancelPolicy {
        allow_cancel: true,
        clear_queue_on_cancel: true,
    };
}

/// Level-triggered cancellation flag, polled between queue pops. Repeated
/// cancel() calls are idempotent. An in-flight import() cannot be interrupted
/// mid-call by this token.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The asset database, from the scheduler's point of view. The scheduler
/// never touches raw asset bytes - digests and recorded import pairs come
/// and go through this interface.
pub trait AssetStorage {
    /// Digest over current content + importer-visible settings. Implementations
    /// are expected to cache this until the asset is written to.
    fn content_digest(
        &self,
        asset_id: AssetId,
    ) -> ContentDigest;

    /// The (digest, importer version) pair recorded the last time this asset
    /// was successfully imported, if any.
    fn last_known_digest_and_version(
        &self,
        asset_id: AssetId,
    ) -> Option<(ContentDigest, u32)>;

    fn record_digest_and_version(
        &mut self,
        asset_id: AssetId,
        digest: ContentDigest,
        version: u32,
    );
}

/// Handed to Importer::import for a single queued asset.
#[derive(Clone)]
pub struct ImportContext<'a> {
    pub asset_id: AssetId,
    pub path: &'a Path,
    pub digest: ContentDigest,
    pub options: ImportOptionFlags,
    pub target: Option<&'a TargetConfig>,
    pub(crate) log_events: Rc<RefCell<&'a mut Vec<ImportLogEvent>>>,
}

impl<'a> ImportContext<'a> {
    pub fn new(
        asset_id: AssetId,
        path: &'a Path,
        digest: ContentDigest,
        options: ImportOptionFlags,
        target: Option<&'a TargetConfig>,
        log_events: &'a mut Vec<ImportLogEvent>,
    ) -> ImportContext<'a> {
        ImportContext {
            asset_id,
            path,
            digest,
            options,
            target,
            log_events: Rc::new(RefCell::new(log_events)),
        }
    }

    pub fn warn<T: Into<String>>(
        &self,
        message: T,
    ) {
        let mut log_events = self.log_events.borrow_mut();
        log_events.push(ImportLogEvent {
            path: self.path.to_path_buf(),
            asset_id: Some(self.asset_id),
            level: LogEventLevel::Warning,
            message: message.into(),
        });
    }

    pub fn error<T: Into<String>>(
        &self,
        message: T,
    ) {
        let mut log_events = self.log_events.borrow_mut();
        log_events.push(ImportLogEvent {
            path: self.path.to_path_buf(),
            asset_id: Some(self.asset_id),
            level: LogEventLevel::Error,
            message: message.into(),
        });
    }
}

// Interface all importers must implement
pub trait Importer: TypeUuidDynamic + Sync + Send + 'static {
    fn importer_id(&self) -> ImporterId {
        ImporterId(Uuid::from_bytes(self.uuid()))
    }

    /// Coarse ordering class. Lower stages drain first - textures/materials
    /// import before the meshes that reference their generated metadata.
    fn stage(&self) -> i32;

    /// Bumped by the importer author whenever output-affecting behavior
    /// changes. Assets recorded with an older version are stale even if
    /// their content digest is unchanged.
    fn version(&self) -> u32;

    // Used to allow the importer registry to return all importers compatible with a given filename extension
    fn supported_file_extensions(&self) -> &[&'static str];

    fn can_handle(
        &self,
        path: &Path,
    ) -> bool {
        let extension = path.extension().and_then(|x| x.to_str());
        match extension {
            Some(extension) => self
                .supported_file_extensions()
                .iter()
                .any(|x| x.eq_ignore_ascii_case(extension)),
            None => false,
        }
    }

    /// Tiebreak within a stage, derived from the asset's path so two
    /// processes queuing the same dirty set drain in the same order. Never
    /// derived from wall-clock or insertion order.
    fn substage_key(
        &self,
        path: &Path,
    ) -> u64 {
        let mut hasher = siphasher::sip::SipHasher::default();
        hasher.write(path.to_string_lossy().as_bytes());
        hasher.finish()
    }

    /// Target-aware staleness beyond the digest/version pair - switching
    /// build target can change an asset's required output format without
    /// touching its bytes.
    fn needs_reimport(
        &self,
        asset_id: AssetId,
        target: &TargetConfig,
    ) -> bool;

    fn import(
        &self,
        context: ImportContext,
    ) -> Result<ImportOutcome, ImportError>;
}
