pub use freshen_base::*;

mod pipeline_error;
pub use pipeline_error::*;

mod log_events;
pub use log_events::*;

mod import_types;
pub use import_types::*;

mod importer_registry;
pub use importer_registry::{ImporterRegistry, ImporterRegistryBuilder};

mod refresh_queue;
pub use refresh_queue::{QueueState, RefreshQueue, RefreshQueueEntry};

mod target_state;
pub use target_state::{
    ImportTargetState, RemapKind, TargetConfig, TargetPlatform, TargetSelection,
};

mod import_session;
pub use import_session::{ImportSession, SessionState};

mod transaction;
pub use transaction::AssetEditingTransaction;

mod project;
pub use project::FreshenProjectConfiguration;
