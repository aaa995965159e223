use freshen_base::AssetId;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Copy, Clone)]
pub enum LogEventLevel {
    Warning,
    Error,
    FatalError,
}

#[derive(Debug)]
pub struct ImportLogEvent {
    pub path: PathBuf,
    pub asset_id: Option<AssetId>,
    pub level: LogEventLevel,
    pub message: String,
}

/// Everything that was logged while one batch of imports ran. One of these is
/// produced per end_editing() call that reached the processing stage.
pub struct ImportLogData {
    pub(crate) id: Uuid,
    pub(crate) start_instant: std::time::Instant,
    pub(crate) end_instant: Option<std::time::Instant>,
    pub(crate) start_time: std::time::SystemTime,
    pub(crate) end_time: Option<std::time::SystemTime>,
    pub log_events: Vec<ImportLogEvent>,
}

impl ImportLogData {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn log_events(&self) -> &[ImportLogEvent] {
        &self.log_events
    }

    pub fn duration(&self) -> Option<std::time::Duration> {
        self.end_instant
            .map(|end_instant| end_instant - self.start_instant)
    }

    pub fn start_time(&self) -> std::time::SystemTime {
        self.start_time
    }

    pub fn end_time(&self) -> Option<std::time::SystemTime> {
        self.end_time
    }
}

impl Default for ImportLogData {
    fn default() -> Self {
        ImportLogData {
            id: Uuid::new_v4(),
            start_instant: std::time::Instant::now(),
            end_instant: None,
            start_time: std::time::SystemTime::now(),
            end_time: None,
            log_events: vec![],
        }
    }
}
