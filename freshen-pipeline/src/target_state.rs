use crate::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build platforms output can be produced for. Codes are part of the
/// persisted target record and must not be renumbered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetPlatform {
    Windows,
    MacOS,
    Linux,
    Ios,
    Android,
    Web,
}

impl TargetPlatform {
    pub fn as_code(self) -> i32 {
        match self {
            TargetPlatform::Windows => 1,
            TargetPlatform::MacOS => 2,
            TargetPlatform::Linux => 3,
            TargetPlatform::Ios => 4,
            TargetPlatform::Android => 5,
            TargetPlatform::Web => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<TargetPlatform> {
        match code {
            1 => Some(TargetPlatform::Windows),
            2 => Some(TargetPlatform::MacOS),
            3 => Some(TargetPlatform::Linux),
            4 => Some(TargetPlatform::Ios),
            5 => Some(TargetPlatform::Android),
            6 => Some(TargetPlatform::Web),
            _ => None,
        }
    }
}

/// Color-space pre-conversion some platforms require before compression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RemapKind {
    SrgbToLinear,
    LinearToSrgb,
}

impl RemapKind {
    pub fn as_code(self) -> i32 {
        match self {
            RemapKind::SrgbToLinear => 1,
            RemapKind::LinearToSrgb => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<RemapKind> {
        match code {
            1 => Some(RemapKind::SrgbToLinear),
            2 => Some(RemapKind::LinearToSrgb),
            _ => None,
        }
    }
}

/// The platform + sub-target pair output is being produced for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetSelection {
    pub platform: TargetPlatform,
    pub subtarget: i32,
}

/// Everything an importer may consult when deciding target-dependent
/// staleness.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TargetConfig {
    pub selection: TargetSelection,
    pub color_remap: Option<RemapKind>,
    pub prefer_compressed: bool,
}

/// Which build-target configuration this repository was last fully imported
/// for. Loaded once at startup, mutated only when a whole-repository batch
/// commits, written through synchronously so a crash mid-batch leaves the
/// previous consistent record on disk.
pub struct ImportTargetState {
    file_path: PathBuf,
    selection: Option<TargetSelection>,
    color_remap: Option<RemapKind>,
    // Sticky user preference. Not part of the on-disk record, so a fresh
    // process that prefers compressed output rescans once - the safe default.
    prefer_compressed: bool,
}

impl ImportTargetState {
    /// Read the persisted record. An absent file or unparseable contents mean
    /// "no prior state" - any target then needs a full rescan.
    pub fn load(file_path: &Path) -> Self {
        let mut state = ImportTargetState {
            file_path: file_path.to_path_buf(),
            selection: None,
            color_remap: None,
            prefer_compressed: false,
        };

        let contents = match std::fs::read_to_string(file_path) {
            Ok(contents) => contents,
            Err(_) => return state,
        };

        match Self::parse_record(&contents) {
            Some((selection, color_remap)) => {
                state.selection = Some(selection);
                state.color_remap = color_remap;
            }
            None => {
                log::warn!(
                    "Imported-target record at {:?} could not be parsed, treating as no prior state",
                    file_path
                );
            }
        }

        state
    }

    // Record format: platform_id;subtarget_id;remap_code
    fn parse_record(contents: &str) -> Option<(TargetSelection, Option<RemapKind>)> {
        let mut fields = contents.trim().split(';');
        let platform_code = fields.next()?.parse::<i32>().ok()?;
        let subtarget = fields.next()?.parse::<i32>().ok()?;
        let remap_code = fields.next()?.parse::<i32>().ok()?;
        if fields.next().is_some() {
            return None;
        }

        let platform = TargetPlatform::from_code(platform_code)?;
        let color_remap = if remap_code == 0 {
            None
        } else {
            Some(RemapKind::from_code(remap_code)?)
        };

        Some((
            TargetSelection {
                platform,
                subtarget,
            },
            color_remap,
        ))
    }

    pub fn selection(&self) -> Option<TargetSelection> {
        self.selection
    }

    pub fn color_remap(&self) -> Option<RemapKind> {
        self.color_remap
    }

    pub fn prefer_compressed(&self) -> bool {
        self.prefer_compressed
    }

    /// True when per-file change detection is not enough and every asset's
    /// cached decision must be re-evaluated: the target changed, or compressed
    /// output is newly preferred.
    pub fn needs_full_rescan(
        &self,
        current: TargetSelection,
        current_prefer_compressed: bool,
    ) -> bool {
        if self.selection != Some(current) {
            return true;
        }

        current_prefer_compressed && !self.prefer_compressed
    }

    /// Called only from the commit path of a whole-repository batch. The
    /// record is on disk before this returns.
    pub fn record(
        &mut self,
        selection: TargetSelection,
        color_remap: Option<RemapKind>,
        prefer_compressed: bool,
    ) -> PipelineResult<()> {
        let remap_code = color_remap.map(|x| x.as_code()).unwrap_or(0);
        let record = format!(
            "{};{};{}",
            selection.platform.as_code(),
            selection.subtarget,
            remap_code
        );

        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PipelineError::TargetStatePersist(Arc::new(e)))?;
        }

        std::fs::write(&self.file_path, record)
            .map_err(|e| PipelineError::TargetStatePersist(Arc::new(e)))?;

        self.selection = Some(selection);
        self.color_remap = color_remap;
        self.prefer_compressed = prefer_compressed;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn windows_target() -> TargetSelection {
        TargetSelection {
            platform: TargetPlatform::Windows,
            subtarget: 0,
        }
    }

    #[test]
    fn parse_record_roundtrip() {
        let parsed = ImportTargetState::parse_record("1;0;0").unwrap();
        assert_eq!(parsed.0, windows_target());
        assert_eq!(parsed.1, None);

        let parsed = ImportTargetState::parse_record("5;2;1").unwrap();
        assert_eq!(parsed.0.platform, TargetPlatform::Android);
        assert_eq!(parsed.0.subtarget, 2);
        assert_eq!(parsed.1, Some(RemapKind::SrgbToLinear));
    }

    #[test]
    fn parse_record_rejects_garbage() {
        assert!(ImportTargetState::parse_record("").is_none());
        assert!(ImportTargetState::parse_record("1;0").is_none());
        assert!(ImportTargetState::parse_record("1;0;0;9").is_none());
        assert!(ImportTargetState::parse_record("99;0;0").is_none());
        assert!(ImportTargetState::parse_record("not;a;record").is_none());
        assert!(ImportTargetState::parse_record("\u{0}\u{1}\u{2}").is_none());
    }

    #[test]
    fn rescan_truth_table() {
        let mut state = ImportTargetState {
            file_path: Default::default(),
            selection: Some(windows_target()),
            color_remap: None,
            prefer_compressed: false,
        };

        let other = TargetSelection {
            platform: TargetPlatform::Android,
            subtarget: 0,
        };

        // same selection x same preference
        assert!(!state.needs_full_rescan(windows_target(), false));
        // same selection x newly-preferred compression
        assert!(state.needs_full_rescan(windows_target(), true));
        // different selection x same preference
        assert!(state.needs_full_rescan(other, false));
        // different selection x newly-preferred compression
        assert!(state.needs_full_rescan(other, true));

        // Turning compression *off* is not a rescan trigger
        state.prefer_compressed = true;
        assert!(!state.needs_full_rescan(windows_target(), false));
    }

    #[test]
    fn no_prior_state_always_rescans() {
        let state = ImportTargetState {
            file_path: Default::default(),
            selection: None,
            color_remap: None,
            prefer_compressed: false,
        };
        assert!(state.needs_full_rescan(windows_target(), false));
    }
}
