use crate::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize)]
pub struct FreshenProjectConfigurationJson {
    pub asset_source_paths: Vec<String>,
    pub target_state_file_path: String,
}

#[derive(Debug, Clone)]
pub struct FreshenProjectConfiguration {
    // Directories the storage collaborator scans for source assets
    pub asset_source_paths: Vec<PathBuf>,

    // Path to the persisted imported-target record. Unlike the source paths,
    // this is a path to a FILE
    pub target_state_file_path: PathBuf,
}

impl FreshenProjectConfiguration {
    pub fn unverified_absolute_path(
        root_path: &Path,
        json_path: &str,
    ) -> PathBuf {
        if Path::new(json_path).is_absolute() {
            PathBuf::from(json_path)
        } else {
            root_path.join(json_path)
        }
    }

    // root_path is the path the json file is in, json_path is the string in
    // json that is meant to be parsed/converted to a canonicalized path
    pub fn parse_dir_path(
        root_path: &Path,
        json_path: &str,
    ) -> PipelineResult<PathBuf> {
        // If it's not an absolute path, join it onto the path containing the project file
        let joined_path = Self::unverified_absolute_path(root_path, json_path);

        // Create the dir (and its parent dirs) if it doesn't exist
        if !joined_path.exists() {
            std::fs::create_dir_all(&joined_path)?;
        }

        // Canonicalize the path
        Ok(dunce::canonicalize(&joined_path)?)
    }

    pub fn read_from_path(path: &Path) -> PipelineResult<Self> {
        let root_path = dunce::canonicalize(
            path.parent()
                .ok_or("Parent of project file path could not be found")?,
        )?;
        let file_contents = std::fs::read_to_string(path)?;
        let project_file: FreshenProjectConfigurationJson = serde_json::from_str(&file_contents)?;

        let mut asset_source_paths = Vec::default();
        for path in &project_file.asset_source_paths {
            asset_source_paths.push(Self::parse_dir_path(&root_path, path)?);
        }

        // The target state file is created lazily on first commit, so it is
        // not canonicalized or required to exist here
        let target_state_file_path =
            Self::unverified_absolute_path(&root_path, &project_file.target_state_file_path);

        Ok(FreshenProjectConfiguration {
            asset_source_paths,
            target_state_file_path,
        })
    }

    pub fn locate_project_file(search_location: &Path) -> PipelineResult<Self> {
        let mut path = Some(search_location.to_path_buf());
        while let Some(p) = path {
            let joined_path = p.join("freshen_project.json");
            if joined_path.exists() {
                log::info!("Using project configuration at {:?}", joined_path);
                return Self::read_from_path(&joined_path);
            }

            path = p.parent().map(|x| x.to_path_buf());
        }

        Err(PipelineError::from(format!(
            "freshen_project.json could not be located at {:?} or in any of its parent directories",
            search_location
        )))
    }
}
