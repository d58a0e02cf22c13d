use std::fmt;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use validator::Validate;

use crate::common::constants::DEFAULT_QUEUE_MAX_LEN;
use crate::common::file_operations::{atomic_save_json, read_json};
use crate::common::thread_name;
use crate::WORKSPACE_CONFIG_FILEPATH;

/// How the writer of an index is committed and shared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicyKind {
    /// One workspace owns the writer and commits after every changeset.
    #[default]
    Exclusive,
    /// Several logical users share the writer; the last one out closes it.
    Shared,
    /// The writer stays open; readers see uncommitted changes.
    Nrt,
}

impl fmt::Display for CommitPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitPolicyKind::Exclusive => f.write_str("exclusive"),
            CommitPolicyKind::Shared => f.write_str("shared"),
            CommitPolicyKind::Nrt => f.write_str("nrt"),
        }
    }
}

/// Configuration of one index workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Validate)]
pub struct WorkspaceConfig {
    #[builder(setter(into))]
    #[validate(length(min = 1))]
    pub index_name: String,

    /// Maximum number of changesets waiting to be applied. Submitters block beyond it.
    #[builder(default = DEFAULT_QUEUE_MAX_LEN)]
    #[serde(default = "default_queue_max_len")]
    #[validate(range(min = 1))]
    pub queue_max_len: usize,

    #[builder(default)]
    #[serde(default)]
    pub commit_policy: CommitPolicyKind,
}

fn default_queue_max_len() -> usize {
    DEFAULT_QUEUE_MAX_LEN
}

impl WorkspaceConfig {
    pub fn new<S: Into<String>>(index_name: S) -> WorkspaceConfig {
        WorkspaceConfig::builder().index_name(index_name).build()
    }

    /// Loads and validates the config stored in `directory`.
    pub fn load(directory: &Path) -> crate::Result<WorkspaceConfig> {
        let config: WorkspaceConfig = read_json(&directory.join(*WORKSPACE_CONFIG_FILEPATH))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates then stores the config in `directory`.
    pub fn save(&self, directory: &Path) -> crate::Result<()> {
        self.validate()?;
        atomic_save_json(&directory.join(*WORKSPACE_CONFIG_FILEPATH), self)?;
        info!(
            "[{}] [save] saved workspace config of '{}' in {:?}",
            thread_name(),
            self.index_name,
            directory
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::WorkspaceError;

    #[test]
    fn test_builder_defaults() {
        let config = WorkspaceConfig::new("books");
        assert_eq!(config.queue_max_len, DEFAULT_QUEUE_MAX_LEN);
        assert_eq!(config.commit_policy, CommitPolicyKind::Exclusive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: WorkspaceConfig =
            serde_json::from_str(r#"{"index_name":"books","commit_policy":"nrt"}"#).unwrap();
        assert_eq!(config.commit_policy, CommitPolicyKind::Nrt);
        assert_eq!(config.queue_max_len, DEFAULT_QUEUE_MAX_LEN);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = WorkspaceConfig::builder().index_name("").queue_max_len(0).build();
        let errors = config.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("index_name"));
        assert!(errors.field_errors().contains_key("queue_max_len"));

        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(config.save(temp_dir.path()), Err(WorkspaceError::InvalidArgument(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config = WorkspaceConfig::builder()
            .index_name("books")
            .queue_max_len(8)
            .commit_policy(CommitPolicyKind::Shared)
            .build();
        config.save(temp_dir.path()).unwrap();
        assert_eq!(WorkspaceConfig::load(temp_dir.path()).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            WorkspaceConfig::load(temp_dir.path()),
            Err(WorkspaceError::FileOperationError(_))
        ));
    }
}
