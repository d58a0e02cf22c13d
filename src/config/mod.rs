mod workspace_config;

pub use self::workspace_config::{CommitPolicyKind, WorkspaceConfig};
