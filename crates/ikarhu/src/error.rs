use ikarhu_tree::ChangeTree;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObserveError {
    #[error("invalid argument: {0}")]
    Argument(String),
    /// Some keys of a patch could not be written. `applied` holds what did
    /// go through (already delivered to listeners); applying `rollback`
    /// restores the rejected keys' previous values.
    #[error("{} key(s) failed to apply: {}", .errors.len(), .errors.join("; "))]
    PatchPartialFailure {
        errors: Vec<String>,
        rollback: ChangeTree,
        applied: ChangeTree,
    },
}
