use crate::domain::AppError;

/// Port for turning an action repository into a pinned `uses:` reference.
pub trait ActionResolver {
    /// `owner/repo@<sha>` for `repo`, or [`AppError::UnknownAction`].
    fn resolve(&self, repo: &str) -> Result<String, AppError>;

    /// Digest identifying the pin set, recorded in the output header.
    fn fingerprint(&self) -> Option<String> {
        None
    }
}
