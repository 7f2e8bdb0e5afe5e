/// A file-browser pane whose entries can be shown or hidden.
pub trait ExplorerPane: Send + Sync {
    /// Set visibility of the entry for `path`.
    ///
    /// Returns `false` when the pane has no entry for the path yet, which
    /// happens while rendering is still pending.
    fn set_hidden(&self, path: &str, hidden: bool) -> bool;
}
