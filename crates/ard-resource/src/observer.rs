/// Answer of an observer to a reload that is about to be applied.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ReloadDecision {
    #[default]
    Proceed,
    Cancel,
}

/// Gets told about reloads of a resource. Any observer can veto a reload before the live scene
/// is touched.
pub trait ReloadObserver: Send {
    /// Called before a pending document is applied.
    fn reload_begin(&mut self) -> ReloadDecision {
        ReloadDecision::Proceed
    }

    /// Called once the reload is over. `applied` is `false` if the reload was cancelled.
    fn reload_end(&mut self, _applied: bool) {}
}
