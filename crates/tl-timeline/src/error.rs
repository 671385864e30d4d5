use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// A module type was looked up before being registered. Loud by design;
    /// callers of the registry assume presence.
    #[error("module `{0}` is not registered")]
    ModuleNotFound(&'static str),
}
