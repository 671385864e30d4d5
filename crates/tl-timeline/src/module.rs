use crate::Timeline;

/// A pluggable controller adding one cohesive capability to a timeline.
///
/// Modules are constructed standalone, registered with
/// [`Timeline::register_module`], and detached when the timeline is
/// destroyed or the module is re-registered elsewhere. Calls into a module
/// before it is attached are defensive no-ops, never panics.
pub trait TimelineModule: Send + Sync + 'static {
    /// Binds the module to a timeline. Re-attaching implies a prior
    /// [`detach`](Self::detach).
    fn attach(&self, timeline: &Timeline);

    /// Releases every subscription taken in [`attach`](Self::attach).
    fn detach(&self) {}
}
