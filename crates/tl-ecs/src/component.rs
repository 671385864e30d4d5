/// A component is a piece of typed data attached at most once per entity.
///
/// Components are plain structs; defaults come from `Default` plus struct
/// update syntax at the call site. The `NAME` is the stable identity used by
/// queries and structural-change events.
pub trait Component: Clone + PartialEq + Send + Sync + 'static {
    /// Stable name referenced by queries and change events.
    const NAME: &'static str;
}

/// Implements [`Component`] for one or more types.
///
/// ```
/// #[derive(Debug, Clone, Copy, PartialEq, Default)]
/// struct Velocity {
///     dx: f64,
/// }
///
/// tl_ecs::components! {
///     Velocity => "velocity",
/// }
/// ```
#[macro_export]
macro_rules! components {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl $crate::Component for $ty {
                const NAME: &'static str = $name;
            }
        )*
    };
}
