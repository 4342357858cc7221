//! Handler-state plumbing.

/// Implement `FromRef<AppState>` for each `Type => field` pair so handlers
/// can extract just the piece of state they use.
///
/// ```ignore
/// impl_from_ref! {
///     StatsCache => cache,
///     Instant => start_time,
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($($type:ty => $field:ident),+ $(,)?) => {
        $(
            impl axum::extract::FromRef<$crate::state::AppState> for $type {
                fn from_ref(state: &$crate::state::AppState) -> Self {
                    state.$field.clone()
                }
            }
        )+
    };
}
