//! §4.13: the `before`/`after` acquisition hooks, modelled the way the
//! teacher driver's `pool::options` types its `after_connect` /
//! `before_acquire` / `after_release` callbacks — a boxed `Fn` returning a
//! [`BoxFuture`], since a trait object can't hold a native `async fn`.

use std::any::Any;
use std::sync::Arc;

use futures_core::future::BoxFuture;

use crate::connection::MySqlConnection;

/// Opaque state `before` hands to the matching `after` call for one
/// reservation. `()` if no `before` hook is configured.
pub type HookContext = Box<dyn Any + Send>;

pub(super) type BeforeFn = Arc<
    dyn for<'c> Fn(&'c mut MySqlConnection) -> BoxFuture<'c, crate::Result<HookContext>>
        + Send
        + Sync,
>;

pub(super) type AfterFn = Arc<
    dyn for<'c> Fn(HookContext, &'c mut MySqlConnection) -> BoxFuture<'c, crate::Result<()>>
        + Send
        + Sync,
>;

#[derive(Clone, Default)]
pub struct Hooks {
    pub(super) before: Option<BeforeFn>,
    pub(super) after: Option<AfterFn>,
}

impl Hooks {
    pub fn before<F>(mut self, hook: F) -> Self
    where
        for<'c> F: Fn(&'c mut MySqlConnection) -> BoxFuture<'c, crate::Result<HookContext>>
            + Send
            + Sync
            + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn after<F>(mut self, hook: F) -> Self
    where
        for<'c> F: Fn(HookContext, &'c mut MySqlConnection) -> BoxFuture<'c, crate::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}
