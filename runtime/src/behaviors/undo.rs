//! Undo-scope (transactional) behavior.

use async_trait::async_trait;
use relay_core::{Behavior, CapabilityTag, DispatchResult, Inner, Request, RequestContext};
use std::sync::Arc;

/// Hook point for transactional/undo bracketing around a handler's
/// mutation.
///
/// The concrete scope (an undo manager, a storage transaction) is a
/// collaborator; this trait only fixes the bracketing protocol: `begin`
/// before the handler, then exactly one of `commit` (handler succeeded) or
/// `rollback` (handler failed).
pub trait UndoScope: Send + Sync {
    /// Open a scope for the mutation about to run.
    fn begin(&self, ctx: &RequestContext);

    /// Close the scope after a successful mutation.
    fn commit(&self, ctx: &RequestContext);

    /// Discard the scope after a failed mutation.
    fn rollback(&self, ctx: &RequestContext);
}

/// Wraps handlers tagged [`CapabilityTag::Undoable`] in an [`UndoScope`].
///
/// Registered first so it runs innermost: the scope brackets only the
/// handler's actual mutation, never unrelated cross-cutting work. Untagged
/// handlers pass through without a scope.
pub struct UndoScopeBehavior {
    scope: Arc<dyn UndoScope>,
}

impl UndoScopeBehavior {
    /// Create the behavior around an undo scope.
    #[must_use]
    pub fn new(scope: Arc<dyn UndoScope>) -> Self {
        Self { scope }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for UndoScopeBehavior {
    fn name(&self) -> &'static str {
        "undo-scope"
    }

    async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
        next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response> {
        if !next.capabilities().contains(&CapabilityTag::Undoable) {
            return next.call(request, ctx).await;
        }

        self.scope.begin(ctx);
        let result = next.call(request, ctx).await;
        match &result {
            Ok(_) => self.scope.commit(ctx),
            Err(err) => {
                tracing::debug!(
                    request = R::name(),
                    correlation_id = %ctx.correlation_id(),
                    error = %err,
                    "rolling back undo scope"
                );
                self.scope.rollback(ctx);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{CapabilitySet, DispatchError, Handler, compose};
    use std::sync::Mutex;

    struct Mutate {
        fail: bool,
    }

    impl Request for Mutate {
        type Response = ();

        fn name() -> &'static str {
            "Mutate"
        }
    }

    struct MutateHandler;

    #[async_trait]
    impl Handler<Mutate> for MutateHandler {
        async fn handle(&self, request: Mutate, _ctx: &RequestContext) -> DispatchResult<()> {
            if request.fail {
                Err(DispatchError::Validation {
                    reason: "bad mutation".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct RecordingScope {
        calls: Mutex<Vec<&'static str>>,
    }

    impl UndoScope for RecordingScope {
        fn begin(&self, _ctx: &RequestContext) {
            self.calls.lock().unwrap().push("begin");
        }

        fn commit(&self, _ctx: &RequestContext) {
            self.calls.lock().unwrap().push("commit");
        }

        fn rollback(&self, _ctx: &RequestContext) {
            self.calls.lock().unwrap().push("rollback");
        }
    }

    fn chain(
        scope: &Arc<RecordingScope>,
        tags: CapabilitySet,
    ) -> relay_core::ComposedHandler<Mutate> {
        compose(
            Arc::new(MutateHandler),
            tags,
            vec![Arc::new(UndoScopeBehavior::new(
                Arc::clone(scope) as Arc<dyn UndoScope>
            ))],
        )
    }

    #[tokio::test]
    async fn commits_after_a_successful_mutation() {
        let scope = Arc::new(RecordingScope::default());
        let chain = chain(
            &scope,
            CapabilitySet::new().with(CapabilityTag::Undoable),
        );

        chain
            .handle(Mutate { fail: false }, &RequestContext::new())
            .await
            .unwrap();
        assert_eq!(*scope.calls.lock().unwrap(), vec!["begin", "commit"]);
    }

    #[tokio::test]
    async fn rolls_back_after_a_failed_mutation() {
        let scope = Arc::new(RecordingScope::default());
        let chain = chain(
            &scope,
            CapabilitySet::new().with(CapabilityTag::Undoable),
        );

        let err = chain
            .handle(Mutate { fail: true }, &RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation { .. }));
        assert_eq!(*scope.calls.lock().unwrap(), vec!["begin", "rollback"]);
    }

    #[tokio::test]
    async fn untagged_handlers_run_without_a_scope() {
        let scope = Arc::new(RecordingScope::default());
        let chain = chain(&scope, CapabilitySet::new());

        chain
            .handle(Mutate { fail: false }, &RequestContext::new())
            .await
            .unwrap();
        assert!(scope.calls.lock().unwrap().is_empty());
    }
}
