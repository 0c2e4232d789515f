use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tracing::{debug, info, Instrument, Span};

use crate::admin::ReplicaAdmin;
use crate::error::AdminError;
use crate::reconciler::Effect;

/// Commits effects to the cluster. This is the only place the controller mutates anything.
pub struct Applier {
    admin: Arc<dyn ReplicaAdmin>,
    span: Span,
}

impl Applier {
    pub fn new(admin: Arc<dyn ReplicaAdmin>, span: Span) -> Self {
        Self { admin, span }
    }

    /// Rejections are returned as is; nothing was written, so the next cycle starts from
    /// whatever the cluster holds.
    pub async fn apply(&self, effect: &Effect) -> Result<(), AdminError> {
        self.apply_effect(effect).instrument(self.span.clone()).await
    }

    async fn apply_effect(&self, effect: &Effect) -> Result<(), AdminError> {
        match effect {
            Effect::NoOp => Ok(()),
            Effect::Initiate { target, config } => {
                match self.admin.initiate(target, config).await {
                    Ok(()) => {}
                    Err(AdminError::AlreadyInitialized(reason)) => {
                        debug!("{} already configured, forcing configuration ({})", target, reason);
                        self.admin.reconfigure(target, config, true).await?;
                    }
                    Err(error) => return Err(error),
                }
                info!("replica set {} initiated on {}", config, target);
                Ok(())
            }
            Effect::Reconfigure { target, config, force } => {
                self.admin.reconfigure(target, config, *force).await?;
                info!("replica set reconfigured to {} on {} (force: {})", config, target, force);
                Ok(())
            }
        }
    }
}

impl Debug for Applier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applier")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tracing::Span;

    use crate::applier::Applier;
    use crate::error::AdminError;
    use crate::reconciler::Effect;
    use crate::testkit::{addr, config, AdminCall, FakeAdmin};

    #[tokio::test]
    async fn no_op_touches_nothing() -> anyhow::Result<()> {
        let admin = Arc::new(FakeAdmin::default());
        Applier::new(admin.clone(), Span::none()).apply(&Effect::NoOp).await?;
        assert!(admin.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn initiate_falls_back_to_forced_reconfigure() -> anyhow::Result<()> {
        let admin = Arc::new(FakeAdmin::default());
        admin.fail_next_initiate(AdminError::AlreadyInitialized("already initialized".to_string()));
        let config = config(&[(0, "a"), (1, "b")], 1);
        let effect = Effect::Initiate { target: addr("a"), config: config.clone() };
        Applier::new(admin.clone(), Span::none()).apply(&effect).await?;
        assert_eq!(
            admin.calls(),
            vec![
                AdminCall::Initiate { node: addr("a"), config: config.clone() },
                AdminCall::Reconfigure { node: addr("a"), config, force: true },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn rejected_reconfigure_is_propagated() {
        let admin = Arc::new(FakeAdmin::default());
        let rejection = AdminError::Rejected { code: 103, message: "new config is rejected".to_string() };
        admin.fail_next_reconfigure(rejection.clone());
        let effect = Effect::Reconfigure { target: addr("b"), config: config(&[(1, "b")], 4), force: false };
        let result = Applier::new(admin.clone(), Span::none()).apply(&effect).await;
        assert_eq!(result, Err(rejection));
        assert_eq!(admin.calls().len(), 1);
    }

    #[tokio::test]
    async fn initiate_errors_other_than_already_initialized_are_not_retried() {
        let admin = Arc::new(FakeAdmin::default());
        admin.fail_next_initiate(AdminError::Unreachable("timeout".to_string()));
        let effect = Effect::Initiate { target: addr("a"), config: config(&[(0, "a")], 1) };
        let result = Applier::new(admin.clone(), Span::none()).apply(&effect).await;
        assert_eq!(result, Err(AdminError::Unreachable("timeout".to_string())));
        assert_eq!(admin.calls().len(), 1);
    }
}
