use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Yes/no question put to the user, typically as a modal.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConfirmOperation {
    pub message: String,
}

impl Operation for ConfirmOperation {
    /// `true` when the user accepted.
    type Output = bool;
}

pub struct Confirm<E> {
    context: CapabilityContext<ConfirmOperation, E>,
}

impl<Ev> Capability<Ev> for Confirm<Ev> {
    type Operation = ConfirmOperation;
    type MappedSelf<MappedEv> = Confirm<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Confirm::new(self.context.map_event(f))
    }
}

impl<E> Confirm<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<ConfirmOperation, E>) -> Self {
        Self { context }
    }

    /// Asks `message` and turns the answer into an event.
    pub fn ask<F>(&self, message: impl Into<String>, callback: F)
    where
        F: FnOnce(bool) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        let operation = ConfirmOperation {
            message: message.into(),
        };
        self.context.spawn(async move {
            let answer = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(answer));
        });
    }
}
