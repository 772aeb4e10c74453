use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Client-side route transition, performed by the shell's router.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NavigateOperation {
    pub path: String,
}

impl Operation for NavigateOperation {
    type Output = ();
}

pub struct Navigate<E> {
    context: CapabilityContext<NavigateOperation, E>,
}

impl<Ev> Capability<Ev> for Navigate<Ev> {
    type Operation = NavigateOperation;
    type MappedSelf<MappedEv> = Navigate<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Navigate::new(self.context.map_event(f))
    }
}

impl<E> Navigate<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<NavigateOperation, E>) -> Self {
        Self { context }
    }

    /// Fire-and-forget; the shell answers with nothing.
    pub fn to(&self, path: impl Into<String>) {
        let ctx = self.context.clone();
        let operation = NavigateOperation { path: path.into() };
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}
