//! Routes platform events to the reactions bound to them.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use nagarsur_types::PlatformEvent;

use crate::context::ReactionContext;
use crate::reactions::{Binding, Reaction, TriggerInput};
use crate::trigger::{PatternError, Trigger};

enum Route {
    Database(Trigger),
    AccountCreated,
}

pub struct Runtime {
    ctx: Arc<ReactionContext>,
    routes: Vec<(Reaction, Route)>,
}

impl Runtime {
    pub fn new(ctx: ReactionContext) -> Result<Self, PatternError> {
        let routes = Reaction::ALL
            .into_iter()
            .map(|reaction| {
                let route = match reaction.binding() {
                    Binding::Database { pattern, kind } => Route::Database(Trigger::new(pattern, kind)?),
                    Binding::AccountCreated => Route::AccountCreated,
                };
                Ok((reaction, route))
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        Ok(Self {
            ctx: Arc::new(ctx),
            routes,
        })
    }

    /// Every reaction the event fires, with the input it is invoked with.
    pub fn route(&self, event: &PlatformEvent) -> Vec<(Reaction, TriggerInput)> {
        let mut fired = Vec::new();
        for (reaction, route) in &self.routes {
            match (route, event) {
                (Route::Database(trigger), PlatformEvent::Data(change)) => {
                    for c in trigger.fire(change) {
                        fired.push((*reaction, TriggerInput::Change(c)));
                    }
                }
                (Route::AccountCreated, PlatformEvent::AccountCreated(record)) => {
                    fired.push((*reaction, TriggerInput::Account(record.clone())));
                }
                _ => {}
            }
        }
        fired
    }

    /// Start every reaction the event fires. Invocations run concurrently
    /// and independently; a panic in one is logged and goes no further.
    pub fn dispatch(&self, event: &PlatformEvent) -> Vec<tokio::task::JoinHandle<()>> {
        self.route(event)
            .into_iter()
            .map(|(reaction, input)| {
                let ctx = self.ctx.clone();
                tokio::spawn(async move {
                    let run = AssertUnwindSafe(reaction.invoke(&ctx, &input)).catch_unwind();
                    if run.await.is_err() {
                        error!("Reaction {} panicked", reaction);
                    }
                })
            })
            .collect()
    }

    /// Consume the change feed until it closes. Events queue up while the
    /// runtime is busy; none are skipped.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<PlatformEvent>) {
        info!("Reaction runtime started with {} bindings", self.routes.len());
        while let Some(event) = events.recv().await {
            let handles = self.dispatch(&event);
            if !handles.is_empty() {
                debug!("Dispatched {} reactions", handles.len());
            }
        }
        info!("Change feed closed, reaction runtime stopped");
    }
}
