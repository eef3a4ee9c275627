//! Message handling: control signals and structural changes.

use std::future::Future;
use std::rc::Rc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::BindingSet;
use crate::binding::{ControlSignal, SignalKind};
use crate::control::descendants_and_self;
use crate::observer::{ChangeObserver, EngineMessage, MutationBatch, MutationRecord, StructureChangeSource};

impl BindingSet {
    /// Sender for hosts that report structure changes themselves.
    pub fn observer(&self) -> ChangeObserver {
        ChangeObserver::new(self.sender.clone())
    }

    /// Watch `source`. Its current children are bound on the next pump.
    pub fn observe(&self, source: &dyn StructureChangeSource) {
        self.observer().observe(source);
    }

    /// Handle every queued message, including those queued while handling.
    ///
    /// Consecutive structure records form one batch. Returns the number of
    /// messages handled; zero while [`run`](Self::run) owns the queue.
    pub async fn pump(&self) -> usize {
        let mut handled = 0;
        loop {
            let messages = self.drain_ready();
            if messages.is_empty() {
                return handled;
            }
            handled += messages.len();
            self.dispatch(messages).await;
        }
    }

    /// Handle messages as they arrive until `shutdown` completes.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Some(mut receiver) = self.receiver.borrow_mut().take() else {
            warn!("message loop already running");
            return;
        };
        debug!("message loop started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("message loop shutting down");
                    break;
                }
                message = receiver.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    let mut messages = vec![message];
                    drain_into(&mut receiver, &mut messages);
                    self.dispatch(messages).await;
                }
            }
        }

        *self.receiver.borrow_mut() = Some(receiver);
    }

    fn drain_ready(&self) -> Vec<EngineMessage> {
        let mut messages = Vec::new();
        if let Some(receiver) = self.receiver.borrow_mut().as_mut() {
            drain_into(receiver, &mut messages);
        }
        messages
    }

    async fn dispatch(&self, messages: Vec<EngineMessage>) {
        let mut batch: MutationBatch = Vec::new();
        for message in messages {
            match message {
                EngineMessage::Mutation(record) => batch.push(record),
                EngineMessage::Signal(signal) => {
                    if !batch.is_empty() {
                        self.apply_mutations(std::mem::take(&mut batch));
                    }
                    self.handle_signal(signal).await;
                }
            }
        }
        if !batch.is_empty() {
            self.apply_mutations(batch);
        }
    }

    /// Apply records in order; a control added and removed in the same batch ends up unbound.
    fn apply_mutations(&self, batch: MutationBatch) {
        debug!(records = batch.len(), "structure changes");
        for record in batch {
            match record {
                MutationRecord::Added(control) => {
                    for control in descendants_and_self(&control) {
                        self.add_control(&control);
                    }
                }
                MutationRecord::Removed(control) => self.remove_control(&control),
            }
        }
    }

    async fn handle_signal(&self, signal: ControlSignal) {
        let control = {
            let state = self.state.borrow();
            match state.bindings.get(&signal.control) {
                Some(binding) if binding.serial() == signal.serial => Rc::clone(binding.control()),
                _ => {
                    trace!(control = %signal.control, "signal from stale binding dropped");
                    return;
                }
            }
        };

        match signal.kind {
            SignalKind::Change { value, options } => {
                self.handle_control_value_change(&control, value, options).await;
            }
            SignalKind::Touch => {
                self.control_visited(&control).await;
            }
        }
    }
}

fn drain_into(receiver: &mut mpsc::UnboundedReceiver<EngineMessage>, out: &mut Vec<EngineMessage>) {
    while let Ok(message) = receiver.try_recv() {
        out.push(message);
    }
}
