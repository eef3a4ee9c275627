//! Structural change observation.
//!
//! Hosts report controls entering and leaving the container through a
//! [`ChangeObserver`]. Records are queued on the engine's message channel and
//! handled on the next [`pump`](crate::BindingSet::pump), so a burst of
//! attach/detach calls made within one tick is processed as a single ordered
//! batch.

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;

use crate::binding::ControlSignal;
use crate::control::ControlRef;

/// One structural change.
#[derive(Clone)]
pub enum MutationRecord {
    Added(ControlRef),
    Removed(ControlRef),
}

impl fmt::Debug for MutationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added(control) => write!(f, "Added({})", control.id()),
            Self::Removed(control) => write!(f, "Removed({})", control.id()),
        }
    }
}

/// Ordered records delivered together.
pub type MutationBatch = Vec<MutationRecord>;

/// Everything that reaches the engine asynchronously.
pub(crate) enum EngineMessage {
    Signal(ControlSignal),
    Mutation(MutationRecord),
}

/// Sender half handed to hosts and [`StructureChangeSource`]s.
#[derive(Clone)]
pub struct ChangeObserver {
    sender: mpsc::UnboundedSender<EngineMessage>,
}

impl ChangeObserver {
    pub(crate) fn new(sender: mpsc::UnboundedSender<EngineMessage>) -> Self {
        Self { sender }
    }

    /// Connect to a source; it reports its current children and every later change.
    pub fn observe(&self, source: &dyn StructureChangeSource) {
        source.connect(self.clone());
    }

    pub fn added(&self, control: ControlRef) {
        self.record(MutationRecord::Added(control));
    }

    pub fn removed(&self, control: ControlRef) {
        self.record(MutationRecord::Removed(control));
    }

    pub fn record(&self, record: MutationRecord) {
        trace!(?record, "queue mutation");
        // Send only fails once the engine is gone, and then nobody is listening.
        let _ = self.sender.send(EngineMessage::Mutation(record));
    }

    /// False once the owning engine has been dropped.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// A container whose structure can be watched.
///
/// `connect` must report controls already present as [`MutationRecord::Added`]
/// and keep reporting additions and removals, including those inside nested
/// or encapsulated subtrees, until `disconnect`.
pub trait StructureChangeSource {
    fn connect(&self, observer: ChangeObserver);

    fn disconnect(&self);
}
