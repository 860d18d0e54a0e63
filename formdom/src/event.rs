use crate::NodeId;

/// Host-level notifications a document raises towards whoever is bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomEvent {
    /// A form control's value or checked state was committed by the user.
    Change { target: NodeId },
    /// A form was asked to submit.
    Submit { form: NodeId },
    /// The subtree below a form changed structurally (nodes added or removed).
    Mutated { form: NodeId },
}

impl DomEvent {
    /// The node the event is addressed to.
    pub fn target(&self) -> NodeId {
        match self {
            Self::Change { target } => *target,
            Self::Submit { form } | Self::Mutated { form } => *form,
        }
    }
}
