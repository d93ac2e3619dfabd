use ecow::EcoString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a single block instance within a workspace.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub(crate) struct BlockId(EcoString);

impl BlockId {
    pub(crate) fn new(id: impl Into<EcoString>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ProcKind {
    /// Statement procedure, `procedures_defnoreturn`.
    Void,
    /// Reporter procedure, `procedures_defreturn`.
    Return,
}

impl ProcKind {
    pub(crate) fn from_def_opcode(opcode: &str) -> Option<Self> {
        match opcode {
            "procedures_defnoreturn" => Some(Self::Void),
            "procedures_defreturn" => Some(Self::Return),
            _ => None,
        }
    }

    pub(crate) fn from_call_opcode(opcode: &str) -> Option<Self> {
        match opcode {
            "procedures_callnoreturn" => Some(Self::Void),
            "procedures_callreturn" => Some(Self::Return),
            _ => None,
        }
    }
}

/// The definition block a procedure-name field lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProcedureBlock {
    pub id: BlockId,
    pub kind: ProcKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ProcEntry {
    pub name: EcoString,
    pub kind: ProcKind,
}
