use crate::proc::{BlockId, ProcEntry, ProcKind, ProcedureBlock};
use ecow::EcoString;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// What the registry does when a second block claims a name that is
/// already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum CollisionPolicy {
    #[default]
    Reject,
    Allow,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ProcDbError {
    #[error("no procedure is registered for block `{0}`")]
    UnknownBlock(BlockId),
    #[error("block `{0}` already has a registered procedure")]
    AlreadyRegistered(BlockId),
    #[error("procedure name `{name}` is already used by block `{owner}`")]
    DuplicateName { name: EcoString, owner: BlockId },
    #[error("found no procedure named `{0}`")]
    UnknownProcedure(EcoString),
}

pub(crate) type ProcDbResult<T> = Result<T, ProcDbError>;

/// Workspace-scoped store of procedure definitions and the call blocks
/// that invoke them.
///
/// Call-sites point at the definition's block identity, not its name, so a
/// rename is observed by every caller as soon as the entry is updated.
#[derive(Debug, Default, Serialize)]
pub(crate) struct ProcedureDb {
    procedures: BTreeMap<BlockId, ProcEntry>,
    calls: BTreeMap<BlockId, BlockId>,
    #[serde(skip)]
    policy: CollisionPolicy,
}

impl ProcedureDb {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn get_procedure(&self, id: &BlockId) -> Option<&ProcEntry> {
        self.procedures.get(id)
    }

    /// First definition (in block-id order) currently called `name`.
    pub fn procedure_by_name(
        &self,
        name: &str,
    ) -> Option<(&BlockId, &ProcEntry)> {
        self.procedures
            .iter()
            .find(|(_, entry)| entry.name.as_str() == name)
    }

    pub fn names(&self, kind: ProcKind) -> Vec<&str> {
        let mut names = self
            .procedures
            .values()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    pub fn add_procedure(
        &mut self,
        name: &str,
        block: &ProcedureBlock,
    ) -> ProcDbResult<()> {
        if self.procedures.contains_key(&block.id) {
            return Err(ProcDbError::AlreadyRegistered(block.id.clone()));
        }
        self.check_collision(name, &block.id)?;
        debug!(block = %block.id, name, "adding procedure");
        self.procedures.insert(
            block.id.clone(),
            ProcEntry {
                name: name.into(),
                kind: block.kind,
            },
        );
        Ok(())
    }

    pub fn rename_procedure(
        &mut self,
        id: &BlockId,
        old_name: &str,
        new_name: &str,
    ) -> ProcDbResult<()> {
        let current = match self.procedures.get(id) {
            Some(entry) => entry.name.clone(),
            None => return Err(ProcDbError::UnknownBlock(id.clone())),
        };
        if current.as_str() != old_name {
            warn!(
                block = %id,
                stored = %current,
                requested = old_name,
                "rename requested from a name the registry does not hold"
            );
        }
        if current.as_str() == new_name {
            return Ok(());
        }
        self.check_collision(new_name, id)?;
        debug!(block = %id, from = %current, to = new_name, "renaming");
        if let Some(entry) = self.procedures.get_mut(id) {
            entry.name = new_name.into();
        }
        Ok(())
    }

    /// Removes a definition together with every call-site that invokes it.
    pub fn remove_procedure(&mut self, id: &BlockId) -> Option<ProcEntry> {
        let entry = self.procedures.remove(id)?;
        let before = self.calls.len();
        self.calls.retain(|_, callee| *callee != *id);
        debug!(
            block = %id,
            name = %entry.name,
            callers = before - self.calls.len(),
            "removed procedure"
        );
        Some(entry)
    }

    /// Links the call block `call` to the definition currently named `name`.
    /// When several definitions share the name, the first in block-id order
    /// wins.
    pub fn add_caller(
        &mut self,
        call: BlockId,
        name: &str,
    ) -> ProcDbResult<()> {
        let callee = self
            .procedure_by_name(name)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| ProcDbError::UnknownProcedure(name.into()))?;
        self.calls.insert(call, callee);
        Ok(())
    }

    pub fn caller_name(&self, call: &BlockId) -> Option<&str> {
        let callee = self.calls.get(call)?;
        self.procedures.get(callee).map(|entry| entry.name.as_str())
    }

    pub fn callers_of<'a>(
        &'a self,
        id: &'a BlockId,
    ) -> impl Iterator<Item = &'a BlockId> + 'a {
        self.calls
            .iter()
            .filter(move |(_, callee)| *callee == id)
            .map(|(call, _)| call)
    }

    fn check_collision(
        &self,
        name: &str,
        claimant: &BlockId,
    ) -> ProcDbResult<()> {
        if self.policy == CollisionPolicy::Allow {
            return Ok(());
        }
        match self
            .procedures
            .iter()
            .find(|(id, entry)| *id != claimant && entry.name.as_str() == name)
        {
            Some((owner, _)) => Err(ProcDbError::DuplicateName {
                name: name.into(),
                owner: owner.clone(),
            }),
            None => Ok(()),
        }
    }
}
