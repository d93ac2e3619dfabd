use crate::{
    proc::ProcedureBlock,
    procedure_db::ProcedureDb,
    text_field::{FieldResult, PostCommit, TextField, Validator},
    workspace::Workspace,
};
use std::{cell::RefCell, rc::Rc};
use tracing::trace;

/// Text field on a procedure definition block. Every committed value is
/// pushed into the workspace's procedure registry, either as a new
/// procedure or as a rename of the block's existing one.
#[derive(Debug)]
pub(crate) struct ProcedureNameField {
    text: TextField,
    source: Option<SourceBlock>,
}

#[derive(Debug)]
struct SourceBlock {
    block: ProcedureBlock,
    procedure_db: Option<Rc<RefCell<ProcedureDb>>>,
}

impl ProcedureNameField {
    pub fn new(text: &str) -> Self {
        Self {
            text: TextField::new(text),
            source: None,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.text = self.text.with_validator(validator);
        self
    }

    pub fn attach(&mut self, block: ProcedureBlock, workspace: &Workspace) {
        self.source = Some(SourceBlock {
            block,
            procedure_db: workspace.procedure_db().cloned(),
        });
    }

    pub fn value(&self) -> &str {
        self.text.value()
    }

    pub fn commit(&mut self, new_value: &str) -> FieldResult<()> {
        match &mut self.source {
            Some(source) => self.text.commit_with(new_value, source),
            None => self.text.set_value(new_value),
        }
    }
}

impl PostCommit for SourceBlock {
    fn after_commit(&mut self, old: &str, new: &str) -> FieldResult<()> {
        let Some(procedure_db) = &self.procedure_db else {
            trace!(block = %self.block.id, "no procedure registry");
            return Ok(());
        };
        let mut procedure_db = procedure_db.borrow_mut();
        if procedure_db.get_procedure(&self.block.id).is_some() {
            procedure_db.rename_procedure(&self.block.id, old, new)?;
        } else {
            procedure_db.add_procedure(new, &self.block)?;
        }
        Ok(())
    }
}
