use crate::procedure_db::{CollisionPolicy, ProcedureDb};
use std::{cell::RefCell, rc::Rc};

/// An editing surface. Only main workspaces own a procedure registry;
/// flyouts and other scratch surfaces have none.
#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    procedure_db: Option<Rc<RefCell<ProcedureDb>>>,
}

impl Workspace {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            procedure_db: Some(Rc::new(RefCell::new(ProcedureDb::new(policy)))),
        }
    }

    #[cfg(test)]
    pub fn flyout() -> Self {
        Self { procedure_db: None }
    }

    pub fn procedure_db(&self) -> Option<&Rc<RefCell<ProcedureDb>>> {
        self.procedure_db.as_ref()
    }
}
