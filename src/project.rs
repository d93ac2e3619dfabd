use crate::{
    deser::{DeCtx, DeError, ProjectFile},
    field::ProcedureNameField,
    proc::{BlockId, ProcKind, ProcedureBlock},
    procedure_db::{CollisionPolicy, ProcDbResult, ProcedureDb},
    text_field::{legal_name, FieldError, FieldResult},
    workspace::Workspace,
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::{result::ZipError, ZipArchive};

const ARCHIVE_EXTENSIONS: [&str; 3] = ["zip", "aia", "sb3"];

#[derive(Debug, Error)]
pub(crate) enum ProjectError {
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    #[error("archive error: {0}")]
    Zip(#[from] ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("deserialization error: {0}")]
    De(#[from] DeError),
    #[error("found no procedure definition block with ID `{0}`")]
    UnknownDefinition(BlockId),
    #[error(transparent)]
    Field(#[from] FieldError),
}

pub(crate) type ProjectResult<T> = Result<T, ProjectError>;

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    registry: &'a ProcedureDb,
    void_names: Vec<&'a str>,
    return_names: Vec<&'a str>,
    fields: BTreeMap<&'a BlockId, &'a str>,
}

/// A loaded workspace together with the name field of every procedure
/// definition block in it.
#[derive(Debug)]
pub(crate) struct Project {
    workspace: Workspace,
    definitions: BTreeMap<BlockId, ProcedureNameField>,
}

impl Project {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            definitions: BTreeMap::new(),
        }
    }

    pub fn load(
        path: &Path,
        entry: &str,
        policy: CollisionPolicy,
    ) -> ProjectResult<Self> {
        let bytes = read_project_bytes(path, entry)?;
        let file: ProjectFile = serde_json::from_slice(&bytes)?;
        let project =
            DeCtx::new(file.blocks).build_project(Workspace::new(policy))?;
        info!(
            path = %path.display(),
            definitions = project.definitions.len(),
            "loaded project"
        );
        if let Some(procedure_db) = project.workspace().procedure_db() {
            if procedure_db.borrow().is_empty() {
                warn!(path = %path.display(), "project defines no procedures");
            }
        }
        Ok(project)
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn field(&self, id: &BlockId) -> Option<&ProcedureNameField> {
        self.definitions.get(id)
    }

    /// Creates the name field for a definition block and commits its
    /// initial name, which registers the procedure.
    pub fn add_definition(
        &mut self,
        block: ProcedureBlock,
        name: &str,
    ) -> FieldResult<()> {
        let id = block.id.clone();
        let mut field = ProcedureNameField::new("").with_validator(legal_name);
        field.attach(block, &self.workspace);
        field.commit(name)?;
        self.definitions.insert(id, field);
        Ok(())
    }

    pub fn add_call(&mut self, call: BlockId, name: &str) -> ProcDbResult<()> {
        match self.workspace.procedure_db() {
            Some(procedure_db) => {
                procedure_db.borrow_mut().add_caller(call, name)
            }
            None => {
                debug!(block = %call, "no procedure registry, call not linked");
                Ok(())
            }
        }
    }

    /// Commits `name` to the field of definition block `id`, as if the user
    /// had typed it.
    pub fn rename(&mut self, id: &BlockId, name: &str) -> ProjectResult<()> {
        let field = self
            .definitions
            .get_mut(id)
            .ok_or_else(|| ProjectError::UnknownDefinition(id.clone()))?;
        field.commit(name)?;
        let callers = self.workspace.procedure_db().map_or(0, |procedure_db| {
            procedure_db.borrow().callers_of(id).count()
        });
        info!(block = %id, name = field.value(), callers, "renamed procedure");
        Ok(())
    }

    /// Deletes a definition block; its call blocks go with it.
    pub fn remove(&mut self, id: &BlockId) -> ProjectResult<()> {
        if self.definitions.remove(id).is_none() {
            return Err(ProjectError::UnknownDefinition(id.clone()));
        }
        if let Some(procedure_db) = self.workspace.procedure_db() {
            procedure_db.borrow_mut().remove_procedure(id);
        }
        info!(block = %id, "removed procedure definition");
        Ok(())
    }

    /// Pretty JSON of the registry plus every field's displayed text, or
    /// `null` for a workspace without a registry.
    pub fn to_json(&self) -> ProjectResult<String> {
        let Some(procedure_db) = self.workspace.procedure_db() else {
            return Ok(serde_json::to_string_pretty(&())?);
        };
        let procedure_db = procedure_db.borrow();
        let report = Report {
            registry: &*procedure_db,
            void_names: procedure_db.names(ProcKind::Void),
            return_names: procedure_db.names(ProcKind::Return),
            fields: self
                .definitions
                .iter()
                .map(|(id, field)| (id, field.value()))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

fn read_project_bytes(path: &Path, entry: &str) -> ProjectResult<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    if is_archive(path) {
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let mut entry = archive.by_name(entry)?;
        entry.read_to_end(&mut bytes)?;
    } else {
        file.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            ARCHIVE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
