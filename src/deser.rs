use crate::{
    proc::{BlockId, ProcKind, ProcedureBlock},
    project::Project,
    text_field::{legal_name, FieldError},
    workspace::Workspace,
};
use serde::Deserialize;
use serde_json::Value as Json;
use std::{borrow::Cow, collections::BTreeMap, collections::HashMap};
use thiserror::Error;

pub(crate) struct DeCtx<'a> {
    blocks: BTreeMap<Cow<'a, str>, Block<'a>>,
}

#[derive(Debug, Error)]
pub(crate) enum DeError {
    #[error("block `{block}` has no `{field}` field")]
    MissingField { block: String, field: &'static str },
    #[error("field `{field}` of block `{block}` is not text")]
    BadField { block: String, field: &'static str },
    #[error("procedure definition `{block}`: {source}")]
    Definition { block: String, source: FieldError },
    #[error("procedure call `{block}`: {source}")]
    Call { block: String, source: FieldError },
}

type DeResult<T> = Result<T, DeError>;

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectFile<'a> {
    #[serde(default)]
    pub blocks: BTreeMap<Cow<'a, str>, Block<'a>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Block<'a> {
    #[serde(rename = "type")]
    pub opcode: Cow<'a, str>,
    #[serde(default)]
    pub fields: HashMap<Cow<'a, str>, Json>,
}

impl<'a> DeCtx<'a> {
    pub fn new(blocks: BTreeMap<Cow<'a, str>, Block<'a>>) -> Self {
        Self { blocks }
    }

    /// Registers every definition first, so calls can be linked regardless
    /// of where they appear in the block map.
    pub fn build_project(&self, workspace: Workspace) -> DeResult<Project> {
        let mut project = Project::new(workspace);

        for (id, block) in &self.blocks {
            let Some(kind) = ProcKind::from_def_opcode(&block.opcode) else {
                continue;
            };
            let name = text_field(id, block, "NAME")?;
            let block_id = BlockId::new(id.as_ref());
            project
                .add_definition(ProcedureBlock { id: block_id, kind }, name)
                .map_err(|source| DeError::Definition {
                    block: id.to_string(),
                    source,
                })?;
        }

        for (id, block) in &self.blocks {
            if ProcKind::from_call_opcode(&block.opcode).is_none() {
                continue;
            }
            // Definitions were normalized on commit, so callers must be too.
            let name = text_field(id, block, "PROCNAME")?;
            let call = BlockId::new(id.as_ref());
            legal_name(name)
                .and_then(|name| {
                    project.add_call(call, &name).map_err(FieldError::from)
                })
                .map_err(|source| DeError::Call {
                    block: id.to_string(),
                    source,
                })?;
        }

        Ok(project)
    }
}

/// Reads a text field stored either bare or as a `[text, id]` pair.
fn text_field<'blk>(
    id: &str,
    block: &'blk Block,
    name: &'static str,
) -> DeResult<&'blk str> {
    let json = block.fields.get(name).ok_or_else(|| DeError::MissingField {
        block: id.to_owned(),
        field: name,
    })?;
    match json {
        Json::String(text) => Ok(text.as_str()),
        Json::Array(arr) => match &arr[..] {
            [Json::String(text), ..] => Ok(text.as_str()),
            _ => Err(DeError::BadField {
                block: id.to_owned(),
                field: name,
            }),
        },
        _ => Err(DeError::BadField {
            block: id.to_owned(),
            field: name,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure_db::{CollisionPolicy, ProcDbError};

    fn build(json: &str, policy: CollisionPolicy) -> DeResult<Project> {
        let file: ProjectFile = serde_json::from_str(json).unwrap();
        DeCtx::new(file.blocks).build_project(Workspace::new(policy))
    }

    #[test]
    fn calls_link_to_definitions_in_any_order() {
        let project = build(
            r#"{ "blocks": {
                "a_call": { "type": "procedures_callreturn", "fields": { "PROCNAME": "sum" } },
                "z_def": { "type": "procedures_defreturn", "fields": { "NAME": "sum" } }
            } }"#,
            CollisionPolicy::Reject,
        )
        .unwrap();
        let db = project.workspace().procedure_db().unwrap().borrow();
        assert_eq!(db.caller_name(&BlockId::new("a_call")), Some("sum"));
    }

    #[test]
    fn names_are_made_legal() {
        let project = build(
            r#"{ "blocks": {
                "d": { "type": "procedures_defnoreturn", "fields": { "NAME": " draw  box " } }
            } }"#,
            CollisionPolicy::Reject,
        )
        .unwrap();
        assert_eq!(
            project.field(&BlockId::new("d")).map(|f| f.value()),
            Some("draw_box")
        );
    }

    #[test]
    fn missing_name_field() {
        let err = build(
            r#"{ "blocks": { "d": { "type": "procedures_defnoreturn" } } }"#,
            CollisionPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DeError::MissingField { field: "NAME", .. }
        ));
    }

    #[test]
    fn non_text_field() {
        let err = build(
            r#"{ "blocks": {
                "d": { "type": "procedures_defnoreturn", "fields": { "NAME": 3 } }
            } }"#,
            CollisionPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, DeError::BadField { field: "NAME", .. }));
    }

    #[test]
    fn call_to_unknown_procedure() {
        let err = build(
            r#"{ "blocks": {
                "c": { "type": "procedures_callnoreturn", "fields": { "PROCNAME": "ghost" } }
            } }"#,
            CollisionPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DeError::Call {
                source: FieldError::Registry(ProcDbError::UnknownProcedure(_)),
                ..
            }
        ));
    }

    #[test]
    fn call_names_are_made_legal_like_definitions() {
        let project = build(
            r#"{ "blocks": {
                "c": { "type": "procedures_callnoreturn", "fields": { "PROCNAME": "draw box" } },
                "d": { "type": "procedures_defnoreturn", "fields": { "NAME": "draw box" } }
            } }"#,
            CollisionPolicy::Reject,
        )
        .unwrap();
        let db = project.workspace().procedure_db().unwrap().borrow();
        assert_eq!(db.caller_name(&BlockId::new("c")), Some("draw_box"));
    }

    #[test]
    fn illegal_call_name() {
        let err = build(
            r#"{ "blocks": {
                "c": { "type": "procedures_callnoreturn", "fields": { "PROCNAME": "  " } }
            } }"#,
            CollisionPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DeError::Call {
                source: FieldError::Invalid { .. },
                ..
            }
        ));
    }

    #[test]
    fn duplicate_definitions_follow_policy() {
        let json = r#"{ "blocks": {
            "d1": { "type": "procedures_defnoreturn", "fields": { "NAME": "go" } },
            "d2": { "type": "procedures_defnoreturn", "fields": { "NAME": "go" } }
        } }"#;
        let err = build(json, CollisionPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            DeError::Definition {
                source: FieldError::Registry(ProcDbError::DuplicateName { .. }),
                ..
            }
        ));
        assert!(build(json, CollisionPolicy::Allow).is_ok());
    }

    #[test]
    fn empty_project() {
        let project = build("{}", CollisionPolicy::Reject).unwrap();
        let db = project.workspace().procedure_db().unwrap().borrow();
        assert!(db.is_empty());
    }
}
