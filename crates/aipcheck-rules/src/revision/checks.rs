//! Revision rules.
//!
//! Schema and instance predicates see one document; history predicates see
//! the whole sequence and report paths as `[i].field`.

use super::alias::{AliasState, AliasTable};
use crate::model::{split_revision_name, ResourceRevision, RevisionSchema, TIMESTAMP_TYPE};
use crate::registry::{Candidate, CheckContext, Finding};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

static COLLECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("collection pattern is valid"));

static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{[a-z][a-z0-9_]*\}$").expect("variable pattern is valid"));

/// Describe what is wrong with a schema name pattern, if anything.
fn name_pattern_problem(pattern: &str) -> Option<String> {
    if pattern.is_empty() {
        return Some("name_pattern is required".to_string());
    }
    let segments: Vec<&str> = pattern.split('/').collect();
    if segments.len() < 4 || segments.len() % 2 != 0 {
        return Some(format!(
            "name pattern `{pattern}` must be collection/{{id}} pairs ending in /revisions/{{revision}}"
        ));
    }
    for pair in segments.chunks(2) {
        if !COLLECTION.is_match(pair[0]) {
            return Some(format!(
                "`{}` in name pattern `{pattern}` is not a collection identifier",
                pair[0]
            ));
        }
        if !VARIABLE.is_match(pair[1]) {
            return Some(format!(
                "`{}` in name pattern `{pattern}` is not a {{variable}}",
                pair[1]
            ));
        }
    }
    if segments[segments.len() - 2] != "revisions" {
        return Some(format!(
            "name pattern `{pattern}` must end in /revisions/{{revision}}"
        ));
    }
    None
}

fn is_resource_name(name: &str) -> bool {
    let segments: Vec<&str> = name.split('/').collect();
    segments.len() % 2 == 0 && segments.iter().all(|s| !s.is_empty())
}

pub(crate) fn malformed_revision_name(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    match candidate {
        Candidate::Schema(schema) => name_pattern_problem(&schema.name_pattern)
            .map(|message| vec![Finding::new(ctx.base.field("name_pattern"), message)])
            .unwrap_or_default(),
        Candidate::Revision(revision) => {
            let Some(name) = revision.name.as_deref() else {
                return Vec::new();
            };
            let path = ctx.base.field("name");
            match split_revision_name(name) {
                None => vec![Finding::new(
                    path,
                    format!("name `{name}` must end in /revisions/{{revision_id}}"),
                )],
                Some((parent, _)) if !is_resource_name(parent) => vec![Finding::new(
                    path,
                    format!("parent `{parent}` of `{name}` is not a resource name"),
                )],
                Some(_) => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn schema_missing_fields(schema: &RevisionSchema, ctx: &CheckContext<'_>) -> Vec<Finding> {
    ["snapshot", "create_time"]
        .into_iter()
        .filter(|name| schema.field(name).is_none())
        .map(|name| {
            Finding::new(
                ctx.base.field("fields").field(name),
                format!("revision `{}` has no `{name}` field", schema.type_name),
            )
        })
        .collect()
}

fn instance_missing_fields(revision: &ResourceRevision, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let present = [
        ("name", revision.name.is_some()),
        ("snapshot", revision.snapshot.is_some()),
        ("create_time", revision.create_time.is_some()),
    ];
    present
        .into_iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| Finding::new(ctx.base.field(name), format!("`{name}` is required")))
        .collect()
}

pub(crate) fn missing_field(candidate: &Candidate<'_>, ctx: &CheckContext<'_>) -> Vec<Finding> {
    match candidate {
        Candidate::Schema(schema) => schema_missing_fields(schema, ctx),
        Candidate::Revision(revision) => instance_missing_fields(revision, ctx),
        _ => Vec::new(),
    }
}

fn schema_type_mismatches(schema: &RevisionSchema, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let fields = ctx.base.field("fields");
    let mut findings = Vec::new();

    if let Some((i, field)) = schema.field("snapshot") {
        if field.repeated || (!schema.parent_type.is_empty() && field.type_name != schema.parent_type)
        {
            findings.push(Finding::new(
                fields.index(i),
                format!(
                    "snapshot must be a singular `{}`, found {}`{}`",
                    schema.parent_type,
                    if field.repeated { "repeated " } else { "" },
                    field.type_name
                ),
            ));
        }
    }

    if let Some((i, field)) = schema.field("create_time") {
        if field.repeated || field.type_name != TIMESTAMP_TYPE {
            findings.push(Finding::new(
                fields.index(i),
                format!(
                    "create_time must be a singular `{TIMESTAMP_TYPE}`, found {}`{}`",
                    if field.repeated { "repeated " } else { "" },
                    field.type_name
                ),
            ));
        }
    }

    if let Some((i, field)) = schema.field("alternate_ids") {
        if !field.repeated || field.type_name != "string" {
            findings.push(Finding::new(
                fields.index(i),
                format!(
                    "alternate_ids must be `repeated string`, found {}`{}`",
                    if field.repeated { "repeated " } else { "" },
                    field.type_name
                ),
            ));
        }
    }

    findings
}

pub(crate) fn field_type_mismatch(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    match candidate {
        Candidate::Schema(schema) => schema_type_mismatches(schema, ctx),
        Candidate::Revision(revision) => match &revision.snapshot {
            Some(Value::Object(_)) | None => Vec::new(),
            Some(_) => vec![Finding::new(
                ctx.base.field("snapshot"),
                "snapshot must be an object holding the parent resource",
            )],
        },
        _ => Vec::new(),
    }
}

pub(crate) fn malformed_timestamp(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Candidate::Revision(revision) = candidate else {
        return Vec::new();
    };
    let Some(raw) = revision.create_time.as_deref() else {
        return Vec::new();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(_) => Vec::new(),
        Err(e) => vec![Finding::new(
            ctx.base.field("create_time"),
            format!("create_time `{raw}` is not an RFC 3339 timestamp: {e}"),
        )],
    }
}

pub(crate) fn duplicate_alternate_id(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Candidate::Revision(revision) = candidate else {
        return Vec::new();
    };
    let ids = ctx.base.field("alternate_ids");
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();

    let mut findings = Vec::new();
    for (j, alias) in revision.alternate_ids.iter().enumerate() {
        if !seen.insert(alias.as_str()) && reported.insert(alias.as_str()) {
            findings.push(Finding::new(
                ids.index(j),
                format!("alternate id `{alias}` is listed more than once"),
            ));
        }
    }
    findings
}

pub(crate) fn malformed_alias(candidate: &Candidate<'_>, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Candidate::Revision(revision) = candidate else {
        return Vec::new();
    };
    let ids = ctx.base.field("alternate_ids");
    let pattern = &ctx.options.alias_pattern;

    revision
        .alternate_ids
        .iter()
        .enumerate()
        .filter(|(_, alias)| !ctx.options.is_reserved_alias(alias) && !pattern.is_match(alias))
        .map(|(j, alias)| {
            Finding::new(
                ids.index(j),
                format!("alias `{alias}` must match {}", pattern.as_str()),
            )
        })
        .collect()
}

pub(crate) fn non_monotonic_create_time(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Candidate::History(revisions) = candidate else {
        return Vec::new();
    };
    let mut newest: BTreeMap<&str, DateTime<Utc>> = BTreeMap::new();

    let mut findings = Vec::new();
    for (i, revision) in revisions.iter().enumerate() {
        let (Some(parent), Some(time)) = (revision.parent(), revision.parsed_create_time()) else {
            continue;
        };
        match newest.get(parent) {
            Some(&previous) if time < previous => findings.push(Finding::new(
                ctx.base.index(i).field("create_time"),
                format!(
                    "create_time {} is earlier than {} already recorded for `{parent}`",
                    time.to_rfc3339(),
                    previous.to_rfc3339()
                ),
            )),
            _ => {
                newest.insert(parent, time);
            }
        }
    }
    findings
}

pub(crate) fn duplicate_revision_id(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Candidate::History(revisions) = candidate else {
        return Vec::new();
    };
    let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();

    revisions
        .iter()
        .enumerate()
        .filter_map(|(i, revision)| {
            let key = (revision.parent()?, revision.revision_id()?);
            if seen.insert(key) {
                return None;
            }
            Some(Finding::new(
                ctx.base.index(i).field("name"),
                format!("revision id `{}` is already used under `{}`", key.1, key.0),
            ))
        })
        .collect()
}

pub(crate) fn ambiguous_alias(candidate: &Candidate<'_>, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Candidate::History(revisions) = candidate else {
        return Vec::new();
    };
    let mut tables: BTreeMap<&str, AliasTable> = BTreeMap::new();

    let mut findings = Vec::new();
    for (i, revision) in revisions.iter().enumerate() {
        let (Some(parent), Some(id)) = (revision.parent(), revision.revision_id()) else {
            continue;
        };
        let table = tables.entry(parent).or_default();
        for (j, alias) in revision.alternate_ids.iter().enumerate() {
            if let AliasState::Assigned(previous) = table.assign(alias.as_str(), id) {
                if previous != id {
                    findings.push(Finding::new(
                        ctx.base.index(i).field("alternate_ids").index(j),
                        format!("alias `{alias}` also resolves to revision `{previous}`"),
                    ));
                }
            }
        }
    }
    findings
}
