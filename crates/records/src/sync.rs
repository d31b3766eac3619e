//! Reconciliation of employee containers against the directory.

use std::collections::{BTreeMap, HashMap};

use daysheet_core::error::CoreError;
use daysheet_core::types::EmployeeId;
use daysheet_store::{DocumentStore, Query, Resource, ResourceKind};
use serde::Serialize;

use crate::directory::{EmployeeDirectory, EmployeeRecord};
use crate::hierarchy::{Hierarchy, EMPLOYEE_ID_PROPERTY};

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Employee containers created.
    pub created: u32,
    /// Directory folder references rewritten.
    pub updated: u32,
    /// Containers matching no employee that were trashed.
    pub trashed: u32,
    /// Duplicate employee containers that were trashed.
    pub duplicates_removed: u32,
    /// One entry per duplicate repair.
    pub repairs: Vec<String>,
    pub errors: Vec<String>,
}

/// Bring the containers under root in line with the directory.
///
/// Creates missing employee containers, repoints stale folder references,
/// keeps the oldest of any duplicates, and trashes containers that belong to
/// nobody. An untagged container named after several employees is left alone
/// and reported. Failures are collected per employee.
pub async fn sync(hierarchy: &Hierarchy, directory: &dyn EmployeeDirectory) -> SyncSummary {
    let mut summary = SyncSummary::default();

    let root = match hierarchy.root().await {
        Ok(root) => root,
        Err(e) => {
            summary.errors.push(format!("root: {e}"));
            return summary;
        }
    };
    let employees = match directory.list().await {
        Ok(employees) => employees,
        Err(e) => {
            summary.errors.push(format!("directory: {e}"));
            return summary;
        }
    };
    let containers = match hierarchy
        .store()
        .list(&Query::children_of(root.clone()).of_kind(ResourceKind::Container))
        .await
    {
        Ok(containers) => containers,
        Err(e) => {
            summary.errors.push(format!("list {root}: {e}"));
            return summary;
        }
    };

    let Assignment {
        mut matched,
        ambiguous,
        orphans,
    } = assign(&employees, containers);

    for employee in &employees {
        let owned = matched.remove(&employee.id).unwrap_or_default();
        if let Err(e) = reconcile(hierarchy, directory, employee, owned, &mut summary).await {
            tracing::error!(employee_id = %employee.id, error = %e, "Failed to reconcile employee container");
            summary.errors.push(format!("{}: {e}", employee.id));
        }
    }

    for container in ambiguous {
        tracing::warn!(
            container_id = %container.id,
            name = %container.name,
            "Untagged container matches several employees; leaving it in place"
        );
        summary.errors.push(format!(
            "{}: untagged container '{}' matches more than one employee; tag it with {EMPLOYEE_ID_PROPERTY}",
            container.id, container.name
        ));
    }

    for orphan in orphans {
        match hierarchy.store().trash(&orphan.id).await {
            Ok(()) => {
                tracing::info!(container_id = %orphan.id, name = %orphan.name, "Trashed orphan container");
                summary.trashed += 1;
            }
            Err(e) => summary.errors.push(format!("trash {}: {e}", orphan.id)),
        }
    }

    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        trashed = summary.trashed,
        duplicates_removed = summary.duplicates_removed,
        errors = summary.errors.len(),
        "Container sync complete"
    );
    summary
}

/// Root's children sorted by owner.
#[derive(Debug, Default)]
struct Assignment {
    /// Per-employee matches, oldest first.
    matched: HashMap<EmployeeId, Vec<Resource>>,
    /// Untagged containers named after more than one employee. Never trashed.
    ambiguous: Vec<Resource>,
    /// Containers that belong to nobody.
    orphans: Vec<Resource>,
}

/// Split root's children into per-employee matches, ambiguous containers
/// and orphans.
///
/// A tagged container belongs to the employee with that id. An untagged one
/// belongs to the employee with that exact display name, when exactly one
/// employee has it.
fn assign(employees: &[EmployeeRecord], containers: Vec<Resource>) -> Assignment {
    let ids: HashMap<&str, &EmployeeRecord> = employees.iter().map(|e| (e.id.as_str(), e)).collect();
    let mut by_name: BTreeMap<&str, Vec<&EmployeeRecord>> = BTreeMap::new();
    for employee in employees {
        by_name.entry(employee.name.as_str()).or_default().push(employee);
    }

    let mut assignment = Assignment::default();
    for container in containers {
        match container.property(EMPLOYEE_ID_PROPERTY) {
            Some(id) => match ids.get(id) {
                Some(owner) => assignment.matched.entry(owner.id.clone()).or_default().push(container),
                None => assignment.orphans.push(container),
            },
            None => match by_name.get(container.name.as_str()).map(Vec::as_slice) {
                Some([only]) => assignment.matched.entry(only.id.clone()).or_default().push(container),
                Some(_) => assignment.ambiguous.push(container),
                None => assignment.orphans.push(container),
            },
        }
    }
    assignment
}

async fn reconcile(
    hierarchy: &Hierarchy,
    directory: &dyn EmployeeDirectory,
    employee: &EmployeeRecord,
    owned: Vec<Resource>,
    summary: &mut SyncSummary,
) -> Result<(), CoreError> {
    let mut owned = owned.into_iter();
    let keep = match owned.next() {
        Some(keep) => keep.id,
        None => {
            let id = hierarchy.create_employee(employee).await?;
            summary.created += 1;
            id
        }
    };

    let duplicates: Vec<_> = owned.collect();
    if !duplicates.is_empty() {
        let repair = CoreError::DuplicateId {
            name: employee.name.clone(),
            count: duplicates.len() + 1,
        };
        tracing::warn!(employee_id = %employee.id, keep = %keep, "{repair}");
        for duplicate in duplicates {
            hierarchy.store().trash(&duplicate.id).await?;
            summary.duplicates_removed += 1;
        }
        summary.repairs.push(format!("{}: {repair}, kept {keep}", employee.id));
    }

    if employee.folder_id.as_deref() != Some(keep.as_str()) {
        directory.set_folder(&employee.id, Some(keep.clone())).await?;
        summary.updated += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap as Map;

    fn container(id: &str, name: &str, employee_id: Option<&str>) -> Resource {
        let mut properties = Map::new();
        if let Some(e) = employee_id {
            properties.insert(EMPLOYEE_ID_PROPERTY.to_string(), e.to_string());
        }
        Resource {
            id: id.into(),
            name: name.into(),
            kind: ResourceKind::Container,
            parents: vec!["root".into()],
            properties,
            created_at: Utc::now(),
            trashed: false,
        }
    }

    #[test]
    fn tagged_and_untagged_containers_are_assigned() {
        let employees = vec![
            EmployeeRecord::new("E-1", "Alice", "a@example.com"),
            EmployeeRecord::new("E-2", "Bob", "b@example.com"),
        ];
        let Assignment { matched, orphans, .. } = assign(
            &employees,
            vec![
                container("c1", "Alice", Some("E-1")),
                container("c2", "Bob", None),
                container("c3", "Carol", None),
                container("c4", "Dave", Some("E-9")),
            ],
        );
        assert_eq!(matched["E-1"][0].id, "c1");
        assert_eq!(matched["E-2"][0].id, "c2");
        let orphan_ids: Vec<_> = orphans.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(orphan_ids, vec!["c3", "c4"]);
    }

    #[test]
    fn ambiguous_names_are_not_guessed() {
        let employees = vec![
            EmployeeRecord::new("E-1", "Sam", "a@example.com"),
            EmployeeRecord::new("E-2", "Sam", "b@example.com"),
        ];
        let assignment = assign(
            &employees,
            vec![container("c1", "Sam", None), container("c2", "Sam", Some("E-2"))],
        );
        assert_eq!(assignment.matched["E-2"][0].id, "c2");
        assert!(!assignment.matched.contains_key("E-1"));
        assert_eq!(assignment.ambiguous[0].id, "c1");
        assert!(assignment.orphans.is_empty());
    }
}
