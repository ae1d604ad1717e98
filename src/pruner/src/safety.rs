//! Per-object deletion eligibility.
//!
//! An object is only ever pruned when every rule below holds. Any doubt about
//! who owns an object leaves it in place.

use std::collections::HashSet;
use std::fmt;

use common::config::PruneConfig;
use common::k8s::{GroupKind, LiveObject};
use common::utils::parse_bool_or_false;

use crate::exclusion::ExclusionSet;

/// Reason an object was kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligible {
    KindNotInPhase(GroupKind),
    SkipDeleteAnnotation,
    OwnedByOtherObject,
    NoManagedFields,
    NotManagedByTool,
    Excluded,
    SkipDeleteIfTags,
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::KindNotInPhase(group_kind) => {
                write!(f, "kind {group_kind} is not part of this phase")
            }
            Ineligible::SkipDeleteAnnotation => write!(f, "skip-delete annotation is set"),
            Ineligible::OwnedByOtherObject => write!(f, "object has owner references"),
            Ineligible::NoManagedFields => write!(f, "object has no managed fields"),
            Ineligible::NotManagedByTool => write!(f, "object was not applied by this tool"),
            Ineligible::Excluded => write!(f, "object is excluded"),
            Ineligible::SkipDeleteIfTags => {
                write!(f, "skip-delete-if-tags annotation is set and tags were partial")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SafetyFilter {
    manager_name: String,
    skip_delete_annotation: String,
    skip_delete_if_tags_annotation: String,
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::from_config(&PruneConfig::default())
    }
}

impl SafetyFilter {
    pub fn from_config(config: &PruneConfig) -> Self {
        Self {
            manager_name: config.manager_name.clone(),
            skip_delete_annotation: config.skip_delete_annotation.clone(),
            skip_delete_if_tags_annotation: config.skip_delete_if_tags_annotation.clone(),
        }
    }

    pub fn manager_name(&self) -> &str {
        &self.manager_name
    }

    /// Check all eligibility rules in order and return the first violation.
    pub fn check(
        &self,
        object: &LiveObject,
        resolved_kinds: &HashSet<GroupKind>,
        exclusions: &ExclusionSet,
        honor_skip_if_tagged: bool,
    ) -> Result<(), Ineligible> {
        let group_kind = object.gvk().group_kind();
        if !resolved_kinds.contains(&group_kind) {
            return Err(Ineligible::KindNotInPhase(group_kind));
        }

        if parse_bool_or_false(object.annotation(&self.skip_delete_annotation)) {
            return Err(Ineligible::SkipDeleteAnnotation);
        }

        if !object.owner_references().is_empty() {
            return Err(Ineligible::OwnedByOtherObject);
        }

        if object.managed_fields().is_empty() {
            return Err(Ineligible::NoManagedFields);
        }

        if !object.is_managed_by(&self.manager_name) {
            return Err(Ineligible::NotManagedByTool);
        }

        if exclusions.contains(&object.object_ref()) {
            return Err(Ineligible::Excluded);
        }

        if honor_skip_if_tagged
            && parse_bool_or_false(object.annotation(&self.skip_delete_if_tags_annotation))
        {
            return Err(Ineligible::SkipDeleteIfTags);
        }

        Ok(())
    }

    pub fn is_eligible(
        &self,
        object: &LiveObject,
        resolved_kinds: &HashSet<GroupKind>,
        exclusions: &ExclusionSet,
        honor_skip_if_tagged: bool,
    ) -> bool {
        self.check(object, resolved_kinds, exclusions, honor_skip_if_tagged)
            .is_ok()
    }
}
