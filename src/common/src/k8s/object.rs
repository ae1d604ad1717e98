use super::{GroupVersionKind, ObjectRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference from an object to the object responsible for its lifecycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
}

/// One `metadata.managedFields` record; only the manager is used.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedFieldsEntry {
    pub manager: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_fields: Vec<ManagedFieldsEntry>,
}

/// An object as currently present in the cluster.
///
/// Deserializes from the regular Kubernetes object shape; everything except
/// `apiVersion`, `kind` and the metadata listed in [`ObjectMeta`] is ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
}

impl LiveObject {
    pub fn new(gvk: &GroupVersionKind, namespace: &str, name: &str) -> Self {
        Self {
            api_version: gvk.api_version(),
            kind: gvk.kind.clone(),
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_owner(mut self, owner: &ObjectRef) -> Self {
        self.metadata.owner_references.push(OwnerReference {
            api_version: owner.gvk.api_version(),
            kind: owner.gvk.kind.clone(),
            name: owner.name.clone(),
            uid: String::new(),
            controller: Some(true),
        });
        self
    }

    pub fn with_manager(mut self, manager: impl Into<String>) -> Self {
        self.metadata.managed_fields.push(ManagedFieldsEntry {
            manager: manager.into(),
            operation: Some("Apply".to_string()),
            api_version: Some(self.api_version.clone()),
        });
        self
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::from_api_version(&self.api_version, self.kind.clone())
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(
            self.gvk(),
            self.metadata.namespace.clone(),
            self.metadata.name.clone(),
        )
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        &self.metadata.owner_references
    }

    pub fn managed_fields(&self) -> &[ManagedFieldsEntry] {
        &self.metadata.managed_fields
    }

    /// True if `manager` ever wrote fields on this object.
    pub fn is_managed_by(&self, manager: &str) -> bool {
        self.metadata
            .managed_fields
            .iter()
            .any(|entry| entry.manager == manager)
    }
}
