use common::k8s::{GroupKind, ObjectRef, normalize};
use std::collections::HashSet;

/// Objects that must not be selected for deletion.
///
/// Refs are stored without their version. Refs to cluster-scoped types also
/// lose their namespace, so a desired-state ref that carries a stray
/// namespace still matches the live object.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    refs: HashSet<ObjectRef>,
    cluster_scoped: HashSet<GroupKind>,
}

impl ExclusionSet {
    pub fn new(cluster_scoped: HashSet<GroupKind>) -> Self {
        Self {
            refs: HashSet::new(),
            cluster_scoped,
        }
    }

    fn key(&self, reference: &ObjectRef) -> ObjectRef {
        let mut key = normalize(reference);
        if self.cluster_scoped.contains(&key.group_kind()) {
            key.namespace.clear();
        }
        key
    }

    /// Returns false if the object was already excluded.
    pub fn insert(&mut self, reference: &ObjectRef) -> bool {
        let key = self.key(reference);
        self.refs.insert(key)
    }

    pub fn contains(&self, reference: &ObjectRef) -> bool {
        self.refs.contains(&self.key(reference))
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

impl<'a> Extend<&'a ObjectRef> for ExclusionSet {
    fn extend<T: IntoIterator<Item = &'a ObjectRef>>(&mut self, iter: T) {
        for reference in iter {
            self.insert(reference);
        }
    }
}
