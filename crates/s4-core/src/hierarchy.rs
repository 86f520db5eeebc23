//! Class hierarchy registry.
//!
//! Stores each class's declared parents (multiple inheritance) and the class
//! unions it belongs to, and answers inheritance-distance queries. The parent
//! graph is kept acyclic: every registration is applied to a scratch copy,
//! checked, and only then committed, so a rejected registration leaves the
//! registry exactly as it was.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::class::{ClassId, ClassName};
use crate::error::DispatchError;

/// A class definition as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    pub name: ClassName,
    /// Direct parents in declaration order.
    pub parents: Vec<ClassName>,
    /// Once registered sealed, the class rejects redefinition.
    pub sealed: bool,
}

impl ClassDef {
    pub fn new<I, S>(name: impl Into<ClassName>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ClassName>,
    {
        ClassDef {
            name: name.into(),
            parents: parents.into_iter().map(Into::into).collect(),
            sealed: false,
        }
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }
}

/// A registered class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassNode {
    pub id: ClassId,
    pub name: ClassName,
    pub parents: Vec<ClassName>,
    pub sealed: bool,
    /// True for classes created by [`ClassHierarchy::register_union`].
    pub is_union: bool,
}

/// Outcome of a successful registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registered {
    pub id: ClassId,
    /// The definition that was replaced, if any.
    pub previous: Option<ClassNode>,
}

/// The class registry.
///
/// Classes that were never registered are still valid dispatch tags; they
/// simply have no parents.
#[derive(Clone, Debug, Default)]
pub struct ClassHierarchy {
    nodes: FxHashMap<ClassName, ClassNode>,
    /// Member class -> unions it belongs to, in registration order.
    memberships: FxHashMap<ClassName, Vec<ClassName>>,
    next_id: u32,
}

impl ClassHierarchy {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a class definition.
    ///
    /// Fails with `ReservedClassName` for `ANY`/`missing`, `SealedClass` if
    /// the existing definition is sealed, and `Cycle` if the new parents
    /// would make the class its own ancestor.
    pub fn register(&mut self, def: ClassDef) -> Result<Registered, DispatchError> {
        self.check_replaceable(&def.name)?;

        let mut next = self.clone();
        let id = next.id_for(&def.name);
        let previous = next.nodes.insert(
            def.name.clone(),
            ClassNode {
                id,
                name: def.name.clone(),
                parents: def.parents,
                sealed: def.sealed,
                is_union: false,
            },
        );
        next.reject_cycle_through(&def.name)?;

        *self = next;
        tracing::debug!(class = %def.name, id = id.0, replaced = previous.is_some(), "registered class");
        Ok(Registered { id, previous })
    }

    /// Register `name` as a class union: a virtual class with no parents of
    /// its own that every member extends at distance 1.
    ///
    /// Redefining a union replaces its member list. Members need not be
    /// registered, and a sealed member may still join a union since its own
    /// definition is left untouched.
    pub fn register_union<I, S>(&mut self, name: impl Into<ClassName>, members: I) -> Result<Registered, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ClassName>,
    {
        let name = name.into();
        let members: Vec<ClassName> = members.into_iter().map(Into::into).collect();
        self.check_replaceable(&name)?;
        if let Some(reserved) = members.iter().find(|m| m.is_reserved()) {
            return Err(DispatchError::ReservedClassName {
                name: reserved.clone(),
            });
        }

        let mut next = self.clone();
        for unions in next.memberships.values_mut() {
            unions.retain(|u| u != &name);
        }
        next.memberships.retain(|_, unions| !unions.is_empty());
        for member in &members {
            let unions = next.memberships.entry(member.clone()).or_default();
            if !unions.contains(&name) {
                unions.push(name.clone());
            }
        }
        let id = next.id_for(&name);
        let previous = next.nodes.insert(
            name.clone(),
            ClassNode {
                id,
                name: name.clone(),
                parents: Vec::new(),
                sealed: false,
                is_union: true,
            },
        );
        next.reject_cycle_through(&name)?;

        *self = next;
        tracing::debug!(union = %name, members = members.len(), "registered class union");
        Ok(Registered { id, previous })
    }

    /// Look up a registered class.
    pub fn get(&self, name: &str) -> Option<&ClassNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of registered classes (unions included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All registered classes in registration order.
    pub fn classes(&self) -> Vec<&ClassNode> {
        let mut nodes: Vec<&ClassNode> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    /// Members of a union, sorted by name.
    pub fn union_members(&self, union: &str) -> Vec<ClassName> {
        let mut members: Vec<ClassName> = self
            .memberships
            .iter()
            .filter(|(_, unions)| unions.iter().any(|u| u.as_str() == union))
            .map(|(member, _)| member.clone())
            .collect();
        members.sort();
        members
    }

    /// Direct parents of a class: declared parents first, then unions.
    pub fn direct_parents(&self, name: &str) -> Vec<ClassName> {
        let mut parents = self
            .nodes
            .get(name)
            .map(|n| n.parents.clone())
            .unwrap_or_default();
        if let Some(unions) = self.memberships.get(name) {
            for union in unions {
                if !parents.contains(union) {
                    parents.push(union.clone());
                }
            }
        }
        parents
    }

    /// Minimum number of parent hops from `from` to `to`.
    ///
    /// `Some(0)` when the classes are equal, `None` when `to` is not an
    /// ancestor of `from` along any path.
    pub fn distance(&self, from: &str, to: &str) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let mut seen: FxHashSet<ClassName> = FxHashSet::default();
        let mut queue: VecDeque<(ClassName, u32)> = VecDeque::new();
        queue.push_back((ClassName::from(from), 0));
        seen.insert(ClassName::from(from));

        while let Some((class, depth)) = queue.pop_front() {
            for parent in self.direct_parents(class.as_str()) {
                if parent.as_str() == to {
                    return Some(depth + 1);
                }
                if seen.insert(parent.clone()) {
                    queue.push_back((parent, depth + 1));
                }
            }
        }
        None
    }

    /// True iff `to` is `from` or one of its ancestors.
    pub fn is_ancestor(&self, from: &str, to: &str) -> bool {
        self.distance(from, to).is_some()
    }

    /// Every ancestor of `from` with its minimum distance, nearest first and
    /// then by name. The class itself is not included.
    pub fn ancestors(&self, from: &str) -> Vec<(ClassName, u32)> {
        let mut found: FxHashMap<ClassName, u32> = FxHashMap::default();
        let mut queue: VecDeque<(ClassName, u32)> = VecDeque::new();
        queue.push_back((ClassName::from(from), 0));

        while let Some((class, depth)) = queue.pop_front() {
            for parent in self.direct_parents(class.as_str()) {
                if parent.as_str() == from || found.contains_key(&parent) {
                    continue;
                }
                found.insert(parent.clone(), depth + 1);
                queue.push_back((parent, depth + 1));
            }
        }

        let mut out: Vec<(ClassName, u32)> = found.into_iter().collect();
        out.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    fn check_replaceable(&self, name: &ClassName) -> Result<(), DispatchError> {
        if name.is_reserved() {
            return Err(DispatchError::ReservedClassName { name: name.clone() });
        }
        match self.nodes.get(name.as_str()) {
            Some(existing) if existing.sealed => Err(DispatchError::SealedClass {
                class: name.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn id_for(&mut self, name: &ClassName) -> ClassId {
        if let Some(existing) = self.nodes.get(name.as_str()) {
            return existing.id;
        }
        let id = ClassId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Any cycle created by a registration passes through the class being
    /// registered, so it is enough to ask whether `name` reaches itself.
    fn reject_cycle_through(&self, name: &ClassName) -> Result<(), DispatchError> {
        for parent in self.direct_parents(name.as_str()) {
            if &parent == name {
                return Err(DispatchError::Cycle {
                    class: name.clone(),
                    cycle_path: vec![name.clone(), name.clone()],
                });
            }
            if let Some(path) = self.path(&parent, name) {
                let mut cycle_path = Vec::with_capacity(path.len() + 1);
                cycle_path.push(name.clone());
                cycle_path.extend(path);
                return Err(DispatchError::Cycle {
                    class: name.clone(),
                    cycle_path,
                });
            }
        }
        Ok(())
    }

    /// Shortest parent chain from `from` up to `to`, both ends included.
    fn path(&self, from: &ClassName, to: &ClassName) -> Option<Vec<ClassName>> {
        let mut came_from: FxHashMap<ClassName, ClassName> = FxHashMap::default();
        let mut queue: VecDeque<ClassName> = VecDeque::new();
        queue.push_back(from.clone());

        while let Some(class) = queue.pop_front() {
            if &class == to {
                let mut path = vec![class.clone()];
                let mut cursor = class;
                while let Some(prev) = came_from.get(&cursor) {
                    path.push(prev.clone());
                    cursor = prev.clone();
                }
                path.reverse();
                return Some(path);
            }
            for parent in self.direct_parents(class.as_str()) {
                if &parent != from && !came_from.contains_key(&parent) {
                    came_from.insert(parent.clone(), class.clone());
                    queue.push_back(parent);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ClassHierarchy {
        let mut h = ClassHierarchy::new();
        h.register(ClassDef::new("A", Vec::<&str>::new())).unwrap();
        h.register(ClassDef::new("B", ["A"])).unwrap();
        h.register(ClassDef::new("C", ["B"])).unwrap();
        h
    }

    #[test]
    fn distances_along_a_chain() {
        let h = chain();
        assert_eq!(h.distance("C", "A"), Some(2));
        assert_eq!(h.distance("C", "B"), Some(1));
        assert_eq!(h.distance("C", "C"), Some(0));
        assert_eq!(h.distance("A", "C"), None);
        assert!(h.is_ancestor("C", "A"));
        assert!(!h.is_ancestor("A", "C"));
    }

    #[test]
    fn minimum_over_multiple_paths() {
        // D -> B -> A and D -> A directly.
        let mut h = chain();
        h.register(ClassDef::new("D", ["C", "A"])).unwrap();
        assert_eq!(h.distance("D", "A"), Some(1));
        assert_eq!(h.distance("D", "B"), Some(2));
    }

    #[test]
    fn unregistered_classes_have_no_parents() {
        let h = chain();
        assert_eq!(h.distance("numeric", "numeric"), Some(0));
        assert_eq!(h.distance("numeric", "A"), None);
        assert!(h.direct_parents("numeric").is_empty());
    }

    #[test]
    fn cycle_rejected_and_registry_unchanged() {
        let mut h = chain();
        let before = h.get("A").cloned();
        let err = h.register(ClassDef::new("A", ["C"])).unwrap_err();
        match err {
            DispatchError::Cycle { class, cycle_path } => {
                assert_eq!(class.as_str(), "A");
                let names: Vec<&str> = cycle_path.iter().map(|c| c.as_str()).collect();
                assert_eq!(names, vec!["A", "C", "B", "A"]);
            }
            other => panic!("expected Cycle, got {:?}", other),
        }
        assert_eq!(h.get("A").cloned(), before);
        assert_eq!(h.distance("A", "C"), None);
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let mut h = ClassHierarchy::new();
        let err = h.register(ClassDef::new("Loop", ["Loop"])).unwrap_err();
        assert!(matches!(err, DispatchError::Cycle { .. }));
        assert!(h.is_empty());
    }

    #[test]
    fn redefinition_returns_previous_and_keeps_id() {
        let mut h = chain();
        let first = h.get("C").unwrap().id;
        let registered = h.register(ClassDef::new("C", ["A"])).unwrap();
        assert_eq!(registered.id, first);
        let previous = registered.previous.expect("previous definition");
        assert_eq!(previous.parents, vec![ClassName::from("B")]);
        assert_eq!(h.distance("C", "A"), Some(1));
        assert_eq!(h.distance("C", "B"), None);
    }

    #[test]
    fn sealed_class_rejects_redefinition() {
        let mut h = ClassHierarchy::new();
        h.register(ClassDef::new("Base", Vec::<&str>::new()).sealed()).unwrap();
        let err = h.register(ClassDef::new("Base", ["Other"])).unwrap_err();
        assert_eq!(
            err,
            DispatchError::SealedClass {
                class: "Base".into()
            }
        );
        assert!(h.get("Base").unwrap().parents.is_empty());
    }

    #[test]
    fn reserved_names_rejected() {
        let mut h = ClassHierarchy::new();
        assert!(matches!(
            h.register(ClassDef::new("ANY", Vec::<&str>::new())),
            Err(DispatchError::ReservedClassName { .. })
        ));
        assert!(matches!(
            h.register_union("missing", ["A"]),
            Err(DispatchError::ReservedClassName { .. })
        ));
    }

    #[test]
    fn union_members_extend_the_union() {
        let mut h = ClassHierarchy::new();
        h.register(ClassDef::new("integer", Vec::<&str>::new()).sealed()).unwrap();
        h.register_union("Numberish", ["integer", "numeric"]).unwrap();
        assert_eq!(h.distance("integer", "Numberish"), Some(1));
        assert_eq!(h.distance("numeric", "Numberish"), Some(1));
        assert!(h.get("Numberish").unwrap().is_union);
        assert_eq!(
            h.union_members("Numberish"),
            vec![ClassName::from("integer"), ClassName::from("numeric")]
        );
    }

    #[test]
    fn union_redefinition_replaces_members() {
        let mut h = ClassHierarchy::new();
        h.register_union("U", ["a", "b"]).unwrap();
        h.register_union("U", ["c"]).unwrap();
        assert_eq!(h.distance("a", "U"), None);
        assert_eq!(h.distance("c", "U"), Some(1));
    }

    #[test]
    fn union_cycle_rejected() {
        let mut h = ClassHierarchy::new();
        h.register_union("U", ["A"]).unwrap();
        h.register_union("V", ["U"]).unwrap();
        let err = h.register_union("A", ["V"]).unwrap_err();
        match err {
            DispatchError::Cycle { cycle_path, .. } => {
                let names: Vec<&str> = cycle_path.iter().map(|c| c.as_str()).collect();
                assert_eq!(names, vec!["A", "U", "V", "A"]);
            }
            other => panic!("expected Cycle, got {:?}", other),
        }
        assert!(!h.contains("A"));
        assert_eq!(h.distance("A", "V"), Some(2));
        assert_eq!(h.distance("V", "A"), None);
    }

    #[test]
    fn ancestors_sorted_by_distance_then_name() {
        let mut h = chain();
        h.register(ClassDef::new("Mixin", Vec::<&str>::new())).unwrap();
        h.register(ClassDef::new("D", ["C", "Mixin"])).unwrap();
        let names: Vec<(String, u32)> = h
            .ancestors("D")
            .into_iter()
            .map(|(c, d)| (c.to_string(), d))
            .collect();
        assert_eq!(
            names,
            vec![
                ("C".to_string(), 1),
                ("Mixin".to_string(), 1),
                ("B".to_string(), 2),
                ("A".to_string(), 3),
            ]
        );
    }
}
