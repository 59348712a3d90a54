use im::HashSet;
use nohash_hasher::BuildNoHashHasher;

use crate::interpreter::symbols::SymbolId;
use crate::interpreter::value::{TraitTag, TypeTag, Value};

type Bindings = im::HashMap<SymbolId, Value, BuildNoHashHasher<SymbolId>>;
type Traits = im::HashMap<TypeTag, HashSet<TraitTag>>;

/// Variable bindings plus the per-type trait registry active during
/// evaluation. Every scope entered via `let` or closure application owns an
/// independent copy of both maps, so child-scope mutation is never visible
/// to the parent; the maps are persistent, so a copy shares structure and
/// costs O(changed entries) rather than O(scope size). The single exception
/// to isolation is `impl`, which mutates the environment object it is
/// evaluated against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    bindings: Bindings,
    traits: Traits,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// An independent copy of both maps for a child scope. Structural
    /// sharing makes this cheap; copy-on-write keeps it isolated.
    pub(crate) fn child_scope(&self) -> Self {
        self.clone()
    }

    pub(crate) fn bind(&mut self, id: SymbolId, value: Value) {
        self.bindings.insert(id, value);
    }

    pub fn lookup(&self, id: SymbolId) -> Option<&Value> {
        self.bindings.get(&id)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (SymbolId, &Value)> {
        self.bindings.iter().map(|(id, value)| (*id, value))
    }

    pub(crate) fn retain_bindings<F>(&mut self, mut keep: F)
    where
        F: FnMut(SymbolId, &Value) -> bool,
    {
        self.bindings.retain(|id, value| keep(*id, value));
    }

    /// Registers `capability` for `tag` in place. Idempotent.
    pub(crate) fn register_trait(&mut self, tag: TypeTag, capability: TraitTag) {
        self.traits
            .entry(tag)
            .or_insert_with(HashSet::new)
            .insert(capability);
    }

    pub fn traits_of(&self, tag: TypeTag) -> Option<&HashSet<TraitTag>> {
        self.traits.get(&tag)
    }

    pub fn has_trait(&self, tag: TypeTag, capability: TraitTag) -> bool {
        self.traits_of(tag)
            .is_some_and(|set| set.contains(&capability))
    }

    /// Merges the calling scope into a scope cloned from a closure's
    /// captured environment. On collision the captured side wins, for
    /// bindings and trait sets both: lexical scope beats the caller's
    /// dynamic scope.
    pub(crate) fn merge_caller(&mut self, caller: &Environment) {
        for (id, value) in &caller.bindings {
            self.bindings.entry(*id).or_insert_with(|| value.clone());
        }
        for (tag, set) in &caller.traits {
            self.traits.entry(*tag).or_insert_with(|| set.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::value::{Entity, TraitTag, TypeTag, Value};

    use super::Environment;

    #[test]
    fn child_scope_is_structurally_independent() {
        let mut parent = Environment::new();
        parent.bind(100, Value::Entity(Entity::integer(1)));
        parent.register_trait(TypeTag::Noun, TraitTag::Numeric);

        let mut child = parent.child_scope();
        child.bind(101, Value::Entity(Entity::integer(2)));
        child.register_trait(TypeTag::Noun, TraitTag::Relatable);
        child.register_trait(TypeTag::Verb, TraitTag::Printable);

        assert!(parent.lookup(101).is_none());
        assert!(!parent.has_trait(TypeTag::Noun, TraitTag::Relatable));
        assert!(parent.traits_of(TypeTag::Verb).is_none());
        assert!(child.lookup(100).is_some());
        assert!(child.has_trait(TypeTag::Noun, TraitTag::Numeric));
    }

    #[test]
    fn rebinding_in_a_child_leaves_the_parent_value() {
        let mut parent = Environment::new();
        parent.bind(100, Value::Entity(Entity::integer(1)));

        let mut child = parent.child_scope();
        child.bind(100, Value::Entity(Entity::integer(2)));

        assert_eq!(
            parent.lookup(100),
            Some(&Value::Entity(Entity::integer(1)))
        );
        assert_eq!(
            child.lookup(100),
            Some(&Value::Entity(Entity::integer(2)))
        );
    }

    #[test]
    fn trait_registration_is_idempotent() {
        let mut env = Environment::new();

        env.register_trait(TypeTag::Noun, TraitTag::Relatable);
        env.register_trait(TypeTag::Noun, TraitTag::Relatable);

        assert_eq!(env.traits_of(TypeTag::Noun).unwrap().len(), 1);
    }

    #[test]
    fn merge_caller_prefers_captured_side() {
        let mut captured = Environment::new();
        captured.bind(100, Value::Entity(Entity::integer(1)));
        captured.register_trait(TypeTag::Noun, TraitTag::Numeric);

        let mut caller = Environment::new();
        caller.bind(100, Value::Entity(Entity::integer(9)));
        caller.bind(200, Value::Entity(Entity::integer(2)));
        caller.register_trait(TypeTag::Noun, TraitTag::Relatable);
        caller.register_trait(TypeTag::Verb, TraitTag::Printable);

        let mut scope = captured.child_scope();
        scope.merge_caller(&caller);

        assert_eq!(scope.lookup(100), Some(&Value::Entity(Entity::integer(1))));
        assert_eq!(scope.lookup(200), Some(&Value::Entity(Entity::integer(2))));
        assert!(scope.has_trait(TypeTag::Noun, TraitTag::Numeric));
        assert!(!scope.has_trait(TypeTag::Noun, TraitTag::Relatable));
        assert!(scope.has_trait(TypeTag::Verb, TraitTag::Printable));
    }
}
