use std::{collections::HashMap, rc::Rc};

use nohash_hasher::IntMap;

pub type SymbolId = i32;

// Core form heads.
pub(crate) const ENTITY_ID: SymbolId = 0;
pub(crate) const LIST_ID: SymbolId = 1;
pub(crate) const ADD_ID: SymbolId = 2;
pub(crate) const LET_ID: SymbolId = 3;
pub(crate) const IMPL_ID: SymbolId = 4;
pub(crate) const LAMBDA_ID: SymbolId = 5;
pub(crate) const MAP_ID: SymbolId = 6;

// Grammar markers.
pub(crate) const BE_ID: SymbolId = 7;
pub(crate) const FOR_ID: SymbolId = 8;
pub(crate) const AS_ID: SymbolId = 9;
pub(crate) const RETURNS_ID: SymbolId = 10;
pub(crate) const SELF_ID: SymbolId = 11;

// Structural sugar heads.
pub(crate) const SUBJECT_ID: SymbolId = 12;
pub(crate) const OBJECT_ID: SymbolId = 13;

// Reserved attribute keys.
pub(crate) const ROLE_ID: SymbolId = 14;
pub(crate) const ADJECTIVE_KEY_ID: SymbolId = 15;

// Type tag names.
pub(crate) const NOUN_ID: SymbolId = 16;
pub(crate) const VERB_ID: SymbolId = 17;
pub(crate) const TIME_ID: SymbolId = 18;
pub(crate) const ADVERB_ID: SymbolId = 19;
pub(crate) const STRING_ID: SymbolId = 20;
pub(crate) const INTEGER_ID: SymbolId = 21;
pub(crate) const FLOAT_ID: SymbolId = 22;
pub(crate) const BOOLEAN_ID: SymbolId = 23;
pub(crate) const PRONOUN_ID: SymbolId = 24;
pub(crate) const PREPOSITION_ID: SymbolId = 25;
pub(crate) const ADJECTIVE_ID: SymbolId = 26;
pub(crate) const ERROR_ID: SymbolId = 27;
pub(crate) const LAMBDA_TYPE_ID: SymbolId = 28;

/// Interns every symbol and keyword once, handing out dense ids so that
/// environments and attribute maps can be keyed by integer.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    id_map: HashMap<Rc<String>, SymbolId>,
    name_map: IntMap<SymbolId, Rc<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let id_map = HashMap::from([
            (Rc::new("entity".to_string()), ENTITY_ID),
            (Rc::new("list".to_string()), LIST_ID),
            (Rc::new("add".to_string()), ADD_ID),
            (Rc::new("let".to_string()), LET_ID),
            (Rc::new("impl".to_string()), IMPL_ID),
            (Rc::new("lambda".to_string()), LAMBDA_ID),
            (Rc::new("map".to_string()), MAP_ID),
            (Rc::new("be".to_string()), BE_ID),
            (Rc::new("for".to_string()), FOR_ID),
            (Rc::new("as".to_string()), AS_ID),
            (Rc::new("returns".to_string()), RETURNS_ID),
            (Rc::new("self".to_string()), SELF_ID),
            (Rc::new("Subject".to_string()), SUBJECT_ID),
            (Rc::new("Object".to_string()), OBJECT_ID),
            (Rc::new("role".to_string()), ROLE_ID),
            (Rc::new("adjective".to_string()), ADJECTIVE_KEY_ID),
            (Rc::new("Noun".to_string()), NOUN_ID),
            (Rc::new("Verb".to_string()), VERB_ID),
            (Rc::new("Time".to_string()), TIME_ID),
            (Rc::new("Adverb".to_string()), ADVERB_ID),
            (Rc::new("String".to_string()), STRING_ID),
            (Rc::new("Integer".to_string()), INTEGER_ID),
            (Rc::new("Float".to_string()), FLOAT_ID),
            (Rc::new("Boolean".to_string()), BOOLEAN_ID),
            (Rc::new("Pronoun".to_string()), PRONOUN_ID),
            (Rc::new("Preposition".to_string()), PREPOSITION_ID),
            (Rc::new("Adjective".to_string()), ADJECTIVE_ID),
            (Rc::new("Error".to_string()), ERROR_ID),
            (Rc::new("Lambda".to_string()), LAMBDA_TYPE_ID),
        ]);

        let mut name_map = IntMap::default();
        for (name, id) in &id_map {
            name_map.insert(*id, Rc::clone(name));
        }

        Self { id_map, name_map }
    }

    pub(crate) fn get_id(&mut self, name: &str) -> SymbolId {
        if let Some(id) = self.id_map.get(&name.to_string()) {
            return *id;
        }

        let id = self.id_map.len() as SymbolId;
        let name = Rc::new(name.to_string());
        self.id_map.insert(Rc::clone(&name), id);
        self.name_map.insert(id, name);

        id
    }

    /// Resolves a name without interning it.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.id_map.get(&name.to_string()).copied()
    }

    pub fn name(&self, id: SymbolId) -> &str {
        self.name_map
            .get(&id)
            .map(|name| name.as_str())
            .unwrap_or("<unknown symbol>")
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids_resolve() {
        let symbols = SymbolTable::new();

        assert_eq!(symbols.lookup("entity"), Some(ENTITY_ID));
        assert_eq!(symbols.lookup("lambda"), Some(LAMBDA_ID));
        assert_eq!(symbols.name(ROLE_ID), "role");
    }

    #[test]
    fn interning_is_stable() {
        let mut symbols = SymbolTable::new();

        let first = symbols.get_id("dog");
        let second = symbols.get_id("dog");
        let other = symbols.get_id("cat");

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(symbols.name(first), "dog");
    }

    #[test]
    fn lookup_does_not_intern() {
        let symbols = SymbolTable::new();

        assert_eq!(symbols.lookup("never-seen"), None);
    }
}
