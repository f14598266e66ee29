//! The object tree: type hierarchy, proc table, and global variable list
//! built by `CodeTreeBuilder` and queried by the two compilers (§3, §4.3).

pub mod builtins;

use ahash::AHashMap;
use bitflags::bitflags;

use crate::{
    ast::StmtNode,
    intern::{StringId, StringTable},
    location::SourceLocation,
    path::{Path, PathRoot},
    value::{Constant, ComplexValueType},
};

pub use builtins::BuiltinRegistry;

bitflags! {
    /// Closed set of proc modifiers (§9 supplement); byte values match the
    /// reference toolchain's `ProcAttributes` for wire compatibility with
    /// tooling that inspects emitted metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct ProcAttributes: u8 {
        const HIDDEN = 1 << 0;
        const BACKGROUND = 1 << 1;
        const WAITFOR = 1 << 2;
        const POPUP = 1 << 3;
        const INSTANT = 1 << 4;
        const OVERRIDE = 1 << 5;
        const VARIADIC = 1 << 6;
    }

    /// What a verb can be invoked on, derived from its `set src = ...` line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct VerbSrc: u16 {
        const MOB = 1 << 0;
        const MOB_CONTENTS = 1 << 1;
        const MOB_GROUP = 1 << 2;
        const WORLD = 1 << 3;
        const OBJ_CONTENTS = 1 << 4;
        const TURF_CONTENTS = 1 << 5;
        const VIEW = 1 << 6;
        const OVIEW = 1 << 7;
        const IN_WORLD = 1 << 8;
    }
}

pub type ObjectId = usize;
pub type ProcId = usize;

/// A declared variable: its type constraint plus an optional constant
/// initializer serialized for the emitted artifact (§6.5).
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub type_path: Option<Path>,
    pub explicit_value_type: Option<ComplexValueType>,
    pub initializer: Option<Constant>,
    pub is_const: bool,
    pub is_final: bool,
    pub is_tmp: bool,
}

/// A local variable or parameter registered inside one proc.
#[derive(Debug, Clone)]
pub struct LocalVariable {
    pub name: String,
    pub id: u8,
    pub is_parameter: bool,
    pub type_path: Option<Path>,
    pub explicit_value_type: Option<ComplexValueType>,
}

/// A local bound to a compile-time constant (`var/const/x = 5` inside a
/// proc body); the expression compiler substitutes the constant directly
/// instead of emitting a `Local` reference read.
#[derive(Debug, Clone)]
pub struct LocalConstVariable {
    pub base: LocalVariable,
    pub value: Constant,
}

#[derive(Debug, Clone, Default)]
pub struct VerbMetadata {
    pub src: Option<VerbSrc>,
    pub attributes: AHashMap<String, (String, Option<bool>)>,
}

/// One compiled (or compiling) proc. `body` borrows the AST owned by the
/// `File` that was fed to the code-tree builder; the object tree may not
/// outlive it.
pub struct DMProc<'ast> {
    pub id: ProcId,
    pub name: String,
    pub owner: ObjectId,
    pub is_verb: bool,
    pub is_final: bool,
    pub attributes: ProcAttributes,
    pub parameters: Vec<String>,
    pub locals: AHashMap<String, LocalVariable>,
    pub local_consts: AHashMap<String, LocalConstVariable>,
    pub global_refs: AHashMap<String, i32>,
    pub bytecode: Vec<u8>,
    pub max_stack: i32,
    pub body: &'ast [StmtNode],
    pub source_location: SourceLocation,
    pub unsupported_reason: Option<String>,
    pub verb_metadata: Option<VerbMetadata>,
    enumerator_counter: u32,
    local_counter: u16,
}

impl<'ast> DMProc<'ast> {
    /// Creates an empty proc ready to receive locals and bytecode.
    #[must_use]
    pub fn new(id: ProcId, name: String, owner: ObjectId, body: &'ast [StmtNode], source_location: SourceLocation) -> Self {
        Self {
            id,
            name,
            owner,
            is_verb: false,
            is_final: false,
            attributes: ProcAttributes::empty(),
            parameters: Vec::new(),
            locals: AHashMap::new(),
            local_consts: AHashMap::new(),
            global_refs: AHashMap::new(),
            bytecode: Vec::new(),
            max_stack: 0,
            body,
            source_location,
            unsupported_reason: None,
            verb_metadata: None,
            enumerator_counter: 0,
            local_counter: 0,
        }
    }

    #[must_use]
    pub fn next_enumerator_id(&mut self) -> u32 {
        let id = self.enumerator_counter;
        self.enumerator_counter += 1;
        id
    }

    /// Registers a new local at the next dense id.
    ///
    /// # Errors
    /// Returns the overflowed count if more than 256 locals/parameters are
    /// registered in one proc — the `Local`/`Argument` reference payload
    /// is a single byte (§3).
    pub fn register_local(&mut self, local: LocalVariable) -> Result<(), u16> {
        if self.local_counter >= 256 {
            return Err(self.local_counter);
        }
        self.local_counter += 1;
        self.locals.insert(local.name.clone(), local);
        Ok(())
    }

    #[must_use]
    pub fn local_count(&self) -> u16 {
        self.local_counter
    }
}

/// A type definition. Created on demand the first time its path is
/// referenced; mutated only while the tree is being built.
pub struct DMObject {
    pub id: ObjectId,
    pub path: Path,
    pub parent: Option<ObjectId>,
    pub procs: AHashMap<String, Vec<ProcId>>,
    pub instance_vars: AHashMap<String, Variable>,
    pub global_var_indices: AHashMap<String, usize>,
    pub variable_overrides: AHashMap<String, Variable>,
    pub tmp_vars: std::collections::HashSet<String>,
    pub const_vars: std::collections::HashSet<String>,
    pub initialization_proc_id: Option<ProcId>,
}

/// Root type paths whose parent is materialized automatically when a
/// descendant type is first referenced (§3).
const BUILTIN_PARENTS: &[(&str, &str)] = &[
    ("/datum", "/"),
    ("/atom", "/datum"),
    ("/obj", "/atom"),
    ("/mob", "/atom"),
    ("/turf", "/atom"),
    ("/area", "/atom"),
    ("/client", "/datum"),
    ("/list", "/datum"),
    ("/savefile", "/datum"),
    ("/sound", "/datum"),
    ("/image", "/datum"),
    ("/icon", "/datum"),
    ("/matrix", "/datum"),
    ("/regex", "/datum"),
    ("/world", "/datum"),
];

/// Owns every type, proc, global, and interned string produced while
/// compiling one file (§3). Not thread-safe; callers compiling several
/// files in parallel use one tree per file.
pub struct ObjectTree<'ast> {
    pub all_objects: Vec<DMObject>,
    pub all_procs: Vec<DMProc<'ast>>,
    pub globals: Vec<Variable>,
    pub global_procs: AHashMap<String, ProcId>,
    pub strings: StringTable,
    pub resources: std::collections::BTreeSet<String>,
    path_index: AHashMap<String, ObjectId>,
}

impl<'ast> ObjectTree<'ast> {
    #[must_use]
    pub fn new() -> Self {
        let mut tree = Self {
            all_objects: Vec::new(),
            all_procs: Vec::new(),
            globals: Vec::new(),
            global_procs: AHashMap::new(),
            strings: StringTable::new(),
            resources: std::collections::BTreeSet::new(),
            path_index: AHashMap::new(),
        };
        tree.get_or_create(&Path::root());
        tree
    }

    fn path_key(path: &Path) -> String {
        path.to_string()
    }

    /// Materializes `path` and every built-in ancestor it needs,
    /// returning the (possibly freshly created) object id.
    pub fn get_or_create(&mut self, path: &Path) -> ObjectId {
        let key = Self::path_key(path);
        if let Some(&id) = self.path_index.get(&key) {
            return id;
        }

        let parent = self.resolve_parent(path);
        let id = self.all_objects.len();
        self.all_objects.push(DMObject {
            id,
            path: path.clone(),
            parent,
            procs: AHashMap::new(),
            instance_vars: AHashMap::new(),
            global_var_indices: AHashMap::new(),
            variable_overrides: AHashMap::new(),
            tmp_vars: std::collections::HashSet::new(),
            const_vars: std::collections::HashSet::new(),
            initialization_proc_id: None,
        });
        self.path_index.insert(key, id);
        id
    }

    fn resolve_parent(&mut self, path: &Path) -> Option<ObjectId> {
        if path.root != PathRoot::Absolute || path.segments.is_empty() {
            return None;
        }
        let full = path.to_string();
        for &(child, parent) in BUILTIN_PARENTS {
            if full == child {
                return Some(self.get_or_create(&Path::parse(parent)));
            }
        }
        if path.segments.len() == 1 {
            return Some(self.get_or_create(&Path::root()));
        }
        Some(self.get_or_create(&path.without_last_segment()))
    }

    #[must_use]
    pub fn find(&self, path: &Path) -> Option<ObjectId> {
        self.path_index.get(&Self::path_key(path)).copied()
    }

    pub fn intern(&mut self, s: &str) -> StringId {
        self.strings.intern(s)
    }

    /// Appends a global variable, returning its dense index.
    pub fn create_global(&mut self, var: Variable) -> usize {
        let index = self.globals.len();
        self.globals.push(var);
        index
    }

    /// Walks from `object_id` toward the root looking up an instance
    /// variable by name, honoring overrides at the most-derived type that
    /// declares one.
    #[must_use]
    pub fn get_variable(&self, object_id: ObjectId, name: &str) -> Option<&Variable> {
        let mut current = Some(object_id);
        while let Some(id) = current {
            let object = &self.all_objects[id];
            if let Some(var) = object.variable_overrides.get(name) {
                return Some(var);
            }
            if let Some(var) = object.instance_vars.get(name) {
                return Some(var);
            }
            current = object.parent;
        }
        None
    }

    /// Walks from `object_id` toward the root looking up a proc by name;
    /// returns the most-derived definition's id (last in the override
    /// chain, as populated by the code-tree builder).
    #[must_use]
    pub fn get_proc(&self, object_id: ObjectId, name: &str) -> Option<ProcId> {
        let mut current = Some(object_id);
        while let Some(id) = current {
            let object = &self.all_objects[id];
            if let Some(ids) = object.procs.get(name) {
                if let Some(&last) = ids.last() {
                    return Some(last);
                }
            }
            current = object.parent;
        }
        None
    }

    #[must_use]
    pub fn is_descendant_of(&self, object_id: ObjectId, ancestor: ObjectId) -> bool {
        let mut current = Some(object_id);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.all_objects[id].parent;
        }
        false
    }
}

impl<'ast> Default for ObjectTree<'ast> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_hierarchy_materializes_transitively() {
        let mut tree = ObjectTree::new();
        let mob = tree.get_or_create(&Path::parse("/mob"));
        let atom = tree.find(&Path::parse("/atom")).unwrap();
        let datum = tree.find(&Path::parse("/datum")).unwrap();
        let root = tree.find(&Path::root()).unwrap();
        assert_eq!(tree.all_objects[mob].parent, Some(atom));
        assert_eq!(tree.all_objects[atom].parent, Some(datum));
        assert_eq!(tree.all_objects[datum].parent, Some(root));
    }

    #[test]
    fn custom_type_inherits_from_its_enclosing_path() {
        let mut tree = ObjectTree::new();
        let player = tree.get_or_create(&Path::parse("/mob/player"));
        let mob = tree.find(&Path::parse("/mob")).unwrap();
        assert_eq!(tree.all_objects[player].parent, Some(mob));
    }

    #[test]
    fn get_variable_walks_to_ancestor() {
        let mut tree = ObjectTree::new();
        let mob = tree.get_or_create(&Path::parse("/mob"));
        let player = tree.get_or_create(&Path::parse("/mob/player"));
        tree.all_objects[mob].instance_vars.insert(
            "health".to_string(),
            Variable {
                name: "health".to_string(),
                type_path: None,
                explicit_value_type: None,
                initializer: None,
                is_const: false,
                is_final: false,
                is_tmp: false,
            },
        );
        assert!(tree.get_variable(player, "health").is_some());
    }
}
