//! The built-in procedure, variable, and type catalog (§4.3).
//!
//! Process-wide and read-only once built: every `ObjectTree` shares the
//! same facts about what `/atom.x` or `sin()` mean, so the registry is
//! constructed once and handed around by reference.

use ahash::AHashMap;

use crate::value::ValueType;

#[derive(Debug, Clone)]
pub struct BuiltinProcSignature {
    pub parameters: Vec<&'static str>,
    pub return_value_type: ValueType,
    pub variadic: bool,
}

fn sig(parameters: &[&'static str], return_value_type: ValueType, variadic: bool) -> BuiltinProcSignature {
    BuiltinProcSignature { parameters: parameters.to_vec(), return_value_type, variadic }
}

/// Process-wide catalog of DM's built-in procs, variables, and context
/// names. Immutable after construction; every read may be shared freely.
pub struct BuiltinRegistry {
    global_procs: AHashMap<&'static str, BuiltinProcSignature>,
    type_procs: AHashMap<&'static str, AHashMap<&'static str, BuiltinProcSignature>>,
    type_vars: AHashMap<&'static str, AHashMap<&'static str, ValueType>>,
    parents: AHashMap<&'static str, &'static str>,
}

/// Context names resolved directly by the expression compiler without
/// consulting the registry's type/proc tables (§4.5).
pub const CONTEXT_VARIABLES: &[&str] = &["src", "usr", "args", "world", "global", ".", ".."];

impl BuiltinRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut global_procs = AHashMap::new();
        global_procs.insert("abs", sig(&["value"], ValueType::NUM, false));
        global_procs.insert("sin", sig(&["x"], ValueType::NUM, false));
        global_procs.insert("cos", sig(&["x"], ValueType::NUM, false));
        global_procs.insert("sqrt", sig(&["x"], ValueType::NUM, false));
        global_procs.insert("rand", sig(&["low", "high"], ValueType::NUM, true));
        global_procs.insert(
            "pick",
            sig(&["value_list_or_args"], ValueType::ANYTHING, true),
        );
        global_procs.insert("locate", sig(&["x", "y", "z"], ValueType::ANYTHING, true));
        global_procs.insert("input", sig(&["user", "message", "title"], ValueType::ANYTHING, true));
        global_procs.insert("istype", sig(&["value", "type"], ValueType::NUM, true));
        global_procs.insert("length", sig(&["value"], ValueType::NUM, false));
        global_procs.insert("rgb", sig(&["r", "g", "b", "a"], ValueType::TEXT, true));
        global_procs.insert("prob", sig(&["percent"], ValueType::NUM, false));
        global_procs.insert("get_dir", sig(&["loc1", "loc2"], ValueType::NUM, false));
        global_procs.insert("get_step", sig(&["ref", "dir"], ValueType::ANYTHING, false));
        global_procs.insert("sleep", sig(&["delay"], ValueType::ANYTHING, false));
        global_procs.insert("spawn", sig(&["delay"], ValueType::ANYTHING, true));
        global_procs.insert("json_encode", sig(&["value"], ValueType::TEXT, false));

        let mut type_procs: AHashMap<&'static str, AHashMap<&'static str, BuiltinProcSignature>> = AHashMap::new();
        let mut atom_procs = AHashMap::new();
        atom_procs.insert("Bump", sig(&["obstacle"], ValueType::ANYTHING, false));
        atom_procs.insert("Cross", sig(&["mover"], ValueType::NUM, false));
        type_procs.insert("/atom", atom_procs);

        let mut type_vars: AHashMap<&'static str, AHashMap<&'static str, ValueType>> = AHashMap::new();
        let mut atom_vars = AHashMap::new();
        atom_vars.insert("x", ValueType::NUM);
        atom_vars.insert("y", ValueType::NUM);
        atom_vars.insert("z", ValueType::NUM);
        atom_vars.insert("icon", ValueType::ICON);
        atom_vars.insert("icon_state", ValueType::TEXT);
        atom_vars.insert("dir", ValueType::NUM);
        type_vars.insert("/atom", atom_vars);
        let mut world_vars = AHashMap::new();
        world_vars.insert("tick_lag", ValueType::NUM);
        world_vars.insert("name", ValueType::TEXT);
        type_vars.insert("/world", world_vars);
        let mut list_vars = AHashMap::new();
        list_vars.insert("len", ValueType::NUM);
        type_vars.insert("/list", list_vars);
        let mut mob_vars = AHashMap::new();
        mob_vars.insert("key", ValueType::TEXT);
        mob_vars.insert("client", ValueType::ANYTHING);
        type_vars.insert("/mob", mob_vars);

        let parents = AHashMap::from_iter([
            ("/atom", "/datum"),
            ("/obj", "/atom"),
            ("/mob", "/atom"),
            ("/turf", "/atom"),
            ("/area", "/atom"),
        ]);

        Self { global_procs, type_procs, type_vars, parents }
    }

    #[must_use]
    pub fn global_proc(&self, name: &str) -> Option<&BuiltinProcSignature> {
        self.global_procs.get(name)
    }

    /// Walks `type_path` (e.g. `/mob/player`) up through registered
    /// ancestors looking for a built-in proc signature.
    #[must_use]
    pub fn type_proc(&self, type_path: &str, name: &str) -> Option<&BuiltinProcSignature> {
        self.walk_type(type_path, |root| self.type_procs.get(root).and_then(|m| m.get(name)))
    }

    #[must_use]
    pub fn type_var(&self, type_path: &str, name: &str) -> Option<ValueType> {
        self.walk_type(type_path, |root| self.type_vars.get(root).and_then(|m| m.get(name)).copied())
    }

    fn walk_type<T>(&self, type_path: &str, lookup: impl Fn(&str) -> Option<T>) -> Option<T> {
        let root = Self::builtin_root(type_path);
        let mut current = root;
        loop {
            if let Some(found) = lookup(current) {
                return Some(found);
            }
            current = self.parents.get(current).copied()?;
        }
    }

    /// Reduces a user type path (`/mob/player/zombie`) to the nearest
    /// registered built-in root (`/mob`) the registry actually knows about.
    fn builtin_root(type_path: &str) -> &str {
        for candidate in ["/client", "/list", "/savefile", "/sound", "/image", "/icon", "/matrix", "/regex", "/world"]
        {
            if type_path == candidate {
                return candidate;
            }
        }
        for candidate in ["/obj", "/mob", "/turf", "/area", "/atom", "/datum"] {
            if type_path == candidate || type_path.starts_with(&format!("{candidate}/")) {
                return candidate;
            }
        }
        type_path
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}
