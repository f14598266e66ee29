//! AST to `ObjectTree` population: types, instance/global variables, and
//! proc shells whose AST bodies are borrowed back for later compilation
//! (§2 P2, §4.3).
//!
//! One recursive walk over the top-level statement list, threading the
//! absolute path of the enclosing type as it descends into nested
//! object-definition blocks — grounded on the original `CodeTreeBuilder`'s
//! `ProcessStatement`. A `var`/`proc`/`verb` path segment never becomes a
//! type of its own; the parser is expected to have already stripped any
//! such segment and handed proc definitions directly to the body of the
//! `Definition` that owns them, so by the time a `ProcDefinition` or
//! `VarDefinition` leaf is reached here, `current` already names its owner.

use ahash::AHashMap;

use crate::{
    ast::{top::ParamDecl, AssignmentOperator, Declarator, Expr, ExprNode, File, ObjectStmt, ObjectStmtNode, Stmt, StmtNode},
    diagnostics::{DiagnosticKind, Diagnostics},
    location::SourceLocation,
    object_tree::{DMProc, LocalVariable, ObjectId, ObjectTree, Variable},
    path::{Path, PathRoot, VarModifierFlags},
    value::Constant,
};

/// A type's non-constant instance-var initializers are synthesized into a
/// small assignment proc rather than serialized into the emitted artifact
/// (only constants round-trip through `try_as_json`, §3).
const INIT_PROC_NAME: &str = "<var-init>";

pub struct CodeTreeBuilder<'t, 'ast> {
    tree: &'t mut ObjectTree<'ast>,
    diagnostics: &'t mut Diagnostics,
    pending_initializers: Vec<(ObjectId, String, ExprNode)>,
}

impl<'t, 'ast> CodeTreeBuilder<'t, 'ast> {
    pub fn new(tree: &'t mut ObjectTree<'ast>, diagnostics: &'t mut Diagnostics) -> Self {
        Self { tree, diagnostics, pending_initializers: Vec::new() }
    }

    /// Walks every top-level statement in `file`, populating the object
    /// tree with types, variables, and proc shells, then synthesizes each
    /// type's initialization proc for non-constant instance-var
    /// initializers.
    pub fn build(&mut self, file: &'ast File) {
        let root = Path::root();
        for stmt in &file.statements {
            self.process(stmt, &root);
        }
        self.create_initialization_procs();
    }

    fn process(&mut self, stmt: &'ast ObjectStmtNode, current: &Path) {
        match &stmt.kind {
            ObjectStmt::Definition { path, body } => self.process_definition(path, body, current),
            ObjectStmt::VarDefinition(declarator) => self.process_var_definition(declarator, current),
            ObjectStmt::VarOverride { name, value } => self.process_var_override(name, value, current, stmt.location),
            ObjectStmt::ProcDefinition { name, is_verb, is_final, params, body } => {
                self.process_proc_definition(name, *is_verb, *is_final, params, body, current, stmt.location);
            }
        }
    }

    fn process_definition(&mut self, path: &Path, body: &'ast [ObjectStmtNode], current: &Path) {
        let absolute = current.combine(path);

        // A trailing `var` segment opens a var sub-block: its inner
        // statements are variable declarations scoped to the *parent*
        // type, not a nested type literally named `var`.
        if absolute.last_segment() == Some("var") {
            let inner = absolute.without_last_segment();
            self.tree.get_or_create(&inner);
            for inner_stmt in body {
                self.process(inner_stmt, &inner);
            }
            return;
        }

        self.tree.get_or_create(&absolute);
        for inner_stmt in body {
            self.process(inner_stmt, &absolute);
        }
    }

    fn process_var_definition(&mut self, declarator: &'ast Declarator, current: &Path) {
        let owner = self.tree.get_or_create(current);
        let is_global = declarator.modifiers.intersects(VarModifierFlags::GLOBAL | VarModifierFlags::STATIC);
        let is_const = declarator.modifiers.contains(VarModifierFlags::CONST);
        let is_final = declarator.modifiers.contains(VarModifierFlags::FINAL);
        let is_tmp = declarator.modifiers.contains(VarModifierFlags::TMP);

        let initializer = declarator.initializer.as_ref().and_then(|expr| self.fold_constant(expr));
        let needs_init_proc = declarator.initializer.is_some() && initializer.is_none();

        let variable = Variable {
            name: declarator.name.clone(),
            type_path: declarator.type_path.clone(),
            explicit_value_type: declarator.explicit_value_type.clone(),
            initializer,
            is_const,
            is_final,
            is_tmp,
        };

        if is_global {
            if needs_init_proc {
                self.diagnostics.warning(
                    DiagnosticKind::UnsupportedFeature,
                    declarator.location,
                    format!("global variable `{}` initializer is not a compile-time constant", declarator.name),
                );
            }
            let index = self.tree.create_global(variable);
            self.tree.all_objects[owner].global_var_indices.insert(declarator.name.clone(), index);
            return;
        }

        if is_const {
            self.tree.all_objects[owner].const_vars.insert(declarator.name.clone());
        }
        if is_tmp {
            self.tree.all_objects[owner].tmp_vars.insert(declarator.name.clone());
        }
        if needs_init_proc {
            if let Some(initializer_expr) = &declarator.initializer {
                self.pending_initializers.push((owner, declarator.name.clone(), initializer_expr.clone()));
            }
        }
        self.tree.all_objects[owner].instance_vars.insert(declarator.name.clone(), variable);
    }

    fn process_var_override(&mut self, name: &str, value: &'ast ExprNode, current: &Path, location: SourceLocation) {
        let owner = self.tree.get_or_create(current);
        let initializer = self.fold_constant(value);
        let needs_init_proc = initializer.is_none();

        let mut variable = match self.tree.get_variable(owner, name).cloned() {
            Some(variable) => variable,
            None => {
                self.diagnostics.warning(DiagnosticKind::UnknownVariable, location, format!("override of undeclared variable `{name}`"));
                Variable {
                    name: name.to_string(),
                    type_path: None,
                    explicit_value_type: None,
                    initializer: None,
                    is_const: false,
                    is_final: false,
                    is_tmp: false,
                }
            }
        };
        variable.initializer = initializer;
        if needs_init_proc {
            self.pending_initializers.push((owner, name.to_string(), value.clone()));
        }
        self.tree.all_objects[owner].variable_overrides.insert(name.to_string(), variable);
    }

    fn process_proc_definition(
        &mut self,
        name: &str,
        is_verb: bool,
        is_final: bool,
        params: &'ast [ParamDecl],
        body: &'ast [StmtNode],
        current: &Path,
        location: SourceLocation,
    ) {
        let owner = self.tree.get_or_create(current);
        let proc_id = self.tree.all_procs.len();
        let mut proc = DMProc::new(proc_id, name.to_string(), owner, body, location);
        proc.is_verb = is_verb;
        proc.is_final = is_final;

        for param in params {
            proc.parameters.push(param.name.clone());
            let id = next_local_id(&proc);
            let local = LocalVariable {
                name: param.name.clone(),
                id,
                is_parameter: true,
                type_path: param.type_path.clone(),
                explicit_value_type: param.explicit_value_type.clone(),
            };
            if proc.register_local(local).is_err() {
                self.diagnostics.error(
                    DiagnosticKind::UnsupportedFeature,
                    param.location,
                    format!("proc `{name}` declares more than 256 parameters"),
                );
                break;
            }
        }

        self.tree.all_objects[owner].procs.entry(name.to_string()).or_default().push(proc_id);
        if current.root == PathRoot::Absolute && current.segments.is_empty() {
            self.tree.global_procs.insert(name.to_string(), proc_id);
        }
        self.tree.all_procs.push(proc);
    }

    /// Folds a literal to a `Constant`, interning `ConstString`/`ConstResource`
    /// payloads (the only two variants `ExprNode::try_as_constant` leaves to
    /// callers with string-table access, §3).
    fn fold_constant(&mut self, expr: &ExprNode) -> Option<Constant> {
        match &expr.kind {
            Expr::ConstString(s) => Some(Constant::String(self.tree.intern(s))),
            Expr::ConstResource(path) => Some(Constant::Resource(self.tree.intern(path))),
            _ => expr.try_as_constant(),
        }
    }

    /// Synthesizes one assignment-sequence proc per type carrying
    /// non-constant instance-var initializers, mirroring the original's
    /// `DMObject::CreateInitializationProc`. The synthesized statements
    /// never came from the parsed file, so they're leaked into `'ast`
    /// rather than threaded through a borrow the caller doesn't have —
    /// bounded by the number of such vars in the program, not by runtime
    /// activity.
    fn create_initialization_procs(&mut self) {
        let mut by_owner: AHashMap<ObjectId, Vec<(String, ExprNode)>> = AHashMap::new();
        for (owner, name, expr) in std::mem::take(&mut self.pending_initializers) {
            by_owner.entry(owner).or_default().push((name, expr));
        }

        for (owner, initializers) in by_owner {
            let location = initializers.first().map_or_else(SourceLocation::synthetic, |(_, e)| e.location);
            let statements: Vec<StmtNode> = initializers
                .into_iter()
                .map(|(name, value)| {
                    let target = ExprNode::new(location, Expr::Identifier(name));
                    let assign = Expr::Assign { op: AssignmentOperator::Assign, target: Box::new(target), value: Box::new(value) };
                    StmtNode::new(location, Stmt::Expression(ExprNode::new(location, assign)))
                })
                .collect();
            let body: &'ast [StmtNode] = Box::leak(statements.into_boxed_slice());

            let proc_id = self.tree.all_procs.len();
            let proc = DMProc::new(proc_id, INIT_PROC_NAME.to_string(), owner, body, location);
            self.tree.all_objects[owner].initialization_proc_id = Some(proc_id);
            self.tree.all_procs.push(proc);
        }
    }
}

fn next_local_id(proc: &DMProc) -> u8 {
    u8::try_from(proc.local_count()).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::synthetic()
    }

    fn object_def(path: Path, body: Vec<ObjectStmtNode>) -> ObjectStmtNode {
        ObjectStmtNode::new(loc(), ObjectStmt::Definition { path, body })
    }

    fn var_def(name: &str, modifiers: VarModifierFlags, initializer: Option<ExprNode>) -> ObjectStmtNode {
        ObjectStmtNode::new(
            loc(),
            ObjectStmt::VarDefinition(Declarator {
                name: name.to_string(),
                type_path: None,
                modifiers,
                is_list_suffix: false,
                explicit_value_type: None,
                initializer,
                location: loc(),
            }),
        )
    }

    fn proc_def(name: &str, is_verb: bool, params: Vec<ParamDecl>, body: Vec<StmtNode>) -> ObjectStmtNode {
        ObjectStmtNode::new(loc(), ObjectStmt::ProcDefinition { name: name.to_string(), is_verb, is_final: false, params, body })
    }

    #[test]
    fn nested_object_definition_materializes_relative_to_enclosing_path() {
        let file = File {
            statements: vec![object_def(
                Path::parse("/mob"),
                vec![object_def(Path::new(PathRoot::Relative, vec!["player".to_string()]), vec![])],
            )],
        };
        let mut tree = ObjectTree::new();
        let mut diagnostics = Diagnostics::new();
        CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(&file);
        assert!(tree.find(&Path::parse("/mob/player")).is_some());
    }

    #[test]
    fn var_sub_block_declares_vars_on_the_enclosing_type() {
        let file = File {
            statements: vec![object_def(
                Path::parse("/mob"),
                vec![object_def(
                    Path::new(PathRoot::Relative, vec!["var".to_string()]),
                    vec![var_def("health", VarModifierFlags::empty(), Some(ExprNode::new(loc(), Expr::ConstInteger(100))))],
                )],
            )],
        };
        let mut tree = ObjectTree::new();
        let mut diagnostics = Diagnostics::new();
        CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(&file);
        assert!(tree.find(&Path::parse("/mob/var")).is_none());
        let mob = tree.find(&Path::parse("/mob")).unwrap();
        assert!(tree.all_objects[mob].instance_vars.contains_key("health"));
    }

    #[test]
    fn global_var_definition_registers_in_globals_and_owner_index() {
        let file = File {
            statements: vec![var_def("tick_count", VarModifierFlags::GLOBAL, Some(ExprNode::new(loc(), Expr::ConstInteger(0))))],
        };
        let mut tree = ObjectTree::new();
        let mut diagnostics = Diagnostics::new();
        CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(&file);
        assert_eq!(tree.globals.len(), 1);
        let root = tree.find(&Path::root()).unwrap();
        assert_eq!(tree.all_objects[root].global_var_indices.get("tick_count"), Some(&0));
    }

    #[test]
    fn top_level_proc_definition_registers_as_a_global_proc() {
        let file = File { statements: vec![proc_def("Sum", false, vec![], vec![])] };
        let mut tree = ObjectTree::new();
        let mut diagnostics = Diagnostics::new();
        CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(&file);
        assert!(tree.global_procs.contains_key("Sum"));
        assert_eq!(tree.all_procs.len(), 1);
    }

    #[test]
    fn proc_definition_under_a_type_is_not_a_global_proc() {
        let file = File {
            statements: vec![object_def(Path::parse("/mob"), vec![proc_def("Attack", true, vec![], vec![])])],
        };
        let mut tree = ObjectTree::new();
        let mut diagnostics = Diagnostics::new();
        CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(&file);
        assert!(!tree.global_procs.contains_key("Attack"));
        let mob = tree.find(&Path::parse("/mob")).unwrap();
        assert_eq!(tree.all_objects[mob].procs.get("Attack"), Some(&vec![0]));
        assert!(tree.all_procs[0].is_verb);
    }

    #[test]
    fn proc_parameters_are_registered_as_locals_up_front() {
        let params = vec![ParamDecl { name: "amount".to_string(), type_path: None, default: None, explicit_value_type: None, location: loc() }];
        let file = File { statements: vec![proc_def("Heal", false, params, vec![])] };
        let mut tree = ObjectTree::new();
        let mut diagnostics = Diagnostics::new();
        CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(&file);
        let proc = &tree.all_procs[0];
        assert_eq!(proc.parameters, vec!["amount".to_string()]);
        assert!(proc.locals.get("amount").is_some_and(|l| l.is_parameter));
    }

    #[test]
    fn non_constant_instance_var_initializer_gets_an_initialization_proc() {
        let new_call = ExprNode::new(
            loc(),
            Expr::New { path: Some(Path::parse("/obj/item")), target: None, args: vec![] },
        );
        let file = File {
            statements: vec![object_def(Path::parse("/mob"), vec![var_def("held_item", VarModifierFlags::empty(), Some(new_call))])],
        };
        let mut tree = ObjectTree::new();
        let mut diagnostics = Diagnostics::new();
        CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(&file);
        let mob = tree.find(&Path::parse("/mob")).unwrap();
        let init_id = tree.all_objects[mob].initialization_proc_id.expect("init proc created");
        assert_eq!(tree.all_procs[init_id].body.len(), 1);
    }

    #[test]
    fn constant_instance_var_initializer_needs_no_initialization_proc() {
        let file = File {
            statements: vec![object_def(
                Path::parse("/mob"),
                vec![var_def("health", VarModifierFlags::empty(), Some(ExprNode::new(loc(), Expr::ConstInteger(100))))],
            )],
        };
        let mut tree = ObjectTree::new();
        let mut diagnostics = Diagnostics::new();
        CodeTreeBuilder::new(&mut tree, &mut diagnostics).build(&file);
        let mob = tree.find(&Path::parse("/mob")).unwrap();
        assert!(tree.all_objects[mob].initialization_proc_id.is_none());
    }
}
