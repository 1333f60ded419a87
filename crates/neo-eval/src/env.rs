//! Name resolution for the NEO evaluator.
//!
//! Module-level code reads and writes the globals namespace directly.
//! Each function call gets a [`Scope`] whose parent chain is the scope the
//! function was defined in, so nested functions see enclosing locals.
//! Which names are local to a function is decided once from its body.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use neo_types::ast::{Comprehension, Expr, ExprKind, Param, Stmt, StmtKind};

use crate::error::{ErrorKind, EvalResult, RuntimeError};
use crate::value::Value;

/// Mutable name-to-value mapping holding a program's globals.
pub type Namespace = Rc<RefCell<HashMap<String, Value>>>;

/// The allow-listed names visible when no other scope defines them.
pub type Builtins = HashMap<String, Value>;

/// Create an empty namespace.
pub fn new_namespace() -> Namespace {
    Rc::new(RefCell::new(HashMap::new()))
}

// ══════════════════════════════════════════════════════════════════════════════
// Static scope analysis
// ══════════════════════════════════════════════════════════════════════════════

/// Names bound in a function, lambda or comprehension body.
#[derive(Debug, Default)]
pub struct ScopeInfo {
    /// Names assigned in the body (parameters included).
    pub locals: HashSet<String>,
    /// Names declared `global` in the body.
    pub globals: HashSet<String>,
}

impl ScopeInfo {
    pub fn for_function(params: &[Param], body: &[Stmt]) -> Self {
        let mut info = Self::default();
        for param in params {
            info.locals.insert(param.name.name.clone());
        }
        info.collect_block(body);
        for name in &info.globals {
            info.locals.remove(name);
        }
        info
    }

    pub fn for_lambda(params: &[Param]) -> Self {
        Self {
            locals: params.iter().map(|p| p.name.name.clone()).collect(),
            globals: HashSet::new(),
        }
    }

    pub fn for_comprehension(generators: &[Comprehension]) -> Self {
        let mut info = Self::default();
        for generator in generators {
            info.collect_target(&generator.target);
        }
        info
    }

    fn collect_block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.collect_stmt(stmt);
        }
    }

    fn collect_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    self.collect_target(target);
                }
            }
            StmtKind::AugAssign { target, .. } => self.collect_target(target),
            StmtKind::Del(targets) => {
                for target in targets {
                    self.collect_target(target);
                }
            }
            StmtKind::For(f) => {
                self.collect_target(&f.target);
                self.collect_block(&f.body);
                self.collect_block(&f.orelse);
            }
            StmtKind::While(w) => {
                self.collect_block(&w.body);
                self.collect_block(&w.orelse);
            }
            StmtKind::If(i) => {
                self.collect_block(&i.body);
                self.collect_block(&i.orelse);
            }
            StmtKind::Try(t) => {
                self.collect_block(&t.body);
                if let Some(handler) = &t.handler {
                    self.collect_block(handler);
                }
                self.collect_block(&t.orelse);
                self.collect_block(&t.finalbody);
            }
            StmtKind::FunctionDef(def) => {
                self.locals.insert(def.name.name.clone());
            }
            StmtKind::Global(names) => {
                for name in names {
                    self.globals.insert(name.name.clone());
                }
            }
            StmtKind::Import(names) => {
                for import in names {
                    let bound = match &import.alias {
                        Some(alias) => alias.clone(),
                        None => import.name.split('.').next().unwrap_or_default().to_string(),
                    };
                    self.locals.insert(bound);
                }
            }
            StmtKind::ImportFrom { names, .. } => {
                for import in names {
                    let bound = import.alias.as_ref().unwrap_or(&import.name);
                    self.locals.insert(bound.clone());
                }
            }
            StmtKind::Expr(_)
            | StmtKind::Return(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass
            | StmtKind::Assert { .. } => {}
        }
    }

    fn collect_target(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Name(name) => {
                self.locals.insert(name.clone());
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                for item in items {
                    self.collect_target(item);
                }
            }
            _ => {}
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Scopes
// ══════════════════════════════════════════════════════════════════════════════

/// Local variables of one function call or comprehension.
pub struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
    info: Rc<ScopeInfo>,
}

impl Scope {
    pub fn new(info: Rc<ScopeInfo>, parent: Option<Rc<Scope>>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(HashMap::new()),
            parent,
            info,
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    fn remove(&self, name: &str) -> Option<Value> {
        self.vars.borrow_mut().remove(name)
    }

    fn is_global(&self, name: &str) -> bool {
        self.info.globals.contains(name)
    }
}

fn unbound_local(name: &str) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::UnboundLocalError,
        format!("cannot access local variable '{name}' where it is not associated with a value"),
    )
}

// ══════════════════════════════════════════════════════════════════════════════
// Environment
// ══════════════════════════════════════════════════════════════════════════════

/// Globals, built-ins and the currently active local scope.
pub struct Environment {
    globals: Namespace,
    builtins: Rc<Builtins>,
    scope: Option<Rc<Scope>>,
}

impl Environment {
    pub fn new(globals: Namespace, builtins: Rc<Builtins>) -> Self {
        Self {
            globals,
            builtins,
            scope: None,
        }
    }

    pub fn globals(&self) -> &Namespace {
        &self.globals
    }

    /// The active local scope (`None` at module level).
    pub fn scope(&self) -> Option<Rc<Scope>> {
        self.scope.clone()
    }

    /// Make `scope` active, returning the previously active one.
    pub(crate) fn enter(&mut self, scope: Option<Rc<Scope>>) -> Option<Rc<Scope>> {
        std::mem::replace(&mut self.scope, scope)
    }

    /// Resolve a name: locals, enclosing scopes, globals, built-ins.
    pub fn lookup(&self, name: &str) -> EvalResult<Value> {
        if let Some(scope) = &self.scope {
            if !scope.is_global(name) {
                if let Some(value) = scope.get(name) {
                    return Ok(value);
                }
                if scope.info.locals.contains(name) {
                    return Err(unbound_local(name));
                }
                let mut parent = scope.parent.clone();
                while let Some(enclosing) = parent {
                    if enclosing.is_global(name) {
                        break;
                    }
                    if let Some(value) = enclosing.get(name) {
                        return Ok(value);
                    }
                    parent = enclosing.parent.clone();
                }
            }
        }
        if let Some(value) = self.globals.borrow().get(name) {
            return Ok(value.clone());
        }
        self.builtins
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::name_error(name))
    }

    /// Bind a name in the active scope, or in globals at module level or
    /// when declared `global`.
    pub fn assign(&self, name: &str, value: Value) {
        match &self.scope {
            Some(scope) if !scope.is_global(name) => scope.set(name, value),
            _ => {
                self.globals.borrow_mut().insert(name.to_string(), value);
            }
        }
    }

    /// `del name`
    pub fn delete(&self, name: &str) -> EvalResult<()> {
        match &self.scope {
            Some(scope) if !scope.is_global(name) => match scope.remove(name) {
                Some(_) => Ok(()),
                None => Err(unbound_local(name)),
            },
            _ => match self.globals.borrow_mut().remove(name) {
                Some(_) => Ok(()),
                None => Err(RuntimeError::name_error(name)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        let mut builtins = Builtins::new();
        builtins.insert("True".into(), Value::Bool(true));
        Environment::new(new_namespace(), Rc::new(builtins))
    }

    fn info(locals: &[&str], globals: &[&str]) -> Rc<ScopeInfo> {
        Rc::new(ScopeInfo {
            locals: locals.iter().map(|s| s.to_string()).collect(),
            globals: globals.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_module_level_assign_goes_to_globals() {
        let env = env();
        env.assign("x", Value::Int(1));
        assert_eq!(env.globals().borrow().get("x"), Some(&Value::Int(1)));
        assert_eq!(env.lookup("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_builtins_are_last_resort() {
        let env = env();
        assert_eq!(env.lookup("True").unwrap(), Value::Bool(true));
        env.assign("True", Value::Int(0));
        assert_eq!(env.lookup("True").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_missing_name() {
        let err = env().lookup("nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NameError);
        assert_eq!(err.message, "name 'nope' is not defined");
    }

    #[test]
    fn test_unassigned_local_is_unbound() {
        let mut env = env();
        env.assign("x", Value::Int(1));
        env.enter(Some(Scope::new(info(&["x"], &[]), None)));
        let err = env.lookup("x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnboundLocalError);
    }

    #[test]
    fn test_global_declaration_writes_globals() {
        let mut env = env();
        env.enter(Some(Scope::new(info(&[], &["count"]), None)));
        env.assign("count", Value::Int(3));
        env.enter(None);
        assert_eq!(env.lookup("count").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_enclosing_scope_is_visible() {
        let mut env = env();
        let outer = Scope::new(info(&["n"], &[]), None);
        outer.set("n", Value::Int(7));
        env.enter(Some(Scope::new(info(&[], &[]), Some(outer))));
        assert_eq!(env.lookup("n").unwrap(), Value::Int(7));
    }

    #[test]
    fn test_function_locals_analysis() {
        let source = neo_types::SourceFile::student(
            "def f(a):\n    global g\n    b = 1\n    for i, j in x:\n        pass\n    g = 2\n    def h():\n        z = 1\n",
        );
        let module = neo_parser::parse_source(&source).unwrap();
        let StmtKind::FunctionDef(def) = &module.body[0].kind else {
            panic!("expected def");
        };
        let info = ScopeInfo::for_function(&def.params, &def.body);
        for name in ["a", "b", "i", "j", "h"] {
            assert!(info.locals.contains(name), "{name} should be local");
        }
        assert!(!info.locals.contains("g"));
        assert!(!info.locals.contains("z"));
        assert!(info.globals.contains("g"));
    }
}
