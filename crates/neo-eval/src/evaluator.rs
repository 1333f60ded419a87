//! Core statement and expression evaluator.

use std::rc::Rc;

use neo_types::ast::*;
use neo_types::STUDENT_FILE;

use crate::builtins::call_builtin;
use crate::env::{Builtins, Environment, Namespace, Scope, ScopeInfo};
use crate::error::{ErrorKind, EvalResult, Flow, Frame, RuntimeError};
use crate::format::format_value;
use crate::limits::{with_stack, InterruptHandle, Limits, NestingScope};
use crate::methods::{call_method, has_method};
use crate::ops::{self, SliceBounds};
use crate::value::{BoundMethod, CallArgs, Dict, Function, FunctionBody, Value};

/// Callback receiving the value of each top-level expression statement.
pub type DisplayHook<'a> = dyn FnMut(&Value) -> EvalResult<()> + 'a;

/// A call frame currently executing.
struct ActiveFrame {
    function: String,
    line: u32,
}

/// The tree-walking evaluator. Walks AST nodes and produces Values.
pub struct Evaluator {
    /// Globals, built-ins and the active local scope.
    pub env: Environment,
    /// Steps executed so far (statements, loop iterations, calls).
    pub steps: u64,
    limits: Limits,
    interrupt: InterruptHandle,
    file: String,
    frames: Vec<ActiveFrame>,
}

impl Evaluator {
    /// Create an evaluator over `globals`, falling back to `builtins`.
    pub fn new(globals: Namespace, builtins: Rc<Builtins>) -> Self {
        Self {
            env: Environment::new(globals, builtins),
            steps: 0,
            limits: Limits::default(),
            interrupt: InterruptHandle::new(),
            file: STUDENT_FILE.to_string(),
            frames: Vec::new(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Name recorded in traceback frames.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Consume one step. Fails on interrupt or when the budget runs out.
    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        self.interrupt.check()?;
        match self.limits.step_limit {
            Some(limit) if self.steps > limit => Err(RuntimeError::new(
                ErrorKind::ExecutionLimit,
                format!("execution step limit of {limit} exceeded"),
            )),
            _ => Ok(()),
        }
    }

    fn set_line(&mut self, line: u32) {
        if let Some(frame) = self.frames.last_mut() {
            frame.line = line;
        }
    }

    /// Record the active call stack on an error that has none yet.
    fn attach_traceback(&self, mut err: RuntimeError) -> RuntimeError {
        if err.traceback.is_empty() {
            err.traceback = self
                .frames
                .iter()
                .rev()
                .map(|f| Frame {
                    function: f.function.clone(),
                    file: self.file.clone(),
                    line: f.line,
                })
                .collect();
        }
        err
    }

    // ══════════════════════════════════════════════════════════════════════
    // Modules
    // ══════════════════════════════════════════════════════════════════════

    /// Execute a whole module against the globals namespace.
    pub fn run_module(&mut self, module: &Module) -> EvalResult<()> {
        self.run(module, None)
    }

    /// Execute a module the way an interactive prompt does: the value of
    /// every top-level expression statement that is not `None` is passed
    /// to `display`.
    pub fn run_interactive(&mut self, module: &Module, display: &mut DisplayHook<'_>) -> EvalResult<()> {
        self.run(module, Some(display))
    }

    fn run(&mut self, module: &Module, mut display: Option<&mut DisplayHook<'_>>) -> EvalResult<()> {
        let _nesting = NestingScope::enter(self.limits.recursion_limit);
        self.env.enter(None);
        self.frames.clear();
        self.frames.push(ActiveFrame {
            function: "<module>".to_string(),
            line: module.body.first().map_or(1, Stmt::line),
        });
        let mut result = Ok(());
        for stmt in &module.body {
            result = match (&stmt.kind, display.as_deref_mut()) {
                (StmtKind::Expr(expr), Some(display)) => self.exec_displayed(stmt, expr, display),
                _ => self.exec_stmt(stmt).map(|_| ()),
            };
            if result.is_err() {
                break;
            }
        }
        self.frames.clear();
        result
    }

    fn exec_displayed(&mut self, stmt: &Stmt, expr: &Expr, display: &mut DisplayHook<'_>) -> EvalResult<()> {
        self.set_line(stmt.line());
        let shown = self.tick().and_then(|_| {
            let value = self.eval_expr(expr)?;
            if value.is_none() {
                Ok(())
            } else {
                display(&value)
            }
        });
        shown.map_err(|e| self.attach_traceback(e))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn exec_block(&mut self, body: &[Stmt]) -> EvalResult<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        self.set_line(stmt.line());
        self.tick()
            .and_then(|_| self.exec_stmt_kind(stmt))
            .map_err(|e| self.attach_traceback(e))
    }

    fn exec_stmt_kind(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval_expr(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value)?,
            StmtKind::If(stmt) => {
                return if self.eval_expr(&stmt.test)?.is_truthy() {
                    self.exec_block(&stmt.body)
                } else {
                    self.exec_block(&stmt.orelse)
                };
            }
            StmtKind::While(w) => return self.exec_while(w, stmt.line()),
            StmtKind::For(f) => return self.exec_for(f, stmt.line()),
            StmtKind::FunctionDef(def) => self.exec_def(def, stmt.line())?,
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass | StmtKind::Global(_) => {}
            StmtKind::Del(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
            }
            StmtKind::Assert { test, message } => {
                if !self.eval_expr(test)?.is_truthy() {
                    let message = match message {
                        Some(expr) => self.eval_expr(expr)?.to_str()?,
                        None => String::new(),
                    };
                    return Err(RuntimeError::new(ErrorKind::AssertionError, message));
                }
            }
            StmtKind::Try(t) => return self.exec_try(t),
            StmtKind::Import(names) => {
                let module = names.first().map_or("", |n| n.name.as_str());
                return Err(import_error(module));
            }
            StmtKind::ImportFrom { module, .. } => return Err(import_error(module)),
        }
        Ok(Flow::Normal)
    }

    fn exec_while(&mut self, stmt: &WhileStmt, line: u32) -> EvalResult<Flow> {
        loop {
            self.set_line(line);
            if !self.eval_expr(&stmt.test)?.is_truthy() {
                return self.exec_block(&stmt.orelse);
            }
            match self.exec_block(&stmt.body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            self.tick()?;
        }
    }

    fn exec_for(&mut self, stmt: &ForStmt, line: u32) -> EvalResult<Flow> {
        let iterable = self.eval_expr(&stmt.iter)?;
        let mut items = ops::iterate(&iterable)?;
        loop {
            self.set_line(line);
            let Some(item) = items.try_next()? else {
                break;
            };
            self.tick()?;
            self.assign(&stmt.target, item)?;
            match self.exec_block(&stmt.body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        self.exec_block(&stmt.orelse)
    }

    fn exec_def(&mut self, def: &FunctionDef, line: u32) -> EvalResult<()> {
        let defaults = self.eval_defaults(&def.params)?;
        let function = Function {
            name: def.name.name.clone(),
            line,
            params: def.params.iter().map(|p| p.name.name.clone()).collect(),
            defaults,
            body: FunctionBody::Block(def.body.clone().into()),
            closure: self.env.scope(),
            info: Rc::new(ScopeInfo::for_function(&def.params, &def.body)),
        };
        self.env.assign(&def.name.name, Value::Function(Rc::new(function)));
        Ok(())
    }

    fn eval_defaults(&mut self, params: &[Param]) -> EvalResult<Vec<Option<Value>>> {
        params
            .iter()
            .map(|p| p.default.as_ref().map(|d| self.eval_expr(d)).transpose())
            .collect()
    }

    fn exec_try(&mut self, stmt: &TryStmt) -> EvalResult<Flow> {
        let outcome = match self.exec_block(&stmt.body) {
            Err(err) if err.kind.is_catchable() => match &stmt.handler {
                Some(handler) => self.exec_block(handler),
                None => Err(err),
            },
            Ok(Flow::Normal) => self.exec_block(&stmt.orelse),
            other => other,
        };
        if stmt.finalbody.is_empty() {
            return outcome;
        }
        match self.exec_block(&stmt.finalbody)? {
            Flow::Normal => outcome,
            flow => Ok(flow),
        }
    }

    fn exec_aug_assign(&mut self, target: &Expr, op: BinOp, value: &Expr) -> EvalResult<()> {
        match &target.kind {
            ExprKind::Name(name) => {
                let current = self.env.lookup(name)?;
                let rhs = self.eval_expr(value)?;
                let result = self.augmented(op, &current, &rhs)?;
                self.env.assign(name, result);
                Ok(())
            }
            ExprKind::Subscript { value: container, index } => {
                let container = self.eval_expr(container)?;
                if let ExprKind::Slice { lower, upper, step } = &index.kind {
                    let bounds = self.eval_slice(lower, upper, step)?;
                    let current = ops::get_slice(&container, bounds)?;
                    let rhs = self.eval_expr(value)?;
                    let result = self.augmented(op, &current, &rhs)?;
                    return ops::set_slice(&container, bounds, &result);
                }
                let index = self.eval_expr(index)?;
                let current = ops::get_item(&container, &index)?;
                let rhs = self.eval_expr(value)?;
                let result = self.augmented(op, &current, &rhs)?;
                ops::set_item(&container, &index, result)
            }
            ExprKind::Attribute { value: object, attr } => {
                let object = self.eval_expr(object)?;
                self.get_attribute(&object, &attr.name)?;
                Err(set_attribute_error(&object, &attr.name))
            }
            _ => Err(RuntimeError::type_error(
                "illegal expression for augmented assignment",
            )),
        }
    }

    /// `current op= rhs`; lists are extended and repeated in place.
    fn augmented(&mut self, op: BinOp, current: &Value, rhs: &Value) -> EvalResult<Value> {
        if let Value::List(items) = current {
            match op {
                BinOp::Add => {
                    let extra = ops::collect(rhs)?;
                    items.borrow_mut().extend(extra);
                    return Ok(current.clone());
                }
                BinOp::Mul => {
                    let repeated = ops::binary_op(op, current, rhs)?;
                    if let Value::List(new_items) = repeated {
                        let new_items = new_items.borrow().clone();
                        *items.borrow_mut() = new_items;
                    }
                    return Ok(current.clone());
                }
                _ => {}
            }
        }
        ops::binary_op(op, current, rhs)
    }

    // ── Targets ──────────────────────────────────────────────────────────

    fn assign(&mut self, target: &Expr, value: Value) -> EvalResult<()> {
        match &target.kind {
            ExprKind::Name(name) => {
                self.env.assign(name, value);
                Ok(())
            }
            ExprKind::Tuple(targets) | ExprKind::List(targets) => {
                let values = ops::unpack(&value, targets.len())?;
                for (target, value) in targets.iter().zip(values) {
                    self.assign(target, value)?;
                }
                Ok(())
            }
            ExprKind::Subscript { value: container, index } => {
                let container = self.eval_expr(container)?;
                if let ExprKind::Slice { lower, upper, step } = &index.kind {
                    let bounds = self.eval_slice(lower, upper, step)?;
                    return ops::set_slice(&container, bounds, &value);
                }
                let index = self.eval_expr(index)?;
                ops::set_item(&container, &index, value)
            }
            ExprKind::Attribute { value: object, attr } => {
                let object = self.eval_expr(object)?;
                Err(set_attribute_error(&object, &attr.name))
            }
            _ => Err(RuntimeError::type_error("cannot assign to expression")),
        }
    }

    fn delete(&mut self, target: &Expr) -> EvalResult<()> {
        match &target.kind {
            ExprKind::Name(name) => self.env.delete(name),
            ExprKind::Tuple(targets) | ExprKind::List(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
                Ok(())
            }
            ExprKind::Subscript { value: container, index } => {
                let container = self.eval_expr(container)?;
                if let ExprKind::Slice { lower, upper, step } = &index.kind {
                    let bounds = self.eval_slice(lower, upper, step)?;
                    return ops::del_slice(&container, bounds);
                }
                let index = self.eval_expr(index)?;
                ops::del_item(&container, &index)
            }
            ExprKind::Attribute { value: object, attr } => {
                let object = self.eval_expr(object)?;
                Err(set_attribute_error(&object, &attr.name))
            }
            _ => Err(RuntimeError::type_error("cannot delete expression")),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        with_stack(|| self.eval_expr_kind(expr))
    }

    fn eval_expr_kind(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Float(f) => Ok(Value::Float(*f)),
            ExprKind::Str(s) => Ok(Value::str(s)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::None => Ok(Value::None),
            ExprKind::FString(parts) => self.eval_fstring(parts),

            ExprKind::Name(name) => self.env.lookup(name),
            ExprKind::Attribute { value, attr } => {
                let object = self.eval_expr(value)?;
                self.get_attribute(&object, &attr.name)
            }
            ExprKind::Subscript { value, index } => self.eval_subscript(value, index),
            ExprKind::Slice { .. } => Err(RuntimeError::type_error(
                "slice syntax is only valid inside square brackets",
            )),
            ExprKind::Call {
                func,
                args,
                keywords,
            } => self.eval_call(func, args, keywords),

            ExprKind::Binary { left, op, right } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                ops::binary_op(*op, &left, &right)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval_expr(operand)?;
                ops::unary_op(*op, &operand)
            }
            ExprKind::BoolOp { op, values } => self.eval_bool_op(*op, values),
            ExprKind::Compare {
                left,
                ops: operators,
                comparators,
            } => self.eval_compare(left, operators, comparators),
            ExprKind::IfExp { test, body, orelse } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_expr(body)
                } else {
                    self.eval_expr(orelse)
                }
            }
            ExprKind::Lambda { params, body } => self.eval_lambda(expr, params, body),

            ExprKind::List(items) => Ok(Value::list(self.eval_items(items)?)),
            ExprKind::Tuple(items) => Ok(Value::tuple(self.eval_items(items)?)),
            ExprKind::Set(items) => {
                let items = self.eval_items(items)?;
                Ok(Value::set(Dict::from_keys(items)?))
            }
            ExprKind::Dict(pairs) => self.eval_dict(pairs),
            ExprKind::ListComp {
                element,
                generators,
            } => {
                let mut out = Vec::new();
                self.run_comprehension(generators, &mut |ev: &mut Evaluator| {
                    out.push(ev.eval_expr(element)?);
                    Ok(())
                })?;
                Ok(Value::list(out))
            }
            ExprKind::SetComp {
                element,
                generators,
            } => {
                let mut out = Dict::new();
                self.run_comprehension(generators, &mut |ev: &mut Evaluator| {
                    let item = ev.eval_expr(element)?;
                    out.add(item)
                })?;
                Ok(Value::set(out))
            }
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => {
                let mut out = Dict::new();
                self.run_comprehension(generators, &mut |ev: &mut Evaluator| {
                    let k = ev.eval_expr(key)?;
                    let v = ev.eval_expr(value)?;
                    out.insert(k, v)
                })?;
                Ok(Value::dict(out))
            }
            ExprKind::GeneratorExp {
                element,
                generators,
            } => {
                let mut out = Vec::new();
                self.run_comprehension(generators, &mut |ev: &mut Evaluator| {
                    out.push(ev.eval_expr(element)?);
                    Ok(())
                })?;
                Ok(Value::iterator("generator", out))
            }
        }
    }

    fn eval_items(&mut self, items: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(self.eval_expr(item)?);
        }
        Ok(values)
    }

    fn eval_dict(&mut self, pairs: &[(Expr, Expr)]) -> EvalResult<Value> {
        let mut dict = Dict::new();
        for (key, value) in pairs {
            let key = self.eval_expr(key)?;
            let value = self.eval_expr(value)?;
            dict.insert(key, value)?;
        }
        Ok(Value::dict(dict))
    }

    fn eval_fstring(&mut self, parts: &[FStringPart]) -> EvalResult<Value> {
        let mut result = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => result.push_str(text),
                FStringPart::Expr { expr, format_spec } => {
                    let value = self.eval_expr(expr)?;
                    result.push_str(&format_value(&value, format_spec.as_deref().unwrap_or(""))?);
                }
            }
        }
        Ok(Value::str(result))
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn eval_bool_op(&mut self, op: BoolOp, values: &[Expr]) -> EvalResult<Value> {
        let mut last = Value::None;
        for expr in values {
            last = self.eval_expr(expr)?;
            let truthy = last.is_truthy();
            match op {
                BoolOp::And if !truthy => return Ok(last),
                BoolOp::Or if truthy => return Ok(last),
                _ => {}
            }
        }
        Ok(last)
    }

    fn eval_compare(&mut self, left: &Expr, operators: &[CmpOp], comparators: &[Expr]) -> EvalResult<Value> {
        let mut left = self.eval_expr(left)?;
        for (op, comparator) in operators.iter().zip(comparators) {
            let right = self.eval_expr(comparator)?;
            if !ops::compare(*op, &left, &right)? {
                return Ok(Value::Bool(false));
            }
            left = right;
        }
        Ok(Value::Bool(true))
    }

    // ── Subscripts & attributes ──────────────────────────────────────────

    fn eval_subscript(&mut self, value: &Expr, index: &Expr) -> EvalResult<Value> {
        let container = self.eval_expr(value)?;
        if let ExprKind::Slice { lower, upper, step } = &index.kind {
            let bounds = self.eval_slice(lower, upper, step)?;
            return ops::get_slice(&container, bounds);
        }
        let index = self.eval_expr(index)?;
        ops::get_item(&container, &index)
    }

    fn eval_slice(
        &mut self,
        lower: &Option<Box<Expr>>,
        upper: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
    ) -> EvalResult<SliceBounds> {
        let mut bound = |expr: &Option<Box<Expr>>| -> EvalResult<Option<i64>> {
            match expr {
                Some(expr) => ops::slice_bound(&self.eval_expr(expr)?),
                None => Ok(None),
            }
        };
        Ok(SliceBounds {
            lower: bound(lower)?,
            upper: bound(upper)?,
            step: bound(step)?,
        })
    }

    /// `object.name`. Names starting with `_` are never visible.
    pub fn get_attribute(&self, object: &Value, name: &str) -> EvalResult<Value> {
        if !name.starts_with('_') {
            match object {
                Value::Host(host) => {
                    if let Some(value) = host.attribute(name) {
                        return Ok(value);
                    }
                }
                _ if has_method(object, name) => {
                    return Ok(Value::Method(Rc::new(BoundMethod {
                        receiver: object.clone(),
                        name: name.to_string(),
                    })));
                }
                _ => {}
            }
        }
        Err(RuntimeError::attribute_error(object.type_name(), name))
    }

    // ── Calls ────────────────────────────────────────────────────────────

    fn eval_call(&mut self, func: &Expr, args: &[Expr], keywords: &[Keyword]) -> EvalResult<Value> {
        let callee = self.eval_expr(func)?;
        let positional = self.eval_items(args)?;
        let mut named = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            named.push((keyword.name.name.clone(), self.eval_expr(&keyword.value)?));
        }
        self.call_value(&callee, CallArgs::with_keywords(positional, named))
    }

    /// Call any callable value.
    pub fn call_value(&mut self, callee: &Value, args: CallArgs) -> EvalResult<Value> {
        match callee {
            Value::Function(function) => self.call_function(function, args),
            Value::Builtin(builtin) => call_builtin(self, *builtin, args),
            Value::Native(native) => native.call(args),
            Value::Method(method) => call_method(self, &method.receiver, &method.name, args),
            _ => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                callee.type_name()
            ))),
        }
    }

    fn call_function(&mut self, function: &Rc<Function>, args: CallArgs) -> EvalResult<Value> {
        self.tick()?;
        if self.frames.len() >= self.limits.recursion_limit {
            return Err(RuntimeError::recursion(""));
        }
        with_stack(|| self.enter_function(function, args))
    }

    fn enter_function(&mut self, function: &Rc<Function>, args: CallArgs) -> EvalResult<Value> {
        let scope = Scope::new(function.info.clone(), function.closure.clone());
        bind_arguments(function, &scope, args)?;

        let previous = self.env.enter(Some(scope));
        self.frames.push(ActiveFrame {
            function: function.name.clone(),
            line: function.line,
        });
        let result = match &function.body {
            FunctionBody::Block(body) => self.exec_block(body).map(|flow| match flow {
                Flow::Return(value) => value,
                _ => Value::None,
            }),
            FunctionBody::Lambda(body) => self.eval_expr(body),
        };
        let result = result.map_err(|e| self.attach_traceback(e));
        self.frames.pop();
        self.env.enter(previous);
        result
    }

    fn eval_lambda(&mut self, expr: &Expr, params: &[Param], body: &Expr) -> EvalResult<Value> {
        let defaults = self.eval_defaults(params)?;
        Ok(Value::Function(Rc::new(Function {
            name: "<lambda>".to_string(),
            line: expr.span.start_line,
            params: params.iter().map(|p| p.name.name.clone()).collect(),
            defaults,
            body: FunctionBody::Lambda(Rc::new(body.clone())),
            closure: self.env.scope(),
            info: Rc::new(ScopeInfo::for_lambda(params)),
        })))
    }

    // ── Comprehensions ───────────────────────────────────────────────────

    /// Run the `for`/`if` clauses in a fresh scope, calling `emit` for
    /// every binding that passes all conditions.
    fn run_comprehension(
        &mut self,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Self) -> EvalResult<()>,
    ) -> EvalResult<()> {
        let Some(first) = generators.first() else {
            return emit(self);
        };
        let iterable = self.eval_expr(&first.iter)?;
        let scope = Scope::new(
            Rc::new(ScopeInfo::for_comprehension(generators)),
            self.env.scope(),
        );
        let previous = self.env.enter(Some(scope));
        let result = self.comprehension_level(generators, 0, iterable, emit);
        self.env.enter(previous);
        result
    }

    fn comprehension_level(
        &mut self,
        generators: &[Comprehension],
        level: usize,
        iterable: Value,
        emit: &mut dyn FnMut(&mut Self) -> EvalResult<()>,
    ) -> EvalResult<()> {
        let generator = &generators[level];
        let mut items = ops::iterate(&iterable)?;
        'items: while let Some(item) = items.try_next()? {
            self.tick()?;
            self.assign(&generator.target, item)?;
            for condition in &generator.conditions {
                if !self.eval_expr(condition)?.is_truthy() {
                    continue 'items;
                }
            }
            match generators.get(level + 1) {
                Some(next) => {
                    let inner = self.eval_expr(&next.iter)?;
                    self.comprehension_level(generators, level + 1, inner, emit)?;
                }
                None => emit(self)?,
            }
        }
        Ok(())
    }
}

/// Bind call arguments to parameters in `scope`.
fn bind_arguments(function: &Function, scope: &Scope, args: CallArgs) -> EvalResult<()> {
    let name = &function.name;
    let params = &function.params;
    if args.positional.len() > params.len() {
        let required = function.defaults.iter().filter(|d| d.is_none()).count();
        let takes = if required == params.len() {
            format!(
                "{} positional argument{}",
                params.len(),
                if params.len() == 1 { "" } else { "s" }
            )
        } else {
            format!("from {required} to {} positional arguments", params.len())
        };
        let given = args.positional.len();
        let verb = if given == 1 { "was" } else { "were" };
        return Err(RuntimeError::type_error(format!(
            "{name}() takes {takes} but {given} {verb} given"
        )));
    }

    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(args.positional) {
        *slot = Some(value);
    }
    for (keyword, value) in args.keywords {
        let Some(pos) = params.iter().position(|p| *p == keyword) else {
            return Err(RuntimeError::type_error(format!(
                "{name}() got an unexpected keyword argument '{keyword}'"
            )));
        };
        if slots[pos].is_some() {
            return Err(RuntimeError::type_error(format!(
                "{name}() got multiple values for argument '{keyword}'"
            )));
        }
        slots[pos] = Some(value);
    }

    let mut missing = Vec::new();
    for ((param, slot), default) in params.iter().zip(slots).zip(&function.defaults) {
        match slot.or_else(|| default.clone()) {
            Some(value) => scope.set(param, value),
            None => missing.push(format!("'{param}'")),
        }
    }
    if !missing.is_empty() {
        let count = missing.len();
        let names = match missing.as_slice() {
            [one] => one.clone(),
            [first, second] => format!("{first} and {second}"),
            [init @ .., last] => format!("{}, and {last}", init.join(", ")),
            [] => String::new(),
        };
        return Err(RuntimeError::type_error(format!(
            "{name}() missing {count} required positional argument{}: {names}",
            if count == 1 { "" } else { "s" }
        )));
    }
    Ok(())
}

fn import_error(module: &str) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::ImportError,
        format!("import of '{module}' is not allowed"),
    )
}

fn set_attribute_error(object: &Value, name: &str) -> RuntimeError {
    let exists = match object {
        Value::Host(host) => !name.starts_with('_') && host.attribute(name).is_some(),
        _ => !name.starts_with('_') && has_method(object, name),
    };
    if exists {
        RuntimeError::new(
            ErrorKind::AttributeError,
            format!("'{}' object attribute '{name}' is read-only", object.type_name()),
        )
    } else {
        RuntimeError::attribute_error(object.type_name(), name)
    }
}
