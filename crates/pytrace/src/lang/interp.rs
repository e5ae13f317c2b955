//! Tree-walking evaluator for the restricted scripting subset.
//!
//! Grounded in the teacher's bytecode VM in spirit rather than in code: a
//! call stack of frames, a value/heap split, and a hook that gets `&mut
//! Interpreter` at well-defined pause points (`tracer.rs`'s `VmTracer`
//! pattern, generalized from opcode-level instruction events to the
//! statement-level `Call`/`Line`/`Return`/`Exception` events the heap
//! snapshotter and trace loop operate on).

use std::rc::Rc;

use indexmap::IndexMap;

use super::ast::{BinOp, BoolOp, CmpOp, Expr, Stmt, UnaryOp};
use super::exception::{ExecSignal, PyException, Unwind};
use super::value::{ClassDef, FunctionDef, Value, values_equal};
use crate::heap::{Heap, HeapId, HeapObject, ObjectKind};
use crate::resource::{ResourceLimits, ResourceTracker};
use crate::scope::Scope;

/// One call frame: a function activation, or the module itself at `frames[0]`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub line: u32,
    pub locals: IndexMap<String, Value>,
    pub globals_declared: ahash::AHashSet<String>,
}

impl Frame {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), line: 0, locals: IndexMap::new(), globals_declared: Default::default() }
    }
}

/// A point at which the controller protocol may pause execution.
///
/// `spec.md` §3's four trace kinds, stripped of the bytecode-opcode
/// granularity the teacher's `TraceEvent` enum has — there is no separate
/// instruction stream here, just statement boundaries and call/return/raise.
#[derive(Debug, Clone)]
pub enum TraceEventKind {
    Call,
    Line,
    Return(Value),
    Exception(PyException),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseAction {
    Continue,
    Quit,
}

/// Receives trace events and decides whether execution continues.
///
/// Implementations get `&mut Interpreter`, so they can run the expression
/// evaluator (`spec.md` §4.C) or walk the heap to build a snapshot
/// (§4.D) from inside the pause. `Interpreter::pause` takes the hook out of
/// `self` before calling it and puts it back after, the same
/// take-then-restore shape the teacher's tracer slot uses to avoid a
/// self-referential `&mut self` borrow.
pub trait TraceHook {
    fn on_event(&mut self, interp: &mut Interpreter, event: TraceEventKind) -> PauseAction;
}

pub struct Interpreter {
    pub heap: Heap,
    pub frames: Vec<Frame>,
    pub file_name: String,
    pub scope: Scope,
    pub hook: Option<Box<dyn TraceHook>>,
    /// Backs the `random` module. Reseedable via `random.seed(n)` so traced
    /// runs can be made reproducible, the way `original_source` expects.
    pub rng: rand::rngs::StdRng,
    resource: ResourceTracker,
}

impl Interpreter {
    #[must_use]
    pub fn new(scope: Scope) -> Self {
        Self::with_limits(scope, ResourceLimits::default())
    }

    #[must_use]
    pub fn with_limits(scope: Scope, limits: ResourceLimits) -> Self {
        use rand::SeedableRng;
        let file_name = scope.file.clone();
        Self {
            heap: Heap::new(),
            frames: vec![Frame::new("<module>")],
            file_name,
            scope,
            hook: None,
            rng: rand::rngs::StdRng::from_entropy(),
            resource: ResourceTracker::new(limits),
        }
    }

    pub fn set_hook(&mut self, hook: Box<dyn TraceHook>) {
        self.hook = Some(hook);
    }

    #[must_use]
    pub fn current_frame(&self) -> &Frame {
        self.frames.last().expect("module frame always present")
    }

    pub fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("module frame always present")
    }

    fn pause(&mut self, event: TraceEventKind) -> Result<(), Unwind> {
        let mut hook = self.hook.take();
        let action = match hook.as_mut() {
            Some(h) => h.on_event(self, event),
            None => PauseAction::Continue,
        };
        self.hook = hook;
        match action {
            PauseAction::Continue => Ok(()),
            PauseAction::Quit => Err(Unwind::Quit),
        }
    }

    /// Raises a Python-style exception, firing the one `Exception` trace
    /// event `spec.md` fires at the point an error originates, then unwinds.
    pub(crate) fn raise<T>(&mut self, kind: &str, message: impl Into<String>, line: u32) -> Result<T, Unwind> {
        let exc = PyException::new(kind, message, line);
        self.pause(TraceEventKind::Exception(exc.clone()))?;
        Err(Unwind::Exception(exc))
    }

    /// Runs a parsed module to completion (or until `QUIT`/an uncaught error).
    pub fn run(&mut self, stmts: &[Stmt]) -> Result<(), Unwind> {
        self.pause(TraceEventKind::Call)?;
        let outcome = self.execute_block(stmts);
        let pause_result = match &outcome {
            Ok(_) => self.pause(TraceEventKind::Return(Value::None)),
            Err(_) => Ok(()),
        };
        pause_result?;
        outcome.map(|_| ())
    }

    // -- name resolution -----------------------------------------------

    fn lookup_name(&self, name: &str) -> Option<Value> {
        if self.frames.len() > 1 {
            let frame = self.current_frame();
            if !frame.globals_declared.contains(name) {
                if let Some(v) = frame.locals.get(name) {
                    return Some(v.clone());
                }
            }
        }
        if let Some(v) = self.frames[0].locals.get(name) {
            return Some(v.clone());
        }
        if self.scope.has_builtin(name) {
            return Some(Value::NativeFunction(Rc::from(name)));
        }
        None
    }

    fn assign_name(&mut self, name: &str, value: Value) {
        let is_module_frame = self.frames.len() == 1;
        let declared_global = !is_module_frame && self.current_frame().globals_declared.contains(name);
        if is_module_frame || declared_global {
            self.frames[0].locals.insert(name.to_owned(), value);
        } else {
            self.current_frame_mut().locals.insert(name.to_owned(), value);
        }
    }

    // -- statement execution ---------------------------------------------

    fn execute_block(&mut self, stmts: &[Stmt]) -> Result<Option<ExecSignal>, Unwind> {
        for stmt in stmts {
            let line = stmt.line();
            self.current_frame_mut().line = line;
            if let Err(err) = self.resource.on_statement() {
                return self.raise_resource(err, line);
            }
            if let Err(err) = self.resource.check_allocations(self.heap.live_count()) {
                return self.raise_resource(err, line);
            }
            self.pause(TraceEventKind::Line)?;
            if let Some(signal) = self.execute_stmt(stmt)? {
                return Ok(Some(signal));
            }
        }
        Ok(None)
    }

    fn raise_resource<T>(&mut self, err: crate::resource::ResourceError, line: u32) -> Result<T, Unwind> {
        let exc = err.into_exception(line);
        self.pause(TraceEventKind::Exception(exc.clone()))?;
        Err(Unwind::Exception(exc))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Option<ExecSignal>, Unwind> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval_expr(e)?;
                Ok(None)
            }
            Stmt::Assign { targets, value, line } => {
                let v = self.eval_expr(value)?;
                for target in targets {
                    self.assign_target(target, v.clone(), *line)?;
                }
                Ok(None)
            }
            Stmt::AugAssign { target, op, value, line } => {
                let current = self.eval_expr(target)?;
                let rhs = self.eval_expr(value)?;
                let result = self.apply_binop(*op, &current, &rhs, *line)?;
                self.assign_target(target, result, *line)?;
                Ok(None)
            }
            Stmt::If { branches, orelse, .. } => {
                for (test, body) in branches {
                    if self.eval_expr(test)?.truthy() {
                        return self.execute_block(body);
                    }
                }
                self.execute_block(orelse)
            }
            Stmt::While { test, body, .. } => {
                while self.eval_expr(test)?.truthy() {
                    match self.execute_block(body)? {
                        Some(ExecSignal::Break) => break,
                        Some(ExecSignal::Continue) | None => {}
                        Some(sig @ ExecSignal::Return(_)) => return Ok(Some(sig)),
                    }
                }
                Ok(None)
            }
            Stmt::For { target, iter, body, line } => {
                let iterable = self.eval_expr(iter)?;
                let items = self.iterate(&iterable, *line)?;
                for item in items {
                    self.assign_target(target, item, *line)?;
                    match self.execute_block(body)? {
                        Some(ExecSignal::Break) => break,
                        Some(ExecSignal::Continue) | None => {}
                        Some(sig @ ExecSignal::Return(_)) => return Ok(Some(sig)),
                    }
                }
                Ok(None)
            }
            Stmt::FunctionDef { name, params, body, .. } => {
                let func = Rc::new(FunctionDef { name: name.clone(), params: params.clone(), body: body.clone() });
                self.assign_name(name, Value::Function(func));
                Ok(None)
            }
            Stmt::ClassDef { name, bases, body, line } => {
                self.define_class(name, bases, body, *line)?;
                Ok(None)
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::None,
                };
                Ok(Some(ExecSignal::Return(v)))
            }
            Stmt::Pass { .. } => Ok(None),
            Stmt::Break { .. } => Ok(Some(ExecSignal::Break)),
            Stmt::Continue { .. } => Ok(Some(ExecSignal::Continue)),
            Stmt::Import { module, alias, line } => {
                self.do_import(module, alias.as_deref(), *line)?;
                Ok(None)
            }
            Stmt::ImportFrom { module, names, line } => {
                self.do_import_from(module, names, *line)?;
                Ok(None)
            }
            Stmt::Global { names, .. } => {
                let frame = self.current_frame_mut();
                for n in names {
                    frame.globals_declared.insert(n.clone());
                }
                Ok(None)
            }
        }
    }

    fn assign_target(&mut self, target: &Expr, value: Value, line: u32) -> Result<(), Unwind> {
        match target {
            Expr::Name(name, _) => {
                self.assign_name(name, value);
                Ok(())
            }
            Expr::Attribute { value: obj_expr, attr, .. } => {
                let obj = self.eval_expr(obj_expr)?;
                if let Value::Heap(id) = obj {
                    if let Some(HeapObject::Instance { attrs, .. }) = self.heap.get_mut(id) {
                        attrs.insert(attr.clone(), value);
                        return Ok(());
                    }
                }
                self.raise("AttributeError", format!("cannot set attribute '{attr}'"), line)
            }
            Expr::Subscript { value: obj_expr, index, .. } => {
                let obj = self.eval_expr(obj_expr)?;
                let idx = self.eval_expr(index)?;
                self.subscript_assign(&obj, &idx, value, line)
            }
            Expr::Tuple(items, _) | Expr::List(items, _) => {
                let values = self.iterate(&value, line)?;
                if values.len() != items.len() {
                    return self.raise("ValueError", format!("expected {} values, got {}", items.len(), values.len()), line);
                }
                for (t, v) in items.iter().zip(values) {
                    self.assign_target(t, v, line)?;
                }
                Ok(())
            }
            _ => self.raise("SyntaxError", "invalid assignment target", line),
        }
    }

    fn subscript_assign(&mut self, obj: &Value, idx: &Value, value: Value, line: u32) -> Result<(), Unwind> {
        if let Value::Heap(id) = obj {
            let kind = self.heap.get(*id).map(HeapObject::kind);
            match kind {
                Some(ObjectKind::Alist) => {
                    let len = if let Some(HeapObject::List(items)) = self.heap.get(*id) { items.len() } else { 0 };
                    let i = self.as_index(idx, len, line)?;
                    if let Some(HeapObject::List(items)) = self.heap.get_mut(*id) {
                        if i < items.len() {
                            items[i] = value;
                            return Ok(());
                        }
                    }
                    return self.raise("IndexError", "list assignment index out of range", line);
                }
                Some(ObjectKind::Map) => {
                    if let Some(HeapObject::Dict(pairs)) = self.heap.get_mut(*id) {
                        if let Some(entry) = pairs.iter_mut().find(|(k, _)| values_equal(k, idx)) {
                            entry.1 = value;
                        } else {
                            pairs.push((idx.clone(), value));
                        }
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        self.raise("TypeError", "object does not support item assignment", line)
    }

    // -- function/class calls --------------------------------------------

    fn call_user_function(&mut self, func: Rc<FunctionDef>, args: Vec<Value>) -> Result<Value, Unwind> {
        let call_line = self.current_frame().line;
        if let Err(err) = self.resource.check_recursion_depth(self.frames.len()) {
            return self.raise_resource(err, call_line);
        }
        let mut locals = IndexMap::new();
        for (i, param) in func.params.iter().enumerate() {
            let value = if i < args.len() {
                args[i].clone()
            } else if let Some(default_expr) = &param.default {
                self.eval_expr(default_expr)?
            } else {
                Value::None
            };
            locals.insert(param.name.clone(), value);
        }
        self.frames.push(Frame { name: func.name.clone(), line: func.body.first().map(Stmt::line).unwrap_or(0), locals, globals_declared: Default::default() });
        let outcome = self.execute_block(&func.body);
        let result = match outcome {
            Ok(Some(ExecSignal::Return(v))) => Ok(v),
            Ok(_) => Ok(Value::None),
            Err(e) => Err(e),
        };
        let pause_result = match &result {
            Ok(v) => self.pause(TraceEventKind::Return(v.clone())),
            Err(_) => Ok(()),
        };
        self.frames.pop();
        pause_result?;
        result
    }

    fn instantiate(&mut self, class: Rc<ClassDef>, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
        let _ = line;
        let id = self.heap.allocate(HeapObject::Instance { class: class.clone(), attrs: IndexMap::new() });
        if let Some(init) = class.find_method("__init__") {
            let mut call_args = Vec::with_capacity(args.len() + 1);
            call_args.push(Value::Heap(id));
            call_args.extend(args);
            self.call_user_function(init, call_args)?;
        }
        Ok(Value::Heap(id))
    }

    /// Only `def` statements in a class body become methods; other
    /// top-level statements (class-level data attributes) are not supported
    /// by this restricted grammar and are skipped.
    fn define_class(&mut self, name: &str, bases: &[String], body: &[Stmt], line: u32) -> Result<(), Unwind> {
        let base = match bases.first() {
            Some(base_name) => match self.lookup_name(base_name) {
                Some(Value::Class(c)) => Some(c),
                _ => return self.raise("NameError", format!("base class '{base_name}' is not defined"), line),
            },
            None => None,
        };
        let mut methods = ahash::AHashMap::new();
        for stmt in body {
            if let Stmt::FunctionDef { name: mname, params, body: mbody, .. } = stmt {
                methods.insert(mname.clone(), Rc::new(FunctionDef { name: mname.clone(), params: params.clone(), body: mbody.clone() }));
            }
        }
        let class = Rc::new(ClassDef { name: name.to_owned(), base, methods, line });
        self.assign_name(name, Value::Class(class));
        Ok(())
    }

    fn do_import(&mut self, module: &str, alias: Option<&str>, line: u32) -> Result<(), Unwind> {
        if !self.scope.import_policy.allows(module) {
            return self.raise("ImportError", format!("import of '{module}' is not permitted"), line);
        }
        if !crate::modules::is_known(module) {
            return self.raise("ModuleNotFoundError", format!("No module named '{module}'"), line);
        }
        let bound_name = alias.unwrap_or(module).to_owned();
        self.assign_name(&bound_name, Value::Module(Rc::from(module)));
        Ok(())
    }

    fn do_import_from(&mut self, module: &str, names: &[String], line: u32) -> Result<(), Unwind> {
        if !self.scope.import_policy.allows(module) {
            return self.raise("ImportError", format!("import of '{module}' is not permitted"), line);
        }
        if !crate::modules::is_known(module) {
            return self.raise("ModuleNotFoundError", format!("No module named '{module}'"), line);
        }
        for name in names {
            if let Some(value) = crate::modules::constant(module, name) {
                self.assign_name(name, value);
                continue;
            }
            if !crate::modules::has_function(module, name) {
                return self.raise("ImportError", format!("cannot import name '{name}' from '{module}'"), line);
            }
            let qualified = format!("{module}.{name}");
            self.assign_name(name, Value::NativeFunction(Rc::from(qualified.as_str())));
        }
        Ok(())
    }

    // -- expression evaluation --------------------------------------------

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Int(n, _) => Ok(Value::Int(*n)),
            Expr::Float(n, _) => Ok(Value::Float(*n)),
            Expr::Str(s, _) => Ok(Value::Str(Rc::from(s.as_str()))),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::None(_) => Ok(Value::None),
            Expr::Name(name, line) => match self.lookup_name(name) {
                Some(v) => Ok(v),
                None => self.raise("NameError", format!("name '{name}' is not defined"), *line),
            },
            Expr::List(items, _) => {
                let vals = self.eval_all(items)?;
                Ok(Value::Heap(self.heap.allocate(HeapObject::List(vals))))
            }
            Expr::Tuple(items, _) => {
                let vals = self.eval_all(items)?;
                Ok(Value::Heap(self.heap.allocate(HeapObject::Tuple(vals))))
            }
            Expr::Set(items, _) => {
                let vals = self.eval_all(items)?;
                let mut set = Vec::new();
                for v in vals {
                    if !set.iter().any(|e| values_equal(e, &v)) {
                        set.push(v);
                    }
                }
                Ok(Value::Heap(self.heap.allocate(HeapObject::Set(set))))
            }
            Expr::Dict(pairs, _) => {
                let mut out: Vec<(Value, Value)> = Vec::new();
                for (k, v) in pairs {
                    let kv = self.eval_expr(k)?;
                    let vv = self.eval_expr(v)?;
                    if let Some(entry) = out.iter_mut().find(|(ek, _)| values_equal(ek, &kv)) {
                        entry.1 = vv;
                    } else {
                        out.push((kv, vv));
                    }
                }
                Ok(Value::Heap(self.heap.allocate(HeapObject::Dict(out))))
            }
            Expr::BinOp { left, op, right, line } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                self.apply_binop(*op, &l, &r, *line)
            }
            Expr::BoolOp { op, values, .. } => {
                let mut result = Value::Bool(matches!(op, BoolOp::And));
                for v in values {
                    let val = self.eval_expr(v)?;
                    let truthy = val.truthy();
                    result = val;
                    match op {
                        BoolOp::And if !truthy => return Ok(result),
                        BoolOp::Or if truthy => return Ok(result),
                        _ => {}
                    }
                }
                Ok(result)
            }
            Expr::Compare { left, ops, comparators, line } => self.eval_compare(left, ops, comparators, *line),
            Expr::UnaryOp { op, operand, line } => {
                let v = self.eval_expr(operand)?;
                self.apply_unary(*op, &v, *line)
            }
            Expr::Call { func, args, kwargs, line } => self.eval_call(func, args, kwargs, *line),
            Expr::Attribute { value, attr, line } => self.eval_attribute(value, attr, *line),
            Expr::Subscript { value, index, line } => {
                let obj = self.eval_expr(value)?;
                let idx = self.eval_expr(index)?;
                self.get_item(&obj, &idx, *line)
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, Unwind> {
        exprs.iter().map(|e| self.eval_expr(e)).collect()
    }

    fn eval_compare(&mut self, left: &Expr, ops: &[CmpOp], comparators: &[Expr], line: u32) -> Result<Value, Unwind> {
        let mut prev = self.eval_expr(left)?;
        for (op, comp_expr) in ops.iter().zip(comparators) {
            let cur = self.eval_expr(comp_expr)?;
            let ok = self.compare_values(*op, &prev, &cur, line)?;
            if !ok {
                return Ok(Value::Bool(false));
            }
            prev = cur;
        }
        Ok(Value::Bool(true))
    }

    fn compare_values(&mut self, op: CmpOp, a: &Value, b: &Value, line: u32) -> Result<bool, Unwind> {
        match op {
            CmpOp::Eq => Ok(values_equal(a, b)),
            CmpOp::NotEq => Ok(!values_equal(a, b)),
            CmpOp::Is => Ok(values_equal(a, b)),
            CmpOp::IsNot => Ok(!values_equal(a, b)),
            CmpOp::Lt | CmpOp::LtEq | CmpOp::Gt | CmpOp::GtEq => {
                let ordering = self.numeric_or_str_cmp(a, b, line)?;
                Ok(match op {
                    CmpOp::Lt => ordering == std::cmp::Ordering::Less,
                    CmpOp::LtEq => ordering != std::cmp::Ordering::Greater,
                    CmpOp::Gt => ordering == std::cmp::Ordering::Greater,
                    CmpOp::GtEq => ordering != std::cmp::Ordering::Less,
                    _ => unreachable!(),
                })
            }
            CmpOp::In | CmpOp::NotIn => {
                let items = self.iterate(b, line)?;
                let found = items.iter().any(|v| values_equal(v, a));
                Ok(if op == CmpOp::In { found } else { !found })
            }
        }
    }

    fn numeric_or_str_cmp(&mut self, a: &Value, b: &Value, line: u32) -> Result<std::cmp::Ordering, Unwind> {
        match (a, b) {
            (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
            (Value::Int(_) | Value::Float(_) | Value::Bool(_), Value::Int(_) | Value::Float(_) | Value::Bool(_)) => {
                let x = Self::as_f64(a);
                let y = Self::as_f64(b);
                match x.partial_cmp(&y) {
                    Some(o) => Ok(o),
                    None => self.raise("ValueError", "cannot compare NaN", line),
                }
            }
            _ => self.raise("TypeError", format!("'<' not supported between instances of '{}' and '{}'", a.type_name(), b.type_name()), line),
        }
    }

    fn apply_unary(&mut self, op: UnaryOp, v: &Value, line: u32) -> Result<Value, Unwind> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
            UnaryOp::Neg => match v {
                Value::Int(n) => Ok(Value::Int(-n)),
                Value::Float(n) => Ok(Value::Float(-n)),
                _ => self.raise("TypeError", format!("bad operand type for unary -: '{}'", v.type_name()), line),
            },
        }
    }

    fn apply_binop(&mut self, op: BinOp, l: &Value, r: &Value, line: u32) -> Result<Value, Unwind> {
        if let (Value::Str(a), Value::Str(b)) = (l, r) {
            if op == BinOp::Add {
                return Ok(Value::Str(Rc::from(format!("{a}{b}").as_str())));
            }
        }
        if let (Value::Int(a), Value::Int(b)) = (l, r) {
            return self.int_binop(op, *a, *b, line);
        }
        if matches!(l, Value::Int(_) | Value::Float(_) | Value::Bool(_)) && matches!(r, Value::Int(_) | Value::Float(_) | Value::Bool(_)) {
            return self.float_binop(op, Self::as_f64(l), Self::as_f64(r), line);
        }
        self.raise("TypeError", format!("unsupported operand type(s) for {:?}: '{}' and '{}'", op, l.type_name(), r.type_name()), line)
    }

    /// Widens a result to `Value::Float` once its magnitude reaches 2^53,
    /// the point at which `f64` can no longer represent every integer
    /// exactly — the widening threshold `spec.md` §3 calls out for `Value`.
    fn widen_int(n: i64) -> Value {
        if (n as f64).abs() < 9_007_199_254_740_992.0 { Value::Int(n) } else { Value::Float(n as f64) }
    }

    fn int_binop(&mut self, op: BinOp, a: i64, b: i64, line: u32) -> Result<Value, Unwind> {
        match op {
            BinOp::Add => Ok(a.checked_add(b).map(Self::widen_int).unwrap_or(Value::Float(a as f64 + b as f64))),
            BinOp::Sub => Ok(a.checked_sub(b).map(Self::widen_int).unwrap_or(Value::Float(a as f64 - b as f64))),
            BinOp::Mul => Ok(a.checked_mul(b).map(Self::widen_int).unwrap_or(Value::Float(a as f64 * b as f64))),
            BinOp::Div => {
                if b == 0 {
                    return self.raise("ZeroDivisionError", "division by zero", line);
                }
                Ok(Value::Float(a as f64 / b as f64))
            }
            BinOp::FloorDiv => {
                if b == 0 {
                    return self.raise("ZeroDivisionError", "integer division or modulo by zero", line);
                }
                Ok(Value::Int((a as f64 / b as f64).floor() as i64))
            }
            BinOp::Mod => {
                if b == 0 {
                    return self.raise("ZeroDivisionError", "integer division or modulo by zero", line);
                }
                Ok(Value::Int(a.rem_euclid(b)))
            }
            BinOp::Pow => {
                let result = (a as f64).powf(b as f64);
                if b >= 0 && result.abs() < 9_007_199_254_740_992.0 { Ok(Value::Int(result as i64)) } else { Ok(Value::Float(result)) }
            }
        }
    }

    fn float_binop(&mut self, op: BinOp, a: f64, b: f64, line: u32) -> Result<Value, Unwind> {
        match op {
            BinOp::Add => Ok(Value::Float(a + b)),
            BinOp::Sub => Ok(Value::Float(a - b)),
            BinOp::Mul => Ok(Value::Float(a * b)),
            BinOp::Div => {
                if b == 0.0 {
                    return self.raise("ZeroDivisionError", "float division by zero", line);
                }
                Ok(Value::Float(a / b))
            }
            BinOp::FloorDiv => {
                if b == 0.0 {
                    return self.raise("ZeroDivisionError", "float floor division by zero", line);
                }
                Ok(Value::Float((a / b).floor()))
            }
            BinOp::Mod => {
                if b == 0.0 {
                    return self.raise("ZeroDivisionError", "float modulo", line);
                }
                Ok(Value::Float(a.rem_euclid(b)))
            }
            BinOp::Pow => Ok(Value::Float(a.powf(b))),
        }
    }

    fn as_f64(v: &Value) -> f64 {
        match v {
            Value::Int(n) => *n as f64,
            Value::Float(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn as_index(&mut self, v: &Value, len: usize, line: u32) -> Result<usize, Unwind> {
        let n = match v {
            Value::Int(n) => *n,
            _ => return self.raise("TypeError", "indices must be integers", line),
        };
        let idx = if n < 0 { n + len as i64 } else { n };
        if idx < 0 || idx as usize >= len {
            return self.raise("IndexError", "index out of range", line);
        }
        Ok(idx as usize)
    }

    fn iterate(&mut self, value: &Value, line: u32) -> Result<Vec<Value>, Unwind> {
        match value {
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(Rc::from(c.to_string().as_str()))).collect()),
            Value::Heap(id) => {
                let id = *id;
                let snapshot = match self.heap.get(id) {
                    Some(HeapObject::List(items) | HeapObject::Tuple(items) | HeapObject::Set(items)) => Some(items.clone()),
                    Some(HeapObject::Dict(pairs)) => Some(pairs.iter().map(|(k, _)| k.clone()).collect()),
                    _ => None,
                };
                match snapshot {
                    Some(items) => Ok(items),
                    None => self.raise("TypeError", "object is not iterable", line),
                }
            }
            _ => self.raise("TypeError", format!("'{}' object is not iterable", value.type_name()), line),
        }
    }

    fn get_item(&mut self, obj: &Value, idx: &Value, line: u32) -> Result<Value, Unwind> {
        match obj {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = self.as_index(idx, chars.len(), line)?;
                match chars.get(i) {
                    Some(c) => Ok(Value::Str(Rc::from(c.to_string().as_str()))),
                    None => self.raise("IndexError", "string index out of range", line),
                }
            }
            Value::Heap(id) => {
                let id = *id;
                let view = match self.heap.get(id) {
                    Some(HeapObject::List(items) | HeapObject::Tuple(items)) => Some(("seq", items.len())),
                    Some(HeapObject::Dict(_)) => Some(("dict", 0)),
                    _ => None,
                };
                match view {
                    Some(("seq", len)) => {
                        let i = self.as_index(idx, len, line)?;
                        if let Some(HeapObject::List(items) | HeapObject::Tuple(items)) = self.heap.get(id) {
                            return Ok(items[i].clone());
                        }
                        self.raise("IndexError", "index out of range", line)
                    }
                    Some(("dict", _)) => {
                        if let Some(HeapObject::Dict(pairs)) = self.heap.get(id) {
                            if let Some((_, v)) = pairs.iter().find(|(k, _)| values_equal(k, idx)) {
                                return Ok(v.clone());
                            }
                        }
                        self.raise("KeyError", format!("{idx}"), line)
                    }
                    _ => self.raise("TypeError", "object is not subscriptable", line),
                }
            }
            _ => self.raise("TypeError", format!("'{}' object is not subscriptable", obj.type_name()), line),
        }
    }

    fn eval_attribute(&mut self, value: &Expr, attr: &str, line: u32) -> Result<Value, Unwind> {
        let obj = self.eval_expr(value)?;
        match &obj {
            Value::Heap(id) => {
                let found = match self.heap.get(*id) {
                    Some(HeapObject::Instance { class, attrs }) => attrs.get(attr).cloned().or_else(|| class.find_method(attr).map(Value::Function)),
                    _ => None,
                };
                match found {
                    Some(v) => Ok(v),
                    None => self.raise("AttributeError", format!("object has no attribute '{attr}'"), line),
                }
            }
            Value::Class(class) => match class.find_method(attr) {
                Some(method) => Ok(Value::Function(method)),
                None => self.raise("AttributeError", format!("type object '{}' has no attribute '{attr}'", class.name), line),
            },
            Value::Module(name) => {
                if let Some(v) = crate::modules::constant(name, attr) {
                    return Ok(v);
                }
                if crate::modules::has_function(name, attr) {
                    let qualified = format!("{name}.{attr}");
                    return Ok(Value::NativeFunction(Rc::from(qualified.as_str())));
                }
                self.raise("AttributeError", format!("module '{name}' has no attribute '{attr}'"), line)
            }
            _ => self.raise("AttributeError", format!("'{}' object has no attribute '{attr}'", obj.type_name()), line),
        }
    }

    fn eval_call(&mut self, func: &Expr, args: &[Expr], kwargs: &[(String, Expr)], line: u32) -> Result<Value, Unwind> {
        if let Expr::Attribute { value, attr, line: attr_line } = func {
            let arg_values = self.eval_all(args)?;
            return self.eval_method_call(value, attr, arg_values, kwargs, *attr_line, line);
        }
        let arg_values = self.eval_all(args)?;
        let callee = self.eval_expr(func)?;
        self.invoke(callee, arg_values, kwargs, line)
    }

    /// Calls an arbitrary [`Value`] the way a `Call` expression would,
    /// for native module functions (`functools.reduce`, `sorted(key=...)`)
    /// that need to invoke a user-supplied callback.
    pub(crate) fn invoke_callable(&mut self, callee: Value, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
        self.invoke(callee, args, &[], line)
    }

    fn invoke(&mut self, callee: Value, args: Vec<Value>, kwargs: &[(String, Expr)], line: u32) -> Result<Value, Unwind> {
        match callee {
            Value::Function(f) => self.call_user_function(f, args),
            Value::NativeFunction(name) => self.call_native(&name, args, kwargs, line),
            Value::Class(class) => self.instantiate(class, args, line),
            other => self.raise("TypeError", format!("'{}' object is not callable", other.type_name()), line),
        }
    }

    fn eval_method_call(&mut self, obj_expr: &Expr, attr: &str, args: Vec<Value>, kwargs: &[(String, Expr)], attr_line: u32, call_line: u32) -> Result<Value, Unwind> {
        let obj = self.eval_expr(obj_expr)?;
        let _ = kwargs;
        match &obj {
            Value::Module(name) => {
                let qualified = format!("{name}.{attr}");
                crate::modules::call(self, &qualified, args, call_line)
            }
            Value::Heap(id) => {
                if let Some(result) = self.try_container_method(*id, attr, &args, call_line)? {
                    return Ok(result);
                }
                let class = match self.heap.get(*id) {
                    Some(HeapObject::Instance { class, .. }) => class.clone(),
                    _ => return self.raise("AttributeError", format!("object has no attribute '{attr}'"), attr_line),
                };
                let method = match class.find_method(attr) {
                    Some(m) => m,
                    None => return self.raise("AttributeError", format!("'{}' object has no attribute '{attr}'", class.name), attr_line),
                };
                let mut call_args = Vec::with_capacity(args.len() + 1);
                call_args.push(obj.clone());
                call_args.extend(args);
                self.call_user_function(method, call_args)
            }
            Value::Class(class) => match class.find_method(attr) {
                Some(method) => self.call_user_function(method, args),
                None => self.raise("AttributeError", format!("type object '{}' has no attribute '{attr}'", class.name), attr_line),
            },
            _ => self.raise("AttributeError", format!("'{}' object has no attribute '{attr}'", obj.type_name()), attr_line),
        }
    }

    fn try_container_method(&mut self, id: HeapId, attr: &str, args: &[Value], line: u32) -> Result<Option<Value>, Unwind> {
        let kind = match self.heap.get(id) {
            Some(o) => o.kind(),
            None => return Ok(None),
        };
        match (kind, attr) {
            (ObjectKind::Alist, "append") => {
                if let Some(HeapObject::List(items)) = self.heap.get_mut(id) {
                    items.push(args.first().cloned().unwrap_or(Value::None));
                    return Ok(Some(Value::None));
                }
                Ok(None)
            }
            (ObjectKind::Alist, "pop") => {
                let len = if let Some(HeapObject::List(items)) = self.heap.get(id) { items.len() } else { 0 };
                if len == 0 {
                    return self.raise("IndexError", "pop from empty list", line).map(Some);
                }
                let idx = match args.first() {
                    Some(v) => self.as_index(v, len, line)?,
                    None => len - 1,
                };
                if let Some(HeapObject::List(items)) = self.heap.get_mut(id) {
                    return Ok(Some(items.remove(idx)));
                }
                Ok(None)
            }
            (ObjectKind::Map, "get") => {
                let key = args.first().cloned().unwrap_or(Value::None);
                let default = args.get(1).cloned().unwrap_or(Value::None);
                if let Some(HeapObject::Dict(pairs)) = self.heap.get(id) {
                    let found = pairs.iter().find(|(k, _)| values_equal(k, &key)).map(|(_, v)| v.clone());
                    return Ok(Some(found.unwrap_or(default)));
                }
                Ok(Some(default))
            }
            (ObjectKind::Map, "keys") => {
                let keys = if let Some(HeapObject::Dict(pairs)) = self.heap.get(id) { pairs.iter().map(|(k, _)| k.clone()).collect() } else { Vec::new() };
                Ok(Some(Value::Heap(self.heap.allocate(HeapObject::List(keys)))))
            }
            (ObjectKind::Map, "values") => {
                let values = if let Some(HeapObject::Dict(pairs)) = self.heap.get(id) { pairs.iter().map(|(_, v)| v.clone()).collect() } else { Vec::new() };
                Ok(Some(Value::Heap(self.heap.allocate(HeapObject::List(values)))))
            }
            (ObjectKind::Map, "items") => {
                let pairs = if let Some(HeapObject::Dict(pairs)) = self.heap.get(id) { pairs.clone() } else { Vec::new() };
                let tuples = pairs.into_iter().map(|(k, v)| Value::Heap(self.heap.allocate(HeapObject::Tuple(vec![k, v])))).collect();
                Ok(Some(Value::Heap(self.heap.allocate(HeapObject::List(tuples)))))
            }
            (ObjectKind::Set, "add") => {
                let v = args.first().cloned().unwrap_or(Value::None);
                if let Some(HeapObject::Set(items)) = self.heap.get_mut(id) {
                    if !items.iter().any(|e| values_equal(e, &v)) {
                        items.push(v);
                    }
                    return Ok(Some(Value::None));
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    // -- builtins -----------------------------------------------------

    fn call_native(&mut self, name: &str, args: Vec<Value>, kwargs: &[(String, Expr)], line: u32) -> Result<Value, Unwind> {
        if name.contains('.') {
            return crate::modules::call(self, name, args, line);
        }
        match name {
            "print" => {
                let parts: Vec<String> = args.iter().map(|v| self.display_value(v)).collect();
                println!("{}", parts.join(" "));
                Ok(Value::None)
            }
            "len" => {
                let first = args.first().cloned().unwrap_or(Value::None);
                let n = self.len_of(&first, line)?;
                Ok(Value::Int(n as i64))
            }
            "range" => self.make_range(&args, line),
            "str" => {
                let text = self.display_value(args.first().unwrap_or(&Value::None));
                Ok(Value::Str(Rc::from(text.as_str())))
            }
            "int" => {
                let first = args.first().cloned().unwrap_or(Value::Int(0));
                self.to_int(&first, line)
            }
            "float" => {
                let first = args.first().cloned().unwrap_or(Value::Float(0.0));
                self.to_float(&first, line)
            }
            "bool" => Ok(Value::Bool(args.first().map(Value::truthy).unwrap_or(false))),
            "list" => {
                let items = match args.first() {
                    Some(v) => self.iterate(v, line)?,
                    None => Vec::new(),
                };
                Ok(Value::Heap(self.heap.allocate(HeapObject::List(items))))
            }
            "tuple" => {
                let items = match args.first() {
                    Some(v) => self.iterate(v, line)?,
                    None => Vec::new(),
                };
                Ok(Value::Heap(self.heap.allocate(HeapObject::Tuple(items))))
            }
            "set" => {
                let items = match args.first() {
                    Some(v) => self.iterate(v, line)?,
                    None => Vec::new(),
                };
                let mut out = Vec::new();
                for it in items {
                    if !out.iter().any(|e| values_equal(e, &it)) {
                        out.push(it);
                    }
                }
                Ok(Value::Heap(self.heap.allocate(HeapObject::Set(out))))
            }
            "dict" => Ok(Value::Heap(self.heap.allocate(HeapObject::Dict(Vec::new())))),
            "abs" => match args.first() {
                Some(Value::Int(n)) => Ok(Value::Int(n.abs())),
                Some(Value::Float(n)) => Ok(Value::Float(n.abs())),
                _ => self.raise("TypeError", "bad operand type for abs()", line),
            },
            "min" | "max" => self.min_max(name == "max", &args, line),
            "sum" => self.sum_values(&args, line),
            "sorted" => self.sorted_values(&args, kwargs, line),
            "isinstance" => self.isinstance(&args, line),
            "type" => Ok(self.type_of(args.first().unwrap_or(&Value::None))),
            "repr" => {
                let text = self.repr_value(args.first().unwrap_or(&Value::None));
                Ok(Value::Str(Rc::from(text.as_str())))
            }
            "compile" | "exec" | "open" => self.raise("NotImplementedError", format!("'{name}' is not available in this interpreter"), line),
            _ => self.raise("NameError", format!("name '{name}' is not defined"), line),
        }
    }

    fn display_value(&self, v: &Value) -> String {
        match v {
            Value::Str(s) => s.to_string(),
            Value::Heap(id) => match self.heap.get(*id) {
                Some(HeapObject::List(items)) => format!("[{}]", items.iter().map(|i| self.repr_value(i)).collect::<Vec<_>>().join(", ")),
                Some(HeapObject::Tuple(items)) if items.len() == 1 => format!("({},)", self.repr_value(&items[0])),
                Some(HeapObject::Tuple(items)) => format!("({})", items.iter().map(|i| self.repr_value(i)).collect::<Vec<_>>().join(", ")),
                Some(HeapObject::Set(items)) => format!("{{{}}}", items.iter().map(|i| self.repr_value(i)).collect::<Vec<_>>().join(", ")),
                Some(HeapObject::Dict(pairs)) => {
                    format!("{{{}}}", pairs.iter().map(|(k, v)| format!("{}: {}", self.repr_value(k), self.repr_value(v))).collect::<Vec<_>>().join(", "))
                }
                Some(HeapObject::Instance { class, .. }) => format!("<{} object>", class.name),
                None => "<freed object>".to_owned(),
            },
            other => other.to_string(),
        }
    }

    fn repr_value(&self, v: &Value) -> String {
        match v {
            Value::Str(s) => format!("'{s}'"),
            other => self.display_value(other),
        }
    }

    fn len_of(&mut self, v: &Value, line: u32) -> Result<usize, Unwind> {
        match v {
            Value::Str(s) => Ok(s.chars().count()),
            Value::Heap(id) => {
                let view = match self.heap.get(*id) {
                    Some(HeapObject::List(items) | HeapObject::Tuple(items) | HeapObject::Set(items)) => Some(items.len()),
                    Some(HeapObject::Dict(pairs)) => Some(pairs.len()),
                    _ => None,
                };
                match view {
                    Some(n) => Ok(n),
                    None => self.raise("TypeError", "object has no len()", line),
                }
            }
            _ => self.raise("TypeError", format!("object of type '{}' has no len()", v.type_name()), line),
        }
    }

    fn make_range(&mut self, args: &[Value], line: u32) -> Result<Value, Unwind> {
        let mut ints = Vec::with_capacity(args.len());
        for v in args {
            match v {
                Value::Int(n) => ints.push(*n),
                _ => return self.raise("TypeError", "range() arguments must be integers", line),
            }
        }
        let (start, stop, step) = match ints.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            _ => return self.raise("TypeError", "range expected 1 to 3 arguments", line),
        };
        if step == 0 {
            return self.raise("ValueError", "range() arg 3 must not be zero", line);
        }
        let mut items = Vec::new();
        let mut cur = start;
        while (step > 0 && cur < stop) || (step < 0 && cur > stop) {
            items.push(Value::Int(cur));
            cur += step;
        }
        Ok(Value::Heap(self.heap.allocate(HeapObject::Tuple(items))))
    }

    fn to_int(&mut self, v: &Value, line: u32) -> Result<Value, Unwind> {
        match v {
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Float(n) => Ok(Value::Int(*n as i64)),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Value::Str(s) => match s.trim().parse::<i64>() {
                Ok(n) => Ok(Value::Int(n)),
                Err(_) => self.raise("ValueError", format!("invalid literal for int(): '{s}'"), line),
            },
            _ => self.raise("TypeError", "int() argument must be a string or a number", line),
        }
    }

    fn to_float(&mut self, v: &Value, line: u32) -> Result<Value, Unwind> {
        match v {
            Value::Int(n) => Ok(Value::Float(*n as f64)),
            Value::Float(n) => Ok(Value::Float(*n)),
            Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            Value::Str(s) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(Value::Float(n)),
                Err(_) => self.raise("ValueError", format!("could not convert string to float: '{s}'"), line),
            },
            _ => self.raise("TypeError", "float() argument must be a string or a number", line),
        }
    }

    fn min_max(&mut self, want_max: bool, args: &[Value], line: u32) -> Result<Value, Unwind> {
        let first = args.first().cloned().unwrap_or(Value::None);
        let items: Vec<Value> = if args.len() == 1 { self.iterate(&first, line)? } else { args.to_vec() };
        if items.is_empty() {
            return self.raise("ValueError", "min()/max() arg is an empty sequence", line);
        }
        let mut best = items[0].clone();
        for item in items.into_iter().skip(1) {
            let ord = self.numeric_or_str_cmp(&item, &best, line)?;
            if (want_max && ord == std::cmp::Ordering::Greater) || (!want_max && ord == std::cmp::Ordering::Less) {
                best = item;
            }
        }
        Ok(best)
    }

    fn sum_values(&mut self, args: &[Value], line: u32) -> Result<Value, Unwind> {
        let first = args.first().cloned().unwrap_or(Value::None);
        let items = self.iterate(&first, line)?;
        let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
        for item in items {
            total = self.apply_binop(BinOp::Add, &total, &item, line)?;
        }
        Ok(total)
    }

    /// Comparisons during `sorted()` don't fire the `Exception` trace event
    /// the way other operator errors do: incomparable elements are treated
    /// as equal rather than raising, a deliberate simplification since
    /// `Vec::sort_by`'s comparator cannot propagate a `Result`.
    fn pure_cmp(a: &Value, b: &Value) -> std::cmp::Ordering {
        match (a, b) {
            (Value::Str(x), Value::Str(y)) => x.cmp(y),
            _ => Self::as_f64(a).partial_cmp(&Self::as_f64(b)).unwrap_or(std::cmp::Ordering::Equal),
        }
    }

    fn sorted_values(&mut self, args: &[Value], kwargs: &[(String, Expr)], line: u32) -> Result<Value, Unwind> {
        let first = args.first().cloned().unwrap_or(Value::None);
        let mut items = self.iterate(&first, line)?;
        let reverse = match kwargs.iter().find(|(k, _)| k == "reverse") {
            Some((_, expr)) => self.eval_expr(expr)?.truthy(),
            None => false,
        };
        items.sort_by(Self::pure_cmp);
        if reverse {
            items.reverse();
        }
        Ok(Value::Heap(self.heap.allocate(HeapObject::List(items))))
    }

    fn isinstance(&mut self, args: &[Value], line: u32) -> Result<Value, Unwind> {
        let (obj, class_val) = match (args.first(), args.get(1)) {
            (Some(o), Some(c)) => (o, c),
            _ => return self.raise("TypeError", "isinstance expected 2 arguments", line),
        };
        let result = match (obj, class_val) {
            (Value::Heap(id), Value::Class(target)) => match self.heap.get(*id) {
                Some(HeapObject::Instance { class, .. }) => Self::class_is_or_subclass(class, target),
                _ => false,
            },
            (value, Value::Str(type_name)) => value.type_name() == type_name.as_ref(),
            _ => false,
        };
        Ok(Value::Bool(result))
    }

    fn class_is_or_subclass(class: &Rc<ClassDef>, target: &Rc<ClassDef>) -> bool {
        if Rc::ptr_eq(class, target) {
            return true;
        }
        class.base.as_ref().map(|b| Self::class_is_or_subclass(b, target)).unwrap_or(false)
    }

    fn type_of(&self, v: &Value) -> Value {
        match v {
            Value::Heap(id) => match self.heap.get(*id) {
                Some(HeapObject::Instance { class, .. }) => Value::Class(class.clone()),
                _ => Value::Str(Rc::from(v.type_name())),
            },
            _ => Value::Str(Rc::from(v.type_name())),
        }
    }
}
