//! Tree-walking evaluator.
//!
//! An [`Interpreter`] owns a parsed, immutable program and is shared through
//! `Arc`. Evaluation state lives in [`FunctionCall`]s: each call context owns
//! its argument buffers, so one context per worker thread can run the same
//! program concurrently.

use crate::ast::*;
use crate::builtins;
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::value::{BaseType, Type, Value};
use crate::{CtlError, CtlResult};
use std::path::Path;
use std::sync::Arc;

/// Samples processed by one [`FunctionCall::call`].
pub const MAX_SAMPLES: usize = 4096;

/// Nested user function calls allowed before evaluation aborts.
const MAX_DEPTH: usize = 64;

/// Iterations allowed per loop before evaluation aborts.
const MAX_ITERATIONS: usize = 1 << 20;

// ============================================================================
// Interpreter
// ============================================================================

/// A loaded script.
#[derive(Debug)]
pub struct Interpreter {
    name: String,
    source: String,
    program: Program,
    globals: Vec<(String, Value)>,
}

impl Interpreter {
    /// Parses `src` and evaluates its module-level constants.
    ///
    /// # Errors
    ///
    /// Lexing, parsing, or evaluating a constant fails.
    pub fn load_source(name: impl Into<String>, src: &str) -> CtlResult<Self> {
        let name = name.into();
        let program = parse(tokenize(src)?)?;
        let mut interp = Self {
            name,
            source: src.to_string(),
            program,
            globals: Vec::new(),
        };

        let globals = {
            let mut ex = Exec::new(&interp);
            for g in &interp.program.globals {
                let v = ex.eval(&g.init)?;
                let v = coerce(v, &g.ty, g.line)?;
                ex.vars.push((g.name.as_str(), v));
            }
            ex.vars.into_iter().map(|(n, v)| (n.to_string(), v)).collect()
        };
        interp.globals = globals;

        tracing::debug!(
            script = %interp.name,
            functions = interp.program.functions.len(),
            constants = interp.globals.len(),
            "loaded script"
        );
        Ok(interp)
    }

    /// Reads and loads a script file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> CtlResult<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)?;
        Self::load_source(path.display().to_string(), &src)
    }

    /// Script name (the file path for [`Interpreter::load_file`]).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Samples per [`FunctionCall::call`].
    pub fn max_samples(&self) -> usize {
        MAX_SAMPLES
    }

    /// True if the script defines `name`.
    pub fn has_function(&self, name: &str) -> bool {
        self.program.function_index(name).is_some()
    }

    /// Creates an invocation context for `name`.
    ///
    /// Uniform inputs start at their declared defaults (zero when none).
    ///
    /// # Errors
    ///
    /// [`CtlError::Signature`] if the function is missing or has array
    /// varying inputs or array outputs; evaluation errors from defaults.
    pub fn new_function_call(self: &Arc<Self>, name: &str) -> CtlResult<FunctionCall> {
        let func = self
            .program
            .function_index(name)
            .ok_or_else(|| CtlError::Signature(format!("function '{}' not found in {}", name, self.name)))?;
        let def = &self.program.functions[func];

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut slots = Vec::with_capacity(def.params.len());
        let mut ex = Exec::new(self);

        for p in &def.params {
            let default = match &p.default {
                Some(e) => Some(coerce(ex.eval(e)?, &p.ty, p.line)?),
                None => None,
            };
            if (p.output || p.varying) && !p.ty.is_scalar() {
                return Err(CtlError::Signature(format!(
                    "{}: argument '{}' of type {} must be scalar",
                    name, p.name, p.ty
                )));
            }
            let arg = FunctionArg {
                name: p.name.clone(),
                ty: p.ty.clone(),
                varying: p.varying,
                default,
            };
            if p.output {
                slots.push(Slot::Output(outputs.len()));
                outputs.push(arg);
            } else {
                slots.push(Slot::Input(inputs.len()));
                inputs.push(arg);
            }
        }

        let uniforms = inputs
            .iter()
            .map(|a| a.default.clone().unwrap_or_else(|| a.ty.zero()))
            .collect();
        let input_data = inputs
            .iter()
            .map(|a| if a.varying { vec![0.0; MAX_SAMPLES] } else { Vec::new() })
            .collect();
        let output_data = vec![vec![0.0; MAX_SAMPLES]; outputs.len()];

        Ok(FunctionCall {
            interp: Arc::clone(self),
            func,
            inputs,
            outputs,
            slots,
            uniforms,
            input_data,
            output_data,
        })
    }

    fn global(&self, name: &str) -> Option<&Value> {
        self.globals.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

// ============================================================================
// FunctionCall
// ============================================================================

/// Declared argument of an entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArg {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: Type,
    /// Declared `varying`: one value per sample instead of one per call.
    pub varying: bool,
    /// Declared default, converted to `ty`.
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Input(usize),
    Output(usize),
}

/// Invocation context for one function of a shared [`Interpreter`].
///
/// Varying inputs and all outputs are buffers of
/// [`Interpreter::max_samples`] floats; uniform inputs hold one bound
/// [`Value`]. A context is `Send` but used by one thread at a time.
#[derive(Debug)]
pub struct FunctionCall {
    interp: Arc<Interpreter>,
    func: usize,
    inputs: Vec<FunctionArg>,
    outputs: Vec<FunctionArg>,
    slots: Vec<Slot>,
    uniforms: Vec<Value>,
    input_data: Vec<Vec<f32>>,
    output_data: Vec<Vec<f32>>,
}

impl FunctionCall {
    /// Function name.
    pub fn name(&self) -> &str {
        &self.interp.program.functions[self.func].name
    }

    /// The interpreter this context runs.
    pub fn interpreter(&self) -> &Arc<Interpreter> {
        &self.interp
    }

    /// Input arguments in declaration order.
    pub fn inputs(&self) -> &[FunctionArg] {
        &self.inputs
    }

    /// Output arguments in declaration order.
    pub fn outputs(&self) -> &[FunctionArg] {
        &self.outputs
    }

    /// Sample buffer of varying input `i`; empty for uniform inputs.
    pub fn input_data_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.input_data[i]
    }

    /// Results of output `i` from the last [`FunctionCall::call`].
    pub fn output_data(&self, i: usize) -> &[f32] {
        &self.output_data[i]
    }

    /// Currently bound value of input `i`.
    pub fn uniform(&self, i: usize) -> &Value {
        &self.uniforms[i]
    }

    /// Binds uniform input `i`, converting to its declared type.
    ///
    /// # Errors
    ///
    /// [`CtlError::Signature`] for an unknown or varying input, or a value
    /// that does not convert.
    pub fn set_uniform(&mut self, i: usize, value: Value) -> CtlResult<()> {
        let arg = self
            .inputs
            .get(i)
            .ok_or_else(|| CtlError::Signature(format!("{}: no input {}", self.name(), i)))?;
        if arg.varying {
            return Err(CtlError::Signature(format!("{}: input '{}' is varying", self.name(), arg.name)));
        }
        let v = value
            .coerce(&arg.ty)
            .map_err(|e| CtlError::Signature(format!("{}: input '{}': {}", self.name(), arg.name, e)))?;
        self.uniforms[i] = v;
        Ok(())
    }

    /// Evaluates the function for the first `n` samples of the buffers.
    ///
    /// # Errors
    ///
    /// [`CtlError::Runtime`] from evaluation, or when `n` exceeds
    /// [`Interpreter::max_samples`]. Outputs of samples before the failing
    /// one are already written.
    pub fn call(&mut self, n: usize) -> CtlResult<()> {
        let interp = Arc::clone(&self.interp);
        let def = &interp.program.functions[self.func];
        if n > MAX_SAMPLES {
            return Err(CtlError::runtime(def.line, format!("{} samples exceed the batch size {}", n, MAX_SAMPLES)));
        }

        let mut ex = Exec::new(&interp);
        for s in 0..n {
            ex.vars.clear();
            for (slot, p) in self.slots.iter().zip(&def.params) {
                let v = match *slot {
                    Slot::Input(i) if self.inputs[i].varying => coerce(Value::Float(self.input_data[i][s]), &p.ty, p.line)?,
                    Slot::Input(i) => self.uniforms[i].clone(),
                    Slot::Output(_) => p.ty.zero(),
                };
                ex.vars.push((p.name.as_str(), v));
            }

            ex.exec_stmts(&def.body)?;

            for (k, slot) in self.slots.iter().enumerate() {
                if let Slot::Output(i) = *slot {
                    self.output_data[i][s] = ex.vars[k].1.as_f32().unwrap_or(0.0);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Evaluation
// ============================================================================

enum Flow {
    Next,
    Return(Value),
}

struct Exec<'a> {
    interp: &'a Interpreter,
    vars: Vec<(&'a str, Value)>,
    frame: usize,
    depth: usize,
}

fn coerce(v: Value, ty: &Type, line: usize) -> CtlResult<Value> {
    v.coerce(ty).map_err(|e| CtlError::runtime(line, e))
}

/// Converts `new` to the shape and scalar kind of `old`.
fn coerce_like(old: &Value, new: Value, line: usize) -> CtlResult<Value> {
    let bad = |new: &Value| CtlError::runtime(line, format!("cannot assign {} to {}", new.type_name(), old.type_name()));
    Ok(match old {
        Value::Bool(_) => Value::Bool(new.as_bool().ok_or_else(|| bad(&new))?),
        Value::Int(_) => Value::Int(new.as_i32().ok_or_else(|| bad(&new))?),
        Value::Float(_) => Value::Float(new.as_f32().ok_or_else(|| bad(&new))?),
        Value::Array(items) => match new {
            Value::Array(new_items) if new_items.len() == items.len() => Value::Array(
                items
                    .iter()
                    .zip(new_items)
                    .map(|(o, n)| coerce_like(o, n, line))
                    .collect::<CtlResult<Vec<_>>>()?,
            ),
            other => return Err(bad(&other)),
        },
        Value::Void => return Err(bad(&new)),
    })
}

fn element(v: &Value, i: i32, line: usize) -> CtlResult<&Value> {
    match v {
        Value::Array(items) => usize::try_from(i)
            .ok()
            .and_then(|i| items.get(i))
            .ok_or_else(|| CtlError::runtime(line, format!("index {} out of bounds for length {}", i, items.len()))),
        other => Err(CtlError::runtime(line, format!("cannot index {}", other.type_name()))),
    }
}

fn element_mut(v: &mut Value, i: i32, line: usize) -> CtlResult<&mut Value> {
    match v {
        Value::Array(items) => {
            let len = items.len();
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| CtlError::runtime(line, format!("index {} out of bounds for length {}", i, len)))
        }
        other => Err(CtlError::runtime(line, format!("cannot index {}", other.type_name()))),
    }
}

impl<'a> Exec<'a> {
    fn new(interp: &'a Interpreter) -> Self {
        Self { interp, vars: Vec::new(), frame: 0, depth: 0 }
    }

    fn local(&self, name: &str) -> Option<usize> {
        (self.frame..self.vars.len()).rev().find(|&i| self.vars[i].0 == name)
    }

    fn var_ref(&self, name: &str) -> Option<&Value> {
        match self.local(name) {
            Some(i) => Some(&self.vars[i].1),
            None => self.interp.global(name),
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Runs statements in a new scope.
    fn exec_block(&mut self, stmts: &'a [Stmt]) -> CtlResult<Flow> {
        let mark = self.vars.len();
        let flow = self.exec_stmts(stmts);
        self.vars.truncate(mark);
        flow
    }

    fn exec_stmts(&mut self, stmts: &'a [Stmt]) -> CtlResult<Flow> {
        for s in stmts {
            if let Flow::Return(v) = self.exec(s)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Next)
    }

    fn exec(&mut self, stmt: &'a Stmt) -> CtlResult<Flow> {
        match stmt {
            Stmt::Decl { ty, name, init, line } => {
                let v = match init {
                    Some(e) => {
                        let v = self.eval(e)?;
                        coerce(v, ty, *line)?
                    }
                    None => ty.zero(),
                };
                self.vars.push((name.as_str(), v));
            }
            Stmt::Assign { target, op, value, line } => {
                let v = self.eval(value)?;
                self.assign(target, *op, v, *line)?;
            }
            Stmt::Expr(e) => {
                self.eval(e)?;
            }
            Stmt::If { cond, then_branch, else_branch } => {
                let branch = if self.truth(cond)? { then_branch } else { else_branch };
                return self.exec_block(branch);
            }
            Stmt::While { cond, body } => {
                let mut n = 0;
                while self.truth(cond)? {
                    n += 1;
                    if n > MAX_ITERATIONS {
                        return Err(CtlError::runtime(cond.line, "loop iteration limit exceeded"));
                    }
                    if let Flow::Return(v) = self.exec_block(body)? {
                        return Ok(Flow::Return(v));
                    }
                }
            }
            Stmt::For { init, cond, step, body } => {
                let mark = self.vars.len();
                let flow = self.exec_for(init, cond.as_ref(), step, body);
                self.vars.truncate(mark);
                return flow;
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval(e)?,
                    None => Value::Void,
                };
                return Ok(Flow::Return(v));
            }
            Stmt::Block(stmts) => return self.exec_block(stmts),
        }
        Ok(Flow::Next)
    }

    fn exec_for(
        &mut self,
        init: &'a [Stmt],
        cond: Option<&'a Expr>,
        step: &'a [Stmt],
        body: &'a [Stmt],
    ) -> CtlResult<Flow> {
        self.exec_stmts(init)?;
        let mut n = 0;
        loop {
            if let Some(c) = cond {
                if !self.truth(c)? {
                    return Ok(Flow::Next);
                }
            }
            n += 1;
            if n > MAX_ITERATIONS {
                let line = cond.map_or(0, |c| c.line);
                return Err(CtlError::runtime(line, "loop iteration limit exceeded"));
            }
            if let Flow::Return(v) = self.exec_block(body)? {
                return Ok(Flow::Return(v));
            }
            self.exec_stmts(step)?;
        }
    }

    fn assign(&mut self, place: &'a Place, op: AssignOp, value: Value, line: usize) -> CtlResult<()> {
        let mut indices = Vec::with_capacity(place.indices.len());
        for e in &place.indices {
            indices.push(self.int(e)?);
        }
        self.store(&place.name, &indices, op, value, line)
    }

    /// Writes `value` into variable `name` at the `indices` path.
    fn store(&mut self, name: &str, indices: &[i32], op: AssignOp, value: Value, line: usize) -> CtlResult<()> {
        let Some(slot) = self.local(name) else {
            let msg = if self.interp.global(name).is_some() {
                format!("cannot assign to constant '{}'", name)
            } else {
                format!("unknown variable '{}'", name)
            };
            return Err(CtlError::runtime(line, msg));
        };

        let mut target = &mut self.vars[slot].1;
        for &i in indices {
            target = element_mut(target, i, line)?;
        }

        let value = match op {
            AssignOp::Set => value,
            AssignOp::Add => binary(BinOp::Add, target.clone(), value, line)?,
            AssignOp::Sub => binary(BinOp::Sub, target.clone(), value, line)?,
            AssignOp::Mul => binary(BinOp::Mul, target.clone(), value, line)?,
            AssignOp::Div => binary(BinOp::Div, target.clone(), value, line)?,
        };
        *target = coerce_like(target, value, line)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn truth(&mut self, e: &'a Expr) -> CtlResult<bool> {
        let v = self.eval(e)?;
        v.as_bool()
            .ok_or_else(|| CtlError::runtime(e.line, format!("{} used as a condition", v.type_name())))
    }

    fn int(&mut self, e: &'a Expr) -> CtlResult<i32> {
        match self.eval(e)? {
            Value::Int(i) => Ok(i),
            Value::Bool(b) => Ok(b as i32),
            other => Err(CtlError::runtime(e.line, format!("index must be int, got {}", other.type_name()))),
        }
    }

    fn eval(&mut self, e: &'a Expr) -> CtlResult<Value> {
        match &e.kind {
            ExprKind::Lit(v) => Ok(v.clone()),
            ExprKind::Var(name) => match self.var_ref(name) {
                Some(v) => Ok(v.clone()),
                None => builtins::constant(name)
                    .ok_or_else(|| CtlError::runtime(e.line, format!("unknown variable '{}'", name))),
            },
            ExprKind::Index(..) => self.eval_index(e),
            ExprKind::Call(name, args) => self.call(name, args, e.line),
            ExprKind::Unary(op, inner) => {
                let v = self.eval(inner)?;
                unary(*op, v, e.line)
            }
            ExprKind::Binary(BinOp::And, a, b) => Ok(Value::Bool(self.truth(a)? && self.truth(b)?)),
            ExprKind::Binary(BinOp::Or, a, b) => Ok(Value::Bool(self.truth(a)? || self.truth(b)?)),
            ExprKind::Binary(op, a, b) => {
                let a = self.eval(a)?;
                let b = self.eval(b)?;
                binary(*op, a, b, e.line)
            }
            ExprKind::Ternary(c, a, b) => {
                if self.truth(c)? {
                    self.eval(a)
                } else {
                    self.eval(b)
                }
            }
            ExprKind::List(items) => items.iter().map(|i| self.eval(i)).collect::<CtlResult<Vec<_>>>().map(Value::Array),
        }
    }

    /// Indexing, borrowing the base variable instead of cloning it.
    fn eval_index(&mut self, e: &'a Expr) -> CtlResult<Value> {
        let mut idx_exprs = Vec::new();
        let mut base = e;
        while let ExprKind::Index(b, i) = &base.kind {
            idx_exprs.push(&**i);
            base = b;
        }
        idx_exprs.reverse();
        let mut indices = Vec::with_capacity(idx_exprs.len());
        for ie in idx_exprs {
            indices.push(self.int(ie)?);
        }

        let owned;
        let mut cur = match &base.kind {
            ExprKind::Var(name) => self
                .var_ref(name)
                .ok_or_else(|| CtlError::runtime(base.line, format!("unknown variable '{}'", name)))?,
            _ => {
                owned = self.eval(base)?;
                &owned
            }
        };
        for i in indices {
            cur = element(cur, i, e.line)?;
        }
        Ok(cur.clone())
    }

    fn call(&mut self, name: &'a str, args: &'a [Expr], line: usize) -> CtlResult<Value> {
        if let Some(fi) = self.interp.program.function_index(name) {
            return self.call_user(fi, args, line);
        }
        let mut vals = Vec::with_capacity(args.len());
        for a in args {
            vals.push(self.eval(a)?);
        }
        match builtins::call(name, &vals) {
            Some(r) => r.map_err(|msg| CtlError::runtime(line, format!("{}: {}", name, msg))),
            None => Err(CtlError::runtime(line, format!("unknown function '{}'", name))),
        }
    }

    fn call_user(&mut self, fi: usize, args: &'a [Expr], line: usize) -> CtlResult<Value> {
        let interp = self.interp;
        let f = &interp.program.functions[fi];
        if args.len() > f.params.len() {
            return Err(CtlError::runtime(
                line,
                format!("{} takes {} arguments, got {}", f.name, f.params.len(), args.len()),
            ));
        }
        if self.depth >= MAX_DEPTH {
            return Err(CtlError::runtime(line, "call depth limit exceeded"));
        }

        let mut vals = Vec::with_capacity(f.params.len());
        for (i, p) in f.params.iter().enumerate() {
            let v = match (args.get(i), &p.default) {
                (Some(a), _) => self.eval(a)?,
                (None, Some(d)) => self.eval_isolated(d)?,
                (None, None) => {
                    return Err(CtlError::runtime(line, format!("{}: missing argument '{}'", f.name, p.name)));
                }
            };
            vals.push(if p.output && args.get(i).is_none() { p.ty.zero() } else { coerce(v, &p.ty, line)? });
        }

        let base = self.vars.len();
        let saved_frame = self.frame;
        for (p, v) in f.params.iter().zip(vals) {
            self.vars.push((p.name.as_str(), v));
        }
        self.frame = base;
        self.depth += 1;
        let flow = self.exec_stmts(&f.body);
        self.depth -= 1;
        self.frame = saved_frame;
        let locals = self.vars.split_off(base);
        let flow = flow?;

        // copy outputs back into the caller's variables
        for ((p, a), (_, v)) in f.params.iter().zip(args).zip(locals) {
            if p.output {
                self.write_back(a, v)?;
            }
        }

        match flow {
            Flow::Return(_) | Flow::Next if f.ret.base == BaseType::Void => Ok(Value::Void),
            Flow::Return(v) => coerce(v, &f.ret, line),
            Flow::Next => Err(CtlError::runtime(f.line, format!("{} ended without returning a value", f.name))),
        }
    }

    /// Assigns to the variable or element named by an output argument.
    fn write_back(&mut self, arg: &'a Expr, value: Value) -> CtlResult<()> {
        let mut idx_exprs = Vec::new();
        let mut base = arg;
        while let ExprKind::Index(b, i) = &base.kind {
            idx_exprs.push(&**i);
            base = b;
        }
        let ExprKind::Var(name) = &base.kind else {
            return Err(CtlError::runtime(arg.line, "output argument must be a variable"));
        };
        idx_exprs.reverse();
        let mut indices = Vec::with_capacity(idx_exprs.len());
        for ie in idx_exprs {
            indices.push(self.int(ie)?);
        }
        self.store(name, &indices, AssignOp::Set, value, arg.line)
    }

    /// Evaluates a parameter default without seeing the caller's locals.
    fn eval_isolated(&mut self, e: &'a Expr) -> CtlResult<Value> {
        let saved = self.frame;
        self.frame = self.vars.len();
        let v = self.eval(e);
        self.frame = saved;
        v
    }
}

// ============================================================================
// Operators
// ============================================================================

fn unary(op: UnOp, v: Value, line: usize) -> CtlResult<Value> {
    match (op, v) {
        (UnOp::Not, v) => v
            .as_bool()
            .map(|b| Value::Bool(!b))
            .ok_or_else(|| CtlError::runtime(line, format!("cannot negate {}", v.type_name()))),
        (UnOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (UnOp::Neg, Value::Bool(b)) => Ok(Value::Int(-(b as i32))),
        (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOp::Plus, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (UnOp::Plus, Value::Bool(b)) => Ok(Value::Int(b as i32)),
        (_, v) => Err(CtlError::runtime(line, format!("invalid operand {}", v.type_name()))),
    }
}

fn binary(op: BinOp, a: Value, b: Value, line: usize) -> CtlResult<Value> {
    if let (Value::Bool(x), Value::Bool(y)) = (&a, &b) {
        match op {
            BinOp::Eq => return Ok(Value::Bool(x == y)),
            BinOp::Ne => return Ok(Value::Bool(x != y)),
            _ => {}
        }
    }
    if matches!(a, Value::Array(_) | Value::Void) || matches!(b, Value::Array(_) | Value::Void) {
        return Err(CtlError::runtime(
            line,
            format!("invalid operands {} and {}", a.type_name(), b.type_name()),
        ));
    }

    if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
        let (x, y) = (a.as_f32().unwrap_or(0.0), b.as_f32().unwrap_or(0.0));
        return Ok(match op {
            BinOp::Add => Value::Float(x + y),
            BinOp::Sub => Value::Float(x - y),
            BinOp::Mul => Value::Float(x * y),
            BinOp::Div => Value::Float(x / y),
            BinOp::Rem => Value::Float(x % y),
            BinOp::Eq => Value::Bool(x == y),
            BinOp::Ne => Value::Bool(x != y),
            BinOp::Lt => Value::Bool(x < y),
            BinOp::Le => Value::Bool(x <= y),
            BinOp::Gt => Value::Bool(x > y),
            BinOp::Ge => Value::Bool(x >= y),
            BinOp::And => Value::Bool(x != 0.0 && y != 0.0),
            BinOp::Or => Value::Bool(x != 0.0 || y != 0.0),
        });
    }

    let (x, y) = (a.as_i32().unwrap_or(0), b.as_i32().unwrap_or(0));
    if matches!(op, BinOp::Div | BinOp::Rem) && y == 0 {
        return Err(CtlError::runtime(line, "integer division by zero"));
    }
    Ok(match op {
        BinOp::Add => Value::Int(x.wrapping_add(y)),
        BinOp::Sub => Value::Int(x.wrapping_sub(y)),
        BinOp::Mul => Value::Int(x.wrapping_mul(y)),
        BinOp::Div => Value::Int(x.wrapping_div(y)),
        BinOp::Rem => Value::Int(x.wrapping_rem(y)),
        BinOp::Eq => Value::Bool(x == y),
        BinOp::Ne => Value::Bool(x != y),
        BinOp::Lt => Value::Bool(x < y),
        BinOp::Le => Value::Bool(x <= y),
        BinOp::Gt => Value::Bool(x > y),
        BinOp::Ge => Value::Bool(x >= y),
        BinOp::And => Value::Bool(x != 0 && y != 0),
        BinOp::Or => Value::Bool(x != 0 || y != 0),
    })
}
