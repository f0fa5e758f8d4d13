//! Expression graph evaluation.
//!
//! Evaluation is recursive and post-order: both operands of an operator node
//! are evaluated before the operator is applied, with no short-circuit.
//! Problems never abort a run. An unresolved call makes its branch nil and
//! is collected as an [`EvalError`].

use rustc_hash::FxHashMap;

use crate::error::{CallError, EvalError, ParseError};
use crate::eval::expr::{Operator, parse_expression};
use crate::eval::function::{Function, FunctionRegistry};
use crate::limits::{EXPRESSION_MARKER, TYPE_TAG};
use crate::model::graph::select;
use crate::model::{Graph, Scalar, parse_number};
use crate::path::{Arg, Path, Segment};

/// Result of evaluating an expression or path.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    /// A subgraph, typically a nil-rooted group of matched nodes.
    Graph(Graph),
}

impl Value {
    pub fn nil() -> Self {
        Value::Scalar(Scalar::Nil)
    }

    pub fn is_nil(&self) -> bool {
        match self {
            Value::Scalar(s) => s.is_nil(),
            Value::Graph(g) => g.is_nil() && g.is_empty(),
        }
    }

    /// Scalar view; a graph contributes its first non-nil value.
    pub fn to_scalar(&self) -> Scalar {
        match self {
            Value::Scalar(s) => s.clone(),
            Value::Graph(g) => g.value().clone(),
        }
    }

    pub fn into_scalar(self) -> Scalar {
        match self {
            Value::Scalar(s) => s,
            Value::Graph(g) => g.value().clone(),
        }
    }

    pub fn as_graph(&self) -> Option<&Graph> {
        match self {
            Value::Graph(g) => Some(g),
            Value::Scalar(_) => None,
        }
    }

    /// Truth value. A graph is true when it has any content.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Scalar(s) => s.truthy(),
            Value::Graph(g) => !g.is_nil() || !g.is_empty(),
        }
    }

    pub fn text(&self) -> String {
        match self {
            Value::Scalar(s) => s.text(),
            Value::Graph(g) => g.text(),
        }
    }

    /// Collapses a path result: nothing is nil, a single leaf is its scalar.
    fn from_group(group: Graph) -> Value {
        match group.children() {
            [] => Value::nil(),
            [leaf] if leaf.is_empty() => Value::Scalar(leaf.this().clone()),
            _ => Value::Graph(group),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::nil()
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<Graph> for Value {
    fn from(value: Graph) -> Self {
        Value::Graph(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Scalar(Scalar::Int(i64::from(value)))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(Scalar::Float(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Scalar(Scalar::Bool(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(Scalar::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(Scalar::Str(value))
    }
}

// =============================================================================
// OPERATORS
// =============================================================================

/// Applies a binary operator to two scalars.
///
/// Arithmetic on two numeric scalars: int with int stays integer
/// (overflow and division by zero give nil), anything mixed is float.
/// `+` with a text operand concatenates the text forms, so `"4" + 3` is
/// `"43"`. The other arithmetic operators parse numeric text first, so
/// `"6" * 2` is `12`; anything non-numeric gives nil. Relational operators
/// delegate to [`compare`]; logical operators combine truthiness.
pub fn calc(a: &Scalar, b: &Scalar, op: Operator) -> Scalar {
    if op.is_relational() {
        return Scalar::Bool(compare(a, b, op));
    }
    match op {
        Operator::And => return Scalar::Bool(a.truthy() && b.truthy()),
        Operator::Or => return Scalar::Bool(a.truthy() || b.truthy()),
        _ => {}
    }

    if a.is_numeric() && b.is_numeric() {
        return numeric_op(a, b, op);
    }
    if op == Operator::Add {
        if is_text(a) || is_text(b) {
            return Scalar::Str(format!("{}{}", a.text(), b.text()));
        }
        return Scalar::Nil;
    }
    match (a.number(), b.number()) {
        (Some(x), Some(y)) => numeric_op(&x, &y, op),
        _ => Scalar::Nil,
    }
}

/// Arithmetic over two numeric scalars.
fn numeric_op(a: &Scalar, b: &Scalar, op: Operator) -> Scalar {
    match (a, b) {
        (Scalar::Int(x), Scalar::Int(y)) => int_op(*x, *y, op).map_or(Scalar::Nil, Scalar::Int),
        _ => match (a.to_f64(), b.to_f64()) {
            (Some(x), Some(y)) => float_op(x, y, op).map_or(Scalar::Nil, Scalar::Float),
            _ => Scalar::Nil,
        },
    }
}

fn is_text(s: &Scalar) -> bool {
    matches!(s, Scalar::Str(_) | Scalar::Bytes(_))
}

fn int_op(x: i64, y: i64, op: Operator) -> Option<i64> {
    match op {
        Operator::Add => x.checked_add(y),
        Operator::Sub => x.checked_sub(y),
        Operator::Mul => x.checked_mul(y),
        Operator::Div => x.checked_div(y),
        Operator::Rem => x.checked_rem(y),
        _ => None,
    }
}

fn float_op(x: f64, y: f64, op: Operator) -> Option<f64> {
    let result = match op {
        Operator::Add => x + y,
        Operator::Sub => x - y,
        Operator::Mul => x * y,
        Operator::Div if y != 0.0 => x / y,
        Operator::Rem if y != 0.0 => x % y,
        _ => return None,
    };
    (!result.is_nan()).then_some(result)
}

/// Compares two scalars with a relational operator.
///
/// When both sides are or parse as numbers the comparison is numeric, so
/// `1 = 1.0` holds. Otherwise the text forms are compared. Non-relational
/// operators compare false.
pub fn compare(a: &Scalar, b: &Scalar, op: Operator) -> bool {
    use std::cmp::Ordering;

    let ordering = match (a.number(), b.number()) {
        (Some(Scalar::Int(x)), Some(Scalar::Int(y))) => Some(x.cmp(&y)),
        (Some(x), Some(y)) => match (x.to_f64(), y.to_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
        _ => Some(a.text().cmp(&b.text())),
    };
    let Some(ordering) = ordering else {
        return op == Operator::Ne;
    };
    match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

// =============================================================================
// EVALUATOR
// =============================================================================

/// Evaluates expression graphs and paths against a context graph.
///
/// The registry is borrowed for the evaluator's lifetime. Without one, every
/// typed call is unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator<'r> {
    registry: Option<&'r FunctionRegistry>,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// Evaluates a compiled expression graph.
    pub fn eval(&self, ctx: &Graph, expr: &Graph) -> Value {
        self.eval_checked(ctx, expr).0
    }

    /// Like [`eval`](Self::eval), also returning every error collected
    /// along the way.
    pub fn eval_checked(&self, ctx: &Graph, expr: &Graph) -> (Value, Vec<EvalError>) {
        let mut run = Run::new(self.registry);
        let value = run.expression(ctx, expr);
        (value, run.errors)
    }

    /// Evaluates and coerces the result to a boolean.
    pub fn eval_bool(&self, ctx: &Graph, expr: &Graph) -> bool {
        self.eval(ctx, expr).truthy()
    }

    /// Resolves a path, invoking functions for call segments.
    pub fn eval_path(&self, ctx: &Graph, path: &Path) -> Value {
        Run::new(self.registry).path(ctx, path)
    }

    /// Compiles `text` as an expression and evaluates it.
    pub fn evaluate(&self, ctx: &Graph, text: &str) -> Result<Value, ParseError> {
        let expr = parse_expression(text)?;
        Ok(self.eval(ctx, &expr))
    }
}

/// State of one evaluation: collected errors and constructed objects.
struct Run<'r> {
    registry: Option<&'r FunctionRegistry>,
    objects: FxHashMap<String, Box<dyn Function>>,
    errors: Vec<EvalError>,
}

impl<'r> Run<'r> {
    fn new(registry: Option<&'r FunctionRegistry>) -> Self {
        Self {
            registry,
            objects: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    fn expression(&mut self, ctx: &Graph, expr: &Graph) -> Value {
        if expr.this().as_str() == Some(EXPRESSION_MARKER) {
            return match expr.children().first() {
                Some(tree) => self.node(ctx, tree),
                None => Value::nil(),
            };
        }
        self.node(ctx, expr)
    }

    fn node(&mut self, ctx: &Graph, node: &Graph) -> Value {
        let op = node.this().as_str().and_then(Operator::from_token);
        match (op, node.children()) {
            (Some(op), [left, right]) => {
                let left = self.node(ctx, left).into_scalar();
                let right = self.node(ctx, right).into_scalar();
                Value::Scalar(calc(&left, &right, op))
            }
            _ => self.leaf(ctx, node.this()),
        }
    }

    fn leaf(&mut self, ctx: &Graph, token: &Scalar) -> Value {
        let Scalar::Str(text) = token else {
            return Value::Scalar(token.clone());
        };
        if let Some(literal) = unquote(text) {
            return Value::Scalar(Scalar::Str(literal));
        }
        match text.as_str() {
            "true" => return Value::from(true),
            "false" => return Value::from(false),
            _ => {}
        }
        if let Some(number) = parse_number(text) {
            return Value::Scalar(number);
        }
        match Path::parse(text) {
            Ok(path) => self.path(ctx, &path),
            Err(err) => {
                tracing::debug!(token = %text, %err, "eval: malformed path reference");
                Value::nil()
            }
        }
    }

    fn path(&mut self, ctx: &Graph, path: &Path) -> Value {
        let mut frontier: Vec<&[Graph]> = vec![ctx.top_level()];
        let mut current: Option<&Graph> = ctx.is_nil().then_some(ctx);

        for (i, segment) in path.segments().iter().enumerate() {
            if let Some(args) = segment.args() {
                let result = self.call(ctx, current, &frontier, segment, args);
                let rest = path.tail(i + 1);
                if rest.is_empty() {
                    return result;
                }
                return match result {
                    Value::Graph(g) => Value::from_group(g.get_path(&rest)),
                    Value::Scalar(_) => Value::nil(),
                };
            }
            let matched = select(&frontier, segment);
            current = matched.first().copied();
            frontier = matched.into_iter().map(Graph::children).collect();
        }
        Value::from_group(Graph::group(frontier.into_iter().flatten()))
    }

    /// Resolves a call segment.
    ///
    /// With a type tag on the node reached so far, the segment name is a
    /// method on the tag's object. Without one, the segment names a child and
    /// each argument's text is resolved as a sub-path inside it.
    fn call(
        &mut self,
        ctx: &Graph,
        current: Option<&Graph>,
        frontier: &[&[Graph]],
        segment: &Segment,
        args: &[Arg],
    ) -> Value {
        let method = segment.name().unwrap_or_default();
        let tag = current.map(type_tag).unwrap_or_default();

        if tag.is_empty() {
            if let Some(target) = select(frontier, segment).first() {
                return navigate(target, args);
            }
            return self.unresolved(tag, method);
        }

        let values: Vec<Value> = args
            .iter()
            .map(|arg| self.expression(ctx, arg.expr()))
            .collect();

        if !self.objects.contains_key(&tag) {
            match self.registry.and_then(|r| r.instantiate(&tag)) {
                Some(object) => {
                    self.objects.insert(tag.clone(), object);
                }
                None => return self.unresolved(tag, method),
            }
        }
        let Some(object) = self.objects.get_mut(&tag) else {
            return self.unresolved(tag, method);
        };
        match object.invoke(method, &values) {
            Ok(value) => value,
            Err(CallError::UnknownMethod) => self.unresolved(tag, method),
            Err(CallError::InvalidArguments(reason)) => {
                tracing::debug!(tag = %tag, method, %reason, "eval: call failed");
                self.errors.push(EvalError::Call {
                    tag,
                    method: method.to_string(),
                    reason,
                });
                Value::nil()
            }
        }
    }

    fn unresolved(&mut self, tag: String, method: &str) -> Value {
        tracing::debug!(tag = %tag, method, "eval: unresolved function");
        self.errors.push(EvalError::UnresolvedFunction {
            tag,
            method: method.to_string(),
        });
        Value::nil()
    }
}

/// The tag declared by a node's `!type` child, or empty.
fn type_tag(node: &Graph) -> String {
    node.child(TYPE_TAG).at(0).this().text()
}

/// `g(a, b)` on an untyped node: the children found at `a` and at `b` inside `g`.
fn navigate(target: &Graph, args: &[Arg]) -> Value {
    let scope = Graph::group(target.children());
    let mut group = Graph::nil();
    for arg in args {
        for node in scope.get(arg.text()).children() {
            group.add_node(node.clone());
        }
    }
    Value::from_group(group)
}

/// Strips matching quotes and resolves backslash escapes.
fn unquote(token: &str) -> Option<String> {
    let quote = token.chars().next().filter(|c| matches!(c, '\'' | '"'))?;
    let inner = token.strip_prefix(quote)?.strip_suffix(quote)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

impl Graph {
    /// Evaluates expression text against this graph with no function registry.
    ///
    /// Malformed text evaluates to nil.
    pub fn eval(&self, expr: &str) -> Value {
        match Evaluator::default().evaluate(self, expr) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(expr, %err, "eval: malformed expression");
                Value::nil()
            }
        }
    }

    /// [`eval`](Self::eval) coerced to a boolean.
    pub fn eval_bool(&self, expr: &str) -> bool {
        self.eval(expr).truthy()
    }
}
