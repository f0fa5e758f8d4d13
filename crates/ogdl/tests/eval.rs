//! Evaluation against typed nodes backed by registered function objects.

use ogdl::limits::TYPE_TAG;
use ogdl::{
    CallError, EvalError, Evaluator, Function, FunctionRegistry, Graph, Operator, Path, Scalar,
    Value, calc, compare, parse_expression,
};

struct Math;

impl Function for Math {
    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        let arg = |i: usize| {
            args.get(i)
                .map(Value::to_scalar)
                .ok_or_else(|| CallError::InvalidArguments(format!("{method}: missing argument {i}")))
        };
        match method {
            "Sin" => {
                let x = arg(0)?
                    .to_f64()
                    .ok_or_else(|| CallError::InvalidArguments("Sin: not a number".into()))?;
                Ok(Value::from(x.sin()))
            }
            "Double" => match arg(0)? {
                Scalar::Int(i) => Ok(Value::from(i * 2)),
                Scalar::Float(f) => Ok(Value::from(f * 2.0)),
                other => Err(CallError::InvalidArguments(format!("Double: {other:?}"))),
            },
            _ => Err(CallError::UnknownMethod),
        }
    }
}

#[derive(Default)]
struct Counter {
    next: i64,
}

impl Function for Counter {
    fn invoke(&mut self, method: &str, _args: &[Value]) -> Result<Value, CallError> {
        match method {
            "Next" => {
                self.next += 1;
                Ok(Value::from(self.next))
            }
            _ => Err(CallError::UnknownMethod),
        }
    }
}

struct Config;

impl Function for Config {
    fn invoke(&mut self, method: &str, _args: &[Value]) -> Result<Value, CallError> {
        match method {
            "Get" => {
                let mut g = Graph::nil();
                g.add("port").add(8080);
                g.add("host").add("example.org");
                Ok(Value::from(g))
            }
            _ => Err(CallError::UnknownMethod),
        }
    }
}

fn registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register("Math", || Math);
    registry.register("Counter", Counter::default);
    registry.register("Config", || Config);
    registry
}

fn context() -> Graph {
    let mut g = Graph::nil();
    g.add("math").add(TYPE_TAG).add("Math");
    g.add("counter").add(TYPE_TAG).add("Counter");
    g.add("cfg").add(TYPE_TAG).add("Config");
    g.add("x").add(21);
    g
}

fn run(registry: &FunctionRegistry, ctx: &Graph, text: &str) -> (Value, Vec<EvalError>) {
    let expr = parse_expression(text).unwrap();
    Evaluator::new(registry).eval_checked(ctx, &expr)
}

#[test]
fn typed_call_invokes_method() {
    let registry = registry();
    let ctx = context();
    let eval = Evaluator::new(&registry);

    assert_eq!(eval.evaluate(&ctx, "math.Sin(0)").unwrap(), Value::from(0.0));
    assert_eq!(eval.evaluate(&ctx, "math.Double(x)").unwrap(), Value::from(42));
    assert_eq!(eval.evaluate(&ctx, "math.Double(x + 1) - 2").unwrap(), Value::from(42));
    assert!(eval.eval_bool(&ctx, &parse_expression("math.Double(2) = 4").unwrap()));

    let path = Path::parse("math.Double(1.5)").unwrap();
    assert_eq!(eval.eval_path(&ctx, &path), Value::from(3.0));
}

#[test]
fn objects_live_for_one_run() {
    let registry = registry();
    let ctx = context();
    for _ in 0..3 {
        let (value, errors) = run(&registry, &ctx, "counter.Next() + counter.Next()");
        assert!(errors.is_empty());
        assert_eq!(value, Value::from(3));
    }
}

#[test]
fn call_result_is_navigable() {
    let registry = registry();
    let ctx = context();
    let (value, errors) = run(&registry, &ctx, "cfg.Get().port");
    assert!(errors.is_empty());
    assert_eq!(value, Value::from(8080));

    let (value, _) = run(&registry, &ctx, "cfg.Get()");
    assert_eq!(value.as_graph().map(Graph::len), Some(2));
}

#[test]
fn unknown_method_only_nils_its_branch() {
    let registry = registry();
    let ctx = context();
    let (value, errors) = run(&registry, &ctx, "math.Cos(1) || (math.Double(2) = 4)");
    assert_eq!(value, Value::from(true));
    assert_eq!(
        errors,
        vec![EvalError::UnresolvedFunction {
            tag: "Math".to_string(),
            method: "Cos".to_string(),
        }]
    );
}

#[test]
fn both_operands_are_evaluated() {
    let registry = registry();
    let ctx = context();
    let (value, errors) = run(&registry, &ctx, "(1 = 1) || math.Missing()");
    assert_eq!(value, Value::from(true));
    assert_eq!(errors.len(), 1);
}

#[test]
fn bad_arguments_are_reported() {
    let registry = registry();
    let ctx = context();
    let (value, errors) = run(&registry, &ctx, "math.Sin('x')");
    assert!(value.is_nil());
    assert!(matches!(
        errors.as_slice(),
        [EvalError::Call { tag, method, .. }] if tag == "Math" && method == "Sin"
    ));
}

#[test]
fn no_registry_leaves_calls_unresolved() {
    let ctx = context();
    let expr = parse_expression("math.Sin(0)").unwrap();
    let (value, errors) = Evaluator::default().eval_checked(&ctx, &expr);
    assert!(value.is_nil());
    assert_eq!(errors.len(), 1);

    let (_, errors) = run(&FunctionRegistry::new(), &ctx, "math.Sin(0) + counter.Next()");
    assert_eq!(errors.len(), 2);
}

#[test]
fn reregistering_a_tag_replaces_it() {
    let mut registry = registry();
    let replaced = registry.register("Math", || {
        |_: &str, _: &[Value]| -> Result<Value, CallError> { Ok(Value::from("stub")) }
    });
    assert!(replaced);
    let (value, _) = run(&registry, &context(), "math.Sin(0)");
    assert_eq!(value, Value::from("stub"));
}

#[test]
fn mixed_operands() {
    assert_eq!(
        calc(&Scalar::from("11.0-"), &Scalar::Float(2.0), Operator::Add),
        Scalar::from("11.0-2")
    );
    assert!(compare(&Scalar::Int(1), &Scalar::Float(1.0), Operator::Eq));
    assert!(compare(&Scalar::from("abc"), &Scalar::from("abd"), Operator::Lt));

    let ctx = context();
    assert_eq!(ctx.eval("x * 2 + 0.5"), Value::from(42.5));
    assert_eq!(ctx.eval("x + 'y'"), Value::from("21y"));
    assert!(ctx.eval("x - 'y'").is_nil());
}

#[test]
fn deeply_nested_text_evaluates_to_nil() {
    let ctx = context();
    let nested_calls = format!("{}0{}", "math.Double(".repeat(10_000), ")".repeat(10_000));
    assert!(ctx.eval(&nested_calls).is_nil());

    let nested_parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
    assert!(ctx.eval(&nested_parens).is_nil());

    let long_chain = vec!["1"; 10_000].join("+");
    assert!(ctx.eval(&long_chain).is_nil());

    let registry = registry();
    let shallow = format!("{}1{}", "math.Double(".repeat(3), ")".repeat(3));
    assert_eq!(
        Evaluator::new(&registry).evaluate(&ctx, &shallow).unwrap(),
        Value::from(8)
    );
}

#[test]
fn hyphenated_names_resolve_as_paths() {
    let mut g = Graph::nil();
    let limits = g.add("limits");
    limits.add("max-size").add(10);
    limits.add("max").add(4);
    limits.add("size").add(1);
    assert_eq!(g.eval("limits.max-size * 2"), Value::from(20));
    assert_eq!(g.eval("limits.max - limits.size"), Value::from(3));
    assert_eq!(g.eval("limits.max-1"), Value::from(3));
}
