//! Expressions over graphs: compilation, evaluation and native functions.

pub mod engine;
pub mod expr;
pub mod function;

pub use engine::{Evaluator, Value, calc, compare};
pub use expr::{Operator, parse_expression};
pub use function::{Factory, Function, FunctionRegistry};
