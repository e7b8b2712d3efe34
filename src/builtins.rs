//! Numeric functions every context gets by default.

use crate::error::{ExceptionRecord, RuntimeError};
use crate::object::{Args, Arity, Function, Number, Object, Registry};

fn float_fn(name: &str, f: fn(f64) -> f64) -> Function {
    Function::new(name, Arity::Fixed(1), move |args| {
        let x = args.number(0)?;
        Ok(Object::Number(Number::float(f(x.as_f64()))))
    })
}

/// Round a float to an integer, leaving integers as they are.
fn rounding_fn(name: &str, round: fn(f64) -> f64) -> Function {
    Function::new(name, Arity::Fixed(1), move |args| {
        let value = match args.number(0)? {
            Number::Float(f) => round(f) as i32,
            Number::Int { value, .. } => value,
        };
        Ok(Object::Number(Number::int(value)))
    })
}

/// An integer when `total` is exactly one, otherwise a float.
fn integral_or_float(total: f64) -> Number {
    let truncated = total as i32;
    if truncated as f64 == total {
        Number::int(truncated)
    } else {
        Number::float(total)
    }
}

fn fold_fn(name: &str, init: f64, step: fn(f64, f64) -> f64) -> Function {
    Function::new(name, Arity::Variadic, move |args: &Args<'_>| {
        if args.is_empty() {
            return Err(ExceptionRecord::new(RuntimeError::BadFunctionCallArgc));
        }
        let total = args
            .numbers()?
            .iter()
            .fold(init, |acc, n| step(acc, n.as_f64()));
        Ok(Object::Number(integral_or_float(total)))
    })
}

fn id() -> Function {
    Function::new("id", Arity::Fixed(1), |args| {
        Ok(Object::Number(Number::int(i32::from(args.id(0)))))
    })
}

fn factorial() -> Function {
    Function::new("factorial", Arity::Fixed(1), |args| {
        let n = match args.number(0)? {
            Number::Int { value, overflow: false, .. } if value >= 0 => value,
            _ => return Err(ExceptionRecord::new(RuntimeError::BadFunctionCallArgType)),
        };
        let result = (2..=n).fold(1.0f64, |acc, i| acc * i as f64);
        Ok(Object::Number(Number::float(result)))
    })
}

fn random() -> Function {
    Function::new("random", Arity::Fixed(0), |_| Ok(Object::Number(Number::float(fastrand::f64()))))
}

/// The default callable library.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(id())
        .register(rounding_fn("int", f64::trunc))
        .register(rounding_fn("floor", f64::floor))
        .register(rounding_fn("ceil", f64::ceil))
        .register(float_fn("sin", f64::sin))
        .register(float_fn("cos", f64::cos))
        .register(float_fn("tan", f64::tan))
        .register(float_fn("exp", f64::exp))
        .register(float_fn("asin", f64::asin))
        .register(float_fn("acos", f64::acos))
        .register(float_fn("atan", f64::atan))
        .register(factorial())
        .register(fold_fn("sum", 0.0, |a, b| a + b))
        .register(fold_fn("mul", 1.0, |a, b| a * b))
        .register(random());
    registry
}
