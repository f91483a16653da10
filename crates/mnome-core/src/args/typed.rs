//! Typed adapters between Rust types and parameter shapes.
//!
//! [`Arg`] maps a single parameter type to its [`Shape`] and back from a
//! parsed [`Value`]. [`Args`] does the same for a handler's whole argument
//! record, which is always a tuple (`()`, `(A,)`, `(A, B)`, ...).

use super::parser::{Shape, Value};
use crate::error::{Error, Result};

/// A single command parameter type.
pub trait Arg: Sized {
    /// Shape the parser registry uses for this type.
    fn shape() -> Shape;

    /// Convert a value parsed with [`Arg::shape`].
    fn from_value(value: Value) -> Result<Self>;
}

/// The argument record of a command handler.
pub trait Args: Sized {
    /// Ordered parameter shapes, one per tuple element.
    fn schema() -> Vec<Shape>;

    /// Convert the values parsed with [`Args::schema`].
    fn from_values(values: Vec<Value>) -> Result<Self>;
}

fn mismatch(expected: &Shape, found: &Value) -> Error {
    Error::ArgumentMismatch {
        expected: expected.kind().to_string(),
        found: found.kind().to_string(),
    }
}

impl Arg for String {
    fn shape() -> Shape {
        Shape::Scalar
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Scalar(text) => Ok(text),
            other => Err(mismatch(&Shape::Scalar, &other)),
        }
    }
}

impl<T: Arg> Arg for Vec<T> {
    fn shape() -> Shape {
        Shape::list(T::shape())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(&Self::shape(), &other)),
        }
    }
}

fn take_exact(values: Vec<Value>, arity: usize) -> Result<std::vec::IntoIter<Value>> {
    if values.len() != arity {
        return Err(Error::ArgumentMismatch {
            expected: format!("{arity} values"),
            found: format!("{} values", values.len()),
        });
    }
    Ok(values.into_iter())
}

impl Args for () {
    fn schema() -> Vec<Shape> {
        Vec::new()
    }

    fn from_values(values: Vec<Value>) -> Result<Self> {
        take_exact(values, 0).map(|_| ())
    }
}

macro_rules! impl_tuples {
    ($arity:expr; $($name:ident),+) => {
        impl<$($name: Arg),+> Args for ($($name,)+) {
            fn schema() -> Vec<Shape> {
                vec![$($name::shape()),+]
            }

            fn from_values(values: Vec<Value>) -> Result<Self> {
                let mut values = take_exact(values, $arity)?;
                Ok(($(
                    $name::from_value(values.next().ok_or_else(|| Error::ArgumentMismatch {
                        expected: format!("{} values", $arity),
                        found: "fewer values".to_string(),
                    })?)?,
                )+))
            }
        }

        impl<$($name: Arg),+> Arg for ($($name,)+) {
            fn shape() -> Shape {
                Shape::Tuple(<Self as Args>::schema())
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Tuple(values) => <Self as Args>::from_values(values),
                    other => Err(mismatch(&Self::shape(), &other)),
                }
            }
        }
    };
}

impl_tuples!(1; A);
impl_tuples!(2; A, B);
impl_tuples!(3; A, B, C);
impl_tuples!(4; A, B, C, D);
