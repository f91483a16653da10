//! Parser combinators for command parameters.
//!
//! Every parameter is described by a [`Shape`]. The registry is a small
//! combinator algebra over shapes:
//!
//! - [`Shape::Scalar`] - terminal, one raw token
//! - [`Shape::Tuple`] - sequence, all-or-nothing
//! - [`Shape::List`] - repetition, never fails
//!
//! Parsing and usage strings are both derived by walking the shape, so a new
//! command never needs a hand-written parser.

use std::fmt;

use super::cursor::Arguments;

/// Result of a parse: the value and the cursor after it, or `None`.
pub type ParserResult<T> = Option<(T, Arguments)>;

/// Declared shape of a parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// A single raw token
    Scalar,
    /// Fixed number of heterogeneous elements, in order
    Tuple(Vec<Shape>),
    /// Zero or more elements of one shape
    List(Box<Shape>),
}

impl Shape {
    /// Shape of a list of `element`.
    pub fn list(element: Shape) -> Self {
        Shape::List(Box::new(element))
    }

    /// Human-readable usage string, e.g. `[STRING STRING]` or `STRING...`.
    pub fn help_signature(&self) -> String {
        match self {
            Shape::Scalar => "STRING".to_string(),
            Shape::Tuple(elements) if elements.is_empty() => String::new(),
            Shape::Tuple(elements) => {
                let inner: Vec<String> = elements.iter().map(Shape::help_signature).collect();
                format!("[{}]", inner.join(" "))
            }
            Shape::List(element) => format!("{}...", element.help_signature()),
        }
    }

    /// Short name used in error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Shape::Scalar => "scalar",
            Shape::Tuple(_) => "tuple",
            Shape::List(_) => "list",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.help_signature())
    }
}

/// A parsed parameter value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Raw token text; conversion is up to the handler
    Scalar(String),
    /// One value per tuple element
    Tuple(Vec<Value>),
    /// Zero or more values of the list's element shape
    List(Vec<Value>),
}

impl Value {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
        }
    }
}

/// Parse `args` according to `shape`.
///
/// The cursor is taken by value: on failure the caller still holds its own,
/// untouched copy, so nothing is consumed.
pub fn parse(shape: &Shape, args: Arguments) -> ParserResult<Value> {
    match shape {
        Shape::Scalar => parse_scalar(args),
        Shape::Tuple(elements) => parse_tuple(elements, args),
        Shape::List(element) => parse_list(element, args),
    }
}

fn parse_scalar(mut args: Arguments) -> ParserResult<Value> {
    if args.is_empty() {
        return None;
    }
    let token = args.pop();
    Some((Value::Scalar(token), args))
}

fn parse_tuple(elements: &[Shape], args: Arguments) -> ParserResult<Value> {
    let mut values = Vec::with_capacity(elements.len());
    let mut rest = args;
    for element in elements {
        let (value, advanced) = parse(element, rest)?;
        values.push(value);
        rest = advanced;
    }
    Some((Value::Tuple(values), rest))
}

fn parse_list(element: &Shape, args: Arguments) -> ParserResult<Value> {
    let mut values = Vec::new();
    let mut rest = args;
    while !rest.is_empty() {
        let before = rest.len();
        match parse(element, rest.clone()) {
            // An element that consumes nothing would repeat forever.
            Some((value, advanced)) if advanced.len() < before => {
                values.push(value);
                rest = advanced;
            }
            _ => break,
        }
    }
    Some((Value::List(values), rest))
}
