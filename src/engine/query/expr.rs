use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::agg::registry;
use crate::engine::types::CellValue;

/// A compiled query expression. The expression compiler lives outside this
/// core; queries arrive with expressions already in this shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionContext {
    Identifier(String),
    Literal(CellValue),
    Function(FunctionContext),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionContext {
    /// Canonical (lowercase) function name.
    pub name: String,
    pub args: Vec<ExpressionContext>,
}

impl ExpressionContext {
    pub fn identifier(name: impl Into<String>) -> Self {
        ExpressionContext::Identifier(name.into())
    }

    pub fn function(name: impl Into<String>, args: Vec<ExpressionContext>) -> Self {
        let name: String = name.into();
        ExpressionContext::Function(FunctionContext {
            name: name.to_lowercase(),
            args,
        })
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            ExpressionContext::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionContext> {
        match self {
            ExpressionContext::Function(f) => Some(f),
            _ => None,
        }
    }

    /// True when the outermost function is a registered aggregation.
    pub fn is_aggregation(&self) -> bool {
        match self {
            ExpressionContext::Function(f) => registry::is_aggregation_function(&f.name),
            _ => false,
        }
    }

    /// Result-column label, e.g. `sum(n)`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExpressionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionContext::Identifier(name) => write!(f, "{}", name),
            ExpressionContext::Literal(value) => write!(f, "'{}'", value),
            ExpressionContext::Function(func) => {
                write!(f, "{}(", func.name)?;
                for (i, arg) in func.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One order-by term: an expression plus a direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByExpressionContext {
    pub expression: ExpressionContext,
    pub descending: bool,
}

impl OrderByExpressionContext {
    pub fn asc(expression: ExpressionContext) -> Self {
        Self {
            expression,
            descending: false,
        }
    }

    pub fn desc(expression: ExpressionContext) -> Self {
        Self {
            expression,
            descending: true,
        }
    }
}
