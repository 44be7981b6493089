use serde::{Deserialize, Serialize};

use crate::engine::types::CellValue;

/// Compiled filter tree. The filter compiler is an external collaborator;
/// this core only walks the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterContext {
    And(Vec<FilterContext>),
    Or(Vec<FilterContext>),
    Predicate(Predicate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: PredicateOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredicateOp {
    Eq(CellValue),
    NotEq(CellValue),
    In(Vec<CellValue>),
    Range {
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub value: CellValue,
    pub inclusive: bool,
}

impl FilterContext {
    pub fn eq(column: impl Into<String>, value: CellValue) -> Self {
        FilterContext::Predicate(Predicate {
            column: column.into(),
            op: PredicateOp::Eq(value),
        })
    }

    pub fn range(
        column: impl Into<String>,
        lower: Option<(CellValue, bool)>,
        upper: Option<(CellValue, bool)>,
    ) -> Self {
        FilterContext::Predicate(Predicate {
            column: column.into(),
            op: PredicateOp::Range {
                lower: lower.map(|(value, inclusive)| Bound { value, inclusive }),
                upper: upper.map(|(value, inclusive)| Bound { value, inclusive }),
            },
        })
    }

    /// Evaluates the tree against a row, resolving column names through
    /// `resolve`. Missing columns resolve to Null and fail predicates.
    pub fn evaluate(&self, resolve: &dyn Fn(&str) -> CellValue) -> bool {
        match self {
            FilterContext::And(children) => children.iter().all(|c| c.evaluate(resolve)),
            FilterContext::Or(children) => children.iter().any(|c| c.evaluate(resolve)),
            FilterContext::Predicate(p) => p.matches(&resolve(&p.column)),
        }
    }

    /// Walks only the AND-reachable predicates, i.e. those that every
    /// matching row must satisfy. Used by metadata-based pruning.
    pub fn for_each_conjunctive_predicate(&self, visit: &mut dyn FnMut(&Predicate)) {
        match self {
            FilterContext::And(children) => {
                for child in children {
                    child.for_each_conjunctive_predicate(visit);
                }
            }
            FilterContext::Predicate(p) => visit(p),
            FilterContext::Or(_) => {}
        }
    }
}

impl Predicate {
    pub fn matches(&self, value: &CellValue) -> bool {
        if value.is_null() {
            return false;
        }
        match &self.op {
            PredicateOp::Eq(target) => value.compare(target).is_eq(),
            PredicateOp::NotEq(target) => !value.compare(target).is_eq(),
            PredicateOp::In(targets) => targets.iter().any(|t| value.compare(t).is_eq()),
            PredicateOp::Range { lower, upper } => {
                if let Some(bound) = lower {
                    let ord = value.compare(&bound.value);
                    if ord.is_lt() || (ord.is_eq() && !bound.inclusive) {
                        return false;
                    }
                }
                if let Some(bound) = upper {
                    let ord = value.compare(&bound.value);
                    if ord.is_gt() || (ord.is_eq() && !bound.inclusive) {
                        return false;
                    }
                }
                true
            }
        }
    }
}
