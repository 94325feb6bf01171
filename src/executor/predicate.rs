use std::{cmp::Ordering, fmt};

use crate::{
    executor::get_col,
    storage::schema::{ColumnMeta, TabCol},
    types::{
        compare::compare,
        error::{DatabaseError, Result},
        value::{ColType, Value},
    },
};

/// Comparison operators for conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompOp {
    /// Decodes the planner's numeric operator code.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(CompOp::Eq),
            1 => Ok(CompOp::Ne),
            2 => Ok(CompOp::Lt),
            3 => Ok(CompOp::Gt),
            4 => Ok(CompOp::Le),
            5 => Ok(CompOp::Ge),
            code => Err(DatabaseError::UnknownOperator { code }),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            CompOp::Eq => 0,
            CompOp::Ne => 1,
            CompOp::Lt => 2,
            CompOp::Gt => 3,
            CompOp::Le => 4,
            CompOp::Ge => 5,
        }
    }

    /// Applies the operator to the outcome of `compare(lhs, rhs)`.
    pub fn eval(&self, ord: Ordering) -> bool {
        match self {
            CompOp::Eq => ord == Ordering::Equal,
            CompOp::Ne => ord != Ordering::Equal,
            CompOp::Lt => ord == Ordering::Less,
            CompOp::Gt => ord == Ordering::Greater,
            CompOp::Le => ord != Ordering::Greater,
            CompOp::Ge => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompOp::Eq => "=",
            CompOp::Ne => "<>",
            CompOp::Lt => "<",
            CompOp::Gt => ">",
            CompOp::Le => "<=",
            CompOp::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum CondRhs {
    Col(TabCol),
    Val(Value),
}

/// `lhs op rhs`. A list of conditions is a conjunction.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub lhs_col: TabCol,
    pub op: CompOp,
    pub rhs: CondRhs,
}

impl Condition {
    pub fn new(lhs_col: TabCol, op: CompOp, rhs: CondRhs) -> Self {
        Self { lhs_col, op, rhs }
    }

    /// Column compared against a literal
    pub fn with_value(lhs_col: TabCol, op: CompOp, value: Value) -> Self {
        Self::new(lhs_col, op, CondRhs::Val(value))
    }

    /// Column compared against another column
    pub fn with_col(lhs_col: TabCol, op: CompOp, rhs_col: TabCol) -> Self {
        Self::new(lhs_col, op, CondRhs::Col(rhs_col))
    }

    /// Builds a condition from the planner's operator code.
    pub fn from_code(lhs_col: TabCol, code: u8, rhs: CondRhs) -> Result<Self> {
        Ok(Self::new(lhs_col, CompOp::from_code(code)?, rhs))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rhs {
            CondRhs::Col(col) => write!(f, "{} {} {}", self.lhs_col, self.op, col),
            CondRhs::Val(value) => write!(f, "{} {} {}", self.lhs_col, self.op, value),
        }
    }
}

#[derive(Debug, Clone)]
enum BoundRhs {
    Col(ColumnMeta),
    /// Literal already encoded to the width of the lhs column.
    Val(Vec<u8>),
}

/// A condition resolved against a concrete tuple layout.
#[derive(Debug, Clone)]
pub struct BoundCondition {
    lhs: ColumnMeta,
    op: CompOp,
    rhs: BoundRhs,
}

impl BoundCondition {
    /// Resolves both operands in `cols` and checks they share a declared type.
    pub fn bind(cond: &Condition, cols: &[ColumnMeta]) -> Result<Self> {
        let lhs = get_col(cols, &cond.lhs_col)?.clone();
        let rhs = match &cond.rhs {
            CondRhs::Col(target) => {
                let rhs = get_col(cols, target)?;
                check_types(lhs.col_type, rhs.col_type)?;
                BoundRhs::Col(rhs.clone())
            }
            CondRhs::Val(value) => {
                check_types(lhs.col_type, value.col_type())?;
                BoundRhs::Val(value.to_raw(lhs.len)?)
            }
        };
        Ok(Self { lhs, op: cond.op, rhs })
    }

    pub fn eval(&self, tuple: &[u8]) -> bool {
        let lhs = &tuple[self.lhs.offset..self.lhs.offset + self.lhs.len];
        let ord = match &self.rhs {
            BoundRhs::Val(raw) => compare(lhs, raw, self.lhs.col_type, self.lhs.len),
            BoundRhs::Col(col) => {
                let rhs = &tuple[col.offset..col.offset + col.len];
                if col.len == self.lhs.len {
                    compare(lhs, rhs, self.lhs.col_type, self.lhs.len)
                } else {
                    // text columns of different widths
                    compare_padded(lhs, rhs)
                }
            }
        };
        self.op.eval(ord)
    }
}

fn check_types(lhs: ColType, rhs: ColType) -> Result<()> {
    if lhs != rhs {
        return Err(DatabaseError::TypeMismatch {
            expected: lhs.to_string(),
            actual: rhs.to_string(),
        });
    }
    Ok(())
}

/// Bytewise comparison with the shorter operand zero-extended.
fn compare_padded(a: &[u8], b: &[u8]) -> Ordering {
    let len = a.len().max(b.len());
    let at = |s: &[u8], i: usize| s.get(i).copied().unwrap_or(0);
    (0..len)
        .map(|i| at(a, i).cmp(&at(b, i)))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

pub fn bind_conditions(conds: &[Condition], cols: &[ColumnMeta]) -> Result<Vec<BoundCondition>> {
    conds.iter().map(|cond| BoundCondition::bind(cond, cols)).collect()
}

/// True when every condition holds; an empty list accepts everything.
pub fn eval_conditions(conds: &[BoundCondition], tuple: &[u8]) -> bool {
    conds.iter().all(|cond| cond.eval(tuple))
}
