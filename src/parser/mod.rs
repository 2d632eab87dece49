//! Expression Parser
//!
//! Turns an infix arithmetic expression into an ordered list of two-operand
//! task specs ready for registration with the scheduler.
//!
//! ## Pipeline
//! 1. **`tokenizer`**: character scan into numbers, operators and parentheses;
//!    anything else is rejected up front.
//! 2. **`planner`**: shunting-yard pass to postfix, then a linear fold that
//!    emits one task per operator. Each emitted task pushes a symbolic
//!    `result<k>` reference consumed by later tasks, so the list is
//!    topologically ordered by construction.
//!
//! Division by zero is deliberately not caught here: a zero divisor may only
//! appear after upstream results resolve, so it is the scheduler's problem.

pub mod planner;
pub mod tokenizer;


pub use planner::{parse, TaskSpec};

/// Syntactic faults detected before an expression enters the system.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("expression is empty")]
    EmptyExpression,
    #[error("mismatched parentheses")]
    MismatchedParens,
    #[error("operator without enough operands")]
    StrayOperator,
    #[error("operand without an operator")]
    DanglingOperand,
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("disallowed character: {0:?}")]
    DisallowedChar(char),
}
