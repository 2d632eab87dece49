use super::tokenizer::{tokenize, Token};
use super::ParseError;
use crate::config::OperationTimes;
use crate::scheduler::types::{result_ref_for, Op};

/// A planned two-operand task before the scheduler assigns its global id.
///
/// `result<k>` references inside a spec list are 1-based indices into the
/// same list; registration rewrites them to the assigned global ids.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub arg1: String,
    pub arg2: String,
    pub op: Op,
    pub operation_time: u64,
}

/// Parses an infix expression into an ordered task list.
///
/// Precedence `* /` over `+ -`, left-associative, with parentheses. The
/// emitted list is topologically ordered: every `result<k>` reference names a
/// strictly earlier entry.
pub fn parse(text: &str, times: &OperationTimes) -> Result<Vec<TaskSpec>, ParseError> {
    let tokens = tokenize(text)?;
    let postfix = to_postfix(tokens)?;
    fold_postfix(postfix, times)
}

fn precedence(op: Op) -> u8 {
    match op {
        Op::Add | Op::Sub => 1,
        Op::Mul | Op::Div => 2,
    }
}

/// Shunting-yard pass from infix tokens to postfix order.
fn to_postfix(tokens: Vec<Token>) -> Result<Vec<Token>, ParseError> {
    let mut output: Vec<Token> = Vec::new();
    let mut operators: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) => output.push(token),
            Token::LParen => operators.push(token),
            Token::RParen => {
                let mut matched = false;
                while let Some(top) = operators.pop() {
                    match top {
                        Token::LParen => {
                            matched = true;
                            break;
                        }
                        other => output.push(other),
                    }
                }
                if !matched {
                    return Err(ParseError::MismatchedParens);
                }
            }
            Token::Operator(op) => {
                while let Some(Token::Operator(top)) = operators.last() {
                    if precedence(*top) >= precedence(op) {
                        output.push(Token::Operator(*top));
                        operators.pop();
                    } else {
                        break;
                    }
                }
                operators.push(Token::Operator(op));
            }
        }
    }

    while let Some(top) = operators.pop() {
        match top {
            Token::LParen => return Err(ParseError::MismatchedParens),
            other => output.push(other),
        }
    }

    if output.is_empty() {
        return Err(ParseError::EmptyExpression);
    }

    Ok(output)
}

/// Folds a postfix token stream into a task list.
///
/// Operands accumulate on a value stack; each operator pops two and emits a
/// task, pushing `result<i>` (1-based position in the list) in their place.
fn fold_postfix(postfix: Vec<Token>, times: &OperationTimes) -> Result<Vec<TaskSpec>, ParseError> {
    let mut stack: Vec<String> = Vec::new();
    let mut specs: Vec<TaskSpec> = Vec::new();

    for token in postfix {
        match token {
            Token::Number(literal) => stack.push(literal),
            Token::Operator(op) => {
                let arg2 = stack.pop().ok_or(ParseError::StrayOperator)?;
                let arg1 = stack.pop().ok_or(ParseError::StrayOperator)?;

                specs.push(TaskSpec {
                    arg1,
                    arg2,
                    op,
                    operation_time: times.for_op(op),
                });

                stack.push(result_ref_for(specs.len() as i32));
            }
            // parentheses never survive the postfix pass
            Token::LParen | Token::RParen => return Err(ParseError::MismatchedParens),
        }
    }

    if stack.len() != 1 {
        return Err(ParseError::DanglingOperand);
    }

    // A bare literal ("42") produces no operator and therefore no task; wrap
    // it in an identity addition so the expression still flows through the
    // scheduler as one task.
    if specs.is_empty() {
        let literal = stack.pop().ok_or(ParseError::EmptyExpression)?;
        specs.push(TaskSpec {
            arg1: literal,
            arg2: "0".to_string(),
            op: Op::Add,
            operation_time: times.for_op(Op::Add),
        });
    }

    Ok(specs)
}
