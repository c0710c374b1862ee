//! Space-separated expressions, comma lists, arithmetic operations and
//! guard conditions.
//!
//! Parentheses are a flag on the expression they wrap, not a node of
//! their own: `parens` records that the source had them, `parens_in_op`
//! that the parenthesized expression sits inside an operation. The two
//! together drive when math applies and when parentheses re-appear in
//! output.

use crate::context::Eval;
use crate::error::{CompileError, CompileResult};
use crate::options::MathMode;
use crate::output::{Output, RenderCtx};
use crate::tree::{Dimension, Operator, Value, compare};
use core::cmp::Ordering;

#[derive(Clone, Debug, Default)]
pub struct Expression {
    pub value: Vec<Value>,
    pub no_spacing: bool,
    pub parens: bool,
    pub parens_in_op: bool,
}

impl Expression {
    pub fn new(value: Vec<Value>) -> Self {
        Self {
            value,
            no_spacing: false,
            parens: false,
            parens_in_op: false,
        }
    }

    pub fn parenthesized(value: Vec<Value>) -> Self {
        Self {
            value,
            no_spacing: false,
            parens: true,
            parens_in_op: false,
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        let math_on = context.is_math_on(None);
        let in_parenthesis = self.parens
            && (context.options.math != MathMode::StrictLegacy || !self.parens_in_op);
        let mut double_paren = false;
        if in_parenthesis {
            context.in_parenthesis();
        }
        let result = if self.value.len() > 1 {
            let mut evaluated = Vec::with_capacity(self.value.len());
            for part in &self.value {
                evaluated.push(part.eval(context)?);
            }
            let mut expression = Expression::new(evaluated);
            expression.no_spacing = self.no_spacing;
            Ok(Value::Expression(expression))
        } else if let Some(single) = self.value.first() {
            if let Value::Expression(inner) = single {
                if inner.parens && !inner.parens_in_op && !context.in_calc {
                    double_paren = true;
                }
            }
            single.eval(context)
        } else {
            Ok(Value::Expression(self.clone()))
        };
        if in_parenthesis {
            context.out_of_parenthesis();
        }
        let result = result?;
        if self.parens
            && self.parens_in_op
            && !math_on
            && !double_paren
            && !matches!(result, Value::Dimension(_))
        {
            return Ok(Value::Paren(Paren::new(result)));
        }
        Ok(result)
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        for (position, part) in self.value.iter().enumerate() {
            part.gen_css(context, output)?;
            if !self.no_spacing && position + 1 < self.value.len() {
                output.add(" ");
            }
        }
        Ok(())
    }
}

/// A comma-separated list of expressions.
#[derive(Clone, Debug, Default)]
pub struct ValueList {
    pub value: Vec<Value>,
}

impl ValueList {
    pub fn new(value: Vec<Value>) -> Self {
        Self { value }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        if self.value.len() == 1 {
            if let Some(single) = self.value.first() {
                return single.eval(context);
            }
        }
        let mut evaluated = Vec::with_capacity(self.value.len());
        for part in &self.value {
            evaluated.push(part.eval(context)?);
        }
        Ok(Value::List(ValueList::new(evaluated)))
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        let separator = if context.compress { "," } else { ", " };
        for (position, part) in self.value.iter().enumerate() {
            part.gen_css(context, output)?;
            if position + 1 < self.value.len() {
                output.add(separator);
            }
        }
        Ok(())
    }
}

/// A binary arithmetic node. Stays symbolic when the math mode keeps
/// the operator literal, folds to a value when math is on.
#[derive(Clone, Debug)]
pub struct Operation {
    pub op: Operator,
    pub operands: Vec<Value>,
    pub is_spaced: bool,
}

impl Operation {
    pub fn new(op: Operator, operands: Vec<Value>) -> Self {
        Self {
            op,
            operands,
            is_spaced: false,
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        let first = self
            .operands
            .first()
            .ok_or_else(|| CompileError::operation("Operation on an invalid type"))?
            .eval(context)?;
        let second = self
            .operands
            .get(1)
            .ok_or_else(|| CompileError::operation("Operation on an invalid type"))?
            .eval(context)?;
        if !context.is_math_on(Some(self.op)) {
            let mut symbolic = Operation::new(self.op, vec![first, second]);
            symbolic.is_spaced = self.is_spaced;
            return Ok(Value::Operation(symbolic));
        }
        // A number against a color operates channel-wise on a gray.
        let (first, second) = match (first, second) {
            (Value::Dimension(number), Value::Color(color)) => {
                (Value::Color(number.to_color()), Value::Color(color))
            }
            (Value::Color(color), Value::Dimension(number)) => {
                (Value::Color(color), Value::Color(number.to_color()))
            }
            pair => pair,
        };
        match (&first, &second) {
            (Value::Dimension(lhs), Value::Dimension(rhs)) => Ok(Value::Dimension(lhs.operate(
                self.op,
                rhs,
                context.options.strict_units,
            )?)),
            (Value::Color(lhs), Value::Color(rhs)) => Ok(Value::Color(lhs.operate(self.op, rhs))),
            _ => {
                // Under parens-division a symbolic division may survive
                // as an operand; keep the whole operation symbolic then.
                let division_survived = matches!(
                    &first,
                    Value::Operation(inner) if inner.op == Operator::Divide
                ) && context.options.math == MathMode::ParensDivision;
                if division_survived {
                    let mut symbolic = Operation::new(self.op, vec![first, second]);
                    symbolic.is_spaced = self.is_spaced;
                    return Ok(Value::Operation(symbolic));
                }
                Err(CompileError::operation("Operation on an invalid type"))
            }
        }
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        for (position, operand) in self.operands.iter().enumerate() {
            operand.gen_css(context, output)?;
            if position + 1 < self.operands.len() {
                if self.is_spaced {
                    output.add(" ");
                }
                output.add(self.op.symbol());
                if self.is_spaced {
                    output.add(" ");
                }
            }
        }
        Ok(())
    }
}

/// Unary minus. Folds to `-1 * value` when math is on.
#[derive(Clone, Debug)]
pub struct Negative {
    pub value: Box<Value>,
}

impl Negative {
    pub fn new(value: Value) -> Self {
        Self {
            value: Box::new(value),
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        if context.is_math_on(None) {
            let negated = Operation::new(
                Operator::Multiply,
                vec![Value::Dimension(Dimension::number(-1.0)), (*self.value).clone()],
            );
            return negated.eval(context);
        }
        Ok(Value::Negative(Negative::new(self.value.eval(context)?)))
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        output.add("-");
        self.value.gen_css(context, output)
    }
}

/// Parentheses that survived evaluation and render literally.
#[derive(Clone, Debug)]
pub struct Paren {
    pub value: Box<Value>,
}

impl Paren {
    pub fn new(value: Value) -> Self {
        Self {
            value: Box::new(value),
        }
    }

    pub fn eval(&self, context: &mut Eval) -> CompileResult<Value> {
        Ok(Value::Paren(Paren::new(self.value.eval(context)?)))
    }

    pub fn gen_css(&self, context: &mut RenderCtx, output: &mut Output) -> CompileResult<()> {
        output.add("(");
        self.value.gen_css(context, output)?;
        output.add(")");
        Ok(())
    }
}

/// Guard condition operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionOp {
    And,
    Or,
    Less,
    Greater,
    Equal,
    LessOrEqual,
    GreaterOrEqual,
}

/// A guard condition. `and`/`or` expect conditions as operands; any
/// other operand counts as satisfied once it evaluates.
#[derive(Clone, Debug)]
pub struct Condition {
    pub op: ConditionOp,
    pub lhs: Value,
    pub rhs: Value,
    pub negate: bool,
}

impl Condition {
    pub fn new(op: ConditionOp, lhs: Value, rhs: Value) -> Self {
        Self {
            op,
            lhs,
            rhs,
            negate: false,
        }
    }

    pub fn eval_bool(&self, context: &mut Eval) -> CompileResult<bool> {
        let result = match self.op {
            ConditionOp::And => {
                operand_bool(&self.lhs, context)? && operand_bool(&self.rhs, context)?
            }
            ConditionOp::Or => {
                operand_bool(&self.lhs, context)? || operand_bool(&self.rhs, context)?
            }
            comparison => {
                let lhs = self.lhs.eval(context)?;
                let rhs = self.rhs.eval(context)?;
                match compare(&lhs, &rhs) {
                    Some(Ordering::Less) => {
                        matches!(comparison, ConditionOp::Less | ConditionOp::LessOrEqual)
                    }
                    Some(Ordering::Equal) => matches!(
                        comparison,
                        ConditionOp::Equal | ConditionOp::LessOrEqual | ConditionOp::GreaterOrEqual
                    ),
                    Some(Ordering::Greater) => {
                        matches!(comparison, ConditionOp::Greater | ConditionOp::GreaterOrEqual)
                    }
                    None => false,
                }
            }
        };
        Ok(if self.negate { !result } else { result })
    }
}

fn operand_bool(operand: &Value, context: &mut Eval) -> CompileResult<bool> {
    match operand {
        Value::Condition(condition) => condition.eval_bool(context),
        other => {
            let evaluated = other.eval(context)?;
            match evaluated {
                Value::Keyword(keyword) => Ok(keyword.is_true()),
                _ => Ok(true),
            }
        }
    }
}
