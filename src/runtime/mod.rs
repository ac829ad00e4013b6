//! Tree-walking evaluator.
//!
//! Runs the top-level declarations, then calls `main`. Each call gets a
//! fresh variable environment cloned from the globals, so reassignments
//! inside a function never reach its caller.

pub mod arithmetic;
pub mod environment;
pub mod value;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::dsl::ast::{Expression, ForLoop, Literal, LiteralExp, PropertyAssignment, Reassignment, Step};
use crate::dsl::builtins::Builtin;
use crate::dsl::error::CompileError;
use crate::dsl::token::Token;

pub use environment::{FunctionBody, FunctionDefinition, FunctionEnvironment, VariableEnvironment};
pub use value::{RuntimeValue, Value};

/// Evaluate a parsed program and return the value of `main`.
pub fn evaluate(steps: &[Step], seed: u64) -> Result<RuntimeValue, CompileError> {
    Evaluator::new(seed).run(steps)
}

pub struct Evaluator<'p> {
    functions: FunctionEnvironment<'p>,
    globals: VariableEnvironment,
    rng: ChaCha8Rng,
}

impl<'p> Evaluator<'p> {
    pub fn new(seed: u64) -> Self {
        Self {
            functions: FunctionEnvironment::with_builtins(),
            globals: VariableEnvironment::with_builtins(seed),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn run(mut self, steps: &'p [Step]) -> Result<RuntimeValue, CompileError> {
        for step in steps {
            match step {
                Step::FunctionDeclaration(declaration) => self.functions.define(declaration),
                Step::VariableDeclaration(declaration) => {
                    let env = self.globals.clone();
                    let mut value = self.eval(&declaration.body, &env)?;
                    value.set_type(&declaration.ty);
                    log::trace!("global `{}` = {value}", declaration.name.text);
                    self.globals.declare(&declaration.name.text, value);
                }
                _ => {
                    return Err(CompileError::internal(
                        "a statement other than a declaration reached the top level",
                    ));
                }
            }
        }

        let main = self
            .functions
            .lookup("main")
            .ok_or_else(|| CompileError::runtime("program has no `main` function", 0, 0))?;
        if !main.parameters.is_empty() {
            return Err(CompileError::runtime(
                "`main` must not take parameters",
                0,
                0,
            ));
        }

        let name = Token::new(crate::dsl::token::TokenKind::Name, "main", 0, 0);
        let result = self.call(&name, Vec::new())?;
        log::debug!("`main` returned {result}");
        Ok(result)
    }

    fn call(&mut self, name: &Token, arguments: Vec<RuntimeValue>) -> Result<RuntimeValue, CompileError> {
        let definition = self.functions.get(name)?.clone();

        match definition.body {
            FunctionBody::Builtin(Builtin::Rand) => Ok(RuntimeValue::number(self.rng.gen_range(0..=99))),
            FunctionBody::Steps(body) => {
                let mut env = self.globals.clone();
                for (parameter, mut argument) in definition.parameters.iter().zip(arguments) {
                    argument.set_type(&parameter.ty);
                    env.declare(&parameter.name.text, argument);
                }
                log::trace!("calling `{}`", name.text);

                let mut result = self.execute(body, &mut env)?.ok_or_else(|| {
                    CompileError::runtime_at(
                        format!("function `{}` finished without returning a value", name.text),
                        name,
                    )
                })?;
                result.set_type(&definition.return_type);
                Ok(result)
            }
        }
    }

    /// Run `steps` until a `return`. `None` if none was reached.
    fn execute(
        &mut self,
        steps: &[Step],
        env: &mut VariableEnvironment,
    ) -> Result<Option<RuntimeValue>, CompileError> {
        for step in steps {
            match step {
                Step::Expression(expression) => {
                    self.eval_optional(expression, env)?;
                }
                Step::VariableDeclaration(declaration) => {
                    let mut value = self.eval(&declaration.body, env)?;
                    value.set_type(&declaration.ty);
                    env.declare(&declaration.name.text, value);
                }
                Step::Reassignment(reassignment) => self.reassign(reassignment, env)?,
                Step::PropertyAssignment(assignment) => self.set_property(assignment, env)?,
                Step::Return(ret) => return self.eval(&ret.expression, env).map(Some),
                Step::For(for_loop) => self.run_loop(for_loop, env)?,
                Step::FunctionDeclaration(declaration) => {
                    return Err(CompileError::internal(format!(
                        "function `{}` was declared inside a body",
                        declaration.name.text
                    )));
                }
            }
        }
        Ok(None)
    }

    fn reassign(
        &mut self,
        reassignment: &Reassignment,
        env: &mut VariableEnvironment,
    ) -> Result<(), CompileError> {
        let value = self.eval(&reassignment.body, env)?;
        let path = self.eval_indexes(&reassignment.indexes, env)?;
        let slot = env.slot_mut(&reassignment.name, &path)?;

        // Properties already on the target survive unless the new value sets them.
        let mut properties = std::mem::take(&mut slot.properties);
        properties.extend(value.properties);
        let ty = slot.return_type.clone();
        *slot = RuntimeValue {
            properties,
            ..RuntimeValue::new(value.return_type, value.return_value)
        };
        slot.set_type(&ty);
        Ok(())
    }

    fn set_property(
        &mut self,
        assignment: &PropertyAssignment,
        env: &mut VariableEnvironment,
    ) -> Result<(), CompileError> {
        let path = self.eval_indexes(&assignment.indexes, env)?;
        let slot = env.slot_mut(&assignment.name, &path)?;
        slot.properties
            .insert(assignment.property.text.clone(), assignment.value.clone());
        Ok(())
    }

    fn run_loop(&mut self, for_loop: &ForLoop, env: &mut VariableEnvironment) -> Result<(), CompileError> {
        let iterable = self.eval(&for_loop.iterable, env)?;
        let Value::List(items) = iterable.return_value else {
            return Err(CompileError::internal(format!(
                "`for` at {}:{} iterated over a non-list",
                for_loop.token.line, for_loop.token.col
            )));
        };

        for item in items {
            let mut scope = env.clone();
            scope.declare(&for_loop.variable.text, item);
            if self.execute(&for_loop.body, &mut scope)?.is_some() {
                return Err(CompileError::internal("`return` executed inside a `for` loop"));
            }
            env.write_back(scope);
        }
        Ok(())
    }

    /// Evaluate the index expressions of a variable access.
    fn eval_indexes<'e>(
        &mut self,
        indexes: &'e [Expression],
        env: &VariableEnvironment,
    ) -> Result<Vec<(i64, &'e Token)>, CompileError> {
        indexes
            .iter()
            .map(|index| Ok((self.eval_number(index, env)?, index.token())))
            .collect()
    }

    fn eval_number(&mut self, expression: &Expression, env: &VariableEnvironment) -> Result<i64, CompileError> {
        match self.eval(expression, env)?.return_value {
            Value::Number(n) => Ok(n),
            other => Err(CompileError::internal(format!(
                "expected a number at {}:{}, found {other}",
                expression.token().line,
                expression.token().col
            ))),
        }
    }

    /// Evaluate an expression that must produce a value.
    fn eval(&mut self, expression: &Expression, env: &VariableEnvironment) -> Result<RuntimeValue, CompileError> {
        self.eval_optional(expression, env)?.ok_or_else(|| {
            CompileError::runtime_at(
                "this if-expression has no else branch and its condition was false, so it has no value",
                expression.token(),
            )
        })
    }

    /// Evaluate an expression. Only an `if` without `else` whose condition
    /// is false yields `None`.
    fn eval_optional(
        &mut self,
        expression: &Expression,
        env: &VariableEnvironment,
    ) -> Result<Option<RuntimeValue>, CompileError> {
        match expression {
            Expression::Literal(literal) => self.literal(literal, env).map(Some),
            Expression::Var(var) => {
                let path = self.eval_indexes(&var.indexes, env)?;
                let mut value = env.get(&var.name)?;
                for (index, at) in path {
                    value = value.index(index, at)?;
                }
                Ok(Some(value.clone()))
            }
            Expression::Op(op) => {
                let left = self.eval(&op.left, env)?;
                let right = self.eval(&op.right, env)?;
                arithmetic::apply(op.op, &op.operator, left, right, &op.ty).map(Some)
            }
            Expression::FuncApp(call) => {
                let arguments = call
                    .arguments
                    .iter()
                    .map(|argument| self.eval(argument, env))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&call.name, arguments).map(Some)
            }
            Expression::If(branch) => {
                let condition = self.eval(&branch.condition, env)?;
                let taken = match condition.return_value {
                    Value::Boolean(true) => Some(&branch.then_branch),
                    Value::Boolean(false) => branch.else_branch.as_ref(),
                    other => {
                        return Err(CompileError::internal(format!(
                            "if condition at {}:{} evaluated to {other}",
                            branch.token.line, branch.token.col
                        )));
                    }
                };
                let Some(taken) = taken else {
                    return Ok(None);
                };
                let mut value = self.eval_optional(taken, env)?;
                if let Some(value) = value.as_mut() {
                    value.set_type(&branch.ty);
                }
                Ok(value)
            }
        }
    }

    fn literal(&mut self, literal: &LiteralExp, env: &VariableEnvironment) -> Result<RuntimeValue, CompileError> {
        let value = match &literal.value {
            Literal::Number(n) => Value::Number(*n),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Pitch(p) => Value::Pitch(*p),
            Literal::Rhythm(r) => Value::Rhythm(*r),
            Literal::PitchRhythm(pitch, rhythm) => Value::PitchRhythm {
                pitch: *pitch,
                rhythm: *rhythm,
            },
            Literal::ScaleDegree(d) => Value::Degree(*d),
            Literal::ScaleDegreeRhythm(degree, rhythm) => Value::DegreeRhythm {
                degree: *degree,
                rhythm: *rhythm,
            },
            Literal::List(elements) => Value::List(
                elements
                    .iter()
                    .map(|element| self.eval(element, env))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        let mut result = RuntimeValue::new(literal.ty.clone(), value);
        result.set_type(&literal.ty);
        Ok(result)
    }
}
