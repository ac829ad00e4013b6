//! Runtime function and variable environments.

use std::collections::HashMap;

use crate::dsl::ast::{FunctionDeclaration, Parameter, Step};
use crate::dsl::builtins::Builtin;
use crate::dsl::error::CompileError;
use crate::dsl::token::Token;
use crate::dsl::types::Type;

use super::value::{RuntimeValue, Value};

#[derive(Debug, Clone, Copy)]
pub enum FunctionBody<'p> {
    Steps(&'p [Step]),
    Builtin(Builtin),
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition<'p> {
    pub parameters: &'p [Parameter],
    pub body: FunctionBody<'p>,
    pub return_type: Type,
}

/// Functions by name. Borrows bodies from the syntax tree.
#[derive(Debug, Clone, Default)]
pub struct FunctionEnvironment<'p> {
    functions: HashMap<String, FunctionDefinition<'p>>,
}

impl<'p> FunctionEnvironment<'p> {
    pub fn with_builtins() -> Self {
        let functions = Builtin::ALL
            .into_iter()
            .map(|builtin| {
                let definition = FunctionDefinition {
                    parameters: &[],
                    body: FunctionBody::Builtin(builtin),
                    return_type: builtin.return_type(),
                };
                (builtin.name().to_string(), definition)
            })
            .collect();
        Self { functions }
    }

    pub fn define(&mut self, declaration: &'p FunctionDeclaration) {
        log::trace!("defining function `{}`", declaration.name.text);
        self.functions.insert(
            declaration.name.text.clone(),
            FunctionDefinition {
                parameters: &declaration.parameters,
                body: FunctionBody::Steps(&declaration.body),
                return_type: declaration.return_type.clone(),
            },
        );
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionDefinition<'p>> {
        self.functions.get(name)
    }

    pub fn get(&self, name: &Token) -> Result<&FunctionDefinition<'p>, CompileError> {
        self.lookup(&name.text).ok_or_else(|| {
            CompileError::internal(format!(
                "function `{}` at {}:{} passed the parser but has no definition",
                name.text, name.line, name.col
            ))
        })
    }
}

/// Variables by name.
#[derive(Debug, Clone, Default)]
pub struct VariableEnvironment {
    values: HashMap<String, RuntimeValue>,
}

impl VariableEnvironment {
    /// The built-in variables for a run with `seed`.
    pub fn with_builtins(seed: u64) -> Self {
        let mut env = Self::default();
        let seed = i64::try_from(seed).unwrap_or(i64::MAX);
        env.declare("seed", RuntimeValue::new(Type::Number, Value::Number(seed)));
        env
    }

    pub fn declare(&mut self, name: &str, value: RuntimeValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<&RuntimeValue, CompileError> {
        self.values.get(&name.text).ok_or_else(|| missing(name))
    }

    /// The variable `name`, or the element `path` addresses inside it.
    pub fn slot_mut(
        &mut self,
        name: &Token,
        path: &[(i64, &Token)],
    ) -> Result<&mut RuntimeValue, CompileError> {
        let mut slot = self.values.get_mut(&name.text).ok_or_else(|| missing(name))?;
        for (index, at) in path {
            slot = slot.index_mut(*index, at)?;
        }
        Ok(slot)
    }

    /// Copy back every variable that also exists in `scope`.
    ///
    /// Used after a loop iteration so reassignments reach the enclosing
    /// environment while loop-local declarations are dropped.
    pub fn write_back(&mut self, mut scope: VariableEnvironment) {
        for (name, value) in self.values.iter_mut() {
            if let Some(updated) = scope.values.remove(name) {
                *value = updated;
            }
        }
    }
}

fn missing(name: &Token) -> CompileError {
    CompileError::internal(format!(
        "variable `{}` at {}:{} passed the parser but has no value",
        name.text, name.line, name.col
    ))
}
