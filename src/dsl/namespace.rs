//! Parse-time name registries.
//!
//! A name lives in at most one of the function and variable namespaces.
//! Nested scopes work on a clone and drop it on exit, so a caller's
//! namespaces never see a callee's locals.

use super::ast::Parameter;
use super::builtins::{builtin_token, Builtin, BUILTIN_VARIABLES};
use super::error::CompileError;
use super::token::Token;
use super::types::Type;

/// Everything callers need to type-check a call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: Token,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    pub name: Token,
    pub ty: Type,
}

/// What a name refers to.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Function(&'a FunctionSignature),
    Variable(&'a VariableBinding),
}

#[derive(Debug, Clone, Default)]
pub struct Namespaces {
    functions: Vec<FunctionSignature>,
    variables: Vec<VariableBinding>,
}

fn site(token: &Token) -> String {
    if token.line == 0 {
        "as a built-in".to_string()
    } else {
        format!("at {}:{}", token.line, token.col)
    }
}

impl Namespaces {
    /// Namespaces holding only the built-in names.
    pub fn with_builtins() -> Self {
        let functions = Builtin::ALL
            .into_iter()
            .map(|b| FunctionSignature {
                name: builtin_token(b.name()),
                parameters: b.parameters(),
                return_type: b.return_type(),
            })
            .collect();
        let variables = BUILTIN_VARIABLES
            .into_iter()
            .map(|(name, ty)| VariableBinding {
                name: builtin_token(name),
                ty,
            })
            .collect();
        Self {
            functions,
            variables,
        }
    }

    fn matching_functions(&self, name: &str) -> Vec<&FunctionSignature> {
        self.functions
            .iter()
            .filter(|f| f.name.text == name)
            .collect()
    }

    fn matching_variables(&self, name: &str) -> Vec<&VariableBinding> {
        self.variables
            .iter()
            .filter(|v| v.name.text == name)
            .collect()
    }

    /// Resolve a name token to its single declaration.
    pub fn resolve(&self, name: &Token) -> Result<Resolved<'_>, CompileError> {
        let functions = self.matching_functions(&name.text);
        let variables = self.matching_variables(&name.text);

        if functions.len() > 1 || variables.len() > 1 {
            return Err(CompileError::internal(format!(
                "`{}` is registered more than once in a namespace",
                name.text
            )));
        }

        match (functions.first(), variables.first()) {
            (None, None) => Err(CompileError::parse_at(
                format!("`{}` has not been declared", name.text),
                name,
            )),
            (Some(f), Some(v)) => Err(CompileError::parse_at(
                format!(
                    "`{}` is ambiguous: declared as a function {} and as a variable {}",
                    name.text,
                    site(&f.name),
                    site(&v.name)
                ),
                name,
            )),
            (Some(f), None) => Ok(Resolved::Function(*f)),
            (None, Some(v)) => Ok(Resolved::Variable(*v)),
        }
    }

    /// Fail if `name` is already taken in either namespace.
    pub fn check_available(&self, name: &Token) -> Result<(), CompileError> {
        if let Some(f) = self.functions.iter().find(|f| f.name.text == name.text) {
            return Err(CompileError::parse_at(
                format!(
                    "cannot declare `{}`: a function with that name was declared {}",
                    name.text,
                    site(&f.name)
                ),
                name,
            ));
        }
        if let Some(v) = self.variables.iter().find(|v| v.name.text == name.text) {
            return Err(CompileError::parse_at(
                format!(
                    "cannot declare `{}`: a variable with that name was declared {}",
                    name.text,
                    site(&v.name)
                ),
                name,
            ));
        }
        Ok(())
    }

    pub fn declare_function(&mut self, signature: FunctionSignature) -> Result<(), CompileError> {
        self.check_available(&signature.name)?;
        log::trace!("declared function `{}`", signature.name.text);
        self.functions.push(signature);
        Ok(())
    }

    pub fn declare_variable(&mut self, binding: VariableBinding) -> Result<(), CompileError> {
        self.check_available(&binding.name)?;
        log::trace!("declared variable `{}`: {}", binding.name.text, binding.ty);
        self.variables.push(binding);
        Ok(())
    }

    /// The single variable named `name`. Callers have already resolved it.
    pub fn variable(&self, name: &str) -> Result<&VariableBinding, CompileError> {
        match self.matching_variables(name).as_slice() {
            [binding] => Ok(*binding),
            [] => Err(CompileError::internal(format!(
                "variable `{name}` vanished after it was resolved"
            ))),
            _ => Err(CompileError::internal(format!(
                "variable `{name}` is registered more than once"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::token::TokenKind;

    fn name(text: &str, line: usize, col: usize) -> Token {
        Token::new(TokenKind::Name, text, line, col)
    }

    #[test]
    fn builtins_resolve() {
        let ns = Namespaces::with_builtins();
        assert!(matches!(
            ns.resolve(&name("rand", 1, 1)),
            Ok(Resolved::Function(_))
        ));
        assert!(matches!(
            ns.resolve(&name("seed", 1, 1)),
            Ok(Resolved::Variable(_))
        ));
    }

    #[test]
    fn undeclared_name() {
        let ns = Namespaces::default();
        let err = ns.resolve(&name("melody", 4, 9)).unwrap_err();
        assert!(err.reason.contains("has not been declared"));
        assert_eq!((err.line, err.col), (4, 9));
    }

    #[test]
    fn function_then_variable_conflict() {
        let mut ns = Namespaces::default();
        ns.declare_function(FunctionSignature {
            name: name("riff", 1, 4),
            parameters: vec![],
            return_type: Type::Pitch,
        })
        .unwrap();
        let err = ns
            .declare_variable(VariableBinding {
                name: name("riff", 5, 8),
                ty: Type::Number,
            })
            .unwrap_err();
        assert!(err.reason.contains("declared at 1:4"));
        assert_eq!((err.line, err.col), (5, 8));
    }

    #[test]
    fn builtin_conflict_mentions_builtin() {
        let mut ns = Namespaces::with_builtins();
        let err = ns
            .declare_variable(VariableBinding {
                name: name("rand", 2, 1),
                ty: Type::Number,
            })
            .unwrap_err();
        assert!(err.reason.contains("as a built-in"));
    }

    #[test]
    fn duplicate_registration_is_internal() {
        // Bypass the insertion checks to break the invariant on purpose.
        let binding = VariableBinding {
            name: name("x", 1, 1),
            ty: Type::Number,
        };
        let ns = Namespaces {
            functions: vec![],
            variables: vec![binding.clone(), binding],
        };
        let err = ns.resolve(&name("x", 2, 2)).unwrap_err();
        assert_eq!((err.line, err.col), (0, 0));
        assert!(ns.variable("x").is_err());
    }

    #[test]
    fn variable_lookup_after_resolve() {
        let ns = Namespaces::with_builtins();
        assert_eq!(ns.variable("seed").unwrap().ty, Type::Number);
        let err = ns.variable("nowhere").unwrap_err();
        assert_eq!((err.line, err.col), (0, 0));
    }

    #[test]
    fn clones_are_independent() {
        let outer = Namespaces::default();
        let mut inner = outer.clone();
        inner
            .declare_variable(VariableBinding {
                name: name("local", 1, 1),
                ty: Type::Number,
            })
            .unwrap();
        assert!(outer.resolve(&name("local", 1, 1)).is_err());
        assert!(inner.resolve(&name("local", 1, 1)).is_ok());
    }
}
