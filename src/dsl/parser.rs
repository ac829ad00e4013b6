//! Statement and declaration parser.
//!
//! Walks a token slice statement by statement, building [`Steps`] and growing
//! the namespaces as declarations appear. Expressions are handed to
//! [`parse_expression`]; function and loop bodies are parsed on a clone of
//! the enclosing namespaces so their locals are dropped on exit.

use std::fmt;

use super::ast::*;
use super::error::CompileError;
use super::expression::{matching_close, parse_expression, parse_indexes, parse_subexpression};
use super::namespace::{FunctionSignature, Namespaces, Resolved, VariableBinding};
use super::property;
use super::token::{Token, TokenKind};
use super::types::Type;

/// Parse a whole program.
///
/// Only function declarations, variable declarations and stray `;` are
/// allowed at the top level.
pub fn make_syntax_tree(tokens: &[Token]) -> Result<Steps, CompileError> {
    let mut parser = Parser::new(tokens);
    let mut ns = Namespaces::with_builtins();
    let mut steps = Steps::new();

    while let Some(token) = parser.peek() {
        match token.kind {
            TokenKind::StatementTerminator => {
                parser.advance();
            }
            TokenKind::FunctionDeclaration => {
                let declaration = parser.function_declaration(&mut ns)?;
                steps.push(Step::FunctionDeclaration(declaration));
            }
            TokenKind::TypeKeyword => {
                let declaration = parser.variable_declaration(&mut ns)?;
                steps.push(Step::VariableDeclaration(declaration));
            }
            _ => {
                return Err(CompileError::parse_at(
                    format!(
                        "only function and variable declarations are allowed at the top level, found {token}"
                    ),
                    token,
                ));
            }
        }
    }

    log::debug!("parsed {} top-level declarations", steps.len());
    Ok(steps)
}

/// Parse the body of function `name`.
///
/// The body sees the enclosing namespaces, the function's own signature and
/// its parameters. It must contain at least one `return`, and the last one
/// must produce `return_type`.
pub fn make_function_body_syntax_tree(
    tokens: &[Token],
    ns: &Namespaces,
    parameters: &[Parameter],
    name: &Token,
    return_type: &Type,
) -> Result<Steps, CompileError> {
    let mut scope = ns.clone();
    scope.declare_function(FunctionSignature {
        name: name.clone(),
        parameters: parameters.to_vec(),
        return_type: return_type.clone(),
    })?;
    for parameter in parameters {
        scope.declare_variable(VariableBinding {
            name: parameter.name.clone(),
            ty: parameter.ty.clone(),
        })?;
    }

    let steps = Parser::new(tokens).body(&mut scope, BodyContext::Function { return_type })?;

    let last_return = steps
        .iter()
        .rev()
        .find_map(|step| match step {
            Step::Return(r) => Some(r),
            _ => None,
        })
        .ok_or_else(|| {
            CompileError::parse_at(
                format!("function `{}` has no return statement", name.text),
                name,
            )
        })?;
    check_return(return_type, last_return)?;

    log::trace!("parsed body of `{}`: {} steps", name.text, steps.len());
    Ok(steps)
}

fn check_return(return_type: &Type, ret: &Return) -> Result<(), CompileError> {
    let found = ret.expression.return_type();
    if return_type.accepts(found) {
        Ok(())
    } else {
        Err(CompileError::parse_at(
            format!("return type mismatch: expected {return_type}, found {found}"),
            &ret.token,
        ))
    }
}

/// Where a body is being parsed.
#[derive(Debug, Clone, Copy)]
enum BodyContext<'a> {
    Function { return_type: &'a Type },
    Loop,
}

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn body(
        &mut self,
        scope: &mut Namespaces,
        context: BodyContext<'_>,
    ) -> Result<Steps, CompileError> {
        let mut steps = Steps::new();

        while let Some(token) = self.peek() {
            let step = match token.kind {
                TokenKind::StatementTerminator => {
                    self.advance();
                    continue;
                }
                TokenKind::TypeKeyword => Step::VariableDeclaration(self.variable_declaration(scope)?),
                TokenKind::ReturnKeyword => match context {
                    BodyContext::Function { return_type } => {
                        Step::Return(self.return_statement(scope, return_type)?)
                    }
                    BodyContext::Loop => {
                        return Err(CompileError::parse_at(
                            "`return` is not allowed inside a `for` loop",
                            token,
                        ));
                    }
                },
                TokenKind::LoopKeyword => Step::For(self.for_loop(scope)?),
                TokenKind::FunctionDeclaration => {
                    return Err(CompileError::parse_at(
                        "functions can only be declared at the top level",
                        token,
                    ));
                }
                TokenKind::Name => self.name_statement(scope)?,
                _ => Step::Expression(self.expression(scope)?),
            };
            steps.push(step);
        }

        Ok(steps)
    }

    /// `fn NAME ( [NAME : TYPE [,]]* ) : TYPE { BODY }`
    fn function_declaration(
        &mut self,
        ns: &mut Namespaces,
    ) -> Result<FunctionDeclaration, CompileError> {
        self.expect(TokenKind::FunctionDeclaration)?;
        let name = self.expect(TokenKind::Name)?.clone();
        ns.check_available(&name)?;

        self.expect(TokenKind::LeftParen)?;
        let mut parameters: Vec<Parameter> = Vec::new();
        while !self.check(TokenKind::RightParen) {
            let param_name = self.expect(TokenKind::Name)?.clone();
            ns.check_available(&param_name)?;
            if param_name.text == name.text {
                return Err(CompileError::parse_at(
                    format!(
                        "parameter `{}` has the same name as its function",
                        param_name.text
                    ),
                    &param_name,
                ));
            }
            if let Some(earlier) = parameters.iter().find(|p| p.name.text == param_name.text) {
                return Err(CompileError::parse_at(
                    format!(
                        "parameter `{}` was already declared at {}:{}",
                        param_name.text, earlier.name.line, earlier.name.col
                    ),
                    &param_name,
                ));
            }
            self.expect(TokenKind::TypeAscription)?;
            let ty = self.declared_type()?;
            parameters.push(Parameter {
                name: param_name,
                ty,
            });
            if self.check(TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::TypeAscription)?;
        let return_type = self.declared_type()?;

        let body_tokens = self.brace_body()?;
        let body =
            make_function_body_syntax_tree(body_tokens, ns, &parameters, &name, &return_type)?;

        ns.declare_function(FunctionSignature {
            name: name.clone(),
            parameters: parameters.clone(),
            return_type: return_type.clone(),
        })?;

        Ok(FunctionDeclaration {
            name,
            parameters,
            body,
            return_type,
        })
    }

    /// `TYPE NAME = EXPR ;`
    fn variable_declaration(
        &mut self,
        scope: &mut Namespaces,
    ) -> Result<VariableDeclaration, CompileError> {
        let declared = self.parse_type()?;
        let name = self.expect(TokenKind::Name)?.clone();
        scope.check_available(&name)?;
        self.expect(TokenKind::Assignment)?;
        let body = self.expression(scope)?;
        let found = body.return_type();

        let ty = match declared {
            Some(ty) => {
                if !ty.accepts(found) {
                    return Err(CompileError::parse_at(
                        format!("`{}` is declared as {ty} but assigned {found}", name.text),
                        &name,
                    ));
                }
                ty
            }
            None => {
                if *found == Type::EmptyList {
                    return Err(CompileError::parse_at(
                        format!(
                            "cannot infer the element type of `{}` from `[]`; write the full list type",
                            name.text
                        ),
                        &name,
                    ));
                }
                if !found.is_list() {
                    return Err(CompileError::parse_at(
                        format!("`{}` is declared as a list but assigned {found}", name.text),
                        &name,
                    ));
                }
                found.clone()
            }
        };

        scope.declare_variable(VariableBinding {
            name: name.clone(),
            ty: ty.clone(),
        })?;
        Ok(VariableDeclaration { name, body, ty })
    }

    fn return_statement(
        &mut self,
        scope: &Namespaces,
        return_type: &Type,
    ) -> Result<Return, CompileError> {
        let token = self.expect(TokenKind::ReturnKeyword)?.clone();
        let expression = self.expression(scope)?;
        let ret = Return { token, expression };
        check_return(return_type, &ret)?;
        Ok(ret)
    }

    /// `for NAME in EXPR { BODY }`
    fn for_loop(&mut self, scope: &Namespaces) -> Result<ForLoop, CompileError> {
        let token = self.expect_keyword(TokenKind::LoopKeyword, "for")?.clone();
        let variable = self.expect(TokenKind::Name)?.clone();
        scope.check_available(&variable)?;
        let in_token = self.expect_keyword(TokenKind::LoopKeyword, "in")?;

        let rest = self.remaining();
        let open = body_start(rest).ok_or_else(|| {
            CompileError::parse_at("expected `{` to start the loop body", in_token)
        })?;
        let iterable = parse_subexpression(&rest[..open], in_token, scope)?;
        let element = match iterable.return_type() {
            Type::List(inner) => (**inner).clone(),
            Type::EmptyList => {
                return Err(CompileError::parse_at(
                    "cannot infer the loop variable's type from `[]`",
                    iterable.token(),
                ));
            }
            other => {
                return Err(CompileError::parse_at(
                    format!("`for` iterates over lists, found {other}"),
                    iterable.token(),
                ));
            }
        };
        self.pos += open;

        let body_tokens = self.brace_body()?;
        let mut loop_scope = scope.clone();
        loop_scope.declare_variable(VariableBinding {
            name: variable.clone(),
            ty: element,
        })?;
        let body = Parser::new(body_tokens).body(&mut loop_scope, BodyContext::Loop)?;

        Ok(ForLoop {
            token,
            variable,
            iterable,
            body,
        })
    }

    /// A statement starting with a name: a call, a reassignment, a property
    /// assignment or an expression using a variable.
    fn name_statement(&mut self, scope: &mut Namespaces) -> Result<Step, CompileError> {
        let rest = self.remaining();
        let name = &rest[0];

        let declared = match scope.resolve(name)? {
            Resolved::Function(_) => return Ok(Step::Expression(self.expression(scope)?)),
            Resolved::Variable(binding) => binding.ty.clone(),
        };

        let (indexes, consumed) = parse_indexes(&rest[1..], scope)?;
        let after = rest.get(1 + consumed).map(|t| t.kind);
        match after {
            Some(TokenKind::Dot) => {
                self.pos += 1 + consumed;
                let target = indexed_type(&declared, name, indexes.len())?;
                log::trace!("property assignment on `{}`: {target}", name.text);
                self.property_assignment(name.clone(), indexes)
                    .map(Step::PropertyAssignment)
            }
            Some(TokenKind::Assignment) => {
                self.pos += 1 + consumed;
                self.reassignment(name.clone(), indexes, scope)
                    .map(Step::Reassignment)
            }
            _ => Ok(Step::Expression(self.expression(scope)?)),
        }
    }

    /// `= EXPR ;` after `NAME[i]...`
    fn reassignment(
        &mut self,
        name: Token,
        indexes: Vec<Expression>,
        scope: &Namespaces,
    ) -> Result<Reassignment, CompileError> {
        let declared = &scope.variable(&name.text)?.ty;
        let target = indexed_type(declared, &name, indexes.len())?;
        self.expect(TokenKind::Assignment)?;
        let body = self.expression(scope)?;
        let found = body.return_type();
        if !target.accepts(found) {
            return Err(CompileError::parse_at(
                format!(
                    "cannot assign {found} to `{}`, which has type {target}",
                    name.text
                ),
                body.token(),
            ));
        }
        Ok(Reassignment {
            name,
            indexes,
            body,
        })
    }

    /// `.PROPERTY = WORDS ;` after `NAME[i]...`
    fn property_assignment(
        &mut self,
        name: Token,
        indexes: Vec<Expression>,
    ) -> Result<PropertyAssignment, CompileError> {
        self.expect(TokenKind::Dot)?;
        let property = self.expect(TokenKind::Name)?.clone();
        self.expect(TokenKind::Assignment)?;

        let rest = self.remaining();
        let end = rest
            .iter()
            .position(|t| t.is(TokenKind::StatementTerminator))
            .ok_or_else(|| {
                CompileError::parse_at(
                    format!(
                        "property assignment to `{}` is never terminated with `;`",
                        property.text
                    ),
                    &property,
                )
            })?;
        let value = rest[..end]
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.pos += end + 1;

        property::validate(&property.text, &value)
            .map_err(|reason| CompileError::parse_at(reason, &property))?;

        Ok(PropertyAssignment {
            name,
            indexes,
            property,
            value,
        })
    }

    /// A type written out in full. Bare `list` is rejected.
    fn declared_type(&mut self) -> Result<Type, CompileError> {
        let at = self.peek();
        match self.parse_type()? {
            Some(ty) => Ok(ty),
            None => {
                let message = "`list` needs an element type here, e.g. `list pitch`";
                Err(match at {
                    Some(token) => CompileError::parse_at(message, token),
                    None => CompileError::internal("parsed a type from no tokens"),
                })
            }
        }
    }

    /// `list* BASE`, or `None` for a bare `list` whose element type is
    /// inferred.
    fn parse_type(&mut self) -> Result<Option<Type>, CompileError> {
        let mut depth = 0;
        loop {
            let token = self.expect(TokenKind::TypeKeyword)?;
            if token.text == "list" {
                depth += 1;
                if !self.check(TokenKind::TypeKeyword) {
                    return Ok(None);
                }
                continue;
            }
            let base = Type::from_keyword(&token.text).ok_or_else(|| {
                CompileError::internal(format!("type keyword {token} has no type"))
            })?;
            return Ok(Some((0..depth).fold(base, |ty, _| Type::list_of(ty))));
        }
    }

    fn expression(&mut self, ns: &Namespaces) -> Result<Expression, CompileError> {
        if self.peek().is_none() {
            return Err(self.unexpected_end("an expression"));
        }
        let (expression, rest) = parse_expression(self.remaining(), ns)?;
        self.skip_to(rest);
        Ok(expression)
    }

    /// Take `{ ... }` and return the tokens between the braces.
    fn brace_body(&mut self) -> Result<&'t [Token], CompileError> {
        let open_pos = self.pos;
        let open = self.expect(TokenKind::LeftBrace)?;
        let close = matching_close(self.tokens, open_pos)
            .ok_or_else(|| CompileError::parse_at("this `{` is never closed", open))?;
        self.pos = close + 1;
        Ok(&self.tokens[open_pos + 1..close])
    }

    // --- Utility methods ---

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.is(kind))
    }

    fn remaining(&self) -> &'t [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    /// Move to where an expression parse left off.
    fn skip_to(&mut self, rest: &[Token]) {
        self.pos = self.tokens.len() - rest.len();
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'t Token, CompileError> {
        match self.peek() {
            Some(token) if token.is(kind) => {
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(CompileError::parse_at(
                format!("expected {kind}, found {token}"),
                token,
            )),
            None => Err(self.unexpected_end(kind)),
        }
    }

    fn expect_keyword(&mut self, kind: TokenKind, text: &str) -> Result<&'t Token, CompileError> {
        let token = self.expect(kind)?;
        if token.text == text {
            Ok(token)
        } else {
            Err(CompileError::parse_at(
                format!("expected `{text}`, found `{}`", token.text),
                token,
            ))
        }
    }

    fn unexpected_end(&self, wanted: impl fmt::Display) -> CompileError {
        match self.tokens.last() {
            Some(last) => CompileError::parse_at(
                format!("expected {wanted} after `{}`, but the input ended", last.text),
                last,
            ),
            None => CompileError::parse(format!("expected {wanted}, but the input is empty"), 1, 1),
        }
    }
}

/// The declared type of `name` after `depth` indexes.
fn indexed_type(declared: &Type, name: &Token, depth: usize) -> Result<Type, CompileError> {
    declared.index(depth).cloned().ok_or_else(|| {
        CompileError::parse_at(
            format!(
                "`{}` has type {declared} and cannot be indexed {depth} times",
                name.text
            ),
            name,
        )
    })
}

/// Position of the `{` opening a loop body: the first one outside any
/// parentheses or brackets.
fn body_start(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket => depth = depth.saturating_sub(1),
            TokenKind::LeftBrace if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::tokenize;

    fn parse(src: &str) -> Result<Steps, CompileError> {
        make_syntax_tree(&tokenize(src))
    }

    fn function<'a>(steps: &'a Steps, name: &str) -> &'a FunctionDeclaration {
        steps
            .iter()
            .find_map(|s| match s {
                Step::FunctionDeclaration(f) if f.name.text == name => Some(f),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no function `{name}`"))
    }

    #[test]
    fn parse_minimal_main() {
        let steps = parse("fn main(): number { return 5; }").unwrap();
        assert_eq!(steps.len(), 1);
        let main = function(&steps, "main");
        assert_eq!(main.return_type, Type::Number);
        assert!(matches!(main.body[0], Step::Return(_)));
    }

    #[test]
    fn parse_parameters() {
        let steps = parse(
            "fn up(p: pitch, n: number): pitch { return p + n; }
             fn main(): pitch { return up(c4, 2); }",
        )
        .unwrap();
        let up = function(&steps, "up");
        assert_eq!(up.parameters.len(), 2);
        assert_eq!(up.parameters[1].ty, Type::Number);
    }

    #[test]
    fn parse_global_variable() {
        let steps = parse("list pitch melody = [c4, e4];").unwrap();
        match &steps[0] {
            Step::VariableDeclaration(v) => {
                assert_eq!(v.ty.to_string(), "list pitch");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn top_level_expression_rejected() {
        let err = parse("1 + 2;").unwrap_err();
        assert!(err.reason.contains("top level"));
    }

    #[test]
    fn missing_return_names_function() {
        let err = parse("fn riff(): pitch { pitch p = c4; }").unwrap_err();
        assert!(err.reason.contains("`riff`"));
        assert!(err.reason.contains("no return"));
    }

    #[test]
    fn return_type_mismatch_cites_both() {
        let err = parse("fn main(): number { return c4; }").unwrap_err();
        assert!(err.reason.contains("number"));
        assert!(err.reason.contains("pitch"));
    }

    #[test]
    fn variable_then_function_conflict() {
        let err = parse("number riff = 1; fn riff(): number { return 1; }").unwrap_err();
        assert!(err.reason.contains("variable"));
        assert!(err.reason.contains("1:8"));
    }

    #[test]
    fn function_then_variable_conflict() {
        let err = parse("fn riff(): number { return 1; } number riff = 1;").unwrap_err();
        assert!(err.reason.contains("function"));
    }

    #[test]
    fn duplicate_parameter() {
        let err = parse("fn f(a: number, a: number): number { return a; }").unwrap_err();
        assert!(err.reason.contains("already declared"));
    }

    #[test]
    fn parameter_shadowing_global_rejected() {
        let err = parse("number a = 1; fn f(a: number): number { return a; }").unwrap_err();
        assert!(err.reason.contains("cannot declare `a`"));
    }

    #[test]
    fn bare_list_infers_element_type() {
        let steps = parse("fn main(): list rhythm { list r = [half, quarter]; return r; }").unwrap();
        let main = function(&steps, "main");
        match &main.body[0] {
            Step::VariableDeclaration(v) => assert_eq!(v.ty.to_string(), "list rhythm"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_list_from_empty_rejected() {
        let err = parse("list r = [];").unwrap_err();
        assert!(err.reason.contains("cannot infer"));
    }

    #[test]
    fn empty_list_fits_declared_type() {
        assert!(parse("list pitch r = [];").is_ok());
    }

    #[test]
    fn nested_list_type_checked() {
        assert!(parse("list list number x = [[1, 2], [3, 4]];").is_ok());
        let err = parse("list number x = [[1, 2], [3, 4]];").unwrap_err();
        assert!(err.reason.contains("list list number"));
    }

    #[test]
    fn reassignment_checks_indexed_type() {
        let src = "fn main(): list list number {
            list list number x = [[1, 2], [3, 4]];
            x[0] = [9, 9];
            x[1][0] = 7;
            return x;
        }";
        let steps = parse(src).unwrap();
        let main = function(&steps, "main");
        match &main.body[1] {
            Step::Reassignment(r) => assert_eq!(r.indexes.len(), 1),
            other => panic!("unexpected {other:?}"),
        }

        let bad = "fn main(): number { list number x = [1]; x[0] = c4; return 1; }";
        let err = parse(bad).unwrap_err();
        assert!(err.reason.contains("cannot assign pitch"));
    }

    #[test]
    fn property_assignment_joins_words() {
        let src = "fn main(): list pitch {
            list pitch m = [c4];
            m.key = f# minor;
            m.time = 6 / 8;
            m[0].dynamic = mf;
            return m;
        }";
        let steps = parse(src).unwrap();
        let main = function(&steps, "main");
        let values: Vec<_> = main
            .body
            .iter()
            .filter_map(|s| match s {
                Step::PropertyAssignment(p) => Some((p.property.text.as_str(), p.value.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            values,
            vec![("key", "f# minor"), ("time", "6 / 8"), ("dynamic", "mf")]
        );
    }

    #[test]
    fn invalid_property_value() {
        let src = "fn main(): pitch { pitch p = c4; p.clef = soprano; return p; }";
        let err = parse(src).unwrap_err();
        assert!(err.reason.contains("soprano"));
    }

    #[test]
    fn nested_function_rejected() {
        let err = parse("fn main(): number { fn inner(): number { return 1; } return 1; }")
            .unwrap_err();
        assert!(err.reason.contains("top level"));
    }

    #[test]
    fn recursion_sees_own_signature() {
        let src = "fn count(n: number): number {
            return if n == 0 then 0 else 1 + count(n - 1);
        }";
        assert!(parse(src).is_ok());
    }

    #[test]
    fn locals_do_not_leak() {
        let src = "fn f(): number { number local = 1; return local; }
                   fn main(): number { return local; }";
        let err = parse(src).unwrap_err();
        assert!(err.reason.contains("has not been declared"));
    }

    #[test]
    fn for_loop_binds_element_type() {
        let src = "fn main(): list pitch {
            list pitch out = [];
            for p in [c4, d4] { out = out + [p + 12]; }
            return out;
        }";
        let steps = parse(src).unwrap();
        let main = function(&steps, "main");
        match &main.body[1] {
            Step::For(f) => {
                assert_eq!(f.variable.text, "p");
                assert_eq!(f.body.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn return_inside_loop_rejected() {
        let src = "fn main(): number { for n in [1] { return n; } return 0; }";
        let err = parse(src).unwrap_err();
        assert!(err.reason.contains("inside a `for` loop"));
    }

    #[test]
    fn for_over_non_list_rejected() {
        let err = parse("fn main(): number { for n in 3 { } return 0; }").unwrap_err();
        assert!(err.reason.contains("iterates over lists"));
    }

    #[test]
    fn unterminated_declaration() {
        let err = parse("number x = 1").unwrap_err();
        assert!(err.reason.contains("never terminated"));
    }

    #[test]
    fn truncated_function_header() {
        let err = parse("fn main(").unwrap_err();
        assert!(err.reason.contains("input ended"));
    }
}
