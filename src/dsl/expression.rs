//! Expression parser.
//!
//! An expression is first cut out of the token stream (up to its `;`, or a
//! whole `{ ... }` block) and then reduced with a shunting-yard pass over an
//! operand stack and an operator stack. Function arguments, list elements,
//! indexes and if/then/else branches are cut into spans of their own and
//! parsed recursively.

use super::ast::{Expression, FuncAppExp, IfExp, Literal, LiteralExp, OpExp, VarExp};
use super::error::CompileError;
use super::namespace::{FunctionSignature, Namespaces, Resolved};
use super::note::{Pitch, Rhythm, ScaleDegree};
use super::operators::BinaryOp;
use super::token::{Token, TokenKind};
use super::types::Type;

/// Parse one expression from the front of `tokens`.
///
/// Returns the expression and the tokens after it (its `;` is consumed).
pub fn parse_expression<'t>(
    tokens: &'t [Token],
    ns: &Namespaces,
) -> Result<(Expression, &'t [Token]), CompileError> {
    let (span, rest) = consume_expression(tokens)?;
    let expression = reduce(span, ns)?;
    Ok((expression, rest))
}

/// Split `tokens` into the span of the next expression and what follows it.
pub fn consume_expression(tokens: &[Token]) -> Result<(&[Token], &[Token]), CompileError> {
    let first = tokens
        .first()
        .ok_or_else(|| CompileError::internal("expression parser called on an empty token stream"))?;

    let (span, rest) = if first.is(TokenKind::LeftBrace) {
        let close = matching_close(tokens, 0)
            .ok_or_else(|| CompileError::parse_at("this `{` is never closed", first))?;
        (&tokens[..=close], &tokens[close + 1..])
    } else {
        let end = statement_end(tokens).ok_or_else(|| {
            CompileError::parse_at("statement starting here is never terminated with `;`", first)
        })?;
        (&tokens[..end], &tokens[end + 1..])
    };

    if span.iter().all(is_trivial) {
        let at = span.first().unwrap_or(first);
        return Err(CompileError::parse_at("expected an expression", at));
    }
    Ok((span, rest))
}

/// Parse a span that has already been cut out, such as a function argument.
///
/// `anchor` positions the error when the span is empty.
pub(crate) fn parse_subexpression(
    span: &[Token],
    anchor: &Token,
    ns: &Namespaces,
) -> Result<Expression, CompileError> {
    if span.iter().all(is_trivial) {
        let at = span.first().unwrap_or(anchor);
        return Err(CompileError::parse_at("expected an expression", at));
    }
    reduce(span, ns)
}

/// Parse zero or more `[index]` groups at the front of `tokens`.
///
/// Returns the index expressions and how many tokens they used.
pub(crate) fn parse_indexes(
    tokens: &[Token],
    ns: &Namespaces,
) -> Result<(Vec<Expression>, usize), CompileError> {
    let mut indexes = Vec::new();
    let mut pos = 0;

    while let Some(open) = tokens.get(pos).filter(|t| t.is(TokenKind::LeftBracket)) {
        let close = matching_close(tokens, pos)
            .ok_or_else(|| CompileError::parse_at("this `[` is never closed", open))?;
        let index = parse_subexpression(&tokens[pos + 1..close], open, ns)?;
        if *index.return_type() != Type::Number {
            return Err(CompileError::parse_at(
                format!("list indexes must be numbers, found {}", index.return_type()),
                index.token(),
            ));
        }
        indexes.push(index);
        pos = close + 1;
    }

    Ok((indexes, pos))
}

fn is_trivial(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::LeftParen
            | TokenKind::RightParen
            | TokenKind::LeftBrace
            | TokenKind::RightBrace
            | TokenKind::StatementTerminator
            | TokenKind::Then
    )
}

fn opens(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace
    )
}

fn closes(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace
    )
}

/// Index of the token that closes the bracket at `open`.
pub(crate) fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if opens(token.kind) {
            depth += 1;
        } else if closes(token.kind) {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the first `;`. Unbalanced brackets before it are reported by
/// whichever construct opened them.
fn statement_end(tokens: &[Token]) -> Option<usize> {
    tokens
        .iter()
        .position(|token| token.is(TokenKind::StatementTerminator))
}

/// Split on commas outside any brackets.
fn split_top_level_commas(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if opens(token.kind) {
            depth += 1;
        } else if closes(token.kind) {
            depth = depth.saturating_sub(1);
        } else if token.is(TokenKind::Comma) && depth == 0 {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Something waiting on the operator stack.
#[derive(Debug, Clone, Copy)]
enum Pending<'t> {
    /// `(` or `{`.
    Barrier(&'t Token),
    Operator(&'t Token, BinaryOp),
}

struct Reducer<'a, 't> {
    ns: &'a Namespaces,
    operands: Vec<Expression>,
    operators: Vec<Pending<'t>>,
    /// True when the next token must start an operand.
    expect_operand: bool,
}

fn reduce(span: &[Token], ns: &Namespaces) -> Result<Expression, CompileError> {
    let mut reducer = Reducer {
        ns,
        operands: Vec::new(),
        operators: Vec::new(),
        expect_operand: true,
    };

    let mut pos = 0;
    while pos < span.len() {
        pos = reducer.step(span, pos)?;
    }
    reducer.finish(span)
}

impl<'a, 't> Reducer<'a, 't> {
    fn step(&mut self, span: &'t [Token], pos: usize) -> Result<usize, CompileError> {
        let token = &span[pos];
        match token.kind {
            TokenKind::Name => {
                self.require_operand_slot(token)?;
                self.name(span, pos)
            }
            _ if token.is_literal() => {
                self.require_operand_slot(token)?;
                let literal = lift_literal(token)?;
                self.push_operand(Expression::Literal(literal));
                Ok(pos + 1)
            }
            TokenKind::LeftBracket => {
                if !self.expect_operand {
                    return Err(CompileError::parse_at(
                        "only variables can be indexed",
                        token,
                    ));
                }
                self.list_literal(span, pos)
            }
            TokenKind::Operator => self.operator(span, pos),
            TokenKind::LeftParen | TokenKind::LeftBrace => {
                self.require_operand_slot(token)?;
                self.operators.push(Pending::Barrier(token));
                Ok(pos + 1)
            }
            TokenKind::RightParen | TokenKind::RightBrace => {
                self.close_group(token)?;
                Ok(pos + 1)
            }
            TokenKind::If => {
                self.require_operand_slot(token)?;
                self.if_expression(span, pos)
            }
            _ => Err(CompileError::parse_at(
                format!("unimplemented feature: {token} cannot be used in an expression"),
                token,
            )),
        }
    }

    fn require_operand_slot(&self, token: &Token) -> Result<(), CompileError> {
        if self.expect_operand {
            Ok(())
        } else {
            Err(CompileError::parse_at(
                format!("expected an operator before `{}`", token.text),
                token,
            ))
        }
    }

    fn push_operand(&mut self, expression: Expression) {
        self.operands.push(expression);
        self.expect_operand = false;
    }

    fn name(&mut self, span: &'t [Token], pos: usize) -> Result<usize, CompileError> {
        let ns = self.ns;
        let token = &span[pos];

        match ns.resolve(token)? {
            Resolved::Variable(binding) => {
                let (indexes, consumed) = parse_indexes(&span[pos + 1..], ns)?;
                let ty = binding.ty.index(indexes.len()).cloned().ok_or_else(|| {
                    CompileError::parse_at(
                        format!(
                            "`{}` has type {} and cannot be indexed {} times",
                            token.text,
                            binding.ty,
                            indexes.len()
                        ),
                        token,
                    )
                })?;
                self.push_operand(Expression::Var(VarExp {
                    name: token.clone(),
                    indexes,
                    ty,
                }));
                Ok(pos + 1 + consumed)
            }
            Resolved::Function(signature) => {
                let (arguments, next) = parse_arguments(span, pos, signature, ns)?;
                self.push_operand(Expression::FuncApp(FuncAppExp {
                    name: token.clone(),
                    arguments,
                    ty: signature.return_type.clone(),
                }));
                Ok(next)
            }
        }
    }

    fn operator(&mut self, span: &'t [Token], pos: usize) -> Result<usize, CompileError> {
        let token = &span[pos];

        if self.expect_operand {
            // A leading `-` directly before a number is a negative literal.
            if token.text == "-" {
                if let Some(number) = span
                    .get(pos + 1)
                    .filter(|t| t.is(TokenKind::NumericLiteral))
                {
                    let negative = Token::new(
                        TokenKind::NumericLiteral,
                        format!("-{}", number.text),
                        token.line,
                        token.col,
                    );
                    let literal = lift_literal(&negative)?;
                    self.push_operand(Expression::Literal(literal));
                    return Ok(pos + 2);
                }
            }
            return Err(CompileError::parse_at(
                format!("operator `{}` is missing its left operand", token.text),
                token,
            ));
        }

        let op = BinaryOp::from_symbol(&token.text).ok_or_else(|| {
            CompileError::parse_at(format!("unknown operator `{}`", token.text), token)
        })?;

        while let Some(Pending::Operator(_, top)) = self.operators.last().copied() {
            if top.precedence() < op.precedence() {
                break;
            }
            self.apply_top()?;
        }

        self.operators.push(Pending::Operator(token, op));
        self.expect_operand = true;
        Ok(pos + 1)
    }

    /// Pop one operator and its two operands into an `OpExp`.
    fn apply_top(&mut self) -> Result<(), CompileError> {
        let Some(Pending::Operator(token, op)) = self.operators.pop() else {
            return Err(CompileError::internal(
                "expected an operator on top of the operator stack",
            ));
        };
        let right = self.operands.pop();
        let left = self.operands.pop();
        let (Some(left), Some(right)) = (left, right) else {
            return Err(CompileError::parse_at(
                format!("operator `{}` is missing an operand", token.text),
                token,
            ));
        };

        let ty = op
            .result_type(left.return_type(), right.return_type())
            .ok_or_else(|| {
                CompileError::parse_at(
                    format!(
                        "operator `{op}` cannot be applied to {} and {}",
                        left.return_type(),
                        right.return_type()
                    ),
                    token,
                )
            })?;

        self.operands.push(Expression::Op(OpExp {
            left: Box::new(left),
            operator: token.clone(),
            op,
            right: Box::new(right),
            ty,
        }));
        Ok(())
    }

    fn close_group(&mut self, token: &Token) -> Result<(), CompileError> {
        if self.expect_operand {
            return Err(CompileError::parse_at(
                format!("expected an expression before `{}`", token.text),
                token,
            ));
        }
        let opener = if token.is(TokenKind::RightParen) {
            TokenKind::LeftParen
        } else {
            TokenKind::LeftBrace
        };

        loop {
            match self.operators.last().copied() {
                None => {
                    return Err(CompileError::parse_at(
                        format!("unmatched `{}`", token.text),
                        token,
                    ));
                }
                Some(Pending::Barrier(open)) => {
                    if open.kind != opener {
                        return Err(CompileError::parse_at(
                            format!(
                                "`{}` does not match the `{}` opened at {}:{}",
                                token.text, open.text, open.line, open.col
                            ),
                            token,
                        ));
                    }
                    self.operators.pop();
                    return Ok(());
                }
                Some(Pending::Operator(..)) => self.apply_top()?,
            }
        }
    }

    fn list_literal(&mut self, span: &'t [Token], pos: usize) -> Result<usize, CompileError> {
        let open = &span[pos];
        let close = matching_close(span, pos)
            .ok_or_else(|| CompileError::parse_at("this `[` is never closed", open))?;
        let inner = &span[pos + 1..close];

        let mut elements = Vec::new();
        let mut element_type: Option<Type> = None;
        if !inner.is_empty() {
            for part in split_top_level_commas(inner) {
                let element = parse_subexpression(part, open, self.ns)?;
                let ty = element.return_type();
                element_type = Some(match element_type {
                    None => ty.clone(),
                    Some(previous) => previous.unify(ty).ok_or_else(|| {
                        CompileError::parse_at(
                            format!(
                                "list elements must all have the same type, found {previous} and {ty}"
                            ),
                            element.token(),
                        )
                    })?,
                });
                elements.push(element);
            }
        }

        let ty = element_type.map_or(Type::EmptyList, Type::list_of);
        self.push_operand(Expression::Literal(LiteralExp {
            value: Literal::List(elements),
            token: open.clone(),
            ty,
        }));
        Ok(close + 1)
    }

    fn if_expression(&mut self, span: &'t [Token], pos: usize) -> Result<usize, CompileError> {
        let if_token = &span[pos];
        let then_pos = find_then(span, pos)?;

        let condition = parse_subexpression(&span[pos + 1..then_pos], if_token, self.ns)?;
        if *condition.return_type() != Type::Boolean {
            return Err(CompileError::parse_at(
                format!(
                    "an if condition must be boolean, found {}",
                    condition.return_type()
                ),
                condition.token(),
            ));
        }

        let then_token = &span[then_pos];
        let then_end = branch_end(span, then_pos + 1, true);
        let then_branch = parse_subexpression(&span[then_pos + 1..then_end], then_token, self.ns)?;

        let (else_branch, end) = match span.get(then_end) {
            Some(else_token) if else_token.is(TokenKind::Else) => {
                let else_end = branch_end(span, then_end + 1, false);
                let branch =
                    parse_subexpression(&span[then_end + 1..else_end], else_token, self.ns)?;
                (Some(branch), else_end)
            }
            _ => (None, then_end),
        };

        let ty = match &else_branch {
            Some(branch) => then_branch
                .return_type()
                .unify(branch.return_type())
                .ok_or_else(|| {
                    CompileError::parse_at(
                        format!(
                            "if branches must have the same type, but the then-branch is {} and the else-branch is {}",
                            then_branch.return_type(),
                            branch.return_type()
                        ),
                        if_token,
                    )
                })?,
            None => then_branch.return_type().clone(),
        };

        self.push_operand(Expression::If(IfExp {
            token: if_token.clone(),
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
            ty,
        }));
        Ok(end)
    }

    fn finish(mut self, span: &[Token]) -> Result<Expression, CompileError> {
        if self.expect_operand {
            return Err(match self.operators.last().copied() {
                Some(Pending::Operator(token, _)) => CompileError::parse_at(
                    format!("operator `{}` is missing its right operand", token.text),
                    token,
                ),
                _ => match span.last() {
                    Some(last) => CompileError::parse_at("expected an expression", last),
                    None => CompileError::internal("reduced an empty expression span"),
                },
            });
        }

        while let Some(pending) = self.operators.last().copied() {
            match pending {
                Pending::Barrier(open) => {
                    return Err(CompileError::parse_at(
                        format!("this `{}` is never closed", open.text),
                        open,
                    ));
                }
                Pending::Operator(..) => self.apply_top()?,
            }
        }

        if self.operands.len() > 1 {
            log::warn!(
                "compiler-internal warning: expression reduced to {} values, keeping the last",
                self.operands.len()
            );
        }
        self.operands
            .pop()
            .ok_or_else(|| CompileError::internal("expression reduced to no value"))
    }
}

/// Parse the arguments of the call whose name is at `pos`.
///
/// Returns the arguments and the position after the closing `)`.
fn parse_arguments(
    span: &[Token],
    pos: usize,
    signature: &FunctionSignature,
    ns: &Namespaces,
) -> Result<(Vec<Expression>, usize), CompileError> {
    let name = &span[pos];
    let expected = signature.parameters.len();

    match span.get(pos + 1) {
        Some(open) if open.is(TokenKind::LeftParen) => {}
        _ => {
            return Err(CompileError::parse_at(
                format!("expected `(` after function name `{}`", name.text),
                name,
            ));
        }
    }

    let count_error = |given: String| {
        CompileError::parse_at(
            format!(
                "function `{}` expects {expected} arguments but {given}",
                name.text
            ),
            name,
        )
    };

    let mut cursor = pos + 2;
    if expected == 0 {
        return match span.get(cursor) {
            Some(t) if t.is(TokenKind::RightParen) => Ok((Vec::new(), cursor + 1)),
            Some(_) => Err(count_error("was given some".to_string())),
            None => Err(count_error("the call is never closed".to_string())),
        };
    }

    let mut arguments = Vec::with_capacity(expected);
    for (index, parameter) in signature.parameters.iter().enumerate() {
        let last = index + 1 == expected;
        let start = cursor;
        let mut depth = 0usize;

        loop {
            let token = span.get(cursor).ok_or_else(|| {
                count_error(format!("only {index} were given before the input ended"))
            })?;
            match token.kind {
                k if opens(k) => depth += 1,
                TokenKind::RightParen if depth == 0 => {
                    if last {
                        break;
                    }
                    return Err(count_error(format!("got {}", index + 1)));
                }
                k if closes(k) => depth = depth.saturating_sub(1),
                TokenKind::Comma if depth == 0 => {
                    if last {
                        return Err(count_error("got more".to_string()));
                    }
                    break;
                }
                _ => {}
            }
            cursor += 1;
        }

        if cursor == start {
            return Err(count_error(format!("got {index}")));
        }
        let argument = parse_subexpression(&span[start..cursor], &span[cursor], ns)?;
        if !parameter.ty.accepts(argument.return_type()) {
            return Err(CompileError::parse_at(
                format!(
                    "argument {} of `{}` must be {}, found {}",
                    index + 1,
                    name.text,
                    parameter.ty,
                    argument.return_type()
                ),
                argument.token(),
            ));
        }
        arguments.push(argument);
        cursor += 1; // the `,` or `)`
    }

    Ok((arguments, cursor))
}

/// Index of the `then` belonging to the `if` at `pos`.
fn find_then(span: &[Token], pos: usize) -> Result<usize, CompileError> {
    let mut nested = 0usize;
    for (i, token) in span.iter().enumerate().skip(pos + 1) {
        match token.kind {
            TokenKind::If => nested += 1,
            TokenKind::Then if nested == 0 => return Ok(i),
            TokenKind::Then => nested -= 1,
            _ => {}
        }
    }
    Err(CompileError::parse_at(
        "`if` without a matching `then`",
        &span[pos],
    ))
}

/// End of an if branch starting at `start`: an unmatched closing bracket, a
/// `;`, the end of the span, or (for then-branches) the outer `else`.
fn branch_end(span: &[Token], start: usize, stop_at_else: bool) -> usize {
    let mut depth = 0usize;
    let mut nested_ifs = 0usize;

    for (i, token) in span.iter().enumerate().skip(start) {
        match token.kind {
            k if opens(k) => depth += 1,
            k if closes(k) => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            TokenKind::StatementTerminator if depth == 0 => return i,
            TokenKind::If if depth == 0 => nested_ifs += 1,
            TokenKind::Else if depth == 0 && stop_at_else => {
                if nested_ifs == 0 {
                    return i;
                }
                nested_ifs -= 1;
            }
            _ => {}
        }
    }
    span.len()
}

/// Lift a literal token into a typed literal.
pub fn lift_literal(token: &Token) -> Result<LiteralExp, CompileError> {
    let fail = |reason: String| CompileError::parse_at(reason, token);

    let (value, ty) = match token.kind {
        TokenKind::NumericLiteral => {
            let n = token
                .text
                .parse()
                .map_err(|_| fail(format!("number `{}` is too large", token.text)))?;
            (Literal::Number(n), Type::Number)
        }
        TokenKind::ScaleDegreeLiteral => (
            Literal::ScaleDegree(ScaleDegree::parse(&token.text).map_err(fail)?),
            Type::Degree,
        ),
        TokenKind::ScaleDegreeRhythmLiteral => {
            let (degree, rhythm) = split_fused(token)?;
            (
                Literal::ScaleDegreeRhythm(
                    ScaleDegree::parse(degree).map_err(fail)?,
                    parse_rhythm(rhythm, token)?,
                ),
                Type::DegreeRhythm,
            )
        }
        TokenKind::RhythmLiteral => (
            Literal::Rhythm(parse_rhythm(&token.text, token)?),
            Type::Rhythm,
        ),
        TokenKind::PitchLiteral => (
            Literal::Pitch(Pitch::parse(&token.text).map_err(fail)?),
            Type::Pitch,
        ),
        TokenKind::PitchRhythmLiteral => {
            let (pitch, rhythm) = split_fused(token)?;
            (
                Literal::PitchRhythm(
                    Pitch::parse(pitch).map_err(fail)?,
                    parse_rhythm(rhythm, token)?,
                ),
                Type::PitchRhythm,
            )
        }
        TokenKind::BooleanLiteral => (Literal::Boolean(token.text == "true"), Type::Boolean),
        _ => {
            return Err(CompileError::internal(format!(
                "{token} was lifted as a literal"
            )))
        }
    };

    Ok(LiteralExp {
        value,
        token: token.clone(),
        ty,
    })
}

/// The two words of a fused literal such as `c4 dotted half`.
fn split_fused(token: &Token) -> Result<(&str, &str), CompileError> {
    token.text.split_once(' ').ok_or_else(|| {
        CompileError::internal(format!("fused literal {token} has no second word"))
    })
}

fn parse_rhythm(text: &str, token: &Token) -> Result<Rhythm, CompileError> {
    Rhythm::parse(text)
        .ok_or_else(|| CompileError::parse_at(format!("`{text}` is not a rhythm"), token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::ast::Parameter;
    use crate::dsl::lexer::tokenize;
    use crate::dsl::namespace::VariableBinding;

    fn var(ns: &mut Namespaces, name: &str, ty: Type) {
        ns.declare_variable(VariableBinding {
            name: Token::new(TokenKind::Name, name, 1, 1),
            ty,
        })
        .unwrap();
    }

    fn function(ns: &mut Namespaces, name: &str, params: &[Type], ret: Type) {
        let parameters = params
            .iter()
            .enumerate()
            .map(|(i, ty)| Parameter {
                name: Token::new(TokenKind::Name, format!("p{i}"), 1, 1),
                ty: ty.clone(),
            })
            .collect();
        ns.declare_function(FunctionSignature {
            name: Token::new(TokenKind::Name, name, 1, 1),
            parameters,
            return_type: ret,
        })
        .unwrap();
    }

    fn test_ns() -> Namespaces {
        let mut ns = Namespaces::with_builtins();
        var(&mut ns, "x", Type::Number);
        var(&mut ns, "flag", Type::Boolean);
        var(&mut ns, "melody", Type::list_of(Type::Pitch));
        var(
            &mut ns,
            "grid",
            Type::list_of(Type::list_of(Type::Number)),
        );
        function(&mut ns, "add", &[Type::Number, Type::Number], Type::Number);
        function(&mut ns, "up", &[Type::Pitch], Type::Pitch);
        ns
    }

    fn parse(src: &str) -> Result<Expression, CompileError> {
        let tokens = tokenize(src);
        parse_expression(&tokens, &test_ns()).map(|(e, _)| e)
    }

    fn root_op(e: &Expression) -> BinaryOp {
        match e {
            Expression::Op(op) => op.op,
            other => panic!("expected an operator expression, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        let e = parse("1 + 2 * 3;").unwrap();
        assert_eq!(root_op(&e), BinaryOp::Add);
        let Expression::Op(add) = e else { unreachable!() };
        assert_eq!(root_op(&add.right), BinaryOp::Multiply);
        assert!(matches!(*add.left, Expression::Literal(_)));
    }

    #[test]
    fn parentheses_override_precedence() {
        let e = parse("(1 + 2) * 3;").unwrap();
        assert_eq!(root_op(&e), BinaryOp::Multiply);
    }

    #[test]
    fn subtraction_is_left_associative() {
        let e = parse("10 - 4 - 3;").unwrap();
        let Expression::Op(outer) = e else { panic!() };
        assert_eq!(outer.op, BinaryOp::Subtract);
        assert_eq!(root_op(&outer.left), BinaryOp::Subtract);
    }

    #[test]
    fn comparison_is_loosest() {
        let e = parse("x + 1 == 3;").unwrap();
        assert_eq!(root_op(&e), BinaryOp::Equal);
        assert_eq!(*e.return_type(), Type::Boolean);
    }

    #[test]
    fn consumes_only_one_statement() {
        let tokens = tokenize("1 + 2; 3;");
        let (_, rest) = parse_expression(&tokens, &test_ns()).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].text, "3");
    }

    #[test]
    fn braced_expression_consumes_to_matching_brace() {
        let tokens = tokenize("{ (1 + 2) } ;");
        let (e, rest) = parse_expression(&tokens, &test_ns()).unwrap();
        assert_eq!(root_op(&e), BinaryOp::Add);
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn literal_types() {
        assert_eq!(*parse("c4;").unwrap().return_type(), Type::Pitch);
        assert_eq!(*parse("c4 quarter;").unwrap().return_type(), Type::PitchRhythm);
        assert_eq!(*parse("iv;").unwrap().return_type(), Type::Degree);
        assert_eq!(
            *parse("v dotted eighth;").unwrap().return_type(),
            Type::DegreeRhythm
        );
        assert_eq!(*parse("half;").unwrap().return_type(), Type::Rhythm);
        assert_eq!(*parse("false;").unwrap().return_type(), Type::Boolean);
    }

    #[test]
    fn negative_number_literal() {
        let e = parse("-5 * 2;").unwrap();
        let Expression::Op(op) = e else { panic!() };
        match &*op.left {
            Expression::Literal(LiteralExp {
                value: Literal::Number(n),
                ..
            }) => assert_eq!(*n, -5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn list_literal_homogeneous() {
        let e = parse("[c4, d4, e4 half - 12];");
        assert!(e.is_err());
        let e = parse("[c4, d4, e4];").unwrap();
        assert_eq!(e.return_type().to_string(), "list pitch");
    }

    #[test]
    fn list_literal_mixed_types_rejected() {
        let err = parse("[1, 2, true];").unwrap_err();
        assert!(err.reason.contains("same type"), "{}", err.reason);
        assert_eq!(err.col, 8);
    }

    #[test]
    fn nested_list_literal_type() {
        let e = parse("[[1, 2], [3, 4]];").unwrap();
        assert_eq!(e.return_type().to_string(), "list list number");
    }

    #[test]
    fn empty_list_literal() {
        let e = parse("[];").unwrap();
        assert_eq!(*e.return_type(), Type::EmptyList);
        let e = parse("[[], [1]];").unwrap();
        assert_eq!(e.return_type().to_string(), "list list number");
    }

    #[test]
    fn function_call_arguments() {
        let e = parse("add(1, add(2, 3)) * 2;").unwrap();
        let Expression::Op(op) = e else { panic!() };
        let Expression::FuncApp(call) = *op.left else {
            panic!()
        };
        assert_eq!(call.name.text, "add");
        assert_eq!(call.arguments.len(), 2);
        assert!(matches!(call.arguments[1], Expression::FuncApp(_)));
    }

    #[test]
    fn zero_argument_call() {
        let e = parse("rand() + 1;").unwrap();
        assert_eq!(*e.return_type(), Type::Number);
    }

    #[test]
    fn too_few_arguments() {
        let err = parse("add(1);").unwrap_err();
        assert!(err.reason.contains("expects 2 arguments"), "{}", err.reason);
    }

    #[test]
    fn too_many_arguments() {
        let err = parse("up(c4, d4);").unwrap_err();
        assert!(err.reason.contains("expects 1 arguments"), "{}", err.reason);
    }

    #[test]
    fn unterminated_call() {
        let err = parse("add(1, 2;").unwrap_err();
        assert!(err.reason.contains("`add`"), "{}", err.reason);
        assert!(err.reason.contains("expects 2 arguments but only 1"), "{}", err.reason);
    }

    #[test]
    fn statement_stops_at_first_terminator() {
        let err = parse("[1, 2; 3];").unwrap_err();
        assert!(err.reason.contains("`[` is never closed"), "{}", err.reason);
        let err = parse("(1 + 2; 3);").unwrap_err();
        assert!(err.reason.contains("`(` is never closed"), "{}", err.reason);
    }

    #[test]
    fn lone_rhythms_parse_in_every_position() {
        assert_eq!(*parse("quarter;").unwrap().return_type(), Type::Rhythm);
        assert_eq!(
            parse("[half, dotted quarter];").unwrap().return_type().to_string(),
            "list rhythm"
        );
        assert_eq!(
            *parse("c4 + quarter;").unwrap().return_type(),
            Type::PitchRhythm
        );
    }

    #[test]
    fn argument_type_checked() {
        let err = parse("up(5);").unwrap_err();
        assert!(err.reason.contains("must be pitch, found number"));
    }

    #[test]
    fn indexing_strips_list_levels() {
        assert_eq!(*parse("grid[0][1];").unwrap().return_type(), Type::Number);
        assert_eq!(
            parse("grid[x + 1];").unwrap().return_type().to_string(),
            "list number"
        );
        assert!(parse("x[0];").is_err());
        assert!(parse("melody[c4];").is_err());
    }

    #[test]
    fn if_expression_types() {
        let e = parse("if flag then c4 else d4;").unwrap();
        assert_eq!(*e.return_type(), Type::Pitch);
        let Expression::If(branch) = e else { panic!() };
        assert!(branch.else_branch.is_some());
    }

    #[test]
    fn if_without_else() {
        let e = parse("if x > 1 then x;").unwrap();
        let Expression::If(branch) = e else { panic!() };
        assert!(branch.else_branch.is_none());
    }

    #[test]
    fn if_branch_types_must_match() {
        let err = parse("if flag then 1 else c4;").unwrap_err();
        assert!(err.reason.contains("number"));
        assert!(err.reason.contains("pitch"));
    }

    #[test]
    fn if_condition_must_be_boolean() {
        let err = parse("if x then 1 else 2;").unwrap_err();
        assert!(err.reason.contains("must be boolean"));
    }

    #[test]
    fn nested_if_in_then_branch() {
        let e = parse("if flag then if x == 1 then 1 else 2 else 3;").unwrap();
        let Expression::If(outer) = e else { panic!() };
        assert!(matches!(*outer.then_branch, Expression::If(_)));
        assert!(outer.else_branch.is_some());
    }

    #[test]
    fn dangling_else_binds_inner() {
        let e = parse("if flag then if x == 1 then 1 else 2;").unwrap();
        let Expression::If(outer) = e else { panic!() };
        assert!(outer.else_branch.is_none());
    }

    #[test]
    fn parenthesized_if_in_arithmetic() {
        let e = parse("(if flag then 1 else 2) + 3;").unwrap();
        assert_eq!(root_op(&e), BinaryOp::Add);
    }

    #[test]
    fn undeclared_identifier_position() {
        let err = parse("1 +\n  mystery;").unwrap_err();
        assert!(err.reason.contains("has not been declared"));
        assert_eq!((err.line, err.col), (2, 3));
    }

    #[test]
    fn operator_type_mismatch() {
        let err = parse("c4 + true;").unwrap_err();
        assert!(err.reason.contains("cannot be applied to pitch and boolean"));
    }

    #[test]
    fn missing_terminator() {
        let err = parse("1 + 2").unwrap_err();
        assert!(err.reason.contains("never terminated"));
    }

    #[test]
    fn empty_expression() {
        let err = parse("( );").unwrap_err();
        assert!(err.reason.contains("expected an expression"));
    }

    #[test]
    fn empty_input_is_internal() {
        let err = parse_expression(&[], &test_ns()).unwrap_err();
        assert_eq!((err.line, err.col), (0, 0));
    }

    #[test]
    fn unimplemented_token() {
        let err = parse("1 + fn;").unwrap_err();
        assert!(err.reason.contains("unimplemented feature"));
    }

    #[test]
    fn dangling_operator() {
        let err = parse("1 + ;").unwrap_err();
        assert!(err.reason.contains("missing its right operand"));
    }

    #[test]
    fn juxtaposed_operands() {
        let err = parse("1 2;").unwrap_err();
        assert!(err.reason.contains("expected an operator"));
    }

    #[test]
    fn unbalanced_parentheses() {
        assert!(parse("(1 + 2;").is_err());
        assert!(parse("1 + 2);").is_err());
    }

    #[test]
    fn transposition_and_pairing() {
        assert_eq!(*parse("c4 + 7;").unwrap().return_type(), Type::Pitch);
        assert_eq!(*parse("e4 - c4;").unwrap().return_type(), Type::Number);
        assert_eq!(
            *parse("c4 + quarter;").unwrap().return_type(),
            Type::PitchRhythm
        );
        assert_eq!(
            parse("melody + [c4];").unwrap().return_type().to_string(),
            "list pitch"
        );
    }
}
