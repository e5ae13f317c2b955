//! Recursive-descent parser over the token stream from [`super::lexer`].
//!
//! Produces the restricted-subset AST in [`super::ast`]. There is no
//! separate "prepare" pass the way the teacher has between parsing and
//! bytecode compilation — name resolution happens at evaluation time against
//! the current frame, matching the original `eval`/`exec`-against-a-dict
//! model `original_source/` relies on.

use std::fmt;

use super::ast::{BinOp, BoolOp, CmpOp, Expr, Param, Stmt, UnaryOp};
use super::lexer::{Spanned, Token, lex};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Parses a full module (a sequence of statements) from source text.
pub fn parse_module(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = lex(source).map_err(|e| ParseError { message: e.message, line: e.line })?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_block_top()
}

/// Parses a single expression, with no trailing statement material allowed.
///
/// Used by the expression evaluator (`spec.md` §4.C): CPython's `eval()`
/// only accepts the expression grammar, which is exactly why `lst.append(1)`
/// is legal there but `x = 1` is not.
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let tokens = lex(source).map_err(|e| ParseError { message: e.message, line: e.line })?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    parser.skip_newlines();
    if !matches!(parser.peek(), Token::Eof) {
        return Err(parser.err("trailing input after expression"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, message: &str) -> ParseError {
        ParseError { message: format!("{message} (found {:?})", self.peek()), line: self.line() }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Token::Op(o) if *o == op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.err(&format!("expected '{op}'")))
        }
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Token::Keyword(k) if *k == kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: &str) -> Result<(), ParseError> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.err(&format!("expected keyword '{kw}'")))
        }
    }

    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Name(n) => Ok(n),
            other => Err(ParseError { message: format!("expected identifier, found {other:?}"), line: self.line() }),
        }
    }

    fn parse_block_top(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !matches!(self.peek(), Token::Eof) {
            stmts.push(self.statement()?);
            self.skip_newlines();
        }
        Ok(stmts)
    }

    /// Parses an indented suite: `:` NEWLINE INDENT stmt+ DEDENT.
    fn suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_op(":")?;
        self.skip_newlines();
        if !matches!(self.peek(), Token::Indent) {
            return Err(self.err("expected an indented block"));
        }
        self.advance();
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !matches!(self.peek(), Token::Dedent | Token::Eof) {
            stmts.push(self.statement()?);
            self.skip_newlines();
        }
        if matches!(self.peek(), Token::Dedent) {
            self.advance();
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        match self.peek().clone() {
            Token::Keyword("def") => self.function_def(line),
            Token::Keyword("class") => self.class_def(line),
            Token::Keyword("if") => self.if_stmt(line),
            Token::Keyword("while") => self.while_stmt(line),
            Token::Keyword("for") => self.for_stmt(line),
            Token::Keyword("return") => {
                self.advance();
                let value = if matches!(self.peek(), Token::Newline | Token::Eof) { None } else { Some(self.expr()?) };
                Ok(Stmt::Return { value, line })
            }
            Token::Keyword("pass") => {
                self.advance();
                Ok(Stmt::Pass { line })
            }
            Token::Keyword("break") => {
                self.advance();
                Ok(Stmt::Break { line })
            }
            Token::Keyword("continue") => {
                self.advance();
                Ok(Stmt::Continue { line })
            }
            Token::Keyword("global") => {
                self.advance();
                let mut names = vec![self.expect_name()?];
                while self.eat_op(",") {
                    names.push(self.expect_name()?);
                }
                Ok(Stmt::Global { names, line })
            }
            Token::Keyword("import") => {
                self.advance();
                let module = self.expect_name()?;
                let alias = if self.eat_kw("as") { Some(self.expect_name()?) } else { None };
                Ok(Stmt::Import { module, alias, line })
            }
            Token::Keyword("from") => {
                self.advance();
                let module = self.expect_name()?;
                self.expect_kw("import")?;
                let mut names = vec![self.expect_name()?];
                while self.eat_op(",") {
                    names.push(self.expect_name()?);
                }
                Ok(Stmt::ImportFrom { module, names, line })
            }
            _ => self.expr_or_assign(line),
        }
    }

    fn expr_or_assign(&mut self, line: u32) -> Result<Stmt, ParseError> {
        let first = self.expr()?;
        if let Some(op) = self.peek_aug_assign_op() {
            self.advance();
            let value = self.expr()?;
            return Ok(Stmt::AugAssign { target: first, op, value, line });
        }
        if self.eat_op("=") {
            let mut targets = vec![first];
            let mut value = self.expr()?;
            while self.eat_op("=") {
                targets.push(value);
                value = self.expr()?;
            }
            return Ok(Stmt::Assign { targets, value, line });
        }
        Ok(Stmt::Expr(first))
    }

    fn peek_aug_assign_op(&self) -> Option<BinOp> {
        match self.peek() {
            Token::Op("+=") => Some(BinOp::Add),
            Token::Op("-=") => Some(BinOp::Sub),
            Token::Op("*=") => Some(BinOp::Mul),
            Token::Op("/=") => Some(BinOp::Div),
            Token::Op("%=") => Some(BinOp::Mod),
            Token::Op("//=") => Some(BinOp::FloorDiv),
            Token::Op("**=") => Some(BinOp::Pow),
            _ => None,
        }
    }

    fn function_def(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance();
        let name = self.expect_name()?;
        self.expect_op("(")?;
        let mut params = Vec::new();
        while !matches!(self.peek(), Token::Op(")")) {
            let pname = self.expect_name()?;
            let default = if self.eat_op("=") { Some(self.expr()?) } else { None };
            params.push(Param { name: pname, default });
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        let body = self.suite()?;
        Ok(Stmt::FunctionDef { name, params, body, line })
    }

    fn class_def(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance();
        let name = self.expect_name()?;
        let mut bases = Vec::new();
        if self.eat_op("(") {
            while !matches!(self.peek(), Token::Op(")")) {
                bases.push(self.expect_name()?);
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op(")")?;
        }
        let body = self.suite()?;
        Ok(Stmt::ClassDef { name, bases, body, line })
    }

    fn if_stmt(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance();
        let mut branches = Vec::new();
        let test = self.expr()?;
        let body = self.suite()?;
        branches.push((test, body));
        loop {
            self.skip_newlines();
            if self.eat_kw("elif") {
                let test = self.expr()?;
                let body = self.suite()?;
                branches.push((test, body));
            } else {
                break;
            }
        }
        let orelse = if self.eat_kw("else") { self.suite()? } else { Vec::new() };
        Ok(Stmt::If { branches, orelse, line })
    }

    fn while_stmt(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance();
        let test = self.expr()?;
        let body = self.suite()?;
        Ok(Stmt::While { test, body, line })
    }

    fn for_stmt(&mut self, line: u32) -> Result<Stmt, ParseError> {
        self.advance();
        let target = self.expr()?;
        self.expect_kw("in")?;
        let iter = self.expr()?;
        let body = self.suite()?;
        Ok(Stmt::For { target, iter, body, line })
    }

    // expression grammar, lowest to highest precedence

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        let mut values = vec![self.and_expr()?];
        while self.eat_kw("or") {
            values.push(self.and_expr()?);
        }
        if values.len() == 1 { Ok(values.pop().unwrap()) } else { Ok(Expr::BoolOp { op: BoolOp::Or, values, line }) }
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        let mut values = vec![self.not_expr()?];
        while self.eat_kw("and") {
            values.push(self.not_expr()?);
        }
        if values.len() == 1 { Ok(values.pop().unwrap()) } else { Ok(Expr::BoolOp { op: BoolOp::And, values, line }) }
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        if self.eat_kw("not") {
            let operand = self.not_expr()?;
            return Ok(Expr::UnaryOp { op: UnaryOp::Not, operand: Box::new(operand), line });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        let left = self.additive()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.peek() {
                Token::Op("==") => CmpOp::Eq,
                Token::Op("!=") => CmpOp::NotEq,
                Token::Op("<") => CmpOp::Lt,
                Token::Op("<=") => CmpOp::LtEq,
                Token::Op(">") => CmpOp::Gt,
                Token::Op(">=") => CmpOp::GtEq,
                Token::Keyword("is") => {
                    self.advance();
                    if self.eat_kw("not") {
                        comparators.push(self.additive()?);
                        ops.push(CmpOp::IsNot);
                        continue;
                    }
                    ops.push(CmpOp::Is);
                    comparators.push(self.additive()?);
                    continue;
                }
                Token::Keyword("in") => {
                    self.advance();
                    ops.push(CmpOp::In);
                    comparators.push(self.additive()?);
                    continue;
                }
                Token::Keyword("not") => {
                    self.advance();
                    self.expect_kw("in")?;
                    ops.push(CmpOp::NotIn);
                    comparators.push(self.additive()?);
                    continue;
                }
                _ => break,
            };
            self.advance();
            ops.push(op);
            comparators.push(self.additive()?);
        }
        if ops.is_empty() { Ok(left) } else { Ok(Expr::Compare { left: Box::new(left), ops, comparators, line }) }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        loop {
            let line = self.line();
            let op = match self.peek() {
                Token::Op("+") => BinOp::Add,
                Token::Op("-") => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), line };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let line = self.line();
            let op = match self.peek() {
                Token::Op("*") => BinOp::Mul,
                Token::Op("/") => BinOp::Div,
                Token::Op("//") => BinOp::FloorDiv,
                Token::Op("%") => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), line };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        if self.eat_op("-") {
            let operand = self.unary()?;
            return Ok(Expr::UnaryOp { op: UnaryOp::Neg, operand: Box::new(operand), line });
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        let base = self.postfix()?;
        if self.eat_op("**") {
            let exponent = self.unary()?;
            return Ok(Expr::BinOp { left: Box::new(base), op: BinOp::Pow, right: Box::new(exponent), line });
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.atom()?;
        loop {
            let line = self.line();
            if self.eat_op(".") {
                let attr = self.expect_name()?;
                expr = Expr::Attribute { value: Box::new(expr), attr, line };
            } else if self.eat_op("(") {
                let mut args = Vec::new();
                let mut kwargs = Vec::new();
                while !matches!(self.peek(), Token::Op(")")) {
                    if let Token::Name(name) = self.peek().clone() {
                        if self.tokens[self.pos + 1].token == Token::Op("=") {
                            self.advance();
                            self.advance();
                            kwargs.push((name, self.expr()?));
                            if !self.eat_op(",") {
                                break;
                            }
                            continue;
                        }
                    }
                    args.push(self.expr()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op(")")?;
                expr = Expr::Call { func: Box::new(expr), args, kwargs, line };
            } else if self.eat_op("[") {
                let index = self.expr()?;
                self.expect_op("]")?;
                expr = Expr::Subscript { value: Box::new(expr), index: Box::new(index), line };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.advance() {
            Token::Int(n) => Ok(Expr::Int(n, line)),
            Token::Float(n) => Ok(Expr::Float(n, line)),
            Token::Str(s) => Ok(Expr::Str(s, line)),
            Token::Keyword("True") => Ok(Expr::Bool(true, line)),
            Token::Keyword("False") => Ok(Expr::Bool(false, line)),
            Token::Keyword("None") => Ok(Expr::None(line)),
            Token::Name(name) => Ok(Expr::Name(name, line)),
            Token::Op("(") => {
                if self.eat_op(")") {
                    return Ok(Expr::Tuple(Vec::new(), line));
                }
                let first = self.expr()?;
                if self.eat_op(",") {
                    let mut items = vec![first];
                    while !matches!(self.peek(), Token::Op(")")) {
                        items.push(self.expr()?);
                        if !self.eat_op(",") {
                            break;
                        }
                    }
                    self.expect_op(")")?;
                    return Ok(Expr::Tuple(items, line));
                }
                self.expect_op(")")?;
                Ok(first)
            }
            Token::Op("[") => {
                let mut items = Vec::new();
                while !matches!(self.peek(), Token::Op("]")) {
                    items.push(self.expr()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("]")?;
                Ok(Expr::List(items, line))
            }
            Token::Op("{") => {
                if self.eat_op("}") {
                    return Ok(Expr::Dict(Vec::new(), line));
                }
                let first_key = self.expr()?;
                if self.eat_op(":") {
                    let first_value = self.expr()?;
                    let mut items = vec![(first_key, first_value)];
                    while self.eat_op(",") {
                        if matches!(self.peek(), Token::Op("}")) {
                            break;
                        }
                        let key = self.expr()?;
                        self.expect_op(":")?;
                        let value = self.expr()?;
                        items.push((key, value));
                    }
                    self.expect_op("}")?;
                    return Ok(Expr::Dict(items, line));
                }
                let mut items = vec![first_key];
                while self.eat_op(",") {
                    if matches!(self.peek(), Token::Op("}")) {
                        break;
                    }
                    items.push(self.expr()?);
                }
                self.expect_op("}")?;
                Ok(Expr::Set(items, line))
            }
            other => Err(ParseError { message: format!("unexpected token {other:?}"), line }),
        }
    }
}
