//! Recursive-descent parser.
//!
//! Precedence (lowest → highest):
//!   conditional  →  `||`  →  `&&`  →  equality  →  relational  →
//!   additive  →  multiplicative  →  unary  →  postfix  →  primary
//!
//! Binary operators associate left; the conditional associates right, so
//! `a ? b : c ? d : e` is `a ? b : (c ? d : e)`.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::lexer::{tokenize, Token, TokenKind};
use super::value::Value;
use crate::error::ExprError;

/// Maximum nesting of parentheses, brackets, and conditionals.  Each level
/// costs one pass through every precedence function, so this keeps a parse
/// well inside a 2 MiB thread stack.  Unary prefixes are folded in a loop
/// and do not count.
pub const MAX_NESTING: usize = 64;

const EQUALITY: [BinaryOp; 4] = [BinaryOp::Eq, BinaryOp::Ne, BinaryOp::StrictEq, BinaryOp::StrictNe];
const RELATIONAL: [BinaryOp; 4] = [BinaryOp::Lt, BinaryOp::Le, BinaryOp::Gt, BinaryOp::Ge];
const ADDITIVE: [BinaryOp; 2] = [BinaryOp::Add, BinaryOp::Sub];
const MULTIPLICATIVE: [BinaryOp; 3] = [BinaryOp::Mul, BinaryOp::Div, BinaryOp::Rem];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::EndOfInput) {
            let end = tokens.last().map(|t| t.position + t.text.chars().count()).unwrap_or(0);
            tokens.push(Token { kind: TokenKind::EndOfInput, text: String::new(), position: end });
        }
        Parser { tokens, pos: 0, depth: 0 }
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        if t.kind != TokenKind::EndOfInput {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek().is_operator(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ExprError {
        ExprError::parse(message, self.peek().position)
    }

    fn describe(tok: &Token) -> String {
        match tok.kind {
            TokenKind::EndOfInput => "end of input".to_owned(),
            TokenKind::String => format!("string {:?}", tok.text),
            _ => format!("'{}'", tok.text),
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error_here(format!("expression nested deeper than {MAX_NESTING} levels")));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn binary_op(&self, allowed: &[BinaryOp]) -> Option<BinaryOp> {
        let tok = self.peek();
        if tok.kind != TokenKind::Operator {
            return None;
        }
        BinaryOp::from_symbol(&tok.text).filter(|op| allowed.contains(op))
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_root(&mut self) -> Result<Expr, ExprError> {
        if self.peek().kind == TokenKind::EndOfInput {
            return Err(self.error_here("empty expression"));
        }
        let expr = self.parse_conditional()?;
        if self.peek().kind != TokenKind::EndOfInput {
            let msg = format!("unexpected trailing {}", Self::describe(self.peek()));
            return Err(self.error_here(msg));
        }
        Ok(expr)
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExprError> {
        let test = self.parse_or()?;
        if !self.eat_op("?") {
            return Ok(test);
        }
        self.enter()?;
        let consequent = self.parse_conditional()?;
        if !self.eat(TokenKind::Colon) {
            let msg = format!("expected ':' in conditional, found {}", Self::describe(self.peek()));
            return Err(self.error_here(msg));
        }
        let alternate = self.parse_conditional()?;
        self.leave();
        Ok(Expr::Conditional(Box::new(test), Box::new(consequent), Box::new(alternate)))
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while self.eat_op("||") {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_equality()?;
        while self.eat_op("&&") {
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_relational()?;
        while let Some(op) = self.binary_op(&EQUALITY) {
            self.pos += 1;
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_additive()?;
        while let Some(op) = self.binary_op(&RELATIONAL) {
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(op) = self.binary_op(&ADDITIVE) {
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.binary_op(&MULTIPLICATIVE) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let mut prefix = Vec::new();
        loop {
            if self.peek().is_operator("!") {
                prefix.push(UnaryOp::Not);
            } else if self.peek().is_operator("-") {
                prefix.push(UnaryOp::Neg);
            } else {
                break;
            }
            self.pos += 1;
        }
        let operand = self.parse_postfix()?;
        Ok(prefix
            .into_iter()
            .rev()
            .fold(operand, |expr, op| Expr::Unary(op, Box::new(expr))))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::Dot) {
                let tok = self.advance();
                if tok.kind != TokenKind::Identifier {
                    return Err(ExprError::parse(
                        format!("expected property name after '.', found {}", Self::describe(&tok)),
                        tok.position,
                    ));
                }
                expr = Expr::Member(Box::new(expr), tok.text);
            } else if self.peek().kind == TokenKind::LBracket {
                let open = self.advance();
                self.enter()?;
                let index = self.parse_conditional()?;
                if !self.eat(TokenKind::RBracket) {
                    return Err(ExprError::parse(
                        format!("unmatched '[' (found {})", Self::describe(self.peek())),
                        open.position,
                    ));
                }
                self.leave();
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Number => tok
                .text
                .parse::<f64>()
                .map(|n| Expr::Literal(Value::Number(n)))
                .map_err(|_| ExprError::parse(format!("invalid number '{}'", tok.text), tok.position)),
            TokenKind::String => Ok(Expr::Literal(Value::Str(tok.text))),
            TokenKind::Boolean => Ok(Expr::Literal(Value::Bool(tok.text == "true"))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::Identifier => Ok(Expr::Identifier(tok.text)),
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.parse_conditional()?;
                if !self.eat(TokenKind::RParen) {
                    return Err(ExprError::parse(
                        format!("unmatched '(' (found {})", Self::describe(self.peek())),
                        tok.position,
                    ));
                }
                self.leave();
                Ok(inner)
            }
            TokenKind::EndOfInput => Err(ExprError::parse("unexpected end of input", tok.position)),
            _ => Err(ExprError::parse(
                format!("unexpected {}", Self::describe(&tok)),
                tok.position,
            )),
        }
    }
}

/// Parse a token stream (as produced by [`tokenize`]) into an AST.
pub fn parse(tokens: Vec<Token>) -> Result<Expr, ExprError> {
    Parser::new(tokens).parse_root()
}

/// Convenience: tokenize with default limits, then parse.
pub fn parse_expr(src: &str) -> Result<Expr, ExprError> {
    parse(tokenize(src)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(src: &str) -> String {
        parse_expr(src).expect("parse failed").to_string()
    }

    fn parse_err(src: &str) -> (String, usize) {
        match parse_expr(src) {
            Err(ExprError::Parse { message, position }) => (message, position),
            other => panic!("expected parse error for {src:?}, got {other:?}"),
        }
    }

    #[test]
    fn literals() {
        assert_eq!(parse_expr("42").unwrap(), Expr::Literal(Value::Number(42.0)));
        assert_eq!(parse_expr("'hi'").unwrap(), Expr::Literal(Value::Str("hi".into())));
        assert_eq!(parse_expr("true").unwrap(), Expr::Literal(Value::Bool(true)));
        assert_eq!(parse_expr("null").unwrap(), Expr::Literal(Value::Null));
    }

    #[test]
    fn precedence() {
        assert_eq!(shape("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(shape("(1 + 2) * 3"), "((1 + 2) * 3)");
        assert_eq!(shape("a || b && c"), "(a || (b && c))");
        assert_eq!(shape("a == b < c"), "(a == (b < c))");
        assert_eq!(shape("-a.b"), "-a.b");
        assert_eq!(shape("!a && b"), "(!a && b)");
    }

    #[test]
    fn left_associative() {
        assert_eq!(shape("1 - 2 - 3"), "((1 - 2) - 3)");
        assert_eq!(shape("a === b !== c"), "((a === b) !== c)");
    }

    #[test]
    fn conditional_is_right_associative() {
        assert_eq!(shape("a ? b : c ? d : e"), "(a ? b : (c ? d : e))");
        assert_eq!(shape("a ? b ? c : d : e"), "(a ? (b ? c : d) : e)");
    }

    #[test]
    fn postfix_chains() {
        assert_eq!(shape("this.value.length > 10"), "(this.value.length > 10)");
        assert_eq!(shape("a[0].b['c'][i + 1]"), "a[0].b[\"c\"][(i + 1)]");
    }

    #[test]
    fn empty_expression() {
        let (msg, pos) = parse_err("   ");
        assert_eq!(msg, "empty expression");
        assert_eq!(pos, 3);
    }

    #[test]
    fn unmatched_delimiters() {
        let (msg, pos) = parse_err("(1 + 2");
        assert!(msg.starts_with("unmatched '('"), "{msg}");
        assert_eq!(pos, 0);
        let (msg, pos) = parse_err("a[1");
        assert!(msg.starts_with("unmatched '['"), "{msg}");
        assert_eq!(pos, 1);
    }

    #[test]
    fn missing_colon() {
        let (msg, _) = parse_err("a ? b");
        assert!(msg.contains("expected ':'"), "{msg}");
    }

    #[test]
    fn trailing_tokens() {
        let (msg, pos) = parse_err("1 2");
        assert!(msg.contains("trailing"), "{msg}");
        assert_eq!(pos, 2);
        assert!(parse_expr("a)").is_err());
    }

    #[test]
    fn end_of_input_mid_construct() {
        let (msg, _) = parse_err("1 +");
        assert_eq!(msg, "unexpected end of input");
        assert!(parse_expr("a.").is_err());
        assert!(parse_expr("a ? b :").is_err());
    }

    #[test]
    fn misplaced_tokens() {
        assert!(parse_expr(": 1").is_err());
        assert!(parse_expr("a.1").is_err());
        assert!(parse_expr("* 2").is_err());
    }

    #[test]
    fn deep_unary_chain_parses() {
        let src = format!("{}x", "!".repeat(200));
        assert!(parse_expr(&src).is_ok());
    }

    fn nested_parens(levels: usize) -> String {
        format!("{}1{}", "(".repeat(levels), ")".repeat(levels))
    }

    #[test]
    fn nesting_limit() {
        assert!(parse_expr(&nested_parens(MAX_NESTING)).is_ok());
        let (msg, _) = parse_err(&nested_parens(MAX_NESTING + 1));
        assert!(msg.contains("nested deeper"), "{msg}");
    }

    #[test]
    fn nesting_limit_counts_brackets_and_conditionals() {
        let src = format!("{}1{}", "a[".repeat(MAX_NESTING + 1), "]".repeat(MAX_NESTING + 1));
        assert!(parse_err(&src).0.contains("nested deeper"));
        let src = format!("{}1{}", "a ? ".repeat(MAX_NESTING + 1), " : 0".repeat(MAX_NESTING + 1));
        assert!(parse_err(&src).0.contains("nested deeper"));
    }

    #[test]
    fn deep_input_fails_cleanly_on_default_thread_stack() {
        // Spawned threads get the platform default stack (2 MiB), unlike
        // the main thread.
        let handle = std::thread::spawn(|| {
            let mut results = Vec::new();
            for levels in [MAX_NESTING, MAX_NESTING + 1, 200, 499] {
                results.push(parse_expr(&nested_parens(levels)).is_ok());
            }
            let mixed = format!("{}1{}", "!(-(".repeat(150), "))".repeat(150));
            results.push(parse_expr(&mixed).is_ok());
            results
        });
        assert_eq!(handle.join().unwrap(), vec![true, false, false, false, false]);
    }

    #[test]
    fn unary_prefixes_fold_innermost_last() {
        assert_eq!(shape("!-x"), "!-x");
        assert_eq!(
            parse_expr("-!1").unwrap(),
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Unary(UnaryOp::Not, Box::new(Expr::Literal(Value::Number(1.0))))),
            )
        );
    }

    #[test]
    fn parse_accepts_stream_without_end_marker() {
        let mut tokens = tokenize("1 + 2").unwrap();
        tokens.pop();
        assert_eq!(parse(tokens).unwrap().to_string(), "(1 + 2)");
    }
}
