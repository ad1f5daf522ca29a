//! Recursive-descent parser.

use crate::ast::*;
use crate::lexer::{Tok, Token};
use crate::value::{BaseType, Type, Value};
use crate::{CtlError, CtlResult};

/// Parses a token stream into a [`Program`].
pub fn parse(tokens: Vec<Token>) -> CtlResult<Program> {
    let mut p = Parser { tokens, pos: 0, depth: 0 };
    let mut program = Program::default();

    while !p.at_eof() {
        if p.eat_ident("import") {
            // imports resolve to the built-in library
            p.advance();
            p.expect(";")?;
            continue;
        }
        if p.eat_punct(";") {
            continue;
        }

        let line = p.line();
        let is_const = p.eat_ident("const");
        let ty = p.parse_type()?;
        let name = p.ident()?;

        if !is_const && p.check_punct("(") {
            program.functions.push(p.function(ty, name, line)?);
        } else {
            let ty = p.dims_after(ty)?;
            p.expect("=")?;
            let init = p.initializer()?;
            p.expect(";")?;
            program.globals.push(Global { name, ty, init, line });
        }
    }

    Ok(program)
}

/// Deepest nesting of blocks, expressions and initializer lists accepted.
pub const MAX_NESTING: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

const QUALIFIERS: &[&str] = &["input", "output", "varying", "uniform", "const"];

impl Parser {
    // ========================================================================
    // Token access
    // ========================================================================

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn peek_at(&self, off: usize) -> &Tok {
        &self.tokens[(self.pos + off).min(self.tokens.len() - 1)].tok
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Tok::Eof)
    }

    fn error<T>(&self, msg: impl Into<String>) -> CtlResult<T> {
        Err(CtlError::Parse { line: self.line(), msg: msg.into() })
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> CtlResult<T>) -> CtlResult<T> {
        if self.depth >= MAX_NESTING {
            return self.error(format!("nesting deeper than {} levels", MAX_NESTING));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn check_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Tok::Punct(q) if *q == p)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.check_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(w) if w == word)
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if self.check_ident(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, p: &str) -> CtlResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            self.error(format!("expected '{}', found {}", p, describe(self.peek())))
        }
    }

    fn ident(&mut self) -> CtlResult<String> {
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => self.error(format!("expected identifier, found {}", describe(&other))),
        }
    }

    fn starts_type(&self) -> bool {
        matches!(self.peek(), Tok::Ident(w) if BaseType::from_keyword(w).is_some())
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Base type with optional `[n]` suffixes (`float[3] f(...)`).
    fn parse_type(&mut self) -> CtlResult<Type> {
        let word = self.ident()?;
        let Some(base) = BaseType::from_keyword(&word) else {
            return self.error(format!("unknown type '{}'", word));
        };
        if word == "unsigned" {
            self.eat_ident("int");
        }
        self.dims_after(Type::scalar(base))
    }

    fn dims_after(&mut self, mut ty: Type) -> CtlResult<Type> {
        while self.eat_punct("[") {
            if self.eat_punct("]") {
                ty.dims.push(0);
                continue;
            }
            match self.advance() {
                Tok::Int(n) if n > 0 => ty.dims.push(n as usize),
                other => return self.error(format!("bad array size {}", describe(&other))),
            }
            self.expect("]")?;
        }
        Ok(ty)
    }

    fn function(&mut self, ret: Type, name: String, line: usize) -> CtlResult<Function> {
        self.expect("(")?;
        let mut params = Vec::new();
        if !self.eat_punct(")") {
            loop {
                params.push(self.param()?);
                if self.eat_punct(")") {
                    break;
                }
                self.expect(",")?;
            }
        }
        let body = self.block()?;
        Ok(Function { name, ret, params, body, line })
    }

    fn param(&mut self) -> CtlResult<Param> {
        let line = self.line();
        let mut output = false;
        let mut varying = false;
        while let Tok::Ident(w) = self.peek() {
            if !QUALIFIERS.contains(&w.as_str()) {
                break;
            }
            match w.as_str() {
                "output" => output = true,
                "varying" => varying = true,
                _ => {}
            }
            self.advance();
        }
        let ty = self.parse_type()?;
        let name = self.ident()?;
        let ty = self.dims_after(ty)?;
        let default = if self.eat_punct("=") { Some(self.initializer()?) } else { None };
        Ok(Param { name, ty, output, varying, default, line })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self) -> CtlResult<Vec<Stmt>> {
        self.expect("{")?;
        let mut stmts = Vec::new();
        while !self.eat_punct("}") {
            if self.at_eof() {
                return self.error("unexpected end of input, expected '}'");
            }
            self.statement(&mut stmts)?;
        }
        Ok(stmts)
    }

    /// Body of `if`/`while`/`for`: a block or a single statement.
    fn body(&mut self) -> CtlResult<Vec<Stmt>> {
        if self.check_punct("{") {
            self.block()
        } else {
            let mut stmts = Vec::new();
            self.statement(&mut stmts)?;
            Ok(stmts)
        }
    }

    /// Parses one statement; declarations with several names push one
    /// statement per name.
    fn statement(&mut self, out: &mut Vec<Stmt>) -> CtlResult<()> {
        self.nested(|p| p.statement_at(out))
    }

    fn statement_at(&mut self, out: &mut Vec<Stmt>) -> CtlResult<()> {
        let line = self.line();

        if self.eat_punct(";") {
            return Ok(());
        }
        if self.check_punct("{") {
            out.push(Stmt::Block(self.block()?));
            return Ok(());
        }
        if self.eat_ident("if") {
            self.expect("(")?;
            let cond = self.expr()?;
            self.expect(")")?;
            let then_branch = self.body()?;
            let else_branch = if self.eat_ident("else") { self.body()? } else { Vec::new() };
            out.push(Stmt::If { cond, then_branch, else_branch });
            return Ok(());
        }
        if self.eat_ident("while") {
            self.expect("(")?;
            let cond = self.expr()?;
            self.expect(")")?;
            let body = self.body()?;
            out.push(Stmt::While { cond, body });
            return Ok(());
        }
        if self.eat_ident("for") {
            self.expect("(")?;
            let mut init = Vec::new();
            if !self.eat_punct(";") {
                self.simple(&mut init)?;
                self.expect(";")?;
            }
            let cond = if self.check_punct(";") { None } else { Some(self.expr()?) };
            self.expect(";")?;
            let mut step = Vec::new();
            if !self.check_punct(")") {
                self.simple(&mut step)?;
                while self.eat_punct(",") {
                    self.simple(&mut step)?;
                }
            }
            self.expect(")")?;
            let body = self.body()?;
            out.push(Stmt::For { init, cond, step, body });
            return Ok(());
        }
        if self.eat_ident("return") {
            let value = if self.check_punct(";") { None } else { Some(self.expr()?) };
            self.expect(";")?;
            out.push(Stmt::Return { value, line });
            return Ok(());
        }

        self.simple(out)?;
        self.expect(";")
    }

    /// Declaration, assignment, increment or expression, without the
    /// trailing `;`.
    fn simple(&mut self, out: &mut Vec<Stmt>) -> CtlResult<()> {
        let line = self.line();

        let is_const = self.eat_ident("const");
        if is_const || self.starts_type() {
            let base = self.parse_type()?;
            loop {
                let line = self.line();
                let name = self.ident()?;
                let ty = self.dims_after(base.clone())?;
                let init = if self.eat_punct("=") { Some(self.initializer()?) } else { None };
                out.push(Stmt::Decl { ty, name, init, line });
                if !self.eat_punct(",") {
                    return Ok(());
                }
            }
        }

        for (p, op) in [("++", AssignOp::Add), ("--", AssignOp::Sub)] {
            if self.eat_punct(p) {
                let target = self.place()?;
                out.push(Stmt::Assign { target, op, value: one(line), line });
                return Ok(());
            }
        }

        let lhs = self.expr()?;
        let op = match self.peek() {
            Tok::Punct("=") => Some(AssignOp::Set),
            Tok::Punct("+=") => Some(AssignOp::Add),
            Tok::Punct("-=") => Some(AssignOp::Sub),
            Tok::Punct("*=") => Some(AssignOp::Mul),
            Tok::Punct("/=") => Some(AssignOp::Div),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let target = lhs.into_place().ok_or(CtlError::Parse { line, msg: "invalid assignment target".into() })?;
            let value = if op == AssignOp::Set { self.initializer()? } else { self.expr()? };
            out.push(Stmt::Assign { target, op, value, line });
            return Ok(());
        }
        for (p, op) in [("++", AssignOp::Add), ("--", AssignOp::Sub)] {
            if self.eat_punct(p) {
                let target = lhs.into_place().ok_or(CtlError::Parse { line, msg: "invalid increment target".into() })?;
                out.push(Stmt::Assign { target, op, value: one(line), line });
                return Ok(());
            }
        }
        out.push(Stmt::Expr(lhs));
        Ok(())
    }

    fn place(&mut self) -> CtlResult<Place> {
        let line = self.line();
        let e = self.postfix()?;
        e.into_place().ok_or(CtlError::Parse { line, msg: "invalid assignment target".into() })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Expression or `{...}` list.
    fn initializer(&mut self) -> CtlResult<Expr> {
        self.nested(Self::initializer_at)
    }

    fn initializer_at(&mut self) -> CtlResult<Expr> {
        if self.check_punct("{") {
            let line = self.line();
            self.advance();
            let mut items = Vec::new();
            if !self.eat_punct("}") {
                loop {
                    items.push(self.initializer()?);
                    // trailing comma allowed
                    if self.eat_punct(",") && !self.check_punct("}") {
                        continue;
                    }
                    self.expect("}")?;
                    break;
                }
            }
            return Ok(Expr::new(ExprKind::List(items), line));
        }
        self.expr()
    }

    fn expr(&mut self) -> CtlResult<Expr> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> CtlResult<Expr> {
        let cond = self.binary(0)?;
        if self.check_punct("?") {
            let line = self.line();
            self.advance();
            let a = self.expr()?;
            self.expect(":")?;
            let b = self.expr()?;
            return Ok(Expr::new(ExprKind::Ternary(Box::new(cond), Box::new(a), Box::new(b)), line));
        }
        Ok(cond)
    }

    /// Precedence climbing over the binary operators.
    fn binary(&mut self, min_prec: u8) -> CtlResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let Some((op, prec)) = binop(self.peek()) else { break };
            if prec < min_prec {
                break;
            }
            let line = self.line();
            self.advance();
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), line);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> CtlResult<Expr> {
        let line = self.line();
        let op = match self.peek() {
            Tok::Punct("-") => UnOp::Neg,
            Tok::Punct("!") => UnOp::Not,
            Tok::Punct("+") => UnOp::Plus,
            _ => return self.postfix(),
        };
        self.advance();
        let inner = self.nested(Self::unary)?;
        Ok(Expr::new(ExprKind::Unary(op, Box::new(inner)), line))
    }

    fn postfix(&mut self) -> CtlResult<Expr> {
        let mut e = self.primary()?;
        while self.check_punct("[") {
            let line = self.line();
            self.advance();
            let idx = self.expr()?;
            self.expect("]")?;
            e = Expr::new(ExprKind::Index(Box::new(e), Box::new(idx)), line);
        }
        Ok(e)
    }

    fn primary(&mut self) -> CtlResult<Expr> {
        let line = self.line();
        match self.advance() {
            Tok::Int(v) => {
                let v = i32::try_from(v).map_err(|_| CtlError::Parse { line, msg: format!("integer {} out of range", v) })?;
                Ok(Expr::new(ExprKind::Lit(Value::Int(v)), line))
            }
            Tok::Float(v) => Ok(Expr::new(ExprKind::Lit(Value::Float(v as f32)), line)),
            Tok::Ident(w) if w == "true" => Ok(Expr::new(ExprKind::Lit(Value::Bool(true)), line)),
            Tok::Ident(w) if w == "false" => Ok(Expr::new(ExprKind::Lit(Value::Bool(false)), line)),
            Tok::Ident(name) => {
                if self.eat_punct("(") {
                    let mut args = Vec::new();
                    if !self.eat_punct(")") {
                        loop {
                            args.push(self.initializer()?);
                            if self.eat_punct(")") {
                                break;
                            }
                            self.expect(",")?;
                        }
                    }
                    Ok(Expr::new(ExprKind::Call(name, args), line))
                } else {
                    Ok(Expr::new(ExprKind::Var(name), line))
                }
            }
            Tok::Punct("(") => {
                let e = self.expr()?;
                self.expect(")")?;
                Ok(e)
            }
            other => Err(CtlError::Parse { line, msg: format!("unexpected {}", describe(&other)) }),
        }
    }
}

/// Binary operator and its precedence, higher binds tighter.
fn binop(tok: &Tok) -> Option<(BinOp, u8)> {
    let Tok::Punct(p) = tok else { return None };
    Some(match *p {
        "||" => (BinOp::Or, 1),
        "&&" => (BinOp::And, 2),
        "==" => (BinOp::Eq, 3),
        "!=" => (BinOp::Ne, 3),
        "<" => (BinOp::Lt, 4),
        "<=" => (BinOp::Le, 4),
        ">" => (BinOp::Gt, 4),
        ">=" => (BinOp::Ge, 4),
        "+" => (BinOp::Add, 5),
        "-" => (BinOp::Sub, 5),
        "*" => (BinOp::Mul, 6),
        "/" => (BinOp::Div, 6),
        "%" => (BinOp::Rem, 6),
        _ => return None,
    })
}

fn one(line: usize) -> Expr {
    Expr::new(ExprKind::Lit(Value::Int(1)), line)
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Ident(w) => format!("'{}'", w),
        Tok::Int(v) => v.to_string(),
        Tok::Float(v) => v.to_string(),
        Tok::Str(s) => format!("\"{}\"", s),
        Tok::Punct(p) => format!("'{}'", p),
        Tok::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> CtlResult<Program> {
        parse(tokenize(src)?)
    }

    #[test]
    fn test_entry_point_signature() {
        let p = parse_src(
            "import \"lib\";
             const float K = 2.0;
             void ART_main(varying float r, varying float g, varying float b,
                           output varying float ro, output varying float go, output varying float bo,
                           float amount = 0.5, input uniform int mode)
             { ro = r * amount; go = g; bo = b; }",
        )
        .unwrap();
        assert_eq!(p.globals.len(), 1);
        let f = &p.functions[0];
        assert_eq!(f.name, "ART_main");
        assert_eq!(f.params.len(), 8);
        assert!(f.params[0].varying && !f.params[0].output);
        assert!(f.params[3].output);
        assert!(!f.params[6].varying);
        assert!(f.params[6].default.is_some());
        assert_eq!(f.params[7].ty.base, BaseType::Int);
    }

    #[test]
    fn test_array_return_and_params() {
        let p = parse_src(
            "float[3] f(float m[3][3], float v[]) { float o[3] = {m[0][0], v[1], 0}; return o; }",
        )
        .unwrap();
        let f = &p.functions[0];
        assert_eq!(f.ret.dims, vec![3]);
        assert_eq!(f.params[0].ty.dims, vec![3, 3]);
        assert_eq!(f.params[1].ty.dims, vec![0]);
    }

    #[test]
    fn test_precedence() {
        let p = parse_src("int f() { return 1 + 2 * 3 < 8 && true; }").unwrap();
        let Stmt::Return { value: Some(e), .. } = &p.functions[0].body[0] else { panic!() };
        assert!(matches!(e.kind, ExprKind::Binary(BinOp::And, _, _)));
    }

    #[test]
    fn test_statements() {
        let p = parse_src(
            "void f() {
                int i, j = 2;
                for (i = 0; i < 3; i++) { j += i; }
                while (j > 0) j--;
                if (j == 0) ; else { j = 1; }
             }",
        )
        .unwrap();
        let body = &p.functions[0].body;
        assert_eq!(body.len(), 5);
        assert!(matches!(body[2], Stmt::For { .. }));
        assert!(matches!(body[3], Stmt::While { .. }));
        assert!(matches!(body[4], Stmt::If { .. }));
    }

    #[test]
    fn test_syntax_error_line() {
        let err = parse_src("void f()\n{\n  x = ;\n}").unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert!(parse_src("void f() { 1 = 2; }").is_err());
        assert!(parse_src("void f() {").is_err());
    }

    fn nested_parens(depth: usize) -> String {
        format!("void f() {{ float x = {}1.0{}; }}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_nesting_limit() {
        assert!(parse_src(&nested_parens(50)).is_ok());

        let err = parse_src(&nested_parens(5000)).unwrap_err();
        assert!(matches!(err, CtlError::Parse { .. }), "{:?}", err);

        let blocks = format!("void f() {}{}", "{".repeat(5000), "}".repeat(5000));
        assert!(matches!(parse_src(&blocks), Err(CtlError::Parse { .. })));

        let negations = format!("void f() {{ float x = {}1.0; }}", "- ".repeat(5000));
        assert!(matches!(parse_src(&negations), Err(CtlError::Parse { .. })));

        let lists = format!("void f() {{ float x[1] = {}1.0{}; }}", "{".repeat(5000), "}".repeat(5000));
        assert!(matches!(parse_src(&lists), Err(CtlError::Parse { .. })));
    }
}
