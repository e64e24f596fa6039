//! fralgo-par - Parser (syntactic analysis).
//!
//! Turns the token stream into the AST of [`ast`]. Statements are parsed
//! by recursive descent, one function per construct; expressions go
//! through a binding-power (top-down operator precedence) core, which
//! realizes the language's operator table:
//!
//! ```text
//! Token            lbp   rbp   associativity
//! -------------------------------------------
//! ET OU OUX         1     2    left
//! =  <>             3     4    nonassoc
//! <  >  <=  >=      5     6    left
//! &  (concat)       7     8    left
//! +  -              9    10    left
//! *  /  %  DP      11    12    left
//! ^                13    14    left
//! -  (unary)       15          prefix
//! ```
//!
//! Four program forms are recognized: a library (`Librairie` +
//! declarations + optional `Initialise` block), a main program
//! (declarations + `Début … Fin`), a bare declaration list (imported
//! libraries), and free statements (the interactive shell).
//!
//! Syntax errors report the offending lexeme between `>` and `<` with a
//! newline rendered as `↵`, plus the line number; an exhausted input
//! raises `Fin de fichier prématurée.`

pub mod ast;
mod edge_cases;
pub mod types;

use ast::{
    Accessor, BinOp, Block, Builtin, Expr, FileMode, FunctionDef, Param, Path, Program, Stmt,
    StmtKind,
};
use fralgo_lex::{tokenize, Lexeme, Token};
use fralgo_util::{AlgoError, Result};
use types::TypeSpec;

/// Parses a complete source text into a [`Program`].
pub fn parse(source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).program()
}

struct Parser {
    tokens: Vec<Lexeme>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Lexeme>) -> Self {
        Self { tokens, pos: 0 }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Lexeme {
        let lexeme = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        lexeme
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Syntax error on the current token.
    fn unexpected<T>(&self) -> Result<T> {
        match self.peek() {
            Token::Eof => Err(AlgoError::UnexpectedEof),
            token => Err(AlgoError::Syntax {
                token: token.to_string(),
                line: self.line(),
            }),
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            self.unexpected()
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek() {
            Token::Ident(_) => match self.advance().token {
                Token::Ident(name) => Ok(name),
                _ => unreachable!(),
            },
            _ => self.unexpected(),
        }
    }

    /// A statement terminator: a newline, or the end of the input.
    fn expect_newline(&mut self) -> Result<()> {
        if self.eat(&Token::Newline) || self.check(&Token::Eof) {
            Ok(())
        } else {
            self.unexpected()
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn expect_eof(&mut self) -> Result<()> {
        self.skip_newlines();
        if self.check(&Token::Eof) {
            Ok(())
        } else {
            self.unexpected()
        }
    }

    // ------------------------------------------------------------------
    // Program forms
    // ------------------------------------------------------------------

    fn program(&mut self) -> Result<Program> {
        self.skip_newlines();
        if self.eat(&Token::Librairie) {
            return self.library();
        }

        let mut decls = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_declaration() {
                decls.push(self.declaration()?);
            } else {
                break;
            }
        }

        if self.eat(&Token::Debut) {
            self.expect_newline()?;
            let body = self.statement_list(&[Token::Fin], false)?;
            self.expect(&Token::Fin)?;
            self.expect_eof()?;
            return Ok(Program::Main {
                decls: Block::new(decls),
                body,
            });
        }

        if self.check(&Token::Eof) {
            return Ok(Program::Declarations(Block::new(decls)));
        }

        // Interactive form: free statements, possibly after declarations.
        let mut stmts = decls;
        let rest = self.statement_list(&[], false)?;
        stmts.extend(rest.stmts);
        self.expect_eof()?;
        Ok(Program::Statements(Block::new(stmts)))
    }

    fn library(&mut self) -> Result<Program> {
        self.expect_newline()?;
        let mut decls = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_declaration() {
                decls.push(self.declaration()?);
            } else {
                break;
            }
        }
        let init = if self.eat(&Token::Initialise) {
            self.expect_newline()?;
            Some(self.statement_list(&[], false)?)
        } else {
            None
        };
        self.expect_eof()?;
        Ok(Program::Library {
            decls: Block::new(decls),
            init,
        })
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn at_declaration(&self) -> bool {
        match self.peek() {
            Token::Variable
            | Token::Variables
            | Token::Tableau
            | Token::Tableaux
            | Token::Structure
            | Token::Constante
            | Token::Importer
            | Token::Fonction
            | Token::Procedure => true,
            // `Table nom en K, V` declares; a bare `Table` opens a literal.
            Token::Table => matches!(self.peek_at(1), Token::Ident(_)),
            _ => false,
        }
    }

    fn declaration(&mut self) -> Result<Stmt> {
        let line = self.line();
        let kind = match self.peek() {
            Token::Variable => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(&Token::En)?;
                let ty = self.type_spec()?;
                self.expect_newline()?;
                StmtKind::Declare {
                    names: vec![name],
                    ty,
                }
            }
            Token::Variables => {
                self.advance();
                let mut names = vec![self.expect_ident()?];
                while self.eat(&Token::Comma) {
                    names.push(self.expect_ident()?);
                }
                self.expect(&Token::En)?;
                let ty = self.type_spec()?;
                self.expect_newline()?;
                StmtKind::Declare { names, ty }
            }
            Token::Tableau | Token::Tableaux => {
                let plural = matches!(self.peek(), Token::Tableaux);
                self.advance();
                let mut arrays = vec![self.array_decl()?];
                while plural && self.eat(&Token::Comma) {
                    arrays.push(self.array_decl()?);
                }
                self.expect(&Token::En)?;
                let elem = self.type_spec()?;
                self.expect_newline()?;
                StmtKind::DeclareArray { arrays, elem }
            }
            Token::Table => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(&Token::En)?;
                let key = self.type_spec()?;
                self.expect(&Token::Comma)?;
                let value = self.type_spec()?;
                self.expect_newline()?;
                StmtKind::DeclareTable { name, key, value }
            }
            Token::Structure => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect_newline()?;
                let mut fields = Vec::new();
                loop {
                    self.skip_newlines();
                    if self.eat(&Token::FinStructure) {
                        break;
                    }
                    let field = self.expect_ident()?;
                    self.expect(&Token::En)?;
                    let ty = self.type_spec()?;
                    self.expect_newline()?;
                    fields.push((field, ty));
                }
                self.expect_newline()?;
                StmtKind::DeclareStruct { name, fields }
            }
            Token::Constante => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(&Token::Arrow)?;
                let value = self.expression()?;
                self.expect_newline()?;
                StmtKind::DeclareConst { name, value }
            }
            Token::Importer => {
                self.advance();
                let lib = match self.peek() {
                    Token::Str(_) => match self.advance().token {
                        Token::Str(s) => s,
                        _ => unreachable!(),
                    },
                    _ => return self.unexpected(),
                };
                let alias = if self.eat(&Token::Alias) {
                    Some(self.expect_ident()?)
                } else {
                    None
                };
                self.expect_newline()?;
                StmtKind::Import { lib, alias }
            }
            Token::Fonction => {
                self.advance();
                let def = self.callable(true)?;
                StmtKind::Function(def)
            }
            Token::Procedure => {
                self.advance();
                let def = self.callable(false)?;
                StmtKind::Function(def)
            }
            _ => return self.unexpected(),
        };
        Ok(Stmt { kind, line })
    }

    /// `nom[]` or `nom[m1, m2, …]` in an array declaration.
    fn array_decl(&mut self) -> Result<(String, Vec<i64>)> {
        let name = self.expect_ident()?;
        self.expect(&Token::LBracket)?;
        if self.eat(&Token::RBracket) {
            return Ok((name, vec![-1]));
        }
        let mut maxes = vec![self.integer_literal()?];
        while self.eat(&Token::Comma) {
            maxes.push(self.integer_literal()?);
        }
        self.expect(&Token::RBracket)?;
        Ok((name, maxes))
    }

    fn integer_literal(&mut self) -> Result<i64> {
        match self.peek() {
            Token::Integer(_) => match self.advance().token {
                Token::Integer(n) => Ok(n),
                _ => unreachable!(),
            },
            _ => self.unexpected(),
        }
    }

    fn type_spec(&mut self) -> Result<TypeSpec> {
        match self.peek().clone() {
            Token::TypeBooleen => {
                self.advance();
                Ok(TypeSpec::Boolean)
            }
            Token::TypeEntier => {
                self.advance();
                Ok(TypeSpec::Integer)
            }
            Token::TypeNumerique => {
                self.advance();
                Ok(TypeSpec::Float)
            }
            Token::TypeChaine => {
                self.advance();
                Ok(TypeSpec::Str)
            }
            Token::TypeQuelconque => {
                self.advance();
                Ok(TypeSpec::Any)
            }
            Token::TypeCaractere => {
                self.advance();
                if self.eat(&Token::Star) {
                    let size = self.integer_literal()?;
                    Ok(TypeSpec::Char(size))
                } else {
                    Ok(TypeSpec::Char(1))
                }
            }
            Token::Ident(name) => {
                self.advance();
                Ok(TypeSpec::Struct(name))
            }
            _ => self.unexpected(),
        }
    }

    /// Parses a function (`typed` true) or procedure definition, the
    /// opening keyword being already consumed.
    fn callable(&mut self, typed: bool) -> Result<FunctionDef> {
        let name = self.expect_ident()?;
        self.expect(&Token::LParen)?;
        let params = if self.eat(&Token::RParen) {
            Vec::new()
        } else {
            let params = self.parameters()?;
            self.expect(&Token::RParen)?;
            params
        };
        let return_type = if typed {
            self.expect(&Token::En)?;
            Some(self.type_spec()?)
        } else {
            None
        };
        self.expect_newline()?;
        let end = if typed {
            Token::FinFonction
        } else {
            Token::FinProcedure
        };
        let body = self.statement_list(&[end.clone()], false)?;
        self.expect(&end)?;
        self.expect_newline()?;
        Ok(FunctionDef {
            name,
            params,
            body,
            return_type,
        })
    }

    /// Parameter groups: `a, b en Entier, &t[] en Chaîne, …`. A group of
    /// names shares the type that follows it.
    fn parameters(&mut self) -> Result<Vec<Param>> {
        let mut params = Vec::new();
        loop {
            let mut group: Vec<(String, Option<Vec<i64>>, bool)> = Vec::new();
            loop {
                let by_ref = self.eat(&Token::Ampersand);
                let name = self.expect_ident()?;
                let dims = if self.eat(&Token::LBracket) {
                    if self.eat(&Token::RBracket) {
                        Some(vec![-1])
                    } else {
                        let mut maxes = vec![self.integer_literal()?];
                        while self.eat(&Token::Comma) {
                            maxes.push(self.integer_literal()?);
                        }
                        self.expect(&Token::RBracket)?;
                        Some(maxes)
                    }
                } else {
                    None
                };
                group.push((name, dims, by_ref));
                if self.check(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(&Token::En)?;
            let ty = self.type_spec()?;
            for (name, dims, by_ref) in group {
                let pty = match dims {
                    Some(maxes) => TypeSpec::Array {
                        elem: Box::new(ty.clone()),
                        maxes,
                    },
                    None => ty.clone(),
                };
                params.push(Param {
                    name,
                    ty: pty,
                    by_ref,
                });
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Parses statements until a terminator token, the `ident Suivant`
    /// closer of a `Pour` loop (`stop_at_next`), or the end of input.
    fn statement_list(&mut self, terminators: &[Token], stop_at_next: bool) -> Result<Block> {
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&Token::Eof) {
                if terminators.is_empty() && !stop_at_next {
                    break;
                }
                return Err(AlgoError::UnexpectedEof);
            }
            if terminators.iter().any(|t| self.check(t)) {
                break;
            }
            if stop_at_next
                && matches!(self.peek(), Token::Ident(_))
                && matches!(self.peek_at(1), Token::Suivant)
            {
                break;
            }
            stmts.push(self.statement()?);
        }
        Ok(Block::new(stmts))
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.at_declaration() {
            return self.declaration();
        }
        let line = self.line();
        let kind = match self.peek() {
            Token::Ecrire | Token::EcrireErr => {
                let err = matches!(self.peek(), Token::EcrireErr);
                self.advance();
                let mut args = vec![self.expression()?];
                while self.eat(&Token::Comma) {
                    args.push(self.expression()?);
                }
                let newline = !self.eat(&Token::Backslash);
                self.expect_newline()?;
                StmtKind::Print { args, newline, err }
            }
            Token::Lire => {
                self.advance();
                let target = self.path()?;
                self.expect_newline()?;
                StmtKind::Read { target }
            }
            Token::Redim => {
                self.advance();
                let target = self.path_base()?;
                self.expect(&Token::LBracket)?;
                let mut dims = vec![self.expression()?];
                while self.eat(&Token::Comma) {
                    dims.push(self.expression()?);
                }
                self.expect(&Token::RBracket)?;
                self.expect_newline()?;
                StmtKind::Resize { target, dims }
            }
            Token::Dormir => {
                self.advance();
                self.expect(&Token::LParen)?;
                let duration = self.expression()?;
                self.expect(&Token::RParen)?;
                self.expect_newline()?;
                StmtKind::Sleep(duration)
            }
            Token::Ouvrir => {
                self.advance();
                let filename = self.expression()?;
                self.expect(&Token::Sur)?;
                let channel = self.expression()?;
                self.expect(&Token::En)?;
                let mode = match self.peek() {
                    Token::Lecture => FileMode::Read,
                    Token::Ecriture => FileMode::Write,
                    Token::Ajout => FileMode::Append,
                    _ => return self.unexpected(),
                };
                self.advance();
                self.expect_newline()?;
                StmtKind::OpenFile {
                    filename,
                    channel,
                    mode,
                }
            }
            Token::Fermer => {
                self.advance();
                let channel = self.expression()?;
                self.expect_newline()?;
                StmtKind::CloseFile { channel }
            }
            Token::LireFichier => {
                self.advance();
                let channel = self.expression()?;
                self.expect(&Token::Comma)?;
                let target = self.path()?;
                self.expect_newline()?;
                StmtKind::ReadFile { channel, target }
            }
            Token::EcrireFichier => {
                self.advance();
                let channel = self.expression()?;
                self.expect(&Token::Comma)?;
                let value = self.expression()?;
                self.expect_newline()?;
                StmtKind::WriteFile { channel, value }
            }
            Token::Si => return self.if_block(line),
            Token::TantQue => {
                self.advance();
                let cond = self.expression()?;
                self.expect_newline()?;
                let body = self.statement_list(&[Token::FinTantQue], false)?;
                self.expect(&Token::FinTantQue)?;
                self.expect_newline()?;
                StmtKind::While { cond, body }
            }
            Token::Pour => {
                self.advance();
                let var = self.expect_ident()?;
                self.expect(&Token::Arrow)?;
                let start = self.expression()?;
                self.expect(&Token::A)?;
                let end = self.expression()?;
                let step = if self.eat(&Token::Pas) {
                    Some(self.expression()?)
                } else {
                    None
                };
                self.expect_newline()?;
                let body = self.statement_list(&[], true)?;
                let next_var = self.expect_ident()?;
                self.expect(&Token::Suivant)?;
                self.expect_newline()?;
                StmtKind::For {
                    var,
                    start,
                    end,
                    step,
                    body,
                    next_var,
                }
            }
            Token::Retourne => {
                self.advance();
                let value = self.expression()?;
                self.expect_newline()?;
                StmtKind::Return(value)
            }
            Token::Panique => {
                self.advance();
                let message = self.expression()?;
                self.expect_newline()?;
                StmtKind::Panic(message)
            }
            Token::Continuer => {
                self.advance();
                self.expect_newline()?;
                StmtKind::Continue
            }
            Token::Sortir => {
                self.advance();
                self.expect_newline()?;
                StmtKind::Exit
            }
            _ => {
                // Assignment or expression statement.
                let expr = self.expression()?;
                if self.eat(&Token::Arrow) {
                    let target = match expr {
                        Expr::Path(path) => path,
                        _ => return self.unexpected(),
                    };
                    let mut values = vec![self.expression()?];
                    while self.eat(&Token::Comma) {
                        values.push(self.expression()?);
                    }
                    self.expect_newline()?;
                    if values.len() == 1 {
                        StmtKind::Assign {
                            target,
                            value: values.pop().expect("one value"),
                        }
                    } else {
                        StmtKind::AssignSeq { target, values }
                    }
                } else {
                    self.expect_newline()?;
                    StmtKind::Expr(expr)
                }
            }
        };
        Ok(Stmt { kind, line })
    }

    fn if_block(&mut self, line: u32) -> Result<Stmt> {
        self.expect(&Token::Si)?;
        let mut arms = Vec::new();
        let mut otherwise = None;
        loop {
            let cond = self.expression()?;
            self.expect(&Token::Alors)?;
            self.expect_newline()?;
            let body =
                self.statement_list(&[Token::SinonSi, Token::Sinon, Token::FinSi], false)?;
            arms.push((cond, body));
            if self.eat(&Token::SinonSi) {
                continue;
            }
            if self.eat(&Token::Sinon) {
                self.expect_newline()?;
                otherwise = Some(self.statement_list(&[Token::FinSi], false)?);
            }
            self.expect(&Token::FinSi)?;
            self.expect_newline()?;
            break;
        }
        Ok(Stmt {
            kind: StmtKind::If { arms, otherwise },
            line,
        })
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    /// A bare, possibly namespace-qualified variable (no accessors).
    fn path_base(&mut self) -> Result<Path> {
        let first = self.expect_ident()?;
        if self.eat(&Token::Colon) {
            let base = self.expect_ident()?;
            Ok(Path {
                namespace: Some(first),
                base,
                accessors: Vec::new(),
            })
        } else {
            Ok(Path::variable(first))
        }
    }

    /// A full access path: base plus `.field` / `[index…]` accessors.
    fn path(&mut self) -> Result<Path> {
        let mut path = self.path_base()?;
        self.accessors(&mut path)?;
        Ok(path)
    }

    fn accessors(&mut self, path: &mut Path) -> Result<()> {
        loop {
            if self.eat(&Token::Dot) {
                let field = self.expect_ident()?;
                path.accessors.push(Accessor::Field(field));
            } else if self.eat(&Token::LBracket) {
                let mut indexes = vec![self.expression()?];
                while self.eat(&Token::Comma) {
                    indexes.push(self.expression()?);
                }
                self.expect(&Token::RBracket)?;
                path.accessors.push(Accessor::Index(indexes));
            } else {
                return Ok(());
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr> {
        self.binary(0)
    }

    /// Binding powers; `None` for tokens that end an expression.
    fn binding_power(token: &Token) -> Option<(BinOp, u8, u8)> {
        let entry = match token {
            Token::Et => (BinOp::And, 1, 2),
            Token::Ou => (BinOp::Or, 1, 2),
            Token::Oux => (BinOp::Xor, 1, 2),
            Token::Eq => (BinOp::Eq, 3, 4),
            Token::Ne => (BinOp::Ne, 3, 4),
            Token::Lt => (BinOp::Lt, 5, 6),
            Token::Gt => (BinOp::Gt, 5, 6),
            Token::Le => (BinOp::Le, 5, 6),
            Token::Ge => (BinOp::Ge, 5, 6),
            Token::Ampersand => (BinOp::Concat, 7, 8),
            Token::Plus => (BinOp::Add, 9, 10),
            Token::Minus => (BinOp::Sub, 9, 10),
            Token::Star => (BinOp::Mul, 11, 12),
            Token::Slash => (BinOp::Div, 11, 12),
            Token::Percent => (BinOp::Mod, 11, 12),
            Token::Dp => (BinOp::DivBy, 11, 12),
            Token::Caret => (BinOp::Pow, 13, 14),
            _ => return None,
        };
        Some(entry)
    }

    fn binary(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some((op, lbp, rbp)) = Self::binding_power(self.peek()) {
            if lbp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.binary(rbp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
            // `=` and `<>` do not associate: `a = b = c` is an error.
            if matches!(op, BinOp::Eq | BinOp::Ne)
                && matches!(self.peek(), Token::Eq | Token::Ne)
            {
                return self.unexpected();
            }
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            let operand = self.binary(15)?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Token::Integer(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            Token::Float(x) => {
                self.advance();
                Ok(Expr::Float(x))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Token::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => self.array_literal(),
            Token::Table => self.table_literal(),
            Token::Ampersand => {
                self.advance();
                let name = self.expect_ident()?;
                Ok(Expr::Reference(name))
            }
            Token::Non => {
                self.advance();
                self.expect(&Token::LParen)?;
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Not(Box::new(inner)))
            }
            Token::TypeEntier => self.conversion(Conv::Integer),
            Token::TypeNumerique => self.conversion(Conv::Float),
            Token::TypeChaine => self.conversion(Conv::Str),
            Token::TypeBooleen => self.conversion(Conv::Boolean),
            Token::Longueur => self.builtin1(Builtin::Len),
            Token::Taille => self.builtin1(Builtin::SizeOf),
            Token::Car => self.builtin1(Builtin::Chr),
            Token::CodeCar => self.builtin1(Builtin::Ord),
            Token::TypeOf => self.builtin1(Builtin::TypeOf),
            Token::Fdf => self.builtin1(Builtin::Eof),
            Token::Clefs => self.builtin1(Builtin::Keys),
            Token::Valeurs => self.builtin1(Builtin::Values),
            Token::Gauche => self.builtin2(Builtin::Left),
            Token::Droite => self.builtin2(Builtin::Right),
            Token::Trouve => self.builtin2(Builtin::Find),
            Token::Existe => self.builtin2(Builtin::Exists),
            Token::Clef => self.builtin2(Builtin::KeyAt),
            Token::Valeur => self.builtin2(Builtin::ValueFor),
            Token::Extraire => {
                self.advance();
                self.expect(&Token::LParen)?;
                let text = self.expression()?;
                self.expect(&Token::Comma)?;
                let start = self.expression()?;
                self.expect(&Token::Comma)?;
                let length = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Builtin(Builtin::Mid(
                    Box::new(text),
                    Box::new(start),
                    Box::new(length),
                )))
            }
            Token::Alea => {
                self.advance();
                self.expect(&Token::LParen)?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Builtin(Builtin::Random))
            }
            Token::TempsUnix => {
                self.advance();
                self.expect(&Token::LParen)?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Builtin(Builtin::UnixTime))
            }
            Token::Ident(_) => self.path_or_call(),
            _ => self.unexpected(),
        }
    }

    fn array_literal(&mut self) -> Result<Expr> {
        self.expect(&Token::LBracket)?;
        if self.eat(&Token::RBracket) {
            return Ok(Expr::ArrayLit(Vec::new()));
        }
        let mut elems = vec![self.expression()?];
        while self.eat(&Token::Comma) {
            elems.push(self.expression()?);
        }
        self.expect(&Token::RBracket)?;
        Ok(Expr::ArrayLit(elems))
    }

    /// `Table` ↵ (`clé, valeur` ↵)* `FinTable`
    fn table_literal(&mut self) -> Result<Expr> {
        self.expect(&Token::Table)?;
        self.expect_newline()?;
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(&Token::FinTable) {
                break;
            }
            let key = self.expression()?;
            self.expect(&Token::Comma)?;
            let value = self.expression()?;
            self.expect_newline()?;
            entries.push((key, value));
        }
        Ok(Expr::TableLit(entries))
    }

    fn conversion(&mut self, conv: Conv) -> Result<Expr> {
        self.advance();
        self.expect(&Token::LParen)?;
        let inner = Box::new(self.expression()?);
        self.expect(&Token::RParen)?;
        let builtin = match conv {
            Conv::Integer => Builtin::ToInteger(inner),
            Conv::Float => Builtin::ToFloat(inner),
            Conv::Str => Builtin::ToString(inner),
            Conv::Boolean => Builtin::ToBoolean(inner),
        };
        Ok(Expr::Builtin(builtin))
    }

    fn builtin1(&mut self, make: fn(Box<Expr>) -> Builtin) -> Result<Expr> {
        self.advance();
        self.expect(&Token::LParen)?;
        let arg = Box::new(self.expression()?);
        self.expect(&Token::RParen)?;
        Ok(Expr::Builtin(make(arg)))
    }

    fn builtin2(&mut self, make: fn(Box<Expr>, Box<Expr>) -> Builtin) -> Result<Expr> {
        self.advance();
        self.expect(&Token::LParen)?;
        let first = Box::new(self.expression()?);
        self.expect(&Token::Comma)?;
        let second = Box::new(self.expression()?);
        self.expect(&Token::RParen)?;
        Ok(Expr::Builtin(make(first, second)))
    }

    /// An identifier leads to a call (`f(…)`, `ns:f(…)`) or a path
    /// (`x`, `ns:x`, `a.b[i]`).
    fn path_or_call(&mut self) -> Result<Expr> {
        let first = self.expect_ident()?;
        let (namespace, name) = if self.eat(&Token::Colon) {
            (Some(first), self.expect_ident()?)
        } else {
            (None, first)
        };
        if self.eat(&Token::LParen) {
            let mut args = Vec::new();
            if !self.eat(&Token::RParen) {
                args.push(self.expression()?);
                while self.eat(&Token::Comma) {
                    args.push(self.expression()?);
                }
                self.expect(&Token::RParen)?;
            }
            return Ok(Expr::Call {
                namespace,
                name,
                args,
            });
        }
        let mut path = Path {
            namespace,
            base: name,
            accessors: Vec::new(),
        };
        self.accessors(&mut path)?;
        Ok(Expr::Path(path))
    }
}

/// The four conversion builtins share their parse shape.
enum Conv {
    Integer,
    Float,
    Str,
    Boolean,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        parse(source).expect("parse failed")
    }

    fn main_body(program: Program) -> Block {
        match program {
            Program::Main { body, .. } => body,
            other => panic!("expected a main program, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_program() {
        let program = parse_ok("Variable x en Entier\nDébut\n x ← 5\n Ecrire x\nFin");
        let body = main_body(program);
        assert_eq!(body.stmts.len(), 2);
        assert!(matches!(body.stmts[0].kind, StmtKind::Assign { .. }));
        assert!(matches!(
            body.stmts[1].kind,
            StmtKind::Print { newline: true, err: false, .. }
        ));
    }

    #[test]
    fn test_declaration_forms() {
        let program = parse_ok(
            "Variables a, b en Chaîne\n\
             Tableau t[2,3] en Entier\n\
             Tableaux u[], v[5] en Numérique\n\
             Table scores en Chaîne, Entier\n\
             Constante PI ← 3.14\n\
             Début\nFin",
        );
        match program {
            Program::Main { decls, .. } => {
                assert_eq!(decls.stmts.len(), 5);
                match &decls.stmts[1].kind {
                    StmtKind::DeclareArray { arrays, .. } => {
                        assert_eq!(arrays[0], ("t".to_string(), vec![2, 3]));
                    }
                    other => panic!("unexpected: {other:?}"),
                }
                match &decls.stmts[2].kind {
                    StmtKind::DeclareArray { arrays, .. } => {
                        assert_eq!(arrays[0], ("u".to_string(), vec![-1]));
                        assert_eq!(arrays[1], ("v".to_string(), vec![5]));
                    }
                    other => panic!("unexpected: {other:?}"),
                }
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse_ok("x ← 1 + 2 * 3\n");
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::Assign { value, .. } => match value {
                Expr::Binary { op: BinOp::Add, rhs, .. } => {
                    assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_power() {
        let program = parse_ok("x ← -2 ^ 2\n");
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::Assign { value, .. } => match value {
                Expr::Binary { op: BinOp::Pow, lhs, .. } => {
                    assert!(matches!(**lhs, Expr::Neg(_)));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_comparison_is_nonassociative() {
        let err = parse("x ← 1 = 2 = 3\n").unwrap_err();
        assert!(matches!(err, AlgoError::Syntax { .. }));
    }

    #[test]
    fn test_access_path_is_canonical() {
        let program = parse_ok("Ecrire a.b[i].c\n");
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::Print { args, .. } => match &args[0] {
                Expr::Path(path) => {
                    assert_eq!(path.base, "a");
                    assert_eq!(path.accessors.len(), 3);
                    assert!(matches!(path.accessors[0], Accessor::Field(ref f) if f == "b"));
                    assert!(matches!(path.accessors[1], Accessor::Index(_)));
                    assert!(matches!(path.accessors[2], Accessor::Field(ref f) if f == "c"));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_if_elsif_else() {
        let program = parse_ok(
            "Si x > 0 Alors\n Ecrire 1\nSinonSi x < 0 Alors\n Ecrire 2\nSinon\n Ecrire 3\nFinSi\n",
        );
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::If { arms, otherwise } => {
                assert_eq!(arms.len(), 2);
                assert!(otherwise.is_some());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_for_loop_with_step() {
        let program = parse_ok("Pour i ← 10 à 0 Pas -2\n Ecrire i\ni Suivant\n");
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::For { var, next_var, step, .. } => {
                assert_eq!(var, "i");
                assert_eq!(next_var, "i");
                assert!(step.is_some());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_nested_for_loops() {
        let src = "Pour i ← 0 à 2\n Pour j ← 0 à 2\n  Ecrire i, j\n j Suivant\ni Suivant\n";
        let program = parse_ok(src);
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::For { body, .. } => {
                assert!(matches!(body.stmts[0].kind, StmtKind::For { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_function_declaration() {
        let src = "Fonction carré(n en Entier) en Entier\n Retourne n * n\nFinFonction\n";
        let program = parse_ok(src);
        let block = match program {
            Program::Declarations(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::Function(def) => {
                assert_eq!(def.name, "carré");
                assert_eq!(def.params.len(), 1);
                assert!(!def.is_procedure());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_procedure_with_reference_parameter() {
        let src = "Procédure vider(&t[] en Chaîne)\n Redim t[0]\nFinProcédure\n";
        let program = parse_ok(src);
        let block = match program {
            Program::Declarations(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::Function(def) => {
                assert!(def.is_procedure());
                assert!(def.params[0].by_ref);
                assert!(matches!(def.params[0].ty, TypeSpec::Array { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_library_form() {
        let src = "Librairie\nFonction un() en Entier\n Retourne 1\nFinFonction\nInitialise\nEcrire \"prêt\"\n";
        let program = parse_ok(src);
        match program {
            Program::Library { decls, init } => {
                assert_eq!(decls.stmts.len(), 1);
                assert_eq!(init.expect("init block").stmts.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_table_literal() {
        let src = "t ← Table\n \"a\", 1\n \"b\", 2\nFinTable\n";
        let program = parse_ok(src);
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::Assign { value: Expr::TableLit(entries), .. } => {
                assert_eq!(entries.len(), 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_record_tuple_assignment() {
        let program = parse_ok("p ← 3, 4\n");
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        assert!(matches!(
            block.stmts[0].kind,
            StmtKind::AssignSeq { ref values, .. } if values.len() == 2
        ));
    }

    #[test]
    fn test_namespace_qualified_call() {
        let program = parse_ok("Ecrire util:f(1)\n");
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        match &block.stmts[0].kind {
            StmtKind::Print { args, .. } => match &args[0] {
                Expr::Call { namespace, name, args } => {
                    assert_eq!(namespace.as_deref(), Some("util"));
                    assert_eq!(name, "f");
                    assert_eq!(args.len(), 1);
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_file_statements() {
        let src = "Ouvrir \"d.txt\" sur 1 en Ajout\nEcrireFichier 1, \"x\"\nFermer 1\n";
        let program = parse_ok(src);
        let block = match program {
            Program::Statements(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        assert!(matches!(
            block.stmts[0].kind,
            StmtKind::OpenFile { mode: FileMode::Append, .. }
        ));
        assert!(matches!(block.stmts[1].kind, StmtKind::WriteFile { .. }));
        assert!(matches!(block.stmts[2].kind, StmtKind::CloseFile { .. }));
    }

    #[test]
    fn test_syntax_error_reports_token_and_line() {
        let err = parse("Variable x en\n").unwrap_err();
        match err {
            AlgoError::Syntax { token, line } => {
                assert_eq!(token, "↵");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_premature_eof() {
        let err = parse("Si VRAI Alors\n Ecrire 1\n").unwrap_err();
        assert!(matches!(err, AlgoError::UnexpectedEof));
    }

    #[test]
    fn test_sized_char_declaration() {
        let program = parse_ok("Variable c en Caractère*12\n");
        let block = match program {
            Program::Declarations(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        assert!(matches!(
            block.stmts[0].kind,
            StmtKind::Declare { ref ty, .. } if *ty == TypeSpec::Char(12)
        ));
    }

    #[test]
    fn test_import_with_alias() {
        let program = parse_ok("Importer \"outils\" Alias o\n");
        let block = match program {
            Program::Declarations(block) => block,
            other => panic!("unexpected: {other:?}"),
        };
        assert!(matches!(
            block.stmts[0].kind,
            StmtKind::Import { ref lib, ref alias } if lib == "outils" && alias.as_deref() == Some("o")
        ));
    }
}
