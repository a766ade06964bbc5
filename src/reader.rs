//! Prolog surface syntax reader
//!
//! A hand-rolled tokenizer and operator-precedence parser. Terms are read
//! one clause at a time (up to the `.` terminator); the parser consults the
//! machine's operator table, so `op/3` directives affect every later clause
//! of the same source. Double-quoted strings follow the `double_quotes`
//! flag, and character conversion applies outside quoted tokens when
//! enabled.

use std::collections::HashMap;

use crate::engine::exception::{syntax_error, Exception};
use crate::engine::ops::OperatorTable;
use crate::engine::term::Term;
use crate::engine::DoubleQuotes;

/// Everything the reader needs from the machine.
pub struct ReadContext<'a> {
    pub ops: &'a OperatorTable,
    pub double_quotes: DoubleQuotes,
    pub char_conversion: Option<&'a HashMap<char, char>>,
}

/// One successfully read term.
pub struct ReadTerm {
    pub term: Term,
    /// Named variables, in first-occurrence order (`_` is not recorded).
    pub vars: Vec<(String, Term)>,
    /// Byte offset just past the clause terminator.
    pub end: usize,
}

/// Read the next term from `src` starting at byte `offset`. `Ok(None)` means
/// only layout and comments remain.
pub fn read_term(src: &str, offset: usize, ctx: &ReadContext) -> Result<Option<ReadTerm>, Exception> {
    let mut lexer = Lexer::new(&src[offset..], ctx);
    let tokens = lexer.tokenize()?;
    if matches!(tokens.first().map(|t| &t.kind), None | Some(TokenKind::Eof)) {
        return Ok(None);
    }
    let mut parser = Parser { tokens, pos: 0, ctx, vars: Vec::new() };
    let term = parser.term(1200)?;
    let end = match parser.next() {
        Token { kind: TokenKind::End, byte_end, .. } => offset + byte_end,
        t => return Err(syntax_error(&format!("operator expected before {}", t.kind))),
    };
    Ok(Some(ReadTerm { term, vars: parser.vars, end }))
}

/// Read a single goal; the terminator is optional.
pub fn read_goal(src: &str, ctx: &ReadContext) -> Result<ReadTerm, Exception> {
    let mut lexer = Lexer::new(src, ctx);
    let tokens = lexer.tokenize()?;
    if matches!(tokens.first().map(|t| &t.kind), None | Some(TokenKind::Eof)) {
        return Err(syntax_error("unexpected end of input"));
    }
    let mut parser = Parser { tokens, pos: 0, ctx, vars: Vec::new() };
    let term = parser.term(1200)?;
    match parser.next() {
        Token { kind: TokenKind::End, byte_end, .. } | Token { kind: TokenKind::Eof, byte_end, .. } => {
            Ok(ReadTerm { term, vars: parser.vars, end: byte_end })
        }
        t => Err(syntax_error(&format!("operator expected before {}", t.kind))),
    }
}

/// Parse a complete string as a number, as `number_chars/2` needs. Accepts
/// surrounding layout and a leading sign.
pub fn parse_number_text(s: &str) -> Option<Term> {
    let table = OperatorTable::core();
    let ctx = ReadContext { ops: &table, double_quotes: DoubleQuotes::Codes, char_conversion: None };
    let mut lexer = Lexer::new(s, &ctx);
    let tokens = lexer.tokenize().ok()?;
    let mut toks = tokens.iter();
    let mut t = toks.next()?;
    let negative = matches!(&t.kind, TokenKind::Atom(a) if a == "-" );
    if negative {
        t = toks.next()?;
    }
    let n = match &t.kind {
        TokenKind::Int(i) => {
            if negative {
                Term::Integer(i.checked_neg()?)
            } else {
                Term::Integer(*i)
            }
        }
        TokenKind::Float(f) => Term::Float(if negative { -*f } else { *f }),
        _ => return None,
    };
    match toks.next().map(|t| &t.kind) {
        None | Some(TokenKind::Eof) => Some(n),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    /// Unquoted name, quoted atom, symbolic sequence, or solo atom.
    Atom(String),
    Var(String),
    Int(i64),
    Float(f64),
    /// Double-quoted text, interpretation deferred to the flag.
    Str(String),
    /// `(` `)` `[` `]` `{` `}` `,` `|`
    Punct(char),
    /// Clause terminator.
    End,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Atom(a) => write!(f, "{}", a),
            TokenKind::Var(v) => write!(f, "{}", v),
            TokenKind::Int(i) => write!(f, "{}", i),
            TokenKind::Float(x) => write!(f, "{}", x),
            TokenKind::Str(s) => write!(f, "\"{}\"", s),
            TokenKind::Punct(c) => write!(f, "{}", c),
            TokenKind::End => write!(f, "."),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// No layout between the previous token and this one.
    glued: bool,
    /// Byte offset just past this token.
    byte_end: usize,
}

struct Lexer<'a> {
    chars: Vec<(usize, char)>,
    pos: usize,
    src_len: usize,
    conversion: Option<&'a HashMap<char, char>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &str, ctx: &'a ReadContext) -> Self {
        Lexer {
            chars: src.char_indices().collect(),
            pos: 0,
            src_len: src.len(),
            conversion: ctx.char_conversion,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn byte_pos(&self) -> usize {
        self.chars.get(self.pos).map(|&(b, _)| b).unwrap_or(self.src_len)
    }

    /// Character conversion applies outside quoted tokens only.
    fn convert(&self, c: char) -> char {
        match self.conversion {
            Some(table) => table.get(&c).copied().unwrap_or(c),
            None => c,
        }
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, Exception> {
        let mut out = Vec::new();
        loop {
            let glued = !self.skip_layout()?;
            let Some(c) = self.peek() else {
                out.push(Token { kind: TokenKind::Eof, glued, byte_end: self.byte_pos() });
                return Ok(out);
            };
            let c = self.convert(c);
            let kind = match c {
                '(' | ')' | '[' | ']' | '{' | '}' | ',' | '|' => {
                    self.bump();
                    TokenKind::Punct(c)
                }
                '!' | ';' => {
                    self.bump();
                    TokenKind::Atom(c.to_string())
                }
                '\'' => self.quoted('\'').map(TokenKind::Atom)?,
                '"' => self.quoted('"').map(TokenKind::Str)?,
                '0'..='9' => self.number()?,
                c if c.is_alphabetic() && c.is_lowercase() => {
                    TokenKind::Atom(self.name())
                }
                c if c == '_' || (c.is_alphabetic() && c.is_uppercase()) => {
                    TokenKind::Var(self.name())
                }
                '.' => {
                    // terminator iff followed by layout, a comment, or the end
                    match self.peek_at(1) {
                        None => {
                            self.bump();
                            TokenKind::End
                        }
                        Some(n) if n.is_whitespace() || n == '%' => {
                            self.bump();
                            TokenKind::End
                        }
                        _ => TokenKind::Atom(self.symbolic()),
                    }
                }
                c if is_symbol_char(c) => TokenKind::Atom(self.symbolic()),
                c => return Err(syntax_error(&format!("unexpected character: {}", c))),
            };
            let done = matches!(kind, TokenKind::End);
            out.push(Token { kind, glued, byte_end: self.byte_pos() });
            if done {
                return Ok(out);
            }
        }
    }

    /// Skip whitespace and comments; true if anything was skipped.
    fn skip_layout(&mut self) -> Result<bool, Exception> {
        let mut skipped = false;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                    skipped = true;
                }
                Some('%') => {
                    skipped = true;
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    skipped = true;
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(syntax_error("unterminated block comment")),
                        }
                    }
                }
                _ => return Ok(skipped),
            }
        }
    }

    fn name(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            let c = self.convert(c);
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn symbolic(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            let c = self.convert(c);
            if is_symbol_char(c) {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn number(&mut self) -> Result<TokenKind, Exception> {
        // radix and character-code integers
        if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('\'') => {
                    self.bump();
                    self.bump();
                    return Ok(TokenKind::Int(self.char_code()?));
                }
                Some('x') | Some('X') => return self.radix(16, 2),
                Some('o') | Some('O') => return self.radix(8, 2),
                Some('b') | Some('B') => return self.radix(2, 2),
                _ => {}
            }
        }
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            s.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    s.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut n = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                n = 2;
            }
            if self.peek_at(n).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                s.push('e');
                self.bump();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    s.push(sign);
                    self.bump();
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        s.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        if is_float {
            s.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| syntax_error("malformed float"))
        } else {
            s.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| syntax_error("integer out of range"))
        }
    }

    fn radix(&mut self, base: u32, skip: usize) -> Result<TokenKind, Exception> {
        for _ in 0..skip {
            self.bump();
        }
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_digit(base) {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if s.is_empty() {
            return Err(syntax_error("missing digits after radix prefix"));
        }
        i64::from_str_radix(&s, base)
            .map(TokenKind::Int)
            .map_err(|_| syntax_error("integer out of range"))
    }

    /// The character of a `0'c` literal.
    fn char_code(&mut self) -> Result<i64, Exception> {
        match self.bump() {
            None => Err(syntax_error("unexpected end in character code")),
            Some('\\') => Ok(self.escape('\'')? as i64),
            Some('\'') => {
                // 0''' denotes the quote character itself
                if self.peek() == Some('\'') {
                    self.bump();
                    Ok('\'' as i64)
                } else {
                    Err(syntax_error("malformed character code"))
                }
            }
            Some(c) => Ok(c as i64),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, Exception> {
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(syntax_error("unterminated quoted token")),
                Some(c) if c == quote => {
                    // a doubled quote is a literal quote
                    if self.peek() == Some(quote) {
                        self.bump();
                        s.push(quote);
                    } else {
                        return Ok(s);
                    }
                }
                Some('\\') => {
                    // a backslash-newline continues the token
                    if self.peek() == Some('\n') {
                        self.bump();
                        continue;
                    }
                    s.push(self.escape(quote)?);
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn escape(&mut self, quote: char) -> Result<char, Exception> {
        match self.bump() {
            None => Err(syntax_error("unterminated escape sequence")),
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('a') => Ok('\x07'),
            Some('b') => Ok('\x08'),
            Some('f') => Ok('\x0c'),
            Some('v') => Ok('\x0b'),
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('`') => Ok('`'),
            Some('x') => self.coded_escape(16),
            Some(c) if c.is_digit(8) => {
                self.pos -= 1;
                self.coded_escape(8)
            }
            Some(c) if c == quote => Ok(c),
            Some(c) => Err(syntax_error(&format!("unknown escape: \\{}", c))),
        }
    }

    fn coded_escape(&mut self, base: u32) -> Result<char, Exception> {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_digit(base) {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek() != Some('\\') || s.is_empty() {
            return Err(syntax_error("malformed coded escape"));
        }
        self.bump();
        u32::from_str_radix(&s, base)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| syntax_error("escape out of range"))
    }
}

pub(crate) fn is_symbol_char(c: char) -> bool {
    crate::writer::is_symbol_char(c)
}

struct Parser<'a, 'c> {
    tokens: Vec<Token>,
    pos: usize,
    ctx: &'a ReadContext<'c>,
    vars: Vec<(String, Term)>,
}

impl Parser<'_, '_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn next(&mut self) -> Token {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_punct(&mut self, c: char) -> Result<(), Exception> {
        match self.next() {
            Token { kind: TokenKind::Punct(p), .. } if p == c => Ok(()),
            t => Err(syntax_error(&format!("expected {} before {}", c, t.kind))),
        }
    }

    fn variable(&mut self, name: &str) -> Term {
        if name == "_" {
            return Term::fresh_var();
        }
        if let Some((_, t)) = self.vars.iter().find(|(n, _)| n == name) {
            return t.clone();
        }
        let t = Term::fresh_var();
        self.vars.push((name.to_string(), t.clone()));
        t
    }

    /// Parse a term whose priority does not exceed `max_prec`.
    fn term(&mut self, max_prec: u16) -> Result<Term, Exception> {
        let (mut left, mut left_prec) = self.primary(max_prec)?;
        loop {
            match self.peek_kind().clone() {
                TokenKind::Atom(name) => {
                    let atom = crate::engine::term::Atom::new(&name);
                    if let Some(def) = self.ctx.ops.infix(atom) {
                        if def.priority <= max_prec && left_prec <= def.left_max() {
                            self.pos += 1;
                            let right = self.term(def.right_max())?;
                            left = Term::compound(atom, vec![left, right]);
                            left_prec = def.priority;
                            continue;
                        }
                    }
                    if let Some(def) = self.ctx.ops.postfix(atom) {
                        if def.priority <= max_prec && left_prec <= def.left_max() {
                            self.pos += 1;
                            left = Term::compound(atom, vec![left]);
                            left_prec = def.priority;
                            continue;
                        }
                    }
                    return Ok(left);
                }
                TokenKind::Punct(',') if max_prec >= 1000 && left_prec < 1000 => {
                    self.pos += 1;
                    let right = self.term(1000)?;
                    left = Term::compound(",", vec![left, right]);
                    left_prec = 1000;
                }
                TokenKind::Punct('|') if max_prec >= 1100 && left_prec < 1100 => {
                    // outside list context, | reads as disjunction
                    self.pos += 1;
                    let right = self.term(1100)?;
                    left = Term::compound(";", vec![left, right]);
                    left_prec = 1100;
                }
                _ => return Ok(left),
            }
        }
    }

    /// Parse one operand; returns the term and its own priority.
    fn primary(&mut self, max_prec: u16) -> Result<(Term, u16), Exception> {
        let t = self.next();
        match t.kind {
            TokenKind::Int(i) => Ok((Term::Integer(i), 0)),
            TokenKind::Float(f) => Ok((Term::Float(f), 0)),
            TokenKind::Var(name) => Ok((self.variable(&name), 0)),
            TokenKind::Str(s) => Ok((self.string_term(&s), 0)),
            TokenKind::Punct('(') => {
                let inner = self.term(1200)?;
                self.expect_punct(')')?;
                Ok((inner, 0))
            }
            TokenKind::Punct('[') => {
                if matches!(self.peek_kind(), TokenKind::Punct(']')) {
                    self.pos += 1;
                    return Ok((Term::nil(), 0));
                }
                let list = self.list_items()?;
                self.expect_punct(']')?;
                Ok((list, 0))
            }
            TokenKind::Punct('{') => {
                if matches!(self.peek_kind(), TokenKind::Punct('}')) {
                    self.pos += 1;
                    return Ok((Term::atom("{}"), 0));
                }
                let inner = self.term(1200)?;
                self.expect_punct('}')?;
                Ok((Term::compound("{}", vec![inner]), 0))
            }
            TokenKind::Atom(name) => self.atom_or_compound(&name, max_prec),
            kind => Err(syntax_error(&format!("unexpected token: {}", kind))),
        }
    }

    fn atom_or_compound(&mut self, name: &str, max_prec: u16) -> Result<(Term, u16), Exception> {
        // functor application binds tighter than anything: f( with no layout
        if matches!(self.peek_kind(), TokenKind::Punct('(')) && self.peek().glued {
            self.pos += 1;
            let mut args = vec![self.term(999)?];
            while matches!(self.peek_kind(), TokenKind::Punct(',')) {
                self.pos += 1;
                args.push(self.term(999)?);
            }
            self.expect_punct(')')?;
            return Ok((Term::compound(name, args), 0));
        }
        let atom = crate::engine::term::Atom::new(name);
        // a negative numeric literal: - glued to the number
        if name == "-" {
            if let TokenKind::Int(i) = self.peek_kind() {
                if self.peek().glued {
                    let i = *i;
                    self.pos += 1;
                    return Ok((Term::Integer(-i), 0));
                }
            }
            if let TokenKind::Float(f) = self.peek_kind() {
                if self.peek().glued {
                    let f = *f;
                    self.pos += 1;
                    return Ok((Term::Float(-f), 0));
                }
            }
        }
        if let Some(def) = self.ctx.ops.prefix(atom) {
            if def.priority <= max_prec && self.starts_term() {
                let arg = self.term(def.right_max())?;
                return Ok((Term::compound(atom, vec![arg]), def.priority));
            }
        }
        // a bare operator atom as an operand keeps its priority
        let prec = self
            .ctx
            .ops
            .infix(atom)
            .or_else(|| self.ctx.ops.prefix(atom))
            .or_else(|| self.ctx.ops.postfix(atom))
            .map(|d| d.priority)
            .unwrap_or(0);
        Ok((Term::Atom(atom), prec))
    }

    /// Whether the next token can begin an operand (so a prefix operator
    /// actually applies).
    fn starts_term(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Var(_)
            | TokenKind::Str(_)
            | TokenKind::Punct('(')
            | TokenKind::Punct('[')
            | TokenKind::Punct('{') => true,
            TokenKind::Atom(a) => {
                // an infix operator cannot start a term unless it is also
                // prefix or a plain atom
                let atom = crate::engine::term::Atom::new(a);
                !(self.ctx.ops.infix(atom).is_some() && self.ctx.ops.prefix(atom).is_none())
            }
            _ => false,
        }
    }

    fn list_items(&mut self) -> Result<Term, Exception> {
        let mut items = vec![self.term(999)?];
        loop {
            match self.peek_kind() {
                TokenKind::Punct(',') => {
                    self.pos += 1;
                    items.push(self.term(999)?);
                }
                TokenKind::Punct('|') => {
                    self.pos += 1;
                    let tail = self.term(999)?;
                    return Ok(Term::partial_list(tail, items));
                }
                _ => return Ok(Term::list(items)),
            }
        }
    }

    fn string_term(&self, s: &str) -> Term {
        match self.ctx.double_quotes {
            DoubleQuotes::Codes => {
                Term::list(s.chars().map(|c| Term::Integer(c as i64)).collect())
            }
            DoubleQuotes::Chars => {
                Term::list(s.chars().map(|c| Term::atom(&c.to_string())).collect())
            }
            DoubleQuotes::Atom => Term::atom(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::env::Env;

    fn ctx(table: &OperatorTable) -> ReadContext<'_> {
        ReadContext { ops: table, double_quotes: DoubleQuotes::Codes, char_conversion: None }
    }

    fn parse(s: &str) -> Term {
        let table = OperatorTable::core();
        read_goal(s, &ctx(&table)).unwrap().term
    }

    fn show(s: &str) -> String {
        let env = Env::new();
        let table = OperatorTable::core();
        crate::writer::to_string(
            &parse(s),
            &env,
            crate::writer::WriteOptions::canonical(),
            Some(&table),
        )
    }

    #[test]
    fn test_atoms_and_numbers() {
        assert_eq!(parse("foo."), Term::atom("foo"));
        assert_eq!(parse("42."), Term::Integer(42));
        assert_eq!(parse("3.25."), Term::Float(3.25));
        assert_eq!(parse("-7."), Term::Integer(-7));
        assert_eq!(parse("0'a."), Term::Integer(97));
        assert_eq!(parse("0x1f."), Term::Integer(31));
        assert_eq!(parse("0o17."), Term::Integer(15));
        assert_eq!(parse("0b101."), Term::Integer(5));
        assert_eq!(parse("1.0e3."), Term::Float(1000.0));
    }

    #[test]
    fn test_quoted_atoms_and_escapes() {
        assert_eq!(parse("'hello world'."), Term::atom("hello world"));
        assert_eq!(parse("'it''s'."), Term::atom("it's"));
        assert_eq!(parse("'a\\nb'."), Term::atom("a\nb"));
        assert_eq!(parse("'\\x41\\'."), Term::atom("A"));
    }

    #[test]
    fn test_compound_terms() {
        assert_eq!(show("f(a, b)."), "f(a,b)");
        assert_eq!(show("f(g(1), [a])."), "f(g(1),[a])");
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(show("1 + 2 * 3."), "+(1,*(2,3))");
        assert_eq!(show("(1 + 2) * 3."), "*(+(1,2),3)");
        // yfx chains left
        assert_eq!(show("1 - 2 - 3."), "-(-(1,2),3)");
        // xfy chains right
        assert_eq!(show("a, b, c."), "','(a,','(b,c))");
        let t = parse("X is 1 + 1.");
        let c = t.as_functor("is", 2).unwrap();
        assert!(matches!(c.args[0], Term::Variable(_)));
        assert!(c.args[1].as_functor("+", 2).is_some());
    }

    #[test]
    fn test_rule_syntax() {
        let t = parse("p(X) :- q(X), r(X).");
        let c = t.as_functor(":-", 2).unwrap();
        assert!(c.args[0].as_functor("p", 1).is_some());
        assert!(c.args[1].as_functor(",", 2).is_some());
    }

    #[test]
    fn test_lists() {
        let t = parse("[1, 2, 3].");
        let c = t.as_functor(".", 2).unwrap();
        assert_eq!(c.args[0], Term::Integer(1));
        let t = parse("[H | T].");
        let c = t.as_functor(".", 2).unwrap();
        assert!(matches!(c.args[0], Term::Variable(_)));
        assert!(matches!(c.args[1], Term::Variable(_)));
        assert_eq!(parse("[]."), Term::nil());
    }

    #[test]
    fn test_variables_share_by_name() {
        let t = parse("f(X, Y, X).");
        let c = t.as_functor("f", 3).unwrap();
        assert_eq!(c.args[0], c.args[2]);
        assert_ne!(c.args[0], c.args[1]);
        // underscore is always fresh
        let t = parse("g(_, _).");
        let c = t.as_functor("g", 2).unwrap();
        assert_ne!(c.args[0], c.args[1]);
    }

    #[test]
    fn test_double_quotes_modes() {
        let table = OperatorTable::core();
        let mut c = ctx(&table);
        assert_eq!(
            read_goal("\"ab\".", &c).unwrap().term,
            Term::list(vec![Term::Integer(97), Term::Integer(98)])
        );
        c.double_quotes = DoubleQuotes::Chars;
        assert_eq!(
            read_goal("\"ab\".", &c).unwrap().term,
            Term::list(vec![Term::atom("a"), Term::atom("b")])
        );
        c.double_quotes = DoubleQuotes::Atom;
        assert_eq!(read_goal("\"ab\".", &c).unwrap().term, Term::atom("ab"));
    }

    #[test]
    fn test_comments() {
        let table = OperatorTable::core();
        let src = "% a line comment\n/* a block */ foo. bar.";
        let r = read_term(src, 0, &ctx(&table)).unwrap().unwrap();
        assert_eq!(r.term, Term::atom("foo"));
        let r2 = read_term(src, r.end, &ctx(&table)).unwrap().unwrap();
        assert_eq!(r2.term, Term::atom("bar"));
        assert!(read_term(src, r2.end, &ctx(&table)).unwrap().is_none());
    }

    #[test]
    fn test_curly_and_negation() {
        assert_eq!(show("{a, b}."), "{}(','(a,b))");
        assert_eq!(show("\\+ a."), "\\+(a)");
    }

    #[test]
    fn test_if_then_else_shape() {
        assert_eq!(show("(a -> b ; c)."), ";(->(a,b),c)");
    }

    #[test]
    fn test_prefix_minus_on_expression() {
        assert_eq!(show("- (1)."), "-(1)");
        assert_eq!(show("1 - -2."), "-(1,-2)");
        assert_eq!(show("a - b."), "-(a,b)");
    }

    #[test]
    fn test_syntax_errors() {
        let table = OperatorTable::core();
        assert!(read_goal("f(a.", &ctx(&table)).is_err());
        assert!(read_goal(")", &ctx(&table)).is_err());
        assert!(read_goal("'unterminated.", &ctx(&table)).is_err());
    }

    #[test]
    fn test_parse_number_text() {
        assert_eq!(parse_number_text("42"), Some(Term::Integer(42)));
        assert_eq!(parse_number_text(" -3 "), Some(Term::Integer(-3)));
        assert_eq!(parse_number_text("2.5"), Some(Term::Float(2.5)));
        assert_eq!(parse_number_text("abc"), None);
        assert_eq!(parse_number_text("1 2"), None);
    }

    #[test]
    fn test_missing_terminator() {
        let table = OperatorTable::core();
        assert!(read_term("foo", 0, &ctx(&table)).is_err());
    }

    #[test]
    fn test_operator_as_argument() {
        // an operator atom inside parens is an ordinary atom
        let t = parse("f((;), (+)).");
        let c = t.as_functor("f", 2).unwrap();
        assert_eq!(c.args[0], Term::atom(";"));
        assert_eq!(c.args[1], Term::atom("+"));
    }
}
