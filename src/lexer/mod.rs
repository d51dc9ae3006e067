mod token;

pub use token::{lookup_keyword, Token, TokenKind};

use std::{iter::Peekable, str::Chars};

/// Converts source text into a stream of [`Token`]s.
///
/// Grounded on the teacher's `Lexer` (`lexer/mod.rs`): a `Peekable<Chars>` cursor with manual
/// line/column bookkeeping. The teacher matched operators through a `lazy_static` longest-match
/// table (`LEX_MAP`); here the same longest-first contract (§4.1) is expressed directly as a
/// cascade of `match`/`peek` calls, since the operator set is small and fixed.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Lex the entire input. The lexer never fails (§4.1): unrecognized characters become
    /// `Illegal` tokens and the parser is left to report them.
    pub fn lex(mut self) -> Vec<Token> {
        let mut tokens = vec![];
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek2(&mut self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.next()
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.chars.next();
        match next {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        next
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\u{a0}') | Some('\n') => {
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.bump();
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => break,
                            Some('*') if self.peek2() == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let (line, column) = (self.line, self.column);

        let Some(c) = self.peek() else {
            return Token::eof(line, column);
        };

        match c {
            '"' => self.lex_string(line, column),
            '0'..='9' => self.lex_number(line, column),
            c if is_ident_start(c) => self.lex_ident(line, column),
            _ => self.lex_operator(line, column),
        }
    }

    fn lex_ident(&mut self, line: usize, column: usize) -> Token {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                value.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let kind = lookup_keyword(&value).unwrap_or(TokenKind::Ident);
        Token::new(kind, value, line, column)
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Token {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let mut kind = TokenKind::Integer;
        if self.peek() == Some('.') {
            if let Some(next) = self.peek2() {
                if next.is_ascii_digit() {
                    kind = TokenKind::Double;
                    value.push('.');
                    self.bump();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_digit() {
                            value.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        Token::new(kind, value, line, column)
    }

    fn lex_string(&mut self, line: usize, column: usize) -> Token {
        self.bump(); // opening quote

        if self.peek() == Some('"') && self.peek2() == Some('"') {
            self.bump();
            self.bump();
            return self.lex_triple_quoted_string(line, column);
        }

        let mut value = String::new();
        let mut is_interpolated = false;
        loop {
            match self.peek() {
                None => break,
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                        None => {}
                    }
                }
                Some('{') if self.peek2() == Some('{') => {
                    value.push('{');
                    self.bump();
                }
                Some(c) => {
                    if c == '{' {
                        is_interpolated = true;
                    }
                    value.push(c);
                    self.bump();
                }
            }
        }

        let kind = if is_interpolated {
            TokenKind::InterpolatedString
        } else {
            TokenKind::String
        };
        Token::new(kind, value, line, column)
    }

    fn lex_triple_quoted_string(&mut self, line: usize, column: usize) -> Token {
        let mut value = String::new();
        loop {
            if self.peek() == Some('"') && self.peek2() == Some('"') {
                let mut clone = self.chars.clone();
                clone.next();
                clone.next();
                if clone.peek() == Some(&'"') {
                    self.bump();
                    self.bump();
                    self.bump();
                    break;
                }
            }
            match self.bump() {
                Some(c) => value.push(c),
                None => break,
            }
        }
        Token::new(TokenKind::String, value, line, column)
    }

    fn lex_operator(&mut self, line: usize, column: usize) -> Token {
        use TokenKind::*;

        // three-character operators
        if self.peek() == Some('.') {
            let mut clone = self.chars.clone();
            clone.next();
            if clone.peek() == Some(&'.') {
                clone.next();
                if clone.peek() == Some(&'.') {
                    self.bump();
                    self.bump();
                    self.bump();
                    return Token::new(DotDotDot, "...", line, column);
                }
            }
        }

        let c = self.bump().expect("caller checked peek().is_some()");

        macro_rules! two_char {
            ($second:expr, $two:expr, $one:expr) => {{
                if self.peek() == Some($second) {
                    self.bump();
                    Token::new($two, format!("{c}{}", $second), line, column)
                } else {
                    Token::new($one, c.to_string(), line, column)
                }
            }};
        }

        match c {
            '=' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token::new(Eq, "==", line, column)
                } else if self.peek() == Some('>') {
                    self.bump();
                    Token::new(FatArrow, "=>", line, column)
                } else {
                    Token::new(Assign, "=", line, column)
                }
            }
            '!' => two_char!('=', NotEq, Bang),
            '>' => two_char!('=', GtEq, Gt),
            '<' => two_char!('=', LtEq, Lt),
            '&' => two_char!('&', And, Amp),
            '|' => {
                if self.peek() == Some('|') {
                    self.bump();
                    Token::new(Or, "||", line, column)
                } else if self.peek() == Some('>') {
                    self.bump();
                    Token::new(PipeOperator, "|>", line, column)
                } else {
                    Token::new(Pipe, "|", line, column)
                }
            }
            '-' => {
                if self.peek() == Some('>') {
                    self.bump();
                    Token::new(Arrow, "->", line, column)
                } else {
                    Token::new(Minus, "-", line, column)
                }
            }
            '+' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Token::new(PlusAssign, "+=", line, column)
                } else {
                    Token::new(Plus, "+", line, column)
                }
            }
            '*' => Token::new(Star, "*", line, column),
            '/' => Token::new(Slash, "/", line, column),
            '%' => Token::new(Percent, "%", line, column),
            '.' => Token::new(Dot, ".", line, column),
            ',' => Token::new(Comma, ",", line, column),
            ':' => Token::new(Colon, ":", line, column),
            ';' => Token::new(Semicolon, ";", line, column),
            '?' => Token::new(Question, "?", line, column),
            '(' => Token::new(LParen, "(", line, column),
            ')' => Token::new(RParen, ")", line, column),
            '[' => Token::new(LBracket, "[", line, column),
            ']' => Token::new(RBracket, "]", line, column),
            '{' => Token::new(LBrace, "{", line, column),
            '}' => Token::new(RBrace, "}", line, column),
            other => Token::new(Illegal, other.to_string(), line, column),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).lex().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_let_binding() {
        use TokenKind::*;
        assert_eq!(
            kinds("let mut x = 42;"),
            vec![Let, Mut, Ident, Assign, Integer, Semicolon, Eof]
        );
    }

    #[test]
    fn lexes_double_literal() {
        let tokens = Lexer::new("3.14").lex();
        assert_eq!(tokens[0].kind, TokenKind::Double);
        assert_eq!(tokens[0].literal, "3.14");
    }

    #[test]
    fn lexes_longest_match_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("a |> b == c && d"),
            vec![Ident, PipeOperator, Ident, Eq, Ident, And, Ident, Eof]
        );
    }

    #[test]
    fn lexes_pipe_vs_record_pipe() {
        use TokenKind::*;
        assert_eq!(kinds("a | b"), vec![Ident, Pipe, Ident, Eof]);
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Lexer::new("let x\n  = 1;").lex();
        let eq = tokens.iter().find(|t| t.kind == TokenKind::Assign).unwrap();
        assert_eq!(eq.line, 2);
        assert_eq!(eq.column, 3);
    }

    #[test]
    fn line_comment_is_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("let x = 1; // comment\nlet y = 2;"), {
            let mut expected = vec![Let, Ident, Assign, Integer, Semicolon];
            expected.extend([Let, Ident, Assign, Integer, Semicolon, Eof]);
            expected
        });
    }

    #[test]
    fn block_comment_is_skipped() {
        use TokenKind::*;
        assert_eq!(
            kinds("1 /* nested-unaware */ + 2"),
            vec![Integer, Plus, Integer, Eof]
        );
    }

    #[test]
    fn illegal_character_continues_lexing() {
        use TokenKind::*;
        assert_eq!(kinds("1 @ 2"), vec![Integer, Illegal, Integer, Eof]);
    }

    #[test]
    fn triple_quoted_string_preserves_newlines() {
        let tokens = Lexer::new("\"\"\"line one\nline two\"\"\"").lex();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, "line one\nline two");
    }

    #[test]
    fn string_escapes_are_decoded() {
        let tokens = Lexer::new(r#""a\nb\tc\"d""#).lex();
        assert_eq!(tokens[0].literal, "a\nb\tc\"d");
    }
}
