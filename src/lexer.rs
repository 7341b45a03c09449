//! Lexical analysis.
//!
//! Turns source text into a finite token sequence, tracking row/column as it
//! advances. Escape decoding happens here for string and character literals;
//! adjacent string literals are left unmerged for the parser. A trivial
//! object-macro substitution (`#define NAME tokens…`, no parameters) is
//! applied before tokens reach the parser.

use crate::error::{CResult, CompilerError};
use crate::escape::decode_escapes;
use crate::options::COptions;
use crate::source::SourceLoc;
use hashbrown::HashMap;
use log::trace;
use symbol_table::GlobalSymbol as Symbol;

/// How many `l`s an integer literal carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Longness {
    #[default]
    None,
    Long,
    LongLong,
}

/// Type hint recorded from an integer literal's suffix (`u`, `l`, `ll`,
/// `ull` and friends, case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntSuffix {
    pub unsigned: bool,
    pub longness: Longness,
}

/// Token kinds for the C subset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    Identifier(Symbol),
    IntLiteral { value: i64, suffix: IntSuffix },
    FloatLiteral(f64),
    CharLiteral(u8),
    StringLiteral(Symbol), // escape-decoded body

    // Keywords
    Auto,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Register,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Increment,
    Decrement,
    Amp,
    Pipe,
    Caret,
    Bang,
    Tilde,
    LeftShift,
    RightShift,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    LeftShiftAssign,
    RightShiftAssign,
    LogicalAnd,
    LogicalOr,
    Arrow,
    Dot,
    Question,
    Colon,

    // Punctuation
    Comma,
    Semicolon,
    Ellipsis,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    EndOfFile,
}

impl TokenKind {
    /// Source spelling used in "Expected …" diagnostics.
    pub fn text(&self) -> &'static str {
        match self {
            TokenKind::Identifier(_) => "identifier",
            TokenKind::IntLiteral { .. } => "integer literal",
            TokenKind::FloatLiteral(_) => "float literal",
            TokenKind::CharLiteral(_) => "character literal",
            TokenKind::StringLiteral(_) => "string literal",
            TokenKind::Auto => "auto",
            TokenKind::Break => "break",
            TokenKind::Case => "case",
            TokenKind::Char => "char",
            TokenKind::Const => "const",
            TokenKind::Continue => "continue",
            TokenKind::Default => "default",
            TokenKind::Do => "do",
            TokenKind::Double => "double",
            TokenKind::Else => "else",
            TokenKind::Enum => "enum",
            TokenKind::Extern => "extern",
            TokenKind::Float => "float",
            TokenKind::For => "for",
            TokenKind::Goto => "goto",
            TokenKind::If => "if",
            TokenKind::Inline => "inline",
            TokenKind::Int => "int",
            TokenKind::Long => "long",
            TokenKind::Register => "register",
            TokenKind::Return => "return",
            TokenKind::Short => "short",
            TokenKind::Signed => "signed",
            TokenKind::Sizeof => "sizeof",
            TokenKind::Static => "static",
            TokenKind::Struct => "struct",
            TokenKind::Switch => "switch",
            TokenKind::Typedef => "typedef",
            TokenKind::Union => "union",
            TokenKind::Unsigned => "unsigned",
            TokenKind::Void => "void",
            TokenKind::Volatile => "volatile",
            TokenKind::While => "while",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Increment => "++",
            TokenKind::Decrement => "--",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::LeftShift => "<<",
            TokenKind::RightShift => ">>",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterEqual => ">=",
            TokenKind::EqualEqual => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::PercentAssign => "%=",
            TokenKind::AmpAssign => "&=",
            TokenKind::PipeAssign => "|=",
            TokenKind::CaretAssign => "^=",
            TokenKind::LeftShiftAssign => "<<=",
            TokenKind::RightShiftAssign => ">>=",
            TokenKind::LogicalAnd => "&&",
            TokenKind::LogicalOr => "||",
            TokenKind::Arrow => "->",
            TokenKind::Dot => ".",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Ellipsis => "...",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::EndOfFile => "end of file",
        }
    }
}

/// A token with its source location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLoc,
}

fn keyword_map() -> &'static HashMap<&'static str, TokenKind> {
    static KEYWORDS: std::sync::OnceLock<HashMap<&'static str, TokenKind>> =
        std::sync::OnceLock::new();
    KEYWORDS.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert("auto", TokenKind::Auto);
        m.insert("break", TokenKind::Break);
        m.insert("case", TokenKind::Case);
        m.insert("char", TokenKind::Char);
        m.insert("const", TokenKind::Const);
        m.insert("continue", TokenKind::Continue);
        m.insert("default", TokenKind::Default);
        m.insert("do", TokenKind::Do);
        m.insert("double", TokenKind::Double);
        m.insert("else", TokenKind::Else);
        m.insert("enum", TokenKind::Enum);
        m.insert("extern", TokenKind::Extern);
        m.insert("float", TokenKind::Float);
        m.insert("for", TokenKind::For);
        m.insert("goto", TokenKind::Goto);
        m.insert("if", TokenKind::If);
        m.insert("inline", TokenKind::Inline);
        m.insert("int", TokenKind::Int);
        m.insert("long", TokenKind::Long);
        m.insert("register", TokenKind::Register);
        m.insert("return", TokenKind::Return);
        m.insert("short", TokenKind::Short);
        m.insert("signed", TokenKind::Signed);
        m.insert("sizeof", TokenKind::Sizeof);
        m.insert("static", TokenKind::Static);
        m.insert("struct", TokenKind::Struct);
        m.insert("switch", TokenKind::Switch);
        m.insert("typedef", TokenKind::Typedef);
        m.insert("union", TokenKind::Union);
        m.insert("unsigned", TokenKind::Unsigned);
        m.insert("void", TokenKind::Void);
        m.insert("volatile", TokenKind::Volatile);
        m.insert("while", TokenKind::While);
        m
    })
}

const TRIGRAPHS: [(char, char); 9] = [
    ('=', '#'),
    ('/', '\\'),
    ('\'', '^'),
    ('(', '['),
    (')', ']'),
    ('!', '|'),
    ('<', '{'),
    ('>', '}'),
    ('-', '~'),
];

fn translate_trigraphs(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i] == '?' && chars[i + 1] == '?' {
            if let Some(&(_, repl)) = TRIGRAPHS.iter().find(|(c, _)| *c == chars[i + 2]) {
                out.push(repl);
                i += 3;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Lexer state machine over one translation unit.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    row: u32,
    column: u32,
    line_has_token: bool,
    macros: HashMap<Symbol, Vec<TokenKind>>,
    expanding: bool,
}

impl Lexer {
    pub fn new(source: &str, options: &COptions) -> Self {
        let text = if options.enable_trigraphs {
            translate_trigraphs(source)
        } else {
            source.to_string()
        };
        Lexer {
            chars: text.chars().collect(),
            pos: 0,
            row: 1,
            column: 1,
            line_has_token: false,
            macros: HashMap::new(),
            expanding: false,
        }
    }

    fn loc(&self) -> SourceLoc {
        SourceLoc::new(self.row, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.row += 1;
            self.column = 1;
            self.line_has_token = false;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Produce the complete token sequence, ending with `EndOfFile`.
    pub fn tokenize(mut self) -> CResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let loc = self.loc();
            let Some(ch) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::EndOfFile,
                    loc,
                });
                return Ok(tokens);
            };

            if ch == '#' && !self.line_has_token && !self.expanding {
                self.advance();
                self.lex_directive(loc)?;
                continue;
            }
            self.line_has_token = true;

            if ch.is_ascii_alphabetic() || ch == '_' {
                let name = self.lex_word();
                if let Some(kind) = keyword_map().get(name.as_str()).copied() {
                    tokens.push(Token { kind, loc });
                } else {
                    let symbol = Symbol::from(name.as_str());
                    if let Some(replacement) = self.macros.get(&symbol) {
                        trace!("expanding macro '{}'", name);
                        for kind in replacement {
                            tokens.push(Token { kind: *kind, loc });
                        }
                    } else {
                        tokens.push(Token {
                            kind: TokenKind::Identifier(symbol),
                            loc,
                        });
                    }
                }
            } else if ch.is_ascii_digit() {
                let kind = self.lex_number(loc)?;
                tokens.push(Token { kind, loc });
            } else if ch == '"' {
                let kind = self.lex_string(loc)?;
                tokens.push(Token { kind, loc });
            } else if ch == '\'' {
                let kind = self.lex_char(loc)?;
                tokens.push(Token { kind, loc });
            } else {
                let kind = self.lex_punctuator(loc)?;
                tokens.push(Token { kind, loc });
            }
        }
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> CResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.loc();
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                            None => {
                                return Err(CompilerError::lexical("Unterminated comment", start));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    /// Handle a `#` directive. Only parameterless `#define` is supported;
    /// everything else is a lexical error.
    fn lex_directive(&mut self, loc: SourceLoc) -> CResult<()> {
        while matches!(self.peek(), Some(c) if c.is_whitespace() && c != '\n') {
            self.advance();
        }
        let word = self.lex_word();
        if word != "define" {
            return Err(CompilerError::lexical(
                format!("Unsupported directive '#{}'", word),
                loc,
            ));
        }
        while matches!(self.peek(), Some(c) if c.is_whitespace() && c != '\n') {
            self.advance();
        }
        let name_loc = self.loc();
        let name = self.lex_word();
        if name.is_empty() {
            return Err(CompilerError::lexical("Expected macro name", name_loc));
        }

        // Capture the remainder of the line and lex it in isolation; the
        // replacement tokens take the use-site location when spliced.
        let mut body = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            body.push(c);
            self.advance();
        }
        let mut sub = Lexer {
            chars: body.chars().collect(),
            pos: 0,
            row: self.row,
            column: 1,
            line_has_token: true,
            macros: HashMap::new(),
            expanding: true,
        };
        let replacement: Vec<TokenKind> = sub
            .tokenize()?
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::EndOfFile))
            .collect();
        trace!("#define {} -> {} tokens", name, replacement.len());
        self.macros.insert(Symbol::from(name.as_str()), replacement);
        Ok(())
    }

    fn lex_number(&mut self, loc: SourceLoc) -> CResult<TokenKind> {
        let mut text = String::new();
        let hex = self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X'));
        if hex {
            text.push(self.advance().unwrap());
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                text.push(self.advance().unwrap());
            }
        } else {
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
            // Decimal float forms: 1.5, 2e10, 3.e-4
            if self.peek() == Some('.') || matches!(self.peek(), Some('e') | Some('E')) {
                return self.lex_float_rest(text, loc);
            }
        }

        let suffix = self.lex_int_suffix(loc)?;
        let value = parse_int_text(&text, hex)
            .ok_or_else(|| CompilerError::lexical(format!("Invalid integer constant '{}'", text), loc))?;
        Ok(TokenKind::IntLiteral { value, suffix })
    }

    fn lex_float_rest(&mut self, mut text: String, loc: SourceLoc) -> CResult<TokenKind> {
        if self.peek() == Some('.') {
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            text.push(self.advance().unwrap());
            if matches!(self.peek(), Some('+') | Some('-')) {
                text.push(self.advance().unwrap());
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        // Optional f/F/l/L suffix, discarded beyond the type hint.
        if matches!(self.peek(), Some('f') | Some('F') | Some('l') | Some('L')) {
            self.advance();
        }
        let value: f64 = text
            .parse()
            .map_err(|_| CompilerError::lexical(format!("Invalid float constant '{}'", text), loc))?;
        Ok(TokenKind::FloatLiteral(value))
    }

    fn lex_int_suffix(&mut self, loc: SourceLoc) -> CResult<IntSuffix> {
        let mut suffix = IntSuffix::default();
        let mut l_count = 0;
        while let Some(c) = self.peek() {
            match c {
                'u' | 'U' => {
                    if suffix.unsigned {
                        return Err(CompilerError::lexical("Invalid integer suffix", loc));
                    }
                    suffix.unsigned = true;
                    self.advance();
                }
                'l' | 'L' => {
                    if l_count >= 2 {
                        return Err(CompilerError::lexical("Invalid integer suffix", loc));
                    }
                    l_count += 1;
                    self.advance();
                }
                _ => break,
            }
        }
        suffix.longness = match l_count {
            0 => Longness::None,
            1 => Longness::Long,
            _ => Longness::LongLong,
        };
        Ok(suffix)
    }

    fn lex_string(&mut self, loc: SourceLoc) -> CResult<TokenKind> {
        self.advance(); // opening quote
        let raw = self.lex_literal_body('"', loc)?;
        let decoded = decode_escapes(&raw, loc)?;
        Ok(TokenKind::StringLiteral(Symbol::from(decoded.as_str())))
    }

    fn lex_char(&mut self, loc: SourceLoc) -> CResult<TokenKind> {
        self.advance(); // opening quote
        let raw = self.lex_literal_body('\'', loc)?;
        let decoded = decode_escapes(&raw, loc)?;
        let ch = decoded
            .chars()
            .next()
            .ok_or_else(|| CompilerError::lexical("Empty character constant", loc))?;
        let value = ch as u32;
        if value > 0xFF {
            return Err(CompilerError::lexical("Character constant out of range", loc));
        }
        Ok(TokenKind::CharLiteral(value as u8))
    }

    /// Collect the raw body of a quoted literal, keeping escape sequences
    /// intact for the decoder.
    fn lex_literal_body(&mut self, quote: char, loc: SourceLoc) -> CResult<String> {
        let mut raw = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(raw);
                }
                Some('\\') => {
                    raw.push(self.advance().unwrap());
                    if let Some(c) = self.advance() {
                        raw.push(c);
                    }
                }
                Some('\n') | None => {
                    return Err(CompilerError::lexical("Unterminated literal", loc));
                }
                Some(_) => {
                    raw.push(self.advance().unwrap());
                }
            }
        }
    }

    fn lex_punctuator(&mut self, loc: SourceLoc) -> CResult<TokenKind> {
        let a = self.advance().unwrap();
        let b = self.peek();
        let c = self.peek_at(1);

        macro_rules! two {
            ($kind:expr) => {{
                self.advance();
                return Ok($kind);
            }};
        }

        match (a, b, c) {
            ('.', Some('.'), Some('.')) => {
                self.advance();
                self.advance();
                Ok(TokenKind::Ellipsis)
            }
            ('<', Some('<'), Some('=')) => {
                self.advance();
                self.advance();
                Ok(TokenKind::LeftShiftAssign)
            }
            ('>', Some('>'), Some('=')) => {
                self.advance();
                self.advance();
                Ok(TokenKind::RightShiftAssign)
            }
            ('+', Some('+'), _) => two!(TokenKind::Increment),
            ('-', Some('-'), _) => two!(TokenKind::Decrement),
            ('+', Some('='), _) => two!(TokenKind::PlusAssign),
            ('-', Some('='), _) => two!(TokenKind::MinusAssign),
            ('*', Some('='), _) => two!(TokenKind::StarAssign),
            ('/', Some('='), _) => two!(TokenKind::SlashAssign),
            ('%', Some('='), _) => two!(TokenKind::PercentAssign),
            ('&', Some('='), _) => two!(TokenKind::AmpAssign),
            ('|', Some('='), _) => two!(TokenKind::PipeAssign),
            ('^', Some('='), _) => two!(TokenKind::CaretAssign),
            ('&', Some('&'), _) => two!(TokenKind::LogicalAnd),
            ('|', Some('|'), _) => two!(TokenKind::LogicalOr),
            ('<', Some('<'), _) => two!(TokenKind::LeftShift),
            ('>', Some('>'), _) => two!(TokenKind::RightShift),
            ('<', Some('='), _) => two!(TokenKind::LessEqual),
            ('>', Some('='), _) => two!(TokenKind::GreaterEqual),
            ('=', Some('='), _) => two!(TokenKind::EqualEqual),
            ('!', Some('='), _) => two!(TokenKind::NotEqual),
            ('-', Some('>'), _) => two!(TokenKind::Arrow),
            ('+', _, _) => Ok(TokenKind::Plus),
            ('-', _, _) => Ok(TokenKind::Minus),
            ('*', _, _) => Ok(TokenKind::Star),
            ('/', _, _) => Ok(TokenKind::Slash),
            ('%', _, _) => Ok(TokenKind::Percent),
            ('&', _, _) => Ok(TokenKind::Amp),
            ('|', _, _) => Ok(TokenKind::Pipe),
            ('^', _, _) => Ok(TokenKind::Caret),
            ('!', _, _) => Ok(TokenKind::Bang),
            ('~', _, _) => Ok(TokenKind::Tilde),
            ('<', _, _) => Ok(TokenKind::Less),
            ('>', _, _) => Ok(TokenKind::Greater),
            ('=', _, _) => Ok(TokenKind::Assign),
            ('?', _, _) => Ok(TokenKind::Question),
            (':', _, _) => Ok(TokenKind::Colon),
            (',', _, _) => Ok(TokenKind::Comma),
            (';', _, _) => Ok(TokenKind::Semicolon),
            ('.', _, _) => Ok(TokenKind::Dot),
            ('(', _, _) => Ok(TokenKind::LeftParen),
            (')', _, _) => Ok(TokenKind::RightParen),
            ('[', _, _) => Ok(TokenKind::LeftBracket),
            (']', _, _) => Ok(TokenKind::RightBracket),
            ('{', _, _) => Ok(TokenKind::LeftBrace),
            ('}', _, _) => Ok(TokenKind::RightBrace),
            (other, _, _) => Err(CompilerError::lexical(
                format!("Unexpected character '{}'", other),
                loc,
            )),
        }
    }
}

fn parse_int_text(text: &str, hex: bool) -> Option<i64> {
    let (digits, base) = if hex {
        (&text[2..], 16u64)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8u64)
    } else {
        (&text[..], 10u64)
    };
    if digits.is_empty() {
        return if text == "0" { Some(0) } else { None };
    }
    let mut result: u64 = 0;
    for c in digits.chars() {
        let digit = c.to_digit(base as u32)? as u64;
        result = result.checked_mul(base)?.checked_add(digit)?;
    }
    Some(result as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src, &COptions::default()).tokenize().unwrap()
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn rows_and_columns() {
        let tokens = lex("int a;\n  a = 2;\n");
        assert_eq!(tokens[0].loc, SourceLoc::new(1, 1));
        assert_eq!(tokens[1].loc, SourceLoc::new(1, 5));
        assert_eq!(tokens[3].loc, SourceLoc::new(2, 3));
    }

    #[test]
    fn integer_suffixes() {
        let kinds = kinds("10l 1ULL 342LL 0x10 010");
        assert_eq!(
            kinds[0],
            TokenKind::IntLiteral {
                value: 10,
                suffix: IntSuffix {
                    unsigned: false,
                    longness: Longness::Long
                }
            }
        );
        assert_eq!(
            kinds[1],
            TokenKind::IntLiteral {
                value: 1,
                suffix: IntSuffix {
                    unsigned: true,
                    longness: Longness::LongLong
                }
            }
        );
        assert_eq!(
            kinds[2],
            TokenKind::IntLiteral {
                value: 342,
                suffix: IntSuffix {
                    unsigned: false,
                    longness: Longness::LongLong
                }
            }
        );
        assert!(matches!(kinds[3], TokenKind::IntLiteral { value: 16, .. }));
        assert!(matches!(kinds[4], TokenKind::IntLiteral { value: 8, .. }));
    }

    #[test]
    fn comments_are_discarded() {
        let kinds = kinds("a // trailing\n/* block\n comment */ b");
        assert!(matches!(kinds[0], TokenKind::Identifier(_)));
        assert!(matches!(kinds[1], TokenKind::Identifier(_)));
        assert_eq!(kinds[2], TokenKind::EndOfFile);
    }

    #[test]
    fn adjacent_strings_stay_separate() {
        let kinds = kinds(r#""Hello" "world""#);
        assert!(matches!(kinds[0], TokenKind::StringLiteral(_)));
        assert!(matches!(kinds[1], TokenKind::StringLiteral(_)));
    }

    #[test]
    fn char_constant_with_escape() {
        let kinds = kinds(r"'\2' ' '");
        assert_eq!(kinds[0], TokenKind::CharLiteral(2));
        assert_eq!(kinds[1], TokenKind::CharLiteral(b' '));
    }

    #[test]
    fn object_macro_substitution() {
        let kinds = kinds("#define INLINE\n#define TEN 5 + 5\nINLINE int x = TEN;");
        assert_eq!(kinds[0], TokenKind::Int);
        assert!(matches!(kinds[1], TokenKind::Identifier(_)));
        assert_eq!(kinds[2], TokenKind::Assign);
        assert!(matches!(kinds[3], TokenKind::IntLiteral { value: 5, .. }));
        assert_eq!(kinds[4], TokenKind::Plus);
        assert!(matches!(kinds[5], TokenKind::IntLiteral { value: 5, .. }));
    }

    #[test]
    fn unknown_directive_fails() {
        let err = Lexer::new("#include <stdio.h>\n", &COptions::default())
            .tokenize()
            .unwrap_err();
        assert!(err.message.contains("Unsupported directive"));
    }

    #[test]
    fn trigraph_translation() {
        let opts = COptions {
            enable_trigraphs: true,
            ..Default::default()
        };
        let tokens = Lexer::new("a ??< b", &opts).tokenize().unwrap();
        assert_eq!(tokens[1].kind, TokenKind::LeftBrace);
    }

    #[test]
    fn punctuator_longest_match() {
        let kinds = kinds("<<= >>= ... << <= <");
        assert_eq!(kinds[0], TokenKind::LeftShiftAssign);
        assert_eq!(kinds[1], TokenKind::RightShiftAssign);
        assert_eq!(kinds[2], TokenKind::Ellipsis);
        assert_eq!(kinds[3], TokenKind::LeftShift);
        assert_eq!(kinds[4], TokenKind::LessEqual);
        assert_eq!(kinds[5], TokenKind::Less);
    }
}
