//! Lexer for the JavaScript expression subset jex rewrites.
//!
//! Converts expression text into a stream of classified tokens using the
//! logos lexer generator. The lexer follows JavaScript's lexical grammar just
//! far enough for the shorthand rewriter: string, template, regex, and
//! comment literals are consumed as opaque ranges so their contents are never
//! mistaken for rewritable tokens, and `.5`-style decimals, `...`, and `?.`
//! win over a bare `.`.
//!
//! # Totality
//!
//! `tokenize` never fails. Characters the grammar does not recognize become
//! `Unknown` tokens, and unterminated literals extend to the end of their
//! line (strings, regexes) or the end of input (templates, block comments).
//! The rewriter degrades to a no-op over such spans instead of erroring.

use logos::{Logos, Span};

/// A token with its byte span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Tokens produced by the expression lexer.
///
/// Only the classification matters to the rewriter; token text is recovered
/// by slicing the source with the span, so variants carry no payload.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    /// Identifier or keyword. Keywords (`null`, `true`, `false`, ...) are not
    /// distinguished: for rewriting purposes they behave exactly like names.
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Name,

    /// Numeric literal. Leading-dot decimals (`.5`) must lex as a number so
    /// the dot never reaches the rewriter; logos picks the longest match.
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?n?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"0[xX][0-9a-fA-F_]+n?")]
    #[regex(r"0[oO][0-7_]+n?")]
    #[regex(r"0[bB][01_]+n?")]
    Number,

    /// Single- or double-quoted string, consumed opaquely. An unterminated
    /// string runs to the end of its line.
    #[token("\"", |lex| scan_quoted(lex, '"'))]
    #[token("'", |lex| scan_quoted(lex, '\''))]
    Str,

    /// Template literal, including nested `${...}` holes, nested braces, and
    /// nested templates. Consumed opaquely; unterminated runs to end of input.
    #[token("`", scan_template)]
    Template,

    /// Regex literal. Never produced by logos directly: `tokenize` promotes a
    /// `Slash` to `Regex` when the previous significant token cannot end an
    /// expression, then consumes the body and flags.
    Regex,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", scan_block_comment)]
    BlockComment,

    /// `...`: spread marker, deliberately not a `Dot` so that runs of dots
    /// collapse the way the rewriter expects.
    #[token("...")]
    Ellipsis,

    /// `?.`: optional chaining, never shorthand.
    #[token("?.")]
    OptChain,

    #[token(".")]
    Dot,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("/")]
    Slash,

    /// Any other single-character operator or punctuator.
    #[regex(r"[-+*%=<>!&|^~,;:?#@]")]
    Punct,

    /// A character the grammar does not recognize. Treated as opaque: the
    /// rewriter never expands a dot that follows one.
    Unknown,
}

/// Whether a token can end an expression. Drives two classifications:
/// a `/` after such a token is division rather than a regex literal, and a
/// `.` after such a token is ordinary property access rather than shorthand.
pub fn ends_expression(token: Token) -> bool {
    matches!(
        token,
        Token::Name
            | Token::Number
            | Token::Str
            | Token::Template
            | Token::Regex
            | Token::RParen
            | Token::RBracket
            | Token::RBrace
            | Token::Unknown
    )
}

/// Tokenize expression source text. Total: malformed input degrades to
/// `Unknown` tokens rather than failing.
pub fn tokenize(source: &str) -> Vec<Spanned<Token>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    // Classification state for regex-vs-division; comments are transparent.
    let mut prev_ends_expr = false;

    while let Some(result) = lexer.next() {
        let token = match result {
            Ok(Token::Slash) if !prev_ends_expr => {
                let body = scan_regex(lexer.remainder());
                lexer.bump(body);
                Token::Regex
            }
            Ok(token) => token,
            Err(()) => Token::Unknown,
        };
        if !matches!(token, Token::LineComment | Token::BlockComment) {
            prev_ends_expr = ends_expression(token);
        }
        tokens.push(Spanned::new(token, lexer.span()));
    }

    tokens
}

/// Consume a quoted string body up to and including the closing quote.
/// Stops before a newline (JS strings cannot span lines) so an unterminated
/// string only blanks out the rest of its own line.
fn scan_quoted(lex: &mut logos::Lexer<Token>, quote: char) {
    let rest = lex.remainder();
    let mut end = rest.len();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\n' => {
                end = i;
                break;
            }
            _ if c == quote => {
                end = i + c.len_utf8();
                break;
            }
            _ => {}
        }
    }
    lex.bump(end);
}

/// Nesting state while scanning a template literal.
enum TemplateMode {
    /// Inside template text, between backticks.
    Body,
    /// Inside a `${...}` hole, tracking extra `{`/`}` nesting.
    Hole(usize),
}

/// Consume a template literal body up to and including the closing backtick,
/// honoring `${...}` holes, nested braces, nested templates, and strings
/// inside holes. Unterminated templates run to the end of input.
fn scan_template(lex: &mut logos::Lexer<Token>) {
    let rest = lex.remainder();
    let mut modes = vec![TemplateMode::Body];
    let mut end = rest.len();
    let mut chars = rest.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match modes.last_mut() {
            Some(TemplateMode::Body) => match c {
                '\\' => {
                    chars.next();
                }
                '`' => {
                    modes.pop();
                    if modes.is_empty() {
                        end = i + 1;
                        break;
                    }
                }
                '$' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        modes.push(TemplateMode::Hole(0));
                    }
                }
                _ => {}
            },
            Some(TemplateMode::Hole(depth)) => match c {
                '{' => *depth += 1,
                '}' => {
                    if *depth == 0 {
                        modes.pop();
                    } else {
                        *depth -= 1;
                    }
                }
                '`' => modes.push(TemplateMode::Body),
                '\\' => {
                    chars.next();
                }
                '\'' | '"' => {
                    // A string inside a hole may contain `}` or a backtick.
                    let mut escaped = false;
                    for (_, s) in chars.by_ref() {
                        if escaped {
                            escaped = false;
                        } else if s == '\\' {
                            escaped = true;
                        } else if s == c || s == '\n' {
                            break;
                        }
                    }
                }
                _ => {}
            },
            None => break,
        }
    }
    lex.bump(end);
}

/// Consume a block comment body up to and including `*/`, or to end of input.
fn scan_block_comment(lex: &mut logos::Lexer<Token>) {
    match lex.remainder().find("*/") {
        Some(pos) => lex.bump(pos + 2),
        None => lex.bump(lex.remainder().len()),
    }
}

/// Given the text following a regex-opening `/`, return how many bytes the
/// body and trailing flags occupy. Character classes may contain unescaped
/// `/`; an unterminated regex stops before the newline.
fn scan_regex(rest: &str) -> usize {
    let mut in_class = false;
    let mut end = rest.len();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '\n' => {
                end = i;
                break;
            }
            '/' if !in_class => {
                let mut stop = i + 1;
                for (j, f) in rest[i + 1..].char_indices() {
                    if f.is_ascii_alphabetic() {
                        stop = i + 1 + j + 1;
                    } else {
                        break;
                    }
                }
                end = stop;
                break;
            }
            _ => {}
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).into_iter().map(|s| s.token).collect()
    }

    fn texts(source: &str) -> Vec<String> {
        tokenize(source)
            .into_iter()
            .map(|s| source[s.span].to_string())
            .collect()
    }

    #[test]
    fn names_and_dots() {
        assert_eq!(kinds("foo.bar"), vec![Token::Name, Token::Dot, Token::Name]);
    }

    #[test]
    fn leading_dot_decimal_is_a_number() {
        assert_eq!(kinds(".5"), vec![Token::Number]);
        assert_eq!(kinds(".5e3"), vec![Token::Number]);
        assert_eq!(kinds("x.5"), vec![Token::Name, Token::Number]);
    }

    #[test]
    fn number_forms() {
        assert_eq!(kinds("1_000"), vec![Token::Number]);
        assert_eq!(kinds("0xFF"), vec![Token::Number]);
        assert_eq!(kinds("1.5e-3"), vec![Token::Number]);
        assert_eq!(kinds("42n"), vec![Token::Number]);
    }

    #[test]
    fn ellipsis_lexes_greedily() {
        assert_eq!(kinds("...foo"), vec![Token::Ellipsis, Token::Name]);
        // Four dots: spread marker plus one shorthand-candidate dot.
        assert_eq!(
            kinds("....foo"),
            vec![Token::Ellipsis, Token::Dot, Token::Name]
        );
        // Two dots stay two dots.
        assert_eq!(kinds("..foo"), vec![Token::Dot, Token::Dot, Token::Name]);
    }

    #[test]
    fn optional_chaining_is_not_a_dot() {
        assert_eq!(
            kinds("foo?.()"),
            vec![Token::Name, Token::OptChain, Token::LParen, Token::RParen]
        );
    }

    #[test]
    fn strings_are_opaque() {
        assert_eq!(kinds(r#""a.b" + 'c.d'"#), vec![Token::Str, Token::Punct, Token::Str]);
        assert_eq!(texts(r#""a\".b""#), vec![r#""a\".b""#]);
    }

    #[test]
    fn unterminated_string_stops_at_newline() {
        assert_eq!(kinds("\"oops\n.foo"), vec![Token::Str, Token::Dot, Token::Name]);
    }

    #[test]
    fn template_with_nested_hole() {
        assert_eq!(kinds("`a ${ {b: 1}.b } c`"), vec![Token::Template]);
        assert_eq!(kinds("`x ${ `y ${z}` } w`"), vec![Token::Template]);
        assert_eq!(kinds("`brace ${ \"}\" } done`"), vec![Token::Template]);
    }

    #[test]
    fn comments_are_opaque_tokens() {
        assert_eq!(kinds("a // trailing .dot"), vec![Token::Name, Token::LineComment]);
        assert_eq!(
            kinds("a /* .x */ b"),
            vec![Token::Name, Token::BlockComment, Token::Name]
        );
    }

    #[test]
    fn regex_vs_division() {
        // After a name, `/` is division.
        assert_eq!(
            kinds("a / b"),
            vec![Token::Name, Token::Slash, Token::Name]
        );
        // At expression position, `/` opens a regex literal.
        assert_eq!(kinds("/a.b/g"), vec![Token::Regex]);
        assert_eq!(
            kinds("x = /[/]./"),
            vec![Token::Name, Token::Punct, Token::Regex]
        );
        // After a closing paren, division again.
        assert_eq!(
            kinds("(a) / 2"),
            vec![Token::LParen, Token::Name, Token::RParen, Token::Slash, Token::Number]
        );
    }

    #[test]
    fn unknown_characters_do_not_fail() {
        assert_eq!(kinds("a \u{00b6} b"), vec![Token::Name, Token::Unknown, Token::Name]);
    }

    #[test]
    fn spans_cover_the_source() {
        let src = "`t ${x}` + .foo";
        let toks = tokenize(src);
        assert_eq!(&src[toks[0].span.clone()], "`t ${x}`");
        assert_eq!(&src[toks[1].span.clone()], "+");
        assert_eq!(&src[toks[2].span.clone()], ".");
        assert_eq!(&src[toks[3].span.clone()], "foo");
    }
}
