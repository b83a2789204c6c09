//! Shorthand-dot expansion.
//!
//! Rewrites terse leading-dot shorthand into explicit references on the main
//! input binding: `.foo` becomes `input.foo`, a lone `.` becomes `input`, and
//! everything that is already ordinary JavaScript passes through byte for
//! byte. The pass is driven by the lexer's token classification rather than a
//! parser, so it deliberately prefers leaving ambiguous spans alone over
//! producing a rewrite that could corrupt valid syntax.
//!
//! Properties the tests pin down:
//! - expressions with no shorthand are returned unchanged;
//! - the rewrite is idempotent (`rewrite(rewrite(e)) == rewrite(e)`);
//! - string, template, regex, and comment interiors are never touched.

use crate::lexer::{ends_expression, tokenize, Spanned, Token};

/// A half-open byte range `[start, end)` to be replaced by the main-binding
/// identifier. Spans are emitted in source order and never overlap; an
/// insertion is a span with `start == end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteSpan {
    pub start: usize,
    pub end: usize,
}

/// Expand leading-dot shorthand in `expression` against `main_binding`.
///
/// Total and pure: input that cannot be classified is passed through
/// unchanged for that span.
pub fn rewrite(expression: &str, main_binding: &str) -> String {
    let tokens = tokenize(expression);
    let spans = collect_spans(&tokens);
    splice(expression, main_binding, &spans)
}

/// Scan the token stream left to right and collect the spans to rewrite.
fn collect_spans(tokens: &[Spanned<Token>]) -> Vec<RewriteSpan> {
    let mut spans = Vec::new();
    // Running classification: whether the previous significant token can end
    // an expression. A rewritten lone dot reads as a name afterwards, so the
    // state is updated as if the replacement text were already in place.
    let mut prev_ends_expr = false;

    for (i, spanned) in tokens.iter().enumerate() {
        match spanned.token {
            // Comments are transparent: `foo /*c*/ .bar` is ordinary access.
            Token::LineComment | Token::BlockComment => continue,
            Token::Dot => {
                let next = next_significant(tokens, i + 1);
                let decimal = matches!(
                    next,
                    Some(n) if n.token == Token::Number && n.span.start == spanned.span.end
                );
                if prev_ends_expr || decimal {
                    // Ordinary property access (or half of a decimal literal).
                    prev_ends_expr = false;
                    continue;
                }
                match next {
                    Some(n) if n.token == Token::Name => {
                        // `.foo`: insert the binding, keep the dot.
                        spans.push(RewriteSpan {
                            start: spanned.span.start,
                            end: spanned.span.start,
                        });
                        prev_ends_expr = false;
                    }
                    _ => {
                        // Lone dot resolves to the whole main binding.
                        spans.push(RewriteSpan {
                            start: spanned.span.start,
                            end: spanned.span.end,
                        });
                        prev_ends_expr = true;
                    }
                }
            }
            token => prev_ends_expr = ends_expression(token),
        }
    }

    spans
}

/// Next non-comment token at or after `from`.
fn next_significant(tokens: &[Spanned<Token>], from: usize) -> Option<&Spanned<Token>> {
    tokens[from..]
        .iter()
        .find(|s| !matches!(s.token, Token::LineComment | Token::BlockComment))
}

/// Apply the spans to the source, replacing each with the binding identifier.
fn splice(source: &str, main_binding: &str, spans: &[RewriteSpan]) -> String {
    if spans.is_empty() {
        return source.to_string();
    }
    let mut out = String::with_capacity(source.len() + spans.len() * (main_binding.len() + 1));
    let mut cursor = 0;
    for span in spans {
        out.push_str(&source[cursor..span.start]);
        out.push_str(main_binding);
        cursor = span.end;
    }
    out.push_str(&source[cursor..]);
    out
}
