//! Marker syntax lexing.
//!
//! Splits template text into literal runs and `{{ … }}` markers:
//!
//! - `{{key.path}}` property
//! - `{{#key.path}}` … `{{/key.path}}` component block
//! - `{{text key.path}}` editable text block
//! - `{{! comment }}`

use std::ops::Range;

use weave_content::KeyPath;

use crate::error::TemplateError;

pub(crate) const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Kind of a lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Literal,
    Property(KeyPath),
    Text(KeyPath),
    BlockStart(KeyPath),
    BlockEnd(KeyPath),
    Comment,
}

/// A token with its byte span in the lexed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Lexed template: tokens plus the matching end token of every block start.
#[derive(Debug)]
pub(crate) struct Lexed {
    pub tokens: Vec<Token>,
    block_ends: Vec<Option<usize>>,
}

impl Lexed {
    /// Index of the `{{/…}}` token closing the block opened at `start`.
    pub(crate) fn block_end(&self, start: usize) -> Option<usize> {
        self.block_ends.get(start).copied().flatten()
    }
}

/// Lex a template and match block markers.
pub(crate) fn lex(text: &str) -> Result<Lexed, TemplateError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(OPEN) {
        let start = pos + found;
        if start > pos {
            tokens.push(Token {
                kind: TokenKind::Literal,
                span: pos..start,
            });
        }

        let inner_start = start + OPEN.len();
        let Some(close) = text[inner_start..].find(CLOSE) else {
            return Err(TemplateError::syntax(start, "unterminated marker"));
        };
        let inner_end = inner_start + close;
        let end = inner_end + CLOSE.len();

        let kind = classify(text[inner_start..inner_end].trim(), start)?;
        tokens.push(Token {
            kind,
            span: start..end,
        });
        pos = end;
    }

    if pos < text.len() {
        tokens.push(Token {
            kind: TokenKind::Literal,
            span: pos..text.len(),
        });
    }

    let block_ends = match_blocks(&tokens)?;
    Ok(Lexed { tokens, block_ends })
}

/// Classify the trimmed contents of a marker.
fn classify(inner: &str, offset: usize) -> Result<TokenKind, TemplateError> {
    if inner.starts_with('!') {
        return Ok(TokenKind::Comment);
    }
    if let Some(rest) = inner.strip_prefix('#') {
        return Ok(TokenKind::BlockStart(key_path(rest, offset)?));
    }
    if let Some(rest) = inner.strip_prefix('/') {
        return Ok(TokenKind::BlockEnd(key_path(rest, offset)?));
    }
    if let Some(rest) = inner
        .strip_prefix("text")
        .filter(|rest| rest.starts_with(char::is_whitespace))
    {
        return Ok(TokenKind::Text(key_path(rest, offset)?));
    }
    Ok(TokenKind::Property(key_path(inner, offset)?))
}

fn key_path(raw: &str, offset: usize) -> Result<KeyPath, TemplateError> {
    KeyPath::new(raw).map_err(|e| TemplateError::syntax(offset, e.to_string()))
}

/// Pair every block start with its end, rejecting unbalanced markers.
fn match_blocks(tokens: &[Token]) -> Result<Vec<Option<usize>>, TemplateError> {
    let mut ends = vec![None; tokens.len()];
    let mut open: Vec<usize> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::BlockStart(_) => open.push(i),
            TokenKind::BlockEnd(path) => {
                let Some(start) = open.pop() else {
                    return Err(TemplateError::syntax(
                        token.span.start,
                        format!("unexpected {{{{/{path}}}}}"),
                    ));
                };
                if let TokenKind::BlockStart(expected) = &tokens[start].kind
                    && expected != path
                {
                    return Err(TemplateError::syntax(
                        token.span.start,
                        format!("expected {{{{/{expected}}}}}, found {{{{/{path}}}}}"),
                    ));
                }
                ends[start] = Some(i);
            }
            _ => {}
        }
    }

    if let Some(&start) = open.last() {
        let path = match &tokens[start].kind {
            TokenKind::BlockStart(path) => path.to_string(),
            _ => String::new(),
        };
        return Err(TemplateError::syntax(
            tokens[start].span.start,
            format!("unclosed {{{{#{path}}}}}"),
        ));
    }

    Ok(ends)
}
