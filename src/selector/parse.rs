//! Selector grammar.
//!
//! A selector is a whitespace-separated chain of compound tokens evaluated at
//! increasing depth (pure descendant combinator; there is no direct-child
//! operator). Each compound token is any run of:
//!
//! ```text
//! tag          required tag name
//! .class       required class (repeatable)
//! #id          required id
//! [name]       attribute presence
//! [name*=v]    attribute value substring
//! :not(...)    negated simple selectors (repeatable)
//! ```
//!
//! A standalone trailing `!` token flags the preceding token for
//! short-circuit matching (first match per branch).

use crate::selector::errors::SelectorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrPredicate {
    /// `[name]`
    Present(String),
    /// `[name*=needle]`
    Substring { name: String, needle: String },
}

/// One compound token. The `not_*` sets mirror the positive ones; a node
/// counts as excluded only when every negated clause holds against it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundToken {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub attrs: Vec<AttrPredicate>,
    pub not_tags: Vec<String>,
    pub not_classes: Vec<String>,
    pub not_ids: Vec<String>,
    pub not_attrs: Vec<AttrPredicate>,
    pub short_circuit: bool,
}

impl CompoundToken {
    pub fn negation_count(&self) -> usize {
        self.not_tags.len() + self.not_classes.len() + self.not_ids.len() + self.not_attrs.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub tokens: Vec<CompoundToken>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Selector, SelectorError> {
        let mut tokens: Vec<CompoundToken> = Vec::new();

        for (offset, word) in split_words(input) {
            if word == "!" {
                match tokens.last_mut() {
                    Some(prev) => prev.short_circuit = true,
                    None => return Err(SelectorError::DanglingBang),
                }
                continue;
            }
            tokens.push(parse_token(word, offset)?);
        }

        if tokens.is_empty() {
            return Err(SelectorError::Empty);
        }

        Ok(Selector { tokens })
    }
}

fn split_words(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input
        .split_whitespace()
        .map(move |w| (offset_of(input, w), w))
}

fn offset_of(haystack: &str, part: &str) -> usize {
    part.as_ptr() as usize - haystack.as_ptr() as usize
}

fn parse_token(word: &str, base: usize) -> Result<CompoundToken, SelectorError> {
    let mut token = CompoundToken::default();
    let chars: Vec<char> = word.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                let (name, next) = scan_ident(&chars, pos + 1);
                if name.is_empty() {
                    return Err(SelectorError::UnexpectedChar {
                        ch: '.',
                        position: base + pos,
                    });
                }
                token.classes.push(name);
                pos = next;
            }
            '#' => {
                let (name, next) = scan_ident(&chars, pos + 1);
                if name.is_empty() {
                    return Err(SelectorError::UnexpectedChar {
                        ch: '#',
                        position: base + pos,
                    });
                }
                token.id = Some(name);
                pos = next;
            }
            '[' => {
                let close = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|i| pos + i)
                    .ok_or(SelectorError::Unterminated {
                        open: '[',
                        position: base + pos,
                    })?;
                let body: String = chars[pos + 1..close].iter().collect();
                token.attrs.push(parse_attr_predicate(&body, base + pos)?);
                pos = close + 1;
            }
            ':' => {
                let (name, next) = scan_ident(&chars, pos + 1);
                if name != "not" {
                    return Err(SelectorError::UnknownPseudo { name });
                }
                if chars.get(next) != Some(&'(') {
                    return Err(SelectorError::UnexpectedChar {
                        ch: ':',
                        position: base + pos,
                    });
                }
                let close = chars[next..]
                    .iter()
                    .position(|&c| c == ')')
                    .map(|i| next + i)
                    .ok_or(SelectorError::Unterminated {
                        open: '(',
                        position: base + next,
                    })?;
                let body: String = chars[next + 1..close].iter().collect();
                parse_negation(&body, base + next + 1, &mut token)?;
                pos = close + 1;
            }
            c if is_ident_char(c) => {
                let (name, next) = scan_ident(&chars, pos);
                token.tag = Some(name.to_ascii_lowercase());
                pos = next;
            }
            c => {
                return Err(SelectorError::UnexpectedChar {
                    ch: c,
                    position: base + pos,
                });
            }
        }
    }

    if token == CompoundToken::default() {
        return Err(SelectorError::EmptyToken { position: base });
    }

    Ok(token)
}

/// Parse the simple selectors inside `:not(...)` into the token's negated
/// sets. Nested `:not` is not part of the grammar.
fn parse_negation(
    body: &str,
    base: usize,
    token: &mut CompoundToken,
) -> Result<(), SelectorError> {
    let chars: Vec<char> = body.chars().collect();
    let mut pos = 0;
    let mut any = false;

    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                let (name, next) = scan_ident(&chars, pos + 1);
                if name.is_empty() {
                    return Err(SelectorError::UnexpectedChar {
                        ch: '.',
                        position: base + pos,
                    });
                }
                token.not_classes.push(name);
                pos = next;
            }
            '#' => {
                let (name, next) = scan_ident(&chars, pos + 1);
                if name.is_empty() {
                    return Err(SelectorError::UnexpectedChar {
                        ch: '#',
                        position: base + pos,
                    });
                }
                token.not_ids.push(name);
                pos = next;
            }
            '[' => {
                let close = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|i| pos + i)
                    .ok_or(SelectorError::Unterminated {
                        open: '[',
                        position: base + pos,
                    })?;
                let inner: String = chars[pos + 1..close].iter().collect();
                token
                    .not_attrs
                    .push(parse_attr_predicate(&inner, base + pos)?);
                pos = close + 1;
            }
            c if is_ident_char(c) => {
                let (name, next) = scan_ident(&chars, pos);
                token.not_tags.push(name.to_ascii_lowercase());
                pos = next;
            }
            c => {
                return Err(SelectorError::UnexpectedChar {
                    ch: c,
                    position: base + pos,
                });
            }
        }
        any = true;
    }

    if !any {
        return Err(SelectorError::EmptyToken { position: base });
    }

    Ok(())
}

fn parse_attr_predicate(body: &str, position: usize) -> Result<AttrPredicate, SelectorError> {
    if let Some((name, needle)) = body.split_once("*=") {
        let name = name.trim();
        if name.is_empty() {
            return Err(SelectorError::EmptyToken { position });
        }
        return Ok(AttrPredicate::Substring {
            name: name.to_ascii_lowercase(),
            needle: needle.trim_matches(|c| c == '"' || c == '\'').to_string(),
        });
    }

    let name = body.trim();
    if name.is_empty() {
        return Err(SelectorError::EmptyToken { position });
    }
    Ok(AttrPredicate::Present(name.to_ascii_lowercase()))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn scan_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut pos = start;
    while pos < chars.len() && is_ident_char(chars[pos]) {
        pos += 1;
    }
    (chars[start..pos].iter().collect(), pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_tag() {
        let sel = Selector::parse("slot").unwrap();
        assert_eq!(sel.tokens.len(), 1);
        assert_eq!(sel.tokens[0].tag.as_deref(), Some("slot"));
    }

    #[test]
    fn parses_full_compound() {
        let sel = Selector::parse("div.a.b#main[data-x][data-y*=on]").unwrap();
        let t = &sel.tokens[0];
        assert_eq!(t.tag.as_deref(), Some("div"));
        assert_eq!(t.classes, vec!["a", "b"]);
        assert_eq!(t.id.as_deref(), Some("main"));
        assert_eq!(
            t.attrs,
            vec![
                AttrPredicate::Present("data-x".into()),
                AttrPredicate::Substring {
                    name: "data-y".into(),
                    needle: "on".into()
                },
            ]
        );
    }

    #[test]
    fn parses_descendant_chain() {
        let sel = Selector::parse("nav ul li").unwrap();
        let tags: Vec<_> = sel.tokens.iter().map(|t| t.tag.as_deref()).collect();
        assert_eq!(tags, vec![Some("nav"), Some("ul"), Some("li")]);
    }

    #[test]
    fn trailing_bang_flags_previous_token() {
        let sel = Selector::parse("div slot !").unwrap();
        assert!(!sel.tokens[0].short_circuit);
        assert!(sel.tokens[1].short_circuit);
    }

    #[test]
    fn bang_without_token_is_an_error() {
        assert_eq!(Selector::parse("!"), Err(SelectorError::DanglingBang));
    }

    #[test]
    fn parses_not_clauses() {
        let sel = Selector::parse("div:not(.b):not(#x[hidden])").unwrap();
        let t = &sel.tokens[0];
        assert_eq!(t.not_classes, vec!["b"]);
        assert_eq!(t.not_ids, vec!["x"]);
        assert_eq!(t.not_attrs, vec![AttrPredicate::Present("hidden".into())]);
        assert_eq!(t.negation_count(), 3);
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert_eq!(Selector::parse("   "), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("div:nth-child(2)"),
            Err(SelectorError::UnknownPseudo { .. })
        ));
        assert!(matches!(
            Selector::parse("div[unterminated"),
            Err(SelectorError::Unterminated { .. })
        ));
        assert!(matches!(
            Selector::parse("div:not("),
            Err(SelectorError::Unterminated { .. })
        ));
    }
}
