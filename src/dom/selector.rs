//! CSS selector subset used by the pattern database.
//!
//! Pattern entries address banners with a narrow, well-behaved slice of CSS:
//! tag / `#id` / `.class` compounds, attribute tests (`[a]`, `[a=v]`,
//! `[a^=v]`, `[a$=v]`, `[a*=v]`), descendant and child combinators, and
//! comma lists. Anything beyond that (pseudo-classes, sibling combinators)
//! is a parse error; callers treat it as a non-matching entry rather than a
//! fault, since the database is external input.

use thiserror::Error;

use super::{DomSnapshot, NodeId};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character `{0}` in selector")]
    UnexpectedChar(char),
    #[error("unterminated attribute test")]
    UnterminatedAttribute,
    #[error("missing attribute name")]
    MissingAttributeName,
    #[error("pseudo-classes are not supported")]
    UnsupportedPseudo,
    #[error("combinator without a preceding selector")]
    DanglingCombinator,
}

/// Comma-separated list of selectors; matches if any member matches.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    compounds: Vec<Compound>,
    /// One combinator between each adjacent compound pair.
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Contains,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut selectors = Vec::new();
        for part in split_top_level(input) {
            let part = part.trim();
            if part.is_empty() {
                return Err(ParseError::Empty);
            }
            selectors.push(parse_selector(part)?);
        }
        if selectors.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(Self { selectors })
    }

    /// Parse a selector coming from the external pattern database.
    ///
    /// Database entries are input, not code: an unparseable one degrades to
    /// "matches nothing" with a debug log so the rest of the cascade keeps
    /// running.
    pub fn parse_lenient(input: &str) -> Option<Self> {
        match Self::parse(input) {
            Ok(list) => Some(list),
            Err(err) => {
                tracing::debug!(selector = input, %err, "ignoring unparseable selector");
                None
            }
        }
    }

    pub fn matches(&self, snapshot: &DomSnapshot, id: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(snapshot, id))
    }
}

impl Selector {
    fn matches(&self, snapshot: &DomSnapshot, id: NodeId) -> bool {
        self.matches_up_to(snapshot, id, self.compounds.len() - 1)
    }

    /// Right-to-left match with backtracking over descendant combinators.
    fn matches_up_to(&self, snapshot: &DomSnapshot, id: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(snapshot, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let parent = snapshot.node(id).parent;
        match self.combinators[index - 1] {
            Combinator::Child => match parent {
                Some(p) => self.matches_up_to(snapshot, p, index - 1),
                None => false,
            },
            Combinator::Descendant => {
                let mut cursor = parent;
                while let Some(ancestor) = cursor {
                    if self.matches_up_to(snapshot, ancestor, index - 1) {
                        return true;
                    }
                    cursor = snapshot.node(ancestor).parent;
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches(&self, snapshot: &DomSnapshot, id: NodeId) -> bool {
        let node = snapshot.node(id);
        if let Some(tag) = &self.tag
            && node.tag != *tag
        {
            return false;
        }
        if let Some(wanted) = &self.id
            && node.attrs.id.as_deref() != Some(wanted.as_str())
        {
            return false;
        }
        for class in &self.classes {
            if !node.attrs.class_list().any(|c| c == class) {
                return false;
            }
        }
        for test in &self.attrs {
            let Some(actual) = node.attrs.get(&test.name) else {
                return false;
            };
            let ok = match test.op {
                AttrOp::Exists => true,
                AttrOp::Equals => actual == test.value,
                AttrOp::Prefix => actual.starts_with(&test.value),
                AttrOp::Suffix => actual.ends_with(&test.value),
                AttrOp::Contains => actual.contains(&test.value),
            };
            if !ok {
                return false;
            }
        }
        true
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }
}

/// Split on commas that sit outside attribute brackets and quotes.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_selector(input: &str) -> Result<Selector, ParseError> {
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
            // Whitespace between compounds is the descendant combinator,
            // unless a `>` follows.
            if pending.is_none() && !compounds.is_empty() && chars.peek().is_some() {
                pending = Some(Combinator::Descendant);
            }
        }
        match chars.peek() {
            None => break,
            Some('>') => {
                chars.next();
                if compounds.is_empty() {
                    return Err(ParseError::DanglingCombinator);
                }
                pending = Some(Combinator::Child);
                continue;
            }
            Some(_) => {}
        }

        let compound = parse_compound(&mut chars)?;
        if compound.is_empty() {
            return Err(ParseError::Empty);
        }
        if !compounds.is_empty() {
            combinators.push(pending.take().unwrap_or(Combinator::Descendant));
        } else {
            pending = None;
        }
        compounds.push(compound);
    }

    if compounds.is_empty() {
        return Err(ParseError::Empty);
    }
    if pending == Some(Combinator::Child) {
        return Err(ParseError::DanglingCombinator);
    }
    Ok(Selector {
        compounds,
        combinators,
    })
}

fn parse_compound(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<Compound, ParseError> {
    let mut compound = Compound::default();
    loop {
        match chars.peek().copied() {
            None => break,
            Some(c) if c.is_whitespace() || c == '>' => break,
            Some('*') => {
                chars.next();
            }
            Some('#') => {
                chars.next();
                compound.id = Some(take_ident(chars)?);
            }
            Some('.') => {
                chars.next();
                compound.classes.push(take_ident(chars)?);
            }
            Some('[') => {
                chars.next();
                compound.attrs.push(parse_attr_test(chars)?);
            }
            Some(':') => return Err(ParseError::UnsupportedPseudo),
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(take_ident(chars)?.to_ascii_lowercase());
            }
            Some(c) => return Err(ParseError::UnexpectedChar(c)),
        }
    }
    Ok(compound)
}

fn parse_attr_test(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<AttrTest, ParseError> {
    let mut body = String::new();
    let mut quote: Option<char> = None;
    loop {
        let Some(ch) = chars.next() else {
            return Err(ParseError::UnterminatedAttribute);
        };
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (None, '\'' | '"') => quote = Some(ch),
            (None, ']') => break,
            _ => body.push(ch),
        }
    }

    let (name_part, op, value) = if let Some(pos) = body.find(['^', '$', '*'].as_ref())
        && body[pos + 1..].starts_with('=')
    {
        let op = match body.as_bytes()[pos] {
            b'^' => AttrOp::Prefix,
            b'$' => AttrOp::Suffix,
            _ => AttrOp::Contains,
        };
        (&body[..pos], op, body[pos + 2..].to_string())
    } else if let Some((name, value)) = body.split_once('=') {
        (name, AttrOp::Equals, value.to_string())
    } else {
        (body.as_str(), AttrOp::Exists, String::new())
    };

    let name = name_part.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(ParseError::MissingAttributeName);
    }
    Ok(AttrTest {
        name,
        op,
        value: value.trim().to_string(),
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<String, ParseError> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    if ident.is_empty() {
        match chars.peek() {
            Some(&c) => Err(ParseError::UnexpectedChar(c)),
            None => Err(ParseError::Empty),
        }
    } else {
        Ok(ident)
    }
}
