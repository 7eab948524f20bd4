//! CSS selector subset used by locators.
//!
//! The grammar covers what the blog scenarios need:
//!
//! ```text
//! list      := complex ( "," complex )*
//! complex   := compound ( WS compound )*          descendant combinator only
//! compound  := ( tag | "*" )? ( "#" id | "." class | "[" attr "]" | ":" pseudo )*
//! attr      := name ( op value )?                 op: = *= ^= $= ~=
//! pseudo    := "focus" | "has-text(" string ")"
//! ```
//!
//! The parsed AST is serialisable so the Chromium driver can hand it to its
//! injected resolver, and matching is defined over [`SelectorTarget`] so the
//! fixture DOM uses the same rules.

use serde::{Deserialize, Serialize};

use crate::result::{E2eError, E2eResult};

// ============================================================================
// AST
// ============================================================================

/// Attribute comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeOp {
    /// `[a]`
    Exists,
    /// `[a=v]`
    Equals,
    /// `[a*=v]`
    Contains,
    /// `[a^=v]`
    Prefix,
    /// `[a$=v]`
    Suffix,
    /// `[a~=v]` (whitespace-separated word)
    Word,
}

/// One `[name op value]` condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSelector {
    /// Attribute name (lowercase)
    pub name: String,
    /// Comparison
    pub op: AttributeOp,
    /// Value for all operators except `Exists`
    pub value: Option<String>,
}

impl AttributeSelector {
    /// Check an attribute value against this condition
    #[must_use]
    pub fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let expected = self.value.as_deref().unwrap_or_default();
        match self.op {
            AttributeOp::Exists => true,
            AttributeOp::Equals => actual == expected,
            AttributeOp::Contains => !expected.is_empty() && actual.contains(expected),
            AttributeOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttributeOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttributeOp::Word => actual.split_whitespace().any(|w| w == expected),
        }
    }
}

/// A sequence of simple selectors with no combinator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundSelector {
    /// Tag name (lowercase); `None` for `*` or omitted
    pub tag: Option<String>,
    /// `#id`
    pub id: Option<String>,
    /// `.class` conditions
    pub classes: Vec<String>,
    /// `[attr]` conditions
    pub attributes: Vec<AttributeSelector>,
    /// `:has-text("...")`, stored lowercase and whitespace-normalised
    pub has_text: Option<String>,
    /// `:focus`
    pub focus: bool,
}

/// Compounds joined by descendant combinators, outermost first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexSelector {
    /// Compounds, outermost ancestor first
    pub compounds: Vec<CompoundSelector>,
}

/// A comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorList {
    /// Alternatives
    pub selectors: Vec<ComplexSelector>,
}

// ============================================================================
// Matching
// ============================================================================

/// Read-only view of a document that selectors can be matched against
pub trait SelectorTarget {
    /// Node handle
    type Node: Copy + Eq;

    /// Lowercase tag name
    fn tag_name(&self, node: Self::Node) -> &str;
    /// Attribute value
    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;
    /// Text content (descendant text concatenated)
    fn text_content(&self, node: Self::Node) -> String;
    /// Whether the node has keyboard focus
    fn is_focused(&self, node: Self::Node) -> bool;
    /// Parent element, if any
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
}

/// Collapse runs of whitespace and trim
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl CompoundSelector {
    /// Check a single node against this compound
    pub fn matches<T: SelectorTarget>(&self, target: &T, node: T::Node) -> bool {
        if let Some(tag) = &self.tag {
            if target.tag_name(node) != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if target.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = target.attribute(node, "class").unwrap_or_default();
            let has_all = self
                .classes
                .iter()
                .all(|c| class_attr.split_whitespace().any(|w| w == c));
            if !has_all {
                return false;
            }
        }
        if !self
            .attributes
            .iter()
            .all(|a| a.matches(target.attribute(node, &a.name)))
        {
            return false;
        }
        if self.focus && !target.is_focused(node) {
            return false;
        }
        if let Some(needle) = &self.has_text {
            let text = normalize_whitespace(&target.text_content(node)).to_lowercase();
            if !text.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

impl ComplexSelector {
    /// Check a node: the last compound must match the node itself and each
    /// earlier compound some ancestor, in order.
    pub fn matches<T: SelectorTarget>(&self, target: &T, node: T::Node) -> bool {
        let Some((last, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(target, node) {
            return false;
        }
        let mut cursor = target.parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(current) = cursor else {
                    return false;
                };
                cursor = target.parent(current);
                if compound.matches(target, current) {
                    break;
                }
            }
        }
        true
    }
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(source: &str) -> E2eResult<Self> {
        Parser::new(source).parse_list()
    }

    /// Check whether any alternative matches the node
    pub fn matches<T: SelectorTarget>(&self, target: &T, node: T::Node) -> bool {
        self.selectors.iter().any(|s| s.matches(target, node))
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> E2eError {
        E2eError::Selector {
            selector: self.source.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect_char(&mut self, expected: char) -> E2eResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!(
                "expected '{expected}' at position {}, found '{c}'",
                self.pos - 1
            ))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn parse_list(&mut self) -> E2eResult<SelectorList> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.pos += 1;
                }
                Some(c) => {
                    return Err(self.error(format!(
                        "unexpected '{c}' at position {}",
                        self.pos
                    )))
                }
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> E2eResult<ComplexSelector> {
        let mut compounds = vec![self.parse_compound()?];
        loop {
            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>' | '+' | '~') => {
                    return Err(self.error("only the descendant combinator is supported"));
                }
                Some(_) if had_space => compounds.push(self.parse_compound()?),
                Some(c) => {
                    return Err(self.error(format!(
                        "unexpected '{c}' at position {}",
                        self.pos
                    )))
                }
            }
        }
        Ok(ComplexSelector { compounds })
    }

    fn parse_compound(&mut self) -> E2eResult<CompoundSelector> {
        let mut compound = CompoundSelector::default();
        let start = self.pos;

        if self.peek() == Some('*') {
            self.pos += 1;
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    self.parse_pseudo(&mut compound)?;
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => self.error(format!("unexpected '{c}' at position {}", self.pos)),
                None => self.error("empty selector"),
            });
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> E2eResult<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(format!("expected identifier at position {start}")));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_value(&mut self) -> E2eResult<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('\\') => match self.bump() {
                            Some(c) => value.push(c),
                            None => return Err(self.error("unterminated escape")),
                        },
                        Some(c) if c == quote => return Ok(value),
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => self.parse_ident(),
        }
    }

    fn parse_attribute(&mut self) -> E2eResult<AttributeSelector> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttributeSelector {
                    name,
                    op: AttributeOp::Exists,
                    value: None,
                });
            }
            Some('=') => AttributeOp::Equals,
            Some('*') => AttributeOp::Contains,
            Some('^') => AttributeOp::Prefix,
            Some('$') => AttributeOp::Suffix,
            Some('~') => AttributeOp::Word,
            Some(c) => return Err(self.error(format!("unknown attribute operator '{c}'"))),
            None => return Err(self.error("unterminated attribute selector")),
        };
        self.pos += 1;
        if op != AttributeOp::Equals {
            self.expect_char('=')?;
        }
        self.skip_whitespace();
        let value = self.parse_value()?;
        self.skip_whitespace();
        self.expect_char(']')?;
        Ok(AttributeSelector {
            name,
            op,
            value: Some(value),
        })
    }

    fn parse_pseudo(&mut self, compound: &mut CompoundSelector) -> E2eResult<()> {
        let name = self.parse_ident()?;
        match name.as_str() {
            "focus" => {
                compound.focus = true;
                Ok(())
            }
            "has-text" => {
                self.expect_char('(')?;
                self.skip_whitespace();
                let text = self.parse_value()?;
                self.skip_whitespace();
                self.expect_char(')')?;
                compound.has_text = Some(normalize_whitespace(&text).to_lowercase());
                Ok(())
            }
            other => Err(self.error(format!("unsupported pseudo-class ':{other}'"))),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tiny tree for matching tests: (tag, attrs, text, parent)
    struct Tree {
        nodes: Vec<(&'static str, Vec<(&'static str, &'static str)>, &'static str, Option<usize>)>,
        focused: Option<usize>,
    }

    impl SelectorTarget for Tree {
        type Node = usize;

        fn tag_name(&self, node: usize) -> &str {
            self.nodes[node].0
        }

        fn attribute(&self, node: usize, name: &str) -> Option<&str> {
            self.nodes[node]
                .1
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v)
        }

        fn text_content(&self, node: usize) -> String {
            self.nodes[node].2.to_string()
        }

        fn is_focused(&self, node: usize) -> bool {
            self.focused == Some(node)
        }

        fn parent(&self, node: usize) -> Option<usize> {
            self.nodes[node].3
        }
    }

    fn tree() -> Tree {
        Tree {
            nodes: vec![
                ("body", vec![], "", None),
                ("header", vec![], "", Some(0)),
                ("nav", vec![("class", "nav")], "", Some(1)),
                (
                    "a",
                    vec![("class", "brand-link contrast"), ("href", "/")],
                    "Willian Nguyen",
                    Some(2),
                ),
                (
                    "a",
                    vec![
                        ("href", "https://github.com/hnlearndev"),
                        ("target", "_blank"),
                    ],
                    "",
                    Some(2),
                ),
                ("th", vec![("scope", "col")], "  Title \n", Some(0)),
            ],
            focused: Some(4),
        }
    }

    fn matches(selector: &str, node: usize) -> bool {
        SelectorList::parse(selector).unwrap().matches(&tree(), node)
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_tag_class_attribute() {
            let list = SelectorList::parse("input[type=\"email\"]").unwrap();
            let compound = &list.selectors[0].compounds[0];
            assert_eq!(compound.tag.as_deref(), Some("input"));
            assert_eq!(compound.attributes[0].name, "type");
            assert_eq!(compound.attributes[0].op, AttributeOp::Equals);
            assert_eq!(compound.attributes[0].value.as_deref(), Some("email"));
        }

        #[test]
        fn test_parse_list_and_descendants() {
            let list = SelectorList::parse(".nav-social a, .mobile-nav-social a").unwrap();
            assert_eq!(list.selectors.len(), 2);
            assert_eq!(list.selectors[0].compounds.len(), 2);
            assert_eq!(list.selectors[1].compounds[0].classes, vec!["mobile-nav-social"]);
        }

        #[test]
        fn test_parse_has_text_normalises() {
            let list = SelectorList::parse("th:has-text(\"  Title \")").unwrap();
            assert_eq!(
                list.selectors[0].compounds[0].has_text.as_deref(),
                Some("title")
            );
        }

        #[test]
        fn test_parse_bare_attribute_and_operators() {
            let list = SelectorList::parse("meta[charset], a[href^=https], a[href$='.ico']")
                .unwrap();
            assert_eq!(list.selectors[0].compounds[0].attributes[0].op, AttributeOp::Exists);
            assert_eq!(list.selectors[1].compounds[0].attributes[0].op, AttributeOp::Prefix);
            assert_eq!(list.selectors[2].compounds[0].attributes[0].op, AttributeOp::Suffix);
        }

        #[test]
        fn test_parse_errors() {
            for bad in ["", "a >", "div > p", "a[href", "p:hover", "a[href=\"x]", ","] {
                let err = SelectorList::parse(bad).unwrap_err();
                assert!(matches!(err, E2eError::Selector { .. }), "{bad}");
            }
        }
    }

    mod match_tests {
        use super::*;

        #[test]
        fn test_class_and_descendant() {
            assert!(matches(".brand-link", 3));
            assert!(matches("header nav a", 3));
            assert!(matches("body a", 4));
            assert!(!matches("nav header a", 3));
        }

        #[test]
        fn test_attribute_operators() {
            assert!(matches("a[href*=\"github.com\"]", 4));
            assert!(!matches("a[href*=\"linkedin.com\"]", 4));
            assert!(matches("a[target=\"_blank\"]", 4));
            assert!(matches("a[class~=contrast]", 3));
            assert!(!matches("a[class~=contr]", 3));
        }

        #[test]
        fn test_pseudo_classes() {
            assert!(matches(":focus", 4));
            assert!(!matches(":focus", 3));
            assert!(matches("th:has-text(\"Title\")", 5));
            assert!(!matches("th:has-text(\"Date\")", 5));
        }

        #[test]
        fn test_universal() {
            assert!(matches("*", 0));
            assert!(matches("nav *", 3));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_parse_never_panics(source in "\\PC{0,40}") {
                let _ = SelectorList::parse(&source);
            }

            #[test]
            fn test_class_selector_round_trips(class in "[a-z][a-z0-9-]{0,12}") {
                let list = SelectorList::parse(&format!(".{class}")).unwrap();
                prop_assert_eq!(&list.selectors[0].compounds[0].classes[0], &class);
            }
        }
    }
}
