//! Chunk Template Parsing
//!
//! Chunk text is parsed once at registration into a small tree of literal
//! runs, token markers, and conditional blocks. Assembly then walks the tree
//! instead of re-scanning text.
//!
//! ## Directive vocabulary
//!
//! Directives occupy a whole line (terminator included) and emit no text.
//!
//! | Directive              | Keeps body when                     |
//! |------------------------|-------------------------------------|
//! | `#ifdef FLAG`          | `FLAG` is true or has an enum value |
//! | `#ifndef FLAG`         | `FLAG` is false or absent           |
//! | `#if FLAG == VALUE`    | `FLAG` holds enum value `VALUE`     |
//! | `#if FLAG != VALUE`    | otherwise                           |
//! | `#else` / `#endif`     |                                     |
//!
//! Every other `#` line (`#define`, `#version`, ...) is ordinary text.

use smallvec::SmallVec;

use super::tokens::{TokenKind, TokenKinds};
use crate::errors::{Result, WeaveError};
use crate::resources::feature_set::{FeatureScope, FeatureValue};
use crate::utils::interner::{self, Symbol};

/// How a guard tests its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardTest {
    Defined,
    NotDefined,
    Equals(Symbol),
    NotEquals(Symbol),
}

/// Condition of a conditional block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    pub flag: Symbol,
    pub test: GuardTest,
}

impl Guard {
    #[must_use]
    pub fn evaluate(&self, scope: &FeatureScope<'_>) -> bool {
        let value = scope.get(self.flag);
        match self.test {
            GuardTest::Defined => value.is_some_and(FeatureValue::is_set),
            GuardTest::NotDefined => !value.is_some_and(FeatureValue::is_set),
            GuardTest::Equals(expected) => value == Some(FeatureValue::Enum(expected)),
            GuardTest::NotEquals(expected) => value != Some(FeatureValue::Enum(expected)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    pub guard: Guard,
    pub then_branch: Vec<Node>,
    pub else_branch: Option<Vec<Node>>,
}

/// Parse tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Token(TokenKind),
    Conditional(Conditional),
}

/// Retained piece of a chunk after conditional evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Token(TokenKind),
}

/// Parsed chunk template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
    /// Flags tested by any guard, sorted by name and deduplicated.
    referenced_flags: SmallVec<[Symbol; 4]>,
    tokens: TokenKinds,
}

impl Template {
    /// Parses `source`. `chunk` is only used for error reporting.
    pub fn parse(chunk: &str, source: &str) -> Result<Self> {
        Parser::new(chunk).run(source)
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn referenced_flags(&self) -> &[Symbol] {
        &self.referenced_flags
    }

    #[must_use]
    pub fn tokens(&self) -> TokenKinds {
        self.tokens
    }

    /// Evaluates every conditional block against `scope`, appending the
    /// retained segments to `out` in template order.
    pub fn evaluate<'a>(&'a self, scope: &FeatureScope<'_>, out: &mut Vec<Segment<'a>>) {
        evaluate_nodes(&self.nodes, scope, out);
    }
}

fn evaluate_nodes<'a>(nodes: &'a [Node], scope: &FeatureScope<'_>, out: &mut Vec<Segment<'a>>) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push(Segment::Text(text)),
            Node::Token(kind) => out.push(Segment::Token(*kind)),
            Node::Conditional(block) => {
                if block.guard.evaluate(scope) {
                    evaluate_nodes(&block.then_branch, scope, out);
                } else if let Some(else_branch) = &block.else_branch {
                    evaluate_nodes(else_branch, scope, out);
                }
            }
        }
    }
}

// ─── Parser ──────────────────────────────────────────────────────────────────

struct OpenBlock {
    guard: Guard,
    flag_name: String,
    opened_at: usize,
    then_branch: Vec<Node>,
    else_branch: Option<Vec<Node>>,
}

impl OpenBlock {
    fn target(&mut self) -> &mut Vec<Node> {
        match &mut self.else_branch {
            Some(nodes) => nodes,
            None => &mut self.then_branch,
        }
    }
}

enum Directive<'s> {
    Open(Guard, &'s str),
    Else,
    EndIf,
}

struct Parser<'c> {
    chunk: &'c str,
    root: Vec<Node>,
    stack: Vec<OpenBlock>,
    flags: Vec<Symbol>,
    tokens: TokenKinds,
    line: usize,
}

impl<'c> Parser<'c> {
    fn new(chunk: &'c str) -> Self {
        Self {
            chunk,
            root: Vec::new(),
            stack: Vec::new(),
            flags: Vec::new(),
            tokens: TokenKinds::empty(),
            line: 0,
        }
    }

    fn run(mut self, source: &str) -> Result<Template> {
        for (index, line) in source.split_inclusive('\n').enumerate() {
            self.line = index + 1;
            match self.directive(line)? {
                Some(Directive::Open(guard, flag_name)) => {
                    self.flags.push(guard.flag);
                    self.stack.push(OpenBlock {
                        guard,
                        flag_name: flag_name.to_string(),
                        opened_at: self.line,
                        then_branch: Vec::new(),
                        else_branch: None,
                    });
                }
                Some(Directive::Else) => {
                    let Some(block) = self.stack.last_mut() else {
                        return Err(self.error("#else without an open conditional"));
                    };
                    if block.else_branch.is_some() {
                        let message = format!("duplicate #else for '{}'", block.flag_name);
                        return Err(self.error(message));
                    }
                    block.else_branch = Some(Vec::new());
                }
                Some(Directive::EndIf) => {
                    let Some(block) = self.stack.pop() else {
                        return Err(self.error("#endif without an open conditional"));
                    };
                    let node = Node::Conditional(Conditional {
                        guard: block.guard,
                        then_branch: block.then_branch,
                        else_branch: block.else_branch,
                    });
                    self.target().push(node);
                }
                None => self.text_line(line)?,
            }
        }

        if let Some(block) = self.stack.last() {
            return Err(WeaveError::TemplateSyntax {
                chunk: self.chunk.to_string(),
                line: block.opened_at,
                message: format!("conditional on '{}' is never closed", block.flag_name),
            });
        }

        let mut referenced_flags: SmallVec<[Symbol; 4]> = self.flags.into_iter().collect();
        referenced_flags.sort_by_key(|&sym| interner::resolve(sym));
        referenced_flags.dedup();

        Ok(Template {
            nodes: self.root,
            referenced_flags,
            tokens: self.tokens,
        })
    }

    fn target(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(block) => block.target(),
            None => &mut self.root,
        }
    }

    fn error(&self, message: impl Into<String>) -> WeaveError {
        WeaveError::TemplateSyntax {
            chunk: self.chunk.to_string(),
            line: self.line,
            message: message.into(),
        }
    }

    fn directive<'s>(&self, line: &'s str) -> Result<Option<Directive<'s>>> {
        let Some(body) = line.trim().strip_prefix('#') else {
            return Ok(None);
        };
        let mut words = body.split_whitespace();
        let Some(keyword) = words.next() else {
            return Ok(None);
        };
        let args: SmallVec<[&str; 3]> = words.collect();

        let directive = match keyword {
            "ifdef" | "ifndef" => {
                let [flag] = args[..] else {
                    return Err(self.error(format!("#{keyword} expects exactly one flag name")));
                };
                let flag = self.identifier(flag)?;
                let test = if keyword == "ifdef" {
                    GuardTest::Defined
                } else {
                    GuardTest::NotDefined
                };
                Directive::Open(
                    Guard {
                        flag: interner::intern(flag),
                        test,
                    },
                    flag,
                )
            }
            "if" => {
                let [flag, op, value] = args[..] else {
                    return Err(self.error("#if expects 'FLAG == VALUE' or 'FLAG != VALUE'"));
                };
                let flag = self.identifier(flag)?;
                let value = interner::intern(self.identifier(value)?);
                let test = match op {
                    "==" => GuardTest::Equals(value),
                    "!=" => GuardTest::NotEquals(value),
                    other => {
                        return Err(self.error(format!("unsupported #if operator '{other}'")));
                    }
                };
                Directive::Open(
                    Guard {
                        flag: interner::intern(flag),
                        test,
                    },
                    flag,
                )
            }
            "else" | "endif" => {
                if !args.is_empty() {
                    return Err(self.error(format!("#{keyword} takes no arguments")));
                }
                if keyword == "else" {
                    Directive::Else
                } else {
                    Directive::EndIf
                }
            }
            "elif" => return Err(self.error("#elif is not supported, nest #ifdef blocks instead")),
            _ => return Ok(None),
        };
        Ok(Some(directive))
    }

    fn identifier<'s>(&self, word: &'s str) -> Result<&'s str> {
        let mut chars = word.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(word)
        } else {
            Err(self.error(format!("invalid flag name '{word}'")))
        }
    }

    fn text_line(&mut self, line: &str) -> Result<()> {
        let mut rest = line;
        while let Some(pos) = rest.find('$') {
            self.push_text(&rest[..pos]);
            let after = &rest[pos + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let marker = &after[..len];
            if marker.is_empty() {
                return Err(self.error("stray '$' without a token name"));
            }
            let Some(kind) = TokenKind::from_marker(marker) else {
                return Err(self.error(format!("malformed token '${marker}'")));
            };
            self.tokens |= kind.bit();
            self.target().push(Node::Token(kind));
            rest = &after[len..];
        }
        self.push_text(rest);
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let nodes = self.target();
        if let Some(Node::Text(last)) = nodes.last_mut() {
            last.push_str(text);
        } else {
            nodes.push(Node::Text(text.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::feature_set::FeatureSet;
    use crate::renderer::pipeline::tokens::{TokenBindings, TokenResolver};

    fn render(source: &str, features: &FeatureSet, bindings: &TokenBindings) -> String {
        let template = Template::parse("test", source).unwrap();
        let mut segments = Vec::new();
        template.evaluate(&FeatureScope::new(features, None), &mut segments);
        TokenResolver::resolve("test", &segments, bindings).unwrap()
    }

    fn syntax_error(source: &str) -> (usize, String) {
        match Template::parse("broken", source) {
            Err(WeaveError::TemplateSyntax { chunk, line, message }) => {
                assert_eq!(chunk, "broken");
                (line, message)
            }
            other => panic!("expected TemplateSyntax, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_scenario() {
        let features = FeatureSet::new().with_flag("F", true);
        let bindings = TokenBindings::new().with(TokenKind::Sampler, "tex0");

        let text = render("a\n#ifdef F\nb$SAMPLER\n#endif\nc", &features, &bindings);
        assert_eq!(text, "a\nbtex0\nc");
    }

    #[test]
    fn test_guard_excludes_body_when_false() {
        let source = "x = 1.0;\n#ifdef MAPFLOAT\nx *= material_gloss;\n#endif\n";
        let off = render(source, &FeatureSet::new().with_flag("MAPFLOAT", false), &TokenBindings::new());
        let on = render(source, &FeatureSet::new().with_flag("MAPFLOAT", true), &TokenBindings::new());

        assert_eq!(off, "x = 1.0;\n");
        assert_eq!(on, "x = 1.0;\nx *= material_gloss;\n");
    }

    #[test]
    fn test_absent_flag_reads_false() {
        let text = render(
            "#ifdef NEVER_SET\nA\n#else\nB\n#endif\n#ifndef NEVER_SET\nC\n#endif\n",
            &FeatureSet::new(),
            &TokenBindings::new(),
        );
        assert_eq!(text, "B\nC\n");
    }

    #[test]
    fn test_nested_blocks_only_evaluated_inside_retained_parent() {
        let source = "#ifdef OUTER\no\n#ifdef INNER\ni\n#else\nn\n#endif\n#endif\n";

        let both = FeatureSet::new().with_flag("OUTER", true).with_flag("INNER", true);
        let inner_only = FeatureSet::new().with_flag("INNER", true);
        let outer_only = FeatureSet::new().with_flag("OUTER", true);

        assert_eq!(render(source, &both, &TokenBindings::new()), "o\ni\n");
        assert_eq!(render(source, &inner_only, &TokenBindings::new()), "");
        assert_eq!(render(source, &outer_only, &TokenBindings::new()), "o\nn\n");
    }

    #[test]
    fn test_enum_guards() {
        let source = "#if ALPHA_MODE == MASK\nalphaTest();\n#endif\n#if ALPHA_MODE != BLEND\nopaque();\n#endif\n";

        let mask = FeatureSet::new().with_enum("ALPHA_MODE", "MASK");
        let blend = FeatureSet::new().with_enum("ALPHA_MODE", "BLEND");

        assert_eq!(render(source, &mask, &TokenBindings::new()), "alphaTest();\nopaque();\n");
        assert_eq!(render(source, &blend, &TokenBindings::new()), "");
        assert_eq!(render(source, &FeatureSet::new(), &TokenBindings::new()), "opaque();\n");
    }

    #[test]
    fn test_other_preprocessor_lines_are_text() {
        let text = render(
            "#version 300 es\n#define PI 3.14159\n",
            &FeatureSet::new(),
            &TokenBindings::new(),
        );
        assert_eq!(text, "#version 300 es\n#define PI 3.14159\n");
    }

    #[test]
    fn test_referenced_flags_sorted_and_deduplicated() {
        let template = Template::parse(
            "gloss",
            "#ifdef MAPVERTEX\n#endif\n#ifdef MAPFLOAT\n#ifdef MAPVERTEX\n#endif\n#endif\n",
        )
        .unwrap();
        let names: Vec<_> = template
            .referenced_flags()
            .iter()
            .map(|&sym| interner::resolve(sym))
            .collect();
        assert_eq!(names, vec!["MAPFLOAT", "MAPVERTEX"]);
    }

    #[test]
    fn test_token_kinds_recorded() {
        let template = Template::parse("t", "texture2D($SAMPLER, $UV).$CH\n").unwrap();
        assert_eq!(
            template.tokens(),
            TokenKinds::SAMPLER | TokenKinds::UV | TokenKinds::CHANNEL
        );
    }

    #[test]
    fn test_unclosed_block_reports_opening_line() {
        let (line, message) = syntax_error("a\n#ifdef MAPTEXTURE\nb\n");
        assert_eq!(line, 2);
        assert!(message.contains("MAPTEXTURE"));
    }

    #[test]
    fn test_unmatched_endif_and_else() {
        assert_eq!(syntax_error("a\n#endif\n").0, 2);
        assert_eq!(syntax_error("#else\n").0, 1);
        assert_eq!(syntax_error("#ifdef A\n#else\n#else\n#endif\n").0, 3);
    }

    #[test]
    fn test_malformed_tokens() {
        let (_, message) = syntax_error("value.$CHANNEL\n");
        assert!(message.contains("$CHANNEL"));
        let (line, _) = syntax_error("ok\ncost = $ 5;\n");
        assert_eq!(line, 2);
    }

    #[test]
    fn test_malformed_guards() {
        syntax_error("#ifdef\n#endif\n");
        syntax_error("#ifdef A B\n#endif\n");
        syntax_error("#if A > B\n#endif\n");
        syntax_error("#ifdef A\n#elif B\n#endif\n");
        syntax_error("#ifdef 9LIVES\n#endif\n");
    }
}
