//! CartoCSS parser
//!
//! Tokenizes with `cssparser` and reads the LESS-flavoured Carto grammar
//! (variables, nested rulesets, attribute and zoom filters, attachments and
//! instance-prefixed properties) into a [`Stylesheet`].

use std::sync::Arc;

use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::error::{CartoError, Result, SourceLocation};
use crate::filter::FilterOp;
use crate::rule::PropertyRule;
use crate::selector::Element;
use crate::tree::{Ruleset, SelectorPart, SelectorSpec, Stylesheet, Variable};
use crate::value::{Expression, Value};

#[derive(Debug, Clone, PartialEq)]
enum Lex {
    Ident(String),
    AtKeyword(String),
    Hash(String),
    Quoted(String),
    Number(String),
    Dimension { number: String, unit: String },
    Percentage(String),
    Url(String),
    Function(String, Vec<Lexeme>),
    Delim(char),
    Colon,
    Semicolon,
    Comma,
    Whitespace,
    Paren(Vec<Lexeme>),
    Square(Vec<Lexeme>),
    Curly(Vec<Lexeme>),
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Lexeme {
    lex: Lex,
    line: u32,
}

fn collect(parser: &mut Parser<'_, '_>) -> Vec<Lexeme> {
    let mut out = Vec::new();
    loop {
        let line = parser.current_source_location().line + 1;
        let start = parser.position();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let lex = match token {
            Token::Ident(name) => Lex::Ident(name.to_string()),
            Token::AtKeyword(name) => Lex::AtKeyword(name.to_string()),
            Token::Hash(value) | Token::IDHash(value) => Lex::Hash(value.to_string()),
            Token::QuotedString(text) => Lex::Quoted(text.to_string()),
            Token::UnquotedUrl(url) => Lex::Url(url.to_string()),
            Token::Number { .. } => Lex::Number(parser.slice_from(start).to_string()),
            Token::Percentage { .. } => {
                Lex::Percentage(parser.slice_from(start).trim_end_matches('%').to_string())
            }
            Token::Dimension { unit, .. } => {
                let raw = parser.slice_from(start);
                let number = raw.get(..raw.len().saturating_sub(unit.len())).unwrap_or(raw);
                Lex::Dimension {
                    number: number.to_string(),
                    unit: unit.to_string(),
                }
            }
            Token::Delim(c) => Lex::Delim(c),
            Token::Colon => Lex::Colon,
            Token::Semicolon => Lex::Semicolon,
            Token::Comma => Lex::Comma,
            Token::WhiteSpace(_) => Lex::Whitespace,
            Token::Function(name) => Lex::Function(name.to_string(), nested(parser)),
            Token::ParenthesisBlock => Lex::Paren(nested(parser)),
            Token::SquareBracketBlock => Lex::Square(nested(parser)),
            Token::CurlyBracketBlock => Lex::Curly(nested(parser)),
            _ => Lex::Other(parser.slice_from(start).to_string()),
        };
        out.push(Lexeme { lex, line });
    }
    out
}

fn nested<'i>(parser: &mut Parser<'i, '_>) -> Vec<Lexeme> {
    parser
        .parse_nested_block(|inner| Ok::<_, ParseError<'i, ()>>(collect(inner)))
        .unwrap_or_default()
}

/// Blank out `//` line comments, keeping line breaks and string contents.
fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    let mut previous = '\n';
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    out.push(c);
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                    continue;
                }
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                out.push(c);
            }
            None if c == '/' && chars.peek() == Some(&'*') => {
                out.push(c);
                let mut last = '\0';
                for inner in chars.by_ref() {
                    out.push(inner);
                    if last == '*' && inner == '/' {
                        break;
                    }
                    last = inner;
                }
            }
            // `url(http://...)` keeps its scheme separator
            None if c == '/' && chars.peek() == Some(&'/') && previous != ':' => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            None => out.push(c),
        }
        previous = c;
    }
    out
}

/// Render lexemes back to source text.
fn text_of(items: &[Lexeme]) -> String {
    let mut out = String::new();
    for item in items {
        match &item.lex {
            Lex::Ident(s) | Lex::Number(s) | Lex::Other(s) => out.push_str(s),
            Lex::AtKeyword(s) => {
                out.push('@');
                out.push_str(s);
            }
            Lex::Hash(s) => {
                out.push('#');
                out.push_str(s);
            }
            Lex::Quoted(s) => {
                out.push('"');
                out.push_str(s);
                out.push('"');
            }
            Lex::Dimension { number, unit } => {
                out.push_str(number);
                out.push_str(unit);
            }
            Lex::Percentage(s) => {
                out.push_str(s);
                out.push('%');
            }
            Lex::Url(s) => {
                out.push_str("url(");
                out.push_str(s);
                out.push(')');
            }
            Lex::Function(name, args) => {
                out.push_str(name);
                out.push('(');
                out.push_str(&text_of(args));
                out.push(')');
            }
            Lex::Delim(c) => out.push(*c),
            Lex::Colon => out.push(':'),
            Lex::Semicolon => out.push(';'),
            Lex::Comma => out.push(','),
            Lex::Whitespace => out.push(' '),
            Lex::Paren(inner) => {
                out.push('(');
                out.push_str(&text_of(inner));
                out.push(')');
            }
            Lex::Square(inner) => {
                out.push('[');
                out.push_str(&text_of(inner));
                out.push(']');
            }
            Lex::Curly(inner) => {
                out.push('{');
                out.push_str(&text_of(inner));
                out.push('}');
            }
        }
    }
    out
}

fn significant(items: &[Lexeme]) -> impl Iterator<Item = &Lexeme> {
    items.iter().filter(|item| item.lex != Lex::Whitespace)
}

fn split_commas(items: &[Lexeme]) -> Vec<&[Lexeme]> {
    items.split(|item| item.lex == Lex::Comma).collect()
}

/// Reader for one stylesheet file.
pub struct CartoParser {
    file: Arc<str>,
    next_index: u32,
}

impl CartoParser {
    pub fn new(file: impl Into<Arc<str>>) -> Self {
        Self {
            file: file.into(),
            next_index: 0,
        }
    }

    /// Start numbering selectors and declarations at `base`.
    pub fn with_index_base(mut self, base: u32) -> Self {
        self.next_index = base;
        self
    }

    /// Index the next selector or declaration will receive.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Parse a whole stylesheet.
    pub fn parse(&mut self, css: &str) -> Result<Stylesheet> {
        let source = strip_line_comments(css);
        let mut input = ParserInput::new(&source);
        let mut parser = Parser::new(&mut input);
        let items = collect(&mut parser);

        let mut stylesheet = Stylesheet::new(self.file.clone());
        let mut rules = Vec::new();
        self.parse_block(
            &items,
            &mut stylesheet.variables,
            &mut rules,
            &mut stylesheet.rulesets,
        )?;
        if let Some(rule) = rules.first() {
            return Err(CartoError::parse(
                format!("declaration '{}' outside of a ruleset", rule.name),
                rule.location.clone(),
            ));
        }
        Ok(stylesheet)
    }

    fn location(&self, line: u32) -> SourceLocation {
        SourceLocation::new(self.file.clone(), line)
    }

    fn take_index(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn parse_block(
        &mut self,
        items: &[Lexeme],
        variables: &mut Vec<Variable>,
        rules: &mut Vec<PropertyRule>,
        children: &mut Vec<Ruleset>,
    ) -> Result<()> {
        let mut pos = 0;
        while pos < items.len() {
            let item = &items[pos];
            match &item.lex {
                Lex::Whitespace | Lex::Semicolon => {
                    pos += 1;
                    continue;
                }
                Lex::AtKeyword(name) => {
                    let end = find(items, pos, |lex| *lex == Lex::Semicolon).unwrap_or(items.len());
                    variables.push(self.parse_variable(name, &items[pos + 1..end], item.line)?);
                    pos = end + 1;
                    continue;
                }
                _ => {}
            }

            let end = find(items, pos, |lex| {
                matches!(lex, Lex::Semicolon | Lex::Curly(_))
            });
            match end.map(|end| (end, &items[end].lex)) {
                Some((end, Lex::Curly(body))) => {
                    let ruleset = self.parse_ruleset(&items[pos..end], body, variables, item.line)?;
                    children.push(ruleset);
                    pos = end + 1;
                }
                Some((end, _)) => {
                    rules.push(self.parse_declaration(&items[pos..end], item.line)?);
                    pos = end + 1;
                }
                None => {
                    rules.push(self.parse_declaration(&items[pos..], item.line)?);
                    pos = items.len();
                }
            }
        }
        Ok(())
    }

    fn parse_variable(&self, name: &str, rest: &[Lexeme], line: u32) -> Result<Variable> {
        let location = self.location(line);
        let mut iter = rest.iter().enumerate().filter(|(_, item)| item.lex != Lex::Whitespace);
        match iter.next() {
            Some((colon, item)) if item.lex == Lex::Colon => {
                let value = self.parse_value(&rest[colon + 1..], &location)?;
                Ok(Variable {
                    name: name.to_string(),
                    value: Arc::new(Expression::new(value, location)),
                })
            }
            _ => Err(CartoError::parse(
                format!("expected ':' after '@{name}'"),
                location,
            )),
        }
    }

    fn parse_ruleset(
        &mut self,
        head: &[Lexeme],
        body: &[Lexeme],
        variables: &mut Vec<Variable>,
        line: u32,
    ) -> Result<Ruleset> {
        let location = self.location(line);
        let mut selectors = Vec::new();
        for part in split_commas(head) {
            selectors.push(self.parse_selector(part, &location)?);
        }
        let mut ruleset = Ruleset {
            selectors,
            rules: Vec::new(),
            children: Vec::new(),
            location,
        };
        self.parse_block(body, variables, &mut ruleset.rules, &mut ruleset.children)?;
        Ok(ruleset)
    }

    fn parse_selector(&mut self, items: &[Lexeme], fallback: &SourceLocation) -> Result<SelectorSpec> {
        let mut tokens = significant(items).peekable();
        let location = tokens
            .peek()
            .map(|item| self.location(item.line))
            .unwrap_or_else(|| fallback.clone());
        let mut parts = Vec::new();

        while let Some(item) = tokens.next() {
            let part = match &item.lex {
                Lex::Hash(id) => SelectorPart::Element(Element::parse(&format!("#{id}"))),
                Lex::Delim('*') => SelectorPart::Element(Element::parse("*")),
                Lex::Ident(name) => SelectorPart::Element(Element::parse(name)),
                Lex::Delim('.') => match tokens.next().map(|item| &item.lex) {
                    Some(Lex::Ident(class)) => SelectorPart::Element(Element::parse(&format!(".{class}"))),
                    _ => return Err(CartoError::parse("expected class name after '.'", location)),
                },
                Lex::Square(inner) => self.parse_filter(inner, &self.location(item.line))?,
                Lex::Colon => match (tokens.next().map(|i| &i.lex), tokens.next().map(|i| &i.lex)) {
                    (Some(Lex::Colon), Some(Lex::Ident(name))) => SelectorPart::Attachment(name.clone()),
                    _ => return Err(CartoError::parse("expected '::attachment'", location)),
                },
                other => {
                    return Err(CartoError::parse(
                        format!("unexpected '{}' in selector", text_of(&[Lexeme { lex: other.clone(), line: item.line }])),
                        location,
                    ));
                }
            };
            parts.push(part);
        }

        if parts.is_empty() {
            return Err(CartoError::parse("empty selector", location));
        }
        Ok(SelectorSpec {
            parts,
            index: self.take_index(),
            location,
        })
    }

    fn parse_filter(&self, inner: &[Lexeme], location: &SourceLocation) -> Result<SelectorPart> {
        let op_start = inner
            .iter()
            .position(|item| matches!(item.lex, Lex::Delim('=' | '!' | '>' | '<' | '%')))
            .ok_or_else(|| CartoError::parse("filter has no comparison operator", location.clone()))?;
        let mut op_end = op_start;
        while matches!(inner.get(op_end).map(|i| &i.lex), Some(Lex::Delim('=' | '!' | '>' | '<' | '%' | '~'))) {
            op_end += 1;
        }

        let key = match significant(&inner[..op_start]).collect::<Vec<_>>().as_slice() {
            [Lexeme { lex: Lex::Quoted(key), .. }] => key.clone(),
            [] => return Err(CartoError::parse("filter has no key", location.clone())),
            _ => text_of(&inner[..op_start]).trim().to_string(),
        };
        let symbol = text_of(&inner[op_start..op_end]);
        let op = FilterOp::from_symbol(&symbol).ok_or_else(|| {
            CartoError::parse(format!("unknown filter operator '{symbol}'"), location.clone())
        })?;
        let value = self.parse_value(&inner[op_end..], location)?;
        let value = Arc::new(Expression::new(value, location.clone()));

        if key == "zoom" {
            Ok(SelectorPart::Zoom { op, value })
        } else {
            Ok(SelectorPart::Filter { key, op, value })
        }
    }

    fn parse_declaration(&mut self, items: &[Lexeme], line: u32) -> Result<PropertyRule> {
        let location = self.location(line);
        let colon = items
            .iter()
            .position(|item| item.lex == Lex::Colon)
            .ok_or_else(|| {
                CartoError::parse(
                    format!("expected ':' in declaration '{}'", text_of(items).trim()),
                    location.clone(),
                )
            })?;
        let name: String = text_of(&items[..colon]).split_whitespace().collect();
        if name.is_empty() {
            return Err(CartoError::parse("declaration has no property name", location));
        }
        let value = self.parse_value(&items[colon + 1..], &location)?;
        let expression = Arc::new(Expression::new(value, location.clone()));
        Ok(PropertyRule::new(&name, expression, self.take_index(), location))
    }

    fn parse_value(&self, items: &[Lexeme], location: &SourceLocation) -> Result<Value> {
        let mut list = Vec::new();
        for part in split_commas(items) {
            let mut terms = Vec::new();
            for item in significant(part) {
                terms.push(self.parse_term(item, location)?);
            }
            match terms.len() {
                0 => {
                    return Err(CartoError::parse("missing value", location.clone()));
                }
                1 => list.extend(terms),
                _ => list.push(Value::Sequence(terms)),
            }
        }
        Ok(if list.len() == 1 {
            list.remove(0)
        } else {
            Value::List(list)
        })
    }

    fn parse_term(&self, item: &Lexeme, location: &SourceLocation) -> Result<Value> {
        let number = |raw: &str| {
            raw.parse::<f64>().map_err(|_| {
                CartoError::parse(format!("invalid number '{raw}'"), location.clone())
            })
        };
        Ok(match &item.lex {
            Lex::Ident(word) => Value::Keyword(word.clone()),
            Lex::Number(raw) => Value::number(number(raw)?),
            Lex::Dimension { number: raw, unit } => Value::Number {
                value: number(raw)?,
                unit: Some(unit.clone()),
            },
            Lex::Percentage(raw) => Value::Percentage(number(raw)?),
            Lex::Hash(color) => Value::Color(format!("#{color}")),
            Lex::Quoted(text) => Value::Quoted(text.clone()),
            Lex::AtKeyword(name) => Value::Variable(name.clone()),
            Lex::Square(inner) => Value::Field(text_of(inner).trim().to_string()),
            Lex::Url(url) => Value::Url(url.clone()),
            Lex::Function(name, args) if name.eq_ignore_ascii_case("url") => {
                match significant(args).next().map(|arg| &arg.lex) {
                    Some(Lex::Quoted(path)) => Value::Url(path.clone()),
                    _ => Value::Url(text_of(args).trim().to_string()),
                }
            }
            Lex::Function(name, args) => {
                let args = if significant(args).next().is_none() {
                    Vec::new()
                } else {
                    match self.parse_value(args, location)? {
                        Value::List(args) => args,
                        single => vec![single],
                    }
                };
                Value::Function {
                    name: name.clone(),
                    args,
                }
            }
            Lex::Paren(inner) => self.parse_value(inner, location)?,
            Lex::Delim(op) => Value::Operator(*op),
            other => {
                return Err(CartoError::parse(
                    format!(
                        "unexpected '{}' in value",
                        text_of(&[Lexeme {
                            lex: other.clone(),
                            line: item.line
                        }])
                    ),
                    SourceLocation::new(location.file.clone(), item.line),
                ));
            }
        })
    }
}

fn find(items: &[Lexeme], from: usize, pred: impl Fn(&Lex) -> bool) -> Option<usize> {
    items[from..]
        .iter()
        .position(|item| pred(&item.lex))
        .map(|offset| from + offset)
}

/// Parse `css` as the stylesheet `file`, numbering from zero.
pub fn parse_stylesheet(file: &str, css: &str) -> Result<Stylesheet> {
    CartoParser::new(file).parse(css)
}
