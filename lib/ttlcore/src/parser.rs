//! An LL(1) recursive-descent parser for Turtle, driving a [`Sink`].

use std::collections::HashMap;

use thiserror::Error;

use crate::blank::BlankNodeGenerator;
use crate::lexer::{LexError, Lexer, Token};
use crate::model::{vocab, Term};
use crate::uri::Uri;

/// A single parse-error value: every lexical, grammar, escape, reference,
/// or URI-syntax failure surfaces through this type, carrying a message and
/// the source line it was found on. There is no recovery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl ParseError {
    fn new(line: u32, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            line,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        let line = match &e {
            LexError::UnterminatedIriRef { line }
            | LexError::UnterminatedString { line }
            | LexError::UnterminatedBlankNodeLabel { line }
            | LexError::MalformedNumber { line }
            | LexError::UnexpectedChar { line, .. }
            | LexError::IllegalIriChar { line } => *line,
        };
        ParseError::new(line, e.to_string())
    }
}

/// The event interface a parser drives. Every method but `count` can fail
/// (emitters write to an underlying I/O stream); `triple` is the only one
/// without a no-op default, since a sink that ignores triples has no
/// purpose.
pub trait Sink {
    fn start(&mut self) -> std::io::Result<()> {
        Ok(())
    }
    fn document(&mut self, source_iri: &str) -> std::io::Result<()> {
        let _ = source_iri;
        Ok(())
    }
    fn prefix(&mut self, prefix: &str, namespace: &str) -> std::io::Result<()> {
        let _ = (prefix, namespace);
        Ok(())
    }
    fn triple(&mut self, subject: &Term, predicate: &Term, object: &Term) -> std::io::Result<()>;
    fn end(&mut self) -> std::io::Result<()> {
        Ok(())
    }
    fn count(&self) -> u64 {
        0
    }
}

#[derive(PartialEq)]
enum EscapeMode {
    StringLiteral,
    IriRef,
}

fn is_forbidden_iri_char(b: u8) -> bool {
    matches!(
        b,
        b'<' | b'>' | b'"' | b'{' | b'}' | b'|' | b'^' | b'`' | b'\\'
    )
}

/// Parse the `\uXXXX` / `\UXXXXXXXX` escape starting at `s[0]` (a
/// backslash). Returns the code point and the total length of the escape,
/// backslash included.
fn parse_u_escape(s: &str) -> Result<(u32, usize), ()> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 {
        return Err(());
    }
    let n = match bytes[1] {
        b'u' => 4,
        b'U' => 8,
        _ => return Err(()),
    };
    if bytes.len() < 2 + n {
        return Err(());
    }
    let hex = std::str::from_utf8(&bytes[2..2 + n]).map_err(|_| ())?;
    let cp = u32::from_str_radix(hex, 16).map_err(|_| ())?;
    Ok((cp, 2 + n))
}

fn decode_escapes(s: &str, mode: EscapeMode) -> Result<String, String> {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            let ch = s[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }
        if i + 1 >= bytes.len() {
            return Err("trailing backslash".to_string());
        }
        match bytes[i + 1] {
            b'n' if mode == EscapeMode::StringLiteral => {
                out.push('\n');
                i += 2;
            }
            b'r' if mode == EscapeMode::StringLiteral => {
                out.push('\r');
                i += 2;
            }
            b't' if mode == EscapeMode::StringLiteral => {
                out.push('\t');
                i += 2;
            }
            b'f' if mode == EscapeMode::StringLiteral => {
                out.push('\u{0C}');
                i += 2;
            }
            b'b' if mode == EscapeMode::StringLiteral => {
                out.push('\u{08}');
                i += 2;
            }
            b'"' if mode == EscapeMode::StringLiteral => {
                out.push('"');
                i += 2;
            }
            b'\'' if mode == EscapeMode::StringLiteral => {
                out.push('\'');
                i += 2;
            }
            b'\\' => {
                out.push('\\');
                i += 2;
            }
            b'u' | b'U' => {
                let is_small = bytes[i + 1] == b'u';
                let (cp, total) = parse_u_escape(&s[i..]).map_err(|_| "malformed unicode escape".to_string())?;
                let mut code = cp;
                let mut advance = i + total;
                if is_small && crate::utf::is_high_surrogate(code) {
                    let tail = &s[advance..];
                    if tail.as_bytes().first() == Some(&b'\\') && tail.as_bytes().get(1) == Some(&b'u') {
                        let (low, total2) =
                            parse_u_escape(tail).map_err(|_| "malformed unicode escape".to_string())?;
                        if crate::utf::is_low_surrogate(low) {
                            code = crate::utf::combine_surrogates(code, low);
                            advance += total2;
                        } else {
                            return Err("unpaired UTF-16 surrogate".to_string());
                        }
                    } else {
                        return Err("unpaired UTF-16 surrogate".to_string());
                    }
                } else if is_small && crate::utf::is_low_surrogate(code) {
                    return Err("unpaired UTF-16 surrogate".to_string());
                }
                if mode == EscapeMode::IriRef
                    && (code <= 0x20 || (code < 128 && is_forbidden_iri_char(code as u8)))
                {
                    return Err("illegal character in IRI escape".to_string());
                }
                let ch = char::from_u32(code).ok_or("invalid code point")?;
                out.push(ch);
                i = advance;
            }
            other => {
                return Err(format!("illegal escape '\\{}'", other as char));
            }
        }
    }
    Ok(out)
}

fn unescape_local_name(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            out.push(bytes[i + 1] as char);
            i += 2;
        } else {
            let ch = s[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    out
}

/// Drives a [`Sink`] from Turtle source text.
pub struct TurtleParser<'a, 'b, S: Sink> {
    lexer: Lexer<'a>,
    lookahead: Option<(Token<'a>, u32)>,
    line: u32,
    base: Uri,
    prefixes: HashMap<String, String>,
    blanks: BlankNodeGenerator,
    sink: &'b mut S,
}

impl<'a, 'b, S: Sink> TurtleParser<'a, 'b, S> {
    pub fn new(input: &'a str, base_iri: &str, sink: &'b mut S) -> Result<Self, ParseError> {
        let base = Uri::parse(base_iri).map_err(|e| ParseError::new(0, e.to_string()))?;
        Ok(TurtleParser {
            lexer: Lexer::new(input),
            lookahead: None,
            line: 1,
            base,
            prefixes: HashMap::new(),
            blanks: BlankNodeGenerator::new(),
            sink,
        })
    }

    fn current_line(&self) -> u32 {
        self.lookahead.map(|(_, l)| l).unwrap_or(self.line)
    }

    fn peek(&mut self) -> Result<Token<'a>, ParseError> {
        if self.lookahead.is_none() {
            let (tok, line) = self.lexer.next()?;
            self.lookahead = Some((tok, line));
        }
        Ok(self.lookahead.unwrap().0)
    }

    fn next(&mut self) -> Result<Token<'a>, ParseError> {
        if let Some((tok, line)) = self.lookahead.take() {
            self.line = line;
            return Ok(tok);
        }
        let (tok, line) = self.lexer.next()?;
        self.line = line;
        Ok(tok)
    }

    fn expect(&mut self, expected: Token<'a>) -> Result<(), ParseError> {
        let tok = self.next()?;
        if tok == expected {
            Ok(())
        } else {
            Err(self.grammar_error(format!("expected {expected:?}, found {tok:?}")))
        }
    }

    fn grammar_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.current_line(), message.into())
    }

    fn escape_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, message.into())
    }

    fn reference_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, message.into())
    }

    fn uri_error(&self, e: impl std::fmt::Display) -> ParseError {
        ParseError::new(self.line, e.to_string())
    }

    fn sink_error(&self, e: std::io::Error) -> ParseError {
        ParseError::new(self.line, e.to_string())
    }

    /// Parse the entire input, driving `self.sink`.
    pub fn parse(&mut self) -> Result<(), ParseError> {
        self.sink.start().map_err(|e| self.sink_error(e))?;
        let base_iri = self.base.as_str().to_string();
        self.sink.document(&base_iri).map_err(|e| self.sink_error(e))?;
        loop {
            match self.peek()? {
                Token::Eof => break,
                Token::PrefixKw => self.parse_prefix_directive(true)?,
                Token::BaseKw => self.parse_base_directive(true)?,
                Token::SparqlPrefixKw => self.parse_prefix_directive(false)?,
                Token::SparqlBaseKw => self.parse_base_directive(false)?,
                _ => self.parse_triples()?,
            }
        }
        self.sink.end().map_err(|e| self.sink_error(e))?;
        Ok(())
    }

    fn parse_prefix_directive(&mut self, turtle_style: bool) -> Result<(), ParseError> {
        self.next()?;
        let prefix = match self.next()? {
            Token::PnameNs(l) => l[..l.len() - 1].to_string(),
            other => return Err(self.grammar_error(format!("expected prefix name, found {other:?}"))),
        };
        let iri_lexeme = match self.next()? {
            Token::IriRef(l) => l,
            other => return Err(self.grammar_error(format!("expected IRI reference, found {other:?}"))),
        };
        let raw = decode_escapes(&iri_lexeme[1..iri_lexeme.len() - 1], EscapeMode::IriRef)
            .map_err(|e| self.escape_error(e))?;
        let resolved = self.base.resolve(&raw).map_err(|e| self.uri_error(e))?;
        let ns = resolved.as_str().to_string();
        self.prefixes.insert(prefix.clone(), ns.clone());
        self.sink.prefix(&prefix, &ns).map_err(|e| self.sink_error(e))?;
        if turtle_style {
            self.expect(Token::Dot)?;
        }
        Ok(())
    }

    fn parse_base_directive(&mut self, turtle_style: bool) -> Result<(), ParseError> {
        self.next()?;
        let iri_lexeme = match self.next()? {
            Token::IriRef(l) => l,
            other => return Err(self.grammar_error(format!("expected IRI reference, found {other:?}"))),
        };
        let raw = decode_escapes(&iri_lexeme[1..iri_lexeme.len() - 1], EscapeMode::IriRef)
            .map_err(|e| self.escape_error(e))?;
        self.base = self.base.resolve(&raw).map_err(|e| self.uri_error(e))?;
        if turtle_style {
            self.expect(Token::Dot)?;
        }
        Ok(())
    }

    fn parse_triples(&mut self) -> Result<(), ParseError> {
        if self.peek()? == Token::LBracket {
            let subject = self.parse_blank_node_property_list()?;
            if self.peek()? != Token::Dot {
                self.parse_predicate_object_list(&subject)?;
            }
        } else {
            let subject = self.parse_subject()?;
            self.parse_predicate_object_list(&subject)?;
        }
        self.expect(Token::Dot)?;
        Ok(())
    }

    fn parse_subject(&mut self) -> Result<Term, ParseError> {
        match self.next()? {
            Token::IriRef(l) => Ok(Term::Iri(self.resolve_iriref(l)?)),
            Token::PnameNs(l) | Token::PnameLn(l) => Ok(Term::Iri(self.resolve_pname(l)?)),
            Token::BlankNodeLabel(l) => Ok(Term::BlankNode(self.blanks.generate_labeled(&l[2..]))),
            Token::LParen => self.parse_collection(),
            other => Err(self.grammar_error(format!("expected subject, found {other:?}"))),
        }
    }

    fn parse_verb(&mut self) -> Result<Term, ParseError> {
        match self.next()? {
            Token::A => Ok(Term::Iri(vocab::rdf::TYPE.to_string())),
            Token::IriRef(l) => Ok(Term::Iri(self.resolve_iriref(l)?)),
            Token::PnameNs(l) | Token::PnameLn(l) => Ok(Term::Iri(self.resolve_pname(l)?)),
            other => Err(self.grammar_error(format!("expected predicate, found {other:?}"))),
        }
    }

    fn parse_predicate_object_list(&mut self, subject: &Term) -> Result<(), ParseError> {
        loop {
            let verb = self.parse_verb()?;
            self.parse_object_list(subject, &verb)?;
            if self.peek()? == Token::Semicolon {
                self.next()?;
                match self.peek()? {
                    Token::Dot | Token::RBracket => break,
                    _ => continue,
                }
            }
            break;
        }
        Ok(())
    }

    fn parse_object_list(&mut self, subject: &Term, verb: &Term) -> Result<(), ParseError> {
        loop {
            let object = self.parse_object()?;
            self.sink.triple(subject, verb, &object).map_err(|e| self.sink_error(e))?;
            if self.peek()? == Token::Comma {
                self.next()?;
                continue;
            }
            break;
        }
        Ok(())
    }

    fn parse_object(&mut self) -> Result<Term, ParseError> {
        match self.peek()? {
            Token::LBracket => self.parse_blank_node_property_list(),
            Token::LParen => {
                self.next()?;
                self.parse_collection()
            }
            Token::IriRef(l) => {
                self.next()?;
                Ok(Term::Iri(self.resolve_iriref(l)?))
            }
            Token::PnameNs(l) | Token::PnameLn(l) => {
                self.next()?;
                Ok(Term::Iri(self.resolve_pname(l)?))
            }
            Token::BlankNodeLabel(l) => {
                self.next()?;
                Ok(Term::BlankNode(self.blanks.generate_labeled(&l[2..])))
            }
            Token::True => {
                self.next()?;
                Ok(Term::Boolean("true".to_string()))
            }
            Token::False => {
                self.next()?;
                Ok(Term::Boolean("false".to_string()))
            }
            Token::Integer(l) => {
                self.next()?;
                Ok(Term::Integer(l.to_string()))
            }
            Token::Decimal(l) => {
                self.next()?;
                Ok(Term::Decimal(l.to_string()))
            }
            Token::Double(l) => {
                self.next()?;
                Ok(Term::Double(l.to_string()))
            }
            Token::StringLiteralQuote(_)
            | Token::StringLiteralSingleQuote(_)
            | Token::StringLiteralLongQuote(_)
            | Token::StringLiteralLongSingleQuote(_) => self.parse_rdf_literal(),
            other => Err(self.grammar_error(format!("expected object, found {other:?}"))),
        }
    }

    fn parse_collection(&mut self) -> Result<Term, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.peek()? == Token::RParen {
                self.next()?;
                break;
            }
            items.push(self.parse_object()?);
        }
        Ok(Term::List(items))
    }

    fn parse_blank_node_property_list(&mut self) -> Result<Term, ParseError> {
        self.expect(Token::LBracket)?;
        let subject = Term::BlankNode(self.blanks.generate());
        if self.peek()? != Token::RBracket {
            self.parse_predicate_object_list(&subject)?;
        }
        self.expect(Token::RBracket)?;
        Ok(subject)
    }

    fn parse_rdf_literal(&mut self) -> Result<Term, ParseError> {
        let lexical = match self.next()? {
            Token::StringLiteralQuote(l) | Token::StringLiteralSingleQuote(l) => {
                decode_escapes(&l[1..l.len() - 1], EscapeMode::StringLiteral).map_err(|e| self.escape_error(e))?
            }
            Token::StringLiteralLongQuote(l) | Token::StringLiteralLongSingleQuote(l) => {
                decode_escapes(&l[3..l.len() - 3], EscapeMode::StringLiteral).map_err(|e| self.escape_error(e))?
            }
            other => return Err(self.grammar_error(format!("expected string literal, found {other:?}"))),
        };
        match self.peek()? {
            Token::LangTag(l) => {
                self.next()?;
                Ok(Term::String {
                    lexical,
                    language: Some(l[1..].to_string()),
                })
            }
            Token::DoubleCaret => {
                self.next()?;
                let datatype = match self.next()? {
                    Token::IriRef(l) => self.resolve_iriref(l)?,
                    Token::PnameNs(l) | Token::PnameLn(l) => self.resolve_pname(l)?,
                    other => return Err(self.grammar_error(format!("expected datatype IRI, found {other:?}"))),
                };
                Ok(typed_literal(lexical, datatype))
            }
            _ => Ok(Term::String {
                lexical,
                language: None,
            }),
        }
    }

    fn resolve_iriref(&mut self, lexeme: &str) -> Result<String, ParseError> {
        let inner = &lexeme[1..lexeme.len() - 1];
        let raw = decode_escapes(inner, EscapeMode::IriRef).map_err(|e| self.escape_error(e))?;
        let resolved = self.base.resolve(&raw).map_err(|e| self.uri_error(e))?;
        Ok(resolved.as_str().to_string())
    }

    fn resolve_pname(&self, lexeme: &str) -> Result<String, ParseError> {
        let colon = lexeme.find(':').expect("PNAME lexeme always contains ':'");
        let prefix = &lexeme[..colon];
        let local_raw = &lexeme[colon + 1..];
        let ns = self
            .prefixes
            .get(prefix)
            .ok_or_else(|| self.reference_error(format!("unknown prefix '{prefix}'")))?;
        Ok(format!("{ns}{}", unescape_local_name(local_raw)))
    }
}

fn typed_literal(lexical: String, datatype: String) -> Term {
    match datatype.as_str() {
        vocab::xsd::INTEGER => Term::Integer(lexical),
        vocab::xsd::DECIMAL => Term::Decimal(lexical),
        vocab::xsd::DOUBLE => Term::Double(lexical),
        vocab::xsd::BOOLEAN => Term::Boolean(lexical),
        vocab::xsd::STRING => Term::String {
            lexical,
            language: None,
        },
        _ => Term::Other { lexical, datatype },
    }
}

/// Parse `input` (a Turtle document) against `base_iri`, driving `sink`.
pub fn parse<S: Sink>(input: &str, base_iri: &str, sink: &mut S) -> Result<(), ParseError> {
    let mut parser = TurtleParser::new(input, base_iri, sink)?;
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        triples: Vec<(Term, Term, Term)>,
        prefixes: Vec<(String, String)>,
        document: Option<String>,
        ended: bool,
    }

    impl Sink for RecordingSink {
        fn document(&mut self, source_iri: &str) -> std::io::Result<()> {
            self.document = Some(source_iri.to_string());
            Ok(())
        }

        fn prefix(&mut self, prefix: &str, namespace: &str) -> std::io::Result<()> {
            self.prefixes.push((prefix.to_string(), namespace.to_string()));
            Ok(())
        }

        fn triple(&mut self, subject: &Term, predicate: &Term, object: &Term) -> std::io::Result<()> {
            self.triples.push((subject.clone(), predicate.clone(), object.clone()));
            Ok(())
        }

        fn end(&mut self) -> std::io::Result<()> {
            self.ended = true;
            Ok(())
        }

        fn count(&self) -> u64 {
            self.triples.len() as u64
        }
    }

    #[test]
    fn parses_prefixed_triple() {
        let mut sink = RecordingSink::default();
        parse(
            "@prefix ex: <http://example.org/> .\nex:s ex:p ex:o .\n",
            "http://localhost/",
            &mut sink,
        )
        .unwrap();
        assert_eq!(sink.triples.len(), 1);
        assert_eq!(sink.triples[0].0, Term::iri("http://example.org/s"));
        assert!(sink.ended);
    }

    #[test]
    fn resolves_relative_iris_against_base() {
        let mut sink = RecordingSink::default();
        parse("<s> <p> <o> .", "http://example.org/base/", &mut sink).unwrap();
        assert_eq!(sink.triples[0].0, Term::iri("http://example.org/base/s"));
    }

    #[test]
    fn surrogate_pair_in_iri_and_string_literal() {
        let mut sink = RecordingSink::default();
        let doc = "@prefix ex: <http://example.org#> .\n<http://localhost/test#\u{29154}> ex:value \"\u{29154}\".\n";
        parse(doc, "http://localhost/test", &mut sink).unwrap();
        assert_eq!(sink.triples.len(), 1);
        match &sink.triples[0].0 {
            Term::Iri(s) => assert!(s.ends_with('\u{29154}')),
            other => panic!("expected IRI subject, got {other:?}"),
        }
        match &sink.triples[0].2 {
            Term::String { lexical, language } => {
                assert_eq!(lexical, "\u{29154}");
                assert_eq!(*language, None);
            }
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn collection_produces_list_term() {
        let mut sink = RecordingSink::default();
        parse("<s> <p> ( 1 2 3 ) .", "http://example.org/", &mut sink).unwrap();
        match &sink.triples[0].2 {
            Term::List(items) => assert_eq!(items.len(), 3),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn empty_collection_is_nil_after_emission_shape() {
        let mut sink = RecordingSink::default();
        parse("<s> <p> () .", "http://example.org/", &mut sink).unwrap();
        match &sink.triples[0].2 {
            Term::List(items) => assert!(items.is_empty()),
            other => panic!("expected empty list, got {other:?}"),
        }
    }

    #[test]
    fn blank_node_property_list_as_subject() {
        let mut sink = RecordingSink::default();
        parse("[ <p> 1 ; <q> 2 ] <outer> <o> .", "http://example.org/", &mut sink).unwrap();
        assert_eq!(sink.triples.len(), 3);
        let subj = &sink.triples[0].0;
        assert!(matches!(subj, Term::BlankNode(_)));
        assert_eq!(&sink.triples[1].0, subj);
        assert_eq!(&sink.triples[2].0, subj);
    }

    #[test]
    fn untyped_datatype_literal_passes_through_lexical() {
        let mut sink = RecordingSink::default();
        parse(
            "<s> <p> \"abc\"^^<http://www.w3.org/2001/XMLSchema#integer> .",
            "http://example.org/",
            &mut sink,
        )
        .unwrap();
        assert_eq!(sink.triples[0].2, Term::Integer("abc".to_string()));
    }

    #[test]
    fn unknown_prefix_is_a_reference_error() {
        let mut sink = RecordingSink::default();
        let err = parse("ex:s ex:p ex:o .", "http://example.org/", &mut sink).unwrap_err();
        assert!(err.message.contains("unknown prefix"));
    }
}
