//! The N-Triples emitter: expands Turtle collections into `rdf:first`/
//! `rdf:rest` chains and writes one `subject predicate object .` line per
//! triple.

use std::io::{self, Write};

use crate::blank::BlankNodeGenerator;
use crate::model::{vocab, Term};
use crate::parser::Sink;

/// Writes N-Triples to `W`, expanding collections as it goes.
///
/// Owns its own [`BlankNodeGenerator`], independent of whatever generator a
/// parser feeding it used — collection-expansion blanks and document-level
/// blanks are drawn from disjoint id spaces, so the two generators never
/// need to coordinate.
pub struct NTriplesEmitter<W: Write> {
    out: W,
    blanks: BlankNodeGenerator,
    count: u64,
}

impl<W: Write> NTriplesEmitter<W> {
    pub fn new(out: W) -> Self {
        NTriplesEmitter {
            out,
            blanks: BlankNodeGenerator::new(),
            count: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Replace `term` with the node that should appear in the triple being
    /// written, collecting any `rdf:first`/`rdf:rest` triples a list
    /// expansion produces into `expansions`.
    fn expand(&mut self, term: &Term, expansions: &mut Vec<(Term, Term, Term)>) -> Term {
        match term {
            Term::List(items) if items.is_empty() => Term::Iri(vocab::rdf::NIL.to_string()),
            Term::List(items) => {
                let cells: Vec<Term> = (0..items.len())
                    .map(|_| Term::BlankNode(self.blanks.generate()))
                    .collect();
                for (i, item) in items.iter().enumerate() {
                    let elem = self.expand(item, expansions);
                    let rest = cells.get(i + 1).cloned().unwrap_or(Term::Iri(vocab::rdf::NIL.to_string()));
                    expansions.push((cells[i].clone(), Term::Iri(vocab::rdf::FIRST.to_string()), elem));
                    expansions.push((cells[i].clone(), Term::Iri(vocab::rdf::REST.to_string()), rest));
                }
                cells[0].clone()
            }
            other => other.clone(),
        }
    }

    fn write_triple(&mut self, s: &Term, p: &Term, o: &Term) -> io::Result<()> {
        writeln!(
            self.out,
            "{} {} {} .",
            format_resource(s),
            format_resource(p),
            format_object(o)
        )?;
        self.count += 1;
        Ok(())
    }
}

impl<W: Write> Sink for NTriplesEmitter<W> {
    fn triple(&mut self, subject: &Term, predicate: &Term, object: &Term) -> io::Result<()> {
        let mut expansions = Vec::new();
        let s = self.expand(subject, &mut expansions);
        let o = self.expand(object, &mut expansions);
        for (es, ep, eo) in &expansions {
            self.write_triple(es, ep, eo)?;
        }
        self.write_triple(&s, predicate, &o)
    }

    fn count(&self) -> u64 {
        self.count
    }
}

fn format_resource(t: &Term) -> String {
    match t {
        Term::Iri(s) => format!("<{s}>"),
        Term::BlankNode(id) => format!("_:b{id}"),
        other => unreachable!("subject/predicate position cannot hold {other:?}"),
    }
}

fn format_object(t: &Term) -> String {
    match t {
        Term::Iri(s) => format!("<{s}>"),
        Term::BlankNode(id) => format!("_:b{id}"),
        Term::Boolean(l) => format!("\"{}\"^^<{}>", escape_lexical(l), vocab::xsd::BOOLEAN),
        Term::Integer(l) => format!("\"{}\"^^<{}>", escape_lexical(l), vocab::xsd::INTEGER),
        Term::Double(l) => format!("\"{}\"^^<{}>", escape_lexical(l), vocab::xsd::DOUBLE),
        Term::Decimal(l) => format!("\"{}\"^^<{}>", escape_lexical(l), vocab::xsd::DECIMAL),
        Term::String {
            lexical,
            language: Some(lang),
        } => format!("\"{}\"@{}", escape_lexical(lexical), lang),
        Term::String {
            lexical,
            language: None,
        } => format!("\"{}\"", escape_lexical(lexical)),
        Term::Other { lexical, datatype } => format!("\"{}\"^^<{}>", escape_lexical(lexical), datatype),
        Term::List(_) => unreachable!("lists must be expanded before formatting"),
    }
}

fn escape_lexical(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0C}' => out.push_str("\\f"),
            '\u{08}' => out.push_str("\\b"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(triples: &[(Term, Term, Term)]) -> (String, u64) {
        let mut emitter = NTriplesEmitter::new(Vec::new());
        for (s, p, o) in triples {
            emitter.triple(s, p, o).unwrap();
        }
        let count = emitter.count();
        let bytes = emitter.into_inner();
        (String::from_utf8(bytes).unwrap(), count)
    }

    #[test]
    fn writes_a_plain_triple() {
        let (text, count) = emit(&[(
            Term::iri("http://example.org/s"),
            Term::iri("http://example.org/p"),
            Term::string("hello"),
        )]);
        assert_eq!(text, "<http://example.org/s> <http://example.org/p> \"hello\" .\n");
        assert_eq!(count, 1);
    }

    #[test]
    fn expands_three_element_collection_into_seven_triples() {
        let (_text, count) = emit(&[(
            Term::iri("http://example.org/s"),
            Term::iri("http://example.org/p"),
            Term::List(vec![Term::Integer("1".into()), Term::Integer("2".into()), Term::Integer("3".into())]),
        )]);
        assert_eq!(count, 7);
    }

    #[test]
    fn empty_collection_becomes_rdf_nil() {
        let (text, count) = emit(&[(
            Term::iri("http://example.org/s"),
            Term::iri("http://example.org/p"),
            Term::List(vec![]),
        )]);
        assert_eq!(count, 1);
        assert!(text.contains(vocab::rdf::NIL));
    }

    #[test]
    fn escapes_control_characters_in_literals() {
        let (text, _) = emit(&[(
            Term::iri("http://example.org/s"),
            Term::iri("http://example.org/p"),
            Term::string("a\nb\"c\\d"),
        )]);
        assert!(text.contains("\"a\\nb\\\"c\\\\d\""));
    }
}
