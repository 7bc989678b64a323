//! The N3P emitter: a Prolog clause encoding of RDF consumed by
//! Euler-style inference engines.

use std::collections::HashSet;
use std::io::{self, Write};

use crate::model::{vocab, Term};
use crate::parser::Sink;

/// Default namespace blank nodes are promoted ("skolemized") into IRIs
/// under, when no caller-supplied prefix is given.
pub const DEFAULT_SKOLEM_PREFIX: &str = "http://www.w3.org/2000/10/swap/genid#n3p";

/// Writes N3P (a Prolog clause encoding of RDF) to `W`.
pub struct N3pEmitter<W: Write> {
    out: W,
    skolem_prefix: String,
    rdiv: bool,
    declared_predicates: HashSet<String>,
    count: u64,
}

impl<W: Write> N3pEmitter<W> {
    /// Decimals are emitted as Prolog floats with the compatibility fixes
    /// from [`fix_prolog_number`].
    pub fn new(out: W) -> Self {
        N3pEmitter {
            out,
            skolem_prefix: DEFAULT_SKOLEM_PREFIX.to_string(),
            rdiv: false,
            declared_predicates: HashSet::new(),
            count: 0,
        }
    }

    /// Decimals are emitted as `N rdiv D` rationals instead of floats.
    pub fn with_rdiv(out: W) -> Self {
        let mut emitter = Self::new(out);
        emitter.rdiv = true;
        emitter
    }

    /// Use a non-default namespace for skolemized blank nodes.
    pub fn with_skolem_prefix(out: W, skolem_prefix: impl Into<String>, rdiv: bool) -> Self {
        let mut emitter = if rdiv { Self::with_rdiv(out) } else { Self::new(out) };
        emitter.skolem_prefix = skolem_prefix.into();
        emitter
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn declare_predicate(&mut self, predicate: &str) -> io::Result<()> {
        if self.declared_predicates.insert(predicate.to_string()) {
            let atom = escape_atom(predicate);
            writeln!(self.out, ":- dynamic('{atom}'/2).")?;
            writeln!(self.out, ":- multifile('{atom}'/2).")?;
            writeln!(self.out, "pred('{atom}').")?;
        }
        Ok(())
    }

    fn format_term(&self, term: &Term) -> String {
        match term {
            Term::Iri(s) => format!("'{}'", escape_atom(s)),
            Term::BlankNode(id) => format!("'{}{}'", self.skolem_prefix, escape_atom(id)),
            Term::Boolean(l) => normalize_boolean(l).to_string(),
            Term::Integer(l) => l.clone(),
            Term::Double(l) => fix_prolog_number(l),
            Term::Decimal(l) => {
                if self.rdiv {
                    to_rdiv(l)
                } else {
                    fix_prolog_number(l)
                }
            }
            Term::String {
                lexical,
                language: None,
            } => format!("literal('{}',type('{}'))", escape_atom(lexical), vocab::xsd::STRING),
            Term::String {
                lexical,
                language: Some(lang),
            } => format!("literal('{}',lang('{}'))", escape_atom(lexical), lang),
            Term::Other { lexical, datatype } => {
                format!("literal('{}',type('{}'))", escape_atom(lexical), datatype)
            }
            Term::List(items) => {
                let rendered: Vec<String> = items.iter().map(|i| self.format_term(i)).collect();
                format!("[{}]", rendered.join(","))
            }
        }
    }
}

impl<W: Write> Sink for N3pEmitter<W> {
    fn start(&mut self) -> io::Result<()> {
        writeln!(self.out, ":- style_check(-discontiguous).")?;
        writeln!(self.out, ":- style_check(-singleton).")?;
        writeln!(self.out, ":- multifile(exopred/3).")?;
        writeln!(self.out, ":- multifile(implies/3).")?;
        writeln!(self.out, ":- multifile(pfx/2).")?;
        writeln!(self.out, ":- multifile(pred/1).")?;
        writeln!(self.out, ":- multifile(prfstep/8).")?;
        writeln!(self.out, ":- multifile(scope/1).")?;
        writeln!(self.out, ":- multifile(scount/1).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/fl-rules#mu>'/2).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/fl-rules#pi>'/2).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/fl-rules#sigma>'/2).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/log-rules#biconditional>'/2).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/log-rules#conditional>'/2).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/log-rules#reflexive>'/2).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/log-rules#relabel>'/2).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/log-rules#tactic>'/2).")?;
        writeln!(self.out, ":- multifile('<http://eulersharp.sourceforge.net/2003/03swap/log-rules#transaction>'/2).")?;
        writeln!(self.out, ":- multifile('<http://www.w3.org/1999/02/22-rdf-syntax-ns#first>'/2).")?;
        writeln!(self.out, ":- multifile('<http://www.w3.org/1999/02/22-rdf-syntax-ns#rest>'/2).")?;
        writeln!(self.out, ":- multifile('<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>'/2).")?;
        writeln!(self.out, ":- multifile('<http://www.w3.org/2000/10/swap/log#implies>'/2).")?;
        writeln!(self.out, ":- multifile('<http://www.w3.org/2000/10/swap/log#outputString>'/2).")?;
        writeln!(self.out, ":- multifile('<http://www.w3.org/2002/07/owl#sameAs>'/2).")?;
        writeln!(self.out, "flag('no-skolem', '{}').", escape_atom(&self.skolem_prefix))
    }

    fn document(&mut self, source_iri: &str) -> io::Result<()> {
        writeln!(self.out, "scope('<{}>').", escape_atom(source_iri))
    }

    fn prefix(&mut self, prefix: &str, namespace: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "pfx('{}:','<{}>').",
            escape_atom(prefix),
            escape_atom(namespace)
        )
    }

    fn triple(&mut self, subject: &Term, predicate: &Term, object: &Term) -> io::Result<()> {
        let predicate_iri = match predicate {
            Term::Iri(s) => s.as_str(),
            other => unreachable!("predicate position cannot hold {other:?}"),
        };
        self.declare_predicate(predicate_iri)?;
        writeln!(
            self.out,
            "'{}'({},{}).",
            escape_atom(predicate_iri),
            self.format_term(subject),
            self.format_term(object)
        )?;
        self.count += 1;
        Ok(())
    }

    fn end(&mut self) -> io::Result<()> {
        writeln!(self.out, "scount({}).", self.count)?;
        writeln!(self.out, "end_of_file.")
    }

    fn count(&self) -> u64 {
        self.count
    }
}

fn normalize_boolean(lexical: &str) -> &str {
    match lexical {
        "1" => "true",
        "0" => "false",
        other => other,
    }
}

/// Apply the Prolog-compatibility fixes a double or (non-`rdiv`) decimal
/// lexical form needs: a leading `.` gets a `0` prepended, a leading `-.`
/// gets a `0` inserted after the `-`, a `.` immediately followed by `E`/`e`
/// gets a `0` inserted between them, and a trailing `.` gets a `0` appended.
fn fix_prolog_number(lexical: &str) -> String {
    let mut s = lexical.to_string();
    if let Some(rest) = s.strip_prefix("-.") {
        s = format!("-0.{rest}");
    } else if let Some(rest) = s.strip_prefix('.') {
        s = format!("0.{rest}");
    }
    if let Some(pos) = s.find('.') {
        if matches!(s.as_bytes().get(pos + 1), Some(b'e') | Some(b'E')) {
            s.insert(pos + 1, '0');
        }
    }
    if s.ends_with('.') {
        s.push('0');
    }
    s
}

/// Render a decimal lexical form as a Prolog `rdiv` rational: the lexeme
/// with its decimal point removed, over `10^k` for `k` fractional digits.
fn to_rdiv(lexical: &str) -> String {
    match lexical.split_once('.') {
        Some((before, after)) => {
            let numerator = format!("{before}{after}");
            let denominator = format!("1{}", "0".repeat(after.len()));
            format!("{numerator} rdiv {denominator}")
        }
        None => format!("{lexical} rdiv 1"),
    }
}

#[cfg(feature = "cesu8")]
fn push_non_control_char(out: &mut String, c: char) {
    if (c as u32) > 0xFFFF {
        let mut buf = Vec::new();
        crate::utf::encode_cesu8(c as u32, &mut buf);
        out.push_str(&String::from_utf8_lossy(&buf));
    } else {
        out.push(c);
    }
}

#[cfg(not(feature = "cesu8"))]
fn push_non_control_char(out: &mut String, c: char) {
    out.push(c);
}

/// Escape a string for use inside a Prolog quoted atom (`'...'`).
fn escape_atom(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\\\n"),
            '\r' => out.push_str("\\\\r"),
            '\t' => out.push_str("\\\\t"),
            '\u{0C}' => out.push_str("\\\\f"),
            '\u{08}' => out.push_str("\\\\b"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            '"' => out.push_str("\\\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\\\\\"),
            c => push_non_control_char(&mut out, c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(triples: &[(Term, Term, Term)], rdiv: bool) -> String {
        let mut emitter = if rdiv {
            N3pEmitter::with_rdiv(Vec::new())
        } else {
            N3pEmitter::new(Vec::new())
        };
        emitter.start().unwrap();
        for (s, p, o) in triples {
            emitter.triple(s, p, o).unwrap();
        }
        emitter.end().unwrap();
        String::from_utf8(emitter.into_inner()).unwrap()
    }

    #[test]
    fn declares_each_predicate_exactly_once() {
        let text = emit(
            &[
                (Term::iri("s1"), Term::iri("p"), Term::iri("o1")),
                (Term::iri("s2"), Term::iri("p"), Term::iri("o2")),
            ],
            false,
        );
        assert_eq!(text.matches(":- dynamic('p'/2).").count(), 1);
        assert_eq!(text.matches(":- multifile('p'/2).").count(), 1);
        assert_eq!(text.matches("pred('p').").count(), 1);
        assert!(text.contains("'p'('s1','o1')."));
        assert!(text.contains("'p'('s2','o2')."));
    }

    #[test]
    fn lists_are_not_expanded_to_triples() {
        let text = emit(
            &[(
                Term::iri("s"),
                Term::iri("p"),
                Term::List(vec![Term::Integer("1".into()), Term::Integer("2".into()), Term::Integer("3".into())]),
            )],
            false,
        );
        assert!(text.contains("'p'('s',[1,2,3])."));
    }

    #[test]
    fn double_gets_prolog_compatibility_fixes() {
        assert_eq!(fix_prolog_number(".5E0"), "0.5E0");
        assert_eq!(fix_prolog_number("5."), "5.0");
        assert_eq!(fix_prolog_number(".5"), "0.5");
        assert_eq!(fix_prolog_number("-.5"), "-0.5");
    }

    #[test]
    fn rdiv_mode_matches_known_vector() {
        assert_eq!(to_rdiv("0.25"), "025 rdiv 100");
    }

    #[test]
    fn boolean_normalizes_one_and_zero() {
        assert_eq!(normalize_boolean("1"), "true");
        assert_eq!(normalize_boolean("0"), "false");
        assert_eq!(normalize_boolean("true"), "true");
    }

    #[test]
    fn atom_escaping_doubles_backslashes_like_the_reference_writer() {
        assert_eq!(escape_atom("a\nb"), "a\\\\nb");
        assert_eq!(escape_atom("a\"b"), "a\\\\\"b");
        assert_eq!(escape_atom("a'b"), "a\\'b");
        assert_eq!(escape_atom("a\\b"), "a\\\\\\\\b");
    }

    #[test]
    fn prologue_declares_fixed_predicates() {
        let text = emit(&[], false);
        assert!(text.contains(":- multifile(scope/1).\n"));
        assert!(text.contains(":- multifile('<http://www.w3.org/1999/02/22-rdf-syntax-ns#first>'/2).\n"));
        assert!(text.contains(":- multifile('<http://www.w3.org/2002/07/owl#sameAs>'/2).\n"));
    }

    #[test]
    fn document_and_prefix_wrap_iris_in_angle_brackets() {
        let mut emitter = N3pEmitter::new(Vec::new());
        emitter.document("http://example.org/doc").unwrap();
        emitter.prefix("ex", "http://example.org/").unwrap();
        let text = String::from_utf8(emitter.into_inner()).unwrap();
        assert!(text.contains("scope('<http://example.org/doc>').\n"));
        assert!(text.contains("pfx('ex:','<http://example.org/>').\n"));
    }
}
