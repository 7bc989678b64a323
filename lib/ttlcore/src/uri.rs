//! An RFC 3986 URI (or relative reference), stored as one canonical string
//! plus `(start, len)` spans for each component, and reference resolution
//! (RFC 3986 §5.3) including `remove_dot_segments` (§5.2.4).

use thiserror::Error;

/// A URI-syntax violation: an empty host, an unterminated `[...]` literal
/// host, or a path/authority combination RFC 3986 forbids.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid URI reference: {0}")]
pub struct UriSyntaxError(pub String);

fn err(msg: impl Into<String>) -> UriSyntaxError {
    UriSyntaxError(msg.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    len: usize,
}

impl Span {
    fn slice<'a>(self, s: &'a str) -> &'a str {
        &s[self.start..self.start + self.len]
    }
}

/// An RFC 3986 URI reference: absolute (has a scheme) or relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    value: String,
    scheme: Option<Span>,
    authority: Option<Span>,
    userinfo: Option<Span>,
    host: Option<Span>,
    port: Option<Span>,
    path: Span,
    query: Option<Span>,
    fragment: Option<Span>,
}

impl Uri {
    /// Parse a URI reference. Does not require a scheme.
    pub fn parse(s: &str) -> Result<Uri, UriSyntaxError> {
        let value = s.to_string();
        let bytes = s.as_bytes();
        let len = bytes.len();

        let mut pos = 0usize;
        let mut scheme = None;

        // Scheme: up to the first ':', if that ':' precedes any of '/', '?', '#'
        // and is not itself the first character.
        if let Some(colon) = s.find(':') {
            let before = &s[..colon];
            if !before.is_empty() && !before.contains(['/', '?', '#']) {
                scheme = Some(Span {
                    start: 0,
                    len: colon,
                });
                pos = colon + 1;
            }
        }

        let mut authority = None;
        let mut userinfo = None;
        let mut host = None;
        let mut port = None;

        if s[pos..].starts_with("//") {
            let auth_start = pos + 2;
            let rest = &s[auth_start..];
            let auth_len = rest
                .find(['/', '?', '#'])
                .unwrap_or(rest.len());
            let auth_span = Span {
                start: auth_start,
                len: auth_len,
            };
            authority = Some(auth_span);
            let auth_str = auth_span.slice(s);

            let (userinfo_span, host_port_start) = match auth_str.rfind('@') {
                Some(at) => (
                    Some(Span {
                        start: auth_start,
                        len: at,
                    }),
                    auth_start + at + 1,
                ),
                None => (None, auth_start),
            };
            userinfo = userinfo_span;

            let host_port_str = &s[host_port_start..auth_start + auth_len];
            if host_port_str.starts_with('[') {
                let close = host_port_str
                    .find(']')
                    .ok_or_else(|| err("unterminated IPv6 literal host"))?;
                host = Some(Span {
                    start: host_port_start,
                    len: close + 1,
                });
                let after = &host_port_str[close + 1..];
                if let Some(rest) = after.strip_prefix(':') {
                    if !rest.is_empty() && !rest.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(err("non-numeric port"));
                    }
                    port = Some(Span {
                        start: host_port_start + close + 2,
                        len: after.len() - 1,
                    });
                } else if !after.is_empty() {
                    return Err(err("unexpected characters after IPv6 literal host"));
                }
            } else if let Some(colon) = host_port_str.rfind(':') {
                let candidate_port = &host_port_str[colon + 1..];
                if candidate_port.bytes().all(|b| b.is_ascii_digit()) {
                    host = Some(Span {
                        start: host_port_start,
                        len: colon,
                    });
                    port = Some(Span {
                        start: host_port_start + colon + 1,
                        len: candidate_port.len(),
                    });
                } else {
                    host = Some(Span {
                        start: host_port_start,
                        len: host_port_str.len(),
                    });
                }
            } else if !host_port_str.is_empty() {
                host = Some(Span {
                    start: host_port_start,
                    len: host_port_str.len(),
                });
            }
            if host_port_str.is_empty() {
                return Err(err("empty host in authority"));
            }
            pos = auth_start + auth_len;
        }

        let rest = &s[pos..];
        let path_len = rest.find(['?', '#']).unwrap_or(rest.len());
        let path = Span {
            start: pos,
            len: path_len,
        };
        pos += path_len;

        let mut query = None;
        if s[pos..].starts_with('?') {
            let q_start = pos + 1;
            let q_len = s[q_start..].find('#').unwrap_or(s.len() - q_start);
            query = Some(Span {
                start: q_start,
                len: q_len,
            });
            pos = q_start + q_len;
        }

        let mut fragment = None;
        if s[pos..].starts_with('#') {
            let f_start = pos + 1;
            fragment = Some(Span {
                start: f_start,
                len: len - f_start,
            });
        }

        let path_str = path.slice(s);
        if authority.is_some() && !path_str.is_empty() && !path_str.starts_with('/') {
            return Err(err("path must be empty or begin with '/' when an authority is present"));
        }
        if authority.is_none() && path_str.starts_with("//") {
            return Err(err("path cannot begin with '//' when no authority is present"));
        }
        if scheme.is_none() && authority.is_none() {
            if let Some(first_segment_end) = path_str.find('/') {
                if path_str[..first_segment_end].contains(':') {
                    return Err(err("relative-path first segment must not contain ':'"));
                }
            } else if path_str.contains(':') {
                return Err(err("relative-path first segment must not contain ':'"));
            }
        }

        Ok(Uri {
            value,
            scheme,
            authority,
            userinfo,
            host,
            port,
            path,
            query,
            fragment,
        })
    }

    /// The full, original string this URI was parsed from.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.map(|s| s.slice(&self.value))
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.map(|s| s.slice(&self.value))
    }

    pub fn userinfo(&self) -> Option<&str> {
        self.userinfo.map(|s| s.slice(&self.value))
    }

    pub fn host(&self) -> Option<&str> {
        self.host.map(|s| s.slice(&self.value))
    }

    pub fn port(&self) -> Option<&str> {
        self.port.map(|s| s.slice(&self.value))
    }

    pub fn path(&self) -> &str {
        self.path.slice(&self.value)
    }

    pub fn query(&self) -> Option<&str> {
        self.query.map(|s| s.slice(&self.value))
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.map(|s| s.slice(&self.value))
    }

    /// `true` iff this reference carries a scheme.
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Resolve `reference` (a URI reference string) against `self` as the
    /// base, per RFC 3986 §5.3.
    pub fn resolve(&self, reference: &str) -> Result<Uri, UriSyntaxError> {
        let r = Uri::parse(reference)?;

        let (t_scheme, t_authority, t_path, t_query): (
            Option<String>,
            Option<String>,
            String,
            Option<String>,
        );

        if let Some(scheme) = r.scheme() {
            t_scheme = Some(scheme.to_string());
            t_authority = r.authority().map(str::to_string);
            t_path = remove_dot_segments(r.path());
            t_query = r.query().map(str::to_string);
        } else if let Some(authority) = r.authority() {
            t_scheme = self.scheme().map(str::to_string);
            t_authority = Some(authority.to_string());
            t_path = remove_dot_segments(r.path());
            t_query = r.query().map(str::to_string);
        } else if r.path().is_empty() {
            t_scheme = self.scheme().map(str::to_string);
            t_authority = self.authority().map(str::to_string);
            t_path = self.path().to_string();
            t_query = r.query().map(str::to_string).or_else(|| self.query().map(str::to_string));
        } else {
            t_scheme = self.scheme().map(str::to_string);
            t_authority = self.authority().map(str::to_string);
            t_path = if r.path().starts_with('/') {
                remove_dot_segments(r.path())
            } else {
                remove_dot_segments(&merge(self, r.path()))
            };
            t_query = r.query().map(str::to_string);
        }

        let t_fragment = r.fragment().map(str::to_string);

        let mut out = String::new();
        if let Some(scheme) = &t_scheme {
            out.push_str(scheme);
            out.push(':');
        }
        if let Some(authority) = &t_authority {
            out.push_str("//");
            out.push_str(authority);
        }
        out.push_str(&t_path);
        if let Some(query) = &t_query {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = &t_fragment {
            out.push('#');
            out.push_str(fragment);
        }

        Uri::parse(&out)
    }
}

/// RFC 3986 §5.3 merge: join a base's authority/path with a relative-path
/// reference's path.
fn merge(base: &Uri, ref_path: &str) -> String {
    if base.authority().is_some() && base.path().is_empty() {
        format!("/{ref_path}")
    } else {
        match base.path().rfind('/') {
            Some(idx) => format!("{}{}", &base.path()[..=idx], ref_path),
            None => ref_path.to_string(),
        }
    }
}

/// RFC 3986 §5.2.4 `remove_dot_segments`.
fn remove_dot_segments(path: &str) -> String {
    let mut input = path.to_string();
    let mut output = String::new();

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest.to_string();
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest.to_string();
        } else if let Some(rest) = input.strip_prefix("/./") {
            input = format!("/{rest}");
        } else if input == "/." {
            input = "/".to_string();
        } else if let Some(rest) = input.strip_prefix("/../") {
            input = format!("/{rest}");
            truncate_last_segment(&mut output);
        } else if input == "/.." {
            input = "/".to_string();
            truncate_last_segment(&mut output);
        } else if input == "." || input == ".." {
            input.clear();
        } else {
            let seg_len = if let Some(rest) = input.strip_prefix('/') {
                1 + rest.find('/').unwrap_or(rest.len())
            } else {
                input.find('/').unwrap_or(input.len())
            };
            output.push_str(&input[..seg_len]);
            input = input[seg_len..].to_string();
        }
    }
    output
}

fn truncate_last_segment(output: &mut String) {
    match output.rfind('/') {
        Some(idx) => output.truncate(idx),
        None => output.clear(),
    }
}

/// `true` iff `s` contains a scheme before any of `/ ? #`.
pub fn is_absolute(s: &str) -> bool {
    Uri::parse(s).map(|u| u.is_absolute()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(base: &str, r: &str) -> String {
        Uri::parse(base).unwrap().resolve(r).unwrap().as_str().to_string()
    }

    #[test]
    fn rfc3986_normal_examples() {
        let base = "http://a/b/c/d;p?q";
        assert_eq!(resolve(base, "g"), "http://a/b/c/g");
        assert_eq!(resolve(base, "./g"), "http://a/b/c/g");
        assert_eq!(resolve(base, "/g"), "http://a/g");
        assert_eq!(resolve(base, "//g"), "http://g");
        assert_eq!(resolve(base, "?y"), "http://a/b/c/d;p?y");
        assert_eq!(resolve(base, "g#s"), "http://a/b/c/g#s");
        assert_eq!(resolve(base, "."), "http://a/b/c/");
        assert_eq!(resolve(base, ".."), "http://a/b/");
        assert_eq!(resolve(base, "../../g"), "http://a/g");
        assert_eq!(resolve(base, "../../../../g"), "http://a/g");
        assert_eq!(resolve(base, "/./g"), "http://a/g");
        assert_eq!(resolve(base, "g;x=1/../y"), "http://a/b/c/y");
        assert_eq!(resolve(base, "http:g"), "http:g");
    }

    #[test]
    fn absolute_predicate() {
        assert!(is_absolute("g:h"));
        assert!(!is_absolute(":"));
        assert!(!is_absolute("#:"));
        assert!(!is_absolute("foo"));
        assert!(!is_absolute("g?y/./x"));
    }

    #[test]
    fn decomposes_full_authority() {
        let u = Uri::parse("http://user@www.ics.uci.edu:8080/pub/ietf/uri/#Related").unwrap();
        assert_eq!(u.scheme(), Some("http"));
        assert_eq!(u.authority(), Some("user@www.ics.uci.edu:8080"));
        assert_eq!(u.userinfo(), Some("user"));
        assert_eq!(u.host(), Some("www.ics.uci.edu"));
        assert_eq!(u.port(), Some("8080"));
        assert_eq!(u.path(), "/pub/ietf/uri/");
        assert_eq!(u.query(), None);
        assert_eq!(u.fragment(), Some("Related"));
    }

    #[test]
    fn empty_path_with_trailing_markers() {
        let u = Uri::parse("http://example.org#").unwrap();
        assert_eq!(u.path(), "");
        assert_eq!(u.fragment(), Some(""));

        let u = Uri::parse("http://example.org?").unwrap();
        assert_eq!(u.path(), "");
        assert_eq!(u.query(), Some(""));
    }

    #[test]
    fn rejects_empty_host() {
        assert!(Uri::parse("http:///path").is_err());
    }

    #[test]
    fn rejects_unterminated_ipv6_host() {
        assert!(Uri::parse("http://[::1/path").is_err());
    }
}
