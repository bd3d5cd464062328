//! curl command-line parser.
//!
//! Parsing happens in two passes:
//! 1. **Word splitting**: line continuations are joined, then the command is
//!    split into words honouring single quotes, double quotes (with backslash
//!    escapes) and bare backslash escapes, the way a POSIX shell would.
//! 2. **Extraction**: the words are walked once. Flags that take a value
//!    always consume it, so a header or body value can never be mistaken for
//!    the URL.

use crate::curl::types::*;
use lazy_static::lazy_static;
use regex::Regex;

/// Body flags in priority order.
const BODY_FLAGS: [&str; 4] = ["--data-raw", "--data-binary", "--data", "-d"];

/// Value-taking flags whose value is skipped.
const SKIPPED_VALUE_FLAGS: [&str; 12] = [
    "-u",
    "-A",
    "-o",
    "-b",
    "-e",
    "--user",
    "--user-agent",
    "--output",
    "--cookie",
    "--referer",
    "--connect-timeout",
    "--max-time",
];

/// Short flags that take a value, attached (`-XPOST`) or as the next word.
const SHORT_VALUE_FLAGS: [&str; 8] = ["-X", "-H", "-d", "-u", "-A", "-o", "-b", "-e"];

lazy_static! {
    /// A backslash, optional trailing blanks, then a newline.
    static ref CONTINUATION_RE: Regex = Regex::new(r"\\[ \t]*\r?\n").unwrap();
}

/// Parse a curl command line into a [`ParsedRequest`].
pub fn parse_curl(command: &str) -> Result<ParsedRequest, CurlError> {
    if command.trim().is_empty() {
        return Err(CurlError::new(CurlErrorKind::EmptyCommand, "command is empty"));
    }

    let joined = join_continuations(command);
    let words = split_words(&joined)?;
    let mut words = words.into_iter();

    match words.next() {
        Some(first) if is_curl_program(&first) => {}
        Some(first) => {
            return Err(
                CurlError::new(CurlErrorKind::NotCurl, "command does not start with curl")
                    .with_detail(first),
            )
        }
        None => return Err(CurlError::new(CurlErrorKind::EmptyCommand, "command is empty")),
    }

    let mut url_flag: Option<String> = None;
    let mut url_bare: Option<String> = None;
    let mut method: Option<String> = None;
    let mut headers = Vec::new();
    let mut bodies: [Option<String>; 4] = Default::default();

    while let Some(word) = words.next() {
        if !word.starts_with('-') || word == "-" {
            if url_bare.is_none() {
                let candidate = trim_url(&word);
                if is_http_url(candidate) {
                    url_bare = Some(candidate.to_string());
                }
            }
            continue;
        }

        let (flag, attached) = split_flag(&word);
        if !takes_value(flag) {
            log::trace!("ignoring curl flag {}", flag);
            continue;
        }

        let value = match attached {
            Some(v) => v.to_string(),
            None => match words.next() {
                Some(v) => v,
                None => match missing_value(flag) {
                    Some(err) => return Err(err),
                    None => {
                        log::debug!("curl flag {} has no value; ignoring it", flag);
                        continue;
                    }
                },
            },
        };

        match flag {
            "-X" | "--request" => method = Some(value),
            "-H" | "--header" => match parse_header(&value) {
                Some(header) => headers.push(header),
                None => log::debug!("skipping header without a name: {:?}", value),
            },
            "--url" => {
                if url_flag.is_none() {
                    url_flag = Some(value);
                }
            }
            other => {
                if let Some(idx) = BODY_FLAGS.iter().position(|f| *f == other) {
                    if bodies[idx].is_none() {
                        bodies[idx] = Some(value);
                    }
                }
            }
        }
    }

    let url = resolve_url(url_flag, url_bare)?;

    let has_body = bodies.iter().any(Option::is_some);
    let method = match method {
        Some(m) => validate_method(&m)?,
        None if has_body => "POST".to_string(),
        None => "GET".to_string(),
    };

    let mut body = bodies.into_iter().flatten().next();
    if body.is_some() && (method == "GET" || method == "HEAD") {
        log::debug!("dropping request body for {}", method);
        body = None;
    }

    log::debug!(
        "parsed curl command: {} {} ({} headers, body: {})",
        method,
        url,
        headers.len(),
        body.is_some()
    );

    Ok(ParsedRequest {
        url,
        method,
        headers,
        body,
    })
}

// ─── Word splitting ──────────────────────────────────────────────────

fn join_continuations(command: &str) -> String {
    CONTINUATION_RE.replace_all(command, " ").into_owned()
}

/// Split a command line into shell words.
pub fn split_words(input: &str) -> Result<Vec<String>, CurlError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, '\'')) => break,
                        Some((_, ch)) => current.push(ch),
                        None => return Err(unbalanced('\'', pos)),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, esc @ ('"' | '\\' | '$' | '`'))) => current.push(esc),
                            Some((_, '\n')) => {}
                            Some((_, other)) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(unbalanced('"', pos)),
                        },
                        Some((_, ch)) => current.push(ch),
                        None => return Err(unbalanced('"', pos)),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some((_, next)) = chars.next() {
                    current.push(next);
                }
            }
            other => {
                in_word = true;
                current.push(other);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn unbalanced(quote: char, pos: usize) -> CurlError {
    CurlError::new(CurlErrorKind::UnbalancedQuote, "unterminated quote")
        .with_detail(format!("{} opened at offset {}", quote, pos))
}

// ─── Flags ───────────────────────────────────────────────────────────

fn is_curl_program(word: &str) -> bool {
    word == "curl" || word.ends_with("/curl") || word.eq_ignore_ascii_case("curl.exe")
}

/// Separate an attached value: `--data=x` → (`--data`, `x`), `-XPOST` → (`-X`, `POST`).
///
/// Short flags may be grouped. The first value-taking letter in a group ends
/// it: `-sX POST` → (`-X`, none), `-sXPOST` → (`-X`, `POST`).
fn split_flag(word: &str) -> (&str, Option<&str>) {
    if word.starts_with("--") {
        return match word.split_once('=') {
            Some((flag, value)) => (flag, Some(value)),
            None => (word, None),
        };
    }

    let letters = &word[1..];
    for (idx, letter) in letters.char_indices() {
        if let Some(flag) = short_value_flag(letter) {
            let rest = &letters[idx + letter.len_utf8()..];
            return (flag, (!rest.is_empty()).then_some(rest));
        }
        if !letter.is_ascii_alphanumeric() {
            break;
        }
    }
    (word, None)
}

fn short_value_flag(letter: char) -> Option<&'static str> {
    SHORT_VALUE_FLAGS.iter().copied().find(|f| f.ends_with(letter))
}

fn takes_value(flag: &str) -> bool {
    matches!(flag, "-X" | "--request" | "-H" | "--header" | "--url")
        || BODY_FLAGS.contains(&flag)
        || SKIPPED_VALUE_FLAGS.contains(&flag)
}

fn missing_value(flag: &str) -> Option<CurlError> {
    let kind = match flag {
        "-X" | "--request" => CurlErrorKind::InvalidMethod,
        "-H" | "--header" => CurlErrorKind::InvalidHeader,
        "--url" => CurlErrorKind::MissingUrl,
        _ => return None,
    };
    Some(CurlError::new(kind, "flag is missing its value").with_detail(flag.to_string()))
}

// ─── URL ─────────────────────────────────────────────────────────────

fn trim_url(raw: &str) -> &str {
    raw.trim()
        .trim_end_matches(|c| matches!(c, '\\' | '\'' | '"'))
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// A bare http(s) argument takes precedence over `--url`.
fn resolve_url(flag: Option<String>, bare: Option<String>) -> Result<String, CurlError> {
    let raw = bare
        .as_deref()
        .or_else(|| flag.as_deref().map(trim_url).filter(|s| !s.is_empty()))
        .ok_or_else(|| CurlError::new(CurlErrorKind::MissingUrl, "no URL found in command"))?;

    let parsed = url::Url::parse(raw).map_err(|e| {
        CurlError::new(CurlErrorKind::InvalidUrl, "URL could not be parsed")
            .with_detail(format!("{}: {}", raw, e))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CurlError::new(CurlErrorKind::InvalidUrl, "only http and https URLs are supported")
            .with_detail(parsed.scheme().to_string()));
    }
    Ok(parsed.to_string())
}

// ─── Method & headers ────────────────────────────────────────────────

/// RFC 9110 `tchar`.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn validate_method(raw: &str) -> Result<String, CurlError> {
    let method = raw.trim().to_ascii_uppercase();
    if method.is_empty() || !method.chars().all(is_token_char) {
        return Err(CurlError::new(CurlErrorKind::InvalidMethod, "method is not an HTTP token")
            .with_detail(raw.to_string()));
    }
    Ok(method)
}

/// `Name: value`, split at the first colon. `None` when there is no name.
fn parse_header(raw: &str) -> Option<HeaderEntry> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(HeaderEntry::new(name, value.trim()))
}
