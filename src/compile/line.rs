use super::{Directive, Terminator};
use crate::log::{unknown_directive, Error, ErrorKind};

/// The classification of one physical source line.
#[derive(Debug, PartialEq)]
pub enum Line<'source> {
    /// `--- [id]`, which opens a new entry.
    Header(&'source str),
    /// A block-opening directive with its raw bracket content.
    ///
    /// The content is empty for `set` and `where`.
    Open(Directive, &'source str),
    /// A block terminator such as `--- endif`.
    Close(Terminator),
    /// Plain templated SQL.
    Fragment(&'source str),
}

/// Classify one physical line.
///
/// Blank lines and comment lines classify as `None`. Trailing comment
/// segments are stripped from fragments before they are returned.
///
/// # Errors
///
/// Returns an [`Error`] for a `---` line that is not a well-formed entry
/// header, directive or terminator. Unknown directives do not fall through
/// to plain fragments.
pub fn classify(line: &str) -> Result<Option<Line<'_>>, Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_comment(trimmed) {
        return Ok(None);
    }
    if let Some(rest) = trimmed.strip_prefix("---") {
        return classify_marker(rest.trim_start()).map(Some);
    }

    Ok(Some(Line::Fragment(strip_trailing_comment(trimmed))))
}

/// Return true if the line is a comment.
///
/// Comment lines start with `--`, but a line starting with `---` is a
/// marker, not a comment.
fn is_comment(line: &str) -> bool {
    line.starts_with("--") && !line.starts_with("---")
}

/// Strip a trailing comment segment, a run of whitespace followed by `--`.
fn strip_trailing_comment(line: &str) -> &str {
    let mut from = 0;
    while let Some(found) = line[from..].find("--") {
        let at = from + found;
        if line[..at].ends_with(|c: char| c.is_whitespace()) {
            return line[..at].trim_end();
        }
        from = at + 2;
    }

    line
}

/// Classify the remainder of a `---` line.
fn classify_marker(rest: &str) -> Result<Line<'_>, Error> {
    if rest.starts_with('[') {
        return classify_header(rest);
    }

    let rest = rest.trim_end();
    let (keyword, tail) = match rest.find(char::is_whitespace) {
        Some(at) => (&rest[..at], rest[at..].trim_start()),
        None => (rest, ""),
    };

    match keyword {
        "endif" | "endrange" | "endset" | "endwhere" => {
            if !tail.is_empty() {
                return Err(Error::build(ErrorKind::InvalidSyntax)
                    .with_help(format!("unexpected text after `{keyword}`")));
            }
            let terminator = match keyword {
                "endif" => Terminator::EndIf,
                "endrange" => Terminator::EndRange,
                "endset" => Terminator::EndSet,
                _ => Terminator::EndWhere,
            };
            Ok(Line::Close(terminator))
        }
        "set" | "where" => {
            if !tail.is_empty() {
                return Err(Error::build(ErrorKind::InvalidSyntax)
                    .with_help(format!("unexpected text after `{keyword}`")));
            }
            let directive = if keyword == "set" {
                Directive::Set
            } else {
                Directive::Where
            };
            Ok(Line::Open(directive, ""))
        }
        "if" | "ifnotnil" | "range" => {
            let directive = match keyword {
                "if" => Directive::If,
                "ifnotnil" => Directive::IfNotNil,
                _ => Directive::Range,
            };
            let body = classify_bracket(keyword, tail)?;
            if directive == Directive::IfNotNil && !is_identifier(body) {
                return Err(Error::build(ErrorKind::InvalidSyntax)
                    .with_help(format!("`ifnotnil` expects a variable name, found `{body}`")));
            }
            Ok(Line::Open(directive, body))
        }
        _ => Err(Error::build(ErrorKind::InvalidSyntax).with_help(unknown_directive(keyword))),
    }
}

/// Classify an entry header, `[id]` with nothing after it.
fn classify_header(rest: &str) -> Result<Line<'_>, Error> {
    let Some(end) = rest.find(']') else {
        return Err(Error::build(ErrorKind::InvalidSyntax)
            .with_help("entry header is missing the closing `]`"));
    };
    if !rest[end + 1..].trim().is_empty() {
        return Err(Error::build(ErrorKind::InvalidSyntax)
            .with_help("unexpected text after entry header"));
    }

    let id = rest[1..end].trim();
    if id.is_empty() {
        return Err(
            Error::build(ErrorKind::InvalidSyntax).with_help("entry id must not be empty")
        );
    }
    if !is_identifier(id) {
        return Err(Error::build(ErrorKind::InvalidSyntax)
            .with_help(format!("entry id `{id}` may only contain word characters")));
    }

    Ok(Line::Header(id))
}

/// Extract the bracketed body of a directive, shortest match.
fn classify_bracket<'source>(keyword: &str, tail: &'source str) -> Result<&'source str, Error> {
    let bracket = tail
        .strip_prefix('[')
        .and_then(|inner| inner.split_once(']'));
    let Some((body, after)) = bracket else {
        return Err(Error::build(ErrorKind::InvalidSyntax)
            .with_help(format!("`{keyword}` expects a `[...]` expression")));
    };
    if !after.trim().is_empty() {
        return Err(Error::build(ErrorKind::InvalidSyntax)
            .with_help(format!("unexpected text after `{keyword} [...]`")));
    }

    Ok(body.trim())
}

/// Return true if the text is a word, such as a variable name or entry id.
pub(crate) fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c == '_' || unicode_ident::is_xid_continue(c))
}

#[cfg(test)]
mod tests {
    use super::{classify, Line};
    use crate::compile::{Directive, Terminator};
    use crate::log::ErrorKind;

    #[test]
    fn test_classify_header() {
        assert_eq!(
            classify("--- [getUser]"),
            Ok(Some(Line::Header("getUser")))
        );
        assert_eq!(classify("---[getUser]"), Ok(Some(Line::Header("getUser"))));
    }

    #[test]
    fn test_classify_empty_header() {
        let result = classify("--- []");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidSyntax);
    }

    #[test]
    fn test_classify_directives() {
        assert_eq!(
            classify("--- if [a == 1]"),
            Ok(Some(Line::Open(Directive::If, "a == 1")))
        );
        assert_eq!(
            classify("--- ifnotnil [time]"),
            Ok(Some(Line::Open(Directive::IfNotNil, "time")))
        );
        assert_eq!(
            classify("--- range [vals, v, (, )]"),
            Ok(Some(Line::Open(Directive::Range, "vals, v, (, )")))
        );
        assert_eq!(classify("--- set"), Ok(Some(Line::Open(Directive::Set, ""))));
        assert_eq!(
            classify("---  where"),
            Ok(Some(Line::Open(Directive::Where, "")))
        );
    }

    #[test]
    fn test_classify_terminators() {
        assert_eq!(classify("--- endif"), Ok(Some(Line::Close(Terminator::EndIf))));
        assert_eq!(
            classify("--- endrange"),
            Ok(Some(Line::Close(Terminator::EndRange)))
        );
        assert_eq!(
            classify("--- endset"),
            Ok(Some(Line::Close(Terminator::EndSet)))
        );
        assert_eq!(
            classify("--- endwhere"),
            Ok(Some(Line::Close(Terminator::EndWhere)))
        );
    }

    #[test]
    fn test_classify_unknown_directive() {
        let result = classify("--- update [x]");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidSyntax);
    }

    #[test]
    fn test_classify_missing_bracket() {
        let result = classify("--- if a == 1");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidSyntax);
    }

    #[test]
    fn test_classify_comment_and_blank() {
        assert_eq!(classify("-- a comment"), Ok(None));
        assert_eq!(classify("   "), Ok(None));
    }

    #[test]
    fn test_classify_fragment() {
        assert_eq!(
            classify("  AND id = #id#"),
            Ok(Some(Line::Fragment("AND id = #id#")))
        );
    }

    #[test]
    fn test_trailing_comment_stripped() {
        assert_eq!(
            classify("AND id = #id# -- match on id"),
            Ok(Some(Line::Fragment("AND id = #id#")))
        );
        // No whitespace before `--` means no comment.
        assert_eq!(
            classify("AND id = #id#--x"),
            Ok(Some(Line::Fragment("AND id = #id#--x")))
        );
    }
}
