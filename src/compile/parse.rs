use super::{
    line::{classify, is_identifier, Line},
    tree::{Arena, Entry, NodeId, NodeKind},
    Directive, Terminator,
};
use crate::{
    log::{Error, ErrorKind},
    region::Region,
    render::compare,
};

/// Builds [`Entry`] trees from the flat line stream of one `.sql` source.
pub struct Parser<'source> {
    /// Reference to the source text.
    source: &'source str,
}

impl<'source> Parser<'source> {
    /// Create a new Parser from the given string.
    #[inline]
    pub fn new(source: &'source str) -> Self {
        Self { source }
    }

    /// Compile the source.
    ///
    /// Returns the compiled entries, which can be rendered with some Store
    /// data to receive output.
    ///
    /// The `name` identifies the source in error output, and is usually a
    /// file name.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a line does not classify, when block
    /// nesting is malformed, or when a guard or `range` expression does
    /// not parse.
    pub fn compile(self, name: Option<&str>) -> Result<Vec<Entry>, Error> {
        let mut entries: Vec<Entry> = vec![];
        let mut current: Option<EntryBuilder> = None;

        let mut offset = 0;
        for raw in self.source.split('\n') {
            let region = Region::new(offset..offset + raw.len());
            offset += raw.len() + 1;

            let Some(line) = classify(raw).map_err(|e| self.locate(e, region, name))? else {
                continue;
            };

            if let Line::Header(id) = line {
                if let Some(builder) = current.take() {
                    entries.push(builder.finish(self.source, name)?);
                }
                current = Some(EntryBuilder::new(id));
                continue;
            }

            let Some(builder) = current.as_mut() else {
                return Err(self.locate(
                    Error::build(ErrorKind::Structural)
                        .with_help("expected an entry header like `--- [id]` before this line"),
                    region,
                    name,
                ));
            };

            match line {
                Line::Open(directive, body) => {
                    let kind = self
                        .build_kind(directive, body)
                        .map_err(|e| self.locate(e, region, name))?;
                    builder.open(directive, kind, region);
                }
                Line::Close(terminator) => {
                    builder
                        .close(terminator)
                        .map_err(|e| self.locate(e, region, name))?;
                }
                Line::Fragment(text) => {
                    builder.fragment(text);
                }
                Line::Header(_) => unreachable!("headers are handled above"),
            }
        }

        if let Some(builder) = current.take() {
            entries.push(builder.finish(self.source, name)?);
        }

        Ok(entries)
    }

    /// Convert a directive and its raw bracket body into a [`NodeKind`].
    fn build_kind(&self, directive: Directive, body: &str) -> Result<NodeKind, Error> {
        let kind = match directive {
            Directive::If => {
                compare::validate(body)?;
                NodeKind::If {
                    guard: body.to_owned(),
                }
            }
            Directive::IfNotNil => NodeKind::IfNotNil {
                name: body.to_owned(),
            },
            Directive::Range => parse_range(body)?,
            Directive::Set => NodeKind::Set,
            Directive::Where => NodeKind::Where,
        };

        Ok(kind)
    }

    /// Attach a pointer and source name to the given [`Error`].
    fn locate(&self, error: Error, region: Region, name: Option<&str>) -> Error {
        let error = error.with_pointer(self.source, region);
        match name {
            Some(name) => error.with_entry(name),
            None => error,
        }
    }
}

/// Parse the argument list of a `range` directive.
///
/// Accepts `source, alias` or `source, alias, left, right`.
fn parse_range(body: &str) -> Result<NodeKind, Error> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let (source, alias, left, right) = match parts.as_slice() {
        [source, alias] => (*source, *alias, "", ""),
        [source, alias, left, right] => (*source, *alias, *left, *right),
        _ => {
            return Err(Error::build(ErrorKind::InvalidSyntax).with_help(
                "`range` takes `[source, alias]` or `[source, alias, left, right]`",
            ))
        }
    };
    if !is_identifier(source) || !is_identifier(alias) {
        return Err(Error::build(ErrorKind::InvalidSyntax)
            .with_help("`range` source and alias must be variable names"));
    }

    Ok(NodeKind::Range {
        source: source.to_owned(),
        alias: alias.to_owned(),
        left: left.to_owned(),
        right: right.to_owned(),
    })
}

/// Accumulates one entry's handler forest during compilation.
struct EntryBuilder {
    name: String,
    arena: Arena,
    roots: Vec<NodeId>,
    /// Stack of blocks opened but not yet terminated.
    open: Vec<(NodeId, Directive, Region)>,
}

impl EntryBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            arena: Arena::default(),
            roots: vec![],
            open: vec![],
        }
    }

    /// Attach a node at the current depth: as a child of the innermost
    /// open block, or as a new root.
    fn attach(&mut self, id: NodeId) {
        match self.open.last() {
            Some((parent, _, _)) => self.arena.add_child(*parent, id),
            None => self.roots.push(id),
        }
    }

    fn open(&mut self, directive: Directive, kind: NodeKind, region: Region) {
        let id = self.arena.push(kind);
        self.attach(id);
        self.open.push((id, directive, region));
    }

    fn close(&mut self, terminator: Terminator) -> Result<(), Error> {
        let Some((_, directive, _)) = self.open.pop() else {
            return Err(Error::build(ErrorKind::Structural)
                .with_help(format!("`{terminator}` has no matching open block")));
        };
        if directive.terminator() != terminator {
            return Err(Error::build(ErrorKind::Structural).with_help(format!(
                "expected `{}` to close the `{directive}` block, found `{terminator}`",
                directive.terminator()
            )));
        }

        Ok(())
    }

    fn fragment(&mut self, text: &str) {
        let id = self.arena.push(NodeKind::Fragment(text.to_owned()));
        self.attach(id);
    }

    fn finish(self, source: &str, name: Option<&str>) -> Result<Entry, Error> {
        if let Some((_, directive, region)) = self.open.last() {
            let error = Error::build(ErrorKind::Structural)
                .with_pointer(source, *region)
                .with_help(format!(
                    "did you close the `{directive}` block with `{}`?",
                    directive.terminator()
                ));
            return Err(match name {
                Some(name) => error.with_entry(name),
                None => error,
            });
        }

        Ok(Entry {
            name: self.name,
            roots: self.roots,
            arena: self.arena,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Parser;
    use crate::compile::tree::NodeKind;
    use crate::log::ErrorKind;

    #[test]
    fn test_compile_single_fragment() {
        let entries = Parser::new("--- [getUser]\nSELECT * FROM user WHERE id = #id#")
            .compile(None)
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "getUser");
        assert_eq!(entries[0].roots().len(), 1);
    }

    #[test]
    fn test_compile_multiple_entries() {
        let source = "--- [one]\nSELECT 1\n--- [two]\nSELECT 2";
        let entries = Parser::new(source).compile(None).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "one");
        assert_eq!(entries[1].name, "two");
    }

    #[test]
    fn test_compile_nested_blocks() {
        let source = "--- [q]\n\
            SELECT * FROM t\n\
            --- where\n\
            --- ifnotnil [a]\n\
            AND a = #a#\n\
            --- endif\n\
            --- endwhere";
        let entries = Parser::new(source).compile(None).unwrap();
        let entry = &entries[0];

        assert_eq!(entry.roots().len(), 2);
        let where_node = entry.node(entry.roots()[1]);
        assert_eq!(where_node.kind, NodeKind::Where);
        assert_eq!(where_node.children.len(), 1);
        let ifnotnil = entry.node(where_node.children[0]);
        assert_eq!(
            ifnotnil.kind,
            NodeKind::IfNotNil {
                name: "a".to_owned()
            }
        );
        assert_eq!(ifnotnil.children.len(), 1);
    }

    #[test]
    fn test_compile_range_arguments() {
        let source = "--- [q]\n--- range [vals, v, (, )]\n#v#\n--- endrange";
        let entries = Parser::new(source).compile(None).unwrap();
        let entry = &entries[0];

        assert_eq!(
            entry.node(entry.roots()[0]).kind,
            NodeKind::Range {
                source: "vals".to_owned(),
                alias: "v".to_owned(),
                left: "(".to_owned(),
                right: ")".to_owned(),
            }
        );
    }

    #[test]
    fn test_compile_bad_range_arguments() {
        let source = "--- [q]\n--- range [vals]\n#v#\n--- endrange";
        let result = Parser::new(source).compile(None);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidSyntax);
    }

    #[test]
    fn test_compile_bad_guard() {
        let source = "--- [q]\n--- if [a ~ 1]\nx\n--- endif";
        let result = Parser::new(source).compile(None);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidSyntax);
    }

    #[test]
    fn test_compile_unclosed_block() {
        let source = "--- [q]\n--- where\nAND a = #a#";
        let result = Parser::new(source).compile(None);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_compile_stray_terminator() {
        let source = "--- [q]\n--- endif";
        let result = Parser::new(source).compile(None);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_compile_mismatched_terminator() {
        let source = "--- [q]\n--- where\nAND a = #a#\n--- endset";
        let result = Parser::new(source).compile(None);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_compile_line_before_header() {
        let result = Parser::new("SELECT 1").compile(Some("orphan.sql"));
        let error = result.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Structural);
        assert_eq!(error.get_entry(), Some("orphan.sql"));
    }

    #[test]
    fn test_compile_comments_skipped() {
        let source = "-- leading comment\n\
            --- [q]\n\
            SELECT 1 -- trailing comment\n\
            -- another comment";
        let entries = Parser::new(source).compile(None).unwrap();
        let entry = &entries[0];

        assert_eq!(entry.roots().len(), 1);
        assert_eq!(
            entry.node(entry.roots()[0]).kind,
            NodeKind::Fragment("SELECT 1".to_owned())
        );
    }
}
