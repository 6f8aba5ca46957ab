pub(crate) mod compare;

use crate::{
    compile::{
        line::is_identifier,
        tree::{Entry, Node, NodeId, NodeKind},
    },
    log::{Error, ErrorKind},
    store::{Shadow, Store},
    value::Value,
};
use std::collections::HashMap;

/// Table-name placeholder mapping.
///
/// A fragment containing `@table_X@` is substituted with the value
/// registered under key `X` before parameter binding.
pub type Tables = HashMap<String, String>;

/// The output of rendering one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// Parameterized SQL text.
    pub sql: String,
    /// Bind values, ordered to match the `?` placeholders in `sql`.
    pub values: Vec<Value>,
}

/// Render a compiled [`Entry`] against a [`Store`].
///
/// Provides a shortcut to quickly render an `Entry` when no table-name
/// substitution is needed.
///
/// # Examples
///
/// ```
/// use stencil::{compile, render, Store};
///
/// let entries = compile(None, "--- [getUser]\nid = #id#").unwrap();
///
/// let output = render(&entries[0], &Store::new().with_must("id", 7)).unwrap();
/// assert_eq!(output.sql, "id = ?");
/// ```
pub fn render(entry: &Entry, store: &Store) -> Result<Rendered, Error> {
    let tables = Tables::new();
    Renderer::new(entry, store, &tables).render()
}

/// Walks one entry's handler forest, producing SQL text and bind values.
///
/// A renderer holds only call-local state, so any number of them may walk
/// the same entry concurrently.
pub(crate) struct Renderer<'render> {
    /// The entry being rendered.
    entry: &'render Entry,
    /// The layered scope the entry is checked against.
    shadow: Shadow<'render>,
    /// Table names for `@table_X@` placeholders.
    tables: &'render Tables,
}

impl<'render> Renderer<'render> {
    /// Create a new Renderer.
    pub fn new(entry: &'render Entry, store: &'render Store, tables: &'render Tables) -> Self {
        Renderer {
            entry,
            shadow: Shadow::new(store),
            tables,
        }
    }

    /// Render the entry stored inside the Renderer.
    ///
    /// # Errors
    ///
    /// Any failing node aborts the whole render; partial output is
    /// discarded.
    pub fn render(mut self) -> Result<Rendered, Error> {
        let mut parts: Vec<String> = vec![];
        let mut values: Vec<Value> = vec![];

        let entry = self.entry;
        for id in entry.roots() {
            let (text, mut bound) = self.render_node(*id)?;
            if !text.is_empty() {
                parts.push(text);
            }
            values.append(&mut bound);
        }

        Ok(Rendered {
            sql: parts.join(" "),
            values,
        })
    }

    fn render_node(&mut self, id: NodeId) -> Result<(String, Vec<Value>), Error> {
        let entry = self.entry;
        let node = entry.node(id);

        match &node.kind {
            NodeKind::Fragment(text) => self.render_fragment(text),
            NodeKind::If { guard } => {
                if !compare::evaluate(guard, &self.shadow)? {
                    return Ok((String::new(), vec![]));
                }
                self.render_block(node)
            }
            NodeKind::IfNotNil { name } => {
                if self.shadow.get(name).is_none() {
                    return Ok((String::new(), vec![]));
                }
                self.render_block(node)
            }
            NodeKind::Range {
                source,
                alias,
                left,
                right,
            } => self.render_range(node, source, alias, left, right),
            NodeKind::Set => self.render_set(node),
            NodeKind::Where => self.render_where(node),
        }
    }

    /// Render the children of a guarded block whose guard held.
    ///
    /// Non-empty child outputs join with a single space, and the whole
    /// takes a leading space so neighboring fragments stay separated.
    fn render_block(&mut self, node: &Node) -> Result<(String, Vec<Value>), Error> {
        let (text, values) = self.render_children(node)?;
        if text.is_empty() {
            return Ok((text, values));
        }

        Ok((format!(" {text}"), values))
    }

    /// Render every child in order, joining non-empty outputs with a
    /// single space and concatenating bind values.
    fn render_children(&mut self, node: &Node) -> Result<(String, Vec<Value>), Error> {
        let mut parts: Vec<String> = vec![];
        let mut values: Vec<Value> = vec![];

        for child in &node.children {
            let (text, mut bound) = self.render_node(*child)?;
            if !text.is_empty() {
                parts.push(text);
            }
            values.append(&mut bound);
        }

        Ok((parts.join(" "), values))
    }

    /// Render a `range` block.
    ///
    /// An absent collection skips the block; a present non-sequence is a
    /// hard error. Iteration outputs join with `,` and are wrapped in the
    /// optional left/right literals.
    fn render_range(
        &mut self,
        node: &Node,
        source: &str,
        alias: &str,
        left: &str,
        right: &str,
    ) -> Result<(String, Vec<Value>), Error> {
        let Some(value) = self.shadow.get(source) else {
            return Ok((String::new(), vec![]));
        };
        let items = match value {
            Value::Seq(items) => items.clone(),
            other => {
                return Err(Error::build(ErrorKind::NotASequence).with_help(format!(
                    "`{source}` is {}, `range` needs a sequence",
                    other.type_name()
                )))
            }
        };
        if items.is_empty() {
            return Ok((String::new(), vec![]));
        }

        let mut iterations: Vec<String> = vec![];
        let mut values: Vec<Value> = vec![];
        for item in items {
            self.shadow.push();
            self.shadow.insert(alias, item);
            let result = self.render_children(node);
            self.shadow.pop();

            let (text, mut bound) = result?;
            iterations.push(text);
            values.append(&mut bound);
        }

        Ok((format!("{left}{}{right}", iterations.join(",")), values))
    }

    /// Render a `set` block.
    ///
    /// Children are trimmed and stripped of one trailing comma; empty
    /// children drop out. Zero survivors is an error.
    fn render_set(&mut self, node: &Node) -> Result<(String, Vec<Value>), Error> {
        let mut survivors: Vec<String> = vec![];
        let mut values: Vec<Value> = vec![];

        for child in &node.children {
            let (text, mut bound) = self.render_node(*child)?;
            let text = text.trim();
            let text = text.strip_suffix(',').unwrap_or(text).trim_end();
            if text.is_empty() {
                continue;
            }
            survivors.push(text.to_owned());
            values.append(&mut bound);
        }

        if survivors.is_empty() {
            return Err(Error::build(ErrorKind::NoUpdatableField)
                .with_help("every assignment in the `set` block rendered empty"));
        }

        Ok((format!(" SET {}", survivors.join(", ")), values))
    }

    /// Render a `where` block.
    ///
    /// Empty children drop out; zero survivors renders empty with no
    /// error. The first survivor loses its leading `AND`/`OR` token, the
    /// rest keep their connectives verbatim.
    fn render_where(&mut self, node: &Node) -> Result<(String, Vec<Value>), Error> {
        let mut survivors: Vec<String> = vec![];
        let mut values: Vec<Value> = vec![];

        for child in &node.children {
            let (text, mut bound) = self.render_node(*child)?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            survivors.push(text.to_owned());
            values.append(&mut bound);
        }

        if survivors.is_empty() {
            return Ok((String::new(), vec![]));
        }
        survivors[0] = strip_connective(&survivors[0]).to_owned();

        Ok((format!(" WHERE {}", survivors.join(" ")), values))
    }

    /// Render a plain fragment: substitute table names, then bind
    /// parameters left to right.
    fn render_fragment(&mut self, text: &str) -> Result<(String, Vec<Value>), Error> {
        let replaced = self.replace_tables(text)?;

        let mut sql = String::with_capacity(replaced.len());
        let mut values: Vec<Value> = vec![];
        let mut rest = replaced.as_str();
        while let Some(start) = rest.find('#') {
            let Some(length) = rest[start + 1..].find('#') else {
                break;
            };
            let inner = &rest[start + 1..start + 1 + length];
            if !is_placeholder(inner) {
                // Not a placeholder; emit through the first `#` and rescan.
                sql.push_str(&rest[..start + 1]);
                rest = &rest[start + 1..];
                continue;
            }
            sql.push_str(&rest[..start]);
            sql.push('?');
            values.push(self.resolve(inner)?);
            rest = &rest[start + 1 + length + 1..];
        }
        sql.push_str(rest);

        Ok((sql, values))
    }

    /// Resolve a `name` or `name.field` placeholder against the scope.
    fn resolve(&self, placeholder: &str) -> Result<Value, Error> {
        let Some((base, field)) = placeholder.split_once('.') else {
            return self.shadow.get(placeholder).cloned().ok_or_else(|| {
                Error::build(ErrorKind::ParamNotFound)
                    .with_help(format!("no parameter named `{placeholder}` in scope"))
            });
        };

        let Some(value) = self.shadow.get(base) else {
            return Err(Error::build(ErrorKind::ParamNotFound)
                .with_help(format!("no parameter named `{base}` in scope")));
        };
        let Value::Composite(members) = value else {
            return Err(Error::build(ErrorKind::NotComposite).with_help(format!(
                "`{base}` is {}, `.{field}` needs a composite",
                value.type_name()
            )));
        };

        members.get(field).cloned().ok_or_else(|| {
            Error::build(ErrorKind::ParamNotFound)
                .with_help(format!("composite `{base}` has no member `{field}`"))
        })
    }

    /// Substitute every `@table_X@` placeholder from the table map.
    fn replace_tables(&self, text: &str) -> Result<String, Error> {
        const MARKER: &str = "@table_";

        if !text.contains(MARKER) {
            return Ok(text.to_owned());
        }

        let mut output = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(MARKER) {
            let after = &rest[start + MARKER.len()..];
            let key = after.find('@').map(|end| &after[..end]);
            let Some(key) = key.filter(|key| is_identifier(key)) else {
                // Not a table placeholder; emit through the marker and rescan.
                output.push_str(&rest[..start + MARKER.len()]);
                rest = after;
                continue;
            };
            let Some(table) = self.tables.get(key) else {
                return Err(Error::build(ErrorKind::TableNotFound)
                    .with_help(format!("no table name supplied for `{key}`")));
            };
            output.push_str(&rest[..start]);
            output.push_str(table);
            rest = &after[key.len() + 1..];
        }
        output.push_str(rest);

        Ok(output)
    }
}

/// Return true if the text between `#` markers is a bindable placeholder,
/// a `name` or `name.field` word.
fn is_placeholder(inner: &str) -> bool {
    match inner.split_once('.') {
        Some((base, field)) => is_identifier(base) && is_identifier(field),
        None => is_identifier(inner),
    }
}

/// Strip one leading `AND`/`OR` token, case-insensitive.
fn strip_connective(text: &str) -> &str {
    for token in ["and", "or"] {
        let Some(head) = text.get(..token.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(token) {
            continue;
        }
        let rest = &text[token.len()..];
        if rest.starts_with(char::is_whitespace) {
            return rest.trim_start();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::{render, Rendered, Renderer, Tables};
    use crate::compile::compile;
    use crate::log::ErrorKind;
    use crate::store::Store;
    use crate::value::Value;

    fn render_one(source: &str, store: &Store) -> Result<Rendered, crate::log::Error> {
        let entries = compile(None, source).unwrap();
        render(&entries[0], store)
    }

    #[test]
    fn test_single_fragment() {
        let output = render_one(
            "--- [q]\nid = #id#",
            &Store::new().with_must("id", 7),
        )
        .unwrap();

        assert_eq!(output.sql, "id = ?");
        assert_eq!(output.values, vec![Value::Int(7)]);
    }

    #[test]
    fn test_if_true_and_false() {
        let source = "--- [q]\n--- if [a == 1]\nb = #b#\n--- endif";

        let hit = render_one(source, &Store::new().with_must("a", 1).with_must("b", "x"))
            .unwrap();
        assert_eq!(hit.sql, " b = ?");
        assert_eq!(hit.values, vec![Value::String("x".into())]);

        let miss = render_one(source, &Store::new().with_must("a", 2).with_must("b", "x"))
            .unwrap();
        assert_eq!(miss.sql, "");
        assert_eq!(miss.values, vec![]);
    }

    #[test]
    fn test_ifnotnil_presence() {
        let source = "--- [q]\n--- ifnotnil [t]\nc <= #t#\n--- endif";

        let hit = render_one(source, &Store::new().with_must("t", 0)).unwrap();
        assert_eq!(hit.sql, " c <= ?");
        assert_eq!(hit.values, vec![Value::Int(0)]);

        let miss = render_one(source, &Store::new()).unwrap();
        assert_eq!(miss.sql, "");
    }

    #[test]
    fn test_range_wrapped() {
        let output = render_one(
            "--- [q]\n--- range [vals, v, (, )]\n#v#\n--- endrange",
            &Store::new().with_must("vals", vec![1, 2, 3]),
        )
        .unwrap();

        assert_eq!(output.sql, "(?,?,?)");
        assert_eq!(
            output.values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_range_unwrapped() {
        let output = render_one(
            "--- [q]\n--- range [vals, v]\n(#v#, #v#)\n--- endrange",
            &Store::new().with_must("vals", vec!["a", "b"]),
        )
        .unwrap();

        assert_eq!(output.sql, "(?, ?),(?, ?)");
        assert_eq!(output.values.len(), 4);
    }

    #[test]
    fn test_range_absent_skips() {
        let output = render_one(
            "--- [q]\n--- range [vals, v]\n#v#\n--- endrange",
            &Store::new(),
        )
        .unwrap();

        assert_eq!(output.sql, "");
        assert_eq!(output.values, vec![]);
    }

    #[test]
    fn test_range_empty_skips() {
        let output = render_one(
            "--- [q]\n--- range [vals, v]\n#v#\n--- endrange",
            &Store::new().with_must("vals", Vec::<i64>::new()),
        )
        .unwrap();

        assert_eq!(output.sql, "");
    }

    #[test]
    fn test_range_non_sequence_fails() {
        let result = render_one(
            "--- [q]\n--- range [vals, v]\n#v#\n--- endrange",
            &Store::new().with_must("vals", 1),
        );

        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotASequence);
    }

    #[test]
    fn test_range_nested_shadowing() {
        let source = "--- [q]\n\
            --- range [rows, row, (, )]\n\
            --- range [row, cell]\n\
            #cell#\n\
            --- endrange\n\
            --- endrange";
        let store = Store::new().with_must("rows", vec![vec![1, 2], vec![3]]);
        let output = render_one(source, &store).unwrap();

        assert_eq!(output.sql, "(?,?,?)");
        assert_eq!(
            output.values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_set_joins_survivors() {
        let source = "--- [q]\n\
            UPDATE @table_t@\n\
            --- set\n\
            --- ifnotnil [a]\n\
            a = #a#,\n\
            --- endif\n\
            --- ifnotnil [b]\n\
            b = #b#,\n\
            --- endif\n\
            --- endset";
        let entries = compile(None, source).unwrap();
        let tables = Tables::from([("t".to_owned(), "test".to_owned())]);

        let store = Store::new().with_must("a", 1).with_must("b", 2);
        let output = Renderer::new(&entries[0], &store, &tables).render().unwrap();
        assert_eq!(output.sql, "UPDATE test  SET a = ?, b = ?");
        assert_eq!(output.values, vec![Value::Int(1), Value::Int(2)]);

        let store = Store::new().with_must("b", 2);
        let output = Renderer::new(&entries[0], &store, &tables).render().unwrap();
        assert_eq!(output.sql, "UPDATE test  SET b = ?");
        assert_eq!(output.values, vec![Value::Int(2)]);
    }

    #[test]
    fn test_set_no_updatable_field() {
        let source = "--- [q]\n\
            --- set\n\
            --- ifnotnil [a]\n\
            a = #a#,\n\
            --- endif\n\
            --- endset";
        let result = render_one(source, &Store::new());

        assert_eq!(result.unwrap_err().kind(), ErrorKind::NoUpdatableField);
    }

    #[test]
    fn test_where_strips_first_connective() {
        let source = "--- [q]\n\
            --- where\n\
            --- ifnotnil [a]\n\
            AND a = #a#\n\
            --- endif\n\
            --- ifnotnil [b]\n\
            OR b = #b#\n\
            --- endif\n\
            --- endwhere";

        let output = render_one(source, &Store::new().with_must("a", 1).with_must("b", 2))
            .unwrap();
        assert_eq!(output.sql, " WHERE a = ? OR b = ?");

        // When the first child drops out, the next survivor is stripped.
        let output = render_one(source, &Store::new().with_must("b", 2)).unwrap();
        assert_eq!(output.sql, " WHERE b = ?");
        assert_eq!(output.values, vec![Value::Int(2)]);
    }

    #[test]
    fn test_where_empty_renders_empty() {
        let source = "--- [q]\n\
            SELECT * FROM t\n\
            --- where\n\
            --- ifnotnil [a]\n\
            AND a = #a#\n\
            --- endif\n\
            --- endwhere";
        let output = render_one(source, &Store::new()).unwrap();

        assert_eq!(output.sql, "SELECT * FROM t");
        assert_eq!(output.values, vec![]);
    }

    #[test]
    fn test_dotted_placeholder() {
        let source = "--- [q]\nINSERT INTO t (a, b) VALUES (#item.a#, #item.b#)";
        let store = Store::new().with_must("item", serde_json::json!({"a": 1, "b": "x"}));
        let output = render_one(source, &store).unwrap();

        assert_eq!(output.sql, "INSERT INTO t (a, b) VALUES (?, ?)");
        assert_eq!(
            output.values,
            vec![Value::Int(1), Value::String("x".into())]
        );
    }

    #[test]
    fn test_dotted_placeholder_not_composite() {
        let result = render_one(
            "--- [q]\na = #item.a#",
            &Store::new().with_must("item", 1),
        );

        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotComposite);
    }

    #[test]
    fn test_dotted_placeholder_missing_member() {
        let result = render_one(
            "--- [q]\na = #item.missing#",
            &Store::new().with_must("item", serde_json::json!({"a": 1})),
        );

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ParamNotFound);
    }

    #[test]
    fn test_param_not_found() {
        let result = render_one("--- [q]\na = #a#", &Store::new());

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ParamNotFound);
    }

    #[test]
    fn test_table_not_found() {
        let result = render_one("--- [q]\nSELECT * FROM @table_t@", &Store::new());

        assert_eq!(result.unwrap_err().kind(), ErrorKind::TableNotFound);
    }

    #[test]
    fn test_non_placeholder_hashes_kept() {
        let output = render_one(
            "--- [q]\nSELECT '# not bound #', id = #id#",
            &Store::new().with_must("id", 7),
        )
        .unwrap();

        assert_eq!(output.sql, "SELECT '# not bound #', id = ?");
        assert_eq!(output.values, vec![Value::Int(7)]);
    }

    #[test]
    fn test_time_binds_through() {
        use chrono::{DateTime, Utc};

        let moment = DateTime::parse_from_rfc3339("2018-05-09T22:38:15Z")
            .unwrap()
            .with_timezone(&Utc);
        let source = "--- [q]\n\
            SELECT * FROM t\n\
            --- where\n\
            --- ifnotnil [time]\n\
            AND created >= #time#\n\
            --- endif\n\
            --- endwhere";
        let store = Store::new().with_value("time", Value::Time(moment));
        let output = render_one(source, &store).unwrap();

        assert_eq!(output.sql, "SELECT * FROM t  WHERE created >= ?");
        assert_eq!(output.values, vec![Value::Time(moment)]);
    }

    #[test]
    fn test_render_is_pure() {
        let source = "--- [q]\n\
            SELECT * FROM t\n\
            --- where\n\
            --- if [a > 1]\n\
            AND a = #a#\n\
            --- endif\n\
            --- endwhere";
        let entries = compile(None, source).unwrap();
        let store = Store::new().with_must("a", 2);

        let first = render(&entries[0], &store).unwrap();
        let second = render(&entries[0], &store).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_placeholder_order_matches_questions() {
        let source = "--- [q]\na = #a# AND b = #b# AND c = #c#";
        let store = Store::new()
            .with_must("a", 1)
            .with_must("b", 2)
            .with_must("c", 3);
        let output = render_one(source, &store).unwrap();

        assert_eq!(output.sql.matches('?').count(), output.values.len());
        assert_eq!(
            output.values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }
}
