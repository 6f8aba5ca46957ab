//! Stencil is a SQL template engine.
//!
//! Templates live in `.sql` files. A file holds one or more entries, each
//! opened by a header line naming the entry's SQL id:
//!
//! ```sql
//! --- [findUsers]
//! SELECT id, name, created FROM user
//! --- where
//! --- ifnotnil [name]
//! AND name = #name#
//! --- endif
//! --- if [limit > 0]
//! AND rank <= #limit#
//! --- endif
//! --- endwhere
//! ```
//!
//! Entries compile once, at startup, into trees of handler nodes held by an
//! [`Engine`]. Rendering an entry against a [`Store`] of parameters walks
//! its tree and produces parameterized SQL plus the bind values for every
//! `?`, in order:
//!
//! ```
//! use stencil::{Engine, Store, Value};
//!
//! let mut engine = Engine::new();
//! engine
//!     .add_source(
//!         "user.sql",
//!         "--- [getUser]\nSELECT id, name FROM user WHERE id = #id#",
//!     )
//!     .unwrap();
//!
//! let store = Store::new().with_must("id", 7);
//! let rendered = engine.render("getUser", &store).unwrap();
//!
//! assert_eq!(rendered.sql, "SELECT id, name FROM user WHERE id = ?");
//! assert_eq!(rendered.values, vec![Value::Int(7)]);
//! ```
//!
//! Blocks available inside an entry:
//!
//! - `--- if [variable <op> literal]` ... `--- endif`, where `<op>` is one
//!   of `==`, `!=`, `<=`, `>=`, `<`, `>`.
//! - `--- ifnotnil [variable]` ... `--- endif`, guarding on presence.
//! - `--- range [source, alias]` or `--- range [source, alias, left, right]`
//!   ... `--- endrange`, looping over a sequence.
//! - `--- set` ... `--- endset`, assembling an `UPDATE` assignment list.
//! - `--- where` ... `--- endwhere`, assembling a `WHERE` clause that
//!   drops empty conditions.
//!
//! Fragments bind `#name#` and `#name.field#` placeholders from the store,
//! and substitute `@table_X@` from a caller-supplied table map. Lines
//! starting with `--` (but not `---`) are comments.

mod compile;
mod engine;
mod log;
mod region;
mod render;
mod store;
mod value;

pub use compile::{compile, Directive, Entry, Operator, Terminator};
pub use engine::Engine;
pub use log::{Error, ErrorKind, Pointer, Visual};
pub use region::Region;
pub use render::{render, Rendered, Tables};
pub use store::Store;
pub use value::Value;
