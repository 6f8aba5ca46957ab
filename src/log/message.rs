pub const NO_MATCHING_ENTRY: &str = "no matching entry";
pub const DUPLICATE_ENTRY: &str = "duplicate entry";
pub const STRUCTURAL: &str = "malformed nesting";
pub const INVALID_SYNTAX: &str = "invalid syntax";
pub const PARAM_NOT_FOUND: &str = "parameter not found";
pub const NOT_A_SEQUENCE: &str = "not a sequence";
pub const NOT_COMPOSITE: &str = "not a composite";
pub const NO_UPDATABLE_FIELD: &str = "no updatable field";
pub const TABLE_NOT_FOUND: &str = "table not found";
pub const INCOMPATIBLE_TYPES: &str = "incompatible types";
pub const UNSERIALIZABLE: &str = "unserializable value";
pub const IO: &str = "io error";

/// Return a string describing a missing guard operator.
pub fn expected_operator(expression: &str) -> String {
    format!(
        "expected an operator like `==`, `!=`, `<=`, `>=`, `<` or `>` in `{}`",
        expression
    )
}

/// Return a string describing an unknown directive keyword.
pub fn unknown_directive(keyword: &str) -> String {
    format!(
        "unknown directive `{}`, expected `if`, `ifnotnil`, `range`, `set`, `where` \
        or a terminator like `endif`",
        keyword
    )
}
