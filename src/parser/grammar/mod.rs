//! Grammar productions, one module per domain (spec §6.2's rule groups):
//! literals/identifiers, expressions, select/join/window clauses, the
//! imperative statement sublanguage, HogQLX tags, and template strings.

pub mod column_expr;
pub mod hogqlx;
pub mod literal;
pub mod program;
pub mod select;
pub mod template_string;
