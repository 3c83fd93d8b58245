//! The owned AST the converter produces (spec §3's data model). A single
//! recursive sum type, `Box`-linked rather than the teacher's refcounted
//! `triomphe::Arc` "harc" pointers — spec §9 flags that pattern as an
//! artifact of the reference implementation's host-VM integration, not
//! something worth reproducing: this tree has no sharing, so a plain `Box`
//! gives the same ownership shape with none of the bookkeeping.

use indexmap::IndexMap;
use serde::Serialize;

use crate::span::Span;

/// One key/value pair in a `Dict` literal.
pub type DictItem = (Node, Node);

/// `TryCatchStatement`'s per-`catch` arm: `(var?, type?, block)`. Serializes
/// as a positional 3-element array with explicit `null`s, matching the
/// original's `[catch_var|null, catch_type|null, catch_stmt]` shape rather
/// than an object — so a plain tuple carries it instead of a named struct.
#[derive(Debug, Clone)]
pub struct CatchEntry {
    pub var: Option<String>,
    pub type_: Option<String>,
    pub block: Node,
}

impl Serialize for CatchEntry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.var)?;
        tup.serialize_element(&self.type_)?;
        tup.serialize_element(&self.block)?;
        tup.end()
    }
}

/// `SelectSetQuery`'s repeated tail element.
#[derive(Debug, Clone, Serialize)]
pub struct SelectSetNode {
    pub select_query: Node,
    pub set_operator: String,
}

/// A named entry in a `WITH` clause (spec §4.12); order of first occurrence
/// vs. last-wins overwrite is resolved before this value is built — see
/// `convert::select::with_expr_list`.
#[derive(Debug, Clone, Serialize)]
pub struct CteEntry {
    pub name: String,
    pub expr: Node,
    pub cte_type: CteType,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CteType {
    Subquery,
    Column,
}

/// A `Constant`'s value. Non-finite floats are carried as a tagged string
/// per spec §3/§6.3 rather than `f64`, since JSON has no literal spelling
/// for `Infinity`/`NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    NonFinite(&'static str),
    String(String),
}

impl Serialize for Constant {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Constant::Null => s.serialize_none(),
            Constant::Bool(b) => s.serialize_bool(*b),
            Constant::Int(i) => s.serialize_i64(*i),
            Constant::Float(f) => s.serialize_f64(*f),
            Constant::NonFinite(tag) => s.serialize_str(tag),
            Constant::String(text) => s.serialize_str(text),
        }
    }
}

/// One AST node. Spans are carried out-of-band in `Spanned` rather than on
/// every variant, so construction code doesn't thread a `Span` argument
/// through every match arm; only the outermost `visit` wrapper (mirrored by
/// `convert::visit`) ever needs to know whether spans are being recorded at
/// all (`is_internal`, spec §4.2).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "node")]
pub enum Node {
    Program {
        declarations: Vec<Spanned>,
    },
    Block {
        declarations: Vec<Spanned>,
    },
    VariableDeclaration {
        name: String,
        expr: Option<Box<Spanned>>,
    },
    VariableAssignment {
        left: Box<Spanned>,
        right: Box<Spanned>,
    },
    ExprStatement {
        expr: Option<Box<Spanned>>,
    },
    ReturnStatement {
        expr: Option<Box<Spanned>>,
    },
    ThrowStatement {
        expr: Option<Box<Spanned>>,
    },
    IfStatement {
        expr: Box<Spanned>,
        then: Box<Spanned>,
        #[serde(rename = "else_", skip_serializing_if = "Option::is_none")]
        else_: Option<Box<Spanned>>,
    },
    WhileStatement {
        expr: Box<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Box<Spanned>>,
    },
    ForStatement {
        #[serde(skip_serializing_if = "Option::is_none")]
        initializer: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        condition: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        increment: Option<Box<Spanned>>,
        body: Box<Spanned>,
    },
    ForInStatement {
        #[serde(rename = "keyVar", skip_serializing_if = "Option::is_none")]
        key_var: Option<String>,
        #[serde(rename = "valueVar")]
        value_var: String,
        expr: Box<Spanned>,
        body: Box<Spanned>,
    },
    TryCatchStatement {
        try_stmt: Box<Spanned>,
        catches: Vec<CatchEntry>,
        #[serde(skip_serializing_if = "Option::is_none")]
        finally_stmt: Option<Box<Spanned>>,
    },
    Function {
        name: String,
        params: Vec<String>,
        body: Box<Spanned>,
    },
    SelectQuery {
        #[serde(skip_serializing_if = "Option::is_none")]
        ctes: Option<IndexMap<String, CteEntry>>,
        select: Vec<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        distinct: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        select_from: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        where_: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        prewhere: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        having: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        group_by: Option<Vec<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        order_by: Option<Vec<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        window_exprs: Option<IndexMap<String, Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        offset: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit_with_ties: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit_by: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        array_join_op: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        array_join_list: Option<Vec<Spanned>>,
    },
    SelectSetQuery {
        initial_select_query: Box<Spanned>,
        subsequent_select_queries: Vec<SelectSetNode>,
    },
    JoinExpr {
        table: Box<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        table_final: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sample: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_join: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        join_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        constraint: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        table_args: Option<Vec<Spanned>>,
    },
    JoinConstraint {
        expr: Box<Spanned>,
        constraint_type: String,
    },
    SampleExpr {
        sample_value: Box<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        offset_value: Option<Box<Spanned>>,
    },
    RatioExpr {
        left: Box<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        right: Option<Box<Spanned>>,
    },
    OrderExpr {
        expr: Box<Spanned>,
        order: String,
    },
    LimitByExpr {
        n: Box<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        offset_value: Option<Box<Spanned>>,
        exprs: Vec<Spanned>,
    },
    WindowExpr {
        #[serde(skip_serializing_if = "Option::is_none")]
        partition_by: Option<Vec<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        order_by: Option<Vec<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        frame_method: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        frame_start: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        frame_end: Option<Box<Spanned>>,
    },
    WindowFrameExpr {
        frame_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        frame_value: Option<Box<Spanned>>,
    },
    WindowFunction {
        name: String,
        exprs: Vec<Spanned>,
        args: Vec<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        over_expr: Option<Box<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        over_identifier: Option<String>,
    },
    Call {
        name: String,
        args: Vec<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<Vec<Spanned>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        distinct: Option<bool>,
    },
    ExprCall {
        expr: Box<Spanned>,
        args: Vec<Spanned>,
    },
    CompareOperation {
        left: Box<Spanned>,
        right: Box<Spanned>,
        op: String,
    },
    ArithmeticOperation {
        left: Box<Spanned>,
        right: Box<Spanned>,
        op: String,
    },
    And {
        exprs: Vec<Spanned>,
    },
    Or {
        exprs: Vec<Spanned>,
    },
    Not {
        expr: Box<Spanned>,
    },
    Constant {
        value: Constant,
        #[serde(rename = "value_type", skip_serializing_if = "Option::is_none")]
        value_type: Option<&'static str>,
    },
    Field {
        chain: Vec<String>,
    },
    Placeholder {
        expr: Box<Spanned>,
    },
    Array {
        exprs: Vec<Spanned>,
    },
    Tuple {
        exprs: Vec<Spanned>,
    },
    Dict {
        items: Vec<(Spanned, Spanned)>,
    },
    ArrayAccess {
        array: Box<Spanned>,
        property: Box<Spanned>,
        #[serde(skip_serializing_if = "Option::is_none")]
        nullish: Option<bool>,
    },
    TupleAccess {
        tuple: Box<Spanned>,
        index: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        nullish: Option<bool>,
    },
    Alias {
        expr: Box<Spanned>,
        alias: String,
    },
    Lambda {
        args: Vec<String>,
        expr: Box<Spanned>,
    },
    BetweenExpr {
        expr: Box<Spanned>,
        low: Box<Spanned>,
        high: Box<Spanned>,
        negated: bool,
    },
    HogQLXTag {
        kind: String,
        attributes: Vec<Spanned>,
    },
    HogQLXAttribute {
        name: String,
        value: Box<Spanned>,
    },
}

/// A `Node` paired with its source span. Spans are emitted only in
/// non-internal mode (spec §4.2); `internal` conversions build `Spanned`
/// with `span: None` throughout and the serializer omits both fields.
#[derive(Debug, Clone)]
pub struct Spanned {
    pub node: Node,
    pub span: Option<Span>,
}

impl Spanned {
    pub fn new(node: Node, span: Span) -> Self {
        Self { node, span: Some(span) }
    }

    pub fn internal(node: Node) -> Self {
        Self { node, span: None }
    }
}

impl Serialize for Spanned {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        // `Node`'s derived `Serialize` produces a plain map (thanks to
        // `#[serde(tag = "node")]`); re-serialize it merged with `start`/
        // `end` by going through `serde_json::Value` rather than hand-
        // rolling a second copy of every variant's field list.
        let mut value = serde_json::to_value(&self.node).map_err(serde::ser::Error::custom)?;
        if let (Some(span), Some(obj)) = (self.span, value.as_object_mut()) {
            obj.insert("start".into(), serde_json::Value::from(span.start));
            obj.insert("end".into(), serde_json::Value::from(span.end));
        }
        let obj = value.as_object().ok_or_else(|| serde::ser::Error::custom("AST node did not serialize to an object"))?;
        let mut map = serializer.serialize_map(Some(obj.len()))?;
        for (k, v) in obj {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Serializes `root` to the wire JSON shape, translating byte offsets to
/// `{line, column, offset}` positions via `lines` (spec §6.3). `Spanned`'s
/// own `Serialize` impl emits raw `u32` offsets for `start`/`end`; this
/// function re-walks the resulting `serde_json::Value` tree to swap them
/// for full `Position` objects, since attaching a `&Lines` to every nested
/// `Spanned` would require threading it through every constructor.
pub fn to_json(root: &Spanned, lines: &crate::span::Lines) -> String {
    let mut value = serde_json::to_value(root).expect("AST serialization is infallible");
    attach_positions(&mut value, lines);
    serde_json::to_string(&value).expect("AST serialization is infallible")
}

fn attach_positions(value: &mut serde_json::Value, lines: &crate::span::Lines) {
    match value {
        serde_json::Value::Object(map) => {
            for key in ["start", "end"] {
                if let Some(offset) = map.get(key).and_then(|v| v.as_u64()) {
                    let position = lines.position(offset as u32);
                    map.insert(key.to_string(), serde_json::to_value(position).unwrap());
                }
            }
            for (_, v) in map.iter_mut() {
                attach_positions(v, lines);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                attach_positions(item, lines);
            }
        }
        _ => {}
    }
}
