use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use hocon_lexing::Origin;

use crate::error::ConfigError;
use crate::path::Path;

/// The JSON-schema type of a value, as reported to users. Deferred nodes
/// (substitutions and delayed merges) have no value type until resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Object,
    List,
    Number,
    Boolean,
    Null,
    String,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Object => "object",
            ValueType::List => "list",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Null => "null",
            ValueType::String => "string",
        }
    }
}

/// Whether a subtree still contains substitutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    Unresolved,
    Resolved,
}

impl ResolveStatus {
    pub fn from_bool(resolved: bool) -> ResolveStatus {
        if resolved {
            ResolveStatus::Resolved
        } else {
            ResolveStatus::Unresolved
        }
    }
}

/// Identity of a value node, used by the resolver to memoize work and to
/// detect cycles without parent pointers. Constructors allocate a fresh id;
/// clones share it, which is sound because values are immutable and equal
/// contents resolve identically against a fixed root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> NodeId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A numeric value, either a 64-bit integer or a double. Keeps the original
/// literal text so a rendered config reproduces the input spelling, and
/// compares by numeric value across the two representations.
#[derive(Debug, Clone)]
pub struct Number {
    repr: NumberRepr,
    text: String,
}

#[derive(Debug, Clone, Copy)]
enum NumberRepr {
    Long(i64),
    Double(f64),
}

impl Number {
    pub fn long(value: i64, text: impl Into<String>) -> Number {
        Number {
            repr: NumberRepr::Long(value),
            text: text.into(),
        }
    }

    pub fn double(value: f64, text: impl Into<String>) -> Number {
        Number {
            repr: NumberRepr::Double(value),
            text: text.into(),
        }
    }

    pub fn from_long(value: i64) -> Number {
        Number::long(value, value.to_string())
    }

    /// The exact integer value, if this number has one. Whole doubles
    /// convert; fractional ones don't.
    pub fn as_i64(&self) -> Option<i64> {
        match self.repr {
            NumberRepr::Long(v) => Some(v),
            NumberRepr::Double(d) => {
                if d.fract() == 0.0 && d >= i64::MIN as f64 && d <= i64::MAX as f64 {
                    Some(d as i64)
                } else {
                    None
                }
            }
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self.repr {
            NumberRepr::Long(v) => v as f64,
            NumberRepr::Double(d) => d,
        }
    }

    pub fn is_whole(&self) -> bool {
        match self.repr {
            NumberRepr::Long(_) => true,
            NumberRepr::Double(d) => d.fract() == 0.0,
        }
    }

    pub fn original_text(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self.repr, other.repr) {
            (NumberRepr::Long(a), NumberRepr::Long(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

/// One piece of a substitution node: literal text, or a `${path}` /
/// `${?path}` expression. A substitution with more than one piece is a
/// string concatenation.
#[derive(Debug, Clone, PartialEq)]
pub enum RefPiece {
    Text(String),
    Expr { path: Path, optional: bool },
}

/// A `${path}` reference, possibly carrying the string-concatenation
/// context around it.
#[derive(Debug, Clone)]
pub struct ConfigReference {
    id: NodeId,
    origin: Origin,
    pieces: Vec<RefPiece>,
}

impl ConfigReference {
    pub fn single(origin: Origin, path: Path, optional: bool) -> ConfigReference {
        ConfigReference::from_pieces(origin, vec![RefPiece::Expr { path, optional }])
    }

    pub fn from_pieces(origin: Origin, pieces: Vec<RefPiece>) -> ConfigReference {
        debug_assert!(
            pieces.iter().any(|p| matches!(p, RefPiece::Expr { .. })),
            "substitution node with no expression piece"
        );
        ConfigReference {
            id: NodeId::next(),
            origin,
            pieces,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn pieces(&self) -> &[RefPiece] {
        &self.pieces
    }

    /// The expression as written, for error messages: `a.b` or `?a.b`.
    pub fn expression_string(&self) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                RefPiece::Text(t) => out.push_str(t),
                RefPiece::Expr { path, optional } => {
                    if *optional {
                        out.push('?');
                    }
                    out.push_str(&path.render());
                }
            }
        }
        out
    }

    fn relativized(&self, prefix: &Path) -> ConfigReference {
        let pieces = self
            .pieces
            .iter()
            .map(|piece| match piece {
                RefPiece::Expr { path, optional } => RefPiece::Expr {
                    path: path.prepend(prefix),
                    optional: *optional,
                },
                text => text.clone(),
            })
            .collect();
        ConfigReference::from_pieces(self.origin.clone(), pieces)
    }
}

/// One piece of a deferred concatenation. Whitespace pieces came from the
/// gaps between simple values; they join string concatenations but are
/// dropped next to objects and lists.
#[derive(Debug, Clone, PartialEq)]
pub enum ConcatPiece {
    Value(ConfigValue),
    Whitespace(String),
}

/// A concatenation that cannot be joined until its pieces resolve, because
/// the joined kind (string append, list append or object merge) depends on
/// what the substitutions in it turn out to be.
#[derive(Debug, Clone)]
pub struct ConfigConcat {
    id: NodeId,
    origin: Origin,
    pieces: Vec<ConcatPiece>,
}

impl ConfigConcat {
    pub fn new(origin: Origin, pieces: Vec<ConcatPiece>) -> ConfigConcat {
        ConfigConcat {
            id: NodeId::next(),
            origin,
            pieces,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn pieces(&self) -> &[ConcatPiece] {
        &self.pieces
    }
}

/// An ordered stack of values whose merge cannot be computed until
/// substitutions resolve. The first element has the highest priority.
#[derive(Debug, Clone)]
pub struct ConfigDelayedMerge {
    id: NodeId,
    origin: Origin,
    stack: Vec<ConfigValue>,
}

impl ConfigDelayedMerge {
    pub fn new(origin: Origin, stack: Vec<ConfigValue>) -> ConfigDelayedMerge {
        debug_assert!(stack.len() >= 2, "delayed merge of fewer than two values");
        ConfigDelayedMerge {
            id: NodeId::next(),
            origin,
            stack,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn stack(&self) -> &[ConfigValue] {
        &self.stack
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.id
    }
}

/// An insertion-order-preserving mapping from string keys (not paths) to
/// values.
#[derive(Debug, Clone)]
pub struct ConfigObject {
    id: NodeId,
    origin: Origin,
    fields: IndexMap<String, ConfigValue>,
    resolved: bool,
    ignores_fallbacks: bool,
}

/// An ordered sequence of values.
#[derive(Debug, Clone)]
pub struct ConfigList {
    id: NodeId,
    origin: Origin,
    elements: Vec<ConfigValue>,
    resolved: bool,
}

impl ConfigList {
    pub fn new(origin: Origin, elements: Vec<ConfigValue>) -> ConfigList {
        let resolved = elements
            .iter()
            .all(|v| v.resolve_status() == ResolveStatus::Resolved);
        ConfigList {
            id: NodeId::next(),
            origin,
            elements,
            resolved,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn elements(&self) -> &[ConfigValue] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn resolve_status(&self) -> ResolveStatus {
        ResolveStatus::from_bool(self.resolved)
    }
}

/// A config value: six user-visible kinds plus the internal deferred kinds
/// that only exist before substitution resolution. Values are immutable;
/// every "mutator" returns a new value.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    Null(Origin),
    Boolean(Origin, bool),
    Number(Origin, Number),
    String(Origin, String),
    List(ConfigList),
    Object(ConfigObject),
    /// `${path}` placeholder, resolved against the root and/or environment.
    Reference(ConfigReference),
    /// Concatenation whose join awaits substitution resolution.
    Concat(ConfigConcat),
    /// Merge stack awaiting substitution resolution.
    DelayedMerge(ConfigDelayedMerge),
    /// Merge stack structurally known to produce an object.
    DelayedMergeObject(ConfigDelayedMerge),
}

impl ConfigValue {
    pub fn origin(&self) -> &Origin {
        match self {
            ConfigValue::Null(origin)
            | ConfigValue::Boolean(origin, _)
            | ConfigValue::Number(origin, _)
            | ConfigValue::String(origin, _) => origin,
            ConfigValue::List(list) => &list.origin,
            ConfigValue::Object(object) => &object.origin,
            ConfigValue::Reference(reference) => &reference.origin,
            ConfigValue::Concat(concat) => &concat.origin,
            ConfigValue::DelayedMerge(merge) | ConfigValue::DelayedMergeObject(merge) => {
                &merge.origin
            }
        }
    }

    /// Replaces the origin, typically to attach comments found by the
    /// parser. Keeps the node identity since the contents don't change.
    pub fn with_origin(mut self, origin: Origin) -> ConfigValue {
        match &mut self {
            ConfigValue::Null(o)
            | ConfigValue::Boolean(o, _)
            | ConfigValue::Number(o, _)
            | ConfigValue::String(o, _) => *o = origin,
            ConfigValue::List(list) => list.origin = origin,
            ConfigValue::Object(object) => object.origin = origin,
            ConfigValue::Reference(reference) => reference.origin = origin,
            ConfigValue::Concat(concat) => concat.origin = origin,
            ConfigValue::DelayedMerge(merge) | ConfigValue::DelayedMergeObject(merge) => {
                merge.origin = origin
            }
        }
        self
    }

    /// `None` for deferred nodes, which have no type until resolved.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            ConfigValue::Null(_) => Some(ValueType::Null),
            ConfigValue::Boolean(..) => Some(ValueType::Boolean),
            ConfigValue::Number(..) => Some(ValueType::Number),
            ConfigValue::String(..) => Some(ValueType::String),
            ConfigValue::List(_) => Some(ValueType::List),
            ConfigValue::Object(_) => Some(ValueType::Object),
            _ => None,
        }
    }

    /// Human-readable type name for error messages; deferred nodes report
    /// what they are waiting on.
    pub fn type_description(&self) -> &'static str {
        match self {
            ConfigValue::Reference(_) => "substitution",
            ConfigValue::Concat(_) => "value concatenation",
            ConfigValue::DelayedMerge(_) | ConfigValue::DelayedMergeObject(_) => "delayed merge",
            other => other
                .value_type()
                .expect("non-deferred value has a type")
                .name(),
        }
    }

    pub fn resolve_status(&self) -> ResolveStatus {
        match self {
            ConfigValue::Object(object) => ResolveStatus::from_bool(object.resolved),
            ConfigValue::List(list) => list.resolve_status(),
            ConfigValue::Reference(_)
            | ConfigValue::Concat(_)
            | ConfigValue::DelayedMerge(_)
            | ConfigValue::DelayedMergeObject(_) => ResolveStatus::Unresolved,
            _ => ResolveStatus::Resolved,
        }
    }

    pub(crate) fn node_id(&self) -> Option<NodeId> {
        match self {
            ConfigValue::List(list) => Some(list.id),
            ConfigValue::Object(object) => Some(object.id),
            ConfigValue::Reference(reference) => Some(reference.id),
            ConfigValue::Concat(concat) => Some(concat.id),
            ConfigValue::DelayedMerge(merge) | ConfigValue::DelayedMergeObject(merge) => {
                Some(merge.id)
            }
            _ => None,
        }
    }

    /// Unmergeable values can't merge until substitutions resolve; merging
    /// with one builds up a delayed-merge stack instead.
    pub(crate) fn is_unmergeable(&self) -> bool {
        matches!(
            self,
            ConfigValue::Reference(_)
                | ConfigValue::Concat(_)
                | ConfigValue::DelayedMerge(_)
                | ConfigValue::DelayedMergeObject(_)
        )
    }

    fn unmerged_or_self(&self) -> Vec<ConfigValue> {
        match self {
            ConfigValue::DelayedMerge(merge) | ConfigValue::DelayedMergeObject(merge) => {
                merge.stack.clone()
            }
            other => vec![other.clone()],
        }
    }

    /// A value that has committed to ignoring fallbacks can't change by
    /// merging; `with_fallback` on it is a no-op.
    pub(crate) fn ignores_fallbacks(&self) -> bool {
        match self {
            ConfigValue::Object(object) => object.ignores_fallbacks,
            ConfigValue::Reference(_)
            | ConfigValue::Concat(_)
            | ConfigValue::DelayedMerge(_)
            | ConfigValue::DelayedMergeObject(_) => false,
            other => other.resolve_status() == ResolveStatus::Resolved,
        }
    }

    fn with_fallbacks_ignored(&self) -> ConfigValue {
        match self {
            ConfigValue::Object(object) => ConfigValue::Object(object.with_fallbacks_ignored()),
            other => other.clone(),
        }
    }

    /// Merges this value over the given fallback, per the merge algebra:
    /// objects merge key-wise, a resolved non-object shadows the fallback
    /// entirely, and anything involving an unresolved side becomes a
    /// delayed merge.
    pub fn with_fallback(&self, other: &ConfigValue) -> ConfigValue {
        if self.ignores_fallbacks() {
            return self.clone();
        }

        if other.is_unmergeable() {
            self.merged_with_unmergeable(other)
        } else if let ConfigValue::Object(fallback) = other {
            self.merged_with_object(fallback)
        } else {
            self.merged_with_non_object(other)
        }
    }

    fn construct_delayed_merge(&self, stack: Vec<ConfigValue>) -> ConfigValue {
        let origin = merge_value_origins(&stack);
        let merge = ConfigDelayedMerge::new(origin, stack);
        if matches!(
            self,
            ConfigValue::Object(_) | ConfigValue::DelayedMergeObject(_)
        ) {
            ConfigValue::DelayedMergeObject(merge)
        } else {
            ConfigValue::DelayedMerge(merge)
        }
    }

    fn merged_with_unmergeable(&self, fallback: &ConfigValue) -> ConfigValue {
        // if we turn out to be an object, and the fallback also does, a
        // merge may be required; delay until we resolve
        let mut stack = self.unmerged_or_self();
        stack.extend(fallback.unmerged_or_self());
        self.construct_delayed_merge(stack)
    }

    fn merged_with_object(&self, fallback: &ConfigObject) -> ConfigValue {
        if let ConfigValue::Object(object) = self {
            ConfigValue::Object(object.merged_with_object(fallback))
        } else {
            self.merged_with_non_object(&ConfigValue::Object(fallback.clone()))
        }
    }

    fn merged_with_non_object(&self, fallback: &ConfigValue) -> ConfigValue {
        if self.resolve_status() == ResolveStatus::Resolved {
            // falling back to a non-object doesn't merge anything, and also
            // prohibits merging any objects we fall back to later
            self.with_fallbacks_ignored()
        } else {
            // resolving a substitution in here may need to look at the
            // fallback, so always delay
            let mut stack = self.unmerged_or_self();
            stack.push(fallback.clone());
            self.construct_delayed_merge(stack)
        }
    }

    /// Prefixes every substitution path in the subtree. Used when one file
    /// is included into another at a non-root path: substitutions resolve
    /// globally only after parsing everything, so the included `${a.b}`
    /// has to become `${prefix.a.b}`.
    pub(crate) fn relativized(&self, prefix: &Path) -> ConfigValue {
        match self {
            ConfigValue::Reference(reference) => {
                ConfigValue::Reference(reference.relativized(prefix))
            }
            ConfigValue::Object(object) => {
                let fields = object
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.relativized(prefix)))
                    .collect();
                ConfigValue::Object(ConfigObject::with_flags(
                    object.origin.clone(),
                    fields,
                    object.ignores_fallbacks,
                ))
            }
            ConfigValue::List(list) => ConfigValue::List(ConfigList::new(
                list.origin.clone(),
                list.elements.iter().map(|v| v.relativized(prefix)).collect(),
            )),
            ConfigValue::Concat(concat) => {
                let pieces = concat
                    .pieces
                    .iter()
                    .map(|piece| match piece {
                        ConcatPiece::Value(v) => ConcatPiece::Value(v.relativized(prefix)),
                        whitespace => whitespace.clone(),
                    })
                    .collect();
                ConfigValue::Concat(ConfigConcat::new(concat.origin.clone(), pieces))
            }
            ConfigValue::DelayedMerge(merge) => ConfigValue::DelayedMerge(
                merge.relativized(prefix),
            ),
            ConfigValue::DelayedMergeObject(merge) => {
                ConfigValue::DelayedMergeObject(merge.relativized(prefix))
            }
            other => other.clone(),
        }
    }

    /// The string this value contributes to a string concatenation, or
    /// `None` for objects, lists and deferred nodes, which can't.
    pub(crate) fn transform_to_string(&self) -> Option<String> {
        match self {
            ConfigValue::Null(_) => Some("null".to_string()),
            ConfigValue::Boolean(_, true) => Some("true".to_string()),
            ConfigValue::Boolean(_, false) => Some("false".to_string()),
            ConfigValue::Number(_, number) => Some(number.original_text().to_string()),
            ConfigValue::String(_, s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Wraps this value into `{key: self}`.
    pub fn at_key(&self, key: &str) -> ConfigObject {
        self.at_key_with_origin(&Origin::new(format!("at_key({})", key)), key)
    }

    fn at_key_with_origin(&self, origin: &Origin, key: &str) -> ConfigObject {
        let mut fields = IndexMap::new();
        fields.insert(key.to_string(), self.clone());
        ConfigObject::new(origin.clone(), fields)
    }

    /// Wraps this value into nested single-key objects along `path`.
    pub fn at_path(&self, path: &Path) -> ConfigObject {
        let origin = Origin::new(format!("at_path({})", path.render()));
        self.at_path_with_origin(&origin, path)
    }

    pub(crate) fn at_path_with_origin(&self, origin: &Origin, path: &Path) -> ConfigObject {
        let mut result = self.at_key_with_origin(origin, path.last());
        let mut parent = path.parent();
        while let Some(p) = parent {
            result = ConfigValue::Object(result).at_key_with_origin(origin, p.last());
            parent = p.parent();
        }
        result
    }
}

impl ConfigDelayedMerge {
    fn relativized(&self, prefix: &Path) -> ConfigDelayedMerge {
        ConfigDelayedMerge::new(
            self.origin.clone(),
            self.stack.iter().map(|v| v.relativized(prefix)).collect(),
        )
    }
}

// origin, resolve status and the ignores-fallbacks flag are deliberately
// NOT part of equality
impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConfigValue::Null(_), ConfigValue::Null(_)) => true,
            (ConfigValue::Boolean(_, a), ConfigValue::Boolean(_, b)) => a == b,
            (ConfigValue::Number(_, a), ConfigValue::Number(_, b)) => a == b,
            (ConfigValue::String(_, a), ConfigValue::String(_, b)) => a == b,
            (ConfigValue::List(a), ConfigValue::List(b)) => a.elements == b.elements,
            (ConfigValue::Object(a), ConfigValue::Object(b)) => a.fields == b.fields,
            (ConfigValue::Reference(a), ConfigValue::Reference(b)) => a.pieces == b.pieces,
            (ConfigValue::Concat(a), ConfigValue::Concat(b)) => a.pieces == b.pieces,
            (ConfigValue::DelayedMerge(a), ConfigValue::DelayedMerge(b)) => a.stack == b.stack,
            (ConfigValue::DelayedMergeObject(a), ConfigValue::DelayedMergeObject(b)) => {
                a.stack == b.stack
            }
            _ => false,
        }
    }
}

impl ConfigObject {
    pub fn new(origin: Origin, fields: IndexMap<String, ConfigValue>) -> ConfigObject {
        ConfigObject::with_flags(origin, fields, false)
    }

    pub(crate) fn with_flags(
        origin: Origin,
        fields: IndexMap<String, ConfigValue>,
        ignores_fallbacks: bool,
    ) -> ConfigObject {
        let resolved = fields
            .values()
            .all(|v| v.resolve_status() == ResolveStatus::Resolved);
        ConfigObject {
            id: NodeId::next(),
            origin,
            fields,
            resolved,
            ignores_fallbacks,
        }
    }

    pub fn empty(origin: Origin) -> ConfigObject {
        ConfigObject::new(origin, IndexMap::new())
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ConfigValue> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn resolve_status(&self) -> ResolveStatus {
        ResolveStatus::from_bool(self.resolved)
    }

    pub(crate) fn ignores_fallbacks(&self) -> bool {
        self.ignores_fallbacks
    }

    fn with_fallbacks_ignored(&self) -> ConfigObject {
        if self.ignores_fallbacks {
            return self.clone();
        }
        ConfigObject::with_flags(self.origin.clone(), self.fields.clone(), true)
    }

    /// Key-wise merge: for each key in the union, the earlier object's
    /// child falls back to the later one's. Key order is this object's
    /// insertion order followed by fallback-only keys in fallback order.
    fn merged_with_object(&self, fallback: &ConfigObject) -> ConfigObject {
        let mut merged = IndexMap::new();

        for (key, first) in &self.fields {
            let kept = match fallback.fields.get(key) {
                Some(second) => first.with_fallback(second),
                None => first.clone(),
            };
            merged.insert(key.clone(), kept);
        }
        for (key, second) in &fallback.fields {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), second.clone());
            }
        }

        let origin = Origin::merge_two(&self.origin, &fallback.origin);
        ConfigObject::with_flags(origin, merged, fallback.ignores_fallbacks)
    }

    /// The sub-tree containing only `path`, or an empty object when the
    /// path is absent. Intermediate missing nodes collapse to empty.
    pub fn with_only_path(&self, path: &Path) -> ConfigObject {
        match self.with_only_path_or_none(path) {
            Some(object) => object,
            None => ConfigObject::with_flags(
                self.origin.clone(),
                IndexMap::new(),
                self.ignores_fallbacks,
            ),
        }
    }

    /// As `with_only_path`, but `None` when the path doesn't exist, so a
    /// query for `a.b.c` on `{a: {b: 42}}` doesn't leave an empty `a`
    /// object behind.
    fn with_only_path_or_none(&self, path: &Path) -> Option<ConfigObject> {
        let key = path.first();
        let mut v = self.fields.get(key).cloned();

        if let Some(next) = path.remainder() {
            v = match v {
                Some(ConfigValue::Object(object)) => {
                    object.with_only_path_or_none(&next).map(ConfigValue::Object)
                }
                // the path has more elements but we don't have an object,
                // so the rest of the path doesn't exist
                _ => None,
            };
        }

        v.map(|v| {
            let mut fields = IndexMap::new();
            fields.insert(key.to_string(), v);
            ConfigObject::with_flags(self.origin.clone(), fields, self.ignores_fallbacks)
        })
    }

    /// A copy with `path` removed; a non-object along the way makes this a
    /// no-op.
    pub fn without_path(&self, path: &Path) -> ConfigObject {
        let key = path.first();

        match (self.fields.get(key), path.remainder()) {
            (Some(ConfigValue::Object(child)), Some(next)) => {
                let mut updated = self.fields.clone();
                updated.insert(
                    key.to_string(),
                    ConfigValue::Object(child.without_path(&next)),
                );
                ConfigObject::with_flags(self.origin.clone(), updated, self.ignores_fallbacks)
            }
            (Some(_), None) => {
                let mut smaller = self.fields.clone();
                smaller.shift_remove(key);
                ConfigObject::with_flags(self.origin.clone(), smaller, self.ignores_fallbacks)
            }
            // can't descend, nothing to remove
            _ => self.clone(),
        }
    }

    pub fn with_key_value(&self, key: &str, value: ConfigValue) -> ConfigObject {
        let mut fields = self.fields.clone();
        fields.insert(key.to_string(), value);
        ConfigObject::with_flags(self.origin.clone(), fields, self.ignores_fallbacks)
    }

    /// Sets `path` to `value`, replacing non-object ancestors with fresh
    /// objects as needed.
    pub fn with_value(&self, path: &Path, value: &ConfigValue) -> ConfigObject {
        let key = path.first();
        match path.remainder() {
            None => self.with_key_value(key, value.clone()),
            Some(next) => match self.fields.get(key) {
                Some(ConfigValue::Object(child)) => {
                    self.with_key_value(key, ConfigValue::Object(child.with_value(&next, value)))
                }
                _ => {
                    // as soon as we have a non-object, replace it entirely
                    let origin = Origin::new(format!("with_value({})", next.render()));
                    let subtree = value.at_path_with_origin(&origin, &next);
                    self.with_key_value(key, ConfigValue::Object(subtree))
                }
            },
        }
    }

    /// Plain descent with no resolution; `None` when the path is absent or
    /// passes through a non-object.
    pub(crate) fn peek_path(&self, path: &Path) -> Option<ConfigValue> {
        let v = self.fields.get(path.first())?;
        match path.remainder() {
            None => Some(v.clone()),
            Some(rest) => match v {
                ConfigValue::Object(object) => object.peek_path(&rest),
                _ => None,
            },
        }
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.id
    }
}

impl PartialEq for ConfigObject {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null(_) => write!(f, "null"),
            ConfigValue::Boolean(_, b) => write!(f, "{}", b),
            ConfigValue::Number(_, n) => write!(f, "{}", n.original_text()),
            ConfigValue::String(_, s) => write!(f, "{}", crate::util::render_json_string(s)),
            ConfigValue::List(list) => {
                write!(f, "[")?;
                for (i, v) in list.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            ConfigValue::Object(object) => {
                write!(f, "{{")?;
                for (i, (k, v)) in object.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", crate::util::render_json_string(k), v)?;
                }
                write!(f, "}}")
            }
            ConfigValue::Reference(reference) => write!(f, "${{{}}}", reference.expression_string()),
            ConfigValue::Concat(concat) => {
                for piece in &concat.pieces {
                    match piece {
                        ConcatPiece::Value(v) => write!(f, "{}", v)?,
                        ConcatPiece::Whitespace(ws) => write!(f, "{}", ws)?,
                    }
                }
                Ok(())
            }
            ConfigValue::DelayedMerge(merge) | ConfigValue::DelayedMergeObject(merge) => {
                write!(f, "<delayed merge of {} values>", merge.stack.len())
            }
        }
    }
}

/// Merges the origins of a merge stack, skipping empty resolved objects,
/// which are likely to be implementation details.
pub(crate) fn merge_value_origins(stack: &[ConfigValue]) -> Origin {
    let mut origins = vec![];
    for v in stack {
        let empty_resolved_object = matches!(
            v,
            ConfigValue::Object(o) if o.is_empty() && o.resolve_status() == ResolveStatus::Resolved
        );
        if !empty_resolved_object {
            origins.push(v.origin());
        }
    }

    if origins.is_empty() {
        // they were all empty, just use the first one
        match stack.first() {
            Some(v) => v.origin().clone(),
            None => Origin::new("unknown origin"),
        }
    } else {
        Origin::merge_all(origins)
    }
}

/// Joins adjacent values gathered by the parser. All-strings concatenate as
/// text, all-objects merge with the rightmost winning, all-lists append.
/// Substitutions with literal text around them fold into the substitution
/// node's piece list; any other deferred mix becomes a [`ConfigConcat`].
/// Mixing a scalar with an object or list is an error.
pub(crate) fn concatenate(pieces: Vec<ConcatPiece>) -> Result<ConfigValue, ConfigError> {
    if pieces.len() == 1 {
        return match pieces.into_iter().next() {
            Some(ConcatPiece::Value(v)) => Ok(v),
            _ => Err(ConfigError::bug("concatenation of a lone whitespace run")),
        };
    }

    let mut has_object = false;
    let mut has_list = false;
    let mut has_scalar = false;
    let mut has_reference = false;
    let mut has_other_deferred = false;

    for piece in &pieces {
        match piece {
            ConcatPiece::Value(ConfigValue::Object(_)) => has_object = true,
            ConcatPiece::Value(ConfigValue::List(_)) => has_list = true,
            ConcatPiece::Value(ConfigValue::Reference(_)) => has_reference = true,
            ConcatPiece::Value(
                ConfigValue::Concat(_)
                | ConfigValue::DelayedMerge(_)
                | ConfigValue::DelayedMergeObject(_),
            ) => has_other_deferred = true,
            ConcatPiece::Value(_) => has_scalar = true,
            ConcatPiece::Whitespace(_) => {}
        }
    }

    let origin = merge_value_origins(
        &pieces
            .iter()
            .filter_map(|p| match p {
                ConcatPiece::Value(v) => Some(v.clone()),
                ConcatPiece::Whitespace(_) => None,
            })
            .collect::<Vec<_>>(),
    );

    if !has_reference && !has_other_deferred {
        if has_object && !has_list && !has_scalar {
            let mut merged: Option<ConfigValue> = None;
            for piece in &pieces {
                if let ConcatPiece::Value(v) = piece {
                    merged = Some(match merged {
                        // rightmost wins, like a duplicated key
                        Some(acc) => v.with_fallback(&acc),
                        None => v.clone(),
                    });
                }
            }
            Ok(merged.expect("object concatenation had no pieces"))
        } else if has_list && !has_object && !has_scalar {
            let mut elements = vec![];
            for piece in &pieces {
                if let ConcatPiece::Value(ConfigValue::List(list)) = piece {
                    elements.extend(list.elements.iter().cloned());
                }
            }
            Ok(ConfigValue::List(ConfigList::new(origin, elements)))
        } else if has_scalar && !has_object && !has_list {
            let mut joined = String::new();
            for piece in &pieces {
                match piece {
                    ConcatPiece::Value(v) => joined.push_str(
                        &v.transform_to_string()
                            .expect("scalar transforms to string"),
                    ),
                    ConcatPiece::Whitespace(ws) => joined.push_str(ws),
                }
            }
            Ok(ConfigValue::String(origin, joined))
        } else {
            Err(cannot_concatenate_error(&origin, &pieces))
        }
    } else if has_object || has_list || has_other_deferred {
        Ok(ConfigValue::Concat(ConfigConcat::new(origin, pieces)))
    } else if has_scalar {
        // literal text around the substitutions commits the whole thing to
        // string concatenation
        let mut ref_pieces = vec![];
        for piece in pieces {
            match piece {
                ConcatPiece::Value(ConfigValue::Reference(reference)) => {
                    ref_pieces.extend(reference.pieces().iter().cloned());
                }
                ConcatPiece::Value(v) => ref_pieces.push(RefPiece::Text(
                    v.transform_to_string().expect("scalar transforms to string"),
                )),
                ConcatPiece::Whitespace(ws) => ref_pieces.push(RefPiece::Text(ws)),
            }
        }
        Ok(ConfigValue::Reference(ConfigReference::from_pieces(
            origin, ref_pieces,
        )))
    } else {
        // only substitutions and whitespace; the joined kind depends on
        // what they resolve to
        Ok(ConfigValue::Concat(ConfigConcat::new(origin, pieces)))
    }
}

fn cannot_concatenate_error(origin: &Origin, pieces: &[ConcatPiece]) -> ConfigError {
    let kinds: Vec<&str> = pieces
        .iter()
        .filter_map(|p| match p {
            ConcatPiece::Value(v) => Some(v.type_description()),
            ConcatPiece::Whitespace(_) => None,
        })
        .collect();
    ConfigError::Parse {
        origin: origin.clone(),
        message: format!(
            "Cannot concatenate object or list with a non-object-or-list ({})",
            kinds.join(" and ")
        ),
    }
}

/// Joins the resolved pieces of a [`ConfigConcat`]. Undefined pieces have
/// already been dropped by the resolver. A whitespace piece next to an
/// object or list is layout and gets discarded; between scalars it joins
/// the string concatenation.
pub(crate) fn join_resolved_pieces(
    origin: &Origin,
    pieces: Vec<ConcatPiece>,
) -> Result<Option<ConfigValue>, ConfigError> {
    let is_container =
        |v: &ConfigValue| matches!(v, ConfigValue::Object(_) | ConfigValue::List(_));

    let mut joined: Option<ConfigValue> = None;
    let mut pending_whitespace: Option<String> = None;

    for piece in pieces {
        match piece {
            ConcatPiece::Whitespace(ws) => {
                pending_whitespace = Some(match pending_whitespace {
                    Some(mut pending) => {
                        pending.push_str(&ws);
                        pending
                    }
                    None => ws,
                });
            }
            ConcatPiece::Value(v) => {
                let whitespace = pending_whitespace.take().filter(|_| {
                    // dropped when either neighbor is a container
                    !is_container(&v) && !joined.as_ref().map_or(false, |j| is_container(j))
                });

                let right = match whitespace {
                    Some(ws) => join_two(origin, ConfigValue::String(origin.clone(), ws), v)?,
                    None => v,
                };

                joined = Some(match joined {
                    None => right,
                    Some(left) => join_two(origin, left, right)?,
                });
            }
        }
    }

    // trailing whitespace survives only in a string result
    if let Some(ws) = pending_whitespace {
        if let Some(value) = joined.take() {
            joined = Some(if is_container(&value) {
                value
            } else {
                join_two(origin, value, ConfigValue::String(origin.clone(), ws))?
            });
        }
    }

    Ok(joined)
}

fn join_two(
    origin: &Origin,
    left: ConfigValue,
    right: ConfigValue,
) -> Result<ConfigValue, ConfigError> {
    match (&left, &right) {
        (ConfigValue::Object(_), ConfigValue::Object(_)) => {
            // rightmost wins, like a duplicated key
            Ok(right.with_fallback(&left))
        }
        (ConfigValue::List(a), ConfigValue::List(b)) => {
            let mut elements = a.elements.clone();
            elements.extend(b.elements.iter().cloned());
            Ok(ConfigValue::List(ConfigList::new(origin.clone(), elements)))
        }
        _ => match (left.transform_to_string(), right.transform_to_string()) {
            (Some(a), Some(b)) => Ok(ConfigValue::String(origin.clone(), format!("{}{}", a, b))),
            _ => Err(ConfigError::Parse {
                origin: origin.clone(),
                message: format!(
                    "Cannot concatenate object or list with a non-object-or-list ({} and {})",
                    left.type_description(),
                    right.type_description()
                ),
            }),
        },
    }
}
