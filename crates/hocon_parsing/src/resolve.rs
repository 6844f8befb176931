// The substitution resolver: walks a value tree, replacing ${path}
// references by looking them up against the root (and optionally the
// system environment), memoizing per node and detecting cycles.

use std::collections::HashMap;

use indexmap::IndexMap;

use hocon_lexing::Origin;

use crate::error::ConfigError;
use crate::path::Path;
use crate::value::{
    join_resolved_pieces, ConcatPiece, ConfigConcat, ConfigDelayedMerge, ConfigList, ConfigObject,
    ConfigReference, ConfigValue, NodeId, RefPiece, ResolveStatus,
};

/// A set of options related to resolving substitutions. Immutable: the
/// setters return a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    use_system_environment: bool,
    allow_unresolved: bool,
}

impl ResolveOptions {
    /// By default the system environment is consulted and unresolved
    /// substitutions are an error.
    pub fn defaults() -> ResolveOptions {
        ResolveOptions {
            use_system_environment: true,
            allow_unresolved: false,
        }
    }

    /// Defaults with any reference to system data (currently, environment
    /// variables) disabled.
    pub fn no_system() -> ResolveOptions {
        ResolveOptions::defaults().with_use_system_environment(false)
    }

    pub fn with_use_system_environment(self, value: bool) -> ResolveOptions {
        ResolveOptions {
            use_system_environment: value,
            ..self
        }
    }

    /// When true, `resolve` leaves substitutions it cannot resolve in
    /// place instead of failing; later reads of them may fail instead.
    pub fn with_allow_unresolved(self, value: bool) -> ResolveOptions {
        ResolveOptions {
            allow_unresolved: value,
            ..self
        }
    }

    pub fn use_system_environment(&self) -> bool {
        self.use_system_environment
    }

    pub fn allow_unresolved(&self) -> bool {
        self.allow_unresolved
    }
}

/// Resolves every substitution in `root`, returning a new tree. The
/// environment mapping is consulted for paths not found in the root when
/// the options say so; the variable name is exactly the dotted path.
pub fn resolve(
    root: &ConfigObject,
    options: &ResolveOptions,
    env: &HashMap<String, String>,
) -> Result<ConfigObject, ConfigError> {
    // resolution is idempotent, and a resolved tree has nothing to do
    if root.resolve_status() == ResolveStatus::Resolved {
        return Ok(root.clone());
    }

    let mut context = ResolveContext {
        root,
        options: *options,
        env,
        memos: HashMap::new(),
        stack: vec![],
        trace: vec![],
        restrict: None,
        replacements: vec![],
    };

    match context.resolve_object(root) {
        Ok(resolved) => Ok(resolved),
        Err(ResolveFailure::Error(e)) => Err(e),
        // cycles are supposed to be caught by the substitution that looked
        // up the cyclic reference, never by the outermost resolve
        Err(ResolveFailure::NotPossible { trace }) => Err(ConfigError::bug(format!(
            "cycle of substitutions reached the outermost resolve: {}",
            trace
        ))),
    }
}

/// Internal failure while resolving. `NotPossible` means a value is
/// inherently unresolvable (a substitution cycle); it's caught by the
/// reference that looked up the cycle and converted to a public
/// `UnresolvedSubstitution` error, so it never escapes this module.
enum ResolveFailure {
    NotPossible { trace: String },
    Error(ConfigError),
}

type Resolved = Result<Option<ConfigValue>, ResolveFailure>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey(NodeId, Option<Path>);

struct ResolveContext<'a> {
    root: &'a ConfigObject,
    options: ResolveOptions,
    env: &'a HashMap<String, String>,
    /// Already-resolved nodes, keyed by identity plus the restriction in
    /// effect. `None` entries mean "resolved to undefined".
    memos: HashMap<MemoKey, Option<ConfigValue>>,
    /// Nodes currently being resolved, for cycle detection.
    stack: Vec<MemoKey>,
    /// Rendered substitution chain, for cycle error messages.
    trace: Vec<String>,
    /// When set, only the subtree along this path is resolved.
    restrict: Option<Path>,
    /// Self-reference frames: while a delayed-merge element resolves, a
    /// lookup that reaches the merge node itself sees the remainder of
    /// the stack (or undefined) instead.
    replacements: Vec<(NodeId, Option<ConfigValue>)>,
}

impl ResolveContext<'_> {
    fn resolve_value(&mut self, value: &ConfigValue) -> Resolved {
        if value.resolve_status() == ResolveStatus::Resolved {
            return Ok(Some(value.clone()));
        }

        let key = value.node_id().map(|id| MemoKey(id, self.restrict.clone()));

        if let Some(key) = &key {
            if let Some(memo) = self.memos.get(key) {
                return Ok(memo.clone());
            }
            if self.stack.contains(key) {
                return Err(ResolveFailure::NotPossible {
                    trace: self.trace_string(),
                });
            }
            self.stack.push(key.clone());
        }

        let result = self.resolve_inner(value);

        if key.is_some() {
            self.stack.pop();
        }

        if let (Some(key), Ok(resolved)) = (key, &result) {
            // a result computed under a self-reference replacement isn't
            // valid outside it
            if self.replacements.is_empty() {
                self.memos.insert(key, resolved.clone());
            }
        }

        result
    }

    fn resolve_inner(&mut self, value: &ConfigValue) -> Resolved {
        match value {
            ConfigValue::Object(object) => {
                Ok(Some(ConfigValue::Object(self.resolve_object(object)?)))
            }
            ConfigValue::List(list) => self.resolve_list(list),
            ConfigValue::Reference(reference) => self.resolve_reference(reference),
            ConfigValue::Concat(concat) => self.resolve_concat(concat),
            ConfigValue::DelayedMerge(merge) | ConfigValue::DelayedMergeObject(merge) => {
                self.resolve_delayed(merge)
            }
            resolved => Ok(Some(resolved.clone())),
        }
    }

    /// Resolves each child in insertion order. Under a restriction only
    /// the child on the restriction path is resolved, and not the leaf
    /// itself; the caller resolves the leaf if it needs it. Children that
    /// resolve to undefined are dropped.
    fn resolve_object(&mut self, object: &ConfigObject) -> Result<ConfigObject, ResolveFailure> {
        if object.resolve_status() == ResolveStatus::Resolved {
            return Ok(object.clone());
        }

        let restrict = self.restrict.clone();
        let mut fields = IndexMap::new();

        for (key, child) in object.iter() {
            let resolved_child = match &restrict {
                Some(restrict_path) => {
                    if restrict_path.first() == key {
                        match restrict_path.remainder() {
                            Some(remainder) => {
                                self.restrict = Some(remainder);
                                let resolved = self.resolve_value(child);
                                self.restrict = restrict.clone();
                                resolved?
                            }
                            None => Some(child.clone()),
                        }
                    } else {
                        Some(child.clone())
                    }
                }
                None => self.resolve_value(child)?,
            };

            if let Some(v) = resolved_child {
                fields.insert(key.clone(), v);
            }
        }

        Ok(ConfigObject::with_flags(
            object.origin().clone(),
            fields,
            object.ignores_fallbacks(),
        ))
    }

    fn resolve_list(&mut self, list: &ConfigList) -> Resolved {
        // restrictions address object keys, not list elements
        let saved = self.restrict.take();

        let mut elements = vec![];
        let mut failure = None;
        for element in list.elements() {
            match self.resolve_value(element) {
                Ok(Some(v)) => elements.push(v),
                // undefined elements are dropped
                Ok(None) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.restrict = saved;
        match failure {
            Some(e) => Err(e),
            None => Ok(Some(ConfigValue::List(ConfigList::new(
                list.origin().clone(),
                elements,
            )))),
        }
    }

    fn resolve_reference(&mut self, reference: &ConfigReference) -> Resolved {
        if reference.pieces().len() == 1 {
            self.resolve_reference_value(reference)
        } else {
            self.resolve_reference_string(reference)
        }
    }

    /// A bare `${path}`: the result is whatever the target is.
    fn resolve_reference_value(&mut self, reference: &ConfigReference) -> Resolved {
        let RefPiece::Expr { path, optional } = &reference.pieces()[0] else {
            return Err(ResolveFailure::Error(ConfigError::bug(
                "substitution node with a lone text piece",
            )));
        };

        match self.lookup(path) {
            Ok(found) => match found {
                Some(v) => Ok(Some(v)),
                None if *optional => Ok(None),
                None if self.options.allow_unresolved() => {
                    Ok(Some(ConfigValue::Reference(reference.clone())))
                }
                None => Err(ResolveFailure::Error(ConfigError::UnresolvedSubstitution {
                    origin: reference.origin().clone(),
                    detail: reference.expression_string(),
                })),
            },
            Err(ResolveFailure::NotPossible { trace }) => {
                if *optional || self.options.allow_unresolved() {
                    // undefined at the cycle leaf
                    Ok(None)
                } else {
                    Err(ResolveFailure::Error(ConfigError::UnresolvedSubstitution {
                        origin: reference.origin().clone(),
                        detail: format!(
                            "{} was part of a cycle of substitutions involving {}",
                            path.render(),
                            trace
                        ),
                    }))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// A substitution with surrounding text: every piece becomes a string.
    fn resolve_reference_string(&mut self, reference: &ConfigReference) -> Resolved {
        let mut out = String::new();

        for piece in reference.pieces() {
            match piece {
                RefPiece::Text(text) => out.push_str(text),
                RefPiece::Expr { path, optional } => match self.lookup(path) {
                    Ok(Some(v)) => match v.transform_to_string() {
                        Some(s) => out.push_str(&s),
                        None => {
                            return Err(ResolveFailure::Error(ConfigError::Parse {
                                origin: reference.origin().clone(),
                                message: format!(
                                    "Cannot concatenate object or list with a string: \
                                     ${{{}}} resolved to {}",
                                    path.render(),
                                    v.type_description()
                                ),
                            }))
                        }
                    },
                    // an undefined optional substitution becomes an empty
                    // string inside a string concatenation
                    Ok(None) if *optional => {}
                    Ok(None) if self.options.allow_unresolved() => {
                        return Ok(Some(ConfigValue::Reference(reference.clone())))
                    }
                    Ok(None) => {
                        return Err(ResolveFailure::Error(ConfigError::UnresolvedSubstitution {
                            origin: reference.origin().clone(),
                            detail: path.render(),
                        }))
                    }
                    Err(ResolveFailure::NotPossible { trace }) => {
                        if *optional || self.options.allow_unresolved() {
                            return Ok(None);
                        }
                        return Err(ResolveFailure::Error(ConfigError::UnresolvedSubstitution {
                            origin: reference.origin().clone(),
                            detail: format!(
                                "{} was part of a cycle of substitutions involving {}",
                                path.render(),
                                trace
                            ),
                        }));
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        Ok(Some(ConfigValue::String(reference.origin().clone(), out)))
    }

    fn resolve_concat(&mut self, concat: &ConfigConcat) -> Resolved {
        let saved = self.restrict.take();

        let mut resolved_pieces = vec![];
        let mut failure = None;
        for piece in concat.pieces() {
            match piece {
                ConcatPiece::Whitespace(ws) => {
                    resolved_pieces.push(ConcatPiece::Whitespace(ws.clone()))
                }
                ConcatPiece::Value(v) => match self.resolve_value(v) {
                    Ok(Some(r)) => {
                        if r.resolve_status() == ResolveStatus::Unresolved {
                            // allow-unresolved left a reference in place;
                            // keep the whole concatenation deferred
                            self.restrict = saved;
                            return Ok(Some(ConfigValue::Concat(concat.clone())));
                        }
                        resolved_pieces.push(ConcatPiece::Value(r));
                    }
                    // undefined pieces drop out of the concatenation
                    Ok(None) => {}
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                },
            }
        }

        self.restrict = saved;
        match failure {
            Some(e) => Err(e),
            None => join_resolved_pieces(concat.origin(), resolved_pieces)
                .map_err(ResolveFailure::Error),
        }
    }

    /// Resolves each stack element in priority order and folds the results
    /// with `with_fallback`. While element `i` resolves, a self-referential
    /// lookup that reaches this merge node is redirected to the merge of
    /// elements below `i`, which is what makes `a = ${a} ...` styles of
    /// self-reference terminate.
    fn resolve_delayed(&mut self, merge: &ConfigDelayedMerge) -> Resolved {
        let saved = self.restrict.take();
        let stack = merge.stack();
        let mut merged: Option<ConfigValue> = None;
        let mut failure = None;

        for (i, element) in stack.iter().enumerate() {
            let remainder = remainder_merge(&stack[i + 1..]);
            self.replacements.push((merge.node_id(), remainder));
            let resolved = self.resolve_value(element);
            self.replacements.pop();

            match resolved {
                Ok(Some(r)) => {
                    merged = Some(match merged.take() {
                        Some(m) => m.with_fallback(&r),
                        None => r,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.restrict = saved;
        match failure {
            Some(e) => Err(e),
            None => Ok(merged),
        }
    }

    fn lookup(&mut self, path: &Path) -> Resolved {
        self.trace.push(format!("${{{}}}", path.render()));
        let result = self.lookup_inner(path);
        self.trace.pop();
        result
    }

    fn lookup_inner(&mut self, path: &Path) -> Resolved {
        let peeked = self.peek_path_in_root(path)?;
        let peeked = self.apply_replacements(peeked);

        match peeked {
            Some(value) => {
                // found in the root; now resolve the target itself, fully
                let saved = self.restrict.take();
                let resolved = self.resolve_value(&value);
                self.restrict = saved;
                resolved
            }
            None => {
                if self.options.use_system_environment() {
                    let name = path.join_dotted();
                    if let Some(found) = self.env.get(&name) {
                        let origin = Origin::new(format!("env var {}", name));
                        return Ok(Some(ConfigValue::String(origin, found.clone())));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Resolves only the ancestors along `path` in the root, then peeks the
    /// path in the partial result. The target itself stays unresolved.
    fn peek_path_in_root(&mut self, path: &Path) -> Result<Option<ConfigValue>, ResolveFailure> {
        let key = MemoKey(self.root.node_id(), Some(path.clone()));

        if let Some(memo) = self.memos.get(&key) {
            return match memo {
                Some(ConfigValue::Object(object)) => Ok(object.peek_path(path)),
                _ => Err(ResolveFailure::Error(ConfigError::bug(
                    "memoized root resolution was not an object",
                ))),
            };
        }

        if self.stack.contains(&key) {
            return Err(ResolveFailure::NotPossible {
                trace: self.trace_string(),
            });
        }
        self.stack.push(key.clone());

        let saved = self.restrict.replace(path.clone());
        let root = self.root;
        let partial = self.resolve_object(root);
        self.restrict = saved;
        self.stack.pop();

        let partial = partial?;
        if self.replacements.is_empty() {
            self.memos
                .insert(key, Some(ConfigValue::Object(partial.clone())));
        }

        Ok(partial.peek_path(path))
    }

    /// Swaps a peeked value for its active self-reference replacement, if
    /// any. Undefined replacements mean the reference sees nothing.
    fn apply_replacements(&self, mut value: Option<ConfigValue>) -> Option<ConfigValue> {
        loop {
            let id = match value.as_ref().and_then(|v| v.node_id()) {
                Some(id) => id,
                None => return value,
            };
            match self.replacements.iter().rev().find(|(rid, _)| *rid == id) {
                Some((_, replacement)) => value = replacement.clone(),
                None => return value,
            }
        }
    }

    fn trace_string(&self) -> String {
        self.trace.join(" -> ")
    }
}

fn remainder_merge(rest: &[ConfigValue]) -> Option<ConfigValue> {
    let mut iter = rest.iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |acc, v| acc.with_fallback(v)))
}
