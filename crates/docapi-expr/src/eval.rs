//! # Expression Evaluator
//!
//! Walks an [`Expr`] and produces a [`ResolvedValue`]. Identifiers are
//! looked up through a caller-supplied [`Resolver`]; `schema` and `params`
//! are builtins whose application is delegated back to the resolver, since
//! only the caller owns the schema resolution context.
//!
//! ## Rules
//!
//! - Spreads must match their container: arrays spread arrays, objects
//!   spread objects. Anything else is [`EvalError::SpreadMismatch`].
//! - Duplicate object keys: the later value wins, at the earlier position.
//! - Member access on an unresolved name stays unresolved; member access on
//!   plain scalars is [`EvalError::NotAccessible`].
//! - `+` adds numbers (integers stay integers while the sum fits) and
//!   concatenates anything else as loose strings.
//!
//! Evaluation has no state of its own: given the same resolver answers it
//! always produces the same value.

use serde_json::Number;

use crate::ast::{Expr, Literal, Property};
use crate::error::{EvalError, ExprError};
use crate::parser::parse;
use crate::value::{apply_modify, Builtin, NotFound, ResolvedValue, ValueMap};

/// Identifier lookup and builtin application, supplied by the caller.
pub trait Resolver {
    /// Resolve a free identifier. Unknown names return
    /// [`ResolvedValue::NotFound`].
    fn resolve(&mut self, name: &str) -> ResolvedValue;

    /// Apply `schema` or `params` to evaluated arguments.
    fn apply(
        &mut self,
        builtin: &Builtin,
        args: Vec<ResolvedValue>,
    ) -> Result<ResolvedValue, EvalError>;
}

/// Parse and evaluate `text` in one step.
pub fn eval_str(text: &str, resolver: &mut dyn Resolver) -> Result<ResolvedValue, ExprError> {
    let expr = parse(text)?;
    Ok(evaluate(&expr, resolver)?)
}

/// Evaluate a parsed expression.
pub fn evaluate(expr: &Expr, resolver: &mut dyn Resolver) -> Result<ResolvedValue, EvalError> {
    match expr {
        Expr::Literal(literal) => Ok(literal_value(literal)),
        Expr::Identifier(name) => Ok(match Builtin::from_name(name) {
            Some(builtin) => ResolvedValue::Builtin(builtin),
            None => resolver.resolve(name),
        }),
        Expr::Array(elements) => {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                let value = evaluate(&element.expr, resolver)?;
                if !element.spread {
                    items.push(value);
                    continue;
                }
                match value {
                    ResolvedValue::List(spread) => items.extend(spread),
                    other => {
                        return Err(EvalError::SpreadMismatch {
                            container: "array",
                            expected: "an array",
                            found: other.kind_name(),
                        })
                    }
                }
            }
            Ok(ResolvedValue::List(items))
        }
        Expr::Object(props) => {
            let mut map = ValueMap::new();
            for prop in props {
                match prop {
                    Property::KeyValue { key, value } => {
                        let value = evaluate(value, resolver)?;
                        map.insert(key.as_str(), value);
                    }
                    Property::Spread(expr) => match evaluate(expr, resolver)? {
                        ResolvedValue::Map(spread) => {
                            for (k, v) in spread {
                                map.insert(k, v);
                            }
                        }
                        other => {
                            return Err(EvalError::SpreadMismatch {
                                container: "object",
                                expected: "an object",
                                found: other.kind_name(),
                            })
                        }
                    },
                }
            }
            Ok(ResolvedValue::Map(map))
        }
        Expr::Member { base, name } => match evaluate(base, resolver)? {
            // The innermost missing member is the one reported.
            ResolvedValue::NotFound(missing) => Ok(ResolvedValue::NotFound(NotFound {
                name: name.clone(),
                context: missing.context,
            })),
            other => match other.as_accessible() {
                Some(accessible) => Ok(accessible.get_member(name)),
                None => Err(EvalError::NotAccessible {
                    member: name.clone(),
                    found: other.kind_name(),
                }),
            },
        },
        Expr::Call { callee, args } => {
            let builtin = match evaluate(callee, resolver)? {
                ResolvedValue::Builtin(builtin) => builtin,
                _ => {
                    return Err(EvalError::NotCallable {
                        callee: render(callee),
                    })
                }
            };
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, resolver)?);
            }
            match &builtin {
                Builtin::Modify { target, name } => {
                    let mut nodes = Vec::with_capacity(values.len());
                    for value in &values {
                        let node = value.to_data_node().ok_or_else(|| EvalError::Builtin {
                            builtin: name.clone(),
                            message: format!("arguments must be plain values, got {}", value.kind_name()),
                        })?;
                        nodes.push(node);
                    }
                    Ok(apply_modify(target, name, nodes))
                }
                Builtin::Schema | Builtin::Params => resolver.apply(&builtin, values),
            }
        }
        Expr::Plus(left, right) => {
            let left = evaluate(left, resolver)?;
            let right = evaluate(right, resolver)?;
            Ok(add(&left, &right))
        }
    }
}

fn literal_value(literal: &Literal) -> ResolvedValue {
    match literal {
        Literal::Null => ResolvedValue::Null,
        Literal::Bool(b) => ResolvedValue::Bool(*b),
        Literal::Integer(i) => ResolvedValue::Number((*i).into()),
        Literal::Float(f) => Number::from_f64(*f)
            .map(ResolvedValue::Number)
            .unwrap_or(ResolvedValue::Null),
        Literal::String(s) => ResolvedValue::String(s.clone()),
    }
}

fn add(left: &ResolvedValue, right: &ResolvedValue) -> ResolvedValue {
    if let (ResolvedValue::Number(a), ResolvedValue::Number(b)) = (left, right) {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            if let Some(sum) = x.checked_add(y) {
                return ResolvedValue::Number(sum.into());
            }
        }
        if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
            return Number::from_f64(x + y)
                .map(ResolvedValue::Number)
                .unwrap_or(ResolvedValue::Null);
        }
    }
    ResolvedValue::String(loose_string(left) + &loose_string(right))
}

fn loose_string(value: &ResolvedValue) -> String {
    match value {
        ResolvedValue::String(s) => s.clone(),
        ResolvedValue::Number(n) => n.to_string(),
        ResolvedValue::Bool(b) => b.to_string(),
        ResolvedValue::Null => "null".to_string(),
        ResolvedValue::NotFound(_) => "undefined".to_string(),
        ResolvedValue::Type(t) => t.ty.key.clone().or_else(|| t.ty.name.clone()).unwrap_or_default(),
        ResolvedValue::Package(p) => p.path.clone(),
        ResolvedValue::Builtin(b) => b.name().to_string(),
        ResolvedValue::Map(_) | ResolvedValue::List(_) | ResolvedValue::Schema(_) => value
            .to_data_node()
            .and_then(|node| node.to_json_compact().ok())
            .unwrap_or_default(),
    }
}

/// Source-like rendering of a callee, for error messages.
fn render(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.clone(),
        Expr::Member { base, name } => format!("{}.{name}", render(base)),
        Expr::Call { callee, .. } => format!("{}(...)", render(callee)),
        Expr::Literal(Literal::String(s)) => format!("'{s}'"),
        Expr::Literal(_) => "literal".to_string(),
        Expr::Array(_) => "array".to_string(),
        Expr::Object(_) => "object".to_string(),
        Expr::Plus(..) => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docapi_core::{Node, Schema};
    use std::collections::HashMap;

    /// Resolver over a fixed table. `params` yields one entry per string
    /// argument; `schema` wraps plain data in an `Any` schema.
    #[derive(Default)]
    struct TableResolver {
        names: HashMap<String, ResolvedValue>,
    }

    impl Resolver for TableResolver {
        fn resolve(&mut self, name: &str) -> ResolvedValue {
            self.names.get(name).cloned().unwrap_or_else(|| {
                ResolvedValue::NotFound(NotFound {
                    name: name.to_string(),
                    context: "table".to_string(),
                })
            })
        }

        fn apply(
            &mut self,
            builtin: &Builtin,
            args: Vec<ResolvedValue>,
        ) -> Result<ResolvedValue, EvalError> {
            match builtin {
                Builtin::Params => match args.into_iter().next() {
                    Some(ResolvedValue::List(fields)) => Ok(ResolvedValue::List(
                        fields
                            .into_iter()
                            .map(|f| {
                                let mut entry = ValueMap::new();
                                entry.insert("name", f);
                                ResolvedValue::Map(entry)
                            })
                            .collect(),
                    )),
                    _ => Err(EvalError::Builtin {
                        builtin: "params".into(),
                        message: "expected a list".into(),
                    }),
                },
                _ => Ok(ResolvedValue::from(Schema::Object(Default::default()))),
            }
        }
    }

    fn eval(text: &str) -> Result<ResolvedValue, ExprError> {
        let mut resolver = TableResolver::default();
        resolver.names.insert(
            "Pet".into(),
            ResolvedValue::List(vec!["id".into(), "name".into()]),
        );
        resolver.names.insert("n".into(), 2i64.into());
        eval_str(text, &mut resolver)
    }

    fn node(value: ResolvedValue) -> Node {
        value.to_data_node().expect("plain data")
    }

    #[test]
    fn spread_flattens_params_in_order() {
        let value = eval(r#"[...params(Pet), {name: "extra", required: true}]"#).unwrap();
        assert_eq!(
            node(value).to_json_compact().unwrap(),
            r#"[{"name":"id"},{"name":"name"},{"name":"extra","required":true}]"#
        );
    }

    #[test]
    fn spread_mismatch_is_an_error() {
        let err = eval("[...n]").unwrap_err();
        assert_eq!(
            err,
            ExprError::Eval(EvalError::SpreadMismatch {
                container: "array",
                expected: "an array",
                found: "number",
            })
        );
        assert!(matches!(
            eval("{...Pet}").unwrap_err(),
            ExprError::Eval(EvalError::SpreadMismatch { container: "object", .. })
        ));
    }

    #[test]
    fn unknown_identifiers_are_tolerated() {
        match eval("missing.deeper").unwrap() {
            ResolvedValue::NotFound(nf) => {
                assert_eq!(nf.name, "deeper");
                assert_eq!(nf.context, "table");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn object_duplicate_keys_keep_first_position() {
        let value = eval("{a: 1, b: 2, a: 3}").unwrap();
        assert_eq!(node(value).to_json_compact().unwrap(), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn object_spread_merges_maps() {
        let value = eval("{...{a: 1, b: 2}, b: 3, c: 4}").unwrap();
        assert_eq!(node(value).to_json_compact().unwrap(), r#"{"a":1,"b":3,"c":4}"#);
    }

    #[test]
    fn member_access_on_maps() {
        assert_eq!(eval("{a: {b: 'x'}}.a.b").unwrap(), ResolvedValue::from("x"));
        assert!(matches!(eval("{a: 1}.z").unwrap(), ResolvedValue::NotFound(_)));
    }

    #[test]
    fn member_access_on_scalars_fails() {
        assert!(matches!(
            eval("n.x").unwrap_err(),
            ExprError::Eval(EvalError::NotAccessible { found: "number", .. })
        ));
    }

    #[test]
    fn calling_non_builtins_fails() {
        assert_eq!(
            eval("Pet(1)").unwrap_err(),
            ExprError::Eval(EvalError::NotCallable { callee: "Pet".into() })
        );
        assert!(matches!(
            eval("missing()").unwrap_err(),
            ExprError::Eval(EvalError::NotCallable { .. })
        ));
    }

    #[test]
    fn plus_adds_numbers_and_concatenates_strings() {
        assert_eq!(eval("1 + n").unwrap(), ResolvedValue::from(3i64));
        assert_eq!(
            node(eval("1.5 + 1").unwrap()).to_json_compact().unwrap(),
            "2.5"
        );
        assert_eq!(eval("'v' + n").unwrap(), ResolvedValue::from("v2"));
        assert_eq!(eval("n + 'v' + true").unwrap(), ResolvedValue::from("2vtrue"));
        assert_eq!(eval("[1] + 'x'").unwrap(), ResolvedValue::from("[1]x"));
    }

    #[test]
    fn schema_modifiers_chain() {
        let value = eval("schema(Pet).required('id').hidden()").unwrap();
        assert_eq!(
            node(value).to_json_compact().unwrap(),
            r#"{"type":"object","properties":{},"modify":[{"name":"required","args":["id"]},{"name":"hidden","args":[]}]}"#
        );
    }

    #[test]
    fn parse_errors_surface() {
        assert!(matches!(eval("[1,").unwrap_err(), ExprError::Parse(_)));
    }
}
