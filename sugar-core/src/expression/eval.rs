//! Tree-walking evaluator.
//!
//! Operators follow the loose, script-like semantics templates are written
//! against: `+` concatenates when either side is a string, `&&` and `||`
//! return an operand, comparisons of two strings are lexical.

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::scope::Scope;
use crate::error::ExprError;
use crate::observer::{ArrayRef, Data, ObjectRef, Value};

pub(crate) fn evaluate(expr: &Expr, scope: &Scope) -> Result<Data, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(literal(value)),
        Expr::Ident(name) => Ok(scope.lookup(name)),
        Expr::Member(object, name) => member(&evaluate(object, scope)?, name),
        Expr::Index(object, index) => {
            let target = evaluate(object, scope)?;
            let key = evaluate(index, scope)?;
            member(&target, &key.to_display())
        }
        Expr::Call(name, args) => call(name, args, scope),
        Expr::Unary(op, operand) => {
            let value = evaluate(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => Data::Bool(!value.truthy()),
                UnaryOp::Negate => Data::Number(-value.to_number()),
                UnaryOp::Plus => Data::Number(value.to_number()),
            })
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            let left = evaluate(left, scope)?;
            if left.truthy() {
                evaluate(right, scope)
            } else {
                Ok(left)
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = evaluate(left, scope)?;
            if left.truthy() {
                Ok(left)
            } else {
                evaluate(right, scope)
            }
        }
        Expr::Binary(op, left, right) => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Conditional(test, consequent, alternate) => {
            if evaluate(test, scope)?.truthy() {
                evaluate(consequent, scope)
            } else {
                evaluate(alternate, scope)
            }
        }
        Expr::Object(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for entry in entries {
                map.insert(entry.key.clone(), evaluate(&entry.value, scope)?);
            }
            Ok(Data::Object(ObjectRef::from_entries(map, scope.model().runtime())))
        }
        Expr::Array(items) => {
            let items = items
                .iter()
                .map(|item| evaluate(item, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Data::Array(ArrayRef::from_data(items, scope.model().runtime())))
        }
        Expr::Assign(target, value) => {
            let value = evaluate(value, scope)?;
            assign(target, scope, value.clone())?;
            Ok(value)
        }
    }
}

/// Write `value` to the path `target` names.
pub(crate) fn assign(target: &Expr, scope: &Scope, value: Data) -> Result<(), ExprError> {
    match target {
        Expr::Ident(name) => scope.assign(name, value),
        Expr::Member(object, name) => set_member(&evaluate(object, scope)?, name, value),
        Expr::Index(object, index) => {
            let target = evaluate(object, scope)?;
            let key = evaluate(index, scope)?;
            set_member(&target, &key.to_display(), value)
        }
        other => Err(ExprError::NotAssignable(format!("{other:?}"))),
    }
}

fn literal(value: &Value) -> Data {
    match value {
        Value::Bool(b) => Data::Bool(*b),
        Value::Number(n) => Data::Number(*n),
        Value::String(s) => Data::string(s),
        _ => Data::Null,
    }
}

fn array_index(key: &str) -> Option<usize> {
    key.parse::<usize>().ok()
}

fn member(target: &Data, key: &str) -> Result<Data, ExprError> {
    match target {
        Data::Object(object) => Ok(object.get(key)),
        Data::Array(array) if key == "length" => Ok(Data::Number(array.len() as f64)),
        Data::Array(array) => Ok(array_index(key).map(|index| array.get(index)).unwrap_or_default()),
        Data::String(s) if key == "length" => Ok(Data::Number(s.chars().count() as f64)),
        Data::Null => Err(ExprError::Runtime(format!("cannot read property `{key}` of null"))),
        _ => Ok(Data::Null),
    }
}

fn set_member(target: &Data, key: &str, value: Data) -> Result<(), ExprError> {
    match target {
        Data::Object(object) => object
            .set(key, value)
            .map_err(|err| ExprError::Runtime(err.to_string())),
        Data::Array(array) => {
            let index = array_index(key)
                .ok_or_else(|| ExprError::Runtime(format!("cannot set property `{key}` of an array")))?;
            array
                .set(index, value)
                .map_err(|err| ExprError::Runtime(err.to_string()))
        }
        other => Err(ExprError::Runtime(format!(
            "cannot set property `{key}` of {}",
            other.type_name()
        ))),
    }
}

fn call(name: &str, args: &[Expr], scope: &Scope) -> Result<Data, ExprError> {
    let method = scope
        .method(name)
        .ok_or_else(|| ExprError::UnknownMethod(name.to_string()))?;
    let args = args
        .iter()
        .map(|arg| evaluate(arg, scope))
        .collect::<Result<Vec<_>, _>>()?;

    let model = scope.model();
    let result = method(model, &args);
    Ok(Data::from_value(result, model.runtime()))
}

fn binary(op: BinaryOp, left: &Data, right: &Data) -> Data {
    match op {
        BinaryOp::Add => {
            if is_textual(left) || is_textual(right) {
                Data::from(format!("{}{}", left.to_display(), right.to_display()))
            } else {
                Data::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Data::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Data::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Data::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Data::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Data::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::LtEq => Data::Bool(matches!(compare(left, right), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => Data::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::GtEq => Data::Bool(matches!(compare(left, right), Some(Ordering::Greater | Ordering::Equal))),
        BinaryOp::Eq => Data::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => Data::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Data::Bool(strict_eq(left, right)),
        BinaryOp::StrictNotEq => Data::Bool(!strict_eq(left, right)),
        // Short-circuited in `evaluate`.
        BinaryOp::And | BinaryOp::Or => Data::Null,
    }
}

fn is_textual(value: &Data) -> bool {
    matches!(value, Data::String(_) | Data::Object(_) | Data::Array(_))
}

fn compare(left: &Data, right: &Data) -> Option<Ordering> {
    match (left, right) {
        (Data::String(a), Data::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

fn strict_eq(left: &Data, right: &Data) -> bool {
    match (left, right) {
        (Data::Number(a), Data::Number(b)) => a == b,
        _ => left.same(right),
    }
}

fn loose_eq(left: &Data, right: &Data) -> bool {
    match (left, right) {
        (Data::Null, Data::Null) => true,
        (Data::Null, _) | (_, Data::Null) => false,
        (Data::Number(_) | Data::Bool(_), Data::String(_) | Data::Bool(_) | Data::Number(_))
        | (Data::String(_), Data::Number(_) | Data::Bool(_)) => left.to_number() == right.to_number(),
        _ => strict_eq(left, right),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::super::parser::parse;
    use super::super::scope::{Method, Methods};
    use super::*;
    use crate::observer::{Model, Observer};
    use crate::reactive::Runtime;
    use serde_json::json;

    fn scope(json: serde_json::Value) -> Scope {
        let model = Observer::new(&Runtime::new())
            .observe_model(Value::from(json))
            .unwrap();
        let mut methods = Methods::new();
        let double: Method = Rc::new(|_: &Model, args: &[Data]| Value::Number(args.first().map_or(0.0, Data::to_number) * 2.0));
        methods.insert("double".into(), double);
        Scope::root(model, Rc::new(methods))
    }

    fn eval(source: &str, scope: &Scope) -> Data {
        evaluate(&parse(source).unwrap(), scope).unwrap()
    }

    #[test]
    fn plus_concatenates_with_strings() {
        let scope = scope(json!({"name": "World", "n": 2}));
        assert_eq!(eval(r#""Hello " + (name) + "!""#, &scope).as_str(), Some("Hello World!"));
        assert_eq!(eval("n + 1", &scope).as_number(), Some(3.0));
        assert_eq!(eval("'n=' + n", &scope).as_str(), Some("n=2"));
    }

    #[test]
    fn logical_operators_return_operands() {
        let scope = scope(json!({"empty": "", "fallback": "x"}));
        assert_eq!(eval("empty || fallback", &scope).as_str(), Some("x"));
        assert_eq!(eval("empty && fallback", &scope).as_str(), Some(""));
    }

    #[test]
    fn equality_flavours() {
        let scope = scope(json!({"n": 1, "s": "1"}));
        assert!(eval("n == s", &scope).truthy());
        assert!(!eval("n === s", &scope).truthy());
        assert!(eval("n !== s", &scope).truthy());
        assert!(eval("null == undefined", &scope).truthy());
    }

    #[test]
    fn member_access_on_containers() {
        let scope = scope(json!({"user": {"tags": ["a", "b"]}}));
        assert_eq!(eval("user.tags.length", &scope).as_number(), Some(2.0));
        assert_eq!(eval("user.tags[1]", &scope).as_str(), Some("b"));
        assert_eq!(eval("user['tags'].0", &scope).as_str(), Some("a"));
        assert!(eval("user.missing", &scope).is_null());
    }

    #[test]
    fn reading_through_null_is_an_error() {
        let scope = scope(json!({}));
        let err = evaluate(&parse("missing.deeper").unwrap(), &scope).unwrap_err();
        assert!(matches!(err, ExprError::Runtime(_)));
    }

    #[test]
    fn calls_registered_methods() {
        let scope = scope(json!({"n": 4}));
        assert_eq!(eval("double(n) + 1", &scope).as_number(), Some(9.0));

        let err = evaluate(&parse("nope()").unwrap(), &scope).unwrap_err();
        assert_eq!(err, ExprError::UnknownMethod("nope".into()));
    }

    #[test]
    fn assignment_writes_through() {
        let scope = scope(json!({"count": 1, "user": {"name": "a"}}));
        eval("count = count + 1", &scope);
        eval("user.name = 'b'", &scope);
        assert_eq!(scope.model().to_value(), Value::from(json!({"count": 2, "user": {"name": "b"}})));
    }

    #[test]
    fn object_literals_are_observed() {
        let scope = scope(json!({"c": "red"}));
        let value = eval("{color: c, 'font-size': '12px'}", &scope);
        assert_eq!(value.to_value(), Value::from(json!({"color": "red", "font-size": "12px"})));
    }
}
