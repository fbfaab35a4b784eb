use serde_json::{Map, Value};

use super::{Ast, EMPTY_TYPE, NodeIx};
use crate::error::{RatingError, Result};

/// Reads an optional scalar field as a string. Numbers and booleans are
/// accepted and kept in their JSON spelling.
fn scalar_field(object: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(other) => Err(RatingError::malformed(
            format!("`{key}` must be a string, found {other}"),
            Value::Object(object.clone()).to_string(),
        )),
    }
}

impl Ast {
    /// Parses a tree from its JSON text.
    ///
    /// Every node is an object with a `type`, an optional `value` and `id`,
    /// and optionally a `children` object keyed by relation label. The order
    /// of children comes from `childrenOrder` when present, otherwise from
    /// the order of keys in `children`. A `null` child becomes a placeholder
    /// node of type [`EMPTY_TYPE`].
    pub fn parse(source: &str) -> Result<Ast> {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| RatingError::malformed(e.to_string(), source))?;
        Self::from_json(&value).map_err(|e| match e {
            RatingError::MalformedTree { reason, .. } => RatingError::malformed(reason, source),
            other => other,
        })
    }

    /// Builds a tree from an already parsed JSON value.
    pub fn from_json(value: &Value) -> Result<Ast> {
        let object = value
            .as_object()
            .ok_or_else(|| RatingError::malformed("a tree must be a JSON object", value.to_string()))?;
        let (node_type, node_value, id) = Self::read_fields(object)?;
        let mut ast = Ast::new(node_type, node_value, id);
        let root = ast.root();
        ast.read_children(root, object)?;
        Ok(ast)
    }

    /// Reads type, value and id of one node object.
    fn read_fields(object: &Map<String, Value>) -> Result<(String, Option<String>, Option<String>)> {
        let node_type = match object.get("type") {
            Some(Value::String(t)) => t.clone(),
            _ => {
                return Err(RatingError::malformed(
                    "node is missing a string `type`",
                    Value::Object(object.clone()).to_string(),
                ));
            }
        };
        Ok((node_type, scalar_field(object, "value")?, scalar_field(object, "id")?))
    }

    /// Parses the children of `object` and attaches them under `parent`.
    fn read_children(&mut self, parent: NodeIx, object: &Map<String, Value>) -> Result<()> {
        let children = match object.get("children") {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Object(children)) => children,
            Some(other) => {
                return Err(RatingError::malformed("`children` must be an object", other.to_string()));
            }
        };

        let order: Vec<String> = match object.get("childrenOrder") {
            Some(Value::Array(order)) => order
                .iter()
                .map(|relation| match relation {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(RatingError::malformed(
                        "`childrenOrder` entries must be strings",
                        other.to_string(),
                    )),
                })
                .collect::<Result<_>>()?,
            _ => children.keys().cloned().collect(),
        };

        for relation in order {
            let child = match children.get(&relation) {
                None => {
                    return Err(RatingError::malformed(
                        format!("`childrenOrder` names `{relation}` but `children` does not"),
                        Value::Object(object.clone()).to_string(),
                    ));
                }
                Some(Value::Null) => self.create(EMPTY_TYPE, None, None),
                Some(Value::Object(child_object)) => {
                    let (node_type, value, id) = Self::read_fields(child_object)?;
                    let child = self.create(node_type, value, id);
                    self.read_children(child, child_object)?;
                    child
                }
                Some(other) => {
                    return Err(RatingError::malformed(
                        format!("child `{relation}` must be an object or null"),
                        other.to_string(),
                    ));
                }
            };
            if !self.add_child(parent, relation.clone(), child) {
                return Err(RatingError::malformed(
                    format!("relation `{relation}` appears twice"),
                    Value::Object(object.clone()).to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Serializes the tree to its JSON object form.
    pub fn to_json(&self) -> Value {
        self.node_to_json(self.root)
    }

    /// Serializes the tree to compact JSON text.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Serializes the subtree rooted at `ix`.
    pub fn node_to_json(&self, ix: NodeIx) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String(self.node_type(ix).to_string()));
        if let Some(value) = self.value(ix) {
            object.insert("value".into(), Value::String(value.to_string()));
        }
        if let Some(id) = self.id(ix) {
            object.insert("id".into(), Value::String(id.to_string()));
        }
        if !self.children(ix).is_empty() {
            let mut children = Map::new();
            let mut order = Vec::new();
            for (child, relation) in self.children(ix).iter().zip(self.relations(ix)) {
                children.insert(relation.clone(), self.node_to_json(*child));
                order.push(Value::String(relation.clone()));
            }
            object.insert("children".into(), Value::Object(children));
            object.insert("childrenOrder".into(), Value::Array(order));
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_in_children_order() {
        let ast = Ast::parse(
            r#"{"type":"script","children":{"a":{"type":"x"},"b":{"type":"y","value":"3"}},
                "childrenOrder":["b","a"]}"#,
        )
        .expect("parse");
        let root = ast.root();
        assert_eq!(ast.relations(root), ["b", "a"]);
        assert_eq!(ast.node_type(ast.children(root)[0]), "y");
        assert_eq!(ast.value(ast.children(root)[0]), Some("3"));
    }

    #[test]
    fn falls_back_to_key_order() {
        let ast = Ast::parse(r#"{"type":"s","children":{"z":{"type":"x"},"a":{"type":"y"}}}"#)
            .expect("parse");
        assert_eq!(ast.relations(ast.root()), ["z", "a"]);
    }

    #[test]
    fn null_children_become_placeholders() {
        let ast = Ast::parse(r#"{"type":"s","children":{"0":null,"1":{"type":"x"}}}"#)
            .expect("parse");
        let first = ast.children(ast.root())[0];
        assert_eq!(ast.node_type(first), EMPTY_TYPE);
        assert_eq!(ast.size(), 3);
    }

    #[test]
    fn round_trips_through_json() {
        let source = r#"{"type":"s","id":"r","children":{"k":{"type":"x","value":"v"}},"childrenOrder":["k"]}"#;
        let ast = Ast::parse(source).expect("parse");
        let again = Ast::parse(&ast.to_json_string()).expect("reparse");
        assert_eq!(ast, again);
        assert_eq!(ast.to_json_string(), source);
    }

    #[test]
    fn malformed_input_is_echoed() {
        let err = Ast::parse(r#"{"value":"no type"}"#).expect_err("missing type");
        match err {
            RatingError::MalformedTree { input, .. } => assert!(input.contains("no type")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(Ast::parse("{not json").is_err());
        assert!(Ast::parse(r#"{"type":"s","children":{},"childrenOrder":["0"]}"#).is_err());
    }
}
