//! Canonicalisation of raw analysis output for persistence.
//!
//! The SDK's dictionary dump of an analysis result uses `snake_case` keys and
//! `{x, y}` point objects. The training service expects the REST spelling:
//! `camelCase` keys and flat polygons. Two rules, applied depth-first:
//!
//! 1. Every mapping key is camel-cased (`bounding_regions` → `boundingRegions`).
//! 2. The value under any `"polygon"` key becomes `[x0, y0, x1, y1, …]`.
//!
//! Sequences of mappings are rewritten element by element; sequences of
//! scalars pass through untouched. A sequence mixing mappings with other
//! values has no rule: in lenient mode it is kept verbatim (and logged), in
//! strict mode it is an [`LabelError::UnsupportedShape`]. Polygons are
//! treated the same way when they are neither point objects nor already
//! flat.

use crate::error::LabelError;
use serde_json::{Map, Value};
use tracing::warn;

/// How to react to a shape the rules above do not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapePolicy {
    /// Keep the offending value verbatim.
    #[default]
    Lenient,
    /// Fail with [`LabelError::UnsupportedShape`].
    Strict,
}

/// Canonicalise `tree`, passing unsupported shapes through verbatim.
pub fn canonicalize(tree: &Value) -> Value {
    let ctx = Context {
        policy: ShapePolicy::Lenient,
    };
    // Lenient mode never produces an error.
    ctx.value(tree, "$").unwrap_or_else(|_| tree.clone())
}

/// Canonicalise `tree` under an explicit policy.
///
/// # Errors
/// [`LabelError::UnsupportedShape`] in [`ShapePolicy::Strict`] mode only.
pub fn canonicalize_with(tree: &Value, policy: ShapePolicy) -> Result<Value, LabelError> {
    Context { policy }.value(tree, "$")
}

/// `my_property` → `myProperty`.
///
/// The first segment is kept as is; every following segment is title-cased
/// (first letter of each run of cased letters upper, the rest lower).
pub fn to_camel_case(key: &str) -> String {
    let mut segments = key.split('_');
    let mut out = String::with_capacity(key.len());
    if let Some(first) = segments.next() {
        out.push_str(first);
    }
    for segment in segments {
        title_case_into(segment, &mut out);
    }
    out
}

fn title_case_into(segment: &str, out: &mut String) {
    let mut in_word = false;
    for c in segment.chars() {
        // Digits and uncased letters (CJK and the like) end a word.
        if c.is_lowercase() || c.is_uppercase() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
}

struct Context {
    policy: ShapePolicy,
}

enum PolygonShape {
    Keep,
    Flat(Vec<Value>),
    Bad(&'static str),
}

fn flatten_points(points: &[Value]) -> Option<Vec<Value>> {
    let mut flat = Vec::with_capacity(points.len() * 2);
    for point in points {
        let x = point.get("x").filter(|v| v.is_number())?;
        let y = point.get("y").filter(|v| v.is_number())?;
        flat.push(x.clone());
        flat.push(y.clone());
    }
    Some(flat)
}

impl Context {
    fn value(&self, value: &Value, path: &str) -> Result<Value, LabelError> {
        match value {
            Value::Object(map) => self.mapping(map, path).map(Value::Object),
            Value::Array(items) => self.sequence(items, path),
            scalar => Ok(scalar.clone()),
        }
    }

    fn mapping(&self, map: &Map<String, Value>, path: &str) -> Result<Map<String, Value>, LabelError> {
        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            let child_path = format!("{path}.{key}");
            let mut value = self.value(value, &child_path)?;
            if key == "polygon" {
                value = self.polygon(value, &child_path)?;
            }
            out.insert(to_camel_case(key), value);
        }
        Ok(out)
    }

    fn sequence(&self, items: &[Value], path: &str) -> Result<Value, LabelError> {
        let mappings = items.iter().filter(|v| v.is_object()).count();
        if mappings == 0 {
            return Ok(Value::Array(items.to_vec()));
        }
        if mappings < items.len() {
            return self.unsupported(
                Value::Array(items.to_vec()),
                path,
                "sequence mixes mappings with other values",
            );
        }

        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.value(item, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn polygon(&self, value: Value, path: &str) -> Result<Value, LabelError> {
        let shape = match &value {
            Value::Null => PolygonShape::Keep,
            Value::Array(points) if points.iter().all(Value::is_number) => PolygonShape::Keep,
            Value::Array(points) => match flatten_points(points) {
                Some(flat) => PolygonShape::Flat(flat),
                None => PolygonShape::Bad("polygon point is not an {x, y} mapping"),
            },
            _ => PolygonShape::Bad("polygon is not a sequence"),
        };

        match shape {
            PolygonShape::Keep => Ok(value),
            PolygonShape::Flat(flat) => Ok(Value::Array(flat)),
            PolygonShape::Bad(detail) => self.unsupported(value, path, detail),
        }
    }

    fn unsupported(&self, value: Value, path: &str, detail: &str) -> Result<Value, LabelError> {
        match self.policy {
            ShapePolicy::Strict => Err(LabelError::UnsupportedShape {
                path: path.to_string(),
                detail: detail.to_string(),
            }),
            ShapePolicy::Lenient => {
                warn!("{} at '{}'; keeping it verbatim", detail, path);
                Ok(value)
            }
        }
    }
}
