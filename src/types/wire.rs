//! JSON encoding of [`Criteria`] trees.
//!
//! On the wire every tree is a disjunction of conjunctions:
//!
//! ```text
//! { "anyOf": [ { "allOf": [ node, ... ] }, ... ] }
//! ```
//!
//! where `node` is either a leaf (for conditions, `{ "rule": ..., "params": [...] }`)
//! or another `{ "anyOf": ... }` object. Nesting recovers arbitrary trees.
//! Whether a node is nested or a leaf is settled once while decoding; after
//! that the tree is a plain [`Criteria`] value.
//!
//! Encoding a tree that came off the wire gives back the same shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::criteria::Criteria;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireCriteria<T> {
    any_of: Vec<WireConjunction<T>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireConjunction<T> {
    all_of: Vec<WireNode<T>>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireNode<T> {
    Nested(WireCriteria<T>),
    Leaf(T),
}

fn encode<T>(criteria: &Criteria<T>) -> WireCriteria<&T> {
    match criteria {
        Criteria::Any(children) => WireCriteria {
            any_of: children.iter().map(encode_conjunction).collect(),
        },
        other => WireCriteria {
            any_of: vec![encode_conjunction(other)],
        },
    }
}

fn encode_conjunction<T>(criteria: &Criteria<T>) -> WireConjunction<&T> {
    match criteria {
        Criteria::All(children) => WireConjunction {
            all_of: children.iter().map(encode_node).collect(),
        },
        other => WireConjunction {
            all_of: vec![encode_node(other)],
        },
    }
}

fn encode_node<T>(criteria: &Criteria<T>) -> WireNode<&T> {
    match criteria {
        Criteria::Leaf(value) => WireNode::Leaf(value),
        other => WireNode::Nested(encode(other)),
    }
}

fn decode<T>(wire: WireCriteria<T>) -> Criteria<T> {
    Criteria::Any(
        wire.any_of
            .into_iter()
            .map(|conjunction| {
                Criteria::All(conjunction.all_of.into_iter().map(decode_node).collect())
            })
            .collect(),
    )
}

fn decode_node<T>(node: WireNode<T>) -> Criteria<T> {
    match node {
        WireNode::Nested(nested) => decode(nested),
        WireNode::Leaf(value) => Criteria::Leaf(value),
    }
}

impl<T: Serialize> Serialize for Criteria<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        encode(self).serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Criteria<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WireCriteria::<T>::deserialize(deserializer).map(decode)
    }
}

impl<T: DeserializeOwned> Criteria<T> {
    /// Decode criteria from their JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `json` is not a valid
    /// criteria document for `T`.
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }
}
