//! Binary snapshots of compiled route collections.
//!
//! A snapshot lets an application skip lexing, parsing and tree walking on
//! boot. It stores every route together with its compiled pattern and rule
//! invocations; loading it rebuilds the regular expressions and resolves the
//! rules against a [`RuleRegistry`](crate::RuleRegistry), which is the only
//! compile-time work left.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RMIL"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version must match exactly. Separately, the payload carries a
//! BLAKE3 digest of the application version string passed to
//! [`RouteCollection::to_bytes`](crate::RouteCollection::to_bytes); a loader
//! that expects a different version gets [`DeserializeError::StaleVersion`].

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parse::{RuleInvocation, SyntaxNode};
use crate::rules::RuleRegistry;
use crate::types::{
    CompiledTemplate, CompiledVariable, MiddlewareBinding, Route, RouteAction, RouteCollection,
    UriTemplate, Value, ValueType,
};
use crate::CompileError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"RMIL";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`RouteCollection`] to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode route collection: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}

/// Errors that can occur when loading a [`RouteCollection`] from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a routemill snapshot: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("snapshot was built for a different application version")]
    StaleVersion,

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("failed to rebuild routes: {0}")]
    Rebuild(#[from] CompileError),

    #[error("failed to rebuild match pattern: {0}")]
    Pattern(#[from] regex::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedCollection {
    metadata: CollectionMetadata,
    routes: Vec<SerializedRoute>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionMetadata {
    route_count: usize,
    version_digest: Option<[u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRoute {
    methods: Vec<String>,
    path: String,
    host: Option<String>,
    path_tree: SerializedNode,
    host_tree: Option<SerializedNode>,
    template: SerializedTemplate,
    action: SerializedAction,
    middleware: Vec<SerializedMiddleware>,
    name: Option<String>,
    attributes: Vec<(String, SerializedValue)>,
    headers_to_match: Vec<(String, String)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedTemplate {
    pattern: String,
    is_host_template: bool,
    variables: Vec<SerializedVariable>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedVariable {
    name: String,
    invocations: Vec<SerializedInvocation>,
    default: Option<String>,
    optional: bool,
    value_type: SerializedValueType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedInvocation {
    slug: String,
    arguments: Vec<SerializedValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedNode {
    Root(Vec<SerializedNode>),
    Literal(String),
    Variable {
        name: String,
        rules: Vec<SerializedInvocation>,
        default: Option<String>,
    },
    Optional(Vec<SerializedNode>),
}

#[derive(Debug, Serialize, Deserialize)]
enum SerializedAction {
    Method { controller: String, method: String },
    Handler(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedMiddleware {
    name: String,
    parameters: Vec<(String, SerializedValue)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedValueType {
    Int,
    Float,
    Str,
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn serialize_value(value: &Value) -> SerializedValue {
    match value {
        Value::Int(v) => SerializedValue::Int(*v),
        Value::Float(v) => SerializedValue::Float(*v),
        Value::Bool(v) => SerializedValue::Bool(*v),
        Value::String(v) => SerializedValue::Str(v.clone()),
    }
}

fn deserialize_value(value: SerializedValue) -> Value {
    match value {
        SerializedValue::Int(v) => Value::Int(v),
        SerializedValue::Float(v) => Value::Float(v),
        SerializedValue::Bool(v) => Value::Bool(v),
        SerializedValue::Str(v) => Value::String(v),
    }
}

fn serialize_value_type(ty: ValueType) -> SerializedValueType {
    match ty {
        ValueType::Int => SerializedValueType::Int,
        ValueType::Float => SerializedValueType::Float,
        ValueType::String => SerializedValueType::Str,
    }
}

fn deserialize_value_type(ty: SerializedValueType) -> ValueType {
    match ty {
        SerializedValueType::Int => ValueType::Int,
        SerializedValueType::Float => ValueType::Float,
        SerializedValueType::Str => ValueType::String,
    }
}

fn serialize_invocation(invocation: &RuleInvocation) -> SerializedInvocation {
    SerializedInvocation {
        slug: invocation.slug.clone(),
        arguments: invocation.arguments.iter().map(serialize_value).collect(),
    }
}

fn deserialize_invocation(invocation: SerializedInvocation) -> RuleInvocation {
    RuleInvocation::new(
        invocation.slug,
        invocation
            .arguments
            .into_iter()
            .map(deserialize_value)
            .collect(),
    )
}

fn serialize_pairs(map: &BTreeMap<String, Value>) -> Vec<(String, SerializedValue)> {
    map.iter()
        .map(|(k, v)| (k.clone(), serialize_value(v)))
        .collect()
}

fn deserialize_pairs(pairs: Vec<(String, SerializedValue)>) -> BTreeMap<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k, deserialize_value(v)))
        .collect()
}

// ---------------------------------------------------------------------------
// Syntax tree conversion
// ---------------------------------------------------------------------------

fn serialize_node(node: &SyntaxNode) -> SerializedNode {
    match node {
        SyntaxNode::Root(children) => {
            SerializedNode::Root(children.iter().map(serialize_node).collect())
        }
        SyntaxNode::Literal(text) => SerializedNode::Literal(text.clone()),
        SyntaxNode::Variable {
            name,
            rules,
            default,
        } => SerializedNode::Variable {
            name: name.clone(),
            rules: rules.iter().map(serialize_invocation).collect(),
            default: default.clone(),
        },
        SyntaxNode::Optional(children) => {
            SerializedNode::Optional(children.iter().map(serialize_node).collect())
        }
    }
}

fn deserialize_node(node: SerializedNode) -> SyntaxNode {
    match node {
        SerializedNode::Root(children) => {
            SyntaxNode::Root(children.into_iter().map(deserialize_node).collect())
        }
        SerializedNode::Literal(text) => SyntaxNode::Literal(text),
        SerializedNode::Variable {
            name,
            rules,
            default,
        } => SyntaxNode::Variable {
            name,
            rules: rules.into_iter().map(deserialize_invocation).collect(),
            default,
        },
        SerializedNode::Optional(children) => {
            SyntaxNode::Optional(children.into_iter().map(deserialize_node).collect())
        }
    }
}

// ---------------------------------------------------------------------------
// RouteCollection -> SerializedCollection
// ---------------------------------------------------------------------------

fn collection_to_serialized(
    collection: &RouteCollection,
    version: Option<&str>,
) -> SerializedCollection {
    let version_digest = version.map(|v| *blake3::hash(v.as_bytes()).as_bytes());
    let routes = collection.routes().iter().map(route_to_serialized).collect();
    SerializedCollection {
        metadata: CollectionMetadata {
            route_count: collection.len(),
            version_digest,
        },
        routes,
    }
}

fn route_to_serialized(route: &Route) -> SerializedRoute {
    let template = &route.template;
    let compiled = &template.compiled;
    SerializedRoute {
        methods: route.methods.clone(),
        path: template.path.clone(),
        host: template.host.clone(),
        path_tree: serialize_node(&template.path_tree),
        host_tree: template.host_tree.as_ref().map(serialize_node),
        template: SerializedTemplate {
            pattern: compiled.pattern().to_owned(),
            is_host_template: compiled.is_host_template,
            variables: compiled
                .variables
                .iter()
                .map(|v| SerializedVariable {
                    name: v.name.clone(),
                    invocations: v.invocations.iter().map(serialize_invocation).collect(),
                    default: v.default.clone(),
                    optional: v.optional,
                    value_type: serialize_value_type(v.value_type),
                })
                .collect(),
        },
        action: match &route.action {
            RouteAction::Method { controller, method } => SerializedAction::Method {
                controller: controller.clone(),
                method: method.clone(),
            },
            RouteAction::Handler(name) => SerializedAction::Handler(name.clone()),
        },
        middleware: route
            .middleware
            .iter()
            .map(|m| SerializedMiddleware {
                name: m.name.clone(),
                parameters: serialize_pairs(&m.parameters),
            })
            .collect(),
        name: route.name.clone(),
        attributes: serialize_pairs(&route.attributes),
        headers_to_match: route
            .headers_to_match
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// SerializedCollection -> RouteCollection
// ---------------------------------------------------------------------------

fn serialized_to_collection(
    ser: SerializedCollection,
    registry: &RuleRegistry,
) -> Result<RouteCollection, DeserializeError> {
    validate(&ser)?;
    let routes = ser
        .routes
        .into_iter()
        .map(|route| serialized_to_route(route, registry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RouteCollection::from_routes(routes)?)
}

fn serialized_to_route(
    ser: SerializedRoute,
    registry: &RuleRegistry,
) -> Result<Route, DeserializeError> {
    let pattern = Regex::new(&ser.template.pattern)?;
    let variables = ser
        .template
        .variables
        .into_iter()
        .map(|v| -> Result<CompiledVariable, DeserializeError> {
            let invocations: Vec<RuleInvocation> =
                v.invocations.into_iter().map(deserialize_invocation).collect();
            let rules = invocations
                .iter()
                .map(|inv| registry.get(&inv.slug, &inv.arguments))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CompiledVariable {
                name: v.name,
                invocations,
                rules,
                default: v.default,
                optional: v.optional,
                value_type: deserialize_value_type(v.value_type),
            })
        })
        .collect::<Result<Vec<_>, DeserializeError>>()?;

    let template = UriTemplate {
        path: ser.path,
        host: ser.host,
        path_tree: deserialize_node(ser.path_tree),
        host_tree: ser.host_tree.map(deserialize_node),
        compiled: CompiledTemplate {
            pattern,
            variables,
            is_host_template: ser.template.is_host_template,
        },
    };

    let action = match ser.action {
        SerializedAction::Method { controller, method } => {
            RouteAction::Method { controller, method }
        }
        SerializedAction::Handler(name) => RouteAction::Handler(name),
    };

    Ok(Route {
        methods: ser.methods,
        template,
        action,
        middleware: ser
            .middleware
            .into_iter()
            .map(|m| MiddlewareBinding {
                name: m.name,
                parameters: deserialize_pairs(m.parameters),
            })
            .collect(),
        name: ser.name,
        attributes: deserialize_pairs(ser.attributes),
        headers_to_match: ser.headers_to_match.into_iter().collect(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedCollection) -> Result<(), DeserializeError> {
    if ser.metadata.route_count != ser.routes.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} routes but payload has {}",
            ser.metadata.route_count,
            ser.routes.len()
        )));
    }
    for (index, route) in ser.routes.iter().enumerate() {
        validate_route(index, route)?;
    }
    Ok(())
}

fn validate_route(index: usize, route: &SerializedRoute) -> Result<(), DeserializeError> {
    if route.template.is_host_template != route.host_tree.is_some() {
        return Err(DeserializeError::Validation(format!(
            "route {index}: host flag disagrees with host tree"
        )));
    }
    if route.host.is_some() != route.host_tree.is_some() {
        return Err(DeserializeError::Validation(format!(
            "route {index}: host template disagrees with host tree"
        )));
    }

    let mut tree_names = Vec::new();
    if let Some(host) = &route.host_tree {
        collect_variable_names(host, &mut tree_names)?;
    }
    collect_variable_names(&route.path_tree, &mut tree_names)?;

    let declared: Vec<&str> = route
        .template
        .variables
        .iter()
        .map(|v| v.name.as_str())
        .collect();
    if tree_names != declared {
        return Err(DeserializeError::Validation(format!(
            "route {index}: template variables {declared:?} do not match syntax tree {tree_names:?}"
        )));
    }

    let mut seen = HashSet::new();
    for name in &declared {
        if !seen.insert(*name) {
            return Err(DeserializeError::Validation(format!(
                "route {index}: duplicate variable '{name}'"
            )));
        }
    }
    Ok(())
}

fn collect_variable_names<'a>(
    node: &'a SerializedNode,
    out: &mut Vec<&'a str>,
) -> Result<(), DeserializeError> {
    match node {
        SerializedNode::Root(children) => {
            for child in children {
                collect_variable_names(child, out)?;
            }
        }
        SerializedNode::Optional(children) => {
            if children.is_empty() {
                return Err(DeserializeError::Validation(
                    "empty optional segment".to_owned(),
                ));
            }
            for child in children {
                collect_variable_names(child, out)?;
            }
        }
        SerializedNode::Variable { name, .. } => out.push(name),
        SerializedNode::Literal(_) => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(
    collection: &RouteCollection,
    version: Option<&str>,
) -> Result<Vec<u8>, SerializeError> {
    let serialized = collection_to_serialized(collection, version);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(
    bytes: &[u8],
    registry: &RuleRegistry,
    expected_version: Option<&str>,
) -> Result<RouteCollection, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_end = HEADER_SIZE + payload_len as usize;
    // Padded or concatenated blobs are rejected as well as truncated ones.
    if bytes.len() != payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[HEADER_SIZE..payload_end];

    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, consumed): (SerializedCollection, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    if consumed != payload.len() {
        return Err(DeserializeError::Validation(format!(
            "payload has {} trailing bytes",
            payload.len() - consumed
        )));
    }

    if let Some(expected) = expected_version {
        let expected = *blake3::hash(expected.as_bytes()).as_bytes();
        if serialized.metadata.version_digest != Some(expected) {
            return Err(DeserializeError::StaleVersion);
        }
    }

    serialized_to_collection(serialized, registry)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouteCollectionBuilder;

    fn sample() -> RouteCollection {
        RouteCollectionBuilder::new()
            .route(&["GET"], "users/:id(int)", |r| r.to_handler("show").named("GetUser"))
            .build()
            .unwrap()
    }

    #[test]
    fn value_type_round_trip() {
        for ty in [ValueType::Int, ValueType::Float, ValueType::String] {
            assert_eq!(deserialize_value_type(serialize_value_type(ty)), ty);
        }
    }

    #[test]
    fn node_round_trip() {
        let tree = crate::parse::parse_str("a/:x(int,in(1,\"two\"))[/:y=3[/z]]").unwrap();
        assert_eq!(deserialize_node(serialize_node(&tree)), tree);
    }

    #[test]
    fn header_round_trip() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload);
        assert_eq!(buf.len(), HEADER_SIZE);

        let (format_version, payload_len, hash) = read_header(&buf).unwrap();
        assert_eq!(format_version, FORMAT_VERSION);
        assert_eq!(payload_len as usize, payload.len());
        assert_eq!(&hash, &blake3::hash(payload).as_bytes()[..16]);
    }

    #[test]
    fn header_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"BAAD");
        assert!(matches!(read_header(&buf), Err(DeserializeError::BadMagic)));
    }

    #[test]
    fn header_too_short() {
        assert!(matches!(
            read_header(&[0u8; 10]),
            Err(DeserializeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn validate_route_count() {
        let mut ser = collection_to_serialized(&sample(), None);
        ser.metadata.route_count = 5;
        assert!(matches!(validate(&ser), Err(DeserializeError::Validation(_))));
    }

    #[test]
    fn validate_variables_against_tree() {
        let mut ser = collection_to_serialized(&sample(), None);
        ser.routes[0].template.variables[0].name = "other".to_owned();
        assert!(matches!(validate(&ser), Err(DeserializeError::Validation(_))));
    }

    #[test]
    fn validate_host_flag() {
        let mut ser = collection_to_serialized(&sample(), None);
        ser.routes[0].template.is_host_template = true;
        assert!(matches!(validate(&ser), Err(DeserializeError::Validation(_))));
    }

    #[test]
    fn validate_empty_optional() {
        let mut ser = collection_to_serialized(&sample(), None);
        ser.routes[0].path_tree = SerializedNode::Root(vec![SerializedNode::Optional(vec![])]);
        ser.routes[0].template.variables.clear();
        assert!(matches!(validate(&ser), Err(DeserializeError::Validation(_))));
    }

    #[test]
    fn unknown_rule_on_rebuild() {
        let bytes = encode(&sample(), None).unwrap();
        assert!(decode(&bytes, &RuleRegistry::new(), None).is_ok());

        let mut ser = collection_to_serialized(&sample(), None);
        ser.routes[0].template.variables[0].invocations[0].slug = "even".to_owned();
        assert!(matches!(
            serialized_to_collection(ser, &RuleRegistry::new()),
            Err(DeserializeError::Rebuild(CompileError::UnknownRule { .. }))
        ));
    }
}
