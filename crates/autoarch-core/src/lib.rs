pub mod canvas;
pub mod error;
pub mod graph;
pub mod inspector;
pub mod palette;
pub mod settings;

pub use canvas::{Canvas, DragPayload, Selected, Selection, Viewport};
pub use error::{CoreError, Result};
pub use graph::{Connection, Graph, NewNode, Removed};
pub use inspector::{FieldEdit, Inspector, InspectorView};

use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// --- Types (matching the editor's ReactFlow document shape) ---

/// Node `type` that marks a resizable grouping region.
pub const GROUP_TYPE: &str = "group";

/// Render type given to every edge created on the canvas.
pub const DEFAULT_EDGE_TYPE: &str = "custom";

pub const DEFAULT_GROUP_SIZE: Size = Size {
    width: 300.0,
    height: 200.0,
};

/// Smallest width or height a group can be resized to.
pub const MIN_GROUP_DIMENSION: f64 = 100.0;

/// Groups sit beneath every other node.
pub const GROUP_Z_INDEX: i32 = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Which renderer a node uses. Anything that is not `group` renders as a
/// regular component card, so unknown kinds from generated documents read as
/// `Custom`.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Custom,
    Group,
}

impl NodeKind {
    pub fn from_type_name(name: &str) -> Self {
        if name == GROUP_TYPE {
            NodeKind::Group
        } else {
            NodeKind::Custom
        }
    }

    pub fn is_group(self) -> bool {
        self == NodeKind::Group
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(NodeKind::from_type_name(&raw))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Unset means the kind's default stacking order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl NodeStyle {
    pub fn group() -> Self {
        Self {
            width: Some(DEFAULT_GROUP_SIZE.width),
            height: Some(DEFAULT_GROUP_SIZE.height),
            z_index: Some(GROUP_Z_INDEX),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    /// Semantic category, free text (e.g. "Database", "Microservice").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Embedded image reference; wins over `icon` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_icon: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "port_from_string_or_number"
    )]
    #[schemars(with = "Option<String>")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    /// Keys this engine does not interpret, kept so documents round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn port_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("invalid port value: {other}"))),
    }
}

/// What a node card shows as its glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visual<'a> {
    CustomImage(&'a str),
    Icon(&'a str),
    Placeholder,
}

impl NodeData {
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// True when the semantic type mentions "database" in any casing.
    pub fn is_database(&self) -> bool {
        self.node_type
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains("database"))
    }

    pub fn visual(&self) -> Visual<'_> {
        if let Some(image) = self.custom_icon.as_deref().filter(|s| !s.is_empty()) {
            return Visual::CustomImage(image);
        }
        match self.icon.as_deref().filter(|s| !s.is_empty()) {
            Some(icon) => Visual::Icon(icon),
            None => Visual::Placeholder,
        }
    }

    /// Returns a new record with the patched keys replaced and everything else kept.
    pub fn merged(&self, patch: &NodePatch) -> NodeData {
        let mut next = self.clone();
        if let Some(label) = &patch.label {
            next.label = label.clone();
        }
        if let Some(node_type) = &patch.node_type {
            next.node_type = Some(node_type.clone());
        }
        if let Some(color) = &patch.color {
            next.color = Some(color.clone());
        }
        if let Some(icon) = &patch.icon {
            next.icon = Some(icon.clone());
        }
        if let Some(custom_icon) = &patch.custom_icon {
            next.custom_icon = custom_icon.clone();
        }
        if let Some(port) = &patch.port {
            next.port = Some(port.clone());
        }
        if let Some(db_name) = &patch.db_name {
            next.db_name = Some(db_name.clone());
        }
        next
    }
}

/// A partial update to [`NodeData`]. `None` leaves a key untouched.
/// `custom_icon: Some(None)` clears the uploaded image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub label: Option<String>,
    pub node_type: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub custom_icon: Option<Option<String>>,
    pub port: Option<String>,
    pub db_name: Option<String>,
}

impl NodePatch {
    pub fn label(value: impl Into<String>) -> Self {
        Self {
            label: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A node placed on the canvas. Matches ReactFlow's Node structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
}

impl Node {
    pub fn is_group(&self) -> bool {
        self.kind.is_group()
    }

    /// Explicit size, if the node carries one. Groups without a stored size
    /// fall back to the default group size.
    pub fn size(&self) -> Option<Size> {
        let stored = self
            .style
            .and_then(|s| Some(Size::new(s.width?, s.height?)));
        match stored {
            Some(size) => Some(size),
            None if self.is_group() => Some(DEFAULT_GROUP_SIZE),
            None => None,
        }
    }

    pub fn z_index(&self) -> i32 {
        match self.style.and_then(|s| s.z_index) {
            Some(z) => z,
            None if self.is_group() => GROUP_Z_INDEX,
            None => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
pub enum TlsVersion {
    #[default]
    Auto,
    #[serde(rename = "TLS 1.2")]
    Tls12,
    #[serde(rename = "TLS 1.3")]
    Tls13,
}

impl TlsVersion {
    pub const ALL: [TlsVersion; 3] = [TlsVersion::Auto, TlsVersion::Tls12, TlsVersion::Tls13];

    pub fn as_str(self) -> &'static str {
        match self {
            TlsVersion::Auto => "Auto",
            TlsVersion::Tls12 => "TLS 1.2",
            TlsVersion::Tls13 => "TLS 1.3",
        }
    }

    /// Reads a version name, ignoring case and spacing ("tls1.2", "TLS 1.2").
    pub fn from_name(name: &str) -> Option<TlsVersion> {
        let compact: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "auto" => Some(TlsVersion::Auto),
            "tls1.2" | "tlsv1.2" | "1.2" => Some(TlsVersion::Tls12),
            "tls1.3" | "tlsv1.3" | "1.3" => Some(TlsVersion::Tls13),
            _ => None,
        }
    }
}

/// Unrecognized versions read as unset, so the edge falls back to `Auto`
/// instead of failing the whole document.
fn lenient_tls_version<'de, D>(deserializer: D) -> std::result::Result<Option<TlsVersion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };
    let version = TlsVersion::from_name(&raw);
    if version.is_none() {
        tracing::warn!(value = %raw, "unknown tlsVersion, treating as Auto");
    }
    Ok(version)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tls: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_tls_version"
    )]
    #[schemars(with = "Option<TlsVersion>")]
    pub tls_version: Option<TlsVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EdgeData {
    pub fn is_empty(&self) -> bool {
        !self.tls
            && self.tls_version.is_none()
            && self.tls_cert.is_none()
            && self.tls_key.is_none()
            && self.extra.is_empty()
    }

    /// The version in force: the stored one, or `Auto` when none was chosen.
    pub fn effective_tls_version(&self) -> TlsVersion {
        self.tls_version.unwrap_or_default()
    }

    pub fn certificates_configured(&self) -> bool {
        self.tls_cert.as_deref().is_some_and(|s| !s.is_empty())
            || self.tls_key.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn merged(&self, patch: &EdgePatch) -> EdgeData {
        let mut next = self.clone();
        if let Some(tls) = patch.tls {
            next.tls = tls;
        }
        if let Some(version) = patch.tls_version {
            next.tls_version = Some(version);
        }
        if let Some(cert) = &patch.tls_cert {
            next.tls_cert = Some(cert.clone());
        }
        if let Some(key) = &patch.tls_key {
            next.tls_key = Some(key.clone());
        }
        next
    }
}

/// A partial update to [`EdgeData`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgePatch {
    pub tls: Option<bool>,
    pub tls_version: Option<TlsVersion>,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
}

impl EdgePatch {
    pub fn tls(enabled: bool) -> Self {
        Self {
            tls: Some(enabled),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A directed connection. Matches ReactFlow's Edge structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type", default = "default_edge_type")]
    pub edge_type: String,
    #[serde(default, skip_serializing_if = "EdgeData::is_empty")]
    pub data: EdgeData,
}

fn default_edge_type() -> String {
    DEFAULT_EDGE_TYPE.to_string()
}

impl Edge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The serializable graph: everything the code generator needs and nothing
/// the editor keeps for itself (selection, viewport).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Diagram {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Diagram {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn from_json(raw: &str) -> Result<Diagram> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The project flavour chosen before entering the editor. Drives which
/// templates are offered and is forwarded to the AI generator as a hint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Mobile,
    #[default]
    Web,
}

impl ProjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Mobile => "mobile",
            ProjectType::Web => "web",
        }
    }
}

/// JSON Schema of the diagram document exchanged with remote services.
pub fn diagram_schema() -> Result<Value> {
    Ok(serde_json::to_value(schemars::schema_for!(Diagram))?)
}
