//! Properties inspector contract.
//!
//! The inspector never keeps its own copy of node or edge data. [`Inspector::view`]
//! reads the selected element straight from the canvas, and every edit is a
//! single-key patch written through to the graph at once. The only state held
//! here is local UI state: the certificate mode toggle and transient
//! certificate uploads, which are dropped when the selection changes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::canvas::{Canvas, Selected, Selection};
use crate::graph::Removed;
use crate::palette::DEFAULT_COLOR;
use crate::{EdgePatch, Node, NodeKind, NodePatch, TlsVersion};

/// Placeholder references written by the "generate" certificate action.
pub const GENERATED_CERT: &str = "generated-cert.crt";
pub const GENERATED_KEY: &str = "generated-key.key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeField {
    Label,
    Type,
    Color,
    Icon,
    CustomIcon,
    Port,
    DbName,
}

/// Fields editable on `node`, in display order.
pub fn node_fields(node: &Node) -> Vec<NodeField> {
    if node.is_group() {
        return vec![NodeField::Label, NodeField::Color];
    }
    let mut fields = vec![
        NodeField::Label,
        NodeField::Type,
        NodeField::Color,
        NodeField::Icon,
        NodeField::CustomIcon,
        NodeField::Port,
    ];
    if node.data.is_database() {
        fields.push(NodeField::DbName);
    }
    fields
}

/// One field change coming from the inspector form.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Label(String),
    Type(String),
    Color(String),
    Icon(String),
    /// `None` removes the uploaded image.
    CustomIcon(Option<String>),
    Port(String),
    DbName(String),
    Tls(bool),
    TlsVersion(TlsVersion),
}

impl FieldEdit {
    fn node_field(&self) -> Option<NodeField> {
        Some(match self {
            FieldEdit::Label(_) => NodeField::Label,
            FieldEdit::Type(_) => NodeField::Type,
            FieldEdit::Color(_) => NodeField::Color,
            FieldEdit::Icon(_) => NodeField::Icon,
            FieldEdit::CustomIcon(_) => NodeField::CustomIcon,
            FieldEdit::Port(_) => NodeField::Port,
            FieldEdit::DbName(_) => NodeField::DbName,
            FieldEdit::Tls(_) | FieldEdit::TlsVersion(_) => return None,
        })
    }

    fn into_node_patch(self) -> Option<NodePatch> {
        let mut patch = NodePatch::default();
        match self {
            FieldEdit::Label(v) => patch.label = Some(v),
            FieldEdit::Type(v) => patch.node_type = Some(v),
            FieldEdit::Color(v) => patch.color = Some(v),
            FieldEdit::Icon(v) => patch.icon = Some(v),
            FieldEdit::CustomIcon(v) => patch.custom_icon = Some(v),
            FieldEdit::Port(v) => patch.port = Some(v),
            FieldEdit::DbName(v) => patch.db_name = Some(v),
            FieldEdit::Tls(_) | FieldEdit::TlsVersion(_) => return None,
        }
        Some(patch)
    }

    fn into_edge_patch(self) -> Option<EdgePatch> {
        let mut patch = EdgePatch::default();
        match self {
            FieldEdit::Tls(v) => patch.tls = Some(v),
            FieldEdit::TlsVersion(v) => patch.tls_version = Some(v),
            _ => return None,
        }
        Some(patch)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CertMode {
    #[default]
    Upload,
    Generate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertSlot {
    ServerCertificate,
    PrivateKey,
    CaCertificate,
}

/// A certificate file picked in upload mode. Held only while the same edge
/// stays selected; never parsed and never written into the edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct CertificateUploads {
    server_cert: Option<UploadedFile>,
    private_key: Option<UploadedFile>,
    ca_cert: Option<UploadedFile>,
}

impl CertificateUploads {
    fn slot(&self, slot: CertSlot) -> Option<&UploadedFile> {
        match slot {
            CertSlot::ServerCertificate => self.server_cert.as_ref(),
            CertSlot::PrivateKey => self.private_key.as_ref(),
            CertSlot::CaCertificate => self.ca_cert.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: CertSlot) -> &mut Option<UploadedFile> {
        match slot {
            CertSlot::ServerCertificate => &mut self.server_cert,
            CertSlot::PrivateKey => &mut self.private_key,
            CertSlot::CaCertificate => &mut self.ca_cert,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeForm {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub node_type: String,
    pub color: String,
    pub icon: String,
    pub custom_icon: Option<String>,
    pub port: String,
    pub db_name: String,
    pub fields: Vec<NodeField>,
}

impl NodeForm {
    pub fn shows(&self, field: NodeField) -> bool {
        self.fields.contains(&field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeForm {
    pub id: String,
    pub source: String,
    pub target: String,
    pub tls: bool,
    /// Only present while TLS is on; `Auto` when the edge stores no version.
    pub tls_version: Option<TlsVersion>,
    pub cert_mode: CertMode,
    pub certificates_configured: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InspectorView {
    Empty,
    Node(NodeForm),
    Edge(EdgeForm),
}

#[derive(Debug, Clone, Default)]
pub struct Inspector {
    /// Canvas selection epoch the transient state belongs to.
    bound_epoch: u64,
    cert_mode: CertMode,
    uploads: CertificateUploads,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-binds to the canvas selection, dropping transient uploads if the
    /// selection changed at all since the last bind, even if it came back to
    /// the same element.
    pub fn sync(&mut self, canvas: &Canvas) {
        if self.bound_epoch != canvas.selection_epoch() {
            self.bound_epoch = canvas.selection_epoch();
            self.uploads = CertificateUploads::default();
        }
    }

    pub fn view(&self, canvas: &Canvas) -> InspectorView {
        match canvas.selected() {
            None => InspectorView::Empty,
            Some(Selected::Node(node)) => {
                let d = &node.data;
                InspectorView::Node(NodeForm {
                    id: node.id.clone(),
                    kind: node.kind,
                    label: d.label.clone(),
                    node_type: d.node_type.clone().unwrap_or_default(),
                    color: d.color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string()),
                    icon: d.icon.clone().unwrap_or_default(),
                    custom_icon: d.custom_icon.clone(),
                    port: d.port.clone().unwrap_or_default(),
                    db_name: d.db_name.clone().unwrap_or_default(),
                    fields: node_fields(node),
                })
            }
            Some(Selected::Edge(edge)) => InspectorView::Edge(EdgeForm {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                tls: edge.data.tls,
                tls_version: edge.data.tls.then(|| edge.data.effective_tls_version()),
                cert_mode: self.cert_mode,
                certificates_configured: edge.data.certificates_configured(),
            }),
        }
    }

    /// Applies one field change to the selected element. Returns false when
    /// nothing is selected or the field does not apply to it.
    pub fn edit(&mut self, canvas: &mut Canvas, edit: FieldEdit) -> bool {
        self.sync(canvas);
        match canvas.selected() {
            None => false,
            Some(Selected::Node(node)) => {
                let id = node.id.clone();
                let applicable = edit
                    .node_field()
                    .is_some_and(|field| node_fields(node).contains(&field));
                if !applicable {
                    debug!(id = %id, ?edit, "field not editable on this node");
                    return false;
                }
                match edit.into_node_patch() {
                    Some(patch) => canvas.update_node_data(&id, &patch),
                    None => false,
                }
            }
            Some(Selected::Edge(edge)) => {
                let id = edge.id.clone();
                if matches!(edit, FieldEdit::TlsVersion(_)) && !edge.data.tls {
                    debug!(id = %id, "tls version needs tls enabled");
                    return false;
                }
                match edit.into_edge_patch() {
                    Some(patch) => canvas.update_edge_data(&id, &patch),
                    None => {
                        debug!(id = %id, "field not editable on an edge");
                        false
                    }
                }
            }
        }
    }

    /// Stores an uploaded image as the node's custom icon, embedded as a data URL.
    pub fn upload_custom_icon(&mut self, canvas: &mut Canvas, mime_type: &str, bytes: &[u8]) -> bool {
        let url = format!("data:{mime_type};base64,{}", STANDARD.encode(bytes));
        self.edit(canvas, FieldEdit::CustomIcon(Some(url)))
    }

    pub fn cert_mode(&self) -> CertMode {
        self.cert_mode
    }

    pub fn set_cert_mode(&mut self, mode: CertMode) {
        self.cert_mode = mode;
    }

    /// Accepts a certificate file for the selected TLS edge in upload mode.
    pub fn upload_certificate(
        &mut self,
        canvas: &Canvas,
        slot: CertSlot,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> bool {
        self.sync(canvas);
        if self.cert_mode != CertMode::Upload || !tls_edge_selected(canvas) {
            return false;
        }
        *self.uploads.slot_mut(slot) = Some(UploadedFile {
            file_name: file_name.into(),
            bytes,
        });
        true
    }

    pub fn uploaded(&self, slot: CertSlot) -> Option<&UploadedFile> {
        self.uploads.slot(slot)
    }

    /// Writes placeholder certificate and key references onto the selected
    /// TLS edge, one key per update.
    pub fn generate_certificate(&mut self, canvas: &mut Canvas) -> bool {
        self.sync(canvas);
        if self.cert_mode != CertMode::Generate || !tls_edge_selected(canvas) {
            return false;
        }
        let Selection::Edge(id) = canvas.selection().clone() else {
            return false;
        };
        let cert = EdgePatch {
            tls_cert: Some(GENERATED_CERT.to_string()),
            ..EdgePatch::default()
        };
        let key = EdgePatch {
            tls_key: Some(GENERATED_KEY.to_string()),
            ..EdgePatch::default()
        };
        canvas.update_edge_data(&id, &cert) && canvas.update_edge_data(&id, &key)
    }

    pub fn close(&mut self, canvas: &mut Canvas) {
        canvas.clear_selection();
        self.sync(canvas);
    }

    pub fn delete(&mut self, canvas: &mut Canvas) -> Option<Removed> {
        let removed = canvas.delete_selection();
        self.sync(canvas);
        removed
    }
}

fn tls_edge_selected(canvas: &Canvas) -> bool {
    matches!(canvas.selected(), Some(Selected::Edge(edge)) if edge.data.tls)
}
