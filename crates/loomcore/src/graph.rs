use crate::WorkflowError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type WorkflowId = Uuid;

/// Stable, editor-assigned node identifier
pub type NodeId = String;

/// One configured unit of work in a workflow graph.
///
/// Nodes travel on the wire in the editor's open `{id, type, data}` form;
/// parsing folds the open bag into the closed [`NodeKind`] union so the
/// engine gets exhaustive dispatch, with unrecognized types preserved
/// verbatim in [`NodeKind::Unknown`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "NodeDoc", into = "NodeDoc")]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Closed union of node behaviors, one variant per effector
#[derive(Debug, Clone)]
pub enum NodeKind {
    Text(TextConfig),
    UploadImage(UploadImageConfig),
    UploadVideo(UploadVideoConfig),
    Llm(LlmConfig),
    CropImage(CropImageConfig),
    ExtractFrame(ExtractFrameConfig),
    Output,
    Unknown { type_name: String, data: Value },
}

impl NodeKind {
    /// Canonical type discriminator, as written by the editor
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Text(_) => "textNode",
            NodeKind::UploadImage(_) => "uploadImage",
            NodeKind::UploadVideo(_) => "uploadVideo",
            NodeKind::Llm(_) => "runAnyLLM",
            NodeKind::CropImage(_) => "cropImage",
            NodeKind::ExtractFrame(_) => "extractFrame",
            NodeKind::Output => "outputNode",
            NodeKind::Unknown { type_name, .. } => type_name,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub text: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadImageConfig {
    pub image_url: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadVideoConfig {
    pub video_url: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropImageConfig {
    pub image_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<u32>,
    pub y: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractFrameConfig {
    pub video_url: Option<String>,
    pub timestamp: Option<f64>,
}

/// Wire form of a node: open, type-discriminated data bag
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeDoc {
    id: NodeId,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    data: Value,
}

impl TryFrom<NodeDoc> for Node {
    type Error = WorkflowError;

    fn try_from(doc: NodeDoc) -> Result<Self, Self::Error> {
        let parse_err = |e: serde_json::Error| WorkflowError::InvalidNode {
            id: doc.id.clone(),
            reason: e.to_string(),
        };

        let kind = match doc.node_type.as_str() {
            "text-node" | "textNode" => {
                NodeKind::Text(serde_json::from_value(doc.data).map_err(parse_err)?)
            }
            "uploadImage" => {
                NodeKind::UploadImage(serde_json::from_value(doc.data).map_err(parse_err)?)
            }
            "uploadVideo" => {
                NodeKind::UploadVideo(serde_json::from_value(doc.data).map_err(parse_err)?)
            }
            "llm-node" | "runAnyLLM" | "run-all-llm" => {
                NodeKind::Llm(serde_json::from_value(doc.data).map_err(parse_err)?)
            }
            "crop-image" | "cropImage" => {
                NodeKind::CropImage(serde_json::from_value(doc.data).map_err(parse_err)?)
            }
            "extract-frame" | "extractFrame" => {
                NodeKind::ExtractFrame(serde_json::from_value(doc.data).map_err(parse_err)?)
            }
            "output-node" | "outputNode" => NodeKind::Output,
            _ => NodeKind::Unknown {
                type_name: doc.node_type,
                data: doc.data,
            },
        };

        Ok(Node { id: doc.id, kind })
    }
}

impl From<Node> for NodeDoc {
    fn from(node: Node) -> Self {
        let node_type = node.kind.type_name().to_string();
        let data = match node.kind {
            NodeKind::Text(cfg) => serde_json::to_value(cfg).unwrap_or(Value::Null),
            NodeKind::UploadImage(cfg) => serde_json::to_value(cfg).unwrap_or(Value::Null),
            NodeKind::UploadVideo(cfg) => serde_json::to_value(cfg).unwrap_or(Value::Null),
            NodeKind::Llm(cfg) => serde_json::to_value(cfg).unwrap_or(Value::Null),
            NodeKind::CropImage(cfg) => serde_json::to_value(cfg).unwrap_or(Value::Null),
            NodeKind::ExtractFrame(cfg) => serde_json::to_value(cfg).unwrap_or(Value::Null),
            NodeKind::Output => Value::Object(Default::default()),
            NodeKind::Unknown { data, .. } => data,
        };

        NodeDoc {
            id: node.id,
            node_type,
            data,
        }
    }
}

/// Directed data-flow connection between two node ports.
///
/// Missing handles mean the single default port on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_handles(
        mut self,
        source_handle: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        self.source_handle = Some(source_handle.into());
        self.target_handle = Some(target_handle.into());
        self
    }
}

/// Complete workflow definition: the snapshot source for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default = "Uuid::new_v4")]
    pub id: WorkflowId,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
