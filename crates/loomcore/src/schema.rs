use crate::NodeKind;
use serde::{Deserialize, Serialize};

/// Declared type of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Text,
    Image,
    Video,
    Any,
}

/// A named, typed input or output slot on a node
#[derive(Debug, Clone, Copy)]
pub struct PortSchema {
    pub id: &'static str,
    pub label: &'static str,
    pub port_type: PortType,
}

const fn port(id: &'static str, label: &'static str, port_type: PortType) -> PortSchema {
    PortSchema {
        id,
        label,
        port_type,
    }
}

const TEXT_OUTPUTS: &[PortSchema] = &[port("text", "Text", PortType::Text)];
const UPLOAD_IMAGE_OUTPUTS: &[PortSchema] = &[port("image_url", "Image", PortType::Image)];
const UPLOAD_VIDEO_OUTPUTS: &[PortSchema] = &[port("video_url", "Video", PortType::Video)];
const LLM_INPUTS: &[PortSchema] = &[
    port("system_prompt", "System Prompt", PortType::Text),
    port("user_message", "User Message", PortType::Text),
    port("images", "Images", PortType::Image),
];
const LLM_OUTPUTS: &[PortSchema] = &[port("output", "Response", PortType::Text)];
const CROP_INPUTS: &[PortSchema] = &[port("image_url", "Image", PortType::Image)];
const CROP_OUTPUTS: &[PortSchema] = &[port("output", "Cropped", PortType::Image)];
const FRAME_INPUTS: &[PortSchema] = &[port("video_url", "Video", PortType::Video)];
const FRAME_OUTPUTS: &[PortSchema] = &[port("output", "Image", PortType::Image)];
const OUTPUT_INPUTS: &[PortSchema] = &[port("input", "Any Output", PortType::Any)];

/// Declared input ports for a node type
pub fn input_ports(kind: &NodeKind) -> &'static [PortSchema] {
    match kind {
        NodeKind::Llm(_) => LLM_INPUTS,
        NodeKind::CropImage(_) => CROP_INPUTS,
        NodeKind::ExtractFrame(_) => FRAME_INPUTS,
        NodeKind::Output => OUTPUT_INPUTS,
        _ => &[],
    }
}

/// Declared output ports for a node type
pub fn output_ports(kind: &NodeKind) -> &'static [PortSchema] {
    match kind {
        NodeKind::Text(_) => TEXT_OUTPUTS,
        NodeKind::UploadImage(_) => UPLOAD_IMAGE_OUTPUTS,
        NodeKind::UploadVideo(_) => UPLOAD_VIDEO_OUTPUTS,
        NodeKind::Llm(_) => LLM_OUTPUTS,
        NodeKind::CropImage(_) => CROP_OUTPUTS,
        NodeKind::ExtractFrame(_) => FRAME_OUTPUTS,
        _ => &[],
    }
}

/// Fallback output type when an edge references the generic `output` handle
/// instead of a declared port id
pub fn infer_output_type(kind: &NodeKind) -> Option<PortType> {
    match kind {
        NodeKind::Text(_) => Some(PortType::Text),
        NodeKind::UploadImage(_) => Some(PortType::Image),
        NodeKind::UploadVideo(_) => Some(PortType::Video),
        NodeKind::Llm(_) => Some(PortType::Text),
        NodeKind::CropImage(_) => Some(PortType::Image),
        NodeKind::ExtractFrame(_) => Some(PortType::Image),
        _ => None,
    }
}
