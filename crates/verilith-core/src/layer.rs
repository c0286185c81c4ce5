use serde::{Deserialize, Serialize};

/// A drawn mask layer identified by its GDS (layer, datatype) pair.
///
/// Datatype is part of the key: the same layer number carries drawing,
/// dummy, label and blockage variants under different datatypes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LayerKey {
    pub layer: u16,
    pub datatype: u16,
}

impl LayerKey {
    pub const fn new(layer: u16, datatype: u16) -> Self {
        Self { layer, datatype }
    }
}

impl std::fmt::Display for LayerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.layer, self.datatype)
    }
}

/// Describes one technology layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDef {
    pub key: LayerKey,
    pub name: String,
    pub description: String,
}

impl LayerDef {
    pub fn new(name: &str, layer: u16, datatype: u16) -> Self {
        Self {
            key: LayerKey::new(layer, datatype),
            name: name.to_string(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }
}

/// The technology layer table of a design.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LayerTable {
    layers: Vec<LayerDef>,
}

impl LayerTable {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn add_layer(&mut self, layer: LayerDef) {
        self.layers.push(layer);
    }

    pub fn get(&self, key: LayerKey) -> Option<&LayerDef> {
        self.layers.iter().find(|l| l.key == key)
    }

    pub fn by_name(&self, name: &str) -> Option<&LayerDef> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn all_layers(&self) -> &[LayerDef] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}
