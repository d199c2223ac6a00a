//! Model kinds and the uniform model view
//!
//! Renderers and tools branch on [`ModelKind`] and its [`Capabilities`]
//! rather than on the concrete record type.

use serde::Serialize;

use crate::formats::mesh::{Mesh, TerrainFragment, VertexLayout};
use crate::formats::rig::Rig;

/// Which kind of model a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Rig,
    Static,
    Skybox,
    Terrain,
}

/// What a model kind's vertices carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub vertex_stride: usize,
    pub has_normals: bool,
    pub has_vertex_color: bool,
    pub has_skin: bool,
}

impl ModelKind {
    pub const ALL: [Self; 4] = [Self::Rig, Self::Static, Self::Skybox, Self::Terrain];

    pub const fn layout(self) -> VertexLayout {
        match self {
            Self::Rig => VertexLayout::Skinned,
            Self::Static => VertexLayout::SplitStatic,
            Self::Skybox => VertexLayout::Skybox,
            Self::Terrain => VertexLayout::Terrain,
        }
    }

    pub const fn capabilities(self) -> Capabilities {
        let layout = self.layout();
        Capabilities {
            vertex_stride: layout.stride(),
            has_normals: layout.has_normals(),
            has_vertex_color: layout.has_vertex_color(),
            has_skin: layout.has_skin(),
        }
    }
}

/// A static or skybox model: a mesh with an id.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticModel {
    pub id: u16,
    pub mesh: Mesh,
}

/// Any decoded model.
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Rig(Rig),
    Static(StaticModel),
    Skybox(StaticModel),
    Terrain(TerrainFragment),
}

impl Model {
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Rig(_) => ModelKind::Rig,
            Self::Static(_) => ModelKind::Static,
            Self::Skybox(_) => ModelKind::Skybox,
            Self::Terrain(_) => ModelKind::Terrain,
        }
    }

    pub fn id(&self) -> u16 {
        match self {
            Self::Rig(rig) => rig.id,
            Self::Static(model) | Self::Skybox(model) => model.id,
            Self::Terrain(fragment) => fragment.id,
        }
    }

    /// The model's geometry; `None` for a rig without a mesh.
    pub fn mesh(&self) -> Option<&Mesh> {
        match self {
            Self::Rig(rig) => rig.mesh.as_ref().map(|m| &m.mesh),
            Self::Static(model) | Self::Skybox(model) => Some(&model.mesh),
            Self::Terrain(fragment) => Some(&fragment.mesh),
        }
    }

    pub fn scale(&self) -> f32 {
        match self {
            Self::Rig(rig) => rig.scale,
            other => other.mesh().map_or(1.0, |m| m.scale),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind().capabilities()
    }

    /// The rig, for callers that need bones or animations.
    pub fn as_rig(&self) -> Option<&Rig> {
        match self {
            Self::Rig(rig) => Some(rig),
            _ => None,
        }
    }
}

impl From<Rig> for Model {
    fn from(rig: Rig) -> Self {
        Self::Rig(rig)
    }
}

impl From<TerrainFragment> for Model {
    fn from(fragment: TerrainFragment) -> Self {
        Self::Terrain(fragment)
    }
}
