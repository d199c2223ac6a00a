//! Collision output types

use serde::Serialize;

/// Fixed-point scale of leaf vertex coordinates.
pub const COLLISION_FIXED_ONE: f32 = 1024.0;
/// World size of one grid cell along any axis.
pub const COLLISION_CELL_SIZE: f32 = 4.0;

pub const LEAF_HEADER_SIZE: usize = 0x04;
pub const LEAF_VERTEX_SIZE: usize = 0x08;
pub const LEAF_TRIANGLE_SIZE: usize = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollisionVertex {
    pub position: [f32; 3],
    /// RGBA derived from the surface classification.
    pub color: [u8; 4],
}

/// Flattened collision triangle soup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollisionMesh {
    pub vertices: Vec<CollisionVertex>,
    /// Three indices per triangle into `vertices`.
    pub indices: Vec<u32>,
    /// One opaque surface class per triangle.
    pub classifications: Vec<u8>,
}

impl CollisionMesh {
    pub fn triangle_count(&self) -> usize {
        self.classifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifications.is_empty()
    }

    /// Triangle `i` as three vertex indices.
    pub fn triangle(&self, i: usize) -> Option<[u32; 3]> {
        let tri = self.indices.get(i * 3..i * 3 + 3)?;
        Some([tri[0], tri[1], tri[2]])
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollisionSummary {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub leaf_count: usize,
    /// Triangle count per classification byte, ascending.
    pub classes: Vec<(u8, usize)>,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

impl CollisionSummary {
    pub fn new(mesh: &CollisionMesh, leaf_count: usize) -> Self {
        let mut histogram = [0usize; 256];
        for &class in &mesh.classifications {
            histogram[usize::from(class)] += 1;
        }
        let classes = histogram
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(class, &n)| (class as u8, n))
            .collect();

        let mut bounds_min = [f32::INFINITY; 3];
        let mut bounds_max = [f32::NEG_INFINITY; 3];
        for v in &mesh.vertices {
            for axis in 0..3 {
                bounds_min[axis] = bounds_min[axis].min(v.position[axis]);
                bounds_max[axis] = bounds_max[axis].max(v.position[axis]);
            }
        }
        if mesh.vertices.is_empty() {
            bounds_min = [0.0; 3];
            bounds_max = [0.0; 3];
        }

        Self {
            vertex_count: mesh.vertices.len(),
            triangle_count: mesh.triangle_count(),
            leaf_count,
            classes,
            bounds_min,
            bounds_max,
        }
    }
}

const CLASS_PALETTE: [[u8; 3]; 16] = [
    [0xC0, 0xC0, 0xC0],
    [0x3C, 0xB4, 0x4B],
    [0x43, 0x63, 0xD8],
    [0xE6, 0x19, 0x4B],
    [0xFF, 0xE1, 0x19],
    [0xF5, 0x82, 0x31],
    [0x91, 0x1E, 0xB4],
    [0x46, 0xF0, 0xF0],
    [0xF0, 0x32, 0xE6],
    [0xBC, 0xF6, 0x0C],
    [0xFA, 0xBE, 0xBE],
    [0x00, 0x80, 0x80],
    [0x9A, 0x63, 0x24],
    [0x80, 0x00, 0x00],
    [0x00, 0x00, 0x75],
    [0x80, 0x80, 0x80],
];

/// Debug color for a surface classification byte.
///
/// The low nibble picks the hue; the high nibble darkens it so classes that
/// share a low nibble stay distinguishable.
pub fn classification_color(class: u8) -> [u8; 4] {
    let [r, g, b] = CLASS_PALETTE[usize::from(class & 0x0F)];
    let shade = 16 - u16::from(class >> 4) / 2;
    let scale = |c: u8| (u16::from(c) * shade / 16) as u8;
    [scale(r), scale(g), scale(b), 0xFF]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_color() {
        assert_eq!(classification_color(0), [0xC0, 0xC0, 0xC0, 0xFF]);
        assert_eq!(classification_color(3), [0xE6, 0x19, 0x4B, 0xFF]);
        assert_ne!(classification_color(0x03), classification_color(0x23));
        assert_eq!(classification_color(0xFF)[3], 0xFF);
    }
}
