//! Logic definition graphs
//!
//! A definition is a directed tree of vertices. Vertex 0 is the root; every
//! other vertex has exactly one parent. Each vertex carries a meaning
//! (definition root, necessary set, and, concept reference, role...) and an
//! optional referenced concept.

use serde::{Deserialize, Serialize};
use termstore_core::{Error, Nid, Result};

/// One vertex of a definition tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVertex {
    /// What the vertex means
    pub meaning: Nid,
    /// Concept the vertex refers to (concept reference, role type)
    pub concept: Option<Nid>,
    /// Child vertex indices, in order
    pub children: Vec<u32>,
}

impl LogicVertex {
    /// Leaf vertex
    pub fn leaf(meaning: Nid, concept: Option<Nid>) -> Self {
        LogicVertex {
            meaning,
            concept,
            children: Vec::new(),
        }
    }

    /// Inner vertex
    pub fn with_children(meaning: Nid, concept: Option<Nid>, children: Vec<u32>) -> Self {
        LogicVertex {
            meaning,
            concept,
            children,
        }
    }
}

/// Directed tree of logic vertices, rooted at index 0
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicGraph {
    vertices: Vec<LogicVertex>,
}

impl LogicGraph {
    /// Build a graph, checking the tree shape
    ///
    /// # Errors
    ///
    /// `Corruption` if the graph is empty, a child index is out of range,
    /// the root is used as a child, a vertex has more or fewer than one
    /// parent, or a vertex cannot be reached from the root.
    pub fn new(vertices: Vec<LogicVertex>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(Error::Corruption("logic graph has no root".to_string()));
        }
        let mut parents = vec![0u32; vertices.len()];
        for vertex in &vertices {
            for &child in &vertex.children {
                let idx = child as usize;
                if idx == 0 || idx >= vertices.len() {
                    return Err(Error::Corruption(format!(
                        "logic graph child index {} out of range",
                        child
                    )));
                }
                parents[idx] += 1;
            }
        }
        if let Some(orphan) = parents.iter().skip(1).position(|&p| p != 1) {
            return Err(Error::Corruption(format!(
                "logic graph vertex {} has {} parents",
                orphan + 1,
                parents[orphan + 1]
            )));
        }
        // one parent each still allows a detached cycle
        let mut reached = vec![false; vertices.len()];
        let mut pending = vec![0usize];
        reached[0] = true;
        while let Some(idx) = pending.pop() {
            for &child in &vertices[idx].children {
                let child = child as usize;
                if !reached[child] {
                    reached[child] = true;
                    pending.push(child);
                }
            }
        }
        if let Some(detached) = reached.iter().position(|&r| !r) {
            return Err(Error::Corruption(format!(
                "logic graph vertex {} is not reachable from the root",
                detached
            )));
        }
        Ok(LogicGraph { vertices })
    }

    /// All vertices; index 0 is the root
    pub fn vertices(&self) -> &[LogicVertex] {
        &self.vertices
    }

    /// The root vertex
    pub fn root(&self) -> &LogicVertex {
        &self.vertices[0]
    }

    /// Vertex by index
    pub fn vertex(&self, index: u32) -> Option<&LogicVertex> {
        self.vertices.get(index as usize)
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Never true for a constructed graph
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Concepts referenced anywhere in the graph, in vertex order
    pub fn referenced_concepts(&self) -> Vec<Nid> {
        self.vertices.iter().filter_map(|v| v.concept).collect()
    }
}
