//! Control flow graph of a module.
//!
//! The CFG is a directed multigraph. Its vertices are the UUIDs of the
//! module's blocks and proxy blocks (kept in sync by the module); edges carry
//! an optional label and an optional switch-case value. Parallel edges and
//! self-edges are allowed, and edges keep their insertion order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::core::node::Extension;
use crate::error::{IrError, Result};

/// Kind of control transfer an edge represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    Branch,
    Call,
    Fallthrough,
    Return,
    Syscall,
    Sysret,
}

impl EdgeType {
    pub fn to_wire(self) -> u32 {
        match self {
            EdgeType::Branch => 0,
            EdgeType::Call => 1,
            EdgeType::Fallthrough => 2,
            EdgeType::Return => 3,
            EdgeType::Syscall => 4,
            EdgeType::Sysret => 5,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(EdgeType::Branch),
            1 => Some(EdgeType::Call),
            2 => Some(EdgeType::Fallthrough),
            3 => Some(EdgeType::Return),
            4 => Some(EdgeType::Syscall),
            5 => Some(EdgeType::Sysret),
            _ => None,
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::Branch => write!(f, "branch"),
            EdgeType::Call => write!(f, "call"),
            EdgeType::Fallthrough => write!(f, "fallthrough"),
            EdgeType::Return => write!(f, "return"),
            EdgeType::Syscall => write!(f, "syscall"),
            EdgeType::Sysret => write!(f, "sysret"),
        }
    }
}

/// Edge label: transfer kind, conditionality and directness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub edge_type: EdgeType,
    pub conditional: bool,
    pub direct: bool,
}

impl EdgeLabel {
    pub fn new(edge_type: EdgeType, conditional: bool, direct: bool) -> Self {
        Self {
            edge_type,
            conditional,
            direct,
        }
    }

    /// Unconditional direct branch.
    pub fn branch() -> Self {
        Self::new(EdgeType::Branch, false, true)
    }

    pub fn fallthrough() -> Self {
        Self::new(EdgeType::Fallthrough, false, true)
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.edge_type,
            if self.conditional { " cond" } else { "" },
            if self.direct { "" } else { " indirect" }
        )
    }
}

/// A CFG edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: Uuid,
    pub target: Uuid,
    pub label: Option<EdgeLabel>,
    /// Case value selecting this edge out of a switch
    pub switch_value: Option<u64>,
    extensions: Vec<Extension>,
}

impl Edge {
    pub fn new(source: Uuid, target: Uuid, label: Option<EdgeLabel>) -> Self {
        Self {
            source,
            target,
            label,
            switch_value: None,
            extensions: Vec::new(),
        }
    }

    pub fn with_switch_value(mut self, value: u64) -> Self {
        self.switch_value = Some(value);
        self
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn set_extensions(&mut self, extensions: Vec<Extension>) {
        self.extensions = extensions;
    }
}

/// Control flow multigraph over block UUIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cfg {
    vertices: Vec<Uuid>,
    vertex_set: HashSet<Uuid>,
    edges: Vec<Edge>,
}

impl Cfg {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_vertex(&mut self, vertex: Uuid) {
        if self.vertex_set.insert(vertex) {
            self.vertices.push(vertex);
        }
    }

    /// Drop a vertex together with every edge touching it. Returns the number
    /// of edges removed.
    pub(crate) fn remove_vertex(&mut self, vertex: &Uuid) -> usize {
        if !self.vertex_set.remove(vertex) {
            return 0;
        }
        self.vertices.retain(|v| v != vertex);
        let before = self.edges.len();
        self.edges
            .retain(|e| e.source != *vertex && e.target != *vertex);
        before - self.edges.len()
    }

    pub fn contains_vertex(&self, vertex: &Uuid) -> bool {
        self.vertex_set.contains(vertex)
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> &[Uuid] {
        &self.vertices
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Add an edge between two existing vertices.
    pub fn add_edge(&mut self, source: Uuid, target: Uuid, label: Option<EdgeLabel>) -> Result<()> {
        self.push_edge(Edge::new(source, target, label))
    }

    /// Add a fully specified edge between two existing vertices.
    pub fn push_edge(&mut self, edge: Edge) -> Result<()> {
        for endpoint in [edge.source, edge.target] {
            if !self.vertex_set.contains(&endpoint) {
                return Err(IrError::UnknownVertex(endpoint));
            }
        }
        debug!(source = %edge.source, target = %edge.target, "added CFG edge");
        self.edges.push(edge);
        Ok(())
    }

    /// Remove the first edge equal to `edge`.
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        match self.edges.iter().position(|e| e == edge) {
            Some(index) => {
                self.edges.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn edges_from<'a>(&'a self, vertex: &'a Uuid) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == *vertex)
    }

    pub fn edges_to<'a>(&'a self, vertex: &'a Uuid) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == *vertex)
    }

    /// Distinct successor vertices, in first-edge order.
    pub fn successors(&self, vertex: &Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.edges_from(vertex)
            .map(|e| e.target)
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Distinct predecessor vertices, in first-edge order.
    pub fn predecessors(&self, vertex: &Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.edges_to(vertex)
            .map(|e| e.source)
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Vertices without incoming edges.
    pub fn entry_vertices(&self) -> Vec<Uuid> {
        let targets: HashSet<Uuid> = self.edges.iter().map(|e| e.target).collect();
        self.vertices
            .iter()
            .filter(|v| !targets.contains(v))
            .copied()
            .collect()
    }

    /// Vertices without outgoing edges.
    pub fn exit_vertices(&self) -> Vec<Uuid> {
        let sources: HashSet<Uuid> = self.edges.iter().map(|e| e.source).collect();
        self.vertices
            .iter()
            .filter(|v| !sources.contains(v))
            .copied()
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Cyclomatic complexity (E - N + 2), never below 1.
    pub fn cyclomatic_complexity(&self) -> u32 {
        if self.vertices.is_empty() {
            return 0;
        }
        let value = self.edges.len() as i64 - self.vertices.len() as i64 + 2;
        value.max(1) as u32
    }

    /// Check whether the graph contains a cycle (self-edges count).
    pub fn has_cycles(&self) -> bool {
        let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(edge.source).or_default().push(edge.target);
        }

        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        for root in &self.vertices {
            if visited.contains(root) {
                continue;
            }
            // Iterative DFS: (vertex, index of next successor to visit)
            let mut stack = vec![(*root, 0usize)];
            visited.insert(*root);
            on_stack.insert(*root);
            while let Some((vertex, next)) = stack.last_mut() {
                let vertex = *vertex;
                let successors = adjacency.get(&vertex).map(Vec::as_slice).unwrap_or(&[]);
                if let Some(successor) = successors.get(*next).copied() {
                    *next += 1;
                    if on_stack.contains(&successor) {
                        return true;
                    }
                    if visited.insert(successor) {
                        on_stack.insert(successor);
                        stack.push((successor, 0));
                    }
                } else {
                    on_stack.remove(&vertex);
                    stack.pop();
                }
            }
        }
        false
    }

    /// Summary statistics
    pub fn statistics(&self) -> CfgStats {
        let mut edge_type_counts = HashMap::new();
        let mut unlabeled_edges = 0;
        for edge in &self.edges {
            match edge.label {
                Some(label) => *edge_type_counts.entry(label.edge_type).or_insert(0) += 1,
                None => unlabeled_edges += 1,
            }
        }
        CfgStats {
            vertex_count: self.vertex_count(),
            edge_count: self.edge_count(),
            entry_vertices: self.entry_vertices().len(),
            exit_vertices: self.exit_vertices().len(),
            cyclomatic_complexity: self.cyclomatic_complexity(),
            has_cycles: self.has_cycles(),
            edge_type_counts,
            unlabeled_edges,
        }
    }
}

/// Statistics about a control flow graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgStats {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub entry_vertices: usize,
    pub exit_vertices: usize,
    pub cyclomatic_complexity: u32,
    pub has_cycles: bool,
    pub edge_type_counts: HashMap<EdgeType, usize>,
    pub unlabeled_edges: usize,
}
