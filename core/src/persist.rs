//! On-disk layout of a built category graph: `graph.bin` (bincode) next to
//! a human-readable `meta.json`.

use crate::category::CategoryGraph;
use crate::model::Language;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMeta {
    pub language: Language,
    pub num_categories: usize,
    pub num_edges: usize,
    /// `None` when the graph has no finite minimum (e.g. no categories).
    pub min_cost: Option<f64>,
    pub created_at: String,
    pub version: u32,
}

impl GraphMeta {
    pub fn describe(graph: &CategoryGraph) -> Self {
        let min_cost = graph.min_cost();
        Self {
            language: graph.language().clone(),
            num_categories: graph.len(),
            num_edges: graph.num_edges(),
            min_cost: min_cost.is_finite().then_some(min_cost),
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            version: FORMAT_VERSION,
        }
    }
}

pub struct GraphPaths {
    pub root: PathBuf,
}

impl GraphPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn graph(&self) -> PathBuf { self.root.join("graph.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    pub fn exists(&self) -> bool { self.graph().is_file() && self.meta().is_file() }
}

pub fn save_graph(paths: &GraphPaths, graph: &CategoryGraph) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.graph())?;
    let bytes = bincode::serialize(graph)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_graph(paths: &GraphPaths) -> Result<CategoryGraph> {
    let mut f = File::open(paths.graph())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let graph = bincode::deserialize(&buf)?;
    Ok(graph)
}

pub fn save_meta(paths: &GraphPaths, meta: &GraphMeta) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &GraphPaths) -> Result<GraphMeta> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: GraphMeta = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Writes the graph and its metadata side by side.
pub fn save(paths: &GraphPaths, graph: &CategoryGraph) -> Result<GraphMeta> {
    let meta = GraphMeta::describe(graph);
    save_graph(paths, graph)?;
    save_meta(paths, &meta)?;
    Ok(meta)
}

/// Loads a graph, refusing files from another format version or whose
/// metadata disagrees with the payload.
pub fn load(paths: &GraphPaths) -> Result<(CategoryGraph, GraphMeta)> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        bail!("unsupported graph format version {} in {}", meta.version, paths.root.display());
    }
    let graph = load_graph(paths)?;
    if graph.language() != &meta.language || graph.len() != meta.num_categories {
        bail!("graph in {} does not match its meta.json", paths.root.display());
    }
    Ok((graph, meta))
}
