//! Entity graphs and the read-only query engine over them.
//!
//! An [`EntityGraph`] is the loaded snapshot: plain vertices and edges.
//! Traversals need adjacency maps, which are built once by
//! [`EntityGraph::index`] into an [`IndexedGraph`]. The indexed form owns the
//! snapshot, so its maps can never go stale, and it is immutable, so it can be
//! shared across tasks freely.
//!
//! Parent associations are relations resolved through the arena, never
//! ownership: every lookup goes `TypeAndKey` -> arena slot.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::NetworkEntity;
use crate::error::{GraphError, Result};
use crate::ids::TypeAndKey;

/// Directed edge between two entities of the same network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: TypeAndKey,
    pub to: TypeAndKey,
}

impl GraphEdge {
    pub fn new(from: TypeAndKey, to: TypeAndKey) -> Self {
        Self { from, to }
    }
}

/// A loaded, connected slice of a network's entity DAG.
///
/// `edges` are maintained in parallel with each entity's `associations`;
/// [`EntityGraph::validate_edges`] checks that they agree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityGraph {
    pub entities: Vec<NetworkEntity>,
    /// Entities without incoming edges.
    pub root_entities: Vec<TypeAndKey>,
    pub edges: Vec<GraphEdge>,
}

impl EntityGraph {
    /// Check that every edge is mirrored by the endpoint entities'
    /// association lists and vice versa.
    pub fn validate_edges(&self) -> Result<()> {
        let by_tk: HashMap<TypeAndKey, &NetworkEntity> =
            self.entities.iter().map(|e| (e.tk(), e)).collect();
        let edge_set: HashSet<&GraphEdge> = self.edges.iter().collect();

        for edge in &self.edges {
            let inconsistent = || GraphError::InconsistentEdges {
                from: edge.from.clone(),
                to: edge.to.clone(),
            };
            let from = by_tk.get(&edge.from).ok_or_else(inconsistent)?;
            let to = by_tk.get(&edge.to).ok_or_else(inconsistent)?;
            if !from.associations.contains(&edge.to) {
                return Err(inconsistent());
            }
            if !to.parent_associations.contains(&edge.from) {
                return Err(inconsistent());
            }
        }

        for entity in &self.entities {
            let tk = entity.tk();
            for child in &entity.associations {
                let edge = GraphEdge::new(tk.clone(), child.clone());
                if by_tk.contains_key(child) && !edge_set.contains(&edge) {
                    return Err(GraphError::InconsistentEdges {
                        from: edge.from,
                        to: edge.to,
                    });
                }
            }
        }
        Ok(())
    }

    /// Build the traversal indexes. Consumes the snapshot so the indexes
    /// cannot drift from the data they describe.
    pub fn index(self) -> IndexedGraph {
        IndexedGraph::new(self)
    }
}

/// An [`EntityGraph`] with its TK, forward-edge and reverse-edge indexes
/// built.
#[derive(Debug, Clone)]
pub struct IndexedGraph {
    graph: EntityGraph,
    ents_by_tk: HashMap<TypeAndKey, usize>,
    edges_by_tk: HashMap<TypeAndKey, Vec<TypeAndKey>>,
    reverse_edges_by_tk: HashMap<TypeAndKey, Vec<TypeAndKey>>,
}

impl IndexedGraph {
    fn new(graph: EntityGraph) -> Self {
        let mut ents_by_tk = HashMap::with_capacity(graph.entities.len());
        for (idx, entity) in graph.entities.iter().enumerate() {
            if ents_by_tk.insert(entity.tk(), idx).is_some() {
                warn!(entity = %entity.tk(), "duplicate entity in graph, keeping last");
            }
        }

        let mut edges_by_tk: HashMap<TypeAndKey, Vec<TypeAndKey>> = HashMap::new();
        let mut reverse_edges_by_tk: HashMap<TypeAndKey, Vec<TypeAndKey>> = HashMap::new();
        for edge in &graph.edges {
            edges_by_tk
                .entry(edge.from.clone())
                .or_default()
                .push(edge.to.clone());
            reverse_edges_by_tk
                .entry(edge.to.clone())
                .or_default()
                .push(edge.from.clone());
        }

        Self {
            graph,
            ents_by_tk,
            edges_by_tk,
            reverse_edges_by_tk,
        }
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn into_graph(self) -> EntityGraph {
        self.graph
    }

    pub fn entities(&self) -> &[NetworkEntity] {
        &self.graph.entities
    }

    pub fn contains(&self, tk: &TypeAndKey) -> bool {
        self.ents_by_tk.contains_key(tk)
    }

    /// O(1) lookup by identifier.
    pub fn entity_by_tk(&self, tk: &TypeAndKey) -> Result<&NetworkEntity> {
        self.ents_by_tk
            .get(tk)
            .map(|&idx| &self.graph.entities[idx])
            .ok_or_else(|| GraphError::EntityNotFound(tk.clone()))
    }

    /// Linear scan for all entities of a type, in graph order.
    pub fn entities_of_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a NetworkEntity> + 'a {
        self.graph
            .entities
            .iter()
            .filter(move |e| e.entity_type == entity_type)
    }

    /// Direct successors of `tk` along edges.
    pub fn children_of(&self, tk: &TypeAndKey) -> &[TypeAndKey] {
        self.edges_by_tk.get(tk).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct predecessors of `tk` along edges.
    pub fn parents_of(&self, tk: &TypeAndKey) -> &[TypeAndKey] {
        self.reverse_edges_by_tk.get(tk).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth-first search up the parent edges of `start` for the first
    /// entity whose type is `target_type`. `start` itself is not a
    /// candidate. Terminates on cyclic graphs.
    pub fn first_ancestor_of_type(
        &self,
        start: &TypeAndKey,
        target_type: &str,
    ) -> Result<&NetworkEntity> {
        let (start_tk, _) = self
            .ents_by_tk
            .get_key_value(start)
            .ok_or_else(|| GraphError::EntityNotFound(start.clone()))?;
        let mut visited = HashSet::from([start_tk]);
        self.ancestor_search(start_tk, target_type, &mut visited)
            .ok_or_else(|| GraphError::NoMatch {
                start: start.clone(),
                target_type: target_type.to_string(),
            })
    }

    fn ancestor_search<'a>(
        &'a self,
        current: &'a TypeAndKey,
        target_type: &str,
        visited: &mut HashSet<&'a TypeAndKey>,
    ) -> Option<&'a NetworkEntity> {
        for parent in self.parents_of(current) {
            // already rejected, or `start`
            if !visited.insert(parent) {
                continue;
            }
            if parent.entity_type == target_type {
                if let Ok(found) = self.entity_by_tk(parent) {
                    return Some(found);
                }
            }
            if let Some(found) = self.ancestor_search(parent, target_type, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Entities of `target_type` directly associated from `parent` (one
    /// hop). Fails if an association points outside the graph.
    pub fn all_children_of_type(
        &self,
        parent: &TypeAndKey,
        target_type: &str,
    ) -> Result<Vec<&NetworkEntity>> {
        let parent = self.entity_by_tk(parent)?;
        parent
            .children_of_type(target_type)
            .map(|tk| self.entity_by_tk(tk))
            .collect()
    }

    /// First entity of `target_type` among `entity`'s parent associations
    /// (one hop).
    pub fn first_parent_of_type(
        &self,
        entity: &TypeAndKey,
        target_type: &str,
    ) -> Result<&NetworkEntity> {
        let child = self.entity_by_tk(entity)?;
        let parent = child
            .first_parent_of_type(target_type)
            .ok_or_else(|| GraphError::NoMatch {
                start: entity.clone(),
                target_type: target_type.to_string(),
            })?;
        self.entity_by_tk(parent)
    }
}

impl From<EntityGraph> for IndexedGraph {
    fn from(graph: EntityGraph) -> Self {
        graph.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tk(t: &str, k: &str) -> TypeAndKey {
        TypeAndKey::new(t, k)
    }

    /// Build a graph from edges, wiring associations on both sides.
    fn graph_of(vertices: &[(&str, &str)], edges: &[((&str, &str), (&str, &str))]) -> EntityGraph {
        let mut entities: Vec<NetworkEntity> = vertices
            .iter()
            .map(|(t, k)| NetworkEntity::new(*t, *k))
            .collect();
        let mut graph_edges = Vec::new();
        for (from, to) in edges {
            let (from, to) = (tk(from.0, from.1), tk(to.0, to.1));
            for entity in entities.iter_mut() {
                if entity.tk() == from {
                    entity.associations.push(to.clone());
                }
                if entity.tk() == to {
                    entity.parent_associations.push(from.clone());
                }
            }
            graph_edges.push(GraphEdge::new(from, to));
        }
        let root_entities = entities
            .iter()
            .filter(|e| e.parent_associations.is_empty())
            .map(NetworkEntity::tk)
            .collect();
        EntityGraph {
            entities,
            root_entities,
            edges: graph_edges,
        }
    }

    #[test]
    fn lookup_by_tk() {
        let graph = graph_of(&[("gateway", "gw1")], &[]).index();
        assert_eq!(graph.entity_by_tk(&tk("gateway", "gw1")).unwrap().key, "gw1");
        assert!(matches!(
            graph.entity_by_tk(&tk("gateway", "gw2")),
            Err(GraphError::EntityNotFound(_))
        ));
    }

    #[test]
    fn ancestor_search_walks_up_depth_first() {
        // network -> tier -> gateway -> cell
        let graph = graph_of(
            &[("network", "n"), ("tier", "t1"), ("gateway", "gw1"), ("cell", "c1")],
            &[
                (("network", "n"), ("tier", "t1")),
                (("tier", "t1"), ("gateway", "gw1")),
                (("gateway", "gw1"), ("cell", "c1")),
            ],
        )
        .index();

        let found = graph.first_ancestor_of_type(&tk("cell", "c1"), "tier").unwrap();
        assert_eq!(found.tk(), tk("tier", "t1"));
        let found = graph
            .first_ancestor_of_type(&tk("cell", "c1"), "network")
            .unwrap();
        assert_eq!(found.tk(), tk("network", "n"));
        assert!(graph
            .first_ancestor_of_type(&tk("network", "n"), "tier")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn ancestor_search_does_not_match_start() {
        let graph = graph_of(
            &[("tier", "t1"), ("tier", "t2")],
            &[(("tier", "t1"), ("tier", "t2"))],
        )
        .index();
        let found = graph.first_ancestor_of_type(&tk("tier", "t2"), "tier").unwrap();
        assert_eq!(found.key, "t1");
        assert!(graph.first_ancestor_of_type(&tk("tier", "t1"), "tier").is_err());
    }

    #[test]
    fn ancestor_search_terminates_on_cycle() {
        // a -> b -> c -> a
        let graph = graph_of(
            &[("x", "a"), ("x", "b"), ("x", "c")],
            &[
                (("x", "a"), ("x", "b")),
                (("x", "b"), ("x", "c")),
                (("x", "c"), ("x", "a")),
            ],
        )
        .index();
        let err = graph.first_ancestor_of_type(&tk("x", "a"), "missing").unwrap_err();
        assert!(matches!(err, GraphError::NoMatch { .. }));
    }

    #[test]
    fn ancestor_search_never_returns_start_through_a_cycle() {
        // t:a -> u:b -> t:a
        let graph = graph_of(
            &[("t", "a"), ("u", "b")],
            &[(("t", "a"), ("u", "b")), (("u", "b"), ("t", "a"))],
        )
        .index();
        let err = graph.first_ancestor_of_type(&tk("t", "a"), "t").unwrap_err();
        assert!(matches!(err, GraphError::NoMatch { .. }));
        let found = graph.first_ancestor_of_type(&tk("t", "a"), "u").unwrap();
        assert_eq!(found.tk(), tk("u", "b"));

        // self loop
        let graph = graph_of(&[("t", "a")], &[(("t", "a"), ("t", "a"))]).index();
        assert!(graph.first_ancestor_of_type(&tk("t", "a"), "t").is_err());
    }

    #[test]
    fn indexed_graph_is_shared_across_threads() {
        let graph = std::sync::Arc::new(
            graph_of(
                &[("network", "n"), ("tier", "t1"), ("gateway", "gw1"), ("cell", "c1"), ("cell", "c2")],
                &[
                    (("network", "n"), ("tier", "t1")),
                    (("tier", "t1"), ("gateway", "gw1")),
                    (("gateway", "gw1"), ("cell", "c1")),
                    (("gateway", "gw1"), ("cell", "c2")),
                    (("cell", "c2"), ("network", "n")),
                ],
            )
            .index(),
        );

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let graph = std::sync::Arc::clone(&graph);
                std::thread::spawn(move || {
                    let start = if i % 2 == 0 { tk("cell", "c1") } else { tk("cell", "c2") };
                    (0..200)
                        .map(|_| {
                            let tier = graph.first_ancestor_of_type(&start, "tier").unwrap().tk();
                            let network = graph.first_ancestor_of_type(&start, "network").unwrap().tk();
                            (tier, network)
                        })
                        .collect::<HashSet<_>>()
                })
            })
            .collect();
        for handle in handles {
            let answers = handle.join().unwrap();
            assert_eq!(
                answers,
                HashSet::from([(tk("tier", "t1"), tk("network", "n"))])
            );
        }
    }

    #[test]
    fn one_hop_children_and_parents() {
        let graph = graph_of(
            &[("gateway", "gw1"), ("cell", "c1"), ("cell", "c2"), ("radio", "r1"), ("tier", "t1")],
            &[
                (("gateway", "gw1"), ("cell", "c1")),
                (("gateway", "gw1"), ("cell", "c2")),
                (("cell", "c1"), ("radio", "r1")),
                (("tier", "t1"), ("gateway", "gw1")),
            ],
        )
        .index();

        let cells = graph
            .all_children_of_type(&tk("gateway", "gw1"), "cell")
            .unwrap();
        assert_eq!(cells.len(), 2);
        // one hop only
        assert!(graph
            .all_children_of_type(&tk("gateway", "gw1"), "radio")
            .unwrap()
            .is_empty());

        let tier = graph.first_parent_of_type(&tk("gateway", "gw1"), "tier").unwrap();
        assert_eq!(tier.key, "t1");
        assert!(graph.first_parent_of_type(&tk("cell", "c1"), "tier").is_err());
    }

    #[test]
    fn entities_of_type_filters() {
        let graph = graph_of(&[("cell", "c1"), ("gateway", "gw1"), ("cell", "c2")], &[]).index();
        let keys: Vec<_> = graph.entities_of_type("cell").map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c1", "c2"]);
    }

    #[test]
    fn edge_validation() {
        let good = graph_of(
            &[("a", "1"), ("b", "1")],
            &[(("a", "1"), ("b", "1"))],
        );
        assert!(good.validate_edges().is_ok());

        let mut missing_assoc = good.clone();
        missing_assoc.entities[0].associations.clear();
        assert!(matches!(
            missing_assoc.validate_edges(),
            Err(GraphError::InconsistentEdges { .. })
        ));

        let mut missing_edge = good;
        missing_edge.edges.clear();
        assert!(missing_edge.validate_edges().is_err());
    }
}
