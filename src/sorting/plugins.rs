//! The plugin sorter (C8, spec §4.8): builds a directed graph of plugins,
//! adds edges in five phases of decreasing certainty, checks for cycles
//! and produces a topological order.

use petgraph::{Graph, graph::NodeIndex};
use rustc_hash::FxHashMap as HashMap;

use crate::{
    logging,
    metadata::{Filename, Message, PluginMetadata},
    plugin::{Plugin, error::PluginDataError},
    sorting::{
        dfs::{BidirBfsVisitor, bidirectional_bfs, find_cycle},
        error::{CyclicInteractionError, SortingError},
        validate::check_install_validity,
        vertex::{EdgeType, Vertex},
    },
};

/// A plugin and its merged metadata, annotated with the facts the edge
/// phases below need repeatedly so they don't have to re-derive them (or
/// re-run fallible `esplugin` queries) on every pairwise comparison.
#[derive(Debug)]
pub struct PluginSortingData<'a> {
    plugin: &'a Plugin,
    is_master: bool,
    override_record_count: usize,
    masters: Box<[String]>,
    load_order_index: usize,
    metadata: PluginMetadata,
}

impl<'a> PluginSortingData<'a> {
    /// Merge `masterlist_metadata` and, if it's enabled and not name-only,
    /// `user_metadata` onto `plugin` (spec §4.8's vertex annotation step),
    /// and cache the facts about `plugin` that sorting needs.
    pub fn new(
        plugin: &'a Plugin,
        masterlist_metadata: Option<&PluginMetadata>,
        user_metadata: Option<&PluginMetadata>,
        load_order_index: usize,
    ) -> Result<Self, PluginDataError> {
        let mut metadata = masterlist_metadata.cloned().unwrap_or_default();

        if let Some(user_metadata) = user_metadata
            && user_metadata.enabled()
            && !user_metadata.has_name_only()
        {
            metadata.merge(user_metadata);
        }

        Ok(Self {
            plugin,
            is_master: plugin.is_master(),
            override_record_count: plugin.override_record_count()?,
            masters: plugin.masters()?.into_boxed_slice(),
            load_order_index,
            metadata,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    #[must_use]
    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn do_records_overlap(&self, other: &Self) -> Result<bool, PluginDataError> {
        self.plugin.do_records_overlap(other.plugin)
    }
}

/// Sort `plugins_sorting_data` into a valid load order (spec §4.8), and
/// collect the install-validity messages generated while doing so (spec
/// §4.9). `is_active` reports whether a named plugin is currently active
/// in the game's load order.
///
/// # Errors
///
/// Returns [`SortingError::CycleFound`] or [`SortingError::CycleInvolving`]
/// if the plugins' metadata describes a cyclic interaction, or
/// [`SortingError::PluginDataError`] if reading a plugin's records fails.
pub(crate) fn sort_plugins(
    plugins_sorting_data: Vec<PluginSortingData<'_>>,
    is_active: &dyn Fn(&str) -> bool,
) -> Result<(Vec<String>, Vec<Message>), SortingError> {
    let mut graph: Graph<PluginSortingData<'_>, EdgeType> = Graph::new();
    let mut indices_by_name: HashMap<Filename, NodeIndex> = HashMap::default();

    for data in plugins_sorting_data {
        let index = graph.add_node(data);
        let name = Filename::new(graph[index].name());
        indices_by_name.insert(name, index);
    }

    let messages = annotate_vertices(&graph, &indices_by_name, is_active);

    add_hard_edges(&mut graph, &indices_by_name);

    propagate_priorities(&mut graph);

    add_priority_edges(&mut graph)?;

    add_overlap_edges(&mut graph)?;

    add_tie_break_edges(&mut graph);

    if let Some(cycle) = find_cycle(&graph, |data| data.name().to_owned()) {
        return Err(CyclicInteractionError::new(cycle).into());
    }

    let sorted_nodes = petgraph::algo::toposort(&graph, None)
        .map_err(|e| SortingError::CycleInvolving(graph[e.node_id()].name().to_owned()))?;

    check_path_is_hamiltonian(&graph, &sorted_nodes);

    let sorted_names = sorted_nodes
        .into_iter()
        .map(|i| graph[i].name().to_owned())
        .collect();

    Ok((sorted_names, messages))
}

fn annotate_vertices(
    graph: &Graph<PluginSortingData<'_>, EdgeType>,
    indices_by_name: &HashMap<Filename, NodeIndex>,
    is_active: &dyn Fn(&str) -> bool,
) -> Vec<Message> {
    graph
        .node_weights()
        .flat_map(|data| {
            check_install_validity(
                data.metadata(),
                data.plugin.crc(),
                is_active(data.name()),
                |name| indices_by_name.contains_key(&Filename::new(name)),
                is_active,
            )
        })
        .collect()
}

/// Phase 1: master-flag, explicit master, requirement and load-after
/// edges. These come directly from plugin headers and masterlist/userlist
/// data taken at face value, so they're never checked for cycles: if they
/// describe one, that's a data error to be reported, not silently dropped.
fn add_hard_edges(
    graph: &mut Graph<PluginSortingData<'_>, EdgeType>,
    indices_by_name: &HashMap<Filename, NodeIndex>,
) {
    let mut edges = Vec::new();

    for i in graph.node_indices() {
        for j in graph.node_indices() {
            if i != j && graph[i].is_master && !graph[j].is_master {
                edges.push((i, j, EdgeType::MasterFlag));
            }
        }
    }

    for j in graph.node_indices() {
        let data = &graph[j];

        for master in &data.masters {
            if let Some(&i) = indices_by_name.get(&Filename::new(master)) {
                edges.push((i, j, EdgeType::Master));
            }
        }

        for requirement in data.metadata.requirements() {
            if let Some(&i) = indices_by_name.get(&Filename::new(requirement.name())) {
                edges.push((i, j, EdgeType::Requirement));
            }
        }

        for load_after in data.metadata.load_after_files() {
            if let Some(&i) = indices_by_name.get(&Filename::new(load_after.name())) {
                edges.push((i, j, EdgeType::LoadAfter));
            }
        }
    }

    for (i, j, edge_type) in edges {
        graph.add_edge(i, j, edge_type);
    }
}

/// Phase 2: flood-fill each plugin's strictly-positive priority onto the
/// plugins that load after it along phase 1's edges, so that later phases
/// compare an "effective" priority instead of each plugin's own declared
/// one.
///
/// Seeds are visited in descending priority order, but unlike a simple
/// first-writer-wins flood fill, each of a node's two priority scopes
/// (global, local) is raised independently: a later, weaker seed can still
/// raise whichever of the two fields it dominates on a node a stronger seed
/// already reached, and descent through a node stops only once that node
/// already dominates the seed on both scopes.
fn propagate_priorities(graph: &mut Graph<PluginSortingData<'_>, EdgeType>) {
    let mut seeds: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&i| {
            let priority = &graph[i].metadata;
            priority.global_priority().value() > 0 || priority.local_priority().value() > 0
        })
        .collect();

    seeds.sort_by_key(|&i| {
        let data = &graph[i];
        std::cmp::Reverse((
            data.metadata.global_priority().value(),
            data.metadata.local_priority().value(),
        ))
    });

    for seed in seeds {
        let global = graph[seed].metadata.global_priority();
        let local = graph[seed].metadata.local_priority();

        let mut stack: Vec<NodeIndex> = graph.neighbors(seed).collect();

        while let Some(node) = stack.pop() {
            let current_global = graph[node].metadata.global_priority();
            let current_local = graph[node].metadata.local_priority();

            let raises_global = current_global.value() < global.value();
            let raises_local = current_local.value() < local.value();

            if !raises_global && !raises_local {
                continue;
            }

            if raises_global {
                graph[node].metadata.set_global_priority(global);
            }
            if raises_local {
                graph[node].metadata.set_local_priority(local);
            }

            stack.extend(graph.neighbors(node));
        }
    }
}

/// Phase 3: edges between plugins with different effective priorities,
/// lower-priority loading before higher-priority, skipped where it would
/// create a cycle or where both plugins have a zero global priority and
/// their records don't overlap (a purely local priority only matters
/// between plugins that can actually conflict).
fn add_priority_edges(
    graph: &mut Graph<PluginSortingData<'_>, EdgeType>,
) -> Result<(), PluginDataError> {
    let indices: Vec<NodeIndex> = graph.node_indices().collect();

    for (pos, &i) in indices.iter().enumerate() {
        for &j in indices.iter().skip(pos + 1) {
            let priority_i = effective_priority(&graph[i]);
            let priority_j = effective_priority(&graph[j]);

            if priority_i == priority_j {
                continue;
            }

            let globals_are_zero = priority_i.0 == 0 && priority_j.0 == 0;
            if globals_are_zero && !graph[i].do_records_overlap(&graph[j])? {
                continue;
            }

            let (lower, higher) = if priority_i < priority_j { (i, j) } else { (j, i) };

            if graph.find_edge(lower, higher).is_none()
                && graph.find_edge(higher, lower).is_none()
                && !path_exists(graph, higher, lower)
            {
                graph.add_edge(lower, higher, EdgeType::Priority);
            }
        }
    }

    Ok(())
}

fn effective_priority(data: &PluginSortingData<'_>) -> (i16, i16) {
    (
        data.metadata.global_priority().value(),
        data.metadata.local_priority().value(),
    )
}

/// Phase 4: edges between plugins whose override records overlap, fewer
/// overrides loading before more, skipped where it would create a cycle
/// or the plugins already have an explicit ordering between them.
fn add_overlap_edges(graph: &mut Graph<PluginSortingData<'_>, EdgeType>) -> Result<(), PluginDataError> {
    let indices: Vec<NodeIndex> = graph.node_indices().collect();

    for (pos, &i) in indices.iter().enumerate() {
        for &j in indices.iter().skip(pos + 1) {
            if graph.find_edge(i, j).is_some() || graph.find_edge(j, i).is_some() {
                continue;
            }

            if graph[i].override_record_count == graph[j].override_record_count {
                continue;
            }

            if !graph[i].do_records_overlap(&graph[j])? {
                continue;
            }

            let (fewer, more) = if graph[i].override_record_count < graph[j].override_record_count {
                (i, j)
            } else {
                (j, i)
            };

            if !path_exists(graph, more, fewer) {
                graph.add_edge(fewer, more, EdgeType::RecordOverlap);
            }
        }
    }

    Ok(())
}

/// Phase 5: ties every remaining pair of adjacent plugins in a total order
/// (current load order position, then name) together, guaranteeing the
/// graph has a unique topological sort.
fn add_tie_break_edges(graph: &mut Graph<PluginSortingData<'_>, EdgeType>) {
    let mut indices: Vec<NodeIndex> = graph.node_indices().collect();

    indices.sort_by(|&a, &b| {
        let data_a = &graph[a];
        let data_b = &graph[b];
        data_a
            .load_order_index
            .cmp(&data_b.load_order_index)
            .then_with(|| data_a.name().cmp(data_b.name()))
    });

    for pair in indices.windows(2) {
        let [earlier, later] = pair else { continue };

        if graph.find_edge(*earlier, *later).is_none()
            && graph.find_edge(*later, *earlier).is_none()
            && !path_exists(graph, *later, *earlier)
        {
            graph.add_edge(*earlier, *later, EdgeType::TieBreak);
        }
    }
}

struct NullBfsVisitor;

impl BidirBfsVisitor for NullBfsVisitor {
    fn visit_forward_bfs_edge(&mut self, _source: NodeIndex, _target: NodeIndex) {}

    fn visit_reverse_bfs_edge(&mut self, _source: NodeIndex, _target: NodeIndex) {}

    fn visit_intersection_node(&mut self, _node: NodeIndex) {}
}

/// Whether a path from `from` to `to` already exists, i.e. whether adding
/// an edge from `to` to `from` would create a cycle.
fn path_exists<N, E>(graph: &Graph<N, E>, from: NodeIndex, to: NodeIndex) -> bool {
    bidirectional_bfs(graph, from, to, &mut NullBfsVisitor)
}

/// The tie-break phase should leave the graph with a Hamiltonian path, so
/// the final sorted order has a direct edge between every adjacent pair.
/// If that's not the case there's a bug in the phases above, but it's not
/// worth failing the sort over, so this only logs.
fn check_path_is_hamiltonian(graph: &Graph<PluginSortingData<'_>, EdgeType>, sorted_nodes: &[NodeIndex]) {
    for pair in sorted_nodes.windows(2) {
        let [a, b] = pair else { continue };

        if graph.find_edge(*a, *b).is_none() {
            logging::error!(
                "The sorted load order may not be unique: no edge was found between \"{}\" and \"{}\"",
                graph[*a].name(),
                graph[*b].name()
            );
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{MessageType, Priority, PluginCleaningData},
        tests::{BLANK_ESM, BLANK_MASTER_DEPENDENT_ESM, Fixture},
    };

    fn sorting_data<'a>(plugin: &'a Plugin, load_order_index: usize) -> PluginSortingData<'a> {
        PluginSortingData::new(plugin, None, None, load_order_index).unwrap()
    }

    #[test]
    fn sort_plugins_should_order_masters_before_non_masters() {
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let blank_esm = fixture.load_plugin(BLANK_ESM);
        let blank_esp = fixture.load_plugin("Blank.esp");

        let data = vec![sorting_data(&blank_esp, 0), sorting_data(&blank_esm, 1)];

        let (sorted, _) = sort_plugins(data, &|_| false).unwrap();

        let esm_pos = sorted.iter().position(|n| n == BLANK_ESM).unwrap();
        let esp_pos = sorted.iter().position(|n| n == "Blank.esp").unwrap();
        assert!(esm_pos < esp_pos);
    }

    #[test]
    fn sort_plugins_should_order_a_master_before_its_dependent() {
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let master = fixture.load_plugin(BLANK_ESM);
        let dependent = fixture.load_plugin(BLANK_MASTER_DEPENDENT_ESM);

        let data = vec![sorting_data(&dependent, 0), sorting_data(&master, 1)];

        let (sorted, _) = sort_plugins(data, &|_| false).unwrap();

        let master_pos = sorted.iter().position(|n| n == BLANK_ESM).unwrap();
        let dependent_pos = sorted
            .iter()
            .position(|n| n == BLANK_MASTER_DEPENDENT_ESM)
            .unwrap();
        assert!(master_pos < dependent_pos);
    }

    #[test]
    fn sort_plugins_should_error_on_a_requirement_cycle() {
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let a = fixture.load_plugin("Blank.esp");
        let b = fixture.load_plugin("Blank - Different.esp");

        let mut a_metadata = PluginMetadata::new(a.name()).unwrap();
        a_metadata.set_requirements(vec![crate::metadata::File::new(b.name().to_owned())]);

        let mut b_metadata = PluginMetadata::new(b.name()).unwrap();
        b_metadata.set_requirements(vec![crate::metadata::File::new(a.name().to_owned())]);

        let data = vec![
            PluginSortingData::new(&a, Some(&a_metadata), None, 0).unwrap(),
            PluginSortingData::new(&b, Some(&b_metadata), None, 1).unwrap(),
        ];

        let result = sort_plugins(data, &|_| false);

        assert!(matches!(result, Err(SortingError::CycleFound(_))));
    }

    #[test]
    fn sort_plugins_should_report_a_missing_requirement() {
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let plugin = fixture.load_plugin(BLANK_ESM);

        let mut metadata = PluginMetadata::new(plugin.name()).unwrap();
        metadata.set_requirements(vec![crate::metadata::File::new("Missing.esp".to_owned())]);

        let data = vec![PluginSortingData::new(&plugin, Some(&metadata), None, 0).unwrap()];

        let (_, messages) = sort_plugins(data, &|_| false).unwrap();

        assert_eq!(1, messages.len());
    }

    #[test]
    fn propagate_priorities_should_raise_a_downstream_plugins_global_priority() {
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let master = fixture.load_plugin(BLANK_ESM);
        let dependent = fixture.load_plugin(BLANK_MASTER_DEPENDENT_ESM);

        let mut master_metadata = PluginMetadata::new(master.name()).unwrap();
        master_metadata.set_global_priority(Priority::new(50));

        let mut graph: Graph<PluginSortingData<'_>, EdgeType> = Graph::new();
        let master_index = graph.add_node(
            PluginSortingData::new(&master, Some(&master_metadata), None, 0).unwrap(),
        );
        let dependent_index = graph.add_node(sorting_data(&dependent, 1));
        graph.add_edge(master_index, dependent_index, EdgeType::Master);

        propagate_priorities(&mut graph);

        assert_eq!(50, graph[dependent_index].metadata().global_priority().value());
        assert_eq!(0, graph[dependent_index].metadata().local_priority().value());
    }

    #[test]
    fn propagate_priorities_should_not_lower_a_downstream_plugins_priority() {
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let master = fixture.load_plugin(BLANK_ESM);
        let dependent = fixture.load_plugin(BLANK_MASTER_DEPENDENT_ESM);

        let mut master_metadata = PluginMetadata::new(master.name()).unwrap();
        master_metadata.set_global_priority(Priority::new(10));

        let mut dependent_metadata = PluginMetadata::new(dependent.name()).unwrap();
        dependent_metadata.set_global_priority(Priority::new(90));

        let mut graph: Graph<PluginSortingData<'_>, EdgeType> = Graph::new();
        let master_index = graph.add_node(
            PluginSortingData::new(&master, Some(&master_metadata), None, 0).unwrap(),
        );
        let dependent_index = graph.add_node(
            PluginSortingData::new(&dependent, Some(&dependent_metadata), None, 1).unwrap(),
        );
        graph.add_edge(master_index, dependent_index, EdgeType::Master);

        propagate_priorities(&mut graph);

        assert_eq!(90, graph[dependent_index].metadata().global_priority().value());
    }

    #[test]
    fn sort_plugins_should_not_reorder_by_local_priority_without_a_record_overlap() {
        // Mirrors spec §8 scenario 2: a userlist-only local priority doesn't
        // move a plugin relative to one it doesn't conflict with.
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let a = fixture.load_plugin("Blank.esp");
        let b = fixture.load_plugin("Blank - Different.esp");

        let mut b_metadata = PluginMetadata::new(b.name()).unwrap();
        b_metadata.set_local_priority(Priority::new(Priority::MIN_VALUE));

        let data = vec![
            sorting_data(&a, 0),
            PluginSortingData::new(&b, Some(&b_metadata), None, 1).unwrap(),
        ];

        let (sorted, _) = sort_plugins(data, &|_| false).unwrap();

        assert_eq!(vec![a.name().to_owned(), b.name().to_owned()], sorted);
    }

    #[test]
    fn sort_plugins_should_reorder_by_global_priority_even_without_a_record_overlap() {
        // Same scenario, but with a global priority difference of the same
        // magnitude: this one isn't conflict-scoped, so it does reorder them.
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let a = fixture.load_plugin("Blank.esp");
        let b = fixture.load_plugin("Blank - Different.esp");

        let mut b_metadata = PluginMetadata::new(b.name()).unwrap();
        b_metadata.set_global_priority(Priority::new(Priority::MIN_VALUE));

        let data = vec![
            sorting_data(&a, 0),
            PluginSortingData::new(&b, Some(&b_metadata), None, 1).unwrap(),
        ];

        let (sorted, _) = sort_plugins(data, &|_| false).unwrap();

        assert_eq!(vec![b.name().to_owned(), a.name().to_owned()], sorted);
    }

    #[test]
    fn sort_plugins_should_warn_about_a_cleaning_crc_match_but_not_a_mismatch() {
        // Mirrors spec §8 scenario 6: a dirty_info entry whose CRC matches
        // the plugin's own produces a warning; one that doesn't, doesn't.
        let fixture = Fixture::new(crate::GameType::Skyrim);
        let plugin = fixture.load_plugin(BLANK_ESM);
        let crc = plugin.crc().unwrap();

        let mut metadata = PluginMetadata::new(plugin.name()).unwrap();
        metadata.set_dirty_info(vec![
            PluginCleaningData::new(crc, "TES4Edit".to_owned()),
            PluginCleaningData::new(crc.wrapping_add(1), "TES4Edit".to_owned()),
        ]);

        let data = vec![PluginSortingData::new(&plugin, Some(&metadata), None, 0).unwrap()];

        let (_, messages) = sort_plugins(data, &|_| false).unwrap();

        assert_eq!(1, messages.len());
        assert_eq!(MessageType::Warn, messages[0].message_type());
    }
}
