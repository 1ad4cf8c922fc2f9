//! Table dependency graph
//!
//! Strong links (`+Table`) order code emission: a table's generated type may
//! only refer to tables emitted before it. Weak links (`*Table`) are left out
//! of the ordering so they can break cycles, but still count for impact
//! analysis.

use csvdb_core::{Database, Error, Result, TableKind};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Per-table traversal state for depth calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done(usize),
}

/// Dependency graph with forward (strong) and reverse (any strength) edges
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Table -> tables it strongly links to
    parents: BTreeMap<String, BTreeSet<String>>,

    /// Table -> tables that link to it, strong or weak
    children: BTreeMap<String, BTreeSet<String>>,

    /// Kind of every table in the graph
    kinds: BTreeMap<String, TableKind>,
}

impl DependencyGraph {
    /// Build the graph from the link columns of a database
    pub fn from_database(db: &Database) -> Self {
        let mut parents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut children: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut kinds = BTreeMap::new();

        for table in db.tables() {
            kinds.insert(table.name.clone(), table.kind);
            parents.entry(table.name.clone()).or_default();

            for link in table.columns.iter().filter_map(|c| c.link.as_ref()) {
                if link.is_strong() {
                    parents
                        .entry(table.name.clone())
                        .or_default()
                        .insert(link.table.clone());
                }

                children
                    .entry(link.table.clone())
                    .or_default()
                    .insert(table.name.clone());
            }
        }

        Self {
            parents,
            children,
            kinds,
        }
    }

    /// Every table in the graph, by name
    pub fn all_nodes(&self) -> Vec<&String> {
        self.kinds.keys().collect()
    }

    /// Tables a table strongly links to
    pub fn parents(&self, table: &str) -> Vec<&String> {
        self.parents
            .get(table)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Tables that link directly to a table
    pub fn children(&self, table: &str) -> Vec<&String> {
        self.children
            .get(table)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Every table that depends on `table`, directly or transitively, over
    /// links of any strength. Sorted by name.
    pub fn dependents(&self, table: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<&String> = self.children(table).into_iter().collect();

        while let Some(current) = queue.pop_front() {
            if current == table || !visited.insert(current.clone()) {
                continue;
            }

            for child in self.children(current) {
                if !visited.contains(child) {
                    queue.push_back(child);
                }
            }
        }

        let mut result: Vec<String> = visited.into_iter().collect();
        result.sort();
        result
    }

    /// Depth of every table over strong links.
    ///
    /// Enum tables and tables without strong links sit at depth 0; any other
    /// table is one deeper than its deepest strong target. A strong cycle is a
    /// [`Error::DependencyCycle`].
    pub fn depths(&self) -> Result<BTreeMap<String, usize>> {
        let mut state: BTreeMap<&str, Visit> = self
            .kinds
            .keys()
            .map(|name| (name.as_str(), Visit::Unvisited))
            .collect();

        for name in self.kinds.keys() {
            let mut stack = Vec::new();
            self.visit(name, &mut state, &mut stack)?;
        }

        Ok(state
            .into_iter()
            .filter_map(|(name, visit)| match visit {
                Visit::Done(depth) => Some((name.to_string(), depth)),
                _ => None,
            })
            .collect())
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        state: &mut BTreeMap<&'a str, Visit>,
        stack: &mut Vec<&'a str>,
    ) -> Result<usize> {
        match state.get(name).copied() {
            Some(Visit::Done(depth)) => return Ok(depth),
            Some(Visit::InProgress) => {
                let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<&str> = stack[start..].to_vec();
                cycle.push(name);
                return Err(Error::DependencyCycle {
                    table: name.to_string(),
                    path: cycle.join(" -> "),
                });
            }
            // links to missing tables are reported by the resolver
            None => return Ok(0),
            Some(Visit::Unvisited) => {}
        }

        if self.kinds.get(name) == Some(&TableKind::Enum) {
            state.insert(name, Visit::Done(0));
            return Ok(0);
        }

        state.insert(name, Visit::InProgress);
        stack.push(name);

        let mut depth = 0;
        if let Some(targets) = self.parents.get(name) {
            for target in targets {
                depth = depth.max(self.visit(target, state, stack)? + 1);
            }
        }

        stack.pop();
        state.insert(name, Visit::Done(depth));
        Ok(depth)
    }

    /// Non-enum tables in code emission order: ascending depth, then name
    pub fn emission_order(&self) -> Result<Vec<String>> {
        let depths = self.depths()?;

        let mut order: Vec<(usize, &String)> = depths
            .iter()
            .filter(|(name, _)| self.kinds.get(name.as_str()) != Some(&TableKind::Enum))
            .map(|(name, &depth)| (depth, name))
            .collect();
        order.sort();

        tracing::debug!(tables = order.len(), "computed emission order");
        Ok(order.into_iter().map(|(_, name)| name.clone()).collect())
    }
}
