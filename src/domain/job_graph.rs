//! Job graph assembly and validation.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::domain::AppError;
use crate::domain::job::Job;

/// Emitted jobs plus the names of jobs defined elsewhere in the workflow
/// (the main agent job, activation jobs) that emitted jobs may need.
#[derive(Debug, Clone, Default)]
pub struct JobGraph {
    jobs: BTreeMap<String, Job>,
    external: BTreeSet<String>,
}

impl JobGraph {
    pub fn new<I, S>(external: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { jobs: BTreeMap::new(), external: external.into_iter().map(Into::into).collect() }
    }

    pub fn add_job(&mut self, job: Job) -> Result<(), AppError> {
        if self.jobs.contains_key(&job.name) || self.external.contains(&job.name) {
            return Err(AppError::DuplicateJob(job.name));
        }
        self.jobs.insert(job.name.clone(), job);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    /// Emitted jobs in dependency order, dependencies first.
    ///
    /// Uses Kahn's algorithm with sorted queues so the order is deterministic.
    /// Unknown dependencies and cycles are errors.
    pub fn topological_order(&self) -> Result<Vec<&Job>, AppError> {
        // Edge A -> B means A needs B (B must come before A)
        let mut in_degree: BTreeMap<&str, usize> =
            self.jobs.keys().map(|k| (k.as_str(), 0)).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> =
            self.jobs.keys().map(|k| (k.as_str(), Vec::new())).collect();

        for (name, job) in &self.jobs {
            for dep in &job.needs {
                if self.external.contains(dep) {
                    continue;
                }
                if !self.jobs.contains_key(dep) {
                    return Err(AppError::MissingDependency {
                        job: name.clone(),
                        dependency: dep.clone(),
                    });
                }
                if let Some(degree) = in_degree.get_mut(name.as_str()) {
                    *degree += 1;
                }
                if let Some(list) = dependents.get_mut(dep.as_str()) {
                    list.push(name.as_str());
                }
            }
        }

        let mut queue: VecDeque<&str> =
            in_degree.iter().filter(|&(_, deg)| *deg == 0).map(|(k, _)| *k).collect();
        let mut result: Vec<&Job> = Vec::with_capacity(self.jobs.len());

        while let Some(current) = queue.pop_front() {
            if let Some(job) = self.jobs.get(current) {
                result.push(job);
            }

            let mut next_batch = Vec::new();
            for dependent in dependents.get(current).cloned().unwrap_or_default() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next_batch.push(dependent);
                    }
                }
            }

            next_batch.sort_unstable();
            queue.extend(next_batch);
        }

        if result.len() != self.jobs.len() {
            let remaining: Vec<&str> =
                in_degree.iter().filter(|&(_, deg)| *deg > 0).map(|(k, _)| *k).collect();
            return Err(AppError::CircularDependency(remaining.join(", ")));
        }

        Ok(result)
    }

    /// Render the `jobs:` map in dependency order.
    pub fn to_yaml(&self) -> Result<String, AppError> {
        let mut jobs = serde_yaml::Mapping::new();
        for job in self.topological_order()? {
            jobs.insert(serde_yaml::Value::String(job.name.clone()), job.to_record()?);
        }
        let mut root = serde_yaml::Mapping::new();
        root.insert(serde_yaml::Value::String("jobs".into()), serde_yaml::Value::Mapping(jobs));
        serde_yaml::to_string(&root)
            .map_err(|e| AppError::InternalError(format!("Failed to render job graph: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::permissions::Permissions;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn job(name: &str, needs: &[&str]) -> Job {
        Job {
            name: name.to_string(),
            needs: needs.iter().map(|s| s.to_string()).collect(),
            condition: None,
            runs_on: "ubuntu-latest".into(),
            permissions: Permissions::new(),
            timeout_minutes: 10,
            outputs: BTreeMap::new(),
            steps: vec![],
        }
    }

    fn names<'a>(jobs: &[&'a Job]) -> Vec<&'a str> {
        jobs.iter().map(|j| j.name.as_str()).collect()
    }

    #[test]
    fn orders_dependencies_first() {
        let mut graph = JobGraph::new(["agent"]);
        graph.add_job(job("add_comment", &["agent", "detection", "create_issue"])).unwrap();
        graph.add_job(job("create_issue", &["agent", "detection"])).unwrap();
        graph.add_job(job("detection", &["agent"])).unwrap();

        let order = graph.topological_order().unwrap();
        assert_eq!(names(&order), ["detection", "create_issue", "add_comment"]);
    }

    #[test]
    fn independent_jobs_are_sorted_by_name() {
        let mut graph = JobGraph::new(["agent"]);
        graph.add_job(job("noop", &["agent"])).unwrap();
        graph.add_job(job("add_labels", &["agent"])).unwrap();
        assert_eq!(names(&graph.topological_order().unwrap()), ["add_labels", "noop"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut graph = JobGraph::new(["agent"]);
        graph.add_job(job("noop", &["agent"])).unwrap();
        assert!(matches!(graph.add_job(job("noop", &[])), Err(AppError::DuplicateJob(_))));
        assert!(matches!(graph.add_job(job("agent", &[])), Err(AppError::DuplicateJob(_))));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut graph = JobGraph::new(["agent"]);
        graph.add_job(job("add_comment", &["agent", "create_issue"])).unwrap();
        let err = graph.topological_order().unwrap_err();
        assert!(matches!(err, AppError::MissingDependency { ref dependency, .. } if dependency == "create_issue"));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = JobGraph::new(["agent"]);
        graph.add_job(job("x", &["y"])).unwrap();
        graph.add_job(job("y", &["x"])).unwrap();
        graph.add_job(job("z", &["agent"])).unwrap();
        match graph.topological_order() {
            Err(AppError::CircularDependency(members)) => assert_eq!(members, "x, y"),
            other => panic!("expected cycle, got {:?}", other.map(|j| names(&j))),
        }
    }

    #[test]
    fn yaml_lists_jobs_in_order() {
        let mut graph = JobGraph::new(["agent"]);
        graph.add_job(job("b", &["a"])).unwrap();
        graph.add_job(job("a", &["agent"])).unwrap();
        let yaml = graph.to_yaml().unwrap();
        let a = yaml.find("  a:").unwrap();
        let b = yaml.find("  b:").unwrap();
        assert!(yaml.starts_with("jobs:\n"));
        assert!(a < b);
    }

    fn graph_strategy(size: usize) -> impl Strategy<Value = JobGraph> {
        prop::collection::btree_set("[a-z]{1,6}", 1..size)
            .prop_flat_map(|names| {
                let names: Vec<String> = names.into_iter().collect();
                let len = names.len();
                let needs = prop::collection::vec(
                    prop::collection::vec(prop::sample::select(names.clone()), 0..len),
                    len,
                );
                (Just(names), needs)
            })
            .prop_map(|(names, needs)| {
                let mut graph = JobGraph::new(["agent"]);
                for (name, deps) in names.iter().zip(needs) {
                    let deps: HashSet<String> = deps.into_iter().filter(|d| d != name).collect();
                    let mut deps: Vec<String> = deps.into_iter().collect();
                    deps.sort();
                    let mut j = job(name, &[]);
                    j.needs = deps;
                    j.needs.push("agent".into());
                    // A generated "agent" collides with the external job and is dropped.
                    let _ = graph.add_job(j);
                }
                graph
            })
    }

    proptest! {
        #[test]
        fn order_respects_every_edge(graph in graph_strategy(10)) {
            match graph.topological_order() {
                Ok(order) => {
                    prop_assert_eq!(order.len(), graph.len());
                    let mut seen: HashSet<&str> = HashSet::new();
                    for job in &order {
                        for dep in &job.needs {
                            if graph.contains(dep) {
                                prop_assert!(seen.contains(dep.as_str()));
                            }
                        }
                        seen.insert(job.name.as_str());
                    }
                }
                Err(AppError::CircularDependency(members)) => prop_assert!(!members.is_empty()),
                Err(e) => prop_assert!(false, "unexpected error: {:?}", e),
            }
        }
    }
}
