use chrono::Utc;
use speculate2::speculate;
use trellis::graph::{self, FeatureGraph, GraphError};
use trellis::models::*;

fn feature(id: &str, status: FeatureStatus, deps: &[(&str, DependencyKind)]) -> Feature {
    Feature {
        id: id.to_string(),
        module_id: "core".to_string(),
        name: format!("Feature {}", id),
        status,
        priority: Priority::Medium,
        problem_statement: format!("Problem solved by {}", id),
        capability_tags: vec![],
        target_users: vec![],
        goals: vec![],
        in_scope: vec![],
        out_of_scope: vec![],
        execution_dependencies: deps
            .iter()
            .map(|(target, kind)| ExecutionDependency {
                feature_id: target.to_string(),
                kind: *kind,
                reason: None,
            })
            .collect(),
        semantic_relationships: vec![],
        data_contract: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A feature whose every dependency is a hard `requires` edge.
fn requires(id: &str, status: FeatureStatus, deps: &[&str]) -> Feature {
    let deps: Vec<(&str, DependencyKind)> = deps
        .iter()
        .map(|target| (*target, DependencyKind::Requires))
        .collect();
    feature(id, status, &deps)
}

speculate! {
    describe "build" {
        it "resolves hard edges in both directions" {
            let features = vec![
                requires("auth", FeatureStatus::Proposed, &[]),
                requires("billing", FeatureStatus::Proposed, &["auth"]),
            ];

            let graph = FeatureGraph::build(&features);

            let auth = graph.get("auth").expect("auth missing");
            assert!(auth.dependencies.is_empty());
            assert_eq!(auth.dependents, vec!["billing"]);

            let billing = graph.get("billing").expect("billing missing");
            assert_eq!(billing.dependencies, vec!["auth"]);
            assert!(billing.dependents.is_empty());
        }

        it "keeps related edges out of the scheduling graph" {
            let features = vec![
                requires("auth", FeatureStatus::Proposed, &[]),
                feature("billing", FeatureStatus::Proposed, &[("auth", DependencyKind::Related)]),
            ];

            let graph = FeatureGraph::build(&features);

            assert!(graph.get("billing").unwrap().dependencies.is_empty());
            assert!(graph.get("auth").unwrap().dependents.is_empty());
        }

        it "keeps a dangling target on the forward edge only" {
            let features = vec![requires("billing", FeatureStatus::Proposed, &["ghost"])];

            let graph = FeatureGraph::build(&features);

            assert_eq!(graph.get("billing").unwrap().dependencies, vec!["ghost"]);
            assert!(graph.get("ghost").is_none());
            assert_eq!(graph.len(), 1);
        }
    }

    describe "depths" {
        it "grows by one along a chain" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["b"]),
                requires("d", FeatureStatus::Proposed, &["c"]),
            ];

            let graph = FeatureGraph::build(&features);

            assert_eq!(graph.get("a").unwrap().depth, 0);
            assert_eq!(graph.get("b").unwrap().depth, 1);
            assert_eq!(graph.get("c").unwrap().depth, 2);
            assert_eq!(graph.get("d").unwrap().depth, 3);
        }

        it "takes the longest arm of a diamond" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["a"]),
                requires("d", FeatureStatus::Proposed, &["b", "c"]),
            ];

            let graph = FeatureGraph::build(&features);

            assert_eq!(graph.get("d").unwrap().depth, 2);
        }

        it "ignores edges to features outside the snapshot" {
            let features = vec![requires("a", FeatureStatus::Proposed, &["ghost"])];

            let graph = FeatureGraph::build(&features);

            assert_eq!(graph.get("a").unwrap().depth, 0);
        }

        it "leaves cycle members and their dependents at depth zero" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &["b"]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["a"]),
            ];

            let graph = FeatureGraph::build(&features);

            assert_eq!(graph.get("a").unwrap().depth, 0);
            assert_eq!(graph.get("b").unwrap().depth, 0);
            assert_eq!(graph.get("c").unwrap().depth, 0);
        }
    }

    describe "detect_cycles" {
        it "returns nothing for an acyclic graph" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["a"]),
                requires("d", FeatureStatus::Proposed, &["b", "c"]),
            ];

            assert!(FeatureGraph::build(&features).detect_cycles().is_empty());
        }

        it "finds a three-feature cycle closed on its start" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &["b"]),
                requires("b", FeatureStatus::Proposed, &["c"]),
                requires("c", FeatureStatus::Proposed, &["a"]),
            ];

            let cycles = FeatureGraph::build(&features).detect_cycles();

            assert_eq!(cycles, vec![vec!["a", "b", "c", "a"]]);
        }

        it "reports a self-dependency as a one-feature cycle" {
            let features = vec![requires("a", FeatureStatus::Proposed, &["a"])];

            let cycles = FeatureGraph::build(&features).detect_cycles();

            assert_eq!(cycles, vec![vec!["a", "a"]]);
        }

        it "finds exactly one cycle for a single back edge" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &["d"]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["b"]),
                requires("d", FeatureStatus::Proposed, &["c"]),
            ];

            let cycles = FeatureGraph::build(&features).detect_cycles();

            assert_eq!(cycles, vec![vec!["a", "d", "c", "b", "a"]]);
        }

        it "finds cycles in disconnected components" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &["b"]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("x", FeatureStatus::Proposed, &["y"]),
                requires("y", FeatureStatus::Proposed, &["x"]),
            ];

            let cycles = FeatureGraph::build(&features).detect_cycles();

            assert_eq!(cycles.len(), 2);
        }

        it "never closes a cycle through a dangling target" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &["ghost"]),
                requires("b", FeatureStatus::Proposed, &["a"]),
            ];

            assert!(FeatureGraph::build(&features).detect_cycles().is_empty());
        }
    }

    describe "longest_path_to" {
        it "walks the whole chain in execution order" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["b"]),
            ];

            let path = FeatureGraph::build(&features)
                .longest_path_to("c")
                .expect("path failed");

            assert_eq!(path, vec!["a", "b", "c"]);
        }

        it "matches depth plus one on an acyclic graph" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["a"]),
                requires("d", FeatureStatus::Proposed, &["b", "c"]),
            ];

            let graph = FeatureGraph::build(&features);
            let path = graph.longest_path_to("d").expect("path failed");

            assert_eq!(path.len(), graph.get("d").unwrap().depth + 1);
        }

        it "breaks depth ties toward the smaller id" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("x", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["x"]),
                requires("d", FeatureStatus::Proposed, &["b", "c"]),
            ];

            let path = FeatureGraph::build(&features)
                .longest_path_to("d")
                .expect("path failed");

            assert_eq!(path, vec!["a", "b", "d"]);
        }

        it "stops instead of looping on cyclic input" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &["b"]),
                requires("b", FeatureStatus::Proposed, &["a"]),
            ];

            let path = FeatureGraph::build(&features)
                .longest_path_to("a")
                .expect("path failed");

            assert_eq!(path, vec!["b", "a"]);
        }

        it "fails for an unknown feature" {
            let features = vec![requires("a", FeatureStatus::Proposed, &[])];

            let result = FeatureGraph::build(&features).longest_path_to("ghost");

            assert_eq!(result, Err(GraphError::FeatureNotFound("ghost".to_string())));
        }
    }

    describe "ready_features" {
        it "includes features with no dependencies" {
            let features = vec![requires("a", FeatureStatus::Proposed, &[])];

            let ready = FeatureGraph::build(&features).ready_features();

            assert_eq!(ready, vec!["a"]);
        }

        it "includes features whose every dependency is completed" {
            let features = vec![
                requires("a", FeatureStatus::Completed, &[]),
                requires("b", FeatureStatus::Planned, &["a"]),
            ];

            let ready = FeatureGraph::build(&features).ready_features();

            assert_eq!(ready, vec!["b"]);
        }

        it "excludes completed features" {
            let features = vec![requires("a", FeatureStatus::Completed, &[])];

            assert!(FeatureGraph::build(&features).ready_features().is_empty());
        }

        it "excludes features with incomplete dependencies" {
            let features = vec![
                requires("a", FeatureStatus::InProgress, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
            ];

            let ready = FeatureGraph::build(&features).ready_features();

            assert_eq!(ready, vec!["a"]);
        }

        it "excludes features with dangling dependencies" {
            let features = vec![requires("a", FeatureStatus::Proposed, &["ghost"])];

            assert!(FeatureGraph::build(&features).ready_features().is_empty());
        }

        it "does not let a related edge hold a feature back" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                feature("b", FeatureStatus::Proposed, &[("a", DependencyKind::Related)]),
            ];

            let ready = FeatureGraph::build(&features).ready_features();

            assert_eq!(ready, vec!["a", "b"]);
        }
    }

    describe "blocked_features" {
        it "maps each blocked feature to its incomplete dependencies" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Completed, &[]),
                requires("c", FeatureStatus::Proposed, &["a", "b"]),
            ];

            let blocked = FeatureGraph::build(&features).blocked_features();

            assert_eq!(blocked.len(), 1);
            assert_eq!(blocked.get("c"), Some(&vec!["a".to_string()]));
        }

        it "treats dangling dependencies as blockers" {
            let features = vec![requires("a", FeatureStatus::Proposed, &["ghost"])];

            let blocked = FeatureGraph::build(&features).blocked_features();

            assert_eq!(blocked.get("a"), Some(&vec!["ghost".to_string()]));
        }

        it "is empty when every dependency is completed" {
            let features = vec![
                requires("a", FeatureStatus::Completed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
            ];

            assert!(FeatureGraph::build(&features).blocked_features().is_empty());
        }
    }

    describe "count_downstream_blocked" {
        it "counts direct and transitive dependents" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Proposed, &["b"]),
                requires("d", FeatureStatus::Proposed, &["b"]),
            ];

            let graph = FeatureGraph::build(&features);

            assert_eq!(graph.count_downstream_blocked("a").unwrap(), 3);
            assert_eq!(graph.count_downstream_blocked("b").unwrap(), 2);
            assert_eq!(graph.count_downstream_blocked("d").unwrap(), 0);
        }

        it "never counts the feature itself inside a cycle" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &["b"]),
                requires("b", FeatureStatus::Proposed, &["a"]),
            ];

            let graph = FeatureGraph::build(&features);

            assert_eq!(graph.count_downstream_blocked("a").unwrap(), 1);
        }

        it "fails for an unknown feature" {
            let features = vec![requires("a", FeatureStatus::Proposed, &[])];

            let result = FeatureGraph::build(&features).count_downstream_blocked("ghost");

            assert_eq!(result, Err(GraphError::FeatureNotFound("ghost".to_string())));
        }
    }

    describe "critical_path" {
        it "reports the chain in execution order with incomplete steps" {
            let features = vec![
                requires("a", FeatureStatus::Completed, &[]),
                requires("b", FeatureStatus::InProgress, &["a"]),
                requires("c", FeatureStatus::Proposed, &["b"]),
            ];

            let report = graph::critical_path(&features, "c").expect("report failed");

            assert_eq!(report.target_id, "c");
            assert_eq!(report.length, 3);
            let ids: Vec<&str> = report.steps.iter().map(|s| s.feature_id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
            assert_eq!(report.incomplete, vec!["b", "c"]);
            assert!(report.cycles.is_empty());
        }

        it "carries cycle findings without failing the call" {
            let features = vec![
                requires("t", FeatureStatus::Proposed, &[]),
                requires("x", FeatureStatus::Proposed, &["y"]),
                requires("y", FeatureStatus::Proposed, &["x"]),
            ];

            let report = graph::critical_path(&features, "t").expect("report failed");

            assert_eq!(report.length, 1);
            assert_eq!(report.cycles.len(), 1);
        }

        it "fails for an unknown target" {
            let features = vec![requires("a", FeatureStatus::Proposed, &[])];

            let result = graph::critical_path(&features, "ghost");

            assert_eq!(result, Err(GraphError::FeatureNotFound("ghost".to_string())));
        }
    }

    describe "recommend_next" {
        it "only recommends ready features" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &["a"]),
                requires("c", FeatureStatus::Completed, &[]),
            ];

            let recommendations = graph::recommend_next(&features);

            assert_eq!(recommendations.len(), 1);
            assert_eq!(recommendations[0].feature_id, "a");
        }

        it "ranks higher priority first" {
            let mut low = requires("a", FeatureStatus::Proposed, &[]);
            low.priority = Priority::Low;
            let mut critical = requires("b", FeatureStatus::Proposed, &[]);
            critical.priority = Priority::Critical;

            let recommendations = graph::recommend_next(&[low, critical]);

            assert_eq!(recommendations[0].feature_id, "b");
            assert_eq!(recommendations[1].feature_id, "a");
        }

        it "breaks priority ties by downstream impact" {
            let features = vec![
                requires("a", FeatureStatus::Proposed, &[]),
                requires("b", FeatureStatus::Proposed, &[]),
                requires("c", FeatureStatus::Proposed, &["a"]),
                requires("d", FeatureStatus::Proposed, &["a"]),
            ];

            let recommendations = graph::recommend_next(&features);

            assert_eq!(recommendations.len(), 2);
            assert_eq!(recommendations[0].feature_id, "a");
            assert_eq!(recommendations[0].downstream_blocked, 2);
            assert_eq!(recommendations[1].feature_id, "b");
        }

        it "explains why each feature was picked" {
            let mut root = requires("a", FeatureStatus::Proposed, &[]);
            root.priority = Priority::Critical;
            let blocked = requires("b", FeatureStatus::Proposed, &["a"]);

            let recommendations = graph::recommend_next(&[root, blocked]);

            let reasons = &recommendations[0].reasons;
            assert_eq!(reasons[0], "every dependency is completed");
            assert!(reasons.contains(&"critical priority".to_string()));
            assert!(reasons.contains(&"unblocks 1 downstream feature".to_string()));
        }

        it "returns nothing when nothing is ready" {
            let features = vec![
                requires("a", FeatureStatus::Completed, &[]),
                requires("b", FeatureStatus::Proposed, &["ghost"]),
            ];

            assert!(graph::recommend_next(&features).is_empty());
        }
    }
}
