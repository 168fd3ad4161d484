use chrono::Utc;
use speculate2::speculate;
use trellis::models::*;
use trellis::relations::{
    score_overlap, similarity_search, validate, IssueCategory, OverlapCandidate,
    OverlapSeverity, Severity, DEFAULT_SIMILARITY_THRESHOLD,
};

fn module(id: &str) -> Module {
    Module {
        id: id.to_string(),
        name: format!("Module {}", id),
        description: None,
        relationships: vec![],
        integration_points: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn feature(module_id: &str, id: &str) -> Feature {
    Feature {
        id: id.to_string(),
        module_id: module_id.to_string(),
        name: format!("Feature {}", id),
        status: FeatureStatus::Proposed,
        priority: Priority::Medium,
        problem_statement: String::new(),
        capability_tags: vec![],
        target_users: vec![],
        goals: vec![],
        in_scope: vec![],
        out_of_scope: vec![],
        execution_dependencies: vec![],
        semantic_relationships: vec![],
        data_contract: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn relate(feature: &mut Feature, kind: RelationKind, target: &str) {
    feature.semantic_relationships.push(SemanticRelationship {
        feature_id: target.to_string(),
        kind,
        description: format!("{} {}", kind.as_str(), target),
    });
}

fn tags(feature: &mut Feature, tags: &[&str]) {
    feature.capability_tags = tags.iter().map(|t| t.to_string()).collect();
}

speculate! {
    describe "validate" {
        it "passes a consistent snapshot with zero issues" {
            let modules = vec![module("core")];
            let mut auth = feature("core", "auth");
            let mut billing = feature("core", "billing");
            relate(&mut auth, RelationKind::IntegratesWith, "billing");
            relate(&mut billing, RelationKind::IntegratesWith, "auth");

            let report = validate(&[auth, billing], &modules);

            assert!(report.valid);
            assert!(report.issues.is_empty());
            assert_eq!(report.stats.feature_count, 2);
            assert_eq!(report.stats.relationship_count, 2);
            assert_eq!(report.stats.orphan_count, 0);
            assert_eq!(report.stats.cycle_count, 0);
        }

        it "flags a dangling semantic target as an error" {
            let mut auth = feature("core", "auth");
            relate(&mut auth, RelationKind::DependsOn, "ghost");

            let report = validate(&[auth], &[module("core")]);

            assert!(!report.valid);
            assert_eq!(report.issues.len(), 1);
            let issue = &report.issues[0];
            assert_eq!(issue.severity, Severity::Error);
            assert_eq!(issue.category, IssueCategory::DanglingReference);
            assert_eq!(issue.feature_ids, vec!["auth"]);
            assert_eq!(
                issue.message,
                "auth declares depends-on toward ghost, which does not exist"
            );
        }

        it "flags a dangling execution dependency as an error" {
            let mut auth = feature("core", "auth");
            auth.execution_dependencies.push(ExecutionDependency {
                feature_id: "ghost".to_string(),
                kind: DependencyKind::Requires,
                reason: None,
            });

            let report = validate(&[auth], &[module("core")]);

            assert!(!report.valid);
            let issue = &report.issues[0];
            assert_eq!(issue.category, IssueCategory::DanglingReference);
            assert_eq!(issue.message, "auth depends on ghost, which does not exist");
        }

        it "flags self references as errors" {
            let mut auth = feature("core", "auth");
            relate(&mut auth, RelationKind::OverlapsWith, "auth");
            auth.execution_dependencies.push(ExecutionDependency {
                feature_id: "auth".to_string(),
                kind: DependencyKind::Requires,
                reason: None,
            });

            let report = validate(&[auth], &[module("core")]);

            assert!(!report.valid);
            assert_eq!(report.issues.len(), 2);
            for issue in &report.issues {
                assert_eq!(issue.severity, Severity::Error);
                assert_eq!(issue.category, IssueCategory::SelfRelationship);
            }
        }

        it "reports a depends-on cycle with its members" {
            let mut auth = feature("core", "auth");
            let mut billing = feature("core", "billing");
            relate(&mut auth, RelationKind::DependsOn, "billing");
            relate(&mut billing, RelationKind::DependsOn, "auth");

            let report = validate(&[auth, billing], &[module("core")]);

            assert!(!report.valid);
            assert_eq!(report.stats.cycle_count, 1);
            let issue = &report.issues[0];
            assert_eq!(issue.category, IssueCategory::CircularDependency);
            assert_eq!(issue.feature_ids, vec!["auth", "billing"]);
            assert_eq!(issue.message, "circular dependency: auth -> billing -> auth");
        }

        it "warns on a one-sided symmetric relationship" {
            let mut auth = feature("core", "auth");
            let billing = feature("core", "billing");
            relate(&mut auth, RelationKind::IntegratesWith, "billing");

            let report = validate(&[auth, billing], &[module("core")]);

            assert!(report.valid);
            assert_eq!(report.issues.len(), 1);
            let issue = &report.issues[0];
            assert_eq!(issue.severity, Severity::Warning);
            assert_eq!(issue.category, IssueCategory::AsymmetricRelationship);
            assert_eq!(issue.feature_ids, vec!["auth", "billing"]);
            assert_eq!(
                issue.message,
                "auth declares integrates-with with billing, but billing does not declare it back"
            );
        }

        it "notes a mismatched inverse only when a reverse edge exists" {
            let mut auth = feature("core", "auth");
            let mut billing = feature("core", "billing");
            relate(&mut auth, RelationKind::ProvidesDataTo, "billing");
            relate(&mut billing, RelationKind::Extends, "auth");

            let report = validate(&[auth, billing], &[module("core")]);

            assert!(report.valid);
            assert_eq!(report.issues.len(), 1);
            let issue = &report.issues[0];
            assert_eq!(issue.severity, Severity::Info);
            assert_eq!(issue.category, IssueCategory::AsymmetricRelationship);
        }

        it "stays quiet about a one-way directional edge" {
            let mut auth = feature("core", "auth");
            let billing = feature("core", "billing");
            relate(&mut auth, RelationKind::ProvidesDataTo, "billing");

            let report = validate(&[auth, billing], &[module("core")]);

            assert!(report.valid);
            assert!(report.issues.is_empty());
        }

        it "accepts a matched data-flow pair" {
            let mut auth = feature("core", "auth");
            let mut billing = feature("core", "billing");
            relate(&mut auth, RelationKind::ProvidesDataTo, "billing");
            relate(&mut billing, RelationKind::ConsumesDataFrom, "auth");

            let report = validate(&[auth, billing], &[module("core")]);

            assert!(report.valid);
            assert!(report.issues.is_empty());
        }

        it "warns on undeclared cross-module relationships" {
            let modules = vec![module("core"), module("ui")];
            let mut auth = feature("core", "auth");
            let mut panel = feature("ui", "panel");
            relate(&mut auth, RelationKind::IntegratesWith, "panel");
            relate(&mut panel, RelationKind::IntegratesWith, "auth");

            let report = validate(&[auth, panel], &modules);

            assert!(report.valid);
            assert_eq!(report.issues.len(), 2);
            let warning = &report.issues[0];
            assert_eq!(warning.severity, Severity::Warning);
            assert_eq!(warning.category, IssueCategory::ModuleBoundary);
            assert_eq!(
                warning.message,
                "auth and panel relate across modules core and ui, but neither module declares the other"
            );
            let info = &report.issues[1];
            assert_eq!(info.severity, Severity::Info);
            assert_eq!(info.category, IssueCategory::ModuleBoundary);
        }

        it "accepts a declared and documented module boundary" {
            let mut core = module("core");
            core.relationships.push(ModuleRelationship {
                module_id: "ui".to_string(),
                description: None,
            });
            core.integration_points.push(IntegrationPoint {
                source_feature_id: "auth".to_string(),
                target_feature_id: "panel".to_string(),
                description: None,
            });
            let mut auth = feature("core", "auth");
            let mut panel = feature("ui", "panel");
            relate(&mut auth, RelationKind::IntegratesWith, "panel");
            relate(&mut panel, RelationKind::IntegratesWith, "auth");

            let report = validate(&[auth, panel], &[core, module("ui")]);

            assert!(report.valid);
            assert!(report.issues.is_empty());
        }

        it "errors on data flows into features that do not exist" {
            let mut auth = feature("core", "auth");
            auth.data_contract = Some(DataContract {
                consumes: vec![DataConsumption {
                    source_feature_id: Some("ghost".to_string()),
                    data_type: "events".to_string(),
                    required: true,
                }],
                produces: vec![],
            });

            let report = validate(&[auth], &[module("core")]);

            assert!(!report.valid);
            assert_eq!(report.issues.len(), 1);
            let issue = &report.issues[0];
            assert_eq!(issue.category, IssueCategory::DataContract);
            assert_eq!(
                issue.message,
                "auth consumes events from ghost, which does not exist"
            );
        }

        it "errors on a production naming a consumer that does not exist" {
            let mut auth = feature("core", "auth");
            auth.data_contract = Some(DataContract {
                consumes: vec![],
                produces: vec![DataProduction {
                    data_type: "events".to_string(),
                    consumer_feature_ids: vec!["ghost".to_string()],
                }],
            });

            let report = validate(&[auth], &[module("core")]);

            assert!(!report.valid);
            assert_eq!(
                report.issues[0].message,
                "auth produces events for ghost, which does not exist"
            );
        }

        it "warns when a consumption is not confirmed by the producer" {
            let mut auth = feature("core", "auth");
            auth.data_contract = Some(DataContract {
                consumes: vec![DataConsumption {
                    source_feature_id: Some("billing".to_string()),
                    data_type: "events".to_string(),
                    required: false,
                }],
                produces: vec![],
            });
            let mut billing = feature("core", "billing");
            billing.data_contract = Some(DataContract {
                consumes: vec![],
                produces: vec![DataProduction {
                    data_type: "reports".to_string(),
                    consumer_feature_ids: vec![],
                }],
            });

            let report = validate(&[auth, billing], &[module("core")]);

            assert!(report.valid);
            assert_eq!(report.issues.len(), 1);
            let issue = &report.issues[0];
            assert_eq!(issue.severity, Severity::Warning);
            assert_eq!(issue.category, IssueCategory::DataContract);
            assert_eq!(issue.feature_ids, vec!["auth", "billing"]);
            assert_eq!(
                issue.message,
                "auth consumes events from billing, but billing does not declare producing it"
            );
        }

        it "warns when a production is not confirmed by the consumer" {
            let mut auth = feature("core", "auth");
            auth.data_contract = Some(DataContract {
                consumes: vec![],
                produces: vec![DataProduction {
                    data_type: "events".to_string(),
                    consumer_feature_ids: vec!["billing".to_string()],
                }],
            });
            let mut billing = feature("core", "billing");
            billing.data_contract = Some(DataContract {
                consumes: vec![DataConsumption {
                    source_feature_id: None,
                    data_type: "reports".to_string(),
                    required: false,
                }],
                produces: vec![],
            });

            let report = validate(&[auth, billing], &[module("core")]);

            assert_eq!(report.issues.len(), 1);
            assert_eq!(
                report.issues[0].message,
                "auth produces events for billing, but billing does not declare consuming it"
            );
        }

        it "accepts data contracts confirmed on both ends" {
            let mut auth = feature("core", "auth");
            auth.data_contract = Some(DataContract {
                consumes: vec![],
                produces: vec![DataProduction {
                    data_type: "events".to_string(),
                    consumer_feature_ids: vec!["billing".to_string()],
                }],
            });
            let mut billing = feature("core", "billing");
            billing.data_contract = Some(DataContract {
                consumes: vec![DataConsumption {
                    source_feature_id: Some("auth".to_string()),
                    data_type: "events".to_string(),
                    required: true,
                }],
                produces: vec![],
            });

            let report = validate(&[auth, billing], &[module("core")]);

            assert!(report.valid);
            assert!(report.issues.is_empty());
        }

        it "notes features with no relationships at all" {
            let lonely = feature("core", "audit");
            let mut auth = feature("core", "auth");
            let mut billing = feature("core", "billing");
            relate(&mut auth, RelationKind::Complements, "billing");
            relate(&mut billing, RelationKind::Complements, "auth");

            let report = validate(&[lonely, auth, billing], &[module("core")]);

            assert!(report.valid);
            assert_eq!(report.stats.orphan_count, 1);
            assert_eq!(report.issues.len(), 1);
            let issue = &report.issues[0];
            assert_eq!(issue.severity, Severity::Info);
            assert_eq!(issue.category, IssueCategory::Orphan);
            assert_eq!(issue.feature_ids, vec!["audit"]);
        }

        it "notes features nested too deeply" {
            let mut features = vec![feature("core", "f0")];
            for index in 1..=5 {
                let mut next = feature("core", &format!("f{}", index));
                relate(&mut next, RelationKind::DependsOn, &format!("f{}", index - 1));
                features.push(next);
            }

            let report = validate(&features, &[module("core")]);

            assert!(report.valid);
            assert_eq!(report.issues.len(), 1);
            let issue = &report.issues[0];
            assert_eq!(issue.severity, Severity::Info);
            assert_eq!(issue.category, IssueCategory::DeepNesting);
            assert_eq!(issue.feature_ids, vec!["f5"]);
            assert_eq!(issue.message, "f5 sits 5 levels deep in its dependency chain");
        }

        it "orders issues by severity tier" {
            let mut auth = feature("core", "auth");
            relate(&mut auth, RelationKind::ConsumesDataFrom, "ghost");
            let mut billing = feature("core", "billing");
            relate(&mut billing, RelationKind::IntegratesWith, "catalog");
            let catalog = feature("core", "catalog");
            let docs = feature("core", "docs");

            let report = validate(&[auth, billing, catalog, docs], &[module("core")]);

            let severities: Vec<Severity> =
                report.issues.iter().map(|issue| issue.severity).collect();
            assert_eq!(
                severities,
                vec![Severity::Error, Severity::Warning, Severity::Info]
            );
        }
    }

    describe "score_overlap" {
        it "stays silent when nothing matches" {
            let candidate = OverlapCandidate {
                name: "Invoice export".to_string(),
                problem_statement: "Teams lose track of invoices".to_string(),
                capability_tags: vec!["billing".to_string()],
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "builds");
            existing.problem_statement = "Engineers wait on slow builds".to_string();
            tags(&mut existing, &["caching"]);

            assert!(score_overlap(&candidate, &[existing]).is_empty());
        }

        it "reports a single shared tag as low risk" {
            let candidate = OverlapCandidate {
                name: "File sync".to_string(),
                problem_statement: "Teams lose track of invoices".to_string(),
                capability_tags: vec!["sync".to_string()],
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "backup");
            existing.problem_statement = "Engineers wait on slow builds".to_string();
            tags(&mut existing, &["sync", "backup"]);

            let results = score_overlap(&candidate, &[existing]);

            assert_eq!(results.len(), 1);
            let result = &results[0];
            assert_eq!(result.severity, OverlapSeverity::Low);
            assert_eq!(result.shared_tags, vec!["sync"]);
            assert_eq!(result.reasons, vec!["1 shared capability tag: sync"]);
            assert_eq!(
                result.recommendations,
                vec!["Review during planning; likely adjacent rather than duplicated."]
            );
        }

        it "raises two shared tags to medium" {
            let candidate = OverlapCandidate {
                name: "File sync".to_string(),
                capability_tags: vec!["sync".to_string(), "offline".to_string()],
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "backup");
            tags(&mut existing, &["sync", "offline"]);

            let results = score_overlap(&candidate, &[existing]);

            let result = &results[0];
            assert_eq!(result.severity, OverlapSeverity::Medium);
            assert_eq!(result.reasons, vec!["2 shared capability tags: offline, sync"]);
            assert_eq!(
                result.recommendations,
                vec!["Document an overlaps-with relationship between the two features."]
            );
        }

        it "treats three shared tags as high risk with a merge recommendation" {
            let candidate = OverlapCandidate {
                name: "File sync".to_string(),
                capability_tags: vec![
                    "sync".to_string(),
                    "offline".to_string(),
                    "export".to_string(),
                ],
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "backup");
            tags(&mut existing, &["sync", "offline", "export"]);

            let results = score_overlap(&candidate, &[existing]);

            let result = &results[0];
            assert_eq!(result.severity, OverlapSeverity::High);
            assert_eq!(result.shared_tags, vec!["export", "offline", "sync"]);
            assert_eq!(
                result.recommendations,
                vec!["Merge these features or differentiate their capability tags."]
            );
        }

        it "flags near-identical problem statements as high risk" {
            let statement = "Users cannot share files across devices";
            let candidate = OverlapCandidate {
                name: "Device sharing".to_string(),
                problem_statement: statement.to_string(),
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "handoff");
            existing.problem_statement = statement.to_string();

            let results = score_overlap(&candidate, &[existing]);

            let result = &results[0];
            assert_eq!(result.severity, OverlapSeverity::High);
            assert_eq!(result.text_similarity, 1.0);
            assert_eq!(result.reasons, vec!["problem statements are 100% similar"]);
            assert_eq!(
                result.recommendations,
                vec!["Treat as a likely duplicate: merge, or state explicitly how they differ."]
            );
        }

        it "raises notably similar problem statements to medium" {
            let candidate = OverlapCandidate {
                name: "Indexing speed".to_string(),
                problem_statement: "Speed up search indexing".to_string(),
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "indexing");
            existing.problem_statement = "Memory use in search indexing".to_string();

            let results = score_overlap(&candidate, &[existing]);

            let result = &results[0];
            assert_eq!(result.severity, OverlapSeverity::Medium);
            assert_eq!(result.text_similarity, 0.5);
            assert_eq!(result.reasons, vec!["problem statements are 50% similar"]);
        }

        it "mentions mild similarity without raising severity" {
            let candidate = OverlapCandidate {
                name: "File sync".to_string(),
                problem_statement: "Sync all files".to_string(),
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "notes");
            existing.problem_statement = "Sync all notes".to_string();

            let results = score_overlap(&candidate, &[existing]);

            let result = &results[0];
            assert_eq!(result.severity, OverlapSeverity::Low);
            assert_eq!(result.reasons, vec!["problem statements are 33% similar"]);
        }

        it "counts shared users as a weak signal on their own" {
            let candidate = OverlapCandidate {
                name: "Audit log".to_string(),
                problem_statement: "Teams lose track of invoices".to_string(),
                target_users: vec!["Admins".to_string()],
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "roles");
            existing.problem_statement = "Engineers wait on slow builds".to_string();
            existing.target_users = vec!["admins".to_string()];

            let results = score_overlap(&candidate, &[existing]);

            let result = &results[0];
            assert_eq!(result.severity, OverlapSeverity::Low);
            assert_eq!(result.shared_users, vec!["admins"]);
            assert_eq!(result.reasons, vec!["shared target users: admins"]);
        }

        it "escalates one step when shared users compound another signal" {
            let candidate = OverlapCandidate {
                name: "Audit log".to_string(),
                capability_tags: vec!["audit".to_string()],
                target_users: vec!["admins".to_string()],
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "roles");
            tags(&mut existing, &["audit"]);
            existing.target_users = vec!["admins".to_string()];

            let results = score_overlap(&candidate, &[existing]);

            assert_eq!(results[0].severity, OverlapSeverity::Medium);
        }

        it "forces high on a scope conflict" {
            let candidate = OverlapCandidate {
                name: "Offline mode".to_string(),
                in_scope: vec!["offline sync".to_string()],
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "sync");
            existing.out_of_scope = vec!["Offline sync".to_string()];

            let results = score_overlap(&candidate, &[existing]);

            let result = &results[0];
            assert_eq!(result.severity, OverlapSeverity::High);
            assert_eq!(result.scope_conflicts.len(), 1);
            assert_eq!(
                result.reasons,
                vec!["scope conflict: \"offline sync\" collides with \"Offline sync\""]
            );
            assert_eq!(
                result.recommendations[0],
                "Review the scope boundaries: one feature builds what the other declares out of scope."
            );
            assert_eq!(
                result.recommendations[1],
                "Consider merging if the boundary is artificial."
            );
        }

        it "amplifies one step within the same module" {
            let candidate = OverlapCandidate {
                name: "File sync".to_string(),
                module_id: Some("core".to_string()),
                capability_tags: vec!["sync".to_string()],
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "backup");
            tags(&mut existing, &["sync"]);

            let results = score_overlap(&candidate, &[existing]);

            let result = &results[0];
            assert!(result.same_module);
            assert_eq!(result.severity, OverlapSeverity::Medium);
            assert_eq!(result.reasons[1], "both live in module core");
        }

        it "never reports module proximity alone" {
            let candidate = OverlapCandidate {
                name: "File sync".to_string(),
                module_id: Some("core".to_string()),
                problem_statement: "Teams lose track of invoices".to_string(),
                ..OverlapCandidate::default()
            };
            let mut existing = feature("core", "backup");
            existing.problem_statement = "Engineers wait on slow builds".to_string();

            assert!(score_overlap(&candidate, &[existing]).is_empty());
        }

        it "sorts stronger findings first" {
            let candidate = OverlapCandidate {
                name: "File sync".to_string(),
                capability_tags: vec![
                    "sync".to_string(),
                    "offline".to_string(),
                    "export".to_string(),
                ],
                ..OverlapCandidate::default()
            };
            let mut duplicate = feature("core", "duplicate");
            tags(&mut duplicate, &["sync", "offline", "export"]);
            let mut adjacent = feature("core", "adjacent");
            tags(&mut adjacent, &["sync"]);

            let results = score_overlap(&candidate, &[adjacent, duplicate]);

            let ids: Vec<&str> = results.iter().map(|r| r.feature_id.as_str()).collect();
            assert_eq!(ids, vec!["duplicate", "adjacent"]);
        }
    }

    describe "similarity_search" {
        it "ranks hits by score with the best first" {
            let query = "sync files across devices offline";
            let mut exact = feature("core", "exact");
            exact.problem_statement = query.to_string();
            let mut partial = feature("core", "partial");
            partial.problem_statement = "sync files quickly".to_string();
            let mut unrelated = feature("core", "unrelated");
            unrelated.problem_statement = "invoice payment reminders".to_string();

            let hits = similarity_search(
                query,
                &[partial, unrelated, exact],
                DEFAULT_SIMILARITY_THRESHOLD,
            );

            assert_eq!(hits.len(), 2);
            assert_eq!(hits[0].feature_id, "exact");
            assert_eq!(hits[0].score, 1.0);
            assert_eq!(hits[1].feature_id, "partial");
        }

        it "drops features below the threshold" {
            let query = "sync files across devices offline";
            let mut exact = feature("core", "exact");
            exact.problem_statement = query.to_string();
            let mut partial = feature("core", "partial");
            partial.problem_statement = "sync files quickly".to_string();

            let hits = similarity_search(query, &[partial, exact], 0.5);

            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].feature_id, "exact");
        }

        it "searches goals and scope phrases, not just the problem statement" {
            let mut archiver = feature("core", "archiver");
            archiver.goals = vec!["export documents as archives".to_string()];

            let hits = similarity_search(
                "export documents as archives",
                &[archiver],
                DEFAULT_SIMILARITY_THRESHOLD,
            );

            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].feature_id, "archiver");
            assert_eq!(hits[0].score, 1.0);
        }

        it "breaks score ties by feature id" {
            let statement = "rotate access tokens hourly";
            let mut first = feature("core", "alpha");
            first.problem_statement = statement.to_string();
            let mut second = feature("core", "beta");
            second.problem_statement = statement.to_string();

            let hits = similarity_search(
                statement,
                &[second, first],
                DEFAULT_SIMILARITY_THRESHOLD,
            );

            let ids: Vec<&str> = hits.iter().map(|hit| hit.feature_id.as_str()).collect();
            assert_eq!(ids, vec!["alpha", "beta"]);
        }
    }
}
