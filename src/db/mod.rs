mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::*;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "trellis")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("trellis.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Module operations
    // ============================================================

    pub fn get_all_modules(&self) -> Result<Vec<Module>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, relationships, integration_points, created_at, updated_at
             FROM modules ORDER BY name",
        )?;

        let modules = stmt
            .query_map([], row_to_module)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(modules)
    }

    pub fn get_module(&self, id: &str) -> Result<Option<Module>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, relationships, integration_points, created_at, updated_at
             FROM modules WHERE id = ?",
        )?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_module(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn create_module(&self, input: CreateModuleInput) -> Result<Module> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO modules (id, name, description, relationships, integration_points, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                &id,
                &input.name,
                &input.description,
                serde_json::to_string(&input.relationships)?,
                serde_json::to_string(&input.integration_points)?,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Module {
            id,
            name: input.name,
            description: input.description,
            relationships: input.relationships,
            integration_points: input.integration_points,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_module(&self, id: &str, input: UpdateModuleInput) -> Result<Option<Module>> {
        let Some(existing) = self.get_module(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let relationships = input.relationships.unwrap_or(existing.relationships);
        let integration_points = input
            .integration_points
            .unwrap_or(existing.integration_points);

        conn.execute(
            "UPDATE modules SET name = ?, description = ?, relationships = ?, integration_points = ?, updated_at = ?
             WHERE id = ?",
            (
                &name,
                &description,
                serde_json::to_string(&relationships)?,
                serde_json::to_string(&integration_points)?,
                now.to_rfc3339(),
                id,
            ),
        )?;

        Ok(Some(Module {
            id: id.to_string(),
            name,
            description,
            relationships,
            integration_points,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    /// Deletes a module and, through the schema's cascade, every feature
    /// it owns.
    pub fn delete_module(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM modules WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Feature operations
    // ============================================================

    pub fn get_all_features(&self) -> Result<Vec<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, module_id, name, status, priority, problem_statement,
                    capability_tags, target_users, goals, in_scope, out_of_scope,
                    execution_dependencies, semantic_relationships, data_contract,
                    created_at, updated_at
             FROM features ORDER BY name",
        )?;

        let features = stmt
            .query_map([], row_to_feature)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    pub fn get_features_by_module(&self, module_id: &str) -> Result<Vec<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, module_id, name, status, priority, problem_statement,
                    capability_tags, target_users, goals, in_scope, out_of_scope,
                    execution_dependencies, semantic_relationships, data_contract,
                    created_at, updated_at
             FROM features WHERE module_id = ? ORDER BY name",
        )?;

        let features = stmt
            .query_map([module_id], row_to_feature)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    pub fn get_feature(&self, id: &str) -> Result<Option<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, module_id, name, status, priority, problem_statement,
                    capability_tags, target_users, goals, in_scope, out_of_scope,
                    execution_dependencies, semantic_relationships, data_contract,
                    created_at, updated_at
             FROM features WHERE id = ?",
        )?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_feature(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn create_feature(&self, input: CreateFeatureInput) -> Result<Feature> {
        // Verify the owning module exists
        self.get_module(&input.module_id)?
            .ok_or_else(|| anyhow::anyhow!("Module not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = input.status.unwrap_or(FeatureStatus::Proposed);
        let priority = input.priority.unwrap_or(Priority::Medium);
        let data_contract_json = match &input.data_contract {
            Some(contract) => Some(serde_json::to_string(contract)?),
            None => None,
        };

        conn.execute(
            "INSERT INTO features (id, module_id, name, status, priority, problem_statement,
                                   capability_tags, target_users, goals, in_scope, out_of_scope,
                                   execution_dependencies, semantic_relationships, data_contract,
                                   created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                &id,
                &input.module_id,
                &input.name,
                status.as_str(),
                priority.as_str(),
                &input.problem_statement,
                serde_json::to_string(&input.capability_tags)?,
                serde_json::to_string(&input.target_users)?,
                serde_json::to_string(&input.goals)?,
                serde_json::to_string(&input.in_scope)?,
                serde_json::to_string(&input.out_of_scope)?,
                serde_json::to_string(&input.execution_dependencies)?,
                serde_json::to_string(&input.semantic_relationships)?,
                &data_contract_json,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Feature {
            id,
            module_id: input.module_id,
            name: input.name,
            status,
            priority,
            problem_statement: input.problem_statement,
            capability_tags: input.capability_tags,
            target_users: input.target_users,
            goals: input.goals,
            in_scope: input.in_scope,
            out_of_scope: input.out_of_scope,
            execution_dependencies: input.execution_dependencies,
            semantic_relationships: input.semantic_relationships,
            data_contract: input.data_contract,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_feature(&self, id: &str, input: UpdateFeatureInput) -> Result<Option<Feature>> {
        let Some(existing) = self.get_feature(id)? else {
            return Ok(None);
        };

        // Moving a feature requires the destination module to exist
        if let Some(module_id) = &input.module_id {
            self.get_module(module_id)?
                .ok_or_else(|| anyhow::anyhow!("Module not found"))?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let module_id = input.module_id.unwrap_or(existing.module_id);
        let name = input.name.unwrap_or(existing.name);
        let status = input.status.unwrap_or(existing.status);
        let priority = input.priority.unwrap_or(existing.priority);
        let problem_statement = input.problem_statement.unwrap_or(existing.problem_statement);
        let capability_tags = input.capability_tags.unwrap_or(existing.capability_tags);
        let target_users = input.target_users.unwrap_or(existing.target_users);
        let goals = input.goals.unwrap_or(existing.goals);
        let in_scope = input.in_scope.unwrap_or(existing.in_scope);
        let out_of_scope = input.out_of_scope.unwrap_or(existing.out_of_scope);
        let execution_dependencies = input
            .execution_dependencies
            .unwrap_or(existing.execution_dependencies);
        let semantic_relationships = input
            .semantic_relationships
            .unwrap_or(existing.semantic_relationships);
        let data_contract = input.data_contract.or(existing.data_contract);
        let data_contract_json = match &data_contract {
            Some(contract) => Some(serde_json::to_string(contract)?),
            None => None,
        };

        conn.execute(
            "UPDATE features SET module_id = ?, name = ?, status = ?, priority = ?,
                                 problem_statement = ?, capability_tags = ?, target_users = ?,
                                 goals = ?, in_scope = ?, out_of_scope = ?,
                                 execution_dependencies = ?, semantic_relationships = ?,
                                 data_contract = ?, updated_at = ?
             WHERE id = ?",
            (
                &module_id,
                &name,
                status.as_str(),
                priority.as_str(),
                &problem_statement,
                serde_json::to_string(&capability_tags)?,
                serde_json::to_string(&target_users)?,
                serde_json::to_string(&goals)?,
                serde_json::to_string(&in_scope)?,
                serde_json::to_string(&out_of_scope)?,
                serde_json::to_string(&execution_dependencies)?,
                serde_json::to_string(&semantic_relationships)?,
                &data_contract_json,
                now.to_rfc3339(),
                id,
            ),
        )?;

        Ok(Some(Feature {
            id: id.to_string(),
            module_id,
            name,
            status,
            priority,
            problem_statement,
            capability_tags,
            target_users,
            goals,
            in_scope,
            out_of_scope,
            execution_dependencies,
            semantic_relationships,
            data_contract,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_feature(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM features WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Issue operations
    // ============================================================

    pub fn get_all_issues(&self) -> Result<Vec<Issue>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, feature_id, title, description, status, created_at, updated_at
             FROM issues ORDER BY created_at DESC",
        )?;

        let issues = stmt
            .query_map([], row_to_issue)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(issues)
    }

    pub fn get_issues_by_feature(&self, feature_id: &str) -> Result<Vec<Issue>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, feature_id, title, description, status, created_at, updated_at
             FROM issues WHERE feature_id = ? ORDER BY created_at DESC",
        )?;

        let issues = stmt
            .query_map([feature_id], row_to_issue)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(issues)
    }

    pub fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, feature_id, title, description, status, created_at, updated_at
             FROM issues WHERE id = ?",
        )?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_issue(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn create_issue(&self, input: CreateIssueInput) -> Result<Issue> {
        // A linked issue must point at a real feature
        if let Some(feature_id) = &input.feature_id {
            self.get_feature(feature_id)?
                .ok_or_else(|| anyhow::anyhow!("Feature not found"))?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO issues (id, feature_id, title, description, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                &id,
                &input.feature_id,
                &input.title,
                &input.description,
                IssueStatus::Open.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Issue {
            id,
            feature_id: input.feature_id,
            title: input.title,
            description: input.description,
            status: IssueStatus::Open,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_issue(&self, id: &str, input: UpdateIssueInput) -> Result<Option<Issue>> {
        let Some(existing) = self.get_issue(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let description = input.description.or(existing.description);
        let status = input.status.unwrap_or(existing.status);

        conn.execute(
            "UPDATE issues SET title = ?, description = ?, status = ?, updated_at = ? WHERE id = ?",
            (&title, &description, status.as_str(), now.to_rfc3339(), id),
        )?;

        Ok(Some(Issue {
            id: id.to_string(),
            feature_id: existing.feature_id,
            title,
            description,
            status,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_issue(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM issues WHERE id = ?", [id])?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn row_to_module(row: &rusqlite::Row) -> rusqlite::Result<Module> {
    Ok(Module {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        relationships: serde_json::from_str(&row.get::<_, String>(3)?).unwrap_or_default(),
        integration_points: serde_json::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn row_to_feature(row: &rusqlite::Row) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        module_id: row.get(1)?,
        name: row.get(2)?,
        status: FeatureStatus::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(FeatureStatus::Proposed),
        priority: Priority::from_str(&row.get::<_, String>(4)?).unwrap_or(Priority::Medium),
        problem_statement: row.get(5)?,
        capability_tags: serde_json::from_str(&row.get::<_, String>(6)?).unwrap_or_default(),
        target_users: serde_json::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
        goals: serde_json::from_str(&row.get::<_, String>(8)?).unwrap_or_default(),
        in_scope: serde_json::from_str(&row.get::<_, String>(9)?).unwrap_or_default(),
        out_of_scope: serde_json::from_str(&row.get::<_, String>(10)?).unwrap_or_default(),
        execution_dependencies: serde_json::from_str(&row.get::<_, String>(11)?)
            .unwrap_or_default(),
        semantic_relationships: serde_json::from_str(&row.get::<_, String>(12)?)
            .unwrap_or_default(),
        data_contract: row
            .get::<_, Option<String>>(13)?
            .and_then(|json| serde_json::from_str(&json).ok()),
        created_at: parse_datetime(row.get::<_, String>(14)?),
        updated_at: parse_datetime(row.get::<_, String>(15)?),
    })
}

fn row_to_issue(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        feature_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: IssueStatus::from_str(&row.get::<_, String>(4)?).unwrap_or(IssueStatus::Open),
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
