//! Persistence adapter: templates stored as JSON documents in SQLite.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::block::new_id;
use crate::clock::Clock;
use crate::error::{PromptError, Result};
use crate::template::{ANONYMOUS_USER, Category, Owner, Template, TemplatePatch};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS prompts (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    doc TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_prompts_created ON prompts(created_at);
CREATE INDEX IF NOT EXISTS idx_prompts_user ON prompts(user_id, created_at);

CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY,
    channel TEXT NOT NULL,
    author_id TEXT NOT NULL,
    author_name TEXT NOT NULL,
    text TEXT NOT NULL,
    tags TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_channel ON chat_messages(channel, created_at);
"#;

/// Newest first; rowid breaks ties between documents created in the same millisecond.
const ORDER: &str = "ORDER BY created_at DESC, rowid DESC";

/// Local document store for templates and chat.
pub struct Database {
    pub(crate) conn: Connection,
    clock: Arc<dyn Clock>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        let conn = Connection::open(path)?;
        info!(path = ?path, "database_opened");
        Self::init(conn, clock)
    }

    #[cfg(test)]
    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, clock)
    }

    fn init(conn: Connection, clock: Arc<dyn Clock>) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        let db = Self { conn, clock };
        db.seed_channels()?;
        Ok(db)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    /// Store a new template. Assigns a fresh id, timestamps and owner.
    ///
    /// Without an owner the template keeps its own attribution, or becomes `anonymous`.
    pub fn create(&self, template: &Template, owner: Option<&Owner>) -> Result<String> {
        let id = new_id();
        let now = self.now();

        let mut doc = template.clone();
        doc.id = id.clone();
        match owner {
            Some(owner) => doc.set_owner(owner),
            None if doc.user_id.is_none() => doc.user_id = Some(ANONYMOUS_USER.to_string()),
            None => {}
        }
        doc.created_at = Some(now);
        doc.updated_at = Some(now);

        let user_id = doc.user_id.clone().unwrap_or_default();
        self.conn.execute(
            "INSERT INTO prompts (id, user_id, created_at, updated_at, doc) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                user_id,
                now.timestamp_millis(),
                now.timestamp_millis(),
                serde_json::to_string(&doc)?
            ],
        )?;
        info!(id = %id, user = %user_id, "prompt_created");
        Ok(id)
    }

    /// Merge `patch` into the stored template owned by `caller`.
    ///
    /// Fails with `NotFound` if there is no such template and with `Forbidden`
    /// if it belongs to someone else; in both cases nothing is written.
    pub fn update(&self, id: &str, patch: &TemplatePatch, caller: &Owner) -> Result<()> {
        let mut doc = self
            .get_by_id(id)?
            .ok_or_else(|| PromptError::NotFound(format!("prompt {}", id)))?;

        if !doc.is_owned_by(&caller.user_id) {
            warn!(
                id,
                owner = ?doc.user_id,
                caller = %caller.user_id,
                "prompt_update_forbidden"
            );
            return Err(PromptError::Forbidden { id: id.to_string() });
        }

        let now = self.now();
        doc.apply(patch.clone());
        doc.set_owner(caller);
        doc.updated_at = Some(now);

        self.conn.execute(
            "UPDATE prompts SET doc = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(&doc)?, now.timestamp_millis(), id],
        )?;
        info!(id, "prompt_updated");
        Ok(())
    }

    /// Remove a template permanently. No ownership check happens here;
    /// callers verify ownership first. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
        info!(id, removed, "prompt_deleted");
        Ok(removed > 0)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Template>> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM prompts WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match doc {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    /// All templates, newest first.
    pub fn get_all(&self) -> Result<Vec<Template>> {
        self.query_docs(&format!("SELECT doc FROM prompts {}", ORDER), [])
    }

    /// Templates whose category list contains `category`, newest first.
    pub fn get_by_category(&self, category: Category) -> Result<Vec<Template>> {
        self.query_docs(
            &format!(
                "SELECT doc FROM prompts WHERE EXISTS (
                    SELECT 1 FROM json_each(prompts.doc, '$.category') WHERE json_each.value = ?1
                ) {}",
                ORDER
            ),
            params![category.label()],
        )
    }

    /// Templates whose tag list contains `tag`, newest first.
    pub fn get_by_tag(&self, tag: &str) -> Result<Vec<Template>> {
        self.query_docs(
            &format!(
                "SELECT doc FROM prompts WHERE EXISTS (
                    SELECT 1 FROM json_each(prompts.doc, '$.tags') WHERE json_each.value = ?1
                ) {}",
                ORDER
            ),
            params![tag],
        )
    }

    /// Templates owned by `user_id`, newest first.
    pub fn get_user_prompts(&self, user_id: &str) -> Result<Vec<Template>> {
        self.query_docs(
            &format!("SELECT doc FROM prompts WHERE user_id = ?1 {}", ORDER),
            params![user_id],
        )
    }

    /// Run a query returning `doc` columns. Rows that fail to parse are skipped.
    fn query_docs<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Template>> {
        let mut stmt = self.conn.prepare(sql)?;
        let docs = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut templates = Vec::with_capacity(docs.len());
        for doc in docs {
            match serde_json::from_str::<Template>(&doc) {
                Ok(t) => templates.push(t),
                Err(e) => warn!(error = %e, "prompt_document_unreadable"),
            }
        }
        debug!(count = templates.len(), "prompts_queried");
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::clock::FixedClock;
    use chrono::{Local, TimeDelta, TimeZone};

    fn setup() -> (Database, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Local.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap(),
        ));
        let db = Database::open_in_memory(clock.clone()).unwrap();
        (db, clock)
    }

    fn template(title: &str, categories: Vec<Category>, tags: &[&str]) -> Template {
        let mut t = Template::new();
        t.title = title.to_string();
        t.description = format!("{} description", title);
        t.blocks = vec![Block::text(title)];
        t.category = categories;
        t.tags = tags.iter().map(|s| s.to_string()).collect();
        t
    }

    #[test]
    fn test_create_assigns_id_timestamps_and_owner() {
        let (db, _clock) = setup();
        let t = template("A", vec![Category::Analysis], &[]);
        let id = db.create(&t, Some(&Owner::new("u1"))).unwrap();
        assert_ne!(id, t.id);

        let stored = db.get_by_id(&id).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.user_id.as_deref(), Some("u1"));
        assert!(stored.created_at.is_some());
        assert_eq!(stored.created_at, stored.updated_at);
        assert_eq!(stored.blocks, t.blocks);
    }

    #[test]
    fn test_create_without_owner_uses_placeholder() {
        let (db, _clock) = setup();
        let id = db.create(&template("A", vec![], &[]), None).unwrap();
        let stored = db.get_by_id(&id).unwrap().unwrap();
        assert_eq!(stored.user_id.as_deref(), Some(ANONYMOUS_USER));
    }

    #[test]
    fn test_update_merges_and_refreshes_updated_at() {
        let (db, clock) = setup();
        let owner = Owner::new("u1");
        let id = db.create(&template("A", vec![], &[]), Some(&owner)).unwrap();

        clock.advance(TimeDelta::minutes(5));
        db.update(&id, &TemplatePatch::title("B"), &owner).unwrap();

        let stored = db.get_by_id(&id).unwrap().unwrap();
        assert_eq!(stored.title, "B");
        assert_eq!(stored.description, "A description");
        assert!(stored.updated_at > stored.created_at);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (db, _clock) = setup();
        let err = db
            .update("nope", &TemplatePatch::title("B"), &Owner::new("u1"))
            .unwrap_err();
        assert!(matches!(err, PromptError::NotFound(_)));
    }

    #[test]
    fn test_update_by_other_user_is_forbidden_and_unchanged() {
        let (db, _clock) = setup();
        let id = db
            .create(&template("A", vec![], &[]), Some(&Owner::new("u1")))
            .unwrap();
        let before = db.get_by_id(&id).unwrap().unwrap();

        let err = db
            .update(&id, &TemplatePatch::title("Hijacked"), &Owner::new("u2"))
            .unwrap_err();
        assert!(matches!(err, PromptError::Forbidden { .. }));
        assert_eq!(db.get_by_id(&id).unwrap().unwrap(), before);
    }

    #[test]
    fn test_delete_is_unconditional() {
        let (db, _clock) = setup();
        let id = db
            .create(&template("A", vec![], &[]), Some(&Owner::new("u1")))
            .unwrap();
        assert!(db.delete(&id).unwrap());
        assert!(db.get_by_id(&id).unwrap().is_none());
        assert!(!db.delete(&id).unwrap());
    }

    #[test]
    fn test_queries_order_newest_first() {
        let (db, clock) = setup();
        let owner = Owner::new("u1");
        db.create(&template("old", vec![], &[]), Some(&owner)).unwrap();
        clock.advance(TimeDelta::seconds(1));
        db.create(&template("mid", vec![], &[]), Some(&owner)).unwrap();
        clock.advance(TimeDelta::seconds(1));
        db.create(&template("new", vec![], &[]), Some(&owner)).unwrap();

        let titles: Vec<_> = db.get_all().unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_same_millisecond_ties_break_by_insertion() {
        let (db, _clock) = setup();
        db.create(&template("first", vec![], &[]), None).unwrap();
        db.create(&template("second", vec![], &[]), None).unwrap();
        let titles: Vec<_> = db.get_all().unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[test]
    fn test_get_by_category_and_tag() {
        let (db, _clock) = setup();
        db.create(
            &template("code", vec![Category::Programming], &["rust", "review"]),
            None,
        )
        .unwrap();
        db.create(
            &template("ads", vec![Category::Marketing, Category::TextGeneration], &["seo"]),
            None,
        )
        .unwrap();

        let programming = db.get_by_category(Category::Programming).unwrap();
        assert_eq!(programming.len(), 1);
        assert_eq!(programming[0].title, "code");

        let text_gen = db.get_by_category(Category::TextGeneration).unwrap();
        assert_eq!(text_gen[0].title, "ads");

        assert_eq!(db.get_by_tag("review").unwrap()[0].title, "code");
        assert!(db.get_by_tag("missing").unwrap().is_empty());
        assert!(db.get_by_category(Category::Education).unwrap().is_empty());
    }

    #[test]
    fn test_get_user_prompts() {
        let (db, _clock) = setup();
        db.create(&template("mine", vec![], &[]), Some(&Owner::new("u1")))
            .unwrap();
        db.create(&template("theirs", vec![], &[]), Some(&Owner::new("u2")))
            .unwrap();

        let mine = db.get_user_prompts("u1").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "mine");
        assert!(db.get_user_prompts("u3").unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.db");
        let clock: Arc<dyn Clock> = Arc::new(crate::clock::SystemClock);

        let id = {
            let db = Database::open(&path, clock.clone()).unwrap();
            db.create(&template("kept", vec![], &[]), None).unwrap()
        };
        let db = Database::open(&path, clock).unwrap();
        assert_eq!(db.get_by_id(&id).unwrap().unwrap().title, "kept");
    }
}
