//! Content item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist content items, their content types and variant links.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - Variant links of one item form a set; `add_link` is a set union.
//! - Link order is insertion order.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::audience::AudienceCode;
use crate::model::element::ElementDefinition;
use crate::model::variant::{ItemId, VariantRecord};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT uuid, name, is_base, audience_code FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from item repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target item does not exist.
    NotFound(ItemId),
    /// Content type codename is not registered.
    UnknownContentType(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// A thread panicked while holding the connection.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "content item not found: {id}"),
            Self::UnknownContentType(codename) => {
                write!(f, "content type not registered: {codename}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "item repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
            Self::LockPoisoned => write!(f, "item store connection lock is poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Input for creating a variant item from an existing family member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVariantItem {
    /// Member the variant is derived from; its content type is reused.
    pub source_item_id: ItemId,
    pub name: String,
    pub audience: AudienceCode,
    /// Initial variant links of the new item.
    pub links: Vec<ItemId>,
}

/// Repository interface for content items and their variant links.
pub trait ItemRepository {
    /// Registers (or replaces) one content type and its element list.
    fn register_content_type(
        &self,
        codename: &str,
        name: &str,
        elements: &[ElementDefinition],
    ) -> RepoResult<()>;
    /// Elements of the content type used by `item_id`.
    fn content_type_elements(&self, item_id: ItemId) -> RepoResult<Vec<ElementDefinition>>;
    /// Creates one base content item with no links.
    fn create_base_item(&self, name: &str, content_type: &str) -> RepoResult<VariantRecord>;
    /// Creates one variant item with its initial links.
    fn create_variant_item(&self, item: &NewVariantItem) -> RepoResult<VariantRecord>;
    /// Loads one item, if present.
    fn get_item(&self, item_id: ItemId) -> RepoResult<Option<VariantRecord>>;
    /// Variant links of one item in insertion order.
    fn linked_item_ids(&self, item_id: ItemId) -> RepoResult<Vec<ItemId>>;
    /// Adds `variant_id` to the links of `item_id`; no-op when present.
    fn add_link(&self, item_id: ItemId, variant_id: ItemId) -> RepoResult<()>;
    /// Removes `variant_id` from the links of `item_id`; no-op when absent.
    fn remove_link(&self, item_id: ItemId, variant_id: ItemId) -> RepoResult<()>;
    /// Deletes one item together with its own links.
    fn delete_item(&self, item_id: ItemId) -> RepoResult<()>;
}

/// SQLite-backed item repository.
///
/// Owns its connection behind a mutex so link updates may arrive from
/// parallel workers; statements are serialized on the connection.
pub struct SqliteItemRepository {
    conn: Mutex<Connection>,
}

impl SqliteItemRepository {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Releases the underlying connection.
    pub fn into_inner(self) -> RepoResult<Connection> {
        self.conn.into_inner().map_err(|_| RepoError::LockPoisoned)
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl ItemRepository for SqliteItemRepository {
    fn register_content_type(
        &self,
        codename: &str,
        name: &str,
        elements: &[ElementDefinition],
    ) -> RepoResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO content_types (codename, name) VALUES (?1, ?2)
             ON CONFLICT(codename) DO UPDATE SET name = excluded.name;",
            params![codename, name],
        )?;
        tx.execute(
            "DELETE FROM content_type_elements WHERE content_type = ?1;",
            [codename],
        )?;
        for (position, element) in elements.iter().enumerate() {
            tx.execute(
                "INSERT INTO content_type_elements (content_type, element_id, codename, position)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    codename,
                    element.id.as_str(),
                    element.codename.as_str(),
                    position as i64
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn content_type_elements(&self, item_id: ItemId) -> RepoResult<Vec<ElementDefinition>> {
        let conn = self.conn()?;
        let content_type: String = conn
            .query_row(
                "SELECT content_type FROM items WHERE uuid = ?1;",
                [item_id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound(item_id))?;

        let mut stmt = conn.prepare(
            "SELECT element_id, codename
             FROM content_type_elements
             WHERE content_type = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([content_type])?;
        let mut elements = Vec::new();
        while let Some(row) = rows.next()? {
            elements.push(ElementDefinition::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ));
        }
        Ok(elements)
    }

    fn create_base_item(&self, name: &str, content_type: &str) -> RepoResult<VariantRecord> {
        let conn = self.conn()?;
        ensure_content_type(&conn, content_type)?;

        let record = VariantRecord::base(Uuid::new_v4(), name);
        conn.execute(
            "INSERT INTO items (uuid, name, content_type, is_base, audience_code)
             VALUES (?1, ?2, ?3, 1, NULL);",
            params![record.id.to_string(), record.name.as_str(), content_type],
        )?;
        debug!(
            "event=item_create module=repo status=ok kind=base item_id={}",
            record.id
        );
        Ok(record)
    }

    fn create_variant_item(&self, item: &NewVariantItem) -> RepoResult<VariantRecord> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let content_type: String = tx
            .query_row(
                "SELECT content_type FROM items WHERE uuid = ?1;",
                [item.source_item_id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound(item.source_item_id))?;

        let record = VariantRecord::variant(
            Uuid::new_v4(),
            item.name.as_str(),
            item.audience.clone(),
        );
        tx.execute(
            "INSERT INTO items (uuid, name, content_type, is_base, audience_code)
             VALUES (?1, ?2, ?3, 0, ?4);",
            params![
                record.id.to_string(),
                record.name.as_str(),
                content_type,
                item.audience.as_str()
            ],
        )?;
        for link in &item.links {
            insert_link(&tx, record.id, *link)?;
        }
        tx.commit()?;

        debug!(
            "event=item_create module=repo status=ok kind=variant item_id={} links={}",
            record.id,
            item.links.len()
        );
        Ok(record)
    }

    fn get_item(&self, item_id: ItemId) -> RepoResult<Option<VariantRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([item_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }

        Ok(None)
    }

    fn linked_item_ids(&self, item_id: ItemId) -> RepoResult<Vec<ItemId>> {
        let conn = self.conn()?;
        ensure_item_exists(&conn, item_id)?;

        let mut stmt = conn.prepare(
            "SELECT variant_uuid
             FROM item_variant_links
             WHERE item_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([item_id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            ids.push(parse_uuid(&text, "item_variant_links.variant_uuid")?);
        }
        Ok(ids)
    }

    fn add_link(&self, item_id: ItemId, variant_id: ItemId) -> RepoResult<()> {
        let conn = self.conn()?;
        ensure_item_exists(&conn, item_id)?;
        if insert_link(&conn, item_id, variant_id)? {
            touch_item(&conn, item_id)?;
        }
        Ok(())
    }

    fn remove_link(&self, item_id: ItemId, variant_id: ItemId) -> RepoResult<()> {
        let conn = self.conn()?;
        ensure_item_exists(&conn, item_id)?;
        let removed = conn.execute(
            "DELETE FROM item_variant_links WHERE item_uuid = ?1 AND variant_uuid = ?2;",
            params![item_id.to_string(), variant_id.to_string()],
        )?;
        if removed > 0 {
            touch_item(&conn, item_id)?;
        }
        Ok(())
    }

    fn delete_item(&self, item_id: ItemId) -> RepoResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM items WHERE uuid = ?1;", [item_id.to_string()])?;
        if deleted == 0 {
            return Err(RepoError::NotFound(item_id));
        }
        debug!("event=item_delete module=repo status=ok item_id={item_id}");
        Ok(())
    }
}

/// Inserts one link unless already present. Returns whether a row was added.
fn insert_link(conn: &Connection, item_id: ItemId, variant_id: ItemId) -> RepoResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO item_variant_links (item_uuid, variant_uuid, position)
         VALUES (
            ?1,
            ?2,
            (SELECT COALESCE(MAX(position), -1) + 1 FROM item_variant_links WHERE item_uuid = ?1)
         );",
        params![item_id.to_string(), variant_id.to_string()],
    )?;
    Ok(inserted > 0)
}

fn touch_item(conn: &Connection, item_id: ItemId) -> RepoResult<()> {
    conn.execute(
        "UPDATE items SET updated_at = (strftime('%s', 'now') * 1000) WHERE uuid = ?1;",
        [item_id.to_string()],
    )?;
    Ok(())
}

fn ensure_item_exists(conn: &Connection, item_id: ItemId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE uuid = ?1);",
        [item_id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::NotFound(item_id))
    }
}

fn ensure_content_type(conn: &Connection, codename: &str) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM content_types WHERE codename = ?1);",
        [codename],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::UnknownContentType(codename.to_string()))
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<VariantRecord> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "items.uuid")?;

    let is_base_content = match row.get::<_, i64>("is_base")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_base value `{other}` in items.is_base"
            )));
        }
    };

    let audience = match row.get::<_, Option<String>>("audience_code")? {
        Some(value) => Some(AudienceCode::parse(&value).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid audience code `{value}` in items.audience_code"
            ))
        })?),
        None => None,
    };

    Ok(VariantRecord {
        id,
        name: row.get("name")?,
        audience,
        is_base_content,
    })
}

fn parse_uuid(text: &str, column: &str) -> RepoResult<ItemId> {
    Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}
