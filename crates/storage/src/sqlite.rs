use rusqlite::{Connection, OptionalExtension};

use curate_core::{
    clock::parse_timestamp,
    ids::{ItemId, ReviewId},
    records::{CommentRecord, EditRecord, StatusRecord},
    status::ReviewStatus,
};

use crate::error::StorageError;
use crate::traits::RemoteStore;

const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Remote persistence backed by a SQLite database. The store stamps
/// `updated_at` itself on every write.
pub struct SqliteRemoteStore {
    conn: Connection,
}

impl SqliteRemoteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn get_status(
        &self,
        review_id: &ReviewId,
        item_id: &ItemId,
    ) -> Result<Option<StatusRecord>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT status, updated_at FROM content_reviews WHERE review_id = ?1 AND item_id = ?2",
                rusqlite::params![review_id.as_str(), item_id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        row.map(|(status, updated_at)| {
            read_status(review_id.as_str(), item_id.as_str().to_string(), status, updated_at)
        })
        .transpose()
    }

    pub fn get_edit(
        &self,
        review_id: &ReviewId,
        item_id: &ItemId,
    ) -> Result<Option<EditRecord>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT item_id, title, category, description, link, updated_at FROM content_edits WHERE review_id = ?1 AND item_id = ?2",
                rusqlite::params![review_id.as_str(), item_id.as_str()],
                edit_row,
            )
            .optional()?;
        row.map(|raw| raw.into_record(review_id)).transpose()
    }

    pub fn count_rows(&self, table: Table) -> Result<u64, StorageError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Reviews,
    Edits,
    Comments,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reviews => "content_reviews",
            Self::Edits => "content_edits",
            Self::Comments => "content_comments",
        }
    }
}

fn read_status(
    review_id: &str,
    item_id: String,
    status: String,
    updated_at: String,
) -> Result<StatusRecord, StorageError> {
    Ok(StatusRecord {
        review_id: ReviewId::new(review_id),
        item_id: ItemId::new(item_id),
        status: ReviewStatus::parse(&status)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

struct RawEdit {
    item_id: String,
    title: Option<String>,
    category: Option<String>,
    description: Option<String>,
    link: Option<String>,
    updated_at: String,
}

impl RawEdit {
    fn into_record(self, review_id: &ReviewId) -> Result<EditRecord, StorageError> {
        Ok(EditRecord {
            review_id: review_id.clone(),
            item_id: ItemId::new(self.item_id),
            title: self.title,
            category: self.category,
            description: self.description,
            link: self.link,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn edit_row(row: &rusqlite::Row) -> rusqlite::Result<RawEdit> {
    Ok(RawEdit {
        item_id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        link: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl RemoteStore for SqliteRemoteStore {
    fn fetch_statuses(&self, review_id: &ReviewId) -> Result<Vec<StatusRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, status, updated_at FROM content_reviews WHERE review_id = ?1 ORDER BY item_id",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![review_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(item_id, status, updated_at)| {
                read_status(review_id.as_str(), item_id, status, updated_at)
            })
            .collect()
    }

    fn fetch_edits(&self, review_id: &ReviewId) -> Result<Vec<EditRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, title, category, description, link, updated_at FROM content_edits WHERE review_id = ?1 ORDER BY item_id",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![review_id.as_str()], edit_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|raw| raw.into_record(review_id))
            .collect()
    }

    fn fetch_comments(&self, review_id: &ReviewId) -> Result<Vec<CommentRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, comment, updated_at FROM content_comments WHERE review_id = ?1 ORDER BY item_id",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![review_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(item_id, comment, updated_at)| {
                Ok(CommentRecord {
                    review_id: review_id.clone(),
                    item_id: ItemId::new(item_id),
                    comment,
                    updated_at: parse_timestamp(&updated_at)?,
                })
            })
            .collect()
    }

    fn upsert_status(&mut self, record: &StatusRecord) -> Result<StatusRecord, StorageError> {
        let sql = format!(
            "INSERT INTO content_reviews (review_id, item_id, status) VALUES (?1, ?2, ?3)
             ON CONFLICT(review_id, item_id) DO UPDATE SET status = excluded.status, updated_at = {NOW_SQL}
             RETURNING updated_at"
        );
        let updated_at: String = self.conn.query_row(
            &sql,
            rusqlite::params![
                record.review_id.as_str(),
                record.item_id.as_str(),
                record.status.as_str(),
            ],
            |row| row.get(0),
        )?;
        tracing::debug!(item = %record.item_id, status = %record.status, "status row upserted");

        Ok(StatusRecord {
            updated_at: parse_timestamp(&updated_at)?,
            ..record.clone()
        })
    }

    fn upsert_edit(&mut self, record: &EditRecord) -> Result<EditRecord, StorageError> {
        let sql = format!(
            "INSERT INTO content_edits (review_id, item_id, title, category, description, link) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(review_id, item_id) DO UPDATE SET title = excluded.title, category = excluded.category, description = excluded.description, link = excluded.link, updated_at = {NOW_SQL}
             RETURNING updated_at"
        );
        let updated_at: String = self.conn.query_row(
            &sql,
            rusqlite::params![
                record.review_id.as_str(),
                record.item_id.as_str(),
                record.title,
                record.category,
                record.description,
                record.link,
            ],
            |row| row.get(0),
        )?;
        tracing::debug!(item = %record.item_id, "edit row upserted");

        Ok(EditRecord {
            updated_at: parse_timestamp(&updated_at)?,
            ..record.clone()
        })
    }

    fn upsert_comment(&mut self, record: &CommentRecord) -> Result<CommentRecord, StorageError> {
        let sql = format!(
            "INSERT INTO content_comments (review_id, item_id, comment) VALUES (?1, ?2, ?3)
             ON CONFLICT(review_id, item_id) DO UPDATE SET comment = excluded.comment, updated_at = {NOW_SQL}
             RETURNING updated_at"
        );
        let updated_at: String = self.conn.query_row(
            &sql,
            rusqlite::params![
                record.review_id.as_str(),
                record.item_id.as_str(),
                record.comment,
            ],
            |row| row.get(0),
        )?;
        tracing::debug!(item = %record.item_id, "comment row upserted");

        Ok(CommentRecord {
            updated_at: parse_timestamp(&updated_at)?,
            ..record.clone()
        })
    }

    fn delete_edit(&mut self, review_id: &ReviewId, item_id: &ItemId) -> Result<(), StorageError> {
        let removed = self.conn.execute(
            "DELETE FROM content_edits WHERE review_id = ?1 AND item_id = ?2",
            rusqlite::params![review_id.as_str(), item_id.as_str()],
        )?;
        tracing::debug!(item = %item_id, removed, "edit row deleted");
        Ok(())
    }
}
