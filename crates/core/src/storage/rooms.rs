//! Room storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, parse_uuid_opt, OptionalExt};
use crate::error::Result;
use crate::models::{RoomRecord, RoomSettings};

const ROOM_COLUMNS: &str = "id, name, hashed_password, hidden, creator_id, created_at";

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<RoomRecord> {
        Ok(RoomRecord {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            name: row.get(1)?,
            hashed_password: row.get(2)?,
            settings: RoomSettings {
                hidden: row.get::<_, i32>(3)? != 0,
            },
            creator_id: parse_uuid_opt(row.get::<_, Option<String>>(4)?)?,
            created_at: parse_datetime(&row.get::<_, String>(5)?)?,
        })
    }

    /// Insert a new room
    #[instrument(skip(self, room), fields(room_id = %room.id, room_name = %room.name))]
    pub fn create(&self, room: &RoomRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rooms (id, name, hashed_password, hidden, creator_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                room.id.to_string(),
                room.name,
                room.hashed_password,
                room.settings.hidden as i32,
                room.creator_id.map(|c| c.to_string()),
                room.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find room by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<RoomRecord>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;

        let room = stmt
            .query_row(params![id.to_string()], Self::from_row)
            .optional()?;

        Ok(room)
    }

    /// List every room, oldest first
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<RoomRecord>> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms ORDER BY created_at");
        let mut stmt = self.conn.prepare(&sql)?;

        let rooms = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rooms)
    }

    /// Check whether a room ID exists
    pub fn exists(&self, id: Uuid) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM rooms WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Check whether a room name is taken
    pub fn exists_by_name(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM rooms WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Replace the password hash, returning the number of rooms updated
    #[instrument(skip(self, hashed_password))]
    pub fn update_password(&self, id: Uuid, hashed_password: &str) -> Result<usize> {
        let count = self.conn.execute(
            "UPDATE rooms SET hashed_password = ?1 WHERE id = ?2",
            params![hashed_password, id.to_string()],
        )?;
        Ok(count)
    }

    /// Delete a room, returning the number of rooms removed
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<usize> {
        let count = self
            .conn
            .execute("DELETE FROM rooms WHERE id = ?1", params![id.to_string()])?;
        Ok(count)
    }
}
