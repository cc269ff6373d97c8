use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::UserRole;
use crate::models::User;

use super::{fmt_datetime, parse_datetime, parse_uuid};

/// Password material as stored — PBKDF2 output and salt, both base64.
/// Never leaves the repository/auth layers.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub password_hash: String,
    pub password_salt: String,
}

pub fn insert_user(
    conn: &Connection,
    user: &User,
    credentials: &StoredCredentials,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, username, display_name, role, password_hash, password_salt, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id.to_string(),
            user.username,
            user.display_name,
            user.role.as_str(),
            credentials.password_hash,
            credentials.password_salt,
            fmt_datetime(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<User, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, username, display_name, role, created_at FROM users WHERE id = ?1",
            params![id.to_string()],
            user_row,
        )
        .optional()?;

    match row {
        Some(row) => user_from_row(row),
        None => Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: id.to_string(),
        }),
    }
}

/// Look up a user with credentials for login. Returns `None` for unknown
/// usernames so the caller can fail uniformly.
pub fn get_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<(User, StoredCredentials)>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, username, display_name, role, created_at, password_hash, password_salt
             FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok((
                    (
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ),
                    StoredCredentials {
                        password_hash: row.get(5)?,
                        password_salt: row.get(6)?,
                    },
                ))
            },
        )
        .optional()?;

    match row {
        None => Ok(None),
        Some((row, credentials)) => Ok(Some((user_from_row(row)?, credentials))),
    }
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, display_name, role, created_at FROM users ORDER BY username",
    )?;

    let rows = stmt.query_map([], user_row)?;

    let mut users = Vec::new();
    for row in rows {
        users.push(user_from_row(row?)?);
    }
    Ok(users)
}

pub fn update_user(
    conn: &Connection,
    id: &Uuid,
    display_name: &str,
    role: UserRole,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET display_name = ?2, role = ?3 WHERE id = ?1",
        params![id.to_string(), display_name, role.as_str()],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn update_user_password(
    conn: &Connection,
    id: &Uuid,
    credentials: &StoredCredentials,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET password_hash = ?2, password_salt = ?3 WHERE id = ?1",
        params![
            id.to_string(),
            credentials.password_hash,
            credentials.password_salt,
        ],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Number of admin accounts — guards against deleting the last one.
pub fn count_admins(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = 'admin'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

type UserRow = (String, String, String, String, String);

fn user_row(row: &rusqlite::Row<'_>) -> Result<UserRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    let (id, username, display_name, role, created_at) = row;
    Ok(User {
        id: parse_uuid(&id)?,
        username,
        display_name,
        role: UserRole::from_str(&role)?,
        created_at: parse_datetime(&created_at)?,
    })
}
