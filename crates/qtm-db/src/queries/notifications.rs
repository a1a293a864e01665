//! Notification store query functions.

use rusqlite::Connection;

use qtm_types::notification::Notification;

use crate::{DbError, Result};

/// Insert a notification.
pub fn insert(conn: &Connection, notif: &Notification) -> Result<()> {
    let payload = serde_json::to_string(&notif.payload)
        .map_err(|e| DbError::Serialization(e.to_string()))?;

    conn.execute(
        "INSERT INTO notifications (id, wallet, notif_type, title, body, payload, read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            notif.id,
            notif.wallet,
            notif.notif_type,
            notif.title,
            notif.body,
            payload,
            notif.read,
            notif.created_at as i64,
        ],
    )?;
    Ok(())
}

/// List notifications for a wallet, newest first.
pub fn list(conn: &Connection, wallet: &str) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, wallet, notif_type, title, body, payload, read, created_at
         FROM notifications WHERE wallet = ?1 ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt
        .query_map([wallet], |row| {
            let payload: String = row.get(5)?;
            Ok((
                Notification {
                    id: row.get(0)?,
                    wallet: row.get(1)?,
                    notif_type: row.get(2)?,
                    title: row.get(3)?,
                    body: row.get(4)?,
                    payload: serde_json::Value::Null,
                    read: row.get(6)?,
                    created_at: row.get::<_, i64>(7)? as u64,
                },
                payload,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(mut notif, payload)| {
            notif.payload = serde_json::from_str(&payload)
                .map_err(|e| DbError::Serialization(e.to_string()))?;
            Ok(notif)
        })
        .collect()
}

/// Count unread notifications for a wallet.
pub fn unread_count(conn: &Connection, wallet: &str) -> Result<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE wallet = ?1 AND read = 0",
        [wallet],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

/// Mark all of a wallet's notifications as read. Returns rows affected.
pub fn mark_all_read(conn: &Connection, wallet: &str) -> Result<u32> {
    let changed = conn.execute(
        "UPDATE notifications SET read = 1 WHERE wallet = ?1 AND read = 0",
        [wallet],
    )?;
    Ok(changed as u32)
}

/// Delete all of a wallet's notifications. Returns rows removed.
pub fn clear(conn: &Connection, wallet: &str) -> Result<u32> {
    let changed = conn.execute("DELETE FROM notifications WHERE wallet = ?1", [wallet])?;
    Ok(changed as u32)
}
