use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{Attachment, AttachmentLink, Author, BoardEntry, NewAttachment, Post};

/// Insert a post and its optional attachment in one transaction.
///
/// Either both rows exist afterwards or neither does.
pub fn create_with_attachment(
    conn: &mut Connection,
    user_id: &str,
    title: &str,
    content: &str,
    attachment: Option<&NewAttachment>,
) -> rusqlite::Result<(Post, Option<Attachment>)> {
    let tx = conn.transaction()?;

    let post_id = uuid::Uuid::now_v7().to_string();
    tx.execute(
        "INSERT INTO posts (id, user_id, title, content) VALUES (?1, ?2, ?3, ?4)",
        params![post_id, user_id, title, content],
    )?;

    let attachment_id = match attachment {
        Some(file) => {
            let id = uuid::Uuid::now_v7().to_string();
            tx.execute(
                "INSERT INTO attachments (id, post_id, filename, original_name) VALUES (?1, ?2, ?3, ?4)",
                params![id, post_id, file.filename, file.original_name],
            )?;
            Some(id)
        }
        None => None,
    };

    // Read back inside the transaction so a failed read never follows a commit
    let post = find_post(&tx, &post_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    let attachment = match attachment_id {
        Some(id) => Some(find_attachment(&tx, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?),
        None => None,
    };

    tx.commit()?;
    Ok((post, attachment))
}

pub fn find_post(conn: &Connection, id: &str) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        "SELECT id, user_id, title, content, created_at FROM posts WHERE id = ?1",
        params![id],
        |row| {
            Ok(Post {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn find_attachment(conn: &Connection, id: &str) -> rusqlite::Result<Option<Attachment>> {
    conn.query_row(
        "SELECT id, post_id, filename, original_name, created_at FROM attachments WHERE id = ?1",
        params![id],
        |row| {
            Ok(Attachment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                filename: row.get(2)?,
                original_name: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Every post with its author and attachment, oldest first.
pub fn list_board(conn: &Connection) -> rusqlite::Result<Vec<BoardEntry>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.content, p.created_at, u.id, u.name, a.id, a.original_name
         FROM posts p
         JOIN users u ON u.id = p.user_id
         LEFT JOIN attachments a ON a.post_id = p.id
         ORDER BY p.rowid ASC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            let attachment_id: Option<String> = row.get(6)?;
            let original_name: Option<String> = row.get(7)?;
            Ok(BoardEntry {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
                author: Author {
                    id: row.get(4)?,
                    name: row.get(5)?,
                },
                attachment: attachment_id.zip(original_name).map(|(id, original_name)| {
                    AttachmentLink { id, original_name }
                }),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}
