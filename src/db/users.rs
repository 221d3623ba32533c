use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{NewUser, User};

const USER_COLUMNS: &str = "id, name, hobby, age, email, password, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        hobby: row.get(2)?,
        age: row.get(3)?,
        email: row.get(4)?,
        password_hash: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a user and return the stored record.
pub fn create(conn: &Connection, new_user: NewUser) -> rusqlite::Result<User> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, name, hobby, age, email, password) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            new_user.name,
            new_user.hobby,
            new_user.age,
            new_user.email,
            new_user.password_hash
        ],
    )?;

    find_by_id(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        map_user,
    )
    .optional()
}

/// Email is not unique; the earliest registration wins.
pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 ORDER BY rowid ASC LIMIT 1"),
        params![email],
        map_user,
    )
    .optional()
}

#[cfg(test)]
pub(crate) fn new_user(name: &str, email: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        hobby: "reading".to_string(),
        age: Some(30),
        email: email.to_string(),
        password_hash: "$2b$04$placeholderplaceholderplaceholderplaceholderplace".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn create_then_find_by_id() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let user = create(&conn, new_user("Alice", "alice@example.com")).unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.age, Some(30));

        let found = find_by_id(&conn, &user.id).unwrap().unwrap();
        assert_eq!(found.email, "alice@example.com");
        assert_eq!(found.hobby, "reading");
    }

    #[test]
    fn find_by_id_unknown_is_none() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        assert!(find_by_id(&conn, "no-such-user").unwrap().is_none());
    }

    #[test]
    fn find_by_email_returns_first_registration() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let first = create(&conn, new_user("First", "dup@example.com")).unwrap();
        let second = create(&conn, new_user("Second", "dup@example.com")).unwrap();
        assert_ne!(first.id, second.id);

        let found = find_by_email(&conn, "dup@example.com").unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[test]
    fn find_by_email_unknown_is_none() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        assert!(find_by_email(&conn, "ghost@example.com").unwrap().is_none());
    }

    #[test]
    fn missing_age_is_stored_as_null() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let mut input = new_user("Bob", "bob@example.com");
        input.age = None;
        let user = create(&conn, input).unwrap();
        assert_eq!(user.age, None);
    }

    #[test]
    fn debug_output_hides_password_hash() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = create(&conn, new_user("Carol", "carol@example.com")).unwrap();

        let printed = format!("{:?}", user);
        assert!(printed.contains("Carol"));
        assert!(!printed.contains(&user.password_hash));
    }
}
