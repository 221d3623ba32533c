use std::fmt;

#[derive(Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub hobby: String,
    pub age: Option<i64>,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

// Keeps the password hash out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub hobby: String,
    pub age: Option<i64>,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: String,
    pub post_id: String,
    /// Name on disk inside the uploads directory.
    pub filename: String,
    /// Name the uploader's browser sent.
    pub original_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub filename: String,
    pub original_name: String,
}

/// A post flattened with its author and attachment for the board listing.
#[derive(Debug, Clone)]
pub struct BoardEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub author: Author,
    pub attachment: Option<AttachmentLink>,
}

#[derive(Debug, Clone)]
pub struct Author {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AttachmentLink {
    pub id: String,
    pub original_name: String,
}
