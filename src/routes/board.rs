use askama::Template;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDateTime, Utc};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::db::models::{AttachmentLink, BoardEntry, NewAttachment, User};
use crate::db::posts;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, RequestContext};
use crate::routes::home::{Action, Html, OutcomeTemplate};
use crate::state::AppState;
use crate::uploads;

// --- View structs ---

pub struct BoardPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub author_id: String,
    pub author_name: String,
    pub attachment: Option<AttachmentLink>,
}

impl From<BoardEntry> for BoardPost {
    fn from(entry: BoardEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            content: entry.content,
            created_at: parse_and_format_time(&entry.created_at),
            author_id: entry.author.id,
            author_name: entry.author.name,
            attachment: entry.attachment,
        }
    }
}

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/board.html")]
pub struct BoardTemplate {
    pub posts: Vec<BoardPost>,
    pub user: Option<User>,
}

// --- Forms ---

#[derive(Default)]
struct PostSubmission {
    title: String,
    content: String,
    file: Option<UploadedFile>,
}

struct UploadedFile {
    original_name: String,
    bytes: Vec<u8>,
}

// --- Router ---

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/board", get(board_page))
        .route(
            "/post",
            post(create_post).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/download/{id}", get(download))
}

// --- Handlers ---

/// GET /board — a store failure renders an empty board, not an error page
async fn board_page(State(state): State<AppState>, ctx: RequestContext) -> Html<BoardTemplate> {
    let entries = match state.db.get() {
        Ok(conn) => posts::list_board(&conn).map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };

    let entries = entries.unwrap_or_else(|e| {
        tracing::error!("Failed to load board: {}", e);
        Vec::new()
    });

    Html(BoardTemplate {
        posts: entries.into_iter().map(BoardPost::from).collect(),
        user: ctx.user,
    })
}

/// POST /post — requires a session; anonymous requests get 401
async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Html<OutcomeTemplate> {
    let result = match store_post(&state, &user, multipart).await {
        Ok(post_id) => {
            tracing::info!("User {} created post {}", user.id, post_id);
            true
        }
        Err(e) => {
            tracing::warn!("Post creation failed: {}", e);
            false
        }
    };

    Html(OutcomeTemplate {
        user: Some(user),
        action: Action::Post,
        result,
    })
}

async fn read_submission(mut multipart: Multipart) -> AppResult<PostSubmission> {
    let mut submission = PostSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => submission.title = field.text().await?,
            Some("content") => submission.content = field.text().await?,
            Some("file") => {
                let original_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file was chosen
                if let Some(original_name) = original_name.filter(|n| !n.is_empty()) {
                    if !bytes.is_empty() {
                        submission.file = Some(UploadedFile {
                            original_name: uploads::sanitize_file_name(&original_name),
                            bytes: bytes.to_vec(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(submission)
}

/// Save the upload, then insert post and attachment together.
/// A failed insert removes the file it just wrote.
async fn store_post(state: &AppState, user: &User, multipart: Multipart) -> AppResult<String> {
    let submission = read_submission(multipart).await?;
    let uploads_dir = state.config.uploads_path();

    let attachment = match &submission.file {
        Some(file) => {
            let filename =
                uploads::save_upload(&uploads_dir, &file.original_name, &file.bytes).await?;
            Some(NewAttachment {
                filename,
                original_name: file.original_name.clone(),
            })
        }
        None => None,
    };

    let inserted = state.db.get().map_err(AppError::from).and_then(|mut conn| {
        posts::create_with_attachment(
            &mut conn,
            &user.id,
            &submission.title,
            &submission.content,
            attachment.as_ref(),
        )
        .map_err(AppError::from)
    });

    match inserted {
        Ok((post, _)) => Ok(post.id),
        Err(e) => {
            if let Some(file) = &attachment {
                uploads::remove_upload(&uploads_dir, &file.filename).await;
            }
            Err(e)
        }
    }
}

/// GET /download/{id} — 404 for unknown attachments
///
/// The file is streamed from disk by `ServeFile`, which also answers range
/// and conditional requests.
async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let attachment = {
        let conn = state.db.get()?;
        posts::find_attachment(&conn, &id)?.ok_or(AppError::NotFound)?
    };

    let path = state.config.uploads_path().join(&attachment.filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(AppError::NotFound),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                "Attachment {} points at missing file {}",
                attachment.id,
                path.display()
            );
            return Err(AppError::NotFound);
        }
        Err(e) => return Err(e.into()),
    }

    let mime = mime_guess::from_path(&attachment.original_name).first_or_octet_stream();
    let mut response = match ServeFile::new_with_mime(&path, &mime).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let disposition = HeaderValue::from_str(&content_disposition(&attachment.original_name))
        .map_err(|e| AppError::Internal(format!("bad content-disposition: {e}")))?;
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response.map(Body::new))
}

// --- Header helpers ---

/// `attachment` disposition with an ASCII fallback and an RFC 5987 `filename*`.
pub fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(original_name.len() * 3);
    for byte in original_name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

// --- Time formatting ---

fn parse_and_format_time(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, "%Y-%m-%d %H:%M:%S")
        .map(|dt| format_relative_time(&dt))
        .unwrap_or_else(|_| db_time.to_string())
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Author;
    use chrono::NaiveDate;

    #[test]
    fn format_relative_time_just_now() {
        let now = Utc::now().naive_utc();
        assert_eq!(format_relative_time(&now), "just now");
    }

    #[test]
    fn format_relative_time_hours() {
        let dt = Utc::now().naive_utc() - chrono::Duration::hours(3);
        assert_eq!(format_relative_time(&dt), "3h ago");
    }

    #[test]
    fn format_relative_time_old_date() {
        let dt = NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(format_relative_time(&dt), "Jan 15, 2025");
    }

    #[test]
    fn parse_and_format_bad_input_returns_raw() {
        assert_eq!(parse_and_format_time("not-a-date"), "not-a-date");
    }

    #[test]
    fn content_disposition_plain_ascii() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
    }

    #[test]
    fn content_disposition_escapes_quotes_and_unicode() {
        let header = content_disposition("a\"b 사진.png");
        assert!(header.starts_with("attachment; filename=\"a_b __.png\";"));
        assert!(header.ends_with("filename*=UTF-8''a%22b%20%EC%82%AC%EC%A7%84.png"));
    }

    #[test]
    fn board_template_lists_posts_and_attachment_links() {
        let entry = BoardEntry {
            id: "p1".into(),
            title: "Hello".into(),
            content: "<b>hi</b>".into(),
            created_at: "2025-01-15 12:00:00".into(),
            author: Author {
                id: "u1".into(),
                name: "Alice".into(),
            },
            attachment: Some(AttachmentLink {
                id: "f1".into(),
                original_name: "notes.txt".into(),
            }),
        };

        let html = BoardTemplate {
            posts: vec![BoardPost::from(entry)],
            user: None,
        }
        .render()
        .unwrap();

        assert!(html.contains("Hello"));
        assert!(html.contains("by Alice"));
        assert!(html.contains("Jan 15, 2025"));
        assert!(html.contains("href=\"/download/f1\""));
        assert!(html.contains("&lt;b&gt;hi"));
    }

    #[test]
    fn empty_board_renders_placeholder() {
        let html = BoardTemplate {
            posts: Vec::new(),
            user: None,
        }
        .render()
        .unwrap();
        assert!(html.contains("No posts yet."));
    }
}
