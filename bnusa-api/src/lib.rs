use chrono::Utc;

pub type Time = chrono::DateTime<Utc>;

mod api;
pub use api::CommentApi;

mod comment;
pub use comment::{Author, Comment, CommentId, NewComment};

mod error;
pub use error::Error;

mod page;
pub use page::{Ack, Created, Page, PageRequest, Pagination};

mod target;
pub use target::Target;

mod user;
pub use user::{DeleteContext, UserId, Viewer};

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

/// Checks that comment content is submittable, returning the trimmed text
pub fn validate_content(s: &str) -> Result<&str, Error> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::EmptyContent);
    }
    validate_string(s)?;
    Ok(s)
}
