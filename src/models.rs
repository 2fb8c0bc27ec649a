use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
pub struct FrontMatter {
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub excerpt: String,
    pub date: String,
    #[serde(rename = "isFeatured", default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub title: String,
    pub image: String,
    pub excerpt: String,
    pub slug: String,
    pub date: NaiveDate,
    /// Raw markdown body, front-matter stripped.
    pub content: String,
    pub is_featured: bool,
}

impl Post {
    /// Public path of the post's cover image.
    pub fn image_path(&self) -> String {
        format!("/images/posts/{}/{}", self.slug, self.image)
    }

    /// Date in the long form used on post cards, e.g. "February 10, 2022".
    pub fn display_date(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }
}

/// A contact submission. `_id` stays absent until the store assigns one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    pub name: String,
    pub message: String,
}

impl Message {
    pub fn new(email: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Body of `POST /api/contact`. Missing fields read as empty so they fail
/// validation instead of JSON parsing.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ContactRequest {
    pub email: String,
    pub name: String,
    pub message: String,
}

impl From<ContactRequest> for Message {
    fn from(req: ContactRequest) -> Self {
        Message::new(req.email, req.name, req.message)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContactResponse {
    pub message: String,
    #[serde(rename = "outgoingMessage")]
    pub outgoing_message: Message,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}
