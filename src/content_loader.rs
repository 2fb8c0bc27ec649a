use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use futures::future::try_join_all;
use gray_matter::{engine::YAML, Matter};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::models::{FrontMatter, Post};

const POSTS_DIR: &str = "posts";
const POST_EXT: &str = ".md";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found: {0}")]
    NotFound(String),
    #[error("post {0} has no front matter")]
    MissingFrontMatter(String),
    #[error("invalid front matter in {slug}: {reason}")]
    FrontMatter { slug: String, reason: String },
    #[error("invalid date {value:?} in {slug}")]
    InvalidDate { slug: String, value: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads posts from `<content dir>/posts/<slug>.md`.
#[derive(Debug, Clone)]
pub struct PostLoader {
    posts_dir: PathBuf,
}

impl PostLoader {
    pub fn new(content_dir: impl AsRef<Path>) -> Self {
        Self {
            posts_dir: content_dir.as_ref().join(POSTS_DIR),
        }
    }

    /// File names of every markdown post, sorted.
    pub async fn post_files(&self) -> Result<Vec<String>, PostError> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.posts_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            // Follows symlinks, unlike `DirEntry::file_type`.
            match fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(POST_EXT) {
                    files.push(name.to_string());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// The closed set of slugs; anything outside it is not a post.
    pub async fn slugs(&self) -> Result<Vec<String>, PostError> {
        Ok(self
            .post_files()
            .await?
            .into_iter()
            .filter_map(|name| name.strip_suffix(POST_EXT).map(str::to_string))
            .collect())
    }

    /// Looks up one post by slug. `slug.md` is accepted as well.
    pub async fn post(&self, identifier: &str) -> Result<Post, PostError> {
        let slug = identifier.strip_suffix(POST_EXT).unwrap_or(identifier);
        if !is_plain_slug(slug) {
            return Err(PostError::NotFound(slug.to_string()));
        }

        let path = self.posts_dir.join(format!("{slug}{POST_EXT}"));
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PostError::NotFound(slug.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        debug!(slug, "loaded post file");
        parse_post(slug, &raw)
    }

    /// Every post, newest first. Posts sharing a date are ordered by slug.
    pub async fn all_posts(&self) -> Result<Vec<Post>, PostError> {
        let slugs = self.slugs().await?;
        let mut posts = try_join_all(slugs.iter().map(|slug| self.post(slug))).await?;
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        Ok(posts)
    }

    pub async fn featured_posts(&self) -> Result<Vec<Post>, PostError> {
        Ok(featured(self.all_posts().await?))
    }
}

pub fn featured(posts: Vec<Post>) -> Vec<Post> {
    posts.into_iter().filter(|post| post.is_featured).collect()
}

fn is_plain_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && !slug.contains(['/', '\\'])
}

pub fn parse_post(slug: &str, raw: &str) -> Result<Post, PostError> {
    let matter = Matter::<YAML>::new();
    let parsed = matter
        .parse::<FrontMatter>(raw)
        .map_err(|e| PostError::FrontMatter {
            slug: slug.to_string(),
            reason: e.to_string(),
        })?;

    let front_matter = parsed
        .data
        .ok_or_else(|| PostError::MissingFrontMatter(slug.to_string()))?;

    let date = NaiveDate::parse_from_str(front_matter.date.trim(), "%Y-%m-%d").map_err(|_| {
        PostError::InvalidDate {
            slug: slug.to_string(),
            value: front_matter.date.clone(),
        }
    })?;

    Ok(Post {
        title: front_matter.title,
        image: front_matter.image,
        excerpt: front_matter.excerpt,
        slug: slug.to_string(),
        date,
        content: parsed.content,
        is_featured: front_matter.is_featured,
    })
}
