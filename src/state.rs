use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::{
    fs,
    sync::{broadcast, Mutex, RwLock, RwLockReadGuard},
    time::Instant,
};
use tracing::{error, info};

use crate::{
    config::Config,
    content_loader::{PostError, PostLoader},
    models::Post,
    store::MessageStore,
};

pub type RefreshBroadcaster = broadcast::Sender<()>;

/// Everything the pages are generated from, as of `generated_at`.
pub struct Catalog {
    pub layout_html: String,
    pub not_found_html: String, // supports {{slug}} placeholder
    pub posts: Vec<Post>,
    generated_at: Instant,
    // Number of successful rebuilds since startup.
    generation: u64,
}

impl Catalog {
    pub async fn load(content_dir: &Path, loader: &PostLoader) -> Result<Self, PostError> {
        let layout_html = fs::read_to_string(content_dir.join("layout.html")).await?;
        let not_found_html = fs::read_to_string(content_dir.join("not_found.html")).await?;
        let posts = loader.all_posts().await?;

        Ok(Self {
            layout_html,
            not_found_html,
            posts,
            generated_at: Instant::now(),
            generation: 0,
        })
    }

    pub fn post(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.slug == slug)
    }

    pub fn featured(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter().filter(|post| post.is_featured)
    }
}

pub struct AppState {
    pub content_dir: PathBuf,
    loader: PostLoader,
    catalog: RwLock<Catalog>,
    // Held for the whole disk read so only one rebuild runs at a time.
    rebuild: Mutex<()>,
    revalidate: Duration,
    pub is_development: bool,
}

impl AppState {
    /// Builds the first catalog; failing here is fatal.
    pub async fn load(config: &Config) -> Result<Self, PostError> {
        let content_dir = config.content.dir.clone();
        let loader = PostLoader::new(&content_dir);
        let catalog = Catalog::load(&content_dir, &loader).await?;
        info!(posts = catalog.posts.len(), dir = %content_dir.display(), "content loaded");

        Ok(Self {
            content_dir,
            loader,
            catalog: RwLock::new(catalog),
            rebuild: Mutex::new(()),
            revalidate: config.revalidate(),
            is_development: config.development,
        })
    }

    /// Current catalog, rebuilt first when older than the revalidation
    /// interval. Callers that find it stale together share one rebuild.
    pub async fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        let seen = {
            let catalog = self.catalog.read().await;
            if catalog.generated_at.elapsed() < self.revalidate {
                return catalog;
            }
            catalog.generation
        };

        let rebuild = self.rebuild.lock().await;
        if self.catalog.read().await.generation == seen {
            self.rebuild_locked().await;
        }
        drop(rebuild);
        self.catalog.read().await
    }

    /// Rebuilds from disk. On failure the previous catalog keeps serving.
    pub async fn regenerate(&self) {
        let _rebuild = self.rebuild.lock().await;
        self.rebuild_locked().await;
    }

    async fn rebuild_locked(&self) {
        info!("Regenerating content...");
        match Catalog::load(&self.content_dir, &self.loader).await {
            Ok(mut catalog) => {
                let mut current = self.catalog.write().await;
                catalog.generation = current.generation + 1;
                *current = catalog;
                info!("Content successfully regenerated.");
            }
            Err(e) => {
                error!("Failed to regenerate content: {}", e);
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn generation(&self) -> u64 {
        self.catalog.read().await.generation
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub app_state: Arc<AppState>,
    pub store: Arc<dyn MessageStore>,
    pub broadcaster: RefreshBroadcaster,
}

impl axum::extract::FromRef<RouterState> for Arc<AppState> {
    fn from_ref(state: &RouterState) -> Self {
        state.app_state.clone()
    }
}

impl axum::extract::FromRef<RouterState> for Arc<dyn MessageStore> {
    fn from_ref(state: &RouterState) -> Self {
        state.store.clone()
    }
}

impl axum::extract::FromRef<RouterState> for RefreshBroadcaster {
    fn from_ref(state: &RouterState) -> Self {
        state.broadcaster.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const LAYOUT: &str =
        "<html><head><title>{{ title }}</title></head><body>{{ content }}</body></html>";

    pub(crate) fn write_post(dir: &Path, slug: &str, date: &str, featured: bool) {
        let body = format!(
            "---\ntitle: Title of {slug}\nimage: {slug}.png\nexcerpt: Excerpt of {slug}\ndate: '{date}'\nisFeatured: {featured}\n---\n\nBody of {slug} ![shot](shot.png)\n"
        );
        std::fs::write(dir.join("posts").join(format!("{slug}.md")), body).unwrap();
    }

    pub(crate) fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("posts")).unwrap();
        std::fs::write(dir.path().join("layout.html"), LAYOUT).unwrap();
        std::fs::write(
            dir.path().join("not_found.html"),
            "<h1>No post called {{slug}}</h1>",
        )
        .unwrap();
        dir
    }

    pub(crate) fn config_for(dir: &Path, revalidate_secs: u64) -> Config {
        let mut config = Config::default();
        config.content.dir = dir.to_path_buf();
        config.content.revalidate_secs = revalidate_secs;
        config
    }

    #[tokio::test]
    async fn stale_catalog_is_rebuilt_on_access() {
        let dir = site();
        write_post(dir.path(), "first", "2022-01-01", false);

        let state = AppState::load(&config_for(dir.path(), 0)).await.unwrap();
        assert_eq!(state.catalog().await.posts.len(), 1);

        write_post(dir.path(), "second", "2022-02-01", true);
        let catalog = state.catalog().await;
        assert_eq!(catalog.posts.len(), 2);
        assert_eq!(catalog.posts[0].slug, "second");
        assert_eq!(catalog.featured().count(), 1);
    }

    #[tokio::test]
    async fn fresh_catalog_is_served_until_interval_passes() {
        let dir = site();
        write_post(dir.path(), "first", "2022-01-01", false);

        let state = AppState::load(&config_for(dir.path(), 1800)).await.unwrap();
        write_post(dir.path(), "second", "2022-02-01", false);
        assert_eq!(state.catalog().await.posts.len(), 1);

        state.regenerate().await;
        assert_eq!(state.catalog().await.posts.len(), 2);
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_previous_catalog() {
        let dir = site();
        write_post(dir.path(), "first", "2022-01-01", false);

        let state = AppState::load(&config_for(dir.path(), 0)).await.unwrap();
        std::fs::write(dir.path().join("posts").join("broken.md"), "---\ntitle: x\ndate: never\n---\n").unwrap();

        let catalog = state.catalog().await;
        assert_eq!(catalog.posts.len(), 1);
        assert!(catalog.post("first").is_some());
        assert!(catalog.post("broken").is_none());
    }

    #[tokio::test]
    async fn concurrent_stale_reads_share_one_rebuild() {
        let dir = site();
        write_post(dir.path(), "first", "2022-01-01", false);

        let state = AppState::load(&config_for(dir.path(), 0)).await.unwrap();
        assert_eq!(state.generation().await, 0);

        let reads = (0..8).map(|_| async {
            let catalog = state.catalog().await;
            catalog.posts.len()
        });
        let counts = futures::future::join_all(reads).await;

        assert!(counts.iter().all(|&n| n == 1));
        assert_eq!(state.generation().await, 1);
    }

    #[tokio::test]
    async fn missing_layout_fails_initial_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("posts")).unwrap();
        assert!(AppState::load(&config_for(dir.path(), 0)).await.is_err());
    }
}
