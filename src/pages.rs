use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use htmlescape::{encode_attribute, encode_minimal};

use crate::{
    contact::CONTACT_PATH,
    hot_reload::HOT_RELOAD_SCRIPT,
    markdown::render_post_body,
    models::Post,
    state::{AppState, Catalog},
    validation::{ValidationError, EMAIL_PATTERN, MIN_MESSAGE_LEN},
};

const CONTACT_SCRIPT: &str = r#"
<script>
    const form = document.getElementById("contact-form");
    const banner = document.getElementById("notification");
    let dismissTimer;
    function notify(status, title, message) {
        clearTimeout(dismissTimer);
        banner.className = "notification " + status;
        banner.innerHTML = "<h2></h2><p></p>";
        banner.querySelector("h2").textContent = title;
        banner.querySelector("p").textContent = message;
        banner.hidden = false;
        if (status !== "pending") {
            dismissTimer = setTimeout(() => { banner.hidden = true; }, 3000);
        }
    }
    const errorLine = document.getElementById("form-error");
    const emailPattern = new RegExp(form.dataset.emailPattern);
    const minLength = Number(form.dataset.minLength);
    // Same order and texts as the server-side rules.
    function validationError(email, name, message) {
        if (email.trim() === "" || name.trim() === "" || message.trim() === "") {
            return form.dataset.errorInvalidInput;
        }
        if ([...message.trim()].length < minLength) {
            return form.dataset.errorMessageTooShort;
        }
        if (!emailPattern.test(email)) {
            return form.dataset.errorInvalidEmail;
        }
        return null;
    }
    form.addEventListener("submit", async (event) => {
        event.preventDefault();
        const invalid = validationError(form.email.value, form.name.value, form.message.value);
        errorLine.textContent = invalid || "";
        errorLine.hidden = !invalid;
        if (invalid) return;
        const button = form.querySelector("button");
        if (button.disabled) return;
        button.disabled = true;
        notify("pending", "Sending message...", "Your message is on its way!");
        try {
            const res = await fetch(form.dataset.endpoint, {
                method: "POST",
                body: JSON.stringify({
                    email: form.email.value,
                    name: form.name.value,
                    message: form.message.value,
                }),
                headers: { "Content-Type": "application/json" },
            });
            const data = await res.json().catch(() => ({}));
            if (!res.ok) throw new Error(data.message || "Something went wrong!");
            form.reset();
            notify("success", "Success!", "Message sent successfully!");
        } catch (error) {
            notify("error", "Error!", error.message || "Something went wrong!");
        } finally {
            button.disabled = false;
        }
    });
</script>
"#;

pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<AppState>: FromRef<S>,
{
    Router::new()
        .route("/", get(homepage))
        .route("/posts", get(all_posts))
        .route("/posts/{slug}", get(render_post))
        .route("/contact", get(contact_page))
}

fn render_with_layout(layout: &str, title: &str, content: &str, is_development: bool) -> String {
    let mut page = layout
        .replace("{{ title }}", &encode_minimal(title))
        .replace("{{ content }}", content);

    if is_development {
        page = page.replace("</body>", &format!("{}</body>", HOT_RELOAD_SCRIPT));
    }

    page
}

fn posts_grid<'a>(posts: impl IntoIterator<Item = &'a Post>) -> String {
    let mut items = String::new();
    for post in posts {
        items.push_str(&format!(
            "<li class=\"post\"><a href=\"/posts/{slug}\"><div class=\"image\"><img src=\"{image}\" alt=\"{alt}\" width=\"300\" height=\"200\"></div>\
             <div class=\"content\"><h3>{title}</h3><time>{date}</time><p>{excerpt}</p></div></a></li>",
            slug = encode_attribute(&post.slug),
            image = encode_attribute(&post.image_path()),
            alt = encode_attribute(&post.title),
            title = encode_minimal(&post.title),
            date = post.display_date(),
            excerpt = encode_minimal(&post.excerpt),
        ));
    }
    format!("<ul class=\"grid\">{}</ul>", items)
}

async fn homepage(State(state): State<Arc<AppState>>) -> Html<String> {
    let catalog = state.catalog().await;
    let body = format!(
        "<section class=\"hero\"><h1>Hi, welcome to my blog</h1>\
         <p>I write about web development and the tools around it.</p></section>\
         <section class=\"latest\"><h2>Featured Posts</h2>{}</section>",
        posts_grid(catalog.featured())
    );
    Html(render_with_layout(&catalog.layout_html, "Welcome", &body, state.is_development))
}

async fn all_posts(State(state): State<Arc<AppState>>) -> Html<String> {
    let catalog = state.catalog().await;
    let body = format!(
        "<section class=\"posts\"><h1>All Posts</h1>{}</section>",
        posts_grid(&catalog.posts)
    );
    Html(render_with_layout(&catalog.layout_html, "All Posts", &body, state.is_development))
}

async fn render_post(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Html<String>) {
    let catalog = state.catalog().await;
    match catalog.post(&slug) {
        Some(post) => {
            let body = render_article(post);
            (
                StatusCode::OK,
                Html(render_with_layout(&catalog.layout_html, &post.title, &body, state.is_development)),
            )
        }
        None => {
            tracing::debug!(%slug, "request for unknown post");
            (StatusCode::NOT_FOUND, Html(not_found_page(&catalog, &slug, state.is_development)))
        }
    }
}

fn render_article(post: &Post) -> String {
    format!(
        "<article class=\"content\"><header><h1>{title}</h1>\
         <img src=\"{image}\" alt=\"{alt}\" width=\"200\" height=\"150\"></header>{body}</article>",
        title = encode_minimal(&post.title),
        image = encode_attribute(&post.image_path()),
        alt = encode_attribute(&post.title),
        body = render_post_body(&post.slug, &post.content),
    )
}

fn not_found_page(catalog: &Catalog, slug: &str, is_development: bool) -> String {
    let body = catalog.not_found_html.replace("{{slug}}", &encode_minimal(slug));
    render_with_layout(&catalog.layout_html, "Not Found", &body, is_development)
}

async fn contact_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let catalog = state.catalog().await;
    let body = format!(
        "<section class=\"contact\"><h1>How can I help you?</h1>\
         <form id=\"contact-form\" class=\"form\" novalidate data-endpoint=\"{endpoint}\" \
         data-email-pattern=\"{pattern}\" data-min-length=\"{min_length}\" \
         data-error-invalid-input=\"{invalid_input}\" data-error-message-too-short=\"{too_short}\" \
         data-error-invalid-email=\"{invalid_email}\">\
         <div class=\"controls\">\
         <div class=\"control\"><label for=\"email\">Your Email</label><input type=\"email\" id=\"email\" name=\"email\" required></div>\
         <div class=\"control\"><label for=\"name\">Your Name</label><input type=\"text\" id=\"name\" name=\"name\" required></div>\
         </div>\
         <div class=\"control\"><label for=\"message\">Your Message</label><textarea id=\"message\" name=\"message\" rows=\"5\" required></textarea></div>\
         <p id=\"form-error\" class=\"error\" hidden></p>\
         <div class=\"actions\"><button>Send Message</button></div>\
         </form></section><div id=\"notification\" hidden></div>{script}",
        endpoint = CONTACT_PATH,
        pattern = encode_attribute(EMAIL_PATTERN),
        min_length = MIN_MESSAGE_LEN,
        invalid_input = encode_attribute(&ValidationError::InvalidInput.to_string()),
        too_short = encode_attribute(&ValidationError::MessageTooShort.to_string()),
        invalid_email = encode_attribute(&ValidationError::InvalidEmail.to_string()),
        script = CONTACT_SCRIPT,
    );
    Html(render_with_layout(&catalog.layout_html, "Contact Me", &body, state.is_development))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use scraper::{Html as Document, Selector};
    use tower::ServiceExt;

    use super::*;
    use crate::state::tests::{config_for, site, write_post};

    async fn get_page(state: Arc<AppState>, uri: &str) -> (StatusCode, Document) {
        let app: Router = routes().with_state(state);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, Document::parse_document(&String::from_utf8(bytes.to_vec()).unwrap()))
    }

    fn texts(doc: &Document, selector: &str) -> Vec<String> {
        let selector = Selector::parse(selector).unwrap();
        doc.select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect()
    }

    async fn sample_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = site();
        write_post(dir.path(), "old", "2021-05-01", true);
        write_post(dir.path(), "new", "2023-05-01", false);
        write_post(dir.path(), "mid", "2022-05-01", true);
        let state = AppState::load(&config_for(dir.path(), 1800)).await.unwrap();
        (dir, Arc::new(state))
    }

    #[tokio::test]
    async fn homepage_lists_only_featured_posts() {
        let (_dir, state) = sample_state().await;
        let (status, doc) = get_page(state, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(texts(&doc, "li.post h3"), ["Title of mid", "Title of old"]);
    }

    #[tokio::test]
    async fn posts_page_lists_everything_newest_first() {
        let (_dir, state) = sample_state().await;
        let (_, doc) = get_page(state, "/posts").await;

        assert_eq!(
            texts(&doc, "li.post h3"),
            ["Title of new", "Title of mid", "Title of old"]
        );
        assert_eq!(texts(&doc, "li.post time")[0], "May 1, 2023");
        assert_eq!(texts(&doc, "title"), ["All Posts"]);
    }

    #[tokio::test]
    async fn post_page_renders_markdown_body() {
        let (_dir, state) = sample_state().await;
        let (status, doc) = get_page(state, "/posts/mid").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(texts(&doc, "article h1"), ["Title of mid"]);

        let img = Selector::parse("article p img").unwrap();
        let src = doc.select(&img).next().unwrap().value().attr("src").unwrap();
        assert_eq!(src, "/images/posts/mid/shot.png");
    }

    #[tokio::test]
    async fn unknown_slug_is_404_with_escaped_name() {
        let (_dir, state) = sample_state().await;
        let (status, doc) = get_page(state, "/posts/%3Cb%3Enope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(texts(&doc, "h1"), ["No post called <b>nope"]);
        assert!(texts(&doc, "b").is_empty());
    }

    #[tokio::test]
    async fn contact_page_points_at_api() {
        let (_dir, state) = sample_state().await;
        let (_, doc) = get_page(state, "/contact").await;

        let form = Selector::parse("form#contact-form").unwrap();
        let endpoint = doc.select(&form).next().unwrap().value().attr("data-endpoint").unwrap();
        assert_eq!(endpoint, CONTACT_PATH);
    }

    #[tokio::test]
    async fn contact_form_carries_the_shared_rules() {
        let (_dir, state) = sample_state().await;
        let (_, doc) = get_page(state, "/contact").await;

        let form = Selector::parse("form#contact-form").unwrap();
        let form = doc.select(&form).next().unwrap().value();
        assert_eq!(form.attr("data-email-pattern"), Some(EMAIL_PATTERN));
        assert_eq!(
            form.attr("data-min-length"),
            Some(MIN_MESSAGE_LEN.to_string().as_str())
        );
        assert_eq!(form.attr("data-error-invalid-input"), Some("Invalid input"));
        assert_eq!(form.attr("data-error-message-too-short"), Some("Message too short"));
        assert_eq!(form.attr("data-error-invalid-email"), Some("Invalid Email"));

        assert_eq!(texts(&doc, "#form-error"), [""]);
        assert!(CONTACT_SCRIPT.contains("if (invalid) return;"));
        let checked = CONTACT_SCRIPT.find("if (invalid) return;").unwrap();
        assert!(checked < CONTACT_SCRIPT.find("fetch(").unwrap());
    }

    #[test]
    fn development_pages_get_reload_script() {
        let page = render_with_layout("<body>{{ content }}</body>", "t", "x", true);
        assert!(page.contains("new WebSocket"));
        let page = render_with_layout("<body>{{ content }}</body>", "t", "x", false);
        assert!(!page.contains("WebSocket"));
    }
}
