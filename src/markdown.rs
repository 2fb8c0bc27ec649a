use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options
}

/// Renders a post body. Relative image sources resolve under the post's image
/// folder and paragraphs that open with an image become `<div class="image">`.
/// Fenced code keeps its `language-*` class for client-side highlighting.
pub fn render_post_body(slug: &str, markdown: &str) -> String {
    let events: Vec<Event> = Parser::new_ext(markdown, markdown_options()).collect();

    let mut out_events = Vec::with_capacity(events.len());
    let mut in_image_paragraph = false;

    for (i, event) in events.iter().enumerate() {
        match event {
            Event::Start(Tag::Paragraph)
                if matches!(events.get(i + 1), Some(Event::Start(Tag::Image { .. }))) =>
            {
                in_image_paragraph = true;
                out_events.push(Event::Html(CowStr::Borrowed("<div class=\"image\">")));
            }
            Event::End(TagEnd::Paragraph) if in_image_paragraph => {
                in_image_paragraph = false;
                out_events.push(Event::Html(CowStr::Borrowed("</div>\n")));
            }
            Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
                out_events.push(Event::Start(Tag::Image {
                    link_type: *link_type,
                    dest_url: resolve_image_src(slug, dest_url),
                    title: title.clone(),
                    id: id.clone(),
                }));
            }
            other => out_events.push(other.clone()),
        }
    }

    let mut html_out = String::new();
    html::push_html(&mut html_out, out_events.into_iter());
    html_out
}

fn resolve_image_src<'a>(slug: &str, src: &CowStr<'a>) -> CowStr<'a> {
    let is_absolute = src.starts_with('/') || src.starts_with("http://") || src.starts_with("https://");
    if is_absolute {
        src.clone()
    } else {
        CowStr::Boxed(format!("/images/posts/{}/{}", slug, src.trim_start_matches("./")).into_boxed_str())
    }
}
