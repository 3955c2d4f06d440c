use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use lazy_static::lazy_static;
use markdown::mdast::Node;
use markdown::ParseOptions;
use regex::Regex;
use spdlog::warn;

use crate::content::parsing_utils::remove_comments;
use crate::post::{Post, PostPath};
use crate::validation::{IssueKind, ValidationError};

/// Sections whose children are posts: `/posts/<slug>/`.
const POST_SECTIONS: &[&str] = &["posts"];
/// List pages Hugo renders at the site root; never a post.
const LIST_PAGES: &[&str] = &["posts", "tags", "categories", "authors"];

#[derive(Debug, Default)]
pub struct CrossLinks {
    /// Resolved targets per post, in order of first appearance.
    pub links: BTreeMap<PostPath, Vec<PostPath>>,
    pub issues: Vec<ValidationError>,
}

/// Resolves internal links in every post body against the known slugs.
/// Targets that match no post are reported as dangling, never as errors.
pub fn resolve_cross_links(posts: &[Post]) -> CrossLinks {
    let mut cross_links = CrossLinks::default();

    let mut slugs: HashMap<&str, &PostPath> = HashMap::new();
    let mut reported_files = HashSet::new();
    for post in posts {
        match slugs.get(post.slug.as_str()) {
            None => {
                slugs.insert(post.slug.as_str(), &post.path);
            }
            Some(first) if first.file != post.path.file => {
                if reported_files.insert(post.path.file.as_path()) {
                    cross_links.issues.push(ValidationError::new(post.path.clone(), IssueKind::DuplicateSlug {
                        slug: post.slug.clone(),
                        other: first.file.display().to_string(),
                    }));
                }
            }
            Some(_) => {}
        }
    }

    for post in posts {
        let mut targets: Vec<PostPath> = vec![];
        let mut dangling = HashSet::new();

        for slug in extract_link_slugs(&post.body, &post.path.file) {
            match slugs.get(slug.as_str()) {
                Some(&target) => {
                    if !targets.contains(target) {
                        targets.push(target.clone());
                    }
                }
                None => {
                    if dangling.insert(slug.clone()) {
                        cross_links.issues.push(ValidationError::new(post.path.clone(), IssueKind::DanglingLink {
                            target: slug,
                        }));
                    }
                }
            }
        }

        cross_links.links.insert(post.path.clone(), targets);
    }

    cross_links
}

/// Slugs referenced by a body, in order, duplicates included.
pub fn extract_link_slugs(body: &str, file: &Path) -> Vec<String> {
    let mut urls = vec![];
    match markdown::to_mdast(body, &ParseOptions::gfm()) {
        Ok(root) => collect_urls(&root, &mut urls),
        Err(e) => {
            warn!("Markdown parse failed for {}, scanning links textually: {}", file.display(), e);
            urls.extend(scan_inline_links(body));
        }
    }

    let mut slugs: Vec<String> = urls.iter()
        .filter(|url| !url.contains("{{"))
        .filter_map(|url| link_target_slug(url))
        .collect();

    slugs.extend(scan_ref_shortcodes(body).iter().filter_map(|target| ref_target_slug(target)));
    slugs
}

fn collect_urls(node: &Node, urls: &mut Vec<String>) {
    match node {
        Node::Link(link) => urls.push(link.url.clone()),
        Node::Definition(definition) => urls.push(definition.url.clone()),
        _ => {}
    }

    if let Some(children) = node.children() {
        for child in children {
            collect_urls(child, urls);
        }
    }
}

fn scan_inline_links(body: &str) -> Vec<String> {
    lazy_static! {
        static ref INLINE_LINK_REGEX: Regex = Regex::new(r"\[[^\]]*\]\(\s*<?(?P<url>[^)\s>]+)").unwrap();
    }

    INLINE_LINK_REGEX.captures_iter(&remove_comments(body))
        .filter_map(|cap| cap.name("url").map(|url| url.as_str().to_string()))
        .collect()
}

/// Hugo `ref` and `relref` shortcodes, in both `{{< >}}` and `{{% %}}` forms.
fn scan_ref_shortcodes(body: &str) -> Vec<String> {
    lazy_static! {
        static ref REF_REGEX: Regex = Regex::new(
            r#"\{\{[<%]\s*(?:rel)?ref\s+"(?P<target>[^"]+)"\s*[>%]\}\}"#
        ).unwrap();
    }

    REF_REGEX.captures_iter(&remove_comments(body))
        .filter_map(|cap| cap.name("target").map(|target| target.as_str().to_string()))
        .collect()
}

lazy_static! {
    static ref SCHEME_REGEX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap();
    static ref EXTENSION_REGEX: Regex = Regex::new(r"^(?P<stem>.+)\.(?P<ext>[A-Za-z0-9]{1,5})$").unwrap();
}

/// A content path split into its directory components and the slug of the
/// page it names. `is_markdown` is set when the path ends in `.md`.
struct ContentTarget<'a> {
    parents: Vec<&'a str>,
    slug: &'a str,
    is_markdown: bool,
}

fn content_target(path: &str) -> Option<ContentTarget<'_>> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let mut parents: Vec<&str> = path.split('/')
        .filter(|c| !c.is_empty() && *c != "." && *c != "..")
        .collect();

    let last = parents.pop()?;
    let Some(cap) = EXTENSION_REGEX.captures(last) else {
        return Some(ContentTarget { parents, slug: last, is_markdown: false });
    };

    let ext = cap.name("ext").map(|e| e.as_str()).unwrap_or("");
    if !ext.eq_ignore_ascii_case("md") {
        return None;
    }
    let slug = match cap.name("stem").map(|s| s.as_str()) {
        Some("index") | Some("_index") => parents.pop()?,
        Some(stem) => stem,
        None => return None,
    };
    Some(ContentTarget { parents, slug, is_markdown: true })
}

/// Reduces an internal link to the slug of the post it points at.
///
/// Three shapes count as post links: a root page (`/my-post/`), a page
/// under a posts section (`/posts/my-post/`), and a relative markdown file
/// (`../my-post.md`, `my-post/index.md#intro`). External URLs, pure
/// fragments, assets such as `/images/diagram.png` and any other site path
/// (`/tags/docker/`, `/categories/ops/`) give `None`.
pub fn link_target_slug(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || url.starts_with('#') || url.starts_with("//") || SCHEME_REGEX.is_match(url) {
        return None;
    }

    let absolute = url.starts_with('/');
    let target = content_target(url)?;

    let is_post = if absolute {
        match target.parents.as_slice() {
            [] => !LIST_PAGES.contains(&target.slug),
            [section] => POST_SECTIONS.contains(section),
            _ => false,
        }
    } else {
        target.is_markdown
    };

    is_post.then(|| target.slug.to_string())
}

/// `ref`/`relref` arguments are content paths, with or without `.md`:
/// `docker-mounts.md`, `posts/cdk-streaming`, `/posts/chat/index.md`.
fn ref_target_slug(target: &str) -> Option<String> {
    content_target(target.trim()).map(|t| t.slug.to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_yaml::Mapping;

    use super::*;

    fn targets<'a>(cross_links: &'a CrossLinks, path: &PostPath) -> &'a [PostPath] {
        cross_links.links.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    fn post(file: &str, slug: &str, body: &str) -> Post {
        Post::from_front_matter(PostPath::whole_file(PathBuf::from(file)), slug, Mapping::new(), body)
    }

    #[test]
    fn test_link_target_slug() {
        assert_eq!(link_target_slug("/other-post-slug").as_deref(), Some("other-post-slug"));
        assert_eq!(link_target_slug("/posts/other-post/").as_deref(), Some("other-post"));
        assert_eq!(link_target_slug("../other-post.md").as_deref(), Some("other-post"));
        assert_eq!(link_target_slug("other-post/index.md#setup").as_deref(), Some("other-post"));
        assert_eq!(link_target_slug("/posts/other-post?ref=home").as_deref(), Some("other-post"));
        assert_eq!(link_target_slug("/posts/other-post/index.md").as_deref(), Some("other-post"));
    }

    #[test]
    fn test_link_target_slug_ignored() {
        assert_eq!(link_target_slug("https://kubernetes.io/docs/"), None);
        assert_eq!(link_target_slug("mailto:someone@example.com"), None);
        assert_eq!(link_target_slug("//cdn.example.com/x.js"), None);
        assert_eq!(link_target_slug("#section"), None);
        assert_eq!(link_target_slug("/images/diagram.png"), None);
        assert_eq!(link_target_slug("/"), None);
        assert_eq!(link_target_slug(""), None);
        assert_eq!(link_target_slug("/tags/docker/"), None);
        assert_eq!(link_target_slug("/categories/ops/"), None);
        assert_eq!(link_target_slug("/tags/"), None);
        assert_eq!(link_target_slug("/posts/"), None);
        assert_eq!(link_target_slug("/docs/guides/setup/"), None);
        assert_eq!(link_target_slug("other-post/"), None);
    }

    #[test]
    fn test_taxonomy_links_are_not_posts() {
        let posts = vec![
            post("posts/docker.md", "docker", ""),
            post("posts/a.md", "a", "[x](/tags/docker/) [y](/tags/k8s/) [z](/categories/ops/) [d](/docker/)"),
        ];
        let cross_links = resolve_cross_links(&posts);
        assert_eq!(targets(&cross_links, &posts[1].path), [posts[0].path.clone()]);
        assert!(cross_links.issues.is_empty());

        let posts = vec![
            post("posts/docker.md", "docker", ""),
            post("posts/a.md", "a", "Tagged [docker](/tags/docker/)."),
        ];
        let cross_links = resolve_cross_links(&posts);
        assert!(targets(&cross_links, &posts[1].path).is_empty());
        assert!(cross_links.issues.is_empty());
    }

    #[test]
    fn test_extract_skips_code() {
        let body = r#"See [the HPA post](/k8s-hpa) and [docs](https://docs.aws.amazon.com).

```java
// [not a link](/inside-code)
```

Reference style [chat][1].

[1]: /spring-websocket-chat/
"#;
        let slugs = extract_link_slugs(body, Path::new("a.md"));
        assert_eq!(slugs, ["k8s-hpa", "spring-websocket-chat"]);
    }

    #[test]
    fn test_extract_ref_shortcodes() {
        let body = r#"Read {{< ref "docker-mounts.md" >}} and {{% relref "cdk-streaming" %}}.
Also {{< ref "/posts/spring-websocket-chat/index.md" >}}.
<!-- {{< ref "commented-out" >}} -->"#;
        let slugs = extract_link_slugs(body, Path::new("a.md"));
        assert_eq!(slugs, ["docker-mounts", "cdk-streaming", "spring-websocket-chat"]);
    }

    #[test]
    fn test_resolve_cross_links() {
        let posts = vec![
            post("posts/a.md", "a", "Links to [b](/b/) twice: [again](/b) and [missing](/nowhere)."),
            post("posts/b.md", "b", "Back to [a](../a.md)."),
            post("posts/c.md", "c", "No links here."),
        ];
        let cross_links = resolve_cross_links(&posts);

        assert_eq!(targets(&cross_links, &posts[0].path), [posts[1].path.clone()]);
        assert_eq!(targets(&cross_links, &posts[1].path), [posts[0].path.clone()]);
        assert!(targets(&cross_links, &posts[2].path).is_empty());
        assert_eq!(cross_links.links.len(), 3);

        assert_eq!(cross_links.issues.len(), 1);
        assert_eq!(cross_links.issues[0].path, posts[0].path);
        assert_eq!(cross_links.issues[0].kind, IssueKind::DanglingLink { target: "nowhere".to_string() });
        assert!(!cross_links.issues[0].is_hard());
    }

    #[test]
    fn test_duplicate_slug() {
        let posts = vec![
            post("posts/a.md", "a", ""),
            post("posts/a/index.md", "a", "[self](/a)"),
        ];
        let cross_links = resolve_cross_links(&posts);
        assert_eq!(cross_links.issues.len(), 1);
        assert!(matches!(cross_links.issues[0].kind, IssueKind::DuplicateSlug { ref slug, .. } if slug == "a"));
        assert_eq!(targets(&cross_links, &posts[1].path), [posts[0].path.clone()]);
    }

    #[test]
    fn test_segments_share_slug() {
        let file = PathBuf::from("posts/bundle.md");
        let first = Post::from_front_matter(PostPath::new(file.clone(), 0, 2), "bundle", Mapping::new(), "");
        let second = Post::from_front_matter(PostPath::new(file, 1, 2), "bundle", Mapping::new(), "[first](/bundle)");
        let posts = vec![first, second];
        let cross_links = resolve_cross_links(&posts);
        assert!(cross_links.issues.is_empty());
        assert_eq!(targets(&cross_links, &posts[1].path), [posts[0].path.clone()]);
    }
}
