//! Markdown popover describing a fetched package

use crate::registries::PackageMetadata;
use crate::utils::format_release_date;

const NPM_PACKAGE_URL: &str = "https://npmjs.com/package";

/// Rendered popover content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub markdown: String,
    /// No homepage is known, only the registry link is offered
    pub incomplete: bool,
}

pub fn npm_package_link(name: &str) -> String {
    format!("{}/{}", NPM_PACKAGE_URL, name)
}

/// Build the popover for `name`. Missing fields are left out rather than
/// rendered empty.
pub fn render_tooltip(name: &str, data: &PackageMetadata) -> Tooltip {
    let title = data.name.as_deref().unwrap_or(name);
    let mut parts = vec![format!("### {}", title)];

    if let Some(description) = data.description.as_deref().filter(|d| !d.is_empty()) {
        parts.push(description.to_string());
    }

    let mut info = Vec::new();
    match data.latest_version() {
        Some(latest) => {
            info.push(format!("**Latest version:** {}", latest));
            if let Some(date) = data.latest_release_date() {
                info.push(format!("**Release date:** {}", format_release_date(date)));
            }
        }
        None => info.push("No latest version".to_string()),
    }
    if let Some(author) = data.author_name() {
        info.push(format!("**Author:** {}", author));
    }
    parts.push(info.join("  \n"));

    let mut links = Vec::new();
    if let Some(homepage) = &data.homepage {
        links.push(format!("[Homepage]({})", homepage));
    }
    links.push(format!("[npm]({})", npm_package_link(title)));
    parts.push(links.join(" · "));

    Tooltip {
        markdown: parts.join("\n\n"),
        incomplete: data.homepage.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registries::{Author, DistTags};

    fn axios() -> PackageMetadata {
        let mut data = PackageMetadata {
            name: Some("axios".into()),
            description: Some("Promise based HTTP client".into()),
            author: Some(Author::Object {
                name: Some("X".into()),
            }),
            homepage: Some("http://x".into()),
            dist_tags: DistTags {
                latest: Some("0.0.5".into()),
            },
            ..Default::default()
        };
        data.time.insert("0.0.5".into(), "2017-05-01".into());
        data
    }

    #[test]
    fn test_full_tooltip() {
        let tooltip = render_tooltip("axios", &axios());
        assert!(!tooltip.incomplete);
        assert!(tooltip.markdown.starts_with("### axios"));
        assert!(tooltip.markdown.contains("Promise based HTTP client"));
        assert!(tooltip.markdown.contains("**Latest version:** 0.0.5"));
        assert!(tooltip.markdown.contains("**Release date:** May 1st, 2017"));
        assert!(tooltip.markdown.contains("**Author:** X"));
        assert!(tooltip.markdown.contains("[Homepage](http://x)"));
        assert!(
            tooltip
                .markdown
                .contains("[npm](https://npmjs.com/package/axios)")
        );
    }

    #[test]
    fn test_degraded_tooltip() {
        let data = PackageMetadata::default();
        let tooltip = render_tooltip("left-pad", &data);
        assert!(tooltip.incomplete);
        assert!(tooltip.markdown.starts_with("### left-pad"));
        assert!(tooltip.markdown.contains("No latest version"));
        assert!(!tooltip.markdown.contains("Release date"));
        assert!(!tooltip.markdown.contains("Author"));
        assert!(!tooltip.markdown.contains("Homepage"));
        assert!(
            tooltip
                .markdown
                .contains("https://npmjs.com/package/left-pad")
        );
    }

    #[test]
    fn test_scoped_package_link() {
        assert_eq!(
            npm_package_link("@babel/core"),
            "https://npmjs.com/package/@babel/core"
        );
    }
}
