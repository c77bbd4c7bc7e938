//! Page layout around rendered markdown.

use std::fmt::Write as _;

use docset_markdown::escape_html;

use crate::set::MarkdownPage;

/// A page linked from the layout.
#[derive(Clone, Copy, Debug)]
pub struct PageLink<'a> {
    pub title: &'a str,
    pub url: &'a str,
}

impl<'a> From<&'a MarkdownPage> for PageLink<'a> {
    fn from(page: &'a MarkdownPage) -> Self {
        Self {
            title: &page.navigation_title,
            url: &page.url,
        }
    }
}

/// Everything the layout shows besides the article itself.
#[derive(Debug)]
pub struct PageLayout<'a> {
    pub page: &'a MarkdownPage,
    pub project: Option<&'a str>,
    /// Outermost first.
    pub parents: Vec<PageLink<'a>>,
    pub previous: Option<PageLink<'a>>,
    pub next: Option<PageLink<'a>>,
}

impl PageLayout<'_> {
    /// Complete HTML document wrapping `article`.
    pub fn render(&self, article: &str) -> String {
        let mut html = String::with_capacity(article.len() + 1024);
        let title = match self.project {
            Some(project) => format!("{} | {}", self.page.title, project),
            None => self.page.title.clone(),
        };

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n");
        let _ = writeln!(html, "<title>{}</title>", escape_html(&title));
        if self.page.hidden {
            html.push_str("<meta name=\"robots\" content=\"noindex\" />\n");
        }
        html.push_str("</head>\n<body>\n");

        if !self.parents.is_empty() {
            html.push_str("<nav class=\"breadcrumbs\"><ol>");
            for parent in &self.parents {
                let _ = write!(
                    html,
                    "<li><a href=\"{}\">{}</a></li>",
                    escape_html(parent.url),
                    escape_html(parent.title)
                );
            }
            html.push_str("</ol></nav>\n");
        }

        if !self.page.toc.is_empty() {
            html.push_str("<nav class=\"page-toc\"><ul>");
            for item in &self.page.toc {
                let _ = write!(
                    html,
                    "<li class=\"level-{}\"><a href=\"#{}\">{}</a></li>",
                    item.level,
                    escape_html(&item.slug),
                    escape_html(&item.heading)
                );
            }
            html.push_str("</ul></nav>\n");
        }

        html.push_str("<article>\n");
        html.push_str(article);
        html.push_str("\n</article>\n");

        if self.previous.is_some() || self.next.is_some() {
            html.push_str("<nav class=\"pagination\">");
            if let Some(previous) = &self.previous {
                let _ = write!(
                    html,
                    "<a rel=\"prev\" href=\"{}\">{}</a>",
                    escape_html(previous.url),
                    escape_html(previous.title)
                );
            }
            if let Some(next) = &self.next {
                let _ = write!(
                    html,
                    "<a rel=\"next\" href=\"{}\">{}</a>",
                    escape_html(next.url),
                    escape_html(next.title)
                );
            }
            html.push_str("</nav>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use docset_markdown::PageTocItem;

    use super::*;

    fn page(hidden: bool) -> MarkdownPage {
        MarkdownPage {
            path: PathBuf::from("/docs/setup.md"),
            relative_path: "setup.md".to_owned(),
            url: "/setup".to_owned(),
            title: "Setup & install".to_owned(),
            navigation_title: "Setup".to_owned(),
            toc: vec![PageTocItem {
                heading: "Requirements".to_owned(),
                slug: "requirements".to_owned(),
                level: 2,
            }],
            anchors: BTreeSet::new(),
            hidden,
            navigation_index: 2,
        }
    }

    #[test]
    fn test_render_layout() {
        let page = page(false);
        let layout = PageLayout {
            page: &page,
            project: Some("Guide"),
            parents: vec![PageLink { title: "Home", url: "/" }],
            previous: Some(PageLink { title: "Home", url: "/" }),
            next: None,
        };

        let html = layout.render("<p>Body</p>");

        assert!(html.contains("<title>Setup &amp; install | Guide</title>"));
        assert!(html.contains("<li><a href=\"/\">Home</a></li>"));
        assert!(html.contains("<li class=\"level-2\"><a href=\"#requirements\">Requirements</a></li>"));
        assert!(html.contains("<article>\n<p>Body</p>\n</article>"));
        assert!(html.contains("<a rel=\"prev\" href=\"/\">Home</a>"));
        assert!(!html.contains("rel=\"next\""));
        assert!(!html.contains("noindex"));
    }

    #[test]
    fn test_hidden_page_is_not_indexed() {
        let page = page(true);
        let layout = PageLayout {
            page: &page,
            project: None,
            parents: Vec::new(),
            previous: None,
            next: None,
        };

        let html = layout.render("");

        assert!(html.contains("<meta name=\"robots\" content=\"noindex\" />"));
        assert!(html.contains("<title>Setup &amp; install</title>"));
        assert!(!html.contains("breadcrumbs"));
    }
}
