//! HTML rendering of the block tree.
//!
//! Markdown chunks are rendered from pulldown-cmark events; directives are
//! rendered by kind. Link, image, code callout and substitution validation
//! happen here, so diagnostics are only produced by a full parse.

use std::collections::HashSet;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, Tag, TagEnd};
use regex::Regex;

use crate::callout::EnhancedCode;
use crate::context::{ParserContext, line_column};
use crate::directive::parser::parse_blocks;
use crate::directive::settings::YamlSettings;
use crate::directive::{
    Admonition, Block, DirectiveBlock, DirectiveKind, ImageDirective, IncludeDirective,
    MarkdownChunk, SettingsDirective, TabItem,
};
use crate::document::heading_slug;
use crate::events::{ChunkEvents, INLINE_ANCHOR};
use crate::fence::Fence;
use crate::front_matter;
use crate::links::{self, Span};
use crate::slug::{HeadingSlugs, escape_html, slugify};
use crate::substitution::substitution_tokens;

/// `![alt](img.png "Title =50%x30")`
static IMAGE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\=(?<width>\d+%?)(?:x(?<height>\d+%?))?$").unwrap());

/// Renders blocks of one file to HTML.
pub(crate) struct HtmlRenderer<'c, 'a> {
    context: &'c ParserContext<'a>,
    output: String,
    slugs: HeadingSlugs,
    /// Closing tags of open lists.
    list_stack: Vec<&'static str>,
    /// Event indexes of lists explaining code callouts in the current chunk.
    callout_lists: HashSet<usize>,
    table: TableState,
    code: Option<PendingCode>,
    image: Option<PendingImage>,
}

/// Where a chunk's text came from, for diagnostics.
struct Source<'s> {
    text: &'s str,
    line: usize,
}

impl Source<'_> {
    fn span(&self, range: &std::ops::Range<usize>) -> Span {
        let (line, column) = line_column(self.text, self.line, range.start);
        Span {
            line,
            column,
            length: range.len(),
        }
    }
}

struct PendingCode {
    start: usize,
    info: String,
    /// `None` for indented code blocks.
    fence_len: Option<usize>,
    line: usize,
    content: String,
}

struct PendingImage {
    url: String,
    title: String,
    alt: String,
    span: Span,
}

#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    cell: usize,
}

impl TableState {
    fn alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell) {
            Some(Alignment::Left) => r#" style="text-align: left""#,
            Some(Alignment::Center) => r#" style="text-align: center""#,
            Some(Alignment::Right) => r#" style="text-align: right""#,
            _ => "",
        }
    }
}

impl<'c, 'a> HtmlRenderer<'c, 'a> {
    pub(crate) fn new(context: &'c ParserContext<'a>) -> Self {
        Self {
            context,
            output: String::with_capacity(4096),
            slugs: HeadingSlugs::default(),
            list_stack: Vec::new(),
            callout_lists: HashSet::new(),
            table: TableState::default(),
            code: None,
            image: None,
        }
    }

    pub(crate) fn render(mut self, blocks: &[Block]) -> String {
        self.render_blocks(blocks);
        self.output
    }

    fn render_blocks(&mut self, blocks: &[Block]) {
        for block in blocks {
            match block {
                Block::Markdown(chunk) => self.render_chunk(chunk),
                Block::Directive(directive) => self.render_directive(directive),
            }
        }
    }

    fn render_chunk(&mut self, chunk: &MarkdownChunk) {
        let events = ChunkEvents::parse(&chunk.text);
        let source = Source {
            text: &chunk.text,
            line: chunk.line,
        };
        self.callout_lists.clear();
        for idx in 0..events.events.len() {
            let (event, range) = &events.events[idx];
            match event {
                Event::Start(tag) => self.start_tag(&events, idx, tag, &source),
                Event::End(tag) => self.end_tag(&events, tag),
                Event::Text(text) => self.text(text, range.start, &source),
                Event::Code(code) => {
                    let _ = write!(self.output, "<code>{}</code>", escape_html(code));
                }
                Event::Html(html) | Event::InlineHtml(html) => self.push_inline(&escape_html(html)),
                Event::SoftBreak | Event::HardBreak => {
                    if let Some(code) = &mut self.code {
                        code.content.push('\n');
                    } else {
                        self.push_inline("<br />");
                    }
                }
                Event::Rule => self.output.push_str("<hr />"),
                Event::TaskListMarker(checked) => {
                    let checked = if *checked { " checked" } else { "" };
                    let _ = write!(self.output, r#"<input type="checkbox" disabled{checked} />"#);
                }
                Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {}
            }
        }
    }

    /// Push inline markup unless image alt text is being collected.
    fn push_inline(&mut self, html: &str) {
        if self.image.is_none() {
            self.output.push_str(html);
        }
    }

    fn start_tag(&mut self, events: &ChunkEvents<'_>, idx: usize, tag: &Tag<'_>, source: &Source<'_>) {
        let range = &events.events[idx].1;
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                let slug = heading_slug(events, idx, &mut self.slugs);
                let level = crate::events::heading_level(*level);
                let _ = write!(self.output, r#"<h{level} id="{slug}">"#);
            }
            Tag::BlockQuote(_) => self.output.push_str("<blockquote>"),
            Tag::CodeBlock(kind) => {
                let (info, fence_len) = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let opener = source.text[range.start..].lines().next().unwrap_or_default();
                        let fence = Fence::detect(opener.trim_start(), &['`', '~']);
                        (info.to_string(), Some(fence.map_or(3, |f| f.len)))
                    }
                    CodeBlockKind::Indented => (String::new(), None),
                };
                self.code = Some(PendingCode {
                    start: idx,
                    info,
                    fence_len,
                    line: source.span(range).line,
                    content: String::new(),
                });
            }
            Tag::List(start) => {
                if self.callout_lists.contains(&idx) {
                    self.list_stack.push("</ol>");
                    self.output.push_str(r#"<ol class="code-callouts">"#);
                    return;
                }
                match start {
                    Some(1) => self.output.push_str("<ol>"),
                    Some(n) => {
                        let _ = write!(self.output, r#"<ol start="{n}">"#);
                    }
                    None => self.output.push_str("<ul>"),
                }
                self.list_stack
                    .push(if start.is_some() { "</ol>" } else { "</ul>" });
            }
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table = TableState {
                    alignments: alignments.clone(),
                    ..TableState::default()
                };
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell = 0;
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.cell = 0;
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let cell = if self.table.in_head { "th" } else { "td" };
                let _ = write!(self.output, "<{cell}{}>", self.table.alignment_style());
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link { dest_url, .. } => {
                let has_text = events.ends[idx] > idx + 1;
                let outcome =
                    links::process_link(dest_url, has_text, false, self.context, source.span(range));
                self.push_inline(&format!(r#"<a href="{}">"#, escape_html(&outcome.url)));
                if let Some(title) = outcome.auto_title {
                    self.push_inline(&escape_html(&title));
                }
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    url: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                    span: source.span(range),
                });
            }
        }
    }

    fn end_tag(&mut self, events: &ChunkEvents<'_>, tag: &TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(level) => {
                let _ = write!(self.output, "</h{}>", crate::events::heading_level(*level));
            }
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>"),
            TagEnd::CodeBlock => self.finish_code(events),
            TagEnd::List(_) => {
                let close = self.list_stack.pop().unwrap_or("</ul>");
                self.output.push_str(close);
            }
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.output.push_str("</tr></thead><tbody>");
                self.table.in_head = false;
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output
                    .push_str(if self.table.in_head { "</th>" } else { "</td>" });
                self.table.cell += 1;
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image => self.finish_image(),
        }
    }

    fn text(&mut self, text: &str, offset: usize, source: &Source<'_>) {
        if let Some(code) = &mut self.code {
            code.content.push_str(text);
            return;
        }
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
            return;
        }
        let mut last = 0;
        for anchor in INLINE_ANCHOR.captures_iter(text) {
            let Some(whole) = anchor.get(0) else {
                continue;
            };
            self.substituted_text(&text[last..whole.start()], offset + last, source);
            let _ = write!(self.output, r#"<a id="{}"></a>"#, slugify(&anchor[1]));
            last = whole.end();
        }
        self.substituted_text(&text[last..], offset + last, source);
    }

    /// Write `text`, replacing `{{key}}` tokens. Undefined keys are reported
    /// and kept as written.
    fn substituted_text(&mut self, text: &str, offset: usize, source: &Source<'_>) {
        let mut last = 0;
        for token in substitution_tokens(text) {
            self.output.push_str(&escape_html(&text[last..token.range.start]));
            if let Some(value) = self.context.substitutions.get(&token.key) {
                self.output.push_str(&escape_html(value));
            } else {
                let (line, column) = line_column(source.text, source.line, offset + token.range.start);
                self.context.emitter.error_at(
                    line,
                    column,
                    token.range.len(),
                    format!("Substitution key {{{}}} is undefined", token.key),
                );
                self.output.push_str(&escape_html(&text[token.range.clone()]));
            }
            last = token.range.end;
        }
        self.output.push_str(&escape_html(&text[last..]));
    }

    fn finish_code(&mut self, events: &ChunkEvents<'_>) {
        let Some(pending) = self.code.take() else {
            return;
        };
        let Some(fence_len) = pending.fence_len else {
            let _ = write!(
                self.output,
                "<pre><code>{}</code></pre>",
                escape_html(&pending.content)
            );
            return;
        };
        let code = EnhancedCode::parse(
            &pending.info,
            &pending.content,
            fence_len,
            &self.context.substitutions,
            &self.context.emitter,
            pending.line,
        );
        self.output.push_str(&code.to_html());
        if !code.has_inline_annotations() && code.classic_callout_count() > 0 {
            self.pair_callout_list(events, pending.start, code.classic_callout_count(), pending.line);
        }
    }

    /// Find the list explaining a code block's classic callouts. One block,
    /// such as a caption paragraph, may sit between the code and the list.
    fn pair_callout_list(&mut self, events: &ChunkEvents<'_>, code: usize, callouts: usize, line: usize) {
        let next_sibling = |idx: usize| {
            let next = events.ends[idx] + 1;
            (next < events.events.len()
                && events.depths[next] == events.depths[idx]
                && matches!(events.events[next].0, Event::Start(_)))
            .then_some(next)
        };
        let is_list = |idx: usize| matches!(events.events[idx].0, Event::Start(Tag::List(_)));
        let emitter = &self.context.emitter;

        let Some(first) = next_sibling(code) else {
            emitter.error_at_line(
                line,
                "Code block with annotations is not followed by any content, needs numbered list",
            );
            return;
        };
        let list = if is_list(first) {
            Some(first)
        } else {
            next_sibling(first).filter(|&idx| is_list(idx))
        };
        let Some(list) = list else {
            emitter.error_at_line(line, "Code block with annotations is not followed by a list");
            return;
        };

        let items = (list + 1..events.ends[list])
            .filter(|&idx| {
                events.depths[idx] == events.depths[list] + 1
                    && matches!(events.events[idx].0, Event::Start(Tag::Item))
            })
            .count();
        if items < callouts {
            emitter.error_at_line(
                line,
                format!("Code block has {callouts} callouts but the following list only has {items}"),
            );
        }
        self.callout_lists.insert(list);
    }

    fn finish_image(&mut self) {
        let Some(image) = self.image.take() else {
            return;
        };
        let outcome = links::process_link(&image.url, true, true, self.context, image.span);
        let mut title = image.title.as_str();
        let mut size = None;
        if let Some(caps) = IMAGE_SIZE.captures(title) {
            let width = pixels(&caps["width"]);
            let height = caps.name("height").map_or_else(|| width.clone(), |h| pixels(h.as_str()));
            size = Some((width, height));
            title = &title[..caps.get(0).map_or(title.len(), |m| m.start())];
        }

        let _ = write!(
            self.output,
            r#"<img src="{}" alt="{}""#,
            escape_html(&outcome.url),
            escape_html(&image.alt)
        );
        if !title.is_empty() {
            let _ = write!(self.output, r#" title="{}""#, escape_html(title));
        }
        if let Some((width, height)) = size {
            let _ = write!(self.output, r#" width="{width}" height="{height}""#);
        }
        self.output.push_str(" />");
    }

    fn render_directive(&mut self, directive: &DirectiveBlock) {
        match &directive.kind {
            DirectiveKind::Admonition(admonition) | DirectiveKind::Dropdown(admonition) => {
                self.render_admonition(directive, admonition);
            }
            DirectiveKind::Image(image) => {
                let tag = image_tag(image, directive.cross_reference_name.as_deref());
                self.output.push_str(&tag);
            }
            DirectiveKind::Figure(image) => {
                let _ = write!(
                    self.output,
                    "<figure{}>{}<figcaption>",
                    id_attr(directive.cross_reference_name.as_deref()),
                    image_tag(image, None)
                );
                self.render_blocks(&directive.children);
                self.output.push_str("</figcaption></figure>");
            }
            DirectiveKind::Include(_) => {
                if let Some(path) = directive.included_snippet() {
                    self.render_snippet(directive, path);
                }
            }
            DirectiveKind::LiteralInclude(include) => self.render_literal_include(directive, include),
            DirectiveKind::Settings(settings) => self.render_settings(directive, settings),
            DirectiveKind::TabSet(set) => {
                let group = set
                    .group
                    .as_deref()
                    .map(|g| format!(r#" data-group="{}""#, escape_html(g)))
                    .unwrap_or_default();
                let _ = write!(self.output, r#"<div class="tab-set"{group}>"#);
                let any_selected = directive.children.iter().any(|child| {
                    matches!(child, Block::Directive(d) if matches!(&d.kind, DirectiveKind::TabItem(item) if item.selected))
                });
                for child in &directive.children {
                    match child {
                        Block::Directive(d) => match &d.kind {
                            DirectiveKind::TabItem(item) => self.render_tab_item(d, item, any_selected),
                            _ => self.render_directive(d),
                        },
                        Block::Markdown(chunk) => self.render_chunk(chunk),
                    }
                }
                self.output.push_str("</div>");
            }
            DirectiveKind::TabItem(item) => self.render_tab_item(directive, item, false),
            DirectiveKind::Version(version) => {
                let _ = write!(
                    self.output,
                    r#"<div class="version-{}"{}><p class="version-title">{}</p><div class="version-content">"#,
                    escape_html(&version.class),
                    id_attr(directive.cross_reference_name.as_deref()),
                    escape_html(&version.title)
                );
                self.render_blocks(&directive.children);
                self.output.push_str("</div></div>");
            }
            DirectiveKind::Mermaid => {
                let mut source = String::new();
                collect_text(&directive.children, &mut source);
                let _ = write!(self.output, r#"<pre class="mermaid">{}</pre>"#, escape_html(source.trim()));
            }
            DirectiveKind::Unsupported { .. } | DirectiveKind::Unknown => {
                self.render_blocks(&directive.children);
            }
        }
    }

    fn render_admonition(&mut self, directive: &DirectiveBlock, admonition: &Admonition) {
        let mut class = format!("admonition {}", admonition.kind);
        if let Some(classes) = &admonition.classes {
            class.push(' ');
            class.push_str(classes);
        }
        let id = id_attr(directive.cross_reference_name.as_deref());
        let title = escape_html(&admonition.title);
        if admonition.is_collapsible() {
            let open = if admonition.open == Some(true) { " open" } else { "" };
            let _ = write!(
                self.output,
                r#"<details class="{class}"{id}{open}><summary class="admonition-title">{title}</summary><div class="admonition-content">"#
            );
            self.render_blocks(&directive.children);
            self.output.push_str("</div></details>");
        } else {
            let _ = write!(
                self.output,
                r#"<div class="{class}"{id}><p class="admonition-title">{title}</p><div class="admonition-content">"#
            );
            self.render_blocks(&directive.children);
            self.output.push_str("</div></div>");
        }
    }

    fn render_tab_item(&mut self, directive: &DirectiveBlock, item: &TabItem, any_selected: bool) {
        let set = item.tab_set_index.unwrap_or_default();
        let id = format!("tabs-item-{set}-{}", item.index);
        let checked = if item.selected || (!any_selected && item.index == 0) {
            " checked"
        } else {
            ""
        };
        let sync = item
            .sync_key
            .as_deref()
            .map(|key| {
                format!(
                    r#" data-sync-id="{}" data-sync-group="{}""#,
                    escape_html(key),
                    escape_html(item.tab_set_group.as_deref().unwrap_or_default())
                )
            })
            .unwrap_or_default();
        let _ = write!(
            self.output,
            r#"<input type="radio" id="{id}" name="tabs-{set}" class="tab-input"{checked}{sync} /><label for="{id}" class="tab-label">{}</label><div class="tab-content">"#,
            escape_html(&item.title)
        );
        self.render_blocks(&directive.children);
        self.output.push_str("</div>");
    }

    fn render_snippet(&mut self, directive: &DirectiveBlock, path: &Path) {
        let relative = self.context.display_path(path);
        if self.context.is_including(path) {
            self.context.emitter.error_at_line(
                directive.line,
                format!("{{include}} cyclical include detected `{relative}`"),
            );
            return;
        }
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                self.context
                    .emitter
                    .error_at_line(directive.line, format!("Unable to read `{relative}`: {e}"));
                return;
            }
        };
        let context = self.context.for_include(path);
        let split = front_matter::split(&source);
        let blocks = parse_blocks(split.body, split.body_line, &context);
        let html = HtmlRenderer::new(&context).render(&blocks);
        self.output.push_str(&html);
    }

    fn render_literal_include(&mut self, directive: &DirectiveBlock, include: &IncludeDirective) {
        let Some(path) = include.path.as_deref().filter(|_| include.found) else {
            return;
        };
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                self.context.emitter.error_at_line(
                    directive.line,
                    format!("Unable to read `{}`: {e}", self.context.display_path(path)),
                );
                return;
            }
        };
        let _ = write!(
            self.output,
            r#"<div class="literal-include"{}>"#,
            id_attr(include.label.as_deref())
        );
        if let Some(caption) = &include.caption {
            let _ = write!(self.output, r#"<p class="caption">{}</p>"#, escape_html(caption));
        }
        let class = include
            .language
            .as_deref()
            .map(|lang| format!(r#" class="language-{}""#, escape_html(lang)))
            .unwrap_or_default();
        let _ = write!(
            self.output,
            r#"<div class="highlight"><pre><code{class}>{}</code></pre></div></div>"#,
            escape_html(content.trim_end())
        );
    }

    fn render_settings(&mut self, directive: &DirectiveBlock, settings: &SettingsDirective) {
        let Some(path) = settings.path.as_deref().filter(|_| settings.found) else {
            return;
        };
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|yaml| YamlSettings::parse(&yaml).map_err(|e| e.to_string()));
        match parsed {
            Ok(parsed) => {
                let context = self.context;
                let html = parsed.to_html(&|markdown: &str| render_fragment(context, markdown));
                self.output.push_str(&html);
            }
            Err(e) => self.context.emitter.error_at_line(
                directive.line,
                format!("Can not be parsed as a valid settings file: {e}"),
            ),
        }
    }
}

/// Render a standalone piece of markdown in `context`.
fn render_fragment(context: &ParserContext<'_>, markdown: &str) -> String {
    let blocks = parse_blocks(markdown, 1, context);
    HtmlRenderer::new(context).render(&blocks)
}

fn image_tag(image: &ImageDirective, id: Option<&str>) -> String {
    let mut html = String::new();
    if let Some(target) = &image.target {
        let _ = write!(html, r#"<a href="{}">"#, escape_html(target));
    }
    let _ = write!(
        html,
        r#"<img src="{}" alt="{}"{}"#,
        escape_html(image.src.as_deref().unwrap_or_default()),
        escape_html(image.alt.as_deref().unwrap_or_default()),
        id_attr(id)
    );
    for (name, value) in [
        ("width", &image.width),
        ("height", &image.height),
        ("data-scale", &image.scale),
    ] {
        if let Some(value) = value {
            let _ = write!(html, r#" {name}="{}""#, escape_html(value));
        }
    }
    if let Some(align) = &image.align {
        let _ = write!(html, r#" class="align-{}""#, escape_html(align));
    }
    html.push_str(" />");
    if image.target.is_some() {
        html.push_str("</a>");
    }
    html
}

fn id_attr(name: Option<&str>) -> String {
    name.map(|n| format!(r#" id="{}""#, slugify(n)))
        .unwrap_or_default()
}

fn pixels(value: &str) -> String {
    if value.ends_with('%') {
        value.to_owned()
    } else {
        format!("{value}px")
    }
}

fn collect_text(blocks: &[Block], out: &mut String) {
    for block in blocks {
        match block {
            Block::Markdown(chunk) => out.push_str(&chunk.text),
            Block::Directive(directive) => collect_text(&directive.children, out),
        }
    }
}
