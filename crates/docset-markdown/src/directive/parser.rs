//! Block tree construction.
//!
//! Processes the document line by line, keeping a stack of open directives.
//! Lines inside code fences are never interpreted. Everything that is not
//! directive syntax accumulates into [`MarkdownChunk`]s that are later handed
//! to pulldown-cmark.

use super::registry::{self, DirectiveType};
use super::{Block, MarkdownChunk, Opening, Placement, Properties, TabSetRef, finalize};
use crate::context::ParserContext;
use crate::fence::{Fence, FenceTracker};

/// Info strings that open code blocks rather than directives.
const CODE_DIRECTIVES: [&str; 4] = ["{code}", "{code-block}", "{sourcecode}", "{applies_to}"];

/// Build the block tree for `text`, whose first line is source line
/// `first_line`.
pub(crate) fn parse_blocks(
    text: &str,
    first_line: usize,
    context: &ParserContext<'_>,
) -> Vec<Block> {
    let mut stack = vec![Frame::new(None)];

    for (idx, line) in text.split_inclusive('\n').enumerate() {
        let line_no = first_line + idx;
        let Some(top) = stack.last_mut() else {
            break;
        };

        if top.code.in_fence() {
            top.code.update(line);
            top.push_line(line, line_no);
            continue;
        }

        if top.closes(line) {
            close_top(&mut stack, context);
            continue;
        }

        if top.accepts_properties()
            && let Some((key, value)) = parse_property(line)
            && let Some(opening) = top.opening.as_mut()
        {
            opening.properties.insert(key, value);
            continue;
        }

        if let Some(opening) = parse_opening(line, line_no) {
            top.flush();
            stack.push(Frame::new(Some(opening)));
            continue;
        }

        // MyST comment
        if line.starts_with('%') {
            continue;
        }

        top.code.update(line);
        top.push_line(line, line_no);
    }

    while stack.len() > 1 {
        close_top(&mut stack, context);
    }
    stack
        .pop()
        .map(|mut root| {
            root.flush();
            root.children
        })
        .unwrap_or_default()
}

/// An open container: the document root or a directive.
struct Frame {
    opening: Option<Opening>,
    children: Vec<Block>,
    pending: String,
    pending_line: usize,
    code: FenceTracker,
}

impl Frame {
    fn new(opening: Option<Opening>) -> Self {
        Self {
            opening,
            children: Vec::new(),
            pending: String::new(),
            pending_line: 0,
            code: FenceTracker::default(),
        }
    }

    fn closes(&self, line: &str) -> bool {
        self.opening
            .as_ref()
            .is_some_and(|opening| opening.fence.is_closed_by(line))
    }

    /// Properties are only read directly after the opening line.
    fn accepts_properties(&self) -> bool {
        self.opening.is_some() && self.children.is_empty() && self.pending.trim().is_empty()
    }

    fn push_line(&mut self, line: &str, line_no: usize) {
        if self.pending.is_empty() {
            self.pending_line = line_no;
        }
        self.pending.push_str(line);
    }

    fn flush(&mut self) {
        let text = std::mem::take(&mut self.pending);
        if !text.trim().is_empty() {
            self.children.push(Block::Markdown(MarkdownChunk {
                text,
                line: self.pending_line,
            }));
        }
    }

    fn tab_set(&self) -> Option<TabSetRef> {
        self.opening
            .as_ref()
            .filter(|opening| opening.directive_type == DirectiveType::TabSet)
            .map(|opening| TabSetRef {
                index: opening.line,
                group: opening.properties.get(&["group"]).map(str::to_owned),
            })
    }
}

fn close_top(stack: &mut Vec<Frame>, context: &ParserContext<'_>) {
    let Some(mut frame) = stack.pop() else {
        return;
    };
    frame.flush();
    let Some(opening) = frame.opening else {
        return;
    };
    let Some(parent) = stack.last_mut() else {
        return;
    };
    let placement = Placement {
        sibling_index: parent.children.len(),
        tab_set: parent.tab_set(),
    };
    let block = finalize(opening, frame.children, &placement, context);
    parent.children.push(Block::Directive(block));
}

/// Parse a directive opening line such as `:::{note} Title`.
pub(crate) fn parse_opening(line: &str, line_no: usize) -> Option<Opening> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent >= 4 {
        return None;
    }
    let trimmed = line.trim();
    let fence = Fence::detect(trimmed, &[':', '`'])?;
    if CODE_DIRECTIVES.iter().any(|code| trimmed.contains(code)) {
        return None;
    }

    // fence chars are ASCII
    let rest = trimmed[fence.len..].strip_prefix('{')?;
    let (name, arguments) = rest.split_once('}')?;
    if !registry::is_valid_directive_name(name) {
        return None;
    }
    let arguments = arguments.trim();

    Some(Opening {
        name: name.to_owned(),
        arguments: (!arguments.is_empty()).then(|| arguments.to_owned()),
        properties: Properties::default(),
        line: line_no,
        column: indent + 1,
        fence,
        directive_type: registry::lookup(name),
    })
}

/// Parse a `:key: value` property line.
fn parse_property(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.starts_with(":::") {
        return None;
    }
    let (key, value) = trimmed.strip_prefix(':')?.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key.to_lowercase(), value.trim().to_owned()))
}
