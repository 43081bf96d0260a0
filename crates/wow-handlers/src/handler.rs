//! The handler capability and the tool registry.

use wow_core::{Decision, ToolName, ToolRequest};

use crate::context::GatewayContext;

/// One per-tool validator. `handle` renders a verdict; it must not mutate
/// state except through the context.
pub trait ToolHandler {
    fn tool(&self) -> ToolName;
    fn handle(&self, request: &ToolRequest, cx: &mut GatewayContext) -> Decision;
}

/// Process-global in spirit: built once at startup, read-only afterwards.
/// Tests inject fakes into a local registry instead.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<(String, Box<dyn ToolHandler>)>,
}

impl HandlerRegistry {
    pub fn new() -> HandlerRegistry {
        HandlerRegistry::default()
    }

    /// Idempotent: a second registration for the same tool replaces the
    /// first, keeping its position.
    pub fn register(&mut self, tool_name: impl Into<String>, handler: Box<dyn ToolHandler>) {
        let tool_name = tool_name.into();
        if let Some(slot) = self.handlers.iter_mut().find(|(name, _)| *name == tool_name) {
            slot.1 = handler;
        } else {
            self.handlers.push((tool_name, handler));
        }
    }

    pub fn has_handler(&self, tool_name: &str) -> bool {
        self.handlers.iter().any(|(name, _)| name == tool_name)
    }

    pub fn get(&self, tool_name: &str) -> Option<&dyn ToolHandler> {
        self.handlers
            .iter()
            .find(|(name, _)| name == tool_name)
            .map(|(_, handler)| handler.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Registry with all ten built-in handlers.
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(
        ToolName::Bash.as_str(),
        Box::new(crate::bash::BashHandler::new()),
    );
    registry.register(
        ToolName::Write.as_str(),
        Box::new(crate::files::WriteHandler::new()),
    );
    registry.register(
        ToolName::Edit.as_str(),
        Box::new(crate::files::EditHandler::new()),
    );
    registry.register(
        ToolName::Read.as_str(),
        Box::new(crate::read::ReadHandler::new()),
    );
    registry.register(
        ToolName::Glob.as_str(),
        Box::new(crate::search::GlobHandler::new()),
    );
    registry.register(
        ToolName::Grep.as_str(),
        Box::new(crate::search::GrepHandler::new()),
    );
    registry.register(
        ToolName::Task.as_str(),
        Box::new(crate::task::TaskHandler::new()),
    );
    registry.register(
        ToolName::WebFetch.as_str(),
        Box::new(crate::web::WebFetchHandler::new()),
    );
    registry.register(
        ToolName::WebSearch.as_str(),
        Box::new(crate::web::WebSearchHandler::new()),
    );
    registry.register(
        ToolName::NotebookEdit.as_str(),
        Box::new(crate::files::NotebookEditHandler::new()),
    );
    registry
}
