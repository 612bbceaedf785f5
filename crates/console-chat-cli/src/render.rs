//! Terminal rendering of controller events
//!
//! The controller patches a streaming model message with its full text each
//! time; the renderer prints only the new suffix so the reply appears to type
//! itself out.

use console::style;

use console_chat_core::session::{GroundingChunk, Message};
use console_chat_core::ControllerEvent;

const MAX_ARGS_WIDTH: usize = 80;

#[derive(Default)]
pub struct Renderer {
    show_log: bool,
    /// Print user messages too (transcript replay)
    echo_user: bool,
    /// Id and printed text of the model message being streamed
    streaming: Option<(String, String)>,
    sources: Option<Vec<GroundingChunk>>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_show_log(&mut self, show: bool) {
        self.show_log = show;
    }

    pub fn set_echo_user(&mut self, echo: bool) {
        self.echo_user = echo;
    }

    /// Text to print for `event`, if any. Never ends mid-line except while a
    /// reply is streaming.
    pub fn render(&mut self, event: &ControllerEvent) -> Option<String> {
        match event {
            ControllerEvent::Message(message) => self.render_message(message),
            ControllerEvent::Cleared => {
                let mut out = self.finish_stream();
                out.push_str(&format!("{}\n", style("(conversation cleared)").dim()));
                Some(out)
            }
            ControllerEvent::Error(Some(message)) => {
                let mut out = self.finish_stream();
                out.push_str(&format!("{} {}\n", style("!").red().bold(), style(message).red()));
                Some(out)
            }
            ControllerEvent::Error(None) => None,
            ControllerEvent::Busy(true) => None,
            ControllerEvent::Busy(false) => non_empty(self.finish_stream()),
            ControllerEvent::Log(entry) if self.show_log => {
                let mut out = self.finish_stream();
                out.push_str(&format!("{}\n", style(entry.to_string()).dim()));
                Some(out)
            }
            ControllerEvent::Log(_) => None,
        }
    }

    fn render_message(&mut self, message: &Message) -> Option<String> {
        match message {
            Message::User(user) => {
                let mut out = self.finish_stream();
                if self.echo_user && !user.content.is_empty() {
                    out.push_str(&format!("{} {}\n", style("You:").bold().cyan(), user.content));
                }
                for file in &user.files {
                    out.push_str(&format!(
                        "  {} {} ({})\n",
                        style("+").dim(),
                        file.name,
                        format_size(file.size)
                    ));
                }
                non_empty(out)
            }
            Message::Model(model) if model.is_error => {
                let mut out = self.finish_stream();
                out.push_str(&format!("{}\n", style(&model.content).red()));
                Some(out)
            }
            Message::Model(model) => {
                self.sources = model.grounding_chunks.clone();
                match self.streaming.as_mut() {
                    Some((id, printed)) if *id == model.id => {
                        let out = match model.content.strip_prefix(printed.as_str()) {
                            Some(suffix) => suffix.to_string(),
                            // Final text replaced the streamed deltas
                            None => format!("\n{}", model.content),
                        };
                        *printed = model.content.clone();
                        non_empty(out)
                    }
                    _ => {
                        let mut out = self.finish_stream();
                        out.push_str(&format!("{} {}", style("Assistant:").bold().green(), model.content));
                        self.streaming = Some((model.id.clone(), model.content.clone()));
                        Some(out)
                    }
                }
            }
            Message::Action(action) => {
                let mut out = self.finish_stream();
                match &action.tool_results {
                    None => {
                        for call in &action.tool_calls {
                            out.push_str(&format!(
                                "  {} {} {}\n",
                                style("[calling]").dim(),
                                style(&call.name).yellow(),
                                style(compact_args(&call.args)).dim()
                            ));
                        }
                    }
                    Some(results) => {
                        for result in results {
                            match result.error_message() {
                                None => out.push_str(&format!(
                                    "  {} {}\n",
                                    style("✓").green(),
                                    style(format!("{} completed", result.name)).dim()
                                )),
                                Some(error) => out.push_str(&format!(
                                    "  {} {}\n",
                                    style("✗").red(),
                                    style(format!("{} failed: {}", result.name, error)).dim()
                                )),
                            }
                        }
                    }
                }
                Some(out)
            }
        }
    }

    /// End the streamed reply, printing its sources
    fn finish_stream(&mut self) -> String {
        let mut out = String::new();
        if self.streaming.take().is_some() {
            out.push('\n');
            if let Some(sources) = self.sources.take().filter(|s| !s.is_empty()) {
                out.push_str(&format!("{}\n", style("Sources:").dim()));
                for source in sources {
                    let label = source.title.as_deref().unwrap_or(&source.uri);
                    out.push_str(&format!("  {} {}\n", label, style(&source.uri).dim()));
                }
            }
        }
        out
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

fn compact_args(args: &serde_json::Value) -> String {
    let text = args.to_string();
    if text.chars().count() > MAX_ARGS_WIDTH {
        let cut: String = text.chars().take(MAX_ARGS_WIDTH).collect();
        format!("{}…", cut)
    } else {
        text
    }
}

pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_chat_core::session::{ModelMessage, ToolCall, ToolResult};
    use serde_json::json;

    fn model(id: &str, content: &str) -> ControllerEvent {
        ControllerEvent::Message(Message::Model(ModelMessage {
            id: id.to_string(),
            content: content.to_string(),
            grounding_chunks: None,
            is_error: false,
        }))
    }

    fn renderer() -> Renderer {
        console::set_colors_enabled(false);
        Renderer::new()
    }

    #[test]
    fn test_streaming_prints_suffixes() {
        let mut r = renderer();
        assert_eq!(r.render(&model("m1", "Hel")).unwrap(), "Assistant: Hel");
        assert_eq!(r.render(&model("m1", "Hello")).unwrap(), "lo");
        assert_eq!(r.render(&model("m1", "Hello")), None);
        assert_eq!(r.render(&ControllerEvent::Busy(false)).unwrap(), "\n");
        assert_eq!(r.render(&ControllerEvent::Busy(false)), None);
    }

    #[test]
    fn test_replaced_text_is_reprinted() {
        let mut r = renderer();
        r.render(&model("m1", "Draft"));
        assert_eq!(r.render(&model("m1", "Final")).unwrap(), "\nFinal");
    }

    #[test]
    fn test_action_lifecycle() {
        let mut r = renderer();
        let calls = vec![ToolCall::new("c1", "get_bucket", json!({"bucket_id": "x"}))];
        let pending = Message::pending_action(calls.clone());
        let out = r.render(&ControllerEvent::Message(pending.clone())).unwrap();
        assert!(out.contains("[calling] get_bucket"));

        let Message::Action(mut action) = pending else {
            unreachable!()
        };
        action.is_loading = false;
        action.tool_results = Some(vec![ToolResult::error("get_bucket", "Bucket not found")]);
        let out = r.render(&ControllerEvent::Message(Message::Action(action))).unwrap();
        assert!(out.contains("get_bucket failed: Bucket not found"));
    }

    #[test]
    fn test_log_hidden_by_default() {
        let mut r = renderer();
        let entry = ControllerEvent::Log(console_chat_core::LogEntry::now("Session ready"));
        assert_eq!(r.render(&entry), None);
        r.set_show_log(true);
        assert!(r.render(&entry).unwrap().contains("Session ready"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(12), "12 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(9 * 1024 * 1024), "9.0 MiB");
    }
}
