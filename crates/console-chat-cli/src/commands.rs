//! Slash command parsing for the REPL
//!
//! Anything that does not start with `/` is a chat message.

use std::path::PathBuf;

use console_chat_core::{ResourceRef, ToolCategory};

/// Every slash command, for help output and completion
pub const COMMANDS: &[(&str, &str)] = &[
    ("/project", "<id> [name] | none   Select the project"),
    ("/db", "<id> [name] | none   Select a database"),
    ("/collection", "<id> [name] | none   Select a collection (needs a database)"),
    ("/bucket", "<id> [name] | none   Select a storage bucket"),
    ("/function", "<id> [name] | none   Select a function"),
    ("/tools", "[enable|disable <category>]   Show or toggle tool categories"),
    ("/provider", "<id>   Switch model provider"),
    ("/model", "<id>   Switch model"),
    ("/thinking", "on|off   Toggle extended thinking"),
    ("/key", "<api-key> | none   Set the model API key for this run"),
    ("/attach", "<path>   Attach a file to the next message"),
    ("/clear", "Clear the conversation and start a fresh session"),
    ("/resend", "Send the last message again"),
    ("/save", "Save the conversation"),
    ("/load", "<id>   Load a saved conversation"),
    ("/list", "List saved conversations"),
    ("/log", "on|off   Show activity log entries"),
    ("/status", "Show the current context and session"),
    ("/help", "Show this help"),
    ("/quit", "Exit"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum ToolsAction {
    Show,
    Enable(ToolCategory),
    Disable(ToolCategory),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Chat(String),
    Project(Option<ResourceRef>),
    Database(Option<ResourceRef>),
    Collection(Option<ResourceRef>),
    Bucket(Option<ResourceRef>),
    Function(Option<ResourceRef>),
    Tools(ToolsAction),
    Provider(String),
    Model(String),
    Thinking(bool),
    Key(Option<String>),
    Attach(PathBuf),
    Clear,
    Resend,
    Save,
    Load(String),
    List,
    Log(bool),
    Status,
    Help,
    Quit,
}

/// `<id> [name...]`, or `None` for `none`
fn parse_resource(args: &str) -> Result<Option<ResourceRef>, String> {
    let mut parts = args.splitn(2, char::is_whitespace);
    match parts.next().filter(|s| !s.is_empty()) {
        None => Err("expected an id, or 'none'".to_string()),
        Some("none") => Ok(None),
        Some(id) => Ok(Some(match parts.next().map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => ResourceRef::new(id, name),
            None => ResourceRef::from_id(id),
        })),
    }
}

fn parse_switch(args: &str) -> Result<bool, String> {
    match args {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err("expected 'on' or 'off'".to_string()),
    }
}

fn required(args: &str, what: &str) -> Result<String, String> {
    if args.is_empty() {
        Err(format!("expected {}", what))
    } else {
        Ok(args.to_string())
    }
}

/// Parse one input line
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Chat(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "project" => Command::Project(parse_resource(args)?),
        "db" | "database" => Command::Database(parse_resource(args)?),
        "collection" => Command::Collection(parse_resource(args)?),
        "bucket" => Command::Bucket(parse_resource(args)?),
        "function" => Command::Function(parse_resource(args)?),
        "tools" => {
            let mut parts = args.split_whitespace();
            match (parts.next(), parts.next()) {
                (None, _) => Command::Tools(ToolsAction::Show),
                (Some(action @ ("enable" | "disable")), Some(category)) => {
                    let category: ToolCategory = category.parse()?;
                    if action == "enable" {
                        Command::Tools(ToolsAction::Enable(category))
                    } else {
                        Command::Tools(ToolsAction::Disable(category))
                    }
                }
                _ => return Err("usage: /tools [enable|disable <category>]".to_string()),
            }
        }
        "provider" => Command::Provider(required(args, "a provider id")?),
        "model" => Command::Model(required(args, "a model id")?),
        "thinking" => Command::Thinking(parse_switch(args)?),
        "key" => match args {
            "" => return Err("expected an API key, or 'none'".to_string()),
            "none" => Command::Key(None),
            key => Command::Key(Some(key.to_string())),
        },
        "attach" => Command::Attach(PathBuf::from(required(args, "a file path")?)),
        "clear" => Command::Clear,
        "resend" | "retry" => Command::Resend,
        "save" => Command::Save,
        "load" => Command::Load(required(args, "a transcript id")?),
        "list" => Command::List,
        "log" => Command::Log(parse_switch(args)?),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command: /{}", other)),
    };
    Ok(command)
}
