//! Interactive line-oriented chat loop
//!
//! Reads a line, runs the matching controller operation in a task and renders
//! the controller's events while it runs.

use std::future::Future;
use std::io::Write;

use console::style;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use tokio::sync::mpsc::UnboundedReceiver;

use console_chat_core::config::Config;
use console_chat_core::provider::catalog;
use console_chat_core::session::persistence;
use console_chat_core::{
    ChatController, ControllerEvent, ControllerSettings, FileAttachment, ResourceRef,
    ToolCategory, TurnOutcome, MAX_FILES,
};

use crate::commands::{self, Command, ToolsAction, COMMANDS};
use crate::render::{format_size, Renderer};

/// Completes slash command names
#[derive(Helper, Hinter, Validator, Highlighter)]
struct CommandHelper;

impl Completer for CommandHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let typed = line.get(..pos).unwrap_or(line);
        if let Some(prefix) = typed.strip_prefix("/tools ")
            && let Some(category) = prefix
                .strip_prefix("enable ")
                .or_else(|| prefix.strip_prefix("disable "))
        {
            let start = pos - category.len();
            let candidates = ToolCategory::ALL
                .iter()
                .map(|c| c.as_str())
                .filter(|name| name.starts_with(category))
                .map(String::from)
                .collect();
            return Ok((start, candidates));
        }

        if !typed.starts_with('/') || typed.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let candidates = COMMANDS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| name.starts_with(typed))
            .map(String::from)
            .collect();
        Ok((0, candidates))
    }
}

fn show(renderer: &mut Renderer, event: &ControllerEvent) {
    if let Some(text) = renderer.render(event) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }
}

fn print_error(message: impl std::fmt::Display) {
    println!("{} {}", style("!").red().bold(), style(message).red());
}

pub struct Repl {
    controller: ChatController,
    events: UnboundedReceiver<ControllerEvent>,
    renderer: Renderer,
    /// Config after command-line overrides, used to resolve provider keys
    config: Config,
    pending_files: Vec<FileAttachment>,
}

impl Repl {
    pub fn new(
        controller: ChatController,
        events: UnboundedReceiver<ControllerEvent>,
        config: Config,
    ) -> Self {
        Self {
            controller,
            events,
            renderer: Renderer::new(),
            config,
            pending_files: Vec::new(),
        }
    }

    pub fn set_show_log(&mut self, show: bool) {
        self.renderer.set_show_log(show);
    }

    /// Run `action` in a task, rendering events until it finishes
    async fn drive<T, F>(&mut self, action: F) -> anyhow::Result<T>
    where
        F: Future<Output = console_chat_core::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut task = tokio::spawn(action);
        let joined = loop {
            tokio::select! {
                Some(event) = self.events.recv() => show(&mut self.renderer, &event),
                joined = &mut task => break joined,
            }
        };
        while let Ok(event) = self.events.try_recv() {
            show(&mut self.renderer, &event);
        }
        Ok(joined??)
    }

    /// Select the configured project before the first prompt
    pub async fn select_project(&mut self, project_id: &str) -> anyhow::Result<()> {
        let controller = self.controller.clone();
        let project = ResourceRef::from_id(project_id);
        self.drive(async move { controller.select_project(project).await })
            .await
    }

    /// Send one message and return; a failed turn is an error
    pub async fn one_shot(&mut self, text: String) -> anyhow::Result<()> {
        match self.submit(text).await? {
            TurnOutcome::Failed(message) => anyhow::bail!(message),
            _ => Ok(()),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut editor: Editor<CommandHelper, DefaultHistory> = Editor::new()?;
        editor.set_helper(Some(CommandHelper));

        println!(
            "{} {}",
            style("console-chat").bold().cyan(),
            style("Type /help for commands, /quit to exit.").dim()
        );
        while let Ok(event) = self.events.try_recv() {
            show(&mut self.renderer, &event);
        }

        loop {
            let line = match editor.readline(&self.prompt()) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };
            if line.trim().is_empty() && self.pending_files.is_empty() {
                continue;
            }
            let _ = editor.add_history_entry(line.as_str());

            match commands::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    if let Err(e) = self.execute(command).await {
                        print_error(e);
                    }
                }
                Err(message) => print_error(message),
            }
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        let scope = match self.controller.context() {
            Some(context) => {
                let mut scope = context.project.id.clone();
                if let Some(database) = &context.database {
                    scope.push('/');
                    scope.push_str(&database.id);
                }
                if let Some(collection) = &context.collection {
                    scope.push('/');
                    scope.push_str(&collection.id);
                }
                scope
            }
            None => "no project".to_string(),
        };
        let files = if self.pending_files.is_empty() {
            String::new()
        } else {
            format!(" +{}", self.pending_files.len())
        };
        format!("[{}{}] > ", scope, files)
    }

    async fn submit(&mut self, text: String) -> anyhow::Result<TurnOutcome> {
        let files = std::mem::take(&mut self.pending_files);
        let controller = self.controller.clone();
        let outcome = self
            .drive(async move { controller.submit(text, files).await })
            .await?;
        if outcome == TurnOutcome::Ignored {
            print_error("A turn is already in progress");
        }
        Ok(outcome)
    }

    async fn execute(&mut self, command: Command) -> anyhow::Result<()> {
        let controller = self.controller.clone();
        match command {
            Command::Chat(text) => {
                self.submit(text).await?;
            }
            Command::Project(Some(project)) => {
                self.drive(async move { controller.select_project(project).await })
                    .await?
            }
            Command::Project(None) => {
                self.drive(async move { controller.clear_project().await })
                    .await?
            }
            Command::Database(database) => {
                self.drive(async move { controller.select_database(database).await })
                    .await?
            }
            Command::Collection(collection) => {
                self.drive(async move { controller.select_collection(collection).await })
                    .await?
            }
            Command::Bucket(bucket) => {
                self.drive(async move { controller.select_bucket(bucket).await })
                    .await?
            }
            Command::Function(function) => {
                self.drive(async move { controller.select_function(function).await })
                    .await?
            }
            Command::Tools(ToolsAction::Show) => self.show_tools(),
            Command::Tools(ToolsAction::Enable(category)) => {
                self.drive(async move { controller.set_category_enabled(category, true).await })
                    .await?;
                self.show_tools();
            }
            Command::Tools(ToolsAction::Disable(category)) => {
                self.drive(async move { controller.set_category_enabled(category, false).await })
                    .await?;
                self.show_tools();
            }
            Command::Provider(provider) => {
                if catalog::get(&provider).is_none() {
                    anyhow::bail!(
                        "Unknown provider '{}'. Available: {}",
                        provider,
                        catalog::ids().join(", ")
                    );
                }
                let current = self.controller.settings();
                if provider != self.config.provider {
                    self.config.api_key = None;
                    self.config.api_key_env = None;
                    self.config.model = None;
                }
                self.config.provider = provider;
                let settings = ControllerSettings {
                    thinking: current.thinking,
                    enabled: current.enabled,
                    ..ControllerSettings::from_config(&self.config)
                };
                self.drive(async move { controller.update_settings(settings).await })
                    .await?;
                self.show_status().await;
            }
            Command::Model(model) => {
                self.config.model = Some(model.clone());
                self.drive(async move { controller.set_model(model).await })
                    .await?
            }
            Command::Thinking(thinking) => {
                if thinking && !catalog::supports_thinking(&self.controller.settings().provider) {
                    println!(
                        "{}",
                        style("This provider does not support thinking; the setting has no effect.")
                            .yellow()
                    );
                }
                self.drive(async move { controller.set_thinking(thinking).await })
                    .await?
            }
            Command::Key(key) => {
                self.drive(async move { controller.set_api_key(key).await })
                    .await?
            }
            Command::Attach(path) => {
                if self.pending_files.len() >= MAX_FILES {
                    anyhow::bail!("At most {} files can be attached to one message", MAX_FILES);
                }
                let file = FileAttachment::from_path(&path).await?;
                println!(
                    "  {} {} ({}, {})",
                    style("+").green(),
                    file.name,
                    file.mime_type,
                    format_size(file.size())
                );
                self.pending_files.push(file);
            }
            Command::Clear => {
                self.pending_files.clear();
                self.drive(async move { controller.clear_chat().await })
                    .await?
            }
            Command::Resend => {
                let outcome = self.drive(async move { controller.resend().await }).await?;
                if outcome == TurnOutcome::Ignored {
                    print_error("A turn is already in progress");
                }
            }
            Command::Save => {
                let transcript = self.controller.snapshot();
                let path = persistence::save_transcript(&transcript)?;
                println!(
                    "{} {} {}",
                    style("Saved").green(),
                    style(&transcript.id).bold(),
                    style(path.display()).dim()
                );
            }
            Command::Load(id) => self.load(&id).await?,
            Command::List => {
                let transcripts = persistence::list_transcripts()?;
                if transcripts.is_empty() {
                    println!("  {}", style("No saved conversations").dim());
                }
                for transcript in transcripts {
                    println!(
                        "  {} {} {}",
                        style(&transcript.id).cyan(),
                        style(
                            transcript
                                .updated_at
                                .with_timezone(&chrono::Local)
                                .format("%Y-%m-%d %H:%M")
                        )
                        .dim(),
                        transcript.title()
                    );
                }
            }
            Command::Log(show) => self.renderer.set_show_log(show),
            Command::Status => self.show_status().await,
            Command::Help => {
                println!("{}", style("Commands:").bold());
                for (name, help) in COMMANDS {
                    println!("  {:<12} {}", style(name).cyan(), help);
                }
                println!("  Anything else is sent to the assistant.");
            }
            Command::Quit => {}
        }
        Ok(())
    }

    async fn load(&mut self, id: &str) -> anyhow::Result<()> {
        let Some(transcript) = persistence::load_transcript(id)? else {
            anyhow::bail!("No saved conversation with id '{}'", id);
        };

        // Switch project first; a project switch clears the timeline
        let current = self.controller.context().map(|c| c.project.id);
        if let Some(project_id) = transcript.project_id.clone()
            && current.as_deref() != Some(project_id.as_str())
        {
            self.select_project(&project_id).await?;
        }

        self.renderer.set_echo_user(true);
        let controller = self.controller.clone();
        let loaded = self
            .drive(async move { controller.load_transcript(transcript).await })
            .await;
        self.renderer.set_echo_user(false);
        loaded
    }

    fn show_tools(&self) {
        let enabled = self.controller.enabled_categories();
        let offered = self.controller.offered_tools();
        for category in ToolCategory::ALL {
            let state = if enabled.contains(&category) {
                style("on ").green()
            } else {
                style("off").red()
            };
            let names: Vec<&str> = offered
                .iter()
                .filter(|t| t.category == category)
                .map(|t| t.name.as_str())
                .collect();
            println!(
                "  [{}] {:<10} {}",
                state,
                style(category).bold(),
                style(names.join(", ")).dim()
            );
        }
    }

    async fn show_status(&self) {
        let settings = self.controller.settings();
        let context = self
            .controller
            .context()
            .map(|c| c.describe())
            .unwrap_or_else(|| "no project selected".to_string());
        println!("  Context:  {}", style(context).green());
        println!(
            "  Model:    {} / {}{}",
            settings.provider,
            settings.model,
            if settings.thinking { " (thinking)" } else { "" }
        );
        println!(
            "  Session:  {:?}",
            self.controller.session_state().await
        );
        if let Some(error) = self.controller.last_error() {
            println!("  Error:    {}", style(error).red());
        }
    }
}
