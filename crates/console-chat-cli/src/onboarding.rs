//! Onboarding wizard for first-run setup
//!
//! Guides new users through model provider selection, API key entry and the
//! platform connection, then writes the config file.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};
use futures::StreamExt;

use console_chat_core::config::ConfigManager;
use console_chat_core::provider::catalog;
use console_chat_core::{GenAIBackend, HistoryEntry, ModelBackend, ModelRequest, SessionSpec};

/// Where to get a key for each provider
const SIGNUP_URLS: &[(&str, &str)] = &[
    ("anthropic", "https://console.anthropic.com/"),
    ("deepseek", "https://platform.deepseek.com/"),
    ("gemini", "https://aistudio.google.com/"),
    ("groq", "https://console.groq.com/"),
    ("ollama", "https://ollama.ai/"),
    ("openai", "https://platform.openai.com/"),
    ("xai", "https://x.ai/api"),
];

fn signup_url(provider_id: &str) -> &'static str {
    SIGNUP_URLS
        .iter()
        .find(|(id, _)| *id == provider_id)
        .map(|(_, url)| *url)
        .unwrap_or("your provider's website")
}

/// What a connection test showed
enum ConnectionCheck {
    Ok,
    Retry,
    Cancel,
}

/// Onboarding wizard for first-run setup
pub struct OnboardingWizard {
    config_manager: ConfigManager,
}

impl OnboardingWizard {
    pub fn new(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Run when there is no config file yet, or the model key is missing
    pub fn should_run(&self) -> bool {
        if !self.config_manager.path().exists() {
            return true;
        }

        let config = self.config_manager.config();
        let local = catalog::get(&config.provider).is_some_and(|p| p.is_local());
        !local && config.get_api_key().is_none()
    }

    /// Run the wizard; returns `false` when the user cancelled
    pub async fn run(&mut self) -> anyhow::Result<bool> {
        self.show_welcome();

        let provider_id = self.select_provider()?;
        let model = catalog::default_model(provider_id).unwrap_or_default().to_string();
        let local = catalog::get(provider_id).is_some_and(|p| p.is_local());

        let api_key = loop {
            if local {
                break None;
            }
            let key = self.input_api_key(provider_id)?;
            match self.test_connection(provider_id, &key, &model).await? {
                ConnectionCheck::Ok => break Some(key),
                ConnectionCheck::Retry => {
                    println!("{}", style("Let's try again...").dim());
                    println!();
                }
                ConnectionCheck::Cancel => {
                    println!("{}", style("Setup cancelled.").yellow());
                    return Ok(false);
                }
            }
        };

        {
            let config = self.config_manager.config_mut();
            config.provider = provider_id.to_string();
            config.model = Some(model);
            config.api_key = api_key;
        }

        self.configure_platform()?;
        self.config_manager.save()?;
        self.show_completion();
        Ok(true)
    }

    pub fn into_config_manager(self) -> ConfigManager {
        self.config_manager
    }

    fn show_welcome(&self) {
        println!();
        println!("{}", style("Welcome to console-chat!").bold().cyan());
        println!(
            "{}",
            style("Chat with your platform project: databases, storage, functions, users and teams.").dim()
        );
        println!();
        println!("{}", style("Let's get you set up in just a few steps.").dim());
        println!();
    }

    fn select_provider(&self) -> anyhow::Result<&'static str> {
        println!(
            "{} {}",
            style("Step 1 of 3:").bold().cyan(),
            style("Choose your AI provider").bold()
        );
        println!();

        let ids = catalog::ids();
        if ids.is_empty() {
            anyhow::bail!("No model providers available");
        }
        let items: Vec<String> = ids
            .iter()
            .map(|&id| {
                let provider = catalog::get(id);
                let name = provider.map(|p| p.name.as_str()).unwrap_or(id);
                let model = catalog::default_model(id).unwrap_or_default();
                format!("{:<20} {}", name, style(model).dim())
            })
            .collect();
        let default = ids.iter().position(|id| *id == "gemini").unwrap_or(0);

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select a provider")
            .items(&items)
            .default(default)
            .interact()?;

        println!();
        Ok(ids[selection])
    }

    fn input_api_key(&self, provider_id: &str) -> anyhow::Result<String> {
        let env_var = catalog::api_key_env(provider_id).unwrap_or("API_KEY");
        println!(
            "{} {}",
            style("Step 2 of 3:").bold().cyan(),
            style("Enter your API key").bold()
        );
        println!();
        println!(
            "  Get your API key at: {}",
            style(signup_url(provider_id)).cyan().underlined()
        );
        println!(
            "  {}",
            style(format!("Tip: You can also set the {} environment variable.", env_var)).dim()
        );
        println!();

        let api_key: String = Password::with_theme(&ColorfulTheme::default())
            .with_prompt(env_var)
            .interact()?;

        println!();
        Ok(api_key)
    }

    /// Open a session without tools and ask for one word
    async fn test_connection(
        &self,
        provider_id: &str,
        api_key: &str,
        model: &str,
    ) -> anyhow::Result<ConnectionCheck> {
        let spinner = indicatif::ProgressBar::new_spinner();
        if let Ok(spinner_style) =
            indicatif::ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")
        {
            spinner.set_style(spinner_style);
        }
        spinner.set_message("Connecting to API...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));

        let spec = SessionSpec {
            provider: provider_id.to_string(),
            model: model.to_string(),
            api_key: Some(api_key.to_string()),
            system_instruction: String::new(),
            tools: Vec::new(),
            thinking: false,
        };
        let request = ModelRequest {
            history: vec![HistoryEntry::User("Say 'hello' in one word.".to_string())],
            attachments: Vec::new(),
        };

        let result = ping(spec, request).await;

        spinner.finish_and_clear();

        match result {
            Ok(()) => {
                println!(
                    "  {} {}",
                    style("✓").green().bold(),
                    style("Connection successful!").green()
                );
                println!();
                Ok(ConnectionCheck::Ok)
            }
            Err(e) => {
                println!(
                    "  {} {}",
                    style("✗").red().bold(),
                    style("Connection failed").red()
                );
                println!("  {}", style(format!("Error: {}", e)).dim());
                println!();

                let options = [
                    "Try again with different API key",
                    "Continue anyway (save current settings)",
                    "Exit setup",
                ];
                let selection = Select::with_theme(&ColorfulTheme::default())
                    .with_prompt("What would you like to do?")
                    .items(&options)
                    .default(0)
                    .interact()?;
                println!();

                Ok(match selection {
                    0 => ConnectionCheck::Retry,
                    1 => ConnectionCheck::Ok,
                    _ => ConnectionCheck::Cancel,
                })
            }
        }
    }

    fn configure_platform(&mut self) -> anyhow::Result<()> {
        println!(
            "{} {}",
            style("Step 3 of 3:").bold().cyan(),
            style("Connect your platform project").bold()
        );
        println!();

        let theme = ColorfulTheme::default();
        let platform = &mut self.config_manager.config_mut().platform;

        platform.endpoint = Input::with_theme(&theme)
            .with_prompt("API endpoint")
            .default(platform.endpoint.clone())
            .interact_text()?;

        let project_id: String = Input::with_theme(&theme)
            .with_prompt("Project ID (leave empty to choose later with /project)")
            .allow_empty(true)
            .interact_text()?;
        platform.project_id = Some(project_id.trim().to_string()).filter(|id| !id.is_empty());

        let store_key = Confirm::with_theme(&theme)
            .with_prompt(format!(
                "Store a platform API key in the config file? (otherwise {} is used)",
                platform.api_key_env
            ))
            .default(false)
            .interact()?;
        if store_key {
            let key: String = Password::with_theme(&theme)
                .with_prompt("Platform API key")
                .interact()?;
            platform.api_key = Some(key).filter(|k| !k.is_empty());
        }

        println!();
        Ok(())
    }

    fn show_completion(&self) {
        let config = self.config_manager.config();
        println!("{}", style("Setup Complete!").bold().green());
        println!();
        println!("{}", style("Configuration saved to:").bold());
        println!("  {}", style(self.config_manager.path().display()).cyan());
        println!();
        println!("{}", style("Your setup:").bold());
        println!("  Provider: {}", style(&config.provider).green());
        println!("  Model:    {}", style(config.model()).green());
        println!("  Platform: {}", style(&config.platform.endpoint).dim());
        println!();
        println!("{}", style("Quick Start Tips:").bold());
        println!("  {} - Select a project", style("/project <id>").cyan());
        println!("  {} - Show available commands", style("/help").cyan());
        println!();
    }
}

async fn ping(spec: SessionSpec, request: ModelRequest) -> console_chat_core::Result<()> {
    let session = GenAIBackend::new().open_session(spec).await?;
    let mut stream = session.send(request).await?;
    match stream.next().await {
        Some(Err(e)) => Err(e),
        _ => Ok(()),
    }
}
