//! Interactive chat application for conversing with LUNA.
//!
//! This binary provides a streaming REPL over the LUNA backend.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on the default address
//! luna-chat
//!
//! # Point at another backend and keep state elsewhere
//! luna-chat --base-url https://luna.example.com/ --state-file ~/.luna.json
//!
//! # Read options from a YAML file
//! luna-chat --config luna.yaml
//! ```
//!
//! Type `/help` at the prompt for the list of slash commands.  Set `RUST_LOG`
//! to see request logs.

use std::path::Path;
use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::time::Instant;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use luna::auth::{AuthForm, AuthMode, NoticeKind};
use luna::chat::{
    ChatArgs, ChatCommand, ChatSession, LunaConfig, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use luna::history::RenameKey;
use luna::settings::{SettingsField, SettingsPanel};
use luna::store::FileStore;
use luna::translator::{FileAudioSource, VoiceTranslator};
use luna::{Attachment, Backend, FirebaseIdentity, LunaClient};

/// Main entry point for the luna-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("luna-chat [OPTIONS]");
    let config = LunaConfig::resolve(args)?;

    let client = Arc::new(LunaClient::with_options(
        &config.base_url,
        Some(config.timeout),
    )?);
    let backend: Arc<dyn Backend> = client.clone();
    let mut session = ChatSession::new(
        Arc::clone(&backend),
        Box::new(FileStore::new(&config.state_file)),
    );
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut settings = SettingsPanel::new();
    let mut rl = DefaultEditor::new()?;

    println!("LUNA ({})", client.base_url());
    println!("Type /help for commands, /quit to exit\n");

    if let Err(err) = session.resume(&mut renderer).await {
        renderer.print_error(&format!("Could not reopen the last chat: {err}"));
    }
    if let Some(prompt) = session.view().welcome_prompt() {
        renderer.print_info(&format!("Try: {prompt}"));
    }

    loop {
        let applied = session.apply_title_updates();
        if applied > 0 {
            tracing::debug!(applied, "applied generated titles");
        }
        settings.tick(Instant::now());

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::New => {
                            session.start_new_chat();
                            let prompt = session.view().welcome_prompt().unwrap_or_default();
                            renderer.print_info(&format!("New chat. Try: {prompt}"));
                        }
                        ChatCommand::History => {
                            session.refresh_history().await;
                            print_history(&session);
                        }
                        ChatCommand::Open(n) => match chat_at(&session, n) {
                            Some(chat_id) => {
                                if let Err(err) = session.load_chat(&chat_id, &mut renderer).await {
                                    renderer.print_error(&format!("Failed to open chat: {err}"));
                                }
                            }
                            None => renderer.print_error(&format!("No chat #{n}")),
                        },
                        ChatCommand::Rename(n, title) => match chat_at(&session, n) {
                            Some(chat_id) => {
                                session.begin_rename(&chat_id, &title);
                                match session.rename_key(RenameKey::Enter).await {
                                    Ok(Some(title)) => {
                                        renderer.print_info(&format!("Renamed to: {title}"))
                                    }
                                    Ok(None) => renderer.print_info("Title unchanged."),
                                    Err(err) => {
                                        renderer.print_error(&format!("Failed to rename: {err}"))
                                    }
                                }
                            }
                            None => renderer.print_error(&format!("No chat #{n}")),
                        },
                        ChatCommand::Delete(n) => match chat_at(&session, n) {
                            Some(chat_id) => {
                                let mut confirm = |prompt: &str| {
                                    rl.readline(&format!("{prompt} [y/N] "))
                                        .map(|answer| answer.trim().eq_ignore_ascii_case("y"))
                                        .unwrap_or(false)
                                };
                                match session.delete_chat(&chat_id, &mut confirm).await {
                                    Ok(true) => renderer.print_info("Chat deleted."),
                                    Ok(false) => {}
                                    Err(err) => {
                                        renderer.print_error(&format!("Failed to delete: {err}"))
                                    }
                                }
                            }
                            None => renderer.print_error(&format!("No chat #{n}")),
                        },
                        ChatCommand::Pin(n) => match chat_at(&session, n) {
                            Some(chat_id) => {
                                if let Err(err) = session.toggle_pin(&chat_id).await {
                                    renderer.print_error(&format!("Failed to pin: {err}"));
                                } else {
                                    print_history(&session);
                                }
                            }
                            None => renderer.print_error(&format!("No chat #{n}")),
                        },
                        ChatCommand::Edit(n, text) => {
                            let target = n
                                .checked_sub(1)
                                .and_then(|index| session.view().get(index))
                                .filter(|message| message.is_editable())
                                .map(|message| message.id.clone());
                            match target {
                                Some(id) => {
                                    session.edit(&id, &text, &mut renderer).await;
                                }
                                None => renderer
                                    .print_error(&format!("Message #{n} cannot be edited")),
                            }
                        }
                        ChatCommand::Attach(path) => match Attachment::from_path(&path) {
                            Ok(attachment) => {
                                renderer.print_info(&format!(
                                    "Attached {} ({})",
                                    attachment.filename, attachment.mime_type
                                ));
                                session.compose_mut().attach(attachment);
                            }
                            Err(err) => renderer.print_error(&format!("Failed to attach: {err}")),
                        },
                        ChatCommand::Detach => match session.compose_mut().detach() {
                            Some(attachment) => {
                                renderer.print_info(&format!("Removed {}", attachment.filename))
                            }
                            None => renderer.print_info("Nothing attached."),
                        },
                        ChatCommand::Settings => {
                            settings.open(backend.as_ref()).await;
                            print_settings(&settings);
                        }
                        ChatCommand::Set(field, value) => {
                            if !settings.is_open() {
                                settings.open(backend.as_ref()).await;
                            }
                            settings.edit_field(field, value);
                            renderer.print_info(&format!(
                                "{field} = {}",
                                field.get(settings.form())
                            ));
                        }
                        ChatCommand::Save => {
                            if !settings.is_open() {
                                renderer.print_error("Open /settings first.");
                            } else {
                                if let Err(err) = settings.submit(backend.as_ref()).await {
                                    tracing::warn!(error = %err, "saving settings failed");
                                }
                                renderer.print_info(settings.status());
                            }
                        }
                        ChatCommand::Translate { language, path } => {
                            translate(backend.as_ref(), &language, &path, &mut renderer).await;
                        }
                        ChatCommand::Login { email, password } => {
                            authenticate(
                                AuthMode::Login,
                                config.firebase_api_key.as_deref(),
                                backend.as_ref(),
                                &email,
                                &password,
                                &mut renderer,
                            )
                            .await;
                        }
                        ChatCommand::Signup { email, password } => {
                            authenticate(
                                AuthMode::Signup,
                                config.firebase_api_key.as_deref(),
                                backend.as_ref(),
                                &email,
                                &password,
                                &mut renderer,
                            )
                            .await;
                        }
                        ChatCommand::Messages => {
                            for (index, message) in session.view().messages().iter().enumerate() {
                                renderer.print_message(index, message);
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message
                session.compose_mut().set_text(line);
                session.submit(&mut renderer).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt clears the pending attachment.
                println!();
                session.compose_mut().detach();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// The id of the nth (1-based) chat in the sidebar.
fn chat_at(session: &ChatSession, n: usize) -> Option<String> {
    let index = n.checked_sub(1)?;
    session.history().items().get(index).map(|item| item.id.clone())
}

fn print_history(session: &ChatSession) {
    let items = session.history().items();
    if items.is_empty() {
        println!("    (no chats)");
        return;
    }
    for (index, item) in items.iter().enumerate() {
        let pin = if item.pinned { "📌 " } else { "" };
        let active = if item.active { " *" } else { "" };
        let updated = item
            .last_updated
            .as_deref()
            .map(|when| format!("  ({when})"))
            .unwrap_or_default();
        println!("    {:>3}. {pin}{}{active}{updated}", index + 1, item.title);
    }
}

fn print_settings(panel: &SettingsPanel) {
    println!("    Settings:");
    for field in SettingsField::ALL {
        println!("      {:<20} {}", field.name(), field.get(panel.form()));
    }
    if !panel.status().is_empty() {
        println!("    {}", panel.status());
    }
}

async fn translate(backend: &dyn Backend, language: &str, path: &str, renderer: &mut dyn Renderer) {
    let mut widget = VoiceTranslator::new(Box::new(FileAudioSource::new(path)), language);
    let result = async {
        widget.toggle(backend).await?;
        while widget.pump().await? {}
        if let Some(status) = widget.status_text() {
            renderer.print_info(status);
        }
        widget.toggle(backend).await
    }
    .await;
    if let Err(err) = result {
        tracing::debug!(error = %err, "translation failed");
        let message = widget.error().map(str::to_string).unwrap_or(err.to_string());
        renderer.print_error(&message);
        return;
    }
    let Some(audio) = widget.result() else {
        return;
    };
    let output = Path::new(path).with_extension(format!("{language}.{}", audio.extension()));
    match audio.save_to(&output).await {
        Ok(()) => renderer.print_info(&format!("Translation saved to {}", output.display())),
        Err(err) => renderer.print_error(&format!("Failed to save translation: {err}")),
    }
}

async fn authenticate(
    mode: AuthMode,
    api_key: Option<&str>,
    backend: &dyn Backend,
    email: &str,
    password: &str,
    renderer: &mut dyn Renderer,
) {
    let Some(api_key) = api_key else {
        renderer.print_error("No identity provider key configured (--firebase-api-key).");
        return;
    };
    let identity = match FirebaseIdentity::new(api_key) {
        Ok(identity) => identity,
        Err(err) => {
            renderer.print_error(&err.to_string());
            return;
        }
    };
    let mut form = AuthForm::new(mode);
    let _ = form.submit(&identity, backend, email, password).await;
    if let Some(notice) = form.notice() {
        let line = format!("{} {}", notice.icon(), notice.message);
        match notice.kind {
            NoticeKind::Success => renderer.print_info(&line),
            NoticeKind::Error => renderer.print_error(&line),
        }
    }
}
