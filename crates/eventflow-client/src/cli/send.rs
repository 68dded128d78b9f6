use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use eventflow_core::api::ApiClient;
use eventflow_core::composer::{AttachmentCandidate, DraftStore, MessageComposer, SendOutcome};
use eventflow_core::{CoreConfig, EventBus};

/// Send one message. With no text given the conversation's saved draft is
/// resumed; the draft survives a failed send and is cleared by a confirmed
/// one.
pub async fn run(
    config: CoreConfig,
    conversation_id: String,
    message: Option<String>,
    files: Vec<PathBuf>,
) -> Result<()> {
    let api = ApiClient::new(&config)?;
    let mut drafts = DraftStore::new(&config.data_dir);
    let composer = MessageComposer::new(
        conversation_id.clone(),
        config.composer.clone(),
        EventBus::new(),
    );

    match message {
        Some(text) => composer.set_text(&text),
        None => {
            let Some(draft) = drafts.load(&conversation_id) else {
                bail!("no message given and no saved draft for {conversation_id}");
            };
            println!(
                "resuming draft from {}",
                draft.updated_at.format("%Y-%m-%d %H:%M")
            );
            composer.restore(draft);
        }
    }

    let mut candidates = Vec::with_capacity(files.len());
    for path in &files {
        let data = std::fs::read(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        candidates.push(AttachmentCandidate {
            file_name,
            mime_type,
            data,
        });
    }
    for err in composer.attach_many(candidates) {
        eprintln!("skipped: {err}");
    }

    match composer.send(&api).await {
        Ok(SendOutcome::Sent) => {
            drafts.clear(&conversation_id)?;
            println!("sent to {conversation_id}");
            Ok(())
        }
        Ok(SendOutcome::NothingToSend) => bail!("nothing to send"),
        Ok(SendOutcome::AlreadySending) => bail!("another send is already in flight"),
        Err(err) => {
            let draft = composer.to_draft();
            if !draft.is_empty() {
                if let Err(save_err) = drafts.save(draft) {
                    eprintln!("could not save draft: {save_err}");
                } else {
                    eprintln!("draft saved for {conversation_id}");
                }
            }
            Err(err).context("message not sent")
        }
    }
}

/// Print saved drafts, newest first.
pub fn list_drafts(config: CoreConfig) -> Result<()> {
    let drafts = DraftStore::new(&config.data_dir);
    let pending = drafts.pending();
    if pending.is_empty() {
        println!("no drafts");
        return Ok(());
    }
    for draft in pending {
        let attachments = if draft.attachment_names.is_empty() {
            String::new()
        } else {
            format!(" [+{} file(s)]", draft.attachment_names.len())
        };
        println!(
            "{}  {}  {}{}",
            draft.conversation_id,
            draft.updated_at.format("%Y-%m-%d %H:%M"),
            first_line(&draft.text),
            attachments
        );
    }
    Ok(())
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > 60 {
        let truncated: String = line.chars().take(60).collect();
        format!("{truncated}...")
    } else {
        line.to_string()
    }
}
