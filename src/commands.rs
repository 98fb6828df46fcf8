//! Non-interactive subcommands.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Subcommand, ValueEnum};
use tokio::runtime::Runtime;
use tracing::info;

use crate::chat::find_channel;
use crate::editor::Editor;
use crate::error::PromptError;
use crate::gallery::{GalleryQuery, SortOrder};
use crate::render;
use crate::store::Database;
use crate::suggest::SuggestionService;
use crate::template::{Category, Owner, Template};
use crate::validators::validate_template;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved prompts
    #[command(alias = "ls")]
    List {
        /// Only prompts in this category (e.g. programming, "text generation")
        #[arg(long)]
        category: Option<String>,

        /// Only prompts with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Only prompts you created
        #[arg(long)]
        mine: bool,

        /// Case-insensitive search over title, description and tags
        #[arg(long, short)]
        search: Option<String>,

        /// newest, oldest or title
        #[arg(long, default_value = "newest")]
        sort: String,
    },

    /// Print one prompt
    Show {
        id: String,

        #[arg(long, short, value_enum, default_value_t = Format::Preview)]
        format: Format,
    },

    /// Write a prompt as JSON
    Export {
        id: String,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Create a prompt from a JSON file
    Import { path: PathBuf },

    /// Delete one of your prompts
    #[command(alias = "rm")]
    Delete { id: String },

    /// Add or remove tags on one of your prompts
    Tag {
        id: String,

        /// Tag to add (repeatable)
        #[arg(long, short)]
        add: Vec<String>,

        /// Tag to remove (repeatable)
        #[arg(long, short)]
        remove: Vec<String>,
    },

    /// Ask the AI for improvement suggestions
    Suggest { id: String },

    /// Ask the AI for example inputs and outputs
    Examples { id: String },

    /// Ask the AI to continue a piece of prompt text
    Complete { text: String },

    /// Show today's AI usage
    Quota,

    /// Read a community channel, or post to it
    Chat {
        #[arg(default_value = "general")]
        channel: String,

        /// Message to post
        #[arg(long, short)]
        post: Option<String>,
    },
}

/// Output form for `show`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Header, interpolated text and variable notes
    Preview,
    /// Structural JSON dump
    Code,
    /// Interpolated text only
    Raw,
}

/// What a subcommand needs from `main`.
pub struct Context<'a> {
    pub db: &'a Database,
    pub owner: &'a Owner,
    pub service: &'a SuggestionService,
    pub runtime: &'a Runtime,
}

impl Context<'_> {
    fn template(&self, id: &str) -> Result<Template> {
        Ok(self
            .db
            .get_by_id(id)?
            .ok_or_else(|| PromptError::NotFound(format!("prompt {}", id)))?)
    }
}

pub fn run(command: Command, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::List {
            category,
            tag,
            mine,
            search,
            sort,
        } => list(ctx, out, category, tag, mine, search, &sort),
        Command::Show { id, format } => show(ctx, out, &id, format),
        Command::Export { id, output } => export(ctx, out, &id, output),
        Command::Import { path } => import(ctx, out, &path),
        Command::Delete { id } => delete(ctx, out, &id),
        Command::Tag { id, add, remove } => tag(ctx, out, &id, &add, &remove),
        Command::Suggest { id } => {
            let template = ctx.template(&id)?;
            let suggestions = ctx.runtime.block_on(ctx.service.suggestions(&template))?;
            for (i, s) in suggestions.iter().enumerate() {
                writeln!(out, "{}. [{}] {}", i + 1, s.kind.label(), s.text)?;
                if let Some(explanation) = &s.explanation {
                    writeln!(out, "   {}", explanation)?;
                }
            }
            Ok(())
        }
        Command::Examples { id } => {
            let template = ctx.template(&id)?;
            let examples = ctx
                .runtime
                .block_on(ctx.service.related_examples(&template))?;
            for (i, e) in examples.iter().enumerate() {
                writeln!(out, "Example {}", i + 1)?;
                writeln!(out, "  Input:  {}", e.input)?;
                writeln!(out, "  Output: {}", e.output)?;
                if !e.explanation.is_empty() {
                    writeln!(out, "  {}", e.explanation)?;
                }
            }
            Ok(())
        }
        Command::Complete { text } => {
            let completions = ctx.runtime.block_on(ctx.service.autocomplete(&text))?;
            for c in completions {
                if c.explanation.is_empty() {
                    writeln!(out, "{}", c.text)?;
                } else {
                    writeln!(out, "{}  ({})", c.text, c.explanation)?;
                }
            }
            Ok(())
        }
        Command::Quota => {
            let status = ctx.service.quota_status()?;
            writeln!(
                out,
                "{}/{} AI requests used today, {} remaining",
                status.used, status.limit, status.remaining
            )?;
            Ok(())
        }
        Command::Chat { channel, post } => chat(ctx, out, &channel, post),
    }
}

#[allow(clippy::too_many_arguments)]
fn list(
    ctx: &Context,
    out: &mut dyn Write,
    category: Option<String>,
    tag: Option<String>,
    mine: bool,
    search: Option<String>,
    sort: &str,
) -> Result<()> {
    let category = match category.as_deref() {
        Some(name) => Some(
            Category::parse(name).with_context(|| format!("Unknown category '{}'", name))?,
        ),
        None => None,
    };
    let sort = SortOrder::parse(sort).with_context(|| format!("Unknown sort order '{}'", sort))?;

    let mut templates = if mine {
        ctx.db.get_user_prompts(&ctx.owner.user_id)?
    } else if let Some(tag) = &tag {
        ctx.db.get_by_tag(tag)?
    } else if let Some(category) = category {
        ctx.db.get_by_category(category)?
    } else {
        ctx.db.get_all()?
    };
    if let Some(tag) = &tag {
        templates.retain(|t| t.has_tag(tag));
    }

    let query = GalleryQuery {
        search: search.unwrap_or_default(),
        category,
        sort,
    };
    let templates = query.apply(&templates);
    if templates.is_empty() {
        writeln!(out, "No prompts found.")?;
        return Ok(());
    }
    for t in &templates {
        let categories: Vec<&str> = t.category.iter().map(|c| c.label()).collect();
        writeln!(
            out,
            "{}  {}  [{}]  {}",
            t.id,
            t.title,
            categories.join(", "),
            t.user_name
                .as_deref()
                .or(t.user_id.as_deref())
                .unwrap_or_default()
        )?;
    }
    Ok(())
}

fn show(ctx: &Context, out: &mut dyn Write, id: &str, format: Format) -> Result<()> {
    let template = ctx.template(id)?;
    match format {
        Format::Raw => writeln!(out, "{}", render::plain_text(&template))?,
        Format::Code => writeln!(out, "{}", render::code_view(&template))?,
        Format::Preview => {
            writeln!(out, "{}", template.title)?;
            writeln!(out, "{}", template.description)?;
            writeln!(out)?;
            writeln!(out, "{}", render::plain_text(&template))?;
            let hints: Vec<_> = render::preview(&template)
                .into_iter()
                .filter_map(|s| s.hint.map(|h| format!("  {}: {}", s.text, h)))
                .collect();
            if !hints.is_empty() {
                writeln!(out)?;
                writeln!(out, "Variables:")?;
                for hint in hints {
                    writeln!(out, "{}", hint)?;
                }
            }
        }
    }
    Ok(())
}

fn export(ctx: &Context, out: &mut dyn Write, id: &str, output: Option<PathBuf>) -> Result<()> {
    let template = ctx.template(id)?;
    let json = serde_json::to_string_pretty(&template)?;
    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(id, path = %path.display(), "template_exported");
            writeln!(out, "Exported to {}", path.display())?;
        }
        None => writeln!(out, "{}", json)?,
    }
    Ok(())
}

fn import(ctx: &Context, out: &mut dyn Write, path: &Path) -> Result<()> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let template: Template = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a prompt document", path.display()))?;
    let errors = validate_template(&template);
    if !errors.is_empty() {
        return Err(PromptError::Validation(errors).into());
    }
    let id = ctx.db.create(&template, Some(ctx.owner))?;
    info!(id = %id, path = %path.display(), "template_imported");
    writeln!(out, "{}", id)?;
    Ok(())
}

fn delete(ctx: &Context, out: &mut dyn Write, id: &str) -> Result<()> {
    let template = ctx.template(id)?;
    if !template.is_owned_by(&ctx.owner.user_id) {
        return Err(PromptError::Forbidden { id: id.to_string() }.into());
    }
    if !ctx.db.delete(id)? {
        bail!("Prompt {} was already gone", id);
    }
    info!(id, "template_deleted");
    writeln!(out, "Deleted \"{}\"", template.title)?;
    Ok(())
}

fn tag(ctx: &Context, out: &mut dyn Write, id: &str, add: &[String], remove: &[String]) -> Result<()> {
    let mut editor = Editor::open(ctx.db, id, ctx.owner)?;
    for tag in remove {
        editor.remove_tag(tag);
    }
    for tag in add {
        editor.add_tag(tag);
    }
    if editor.has_unsaved_changes() {
        editor.save(ctx.db, ctx.owner)?;
    }
    writeln!(out, "{}", editor.template().tags.join(", "))?;
    Ok(())
}

fn chat(ctx: &Context, out: &mut dyn Write, channel: &str, post: Option<String>) -> Result<()> {
    let channel = channel.trim_start_matches('#');
    if let Some(text) = post {
        let message = ctx.db.post(channel, &text, ctx.owner)?;
        writeln!(out, "Posted to #{}", message.channel)?;
        return Ok(());
    }

    if let Some(info) = find_channel(channel) {
        writeln!(out, "#{} · {}", info.id, info.description)?;
    }
    for message in ctx.db.messages(channel)? {
        writeln!(
            out,
            "[{}] {}: {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.author_name,
            message.text
        )?;
    }
    Ok(())
}
