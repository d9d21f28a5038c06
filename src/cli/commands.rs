use std::path::Path;

use crate::app::{AppContext, CanopyError, Result};
use crate::domain::{AnyKey, ChildKey, EntryKey, FeedKey, FolderKey, Node};
use crate::opml;

/// The folder named by `key`, or the owner's root folder.
///
/// Keys that belong to a different owner are rejected.
pub fn resolve_folder(ctx: &AppContext, owner: &str, key: Option<&str>) -> Result<FolderKey> {
    let Some(key) = key else {
        return ctx.registry.ensure_root(owner);
    };
    let key: FolderKey = key.parse()?;
    check_owner(owner, &ctx.registry.folder(key)?.owner, &key.to_string())?;
    Ok(key)
}

fn resolve_feed(ctx: &AppContext, owner: &str, key: &str) -> Result<FeedKey> {
    let key: FeedKey = key.parse()?;
    check_owner(owner, &ctx.registry.feed(key)?.owner, &key.to_string())?;
    Ok(key)
}

fn resolve_child(ctx: &AppContext, owner: &str, key: &str) -> Result<ChildKey> {
    match key.parse::<ChildKey>()? {
        ChildKey::Folder(_) => resolve_folder(ctx, owner, Some(key)).map(ChildKey::Folder),
        ChildKey::Feed(_) => resolve_feed(ctx, owner, key).map(ChildKey::Feed),
    }
}

fn check_owner(owner: &str, actual: &str, key: &str) -> Result<()> {
    if owner != actual {
        return Err(CanopyError::Other(format!(
            "{} does not belong to {}",
            key, owner
        )));
    }
    Ok(())
}

pub async fn add_feed(
    ctx: &AppContext,
    owner: &str,
    url: &str,
    folder: Option<&str>,
) -> Result<()> {
    let target = resolve_folder(ctx, owner, folder)?;

    match ctx.engine.subscribe(owner, url, target).await? {
        Some(reg) if reg.duplicated => {
            println!("Feed already exists: {} ({})", url, reg.key);
        }
        Some(reg) => {
            let feed = ctx.registry.feed(reg.key)?;
            println!("Added feed: {} ({})", feed.display_title(), reg.key);
            println!("Format: {}, {} entries", feed.standard, feed.entries.len());
        }
        None => {
            println!("Not a recognized Atom, RSS 1.0 or RSS 2.0 document: {}", url);
        }
    }

    Ok(())
}

pub fn make_folder(
    ctx: &AppContext,
    owner: &str,
    title: &str,
    parent: Option<&str>,
) -> Result<()> {
    let parent = resolve_folder(ctx, owner, parent)?;
    let key = ctx.registry.register_folder(owner, title, false, Some(parent))?;
    println!("Created folder: {} ({})", title, key);
    Ok(())
}

pub fn rename(ctx: &AppContext, owner: &str, key: &str, title: &str) -> Result<()> {
    match resolve_child(ctx, owner, key)? {
        ChildKey::Folder(key) => ctx.registry.rename_folder(key, title)?,
        ChildKey::Feed(key) => ctx.registry.rename_feed(key, title)?,
    }
    println!("Renamed {} to {}", key, title);
    Ok(())
}

pub fn remove(ctx: &AppContext, owner: &str, key: &str) -> Result<()> {
    let child = resolve_child(ctx, owner, key)?;
    let label = describe(ctx, key)?;
    match child {
        ChildKey::Folder(key) => ctx.registry.remove_folder(key)?,
        ChildKey::Feed(key) => ctx.registry.remove_feed(key)?,
    }
    println!("Removed {} ({})", label, key);
    Ok(())
}

pub async fn update(ctx: &AppContext, owner: &str, key: Option<&str>) -> Result<()> {
    let target = match key {
        Some(key) => resolve_child(ctx, owner, key)?,
        None => ChildKey::Folder(ctx.registry.ensure_root(owner)?),
    };

    match target {
        ChildKey::Feed(key) => {
            let fresh = ctx.engine.refresh(key).await;
            println!("{} new entries", fresh.len());
            for entry in fresh {
                println!("  {}", entry.display_title());
            }
        }
        ChildKey::Folder(key) => {
            let counts = ctx.tree.update_folder(key).await?;
            for node in ctx.registry.children(key)? {
                match counts.get(&node.key()) {
                    Some(count) => println!("  {:>5}  {}", count, node.title()),
                    None => println!("  {:>5}  {}", "error", node.title()),
                }
            }
            println!(
                "Update complete: {} entries under {}",
                ctx.registry.entry_count(key)?,
                key
            );
        }
    }

    Ok(())
}

pub async fn update_all(ctx: &AppContext) -> Result<()> {
    let summary = ctx.tree.update_all().await;
    println!("Update complete: {}", summary);
    Ok(())
}

pub fn print_tree(ctx: &AppContext, owner: &str) -> Result<()> {
    let root = ctx.registry.ensure_root(owner)?;
    let folder = ctx.registry.folder(root)?;
    println!("{} ({})", folder.title, root);

    // Children are pushed in reverse so they pop in order.
    let mut pending: Vec<(usize, Node)> = ctx
        .registry
        .children(root)?
        .into_iter()
        .rev()
        .map(|node| (1, node))
        .collect();

    while let Some((depth, node)) = pending.pop() {
        let indent = "  ".repeat(depth);
        match &node {
            Node::Folder(key, folder) => {
                println!("{}{} ({})", indent, folder.title, key);
                let children = ctx.registry.children(*key)?;
                pending.extend(children.into_iter().rev().map(|child| (depth + 1, child)));
            }
            Node::Feed(key, feed) => {
                println!(
                    "{}{} [{}] {} entries ({})",
                    indent,
                    feed.display_title(),
                    feed.standard,
                    feed.entries.len(),
                    key
                );
            }
        }
    }

    Ok(())
}

pub fn list_entries(ctx: &AppContext, owner: &str, feed: &str) -> Result<()> {
    let key = resolve_feed(ctx, owner, feed)?;
    let entries = ctx.registry.entries(key)?;

    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }

    for (key, entry) in entries {
        let date = entry
            .updated
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "          ".to_string());
        println!("{} {} ({})\n  {}", date, entry.display_title(), key, entry.link);
    }

    Ok(())
}

pub fn read(
    ctx: &AppContext,
    owner: &str,
    key: &str,
    entry: Option<&str>,
    link: Option<&str>,
) -> Result<()> {
    match (resolve_child(ctx, owner, key)?, entry, link) {
        (ChildKey::Feed(feed), Some(entry), _) => {
            let entry: EntryKey = entry.parse()?;
            ctx.registry.read_entry(feed, entry)?;
            println!("Marked {} read", entry);
        }
        (ChildKey::Feed(feed), None, Some(link)) => {
            let entry = ctx.registry.read_entry_by_link(feed, link)?;
            println!("Marked {} read", entry);
        }
        (ChildKey::Feed(feed), None, None) => {
            let count = ctx.registry.read_feed(feed)?;
            println!("Marked {} entries read", count);
        }
        (ChildKey::Folder(folder), None, None) => {
            let count = ctx.registry.read_folder(folder)?;
            println!("Marked {} entries read", count);
        }
        (ChildKey::Folder(folder), _, _) => {
            return Err(CanopyError::Other(format!(
                "--entry and --link need a feed key, got {}",
                folder
            )));
        }
    }
    Ok(())
}

pub async fn import_opml(
    ctx: &AppContext,
    owner: &str,
    path: &Path,
    folder: Option<&str>,
) -> Result<()> {
    let target = resolve_folder(ctx, owner, folder)?;
    let content = std::fs::read_to_string(path)?;
    let outlines = opml::parse(&content)?;

    println!("Importing {} into {}...", path.display(), target);
    let report = ctx.engine.import_outlines(owner, outlines, target).await;
    println!("Import complete: {}", report);

    Ok(())
}

/// Kind and title of the record behind any key.
pub fn describe(ctx: &AppContext, key: &str) -> Result<String> {
    Ok(match key.parse::<AnyKey>()? {
        AnyKey::Folder(key) => format!("folder {}", ctx.registry.folder(key)?.title),
        AnyKey::Feed(key) => format!("feed {}", ctx.registry.feed(key)?.display_title()),
        AnyKey::Entry(key) => format!("entry {}", ctx.registry.entry(key)?.display_title()),
    })
}
