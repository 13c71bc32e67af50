use clap::Parser;
use colored::*;
use minotes::api::{self, ConvertOptions, Message, MessageLevel};
use minotes::error::Result;
use minotes::model::Folder;
use minotes::{export, loader};
use std::path::PathBuf;

mod args;
use args::Cli;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let backup_path = match cli.backup_file {
        Some(path) => path,
        None => loader::find_backup(&PathBuf::from("."))?,
    };
    println!("Reading: {}", backup_path.display());

    let data = loader::read(&backup_path)?;
    println!("File size: {} bytes", data.len());

    let options = ConvertOptions {
        include_deleted: cli.include_deleted,
        extract_media: cli.extract_media,
    };
    let conversion = api::convert(&data, &options)?;
    print_messages(&conversion.messages);
    println!(
        "Found {} notes{}",
        conversion.recovered,
        if cli.include_deleted { " (including deleted)" } else { "" }
    );
    if conversion.skipped > 0 {
        println!(
            "{}",
            format!("Skipped {} unreadable note spans", conversion.skipped).yellow()
        );
    }

    if conversion.notes.is_empty() {
        eprintln!("{}", "No notes could be extracted.".red());
        std::process::exit(1);
    }

    let secret = conversion
        .notes
        .iter()
        .filter(|n| n.folder == Folder::Secret)
        .count();
    if secret > 0 {
        println!("{}", format!("{} notes from the secret folder", secret).dimmed());
    }
    if !conversion.attachments.is_empty() {
        println!("Found {} media files", conversion.attachments.len());
    }

    println!("\nExporting to: {}/", cli.output_dir.display());
    let report = export::export(&conversion.notes, &conversion.attachments, &cli.output_dir)?;
    if report.attachments_written > 0 {
        println!("Saved media to: {}/attachments/", cli.output_dir.display());
    }
    for file in &report.files {
        println!("  {}", file);
    }
    print_messages(&report.messages);

    println!();
    println!(
        "{}",
        format!("Exported {} notes successfully!", report.notes_written).green()
    );
    Ok(())
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}
