//! mp3tags - ID3v2 tag viewer and editor
//!
//! Shows the ID3v2 and APEv2 tags of MP3 files and edits their text and
//! comment frames in place.

use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use mp3tags::genre::resolve_genre;
use mp3tags::{Comment, FrameType, TagFile};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Options
// =============================================================================

#[derive(Default)]
struct Options {
    // Edits
    texts: Vec<(FrameType, String)>, // -t FIELD=VALUE
    new_comments: Vec<String>,       // -c TEXT
    comments: Vec<(usize, String)>,  // -C N=TEXT

    // Output options
    json: bool,    // -j
    quiet: bool,   // -q
    verbose: bool, // -v

    // Files
    files: Vec<PathBuf>,
}

impl Options {
    fn has_edits(&self) -> bool {
        !self.texts.is_empty() || !self.new_comments.is_empty() || !self.comments.is_empty()
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let opts = parse_args(&args[1..])?;

    let level = if opts.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    run(opts)
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut opts = Options::default();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        if arg.starts_with('-') && arg.len() > 1 {
            let flag = &arg[1..];

            match flag {
                "t" => {
                    let value = required_value(args, &mut i, "-t")?;
                    let (field, text) = split_assignment(value, "-t")?;
                    let frame_type = FrameType::from_name(field)
                        .or_else(|| FrameType::from_id(field.as_bytes()))
                        .filter(|t| t.is_text())
                        .ok_or_else(|| anyhow::anyhow!("unknown text field: {}", field))?;
                    opts.texts.push((frame_type, text.to_string()));
                }
                "c" => {
                    let value = required_value(args, &mut i, "-c")?;
                    opts.new_comments.push(value.to_string());
                }
                "C" => {
                    let value = required_value(args, &mut i, "-C")?;
                    let (index, text) = split_assignment(value, "-C")?;
                    let index = index
                        .parse()
                        .map_err(|_| anyhow::anyhow!("invalid comment index: {}", index))?;
                    opts.comments.push((index, text.to_string()));
                }
                "j" | "-json" => opts.json = true,
                "q" => opts.quiet = true,
                "v" => opts.verbose = true,
                "V" | "-version" => {
                    print_version();
                    std::process::exit(0);
                }
                "h" | "-help" => {
                    print_usage();
                    std::process::exit(0);
                }
                // Handle combined short flags like -qv
                _ if flag.chars().all(|c| "jqv".contains(c)) => {
                    for c in flag.chars() {
                        match c {
                            'j' => opts.json = true,
                            'q' => opts.quiet = true,
                            'v' => opts.verbose = true,
                            _ => {}
                        }
                    }
                }
                _ => {
                    eprintln!("{}: unknown option: -{}", "warning".yellow().bold(), flag);
                }
            }
        } else {
            // It's a file
            opts.files.push(PathBuf::from(arg));
        }

        i += 1;
    }

    Ok(opts)
}

fn required_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} requires an argument", flag))
}

fn split_assignment<'a>(value: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    value
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("{} expects KEY=VALUE, got: {}", flag, value))
}

fn run(opts: Options) -> Result<()> {
    if opts.files.is_empty() {
        eprintln!("{}: no files specified", "error".red().bold());
        std::process::exit(1);
    }

    if opts.has_edits() {
        cmd_write(&opts)
    } else {
        cmd_info(&opts)
    }
}

// =============================================================================
// Commands
// =============================================================================

fn cmd_info(opts: &Options) -> Result<()> {
    if opts.json {
        let reports: Vec<FileReport> = opts
            .files
            .iter()
            .filter_map(|file| match TagFile::load(file) {
                Ok(tags) => Some(FileReport::new(&tags)),
                Err(e) => {
                    eprintln!("{} - {:#}", display_name(file).red(), e);
                    None
                }
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for file in &opts.files {
        process_info(file, opts);
    }
    Ok(())
}

fn cmd_write(opts: &Options) -> Result<()> {
    let progress = if opts.files.len() > 1 && !opts.quiet {
        let pb = ProgressBar::new(opts.files.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
            pb.set_style(style);
        }
        Some(pb)
    } else {
        None
    };

    let mut failed = 0;
    for file in &opts.files {
        let filename = display_name(file);
        if let Some(pb) = &progress {
            pb.set_message(filename.to_string());
        }

        let line = match process_write(file, opts) {
            Ok(true) => format!("  {} {}", "✓".green(), filename),
            Ok(false) => format!("  {} {} (unchanged)", "-".dimmed(), filename),
            Err(e) => {
                failed += 1;
                format!("  {} {} - {:#}", "✗".red(), filename, e)
            }
        };

        match &progress {
            Some(pb) => {
                pb.println(line);
                pb.inc(1);
            }
            None if !opts.quiet => println!("{}", line),
            None => {}
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, opts.files.len());
    }
    Ok(())
}

// =============================================================================
// File processing
// =============================================================================

fn process_write(file: &Path, opts: &Options) -> Result<bool> {
    let mut tags = TagFile::load(file)?;

    for (frame_type, text) in &opts.texts {
        tags.set_text(*frame_type, text)?;
    }
    for (index, text) in &opts.comments {
        tags.set_comment(*index, text)?;
    }
    for text in &opts.new_comments {
        tags.set_comment(tags.get_comment_count(), text)?;
    }

    tags.write()
}

fn process_info(file: &Path, opts: &Options) {
    let filename = display_name(file);

    let tags = match TagFile::load(file) {
        Ok(tags) => tags,
        Err(e) => {
            eprintln!("{} - {:#}", filename.red(), e);
            return;
        }
    };

    if opts.quiet {
        // Quiet mode: tab-separated output
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            filename,
            tags.version(),
            tags.frame_count(),
            text_or_empty(&tags, FrameType::Artist),
            text_or_empty(&tags, FrameType::Album),
            text_or_empty(&tags, FrameType::Title),
        );
        return;
    }

    println!("{}", filename.cyan().bold());
    println!("  Version:     ID3v{}", tags.version());
    println!("  Frames:      {}", tags.frame_count());
    println!("  Audio at:    {}", tags.audio_buffer_offset());

    for frame_type in FrameType::text_types() {
        let value = match tags.get_text(frame_type) {
            Ok(value) => value,
            Err(e) => format!("<{:#}>", e).red().to_string(),
        };
        if value.is_empty() {
            continue;
        }
        let value = match frame_type {
            FrameType::Genre => resolve_genre(&value).to_string(),
            _ => value,
        };
        println!("  {:<13}{}", format!("{}:", frame_type), value);
    }

    for index in 0..tags.get_comment_count() {
        let label = format!("Comment {}:", index);
        match tags.comment(index) {
            Ok(comment) => println!("  {:<13}{}", label, comment.text),
            Err(e) => println!("  {:<13}{}", label, format!("<{:#}>", e).red()),
        }
    }

    if let Some(ape) = tags.ape_tag() {
        println!("  {} ({} items)", "APEv2".yellow(), ape.len());
        for item in ape.items() {
            let value = item
                .text()
                .unwrap_or_else(|| format!("<{} bytes>", item.value.len()));
            println!("    {:<24}{}", item.key, value);
        }
    }
    println!();
}

fn text_or_empty(tags: &TagFile, frame_type: FrameType) -> String {
    tags.get_text(frame_type).unwrap_or_default()
}

fn display_name(file: &Path) -> &str {
    file.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
}

// =============================================================================
// JSON output
// =============================================================================

#[derive(Serialize)]
struct FileReport {
    path: String,
    version: String,
    audio_offset: u32,
    frame_count: usize,
    text: Vec<(FrameType, String)>,
    comments: Vec<Comment>,
    ape: Vec<ApeReport>,
}

#[derive(Serialize)]
struct ApeReport {
    key: String,
    value: Option<String>,
    binary: bool,
    read_only: bool,
}

impl FileReport {
    fn new(tags: &TagFile) -> Self {
        let text = FrameType::text_types()
            .filter_map(|t| tags.get_text(t).ok().filter(|v| !v.is_empty()).map(|v| (t, v)))
            .collect();
        let comments = (0..tags.get_comment_count())
            .filter_map(|i| tags.comment(i).ok())
            .collect();
        let ape = tags
            .ape_tag()
            .map(|ape| {
                ape.items()
                    .iter()
                    .map(|item| ApeReport {
                        key: item.key.clone(),
                        value: item.text(),
                        binary: item.is_binary(),
                        read_only: item.is_read_only(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path: tags.path().display().to_string(),
            version: tags.version(),
            audio_offset: tags.audio_buffer_offset(),
            frame_count: tags.frame_count(),
            text,
            comments,
            ape,
        }
    }
}

// =============================================================================
// Help / Version
// =============================================================================

fn print_version() {
    println!("mp3tags version {}", VERSION);
    println!("ID3v2 tag viewer and editor written in Rust");
}

fn print_usage() {
    println!("{} version {}", "mp3tags".green().bold(), VERSION);
    println!("View and edit ID3v2 tags of MP3 files");
    println!();
    println!("{}", "USAGE:".cyan().bold());
    println!("    mp3tags [OPTIONS] <FILES>...");
    println!();
    println!("{}", "OPTIONS:".cyan().bold());
    println!("    -t <FIELD=VALUE>  Set a text field (empty VALUE deletes it)");
    println!("    -c <TEXT>         Add a comment");
    println!("    -C <N=TEXT>       Set comment N (empty TEXT deletes it)");
    println!("    -j                JSON output");
    println!("    -q                Quiet mode (less output)");
    println!("    -v                Verbose logging (RUST_LOG overrides)");
    println!("    -V                Show version");
    println!("    -h                Show this help");
    println!();
    println!("{}", "FIELDS:".cyan().bold());
    let names: Vec<&str> = FrameType::text_types().map(FrameType::name).collect();
    for chunk in names.chunks(6) {
        println!("    {}", chunk.join(", "));
    }
    println!();
    println!("{}", "EXAMPLES:".cyan().bold());
    println!("    mp3tags song.mp3                       Show tags");
    println!("    mp3tags -t Artist=Someone song.mp3     Set the artist");
    println!("    mp3tags -t Year= song.mp3              Delete the year");
    println!("    mp3tags -c \"Ripped from CD\" *.mp3    Add a comment to every file");
    println!("    mp3tags -j *.mp3                       Dump tags as JSON");
    println!();
    println!("{}", "NOTES:".cyan().bold());
    println!("    - Only ID3v2.3 and ID3v2.4 tags are edited");
    println!("    - Text is always written with the single-byte encoding");
    println!("    - APEv2 tags are shown but never modified");
}
