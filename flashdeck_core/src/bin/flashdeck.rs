use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use flashdeck_core::generator::ContentGenerator;
use flashdeck_core::{
    build_questions, spreadsheet, Category, CollisionPolicy, Config, Current, ImportOutcome,
    ListError, ListRepository, OpenAiClient, Phase, Quiz, QuizKind, SqliteStore, Status,
    StudyMode, StudySession, WordStore,
};

#[derive(Parser, Debug)]
#[command(name = "flashdeck")]
#[command(about = "Vocabulary flashcards with saved lists, study sessions and quizzes")]
struct Cli {
    /// SQLite file holding saved lists (overrides configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import words from a spreadsheet (.xlsx, .xls, .ods, .csv) into a list
    Import {
        file: PathBuf,
        /// Target list, created when missing (default: active list)
        #[arg(short, long)]
        list: Option<String>,
    },
    /// Add a single word
    Add {
        english: String,
        turkish: String,
        #[arg(short, long)]
        list: Option<String>,
    },
    /// Change a word's fields
    Edit {
        /// English value of the word to edit
        word: String,
        #[arg(long)]
        english: Option<String>,
        #[arg(long)]
        turkish: Option<String>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(short, long)]
        list: Option<String>,
    },
    /// Remove a word
    Remove {
        word: String,
        #[arg(short, long)]
        list: Option<String>,
    },
    /// Show saved lists
    Lists,
    /// Print the words of a list
    Show {
        name: Option<String>,
        #[arg(short, long)]
        status: Option<Status>,
    },
    /// Save a snapshot of a list's words under a new or existing name
    Save {
        name: String,
        /// all, new, ok or practice
        #[arg(short, long, default_value = "all")]
        category: Category,
        /// Source list (default: active list)
        #[arg(short, long)]
        from: Option<String>,
    },
    Rename { old: String, new: String },
    Delete { name: String },
    /// Make a list the active one, or clear it
    Use {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },
    /// Write a list as JSON
    Export {
        name: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add a list from an exported JSON file
    ImportList {
        file: PathBuf,
        /// Replace an existing list with the same name without asking
        #[arg(long)]
        overwrite: bool,
    },
    /// Write a list's words as a CSV sheet
    ExportSheet {
        output: PathBuf,
        #[arg(short, long)]
        list: Option<String>,
        #[arg(short, long)]
        status: Option<Status>,
    },
    /// Generate an example sentence for a word
    Sentence {
        word: String,
        #[arg(short, long)]
        list: Option<String>,
    },
    /// Walk through a list's cards interactively
    Study {
        #[arg(short, long)]
        list: Option<String>,
        /// Start with practice words instead of new ones
        #[arg(long)]
        practice: bool,
    },
    /// Multiple-choice quiz over practice words
    Quiz {
        /// translation, fill-in-blank or cloze
        #[arg(short, long, default_value = "translation")]
        kind: QuizKind,
    },
}

type Repo = ListRepository<SqliteStore>;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    let mut repo = ListRepository::new(store);

    match cli.command {
        Command::Import { file, list } => import(&mut repo, &file, list),
        Command::Add { english, turkish, list } => {
            let name = resolve_list(&repo, list)?;
            update_words(&mut repo, &name, |words| {
                words.add_word(&english, &turkish)?;
                Ok(())
            })?;
            println!("Added '{}' to '{}'", english.trim(), name);
            Ok(())
        }
        Command::Edit {
            word,
            english,
            turkish,
            status,
            list,
        } => {
            let name = resolve_list(&repo, list)?;
            update_words(&mut repo, &name, |words| {
                let id = words
                    .find_by_english(&word)
                    .with_context(|| format!("No word '{}' in '{}'", word, name))?;
                if english.is_some() || turkish.is_some() {
                    let record = words.get(id).context("word vanished")?;
                    let english = english.clone().unwrap_or_else(|| record.english.clone());
                    let turkish = turkish.clone().unwrap_or_else(|| record.turkish.clone());
                    words.edit_word(id, &english, &turkish)?;
                }
                if let Some(status) = status {
                    words.set_status(id, status)?;
                }
                Ok(())
            })?;
            println!("Updated '{}'", word);
            Ok(())
        }
        Command::Remove { word, list } => {
            let name = resolve_list(&repo, list)?;
            update_words(&mut repo, &name, |words| {
                let id = words
                    .find_by_english(&word)
                    .with_context(|| format!("No word '{}' in '{}'", word, name))?;
                words.remove(id)?;
                Ok(())
            })?;
            println!("Removed '{}' from '{}'", word, name);
            Ok(())
        }
        Command::Lists => show_lists(&repo),
        Command::Show { name, status } => {
            let name = resolve_list(&repo, name)?;
            let list = repo.load_list(&name)?;
            for card in list.cards.iter().filter(|c| status.map_or(true, |s| c.status == s)) {
                print!("{:<20} {:<20} {:<9}", card.english, card.turkish, card.status.as_str());
                if let Some(sentence) = &card.example_sentence {
                    print!(" {}", sentence);
                }
                println!();
            }
            Ok(())
        }
        Command::Save { name, category, from } => {
            let source = resolve_list(&repo, from)?;
            let words = WordStore::from_records(repo.load_list(&source)?.cards);
            let saved = repo.save_list(&name, category, &words)?;
            println!("Saved '{}' with {} cards", saved.name, saved.cards.len());
            Ok(())
        }
        Command::Rename { old, new } => {
            repo.rename_list(&old, &new)?;
            println!("Renamed '{}' to '{}'", old, new.trim());
            Ok(())
        }
        Command::Delete { name } => {
            if !repo.delete_list(&name)? {
                bail!("No saved list named '{}'", name);
            }
            println!("Deleted '{}'", name);
            Ok(())
        }
        Command::Use { name, clear } => {
            if clear || name.is_none() {
                repo.set_current_list(None)?;
                println!("No active list");
                return Ok(());
            }
            let name = name.unwrap_or_default();
            repo.load_list(&name)?;
            repo.set_current_list(Some(&name))?;
            println!("Active list: '{}'", name);
            Ok(())
        }
        Command::Export { name, output } => {
            let json = repo.export_list(&name)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported '{}' to {}", name, path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Command::ImportList { file, overwrite } => import_list(&mut repo, &file, overwrite),
        Command::ExportSheet { output, list, status } => {
            let name = resolve_list(&repo, list)?;
            let cards: Vec<_> = repo
                .load_list(&name)?
                .cards
                .into_iter()
                .filter(|c| status.map_or(true, |s| c.status == s))
                .collect();
            spreadsheet::export_csv(&output, &cards)?;
            println!("Wrote {} words to {}", cards.len(), output.display());
            Ok(())
        }
        Command::Sentence { word, list } => {
            let name = resolve_list(&repo, list)?;
            let generator = generator(&config)?;
            let mut sentence = String::new();
            update_words(&mut repo, &name, |words| {
                let id = words
                    .find_by_english(&word)
                    .with_context(|| format!("No word '{}' in '{}'", word, name))?;
                let record = words.get(id).context("word vanished")?;
                sentence = generator.generate_sentence(record)?;
                words.set_example_sentence(id, &sentence)?;
                Ok(())
            })?;
            println!("{}", sentence);
            Ok(())
        }
        Command::Study { list, practice } => study(&mut repo, &config, list, practice),
        Command::Quiz { kind } => quiz(&mut repo, &config, kind),
    }
}

/// An explicit name, else the active list
fn resolve_list(repo: &Repo, name: Option<String>) -> Result<String> {
    match name {
        Some(name) => Ok(name),
        None => repo
            .current_list_name()?
            .context("No active list; pass --list or run `flashdeck use <name>`"),
    }
}

/// Load a list into a working set, apply `f` and save it back under the same name
fn update_words<F>(repo: &mut Repo, name: &str, f: F) -> Result<()>
where
    F: FnOnce(&mut WordStore) -> Result<()>,
{
    let mut words = WordStore::from_records(repo.load_list(name)?.cards);
    f(&mut words)?;
    repo.save_list(name, Category::All, &words)?;
    Ok(())
}

fn generator(config: &Config) -> Result<ContentGenerator<OpenAiClient>> {
    let client = OpenAiClient::from_config(config)?;
    Ok(ContentGenerator::new(client, config.model.clone()))
}

fn import(repo: &mut Repo, file: &Path, list: Option<String>) -> Result<()> {
    let name = match list {
        Some(name) => name,
        None => repo.current_list_name()?.unwrap_or_else(|| default_list_name(file)),
    };
    let rows = spreadsheet::read_rows(file)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    let total = rows.len();
    let added = repo.merge_rows(&name, rows, &mut rand::thread_rng())?;
    repo.set_current_list(Some(&name))?;
    println!("Imported {} new words into '{}' ({} rows read)", added, name, total);
    Ok(())
}

fn default_list_name(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Imported".to_string())
}

fn import_list(repo: &mut Repo, file: &Path, overwrite: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let policy = if overwrite {
        CollisionPolicy::Overwrite
    } else {
        CollisionPolicy::Abort
    };

    let outcome = match repo.import_list(&contents, policy) {
        Err(ListError::NameCollision(name)) => {
            if !confirm(&format!("A list named '{}' already exists. Replace it?", name))? {
                println!("Import cancelled");
                return Ok(());
            }
            repo.import_list(&contents, CollisionPolicy::Overwrite)?
        }
        other => other?,
    };
    match outcome {
        ImportOutcome::Added => println!("Imported {}", file.display()),
        ImportOutcome::Replaced => println!("Replaced existing list from {}", file.display()),
    }
    Ok(())
}

fn show_lists(repo: &Repo) -> Result<()> {
    let current = repo.current_list_name()?;
    let lists = repo.lists()?;
    if lists.is_empty() {
        println!("No saved lists");
        return Ok(());
    }
    for list in lists {
        let counts = list.counts();
        let marker = if current.as_deref() == Some(list.name.as_str()) { "*" } else { " " };
        println!(
            "{} {:<24} {:>4} cards  new {:>3}  ok {:>3}  practice {:>3}  saved {}",
            marker,
            list.name,
            counts.total(),
            counts.new,
            counts.ok,
            counts.practice,
            list.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn prompt(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [y/N] ", question))?.unwrap_or_default();
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

fn study(repo: &mut Repo, config: &Config, list: Option<String>, practice: bool) -> Result<()> {
    let name = resolve_list(repo, list)?;
    let mut session = StudySession::new(WordStore::from_records(repo.load_list(&name)?.cards));
    if practice {
        session.switch_mode(StudyMode::Practice, false);
    }
    let generator = generator(config).ok();

    println!("Commands: [f]lip [o]k [p]ractice [n]ext [b]ack [m]ode [s]entence [q]uit");
    loop {
        let counts = session.words().counts();
        let flipped = session.is_flipped();
        let mode = session.mode();
        match session.current() {
            Current::Finished => {
                println!("All words reviewed.");
                break;
            }
            Current::Card(_, card) => {
                println!();
                println!(
                    "[{:?}] new {} / practice {} / ok {}",
                    mode, counts.new, counts.practice, counts.ok
                );
                if flipped {
                    println!("  {} = {}", card.english, card.turkish);
                    if let Some(sentence) = &card.example_sentence {
                        println!("  \"{}\"", sentence);
                    }
                } else {
                    println!("  {}", card.english);
                }
            }
        }

        let Some(command) = prompt("> ")? else {
            break;
        };
        match command.as_str() {
            "f" | "flip" => session.flip(),
            "o" | "ok" => {
                session.record_decision(Status::Ok)?;
                repo.save_list(&name, Category::All, session.words())?;
            }
            "p" | "practice" => {
                session.record_decision(Status::Practice)?;
                repo.save_list(&name, Category::All, session.words())?;
            }
            "n" | "next" => session.advance(),
            "b" | "back" => session.retreat(),
            "m" | "mode" => session.switch_mode(session.mode().other(), true),
            "s" | "sentence" => {
                let Some(generator) = &generator else {
                    println!("Sentence generation needs OPENAI_API_KEY");
                    continue;
                };
                let Some(ticket) = session.begin_generation() else {
                    continue;
                };
                let Some(card) = session.words().get(ticket.word()).cloned() else {
                    session.abandon_generation(ticket);
                    continue;
                };
                match generator.generate_sentence(&card) {
                    Ok(sentence) => {
                        if session.finish_generation(ticket, &sentence) {
                            repo.save_list(&name, Category::All, session.words())?;
                        }
                    }
                    Err(e) => {
                        session.abandon_generation(ticket);
                        println!("Could not generate a sentence: {}", e);
                    }
                }
            }
            "q" | "quit" => break,
            "" => {}
            other => println!("Unknown command '{}'", other),
        }
    }

    repo.save_list(&name, Category::All, session.words())?;
    Ok(())
}

fn quiz(repo: &mut Repo, config: &Config, kind: QuizKind) -> Result<()> {
    let words = repo.practice_words()?;
    let generator = if kind.needs_generator() {
        Some(generator(config)?)
    } else {
        None
    };
    let questions = build_questions(kind, &words, generator.as_ref(), &mut rand::thread_rng())?;
    let mut quiz = Quiz::for_kind(kind, questions);

    println!("{} questions. Answer with a number; [n]ext [b]ack [f]inish", quiz.len());
    while let Phase::Answering(_) = quiz.phase() {
        let Some((i, question)) = quiz.current() else {
            break;
        };
        println!();
        println!("{}/{}  {}", i + 1, quiz.len(), question.prompt);
        if let Some(word_type) = &question.word_type {
            println!("  ({})", word_type);
        }
        let chosen = quiz.answer_for(i).map(str::to_string);
        let options = question.options.clone();
        for (n, option) in options.iter().enumerate() {
            let mark = if chosen.as_deref() == Some(option.as_str()) { "*" } else { " " };
            println!(" {}{}. {}", mark, n + 1, option);
        }

        let Some(input) = prompt("> ")? else {
            quiz.finish();
            break;
        };
        match input.as_str() {
            "n" | "next" => quiz.next(),
            "b" | "back" => quiz.previous(),
            "f" | "finish" => quiz.finish(),
            other => match other
                .parse::<usize>()
                .ok()
                .and_then(|n| options.get(n.wrapping_sub(1)))
            {
                Some(option) => {
                    quiz.answer(option);
                }
                None => println!("Pick 1-{}", options.len()),
            },
        }
    }

    println!();
    for outcome in quiz.outcomes() {
        let mark = if outcome.correct { "+" } else { "-" };
        println!(
            "{} {} -> {} (yours: {})",
            mark,
            outcome.question.word,
            outcome.question.correct_answer,
            outcome.answer.unwrap_or("-")
        );
    }
    let score = quiz.score();
    println!("Score: {}/{} ({:.1}%)", score.correct, score.total, score.percent());

    if kind == QuizKind::FillInBlank {
        let update = repo.record_quiz_progress(&quiz.correct_words())?;
        for word in update.promoted {
            println!("'{}' moved to known words", word);
        }
    }
    Ok(())
}
