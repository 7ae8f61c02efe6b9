use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError, MoneyCents, NewBookCmd, RegisterUserCmd};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "library_admin")]
#[command(about = "Admin utilities for the library (users and catalog)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./library.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Category(Category),
    Book(Book),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
}

#[derive(Args, Debug)]
struct Category {
    #[command(subcommand)]
    command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Create(CategoryCreateArgs),
}

#[derive(Args, Debug)]
struct CategoryCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
}

#[derive(Args, Debug)]
struct Book {
    #[command(subcommand)]
    command: BookCommand,
}

#[derive(Subcommand, Debug)]
enum BookCommand {
    Create(BookCreateArgs),
    /// Add copies (or remove them with a negative delta).
    Restock(BookRestockArgs),
}

#[derive(Args, Debug)]
struct BookCreateArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Price as a decimal, e.g. `12.50`.
    #[arg(long)]
    price: String,
    #[arg(long, default_value_t = 1)]
    quantity: i32,
    #[arg(long)]
    category_id: i32,
    #[arg(long)]
    image: Option<String>,
}

#[derive(Args, Debug)]
struct BookRestockArgs {
    #[arg(long)]
    book_id: i32,
    #[arg(long, allow_hyphen_values = true)]
    delta: i32,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Prints `err` and exits with a code telling user mistakes (1) from
/// failures (2).
fn exit_with(err: EngineError) -> ! {
    eprintln!("{err}");
    let code = match err {
        EngineError::Database(_) | EngineError::PasswordHash(_) => 2,
        _ => 1,
    };
    std::process::exit(code);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let user = engine
                .register_user(RegisterUserCmd {
                    username: args.username,
                    email: args.email,
                    password,
                    first_name: args.first_name,
                    last_name: args.last_name,
                })
                .await
                .unwrap_or_else(|err| exit_with(err));

            println!("created user: {}", user.username);
        }
        Command::Category(Category {
            command: CategoryCommand::Create(args),
        }) => {
            let category = engine
                .new_category(&args.name, &args.description)
                .await
                .unwrap_or_else(|err| exit_with(err));
            println!("created category: {} ({})", category.name, category.id);
        }
        Command::Book(Book {
            command: BookCommand::Create(args),
        }) => {
            let price: MoneyCents = args.price.parse().unwrap_or_else(|err| exit_with(err));
            let book = engine
                .new_book(NewBookCmd {
                    title: args.title,
                    author: args.author,
                    description: args.description,
                    price,
                    image: args.image,
                    quantity: args.quantity,
                    category_id: args.category_id,
                })
                .await
                .unwrap_or_else(|err| exit_with(err));
            println!(
                "created book: {} ({}), {} copies at {}",
                book.title, book.id, book.quantity, book.price
            );
        }
        Command::Book(Book {
            command: BookCommand::Restock(args),
        }) => {
            let book = engine
                .restock_book(args.book_id, args.delta)
                .await
                .unwrap_or_else(|err| exit_with(err));
            println!("{}: {} copies in stock", book.title, book.quantity);
        }
    }

    Ok(())
}
