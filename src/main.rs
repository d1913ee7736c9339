use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing_subscriber::EnvFilter;

use circulation_desk::{
    Catalog, LendingEngine, Outcome, PaymentDecision, Role, Roster, Snapshot, User,
    date::Date,
    display::Report,
    ids::{BookId, UserId},
    observers::{NotificationService, TransitionLogger},
};

/// Console front end for the library circulation desk.
#[derive(Debug, Parser)]
#[command(name = "circulation-desk", version, about)]
struct Args {
    /// Path of the JSON snapshot holding the library state.
    #[arg(long, default_value = "library.json")]
    data: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let (catalog, mut roster) = match Snapshot::load_from_file(&args.data) {
        Ok(snapshot) => snapshot.restore(),
        Err(err) => {
            tracing::warn!(path = %args.data.display(), %err, "no usable snapshot; starting empty");
            (Catalog::new(), Roster::new())
        }
    };

    // A desk with no librarian is unmanageable, so seed one.
    if !roster.has_role(Role::Librarian) {
        tracing::warn!("no librarian on file; seeding default account ADMIN (credential: admin)");
        roster.add_user(User::new(
            UserId::new("ADMIN"),
            "Administrator",
            "admin",
            Role::Librarian,
        ));
    }

    let mut engine = LendingEngine::new(catalog, roster);
    engine.register_observer(Box::new(TransitionLogger));
    engine.register_observer(Box::new(NotificationService));

    let mut editor = DefaultEditor::new()?;
    let session = run(&mut engine, &mut editor);

    // Persist whatever state was reached, even when the session loop failed.
    Snapshot::capture(&engine)
        .save_to_file(&args.data)
        .with_context(|| format!("saving snapshot to {}", args.data.display()))?;
    tracing::info!(path = %args.data.display(), "snapshot saved");
    session
}

/// Login loop. Ends on a blank user id or end of input.
fn run(engine: &mut LendingEngine, editor: &mut DefaultEditor) -> anyhow::Result<()> {
    loop {
        println!("\n=== Library Circulation Desk ===");
        let Some(raw_id) = prompt(editor, "User ID (blank to quit): ")? else {
            return Ok(());
        };
        if raw_id.is_empty() {
            return Ok(());
        }
        let user_id = UserId::new(raw_id);
        let Some(credential) = prompt(editor, "Credential: ")? else {
            return Ok(());
        };
        match engine.authenticate(&user_id, &credential) {
            Ok(Role::Librarian) => librarian_session(engine, editor, &user_id)?,
            Ok(_) => patron_session(engine, editor, &user_id)?,
            Err(err) => println!("Login failed: {err}"),
        }
    }
}

fn patron_session(
    engine: &mut LendingEngine,
    editor: &mut DefaultEditor,
    user_id: &UserId,
) -> anyhow::Result<()> {
    loop {
        println!("\n--- Patron Menu ({user_id}) ---");
        println!("1. Borrow a book");
        println!("2. Cancel a reservation");
        println!("3. Return a book");
        println!("4. Current bookings");
        println!("5. Booking history");
        println!("6. List books");
        println!("7. Logout");
        let Some(choice) = prompt(editor, "> ")? else {
            return Ok(());
        };
        let done = match choice.as_str() {
            "1" => borrow_flow(engine, editor, user_id)?,
            "2" => cancel_flow(engine, editor, user_id)?,
            "3" => return_flow(engine, editor, user_id)?,
            "4" => {
                match prompt_date(editor, "Today's date (DDMMYYYY): ")? {
                    Some(date) => match engine.current_bookings(user_id, date) {
                        Ok(rows) => println!("{}", Report::booking_table(&rows)),
                        Err(err) => println!("Error: {err}"),
                    },
                    None => return Ok(()),
                }
                false
            }
            "5" => {
                match engine.booking_history(user_id) {
                    Ok(rows) => println!("{}", Report::booking_table(&rows)),
                    Err(err) => println!("Error: {err}"),
                }
                false
            }
            "6" => {
                println!("{}", Report::book_table(engine.catalog()));
                false
            }
            "7" => true,
            other => {
                println!("Unknown option: {other}");
                false
            }
        };
        if done {
            return Ok(());
        }
    }
}

/// Borrow, falling back to an offered reservation when the book is out.
fn borrow_flow(
    engine: &mut LendingEngine,
    editor: &mut DefaultEditor,
    user_id: &UserId,
) -> anyhow::Result<bool> {
    let Some(raw) = prompt(editor, "Book ID: ")? else {
        return Ok(true);
    };
    let book_id = BookId::new(raw);
    let Some(date) = prompt_date(editor, "Today's date (DDMMYYYY): ")? else {
        return Ok(true);
    };
    match engine.borrow(user_id, &book_id, date) {
        Ok(Outcome::ReservationOffered { book_id }) => {
            let Some(answer) = prompt(editor, "Book is out. Reserve it instead? (y/n): ")? else {
                return Ok(true);
            };
            if answer.eq_ignore_ascii_case("y") {
                match engine.reserve(user_id, &book_id, date) {
                    Ok(outcome) => println!("{outcome}"),
                    Err(err) => println!("Error: {err}"),
                }
            }
        }
        Ok(outcome) => println!("{outcome}"),
        Err(err) => println!("Error: {err}"),
    }
    Ok(false)
}

fn cancel_flow(
    engine: &mut LendingEngine,
    editor: &mut DefaultEditor,
    user_id: &UserId,
) -> anyhow::Result<bool> {
    let Some(raw) = prompt(editor, "Book ID: ")? else {
        return Ok(true);
    };
    match engine.cancel_reservation(user_id, &BookId::new(raw)) {
        Ok(outcome) => println!("{outcome}"),
        Err(err) => println!("Error: {err}"),
    }
    Ok(false)
}

/// Pick an active booking by row number, then settle any fine before the
/// return commits.
fn return_flow(
    engine: &mut LendingEngine,
    editor: &mut DefaultEditor,
    user_id: &UserId,
) -> anyhow::Result<bool> {
    let Some(date) = prompt_date(editor, "Today's date (DDMMYYYY): ")? else {
        return Ok(true);
    };
    let bookings = match engine.current_bookings(user_id, date) {
        Ok(rows) => rows,
        Err(err) => {
            println!("Error: {err}");
            return Ok(false);
        }
    };
    if bookings.is_empty() {
        println!("No active bookings.");
        return Ok(false);
    }
    println!("{}", Report::booking_table(&bookings));
    let Some(raw) = prompt(editor, "Row number to return: ")? else {
        return Ok(true);
    };
    let Some(booking) = raw
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| bookings.get(i))
    else {
        println!("Invalid row number: {raw}");
        return Ok(false);
    };
    let booking_id = booking.id.clone();
    match engine.return_book(user_id, &booking_id, date, PaymentDecision::Declined) {
        Ok(Outcome::FineDue { amount }) => {
            let Some(answer) = prompt(editor, &format!("A fine of {amount} is due. Pay now? (y/n): "))?
            else {
                return Ok(true);
            };
            if answer.eq_ignore_ascii_case("y") {
                match engine.return_book(user_id, &booking_id, date, PaymentDecision::Accepted) {
                    Ok(outcome) => println!("{outcome}"),
                    Err(err) => println!("Error: {err}"),
                }
            } else {
                println!("Return cancelled; the fine remains outstanding.");
            }
        }
        Ok(outcome) => println!("{outcome}"),
        Err(err) => println!("Error: {err}"),
    }
    Ok(false)
}

fn librarian_session(
    engine: &mut LendingEngine,
    editor: &mut DefaultEditor,
    actor: &UserId,
) -> anyhow::Result<()> {
    loop {
        println!("\n--- Librarian Menu ({actor}) ---");
        println!("1. Add a book");
        println!("2. Remove a book");
        println!("3. Add a user");
        println!("4. Remove a user");
        println!("5. List books");
        println!("6. List users");
        println!("7. Recent events");
        println!("8. Logout");
        let Some(choice) = prompt(editor, "> ")? else {
            return Ok(());
        };
        match choice.as_str() {
            "1" => {
                if add_book_flow(engine, editor, actor)? {
                    return Ok(());
                }
            }
            "2" => {
                let Some(raw) = prompt(editor, "Book ID: ")? else {
                    return Ok(());
                };
                match engine.remove_book(actor, &BookId::new(raw)) {
                    Ok(outcome) => println!("{outcome}"),
                    Err(err) => println!("Error: {err}"),
                }
            }
            "3" => {
                if add_user_flow(engine, editor, actor)? {
                    return Ok(());
                }
            }
            "4" => {
                let Some(raw) = prompt(editor, "User ID: ")? else {
                    return Ok(());
                };
                match engine.remove_user(actor, &UserId::new(raw)) {
                    Ok(outcome) => println!("{outcome}"),
                    Err(err) => println!("Error: {err}"),
                }
            }
            "5" => println!("{}", Report::book_table(engine.catalog())),
            "6" => println!("{}", Report::user_table(engine.roster())),
            "7" => println!("{}", Report::event_history(engine.event_log())),
            "8" => return Ok(()),
            other => println!("Unknown option: {other}"),
        }
    }
}

fn add_book_flow(
    engine: &mut LendingEngine,
    editor: &mut DefaultEditor,
    actor: &UserId,
) -> anyhow::Result<bool> {
    let fields = ["Title: ", "Author: ", "Publisher: ", "ISBN: "];
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(value) = prompt(editor, field)? else {
            return Ok(true);
        };
        values.push(value);
    }
    let Some(raw_year) = prompt(editor, "Year: ")? else {
        return Ok(true);
    };
    let Ok(year) = raw_year.parse::<u16>() else {
        println!("Invalid year: {raw_year}");
        return Ok(false);
    };
    let [title, author, publisher, isbn] = values.as_slice() else {
        return Ok(false);
    };
    match engine.add_book(actor, title, author, publisher, isbn, year) {
        Ok(outcome) => println!("{outcome}"),
        Err(err) => println!("Error: {err}"),
    }
    Ok(false)
}

fn add_user_flow(
    engine: &mut LendingEngine,
    editor: &mut DefaultEditor,
    actor: &UserId,
) -> anyhow::Result<bool> {
    let Some(name) = prompt(editor, "Name: ")? else {
        return Ok(true);
    };
    let Some(credential) = prompt(editor, "Credential: ")? else {
        return Ok(true);
    };
    let Some(raw_role) = prompt(editor, "Role (student/faculty/librarian): ")? else {
        return Ok(true);
    };
    let role = match raw_role.to_ascii_lowercase().as_str() {
        "student" => Role::Student,
        "faculty" => Role::Faculty,
        "librarian" => Role::Librarian,
        other => {
            println!("Unknown role: {other}");
            return Ok(false);
        }
    };
    match engine.add_user(actor, name, credential, role) {
        Ok(outcome) => println!("{outcome}"),
        Err(err) => println!("Error: {err}"),
    }
    Ok(false)
}

/// Read one trimmed line. `None` means end of input (ctrl-c / ctrl-d).
fn prompt(editor: &mut DefaultEditor, text: &str) -> anyhow::Result<Option<String>> {
    match editor.readline(text) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Keep asking until the input parses as a DDMMYYYY date.
fn prompt_date(editor: &mut DefaultEditor, text: &str) -> anyhow::Result<Option<Date>> {
    loop {
        let Some(raw) = prompt(editor, text)? else {
            return Ok(None);
        };
        match Date::parse(&raw) {
            Ok(date) => return Ok(Some(date)),
            Err(err) => println!("Error: {err}"),
        }
    }
}
