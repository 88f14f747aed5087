pub mod commands;

use std::io::{self, Write};
use uuid::Uuid;

use crate::chat::ConversationService;
use crate::cli::commands::{Commands, SessionAction};
use crate::config::AppConfig;
use crate::db::{get_connection, service::DbService};
use crate::llm::{models::GenOptions, GeneratorFactory};

pub async fn run_cli(command: Commands, config_path: String) {
    let config = AppConfig::load(&config_path).expect("Failed to load config");

    match command {
        Commands::Serve => {
            panic!("Serve command should be intercepted by main.rs to boot actix-web");
        }
        Commands::Session { action } => {
            let pool = get_connection(&config.database).expect("DB error");
            let conn = pool.lock().unwrap();

            for entry in &config.auth.keys {
                let _ = DbService::upsert_user(&conn, entry.user_id, &entry.user_name);
            }

            match action {
                SessionAction::Create { title, user } => {
                    match DbService::insert_session(&conn, user, &title) {
                        Ok(session) => {
                            println!("Created Session: {} ({})", session.title, session.id)
                        }
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                SessionAction::List { user } => match DbService::list_sessions(&conn, user) {
                    Ok(sessions) => {
                        if sessions.is_empty() {
                            println!("No sessions found.");
                        } else {
                            println!("{:<38} | {:<20} | {}", "ID", "Updated At", "Title");
                            println!("{:-<38}-+-{:-<20}-+-{:-<20}", "", "", "");
                            for s in sessions {
                                println!(
                                    "{:<38} | {:<20} | {}",
                                    s.id.to_string(),
                                    s.updated_at,
                                    s.title
                                );
                            }
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                },
                SessionAction::Rename { id, title } => {
                    match DbService::rename_session(&conn, id, &title) {
                        Ok(Some(session)) => println!("Renamed session to: {}", session.title),
                        Ok(None) => eprintln!("Session {} not found.", id),
                        Err(e) => eprintln!("Error: {}", e),
                    }
                }
                SessionAction::Delete { id } => match DbService::delete_session(&conn, id) {
                    Ok(_) => println!("Deleted session {}", id),
                    Err(e) => eprintln!("Error: {}", e),
                },
            }
        }
        Commands::Chat { session } => {
            run_repl(session, config).await;
        }
    }
}

async fn run_repl(session_id: Uuid, config: AppConfig) {
    let pool = get_connection(&config.database).expect("DB Error");

    let session = {
        let conn = pool.lock().unwrap();
        DbService::get_session(&conn, session_id).unwrap_or(None)
    };

    let Some(session) = session else {
        eprintln!("Session {} not found.", session_id);
        return;
    };

    let generator =
        GeneratorFactory::create_default(&config).expect("Failed to init turn generator");
    let conversation = ConversationService::new(
        pool,
        generator,
        GenOptions::from_chat_config(&config.chat),
    );

    println!("--- Kaiwa Terminal Chat ---");
    println!("Connected to Session: {} ({})", session.title, session.id);
    println!("Type /exit to quit.");
    println!("---------------------------");

    loop {
        print!("\nUser> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        io::stdin().read_line(&mut input).unwrap();
        let text = input.trim();

        if text.is_empty() {
            continue;
        }
        if text == "/exit" || text == "/quit" {
            break;
        }

        match conversation.submit_turn(session_id, text).await {
            Ok(exchange) => {
                println!("Kaiwa> {}", exchange.assistant_turn.content);
            }
            Err(e) => {
                // The user turn stays persisted; only the reply failed.
                eprintln!("Error: {}", e);
            }
        }
    }
}
