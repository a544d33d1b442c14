use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use gesturectl_lib::UseCase;

fn main() -> ExitCode {
    println!("Select use case:");
    for (choice, title) in UseCase::MENU {
        println!("{}. {}", choice, title);
    }

    let choice = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => prompt_choice(),
    };

    let Some(use_case) = UseCase::from_choice(&choice) else {
        println!("Invalid choice. Exiting.");
        return ExitCode::from(1);
    };

    gesturectl_lib::init_logging();

    match use_case {
        UseCase::HandGestureRecognition => {
            let quit = Arc::new(AtomicBool::new(false));
            watch_quit_key(quit.clone());

            match gesturectl_lib::run(quit) {
                Ok(reason) => {
                    tracing::info!("Exiting ({:?})", reason);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("{:#}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn prompt_choice() -> String {
    print!("Enter choice (1): ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    if let Err(e) = std::io::stdin().read_line(&mut line) {
        eprintln!("Failed to read choice: {}", e);
    }
    line
}

/// Set `quit` when a line reading `q` arrives on stdin.
fn watch_quit_key(quit: Arc<AtomicBool>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") {
                tracing::info!("Quit requested");
                quit.store(true, Ordering::SeqCst);
                break;
            }
        }
    });
}
