use std::{env, fs, process::ExitCode};

use pytrace::{Action, ProtocolResult};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.py" };
    let sandbox = args.iter().any(|a| a == "--sandbox");

    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let (actions, results, handle) = pytrace::spawn_trace(file_path.to_owned(), source, sandbox);

    if actions.send(Action::Start).is_err() {
        eprintln!("error: engine exited before accepting Start");
        return ExitCode::FAILURE;
    }

    let exit = loop {
        let result = match results.recv() {
            Ok(result) => result,
            Err(_) => break ExitCode::SUCCESS,
        };
        match result {
            ProtocolResult::Started => continue,
            ProtocolResult::Data { snapshot, finish } => {
                if let Some(snapshot) = &snapshot {
                    println!("{}", serde_json::to_string(snapshot).expect("snapshot is JSON-safe"));
                }
                if !finish {
                    break ExitCode::SUCCESS;
                }
                if actions.send(Action::Step).is_err() {
                    break ExitCode::SUCCESS;
                }
            }
            ProtocolResult::Product { .. } | ProtocolResult::Locked => continue,
            ProtocolResult::Error { message } => {
                eprintln!("error: {message}");
                break ExitCode::FAILURE;
            }
        }
    };

    let _ = handle.join();
    exit
}
