use std::{env, env::VarError};

/// The server takes no arguments. Passing any prints the help and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Keys, tokens and secrets are left out on purpose
    const DISPLAY_ENVS: [&str; 16] = [
        "RUST_LOG",
        "EDU_HOST",
        "EDU_PORT",
        "EDU_DATABASE_URL",
        "EDU_NOTIFY_MAX_ATTEMPTS",
        "EDU_NOTIFY_BACKOFF_MS",
        "EDU_NOTIFY_BUFFER",
        "EDU_GATEWAY_BASE_URL",
        "EDU_GATEWAY_EXPIRY_MINUTES",
        "EDU_GATEWAY_VERIFY_SIGNATURE",
        "EDU_NSQ_URL",
        "EDU_PUSH_URL",
        "EDU_PUSH_CHANNEL",
        "EDU_STORAGE_URL",
        "EDU_STORAGE_BUCKET",
        "EDU_STORAGE_PATH",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
