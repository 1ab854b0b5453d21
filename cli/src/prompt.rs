//! Terminal prompts.

use std::io::{self, BufRead, Write};

/// Ask a yes/no question on stdin. Anything but `y`/`yes` declines.
pub fn confirm(message: &str) -> io::Result<bool> {
    print!("{message} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Read an access token without echoing it.
pub fn read_token() -> io::Result<String> {
    let token = rpassword::prompt_password("YNAB access token: ")?;
    Ok(token.trim().to_string())
}
