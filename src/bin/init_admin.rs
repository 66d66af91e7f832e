//! Print the SQL that seeds an admin account.
//!
//! Usage: `cargo run --bin init-admin -- <username> <password>`
//!
//! The password is hashed with Argon2; pipe the output into the database
//! shell of your choice.

use anyhow::{bail, Context, Result};

use owlblog::services::{auth::MIN_PASSWORD_LEN, hash_password};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(username), Some(password)) = (args.next(), args.next()) else {
        bail!("usage: init-admin <username> <password>");
    };

    if username.trim().is_empty() {
        bail!("username must not be empty");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {} characters", MIN_PASSWORD_LEN);
    }

    let hash = hash_password(&password).context("Failed to hash password")?;

    println!("-- Admin account for '{}'", username);
    println!(
        "INSERT INTO admins (username, password_hash) VALUES ('{}', '{}');",
        sql_quote(username.trim()),
        sql_quote(&hash)
    );
    Ok(())
}

/// Escape a value for a single-quoted SQL literal
fn sql_quote(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_quote() {
        assert_eq!(sql_quote("o'brien"), "o''brien");
        assert_eq!(sql_quote("plain"), "plain");
    }
}
