use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use admission_core::card;
use admission_core::model::{Applicant, Role};
use admission_core::AppResult;

#[derive(Parser)]
#[command(name = "admission-bot")]
#[command(author, version, about = "Telegram registration bot with admin moderation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot and the form intake server
    Run,

    /// Print the review card a form submission would produce
    Preview {
        /// Which form the submission came from
        #[arg(short, long, value_parser = parse_role)]
        role: Role,

        /// JSON file with the submission body
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse::<Role>()
        .map_err(|_| format!("unknown role {:?}, expected student or graduate", raw))
}

/// Renders the card for a submission stored on disk.
pub fn preview_card(role: Role, path: &Path) -> AppResult<String> {
    let body = std::fs::read(path)?;
    let applicant = Applicant::decode(role, &body)?;
    Ok(card::render(&applicant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use admission_core::AppError;
    use std::io::Write;

    #[test]
    fn test_parse_preview_command() {
        let cli = Cli::try_parse_from(["admission-bot", "preview", "--role", "graduate", "form.json"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Preview {
                role: Role::Graduate,
                file: PathBuf::from("form.json"),
            })
        );
    }

    #[test]
    fn test_run_is_optional() {
        assert_eq!(Cli::try_parse_from(["admission-bot"]).unwrap().command, None);
        assert_eq!(
            Cli::try_parse_from(["admission-bot", "run"]).unwrap().command,
            Some(Commands::Run)
        );
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(Cli::try_parse_from(["admission-bot", "preview", "-r", "teacher", "f.json"]).is_err());
    }

    #[test]
    fn test_preview_card_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tgId":"1","name":"Томас","class":"10А"}}"#).unwrap();

        let card = preview_card(Role::Student, file.path()).unwrap();
        assert_eq!(card, "Новая заявка от лицеиста!\n\nИмя: Томас\n\nКласс: 10А");
    }

    #[test]
    fn test_preview_card_errors() {
        let missing = preview_card(Role::Student, Path::new("/nonexistent/form.json"));
        assert!(matches!(missing, Err(AppError::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            preview_card(Role::Graduate, file.path()),
            Err(AppError::Decode(_))
        ));
    }
}
