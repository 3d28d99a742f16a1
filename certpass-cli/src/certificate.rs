use std::{fs, path::PathBuf};

use certpass_lib::{DisplayEntry, Repository, decode::JsonDecoder};
use clap::Subcommand;

use crate::{Failure, render};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List certificates, one entry per holder with the favorite first
    List,
    /// Import a certificate payload
    Import {
        #[arg(required_unless_present = "file")]
        payload: Option<String>,
        /// Read the payload from a file instead
        #[arg(short, long, conflicts_with = "payload")]
        file: Option<PathBuf>,
    },
    /// Show every record behind a list entry
    Show { index: usize },
    /// Show the holder of a list entry first
    Favorite { index: usize },
}

pub fn handle(repo: &Repository, cmd: &Command) -> Result<(), Failure> {
    match cmd {
        Command::List => {
            let favorite = repo.favorite()?.and_then(|c| c.identity);
            for (position, entry) in repo.display_entries()?.iter().enumerate() {
                println!("{}", render::entry(position + 1, entry, favorite.as_ref()));
            }
        }
        Command::Import { payload, file } => {
            let payload = match (payload, file) {
                (Some(payload), _) => payload.clone(),
                (None, Some(path)) => fs::read_to_string(path)
                    .map_err(|source| Failure::Read {
                        path: path.clone(),
                        source,
                    })?
                    .trim()
                    .to_string(),
                (None, None) => return Err(Failure::Usage("No payload given".into())),
            };

            let certificate = repo.import(&JsonDecoder, &payload)?;
            println!("Imported certificate for {}", certificate.name);
            for record in repo.pair_for(&certificate)? {
                println!("{}", render::record(&record));
            }
        }
        Command::Show { index } => {
            let pair = repo.pair_at(to_position(*index)?)?;
            if pair.is_empty() {
                return Err(Failure::Usage(format!("No certificate at {index}")));
            }
            for record in pair {
                println!("{}", render::record(&record));
            }
        }
        Command::Favorite { index } => {
            let entries = repo.display_entries()?;
            let certificate = entries
                .get(to_position(*index)?)
                .and_then(DisplayEntry::certificate)
                .ok_or_else(|| Failure::Usage(format!("No certificate at {index}")))?;
            let identity = certificate.identity.as_ref().ok_or_else(|| {
                Failure::Usage(format!("The certificate of {} has no identity", certificate.name))
            })?;

            repo.set_favorite(identity)?;
            println!("{} is now shown first", certificate.name);
        }
    }

    Ok(())
}

/// Entries are numbered from 1 on the command line
fn to_position(index: usize) -> Result<usize, Failure> {
    index
        .checked_sub(1)
        .ok_or_else(|| Failure::Usage("Entries are numbered from 1".into()))
}
