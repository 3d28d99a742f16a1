use certpass_lib::{Certificate, DisplayEntry, Identity, Status};
use colored::{ColoredString, Colorize};

pub fn entry(position: usize, entry: &DisplayEntry, favorite: Option<&Identity>) -> String {
    match entry {
        DisplayEntry::Empty => format!(
            "{}\n{}",
            "No certificates yet".bold(),
            "Import a certificate with `certpass import <PAYLOAD>`".dimmed()
        ),
        DisplayEntry::Full(certificate) | DisplayEntry::Partial(certificate) => {
            let marker = match (favorite, &certificate.identity) {
                (Some(f), Some(i)) if f == i => "*",
                _ => " ",
            };
            format!(
                "{marker} {position:>2}  {}  {}",
                status(certificate.status()),
                summary(certificate)
            )
        }
    }
}

pub fn record(certificate: &Certificate) -> String {
    format!("  - {}  {}", status(certificate.status()), summary(certificate))
}

fn status(status: Status) -> ColoredString {
    let label = format!("{:<7}", status.to_string());
    match status {
        Status::Full => label.green().bold(),
        Status::Partial => label.yellow(),
    }
}

fn summary(certificate: &Certificate) -> String {
    let date = certificate
        .vaccination_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unknown date".into());

    format!(
        "{}  dose {}/{}  {}",
        certificate.name, certificate.dose_number, certificate.total_doses, date
    )
}
