use colored::*;
use music_duper_core::storage::models::FileRecord;
use music_duper_core::{Chooser, Cluster};
use std::io::{self, BufRead, Write};
use tracing::warn;

pub fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

/// Asks on the terminal which member of each cluster to keep.
pub struct TerminalChooser;

impl TerminalChooser {
    fn print_cluster(cluster: &Cluster) {
        println!();
        println!("{} {}", "Cluster".bold(), cluster.key.to_string().cyan());
        println!(
            "{}",
            format!(
                "{:>3}  {:>6}  {:<30}  {:<24}  {:<20}  {:>5}  {:>10}  {}",
                "#", "id", "title", "album", "artist", "track", "size", "path"
            )
            .dimmed()
        );
        for (i, record) in cluster.members.iter().enumerate() {
            println!("{}", Self::row(i + 1, record));
        }
    }

    fn row(number: usize, record: &FileRecord) -> String {
        format!(
            "{}  {:>6}  {:<30}  {:<24}  {:<20}  {:>5}  {:>10}  {}",
            format!("{:>3}", number).yellow(),
            record.id,
            clip(record.title.as_deref(), 30),
            clip(record.album.as_deref(), 24),
            clip(record.artist.as_deref(), 20),
            record.track_no.map(|t| t.to_string()).unwrap_or_default(),
            record.size.map(|s| s.to_string()).unwrap_or_default(),
            record.path,
        )
    }

    fn read_choice(members: usize) -> io::Result<Option<usize>> {
        let stdin = io::stdin();
        let mut input = String::new();
        loop {
            input.clear();
            print!("Keep which? [1-{}, s to skip]: ", members);
            io::stdout().flush()?;
            if stdin.lock().read_line(&mut input)? == 0 {
                return Ok(None);
            }
            let answer = input.trim();
            if answer.is_empty() || answer.eq_ignore_ascii_case("s") {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=members).contains(&n) => return Ok(Some(n - 1)),
                _ => println!("{}", "Not a member number".red()),
            }
        }
    }
}

impl Chooser for TerminalChooser {
    fn choose(&mut self, cluster: &Cluster) -> Option<usize> {
        Self::print_cluster(cluster);
        match Self::read_choice(cluster.members.len()) {
            Ok(choice) => choice,
            Err(e) => {
                warn!("Could not read a choice, skipping cluster: {}", e);
                None
            }
        }
    }
}

fn clip(value: Option<&str>, width: usize) -> String {
    let value = value.unwrap_or("-");
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut clipped: String = value.chars().take(width.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }
}
