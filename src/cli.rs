//! Terminal REPL: profile intake followed by a chat loop on stdin.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::agent::QuickQuery;
use crate::error::Error;
use crate::service::{Reply, WellnessService};
use crate::session::{HealthForm, MessageRole, Mood, ProfileForm, Session};
use crate::tools::{ContactLaunch, ContactMethod, DOCTORS};

const HELP: &str = "\
Commands:
  /stress | /sleep | /diet              quick wellness queries
  /health <kg> <low|neutral|high> <hours>  log progress
  /doc <path>                           upload and process a PDF or text file
  /doctors                              list specialists
  /connect <n> <phone|video>            connect with specialist n
  /cancel                               cancel a pending consultation
  /history                              show the conversation
  /quit                                 exit
Anything else is sent as a chat message.";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Chat(String),
    Quick(QuickQuery),
    Health(HealthForm),
    Document(PathBuf),
    Doctors,
    Connect { index: usize, method: ContactMethod },
    Cancel,
    History,
    Help,
    Quit,
}

/// Parse one input line. Errors are usage messages for the user.
pub fn parse_command(line: &str) -> Result<CliCommand, String> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(CliCommand::Chat(line.to_string()));
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match command {
        "/stress" => Ok(CliCommand::Quick(QuickQuery::StressRelief)),
        "/sleep" => Ok(CliCommand::Quick(QuickQuery::SleepImprovement)),
        "/diet" => Ok(CliCommand::Quick(QuickQuery::DietSuggestions)),
        "/health" => {
            let [weight, mood, sleep] = args.as_slice() else {
                return Err("usage: /health <kg> <low|neutral|high> <hours>".to_string());
            };
            let weight_kg = weight
                .parse::<f64>()
                .map_err(|_| format!("invalid weight '{weight}'"))?;
            let mood = mood.parse::<Mood>().map_err(|e| e.to_string())?;
            let sleep_hours = sleep
                .parse::<f64>()
                .map_err(|_| format!("invalid sleep hours '{sleep}'"))?;
            Ok(CliCommand::Health(HealthForm {
                weight_kg,
                mood,
                sleep_hours,
            }))
        }
        "/doc" => {
            let path = line["/doc".len()..].trim();
            if path.is_empty() {
                return Err("usage: /doc <path>".to_string());
            }
            Ok(CliCommand::Document(PathBuf::from(path)))
        }
        "/doctors" => Ok(CliCommand::Doctors),
        "/connect" => {
            let (index, method) = match args.as_slice() {
                [index] => (*index, "phone"),
                [index, method] => (*index, *method),
                _ => return Err("usage: /connect <n> <phone|video>".to_string()),
            };
            let index = index
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=DOCTORS.len()).contains(n))
                .ok_or_else(|| format!("pick a specialist between 1 and {}", DOCTORS.len()))?;
            let method = method.parse::<ContactMethod>().map_err(|e| e.to_string())?;
            Ok(CliCommand::Connect { index, method })
        }
        "/cancel" => Ok(CliCommand::Cancel),
        "/history" => Ok(CliCommand::History),
        "/help" => Ok(CliCommand::Help),
        "/quit" | "/exit" => Ok(CliCommand::Quit),
        other => Err(format!("unknown command '{other}', try /help")),
    }
}

type StdinLines = Lines<BufReader<Stdin>>;

async fn prompt_line(lines: &mut StdinLines, label: &str) -> anyhow::Result<Option<String>> {
    eprint!("{label}");
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

/// Collect the profile, retrying until it validates. Returns `false` on EOF.
async fn intake(
    service: &WellnessService,
    session: &mut Session,
    lines: &mut StdinLines,
) -> anyhow::Result<bool> {
    eprintln!("Please tell us about yourself.");
    loop {
        let Some(name) = prompt_line(lines, "Name: ").await? else {
            return Ok(false);
        };
        let Some(age) = prompt_line(lines, "Age: ").await? else {
            return Ok(false);
        };
        let Some(ethnicity) = prompt_line(lines, "Ethnicity (optional): ").await? else {
            return Ok(false);
        };

        let Ok(age) = age.parse::<i64>() else {
            eprintln!("Age must be a number.");
            continue;
        };
        let form = ProfileForm {
            name,
            age,
            ethnicity: Some(ethnicity),
        };
        match service.submit_profile(session, form) {
            Ok(profile) => {
                eprintln!("Welcome, {}! Type /help for commands.", profile.name);
                return Ok(true);
            }
            Err(e) => eprintln!("{e}"),
        }
    }
}

fn print_reply(session: &Session, reply: &Reply) {
    println!("\n{}\n", reply.message);
    if reply.tools.consultation {
        eprintln!("⚠️  {}", session.consultation.status_message());
        print_doctors();
        eprintln!("   Use /connect <n> <phone|video> or /cancel");
    }
}

fn print_doctors() {
    for (i, doctor) in DOCTORS.iter().enumerate() {
        eprintln!("   {}. {} {}", i + 1, doctor.label(), doctor.phone);
    }
}

/// Run one parsed command. Returns `false` when the loop should stop.
async fn execute(
    service: &WellnessService,
    session: &mut Session,
    command: CliCommand,
) -> Result<bool, Error> {
    match command {
        CliCommand::Chat(text) => {
            let reply = service.chat(session, &text).await?;
            print_reply(session, &reply);
        }
        CliCommand::Quick(query) => {
            eprintln!("→ {}", query.label());
            let reply = service.quick_query(session, query).await?;
            print_reply(session, &reply);
        }
        CliCommand::Health(form) => {
            let reply = service.save_progress(session, form).await?;
            eprintln!("✅ Progress saved!");
            print_reply(session, &reply);
        }
        CliCommand::Document(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(crate::error::DocumentError::from)?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload");
            let saved = service.upload_document(session, name, &bytes)?;
            eprintln!("File '{name}' uploaded successfully!");
            let result = service.process_document(session, &saved).await?;
            print_reply(session, &result.reply);
        }
        CliCommand::Doctors => print_doctors(),
        CliCommand::Connect { index, method } => {
            let doctor = &DOCTORS[index - 1];
            let outcome = service.confirm_consultation(session, doctor.id, method)?;
            println!("\n{}\n", outcome.confirmation);
            match outcome.launch {
                ContactLaunch::Tel { uri } => eprintln!("📞 Dial {uri}"),
                ContactLaunch::Video { notice } => eprintln!("🎥 {notice}"),
            }
        }
        CliCommand::Cancel => eprintln!("{}", service.cancel_consultation(session)?),
        CliCommand::History => {
            for message in &session.messages {
                let who = match message.role {
                    MessageRole::User => "you",
                    MessageRole::Assistant => "assistant",
                };
                println!("[{who}] {}", message.content);
            }
        }
        CliCommand::Help => eprintln!("{HELP}"),
        CliCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Run the REPL until EOF or `/quit`.
pub async fn run_cli(service: Arc<WellnessService>) -> anyhow::Result<()> {
    let id = service.sessions().create().await;
    let handle = service.sessions().require(id).await?;
    let mut session = handle.lock().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if !intake(&service, &mut session, &mut lines).await? {
        return Ok(());
    }

    loop {
        eprint!("> ");
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(usage) => {
                eprintln!("{usage}");
                continue;
            }
        };
        match execute(&service, &mut session, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("❌ {e}"),
        }
    }

    drop(session);
    service.sessions().remove(id).await;
    eprintln!("Take care!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(
            parse_command("  I can't sleep  ").unwrap(),
            CliCommand::Chat("I can't sleep".to_string())
        );
    }

    #[test]
    fn quick_commands() {
        assert_eq!(
            parse_command("/stress").unwrap(),
            CliCommand::Quick(QuickQuery::StressRelief)
        );
        assert_eq!(
            parse_command("/diet").unwrap(),
            CliCommand::Quick(QuickQuery::DietSuggestions)
        );
    }

    #[test]
    fn health_command() {
        assert_eq!(
            parse_command("/health 72.5 low 6").unwrap(),
            CliCommand::Health(HealthForm {
                weight_kg: 72.5,
                mood: Mood::Low,
                sleep_hours: 6.0,
            })
        );
        assert!(parse_command("/health 72.5 low").is_err());
        assert!(parse_command("/health heavy low 6").is_err());
        assert!(parse_command("/health 70 ecstatic 6").is_err());
    }

    #[test]
    fn doc_keeps_spaces_in_path() {
        assert_eq!(
            parse_command("/doc ./my labs/report.pdf").unwrap(),
            CliCommand::Document(PathBuf::from("./my labs/report.pdf"))
        );
        assert!(parse_command("/doc").is_err());
    }

    #[test]
    fn connect_command() {
        assert_eq!(
            parse_command("/connect 2 video").unwrap(),
            CliCommand::Connect {
                index: 2,
                method: ContactMethod::VideoCall
            }
        );
        assert_eq!(
            parse_command("/connect 1").unwrap(),
            CliCommand::Connect {
                index: 1,
                method: ContactMethod::PhoneCall
            }
        );
        assert!(parse_command("/connect 0 phone").is_err());
        assert!(parse_command("/connect 4 phone").is_err());
        assert!(parse_command("/connect 1 fax").is_err());
    }

    #[test]
    fn unknown_command() {
        let err = parse_command("/dance").unwrap_err();
        assert!(err.contains("/help"));
        assert_eq!(parse_command("/exit").unwrap(), CliCommand::Quit);
    }
}
