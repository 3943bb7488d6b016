use anyhow::Result;
use tracing_subscriber::EnvFilter;

use studium::config::Config;
use studium::pipeline::AssessmentOutcome;
use studium::retrieval::{IndexOutcome, DEFAULT_TOP_K};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  studium-cli ingest <link-or-path> --prompt <text>");
    eprintln!("  studium-cli retrieve <query> [-k <n>]");
    eprintln!("  studium-cli assess --question <link-or-path> --answer <link-or-path>");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        anyhow::bail!("no command provided");
    };

    let config = Config::from_env();
    let assistant = config.build_assistant().await?;

    match command.as_str() {
        "ingest" => {
            let mut link: Option<String> = None;
            let mut prompt = String::new();
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--prompt" | "-p" => {
                        if i + 1 < args.len() {
                            prompt = args[i + 1].clone();
                            i += 1;
                        }
                    }
                    other => link = Some(other.to_string()),
                }
                i += 1;
            }
            let link = link.ok_or_else(|| anyhow::anyhow!("ingest requires a link or path"))?;

            match assistant.ingest(&link, &prompt).await? {
                IndexOutcome::Stored => println!("✓ Indexed document: {link}"),
                IndexOutcome::Skipped(failure) => {
                    println!("✗ Skipped {link}: {:?}", failure);
                }
            }
        }
        "retrieve" => {
            let mut query: Option<String> = None;
            let mut k = DEFAULT_TOP_K;
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "-k" | "--top-k" => {
                        if i + 1 < args.len() {
                            k = args[i + 1].parse().unwrap_or(DEFAULT_TOP_K);
                            i += 1;
                        }
                    }
                    other => query = Some(other.to_string()),
                }
                i += 1;
            }
            let query = query.ok_or_else(|| anyhow::anyhow!("retrieve requires a query"))?;

            let passages = assistant.retrieval().retrieve(&query, k).await?;
            if passages.is_empty() {
                println!("No matching materials indexed.");
            }
            for (rank, passage) in passages.iter().enumerate() {
                println!("{}. {passage}\n", rank + 1);
            }
        }
        "assess" => {
            let mut question: Option<String> = None;
            let mut answer: Option<String> = None;
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--question" | "-q" => {
                        if i + 1 < args.len() {
                            question = Some(args[i + 1].clone());
                            i += 1;
                        }
                    }
                    "--answer" | "-a" => {
                        if i + 1 < args.len() {
                            answer = Some(args[i + 1].clone());
                            i += 1;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            let question =
                question.ok_or_else(|| anyhow::anyhow!("assess requires --question"))?;
            let answer = answer.ok_or_else(|| anyhow::anyhow!("assess requires --answer"))?;

            match assistant.assess(&question, &answer).await? {
                AssessmentOutcome::Graded(assessment) => {
                    println!("✓ Grade: {}/10", assessment.grade.score);
                    println!("\n{}\n", assessment.grade.justification);
                    println!("--- Feedback ---\n{}", assessment.feedback);
                }
                AssessmentOutcome::SourceFailed { source, kind } => {
                    eprintln!("✗ Could not extract {source}: {kind}");
                }
            }
        }
        other => {
            print_usage();
            anyhow::bail!("unknown command: {other}");
        }
    }

    Ok(())
}
