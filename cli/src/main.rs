use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::Parser;
use colored::*;

use pocrun_core::{list_pocs, search_pocs, HttpClient, Poc, PocEngine, PocFileInfo, RunOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "pocrun",
    version,
    about = "Runs YAML proof-of-concept probes against a target over HTTP",
    override_usage = "pocrun <target> --poc <file>\n       pocrun <target> --search <keyword>\n       pocrun --list",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Run one POC:                pocrun http://target.com --poc pocs/git-config-exposure.yml
  Search and run:             pocrun http://target.com --search apache
  List available POCs:        pocrun --list
  Verbose (debug output):     pocrun http://target.com --poc pocs/demo.yml -v
  Through a proxy (Burp):     pocrun http://target.com --poc pocs/demo.yml --proxy http://127.0.0.1:8080"
)]
pub struct Args {
    /// Target base URL, e.g. http://target.com
    #[arg(required_unless_present = "list")]
    pub target: Option<String>,

    #[arg(short, long, help = "POC YAML file to run")]
    pub poc: Option<PathBuf>,

    #[arg(short, long, help = "Search the POC directory by filename keyword")]
    pub search: Option<String>,

    #[arg(long, default_value_t = false, help = "List all available POC files")]
    pub list: bool,

    #[arg(long, default_value = "pocs", help = "Directory holding POC YAML files")]
    pub poc_dir: PathBuf,

    #[arg(long, default_value_t = 10, help = "Request timeout in seconds")]
    pub timeout: u64,

    #[arg(long, help = "Proxy URL (e.g. http://127.0.0.1:8080)")]
    pub proxy: Option<String>,

    #[arg(short, long, help = "Append the run result to a JSON-lines file")]
    pub output: Option<PathBuf>,

    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Show requests, responses and rule results (debug logging)"
    )]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if args.list {
        if let Err(e) = print_poc_listing(&args.poc_dir) {
            eprintln!("{}", format!("[!] Failed to list POCs: {}", e).red());
            process::exit(1);
        }
        return;
    }

    let poc_path = match resolve_poc_path(&args) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{}", format!("[!] {}", e).red());
            process::exit(1);
        }
    };

    let poc = match Poc::from_file(&poc_path) {
        Ok(poc) => poc,
        Err(e) => {
            eprintln!(
                "{}",
                format!("[!] Failed to load {}: {}", poc_path.display(), e).red()
            );
            process::exit(1);
        }
    };

    // required_unless_present guarantees a target outside --list mode.
    let target = args.target.clone().expect("target is required");

    print_run_header(&poc, &target);

    let client = HttpClient::new(args.timeout, args.proxy.as_deref());
    let engine = PocEngine::new(client);

    match engine.run(&poc, &target).await {
        Ok(outcome) => {
            if let Some(ref path) = args.output {
                if let Err(e) = append_result(path, &poc, &target, &outcome) {
                    eprintln!(
                        "{}",
                        format!("[!] Failed to write {}: {}", path.display(), e).red()
                    );
                }
            }
            for (name, matched) in &outcome.rule_results {
                let label = if *matched {
                    "matched".green()
                } else {
                    "no match".dimmed()
                };
                println!("    rule {:<12} {}", name, label);
            }
            if outcome.vulnerable {
                println!(
                    "\n{}",
                    "[+] VULNERABLE: the target matched this POC".red().bold()
                );
                print_vulnerability_detail(&poc);
            } else {
                println!(
                    "\n{}",
                    "[-] Not vulnerable: probes completed, conditions not met".green()
                );
            }
        }
        Err(e) => {
            // An error is "inconclusive", never a verdict.
            eprintln!("{}", format!("\n[x] Inconclusive: {}", e).yellow().bold());
            process::exit(2);
        }
    }
}

/// Picks the POC file to run: --poc directly, or --search with an
/// interactive selection when several files match.
fn resolve_poc_path(args: &Args) -> anyhow::Result<PathBuf> {
    if let Some(ref path) = args.poc {
        return Ok(path.clone());
    }

    let Some(ref keyword) = args.search else {
        bail!("no POC specified: use --poc <file> or --search <keyword>");
    };

    let matches = search_pocs(&args.poc_dir, keyword)?;
    match matches.len() {
        0 => bail!(
            "no POC matching '{}' under {}",
            keyword,
            args.poc_dir.display()
        ),
        1 => {
            println!(
                "{}",
                format!("[+] One match, running: {}", matches[0].name).green()
            );
            Ok(matches[0].path.clone())
        }
        _ => {
            let selected = prompt_selection(&matches)?;
            Ok(selected.path.clone())
        }
    }
}

/// Numbered interactive selection over multiple search hits.
fn prompt_selection(matches: &[PocFileInfo]) -> anyhow::Result<&PocFileInfo> {
    println!("\nFound {} matching POCs:\n", matches.len());
    for (i, info) in matches.iter().enumerate() {
        println!("[{}] {}", i + 1, info.name.bold());
        if !info.description.is_empty() {
            println!("    {}", info.description);
        }
        println!("    path: {}\n", info.path.display().to_string().dimmed());
    }

    print!("Select a POC to run (number): ");
    io::stdout().flush().ok();

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("failed to read selection")?;

    let choice: usize = input
        .trim()
        .parse()
        .with_context(|| format!("invalid selection: {}", input.trim()))?;
    if choice < 1 || choice > matches.len() {
        bail!("selection out of range: {}", choice);
    }

    Ok(&matches[choice - 1])
}

/// One JSON line per completed run, appended so repeated invocations build a
/// log. Verdicts only; inconclusive runs are never recorded here.
fn append_result(
    path: &Path,
    poc: &Poc,
    target: &str,
    outcome: &RunOutcome,
) -> anyhow::Result<()> {
    let rules: std::collections::BTreeMap<String, bool> =
        outcome.rule_results.iter().cloned().collect();
    let record = serde_json::json!({
        "poc": poc.name,
        "target": target,
        "vulnerable": outcome.vulnerable,
        "rules": rules,
    });

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", record)?;
    Ok(())
}

fn print_poc_listing(dir: &Path) -> anyhow::Result<()> {
    let pocs = list_pocs(dir)?;

    println!("{}", "Available POC files:".bold());
    for (i, info) in pocs.iter().enumerate() {
        println!("[{}] {}", i + 1, info.name.bold());
        if !info.description.is_empty() {
            println!("    {}", info.description);
        }
        println!("    path: {}\n", info.path.display().to_string().dimmed());
    }
    println!("{} POC file(s) found.", pocs.len());
    Ok(())
}

fn print_run_header(poc: &Poc, target: &str) {
    println!("{}", format!("[+] POC:       {}", poc.name).green().bold());
    println!("{}", format!("[+] Target:    {}", target).blue());
    println!("{}", format!("[+] Transport: {}", poc.transport).blue());
    println!("{}", format!("[+] Rules:     {}", poc.rules.len()).blue());
    if !poc.detail.author.is_empty() {
        println!("{}", format!("[+] Author:    {}", poc.detail.author).blue());
    }
    if !poc.detail.description.is_empty() {
        println!(
            "{}",
            format!("[+] About:     {}", poc.detail.description).blue()
        );
    }
    println!("{}", "──────────────────────────────────────────".dimmed());
}

fn print_vulnerability_detail(poc: &Poc) {
    let vuln = &poc.detail.vulnerability;
    if !vuln.level.is_empty() {
        println!("    severity: {}", vuln.level.red());
    }
    if !vuln.matched.is_empty() {
        println!("    evidence: {}", vuln.matched);
    }
    for link in &poc.detail.links {
        println!("    ref: {}", link.dimmed());
    }
}
