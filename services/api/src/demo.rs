use crate::server::spawn_local;
use chrono::Utc;
use clap::Args;
use clarify::client::{ApiClient, ClientConfig, DecisionWorkspace, SessionStore};
use clarify::config::AppConfig;
use clarify::decisions::{
    AnalysisResult, MatrixImporter, MissingEvaluationPolicy, ScoringConfig, ScoringEngine,
};
use clarify::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Base URL of a running API (e.g. http://127.0.0.1:3000/api). Without it
    /// the demo starts a private server on an ephemeral port.
    #[arg(long)]
    pub(crate) base_url: Option<String>,
    /// Skip the AI-assisted portion of the demo.
    #[arg(long)]
    pub(crate) skip_ai: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// CSV file with `Option,Criterion,Weight,Value` rows
    #[arg(long)]
    pub(crate) matrix: PathBuf,
    /// How unevaluated pairs are scored: midpoint, zero, or reject
    #[arg(long, value_parser = parse_policy)]
    pub(crate) missing: Option<MissingEvaluationPolicy>,
    /// Print the analysis as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_policy(raw: &str) -> Result<MissingEvaluationPolicy, String> {
    MissingEvaluationPolicy::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not one of midpoint, zero, reject"))
}

/// Outcomes collected while walking through the demo decisions.
#[derive(Debug)]
pub(crate) struct DemoReport {
    pub(crate) manual: AnalysisResult,
    pub(crate) with_safety: AnalysisResult,
    pub(crate) generated: Option<AnalysisResult>,
    pub(crate) decisions: usize,
    pub(crate) signed_out: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { base_url, skip_ai } = args;
    let config = AppConfig::load()?;

    let mut local_server = None;
    let base_url = match base_url {
        Some(url) => url,
        None => {
            let (addr, handle) = spawn_local(config.scoring).await?;
            local_server = Some(handle);
            format!("http://{addr}/api")
        }
    };

    println!("Clarify decision demo");
    println!("- API: {base_url}");
    let report = walkthrough(config.client.with_base_url(base_url), skip_ai).await;

    if let Some(handle) = local_server {
        handle.abort();
    }
    let report = report?;

    println!("\nSummary");
    println!(
        "- Buy a car: {} before Safety, {} after",
        report.manual.recommended.name, report.with_safety.recommended.name
    );
    if let Some(generated) = &report.generated {
        println!("- Choose a laptop: {}", generated.recommended.name);
    }
    println!(
        "- {} decisions created, session {}",
        report.decisions,
        if report.signed_out {
            "closed"
        } else {
            "still open"
        }
    );
    Ok(())
}

/// Registers a throwaway account and drives two decisions through the client:
/// one entered by hand and one filled in by the suggestion endpoint.
pub(crate) async fn walkthrough(
    client: ClientConfig,
    skip_ai: bool,
) -> Result<DemoReport, AppError> {
    let session = SessionStore::new();
    let api = ApiClient::new(client, Arc::new(session.clone()))?;

    let email = format!("demo+{}@clarify.local", Utc::now().timestamp_micros());
    let auth = api
        .register("Demo User", &email, "demo-password-123")
        .await?;
    println!("- Signed in as {} <{}>", auth.user.name, auth.user.email);
    session.set_auth(auth);

    let decision = api
        .create_decision("Buy a car", Some("Family car for the next five years"))
        .await?;
    println!(
        "\n{} ({}, created {})",
        decision.title,
        decision.id,
        decision.created_at.format("%Y-%m-%d %H:%M")
    );

    let mut workspace = DecisionWorkspace::open(api.clone(), &decision.id).await?;
    let sedan = workspace.add_option("Sedan", Some("Four doors, low running costs")).await?;
    let suv = workspace.add_option("SUV", Some("More room, higher seat")).await?;
    let price = workspace.add_criterion("Price", 5).await?;
    let comfort = workspace.add_criterion("Comfort", 3).await?;

    for (option, criterion, value) in [
        (&sedan.id, &price.id, 8.0),
        (&sedan.id, &comfort.id, 6.0),
        (&suv.id, &price.id, 4.0),
        (&suv.id, &comfort.id, 9.0),
    ] {
        workspace.record_evaluation(option, criterion, value).await?;
    }

    let manual = workspace.analyze().await?.clone();
    render_analysis("Hand-entered evaluations", &manual);

    workspace.add_criterion("Safety", 1).await?;
    let with_safety = workspace.analyze().await?.clone();
    render_analysis("After adding an unevaluated Safety criterion", &with_safety);

    let generated = if skip_ai {
        None
    } else {
        let laptop = api
            .create_decision("Choose a laptop", Some("Daily driver for remote work"))
            .await?;
        let mut workspace = DecisionWorkspace::open(api.clone(), &laptop.id).await?;
        workspace.add_option("Ultrabook", None).await?;
        workspace.add_option("Workstation", None).await?;
        let result = workspace.generate_with_ai().await?.clone();
        println!(
            "\n{}: {} criteria suggested",
            laptop.title,
            workspace.detail().criteria.len()
        );
        render_analysis("AI-suggested evaluations", &result);
        Some(result)
    };

    let decisions = api.list_decisions().await?.len();

    api.logout().await?;
    session.clear_auth();

    Ok(DemoReport {
        manual,
        with_safety,
        generated,
        decisions,
        signed_out: !session.is_authenticated(),
    })
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let policy = resolve_policy(args.missing)?;
    let result = score_matrix(&args.matrix, policy)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&result)
            .map_err(|err| AppError::Io(std::io::Error::from(err)))?;
        println!("{rendered}");
    } else {
        println!("Matrix: {}", args.matrix.display());
        println!("- missing evaluations: {}", policy.label());
        render_analysis("Ranking", &result);
    }
    Ok(())
}

/// The `--missing` flag wins; otherwise `CLARIFY_MISSING_EVALUATIONS` applies.
fn resolve_policy(
    flag: Option<MissingEvaluationPolicy>,
) -> Result<MissingEvaluationPolicy, AppError> {
    match flag {
        Some(policy) => Ok(policy),
        None => Ok(AppConfig::load()?.scoring.missing_evaluations),
    }
}

pub(crate) fn score_matrix(
    path: &Path,
    policy: MissingEvaluationPolicy,
) -> Result<AnalysisResult, AppError> {
    let matrix = MatrixImporter::from_path(path)?;
    let engine = ScoringEngine::new(ScoringConfig {
        missing_evaluations: policy,
    });
    Ok(engine.analyze(matrix.scoring_input())?)
}

fn render_analysis(heading: &str, analysis: &AnalysisResult) {
    println!("\n{heading}");
    for (rank, entry) in analysis.results.iter().enumerate() {
        println!(
            "  {}. {:<14} score {:>5.1} | weighted {:>5.1} | confidence {:>3}% | risk {}",
            rank + 1,
            entry.name,
            entry.score,
            entry.weighted_total,
            entry.confidence,
            entry.risk.label()
        );
    }
    println!("Recommended: {}", analysis.recommended.name);
}
