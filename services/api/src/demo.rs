use crate::infra::InMemoryTaskStore;
use clap::Args;
use provision_advisor::config::{ConfigError, MAX_PROVISIONING_SECS};
use provision_advisor::error::AppError;
use provision_advisor::workflows::provisioning::{
    task_channel, validate_request, ComplianceAdvisor, ComplianceResult, ProvisioningRequestService,
    SimulatedProvisioning, SubmissionError, TaskId, TaskStatus, TaskStore, WorkerPool,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON file holding a single resource request
    #[arg(long)]
    pub(crate) file: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Simulated provisioning time per task, in seconds
    #[arg(
        long,
        default_value_t = 2,
        value_parser = clap::value_parser!(u64).range(0..=MAX_PROVISIONING_SECS)
    )]
    pub(crate) provisioning_secs: u64,
    /// Number of workers draining the queue
    #[arg(long, default_value_t = 1)]
    pub(crate) workers: usize,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.file)?;
    let result = evaluate_payload(&raw)?;

    println!("Compliance evaluation for {}", args.file.display());
    render_compliance(&result);
    Ok(())
}

fn evaluate_payload(raw: &str) -> Result<ComplianceResult, AppError> {
    let payload: Value = serde_json::from_str(raw)?;
    let request = validate_request(&payload)?;
    Ok(ComplianceAdvisor::new().evaluate(&request))
}

const DEMO_GRACE: Duration = Duration::from_secs(10);

/// Final status of every demo task and whether all of them finished in time.
#[derive(Debug)]
struct DemoReport {
    finished: bool,
    statuses: BTreeMap<TaskId, Option<TaskStatus>>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let report = run_pipeline(args).await?;
    if !report.finished {
        println!("  demo timed out before every task completed");
    }
    Ok(())
}

async fn run_pipeline(args: DemoArgs) -> Result<DemoReport, AppError> {
    let DemoArgs {
        provisioning_secs,
        workers,
    } = args;
    let duration = Duration::from_secs(provisioning_secs);

    let store = Arc::new(InMemoryTaskStore::default());
    let (queue, deliveries) = task_channel();
    let pool = WorkerPool::spawn(
        workers,
        deliveries,
        store.clone(),
        Arc::new(SimulatedProvisioning::new(duration)),
    );
    let service = ProvisioningRequestService::new(store.clone(), Arc::new(queue));

    println!("Provisioning pipeline demo");
    let mut statuses = BTreeMap::new();
    for payload in sample_requests() {
        let receipt = service.submit(payload)?;
        println!("\nSubmitted task {}", receipt.task_id);
        render_compliance(&receipt.compliance);
        statuses.insert(receipt.task_id, None);
    }

    let deadline = u32::try_from(statuses.len())
        .ok()
        .and_then(|count| duration.checked_mul(count))
        .and_then(|total| total.checked_add(DEMO_GRACE))
        .and_then(|total| Instant::now().checked_add(total))
        .ok_or(ConfigError::OutOfRange {
            var: "--provisioning-secs",
            max: MAX_PROVISIONING_SECS,
        })?;

    println!("\nStatus transitions");
    let finished = watch_transitions(store.as_ref(), &mut statuses, deadline).await;
    pool.shutdown_and_join().await;

    Ok(DemoReport {
        finished: finished?,
        statuses,
    })
}

async fn watch_transitions(
    store: &InMemoryTaskStore,
    last_seen: &mut BTreeMap<TaskId, Option<TaskStatus>>,
    deadline: Instant,
) -> Result<bool, AppError> {
    loop {
        for (task_id, seen) in last_seen.iter_mut() {
            let Some(task) = store.get(*task_id).map_err(SubmissionError::from)? else {
                continue;
            };
            if *seen != Some(task.status()) {
                println!("  task {} ({}) -> {}", task_id, task.resource_name(), task.status());
                *seen = Some(task.status());
            }
        }

        let all_done = last_seen
            .values()
            .all(|seen| seen.is_some_and(|status| status.is_terminal()));
        if all_done {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn sample_requests() -> Vec<Value> {
    vec![
        json!({
            "resource_name": "db1",
            "environment": "dev",
            "instance_type": "large",
            "encrypted": false,
            "tags": {},
            "security_group": { "allowed_cidrs": ["0.0.0.0/0"] }
        }),
        json!({
            "resource_name": "orders-api",
            "environment": "prod",
            "instance_type": "small",
            "encrypted": true,
            "tags": { "Owner": "DevOpsTeam", "CostCenter": "1234" },
            "security_group": { "allowed_cidrs": ["10.0.0.0/16"] }
        }),
    ]
}

fn render_compliance(result: &ComplianceResult) {
    println!("  score {} ({})", result.score, result.status.label());
    if result.suggestions.is_empty() {
        println!("  no suggestions");
    }
    for suggestion in &result.suggestions {
        println!("  - {suggestion}");
    }
}
