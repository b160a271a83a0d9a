use orderbot_core::config::{AppConfig, DatabaseBackend, LoadOptions};
use orderbot_db::{connect, DbPool};
use serde::Serialize;

use crate::commands::{current_thread_runtime, escape_json};

const ORDER_ROUTINES: [&str; 3] =
    ["insert_order_item", "get_price_for_item", "get_total_order_price"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            if config.database.backend == DatabaseBackend::Memory {
                let reason = "orders are kept in memory";
                checks.push(DoctorCheck::skipped("database_connectivity", reason));
                checks.push(DoctorCheck::skipped("order_routines", reason));
            } else {
                checks.extend(check_database(&config));
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "configuration did not load";
            checks.push(DoctorCheck::skipped("database_connectivity", reason));
            checks.push(DoctorCheck::skipped("order_routines", reason));
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck::skipped("order_routines", "no async runtime"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    DoctorCheck::skipped("order_routines", "the database is unreachable"),
                ];
            }
        };

        let connectivity = DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.redacted_url()),
        };
        let routines = check_order_routines(&pool).await;
        pool.close().await;
        vec![connectivity, routines]
    })
}

async fn check_order_routines(pool: &DbPool) -> DoctorCheck {
    let mut missing = Vec::new();
    for routine in ORDER_ROUTINES {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_proc WHERE proname = $1)",
        )
        .bind(routine)
        .fetch_one(pool)
        .await;

        match found {
            Ok(true) => {}
            Ok(false) => missing.push(routine),
            Err(error) => {
                return DoctorCheck {
                    name: "order_routines",
                    status: CheckStatus::Fail,
                    details: format!("routine lookup failed: {error}"),
                };
            }
        }
    }

    if missing.is_empty() {
        DoctorCheck {
            name: "order_routines",
            status: CheckStatus::Pass,
            details: "order routines are installed".to_string(),
        }
    } else {
        DoctorCheck {
            name: "order_routines",
            status: CheckStatus::Fail,
            details: format!("missing {}; run `orderbot migrate`", missing.join(", ")),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
